use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Raw `int32_t` status returned by hostfxr and by the runtime delegates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0);

    pub fn is_success(self) -> bool {
        self == StatusCode::SUCCESS
    }

    /// Name of the status when it is one of the well known hosting or
    /// runtime HRESULTs.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 as u32 {
            0x0000_0000 => "Success",
            0x0000_0001 => "Success_HostAlreadyInitialized",
            0x0000_0002 => "Success_DifferentRuntimeProperties",
            0x8000_8081 => "InvalidArgFailure",
            0x8000_8082 => "CoreHostLibLoadFailure",
            0x8000_8083 => "CoreHostLibMissingFailure",
            0x8000_8084 => "CoreHostEntryPointFailure",
            0x8000_8085 => "CoreHostCurHostFindFailure",
            0x8000_8087 => "CoreClrResolveFailure",
            0x8000_8088 => "CoreClrBindFailure",
            0x8000_8089 => "CoreClrInitFailure",
            0x8000_808a => "CoreClrExeFailure",
            0x8000_808b => "ResolverInitFailure",
            0x8000_808c => "ResolverResolveFailure",
            0x8000_8093 => "InvalidConfigFile",
            0x8000_8096 => "FrameworkMissingFailure",
            0x8007_0002 => "COR_E_FILENOTFOUND",
            0x8013_1513 => "COR_E_MISSINGMETHOD",
            0x8013_1522 => "COR_E_TYPELOAD",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0 as u32)?;
        if let Some(name) = self.name() {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// Every way the bootstrap sequence can fail. None of them is recoverable
/// in-process; the driver reports the error and exits.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Unable to resolve the executable directory from {0:?}")]
    ExecutablePath(PathBuf),

    #[error("Failed to locate hostfxr: {0}")]
    HostFxrNotFound(String),

    #[error("Failed to load hostfxr from {path}: {source}")]
    HostFxrLoad {
        path : PathBuf,
        #[source]
        source : libloading::Error,
    },

    #[error("hostfxr does not export {0}")]
    MissingExport(&'static str),

    #[error("Failed to init runtime: {0}")]
    RuntimeInit(StatusCode),

    #[error("Get delegate failed: {0}")]
    DelegateUnavailable(StatusCode),

    #[error("Failed to resolve managed entry point {type_name}::{method_name}: {status}")]
    EntryPoint {
        type_name : String,
        method_name : String,
        status : StatusCode,
    },

    #[error("String contains an interior nul: {0:?}")]
    InteriorNul(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
