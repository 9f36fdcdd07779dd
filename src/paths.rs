use crate::error::{HostError, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

pub const RUNTIME_CONFIG_FILE: &str = "DotNetLib.runtimeconfig.json";
pub const ASSEMBLY_FILE: &str = "DotNetLib.dll";
pub const ENTRY_TYPE_NAME: &str = "DotNetLib.Lib, DotNetLib";
pub const ENTRY_METHOD_NAME: &str = "PluginMain";

/// Absolute directory containing the running executable.
///
/// `invocation` is argv[0]. It is made absolute against the current
/// directory; a bare program name (found through `PATH`) or a missing argv[0]
/// falls back to asking the OS for the executable path.
pub fn executable_dir(invocation : Option<&Path>) -> Result<PathBuf> {
    let exe = match invocation {
        Some(path) if has_directory(path) => absolute(path)?,
        _ => env::current_exe()?,
    };
    parent_dir(&exe)
}

fn has_directory(path : &Path) -> bool {
    path.parent().map_or(false, |p| !p.as_os_str().is_empty())
}

fn absolute(path : &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()?.join(path))
}

fn parent_dir(exe : &Path) -> Result<PathBuf> {
    let normalized: PathBuf = exe
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    match normalized.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Err(HostError::ExecutablePath(exe.to_path_buf())),
    }
}

/// Where the managed side lives relative to the executable. None of it is
/// configurable.
#[derive(Clone, Debug)]
pub struct AppLayout {
    pub root : PathBuf,
    pub runtime_config : PathBuf,
    pub assembly : PathBuf,
    pub type_name : &'static str,
    pub method_name : &'static str,
}

impl AppLayout {
    pub fn new(root : PathBuf) -> AppLayout {
        AppLayout {
            runtime_config: root.join(RUNTIME_CONFIG_FILE),
            assembly: root.join(ASSEMBLY_FILE),
            type_name: ENTRY_TYPE_NAME,
            method_name: ENTRY_METHOD_NAME,
            root,
        }
    }
}
