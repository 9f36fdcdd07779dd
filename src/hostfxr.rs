use libloading as lib;

use crate::error::{HostError, Result};
use crate::nethost;
use crate::pal::{self, CharT};
use std::mem;
use std::os::raw::c_void;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type HostFxrHandle = *mut c_void;

/// `hdt_load_assembly_and_get_function_pointer` from `hostfxr_delegate_type`.
pub const HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER: i32 = 5;

pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn (*const CharT, *const c_void, *mut HostFxrHandle) -> i32;
pub type GetRuntimeDelegateFn = unsafe extern "C" fn (HostFxrHandle, i32, *mut *mut c_void) -> i32;
pub type CloseFn = unsafe extern "C" fn (HostFxrHandle) -> i32;
pub type ErrorWriterFn = unsafe extern "C" fn (*const CharT);
pub type SetErrorWriterFn = unsafe extern "C" fn (Option<ErrorWriterFn>) -> Option<ErrorWriterFn>;

const INITIALIZE_SYMBOL: &str = "hostfxr_initialize_for_runtime_config";
const GET_DELEGATE_SYMBOL: &str = "hostfxr_get_runtime_delegate";
const CLOSE_SYMBOL: &str = "hostfxr_close";
const SET_ERROR_WRITER_SYMBOL: &str = "hostfxr_set_error_writer";

/// The hostfxr exports the bootstrap needs. Every pointer is non-null by
/// construction.
#[derive(Clone, Copy, Debug)]
pub struct HostFxrFns {
    pub initialize : InitializeForRuntimeConfigFn,
    pub get_runtime_delegate : GetRuntimeDelegateFn,
    pub close : CloseFn,
}

/// A loaded hostfxr library. The library stays loaded until this is dropped.
#[derive(Debug)]
pub struct HostFxr {
    fns : HostFxrFns,
    set_error_writer : Option<SetErrorWriterFn>,
    path : PathBuf,
    _library : lib::Library,
}

impl Drop for HostFxr {
    fn drop(&mut self) {
        // Our writer must not outlive the library that calls it.
        if let Some(set_error_writer) = self.set_error_writer {
            unsafe { set_error_writer(None) };
        }
        debug!("Unloading hostfxr from {}", self.path.display());
    }
}

impl HostFxr {
    /// Finds hostfxr on this machine and loads it.
    pub fn locate() -> Result<HostFxr> {
        let path = nethost::hostfxr_path()?;
        HostFxr::load(&path)
    }

    pub fn load(path : &Path) -> Result<HostFxr> {
        let library = unsafe { lib::Library::new(path) }.map_err(|source| HostError::HostFxrLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let lookup = |name : &str| export(&library, name);
        let fns = HostFxrFns::resolve(lookup)?;
        let set_error_writer = lookup(SET_ERROR_WRITER_SYMBOL)
            .map(|address| unsafe { mem::transmute::<*mut c_void, SetErrorWriterFn>(address) });
        if let Some(set_error_writer) = set_error_writer {
            unsafe { set_error_writer(Some(forward_error)) };
        }

        debug!("Loaded hostfxr from {}", path.display());
        Ok(HostFxr {
            fns,
            set_error_writer,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn fns(&self) -> &HostFxrFns {
        &self.fns
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostFxrFns {
    /// Resolves all three required exports through `lookup`, or reports the
    /// first one that is missing or null.
    fn resolve<F>(lookup : F) -> Result<HostFxrFns>
    where
        F : Fn(&str) -> Option<*mut c_void>,
    {
        let required = |name : &'static str| lookup(name).ok_or(HostError::MissingExport(name));

        let initialize = required(INITIALIZE_SYMBOL)?;
        let get_runtime_delegate = required(GET_DELEGATE_SYMBOL)?;
        let close = required(CLOSE_SYMBOL)?;

        unsafe {
            Ok(HostFxrFns {
                initialize: mem::transmute::<*mut c_void, InitializeForRuntimeConfigFn>(initialize),
                get_runtime_delegate: mem::transmute::<*mut c_void, GetRuntimeDelegateFn>(get_runtime_delegate),
                close: mem::transmute::<*mut c_void, CloseFn>(close),
            })
        }
    }
}

/// Address of an exported symbol, `None` when it is absent or null.
fn export(library : &lib::Library, name : &str) -> Option<*mut c_void> {
    let symbol: lib::Symbol<*mut c_void> = unsafe { library.get(name.as_bytes()) }.ok()?;
    let address = *symbol;
    if address.is_null() {
        None
    } else {
        Some(address)
    }
}

unsafe extern "C" fn forward_error(message : *const CharT) {
    if message.is_null() {
        return;
    }
    let message = pal::read_native(message);
    warn!("hostfxr: {}", message.trim_end());
}
