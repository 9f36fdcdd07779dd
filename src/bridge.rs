//! The native/managed call boundary.
//!
//! `HostApi` is passed by value to the managed entry point, so its layout is
//! a binary contract with the managed `HostApi` struct: one function pointer
//! field per callback, in declaration order, platform default calling
//! convention. Nothing checks this across the boundary at run time.

use crate::error::{HostError, Result, StatusCode};
use crate::paths::AppLayout;
use crate::pal::{CharT, NativeString};
use crate::runtime::LoadAssemblyDelegate;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::mem;
use std::os::raw::c_void;
use std::ptr;
use tracing::debug;

/// Bumped whenever a field is added, removed or reordered in `HostApi`.
pub const HOST_API_VERSION: u32 = 1;

/// `UNMANAGEDCALLERSONLY_METHOD`: resolve an `[UnmanagedCallersOnly]` method
/// instead of a delegate type.
pub const UNMANAGEDCALLERSONLY_METHOD: *const CharT = usize::MAX as *const CharT;

pub type HelloFn = extern "system" fn ();

/// Callbacks handed to managed code.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HostApi {
    pub hello : HelloFn,
}

const _: () = {
    assert!(HOST_API_VERSION == 1, "HostApi layout changed without updating the assertions below");
    assert!(mem::size_of::<HostApi>() == mem::size_of::<usize>());
    assert!(mem::align_of::<HostApi>() == mem::align_of::<usize>());
    assert!(mem::offset_of!(HostApi, hello) == 0);
};

impl HostApi {
    pub fn new() -> HostApi {
        HostApi { hello: say_hello }
    }
}

impl Default for HostApi {
    fn default() -> HostApi {
        HostApi::new()
    }
}

extern "system" fn say_hello() {
    // Unwinding out of here would cross into managed frames.
    let _ = writeln!(io::stdout(), "Hello from host");
}

pub type EntryPointFn = unsafe extern "system" fn (HostApi);

/// A resolved `[UnmanagedCallersOnly]` method. Calling it consumes it.
pub struct ManagedEntryPoint<'fxr> {
    function : EntryPointFn,
    phantom : PhantomData<&'fxr ()>,
}

impl<'fxr> ManagedEntryPoint<'fxr> {
    /// Runs managed code synchronously until the entry point returns.
    pub fn invoke(self, api : HostApi) {
        debug!("Invoking managed entry point");
        unsafe { (self.function)(api) };
    }
}

/// Loads the managed assembly and binds its entry point.
pub fn resolve_entry_point<'fxr>(delegate : &LoadAssemblyDelegate<'fxr>, layout : &AppLayout) -> Result<ManagedEntryPoint<'fxr>> {
    let assembly_path = NativeString::from_os(layout.assembly.as_os_str())?;
    let type_name = NativeString::from_str(layout.type_name)?;
    let method_name = NativeString::from_str(layout.method_name)?;

    debug!(
        "Resolving {}::{} from {}",
        layout.type_name,
        layout.method_name,
        layout.assembly.display()
    );

    let mut function: *mut c_void = ptr::null_mut();
    let status = StatusCode(unsafe {
        (**delegate)(
            assembly_path.as_ptr(),
            type_name.as_ptr(),
            method_name.as_ptr(),
            UNMANAGEDCALLERSONLY_METHOD,
            ptr::null_mut(),
            &mut function,
        )
    });

    if !status.is_success() || function.is_null() {
        return Err(HostError::EntryPoint {
            type_name: layout.type_name.to_string(),
            method_name: layout.method_name.to_string(),
            status,
        });
    }

    let function = unsafe { mem::transmute::<*mut c_void, EntryPointFn>(function) };
    Ok(ManagedEntryPoint { function, phantom: PhantomData })
}
