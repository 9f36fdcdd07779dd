use crate::error::{HostError, Result, StatusCode};
use crate::hostfxr::{HostFxrFns, HostFxrHandle, HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER};
use crate::pal::{CharT, NativeString};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::os::raw::c_void;
use std::path::Path;
use std::ptr;
use tracing::debug;

/// `load_assembly_and_get_function_pointer_fn`
pub type LoadAssemblyAndGetFunctionPointerFn = unsafe extern "system" fn (
    assembly_path : *const CharT,
    type_name : *const CharT,
    method_name : *const CharT,
    delegate_type_name : *const CharT,
    reserved : *mut c_void,
    delegate : *mut *mut c_void,
) -> i32;

/// The runtime's load-assembly delegate. It borrows the hostfxr exports that
/// produced it, so it cannot be called after the library is unloaded.
pub struct LoadAssemblyDelegate<'fxr> {
    function : LoadAssemblyAndGetFunctionPointerFn,
    phantom : PhantomData<&'fxr HostFxrFns>,
}

impl<'fxr> LoadAssemblyDelegate<'fxr> {
    pub fn new(function : LoadAssemblyAndGetFunctionPointerFn) -> LoadAssemblyDelegate<'fxr> {
        LoadAssemblyDelegate { function, phantom: PhantomData }
    }
}

impl<'fxr> Deref for LoadAssemblyDelegate<'fxr> {
    type Target = LoadAssemblyAndGetFunctionPointerFn;
    fn deref(&self) -> &LoadAssemblyAndGetFunctionPointerFn {
        &self.function
    }
}

/// An open hostfxr context. Dropping it calls `hostfxr_close`.
struct RuntimeContext<'fxr> {
    fns : &'fxr HostFxrFns,
    handle : HostFxrHandle,
}

impl<'fxr> RuntimeContext<'fxr> {
    /// Calls `hostfxr_initialize_for_runtime_config`. The context is returned
    /// whatever the status, so whatever handle hostfxr produced still gets
    /// closed.
    fn initialize(fns : &'fxr HostFxrFns, config_path : &NativeString) -> (RuntimeContext<'fxr>, StatusCode) {
        let mut handle = ptr::null_mut();
        let status = unsafe { (fns.initialize)(config_path.as_ptr(), ptr::null(), &mut handle) };
        (RuntimeContext { fns, handle }, StatusCode(status))
    }

    fn runtime_delegate(&self, delegate_type : i32) -> (*mut c_void, StatusCode) {
        let mut delegate = ptr::null_mut();
        let status = unsafe { (self.fns.get_runtime_delegate)(self.handle, delegate_type, &mut delegate) };
        (delegate, StatusCode(status))
    }
}

impl<'fxr> Drop for RuntimeContext<'fxr> {
    fn drop(&mut self) {
        let status = StatusCode(unsafe { (self.fns.close)(self.handle) });
        debug!("Closed runtime context: {}", status);
    }
}

/// Initializes a runtime from `config_path` and returns its
/// `load_assembly_and_get_function_pointer` delegate.
///
/// The runtime context is closed exactly once before this returns, on
/// success and on every failure.
pub fn load_assembly_delegate<'fxr>(fns : &'fxr HostFxrFns, config_path : &Path) -> Result<LoadAssemblyDelegate<'fxr>> {
    let config = NativeString::from_os(config_path.as_os_str())?;
    debug!("Initializing runtime from {}", config_path.display());

    let (context, status) = RuntimeContext::initialize(fns, &config);
    if !status.is_success() || context.handle.is_null() {
        return Err(HostError::RuntimeInit(status));
    }

    let (delegate, status) = context.runtime_delegate(HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER);
    drop(context);

    if !status.is_success() || delegate.is_null() {
        return Err(HostError::DelegateUnavailable(status));
    }

    let function = unsafe { mem::transmute::<*mut c_void, LoadAssemblyAndGetFunctionPointerFn>(delegate) };
    Ok(LoadAssemblyDelegate::new(function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::read_native;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    const HANDLE: usize = 0x5a5a;

    thread_local! {
        static INIT_STATUS: Cell<i32> = Cell::new(0);
        static INIT_HANDLE: Cell<usize> = Cell::new(HANDLE);
        static INIT_CONFIG: RefCell<Option<String>> = RefCell::new(None);
        static DELEGATE_STATUS: Cell<i32> = Cell::new(0);
        static DELEGATE_NULL: Cell<bool> = Cell::new(false);
        static DELEGATE_REQUESTS: RefCell<Vec<i32>> = RefCell::new(Vec::new());
        static CLOSED: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    }

    unsafe extern "C" fn fake_initialize(path : *const CharT, _parameters : *const c_void, handle : *mut HostFxrHandle) -> i32 {
        INIT_CONFIG.with(|c| *c.borrow_mut() = Some(read_native(path)));
        *handle = INIT_HANDLE.with(|h| h.get()) as HostFxrHandle;
        INIT_STATUS.with(|s| s.get())
    }

    unsafe extern "C" fn fake_get_runtime_delegate(_handle : HostFxrHandle, delegate_type : i32, delegate : *mut *mut c_void) -> i32 {
        DELEGATE_REQUESTS.with(|r| r.borrow_mut().push(delegate_type));
        *delegate = if DELEGATE_NULL.with(|n| n.get()) {
            ptr::null_mut()
        } else {
            fake_load_assembly as LoadAssemblyAndGetFunctionPointerFn as *mut c_void
        };
        DELEGATE_STATUS.with(|s| s.get())
    }

    unsafe extern "C" fn fake_close(handle : HostFxrHandle) -> i32 {
        CLOSED.with(|c| c.borrow_mut().push(handle as usize));
        0
    }

    unsafe extern "system" fn fake_load_assembly(
        _assembly_path : *const CharT,
        _type_name : *const CharT,
        _method_name : *const CharT,
        _delegate_type_name : *const CharT,
        _reserved : *mut c_void,
        _delegate : *mut *mut c_void,
    ) -> i32 {
        0
    }

    fn fake_fns() -> HostFxrFns {
        HostFxrFns {
            initialize: fake_initialize,
            get_runtime_delegate: fake_get_runtime_delegate,
            close: fake_close,
        }
    }

    fn closed() -> Vec<usize> {
        CLOSED.with(|c| c.borrow().clone())
    }

    fn config_path() -> PathBuf {
        std::env::temp_dir().join("DotNetLib.runtimeconfig.json")
    }

    #[test]
    fn success_closes_context_once() {
        let fns = fake_fns();
        let delegate = load_assembly_delegate(&fns, &config_path()).unwrap();

        assert_eq!(*delegate as usize, fake_load_assembly as LoadAssemblyAndGetFunctionPointerFn as usize);
        assert_eq!(closed(), vec![HANDLE]);
        assert_eq!(
            DELEGATE_REQUESTS.with(|r| r.borrow().clone()),
            vec![HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER]
        );
        assert_eq!(
            INIT_CONFIG.with(|c| c.borrow().clone()),
            Some(config_path().to_string_lossy().into_owned())
        );
    }

    #[test]
    fn init_failure_still_closes_context_once() {
        INIT_STATUS.with(|s| s.set(0x8000_8093_u32 as i32));
        let fns = fake_fns();

        let err = load_assembly_delegate(&fns, &config_path()).err().unwrap();
        match err {
            HostError::RuntimeInit(status) => assert_eq!(status.0 as u32, 0x8000_8093),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(closed(), vec![HANDLE]);
        assert!(DELEGATE_REQUESTS.with(|r| r.borrow().is_empty()));
    }

    #[test]
    fn init_without_handle_is_a_failure() {
        INIT_HANDLE.with(|h| h.set(0));
        let fns = fake_fns();

        let err = load_assembly_delegate(&fns, &config_path()).err().unwrap();
        assert!(matches!(err, HostError::RuntimeInit(StatusCode::SUCCESS)));
        assert_eq!(closed(), vec![0]);
    }

    #[test]
    fn already_initialized_host_is_rejected() {
        INIT_STATUS.with(|s| s.set(1));
        let fns = fake_fns();

        assert!(load_assembly_delegate(&fns, &config_path()).is_err());
        assert_eq!(closed().len(), 1);
    }

    #[test]
    fn delegate_failure_closes_context_once() {
        DELEGATE_STATUS.with(|s| s.set(0x8000_8089_u32 as i32));
        let fns = fake_fns();

        let err = load_assembly_delegate(&fns, &config_path()).err().unwrap();
        match err {
            HostError::DelegateUnavailable(status) => assert_eq!(status.0 as u32, 0x8000_8089),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(closed(), vec![HANDLE]);
    }

    #[test]
    fn null_delegate_is_a_failure() {
        DELEGATE_NULL.with(|n| n.set(true));
        let fns = fake_fns();

        let err = load_assembly_delegate(&fns, &config_path()).err().unwrap();
        assert!(matches!(err, HostError::DelegateUnavailable(StatusCode::SUCCESS)));
        assert_eq!(closed(), vec![HANDLE]);
        assert_eq!(DELEGATE_REQUESTS.with(|r| r.borrow().len()), 1);
    }
}
