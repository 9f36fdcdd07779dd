//! Platform differences in the hosting ABI.
//!
//! hostfxr takes `char_t` strings: UTF-16 `wchar_t` on Windows and narrow
//! `char` everywhere else.

use crate::error::{HostError, Result};
use std::ffi::OsStr;

#[cfg(windows)]
pub type CharT = u16;
#[cfg(not(windows))]
pub type CharT = std::os::raw::c_char;

#[cfg(windows)]
pub const HOSTFXR_LIBRARY_NAME: &str = "hostfxr.dll";
#[cfg(target_os = "macos")]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.so";

/// Architecture name as the .NET installers spell it.
pub fn arch_name() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else {
        std::env::consts::ARCH
    }
}

/// An owned, nul-terminated `char_t` string that can be handed to hostfxr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeString {
    buffer : Vec<CharT>,
}

impl NativeString {
    pub fn from_os(value : &OsStr) -> Result<NativeString> {
        Self::encode(value).ok_or_else(|| HostError::InteriorNul(value.to_string_lossy().into_owned()))
    }

    pub fn from_str(value : &str) -> Result<NativeString> {
        Self::from_os(OsStr::new(value))
    }

    pub fn as_ptr(&self) -> *const CharT {
        self.buffer.as_ptr()
    }

    #[cfg(unix)]
    fn encode(value : &OsStr) -> Option<NativeString> {
        use std::os::unix::ffi::OsStrExt;
        let bytes = value.as_bytes();
        if bytes.contains(&0) {
            return None;
        }
        let buffer = bytes
            .iter()
            .map(|&b| b as CharT)
            .chain(std::iter::once(0))
            .collect();
        Some(NativeString { buffer })
    }

    #[cfg(windows)]
    fn encode(value : &OsStr) -> Option<NativeString> {
        use std::os::windows::ffi::OsStrExt;
        let mut buffer: Vec<u16> = value.encode_wide().collect();
        if buffer.contains(&0) {
            return None;
        }
        buffer.push(0);
        Some(NativeString { buffer })
    }
}

/// Reads a nul-terminated `char_t` string.
///
/// # Safety
/// `ptr` must be non-null and point to a nul-terminated `char_t` string.
pub unsafe fn read_native(ptr : *const CharT) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);
    #[cfg(windows)]
    {
        String::from_utf16_lossy(units)
    }
    #[cfg(not(windows))]
    {
        let bytes: Vec<u8> = units.iter().map(|&c| c as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
