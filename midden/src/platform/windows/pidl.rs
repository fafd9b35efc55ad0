//! Owned shell item identifier lists.

use std::fmt;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows::Win32::System::Com::CoTaskMemFree;
use windows::Win32::UI::Shell::{ILClone, ILCreateFromPathW};
use windows::Win32::UI::Shell::Common::ITEMIDLIST;
use windows::core::PCWSTR;

use crate::Error;

/// An item identifier list allocated by the shell.
///
/// The allocation is freed exactly once, through the shell's task
/// allocator, when the handle drops. Copies go through `ILClone` so every
/// handle owns its own allocation.
pub struct Pidl {
    ptr: *mut ITEMIDLIST,
}

impl Pidl {
    /// Take ownership of a list returned by a shell API.
    ///
    /// The pointer must have been allocated by the shell's task allocator
    /// and must not be freed elsewhere.
    pub fn from_raw(ptr: *mut ITEMIDLIST) -> Pidl {
        debug_assert!(!ptr.is_null());
        Pidl { ptr }
    }

    /// Identifier list for an absolute filesystem path.
    pub fn from_path(path: &Path) -> Result<Pidl, Error> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain([0]).collect();
        let ptr = unsafe { ILCreateFromPathW(PCWSTR(wide.as_ptr())) };
        if ptr.is_null() {
            return Err(Error::NotFound(path.to_owned()));
        }
        Ok(Pidl::from_raw(ptr))
    }

    pub fn as_ptr(&self) -> *const ITEMIDLIST {
        self.ptr
    }
}

impl Clone for Pidl {
    fn clone(&self) -> Pidl {
        let ptr = unsafe { ILClone(self.ptr) };
        assert!(!ptr.is_null(), "shell allocator failed to clone an id list");
        Pidl { ptr }
    }
}

impl Drop for Pidl {
    fn drop(&mut self) {
        unsafe { CoTaskMemFree(Some(self.ptr.cast())) };
    }
}

impl fmt::Debug for Pidl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pidl").field("ptr", &self.ptr).finish()
    }
}
