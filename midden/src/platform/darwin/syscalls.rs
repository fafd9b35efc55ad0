//! Dynamic loader calls used to reach CoreServices.

use std::ffi::{c_char, c_int, c_void};

unsafe extern "C" {
    /// Load a dynamic library into the process, returning an opaque handle.
    pub unsafe fn dlopen(filename: *const c_char, flag: c_int) -> *mut c_void;

    /// Resolve a symbol from a loaded library.
    pub unsafe fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
}
