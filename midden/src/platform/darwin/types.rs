//! Types from the CoreServices File Manager.

/// Opaque file reference used by the File Manager.
#[repr(C)]
pub struct FSRef {
    hidden: [u8; 80],
}

impl FSRef {
    pub fn zeroed() -> FSRef {
        FSRef { hidden: [0; 80] }
    }
}

/// `OSStatus FSPathMakeRefWithOptions(const UInt8 *path, OptionBits options,
/// FSRef *ref, Boolean *isDirectory)`.
pub type FSPathMakeRefWithOptionsFn =
    unsafe extern "C" fn(*const u8, u32, *mut FSRef, *mut u8) -> i32;

/// `OSStatus FSMoveObjectToTrashSync(const FSRef *source, FSRef *target,
/// OptionBits options)`.
pub type FSMoveObjectToTrashSyncFn = unsafe extern "C" fn(*const FSRef, *mut FSRef, u32) -> i32;
