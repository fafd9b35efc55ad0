//! macOS backend.
//!
//! The Finder trash is reached through two CoreServices calls resolved at
//! runtime with `dlopen`/`dlsym`, so nothing extra is linked. Only
//! placement is provided; enumerating or restoring Finder trash items has
//! no public API.

use std::ffi::{CString, c_int};
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use once_cell::sync::OnceCell;

use crate::platform::Platform;
use crate::{Error, TrashItem, TrashOptions};

mod syscalls;
mod types;

use types::{FSMoveObjectToTrashSyncFn, FSPathMakeRefWithOptionsFn, FSRef};

pub struct DarwinPlatform;

#[derive(Debug, Clone)]
pub struct ItemState;

pub struct Session;

/// `RTLD_LAZY` from `dlfcn.h`.
const RTLD_LAZY: c_int = 0x1;

const CORE_SERVICES: &str = "/System/Library/Frameworks/CoreServices.framework/CoreServices";

/// Do not resolve a symbolic link leaf when making the file reference.
const MAKE_REF_DO_NOT_FOLLOW_LEAF_SYMLINK: u32 = 0x01;

struct TrashFns {
    make_ref: FSPathMakeRefWithOptionsFn,
    move_to_trash: FSMoveObjectToTrashSyncFn,
}

// SAFETY: plain function pointers into a library that stays loaded for the
// life of the process.
unsafe impl Send for TrashFns {}
unsafe impl Sync for TrashFns {}

/// Resolve the CoreServices entry points, once per process.
fn trash_fns() -> Result<&'static TrashFns, Error> {
    static FNS: OnceCell<Option<TrashFns>> = OnceCell::new();
    let fns = FNS.get_or_init(|| {
        let library = CString::new(CORE_SERVICES).expect("no interior NUL");
        let handle = unsafe { syscalls::dlopen(library.as_ptr(), RTLD_LAZY) };
        if handle.is_null() {
            tracing::warn!(library = CORE_SERVICES, "dlopen failed");
            return None;
        }
        let make_ref = unsafe { syscalls::dlsym(handle, c"FSPathMakeRefWithOptions".as_ptr()) };
        let move_to_trash = unsafe { syscalls::dlsym(handle, c"FSMoveObjectToTrashSync".as_ptr()) };
        if make_ref.is_null() || move_to_trash.is_null() {
            tracing::warn!(library = CORE_SERVICES, "trash entry points missing");
            return None;
        }
        // SAFETY: signatures match the CoreServices headers for these
        // exact symbol names.
        unsafe {
            Some(TrashFns {
                make_ref: std::mem::transmute::<*mut std::ffi::c_void, FSPathMakeRefWithOptionsFn>(
                    make_ref,
                ),
                move_to_trash: std::mem::transmute::<
                    *mut std::ffi::c_void,
                    FSMoveObjectToTrashSyncFn,
                >(move_to_trash),
            })
        }
    });
    fns.as_ref().ok_or(Error::NotSupported)
}

fn os_status_error(status: i32, path: &Path) -> Error {
    Error::io(
        format!("CoreServices refused {}", path.display()),
        io::Error::from_raw_os_error(status),
    )
}

impl Platform for DarwinPlatform {
    type Session = Session;
    type ItemState = ItemState;
    type Items = std::iter::Empty<TrashItem>;

    fn move_to_trash(path: &Path, _options: TrashOptions) -> Result<(), Error> {
        if !path.is_absolute() {
            return Err(Error::InvalidArgument(path.to_owned()));
        }
        if fs::symlink_metadata(path).is_err() {
            return Err(Error::NotFound(path.to_owned()));
        }
        let fns = trash_fns()?;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| Error::InvalidArgument(path.to_owned()))?;
        let mut source = FSRef::zeroed();
        let status = unsafe {
            (fns.make_ref)(
                c_path.as_ptr().cast(),
                MAKE_REF_DO_NOT_FOLLOW_LEAF_SYMLINK,
                &mut source,
                std::ptr::null_mut(),
            )
        };
        if status != 0 {
            return Err(os_status_error(status, path));
        }

        let mut target = FSRef::zeroed();
        let status = unsafe { (fns.move_to_trash)(&source, &mut target, 0) };
        if status != 0 {
            return Err(os_status_error(status, path));
        }
        Ok(())
    }

    fn session_open() -> Result<Session, Error> {
        Ok(Session)
    }

    fn items(_session: &Session) -> Result<Self::Items, Error> {
        Err(Error::NotSupported)
    }

    fn restore(_session: &Session, _item: &TrashItem) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn erase(_session: &Session, _item: &TrashItem) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn display_name(_session: &Session) -> String {
        String::new()
    }
}
