//! Windows backend: the recycle bin driven through the Shell namespace.
//!
//! A session owns a single-threaded COM apartment and the recycle-bin
//! folder bound as `IShellFolder2`. Placement goes through the classic
//! `SHFileOperationW` delete-with-undo; enumeration walks the folder's
//! children; restore and erase run as `IFileOperation` verbs.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use windows::Win32::Foundation::{HWND, S_OK, SYSTEMTIME};
use windows::Win32::System::Com::{
    CLSCTX_ALL, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx, CoUninitialize,
};
use windows::Win32::System::Ole::{VarDateFromStr, VariantTimeToSystemTime};
use windows::Win32::UI::Shell::Common::{ITEMIDLIST, SHELLDETAILS, STRRET};
use windows::Win32::UI::Shell::{
    FileOperation, IEnumIDList, IFileOperation, IShellFolder, IShellFolder2, IShellItem,
    SHCreateItemFromIDList, SHCreateShellItem, SHFILEOPSTRUCTW, SHFileOperationW, SHGDN_NORMAL,
    SHGetDesktopFolder, SHGetSpecialFolderLocation, StrRetToBufW,
};
use windows::core::{Interface, PCWSTR};

use crate::platform::Platform;
use crate::{Error, TrashItem, TrashOptions};

mod pidl;
mod types;

use pidl::Pidl;
use types::column;

pub struct WindowsPlatform;

/// Identifier list backing one enumerated item. Clones own their own copy
/// of the list, so an item stays usable while iteration continues.
#[derive(Debug, Clone)]
pub struct ItemState {
    pidl: Pidl,
}

/// Scoped ownership of the thread's COM apartment.
///
/// `CoInitializeEx` is reference counted per thread; a second handle on the
/// same thread gets `S_FALSE`, which is a success and is balanced by the
/// `CoUninitialize` in drop just the same.
struct ComApartment;

impl ComApartment {
    fn initialize() -> Result<ComApartment, Error> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr.is_err() {
            return Err(com_error("initializing the COM apartment", hr.into()));
        }
        Ok(ComApartment)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

/// Session state: the bound recycle-bin folder and its display name.
pub struct Session {
    // field order matters: the folder reference must release before the
    // apartment uninitializes
    recycle_bin: IShellFolder2,
    display_name: String,
    _apartment: ComApartment,
}

impl Platform for WindowsPlatform {
    type Session = Session;
    type ItemState = ItemState;
    type Items = Items;

    fn move_to_trash(path: &Path, _options: TrashOptions) -> Result<(), Error> {
        if !path.is_absolute() {
            return Err(Error::InvalidArgument(path.to_owned()));
        }
        if fs::symlink_metadata(path).is_err() {
            return Err(Error::NotFound(path.to_owned()));
        }

        // the API takes a list of paths, each NUL terminated, ending with
        // an extra NUL
        let from: Vec<u16> = path.as_os_str().encode_wide().chain([0, 0]).collect();
        let mut op = SHFILEOPSTRUCTW {
            wFunc: types::FO_DELETE,
            pFrom: PCWSTR(from.as_ptr()),
            fFlags: types::FOF_SILENT
                | types::FOF_NOCONFIRMATION
                | types::FOF_NOERRORUI
                | types::FOF_NOCONFIRMMKDIR
                | types::FOF_ALLOWUNDO,
            ..Default::default()
        };
        let code = unsafe { SHFileOperationW(&mut op) };
        if code != 0 {
            return Err(Error::io(
                format!("moving {} to the recycle bin", path.display()),
                io::Error::from_raw_os_error(code),
            ));
        }
        Ok(())
    }

    fn session_open() -> Result<Session, Error> {
        let apartment = ComApartment::initialize()?;
        unsafe {
            let desktop = SHGetDesktopFolder()
                .map_err(|err| com_error("binding the desktop folder", err))?;
            let bin_pidl = SHGetSpecialFolderLocation(None, types::CSIDL_BITBUCKET)
                .map_err(|err| com_error("locating the recycle bin", err))?;
            let bin_pidl = Pidl::from_raw(bin_pidl);

            let mut raw = std::ptr::null_mut();
            desktop
                .BindToObject(bin_pidl.as_ptr(), None, &IShellFolder2::IID, &mut raw)
                .map_err(|err| com_error("binding the recycle bin folder", err))?;
            let recycle_bin = IShellFolder2::from_raw(raw);

            let display_name =
                display_name_of(&desktop, bin_pidl.as_ptr()).unwrap_or_default();

            Ok(Session {
                recycle_bin,
                display_name,
                _apartment: apartment,
            })
        }
    }

    fn items(session: &Session) -> Result<Items, Error> {
        let mut enumerator: Option<IEnumIDList> = None;
        unsafe {
            session
                .recycle_bin
                .EnumObjects(
                    HWND::default(),
                    types::SHCONTF_FOLDERS | types::SHCONTF_NONFOLDERS | types::SHCONTF_INCLUDEHIDDEN,
                    &mut enumerator,
                )
                .ok()
                .map_err(|err| com_error("enumerating the recycle bin", err))?;
        }
        Ok(Items {
            folder: session.recycle_bin.clone(),
            enumerator,
        })
    }

    fn restore(session: &Session, item: &TrashItem) -> Result<(), Error> {
        let restore_path = item.restore_path();
        let parent = restore_path
            .parent()
            .ok_or_else(|| Error::InvalidArgument(restore_path.to_owned()))?;
        let name: Vec<u16> = restore_path
            .file_name()
            .ok_or_else(|| Error::InvalidArgument(restore_path.to_owned()))?
            .encode_wide()
            .chain([0])
            .collect();

        unsafe {
            let source: IShellItem =
                SHCreateShellItem(None, &session.recycle_bin, item.state.pidl.as_ptr())
                    .map_err(|err| com_error("opening the trashed item", err))?;
            let parent_pidl = Pidl::from_path(parent)?;
            let mut raw = std::ptr::null_mut();
            SHCreateItemFromIDList(parent_pidl.as_ptr(), &IShellItem::IID, &mut raw)
                .map_err(|err| com_error("opening the restore directory", err))?;
            let destination = IShellItem::from_raw(raw);

            let op: IFileOperation = CoCreateInstance(&FileOperation, None, CLSCTX_ALL)
                .map_err(|err| com_error("creating the file operation", err))?;
            op.SetOperationFlags(types::FOFX_QUIET)
                .map_err(|err| com_error("configuring the file operation", err))?;
            op.MoveItem(&source, &destination, PCWSTR(name.as_ptr()), None)
                .map_err(|err| com_error("scheduling the restore", err))?;
            op.PerformOperations()
                .map_err(|err| com_error(format!("restoring {}", restore_path.display()), err))?;
        }
        Ok(())
    }

    fn erase(session: &Session, item: &TrashItem) -> Result<(), Error> {
        unsafe {
            let source: IShellItem =
                SHCreateShellItem(None, &session.recycle_bin, item.state.pidl.as_ptr())
                    .map_err(|err| com_error("opening the trashed item", err))?;
            let op: IFileOperation = CoCreateInstance(&FileOperation, None, CLSCTX_ALL)
                .map_err(|err| com_error("creating the file operation", err))?;
            op.SetOperationFlags(types::FOFX_QUIET)
                .map_err(|err| com_error("configuring the file operation", err))?;
            op.DeleteItem(&source, None)
                .map_err(|err| com_error("scheduling the delete", err))?;
            op.PerformOperations().map_err(|err| {
                com_error(format!("erasing {}", item.restore_path().display()), err)
            })?;
        }
        Ok(())
    }

    fn display_name(session: &Session) -> String {
        session.display_name.clone()
    }
}

/// Lazy iterator over the recycle bin's children. Owns its own folder
/// reference, so the COM objects stay alive for as long as any item does.
pub struct Items {
    folder: IShellFolder2,
    enumerator: Option<IEnumIDList>,
}

impl Iterator for Items {
    type Item = TrashItem;

    fn next(&mut self) -> Option<TrashItem> {
        let enumerator = self.enumerator.as_ref()?;
        loop {
            let mut raw = [std::ptr::null_mut(); 1];
            let mut fetched = 0u32;
            let hr = unsafe { enumerator.Next(&mut raw, Some(&mut fetched as *mut u32)) };
            if hr != S_OK || fetched == 0 || raw[0].is_null() {
                return None;
            }
            let pidl = Pidl::from_raw(raw[0]);
            // entries we cannot read details for are skipped
            if let Some(item) = materialize(&self.folder, pidl) {
                return Some(item);
            }
        }
    }
}

/// Assemble a [`TrashItem`] from the folder's detail columns.
fn materialize(folder: &IShellFolder2, pidl: Pidl) -> Option<TrashItem> {
    let mut name = detail(folder, pidl.as_ptr(), column::NAME)?;
    // some systems strip the extension from the display name
    if let Some(ext) = detail(folder, pidl.as_ptr(), column::EXTENSION) {
        if !ext.is_empty() && !name.to_lowercase().ends_with(&ext.to_lowercase()) {
            name.push_str(&ext);
        }
    }
    let original_dir = detail(folder, pidl.as_ptr(), column::ORIGINAL_LOCATION)?;
    if original_dir.is_empty() {
        return None;
    }
    let restore_path = PathBuf::from(original_dir).join(&name);

    let deleted_at =
        detail(folder, pidl.as_ptr(), column::DELETED_AT).and_then(|raw| parse_locale_date(&raw));

    let mut attributes = types::SFGAO_FOLDER;
    let is_dir = unsafe { folder.GetAttributesOf(&[pidl.as_ptr()], &mut attributes) }.is_ok()
        && attributes & types::SFGAO_FOLDER != 0;

    Some(TrashItem {
        restore_path,
        deleted_at,
        is_dir,
        state: ItemState { pidl },
    })
}

/// One detail column of `pidl` as a string, `None` when the folder cannot
/// produce it.
fn detail(folder: &IShellFolder2, pidl: *const ITEMIDLIST, column: u32) -> Option<String> {
    unsafe {
        let mut details = SHELLDETAILS::default();
        folder.GetDetailsOf(Some(pidl), column, &mut details).ok()?;
        strret_to_string(&mut details.str, pidl)
    }
}

fn display_name_of(folder: &IShellFolder, pidl: *const ITEMIDLIST) -> Option<String> {
    unsafe {
        let mut ret = STRRET::default();
        folder.GetDisplayNameOf(Some(pidl), SHGDN_NORMAL, &mut ret).ok()?;
        strret_to_string(&mut ret, pidl)
    }
}

fn strret_to_string(ret: &mut STRRET, pidl: *const ITEMIDLIST) -> Option<String> {
    let mut buffer = [0u16; 1024];
    unsafe { StrRetToBufW(ret, Some(pidl), &mut buffer) }.ok()?;
    let len = buffer.iter().position(|&unit| unit == 0).unwrap_or(buffer.len());
    Some(String::from_utf16_lossy(&buffer[..len]))
}

/// The shell formats deletion times for the user's locale and embeds
/// directional marks in them; strip the marks and let the COM date
/// routines do the locale-aware parse.
fn parse_locale_date(raw: &str) -> Option<NaiveDateTime> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !types::DIRECTIONAL_MARKS.contains(c))
        .collect();
    let wide: Vec<u16> = OsStr::new(cleaned.trim())
        .encode_wide()
        .chain([0])
        .collect();

    let date = unsafe { VarDateFromStr(PCWSTR(wide.as_ptr()), types::LOCALE_USER_DEFAULT, 0) }.ok()?;
    let mut st = SYSTEMTIME::default();
    if unsafe { VariantTimeToSystemTime(date, &mut st) } == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(i32::from(st.wYear), u32::from(st.wMonth), u32::from(st.wDay))?
        .and_hms_opt(u32::from(st.wHour), u32::from(st.wMinute), u32::from(st.wSecond))
}

fn com_error<C: std::fmt::Display>(context: C, err: windows::core::Error) -> Error {
    Error::io(context, io::Error::from_raw_os_error(err.code().0))
}
