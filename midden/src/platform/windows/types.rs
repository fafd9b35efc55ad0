//! Shell constants used by the Windows backend.
//!
//! Values are from `shellapi.h` / `shlobj.h`; kept local so the flag types
//! line up with the struct fields and COM methods that consume them.

/// The recycle bin special folder.
pub const CSIDL_BITBUCKET: i32 = 0x000a;

/// Delete operation for `SHFileOperationW`.
pub const FO_DELETE: u32 = 0x0003;

/// Don't show progress UI.
pub const FOF_SILENT: u16 = 0x0004;
/// Don't ask the user to confirm.
pub const FOF_NOCONFIRMATION: u16 = 0x0010;
/// Delete to the recycle bin instead of permanently.
pub const FOF_ALLOWUNDO: u16 = 0x0040;
/// Don't ask before creating a destination directory.
pub const FOF_NOCONFIRMMKDIR: u16 = 0x0200;
/// Don't show error UI.
pub const FOF_NOERRORUI: u16 = 0x0400;

/// `IFileOperation` wants the same flags as a 32-bit quantity.
pub const FOFX_QUIET: u32 =
    (FOF_NOCONFIRMATION | FOF_NOERRORUI | FOF_SILENT) as u32;

/// Include subfolders when enumerating.
pub const SHCONTF_FOLDERS: u32 = 0x0020;
/// Include non-folder items when enumerating.
pub const SHCONTF_NONFOLDERS: u32 = 0x0040;
/// Include hidden items when enumerating.
pub const SHCONTF_INCLUDEHIDDEN: u32 = 0x0080;

/// Attribute bit reported for folder items.
pub const SFGAO_FOLDER: u32 = 0x2000_0000;

/// Use the user's default locale with the `VarDateFromStr` routine.
pub const LOCALE_USER_DEFAULT: u32 = 0x0400;

/// Detail columns of the recycle-bin shell folder.
pub mod column {
    /// Display name of the item.
    pub const NAME: u32 = 0;
    /// Directory the item was deleted from.
    pub const ORIGINAL_LOCATION: u32 = 1;
    /// Deletion time, formatted for the user's locale.
    pub const DELETED_AT: u32 = 2;
    /// File extension, stripped from the display name on some systems.
    pub const EXTENSION: u32 = 166;
}

/// Directional formatting marks the shell embeds in locale dates.
pub const DIRECTIONAL_MARKS: [char; 2] = ['\u{200e}', '\u{200f}'];
