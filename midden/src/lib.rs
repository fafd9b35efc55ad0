//! A user-visible trash can over the native facilities of the host OS.
//!
//! On freedesktop systems this implements the Trash Can Specification
//! directly; on Windows it drives the recycle bin through the Shell; on
//! macOS it hands files to the Finder trash.

pub mod platform;


use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use platform::{Platform, TrashPlatform};

/// Errors that can be returned from trash can operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The given path is not absolute.
    #[error("path is not absolute: {}", .0.display())]
    InvalidArgument(PathBuf),
    /// The path does not exist.
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),
    /// A required directory or file could not be created or written.
    #[error("permission denied: {}", .0.display())]
    AccessDenied(PathBuf),
    /// The volume's `.Trash` directory failed the trash spec's checks and
    /// no fallback was allowed.
    #[error("per-volume trash directory is unusable: {}", .0.display())]
    TopDirUnavailable(PathBuf),
    /// Metadata for a trashed item is unreadable or incomplete.
    #[error("corrupt trash metadata: {}", .0.display())]
    Corrupt(PathBuf),
    /// The platform has no trash can implementation.
    #[error("trash can is not supported on this platform")]
    NotSupported,
    /// An underlying syscall or COM call failed.
    #[error("{context}: {source}")]
    Io {
        context: Box<str>,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io<C: fmt::Display>(context: C, source: io::Error) -> Self {
        Error::Io {
            context: context.to_string().into(),
            source,
        }
    }

    /// Classify an [`io::Error`] raised while operating on `path`.
    pub(crate) fn from_io(source: io::Error, path: &Path) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_owned()),
            io::ErrorKind::PermissionDenied => Error::AccessDenied(path.to_owned()),
            _ => Error::io(path.display(), source),
        }
    }

    /// Numeric code of the underlying OS or COM failure, if there is one.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Switches controlling where the freedesktop backend may place a
    /// trashed file. The bits are independent; other backends ignore them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TrashOptions: u32 {
        /// Consider per-volume trash directories at all.
        const USE_TOP_DIRS = 1 << 0;
        /// Require the sticky bit on `$topdir/.Trash`.
        const CHECK_STICKY_BIT = 1 << 1;
        /// Fall back to `$topdir/.Trash-$uid` when the administrator
        /// provided trash directory fails its checks.
        const FALLBACK_TO_USER_DIR = 1 << 2;
        /// Fall back to the home trash when both per-volume attempts fail.
        const FALLBACK_TO_HOME_DIR = 1 << 3;
    }
}

impl Default for TrashOptions {
    fn default() -> Self {
        TrashOptions::all()
    }
}

/// An entry in the trash can.
///
/// Items are produced by [`Trashcan::items`] and stay valid until the
/// payload behind them is restored or erased.
#[derive(Debug, Clone)]
pub struct TrashItem {
    pub(crate) restore_path: PathBuf,
    pub(crate) deleted_at: Option<NaiveDateTime>,
    pub(crate) is_dir: bool,
    pub(crate) state: platform::ItemStateType,
}

impl TrashItem {
    /// Absolute path the item was trashed from, and would be restored to.
    pub fn restore_path(&self) -> &Path {
        &self.restore_path
    }

    /// Local wall-clock time the item was trashed, at second granularity.
    ///
    /// `None` when the recorded timestamp was missing or unparseable.
    pub fn deleted_at(&self) -> Option<NaiveDateTime> {
        self.deleted_at
    }

    /// Whether the trashed payload is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

/// Handle to the platform's trash can.
///
/// Owns whatever session state the backend needs (a COM apartment and a
/// bound shell folder on Windows, nothing on freedesktop) and releases it
/// on drop.
pub struct Trashcan {
    session: platform::SessionType,
}

impl Trashcan {
    pub fn new() -> Result<Trashcan, Error> {
        let session = TrashPlatform::session_open()?;
        Ok(Trashcan { session })
    }

    /// Lazily enumerate every trashed item reachable by the current user.
    pub fn items(&self) -> Result<platform::ItemsType, Error> {
        TrashPlatform::items(&self.session)
    }

    /// True when enumeration yields nothing.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.items()?.next().is_none())
    }

    /// Move `item` back to the location it was trashed from, recreating
    /// parent directories as needed.
    pub fn restore(&self, item: &TrashItem) -> Result<(), Error> {
        TrashPlatform::restore(&self.session, item)
    }

    /// Permanently delete `item` from the trash can.
    pub fn erase(&self, item: &TrashItem) -> Result<(), Error> {
        TrashPlatform::erase(&self.session, item)
    }

    /// Human readable, possibly localized, name of the trash can.
    ///
    /// Empty when the platform provides none. Cached after the first call.
    pub fn display_name(&self) -> String {
        TrashPlatform::display_name(&self.session)
    }
}

/// Move `path` into the trash can with the default [`TrashOptions`].
///
/// `path` must be absolute and must exist. On success the original path is
/// gone and the payload, together with whatever metadata the platform
/// keeps, lives in the selected trash directory.
pub fn move_to_trash<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    move_to_trash_with(path, TrashOptions::default())
}

/// Move `path` into the trash can.
pub fn move_to_trash_with<P: AsRef<Path>>(path: P, options: TrashOptions) -> Result<(), Error> {
    TrashPlatform::move_to_trash(path.as_ref(), options)
}
