//! Abstract interface for a specific platform's trash can, e.g.
//! `freedesktop`, `windows`.

use std::fmt;
use std::path::Path;

use crate::{Error, TrashItem, TrashOptions};

/// Platform specific trash can operations.
///
/// Exactly one implementation is selected at build time and re-exported as
/// [`TrashPlatform`]; the facade in the crate root goes through that alias
/// only.
pub trait Platform {
    /// Session state owned by a [`Trashcan`] handle for its lifetime.
    ///
    /// [`Trashcan`]: crate::Trashcan
    type Session;

    /// Backend data carried by every enumerated [`TrashItem`].
    type ItemState: Clone + fmt::Debug;

    /// Lazy item stream produced by [`Platform::items`].
    type Items: Iterator<Item = TrashItem>;

    /// Move an absolute, existing path into the trash can.
    fn move_to_trash(path: &Path, options: TrashOptions) -> Result<(), Error>;

    /// Acquire whatever process or thread state the backend needs.
    fn session_open() -> Result<Self::Session, Error>;

    /// Enumerate all trashed items reachable by the current user.
    fn items(session: &Self::Session) -> Result<Self::Items, Error>;

    /// Move a trashed item back to its original location.
    fn restore(session: &Self::Session, item: &TrashItem) -> Result<(), Error>;

    /// Permanently delete a trashed item.
    fn erase(session: &Self::Session, item: &TrashItem) -> Result<(), Error>;

    /// Human readable name of the trash can, empty when there is none.
    fn display_name(session: &Self::Session) -> String;
}

cfg_if::cfg_if! {
    if #[cfg(all(unix, not(target_os = "macos")))] {
        mod freedesktop;
        pub use freedesktop::FreedesktopPlatform as TrashPlatform;
    } else if #[cfg(windows)] {
        mod windows;
        pub use self::windows::WindowsPlatform as TrashPlatform;
    } else if #[cfg(target_os = "macos")] {
        mod darwin;
        pub use darwin::DarwinPlatform as TrashPlatform;
    } else {
        mod todo;
        pub use todo::TodoPlatform as TrashPlatform;
    }
}

/// Session state of the selected platform.
pub type SessionType = <TrashPlatform as Platform>::Session;
/// Item payload of the selected platform.
pub type ItemStateType = <TrashPlatform as Platform>::ItemState;
/// Item iterator of the selected platform.
pub type ItemsType = <TrashPlatform as Platform>::Items;
