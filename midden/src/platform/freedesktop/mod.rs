//! Trash can implementation for freedesktop.org compliant systems.
//!
//! Follows the Trash Can Specification: payloads live under
//! `base/files/NAME` with a matching `base/info/NAME.trashinfo`, where
//! `base` is the home trash (`$XDG_DATA_HOME/Trash`) or a per-volume
//! `.Trash/$uid` / `.Trash-$uid` directory.

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::platform::Platform;
use crate::{Error, TrashItem, TrashOptions};

mod dirsizes;
mod display;
mod enumerate;
mod ops;
mod placement;
mod trashinfo;
mod volumes;

#[cfg(test)]
mod tests;

pub use enumerate::Items;

pub struct FreedesktopPlatform;

/// Process environment snapshot the engines run against, resolved once at
/// the API boundary. Tests construct it directly instead of mutating the
/// process environment.
#[derive(Debug, Clone)]
pub(crate) struct TrashContext {
    /// Absolute `$XDG_DATA_HOME`, defaulting to `$HOME/.local/share`.
    pub data_home: PathBuf,
    /// User id used in the per-volume trash directory names.
    pub uid: u32,
}

impl TrashContext {
    fn from_env() -> Result<TrashContext, Error> {
        let data_home = match env::var_os("XDG_DATA_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = env::var_os("HOME")
                    .filter(|home| !home.is_empty())
                    .ok_or(Error::NotFound(PathBuf::from("$HOME")))?;
                PathBuf::from(home).join(".local").join("share")
            }
        };
        let data_home = if data_home.is_absolute() {
            data_home
        } else {
            let cwd = env::current_dir().map_err(|err| Error::io("current directory", err))?;
            cwd.join(data_home)
        };
        let uid = unsafe { libc::getuid() };
        Ok(TrashContext { data_home, uid })
    }

    pub fn home_trash_dir(&self) -> PathBuf {
        self.data_home.join("Trash")
    }
}

/// On-disk pair backing one enumerated item.
#[derive(Debug, Clone)]
pub struct ItemState {
    pub(crate) trashed_path: PathBuf,
    pub(crate) info_path: PathBuf,
}

/// Per-handle state. The backend needs no OS session, only the resolved
/// environment and the display-name cache.
pub struct Session {
    ctx: TrashContext,
    display_name: OnceCell<String>,
}

impl Platform for FreedesktopPlatform {
    type Session = Session;
    type ItemState = ItemState;
    type Items = Items;

    fn move_to_trash(path: &Path, options: TrashOptions) -> Result<(), Error> {
        let ctx = TrashContext::from_env()?;
        placement::place(&ctx, path, options)
    }

    fn session_open() -> Result<Session, Error> {
        Ok(Session {
            ctx: TrashContext::from_env()?,
            display_name: OnceCell::new(),
        })
    }

    fn items(session: &Session) -> Result<Items, Error> {
        Ok(Items::new(enumerate::discover_roots(&session.ctx)))
    }

    fn restore(_session: &Session, item: &TrashItem) -> Result<(), Error> {
        ops::restore(item)
    }

    fn erase(_session: &Session, item: &TrashItem) -> Result<(), Error> {
        ops::erase(item)
    }

    fn display_name(session: &Session) -> String {
        session
            .display_name
            .get_or_init(display::display_name)
            .clone()
    }
}
