//! Stand-in platform for targets without a trash can implementation.

use std::path::Path;

use crate::platform::Platform;
use crate::{Error, TrashItem, TrashOptions};

pub struct TodoPlatform;

#[derive(Debug, Clone)]
pub struct ItemState;

impl Platform for TodoPlatform {
    type Session = ();
    type ItemState = ItemState;
    type Items = std::iter::Empty<TrashItem>;

    fn move_to_trash(_path: &Path, _options: TrashOptions) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn session_open() -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn items(_session: &()) -> Result<Self::Items, Error> {
        Err(Error::NotSupported)
    }

    fn restore(_session: &(), _item: &TrashItem) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn erase(_session: &(), _item: &TrashItem) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn display_name(_session: &()) -> String {
        String::new()
    }
}
