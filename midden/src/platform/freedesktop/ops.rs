//! Restore and erase semantics for individual trashed items.

use std::fs;
use std::path::Path;

use super::dirsizes;
use crate::{Error, TrashItem};

/// Move the payload back to its original location.
///
/// The original parent directory is recreated first so restoration works
/// even when the tree the item came from is gone. The companion info file
/// is removed best-effort; failing to remove it never fails the restore.
pub(crate) fn restore(item: &TrashItem) -> Result<(), Error> {
    if let Some(parent) = item.restore_path().parent() {
        fs::create_dir_all(parent).map_err(|err| Error::from_io(err, parent))?;
    }
    fs::rename(&item.state.trashed_path, item.restore_path())
        .map_err(|err| Error::from_io(err, &item.state.trashed_path))?;
    remove_info_best_effort(&item.state.info_path);
    prune_dirsizes(item);
    Ok(())
}

/// Permanently delete the payload, recursively for directories.
pub(crate) fn erase(item: &TrashItem) -> Result<(), Error> {
    let trashed = &item.state.trashed_path;
    let meta = fs::symlink_metadata(trashed).map_err(|err| Error::from_io(err, trashed))?;
    if meta.is_dir() {
        fs::remove_dir_all(trashed).map_err(|err| Error::from_io(err, trashed))?;
    } else {
        fs::remove_file(trashed).map_err(|err| Error::from_io(err, trashed))?;
    }
    remove_info_best_effort(&item.state.info_path);
    prune_dirsizes(item);
    Ok(())
}

/// Keep the `directorysizes` cache in step once a directory payload left
/// the trash.
fn prune_dirsizes(item: &TrashItem) {
    if !item.is_dir() {
        return;
    }
    if let Some(base) = item.state.trashed_path.parent().and_then(Path::parent) {
        dirsizes::prune(base);
    }
}

fn remove_info_best_effort(info_path: &Path) {
    if let Err(err) = fs::remove_file(info_path) {
        tracing::warn!(info = %info_path.display(), error = %err, "failed to remove trashinfo file");
    }
}
