//! Lazy enumeration of trashed items across every reachable trash root.

use std::fs::{self, ReadDir};
use std::path::PathBuf;

use super::trashinfo;
use super::{ItemState, TrashContext, placement, volumes};
use crate::TrashItem;

/// One discovered trash directory: its base and the mount point relative
/// `Path=` values resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrashRoot {
    pub base: PathBuf,
    pub volume_root: PathBuf,
}

/// All trash roots reachable by the current user: the home trash plus the
/// admin and user trashes of every other mounted volume. Probes that fail
/// are skipped silently.
pub(crate) fn discover_roots(ctx: &TrashContext) -> Vec<TrashRoot> {
    let (home, home_volume) = home_root(ctx);
    let mut roots: Vec<TrashRoot> = home.into_iter().collect();
    let volumes: Vec<PathBuf> = volumes::mounted_volumes()
        .into_iter()
        .filter(|volume| Some(volume) != home_volume.as_ref())
        .collect();
    roots.extend(volume_roots(ctx, &volumes));
    roots
}

/// The home trash, when it exists, together with the volume holding it.
pub(super) fn home_root(ctx: &TrashContext) -> (Option<TrashRoot>, Option<PathBuf>) {
    let base = ctx.home_trash_dir();
    if !base.is_absolute() || !base.is_dir() {
        return (None, None);
    }
    let Some(volume_root) = volumes::top_dir(&base) else {
        return (None, None);
    };
    let root = TrashRoot {
        base,
        volume_root: volume_root.clone(),
    };
    (Some(root), Some(volume_root))
}

/// Existing per-volume trash directories on the given volumes. Both the
/// admin flavour (`.Trash/$uid`, once `.Trash` passes its checks) and the
/// user flavour (`.Trash-$uid`) are probed on every volume.
pub(super) fn volume_roots(ctx: &TrashContext, volumes: &[PathBuf]) -> Vec<TrashRoot> {
    let mut roots = Vec::new();
    for volume in volumes {
        if let Ok(admin_dir) = placement::checked_admin_dir(volume, true) {
            let base = admin_dir.join(ctx.uid.to_string());
            if base.is_dir() {
                roots.push(TrashRoot {
                    base,
                    volume_root: volume.clone(),
                });
            }
        }
        let user_base = volume.join(format!(".Trash-{}", ctx.uid));
        if user_base.is_dir() {
            roots.push(TrashRoot {
                base: user_base,
                volume_root: volume.clone(),
            });
        }
    }
    roots
}

/// Lazy iterator over trashed items.
///
/// State is explicit: the remaining roots plus the `info/` directory reader
/// of the root currently being drained. Per-entry failures are absorbed so
/// one bad entry cannot poison the iteration, and a root whose `info/`
/// cannot be listed yields nothing.
pub struct Items {
    roots: std::vec::IntoIter<TrashRoot>,
    current: Option<(TrashRoot, ReadDir)>,
}

impl Items {
    pub(crate) fn new(roots: Vec<TrashRoot>) -> Items {
        Items {
            roots: roots.into_iter(),
            current: None,
        }
    }
}

impl Iterator for Items {
    type Item = TrashItem;

    fn next(&mut self) -> Option<TrashItem> {
        loop {
            if let Some((root, entries)) = self.current.as_mut() {
                for entry in entries.by_ref() {
                    let Ok(entry) = entry else { continue };
                    if let Some(item) = materialize(root, entry.file_name()) {
                        return Some(item);
                    }
                }
                self.current = None;
            }

            let root = self.roots.next()?;
            match fs::read_dir(root.base.join("info")) {
                Ok(entries) => self.current = Some((root, entries)),
                Err(err) => {
                    tracing::debug!(base = %root.base.display(), error = %err, "skipping unlistable trash root");
                }
            }
        }
    }
}

/// Turn one `info/` directory entry into an item, or `None` when the entry
/// is not a well-formed trashinfo/payload pair.
fn materialize(root: &TrashRoot, info_name: std::ffi::OsString) -> Option<TrashItem> {
    let leaf = trashinfo::payload_leaf(&info_name)?;
    let trashed_path = root.base.join("files").join(&leaf);
    // A payload-less info file is a trashing still in progress (or an
    // orphan); either way it is not an item yet.
    let meta = fs::symlink_metadata(&trashed_path).ok()?;

    let info_path = root.base.join("info").join(&info_name);
    let info = trashinfo::read_info_file(&info_path).ok()?;

    let restore_path = if info.path.is_absolute() {
        info.path
    } else {
        root.volume_root.join(info.path)
    };

    Some(TrashItem {
        restore_path,
        deleted_at: info.deleted_at,
        is_dir: meta.is_dir(),
        state: ItemState {
            trashed_path,
            info_path,
        },
    })
}
