//! Maintenance of the `directorysizes` cache.
//!
//! A trash directory may carry a `directorysizes` file caching the
//! du-style size of every trashed directory, one
//! `<size> <mtime> <percent-encoded-name>` line each. The cache is kept
//! current on a best-effort basis only: failing to update it never fails
//! the trash operation that touched it.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use super::trashinfo;

const FILE_NAME: &str = "directorysizes";

/// Record a directory payload that just landed in `base/files/`.
pub(crate) fn record_directory(base: &Path, leaf: &OsStr, info_file: &Path) {
    if let Err(err) = rewrite(base, Some((leaf, info_file))) {
        tracing::debug!(base = %base.display(), error = %err, "directorysizes not updated");
    }
}

/// Drop entries whose payload is gone, after a restore or an erase.
pub(crate) fn prune(base: &Path) {
    if let Err(err) = rewrite(base, None) {
        tracing::debug!(base = %base.display(), error = %err, "directorysizes not pruned");
    }
}

/// Rewrite the cache: keep entries whose payload still exists, then append
/// the new one. The replacement file is staged inside `base` so the final
/// rename never crosses a mount.
fn rewrite(base: &Path, add: Option<(&OsStr, &Path)>) -> io::Result<()> {
    let cache = base.join(FILE_NAME);
    match fs::symlink_metadata(&cache) {
        Ok(meta) if !meta.is_file() => {
            return Err(io::Error::other("directorysizes is not a regular file"));
        }
        _ => {}
    }
    let existing = match fs::read_to_string(&cache) {
        Ok(body) => body,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };

    let files_dir = base.join("files");
    let mut lines = Vec::new();
    for line in existing.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[_, _, encoded] = fields.as_slice() else {
            continue;
        };
        let name = trashinfo::decode_leaf(encoded);
        if add.is_some_and(|(leaf, _)| leaf == name.as_os_str()) {
            // re-added below with a fresh size
            continue;
        }
        if files_dir.join(&name).is_dir() {
            lines.push(line.to_string());
        }
    }

    if let Some((leaf, info_file)) = add {
        let payload = files_dir.join(leaf);
        let meta = fs::symlink_metadata(&payload)?;
        if meta.is_dir() {
            let size = disk_usage(&payload)?;
            let mtime = fs::symlink_metadata(info_file)?.mtime();
            lines.push(format!("{size} {mtime} {}", trashinfo::encode_leaf(leaf)));
        }
    }

    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    let staged = base.join(format!(".{FILE_NAME}.{}", std::process::id()));
    fs::write(&staged, body)?;
    fs::rename(&staged, &cache)
}

/// `du -B1`-style usage: 512-byte blocks of the directory and everything
/// beneath it, symlinks counted as themselves and never followed.
fn disk_usage(path: &Path) -> io::Result<u64> {
    let meta = fs::symlink_metadata(path)?;
    let mut total = meta.blocks() * 512;
    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            total += disk_usage(&entry?.path())?;
        }
    }
    Ok(total)
}
