//! Trash placement: choosing a trash directory for a source path and
//! atomically moving the path into it.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use chrono::{Local, Timelike};

use super::TrashContext;
use super::dirsizes;
use super::trashinfo::{self, TrashInfo};
use super::volumes;
use crate::{Error, TrashOptions};

/// Where a payload/metadata pair is about to land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placement {
    /// Directory holding the `info/` and `files/` subdirectories.
    pub base: PathBuf,
    /// Mount point the recorded `Path=` is made relative to. `Some` exactly
    /// when a per-volume trash directory was selected.
    pub volume_root: Option<PathBuf>,
}

/// Move `source` into a trash directory chosen per `options`.
pub(crate) fn place(ctx: &TrashContext, source: &Path, options: TrashOptions) -> Result<(), Error> {
    if !source.is_absolute() {
        return Err(Error::InvalidArgument(source.to_owned()));
    }
    if fs::symlink_metadata(source).is_err() {
        return Err(Error::NotFound(source.to_owned()));
    }

    let placement = select_base(ctx, source, options)?;
    place_into(source, &placement)
}

/// Trash directory selection as an explicit decision table over the four
/// option bits: first successful base wins, otherwise the most recent
/// error propagates.
fn select_base(ctx: &TrashContext, source: &Path, options: TrashOptions) -> Result<Placement, Error> {
    let file_top = volumes::top_dir(source);
    let data_top = volumes::top_dir(&ctx.data_home);
    select_base_from_tops(ctx, options, file_top, data_top)
}

pub(super) fn select_base_from_tops(
    ctx: &TrashContext,
    options: TrashOptions,
    file_top: Option<PathBuf>,
    data_top: Option<PathBuf>,
) -> Result<Placement, Error> {
    let home = Placement {
        base: ctx.home_trash_dir(),
        volume_root: None,
    };

    if !options.contains(TrashOptions::USE_TOP_DIRS) {
        return Ok(home);
    }
    let Some(file_top) = file_top else {
        return Ok(home);
    };
    if Some(&file_top) == data_top.as_ref() {
        // source lives on the home volume
        return Ok(home);
    }

    let sticky = options.contains(TrashOptions::CHECK_STICKY_BIT);
    let attempt = match admin_trash_base(&file_top, ctx.uid, sticky) {
        Ok(base) => Ok(base),
        Err(err) if options.contains(TrashOptions::FALLBACK_TO_USER_DIR) => {
            tracing::warn!(
                topdir = %file_top.display(),
                error = %err,
                "admin trash directory unusable, trying the user directory",
            );
            user_trash_base(&file_top, ctx.uid)
        }
        Err(err) => Err(err),
    };

    match attempt {
        Ok(base) => Ok(Placement {
            base,
            volume_root: Some(file_top),
        }),
        Err(err) if options.contains(TrashOptions::FALLBACK_TO_HOME_DIR) => {
            tracing::warn!(
                topdir = %file_top.display(),
                error = %err,
                "per-volume trash unusable, falling back to the home trash",
            );
            Ok(home)
        }
        Err(err) => Err(err),
    }
}

/// Probe `$topdir/.Trash` with the trash spec's checks: it must exist,
/// must not be a symbolic link, must be a directory, and must carry the
/// sticky bit when `check_sticky` is set.
pub(crate) fn checked_admin_dir(top_dir: &Path, check_sticky: bool) -> Result<PathBuf, Error> {
    let admin_dir = top_dir.join(".Trash");
    let meta = fs::symlink_metadata(&admin_dir)
        .map_err(|_| Error::TopDirUnavailable(admin_dir.clone()))?;
    if meta.file_type().is_symlink() || !meta.file_type().is_dir() {
        return Err(Error::TopDirUnavailable(admin_dir));
    }
    if check_sticky && meta.mode() & u32::from(libc::S_ISVTX) == 0 {
        return Err(Error::TopDirUnavailable(admin_dir));
    }
    Ok(admin_dir)
}

/// `$topdir/.Trash/$uid`, created on demand once `.Trash` passes its checks.
pub(super) fn admin_trash_base(top_dir: &Path, uid: u32, check_sticky: bool) -> Result<PathBuf, Error> {
    let admin_dir = checked_admin_dir(top_dir, check_sticky)?;
    let base = admin_dir.join(uid.to_string());
    ensure_dir(&base).map_err(|_| Error::TopDirUnavailable(base.clone()))?;
    Ok(base)
}

/// `$topdir/.Trash-$uid`, created on demand.
pub(super) fn user_trash_base(top_dir: &Path, uid: u32) -> Result<PathBuf, Error> {
    let base = top_dir.join(format!(".Trash-{uid}"));
    ensure_dir(&base)?;
    Ok(base)
}

fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path).map_err(|err| Error::from_io(err, path))
}

/// Write the metadata and move the payload into the chosen trash directory.
///
/// The info file is created first, with exclusive semantics, which is what
/// arbitrates the leaf name between concurrent trashers; the payload rename
/// happens strictly after the name is claimed.
pub(crate) fn place_into(source: &Path, placement: &Placement) -> Result<(), Error> {
    let info_dir = placement.base.join("info");
    let files_dir = placement.base.join("files");
    ensure_dir(&info_dir)?;
    ensure_dir(&files_dir)?;

    let deleted_at = Local::now()
        .naive_local()
        .with_nanosecond(0)
        .expect("zero nanoseconds is always in range");
    let stored_path = match &placement.volume_root {
        Some(root) => source.strip_prefix(root).unwrap_or(source).to_path_buf(),
        None => source.to_path_buf(),
    };
    let info = TrashInfo {
        path: stored_path,
        deleted_at: Some(deleted_at),
    };
    let body = info.serialize();

    let basename = source
        .file_name()
        .ok_or_else(|| Error::InvalidArgument(source.to_owned()))?;
    let (leaf, info_file) = claim_entry(&info_dir, &files_dir, basename, &body)?;

    let payload = files_dir.join(&leaf);
    if let Err(err) = fs::rename(source, &payload) {
        // Do not leak the just-claimed info file to the next enumeration.
        remove_info_file(&info_file);
        return Err(Error::from_io(err, source));
    }

    let moved_dir = fs::symlink_metadata(&payload).is_ok_and(|meta| meta.is_dir());
    if moved_dir {
        dirsizes::record_directory(&placement.base, &leaf, &info_file);
    }
    Ok(())
}

/// Claim a free leaf name in this trash directory and write the metadata
/// under it.
///
/// Both sides of the pair are considered: the exclusive create on the info
/// file decides the winner between concurrent trashers, and the payload
/// path is probed as well because a previously failed rename can leave a
/// payload behind under an otherwise free info name.
fn claim_entry(
    info_dir: &Path,
    files_dir: &Path,
    basename: &OsStr,
    body: &str,
) -> Result<(OsString, PathBuf), Error> {
    for n in 0..u32::MAX {
        let leaf = numbered_leaf(basename, n);
        if fs::symlink_metadata(files_dir.join(&leaf)).is_ok() {
            continue;
        }
        let info_file = info_dir.join(trashinfo::info_file_name(&leaf));
        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o666)
            .open(&info_file);
        let mut file = match created {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(Error::from_io(err, &info_file)),
        };
        if let Err(err) = file.write_all(body.as_bytes()) {
            drop(file);
            remove_info_file(&info_file);
            return Err(Error::from_io(err, &info_file));
        }
        return Ok((leaf, info_file));
    }
    Err(Error::io(
        info_dir.display(),
        io::Error::new(io::ErrorKind::AlreadyExists, "trash entry names exhausted"),
    ))
}

/// `name` itself, then `stem 1.ext`, `stem 2.ext`, … with the counter
/// inserted before the extension (`name 1` when there is none).
fn numbered_leaf(basename: &OsStr, n: u32) -> OsString {
    if n == 0 {
        return basename.to_owned();
    }
    match (Path::new(basename).file_stem(), Path::new(basename).extension()) {
        (Some(stem), Some(ext)) => {
            let mut leaf = stem.to_os_string();
            leaf.push(format!(" {n}."));
            leaf.push(ext);
            leaf
        }
        _ => {
            let mut leaf = basename.to_os_string();
            leaf.push(format!(" {n}"));
            leaf
        }
    }
}

fn remove_info_file(info_file: &Path) {
    if let Err(err) = fs::remove_file(info_file) {
        tracing::warn!(info = %info_file.display(), error = %err, "failed to remove orphan trashinfo");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_leaves() {
        let leaf = |name: &str, n| numbered_leaf(OsStr::new(name), n);
        assert_eq!(leaf("foo.txt", 0), OsString::from("foo.txt"));
        assert_eq!(leaf("foo.txt", 1), OsString::from("foo 1.txt"));
        assert_eq!(leaf("foo.txt", 12), OsString::from("foo 12.txt"));
        assert_eq!(leaf("archive.tar.gz", 1), OsString::from("archive.tar 1.gz"));
        assert_eq!(leaf("noext", 1), OsString::from("noext 1"));
        assert_eq!(leaf(".bashrc", 2), OsString::from(".bashrc 2"));
    }
}
