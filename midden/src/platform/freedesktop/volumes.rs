//! Mount point resolution.

use std::ffi::OsString;
use std::fs;
use std::os::unix::ffi::OsStringExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
const MOUNT_TABLE: &str = "/proc/mounts";
#[cfg(not(target_os = "linux"))]
const MOUNT_TABLE: &str = "/etc/mtab";

/// Mount point of the filesystem containing `path`.
///
/// Walks towards the root comparing `lstat` device numbers; the first path
/// whose parent lives on a different device is the mount point. The result
/// is absolute whenever the input is.
pub(crate) fn top_dir(path: &Path) -> Option<PathBuf> {
    // The leaf itself may not exist yet, start from the closest ancestor
    // that does.
    let mut current = path.to_path_buf();
    let dev = loop {
        match fs::symlink_metadata(&current) {
            Ok(meta) => break meta.dev(),
            Err(_) => current = current.parent()?.to_path_buf(),
        }
    };

    loop {
        let Some(parent) = current.parent().map(Path::to_path_buf) else {
            // reached the filesystem root
            return Some(current);
        };
        let Ok(parent_meta) = fs::symlink_metadata(&parent) else {
            return Some(current);
        };
        if parent_meta.dev() != dev {
            return Some(current);
        }
        current = parent;
    }
}

/// Valid mount points from the OS mount table. Entries that cannot be read
/// or do not name an absolute mount point are skipped.
pub(crate) fn mounted_volumes() -> Vec<PathBuf> {
    match fs::read_to_string(MOUNT_TABLE) {
        Ok(table) => parse_mount_table(&table),
        Err(err) => {
            tracing::warn!(table = MOUNT_TABLE, error = %err, "cannot read mount table");
            Vec::new()
        }
    }
}

/// The second whitespace-separated field of every line, with the mount
/// table's octal escapes (`\040` for a space, etc.) decoded.
fn parse_mount_table(table: &str) -> Vec<PathBuf> {
    table
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = decode_octal_escapes(fields.next()?);
            mount_point.is_absolute().then_some(mount_point)
        })
        .collect()
}

fn decode_octal_escapes(field: &str) -> PathBuf {
    let bytes = field.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escape = bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if escape {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            decoded.push(value as u8);
            i += 4;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    PathBuf::from(OsString::from_vec(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_dir_of_root_is_root() {
        assert_eq!(top_dir(Path::new("/")), Some(PathBuf::from("/")));
    }

    #[test]
    fn top_dir_is_absolute_ancestor() {
        let temp = tempfile::TempDir::new().unwrap();
        let top = top_dir(temp.path()).unwrap();
        assert!(top.is_absolute());
        assert!(temp.path().starts_with(&top));
    }

    #[test]
    fn top_dir_tolerates_missing_leaf() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("not/created/yet");
        assert_eq!(top_dir(&missing), top_dir(temp.path()));
    }

    #[test]
    fn parses_mount_table_fields() {
        let table = "sysfs /sys sysfs rw 0 0\n\
                     /dev/sda1 / ext4 rw,relatime 0 0\n\
                     /dev/sdb1 /mnt/data ext4 rw 0 0\n\
                     short\n\
                     \n";
        let volumes = parse_mount_table(table);
        assert_eq!(
            volumes,
            vec![
                PathBuf::from("/sys"),
                PathBuf::from("/"),
                PathBuf::from("/mnt/data"),
            ]
        );
    }

    #[test]
    fn decodes_escaped_mount_points() {
        let table = "/dev/sdc1 /mnt/usb\\040stick vfat rw 0 0\nbroken relative-entry x 0 0\n";
        assert_eq!(parse_mount_table(table), vec![PathBuf::from("/mnt/usb stick")]);
    }
}
