//! Reading and writing `.trashinfo` metadata files.
//!
//! The format is a tiny INI dialect fixed by the Trash Can Specification:
//! one `[Trash Info]` group holding a URL-encoded `Path=` and a local-time
//! `DeletionDate=`. Writers emit exactly that; readers are lenient and
//! tolerate comments, unknown groups and unknown keys.

use std::ffi::OsString;
use std::fs;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::Error;

/// Suffix of every metadata file under `info/`.
pub(crate) const FILE_SUFFIX: &str = ".trashinfo";

const GROUP_HEADER: &str = "[Trash Info]";
const PATH_KEY: &str = "Path";
const DATE_KEY: &str = "DeletionDate";

/// ISO-8601 extended form at second precision, e.g. `2024-03-14T09:15:22`.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Bytes escaped in `Path=` values: everything outside the RFC 3986
/// unreserved set. `/` stays literal so the value still reads as a path.
const PATH_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Contents of one `info/NAME.trashinfo` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrashInfo {
    /// Restore path: absolute for home-trash items, relative to the volume
    /// root for per-volume items.
    pub path: PathBuf,
    /// Local deletion time, `None` when missing or unparseable.
    pub deleted_at: Option<NaiveDateTime>,
}

impl TrashInfo {
    /// Render the file body, trailing newline included.
    pub fn serialize(&self) -> String {
        let encoded = percent_encode(self.path.as_os_str().as_bytes(), PATH_ESCAPES);
        let date = self
            .deleted_at
            .map(|at| at.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        format!("{GROUP_HEADER}\n{PATH_KEY}={encoded}\n{DATE_KEY}={date}\n")
    }

    /// Lenient parse. Only the `[Trash Info]` group is recognised and the
    /// scan stops once that group ends; `#` comments and unknown keys are
    /// skipped. Returns `None` when the mandatory `Path` key is missing or
    /// empty.
    pub fn parse(body: &str) -> Option<TrashInfo> {
        let mut in_group = false;
        let mut path: Option<PathBuf> = None;
        let mut deleted_at = None;

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                if in_group {
                    // the group we care about is over
                    break;
                }
                in_group = line == GROUP_HEADER;
                continue;
            }
            if !in_group {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim_end() {
                PATH_KEY => {
                    let bytes: Vec<u8> = percent_decode_str(value).collect();
                    if !bytes.is_empty() {
                        path = Some(PathBuf::from(OsString::from_vec(bytes)));
                    }
                }
                DATE_KEY => {
                    deleted_at = NaiveDateTime::parse_from_str(value, DATE_FORMAT).ok();
                }
                _ => {}
            }
        }

        path.map(|path| TrashInfo { path, deleted_at })
    }
}

/// Read and parse one info file.
///
/// Unreadable content or a missing mandatory `Path` key is reported as
/// [`Error::Corrupt`]; enumeration swallows the error, an explicit caller
/// sees it.
pub(crate) fn read_info_file(path: &Path) -> Result<TrashInfo, Error> {
    let body = fs::read_to_string(path).map_err(|_| Error::Corrupt(path.to_owned()))?;
    TrashInfo::parse(&body).ok_or_else(|| Error::Corrupt(path.to_owned()))
}

/// Percent-encode a payload leaf name the way `Path=` values are encoded.
pub(crate) fn encode_leaf(leaf: &std::ffi::OsStr) -> String {
    percent_encode(leaf.as_bytes(), PATH_ESCAPES).to_string()
}

/// Inverse of [`encode_leaf`].
pub(crate) fn decode_leaf(encoded: &str) -> OsString {
    OsString::from_vec(percent_decode_str(encoded).collect())
}

/// `NAME.trashinfo` for a payload leaf called `NAME`.
pub(crate) fn info_file_name(leaf: &std::ffi::OsStr) -> OsString {
    let mut name = leaf.to_os_string();
    name.push(FILE_SUFFIX);
    name
}

/// Payload leaf for an `info/` directory entry, or `None` when the entry is
/// not a `.trashinfo` file.
pub(crate) fn payload_leaf(info_name: &std::ffi::OsStr) -> Option<OsString> {
    let bytes = info_name.as_bytes();
    let stem = bytes.strip_suffix(FILE_SUFFIX.as_bytes())?;
    if stem.is_empty() {
        return None;
    }
    Some(OsString::from_vec(stem.to_vec()))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn date(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn serialize_plain_path() {
        let info = TrashInfo {
            path: PathBuf::from("/home/u/.local/share/foo.txt"),
            deleted_at: Some(date("2024-03-14T09:15:22")),
        };
        assert_eq!(
            info.serialize(),
            "[Trash Info]\nPath=/home/u/.local/share/foo.txt\nDeletionDate=2024-03-14T09:15:22\n"
        );
    }

    #[test]
    fn serialize_escapes_awkward_bytes() {
        let info = TrashInfo {
            path: PathBuf::from("/tmp/with space/50%.txt"),
            deleted_at: Some(date("2024-01-01T00:00:00")),
        };
        let body = info.serialize();
        assert!(body.contains("Path=/tmp/with%20space/50%25.txt"), "{body}");
    }

    #[test]
    fn round_trips_through_encoding() {
        for name in ["plain", "with space", "per%cent", "new\nline", "naïve ütf"] {
            let info = TrashInfo {
                path: PathBuf::from("/mnt/data").join(name),
                deleted_at: Some(date("2024-06-01T12:00:00")),
            };
            let parsed = TrashInfo::parse(&info.serialize()).unwrap();
            assert_eq!(parsed, info);
        }
    }

    #[test]
    fn parse_tolerates_noise() {
        let body = "# created by someone else\n\n[Unknown Group]\nPath=/bogus\n\
                    [Trash Info]\nUnknownKey=1\nPath=/real/path\nDeletionDate=2023-11-05T08:30:00\n\
                    [Another]\nPath=/also/bogus";
        let parsed = TrashInfo::parse(body).unwrap();
        assert_eq!(parsed.path, PathBuf::from("/real/path"));
        assert_eq!(parsed.deleted_at, Some(date("2023-11-05T08:30:00")));
    }

    #[test]
    fn parse_accepts_missing_trailing_newline() {
        let parsed = TrashInfo::parse("[Trash Info]\nPath=/x\nDeletionDate=2023-01-01T01:02:03").unwrap();
        assert_eq!(parsed.path, PathBuf::from("/x"));
    }

    #[test]
    fn parse_keeps_item_on_bad_date() {
        let parsed = TrashInfo::parse("[Trash Info]\nPath=/x\nDeletionDate=yesterday\n").unwrap();
        assert_eq!(parsed.deleted_at, None);
    }

    #[test]
    fn parse_rejects_missing_path() {
        assert!(TrashInfo::parse("[Trash Info]\nDeletionDate=2023-01-01T01:02:03\n").is_none());
        assert!(TrashInfo::parse("[Trash Info]\nPath=\n").is_none());
        assert!(TrashInfo::parse("Path=/no/group\n").is_none());
    }

    #[test]
    fn parse_relative_path_stays_relative() {
        let parsed = TrashInfo::parse("[Trash Info]\nPath=bar/baz\n").unwrap();
        assert!(parsed.path.is_relative());
        assert_eq!(parsed.path, PathBuf::from("bar/baz"));
    }

    #[test]
    fn read_info_file_reports_corrupt() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("gone.trashinfo");
        assert!(matches!(read_info_file(&missing), Err(Error::Corrupt(_))));

        let pathless = temp.path().join("pathless.trashinfo");
        fs::write(&pathless, "[Trash Info]\nDeletionDate=2024-01-01T00:00:00\n").unwrap();
        assert!(matches!(read_info_file(&pathless), Err(Error::Corrupt(_))));
    }

    #[test]
    fn info_names() {
        assert_eq!(info_file_name(OsStr::new("foo.txt")), OsString::from("foo.txt.trashinfo"));
        assert_eq!(payload_leaf(OsStr::new("foo.txt.trashinfo")), Some(OsString::from("foo.txt")));
        assert_eq!(payload_leaf(OsStr::new("foo.txt")), None);
        assert_eq!(payload_leaf(OsStr::new(".trashinfo")), None);
    }
}
