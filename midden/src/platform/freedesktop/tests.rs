use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::enumerate::{self, Items, TrashRoot};
use super::placement::{self, Placement};
use super::trashinfo::TrashInfo;
use super::{TrashContext, ops};
use crate::{Error, TrashItem, TrashOptions};

const UID: u32 = 1000;

fn context(temp: &TempDir) -> TrashContext {
    TrashContext {
        data_home: temp.path().join("data"),
        uid: UID,
    }
}

fn write_file(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn chmod(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Items of the home trash only, so tests never scan the real mount table.
fn home_items(ctx: &TrashContext) -> Vec<TrashItem> {
    let (root, _volume) = enumerate::home_root(ctx);
    Items::new(root.into_iter().collect()).collect()
}

fn place_home(ctx: &TrashContext, source: &Path) -> Result<(), Error> {
    placement::place(ctx, source, TrashOptions::empty())
}

#[test]
fn rejects_relative_path() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let err = placement::place(&ctx, Path::new("relative/path"), TrashOptions::default());
    assert!(matches!(err, Err(Error::InvalidArgument(_))), "{err:?}");
}

#[test]
fn rejects_missing_source() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let missing = temp.path().join("nope");
    let err = placement::place(&ctx, &missing, TrashOptions::default());
    assert!(matches!(err, Err(Error::NotFound(_))), "{err:?}");
}

#[test]
fn places_file_into_home_trash() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("src/foo.txt");
    write_file(&source, b"payload bytes");

    place_home(&ctx, &source).unwrap();

    assert!(!source.exists());
    let trash = ctx.home_trash_dir();
    let payload = trash.join("files/foo.txt");
    assert_eq!(fs::read(&payload).unwrap(), b"payload bytes");

    let body = fs::read_to_string(trash.join("info/foo.txt.trashinfo")).unwrap();
    let info = TrashInfo::parse(&body).unwrap();
    assert_eq!(info.path, source);
    assert!(info.deleted_at.is_some(), "{body}");

    // exactly one pair
    assert_eq!(fs::read_dir(trash.join("files")).unwrap().count(), 1);
    assert_eq!(fs::read_dir(trash.join("info")).unwrap().count(), 1);
}

#[test]
fn default_options_on_home_volume_use_home_trash() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("doc.txt");
    write_file(&source, b"x");

    // data home and source share a volume, so topdir logic falls through
    placement::place(&ctx, &source, TrashOptions::default()).unwrap();
    assert!(ctx.home_trash_dir().join("files/doc.txt").exists());
}

#[test]
fn numbers_colliding_leaf_names() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("report.txt");

    for _ in 0..3 {
        write_file(&source, b"same name");
        place_home(&ctx, &source).unwrap();
    }

    let files_dir = ctx.home_trash_dir().join("files");
    let mut names: Vec<String> = fs::read_dir(&files_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["report 1.txt", "report 2.txt", "report.txt"]);

    for name in ["report.txt", "report 1.txt", "report 2.txt"] {
        assert!(
            ctx.home_trash_dir().join(format!("info/{name}.trashinfo")).exists(),
            "missing info for {name}"
        );
    }
}

#[test]
fn numbers_extensionless_collisions() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("x");

    for _ in 0..2 {
        write_file(&source, b"");
        place_home(&ctx, &source).unwrap();
    }

    let files_dir = ctx.home_trash_dir().join("files");
    assert!(files_dir.join("x").exists());
    assert!(files_dir.join("x 1").exists());
}

#[test]
fn skips_leaf_claimed_by_leftover_payload() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    // a failed rename from an earlier run left a payload without metadata
    write_file(&ctx.home_trash_dir().join("files/ghost"), b"old");

    let source = temp.path().join("ghost");
    write_file(&source, b"new");
    place_home(&ctx, &source).unwrap();

    let files_dir = ctx.home_trash_dir().join("files");
    assert_eq!(fs::read(files_dir.join("ghost")).unwrap(), b"old");
    assert_eq!(fs::read(files_dir.join("ghost 1")).unwrap(), b"new");
}

#[test]
fn awkward_names_round_trip_through_metadata() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("odd dir/50% of tötal.txt");
    write_file(&source, b"bytes");

    place_home(&ctx, &source).unwrap();

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].restore_path(), source);
    assert!(!items[0].is_dir());
}

#[test]
fn enumerates_placed_item() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("note.md");
    write_file(&source, b"hello");

    place_home(&ctx, &source).unwrap();

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.restore_path(), source);
    assert!(!item.is_dir());
    assert!(item.deleted_at().is_some());
}

#[test]
fn directory_round_trip_restores_tree() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("project");
    write_file(&source.join("nested/deep.txt"), b"deep content");
    write_file(&source.join("top.txt"), b"top content");

    place_home(&ctx, &source).unwrap();
    assert!(!source.exists());

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    assert!(items[0].is_dir());

    ops::restore(&items[0]).unwrap();
    assert_eq!(fs::read(source.join("nested/deep.txt")).unwrap(), b"deep content");
    assert_eq!(fs::read(source.join("top.txt")).unwrap(), b"top content");
    assert!(home_items(&ctx).is_empty());
}

#[test]
fn restore_recreates_missing_parents() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("a/b/c/file.txt");
    write_file(&source, b"data");

    place_home(&ctx, &source).unwrap();
    fs::remove_dir_all(temp.path().join("a")).unwrap();

    let items = home_items(&ctx);
    ops::restore(&items[0]).unwrap();
    assert_eq!(fs::read(&source).unwrap(), b"data");
}

#[test]
fn erase_removes_pair_and_is_not_idempotent() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("junk.bin");
    write_file(&source, b"junk");

    place_home(&ctx, &source).unwrap();
    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);

    ops::erase(&items[0]).unwrap();
    assert!(home_items(&ctx).is_empty());
    let trash = ctx.home_trash_dir();
    assert!(!trash.join("files/junk.bin").exists());
    assert!(!trash.join("info/junk.bin.trashinfo").exists());

    // the payload is gone, a second erase must say so
    let err = ops::erase(&items[0]);
    assert!(matches!(err, Err(Error::NotFound(_))), "{err:?}");
}

#[test]
fn erase_removes_directories_recursively() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("dir");
    write_file(&source.join("inner/file"), b"x");

    place_home(&ctx, &source).unwrap();
    let items = home_items(&ctx);
    ops::erase(&items[0]).unwrap();
    assert!(home_items(&ctx).is_empty());
}

#[test]
fn directorysizes_tracks_trashed_directories() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("bundle dir");
    write_file(&source.join("data.bin"), &[7u8; 4096]);

    place_home(&ctx, &source).unwrap();

    let cache = ctx.home_trash_dir().join("directorysizes");
    let body = fs::read_to_string(&cache).unwrap();
    let fields: Vec<&str> = body.split_whitespace().collect();
    assert_eq!(fields.len(), 3, "{body}");
    assert!(fields[0].parse::<u64>().unwrap() >= 4096, "{body}");
    assert!(fields[1].parse::<i64>().unwrap() > 0, "{body}");
    assert_eq!(fields[2], "bundle%20dir");

    let items = home_items(&ctx);
    ops::erase(&items[0]).unwrap();
    assert_eq!(fs::read_to_string(&cache).unwrap(), "");
}

#[test]
fn plain_files_stay_out_of_directorysizes() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let source = temp.path().join("single.txt");
    write_file(&source, b"not a directory");

    place_home(&ctx, &source).unwrap();
    assert!(!ctx.home_trash_dir().join("directorysizes").exists());
}

#[test]
fn symlink_source_moves_the_link_itself() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let target = temp.path().join("target.txt");
    write_file(&target, b"target data");
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    place_home(&ctx, &link).unwrap();

    // the link moved, its target did not
    assert!(!link.exists());
    assert_eq!(fs::read(&target).unwrap(), b"target data");
    let trashed = ctx.home_trash_dir().join("files/link");
    assert!(fs::symlink_metadata(&trashed).unwrap().file_type().is_symlink());

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    assert!(!items[0].is_dir());
}

#[test]
fn enumeration_skips_broken_entries() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let trash = ctx.home_trash_dir();

    // valid pair
    let source = temp.path().join("valid.txt");
    write_file(&source, b"ok");
    place_home(&ctx, &source).unwrap();

    // orphan info file without a payload
    write_file(
        &trash.join("info/orphan.trashinfo"),
        b"[Trash Info]\nPath=/somewhere/orphan\nDeletionDate=2024-01-01T00:00:00\n",
    );
    // payload present but metadata lacks the mandatory Path key
    write_file(&trash.join("files/pathless"), b"x");
    write_file(&trash.join("info/pathless.trashinfo"), b"[Trash Info]\nDeletionDate=2024-01-01T00:00:00\n");
    // stray non-trashinfo file in info/
    write_file(&trash.join("info/README"), b"not metadata");

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].restore_path(), source);
}

#[test]
fn unparseable_date_still_yields_item() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let trash = ctx.home_trash_dir();
    write_file(&trash.join("files/thing"), b"x");
    write_file(
        &trash.join("info/thing.trashinfo"),
        b"[Trash Info]\nPath=/tmp/thing\nDeletionDate=not-a-date\n",
    );

    let items = home_items(&ctx);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].deleted_at(), None);
}

#[test]
fn missing_home_trash_enumerates_empty() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    assert!(home_items(&ctx).is_empty());
}

#[test]
fn admin_dir_checks() {
    let temp = TempDir::new().unwrap();
    let top = temp.path();

    // absent
    assert!(matches!(
        placement::checked_admin_dir(top, true),
        Err(Error::TopDirUnavailable(_))
    ));

    // symbolic link
    let target = top.join("elsewhere");
    fs::create_dir(&target).unwrap();
    std::os::unix::fs::symlink(&target, top.join(".Trash")).unwrap();
    assert!(matches!(
        placement::checked_admin_dir(top, true),
        Err(Error::TopDirUnavailable(_))
    ));
    fs::remove_file(top.join(".Trash")).unwrap();

    // plain directory without the sticky bit
    fs::create_dir(top.join(".Trash")).unwrap();
    chmod(&top.join(".Trash"), 0o777);
    assert!(matches!(
        placement::checked_admin_dir(top, true),
        Err(Error::TopDirUnavailable(_))
    ));
    // tolerated when the check is disabled
    assert!(placement::checked_admin_dir(top, false).is_ok());

    // sticky bit set
    chmod(&top.join(".Trash"), 0o1777);
    assert_eq!(placement::checked_admin_dir(top, true).unwrap(), top.join(".Trash"));
}

#[test]
fn admin_base_creates_uid_directory() {
    let temp = TempDir::new().unwrap();
    let top = temp.path();
    fs::create_dir(top.join(".Trash")).unwrap();
    chmod(&top.join(".Trash"), 0o1777);

    let base = placement::admin_trash_base(top, UID, true).unwrap();
    assert_eq!(base, top.join(".Trash/1000"));
    assert!(base.is_dir());
}

#[test]
fn user_base_creates_directory() {
    let temp = TempDir::new().unwrap();
    let base = placement::user_trash_base(temp.path(), UID).unwrap();
    assert_eq!(base, temp.path().join(".Trash-1000"));
    assert!(base.is_dir());
}

/// The selection decision table, driven with fabricated volume roots.
mod selection {
    use super::*;

    fn home(ctx: &TrashContext) -> Placement {
        Placement {
            base: ctx.home_trash_dir(),
            volume_root: None,
        }
    }

    fn select(
        ctx: &TrashContext,
        options: TrashOptions,
        file_top: &Path,
        data_top: &Path,
    ) -> Result<Placement, Error> {
        placement::select_base_from_tops(
            ctx,
            options,
            Some(file_top.to_path_buf()),
            Some(data_top.to_path_buf()),
        )
    }

    #[test]
    fn topdirs_disabled_goes_home() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let options = TrashOptions::all() - TrashOptions::USE_TOP_DIRS;
        let placement = select(&ctx, options, Path::new("/mnt/data"), Path::new("/")).unwrap();
        assert_eq!(placement, home(&ctx));
    }

    #[test]
    fn same_volume_goes_home() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let placement = select(&ctx, TrashOptions::all(), Path::new("/"), Path::new("/")).unwrap();
        assert_eq!(placement, home(&ctx));
    }

    #[test]
    fn sticky_admin_dir_wins() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let volume = TempDir::new().unwrap();
        fs::create_dir(volume.path().join(".Trash")).unwrap();
        chmod(&volume.path().join(".Trash"), 0o1777);

        let placement = select(&ctx, TrashOptions::all(), volume.path(), temp.path()).unwrap();
        assert_eq!(placement.base, volume.path().join(".Trash/1000"));
        assert_eq!(placement.volume_root.as_deref(), Some(volume.path()));
    }

    #[test]
    fn symlinked_admin_dir_falls_back_to_user_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let volume = TempDir::new().unwrap();
        let target = volume.path().join("real");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, volume.path().join(".Trash")).unwrap();

        let placement = select(&ctx, TrashOptions::all(), volume.path(), temp.path()).unwrap();
        assert_eq!(placement.base, volume.path().join(".Trash-1000"));
        assert_eq!(placement.volume_root.as_deref(), Some(volume.path()));
    }

    #[test]
    fn without_user_fallback_home_fallback_applies() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let volume = TempDir::new().unwrap();

        let options = TrashOptions::all() - TrashOptions::FALLBACK_TO_USER_DIR;
        let placement = select(&ctx, options, volume.path(), temp.path()).unwrap();
        assert_eq!(placement, home(&ctx));
        // nothing was created on the volume
        assert!(!volume.path().join(".Trash-1000").exists());
    }

    #[test]
    fn no_fallbacks_propagates_topdir_error() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let volume = TempDir::new().unwrap();

        let options = TrashOptions::USE_TOP_DIRS | TrashOptions::CHECK_STICKY_BIT;
        let err = select(&ctx, options, volume.path(), temp.path());
        assert!(matches!(err, Err(Error::TopDirUnavailable(_))), "{err:?}");
    }

    #[test]
    fn missing_admin_dir_uses_user_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let volume = TempDir::new().unwrap();

        let placement = select(&ctx, TrashOptions::all(), volume.path(), temp.path()).unwrap();
        assert_eq!(placement.base, volume.path().join(".Trash-1000"));
    }
}

#[test]
fn per_volume_placement_records_relative_path() {
    let volume = TempDir::new().unwrap();
    let source = volume.path().join("sub/bar");
    write_file(&source, b"volume data");

    let base = volume.path().join(".Trash-1000");
    let placement = Placement {
        base: base.clone(),
        volume_root: Some(volume.path().to_path_buf()),
    };
    placement::place_into(&source, &placement).unwrap();

    let body = fs::read_to_string(base.join("info/bar.trashinfo")).unwrap();
    let info = TrashInfo::parse(&body).unwrap();
    assert_eq!(info.path, PathBuf::from("sub/bar"));

    // enumeration joins the relative path back onto the volume root
    let root = TrashRoot {
        base,
        volume_root: volume.path().to_path_buf(),
    };
    let items: Vec<TrashItem> = Items::new(vec![root]).collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].restore_path(), source);
}

#[test]
fn discovers_per_volume_roots() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);

    let admin_volume = TempDir::new().unwrap();
    fs::create_dir_all(admin_volume.path().join(".Trash/1000")).unwrap();
    chmod(&admin_volume.path().join(".Trash"), 0o1777);

    let user_volume = TempDir::new().unwrap();
    fs::create_dir(user_volume.path().join(".Trash-1000")).unwrap();

    let bare_volume = TempDir::new().unwrap();

    let volumes = vec![
        admin_volume.path().to_path_buf(),
        user_volume.path().to_path_buf(),
        bare_volume.path().to_path_buf(),
    ];
    let roots = enumerate::volume_roots(&ctx, &volumes);
    let bases: Vec<&Path> = roots.iter().map(|root| root.base.as_path()).collect();
    assert_eq!(
        bases,
        vec![
            admin_volume.path().join(".Trash/1000").as_path(),
            user_volume.path().join(".Trash-1000").as_path(),
        ]
    );
}

#[test]
fn unsticky_admin_root_is_not_discovered() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);

    let volume = TempDir::new().unwrap();
    fs::create_dir_all(volume.path().join(".Trash/1000")).unwrap();
    chmod(&volume.path().join(".Trash"), 0o777);

    let roots = enumerate::volume_roots(&ctx, &[volume.path().to_path_buf()]);
    assert!(roots.is_empty());
}
