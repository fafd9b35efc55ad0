use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use midden::{TrashItem, TrashOptions, Trashcan};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "midden", about = "Move files to the trash can and manage its contents")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move paths into the trash can.
    Put {
        paths: Vec<PathBuf>,
        /// Never use per-volume trash directories.
        #[arg(long)]
        no_top_dirs: bool,
        /// Accept a `$topdir/.Trash` without the sticky bit.
        #[arg(long)]
        no_sticky_check: bool,
        /// Don't fall back to `$topdir/.Trash-$uid`.
        #[arg(long)]
        no_user_fallback: bool,
        /// Don't fall back to the home trash.
        #[arg(long)]
        no_home_fallback: bool,
    },
    /// List trashed items.
    List,
    /// Restore the item that was trashed from PATH.
    Restore { path: PathBuf },
    /// Permanently delete the item that was trashed from PATH.
    Erase { path: PathBuf },
    /// Print the trash can's display name.
    Name,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Args::parse().command {
        Command::Put {
            paths,
            no_top_dirs,
            no_sticky_check,
            no_user_fallback,
            no_home_fallback,
        } => {
            if paths.is_empty() {
                bail!("nothing to trash");
            }
            let mut options = TrashOptions::default();
            options.set(TrashOptions::USE_TOP_DIRS, !no_top_dirs);
            options.set(TrashOptions::CHECK_STICKY_BIT, !no_sticky_check);
            options.set(TrashOptions::FALLBACK_TO_USER_DIR, !no_user_fallback);
            options.set(TrashOptions::FALLBACK_TO_HOME_DIR, !no_home_fallback);

            for path in paths {
                let path = absolute(&path)?;
                midden::move_to_trash_with(&path, options)
                    .with_context(|| format!("trashing {}", path.display()))?;
            }
        }
        Command::List => {
            let can = Trashcan::new()?;
            if can.is_empty()? {
                println!("the trash can is empty");
                return Ok(());
            }
            for item in can.items()? {
                let deleted_at = item
                    .deleted_at()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".repeat(19));
                let kind = if item.is_dir() { "d" } else { "-" };
                println!("{deleted_at}  {kind}  {}", item.restore_path().display());
            }
        }
        Command::Restore { path } => {
            let can = Trashcan::new()?;
            let item = find_item(&can, &absolute(&path)?)?;
            can.restore(&item)?;
            println!("restored {}", item.restore_path().display());
        }
        Command::Erase { path } => {
            let can = Trashcan::new()?;
            let item = find_item(&can, &absolute(&path)?)?;
            can.erase(&item)?;
            println!("erased {}", item.restore_path().display());
        }
        Command::Name => {
            let can = Trashcan::new()?;
            println!("{}", can.display_name());
        }
    }

    Ok(())
}

/// Absolutize without resolving symlinks; trashing acts on the path as
/// given, not on its target.
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let cwd = env::current_dir().context("resolving the working directory")?;
    Ok(cwd.join(path))
}

/// The most recently trashed item whose restore path matches.
fn find_item(can: &Trashcan, path: &Path) -> anyhow::Result<TrashItem> {
    can.items()?
        .filter(|item| item.restore_path() == path)
        .max_by_key(|item| item.deleted_at())
        .with_context(|| format!("no trashed item for {}", path.display()))
}
