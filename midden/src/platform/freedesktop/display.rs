//! Localized display name for the trash can.
//!
//! KDE ships a desktop-entry file describing the trash folder; when it is
//! installed we surface its (localized) `Name`, the same string the file
//! manager shows. Nothing else on a freedesktop system names the trash.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

const DESKTOP_GROUP: &str = "[Desktop Entry]";

/// Known locations of the trash desktop-entry file, relative to each
/// system data directory, newest layout first.
const ENTRY_PATHS: &[&str] = &[
    "kio_desktop/directory.trash",
    "kde4/apps/kio_desktop/directory.trash",
];

pub(crate) fn display_name() -> String {
    let locales = locale_candidates(&current_locale());
    for data_dir in system_data_dirs() {
        for rel in ENTRY_PATHS {
            let path = data_dir.join(rel);
            let Ok(body) = fs::read_to_string(&path) else {
                continue;
            };
            if let Some(name) = localized_name(&body, &locales) {
                tracing::debug!(entry = %path.display(), name, "resolved trash display name");
                return name;
            }
        }
    }
    String::new()
}

fn current_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()))
        .unwrap_or_default()
}

fn system_data_dirs() -> Vec<PathBuf> {
    match env::var("XDG_DATA_DIRS") {
        Ok(dirs) if !dirs.is_empty() => dirs.split(':').map(PathBuf::from).collect(),
        _ => vec![PathBuf::from("/usr/local/share"), PathBuf::from("/usr/share")],
    }
}

/// Standard desktop-entry locale matching order for a `lang_COUNTRY@MOD`
/// locale: `lang_COUNTRY@MOD`, `lang_COUNTRY`, `lang@MOD`, `lang`. The
/// codeset (`.UTF-8`) never participates.
fn locale_candidates(locale: &str) -> Vec<String> {
    let locale = locale.split('.').next().unwrap_or(locale);
    let (base, modifier) = match locale.split_once('@') {
        Some((base, modifier)) => (base, Some(modifier)),
        None => (locale, None),
    };
    let (lang, country) = match base.split_once('_') {
        Some((lang, country)) => (lang, Some(country)),
        None => (base, None),
    };
    if lang.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    if let (Some(country), Some(modifier)) = (country, modifier) {
        candidates.push(format!("{lang}_{country}@{modifier}"));
    }
    if let Some(country) = country {
        candidates.push(format!("{lang}_{country}"));
    }
    if let Some(modifier) = modifier {
        candidates.push(format!("{lang}@{modifier}"));
    }
    candidates.push(lang.to_string());
    candidates
}

/// Best `Name` from the `[Desktop Entry]` group of a desktop-entry file.
fn localized_name(body: &str, locales: &[String]) -> Option<String> {
    let mut in_group = false;
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut default = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            if in_group {
                break;
            }
            in_group = line == DESKTOP_GROUP;
            continue;
        }
        if !in_group {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim_end();
        if key == "Name" {
            default = Some(value);
        } else if let Some(locale) = key.strip_prefix("Name[").and_then(|k| k.strip_suffix(']')) {
            names.insert(locale, value);
        }
    }

    locales
        .iter()
        .find_map(|locale| names.get(locale.as_str()).copied())
        .or(default)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_fallback_order() {
        assert_eq!(
            locale_candidates("de_DE.UTF-8@euro"),
            vec!["de_DE@euro", "de_DE", "de@euro", "de"],
        );
        assert_eq!(locale_candidates("pt_BR"), vec!["pt_BR", "pt"]);
        assert_eq!(locale_candidates("fr"), vec!["fr"]);
        assert_eq!(locale_candidates("C.UTF-8"), vec!["C"]);
        assert!(locale_candidates("").is_empty());
    }

    const ENTRY: &str = "[Desktop Entry]\nName=Trash\nName[de]=Papierkorb\nName[pt_BR]=Lixeira\n";

    #[test]
    fn picks_best_locale_match() {
        let locales = locale_candidates("de_DE.UTF-8");
        assert_eq!(localized_name(ENTRY, &locales), Some("Papierkorb".into()));

        let locales = locale_candidates("pt_BR");
        assert_eq!(localized_name(ENTRY, &locales), Some("Lixeira".into()));
    }

    #[test]
    fn falls_back_to_default_name() {
        let locales = locale_candidates("sv_SE");
        assert_eq!(localized_name(ENTRY, &locales), Some("Trash".into()));
    }

    #[test]
    fn ignores_other_groups() {
        let body = "[Other]\nName=Nope\n[Desktop Entry]\nName=Trash\n[More]\nName=NotThis\n";
        assert_eq!(localized_name(body, &[]), Some("Trash".into()));
        assert_eq!(localized_name("[Other]\nName=Nope\n", &[]), None);
    }
}
