//! Flat JSON file persistence.
//!
//! Files are pretty-printed and replaced through a sibling `.tmp` file plus
//! rename, so a reader never sees a half-written document. Nothing here
//! coordinates the two files the repository keeps.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub const TASKS_FILE: &str = "tasks.json";
pub const PROJECTS_FILE: &str = "projects.json";

/// Read `path` as JSON.
///
/// Returns `None` when the file is missing, unreadable or does not parse;
/// the caller starts from an empty collection in that case.
pub fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No data file at {}, starting empty", path.display());
            return None;
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("Failed to parse {}: {}", path.display(), err);
            None
        }
    }
}

/// Serialize `value` pretty-printed and atomically replace `path` with it.
pub fn save<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = tmp_path_for(path);
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    drop(file);
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_returns_same_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PROJECTS_FILE);
        let projects = vec!["Inbox".to_string(), "Work".to_string()];
        save(&path, &projects).unwrap();
        let loaded: Option<Vec<String>> = load(&path);
        assert_eq!(loaded, Some(projects));
        assert!(!dir.path().join("projects.json.tmp").exists());
    }

    #[test]
    fn saved_file_is_pretty_printed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PROJECTS_FILE);
        save(&path, &vec!["Inbox"]).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"Inbox\""));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let loaded: Option<Vec<String>> = load(&dir.path().join(TASKS_FILE));
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TASKS_FILE);
        fs::write(&path, "[{ not json").unwrap();
        let loaded: Option<Vec<String>> = load(&path);
        assert!(loaded.is_none());
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone").join(TASKS_FILE);
        assert!(save(&path, &Vec::<String>::new()).is_err());
    }
}
