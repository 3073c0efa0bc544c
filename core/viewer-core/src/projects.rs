//! Project discovery under Claude Code's projects directory.

use crate::project_path::{resolve_project_path, FsOracle, PathCache, PathFlavor};
use crate::sessions::session_files;
use crate::storage::StorageConfig;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Folder name, e.g. `-Users-me-Code-my-app`.
    pub id: String,
    /// Decoded project path, e.g. `/Users/me/Code/my-app`.
    pub name: String,
    /// Folder holding the session logs.
    pub path: PathBuf,
    pub session_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Lists every project folder, most recently active first.
///
/// Folder names are decoded against the real filesystem and memoized in
/// `cache`. A missing projects directory yields an empty list.
pub fn list_projects(storage: &StorageConfig, cache: &PathCache) -> Vec<ProjectSummary> {
    let projects_dir = storage.projects_dir();
    if !projects_dir.is_dir() {
        tracing::debug!(dir = %projects_dir.display(), "Projects directory not found");
        return Vec::new();
    }

    let flavor = PathFlavor::native();
    let mut projects: Vec<ProjectSummary> = WalkDir::new(&projects_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|entry| {
            let id = entry.file_name().to_string_lossy().to_string();
            let sessions = session_files(entry.path());
            let last_updated = sessions
                .iter()
                .filter_map(|file| fs::metadata(file).ok()?.modified().ok())
                .max()
                .map(DateTime::<Utc>::from);

            ProjectSummary {
                name: resolve_project_path(&id, flavor, &FsOracle, cache),
                id,
                path: entry.into_path(),
                session_count: sessions.len(),
                last_updated,
            }
        })
        .collect();

    projects.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    tracing::debug!(count = projects.len(), "Listed projects");
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_projects_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("nope"));
        assert!(list_projects(&storage, &PathCache::new()).is_empty());
    }

    #[test]
    fn counts_sessions_and_sorts_by_activity() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        let idle = storage.project_dir("-idle-project");
        let busy = storage.project_dir("-busy-project");
        std::fs::create_dir_all(&idle).unwrap();
        std::fs::create_dir_all(&busy).unwrap();
        std::fs::write(busy.join("a.jsonl"), "{}").unwrap();
        std::fs::write(busy.join("b.jsonl"), "{}").unwrap();
        std::fs::write(busy.join("notes.md"), "x").unwrap();
        std::fs::write(storage.projects_dir().join("stray.jsonl"), "{}").unwrap();

        let cache = PathCache::new();
        let projects = list_projects(&storage, &cache);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "-busy-project");
        assert_eq!(projects[0].session_count, 2);
        assert!(projects[0].last_updated.is_some());
        assert_eq!(projects[1].id, "-idle-project");
        assert_eq!(projects[1].session_count, 0);
        assert!(projects[1].last_updated.is_none());
        assert_eq!(cache.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn names_are_decoded_against_disk() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("work").join("my-app");
        std::fs::create_dir_all(&real).unwrap();

        let storage = StorageConfig::with_root(temp.path().join(".claude"));
        let id = StorageConfig::encode_path(&real.to_string_lossy());
        std::fs::create_dir_all(storage.project_dir(&id)).unwrap();

        let projects = list_projects(&storage, &PathCache::new());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, real.to_string_lossy());
    }

    #[test]
    fn serializes_camel_case_and_omits_missing_timestamp() {
        let summary = ProjectSummary {
            id: "-a".to_string(),
            name: "/a".to_string(),
            path: PathBuf::from("/x/-a"),
            session_count: 0,
            last_updated: None,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["sessionCount"], 0);
        assert!(value.get("lastUpdated").is_none());
    }
}
