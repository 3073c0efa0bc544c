//! Storage configuration and path management for the log viewer.
//!
//! Claude Code keeps one folder per project under `~/.claude/projects/`,
//! named after the project path with separators flattened to `-`, and one
//! `.jsonl` log per session inside it. We only read (and, on request,
//! delete) files there.
//!
//! Production code uses `StorageConfig::default()`; tests use
//! `StorageConfig::with_root(temp_dir)` for isolation.

use std::path::{Path, PathBuf};

/// Central configuration for Claude Code storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for Claude Code data (default: ~/.claude)
    claude_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| {
            tracing::warn!("Home directory not found; reading .claude from the working directory");
            PathBuf::from(".")
        });
        Self {
            claude_root: home.join(".claude"),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig reading from a custom Claude root.
    /// Used for testing with temp directories and for `--claude-dir`.
    pub fn with_root(claude_root: PathBuf) -> Self {
        Self { claude_root }
    }

    /// Uses `claude_dir` when configured, the default location otherwise.
    pub fn from_claude_dir(claude_dir: Option<PathBuf>) -> Self {
        claude_dir.map(Self::with_root).unwrap_or_default()
    }

    /// Returns the root directory for Claude Code data.
    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Project Paths
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to Claude Code's projects directory (one folder per project).
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_root.join("projects")
    }

    /// Path to one project's folder.
    /// Example: ~/.claude/projects/-Users-pete-Code-my-project/
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.projects_dir().join(project_id)
    }

    /// Resolves the `project` argument of a session listing: an absolute
    /// folder path is used as-is, anything else is an identifier under the
    /// projects directory.
    pub fn resolve_project_dir(&self, project: &str) -> PathBuf {
        let as_path = Path::new(project);
        if as_path.is_absolute() {
            as_path.to_path_buf()
        } else {
            self.project_dir(&project.replace('/', "-"))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Path Encoding
    // ─────────────────────────────────────────────────────────────────────────────

    /// Encodes a filesystem path the way Claude Code names project folders.
    /// Example: `/Users/pete/Code/my-project` -> `-Users-pete-Code-my-project`
    /// Example: `C:\Users\me` -> `C--Users-me`
    pub fn encode_path(path: &str) -> String {
        path.replace(['/', '\\', ':'], "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_claude_root_is_claude() {
        let config = StorageConfig::default();
        assert!(config.claude_root().ends_with(".claude"));
    }

    #[test]
    fn test_with_root_sets_custom_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/test-claude"));
        assert_eq!(config.claude_root(), Path::new("/tmp/test-claude"));
    }

    #[test]
    fn test_from_claude_dir_prefers_configured_path() {
        let config = StorageConfig::from_claude_dir(Some(PathBuf::from("/srv/claude")));
        assert_eq!(config.projects_dir(), PathBuf::from("/srv/claude/projects"));

        let config = StorageConfig::from_claude_dir(None);
        assert!(config.claude_root().ends_with(".claude"));
    }

    #[test]
    fn test_project_dir_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/claude"));
        assert_eq!(
            config.project_dir("-Users-pete-Code-my-project"),
            PathBuf::from("/tmp/claude/projects/-Users-pete-Code-my-project")
        );
    }

    #[test]
    fn test_resolve_project_dir_accepts_identifier_or_absolute_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/claude"));
        assert_eq!(
            config.resolve_project_dir("-home-me-app"),
            PathBuf::from("/tmp/claude/projects/-home-me-app")
        );
        assert_eq!(
            config.resolve_project_dir("home/me/app"),
            PathBuf::from("/tmp/claude/projects/home-me-app")
        );
        #[cfg(unix)]
        assert_eq!(
            config.resolve_project_dir("/elsewhere/proj"),
            PathBuf::from("/elsewhere/proj")
        );
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(
            StorageConfig::encode_path("/Users/pete/Code/my-project"),
            "-Users-pete-Code-my-project"
        );
        assert_eq!(StorageConfig::encode_path(r"C:\Users\me"), "C--Users-me");
    }
}
