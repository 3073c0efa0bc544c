//! Session logs: listing, reading, threading and deletion.
//!
//! Each `.jsonl` file in a project folder is one session. Reading is
//! forgiving: unreadable files and lines are skipped with a warning, and a
//! log that cannot be read reads as empty. Deletion and change stamps report
//! errors so callers can tell a missing session from an empty one.

use crate::error::{Result, ViewerError};
use crate::storage::StorageConfig;
use crate::transcript::{self, SessionMapping};
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SESSION_EXTENSION: &str = "jsonl";
const RECENT_MESSAGES: usize = 3;
const MESSAGE_PREVIEW_CHARS: usize = 150;
const SESSION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub project_path: PathBuf,
    pub file_path: PathBuf,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub total_cost: f64,
    pub preview: String,
}

/// Modification time and length of a session log, for change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStamp {
    pub mtime: Option<DateTime<Utc>>,
    pub size: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Listing
// ═══════════════════════════════════════════════════════════════════════════════

/// Lists the sessions of one project, newest first.
///
/// `project` is an absolute folder path or a project identifier. An unknown
/// project has no sessions.
pub fn list_sessions(storage: &StorageConfig, project: &str) -> Vec<SessionSummary> {
    let project_dir = storage.resolve_project_dir(project);
    if !project_dir.is_dir() {
        tracing::debug!(project = project, "Project folder not found");
        return Vec::new();
    }

    let mut sessions: Vec<SessionSummary> = session_files(&project_dir)
        .into_iter()
        .filter_map(|file| match summarize_session(&project_dir, &file) {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!(error = %err, file = %file.display(), "Skipping unreadable session");
                None
            }
        })
        .collect();

    sessions.sort_by(|a, b| b.mtime.cmp(&a.mtime));
    sessions
}

/// `.jsonl` files directly inside `dir`, in directory order.
pub(crate) fn session_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == SESSION_EXTENSION))
        .map(|e| e.into_path())
        .collect()
}

fn summarize_session(project_dir: &Path, file: &Path) -> Result<SessionSummary> {
    let content = read_log(file)?;
    let mtime = fs::metadata(file)
        .ok()
        .and_then(|meta| meta.modified().ok())
        .map(DateTime::<Utc>::from);

    let mut start_time: Option<DateTime<Utc>> = None;
    let mut end_time: Option<DateTime<Utc>> = None;
    let mut message_count = 0;
    let mut total_cost = 0.0;
    let mut recent: Vec<String> = Vec::new();

    for record in parse_records(&content) {
        if let Some(at) = record.get("timestamp").and_then(transcript::parse_instant) {
            start_time = Some(start_time.map_or(at, |current| current.min(at)));
            end_time = Some(end_time.map_or(at, |current| current.max(at)));
        }

        if is_message_record(&record) {
            message_count += 1;
            if let Some(text) = message_text(&record) {
                recent.push(text.chars().take(MESSAGE_PREVIEW_CHARS).collect());
                if recent.len() > RECENT_MESSAGES {
                    recent.remove(0);
                }
            }
        }

        if let Some(cost) = record.get("costUSD").and_then(Value::as_f64) {
            total_cost += cost;
        }
    }

    let id = content
        .trim()
        .lines()
        .next()
        .and_then(|line| serde_json::from_str::<Value>(line).ok())
        .and_then(|first| first.get("sessionId").and_then(Value::as_str).map(str::to_string))
        .filter(|id| !id.is_empty())
        .or_else(|| file.file_stem().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_default();

    Ok(SessionSummary {
        id,
        project_path: project_dir.to_path_buf(),
        file_path: file.to_path_buf(),
        start_time,
        end_time,
        mtime,
        message_count,
        total_cost,
        preview: recent.join("\n").chars().take(SESSION_PREVIEW_CHARS).collect(),
    })
}

pub(crate) fn is_message_record(record: &Value) -> bool {
    matches!(
        record.get("type").and_then(Value::as_str),
        Some("user") | Some("assistant")
    )
}

/// The readable text of a message record: `message.content` when it is a
/// string, else its first `text` item, else a string top-level `content`.
pub(crate) fn message_text(record: &Value) -> Option<String> {
    let nested = record
        .get("message")
        .and_then(|m| m.get("content"))
        .filter(|c| !c.is_null() && c.as_str() != Some(""));

    let text = match nested {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str),
        Some(_) => None,
        None => record.get("content").and_then(Value::as_str),
    };

    text.filter(|t| !t.is_empty()).map(str::to_string)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Single Session
// ═══════════════════════════════════════════════════════════════════════════════

/// Every parseable record of a session log, in file order. A missing or
/// unreadable log has no records.
pub fn read_session_file(path: &Path) -> Vec<Value> {
    match read_log(path) {
        Ok(content) => parse_records(&content).collect(),
        Err(err) => {
            tracing::warn!(error = %err, file = %path.display(), "Failed to read session");
            Vec::new()
        }
    }
}

/// Threads a session log into user turns and their assistant replies. A
/// missing or unreadable log yields an empty mapping.
pub fn session_mapping(path: &Path) -> SessionMapping {
    match read_log(path) {
        Ok(content) => transcript::reconstruct(content.lines()),
        Err(err) => {
            tracing::warn!(error = %err, file = %path.display(), "Failed to read session");
            SessionMapping::default()
        }
    }
}

/// Deletes one session log. Only `.jsonl` files inside the projects
/// directory may be removed.
pub fn delete_session(storage: &StorageConfig, path: &Path) -> Result<()> {
    if path.extension().map_or(true, |ext| ext != SESSION_EXTENSION) {
        return Err(ViewerError::InvalidSessionPath {
            path: path.to_path_buf(),
            reason: "not a session log".to_string(),
        });
    }
    if !path.exists() {
        return Err(ViewerError::SessionNotFound(path.to_path_buf()));
    }

    let projects_dir = storage.projects_dir();
    let canonical_root = fs::canonicalize(&projects_dir)
        .map_err(|err| ViewerError::io("resolving projects directory", err))?;
    let canonical = fs::canonicalize(path)
        .map_err(|err| ViewerError::io("resolving session path", err))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(ViewerError::InvalidSessionPath {
            path: path.to_path_buf(),
            reason: "outside the projects directory".to_string(),
        });
    }

    fs::remove_file(&canonical).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ViewerError::SessionNotFound(path.to_path_buf()),
        _ => ViewerError::io("deleting session", err),
    })?;
    tracing::info!(file = %path.display(), "Deleted session");
    Ok(())
}

/// Current stamp of a session log; `SessionNotFound` once it is gone.
pub fn session_file_stamp(path: &Path) -> Result<FileStamp> {
    let meta = fs::metadata(path).map_err(|err| not_found_or_io(path, err, "reading session metadata"))?;
    Ok(FileStamp {
        mtime: meta.modified().ok().map(DateTime::<Utc>::from),
        size: meta.len(),
    })
}

pub(crate) fn read_log(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| not_found_or_io(path, err, "reading session"))
}

pub(crate) fn parse_records(content: &str) -> impl Iterator<Item = Value> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::trace!(error = %err, "Skipping malformed session line");
                None
            }
        })
}

fn not_found_or_io(path: &Path, err: std::io::Error, context: &str) -> ViewerError {
    match err.kind() {
        ErrorKind::NotFound => ViewerError::SessionNotFound(path.to_path_buf()),
        _ => ViewerError::io(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StorageConfig) {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join(".claude"));
        std::fs::create_dir_all(storage.project_dir("-home-me-app")).unwrap();
        (temp, storage)
    }

    fn write_log(storage: &StorageConfig, name: &str, records: &[Value]) -> PathBuf {
        let path = storage.project_dir("-home-me-app").join(name);
        let body: Vec<String> = records.iter().map(Value::to_string).collect();
        std::fs::write(&path, body.join("\n")).unwrap();
        path
    }

    #[test]
    fn message_text_prefers_nested_string() {
        let record = json!({"type": "user", "message": {"content": "hello"}, "content": "other"});
        assert_eq!(message_text(&record).as_deref(), Some("hello"));
    }

    #[test]
    fn message_text_takes_first_text_item() {
        let record = json!({"message": {"content": [
            {"type": "tool_use", "name": "Bash"},
            {"type": "text", "text": "first"},
            {"type": "text", "text": "second"}
        ]}});
        assert_eq!(message_text(&record).as_deref(), Some("first"));
    }

    #[test]
    fn message_text_falls_back_to_top_level_string() {
        assert_eq!(message_text(&json!({"content": "top"})).as_deref(), Some("top"));
        assert_eq!(message_text(&json!({"content": ["x"]})), None);
        assert_eq!(message_text(&json!({"message": {"content": {"a": 1}}, "content": "top"})), None);
    }

    #[test]
    fn list_sessions_summarizes_each_log() {
        let (_temp, storage) = setup();
        write_log(
            &storage,
            "abc.jsonl",
            &[
                json!({"sessionId": "sess-1", "type": "user", "timestamp": "2025-01-01T10:00:00Z",
                       "message": {"content": "first question"}}),
                json!({"type": "assistant", "timestamp": "2025-01-01T10:01:00Z", "costUSD": 0.25,
                       "message": {"content": [{"type": "text", "text": "answer"}]}}),
                json!({"type": "summary", "summary": "s"}),
                json!({"type": "assistant", "timestamp": "2025-01-01T09:59:00Z", "costUSD": 0.5,
                       "content": "early"}),
            ],
        );

        let sessions = list_sessions(&storage, "-home-me-app");
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.id, "sess-1");
        assert_eq!(session.message_count, 3);
        assert!((session.total_cost - 0.75).abs() < 1e-9);
        assert_eq!(session.preview, "first question\nanswer\nearly");
        assert_eq!(
            session.start_time.map(|t| t.to_rfc3339()),
            Some("2025-01-01T09:59:00+00:00".to_string())
        );
        assert_eq!(
            session.end_time.map(|t| t.to_rfc3339()),
            Some("2025-01-01T10:01:00+00:00".to_string())
        );
        assert!(session.mtime.is_some());
    }

    #[test]
    fn list_sessions_keeps_last_three_messages() {
        let (_temp, storage) = setup();
        let long = "x".repeat(400);
        write_log(
            &storage,
            "s.jsonl",
            &[
                json!({"type": "user", "content": "one"}),
                json!({"type": "user", "content": "two"}),
                json!({"type": "user", "content": long}),
                json!({"type": "user", "content": "four"}),
            ],
        );

        let session = &list_sessions(&storage, "-home-me-app")[0];
        assert_eq!(session.id, "s");
        let expected: String = format!("two\n{}\nfour", "x".repeat(150))
            .chars()
            .take(200)
            .collect();
        assert_eq!(session.preview, expected);
    }

    #[test]
    fn list_sessions_ignores_other_files_and_unknown_projects() {
        let (_temp, storage) = setup();
        write_log(&storage, "notes.txt", &[json!({"type": "user"})]);
        assert!(list_sessions(&storage, "-home-me-app").is_empty());
        assert!(list_sessions(&storage, "-nowhere").is_empty());
    }

    #[test]
    fn list_sessions_accepts_absolute_folder() {
        let (_temp, storage) = setup();
        write_log(&storage, "a.jsonl", &[json!({"type": "user", "content": "hi"})]);
        let dir = storage.project_dir("-home-me-app");
        assert_eq!(list_sessions(&storage, &dir.to_string_lossy()).len(), 1);
    }

    #[test]
    fn read_session_file_skips_bad_lines() {
        let (_temp, storage) = setup();
        let path = storage.project_dir("-home-me-app").join("a.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n\n{\"b\":2}\n").unwrap();

        let records = read_session_file(&path);
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let (_temp, storage) = setup();
        let path = storage.project_dir("-home-me-app").join("gone.jsonl");
        assert!(read_session_file(&path).is_empty());
        assert_eq!(session_mapping(&path), SessionMapping::default());
        assert_eq!(
            session_mapping(Path::new("/nonexistent/x.jsonl")),
            SessionMapping::default()
        );
    }

    #[test]
    fn unreadable_log_reads_as_empty() {
        let (_temp, storage) = setup();
        let dir = storage.project_dir("-home-me-app").join("folder.jsonl");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(read_session_file(&dir).is_empty());
        let mapping = session_mapping(&dir);
        assert!(mapping.users.is_empty());
        assert!(mapping.mapping.is_empty());
    }

    #[test]
    fn session_mapping_threads_file() {
        let (_temp, storage) = setup();
        let path = write_log(
            &storage,
            "a.jsonl",
            &[
                json!({"type": "user", "uuid": "u1", "content": "q"}),
                json!({"type": "assistant", "uuid": "a1", "parentUuid": "u1", "content": "r"}),
            ],
        );
        let mapping = session_mapping(&path);
        assert_eq!(mapping.users.len(), 1);
        assert_eq!(mapping.replies_to("u1").len(), 1);
    }

    #[test]
    fn delete_session_removes_log() {
        let (_temp, storage) = setup();
        let path = write_log(&storage, "a.jsonl", &[json!({"type": "user"})]);
        delete_session(&storage, &path).unwrap();
        assert!(!path.exists());
        assert!(matches!(
            delete_session(&storage, &path),
            Err(ViewerError::SessionNotFound(_))
        ));
    }

    #[test]
    fn delete_session_refuses_other_files() {
        let (temp, storage) = setup();
        let notes = storage.project_dir("-home-me-app").join("notes.txt");
        std::fs::write(&notes, "keep").unwrap();
        assert!(matches!(
            delete_session(&storage, &notes),
            Err(ViewerError::InvalidSessionPath { .. })
        ));

        let outside = temp.path().join("outside.jsonl");
        std::fs::write(&outside, "{}").unwrap();
        assert!(matches!(
            delete_session(&storage, &outside),
            Err(ViewerError::InvalidSessionPath { .. })
        ));
        assert!(outside.exists());
        assert!(notes.exists());
    }

    #[test]
    fn file_stamp_tracks_size() {
        let (_temp, storage) = setup();
        let path = write_log(&storage, "a.jsonl", &[json!({"type": "user"})]);
        let before = session_file_stamp(&path).unwrap();
        std::fs::write(&path, "{\"type\":\"user\"}\n{\"type\":\"assistant\"}\n").unwrap();
        let after = session_file_stamp(&path).unwrap();
        assert_ne!(before.size, after.size);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            session_file_stamp(&path),
            Err(ViewerError::SessionNotFound(_))
        ));
    }
}
