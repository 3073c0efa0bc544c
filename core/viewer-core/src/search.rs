//! Full-text search across the sessions of one project.

use crate::config::SearchConfig;
use crate::error::{Result, ViewerError};
use crate::sessions::{is_message_record, message_text, parse_records, read_log, session_files};
use crate::storage::StorageConfig;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Characters kept on each side of a hit.
const SNIPPET_RADIUS: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub uuid: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<Value>,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSearchResult {
    pub session_id: String,
    pub file_path: PathBuf,
    pub matches: Vec<SearchMatch>,
}

/// Case-insensitive search over the user and assistant messages of every
/// session in `project_id`. Sessions with the most hits come first.
pub fn search_in_project(
    storage: &StorageConfig,
    project_id: &str,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SessionSearchResult>> {
    let query = query.trim();
    if query.chars().count() < config.min_query_len {
        return Err(ViewerError::QueryTooShort {
            min: config.min_query_len,
        });
    }

    let project_dir = storage.resolve_project_dir(project_id);
    if !project_dir.is_dir() {
        return Err(ViewerError::ProjectNotFound(project_id.to_string()));
    }

    let needle = query.to_lowercase();
    let mut results: Vec<SessionSearchResult> = Vec::new();

    for file in session_files(&project_dir) {
        let content = match read_log(&file) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(error = %err, file = %file.display(), "Skipping unreadable session");
                continue;
            }
        };

        let mut session_id: Option<String> = None;
        let mut matches = Vec::new();
        for record in parse_records(&content) {
            if session_id.is_none() {
                session_id = record
                    .get("sessionId")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            if matches.len() >= config.max_matches_per_session || !is_message_record(&record) {
                continue;
            }
            let Some(text) = message_text(&record) else {
                continue;
            };
            if let Some(snippet) = snippet_around(&text, &needle) {
                matches.push(SearchMatch {
                    uuid: record.get("uuid").and_then(Value::as_str).map(str::to_string),
                    kind: record
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    timestamp: record.get("timestamp").cloned(),
                    snippet,
                });
            }
        }

        if matches.is_empty() {
            continue;
        }
        let session_id = session_id
            .or_else(|| file.file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_default();
        results.push(SessionSearchResult {
            session_id,
            file_path: file,
            matches,
        });
    }

    results.sort_by(|a, b| b.matches.len().cmp(&a.matches.len()));
    tracing::debug!(
        project = project_id,
        sessions = results.len(),
        "Searched project"
    );
    Ok(results)
}

/// Up to [`SNIPPET_RADIUS`] characters either side of the first
/// occurrence of `needle` (already lowercased) in `text`.
fn snippet_around(text: &str, needle: &str) -> Option<String> {
    if needle.is_empty() {
        return None;
    }

    // Lowercasing can expand a char (`İ` -> `i̇`), so keep where each
    // original char starts in the lowered text.
    let mut lowered = String::with_capacity(text.len());
    let mut starts = Vec::new();
    for c in text.chars() {
        starts.push(lowered.len());
        lowered.extend(c.to_lowercase());
    }

    let byte_pos = lowered.find(needle)?;
    let origin = |byte: usize| starts.partition_point(|&start| start <= byte) - 1;
    let hit_start = origin(byte_pos);
    let hit_end = origin(byte_pos + needle.len() - 1) + 1;

    let start = hit_start.saturating_sub(SNIPPET_RADIUS);
    let take = (hit_end - start) + SNIPPET_RADIUS;
    Some(text.chars().skip(start).take(take).collect())
}
