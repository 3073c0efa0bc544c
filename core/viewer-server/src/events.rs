//! Live updates for one session log over server-sent events.
//!
//! The file is polled for its (mtime, size) stamp; clients get an `update`
//! event when it changes and a final `deleted` event when it disappears.

use crate::routes::{required, ApiError, AppState, FileQuery};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use viewer_core::{session_file_stamp, FileStamp, ViewerError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FileChange {
    Updated(FileStamp),
    Deleted,
}

pub async fn session_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let file = PathBuf::from(required(query.file, "file")?);
    let initial = session_file_stamp(&file)?;
    tracing::info!(file = %file.display(), "Client subscribed to session updates");

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().comment("connected")) });
    let label = file.to_string_lossy().to_string();
    let changes = watch_file(file, initial, state.poll_interval).map(move |change| {
        let event = match change {
            FileChange::Updated(stamp) => Event::default().event("update").data(
                json!({ "file": label.as_str(), "mtime": stamp.mtime, "size": stamp.size }).to_string(),
            ),
            FileChange::Deleted => Event::default()
                .event("deleted")
                .data(json!({ "file": label.as_str() }).to_string()),
        };
        Ok(event)
    });

    Ok(Sse::new(connected.chain(changes)).keep_alive(KeepAlive::default()))
}

struct Watch {
    file: PathBuf,
    last: FileStamp,
    interval: Duration,
    finished: bool,
}

/// Polls `file` every `interval`, yielding each stamp change. Ends after
/// reporting deletion.
pub(crate) fn watch_file(
    file: PathBuf,
    initial: FileStamp,
    interval: Duration,
) -> impl Stream<Item = FileChange> {
    let watch = Watch {
        file,
        last: initial,
        interval,
        finished: false,
    };

    stream::unfold(watch, |mut watch| async move {
        if watch.finished {
            return None;
        }
        loop {
            tokio::time::sleep(watch.interval).await;
            match session_file_stamp(&watch.file) {
                Ok(stamp) if stamp != watch.last => {
                    watch.last = stamp;
                    return Some((FileChange::Updated(stamp), watch));
                }
                Ok(_) => {}
                Err(ViewerError::SessionNotFound(_)) => {
                    tracing::info!(file = %watch.file.display(), "Watched session deleted");
                    watch.finished = true;
                    return Some((FileChange::Deleted, watch));
                }
                Err(err) => {
                    tracing::warn!(error = %err, file = %watch.file.display(), "Failed to stat watched session");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reports_changes_then_deletion() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("s.jsonl");
        std::fs::write(&file, "{}\n").unwrap();
        let initial = session_file_stamp(&file).unwrap();

        let changes = watch_file(file.clone(), initial, Duration::from_millis(10));
        futures::pin_mut!(changes);

        std::fs::write(&file, "{}\n{\"type\":\"user\"}\n").unwrap();
        match changes.next().await {
            Some(FileChange::Updated(stamp)) => assert_eq!(stamp.size, 19),
            other => panic!("expected update, got {other:?}"),
        }

        std::fs::remove_file(&file).unwrap();
        assert_eq!(changes.next().await, Some(FileChange::Deleted));
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn subscribing_to_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut config = viewer_core::ViewerConfig::default();
        config.storage.claude_dir = Some(temp.path().to_path_buf());
        let state = Arc::new(AppState::from_config(&config));

        let result = session_events(
            State(state),
            Query(FileQuery {
                file: Some(temp.path().join("gone.jsonl").to_string_lossy().to_string()),
            }),
        )
        .await;
        match result {
            Err(err) => assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected not found"),
        }
    }
}
