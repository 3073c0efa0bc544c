//! # viewer-core
//!
//! Core library for claude-log-viewer, turning the raw contents of
//! `~/.claude/projects/` into structures a presentation layer can render.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The server wraps calls in
//!   `spawn_blocking`.
//! - **Graceful degradation**: Missing directories and corrupt lines produce
//!   empty/default values, not errors.
//! - **Injected I/O**: The path decoder asks a [`PathOracle`] whether a path
//!   exists and never touches the filesystem itself; the transcript
//!   reconstructor works on lines that were already read.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viewer_core::{list_projects, session_mapping, PathCache, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let cache = PathCache::new();
//! let projects = list_projects(&storage, &cache);
//! let mapping = session_mapping(&projects[0].path.join("abc.jsonl"));
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod patterns;
pub mod project_path;
pub mod projects;
pub mod search;
pub mod sessions;
pub mod storage;
pub mod transcript;

// Re-export commonly used items at crate root
pub use config::{LoggingConfig, SearchConfig, ServerConfig, StorageSection, ViewerConfig};
pub use error::{Result, ViewerError};
pub use project_path::{
    decode_project_path, resolve_project_path, FsOracle, PathCache, PathFlavor, PathOracle,
};
pub use projects::{list_projects, ProjectSummary};
pub use search::{search_in_project, SearchMatch, SessionSearchResult};
pub use sessions::{
    delete_session, list_sessions, read_session_file, session_file_stamp, session_mapping,
    FileStamp, SessionSummary,
};
pub use storage::StorageConfig;
pub use transcript::{
    reconstruct, AssistantEntry, SessionMapping, Threads, UserEntry, NO_USER_KEY,
};
