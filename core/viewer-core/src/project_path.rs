//! Decoding of Claude Code project folder names back into filesystem paths.
//!
//! Claude Code stores each project's transcripts in a folder whose name is the
//! project path with every separator replaced by `-`:
//!
//! - `/home/me/code/happy_notes` -> `-home-me-code-happy-notes`
//! - `C:\Users\David.Wei\bin` -> `C--Users-David-Wei-bin`
//!
//! The flattening is lossy: a `-` may have been a separator, a literal hyphen,
//! an underscore or a dot. Decoding walks the name left to right and asks a
//! [`PathOracle`] which interpretation exists on disk.
//!
//! ## Probe Order
//!
//! At every step the candidate segment is tried verbatim, then with `-` -> `_`,
//! then with `-` -> `.`. Callers depend on this precedence; keep it as is even
//! where it picks the "wrong" sibling for ambiguous names.
//!
//! ## Caching
//!
//! Decoding hits the filesystem several times per segment, so callers hold a
//! [`PathCache`] for the lifetime of the process and go through
//! [`resolve_project_path`]. Entries are never invalidated.

use crate::patterns::{RE_DRIVE_CAPTURE, RE_DRIVE_FOLDER, RE_WINDOWS_DEVICE};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

// ═══════════════════════════════════════════════════════════════════════════════
// Existence Oracle
// ═══════════════════════════════════════════════════════════════════════════════

/// Answers "does this absolute path exist?" for the decoder.
///
/// Implementations must not panic; any failure to check counts as `false`.
pub trait PathOracle {
    fn exists(&self, path: &str) -> bool;
}

impl<F> PathOracle for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, path: &str) -> bool {
        self(path)
    }
}

/// Oracle backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOracle;

impl PathOracle for FsOracle {
    fn exists(&self, path: &str) -> bool {
        // `Path::exists` already maps permission and I/O errors to false.
        Path::new(path).exists()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Path Flavors
// ═══════════════════════════════════════════════════════════════════════════════

/// Separator and drive conventions used while rebuilding a path.
///
/// Decoding is string based so that Windows folder names can be decoded (and
/// tested) on any host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFlavor {
    /// `/` separated, single root.
    Posix,
    /// `\` separated (also accepts `/`), optional `X:` drive prefix.
    Windows,
}

impl PathFlavor {
    /// Flavor of the host platform.
    pub fn native() -> Self {
        if cfg!(windows) {
            PathFlavor::Windows
        } else {
            PathFlavor::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            PathFlavor::Posix => '/',
            PathFlavor::Windows => '\\',
        }
    }

    /// The root path: `/` or `\`.
    pub fn root(self) -> String {
        self.separator().to_string()
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathFlavor::Posix => c == '/',
            PathFlavor::Windows => c == '/' || c == '\\',
        }
    }

    /// Splits a leading `X:` device off Windows paths.
    fn split_device(self, path: &str) -> (&str, &str) {
        match self {
            PathFlavor::Windows if RE_WINDOWS_DEVICE.is_match(path) => path.split_at(2),
            _ => ("", path),
        }
    }

    /// Joins two path fragments and normalizes the result.
    ///
    /// Empty fragments are ignored, so joining an empty segment onto a path
    /// leaves it unchanged.
    pub fn join(self, base: &str, part: &str) -> String {
        let joined = match (base.is_empty(), part.is_empty()) {
            (true, true) => return ".".to_string(),
            (false, true) => base.to_string(),
            (true, false) => part.to_string(),
            (false, false) => format!("{}{}{}", base, self.separator(), part),
        };
        self.normalize(&joined)
    }

    /// Normalizes a path to its absolute form.
    ///
    /// Relative paths are anchored at the root (of their drive, on Windows)
    /// rather than at the process working directory, keeping decoding
    /// independent of where the server was started. Trailing separators are
    /// dropped except on a bare root.
    pub fn resolve(self, path: &str) -> String {
        let (device, rest) = self.split_device(path);
        let anchored = if rest.starts_with(|c| self.is_separator(c)) {
            path.to_string()
        } else {
            format!("{}{}{}", device, self.separator(), rest)
        };

        let mut resolved = self.normalize(&anchored);
        if resolved.len() > device.len() + 1 && resolved.ends_with(self.separator()) {
            resolved.pop();
        }
        resolved
    }

    /// Collapses duplicate separators and `.`/`..` segments.
    pub fn normalize(self, path: &str) -> String {
        let (device, rest) = self.split_device(path);
        if device.is_empty() && rest.is_empty() {
            return ".".to_string();
        }

        let absolute = rest.starts_with(|c| self.is_separator(c));
        let trailing = rest.len() > 1 && rest.ends_with(|c| self.is_separator(c));

        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split(|c| self.is_separator(c)) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.last().is_some_and(|last| *last != "..") {
                        segments.pop();
                    } else if !absolute {
                        segments.push("..");
                    }
                }
                other => segments.push(other),
            }
        }

        let separator = self.separator();
        let mut normalized = String::from(device);
        if absolute {
            normalized.push(separator);
        }
        normalized.push_str(&segments.join(&separator.to_string()));

        if segments.is_empty() {
            if !absolute && device.is_empty() {
                return ".".to_string();
            }
            return normalized;
        }
        if trailing {
            normalized.push(separator);
        }
        normalized
    }
}

impl Default for PathFlavor {
    fn default() -> Self {
        Self::native()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decoding Cache
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier -> resolved path memo shared by all callers of
/// [`resolve_project_path`].
///
/// The lock only guards lookups and inserts; decoding runs outside it, so two
/// threads racing on a new identifier may both decode it. The first insert
/// wins and both see the same value.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: Mutex<HashMap<String, String>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(identifier)
            .cloned()
    }

    /// Stores a decoded path unless the identifier is already cached, and
    /// returns whichever value ends up in the cache.
    pub fn insert(&self, identifier: &str, resolved: String) -> String {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(identifier.to_string())
            .or_insert(resolved)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves a project folder name, consulting and filling `cache`.
pub fn resolve_project_path(
    identifier: &str,
    flavor: PathFlavor,
    oracle: &dyn PathOracle,
    cache: &PathCache,
) -> String {
    if let Some(cached) = cache.get(identifier) {
        return cached;
    }

    let resolved = decode_project_path(identifier, flavor, oracle);
    tracing::debug!(identifier, resolved = %resolved, "Decoded project folder name");
    cache.insert(identifier, resolved)
}

/// Decodes a project folder name without caching.
///
/// Total: when nothing on disk matches, every remaining `-` is read as a
/// separator.
pub fn decode_project_path(identifier: &str, flavor: PathFlavor, oracle: &dyn PathOracle) -> String {
    if identifier.is_empty() || identifier == "-" {
        return flavor.root();
    }

    let is_drive_folder = RE_DRIVE_FOLDER.is_match(identifier);
    if !identifier.starts_with('-') && !is_drive_folder {
        return identifier.to_string();
    }

    let mut working = identifier.to_string();
    let mut drive_prefix = String::new();
    if is_drive_folder {
        if let Some(caps) = RE_DRIVE_CAPTURE.captures(identifier) {
            drive_prefix = format!("{}:", caps[1].to_ascii_uppercase());
            working = format!("-{}", &caps[2]);
        }
    }

    let prober = Prober {
        flavor,
        oracle,
        drive_prefix: &drive_prefix,
    };

    // The first `-` is the root; any further leading dashes are empty segments.
    let mut remaining = working[1..].trim_start_matches('-');
    let mut current = flavor.root();

    while !remaining.is_empty() {
        let Some(dash) = remaining.find('-') else {
            current = flavor.join(&current, remaining);
            break;
        };

        let candidate = &remaining[..dash];
        if let Some(found) = prober.first_existing(&current, candidate) {
            current = found;
            remaining = &remaining[dash + 1..];
            continue;
        }

        match prober.lookahead(&current, remaining, dash + 1) {
            Some((found, rest)) => {
                current = found;
                remaining = rest;
            }
            None => {
                current = flavor.join(&current, candidate);
                remaining = &remaining[dash + 1..];
            }
        }
    }

    format!("{}{}", drive_prefix, current)
}

struct Prober<'a> {
    flavor: PathFlavor,
    oracle: &'a dyn PathOracle,
    drive_prefix: &'a str,
}

impl Prober<'_> {
    /// Tries `part` verbatim, with `_`, then with `.` in place of its dashes.
    /// Returns the joined (unprefixed) path of the first one that exists.
    fn first_existing(&self, current: &str, part: &str) -> Option<String> {
        let variants = [
            part.to_string(),
            part.replace('-', "_"),
            part.replace('-', "."),
        ];

        for (i, variant) in variants.iter().enumerate() {
            // Dash-free parts yield three identical variants; probe once.
            if variants[..i].contains(variant) {
                continue;
            }
            let joined = self.flavor.join(current, variant);
            let absolute = self
                .flavor
                .resolve(&format!("{}{}", self.drive_prefix, joined));
            if self.oracle.exists(&absolute) {
                return Some(joined);
            }
        }
        None
    }

    /// Extends the failed candidate one `-`-delimited segment at a time.
    ///
    /// `search_from` is the byte offset just past the candidate's dash. On a
    /// hit returns the new current path and the unconsumed rest. The extension
    /// that reaches the end of `remaining` is the last one tried.
    fn lookahead<'r>(
        &self,
        current: &str,
        remaining: &'r str,
        mut search_from: usize,
    ) -> Option<(String, &'r str)> {
        while search_from < remaining.len() {
            match remaining[search_from..].find('-') {
                None => {
                    return self
                        .first_existing(current, remaining)
                        .map(|found| (found, ""));
                }
                Some(offset) => {
                    let end = search_from + offset;
                    if let Some(found) = self.first_existing(current, &remaining[..end]) {
                        return Some((found, &remaining[end + 1..]));
                    }
                    search_from = end + 1;
                }
            }
        }
        None
    }
}
