//! Compiled regex patterns for decoding Claude Code project folder names.
//!
//! These patterns are compiled once on first use and reused throughout
//! the application.
//! Update these when Claude's project folder naming changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Project Identifier Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// Folder names written on Windows start with the drive letter: `C--Users-me`.
pub static RE_DRIVE_FOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]--").unwrap());

/// Splits a drive-letter folder name into the letter and the encoded remainder.
pub static RE_DRIVE_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z])--(.+)$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Windows Path Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// A `X:` device prefix at the start of a Windows path.
pub static RE_WINDOWS_DEVICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]:").unwrap());
