//! Reconstruction of conversation threads from Claude Code session logs.
//!
//! A session log is one JSON record per line, and records come in many shapes:
//! user prompts, assistant replies, tool invocations and tool results, each
//! with optional `uuid`/`parentUuid` links and timestamps. [`reconstruct`]
//! normalizes every record into a [`Turn`] and threads assistant turns under
//! the user turn they answer.
//!
//! ## Threading Rules
//!
//! 1. A `tool_result` record whose `parentUuid` names another assistant turn is
//!    folded into that turn's content and disappears as a separate entry.
//! 2. Every other assistant turn is owned by, in order of preference: the user
//!    turn named by its `parentUuid`, the latest user turn not later than it in
//!    time, the closest user turn before it in the file.
//! 3. Assistant turns with no owner are filed under [`NO_USER_KEY`].
//!
//! Lines that are not JSON objects are skipped; one corrupt line never hides
//! the rest of the session.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Mapping key for assistant turns that no user turn owns.
pub const NO_USER_KEY: &str = "__no_user__";

/// Characters of user content kept in [`UserEntry::preview`].
const PREVIEW_CHARS: usize = 200;

/// Record and content-item types that denote tool activity.
const TOOL_TYPES: &[&str] = &["tool_use", "tool_result", "tool"];

// ═══════════════════════════════════════════════════════════════════════════════
// Normalized Turns
// ═══════════════════════════════════════════════════════════════════════════════

/// Who produced a record, as far as threading is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    User,
    Assistant,
    /// Summaries, system notices and anything else; ignored by threading.
    Other,
}

impl TurnKind {
    fn from_label(label: &str) -> Self {
        match label {
            "user" => TurnKind::User,
            "assistant" => TurnKind::Assistant,
            _ => TurnKind::Other,
        }
    }
}

/// One log record after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: String,
    pub kind: TurnKind,
    /// The record's own `type` field, if it had one.
    pub raw_type: Option<String>,
    /// Timestamp exactly as logged.
    pub timestamp: Option<Value>,
    /// `timestamp` parsed for ordering; `None` when absent or unparsable.
    pub instant: Option<DateTime<Utc>>,
    pub content: Value,
    /// Line number within the log (0-based).
    pub sequence_index: usize,
    pub parent_id: Option<String>,
    pub raw: Value,
}

impl Turn {
    /// Parses one log line. Blank lines, invalid JSON and non-object values
    /// yield `None`.
    pub fn from_line(index: usize, line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let raw: Value = serde_json::from_str(line).ok()?;
        if !raw.is_object() {
            return None;
        }
        Some(Self::from_record(index, raw))
    }

    pub fn from_record(index: usize, raw: Value) -> Self {
        let id = non_empty_str(raw.get("uuid"))
            .map(str::to_string)
            .or_else(|| message_id(&raw))
            .unwrap_or_else(|| format!("i_{}", index));

        let timestamp = raw
            .get("timestamp")
            .filter(|v| is_truthy(v))
            .or_else(|| {
                raw.get("message")
                    .and_then(|m| m.get("timestamp"))
                    .filter(|v| is_truthy(v))
            })
            .cloned();
        let instant = timestamp.as_ref().and_then(parse_instant);

        Self {
            id,
            kind: classify(&raw),
            raw_type: non_empty_str(raw.get("type")).map(str::to_string),
            timestamp,
            instant,
            content: Payload::of(&raw).value().clone(),
            sequence_index: index,
            parent_id: non_empty_str(raw.get("parentUuid")).map(str::to_string),
            raw,
        }
    }

    /// Whether `reference` names this turn, by normalized id or raw `uuid`.
    fn answers_to(&self, reference: &str) -> bool {
        self.id == reference || non_empty_str(self.raw.get("uuid")) == Some(reference)
    }
}

/// Normalization pass: one [`Turn`] per parseable line, in file order.
pub fn normalize<I>(lines: I) -> Vec<Turn>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(index, line)| Turn::from_line(index, line.as_ref()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Record Shapes
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a record keeps its conversational payload, strongest match first.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Payload<'a> {
    /// `message.content`
    MessageContent(&'a Value),
    /// `message` without usable content (or a bare string message)
    MessageBody(&'a Value),
    /// top-level `content`
    Content(&'a Value),
    /// nothing recognizable; the record itself
    Record(&'a Value),
}

impl<'a> Payload<'a> {
    fn of(raw: &'a Value) -> Self {
        if let Some(message) = raw.get("message").filter(|m| is_truthy(m)) {
            return match message.get("content").filter(|c| is_truthy(c)) {
                Some(content) => Payload::MessageContent(content),
                None => Payload::MessageBody(message),
            };
        }
        match raw.get("content").filter(|c| is_truthy(c)) {
            Some(content) => Payload::Content(content),
            None => Payload::Record(raw),
        }
    }

    fn value(self) -> &'a Value {
        match self {
            Payload::MessageContent(v)
            | Payload::MessageBody(v)
            | Payload::Content(v)
            | Payload::Record(v) => v,
        }
    }
}

/// Evidence about a record's author, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KindSignal<'a> {
    /// top-level `type`
    ExplicitType(&'a str),
    /// `message.role`
    MessageRole(&'a str),
    /// `message.type` names a tool event
    NestedToolType,
    /// `userType: "external"`
    ExternalUser,
}

impl<'a> KindSignal<'a> {
    fn of(raw: &'a Value) -> Option<Self> {
        let message = raw.get("message");

        if let Some(label) = non_empty_str(raw.get("type")) {
            return Some(KindSignal::ExplicitType(label));
        }
        if let Some(role) = non_empty_str(message.and_then(|m| m.get("role"))) {
            return Some(KindSignal::MessageRole(role));
        }
        if non_empty_str(message.and_then(|m| m.get("type"))).is_some_and(is_tool_type) {
            return Some(KindSignal::NestedToolType);
        }
        if raw.get("userType").and_then(Value::as_str) == Some("external") {
            return Some(KindSignal::ExternalUser);
        }
        None
    }
}

fn classify(raw: &Value) -> TurnKind {
    // Tool activity is agent-internal even when logged as a user record.
    let tool_record = non_empty_str(raw.get("type")).is_some_and(|t| t.starts_with("tool"));
    if tool_record || carries_tool_items(raw) {
        return TurnKind::Assistant;
    }

    match KindSignal::of(raw) {
        Some(KindSignal::ExplicitType(label)) | Some(KindSignal::MessageRole(label)) => {
            TurnKind::from_label(label)
        }
        Some(KindSignal::NestedToolType) => TurnKind::Assistant,
        Some(KindSignal::ExternalUser) => TurnKind::User,
        None => TurnKind::Other,
    }
}

/// True when the record's content array holds a tool item.
fn carries_tool_items(raw: &Value) -> bool {
    let candidate = raw
        .get("message")
        .filter(|m| is_truthy(m))
        .and_then(|m| m.get("content"))
        .filter(|c| is_truthy(c))
        .or_else(|| raw.get("content").filter(|c| is_truthy(c)));

    candidate
        .and_then(Value::as_array)
        .is_some_and(|items| {
            items
                .iter()
                .any(|item| non_empty_str(item.get("type")).is_some_and(is_tool_type))
        })
}

fn is_tool_type(label: &str) -> bool {
    TOOL_TYPES.contains(&label)
}

fn message_id(raw: &Value) -> Option<String> {
    match raw.get("message")?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// JavaScript-style truthiness, which is how the log writers decide whether
/// a field is "set".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parses a logged timestamp: RFC 3339, a few naive layouts (read as UTC), or
/// epoch milliseconds.
pub(crate) fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Output Shapes
// ═══════════════════════════════════════════════════════════════════════════════

/// A user turn as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub id: String,
    pub preview: String,
    pub timestamp: Option<Value>,
    pub raw_type: Option<String>,
}

/// An assistant turn threaded under a user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantEntry {
    pub id: String,
    pub content: Value,
    pub timestamp: Option<Value>,
    pub raw: Value,
}

/// Assistant turns grouped by owning user id. Keys keep insertion order, so
/// they serialize as the user turns appear in the file, with
/// [`NO_USER_KEY`] last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Threads {
    entries: Vec<(String, Vec<AssistantEntry>)>,
    index: HashMap<String, usize>,
}

impl Threads {
    pub fn get(&self, user_id: &str) -> Option<&[AssistantEntry]> {
        self.index
            .get(user_id)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    pub fn contains_key(&self, user_id: &str) -> bool {
        self.index.contains_key(user_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Vec<AssistantEntry>> {
        self.entries.iter().map(|(_, replies)| replies)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The replies under `user_id`, adding an empty thread on first use.
    fn thread_mut(&mut self, user_id: &str) -> &mut Vec<AssistantEntry> {
        let slot = match self.index.get(user_id) {
            Some(&slot) => slot,
            None => {
                self.entries.push((user_id.to_string(), Vec::new()));
                self.index.insert(user_id.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[slot].1
    }
}

impl Serialize for Threads {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, replies) in &self.entries {
            map.serialize_entry(key, replies)?;
        }
        map.end()
    }
}

/// Result of [`reconstruct`]: user turns in file order, and the assistant
/// turns owned by each user id (plus [`NO_USER_KEY`] when needed).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionMapping {
    pub users: Vec<UserEntry>,
    pub mapping: Threads,
}

impl SessionMapping {
    /// Assistant turns owned by `user_id`, empty if none.
    pub fn replies_to(&self, user_id: &str) -> &[AssistantEntry] {
        self.mapping.get(user_id).unwrap_or(&[])
    }

    /// Assistant turns with no owning user turn.
    pub fn orphans(&self) -> &[AssistantEntry] {
        self.replies_to(NO_USER_KEY)
    }
}

fn user_entry(turn: &Turn) -> UserEntry {
    let text = match &turn.content {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    UserEntry {
        id: turn.id.clone(),
        preview: text.chars().take(PREVIEW_CHARS).collect(),
        timestamp: turn.timestamp.clone(),
        raw_type: turn.raw_type.clone(),
    }
}

impl From<Turn> for AssistantEntry {
    fn from(turn: Turn) -> Self {
        Self {
            id: turn.id,
            content: turn.content,
            timestamp: turn.timestamp,
            raw: turn.raw,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reconstruction
// ═══════════════════════════════════════════════════════════════════════════════

/// Threads the lines of one session log into user turns and their replies.
pub fn reconstruct<I>(lines: I) -> SessionMapping
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut users = Vec::new();
    let mut assistants = Vec::new();
    for turn in normalize(lines) {
        match turn.kind {
            TurnKind::User => users.push(turn),
            TurnKind::Assistant => assistants.push(turn),
            TurnKind::Other => {}
        }
    }

    let absorbed = merge_tool_results(&mut assistants);

    let mut mapping = Threads::default();
    for user in &users {
        mapping.thread_mut(&user.id);
    }

    for (assistant, absorbed) in assistants.into_iter().zip(absorbed) {
        if absorbed {
            continue;
        }
        let key = owning_user(&assistant, &users).map_or(NO_USER_KEY, |user| user.id.as_str());
        mapping.thread_mut(key).push(assistant.into());
    }

    tracing::trace!(
        users = users.len(),
        threads = mapping.len(),
        "Reconstructed session transcript"
    );

    SessionMapping {
        users: users.iter().map(user_entry).collect(),
        mapping,
    }
}

/// Merge pass: folds `tool_result` turns into the assistant turn they answer.
/// A result answering an already folded result lands in the turn that
/// absorbed it. Returns, per assistant turn, whether it was absorbed.
fn merge_tool_results(assistants: &mut [Turn]) -> Vec<bool> {
    let mut absorbed_into: Vec<Option<usize>> = vec![None; assistants.len()];

    for child in 0..assistants.len() {
        if assistants[child].raw_type.as_deref() != Some("tool_result") {
            continue;
        }
        let Some(reference) = assistants[child].parent_id.clone() else {
            continue;
        };
        let Some(mut parent) = assistants
            .iter()
            .enumerate()
            .position(|(i, turn)| i != child && turn.answers_to(&reference))
        else {
            continue;
        };
        // Targets are always unabsorbed when recorded, so this terminates.
        while let Some(survivor) = absorbed_into[parent] {
            parent = survivor;
        }
        if parent == child {
            continue;
        }

        let addition = assistants[child].content.clone();
        append_content(&mut assistants[parent].content, addition);
        absorbed_into[child] = Some(parent);
    }

    absorbed_into.into_iter().map(|target| target.is_some()).collect()
}

fn append_content(target: &mut Value, addition: Value) {
    match target {
        Value::Array(items) => items.push(addition),
        other => {
            let previous = std::mem::take(other);
            *other = Value::Array(vec![previous, addition]);
        }
    }
}

/// Assignment pass for one assistant turn.
fn owning_user<'u>(assistant: &Turn, users: &'u [Turn]) -> Option<&'u Turn> {
    let by_reference = |reference: &str| users.iter().find(|user| user.answers_to(reference));

    assistant
        .parent_id
        .as_deref()
        .and_then(by_reference)
        .or_else(|| non_empty_str(assistant.raw.get("parentUuid")).and_then(by_reference))
        .or_else(|| {
            assistant
                .instant
                .and_then(|at| latest_user_at_or_before(users, at))
        })
        .or_else(|| {
            users
                .iter()
                .filter(|user| user.sequence_index <= assistant.sequence_index)
                .max_by_key(|user| user.sequence_index)
        })
}

/// Latest user turn not after `at`; on equal instants the earliest in the
/// file wins.
fn latest_user_at_or_before(users: &[Turn], at: DateTime<Utc>) -> Option<&Turn> {
    let mut best: Option<(&Turn, DateTime<Utc>)> = None;
    for user in users {
        let Some(instant) = user.instant else {
            continue;
        };
        if instant <= at && best.map_or(true, |(_, current)| instant > current) {
            best = Some((user, instant));
        }
    }
    best.map(|(user, _)| user)
}
