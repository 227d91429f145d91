//! Checkpoint naming and record format
//!
//! A checkpoint is a commit whose message carries the operation it guards and
//! the capture time, published under a reference in the reserved
//! `refs/easegit/checkpoints` namespace:
//!
//! ```text
//! refs/easegit/checkpoints/1718035200123      -> commit
//!
//! EaseGit checkpoint before rebase
//!
//! Timestamp: 1718035200123
//! ```
//!
//! The reference name embeds the same epoch-millisecond timestamp so the
//! newest checkpoint can be picked without reading any objects. When two
//! checkpoints land in the same millisecond the later one gets a `-<n>`
//! suffix. Ordering is always numeric on `(timestamp, suffix)`; plain string
//! comparison would put `999` after `1000`.
//!
//! ## Examples
//!
//! ```rust
//! use easegit::checkpoint::{CheckpointMessage, CheckpointRef};
//!
//! let message = CheckpointMessage::new("rebase", 1_718_035_200_123);
//! let parsed = CheckpointMessage::parse(&message.render()).unwrap();
//! assert_eq!(parsed.operation, "rebase");
//!
//! let older = CheckpointRef::parse("refs/easegit/checkpoints/999").unwrap();
//! let newer = CheckpointRef::parse("refs/easegit/checkpoints/1000").unwrap();
//! assert!(newer > older);
//! ```

use crate::git::CommitId;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

/// Reference namespace owned by easegit
pub const REF_PREFIX: &str = "refs/easegit/checkpoints";

/// Operation label used when a record does not name one
pub const UNKNOWN_OPERATION: &str = "unknown";

const OPERATION_MARKER: &str = "checkpoint before ";
const SUBJECT_PREFIX: &str = "EaseGit checkpoint before ";
const TIMESTAMP_MARKER: &str = "Timestamp: ";

/// Metadata embedded in a checkpoint commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMessage {
    /// Operation the checkpoint was taken before (`rebase`, `merge`, ...)
    pub operation: String,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl CheckpointMessage {
    /// Create a message, normalizing the label to a single trimmed line
    pub fn new(operation: &str, timestamp_ms: i64) -> Self {
        let operation = operation
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let operation = if operation.is_empty() {
            UNKNOWN_OPERATION.to_string()
        } else {
            operation
        };
        Self {
            operation,
            timestamp_ms,
        }
    }

    /// First paragraph of the commit message
    pub fn subject(&self) -> String {
        format!("{}{}", SUBJECT_PREFIX, self.operation)
    }

    /// Second paragraph of the commit message
    pub fn body(&self) -> String {
        format!("{}{}", TIMESTAMP_MARKER, self.timestamp_ms)
    }

    /// Full commit message text
    pub fn render(&self) -> String {
        format!("{}\n\n{}\n", self.subject(), self.body())
    }

    /// Parse a commit message
    ///
    /// Returns `None` when no line carries a `Timestamp:` with digits. Extra
    /// lines anywhere (trailers, notes) are ignored. A missing operation
    /// falls back to [`UNKNOWN_OPERATION`].
    pub fn parse(text: &str) -> Option<Self> {
        let timestamp_ms = text.lines().find_map(parse_timestamp_line)?;
        let operation = text
            .lines()
            .find_map(|line| {
                let start = line.find(OPERATION_MARKER)? + OPERATION_MARKER.len();
                let label = line[start..].trim();
                (!label.is_empty()).then(|| label.to_string())
            })
            .unwrap_or_else(|| UNKNOWN_OPERATION.to_string());

        Some(Self {
            operation,
            timestamp_ms,
        })
    }

    /// Capture time as a UTC date
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

fn parse_timestamp_line(line: &str) -> Option<i64> {
    let rest = &line[line.find(TIMESTAMP_MARKER)? + TIMESTAMP_MARKER.len()..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse().ok()
}

/// A reference in the checkpoint namespace
///
/// Ordered chronologically: by embedded timestamp, then by same-millisecond
/// suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointRef {
    name: String,
    timestamp_ms: i64,
    sequence: u32,
}

impl CheckpointRef {
    /// Reference name for a timestamp and same-millisecond suffix
    pub fn new(timestamp_ms: i64, sequence: u32) -> Self {
        let name = if sequence == 0 {
            format!("{}/{}", REF_PREFIX, timestamp_ms)
        } else {
            format!("{}/{}-{}", REF_PREFIX, timestamp_ms, sequence)
        };
        Self {
            name,
            timestamp_ms,
            sequence,
        }
    }

    /// Parse a full reference name
    ///
    /// Accepts `refs/easegit/checkpoints/<millis>` and
    /// `refs/easegit/checkpoints/<millis>-<n>`; anything else is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let leaf = name.strip_prefix(REF_PREFIX)?.strip_prefix('/')?;
        let (stamp, sequence) = match leaf.split_once('-') {
            Some((stamp, sequence)) => (stamp, parse_digits::<u32>(sequence)?),
            None => (leaf, 0),
        };
        Some(Self {
            name: name.to_string(),
            timestamp_ms: parse_digits(stamp)?,
            sequence,
        })
    }

    /// Full reference name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embedded timestamp in epoch milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Same-millisecond suffix, 0 for the first checkpoint of a millisecond
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Ord for CheckpointRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then(self.sequence.cmp(&other.sequence))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for CheckpointRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CheckpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decoded checkpoint, ready to restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    /// Reference the checkpoint was found under
    pub reference: CheckpointRef,
    /// The checkpoint commit
    pub commit: CommitId,
    /// Capture time in epoch milliseconds, as recorded in the message
    pub timestamp_ms: i64,
    /// Operation the checkpoint guarded
    pub operation: String,
}

impl CheckpointInfo {
    /// Capture time as a UTC date
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}
