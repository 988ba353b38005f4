//! Normalized event facts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Header carrying the event kind.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Webhook trigger category, mapped from the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Create,
    Delete,
    Ping,
    Other,
}

impl EventKind {
    /// Map a header value onto the fixed vocabulary. Unknown kinds become `Other`.
    pub fn from_header(value: &str) -> Self {
        match value.trim() {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            "create" => Self::Create,
            "delete" => Self::Delete,
            "ping" => Self::Ping,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Ping => "ping",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of git ref the event points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
    Unknown,
}

/// Facts derived from one inbound webhook.
///
/// Missing fields are carried as empty strings. An event whose repository
/// (or, for pushes, branch) is empty never reaches rule matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub repository: String,
    pub branch: String,
    pub ref_kind: RefKind,
    pub action: String,
}

impl Event {
    pub fn new(
        kind: EventKind,
        repository: impl Into<String>,
        branch: impl Into<String>,
        ref_kind: RefKind,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            repository: repository.into(),
            branch: branch.into(),
            ref_kind,
            action: action.into(),
        }
    }

    /// Whether the event carries the facts rule matching needs.
    pub fn is_routable(&self) -> bool {
        if self.repository.is_empty() {
            return false;
        }
        match self.kind {
            EventKind::Push => !self.branch.is_empty(),
            EventKind::Ping | EventKind::Other => false,
            _ => true,
        }
    }
}
