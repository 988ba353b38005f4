//! Event extraction from raw GitHub webhook bodies.
//!
//! GitHub payloads differ per event kind. Fields are looked up with JSON
//! pointers; a missing path at any level yields an empty string rather
//! than an error.

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TriggerError};
use crate::event::types::{Event, EventKind, RefKind};

/// Parse a webhook body into an [`Event`].
///
/// Fails with `MalformedPayload` when the body is not a JSON object.
pub fn extract_event(body: &[u8], kind: EventKind) -> Result<Event> {
    let json: Value =
        serde_json::from_slice(body).map_err(|e| TriggerError::malformed(e.to_string()))?;

    if !json.is_object() {
        return Err(TriggerError::malformed("payload is not a JSON object"));
    }

    let repository = repository_name(&json, kind);
    let (branch, ref_kind) = branch_and_ref_kind(&json, kind);
    let action = match kind {
        EventKind::PullRequest => string_at(&json, "/action"),
        _ => String::new(),
    };

    let event = Event {
        kind,
        repository,
        branch,
        ref_kind,
        action,
    };

    debug!(
        event = %event.kind,
        repository = %event.repository,
        branch = %event.branch,
        ref_kind = ?event.ref_kind,
        action = %event.action,
        "event_extracted"
    );

    Ok(event)
}

fn string_at(json: &Value, pointer: &str) -> String {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn repository_name(json: &Value, kind: EventKind) -> String {
    match kind {
        EventKind::Push | EventKind::Create | EventKind::Delete => {
            string_at(json, "/repository/name")
        }
        EventKind::PullRequest => string_at(json, "/pull_request/head/repo/name"),
        EventKind::Ping | EventKind::Other => String::new(),
    }
}

fn branch_and_ref_kind(json: &Value, kind: EventKind) -> (String, RefKind) {
    match kind {
        EventKind::Push => parse_push_ref(&string_at(json, "/ref")),
        EventKind::Create | EventKind::Delete => {
            let reference = string_at(json, "/ref");
            match string_at(json, "/ref_type").as_str() {
                "branch" => (reference, RefKind::Branch),
                "tag" => (String::new(), RefKind::Tag),
                _ => (String::new(), RefKind::Unknown),
            }
        }
        _ => (String::new(), RefKind::Unknown),
    }
}

/// Split a push ref like `refs/heads/main`.
///
/// The second segment names the ref namespace; tag pushes never carry a
/// branch. Otherwise the branch is the third segment.
pub fn parse_push_ref(reference: &str) -> (String, RefKind) {
    let segments: Vec<&str> = reference.split('/').collect();

    match segments.get(1) {
        Some(&"tag") | Some(&"tags") => (String::new(), RefKind::Tag),
        Some(_) => match segments.get(2) {
            Some(branch) if !branch.is_empty() => (branch.to_string(), RefKind::Branch),
            _ => (String::new(), RefKind::Unknown),
        },
        None => (String::new(), RefKind::Unknown),
    }
}
