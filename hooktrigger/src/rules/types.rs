//! Trigger rule model, deserialized straight from the configuration document.

use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// A name (repository or branch) with an optional nested allow-list.
///
/// Repository entries nest branches, branch entries nest repositories.
/// Both shapes are the same matcher, so one type serves all four lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedName {
    pub name: String,
    #[serde(
        default,
        rename = "within",
        alias = "branches",
        alias = "repositories",
        skip_serializing_if = "Option::is_none"
    )]
    pub within: Option<Vec<String>>,
}

impl ScopedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            within: None,
        }
    }

    pub fn within<I, S>(name: impl Into<String>, nested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            within: Some(nested.into_iter().map(Into::into).collect()),
        }
    }
}

/// Conditions for one event kind on one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConditions {
    #[serde(default)]
    pub repositories: Option<Vec<ScopedName>>,
    #[serde(default)]
    pub branches: Option<Vec<ScopedName>>,
    #[serde(default)]
    pub exclude_repositories: Option<Vec<ScopedName>>,
    #[serde(default)]
    pub exclude_branches: Option<Vec<ScopedName>>,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
}

/// Per-event-kind conditions. A missing kind means the rule ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTriggers {
    #[serde(default)]
    pub push: Option<EndpointConditions>,
    #[serde(default)]
    pub pull_request: Option<EndpointConditions>,
    #[serde(default)]
    pub create: Option<EndpointConditions>,
    #[serde(default)]
    pub delete: Option<EndpointConditions>,
}

impl EventTriggers {
    pub fn for_kind(&self, kind: EventKind) -> Option<&EndpointConditions> {
        match kind {
            EventKind::Push => self.push.as_ref(),
            EventKind::PullRequest => self.pull_request.as_ref(),
            EventKind::Create => self.create.as_ref(),
            EventKind::Delete => self.delete.as_ref(),
            EventKind::Ping | EventKind::Other => None,
        }
    }
}

/// Maps event conditions to one CI endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Endpoint id, resolved through the configuration's endpoint index.
    pub endpoint: String,
    #[serde(default)]
    pub events: EventTriggers,
}
