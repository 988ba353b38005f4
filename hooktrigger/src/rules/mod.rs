//! Trigger rules and the matcher that evaluates them against events.

pub mod matcher;
pub mod types;

pub use matcher::{matches, WILDCARD};
pub use types::{EndpointConditions, EventTriggers, ScopedName, TriggerRule};
