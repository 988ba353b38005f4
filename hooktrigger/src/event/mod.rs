//! Inbound GitHub event model.
//!
//! The webhook body is parsed exactly once into an immutable [`Event`];
//! matching and delivery only ever see the typed fields.
//!
//! ```text
//! X-GitHub-Event + body → extract_event() → Event
//! ```

pub mod extract;
pub mod types;

pub use extract::extract_event;
pub use types::{Event, EventKind, RefKind};
