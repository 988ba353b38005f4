//! Hooktrigger - GitHub webhook receiver that triggers Jenkins jobs.
//!
//! ## Architecture
//!
//! ```text
//! GitHub → POST / → signature check → Event → TriggerRule* → DeliveryEngine → Jenkins
//!                                                         └→ forward targets
//! ```

pub mod config;
pub mod deliver;
pub mod error;
pub mod event;
pub mod rules;
pub mod trigger;
pub mod web;

// Re-export commonly used types
pub use config::{Config, FailurePolicy};
pub use deliver::{DeliveryEngine, EndpointDefinition, JenkinsClient};
pub use error::{Result, TriggerError};
pub use event::{extract_event, Event, EventKind, RefKind};
pub use rules::TriggerRule;
pub use trigger::{ProcessReport, RuleOutcome, TriggerOrchestrator};
pub use web::{build_router, AppState};
