//! Trigger orchestration - runs every configured rule against one event.
//!
//! Rules are visited in configured order and strictly sequentially. Routine
//! non-matches (unknown endpoint, event kind not configured, tag pushes)
//! are skipped quietly. A rule that exhausts its delivery retries stops the
//! remaining rules unless the failure policy says to continue.

use tracing::{debug, error, info};

use crate::config::{Config, FailurePolicy};
use crate::deliver::DeliveryEngine;
use crate::error::TriggerError;
use crate::event::Event;
use crate::rules::{self, TriggerRule};

/// Why a rule was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No endpoint with the rule's id is configured.
    UnknownEndpoint,
    /// The endpoint exists but its settings failed to resolve.
    InvalidEndpoint,
    /// The event lacks a repository, or a push lacks a branch.
    Unroutable,
    /// The rule has no conditions for this event kind.
    UnsupportedEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Skipped(SkipReason),
    NotMatched,
    Triggered { path: String, attempts: u32 },
    Failed(TriggerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub endpoint: String,
    pub outcome: RuleOutcome,
}

/// Outcome of processing one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// One entry per visited rule, in order.
    pub rules: Vec<RuleReport>,
    /// Set when a failure stopped the remaining rules.
    pub halted: bool,
}

impl ProcessReport {
    pub fn triggered(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Triggered { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Failed(_)))
            .count()
    }
}

pub struct TriggerOrchestrator<'a> {
    config: &'a Config,
    engine: &'a DeliveryEngine,
}

impl<'a> TriggerOrchestrator<'a> {
    pub fn new(config: &'a Config, engine: &'a DeliveryEngine) -> Self {
        Self { config, engine }
    }

    /// Evaluate `rules` against `event`, delivering every match.
    pub async fn process(&self, event: &Event, rules: &[TriggerRule]) -> ProcessReport {
        let mut report = ProcessReport::default();

        for rule in rules {
            let outcome = self.process_rule(event, rule).await;
            let exhausted = matches!(
                outcome,
                RuleOutcome::Failed(TriggerError::DeliveryExhausted { .. })
            );

            report.rules.push(RuleReport {
                endpoint: rule.endpoint.clone(),
                outcome,
            });

            if exhausted && self.config.failure_policy == FailurePolicy::Halt {
                error!(
                    endpoint = %rule.endpoint,
                    remaining_rules = rules.len() - report.rules.len(),
                    "trigger_processing_halted"
                );
                report.halted = true;
                break;
            }
        }

        info!(
            event = %event.kind,
            repository = %event.repository,
            branch = %event.branch,
            rules_visited = report.rules.len(),
            triggered = report.triggered(),
            failed = report.failed(),
            halted = report.halted,
            "trigger_processing_complete"
        );

        report
    }

    async fn process_rule(&self, event: &Event, rule: &TriggerRule) -> RuleOutcome {
        if self.config.rejected_endpoints.contains_key(&rule.endpoint) {
            debug!(endpoint = %rule.endpoint, "rule_skipped_invalid_endpoint");
            return RuleOutcome::Skipped(SkipReason::InvalidEndpoint);
        }

        let Some(endpoint) = self.config.endpoint(&rule.endpoint) else {
            debug!(endpoint = %rule.endpoint, "rule_skipped_unknown_endpoint");
            return RuleOutcome::Skipped(SkipReason::UnknownEndpoint);
        };

        if !event.is_routable() {
            debug!(
                endpoint = %rule.endpoint,
                repository = %event.repository,
                branch = %event.branch,
                "rule_skipped_unroutable_event"
            );
            return RuleOutcome::Skipped(SkipReason::Unroutable);
        }

        match rules::matches(rule, event) {
            Ok(true) => {}
            Ok(false) => return RuleOutcome::NotMatched,
            Err(e) => {
                debug!(error = %e, "rule_skipped_unsupported_event");
                return RuleOutcome::Skipped(SkipReason::UnsupportedEvent);
            }
        }

        info!(
            endpoint = %rule.endpoint,
            repository = %event.repository,
            branch = %event.branch,
            "rule_matched"
        );

        match self
            .engine
            .deliver(endpoint, &event.repository, &event.branch)
            .await
        {
            Ok(delivery) => RuleOutcome::Triggered {
                path: delivery.path,
                attempts: delivery.attempts,
            },
            Err(e) => {
                error!(endpoint = %rule.endpoint, error = %e, "rule_delivery_failed");
                RuleOutcome::Failed(e)
            }
        }
    }
}
