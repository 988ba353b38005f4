//! Rule evaluation.
//!
//! A rule is eligible when the event's repository is included (optionally
//! narrowed to branches) or, for pushes, its branch is included (optionally
//! narrowed to repositories). Exclusion lists use the same algorithm and
//! always win. Empty inclusion lists never match.

use tracing::debug;

use crate::error::{Result, TriggerError};
use crate::event::{Event, EventKind};
use crate::rules::types::{ScopedName, TriggerRule};

/// Matches any repository, branch or action.
pub const WILDCARD: &str = "*";

/// Decide whether `rule` applies to `event`.
///
/// Fails with `UnsupportedEvent` when the rule has no conditions for the
/// event kind.
pub fn matches(rule: &TriggerRule, event: &Event) -> Result<bool> {
    let conditions = rule
        .events
        .for_kind(event.kind)
        .ok_or_else(|| TriggerError::unsupported(&rule.endpoint, event.kind.as_str()))?;

    if event.kind == EventKind::PullRequest {
        if event.action.is_empty() {
            debug!(endpoint = %rule.endpoint, "rule_rejected_missing_action");
            return Ok(false);
        }
        if !action_allowed(conditions.actions.as_deref(), &event.action) {
            debug!(
                endpoint = %rule.endpoint,
                action = %event.action,
                "rule_rejected_action_not_allowed"
            );
            return Ok(false);
        }
    }

    let is_push = event.kind == EventKind::Push;
    let repo = event.repository.as_str();
    let branch = event.branch.as_str();

    let included = scope_matches(conditions.repositories.as_deref(), repo, branch)
        || (is_push && scope_matches(conditions.branches.as_deref(), branch, repo));

    let excluded = scope_matches(conditions.exclude_repositories.as_deref(), repo, branch)
        || (is_push && scope_matches(conditions.exclude_branches.as_deref(), branch, repo));

    debug!(
        endpoint = %rule.endpoint,
        event = %event.kind,
        repository = %repo,
        branch = %branch,
        included = included,
        excluded = excluded,
        "rule_evaluated"
    );

    Ok(included && !excluded)
}

/// Whether any entry names `primary` (or is the wildcard) and its nested
/// list is empty or contains `nested`.
///
/// Repository lists pass `(repository, branch)`, branch lists pass
/// `(branch, repository)`.
pub fn scope_matches(entries: Option<&[ScopedName]>, primary: &str, nested: &str) -> bool {
    entries.unwrap_or_default().iter().any(|entry| {
        let name_matches = entry.name == primary || entry.name == WILDCARD;
        name_matches
            && match entry.within.as_deref() {
                None | Some([]) => true,
                Some(allowed) => allowed.iter().any(|n| n == nested),
            }
    })
}

fn action_allowed(actions: Option<&[String]>, action: &str) -> bool {
    actions
        .unwrap_or_default()
        .iter()
        .any(|a| a == action || a == WILDCARD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RefKind;
    use crate::rules::types::{EndpointConditions, EventTriggers};
    use proptest::prelude::*;

    fn push(repo: &str, branch: &str) -> Event {
        Event::new(EventKind::Push, repo, branch, RefKind::Branch, "")
    }

    fn pull_request(repo: &str, action: &str) -> Event {
        Event::new(EventKind::PullRequest, repo, "", RefKind::Unknown, action)
    }

    fn push_rule(conditions: EndpointConditions) -> TriggerRule {
        TriggerRule {
            endpoint: "build".to_string(),
            events: EventTriggers {
                push: Some(conditions),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_repository_with_branch_list() {
        let rule = push_rule(EndpointConditions {
            repositories: Some(vec![ScopedName::within("app", ["main"])]),
            ..Default::default()
        });

        assert!(matches(&rule, &push("app", "main")).unwrap());
        assert!(!matches(&rule, &push("app", "dev")).unwrap());
        assert!(!matches(&rule, &push("other", "main")).unwrap());
    }

    #[test]
    fn test_empty_nested_list_matches_any_branch() {
        let rule = push_rule(EndpointConditions {
            repositories: Some(vec![ScopedName::within("app", Vec::<String>::new())]),
            ..Default::default()
        });

        assert!(matches(&rule, &push("app", "anything")).unwrap());
    }

    #[test]
    fn test_branch_list_with_nested_repositories() {
        let rule = push_rule(EndpointConditions {
            branches: Some(vec![ScopedName::within("main", ["api", "web"])]),
            ..Default::default()
        });

        assert!(matches(&rule, &push("api", "main")).unwrap());
        assert!(matches(&rule, &push("web", "main")).unwrap());
        assert!(!matches(&rule, &push("docs", "main")).unwrap());
        assert!(!matches(&rule, &push("api", "dev")).unwrap());
    }

    #[test]
    fn test_branch_lists_only_apply_to_push() {
        let rule = TriggerRule {
            endpoint: "build".to_string(),
            events: EventTriggers {
                create: Some(EndpointConditions {
                    branches: Some(vec![ScopedName::new(WILDCARD)]),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };
        let event = Event::new(EventKind::Create, "app", "feature", RefKind::Branch, "");

        assert!(!matches(&rule, &event).unwrap());
    }

    #[test]
    fn test_exclude_branch_beats_include_repository() {
        let rule = push_rule(EndpointConditions {
            repositories: Some(vec![ScopedName::new("app")]),
            exclude_branches: Some(vec![ScopedName::new("wip")]),
            ..Default::default()
        });

        assert!(matches(&rule, &push("app", "main")).unwrap());
        assert!(!matches(&rule, &push("app", "wip")).unwrap());
    }

    #[test]
    fn test_exclude_repository_with_branch_scope() {
        let rule = push_rule(EndpointConditions {
            branches: Some(vec![ScopedName::new(WILDCARD)]),
            exclude_repositories: Some(vec![ScopedName::within("legacy", ["main"])]),
            ..Default::default()
        });

        assert!(!matches(&rule, &push("legacy", "main")).unwrap());
        assert!(matches(&rule, &push("legacy", "dev")).unwrap());
        assert!(matches(&rule, &push("app", "main")).unwrap());
    }

    #[test]
    fn test_no_inclusion_lists_never_match() {
        let rule = push_rule(EndpointConditions::default());
        assert!(!matches(&rule, &push("app", "main")).unwrap());

        let rule = push_rule(EndpointConditions {
            repositories: Some(vec![]),
            branches: Some(vec![]),
            ..Default::default()
        });
        assert!(!matches(&rule, &push("app", "main")).unwrap());
    }

    #[test]
    fn test_unsupported_event_kind() {
        let rule = push_rule(EndpointConditions {
            repositories: Some(vec![ScopedName::new(WILDCARD)]),
            ..Default::default()
        });
        let event = Event::new(EventKind::Delete, "app", "main", RefKind::Branch, "");

        let err = matches(&rule, &event).unwrap_err();
        assert_eq!(err, TriggerError::unsupported("build", "delete"));
    }

    #[test]
    fn test_pull_request_actions() {
        let rule = TriggerRule {
            endpoint: "pr".to_string(),
            events: EventTriggers {
                pull_request: Some(EndpointConditions {
                    repositories: Some(vec![ScopedName::new("app")]),
                    actions: Some(vec!["opened".to_string(), "synchronize".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };

        assert!(matches(&rule, &pull_request("app", "opened")).unwrap());
        assert!(matches(&rule, &pull_request("app", "synchronize")).unwrap());
        assert!(!matches(&rule, &pull_request("app", "closed")).unwrap());
        assert!(!matches(&rule, &pull_request("app", "")).unwrap());
    }

    #[test]
    fn test_pull_request_wildcard_action_and_missing_list() {
        let mut conditions = EndpointConditions {
            repositories: Some(vec![ScopedName::new("app")]),
            actions: Some(vec![WILDCARD.to_string()]),
            ..Default::default()
        };
        let rule = |conditions: EndpointConditions| TriggerRule {
            endpoint: "pr".to_string(),
            events: EventTriggers {
                pull_request: Some(conditions),
                ..Default::default()
            },
        };

        assert!(matches(&rule(conditions.clone()), &pull_request("app", "labeled")).unwrap());

        conditions.actions = None;
        assert!(!matches(&rule(conditions), &pull_request("app", "opened")).unwrap());
    }

    #[test]
    fn test_scope_matches_absent_list() {
        assert!(!scope_matches(None, "app", "main"));
    }

    proptest! {
        #[test]
        fn wildcard_repository_matches_any_name(repo in "[a-zA-Z0-9._-]{1,30}", branch in "[a-z0-9/-]{1,20}") {
            let rule = push_rule(EndpointConditions {
                repositories: Some(vec![ScopedName::new(WILDCARD)]),
                ..Default::default()
            });
            prop_assert!(matches(&rule, &push(&repo, &branch)).unwrap());
        }

        #[test]
        fn exclusion_always_wins(
            repo in "[a-z]{1,10}",
            branch in "[a-z]{1,10}",
            include_by_branch in any::<bool>(),
            exclude_by_branch in any::<bool>(),
            scoped in any::<bool>(),
        ) {
            let include = vec![ScopedName::new(WILDCARD)];
            let mut conditions = EndpointConditions::default();
            if include_by_branch {
                conditions.branches = Some(include);
            } else {
                conditions.repositories = Some(include);
            }
            let event = push(&repo, &branch);
            prop_assert!(matches(&push_rule(conditions.clone()), &event).unwrap());

            let exclude = if exclude_by_branch {
                if scoped { ScopedName::within(branch.clone(), [repo.clone()]) } else { ScopedName::new(branch.clone()) }
            } else if scoped {
                ScopedName::within(repo.clone(), [branch.clone()])
            } else {
                ScopedName::new(repo.clone())
            };
            if exclude_by_branch {
                conditions.exclude_branches = Some(vec![exclude]);
            } else {
                conditions.exclude_repositories = Some(vec![exclude]);
            }
            prop_assert!(!matches(&push_rule(conditions), &event).unwrap());
        }

        #[test]
        fn tag_pushes_never_match(repo in "[a-z]{1,10}") {
            let rule = push_rule(EndpointConditions {
                repositories: Some(vec![ScopedName::within(WILDCARD, ["main"])]),
                branches: Some(vec![ScopedName::within("main", [WILDCARD])]),
                ..Default::default()
            });
            let event = Event::new(EventKind::Push, repo, "", RefKind::Tag, "");
            prop_assert!(!matches(&rule, &event).unwrap());
        }
    }
}
