//! Issue workflow states and the transition table between them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

/// Workflow state of an issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    EnumIter,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    /// Wire values, for error messages.
    pub const EXPECTED: &'static str = "open, in_progress, resolved";

    /// Whether `self -> to` is permitted.
    ///
    /// Self-transitions are always permitted. A resolved issue has to be
    /// reopened before work on it can start again.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        !matches!((self, to), (Self::Resolved, Self::InProgress))
    }

    /// Check a transition, returning `InvalidTransition` when it is not permitted.
    pub fn check_transition(self, to: Self) -> Result<()> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(Error::InvalidTransition { from: self, to })
        }
    }

    /// Whether the issue counts against the project's WIP limit.
    #[must_use]
    pub const fn is_work_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

/// Timestamp effects of moving an issue from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: IssueStatus,
    pub to: IssueStatus,
}

impl Transition {
    /// Validate and build a transition.
    pub fn new(from: IssueStatus, to: IssueStatus) -> Result<Self> {
        from.check_transition(to).map(|()| Self { from, to })
    }

    /// Entry into `in_progress`: runs the WIP guard and stamps `started_at`.
    #[must_use]
    pub const fn starts_work(self) -> bool {
        matches!(self.to, IssueStatus::InProgress) && !matches!(self.from, IssueStatus::InProgress)
    }

    /// Entry into `resolved`: stamps `finished_at`.
    #[must_use]
    pub const fn resolves(self) -> bool {
        matches!(self.to, IssueStatus::Resolved) && !matches!(self.from, IssueStatus::Resolved)
    }

    /// Leaving `resolved`: clears `finished_at`.
    #[must_use]
    pub const fn reopens(self) -> bool {
        matches!(self.from, IssueStatus::Resolved) && !matches!(self.to, IssueStatus::Resolved)
    }

    #[must_use]
    pub fn is_noop(self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(IssueStatus::InProgress.to_string(), "in_progress");
        assert_eq!(IssueStatus::from_str("resolved").ok(), Some(IssueStatus::Resolved));
        assert!(IssueStatus::from_str("done").is_err());
        assert!(IssueStatus::from_str("In_Progress").is_err());
    }

    #[test]
    fn test_status_serde_matches_strum() -> Result<()> {
        let json = serde_json::to_string(&IssueStatus::InProgress)?;
        assert_eq!(json, "\"in_progress\"");
        let back: IssueStatus = serde_json::from_str(&json)?;
        assert_eq!(back, IssueStatus::InProgress);
        Ok(())
    }

    #[test]
    fn test_resolved_cannot_restart_without_reopen() {
        let result = IssueStatus::Resolved.check_transition(IssueStatus::InProgress);
        assert!(matches!(
            result,
            Err(Error::InvalidTransition {
                from: IssueStatus::Resolved,
                to: IssueStatus::InProgress
            })
        ));
        assert!(IssueStatus::Resolved.can_transition_to(IssueStatus::Open));
        assert!(IssueStatus::Open.can_transition_to(IssueStatus::InProgress));
    }

    #[test]
    fn test_transition_effects_are_exclusive() {
        for from in IssueStatus::iter() {
            for to in IssueStatus::iter() {
                let Ok(t) = Transition::new(from, to) else {
                    continue;
                };
                if t.is_noop() {
                    assert!(!t.starts_work() && !t.resolves() && !t.reopens());
                }
                assert!(!(t.starts_work() && t.resolves()));
                assert!(!(t.resolves() && t.reopens()));
            }
        }
    }

    #[test]
    fn test_only_one_illegal_transition() {
        let illegal = IssueStatus::iter()
            .flat_map(|from| IssueStatus::iter().map(move |to| (from, to)))
            .filter(|(from, to)| !from.can_transition_to(*to))
            .count();
        assert_eq!(illegal, 1);
    }
}
