//! Workflow runner status enumeration and the transitions allowed between statuses.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines the execution status of a workflow runner.
///
/// This enumeration corresponds to the `WORKFLOW_RUNNER_STATUS` PostgreSQL enum.
/// A runner in a terminal status never changes status again; the store layer
/// enforces this on every update.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::WorkflowRunnerStatus"]
pub enum WorkflowRunnerStatus {
    /// Accepted but not yet picked up by the trigger processor.
    #[db_rename = "queued"]
    #[serde(rename = "queued")]
    #[default]
    Queued,

    /// Picked up; the release driver call is being prepared or in flight.
    #[db_rename = "starting"]
    #[serde(rename = "starting")]
    Starting,

    /// The driver accepted the release; waiting for it to become healthy.
    #[db_rename = "running"]
    #[serde(rename = "running")]
    Running,

    /// The release is deployed and healthy.
    #[db_rename = "succeeded"]
    #[serde(rename = "succeeded")]
    Succeeded,

    /// The release failed, was superseded, or hit an unrecoverable error.
    #[db_rename = "failed"]
    #[serde(rename = "failed")]
    Failed,

    /// Aborted by an operator. Never produced by the engine; kept for
    /// historical rows.
    #[db_rename = "aborted"]
    #[serde(rename = "aborted")]
    Aborted,

    /// Cancelled before the driver call completed.
    #[db_rename = "cancelled"]
    #[serde(rename = "cancelled")]
    Cancelled,

    /// The driver call exceeded its configured deadline.
    #[db_rename = "timed_out"]
    #[serde(rename = "timed_out")]
    TimedOut,

    /// Live status could not be fetched from the driver; the reconciler
    /// retries on its next tick.
    #[db_rename = "unable_to_fetch"]
    #[serde(rename = "unable_to_fetch")]
    UnableToFetch,
}

impl WorkflowRunnerStatus {
    /// All terminal statuses. A runner in one of these never transitions again.
    pub const TERMINAL: [WorkflowRunnerStatus; 5] = [
        WorkflowRunnerStatus::Succeeded,
        WorkflowRunnerStatus::Failed,
        WorkflowRunnerStatus::Aborted,
        WorkflowRunnerStatus::Cancelled,
        WorkflowRunnerStatus::TimedOut,
    ];

    /// Returns whether the runner is waiting to be picked up.
    #[inline]
    pub fn is_queued(self) -> bool {
        matches!(self, WorkflowRunnerStatus::Queued)
    }

    /// Returns whether the driver call is being prepared or in flight.
    #[inline]
    pub fn is_starting(self) -> bool {
        matches!(self, WorkflowRunnerStatus::Starting)
    }

    /// Returns whether the release is deployed but not yet healthy.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, WorkflowRunnerStatus::Running)
    }

    /// Returns whether the runner succeeded.
    #[inline]
    pub fn is_succeeded(self) -> bool {
        matches!(self, WorkflowRunnerStatus::Succeeded)
    }

    /// Returns whether the runner failed.
    #[inline]
    pub fn is_failed(self) -> bool {
        matches!(self, WorkflowRunnerStatus::Failed)
    }

    /// Returns whether the last status fetch against the driver failed.
    #[inline]
    pub fn is_unable_to_fetch(self) -> bool {
        matches!(self, WorkflowRunnerStatus::UnableToFetch)
    }

    /// Returns whether the status is terminal.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowRunnerStatus::Succeeded
                | WorkflowRunnerStatus::Failed
                | WorkflowRunnerStatus::Aborted
                | WorkflowRunnerStatus::Cancelled
                | WorkflowRunnerStatus::TimedOut
        )
    }

    /// Returns whether the runner is still in flight (any non-terminal status).
    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Returns whether a direct transition from `self` to `to` is allowed.
    ///
    /// Terminal statuses allow no transitions at all. Non-terminal statuses
    /// each allow a fixed set of successors; anything outside that set must be
    /// reached through an intermediate status (for example `Starting` reaches
    /// `Succeeded` only through `Running`).
    pub fn can_transition_to(self, to: WorkflowRunnerStatus) -> bool {
        use WorkflowRunnerStatus::*;

        match self {
            Queued => matches!(to, Starting | Failed | Cancelled),
            Starting => matches!(to, Running | Failed | TimedOut | Cancelled | UnableToFetch),
            Running => matches!(to, Succeeded | Failed | TimedOut | Cancelled | UnableToFetch),
            UnableToFetch => matches!(to, Running | Succeeded | Failed | TimedOut),
            Succeeded | Failed | Aborted | Cancelled | TimedOut => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::WorkflowRunnerStatus::{self, *};

    #[test]
    fn terminal_statuses_allow_no_transitions() {
        for from in WorkflowRunnerStatus::TERMINAL {
            for to in WorkflowRunnerStatus::iter() {
                assert!(
                    !from.can_transition_to(to),
                    "{from} must not transition to {to}"
                );
            }
        }
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        let allowed: &[(WorkflowRunnerStatus, &[WorkflowRunnerStatus])] = &[
            (Queued, &[Starting, Failed, Cancelled]),
            (Starting, &[Running, Failed, TimedOut, Cancelled, UnableToFetch]),
            (Running, &[Succeeded, Failed, TimedOut, Cancelled, UnableToFetch]),
            (UnableToFetch, &[Running, Succeeded, Failed, TimedOut]),
        ];

        for (from, successors) in allowed {
            for to in WorkflowRunnerStatus::iter() {
                assert_eq!(
                    from.can_transition_to(to),
                    successors.contains(&to),
                    "unexpected transition rule for {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn aborted_is_terminal_but_never_a_target() {
        assert!(Aborted.is_terminal());
        for from in WorkflowRunnerStatus::iter() {
            assert!(!from.can_transition_to(Aborted));
        }
    }

    #[test]
    fn terminal_set_is_consistent() {
        for status in WorkflowRunnerStatus::iter() {
            assert_eq!(
                status.is_terminal(),
                WorkflowRunnerStatus::TERMINAL.contains(&status)
            );
            assert_eq!(status.is_active(), !status.is_terminal());
        }
    }
}
