//! Trigger policy enumeration for pipelines and their hook stages.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines whether a pipeline or stage fires on its own or waits for a user.
///
/// This enumeration corresponds to the `TRIGGER_POLICY` PostgreSQL enum.
/// Pipelines carry one policy for the deploy stage and separate policies for
/// the pre and post hook stages.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::TriggerPolicy"]
pub enum TriggerPolicy {
    /// Fired by the engine as soon as the upstream stage or pipeline succeeds.
    #[db_rename = "automatic"]
    #[serde(rename = "automatic")]
    Automatic,

    /// Fired only by an explicit user request.
    #[db_rename = "manual"]
    #[serde(rename = "manual")]
    #[default]
    Manual,
}

impl TriggerPolicy {
    /// Returns whether the stage fires without user intervention.
    #[inline]
    pub fn is_automatic(self) -> bool {
        matches!(self, TriggerPolicy::Automatic)
    }

    /// Returns whether the stage waits for an explicit user request.
    #[inline]
    pub fn is_manual(self) -> bool {
        matches!(self, TriggerPolicy::Manual)
    }
}
