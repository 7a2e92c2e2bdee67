//! Artifact data source enumeration recording where an image came from.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Defines the producer of a container image artifact.
///
/// This enumeration corresponds to the `ARTIFACT_DATA_SOURCE` PostgreSQL
/// enum. The data source decides how the owning column of the artifact is
/// interpreted and which artifacts a downstream pipeline may consume.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::ArtifactDataSource"]
pub enum ArtifactDataSource {
    /// Built by a CI pipeline runner inside the platform.
    #[db_rename = "ci_runner"]
    #[serde(rename = "ci_runner")]
    #[default]
    CiRunner,

    /// Registered from an external registry webhook or poll.
    #[db_rename = "external"]
    #[serde(rename = "external")]
    External,

    /// Produced by a pre-deployment hook stage plugin.
    #[db_rename = "pre_cd"]
    #[serde(rename = "pre_cd")]
    PreCd,

    /// Produced by a post-deployment hook stage plugin.
    #[db_rename = "post_cd"]
    #[serde(rename = "post_cd")]
    PostCd,
}

impl ArtifactDataSource {
    /// Returns whether the artifact was produced by a hook stage plugin
    /// rather than a CI build or external registration.
    #[inline]
    pub fn is_plugin_produced(self) -> bool {
        matches!(self, ArtifactDataSource::PreCd | ArtifactDataSource::PostCd)
    }

    /// Returns whether the artifact was registered from outside the platform.
    #[inline]
    pub fn is_external(self) -> bool {
        matches!(self, ArtifactDataSource::External)
    }
}
