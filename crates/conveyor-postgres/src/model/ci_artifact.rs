//! CI artifact model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::ci_artifact;
use crate::types::ArtifactDataSource;

/// Container image artifact produced by a build or registered externally.
///
/// Exactly one of `pipeline_id` and `component_id` identifies the producer,
/// depending on `data_source`. Hook stage plugins that rebuild or re-tag an
/// image record their output as a child artifact pointing back at the
/// original through `parent_ci_artifact_id`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = ci_artifact)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CiArtifact {
    /// Unique artifact identifier.
    pub id: i64,
    /// Producing CI pipeline, when built inside the platform.
    pub pipeline_id: Option<i64>,
    /// External component identifier, when registered from outside.
    pub component_id: Option<String>,
    /// Full image reference including tag.
    pub image: String,
    /// Image content digest, if known.
    pub image_digest: Option<String>,
    /// Source material metadata (git commits, build inputs).
    pub material_info: serde_json::Value,
    /// Where the artifact came from.
    pub data_source: ArtifactDataSource,
    /// Original artifact this one was derived from, if any.
    pub parent_ci_artifact_id: Option<i64>,
    /// Whether vulnerability scanning is enabled for this artifact.
    pub scan_enabled: bool,
    /// Whether the artifact has been scanned.
    pub scanned: bool,
    /// Whether the artifact archive was uploaded to storage.
    pub is_artifact_uploaded: bool,
    /// When the artifact was created.
    pub created_on: Timestamp,
    /// When the artifact was last updated.
    pub updated_on: Timestamp,
}

/// Data for creating a new CI artifact.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = ci_artifact)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCiArtifact {
    /// Producing CI pipeline.
    pub pipeline_id: Option<i64>,
    /// External component identifier.
    pub component_id: Option<String>,
    /// Image reference (required).
    pub image: String,
    /// Image content digest.
    pub image_digest: Option<String>,
    /// Source material metadata.
    pub material_info: Option<serde_json::Value>,
    /// Artifact data source (required).
    pub data_source: ArtifactDataSource,
    /// Original artifact this one derives from.
    pub parent_ci_artifact_id: Option<i64>,
    /// Scanning enabled flag.
    pub scan_enabled: Option<bool>,
    /// Scanned flag.
    pub scanned: Option<bool>,
    /// Uploaded flag.
    pub is_artifact_uploaded: Option<bool>,
}

/// Data for updating a CI artifact.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = ci_artifact)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateCiArtifact {
    /// Scanned flag.
    pub scanned: Option<bool>,
    /// Uploaded flag.
    pub is_artifact_uploaded: Option<bool>,
}

impl CiArtifact {
    /// Returns whether the artifact was produced by a hook stage plugin.
    pub fn is_plugin_produced(&self) -> bool {
        self.data_source.is_plugin_produced()
    }

    /// Returns whether the artifact was registered from outside the platform.
    pub fn is_external(&self) -> bool {
        self.data_source.is_external()
    }

    /// Returns whether the artifact derives from another artifact.
    pub fn has_parent(&self) -> bool {
        self.parent_ci_artifact_id.is_some()
    }

    /// Returns the artifact whose identity should flow to downstream
    /// pipelines: the original for derived artifacts, otherwise itself.
    pub fn lineage_root_id(&self) -> i64 {
        self.parent_ci_artifact_id.unwrap_or(self.id)
    }
}
