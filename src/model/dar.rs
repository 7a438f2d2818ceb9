use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// DAR status string meaning the request was withdrawn by its owner.
pub const DAR_STATUS_CANCELED: &str = "Canceled";

/// DAR status string meaning the request is hidden from all views.
pub const DAR_STATUS_ARCHIVED: &str = "Archived";

/// The mutable JSON payload of a data-access request.
///
/// Stored as a schemaless blob upstream; the fields the engine reads
/// are typed here and everything else rides along in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarData {
    pub project_title: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub dataset_ids: Vec<i32>,
    pub create_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A researcher's request for access to controlled datasets.
///
/// The reference id is the stable key used across elections, votes and
/// purpose-keyed matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccessRequest {
    pub reference_id: String,
    pub collection_id: Option<i32>,
    pub user_id: i32,
    pub draft: bool,
    pub submission_date: Option<DateTime<Utc>>,
    pub data: DarData,
}

impl DataAccessRequest {
    pub fn dataset_ids(&self) -> &[i32] {
        &self.data.dataset_ids
    }

    pub fn is_canceled(&self) -> bool {
        self.status_is(DAR_STATUS_CANCELED)
    }

    pub fn is_archived(&self) -> bool {
        self.status_is(DAR_STATUS_ARCHIVED)
    }

    fn status_is(&self, status: &str) -> bool {
        self.data
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(status))
    }

    /// A DAR flagged for restrictions the matching service cannot judge
    /// must be reviewed manually, which suppresses the agreement vote.
    pub fn requires_manual_review(&self) -> bool {
        ["poa", "other"]
            .iter()
            .any(|key| self.data.extra.get(*key) == Some(&Value::Bool(true)))
    }
}
