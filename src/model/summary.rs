use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::election::Election;
use super::vote::Vote;

/// Display status of a DAR collection, derived per query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DarCollectionStatus {
    Draft,
    Unreviewed,
    InProcess,
    Complete,
    Canceled,
}

impl fmt::Display for DarCollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "Draft",
            Self::Unreviewed => "Unreviewed",
            Self::InProcess => "In Process",
            Self::Complete => "Complete",
            Self::Canceled => "Canceled",
        };
        write!(f, "{s}")
    }
}

/// Actions a role may take on a collection in its current state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DarCollectionAction {
    Review,
    Cancel,
    Open,
    Vote,
    Update,
    Resume,
    Delete,
    Revise,
}

/// A computed view over one collection's elections, votes and datasets.
///
/// Assembled fresh from the underlying entities on every query and
/// never mutated independently of its sources; the projector fills in
/// `status` and `actions` for the acting role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DarCollectionSummary {
    pub dar_collection_id: Option<i32>,
    pub dar_code: Option<String>,
    pub name: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub researcher_id: Option<i32>,
    pub institution_id: Option<i32>,
    /// Reference ids of the member DARs in view.
    pub reference_ids: BTreeSet<String>,
    /// Dataset ids in view (role-scoped), ascending.
    pub dataset_ids: BTreeSet<i32>,
    /// Latest relevant election per reference id and dataset, by election id.
    pub elections: BTreeMap<i32, Election>,
    /// Votes visible to the viewer for the elections above.
    pub votes: Vec<Vote>,
    /// DAR status string by reference id.
    pub dar_statuses: BTreeMap<String, String>,
    pub status: Option<DarCollectionStatus>,
    pub actions: BTreeSet<DarCollectionAction>,
}

impl DarCollectionSummary {
    pub fn dataset_count(&self) -> usize {
        self.dataset_ids.len()
    }

    pub fn add_election(&mut self, election: Election) {
        self.elections.insert(election.election_id, election);
    }

    pub fn add_action(&mut self, action: DarCollectionAction) {
        self.actions.insert(action);
    }
}
