use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The concern a review round decides.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionType {
    /// Should the researcher get access to the dataset.
    DataAccess,
    /// Is the stated research purpose acceptable.
    Rp,
    /// Does the consent translation match the data-use limitations.
    TranslateDul,
}

impl fmt::Display for ElectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataAccess => "DataAccess",
            Self::Rp => "RP",
            Self::TranslateDul => "TranslateDUL",
        };
        write!(f, "{s}")
    }
}

/// States in the election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Accepting votes.
    Open,
    /// All votes in, outcome recorded.
    Closed,
    /// Explicitly cancelled; never reopened.
    Canceled,
    /// Terminal approved/denied outcome.
    Final,
    /// RP election awaiting chair sign-off; accepts votes like Open.
    PendingApproval,
}

impl ElectionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Canceled | Self::Final)
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::Canceled => "Canceled",
            Self::Final => "Final",
            Self::PendingApproval => "PendingApproval",
        };
        write!(f, "{s}")
    }
}

/// A single review round for one DAR and one concern.
///
/// For a given reference id, at most one Open election per type exists
/// at a time; the latest election per reference id and dataset is the
/// one that feeds status derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub election_id: i32,
    /// Reference id of the DAR under review.
    pub reference_id: String,
    pub election_type: ElectionType,
    pub status: ElectionStatus,
    /// The dataset under review, for DataAccess/RP elections.
    pub dataset_id: Option<i32>,
    pub final_vote: Option<bool>,
    pub final_vote_date: Option<DateTime<Utc>>,
    pub create_date: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Election {
    /// Whether the election accepts vote updates. RP elections are not
    /// status-gated, so this only constrains the other types.
    pub fn accepts_votes(&self) -> bool {
        matches!(
            self.status,
            ElectionStatus::Open | ElectionStatus::PendingApproval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Election {
        pub fn example(
            election_id: i32,
            reference_id: &str,
            election_type: ElectionType,
            status: ElectionStatus,
            dataset_id: i32,
        ) -> Self {
            Self {
                election_id,
                reference_id: reference_id.to_string(),
                election_type,
                status,
                dataset_id: Some(dataset_id),
                final_vote: None,
                final_vote_date: None,
                create_date: Utc::now(),
                last_update: None,
            }
        }
    }

    #[test]
    fn pending_approval_accepts_votes() {
        let mut election =
            Election::example(1, "ref-1", ElectionType::Rp, ElectionStatus::PendingApproval, 1);
        assert!(election.accepts_votes());
        election.status = ElectionStatus::Closed;
        assert!(!election.accepts_votes());
        assert!(election.status.is_terminal());
    }
}
