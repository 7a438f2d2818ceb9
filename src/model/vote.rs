use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The capacity in which a ballot is cast.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteType {
    /// Chair-capacity vote on the question under review.
    Chairperson,
    /// Ordinary committee-member vote.
    Dac,
    /// The chair's final access decision.
    Final,
    /// Chair agreement with the algorithmic match (absent under manual review).
    Agreement,
    /// A data owner's review vote.
    DataOwner,
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Chairperson => "Chairperson",
            Self::Dac => "DAC",
            Self::Final => "FINAL",
            Self::Agreement => "AGREEMENT",
            Self::DataOwner => "DataOwner",
        };
        write!(f, "{s}")
    }
}

/// One ballot: exactly one exists per (election, user, vote type).
///
/// A `None` value means the vote has not been cast yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: i32,
    pub election_id: i32,
    pub user_id: i32,
    pub vote_type: VoteType,
    pub vote: Option<bool>,
    pub rationale: Option<String>,
    pub is_reminder_sent: bool,
    pub has_concerns: Option<bool>,
    pub create_date: DateTime<Utc>,
    pub update_date: Option<DateTime<Utc>>,
}

impl Vote {
    /// Vote types that count toward a member's "has voted" check.
    pub fn counts_for_completeness(&self) -> bool {
        matches!(self.vote_type, VoteType::Dac | VoteType::Chairperson)
    }
}
