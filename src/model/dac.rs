use serde::{Deserialize, Serialize};

use super::user::User;

/// A Data Access Committee: the body that reviews and votes on DARs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dac {
    pub dac_id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Chairpersons, in membership order.
    pub chairpersons: Vec<User>,
    /// Ordinary members, in membership order.
    pub members: Vec<User>,
}

impl Dac {
    /// Everyone on the committee, chairs first.
    pub fn voting_users(&self) -> Vec<&User> {
        self.chairpersons.iter().chain(self.members.iter()).collect()
    }
}
