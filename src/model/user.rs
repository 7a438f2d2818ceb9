use serde::{Deserialize, Serialize};

/// The closed set of role names a user may hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleName {
    Admin,
    Chairperson,
    Member,
    Researcher,
    SigningOfficial,
    DataOwner,
    Alumni,
}

/// A role held by a user. Chairperson and Member roles carry the DAC
/// they apply to; a `None` DAC marks a globally-scoped voter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub name: RoleName,
    pub dac_id: Option<i32>,
}

impl UserRole {
    pub fn new(name: RoleName) -> Self {
        Self { name, dac_id: None }
    }

    pub fn in_dac(name: RoleName, dac_id: i32) -> Self {
        Self {
            name,
            dac_id: Some(dac_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i32,
    pub email: String,
    pub display_name: String,
    pub institution_id: Option<i32>,
    pub roles: Vec<UserRole>,
}

impl User {
    pub fn has_role(&self, name: RoleName) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// Whether the user chairs the given DAC. With no DAC in play, any
    /// chairperson role qualifies.
    pub fn is_chairperson_for(&self, dac_id: Option<i32>) -> bool {
        self.roles
            .iter()
            .any(|r| r.name == RoleName::Chairperson && (dac_id.is_none() || r.dac_id == dac_id))
    }

    /// Distinct DAC ids attached to the user's chair/member roles.
    pub fn dac_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .roles
            .iter()
            .filter(|r| matches!(r.name, RoleName::Chairperson | RoleName::Member))
            .filter_map(|r| r.dac_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
