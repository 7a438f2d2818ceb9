//! Persistence collaborator for the review engine.
//!
//! The engine never talks to a database directly; every operation goes
//! through [`Store`], which exposes the bulk finders and mutators the
//! services need. Implementations are expected to run each engine call
//! inside one transaction boundary so the cascade and bulk-cancel
//! operations stay atomic.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::model::{
    Dac, DarCollection, DataAccessRequest, Dataset, Election, ElectionStatus, ElectionType, User,
    Vote, VoteType,
};
use crate::Result;

pub use memory::MemoryStore;

pub trait Store {
    // -- DAR collections --

    fn find_collection_by_id(&self, collection_id: i32) -> Result<Option<DarCollection>>;
    fn find_collection_by_reference_id(&self, reference_id: &str) -> Result<Option<DarCollection>>;
    fn find_collections_created_by_user(&self, user_id: i32) -> Result<Vec<DarCollection>>;
    fn find_all_collections(&self) -> Result<Vec<DarCollection>>;
    fn delete_collection_by_id(&mut self, collection_id: i32) -> Result<()>;

    // -- Data access requests --

    fn find_drafts_by_user_id(&self, user_id: i32) -> Result<Vec<DataAccessRequest>>;
    /// Dataset ids related to the given DARs, ascending and distinct.
    fn find_dar_dataset_ids(&self, reference_ids: &[String]) -> Result<Vec<i32>>;
    fn cancel_dars_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()>;
    fn delete_dar_dataset_relations_by_reference_ids(
        &mut self,
        reference_ids: &[String],
    ) -> Result<()>;
    fn delete_dars_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()>;

    // -- Purpose-keyed matches --

    fn delete_matches_by_purpose_ids(&mut self, purpose_ids: &[String]) -> Result<()>;

    // -- Elections --

    fn insert_election(
        &mut self,
        election_type: ElectionType,
        reference_id: &str,
        dataset_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Election>;
    fn find_elections_by_ids(&self, election_ids: &[i32]) -> Result<Vec<Election>>;
    fn find_elections_by_reference_ids(&self, reference_ids: &[String]) -> Result<Vec<Election>>;
    fn find_open_elections_by_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<Election>>;
    /// Latest election per (reference id, type, dataset), any status.
    fn find_last_elections_by_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<Election>>;
    fn find_last_election_by_reference_and_dataset(
        &self,
        reference_id: &str,
        dataset_id: i32,
        election_type: ElectionType,
    ) -> Result<Option<Election>>;
    fn find_open_elections_by_dac_id(&self, dac_id: i32) -> Result<Vec<Election>>;
    fn update_election_status(
        &mut self,
        election_id: i32,
        status: ElectionStatus,
        now: DateTime<Utc>,
    ) -> Result<()>;
    fn set_election_final_vote(
        &mut self,
        election_id: i32,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<()>;
    fn delete_election_access_rp_links(&mut self, election_ids: &[i32]) -> Result<()>;
    fn delete_elections_by_ids(&mut self, election_ids: &[i32]) -> Result<()>;
    /// The DAC responsible for an election, resolved via its dataset.
    fn find_dac_for_election(&self, election_id: i32) -> Result<Option<Dac>>;

    // -- Votes --

    fn insert_vote(
        &mut self,
        user_id: i32,
        election_id: i32,
        vote_type: VoteType,
        now: DateTime<Utc>,
    ) -> Result<Vote>;
    fn find_votes_by_ids(&self, vote_ids: &[i32]) -> Result<Vec<Vote>>;
    fn find_votes_by_election_ids(&self, election_ids: &[i32]) -> Result<Vec<Vote>>;
    fn update_vote_values(
        &mut self,
        vote_ids: &[i32],
        value: bool,
        rationale: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Vote>>;
    fn update_vote_rationale(&mut self, vote_ids: &[i32], rationale: &str) -> Result<Vec<Vote>>;
    fn delete_votes_by_ids(&mut self, vote_ids: &[i32]) -> Result<()>;
    fn delete_votes_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()>;
    /// Distinct users holding votes on elections for the given DARs.
    fn find_vote_users_by_election_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<User>>;

    // -- Datasets, DACs and users --

    fn find_datasets_by_ids(&self, dataset_ids: &[i32]) -> Result<Vec<Dataset>>;
    /// Dataset ids the user may act on through DAC membership.
    fn find_dataset_ids_by_dac_user(&self, user: &User) -> Result<Vec<i32>>;
    fn find_data_owners_for_dataset(&self, dataset_id: i32) -> Result<Vec<User>>;
    fn find_users_enabled_to_vote_by_dac(&self, dac_id: i32) -> Result<Vec<User>>;
    fn find_non_dac_users_enabled_to_vote(&self) -> Result<Vec<User>>;
    fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>>;
}
