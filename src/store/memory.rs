//! Deterministic in-memory [`Store`].
//!
//! Backs the test suite and doubles as a reference implementation of
//! the collaborator contract. Every mutating call is appended to an op
//! log so tests can assert negative-path guarantees (no writes on a
//! failed cascade, no-op chair cancellation, and so on).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::model::{
    Dac, DarCollection, DataAccessRequest, Dataset, Election, ElectionStatus, ElectionType,
    RoleName, User, Vote, VoteType, DAR_STATUS_CANCELED,
};
use crate::store::Store;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<i32, DarCollection>,
    dars: BTreeMap<String, DataAccessRequest>,
    datasets: BTreeMap<i32, Dataset>,
    dacs: BTreeMap<i32, Dac>,
    users: BTreeMap<i32, User>,
    /// Data owner user ids by dataset id.
    data_owners: BTreeMap<i32, Vec<i32>>,
    elections: BTreeMap<i32, Election>,
    votes: BTreeMap<i32, Vote>,
    /// Purpose ids (DAR reference ids) with algorithmic match results.
    matches: BTreeSet<String>,
    /// Access election id -> RP election id.
    access_rp_links: BTreeMap<i32, i32>,
    next_election_id: i32,
    next_vote_id: i32,
    ops: Vec<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding helpers --

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.user_id, user);
    }

    pub fn insert_dac(&mut self, dac_id: i32, name: &str) {
        self.dacs.insert(
            dac_id,
            Dac {
                dac_id,
                name: name.to_string(),
                description: None,
                chairpersons: Vec::new(),
                members: Vec::new(),
            },
        );
    }

    pub fn insert_dataset(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.dataset_id, dataset);
    }

    pub fn set_data_owners(&mut self, dataset_id: i32, user_ids: Vec<i32>) {
        self.data_owners.insert(dataset_id, user_ids);
    }

    /// Seed a collection; its member DARs are stored individually.
    pub fn insert_collection(&mut self, mut collection: DarCollection) {
        for (reference_id, dar) in std::mem::take(&mut collection.dars) {
            self.dars.insert(reference_id, dar);
        }
        self.collections
            .insert(collection.dar_collection_id, collection);
    }

    pub fn insert_dar(&mut self, dar: DataAccessRequest) {
        self.dars.insert(dar.reference_id.clone(), dar);
    }

    pub fn add_match(&mut self, purpose_id: &str) {
        self.matches.insert(purpose_id.to_string());
    }

    pub fn link_access_rp(&mut self, access_election_id: i32, rp_election_id: i32) {
        self.access_rp_links
            .insert(access_election_id, rp_election_id);
    }

    /// Seed an election with an explicit id and status.
    pub fn seed_election(&mut self, election: Election) {
        self.next_election_id = self.next_election_id.max(election.election_id);
        self.elections.insert(election.election_id, election);
    }

    /// Seed a vote with an explicit id.
    pub fn seed_vote(&mut self, vote: Vote) {
        self.next_vote_id = self.next_vote_id.max(vote.vote_id);
        self.votes.insert(vote.vote_id, vote);
    }

    // -- op log --

    pub fn ops(&self) -> &[&'static str] {
        &self.ops
    }

    pub fn op_count(&self, name: &str) -> usize {
        self.ops.iter().filter(|op| **op == name).count()
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    // -- internals --

    fn populated_collection(&self, collection: &DarCollection) -> DarCollection {
        let mut populated = collection.clone();
        populated.dars = self
            .dars
            .values()
            .filter(|dar| dar.collection_id == Some(collection.dar_collection_id))
            .map(|dar| (dar.reference_id.clone(), dar.clone()))
            .collect();
        populated
    }

    fn assembled_dac(&self, dac_id: i32) -> Option<Dac> {
        let mut dac = self.dacs.get(&dac_id)?.clone();
        dac.chairpersons = self
            .users
            .values()
            .filter(|u| {
                u.roles
                    .iter()
                    .any(|r| r.name == RoleName::Chairperson && r.dac_id == Some(dac_id))
            })
            .cloned()
            .collect();
        dac.members = self
            .users
            .values()
            .filter(|u| {
                u.roles
                    .iter()
                    .any(|r| r.name == RoleName::Member && r.dac_id == Some(dac_id))
            })
            .cloned()
            .collect();
        Some(dac)
    }

    fn elections_for_references(&self, reference_ids: &[String]) -> Vec<Election> {
        self.elections
            .values()
            .filter(|e| reference_ids.iter().any(|r| *r == e.reference_id))
            .cloned()
            .collect()
    }
}

impl Store for MemoryStore {
    fn find_collection_by_id(&self, collection_id: i32) -> Result<Option<DarCollection>> {
        Ok(self
            .collections
            .get(&collection_id)
            .map(|c| self.populated_collection(c)))
    }

    fn find_collection_by_reference_id(&self, reference_id: &str) -> Result<Option<DarCollection>> {
        let Some(dar) = self.dars.get(reference_id) else {
            return Ok(None);
        };
        match dar.collection_id {
            Some(id) => self.find_collection_by_id(id),
            None => Ok(None),
        }
    }

    fn find_collections_created_by_user(&self, user_id: i32) -> Result<Vec<DarCollection>> {
        Ok(self
            .collections
            .values()
            .filter(|c| c.create_user_id == user_id)
            .map(|c| self.populated_collection(c))
            .collect())
    }

    fn find_all_collections(&self) -> Result<Vec<DarCollection>> {
        Ok(self
            .collections
            .values()
            .map(|c| self.populated_collection(c))
            .collect())
    }

    fn delete_collection_by_id(&mut self, collection_id: i32) -> Result<()> {
        self.ops.push("delete_collection_by_id");
        self.collections
            .remove(&collection_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("DAR Collection {collection_id}")))
    }

    fn find_drafts_by_user_id(&self, user_id: i32) -> Result<Vec<DataAccessRequest>> {
        Ok(self
            .dars
            .values()
            .filter(|d| d.draft && d.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_dar_dataset_ids(&self, reference_ids: &[String]) -> Result<Vec<i32>> {
        let mut ids: Vec<i32> = reference_ids
            .iter()
            .filter_map(|r| self.dars.get(r))
            .flat_map(|d| d.dataset_ids().iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn cancel_dars_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()> {
        self.ops.push("cancel_dars_by_reference_ids");
        for reference_id in reference_ids {
            if let Some(dar) = self.dars.get_mut(reference_id) {
                dar.data.status = Some(DAR_STATUS_CANCELED.to_string());
            }
        }
        Ok(())
    }

    fn delete_dar_dataset_relations_by_reference_ids(
        &mut self,
        reference_ids: &[String],
    ) -> Result<()> {
        self.ops.push("delete_dar_dataset_relations_by_reference_ids");
        for reference_id in reference_ids {
            if let Some(dar) = self.dars.get_mut(reference_id) {
                dar.data.dataset_ids.clear();
            }
        }
        Ok(())
    }

    fn delete_dars_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()> {
        self.ops.push("delete_dars_by_reference_ids");
        for reference_id in reference_ids {
            self.dars.remove(reference_id);
        }
        Ok(())
    }

    fn delete_matches_by_purpose_ids(&mut self, purpose_ids: &[String]) -> Result<()> {
        self.ops.push("delete_matches_by_purpose_ids");
        for purpose_id in purpose_ids {
            self.matches.remove(purpose_id);
        }
        Ok(())
    }

    fn insert_election(
        &mut self,
        election_type: ElectionType,
        reference_id: &str,
        dataset_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Election> {
        self.ops.push("insert_election");
        self.next_election_id += 1;
        let election = Election {
            election_id: self.next_election_id,
            reference_id: reference_id.to_string(),
            election_type,
            status: ElectionStatus::Open,
            dataset_id,
            final_vote: None,
            final_vote_date: None,
            create_date: now,
            last_update: None,
        };
        self.elections.insert(election.election_id, election.clone());
        Ok(election)
    }

    fn find_elections_by_ids(&self, election_ids: &[i32]) -> Result<Vec<Election>> {
        Ok(election_ids
            .iter()
            .filter_map(|id| self.elections.get(id))
            .cloned()
            .collect())
    }

    fn find_elections_by_reference_ids(&self, reference_ids: &[String]) -> Result<Vec<Election>> {
        Ok(self.elections_for_references(reference_ids))
    }

    fn find_open_elections_by_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<Election>> {
        Ok(self
            .elections_for_references(reference_ids)
            .into_iter()
            .filter(|e| e.status == ElectionStatus::Open)
            .collect())
    }

    fn find_last_elections_by_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<Election>> {
        let mut latest: BTreeMap<(String, ElectionType, Option<i32>), Election> = BTreeMap::new();
        for election in self.elections_for_references(reference_ids) {
            let key = (
                election.reference_id.clone(),
                election.election_type,
                election.dataset_id,
            );
            match latest.get(&key) {
                Some(existing) if existing.election_id >= election.election_id => {}
                _ => {
                    latest.insert(key, election);
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    fn find_last_election_by_reference_and_dataset(
        &self,
        reference_id: &str,
        dataset_id: i32,
        election_type: ElectionType,
    ) -> Result<Option<Election>> {
        Ok(self
            .elections
            .values()
            .filter(|e| {
                e.reference_id == reference_id
                    && e.dataset_id == Some(dataset_id)
                    && e.election_type == election_type
            })
            .max_by_key(|e| e.election_id)
            .cloned())
    }

    fn find_open_elections_by_dac_id(&self, dac_id: i32) -> Result<Vec<Election>> {
        let dac_dataset_ids: BTreeSet<i32> = self
            .datasets
            .values()
            .filter(|d| d.dac_id == Some(dac_id))
            .map(|d| d.dataset_id)
            .collect();
        Ok(self
            .elections
            .values()
            .filter(|e| e.status == ElectionStatus::Open)
            .filter(|e| e.dataset_id.is_some_and(|id| dac_dataset_ids.contains(&id)))
            .cloned()
            .collect())
    }

    fn update_election_status(
        &mut self,
        election_id: i32,
        status: ElectionStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ops.push("update_election_status");
        let election = self
            .elections
            .get_mut(&election_id)
            .ok_or_else(|| Error::NotFound(format!("Election {election_id}")))?;
        election.status = status;
        election.last_update = Some(now);
        Ok(())
    }

    fn set_election_final_vote(
        &mut self,
        election_id: i32,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ops.push("set_election_final_vote");
        let election = self
            .elections
            .get_mut(&election_id)
            .ok_or_else(|| Error::NotFound(format!("Election {election_id}")))?;
        election.final_vote = Some(value);
        election.final_vote_date = Some(now);
        election.last_update = Some(now);
        Ok(())
    }

    fn delete_election_access_rp_links(&mut self, election_ids: &[i32]) -> Result<()> {
        self.ops.push("delete_election_access_rp_links");
        self.access_rp_links.retain(|access_id, rp_id| {
            !election_ids.contains(access_id) && !election_ids.contains(rp_id)
        });
        Ok(())
    }

    fn delete_elections_by_ids(&mut self, election_ids: &[i32]) -> Result<()> {
        self.ops.push("delete_elections_by_ids");
        for election_id in election_ids {
            self.elections.remove(election_id);
        }
        Ok(())
    }

    fn find_dac_for_election(&self, election_id: i32) -> Result<Option<Dac>> {
        let Some(election) = self.elections.get(&election_id) else {
            return Ok(None);
        };
        let dac = election
            .dataset_id
            .and_then(|id| self.datasets.get(&id))
            .and_then(|dataset| dataset.dac_id)
            .and_then(|dac_id| self.assembled_dac(dac_id));
        Ok(dac)
    }

    fn insert_vote(
        &mut self,
        user_id: i32,
        election_id: i32,
        vote_type: VoteType,
        now: DateTime<Utc>,
    ) -> Result<Vote> {
        self.ops.push("insert_vote");
        if !self.elections.contains_key(&election_id) {
            return Err(Error::NotFound(format!("Election {election_id}")));
        }
        self.next_vote_id += 1;
        let vote = Vote {
            vote_id: self.next_vote_id,
            election_id,
            user_id,
            vote_type,
            vote: None,
            rationale: None,
            is_reminder_sent: false,
            has_concerns: None,
            create_date: now,
            update_date: None,
        };
        self.votes.insert(vote.vote_id, vote.clone());
        Ok(vote)
    }

    fn find_votes_by_ids(&self, vote_ids: &[i32]) -> Result<Vec<Vote>> {
        Ok(vote_ids
            .iter()
            .filter_map(|id| self.votes.get(id))
            .cloned()
            .collect())
    }

    fn find_votes_by_election_ids(&self, election_ids: &[i32]) -> Result<Vec<Vote>> {
        Ok(self
            .votes
            .values()
            .filter(|v| election_ids.contains(&v.election_id))
            .cloned()
            .collect())
    }

    fn update_vote_values(
        &mut self,
        vote_ids: &[i32],
        value: bool,
        rationale: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Vote>> {
        self.ops.push("update_vote_values");
        let mut updated = Vec::with_capacity(vote_ids.len());
        for vote_id in vote_ids {
            let vote = self
                .votes
                .get_mut(vote_id)
                .ok_or_else(|| Error::NotFound(format!("Vote {vote_id}")))?;
            vote.vote = Some(value);
            if let Some(rationale) = rationale {
                vote.rationale = Some(rationale.to_string());
            }
            vote.update_date = Some(now);
            updated.push(vote.clone());
        }
        Ok(updated)
    }

    fn update_vote_rationale(&mut self, vote_ids: &[i32], rationale: &str) -> Result<Vec<Vote>> {
        self.ops.push("update_vote_rationale");
        let mut updated = Vec::with_capacity(vote_ids.len());
        for vote_id in vote_ids {
            let vote = self
                .votes
                .get_mut(vote_id)
                .ok_or_else(|| Error::NotFound(format!("Vote {vote_id}")))?;
            vote.rationale = Some(rationale.to_string());
            updated.push(vote.clone());
        }
        Ok(updated)
    }

    fn delete_votes_by_ids(&mut self, vote_ids: &[i32]) -> Result<()> {
        self.ops.push("delete_votes_by_ids");
        for vote_id in vote_ids {
            self.votes.remove(vote_id);
        }
        Ok(())
    }

    fn delete_votes_by_reference_ids(&mut self, reference_ids: &[String]) -> Result<()> {
        self.ops.push("delete_votes_by_reference_ids");
        let election_ids: BTreeSet<i32> = self
            .elections_for_references(reference_ids)
            .into_iter()
            .map(|e| e.election_id)
            .collect();
        self.votes.retain(|_, v| !election_ids.contains(&v.election_id));
        Ok(())
    }

    fn find_vote_users_by_election_reference_ids(
        &self,
        reference_ids: &[String],
    ) -> Result<Vec<User>> {
        let election_ids: BTreeSet<i32> = self
            .elections_for_references(reference_ids)
            .into_iter()
            .map(|e| e.election_id)
            .collect();
        let user_ids: BTreeSet<i32> = self
            .votes
            .values()
            .filter(|v| election_ids.contains(&v.election_id))
            .map(|v| v.user_id)
            .collect();
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id))
            .cloned()
            .collect())
    }

    fn find_datasets_by_ids(&self, dataset_ids: &[i32]) -> Result<Vec<Dataset>> {
        Ok(self
            .datasets
            .values()
            .filter(|d| dataset_ids.contains(&d.dataset_id))
            .cloned()
            .collect())
    }

    fn find_dataset_ids_by_dac_user(&self, user: &User) -> Result<Vec<i32>> {
        let dac_ids = user.dac_ids();
        Ok(self
            .datasets
            .values()
            .filter(|d| d.dac_id.is_some_and(|id| dac_ids.contains(&id)))
            .map(|d| d.dataset_id)
            .collect())
    }

    fn find_data_owners_for_dataset(&self, dataset_id: i32) -> Result<Vec<User>> {
        Ok(self
            .data_owners
            .get(&dataset_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.users.get(id))
            .cloned()
            .collect())
    }

    fn find_users_enabled_to_vote_by_dac(&self, dac_id: i32) -> Result<Vec<User>> {
        let Some(dac) = self.assembled_dac(dac_id) else {
            return Ok(Vec::new());
        };
        // A user holding both roles sits in both committee lists but
        // votes as one person.
        let mut seen = BTreeSet::new();
        Ok(dac
            .voting_users()
            .into_iter()
            .filter(|u| seen.insert(u.user_id))
            .cloned()
            .collect())
    }

    fn find_non_dac_users_enabled_to_vote(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .values()
            .filter(|u| {
                u.roles.iter().any(|r| {
                    matches!(r.name, RoleName::Chairperson | RoleName::Member) && r.dac_id.is_none()
                })
            })
            .cloned()
            .collect())
    }

    fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).cloned())
    }
}
