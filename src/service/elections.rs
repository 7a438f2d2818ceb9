//! Election state machine: opens review rounds and drives the
//! OPEN -> CLOSED / CANCELED / FINAL transitions.

use chrono::Utc;

use crate::model::{Election, ElectionStatus, ElectionType};
use crate::service::votes;
use crate::store::Store;
use crate::{Error, Result};

/// Opens an election for a DAR and materializes its votes.
///
/// Requires at least one enabled voter for the dataset's DAC (or, for
/// DAC-less datasets, globally) and at least one chairperson among
/// them. At most one open election per (reference id, type) may exist.
pub fn create_election(
    store: &mut impl Store,
    election_type: ElectionType,
    reference_id: &str,
    dataset_id: Option<i32>,
    is_manual_review: bool,
) -> Result<Election> {
    validate_available_users(store, dataset_id)?;
    let open = store.find_open_elections_by_reference_ids(&[reference_id.to_string()])?;
    if open.iter().any(|e| e.election_type == election_type) {
        return Err(Error::IllegalState(format!(
            "An open {election_type} election already exists for reference id {reference_id}"
        )));
    }
    let election = store.insert_election(election_type, reference_id, dataset_id, Utc::now())?;
    votes::create_votes(store, &election, is_manual_review)?;
    Ok(election)
}

/// Cancels every open election for the given DARs. Admin path: no
/// ownership filtering, and the underlying DARs are untouched.
pub fn cancel_open_elections_for_reference_ids(
    store: &mut impl Store,
    reference_ids: &[String],
) -> Result<Vec<Election>> {
    let open = store.find_open_elections_by_reference_ids(reference_ids)?;
    let now = Utc::now();
    let election_ids: Vec<i32> = open.iter().map(|e| e.election_id).collect();
    for election_id in &election_ids {
        store.update_election_status(*election_id, ElectionStatus::Canceled, now)?;
    }
    store.find_elections_by_ids(&election_ids)
}

/// Chair path: cancels open elections only for DARs whose dataset ids
/// intersect the chair's owned dataset set. When the chair owns none of
/// them, nothing is written.
pub fn cancel_open_elections_for_reference_ids_owned_by_chair(
    store: &mut impl Store,
    reference_ids: &[String],
    chair_dataset_ids: &[i32],
) -> Result<Vec<Election>> {
    if chair_dataset_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut owned_reference_ids = Vec::new();
    for reference_id in reference_ids {
        let dataset_ids = store.find_dar_dataset_ids(std::slice::from_ref(reference_id))?;
        if dataset_ids.iter().any(|id| chair_dataset_ids.contains(id)) {
            owned_reference_ids.push(reference_id.clone());
        }
    }
    if owned_reference_ids.is_empty() {
        return Ok(Vec::new());
    }
    cancel_open_elections_for_reference_ids(store, &owned_reference_ids)
}

fn validate_available_users(store: &impl Store, dataset_id: Option<i32>) -> Result<()> {
    let dac_id = match dataset_id {
        Some(id) => store
            .find_datasets_by_ids(&[id])?
            .first()
            .and_then(|d| d.dac_id),
        None => None,
    };
    let users = match dac_id {
        Some(dac_id) => store.find_users_enabled_to_vote_by_dac(dac_id)?,
        None => store.find_non_dac_users_enabled_to_vote()?,
    };
    if users.is_empty() {
        return Err(Error::IllegalArgument(
            "There are no enabled DAC Members or Chairpersons to hold an election.".to_string(),
        ));
    }
    if !users.iter().any(|u| u.is_chairperson_for(dac_id)) {
        return Err(Error::IllegalArgument(
            "There has to be a Chairperson.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dataset, RoleName, User, UserRole, VoteType};

    fn seeded_store() -> crate::store::MemoryStore {
        let mut store = crate::store::MemoryStore::new();
        store.insert_dac(1, "DAC-01");
        store.insert_dataset(Dataset::example(1, Some(1)));
        store.insert_user(User::example(
            10,
            vec![UserRole::in_dac(RoleName::Chairperson, 1)],
        ));
        store.insert_user(User::example(
            11,
            vec![UserRole::in_dac(RoleName::Member, 1)],
        ));
        store
    }

    #[test]
    fn create_election_opens_and_materializes_votes() {
        let mut store = seeded_store();
        let election =
            create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false)
                .unwrap();
        assert_eq!(election.status, ElectionStatus::Open);
        let votes = store
            .find_votes_by_election_ids(&[election.election_id])
            .unwrap();
        // chair: DAC + Chairperson + FINAL + AGREEMENT; member: DAC
        assert_eq!(votes.len(), 5);
        assert_eq!(
            votes
                .iter()
                .filter(|v| v.vote_type == VoteType::Final)
                .count(),
            1
        );
    }

    #[test]
    fn create_election_requires_voters() {
        let mut store = crate::store::MemoryStore::new();
        store.insert_dac(1, "DAC-01");
        store.insert_dataset(Dataset::example(1, Some(1)));
        let err = create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal argument: There are no enabled DAC Members or Chairpersons to hold an election."
        );
    }

    #[test]
    fn create_election_requires_a_chairperson() {
        let mut store = crate::store::MemoryStore::new();
        store.insert_dac(1, "DAC-01");
        store.insert_dataset(Dataset::example(1, Some(1)));
        store.insert_user(User::example(
            11,
            vec![UserRole::in_dac(RoleName::Member, 1)],
        ));
        let err = create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal argument: There has to be a Chairperson."
        );
    }

    #[test]
    fn second_open_election_of_same_type_is_rejected() {
        let mut store = seeded_store();
        create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false).unwrap();
        let err =
            create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false)
                .unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
        // A different type for the same DAR is still fine.
        create_election(&mut store, ElectionType::Rp, "ref-1", Some(1), false).unwrap();
    }

    #[test]
    fn admin_cancel_transitions_open_elections() {
        let mut store = seeded_store();
        let election =
            create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false)
                .unwrap();
        let canceled =
            cancel_open_elections_for_reference_ids(&mut store, &["ref-1".to_string()]).unwrap();
        assert_eq!(canceled.len(), 1);
        assert_eq!(canceled[0].election_id, election.election_id);
        assert_eq!(canceled[0].status, ElectionStatus::Canceled);
    }

    #[test]
    fn chair_cancel_without_owned_datasets_writes_nothing() {
        let mut store = seeded_store();
        create_election(&mut store, ElectionType::DataAccess, "ref-1", Some(1), false).unwrap();
        store.clear_ops();
        let canceled = cancel_open_elections_for_reference_ids_owned_by_chair(
            &mut store,
            &["ref-1".to_string()],
            &[],
        )
        .unwrap();
        assert!(canceled.is_empty());
        assert!(store.ops().is_empty());
    }
}
