//! DAR collection aggregator: dataset resolution, cancellation paths
//! and the ordered delete cascade.

use chrono::Utc;
use log::{error, warn};

use crate::model::{DarCollection, ElectionStatus, ElectionType, RoleName, User};
use crate::notify::EmailNotifier;
use crate::service::{elections, votes};
use crate::store::Store;
use crate::{Error, Result};

pub fn get_by_collection_id(store: &impl Store, collection_id: i32) -> Result<DarCollection> {
    let mut collection = store.find_collection_by_id(collection_id)?.ok_or_else(|| {
        Error::NotFound(format!(
            "Collection with the collection id of {collection_id} was not found"
        ))
    })?;
    add_datasets_to_collections(store, std::slice::from_mut(&mut collection), &[])?;
    Ok(collection)
}

pub fn get_by_reference_id(store: &impl Store, reference_id: &str) -> Result<DarCollection> {
    let mut collection = store
        .find_collection_by_reference_id(reference_id)?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Collection with the reference id of {reference_id} was not found"
            ))
        })?;
    add_datasets_to_collections(store, std::slice::from_mut(&mut collection), &[])?;
    Ok(collection)
}

/// Resolves and attaches each collection's datasets, optionally
/// restricted to `filter_dataset_ids`. Attached datasets are ordered by
/// ascending dataset id.
pub fn add_datasets_to_collections(
    store: &impl Store,
    collections: &mut [DarCollection],
    filter_dataset_ids: &[i32],
) -> Result<()> {
    for collection in collections.iter_mut() {
        let mut dataset_ids = collection.dataset_ids();
        if !filter_dataset_ids.is_empty() {
            dataset_ids.retain(|id| filter_dataset_ids.contains(id));
        }
        let mut datasets = store.find_datasets_by_ids(&dataset_ids)?;
        datasets.sort_by_key(|d| d.dataset_id);
        collection.datasets = datasets;
    }
    Ok(())
}

/// Researcher cancellation: all-or-nothing. Any non-canceled election
/// on any member DAR blocks the whole operation; otherwise every active
/// DAR is marked "Canceled" in one bulk call.
pub fn cancel_dar_collection_as_researcher(
    store: &mut impl Store,
    collection: &DarCollection,
) -> Result<DarCollection> {
    let reference_ids = collection.reference_ids();
    if reference_ids.is_empty() {
        warn!(
            "DAR Collection {} does not have any associated DAR ids",
            collection.dar_code
        );
        return Ok(collection.clone());
    }

    // Every election row counts here, not just the latest per dataset:
    // a settled election superseded by a canceled one still blocks.
    let elections = store.find_elections_by_reference_ids(&reference_ids)?;
    if elections
        .iter()
        .any(|e| e.status != ElectionStatus::Canceled)
    {
        return Err(Error::BadRequest(
            "Elections present on DARs; cannot cancel collection".to_string(),
        ));
    }

    let active_reference_ids: Vec<String> = collection
        .dars
        .values()
        .filter(|dar| !dar.is_canceled())
        .map(|dar| dar.reference_id.clone())
        .collect();
    if !active_reference_ids.is_empty() {
        store.cancel_dars_by_reference_ids(&active_reference_ids)?;
    }

    get_by_collection_id(store, collection.dar_collection_id)
}

/// Admin cancellation: cancels every open election across the
/// collection's DARs; the DARs themselves are untouched.
pub fn cancel_dar_collection_elections_as_admin(
    store: &mut impl Store,
    collection: &DarCollection,
) -> Result<DarCollection> {
    let reference_ids = collection.reference_ids();
    if reference_ids.is_empty() {
        warn!(
            "DAR Collection {} does not have any associated DAR ids",
            collection.dar_code
        );
        return Ok(collection.clone());
    }
    elections::cancel_open_elections_for_reference_ids(store, &reference_ids)?;
    get_by_collection_id(store, collection.dar_collection_id)
}

/// Chair cancellation: scoped to elections over datasets in the
/// chair's DACs. When the chair owns none of the collection's datasets
/// this is a no-op beyond the ownership lookup.
pub fn cancel_dar_collection_elections_as_chair(
    store: &mut impl Store,
    collection: &DarCollection,
    user: &User,
) -> Result<DarCollection> {
    let chair_dataset_ids = store.find_dataset_ids_by_dac_user(user)?;
    if chair_dataset_ids.is_empty() {
        warn!(
            "DAR Collection {} does not have any associated DARs that this chairperson can access",
            collection.dar_code
        );
        return Ok(collection.clone());
    }
    elections::cancel_open_elections_for_reference_ids_owned_by_chair(
        store,
        &collection.reference_ids(),
        &chair_dataset_ids,
    )?;
    get_by_collection_id(store, collection.dar_collection_id)
}

/// Deletes a collection and everything hanging off it.
///
/// Researchers may only delete their own collections, and only while no
/// election exists for any member DAR. Admins may always delete; when
/// elections exist, the vote/election cascade runs first. Step order is
/// load-bearing: matches are keyed by DAR reference id, so they go
/// before the DARs; the collection row goes last.
pub fn delete_by_collection_id(
    store: &mut impl Store,
    user: &User,
    collection_id: i32,
) -> Result<()> {
    let collection = store
        .find_collection_by_id(collection_id)?
        .ok_or_else(|| Error::NotFound("DAR Collection does not exist at that id.".to_string()))?;

    let is_admin = user.has_role(RoleName::Admin);
    if !is_admin && collection.create_user_id != user.user_id {
        return Err(Error::NotAuthorized(
            "Not authorized to delete DAR Collection.".to_string(),
        ));
    }

    let reference_ids = collection.reference_ids();
    let elections = store.find_elections_by_reference_ids(&reference_ids)?;
    if !elections.is_empty() {
        if !is_admin {
            return Err(Error::NotAcceptable(
                "Cannot delete DAR with elections.".to_string(),
            ));
        }
        let election_ids: Vec<i32> = elections.iter().map(|e| e.election_id).collect();
        store.delete_votes_by_reference_ids(&reference_ids)?;
        store.delete_election_access_rp_links(&election_ids)?;
        store.delete_elections_by_ids(&election_ids)?;
    }

    store.delete_matches_by_purpose_ids(&reference_ids)?;
    store.delete_dar_dataset_relations_by_reference_ids(&reference_ids)?;
    store.delete_dars_by_reference_ids(&reference_ids)?;
    store.delete_collection_by_id(collection_id)
}

/// Opens a fresh round of elections for every DAR x dataset in the
/// collection that lacks an open DataAccess election. Each eligible
/// pair gets a DataAccess and an RP election with full vote sets.
/// Voters are notified once per batch, never per election, and a
/// notification failure does not undo the created elections.
pub fn create_elections_for_dar_collection(
    store: &mut impl Store,
    notifier: &mut impl EmailNotifier,
    user: &User,
    collection: &DarCollection,
) -> Result<DarCollection> {
    let is_admin = user.has_role(RoleName::Admin);
    let dac_dataset_ids = if is_admin {
        Vec::new()
    } else {
        store.find_dataset_ids_by_dac_user(user)?
    };

    let now = Utc::now();
    let mut created_reference_ids: Vec<String> = Vec::new();
    for dar in collection.dars.values() {
        if dar.is_canceled() {
            continue;
        }
        for &dataset_id in dar.dataset_ids() {
            if !is_admin && !dac_dataset_ids.contains(&dataset_id) {
                continue;
            }
            let last = store.find_last_election_by_reference_and_dataset(
                &dar.reference_id,
                dataset_id,
                ElectionType::DataAccess,
            )?;
            if last.is_some_and(|e| e.status == ElectionStatus::Open) {
                continue;
            }
            let access = store.insert_election(
                ElectionType::DataAccess,
                &dar.reference_id,
                Some(dataset_id),
                now,
            )?;
            votes::create_votes(store, &access, dar.requires_manual_review())?;
            let rp =
                store.insert_election(ElectionType::Rp, &dar.reference_id, Some(dataset_id), now)?;
            votes::create_votes(store, &rp, false)?;
            if !created_reference_ids.contains(&dar.reference_id) {
                created_reference_ids.push(dar.reference_id.clone());
            }
        }
    }

    if !created_reference_ids.is_empty() {
        let vote_users = store.find_vote_users_by_election_reference_ids(&created_reference_ids)?;
        if let Err(e) = notifier.send_dar_new_collection_election_message(&vote_users, collection) {
            error!(
                "Unable to send new case message to DAC members for DAR Collection {}: {e}",
                collection.dar_code
            );
        }
    }

    get_by_collection_id(store, collection.dar_collection_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataAccessRequest, Dataset, UserRole};
    use crate::notify::LoggingNotifier;
    use crate::store::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_dac(1, "DAC-01");
        store.insert_dataset(Dataset::example(1, Some(1)));
        store.insert_dataset(Dataset::example(2, Some(1)));
        store.insert_user(User::example(
            10,
            vec![UserRole::in_dac(RoleName::Chairperson, 1)],
        ));
        store.insert_user(User::example(30, vec![UserRole::new(RoleName::Researcher)]));
        store.insert_collection(
            DarCollection::example(1, 30)
                .with_dar(DataAccessRequest::example("ref-a", 1, vec![1]))
                .with_dar(DataAccessRequest::example("ref-b", 1, vec![2])),
        );
        store
    }

    fn admin() -> User {
        User::example(99, vec![UserRole::new(RoleName::Admin)])
    }

    #[test]
    fn datasets_attach_in_ascending_id_order() {
        let store = seeded_store();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let ids: Vec<i32> = collection.datasets.iter().map(|d| d.dataset_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn reference_id_lookup_resolves_the_owning_collection() {
        let store = seeded_store();
        let collection = get_by_reference_id(&store, "ref-b").unwrap();
        assert_eq!(collection.dar_collection_id, 1);
        let ids: Vec<i32> = collection.datasets.iter().map(|d| d.dataset_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let err = get_by_reference_id(&store, "ref-z").unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn researcher_cancel_without_elections_cancels_every_dar() {
        let mut store = seeded_store();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let canceled = cancel_dar_collection_as_researcher(&mut store, &collection).unwrap();
        assert!(canceled.dars.values().all(|d| d.is_canceled()));
        assert_eq!(store.op_count("cancel_dars_by_reference_ids"), 1);
    }

    #[test]
    fn researcher_cancel_fails_and_mutates_nothing_with_live_election() {
        let mut store = seeded_store();
        store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        store.clear_ops();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let err = cancel_dar_collection_as_researcher(&mut store, &collection).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(store.ops().is_empty());
        let unchanged = get_by_collection_id(&store, 1).unwrap();
        assert!(unchanged.dars.values().all(|d| !d.is_canceled()));
    }

    #[test]
    fn researcher_cancel_allowed_when_all_elections_canceled() {
        let mut store = seeded_store();
        let election = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        store
            .update_election_status(election.election_id, ElectionStatus::Canceled, Utc::now())
            .unwrap();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let canceled = cancel_dar_collection_as_researcher(&mut store, &collection).unwrap();
        assert!(canceled.dars.values().all(|d| d.is_canceled()));
    }

    #[test]
    fn researcher_cancel_blocked_by_closed_election_behind_a_canceled_one() {
        let mut store = seeded_store();
        let closed = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        store
            .update_election_status(closed.election_id, ElectionStatus::Closed, Utc::now())
            .unwrap();
        // A newer canceled election shadows the closed one as the
        // latest for this DAR and dataset.
        let reopened = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        store
            .update_election_status(reopened.election_id, ElectionStatus::Canceled, Utc::now())
            .unwrap();
        store.clear_ops();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let err = cancel_dar_collection_as_researcher(&mut store, &collection).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(store.ops().is_empty());
        let unchanged = get_by_collection_id(&store, 1).unwrap();
        assert!(unchanged.dars.values().all(|d| !d.is_canceled()));
    }

    #[test]
    fn admin_cancel_only_touches_elections() {
        let mut store = seeded_store();
        let election = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        let collection = get_by_collection_id(&store, 1).unwrap();
        let refreshed =
            cancel_dar_collection_elections_as_admin(&mut store, &collection).unwrap();
        assert!(refreshed.dars.values().all(|d| !d.is_canceled()));
        let canceled = store
            .find_elections_by_ids(&[election.election_id])
            .unwrap()
            .remove(0);
        assert_eq!(canceled.status, ElectionStatus::Canceled);
    }

    #[test]
    fn chair_cancel_is_noop_without_owned_datasets() {
        let mut store = seeded_store();
        store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        // Chair of an unrelated DAC with no datasets behind it.
        store.insert_dac(2, "DAC-02");
        let outsider = User::example(12, vec![UserRole::in_dac(RoleName::Chairperson, 2)]);
        store.insert_user(outsider.clone());
        store.clear_ops();
        let collection = get_by_collection_id(&store, 1).unwrap();
        cancel_dar_collection_elections_as_chair(&mut store, &collection, &outsider).unwrap();
        assert!(store.ops().is_empty());
    }

    #[test]
    fn chair_cancel_scoped_to_owned_datasets() {
        let mut store = seeded_store();
        let owned = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        // Move dataset 2 to a DAC the chair does not belong to.
        store.insert_dac(2, "DAC-02");
        store.insert_dataset(Dataset::example(2, Some(2)));
        let foreign = store
            .insert_election(ElectionType::DataAccess, "ref-b", Some(2), Utc::now())
            .unwrap();
        let chair = store.find_user_by_id(10).unwrap().unwrap();
        let collection = get_by_collection_id(&store, 1).unwrap();
        cancel_dar_collection_elections_as_chair(&mut store, &collection, &chair).unwrap();
        let after = store
            .find_elections_by_ids(&[owned.election_id, foreign.election_id])
            .unwrap();
        assert_eq!(after[0].status, ElectionStatus::Canceled);
        assert_eq!(after[1].status, ElectionStatus::Open);
    }

    #[test]
    fn delete_rejects_non_owner_researcher() {
        let mut store = seeded_store();
        let stranger = User::example(31, vec![UserRole::new(RoleName::Researcher)]);
        let err = delete_by_collection_id(&mut store, &stranger, 1).unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
    }

    #[test]
    fn delete_rejects_owner_researcher_with_elections() {
        let mut store = seeded_store();
        store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        store.clear_ops();
        let owner = store.find_user_by_id(30).unwrap().unwrap();
        let err = delete_by_collection_id(&mut store, &owner, 1).unwrap_err();
        assert!(matches!(err, Error::NotAcceptable(_)));
        assert!(store.ops().is_empty());
    }

    #[test]
    fn delete_as_owner_runs_the_short_cascade() {
        let mut store = seeded_store();
        store.add_match("ref-a");
        let owner = store.find_user_by_id(30).unwrap().unwrap();
        delete_by_collection_id(&mut store, &owner, 1).unwrap();
        assert_eq!(
            store.ops(),
            &[
                "delete_matches_by_purpose_ids",
                "delete_dar_dataset_relations_by_reference_ids",
                "delete_dars_by_reference_ids",
                "delete_collection_by_id",
            ]
        );
        assert!(store.find_collection_by_id(1).unwrap().is_none());
    }

    #[test]
    fn delete_as_admin_runs_the_full_cascade() {
        let mut store = seeded_store();
        let access = store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        let rp = store
            .insert_election(ElectionType::Rp, "ref-a", Some(1), Utc::now())
            .unwrap();
        store.link_access_rp(access.election_id, rp.election_id);
        store.clear_ops();
        delete_by_collection_id(&mut store, &admin(), 1).unwrap();
        assert_eq!(
            store.ops(),
            &[
                "delete_votes_by_reference_ids",
                "delete_election_access_rp_links",
                "delete_elections_by_ids",
                "delete_matches_by_purpose_ids",
                "delete_dar_dataset_relations_by_reference_ids",
                "delete_dars_by_reference_ids",
                "delete_collection_by_id",
            ]
        );
    }

    #[test]
    fn delete_missing_collection_is_not_found() {
        let mut store = seeded_store();
        let err = delete_by_collection_id(&mut store, &admin(), 42).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn batch_open_creates_access_and_rp_pairs() {
        let mut store = seeded_store();
        let mut notifier = LoggingNotifier;
        let collection = get_by_collection_id(&store, 1).unwrap();
        create_elections_for_dar_collection(&mut store, &mut notifier, &admin(), &collection)
            .unwrap();
        let elections = store
            .find_elections_by_reference_ids(&collection.reference_ids())
            .unwrap();
        // 2 DARs x 1 dataset each, a DataAccess + RP pair per pair.
        assert_eq!(elections.len(), 4);
        assert_eq!(
            elections
                .iter()
                .filter(|e| e.election_type == ElectionType::Rp)
                .count(),
            2
        );
        assert!(elections.iter().all(|e| e.status == ElectionStatus::Open));
    }

    #[test]
    fn batch_open_skips_dars_with_open_access_elections() {
        let mut store = seeded_store();
        store
            .insert_election(ElectionType::DataAccess, "ref-a", Some(1), Utc::now())
            .unwrap();
        let mut notifier = LoggingNotifier;
        let collection = get_by_collection_id(&store, 1).unwrap();
        create_elections_for_dar_collection(&mut store, &mut notifier, &admin(), &collection)
            .unwrap();
        let ref_a = store
            .find_elections_by_reference_ids(&["ref-a".to_string()])
            .unwrap();
        assert_eq!(ref_a.len(), 1);
        let ref_b = store
            .find_elections_by_reference_ids(&["ref-b".to_string()])
            .unwrap();
        assert_eq!(ref_b.len(), 2);
    }

    #[test]
    fn batch_open_as_chair_is_scoped_to_dac_datasets() {
        let mut store = seeded_store();
        store.insert_dac(2, "DAC-02");
        store.insert_dataset(Dataset::example(2, Some(2)));
        let chair = store.find_user_by_id(10).unwrap().unwrap();
        let mut notifier = LoggingNotifier;
        let collection = get_by_collection_id(&store, 1).unwrap();
        create_elections_for_dar_collection(&mut store, &mut notifier, &chair, &collection)
            .unwrap();
        assert!(store
            .find_elections_by_reference_ids(&["ref-b".to_string()])
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .find_elections_by_reference_ids(&["ref-a".to_string()])
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn batch_open_skips_canceled_dars() {
        let mut store = seeded_store();
        store
            .cancel_dars_by_reference_ids(&["ref-a".to_string()])
            .unwrap();
        let mut notifier = LoggingNotifier;
        let collection = get_by_collection_id(&store, 1).unwrap();
        create_elections_for_dar_collection(&mut store, &mut notifier, &admin(), &collection)
            .unwrap();
        assert!(store
            .find_elections_by_reference_ids(&["ref-a".to_string()])
            .unwrap()
            .is_empty());
    }
}
