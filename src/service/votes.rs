//! Vote ledger: materializes ballots for elections and mutates them.
//!
//! FINAL votes are special: setting their value closes the matching
//! election, and approved FINAL votes trigger researcher and data
//! custodian notifications. Notification failures are logged and never
//! fail the vote update.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::error;

use crate::model::{Election, ElectionStatus, ElectionType, User, Vote, VoteType};
use crate::notify::{DatasetMail, EmailNotifier};
use crate::store::Store;
use crate::{Error, Result};

/// Materializes the full vote set for a newly opened election.
///
/// Every eligible voter gets a DAC vote. Chairpersons additionally get
/// a Chairperson vote, and for DataAccess elections a FINAL vote plus,
/// unless the request requires manual review, an AGREEMENT vote. A user
/// who is both chair and member therefore ends up with two countable
/// ballots on the same election.
pub fn create_votes(
    store: &mut impl Store,
    election: &Election,
    is_manual_review: bool,
) -> Result<Vec<Vote>> {
    let dac = store.find_dac_for_election(election.election_id)?;
    let dac_id = dac.as_ref().map(|d| d.dac_id);
    let users = match dac_id {
        Some(dac_id) => store.find_users_enabled_to_vote_by_dac(dac_id)?,
        None => store.find_non_dac_users_enabled_to_vote()?,
    };
    let now = Utc::now();
    let mut votes = Vec::new();
    for user in &users {
        votes.extend(create_votes_for_user(
            store,
            user,
            election,
            dac_id,
            is_manual_review,
            now,
        )?);
    }
    Ok(votes)
}

fn create_votes_for_user(
    store: &mut impl Store,
    user: &User,
    election: &Election,
    dac_id: Option<i32>,
    is_manual_review: bool,
    now: DateTime<Utc>,
) -> Result<Vec<Vote>> {
    let election_id = election.election_id;
    let mut votes = vec![store.insert_vote(user.user_id, election_id, VoteType::Dac, now)?];
    if user.is_chairperson_for(dac_id) {
        votes.push(store.insert_vote(user.user_id, election_id, VoteType::Chairperson, now)?);
        if election.election_type == ElectionType::DataAccess {
            votes.push(store.insert_vote(user.user_id, election_id, VoteType::Final, now)?);
            if !is_manual_review {
                votes.push(store.insert_vote(
                    user.user_id,
                    election_id,
                    VoteType::Agreement,
                    now,
                )?);
            }
        }
    }
    Ok(votes)
}

/// One DataOwner vote per data owner of the election's dataset.
pub fn create_data_owners_review_votes(
    store: &mut impl Store,
    election: &Election,
) -> Result<Vec<Vote>> {
    let dataset_id = election.dataset_id.ok_or_else(|| {
        Error::IllegalArgument(format!(
            "Election {} has no dataset for data owner review",
            election.election_id
        ))
    })?;
    let owners = store.find_data_owners_for_dataset(dataset_id)?;
    let now = Utc::now();
    owners
        .iter()
        .map(|owner| store.insert_vote(owner.user_id, election.election_id, VoteType::DataOwner, now))
        .collect()
}

/// Bulk-sets vote values (and rationale, when given).
///
/// DataAccess elections must still accept votes; RP elections are not
/// status-gated. Any other election type is rejected outright.
pub fn update_votes_with_value(
    store: &mut impl Store,
    notifier: &mut impl EmailNotifier,
    vote_ids: &[i32],
    value: bool,
    rationale: Option<&str>,
) -> Result<Vec<Vote>> {
    let votes = store.find_votes_by_ids(vote_ids)?;
    validate_votes_can_update(store, &votes)?;
    let now = Utc::now();
    let updated = store.update_vote_values(vote_ids, value, rationale, now)?;
    close_elections_for_final_votes(store, &updated, now)?;
    if value {
        if let Err(e) = send_dataset_approval_notifications(store, notifier, &updated) {
            let ids: Vec<String> = vote_ids.iter().map(|id| id.to_string()).collect();
            error!(
                "Error notifying researchers and custodians for votes [{}]: {e}",
                ids.join(",")
            );
        }
    }
    Ok(updated)
}

/// Bulk-sets rationales. Unlike value updates this path is open only to
/// DataAccess votes, and only while their elections accept votes.
pub fn update_rationale_by_vote_ids(
    store: &mut impl Store,
    vote_ids: &[i32],
    rationale: &str,
) -> Result<Vec<Vote>> {
    let votes = store.find_votes_by_ids(vote_ids)?;
    let elections = elections_for_votes(store, &votes)?;
    if elections
        .iter()
        .any(|e| e.election_type != ElectionType::DataAccess)
    {
        return Err(Error::IllegalState(
            "There are non-Data Access elections for provided votes".to_string(),
        ));
    }
    if elections.iter().any(|e| !e.accepts_votes()) {
        return Err(Error::IllegalState(
            "There are non-open Data Access elections for provided votes".to_string(),
        ));
    }
    store.update_vote_rationale(vote_ids, rationale)
}

/// Administrative override: force-sets vote values with no election
/// status gating. FINAL votes still close their elections.
pub fn advance_votes(
    store: &mut impl Store,
    vote_ids: &[i32],
    value: bool,
    rationale: Option<&str>,
) -> Result<Vec<Vote>> {
    let now = Utc::now();
    let updated = store.update_vote_values(vote_ids, value, rationale, now)?;
    close_elections_for_final_votes(store, &updated, now)?;
    Ok(updated)
}

/// Removes a user's votes from the DAC's open elections, typically on
/// DAC membership removal. A no-op when the user holds none.
pub fn delete_open_dac_votes_for_user(
    store: &mut impl Store,
    dac_id: i32,
    user_id: i32,
) -> Result<()> {
    let open_election_ids: Vec<i32> = store
        .find_open_elections_by_dac_id(dac_id)?
        .iter()
        .map(|e| e.election_id)
        .collect();
    if open_election_ids.is_empty() {
        return Ok(());
    }
    let vote_ids: Vec<i32> = store
        .find_votes_by_election_ids(&open_election_ids)?
        .iter()
        .filter(|v| v.user_id == user_id)
        .map(|v| v.vote_id)
        .collect();
    if vote_ids.is_empty() {
        return Ok(());
    }
    store.delete_votes_by_ids(&vote_ids)
}

fn elections_for_votes(store: &impl Store, votes: &[Vote]) -> Result<Vec<Election>> {
    let election_ids: BTreeSet<i32> = votes.iter().map(|v| v.election_id).collect();
    let election_ids: Vec<i32> = election_ids.into_iter().collect();
    store.find_elections_by_ids(&election_ids)
}

fn validate_votes_can_update(store: &impl Store, votes: &[Vote]) -> Result<()> {
    let elections = elections_for_votes(store, votes)?;
    if elections
        .iter()
        .any(|e| e.election_type == ElectionType::DataAccess && !e.accepts_votes())
    {
        return Err(Error::IllegalState(
            "There are non-open Data Access elections for provided votes".to_string(),
        ));
    }
    if elections
        .iter()
        .any(|e| !matches!(e.election_type, ElectionType::DataAccess | ElectionType::Rp))
    {
        return Err(Error::IllegalState(
            "There are non-Data Access/RP elections for provided votes".to_string(),
        ));
    }
    Ok(())
}

fn close_elections_for_final_votes(
    store: &mut impl Store,
    updated: &[Vote],
    now: DateTime<Utc>,
) -> Result<()> {
    let mut final_values: BTreeMap<i32, bool> = BTreeMap::new();
    for vote in updated.iter().filter(|v| v.vote_type == VoteType::Final) {
        if let Some(value) = vote.vote {
            final_values.insert(vote.election_id, value);
        }
    }
    for (election_id, value) in final_values {
        store.update_election_status(election_id, ElectionStatus::Closed, now)?;
        store.set_election_final_vote(election_id, value, now)?;
    }
    Ok(())
}

/// Emails the researcher and data custodians for every collection with
/// an approved FINAL vote in `updated`.
fn send_dataset_approval_notifications(
    store: &mut impl Store,
    notifier: &mut impl EmailNotifier,
    updated: &[Vote],
) -> Result<()> {
    let final_election_ids: BTreeSet<i32> = updated
        .iter()
        .filter(|v| v.vote == Some(true) && v.vote_type == VoteType::Final)
        .map(|v| v.election_id)
        .collect();
    if final_election_ids.is_empty() {
        return Ok(());
    }
    let final_election_ids: Vec<i32> = final_election_ids.into_iter().collect();
    let final_elections = store.find_elections_by_ids(&final_election_ids)?;

    let approved_dataset_ids: BTreeSet<i32> = final_elections
        .iter()
        .filter_map(|e| e.dataset_id)
        .collect();

    // One notification pass per distinct collection.
    let mut collection_ids: BTreeSet<i32> = BTreeSet::new();
    let mut collections = Vec::new();
    for election in &final_elections {
        if let Some(collection) = store.find_collection_by_reference_id(&election.reference_id)? {
            if collection_ids.insert(collection.dar_collection_id) {
                collections.push(collection);
            }
        }
    }

    for collection in collections {
        let approved_in_collection: Vec<i32> = collection
            .dataset_ids()
            .into_iter()
            .filter(|id| approved_dataset_ids.contains(id))
            .collect();
        if approved_in_collection.is_empty() {
            continue;
        }
        let datasets = store.find_datasets_by_ids(&approved_in_collection)?;
        let researcher = store
            .find_user_by_id(collection.create_user_id)?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Could not find user for specified id. User id: {}",
                    collection.create_user_id
                ))
            })?;
        let mails: Vec<DatasetMail> = datasets.iter().map(DatasetMail::from).collect();
        let translations: BTreeSet<String> = datasets
            .iter()
            .filter_map(|d| d.data_use.as_ref())
            .map(|du| du.translation())
            .collect();
        let translation = translations.into_iter().collect::<Vec<_>>().join(";");

        if let Err(e) = notifier.send_researcher_dar_approved(
            &collection.dar_code,
            researcher.user_id,
            &mails,
            &translation,
        ) {
            error!("Error sending researcher dar approved email: {e}");
        }
        if let Err(e) = notify_custodians_of_approved_datasets(
            store,
            notifier,
            &datasets,
            &collection.dar_code,
        ) {
            error!("Error notifying custodians of dar approved email: {e}");
        }
    }
    Ok(())
}

fn notify_custodians_of_approved_datasets(
    store: &mut impl Store,
    notifier: &mut impl EmailNotifier,
    datasets: &[crate::model::Dataset],
    dar_code: &str,
) -> Result<()> {
    // Group approved datasets by custodian so each gets one message.
    let mut by_custodian: BTreeMap<i32, (User, Vec<DatasetMail>)> = BTreeMap::new();
    for dataset in datasets {
        for owner in store.find_data_owners_for_dataset(dataset.dataset_id)? {
            by_custodian
                .entry(owner.user_id)
                .or_insert_with(|| (owner.clone(), Vec::new()))
                .1
                .push(DatasetMail::from(dataset));
        }
    }
    for (_, (custodian, mails)) in by_custodian {
        notifier.send_data_custodian_approval_message(&custodian, dar_code, &mails)?;
    }
    Ok(())
}
