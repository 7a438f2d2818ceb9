//! Status/action projector: computes what a collection looks like and
//! what the viewer may do with it.
//!
//! Summaries are assembled fresh per query. Only DataAccess elections
//! feed the projection, and for each (reference id, dataset) pair only
//! the latest election counts. `project` itself is pure: it reads the
//! assembled summary and writes `status`/`actions`, nothing else.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::model::{
    DarCollection, DarCollectionAction, DarCollectionStatus, DarCollectionSummary,
    DataAccessRequest, Election, ElectionStatus, ElectionType, User, VoteType, DAR_STATUS_CANCELED,
};
use crate::store::Store;
use crate::{Error, Result};

/// The capacity in which a viewer looks at collections. Resolved by the
/// caller from the acting user's role set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SummaryRole {
    Admin,
    SigningOfficial,
    Researcher,
    Chairperson,
    Member,
}

/// Which votes a viewer gets to see on the assembled summary.
#[derive(Debug, Copy, Clone)]
enum VoteScope {
    All,
    FinalOnly,
    FinalOrUser(i32),
}

/// All collection summaries visible to the user in the given role,
/// with status and actions projected. Researchers additionally get one
/// DRAFT summary per draft DAR.
pub fn summaries_for_role(
    store: &impl Store,
    user: &User,
    role: SummaryRole,
) -> Result<Vec<DarCollectionSummary>> {
    let mut summaries = Vec::new();
    match role {
        SummaryRole::Admin => {
            for collection in store.find_all_collections()? {
                let mut summary =
                    assemble_summary(store, &collection, None, VoteScope::All, false)?;
                project(role, user, &mut summary);
                summaries.push(summary);
            }
        }
        SummaryRole::SigningOfficial => {
            let institution_id = user.institution_id.ok_or_else(|| {
                Error::IllegalArgument("User does not have a valid institution".to_string())
            })?;
            for collection in store.find_all_collections()? {
                let creator = store.find_user_by_id(collection.create_user_id)?;
                if creator.and_then(|u| u.institution_id) != Some(institution_id) {
                    continue;
                }
                let mut summary =
                    assemble_summary(store, &collection, None, VoteScope::FinalOnly, false)?;
                project(role, user, &mut summary);
                summaries.push(summary);
            }
        }
        SummaryRole::Researcher => {
            for collection in store.find_collections_created_by_user(user.user_id)? {
                if collection.dars.values().all(|d| d.draft) {
                    continue;
                }
                let mut summary =
                    assemble_summary(store, &collection, None, VoteScope::FinalOnly, true)?;
                project(role, user, &mut summary);
                summaries.push(summary);
            }
            for draft in store.find_drafts_by_user_id(user.user_id)? {
                summaries.push(draft_summary(store, &draft)?);
            }
        }
        SummaryRole::Chairperson | SummaryRole::Member => {
            let dac_dataset_ids: BTreeSet<i32> = store
                .find_dataset_ids_by_dac_user(user)?
                .into_iter()
                .collect();
            for collection in store.find_all_collections()? {
                if !collection
                    .dataset_ids()
                    .iter()
                    .any(|id| dac_dataset_ids.contains(id))
                {
                    continue;
                }
                let mut summary = assemble_summary(
                    store,
                    &collection,
                    Some(&dac_dataset_ids),
                    VoteScope::FinalOrUser(user.user_id),
                    false,
                )?;
                project(role, user, &mut summary);
                summaries.push(summary);
            }
        }
    }
    Ok(summaries)
}

/// Single-collection variant of [`summaries_for_role`]. Fails when the
/// collection does not exist or is not visible to the viewer.
pub fn summary_for_role_by_collection_id(
    store: &impl Store,
    user: &User,
    role: SummaryRole,
    collection_id: i32,
) -> Result<DarCollectionSummary> {
    summaries_for_role(store, user, role)?
        .into_iter()
        .find(|s| s.dar_collection_id == Some(collection_id))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Collection summary with the collection id of {collection_id} was not found"
            ))
        })
}

/// Derives status from the summary and overlays the role's action set.
/// Pure: repeated calls on the same summary yield identical results.
pub fn project(role: SummaryRole, user: &User, summary: &mut DarCollectionSummary) {
    let status = determine_collection_status(summary);
    summary.status = Some(status);
    summary.actions = match role {
        SummaryRole::Admin => admin_actions(summary),
        SummaryRole::SigningOfficial => BTreeSet::new(),
        SummaryRole::Researcher => researcher_actions(status, summary),
        SummaryRole::Chairperson => chair_actions(summary, user.user_id),
        SummaryRole::Member => member_actions(summary, user.user_id),
    };
}

/// Role-independent status derivation. Any OPEN election wins over
/// every other classification.
pub fn determine_collection_status(summary: &DarCollectionSummary) -> DarCollectionStatus {
    if summary
        .elections
        .values()
        .any(|e| e.status == ElectionStatus::Open)
    {
        return DarCollectionStatus::InProcess;
    }
    let all_dars_canceled = !summary.dar_statuses.is_empty()
        && summary
            .dar_statuses
            .values()
            .all(|s| s.eq_ignore_ascii_case(DAR_STATUS_CANCELED));
    let any_non_canceled_election = summary
        .elections
        .values()
        .any(|e| e.status != ElectionStatus::Canceled);
    if all_dars_canceled && !any_non_canceled_election {
        return DarCollectionStatus::Canceled;
    }
    if summary.elections.is_empty() {
        return DarCollectionStatus::Unreviewed;
    }
    if summary.elections.len() == summary.dataset_count() {
        DarCollectionStatus::Complete
    } else {
        DarCollectionStatus::InProcess
    }
}

fn admin_actions(summary: &DarCollectionSummary) -> BTreeSet<DarCollectionAction> {
    let mut actions = BTreeSet::new();
    if summary
        .elections
        .values()
        .any(|e| e.status == ElectionStatus::Open)
    {
        actions.insert(DarCollectionAction::Cancel);
    }
    // Something is left to (re)open: an uncovered dataset or a settled
    // election.
    if summary.elections.len() < summary.dataset_count()
        || summary
            .elections
            .values()
            .any(|e| e.status != ElectionStatus::Open)
    {
        actions.insert(DarCollectionAction::Open);
    }
    actions
}

fn researcher_actions(
    status: DarCollectionStatus,
    summary: &DarCollectionSummary,
) -> BTreeSet<DarCollectionAction> {
    let mut actions = BTreeSet::new();
    match status {
        DarCollectionStatus::Draft => {
            actions.insert(DarCollectionAction::Resume);
            actions.insert(DarCollectionAction::Delete);
        }
        DarCollectionStatus::Canceled => {
            actions.insert(DarCollectionAction::Review);
            actions.insert(DarCollectionAction::Revise);
        }
        DarCollectionStatus::Unreviewed => {
            actions.insert(DarCollectionAction::Review);
            if summary.elections.is_empty() {
                actions.insert(DarCollectionAction::Cancel);
            }
        }
        DarCollectionStatus::InProcess | DarCollectionStatus::Complete => {
            actions.insert(DarCollectionAction::Review);
        }
    }
    actions
}

fn chair_actions(summary: &DarCollectionSummary, user_id: i32) -> BTreeSet<DarCollectionAction> {
    let mut actions = BTreeSet::new();
    let open: Vec<&Election> = summary
        .elections
        .values()
        .filter(|e| e.status == ElectionStatus::Open)
        .collect();
    if !open.is_empty() {
        // Cancel drops out once a closed election is mixed in; canceled
        // elections do not block it.
        if !summary
            .elections
            .values()
            .any(|e| e.status == ElectionStatus::Closed)
        {
            actions.insert(DarCollectionAction::Cancel);
        }
        if open
            .iter()
            .any(|e| !user_has_voted(summary, user_id, e.election_id))
        {
            actions.insert(DarCollectionAction::Vote);
        }
    }
    if summary.elections.len() < summary.dataset_count()
        || summary
            .elections
            .values()
            .any(|e| e.status != ElectionStatus::Open)
    {
        actions.insert(DarCollectionAction::Open);
    }
    actions
}

fn member_actions(summary: &DarCollectionSummary, user_id: i32) -> BTreeSet<DarCollectionAction> {
    let mut actions = BTreeSet::new();
    let open_ids: Vec<i32> = summary
        .elections
        .values()
        .filter(|e| e.status == ElectionStatus::Open)
        .map(|e| e.election_id)
        .collect();
    if open_ids.is_empty() {
        return actions;
    }
    if open_ids
        .iter()
        .any(|id| !user_has_voted(summary, user_id, *id))
    {
        actions.insert(DarCollectionAction::Vote);
    } else {
        actions.insert(DarCollectionAction::Update);
    }
    actions
}

/// A user has voted on an election only when every one of their
/// DAC/Chairperson ballots there carries a value; one null ballot makes
/// the whole election pending for them.
fn user_has_voted(summary: &DarCollectionSummary, user_id: i32, election_id: i32) -> bool {
    summary
        .votes
        .iter()
        .filter(|v| v.user_id == user_id && v.election_id == election_id)
        .filter(|v| v.counts_for_completeness())
        .all(|v| v.vote.is_some())
}

fn assemble_summary(
    store: &impl Store,
    collection: &DarCollection,
    visible_dataset_ids: Option<&BTreeSet<i32>>,
    vote_scope: VoteScope,
    exclude_archived: bool,
) -> Result<DarCollectionSummary> {
    let dataset_visible = |id: Option<i32>| match (visible_dataset_ids, id) {
        (None, _) => true,
        (Some(visible), Some(id)) => visible.contains(&id),
        (Some(_), None) => false,
    };

    let mut summary = DarCollectionSummary {
        dar_collection_id: Some(collection.dar_collection_id),
        dar_code: Some(collection.dar_code.clone()),
        researcher_id: Some(collection.create_user_id),
        institution_id: store
            .find_user_by_id(collection.create_user_id)?
            .and_then(|u| u.institution_id),
        name: collection
            .dars
            .values()
            .find_map(|d| d.data.project_title.clone()),
        submission_date: collection
            .dars
            .values()
            .filter_map(|d| d.submission_date)
            .min(),
        ..Default::default()
    };

    for dar in collection.dars.values() {
        if dar.draft || (exclude_archived && dar.is_archived()) {
            continue;
        }
        summary.reference_ids.insert(dar.reference_id.clone());
        summary.dar_statuses.insert(
            dar.reference_id.clone(),
            dar.data.status.clone().unwrap_or_default(),
        );
        for &dataset_id in dar.dataset_ids() {
            if dataset_visible(Some(dataset_id)) {
                summary.dataset_ids.insert(dataset_id);
            }
        }
    }

    let reference_ids: Vec<String> = summary.reference_ids.iter().cloned().collect();
    let latest = store.find_last_elections_by_reference_ids(&reference_ids)?;
    for election in latest {
        if election.election_type == ElectionType::DataAccess
            && dataset_visible(election.dataset_id)
        {
            summary.add_election(election);
        }
    }

    let election_ids: Vec<i32> = summary.elections.keys().copied().collect();
    let votes = store.find_votes_by_election_ids(&election_ids)?;
    summary.votes = votes
        .into_iter()
        .filter(|v| match vote_scope {
            VoteScope::All => true,
            VoteScope::FinalOnly => v.vote_type == VoteType::Final,
            VoteScope::FinalOrUser(user_id) => {
                v.vote_type == VoteType::Final || v.user_id == user_id
            }
        })
        .collect();
    Ok(summary)
}

/// A draft DAR surfaces to its author as a DRAFT summary it can resume
/// or delete.
fn draft_summary(store: &impl Store, dar: &DataAccessRequest) -> Result<DarCollectionSummary> {
    let create_date = dar
        .data
        .create_date
        .or(dar.submission_date)
        .unwrap_or_else(Utc::now);
    let mut summary = DarCollectionSummary {
        dar_code: Some(format!("DRAFT_DAR_{}", create_date.format("%Y-%m-%d"))),
        name: dar.data.project_title.clone(),
        researcher_id: Some(dar.user_id),
        institution_id: store
            .find_user_by_id(dar.user_id)?
            .and_then(|u| u.institution_id),
        submission_date: dar.submission_date,
        status: Some(DarCollectionStatus::Draft),
        ..Default::default()
    };
    summary.reference_ids.insert(dar.reference_id.clone());
    summary.dataset_ids.extend(dar.dataset_ids().iter().copied());
    summary.add_action(DarCollectionAction::Resume);
    summary.add_action(DarCollectionAction::Delete);
    Ok(summary)
}
