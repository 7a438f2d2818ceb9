//! Email collaborator.
//!
//! Notifications fire after durable state changes. Failures here are
//! logged by the caller and never abort the operation that triggered
//! them.

use log::info;

use crate::model::{DarCollection, Dataset, User};
use crate::Result;

/// Dataset fields carried into notification text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMail {
    pub name: String,
    pub identifier: String,
}

impl From<&Dataset> for DatasetMail {
    fn from(dataset: &Dataset) -> Self {
        Self {
            name: dataset.name.clone(),
            identifier: dataset.identifier(),
        }
    }
}

pub trait EmailNotifier {
    /// One message per batch of newly opened collection elections, sent
    /// to every user holding a vote on them.
    fn send_dar_new_collection_election_message(
        &mut self,
        vote_users: &[User],
        collection: &DarCollection,
    ) -> Result<()>;

    /// Tells a DAC that a dataset was submitted to their committee.
    /// Not invoked by the engine itself; carried on the collaborator
    /// surface for the dataset-registration flow above this crate.
    fn send_dataset_submitted_message(
        &mut self,
        dac_chairs: &[User],
        submitter: &User,
        dac_name: &str,
        dataset_name: &str,
    ) -> Result<()>;

    /// Tells the researcher their DAR was approved for the datasets.
    fn send_researcher_dar_approved(
        &mut self,
        dar_code: &str,
        researcher_id: i32,
        datasets: &[DatasetMail],
        data_use_translation: &str,
    ) -> Result<()>;

    /// Tells a data custodian which datasets were approved for release.
    fn send_data_custodian_approval_message(
        &mut self,
        custodian: &User,
        dar_code: &str,
        datasets: &[DatasetMail],
    ) -> Result<()>;
}

/// Notifier that only writes to the log. Default collaborator for
/// deployments without an outbound mail relay, and for tests.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

impl EmailNotifier for LoggingNotifier {
    fn send_dar_new_collection_election_message(
        &mut self,
        vote_users: &[User],
        collection: &DarCollection,
    ) -> Result<()> {
        info!(
            "New election notification for collection {} to {} voter(s)",
            collection.dar_code,
            vote_users.len()
        );
        Ok(())
    }

    fn send_dataset_submitted_message(
        &mut self,
        dac_chairs: &[User],
        submitter: &User,
        dac_name: &str,
        dataset_name: &str,
    ) -> Result<()> {
        info!(
            "Dataset submitted notification for {dataset_name} ({dac_name}) from {} to {} chair(s)",
            submitter.email,
            dac_chairs.len()
        );
        Ok(())
    }

    fn send_researcher_dar_approved(
        &mut self,
        dar_code: &str,
        researcher_id: i32,
        datasets: &[DatasetMail],
        data_use_translation: &str,
    ) -> Result<()> {
        info!(
            "Approval notification for {dar_code} to researcher {researcher_id}: \
             {} dataset(s), data use: {data_use_translation}",
            datasets.len()
        );
        Ok(())
    }

    fn send_data_custodian_approval_message(
        &mut self,
        custodian: &User,
        dar_code: &str,
        datasets: &[DatasetMail],
    ) -> Result<()> {
        info!(
            "Custodian approval notification for {dar_code} to {}: {} dataset(s)",
            custodian.email,
            datasets.len()
        );
        Ok(())
    }
}
