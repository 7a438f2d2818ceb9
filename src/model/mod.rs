//! Domain entities of the review engine.

pub mod collection;
pub mod dac;
pub mod dar;
pub mod dataset;
pub mod election;
pub mod summary;
pub mod user;
pub mod vote;

pub use collection::DarCollection;
pub use dac::Dac;
pub use dar::{DataAccessRequest, DarData, DAR_STATUS_ARCHIVED, DAR_STATUS_CANCELED};
pub use dataset::{DataUse, Dataset};
pub use election::{Election, ElectionStatus, ElectionType};
pub use summary::{DarCollectionAction, DarCollectionStatus, DarCollectionSummary};
pub use user::{RoleName, User, UserRole};
pub use vote::{Vote, VoteType};
