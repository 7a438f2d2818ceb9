//! Engine operations, grouped by the aggregate they own.
//!
//! Every operation runs synchronously against the caller's [`Store`]
//! and is expected to execute inside one transaction boundary supplied
//! by the layer above.
//!
//! [`Store`]: crate::store::Store

pub mod collections;
pub mod elections;
pub mod summary;
pub mod votes;
