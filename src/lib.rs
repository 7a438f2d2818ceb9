//! Review engine for institutional data-access requests (DARs).
//!
//! Researchers submit DARs against controlled datasets; Data Access
//! Committees (DACs) review them through elections and votes. This crate
//! owns the election/vote lifecycle and derives each DAR collection's
//! displayed status and permitted actions per acting role. Persistence
//! and email delivery are supplied by the caller through the [`store`]
//! and [`notify`] collaborator traits.

pub mod error;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

pub use error::{Error, Result};
