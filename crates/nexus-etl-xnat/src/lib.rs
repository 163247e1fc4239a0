//! XNAT REST client for the nexus ETL.
//!
//! [`XnatClient`] implements [`nexus_etl_core::source::SourceSystem`] over the
//! archive's JSON endpoints. Responses are decoded loosely: the archive's
//! search results are string-keyed tables whose column names depend on the
//! requested data type, so they are picked apart by name rather than through
//! fixed structs.

mod client;
mod parse;

pub mod error;

pub use client::{XnatClient, XnatConfig};
pub use error::{Error, Result};
