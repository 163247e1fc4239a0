//! Core row model and change-tracking engine for the nexus ETL warehouse.
//!
//! This crate performs no I/O. Storage and source-system access are reached
//! through the [`store::Warehouse`] and [`source::SourceSystem`] traits, which
//! are implemented by `nexus-etl-store-sqlite` and `nexus-etl-xnat`.

pub mod coerce;
pub mod delta;
pub mod error;
pub mod identity;
pub mod materialize;
pub mod response;
pub mod row;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{Error, Result};
