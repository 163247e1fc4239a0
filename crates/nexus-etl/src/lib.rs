//! Entity pipelines of the nexus ETL.
//!
//! Each pipeline extracts one warehouse entity from the imaging archive (or
//! from entities already in the warehouse), resolves parent attributes, and
//! hands the rows to [`load::load_entity`], which versions them against what
//! is stored and rewrites the affected scope.

mod form;
mod lookup;

pub mod config;
pub mod context;
pub mod error;
pub mod load;
pub mod pipelines;

pub use error::{Error, Result};
pub use lookup::Lookup;
