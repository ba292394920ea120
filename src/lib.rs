//! Cragmap - location enrichment for scraped climbing-route records
//!
//! This library provides the tiered location resolver, the spatial containment
//! engine, and the reconciliation table shared by the resolve binary.

pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pip;
pub mod resolver;

pub use error::{FetchError, ResolveError};
pub use models::{ResolutionTier, RouteRecord};
