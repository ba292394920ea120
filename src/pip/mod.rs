//! Point-in-polygon country inference.
//!
//! Loads a world boundary layer once and answers "which country contains this
//! coordinate" through an R-tree spatial index, shared read-only for the
//! process lifetime.

mod boundary;
mod index;
mod service;

pub use boundary::{load_world_boundaries, CountryBoundary};
pub use index::CountryIndex;
pub use service::ContainmentService;
