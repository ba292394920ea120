//! Core data models for the resolution pipeline.

pub mod route;

pub use route::{display_name_from_link, ResolutionTier, RouteRecord};
