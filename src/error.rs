//! Error taxonomy for the resolution pipeline.
//!
//! Every error here is scoped to a single entity. Tiers catch them at the
//! tier boundary, record them against the route key, and keep going; nothing
//! in this module ever aborts a batch.

use thiserror::Error;

/// A page fetch that failed after the bounded retry policy was exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },
}

/// Why a single route failed to advance at a given tier.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An expected structural element was absent from the markup.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The anchor or coordinate pattern matched nothing.
    #[error("pattern miss: {0}")]
    PatternMiss(String),

    /// Coordinate pair malformed or outside valid lat/lon range.
    #[error("bad coordinates: {0}")]
    Geometry(String),

    /// Point contained in no boundary polygon (coastal/offshore rounding).
    #[error("point ({lon}, {lat}) contained in no country polygon")]
    JoinMiss { lon: f64, lat: f64 },
}
