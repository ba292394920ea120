//! Markup extractors for catalog pages.
//!
//! Everything in here is pure: parsed markup in, typed result out. The
//! brittle page-format dependency lives behind these functions so it can be
//! exercised against canned fixtures without touching the network.

mod anchor;
mod coords;

pub use anchor::{find_route_anchor, find_secondary_anchor, RouteAnchor};
pub use coords::{
    country_from_title, document_title, marker_coordinates, meta_coordinates,
};
