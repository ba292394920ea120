//! Spatial index for fast country containment lookups.

use geo::{Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use super::CountryBoundary;

/// Wrapper for R-tree indexing of country boundaries
#[derive(Clone)]
pub struct IndexedCountry {
    pub boundary: Arc<CountryBoundary>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedCountry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedCountry {
    pub fn new(boundary: CountryBoundary) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = boundary.bbox()?;
        Some(Self {
            boundary: Arc::new(boundary),
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// R-tree over country boundaries. Built once per run, then read-only.
pub struct CountryIndex {
    tree: RTree<IndexedCountry>,
}

impl CountryIndex {
    pub fn build(boundaries: Vec<CountryBoundary>) -> Self {
        info!(
            "Building spatial index for {} boundaries...",
            boundaries.len()
        );

        let indexed: Vec<IndexedCountry> = boundaries
            .into_iter()
            .filter_map(IndexedCountry::new)
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} entries", tree.size());

        Self { tree }
    }

    /// Find the country containing a point. Envelope intersection narrows the
    /// candidates, exact containment decides. Country polygons do not overlap,
    /// so the first containing boundary is the only one.
    pub fn lookup(&self, lon: f64, lat: f64) -> Option<Arc<CountryBoundary>> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .find(|ic| ic.boundary.geometry.contains(&point))
            .map(|ic| Arc::clone(&ic.boundary))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
