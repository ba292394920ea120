//! Containment service mapping coordinates to a country name.

use tracing::debug;

use super::CountryIndex;
use crate::error::ResolveError;

/// Point-in-polygon country lookup over a prebuilt index.
pub struct ContainmentService {
    index: CountryIndex,
}

impl ContainmentService {
    pub fn new(index: CountryIndex) -> Self {
        Self { index }
    }

    /// Admin name of the polygon containing the point. A point in no polygon
    /// (coastal/offshore rounding) is a `JoinMiss`; there is no
    /// nearest-polygon fallback.
    pub fn country_of(&self, lon: f64, lat: f64) -> Result<String, ResolveError> {
        match self.index.lookup(lon, lat) {
            Some(boundary) => {
                debug!("({}, {}) contained in {}", lon, lat, boundary.name);
                Ok(boundary.name.clone())
            }
            None => Err(ResolveError::JoinMiss { lon, lat }),
        }
    }

    pub fn index(&self) -> &CountryIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::CountryBoundary;
    use geo::{polygon, MultiPolygon};

    fn uk_like_boundary() -> CountryBoundary {
        // Box comfortably covering (51.5, -0.12)
        let poly = polygon![
            (x: -8.0, y: 49.0),
            (x: 2.0, y: 49.0),
            (x: 2.0, y: 59.0),
            (x: -8.0, y: 59.0),
            (x: -8.0, y: 49.0),
        ];
        CountryBoundary {
            name: "United Kingdom".to_string(),
            geometry: MultiPolygon(vec![poly]),
        }
    }

    #[test]
    fn test_containment_hit() {
        let service = ContainmentService::new(CountryIndex::build(vec![uk_like_boundary()]));
        assert_eq!(service.country_of(-0.12, 51.5).unwrap(), "United Kingdom");
    }

    #[test]
    fn test_offshore_point_is_join_miss() {
        let service = ContainmentService::new(CountryIndex::build(vec![uk_like_boundary()]));
        assert!(matches!(
            service.country_of(-30.0, 51.5),
            Err(ResolveError::JoinMiss { .. })
        ));
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let service = ContainmentService::new(CountryIndex::build(vec![uk_like_boundary()]));
        let first = service.country_of(-0.12, 51.5).unwrap();
        for _ in 0..10 {
            assert_eq!(service.country_of(-0.12, 51.5).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_index() {
        let service = ContainmentService::new(CountryIndex::build(vec![]));
        assert!(service.index().is_empty());
        assert!(service.country_of(8.5, 47.4).is_err());
    }
}
