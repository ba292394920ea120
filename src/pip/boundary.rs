//! Country boundary loading from a GeoJSON world layer.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{MultiPolygon, Polygon};
use geojson::{GeoJson, Value};
use tracing::{debug, info};

/// A single country polygon with its admin name.
#[derive(Debug, Clone)]
pub struct CountryBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl CountryBoundary {
    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::BoundingRect;
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Load the world boundary polygon set from a GeoJSON file.
///
/// Expects a feature collection in the Natural Earth admin-0 shape: one
/// feature per country, admin name under `ADMIN` (falling back to `NAME` /
/// `name`). Features without a name or polygon geometry are skipped.
pub fn load_world_boundaries(path: &Path) -> Result<Vec<CountryBoundary>> {
    info!("Loading world boundaries from {}", path.display());

    let content = fs::read_to_string(path).context("Failed to read boundary file")?;
    let geojson: GeoJson = content
        .parse()
        .context("Failed to parse boundary file as GeoJSON")?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        other => anyhow::bail!("expected a FeatureCollection, got {:?}", other),
    };

    let mut boundaries = Vec::new();

    for feature in features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| {
                p.get("ADMIN")
                    .or_else(|| p.get("NAME"))
                    .or_else(|| p.get("name"))
            })
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let Some(name) = name else {
            debug!("Skipping boundary feature without an admin name");
            continue;
        };

        let Some(geometry) = feature.geometry.and_then(|g| to_multipolygon(g.value)) else {
            debug!("Skipping boundary '{}' without polygon geometry", name);
            continue;
        };

        boundaries.push(CountryBoundary { name, geometry });
    }

    info!("Loaded {} country boundaries", boundaries.len());
    Ok(boundaries)
}

fn to_multipolygon(value: Value) -> Option<MultiPolygon<f64>> {
    match value {
        Value::Polygon(_) => Polygon::<f64>::try_from(value)
            .ok()
            .map(|p| MultiPolygon(vec![p])),
        Value::MultiPolygon(_) => MultiPolygon::<f64>::try_from(value).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_multipolygon_rejects_points() {
        assert!(to_multipolygon(Value::Point(vec![0.0, 0.0])).is_none());
    }

    #[test]
    fn test_to_multipolygon_wraps_single_polygon() {
        let ring = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ];
        let mp = to_multipolygon(Value::Polygon(vec![ring])).unwrap();
        assert_eq!(mp.0.len(), 1);
    }
}
