//! Coordinate and country extraction from page markup.

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::ResolveError;

fn script_selector() -> Selector {
    Selector::parse("script").unwrap()
}

fn title_selector() -> Selector {
    Selector::parse("title").unwrap()
}

fn marker_regex() -> Regex {
    Regex::new(r"L\.marker\(\[(-?\d+\.\d+),\s*(-?\d+\.\d+)\]\)").unwrap()
}

/// Reject non-finite or out-of-range pairs before they enter a record.
fn validate_pair(lat: f64, lon: f64) -> Result<(f64, f64), ResolveError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(ResolveError::Geometry(format!(
            "non-finite pair ({}, {})",
            lat, lon
        )));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ResolveError::Geometry(format!(
            "pair ({}, {}) outside valid range",
            lat, lon
        )));
    }
    Ok((lat, lon))
}

/// Extract the marker coordinates from the page's inline map-initialization
/// script. Returns `(latitude, longitude)`.
pub fn marker_coordinates(page: &Html) -> Result<(f64, f64), ResolveError> {
    let script = page
        .select(&script_selector())
        .map(|s| s.text().collect::<String>())
        .find(|body| body.contains("L.map"))
        .ok_or_else(|| ResolveError::Parse("no embedded map script".to_string()))?;

    let captures = marker_regex()
        .captures(&script)
        .ok_or_else(|| ResolveError::PatternMiss("no L.marker coordinate pair".to_string()))?;

    let lat: f64 = captures[1]
        .parse()
        .map_err(|_| ResolveError::Parse(format!("malformed latitude '{}'", &captures[1])))?;
    let lon: f64 = captures[2]
        .parse()
        .map_err(|_| ResolveError::Parse(format!("malformed longitude '{}'", &captures[2])))?;

    validate_pair(lat, lon)
}

/// Read explicit `place:location:*` latitude/longitude metadata tags.
pub fn meta_coordinates(page: &Html) -> Result<(f64, f64), ResolveError> {
    let lat = meta_content(page, "place:location:latitude")?;
    let lon = meta_content(page, "place:location:longitude")?;

    let lat: f64 = lat
        .parse()
        .map_err(|_| ResolveError::Parse(format!("malformed latitude metadata '{}'", lat)))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| ResolveError::Parse(format!("malformed longitude metadata '{}'", lon)))?;

    validate_pair(lat, lon)
}

fn meta_content(page: &Html, property: &str) -> Result<String, ResolveError> {
    let selector = Selector::parse(&format!(r#"meta[property="{}"]"#, property))
        .map_err(|_| ResolveError::Parse(format!("bad meta selector for '{}'", property)))?;
    page.select(&selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::to_string)
        .ok_or_else(|| ResolveError::Parse(format!("missing meta tag '{}'", property)))
}

/// The document title, stripped.
pub fn document_title(page: &Html) -> Result<String, ResolveError> {
    page.select(&title_selector())
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ResolveError::Parse("document has no title".to_string()))
}

/// Isolate the trailing country/region token from a reference page title,
/// e.g. `"Biographie, France - 8a.nu"` -> `"France"`.
pub fn country_from_title(title: &str) -> Result<String, ResolveError> {
    let after_comma = title
        .split(',')
        .nth(1)
        .ok_or_else(|| ResolveError::PatternMiss(format!("no locale delimiter in '{}'", title)))?;

    let country = after_comma
        .split('-')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    if country.is_empty() {
        return Err(ResolveError::PatternMiss(format!(
            "empty country token in '{}'",
            title
        )));
    }
    Ok(country)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRAG_PAGE: &str = r#"<html><head><title>El Capitan - Climbing History</title></head>
        <body><script>
            var map = L.map('map').setView([37.7339, -119.6375], 10);
            L.marker([37.7339, -119.6375]).addTo(map);
        </script></body></html>"#;

    #[test]
    fn test_marker_coordinates() {
        let page = Html::parse_document(CRAG_PAGE);
        let (lat, lon) = marker_coordinates(&page).unwrap();
        assert_eq!(lat, 37.7339);
        assert_eq!(lon, -119.6375);
    }

    #[test]
    fn test_missing_map_script_is_parse_error() {
        let page = Html::parse_document("<html><body><script>var x = 1;</script></body></html>");
        assert!(matches!(
            marker_coordinates(&page),
            Err(ResolveError::Parse(_))
        ));
    }

    #[test]
    fn test_map_without_marker_is_pattern_miss() {
        let page = Html::parse_document(
            "<html><body><script>var map = L.map('map');</script></body></html>",
        );
        assert!(matches!(
            marker_coordinates(&page),
            Err(ResolveError::PatternMiss(_))
        ));
    }

    #[test]
    fn test_out_of_range_marker_is_geometry_error() {
        let page = Html::parse_document(
            "<html><body><script>L.map; L.marker([137.0001, -119.5000])</script></body></html>",
        );
        assert!(matches!(
            marker_coordinates(&page),
            Err(ResolveError::Geometry(_))
        ));
    }

    #[test]
    fn test_meta_coordinates() {
        let page = Html::parse_document(
            r#"<html><head>
                <meta property="place:location:latitude" content="51.5">
                <meta property="place:location:longitude" content="-0.12">
            </head></html>"#,
        );
        assert_eq!(meta_coordinates(&page).unwrap(), (51.5, -0.12));
    }

    #[test]
    fn test_malformed_meta_is_parse_error() {
        let page = Html::parse_document(
            r#"<html><head>
                <meta property="place:location:latitude" content="fifty-one">
                <meta property="place:location:longitude" content="-0.12">
            </head></html>"#,
        );
        assert!(matches!(
            meta_coordinates(&page),
            Err(ResolveError::Parse(_))
        ));
    }

    #[test]
    fn test_country_from_title() {
        assert_eq!(
            country_from_title("Biographie, France - 8a.nu").unwrap(),
            "France"
        );
        assert!(matches!(
            country_from_title("No delimiter here"),
            Err(ResolveError::PatternMiss(_))
        ));
    }
}
