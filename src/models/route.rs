//! Route records and name normalization.

use serde::{Deserialize, Serialize};

/// Which resolution strategy last wrote location data to a record.
///
/// Tier B (secondary-link capture) is deliberately absent: capturing a link is
/// not location data, so it never claims the tier field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Tier A: marker coordinates from the linked crag page.
    DirectCrag,
    /// Tier C: coordinates from the secondary reference page.
    SecondaryFetch,
    /// Tier D: country token from the secondary page title.
    TitleCountry,
    /// Tier E: country from point-in-polygon containment.
    SpatialContainment,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::DirectCrag => "direct_crag",
            ResolutionTier::SecondaryFetch => "secondary_fetch",
            ResolutionTier::TitleCountry => "title_country",
            ResolutionTier::SpatialContainment => "spatial_containment",
        }
    }
}

/// One climbing route, keyed by its normalized display name.
///
/// All location fields are append-only: once populated by a higher-priority
/// tier they are never overwritten by a lower tier or a weaker merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Source path on the catalog site, e.g. `/climbs/el-capitan-nose`.
    pub link: String,

    /// Normalized display name derived from the path slug. Merge key.
    #[serde(rename = "Route")]
    pub name: String,

    /// Grade label carried over from the listing crawl.
    pub grade: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[serde(rename = "inferred_country")]
    pub country: Option<String>,

    pub location_name: Option<String>,

    /// External reference URL captured when the crag anchor had no hyperlink.
    pub secondary_link: Option<String>,

    pub resolution_tier: Option<ResolutionTier>,
}

impl RouteRecord {
    pub fn new(link: impl Into<String>) -> Self {
        let link = link.into();
        let name = display_name_from_link(&link);
        Self {
            link,
            name,
            grade: None,
            latitude: None,
            longitude: None,
            country: None,
            location_name: None,
            secondary_link: None,
            resolution_tier: None,
        }
    }

    /// Both coordinates present.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn has_country(&self) -> bool {
        self.country.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Coordinates and country both resolved.
    pub fn fully_resolved(&self) -> bool {
        self.has_coordinates() && self.has_country()
    }

    /// No location data at all.
    pub fn unlocated(&self) -> bool {
        !self.has_coordinates() && !self.has_country()
    }

    /// Fold another record's fields into this one, filling only empty slots.
    ///
    /// This is the single merge rule of the whole pipeline: a non-empty
    /// destination field always wins. Coordinates move as a pair so a record
    /// can never end up with a latitude from one source and a longitude from
    /// another.
    pub fn merge_from(&mut self, other: &RouteRecord) {
        if !self.has_coordinates() && other.has_coordinates() {
            self.latitude = other.latitude;
            self.longitude = other.longitude;
        }
        if !self.has_country() {
            if let Some(c) = other.country.as_deref().filter(|c| !c.is_empty()) {
                self.country = Some(c.to_string());
            }
        }
        fill_string(&mut self.grade, &other.grade);
        fill_string(&mut self.location_name, &other.location_name);
        fill_string(&mut self.secondary_link, &other.secondary_link);
        if self.resolution_tier.is_none() {
            self.resolution_tier = other.resolution_tier;
        }
    }
}

fn fill_string(dst: &mut Option<String>, src: &Option<String>) {
    if dst.as_deref().map_or(true, |s| s.is_empty()) {
        if let Some(s) = src.as_deref().filter(|s| !s.is_empty()) {
            *dst = Some(s.to_string());
        }
    }
}

/// Derive the display name from a source path: take the trailing slug,
/// split on hyphens, capitalize each word, join with spaces.
///
/// `/climbs/el-capitan-nose` -> `El Capitan Nose`
pub fn display_name_from_link(link: &str) -> String {
    let slug = link.rsplit('/').next().unwrap_or(link);
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
