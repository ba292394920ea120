//! The individual tier strategies.
//!
//! Each returns an [`Enrichment`] on success or the specific failure that
//! sends the route on to the next tier. Parsed markup never crosses an await
//! point; pages are reduced to plain values first.

use scraper::Html;

use super::{Enrichment, TierRunner};
use crate::error::ResolveError;
use crate::extract::{
    country_from_title, document_title, find_route_anchor, find_secondary_anchor,
    marker_coordinates, meta_coordinates,
};
use crate::fetch::PageFetcher;
use crate::models::RouteRecord;

/// First word of the normalized display name, the anchor-matching stem.
fn anchor_stem(record: &RouteRecord) -> &str {
    record.name.split_whitespace().next().unwrap_or(&record.name)
}

fn secondary_url(record: &RouteRecord) -> Result<&str, ResolveError> {
    record
        .secondary_link
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ResolveError::Parse("no secondary link on record".to_string()))
}

impl<F: PageFetcher> TierRunner<'_, F> {
    /// Tier A: anchor's crag hyperlink -> crag page -> inline map marker.
    ///
    /// When the crag page exists but carries no map, its styled reference
    /// link (and its title) are salvaged so tier C has something to follow.
    pub(super) async fn tier_direct(
        &self,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        let url = self.absolute(&record.link)?;
        let body = self.fetcher().fetch(&url).await?;

        let crag_href = {
            let page = Html::parse_document(&body);
            let anchor = find_route_anchor(&page, anchor_stem(record))?;
            anchor.crag_href.ok_or_else(|| {
                ResolveError::PatternMiss("anchor has no crag hyperlink".to_string())
            })?
        };

        let crag_url = self.absolute(&crag_href)?;
        let crag_body = self.fetcher().fetch(&crag_url).await?;

        let page = Html::parse_document(&crag_body);
        let location_name = document_title(&page).ok();

        match marker_coordinates(&page) {
            Ok(coords) => Ok(Enrichment {
                coordinates: Some(coords),
                location_name,
                ..Default::default()
            }),
            Err(err) => match find_secondary_anchor(&page) {
                Some(href) => Ok(Enrichment {
                    secondary_link: Some(href),
                    location_name,
                    ..Default::default()
                }),
                None => Err(err),
            },
        }
    }

    /// Tier B: the route page itself offers the styled external reference
    /// link. Success is just capturing it; coordinates come later.
    pub(super) async fn tier_redirect(
        &self,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        let url = self.absolute(&record.link)?;
        let body = self.fetcher().fetch(&url).await?;

        let page = Html::parse_document(&body);
        match find_secondary_anchor(&page) {
            Some(href) => Ok(Enrichment {
                secondary_link: Some(href),
                ..Default::default()
            }),
            None => Err(ResolveError::Parse(
                "no secondary reference link on page".to_string(),
            )),
        }
    }

    /// Tier C: follow the reference link; retry the map-marker extraction
    /// there, else read the explicit latitude/longitude metadata tags.
    pub(super) async fn tier_secondary(
        &self,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        let url = secondary_url(record)?.to_string();
        let body = self.fetcher().fetch(&url).await?;

        let page = Html::parse_document(&body);
        let coords = marker_coordinates(&page).or_else(|_| meta_coordinates(&page))?;

        Ok(Enrichment {
            coordinates: Some(coords),
            ..Default::default()
        })
    }

    /// Tier D: the reference page title carries a trailing country token.
    pub(super) async fn tier_title(
        &self,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        let url = secondary_url(record)?.to_string();
        let body = self.fetcher().fetch(&url).await?;

        let country = {
            let page = Html::parse_document(&body);
            country_from_title(&document_title(&page)?)?
        };

        Ok(Enrichment {
            country: Some(country),
            ..Default::default()
        })
    }

    /// Tier E: point-in-polygon country inference. Only reached by routes
    /// that already carry coordinates but no country, so directly-extracted
    /// page metadata always takes precedence over the spatial join.
    pub(super) fn tier_containment(
        &self,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        let service = self
            .containment()
            .ok_or_else(|| ResolveError::Parse("no boundary layer loaded".to_string()))?;

        let (lat, lon) = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(ResolveError::Geometry(
                    "record has no coordinate pair".to_string(),
                ))
            }
        };

        let country = service.country_of(lon, lat)?;
        Ok(Enrichment {
            country: Some(country),
            ..Default::default()
        })
    }
}
