//! The tiered location resolver.
//!
//! Five strategies run in strict priority order. Each tier consumes only the
//! residual set left unresolved by all prior tiers, and tier ordering is a
//! hard barrier: a tier's results are fully committed to the table before the
//! next tier starts. Per-entity failures are recorded and never abort the
//! batch.

mod tiers;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};
use url::Url;

use crate::dataset::RouteTable;
use crate::error::ResolveError;
use crate::fetch::PageFetcher;
use crate::models::{ResolutionTier, RouteRecord};
use crate::pip::ContainmentService;

/// One strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// A: crag hyperlink -> crag page -> embedded map marker.
    DirectCrag,
    /// B: no crag hyperlink; capture the styled external reference link.
    RedirectLink,
    /// C: follow the reference link; map marker or location metadata tags.
    SecondaryFetch,
    /// D: country token from the reference page title.
    TitleCountry,
    /// E: point-in-polygon country inference for located routes.
    SpatialContainment,
}

impl Tier {
    /// All tiers in priority order.
    pub fn all() -> &'static [Tier] {
        &[
            Tier::DirectCrag,
            Tier::RedirectLink,
            Tier::SecondaryFetch,
            Tier::TitleCountry,
            Tier::SpatialContainment,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::DirectCrag => "direct-crag",
            Tier::RedirectLink => "redirect-link",
            Tier::SecondaryFetch => "secondary-fetch",
            Tier::TitleCountry => "title-country",
            Tier::SpatialContainment => "spatial-containment",
        }
    }

    /// Which tiers claim `resolution_tier` when they write location data.
    /// Capturing a link (tier B) is not location data.
    fn resolution_tier(&self) -> Option<ResolutionTier> {
        match self {
            Tier::DirectCrag => Some(ResolutionTier::DirectCrag),
            Tier::RedirectLink => None,
            Tier::SecondaryFetch => Some(ResolutionTier::SecondaryFetch),
            Tier::TitleCountry => Some(ResolutionTier::TitleCountry),
            Tier::SpatialContainment => Some(ResolutionTier::SpatialContainment),
        }
    }

    /// Does this route still need what the tier can provide?
    fn wants(&self, record: &RouteRecord) -> bool {
        let has_secondary = record
            .secondary_link
            .as_deref()
            .is_some_and(|l| !l.is_empty());
        match self {
            Tier::DirectCrag => !record.has_coordinates(),
            Tier::RedirectLink => !record.has_coordinates() && !has_secondary,
            Tier::SecondaryFetch => !record.has_coordinates() && has_secondary,
            Tier::TitleCountry => !record.has_country() && has_secondary,
            Tier::SpatialContainment => record.has_coordinates() && !record.has_country(),
        }
    }
}

/// Location data one tier produced for one route. Folded into the table
/// through the non-destructive merge, so a populated field never loses.
#[derive(Debug, Default, Clone)]
pub struct Enrichment {
    /// `(latitude, longitude)`
    pub coordinates: Option<(f64, f64)>,
    pub country: Option<String>,
    pub location_name: Option<String>,
    pub secondary_link: Option<String>,
}

impl Enrichment {
    fn wrote_location(&self) -> bool {
        self.coordinates.is_some() || self.country.is_some()
    }
}

/// A single entity's failure at a single tier.
#[derive(Debug)]
pub struct TierFailure {
    pub tier: Tier,
    /// Normalized route name (the merge key).
    pub key: String,
    pub link: String,
    pub error: ResolveError,
}

/// Accumulated per-run failure report.
#[derive(Debug, Default)]
pub struct RunReport {
    pub failures: Vec<TierFailure>,
}

/// Drives the tier chain over a route table.
pub struct TierRunner<'a, F: PageFetcher> {
    fetcher: &'a F,
    base_url: Url,
    containment: Option<&'a ContainmentService>,
    concurrency: usize,
}

impl<'a, F: PageFetcher> TierRunner<'a, F> {
    pub fn new(fetcher: &'a F, base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            fetcher,
            base_url: Url::parse(base_url)?,
            containment: None,
            concurrency: 8,
        })
    }

    pub fn with_containment(mut self, service: &'a ContainmentService) -> Self {
        self.containment = Some(service);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run a single tier over its residual set and commit the results.
    ///
    /// Fetches run on a bounded worker pool; commits happen sequentially
    /// after all workers finish, so the merge invariant never races.
    pub async fn run_tier(
        &self,
        tier: Tier,
        table: &mut RouteTable,
        progress: Option<ProgressBar>,
    ) -> Vec<TierFailure> {
        if tier == Tier::SpatialContainment && self.containment.is_none() {
            warn!("No boundary layer loaded, skipping {} tier", tier.name());
            return Vec::new();
        }

        let residual: Vec<RouteRecord> = table
            .rows()
            .iter()
            .filter(|r| tier.wants(r))
            .cloned()
            .collect();

        info!("Tier {}: {} candidates", tier.name(), residual.len());
        if let Some(pb) = &progress {
            pb.set_length(residual.len() as u64);
        }

        let outcomes: Vec<(RouteRecord, Result<Enrichment, ResolveError>)> =
            stream::iter(residual)
                .map(|record| {
                    let pb = progress.clone();
                    async move {
                        let outcome = self.resolve_one(tier, &record).await;
                        if let Some(pb) = &pb {
                            pb.inc(1);
                        }
                        (record, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        let mut failures = Vec::new();
        for (record, outcome) in outcomes {
            match outcome {
                Ok(enrichment) => {
                    debug!("{}: resolved by {} tier", record.name, tier.name());
                    table.upsert(apply(&record, enrichment, tier));
                }
                Err(error) => {
                    debug!("{}: {} tier failed: {}", record.name, tier.name(), error);
                    failures.push(TierFailure {
                        tier,
                        key: record.name,
                        link: record.link,
                        error,
                    });
                }
            }
        }
        failures
    }

    /// Run every tier in priority order. `progress` supplies an optional bar
    /// per tier; `after_tier` fires once each tier's results are committed —
    /// the persistence point of the barrier.
    pub async fn run(
        &self,
        table: &mut RouteTable,
        mut progress: impl FnMut(Tier) -> Option<ProgressBar>,
        mut after_tier: impl FnMut(Tier, &RouteTable) -> anyhow::Result<()>,
    ) -> anyhow::Result<RunReport> {
        let mut report = RunReport::default();
        for &tier in Tier::all() {
            let failures = self.run_tier(tier, table, progress(tier)).await;
            report.failures.extend(failures);
            after_tier(tier, table)?;
        }
        Ok(report)
    }

    async fn resolve_one(
        &self,
        tier: Tier,
        record: &RouteRecord,
    ) -> Result<Enrichment, ResolveError> {
        match tier {
            Tier::DirectCrag => self.tier_direct(record).await,
            Tier::RedirectLink => self.tier_redirect(record).await,
            Tier::SecondaryFetch => self.tier_secondary(record).await,
            Tier::TitleCountry => self.tier_title(record).await,
            Tier::SpatialContainment => self.tier_containment(record),
        }
    }

    pub(crate) fn absolute(&self, href: &str) -> Result<String, ResolveError> {
        self.base_url
            .join(href)
            .map(|u| u.to_string())
            .map_err(|e| ResolveError::Parse(format!("bad href '{}': {}", href, e)))
    }

    pub(crate) fn fetcher(&self) -> &F {
        self.fetcher
    }

    pub(crate) fn containment(&self) -> Option<&ContainmentService> {
        self.containment
    }
}

/// Turn a tier's enrichment into a mergeable record. The table's merge rule
/// does the rest: only empty fields on the canonical record are filled.
fn apply(record: &RouteRecord, enrichment: Enrichment, tier: Tier) -> RouteRecord {
    let mut update = RouteRecord::new(record.link.clone());
    let wrote_location = enrichment.wrote_location();
    if let Some((lat, lon)) = enrichment.coordinates {
        update.latitude = Some(lat);
        update.longitude = Some(lon);
    }
    update.country = enrichment.country;
    update.location_name = enrichment.location_name;
    update.secondary_link = enrichment.secondary_link;
    if wrote_location {
        update.resolution_tier = tier.resolution_tier();
    }
    update
}
