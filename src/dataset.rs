//! Reconciliation table and on-disk persistence.
//!
//! The table is keyed by normalized route name in crawl order. The first
//! record seen for a key is the canonical identity; later records only fill
//! fields the canonical record left empty. The table is written out after
//! every tier pass so a re-run can resume from partial state.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use tempfile::NamedTempFile;
use tracing::info;

use crate::models::RouteRecord;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Coordinates and country both present.
    pub resolved: usize,
    /// Coordinates without country, or country without coordinates.
    pub partial: usize,
    /// No location data at all.
    pub unresolved: usize,
}

/// The growing result table for one run.
pub struct RouteTable {
    rows: Vec<RouteRecord>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Fold a record in. A new key appends in crawl order; an existing key
    /// merges non-destructively into the canonical (first-seen) record.
    pub fn upsert(&mut self, record: RouteRecord) {
        match self.index.get(&record.name) {
            Some(&pos) => self.rows[pos].merge_from(&record),
            None => {
                self.index.insert(record.name.clone(), self.rows.len());
                self.rows.push(record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RouteRecord> {
        self.index.get(name).map(|&pos| &self.rows[pos])
    }

    pub fn rows(&self) -> &[RouteRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source links of routes still lacking coordinates, for the follow-up
    /// report and future reruns.
    pub fn unresolved_links(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| !r.has_coordinates())
            .map(|r| r.link.as_str())
            .collect()
    }

    pub fn summary(&self) -> ResolutionSummary {
        let mut summary = ResolutionSummary::default();
        for row in &self.rows {
            if row.fully_resolved() {
                summary.resolved += 1;
            } else if row.unlocated() {
                summary.unresolved += 1;
            } else {
                summary.partial += 1;
            }
        }
        summary
    }

    /// Write the table as CSV, replacing the target atomically: serialize to
    /// a temp file in the same directory, then rename over the destination.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .context("Failed to create temp file for dataset")?;

        {
            let mut writer = csv::Writer::from_writer(&tmp);
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }

        tmp.persist(path)
            .context("Failed to replace dataset file")?;
        info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Reload a previously written dataset so a re-run resumes from partial
    /// state instead of redoing resolved entities.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;

        let mut table = Self::new();
        for result in reader.deserialize() {
            let record: RouteRecord = result.context("Malformed dataset row")?;
            table.upsert(record);
        }
        info!("Resumed {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// Plain-text report of links that ended the run without a location.
    pub fn write_unresolved(&self, path: &Path) -> Result<()> {
        let links = self.unresolved_links();
        fs::write(path, links.join("\n"))
            .with_context(|| format!("Failed to write unresolved report {}", path.display()))?;
        info!("Wrote {} unresolved links to {}", links.len(), path.display());
        Ok(())
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResolutionTier;

    fn located(link: &str, lat: f64, lon: f64) -> RouteRecord {
        let mut rec = RouteRecord::new(link);
        rec.latitude = Some(lat);
        rec.longitude = Some(lon);
        rec.resolution_tier = Some(ResolutionTier::DirectCrag);
        rec
    }

    #[test]
    fn test_colliding_rows_merge_into_one() {
        // Two raw rows share a normalized name; the populated one survives
        let mut table = RouteTable::new();
        table.upsert(RouteRecord::new("/climbs/la-rambla"));
        table.upsert(located("/climbs/la-rambla", 40.78, 0.33));

        assert_eq!(table.len(), 1);
        let row = table.get("La Rambla").unwrap();
        assert_eq!(row.latitude, Some(40.78));
        assert_eq!(row.link, "/climbs/la-rambla");
    }

    #[test]
    fn test_first_seen_record_is_canonical() {
        let mut table = RouteTable::new();
        table.upsert(located("/climbs/jumbo-love", 35.41, -115.54));
        let mut weaker = located("/climbs/jumbo-love", 0.0, 0.0);
        weaker.resolution_tier = Some(ResolutionTier::SecondaryFetch);
        table.upsert(weaker);

        let row = table.get("Jumbo Love").unwrap();
        assert_eq!(row.latitude, Some(35.41));
        assert_eq!(row.resolution_tier, Some(ResolutionTier::DirectCrag));
    }

    #[test]
    fn test_summary_counts() {
        let mut table = RouteTable::new();
        let mut full = located("/climbs/a-muerte", 42.2, 1.6);
        full.country = Some("Spain".to_string());
        table.upsert(full);
        table.upsert(located("/climbs/open-air", 47.2, 9.4));
        table.upsert(RouteRecord::new("/climbs/mystery-line"));

        assert_eq!(
            table.summary(),
            ResolutionSummary {
                resolved: 1,
                partial: 1,
                unresolved: 1,
            }
        );
        assert_eq!(table.unresolved_links(), vec!["/climbs/mystery-line"]);
    }

    #[test]
    fn test_persist_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.csv");

        let mut table = RouteTable::new();
        let mut full = located("/climbs/el-capitan-nose", 37.7339, -119.6375);
        full.country = Some("United States of America".to_string());
        full.grade = Some("5.14a".to_string());
        table.upsert(full);
        table.upsert(RouteRecord::new("/climbs/unknown-route"));
        table.write_csv(&path).unwrap();

        let resumed = RouteTable::load_csv(&path).unwrap();
        assert_eq!(resumed.len(), 2);
        let row = resumed.get("El Capitan Nose").unwrap();
        assert_eq!(row.latitude, Some(37.7339));
        assert_eq!(row.grade.as_deref(), Some("5.14a"));
        assert_eq!(row.resolution_tier, Some(ResolutionTier::DirectCrag));
        assert!(!resumed.get("Unknown Route").unwrap().has_coordinates());
    }

    #[test]
    fn test_rerun_on_resolved_table_changes_nothing() {
        let mut table = RouteTable::new();
        let mut full = located("/climbs/silence", 70.07, 21.91);
        full.country = Some("Norway".to_string());
        table.upsert(full.clone());

        // Feeding the same listing again must be a no-op
        table.upsert(RouteRecord::new("/climbs/silence"));
        table.upsert(full);

        assert_eq!(table.len(), 1);
        let row = table.get("Silence").unwrap();
        assert_eq!(row.latitude, Some(70.07));
        assert_eq!(row.country.as_deref(), Some("Norway"));
    }
}
