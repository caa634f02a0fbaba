//! Daily trip counts per taxi company, served to the dashboard.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
struct TripCountRecord {
    date: String,
    company: String,
    trip_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripCountPoint {
    pub date: NaiveDate,
    pub trip_count: u64,
}

#[derive(Debug, Default)]
pub struct TripCounts {
    by_company: BTreeMap<String, Vec<TripCountPoint>>,
}

impl TripCounts {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open trip counts {}", path.display()))?;
        let counts = Self::from_reader(file)
            .with_context(|| format!("failed to parse trip counts {}", path.display()))?;
        info!(
            path = %path.display(),
            companies = counts.by_company.len(),
            "trip counts loaded"
        );
        Ok(counts)
    }

    /// Reads `date,company,trip_count` rows; extra columns are ignored.
    pub fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut by_company: BTreeMap<String, Vec<TripCountPoint>> = BTreeMap::new();
        for (line, result) in rdr.deserialize::<TripCountRecord>().enumerate() {
            let record = result?;
            let date = parse_date(&record.date)
                .ok_or_else(|| anyhow!("row {}: bad date {:?}", line + 1, record.date))?;
            by_company.entry(record.company).or_default().push(TripCountPoint {
                date,
                trip_count: record.trip_count,
            });
        }
        for points in by_company.values_mut() {
            points.sort_by_key(|p| p.date);
        }
        Ok(Self { by_company })
    }

    pub fn companies(&self) -> impl Iterator<Item = &str> {
        self.by_company.keys().map(String::as_str)
    }

    pub fn series(&self, company: &str) -> Option<&[TripCountPoint]> {
        self.by_company.get(company).map(Vec::as_slice)
    }
}

// Accepts `2024-01-31` and `2024-01-31 00:00:00`.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
