use std::io::Read;
use std::path::Path;

use anyhow::Context;
use gbdt::decision_tree::{Data, DataVec};
use serde::Deserialize;
use tracing::{info, warn};

use crate::request::FeatureRow;

/// One row of the historical trip CSV. Columns other than these are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRecord {
    pub vendor_id: Option<f32>,
    pub pickup_location_id_int: Option<f32>,
    pub dropoff_location_id_int: Option<f32>,
    pub weekday: Option<f32>,
    pub time_of_day: Option<f32>,
    pub passenger_count: Option<f32>,
    pub fare_amount: Option<f32>,
}

impl TripRecord {
    /// Features and target, or `None` when any column is blank.
    pub fn complete(&self) -> Option<(FeatureRow, f32)> {
        let row = FeatureRow([
            self.vendor_id?,
            self.pickup_location_id_int?,
            self.dropoff_location_id_int?,
            self.weekday?,
            self.time_of_day?,
            self.passenger_count?,
        ]);
        Some((row, self.fare_amount?))
    }
}

#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<FeatureRow>,
    targets: Vec<f32>,
}

impl Dataset {
    pub fn from_csv(path: &Path, max_rows: Option<usize>) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open training data {}", path.display()))?;
        let dataset = Self::from_reader(file, max_rows)
            .with_context(|| format!("failed to parse training data {}", path.display()))?;
        info!(path = %path.display(), rows = dataset.len(), "training data loaded");
        Ok(dataset)
    }

    /// Reads at most `max_rows` records; rows with blank columns are skipped.
    pub fn from_reader(reader: impl Read, max_rows: Option<usize>) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut dataset = Dataset::default();
        let mut skipped = 0_usize;
        let records = rdr
            .deserialize::<TripRecord>()
            .take(max_rows.unwrap_or(usize::MAX));
        for result in records {
            match result?.complete() {
                Some((row, target)) => dataset.push(row, target),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "skipped incomplete trip records");
        }
        Ok(dataset)
    }

    pub fn push(&mut self, row: FeatureRow, target: f32) {
        self.rows.push(row);
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    pub fn targets(&self, indices: &[usize]) -> Vec<f32> {
        indices.iter().map(|&i| self.targets[i]).collect()
    }

    pub fn training_data(&self, indices: &[usize]) -> DataVec {
        indices
            .iter()
            .map(|&i| Data::new_training_data(self.rows[i].to_vec(), 1.0, self.targets[i], None))
            .collect()
    }

    pub fn test_data(&self, indices: &[usize]) -> DataVec {
        indices
            .iter()
            .map(|&i| Data::new_test_data(self.rows[i].to_vec(), None))
            .collect()
    }
}
