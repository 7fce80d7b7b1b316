//! Immutable columnar association table for one study.

use std::collections::{HashMap, HashSet};

use ndarray::Array1;

use crate::error::{RankError, Result};
use crate::source::AssociationSource;
use crate::types::{natural_chrom_cmp, AssociationRecord};

/// Association statistics of one study, stored column-wise.
///
/// Row order is whatever the source produced (usually genomic order). The
/// number of rows is the number of tests thresholds are computed over.
#[derive(Debug, Clone)]
pub struct AssociationTable {
    study_id: String,
    chromosomes: Vec<String>,
    /// Shape: (n_rows,)
    positions: Array1<u32>,
    scores: Array1<f64>,
    maf: Array1<f64>,
    mac: Array1<u32>,
}

impl AssociationTable {
    /// Load the table for `study_id` from `source`.
    pub fn load<S: AssociationSource + ?Sized>(source: &S, study_id: &str) -> Result<Self> {
        let table = source.open(study_id)?;
        log::debug!(
            "Loaded {} associations for study '{}' from {}",
            table.total_count(),
            study_id,
            source.describe()
        );
        Ok(table)
    }

    /// Build a table from already-parsed records.
    ///
    /// Rejects NaN scores and MAF values outside [0, 1].
    pub fn from_records(study_id: impl Into<String>, records: Vec<AssociationRecord>) -> Result<Self> {
        let study_id = study_id.into();
        let n = records.len();
        let mut chromosomes = Vec::with_capacity(n);
        let mut positions = Vec::with_capacity(n);
        let mut scores = Vec::with_capacity(n);
        let mut maf = Vec::with_capacity(n);
        let mut mac = Vec::with_capacity(n);

        for (row, rec) in records.into_iter().enumerate() {
            if rec.score.is_nan() {
                return Err(RankError::malformed(
                    &study_id,
                    "records",
                    format!("row {}: score is NaN", row + 1),
                ));
            }
            if !(0.0..=1.0).contains(&rec.maf) {
                return Err(RankError::malformed(
                    &study_id,
                    "records",
                    format!("row {}: maf {} outside [0, 1]", row + 1, rec.maf),
                ));
            }
            chromosomes.push(rec.chromosome);
            positions.push(rec.position);
            scores.push(rec.score);
            maf.push(rec.maf);
            mac.push(rec.mac);
        }

        Ok(Self {
            study_id,
            chromosomes,
            positions: Array1::from(positions),
            scores: Array1::from(scores),
            maf: Array1::from(maf),
            mac: Array1::from(mac),
        })
    }

    pub fn study_id(&self) -> &str {
        &self.study_id
    }

    pub fn total_count(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score column in table order.
    pub fn scores(&self) -> &Array1<f64> {
        &self.scores
    }

    pub fn maf(&self) -> &Array1<f64> {
        &self.maf
    }

    pub fn chromosome(&self, idx: usize) -> &str {
        &self.chromosomes[idx]
    }

    /// Materialise row `idx`. Panics when out of range, like slice indexing.
    pub fn record(&self, idx: usize) -> AssociationRecord {
        AssociationRecord {
            chromosome: self.chromosomes[idx].clone(),
            position: self.positions[idx],
            score: self.scores[idx],
            maf: self.maf[idx],
            mac: self.mac[idx],
        }
    }

    /// Snapshot of every row in table order.
    pub fn all_records(&self) -> Vec<AssociationRecord> {
        (0..self.total_count()).map(|i| self.record(i)).collect()
    }

    /// Distinct chromosome labels in natural order (1 < 2 < 10 < X).
    pub fn chromosomes(&self) -> Vec<String> {
        let distinct: HashSet<&str> = self.chromosomes.iter().map(String::as_str).collect();
        let mut labels: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        labels.sort_by(|a, b| natural_chrom_cmp(a, b));
        labels
    }

    /// Row indices grouped by chromosome, groups in natural order and rows
    /// in table order within each group.
    pub(crate) fn indices_by_chromosome(&self) -> Vec<(String, Vec<usize>)> {
        let mut by_chrom: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, c) in self.chromosomes.iter().enumerate() {
            by_chrom.entry(c.as_str()).or_default().push(idx);
        }
        let mut groups: Vec<(String, Vec<usize>)> = by_chrom
            .into_iter()
            .map(|(label, rows)| (label.to_string(), rows))
            .collect();
        groups.sort_by(|a, b| natural_chrom_cmp(&a.0, &b.0));
        groups
    }
}
