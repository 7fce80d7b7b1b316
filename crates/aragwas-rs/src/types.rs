//! Core record types shared by the table, selector and regrouper.

use serde::Serialize;
use std::cmp::Ordering;

/// One SNP-level association statistic for a study.
///
/// `score` is always -log10(p-value); higher is more significant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRecord {
    #[serde(rename = "chr")]
    pub chromosome: String,
    pub position: u32,
    pub score: f64,
    pub maf: f64,
    pub mac: u32,
}

impl AssociationRecord {
    pub fn new(chromosome: impl Into<String>, position: u32, score: f64, maf: f64, mac: u32) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            score,
            maf,
            mac,
        }
    }

    /// The p-value this score was derived from.
    pub fn p_value(&self) -> f64 {
        10f64.powf(-self.score)
    }
}

/// Multiple-testing correction thresholds on the -log10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Bonferroni at the strict level (0.01 by default)
    pub bonferroni_threshold01: f64,
    /// Bonferroni at the lenient level (0.05 by default)
    pub bonferroni_threshold05: f64,
    /// Benjamini-Hochberg FDR threshold
    pub bh_threshold: f64,
    /// Number of tests the thresholds were computed over
    pub total_associations: usize,
}

/// Selected associations together with the thresholds of the full table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub associations: Vec<AssociationRecord>,
    pub thresholds: Thresholds,
}

impl SelectionResult {
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }
}

/// Number of associations at or above each threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitCounts {
    pub bonferroni01: usize,
    pub bonferroni05: usize,
    pub bh: usize,
    pub total_associations: usize,
}

/// Natural chromosome comparison (chr1 < chr2 < chr10 < chrX)
pub fn natural_chrom_cmp(a: &str, b: &str) -> Ordering {
    let a_num = a.trim_start_matches("chr").trim_start_matches("Chr").trim_start_matches("CHR");
    let b_num = b.trim_start_matches("chr").trim_start_matches("Chr").trim_start_matches("CHR");

    match (a_num.parse::<u32>(), b_num.parse::<u32>()) {
        (Ok(an), Ok(bn)) => an.cmp(&bn).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less, // Numbers before letters
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Descending score, ties broken by ascending original index.
pub(crate) fn score_desc_then_index(a: (f64, usize), b: (f64, usize)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}
