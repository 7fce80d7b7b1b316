//! Multiple-testing thresholds for an association table
//!
//! - Bonferroni: -log10(level / m), at a strict and a lenient level
//! - Benjamini-Hochberg: largest rank k with p(k) <= k/m * level
//!
//! All thresholds are on the -log10 scale and always computed over every
//! record of the table, never over a filtered subset.

use crate::config::RankingConfig;
use crate::error::{RankError, Result};
use crate::table::AssociationTable;
use crate::types::Thresholds;

/// Bonferroni threshold: -log10(level / n_tests)
pub fn bonferroni(level: f64, n_tests: usize) -> f64 {
    -(level / n_tests as f64).log10()
}

/// Benjamini-Hochberg threshold over a set of scores (-log10 p).
///
/// Returns the score of the largest rank k satisfying
/// `p(k) <= k/m * level`, or `None` when no rank qualifies. The stored score
/// is returned as-is so that `score >= threshold` selects exactly the
/// rejected hypotheses.
pub fn benjamini_hochberg(scores: &[f64], level: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    // Descending scores == ascending p-values
    let mut sorted: Vec<f64> = scores.to_vec();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));

    let m = sorted.len() as f64;
    let mut threshold = None;
    for (i, &score) in sorted.iter().enumerate() {
        let k = (i + 1) as f64;
        // p(k) <= k/m * level, compared on the -log10 scale
        if score >= -(k / m * level).log10() {
            threshold = Some(score);
        }
    }
    threshold
}

/// Compute Bonferroni and BH thresholds for the whole table.
///
/// When no rank passes Benjamini-Hochberg, `bh_threshold` falls back to the
/// lenient Bonferroni threshold. A qualifying BH threshold is capped at the
/// lenient Bonferroni threshold; nothing scores between the two, so the
/// selected set does not change.
pub fn compute_thresholds(table: &AssociationTable, config: &RankingConfig) -> Result<Thresholds> {
    let total = table.total_count();
    if total == 0 {
        return Err(RankError::empty(table.study_id()));
    }
    config.validate()?;

    let bonferroni_threshold01 = bonferroni(config.bonferroni_strict, total);
    let bonferroni_threshold05 = bonferroni(config.bonferroni_lenient, total);

    let scores = table.scores();
    let bh = match scores.as_slice() {
        Some(slice) => benjamini_hochberg(slice, config.fdr_level),
        None => benjamini_hochberg(&scores.to_vec(), config.fdr_level),
    };
    let bh_threshold = match bh {
        Some(t) => t.min(bonferroni_threshold05),
        None => {
            log::debug!(
                "No Benjamini-Hochberg rank for study '{}', using Bonferroni {}",
                table.study_id(),
                config.bonferroni_lenient
            );
            bonferroni_threshold05
        }
    };

    log::info!(
        "Study '{}': {} associations, Bonferroni {:.4}/{:.4}, BH {:.4}",
        table.study_id(),
        total,
        bonferroni_threshold01,
        bonferroni_threshold05,
        bh_threshold
    );

    Ok(Thresholds {
        bonferroni_threshold01,
        bonferroni_threshold05,
        bh_threshold,
        total_associations: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssociationRecord;
    use approx::assert_relative_eq;

    fn table_from_scores(scores: &[f64]) -> AssociationTable {
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| AssociationRecord::new("1", i as u32 + 1, s, 0.2, 10))
            .collect();
        AssociationTable::from_records("t", records).unwrap()
    }

    #[test]
    fn test_bonferroni_reference_values() {
        assert_relative_eq!(bonferroni(0.01, 206070), 7.3140147710960965, max_relative = 1e-14);
        assert_relative_eq!(bonferroni(0.05, 206070), 6.615044766760077, max_relative = 1e-14);
    }

    #[test]
    fn test_bonferroni_strict_above_lenient() {
        for n in [1usize, 2, 10, 1000, 206070, 10_000_000] {
            let t01 = bonferroni(0.01, n);
            let t05 = bonferroni(0.05, n);
            assert!(t01.is_finite() && t05.is_finite());
            assert!(t01 > t05, "n = {}", n);
        }
    }

    #[test]
    fn test_bh_textbook_example() {
        // p = 0.001, 0.008, 0.039, 0.041, 0.042, 0.06, 0.074, 0.205, 0.212, 0.216
        // m = 10, level = 0.05: k = 2 is the largest rank with p(k) <= k * 0.005
        let p = [0.001, 0.008, 0.039, 0.041, 0.042, 0.06, 0.074, 0.205, 0.212, 0.216];
        let scores: Vec<f64> = p.iter().map(|p: &f64| -p.log10()).collect();
        let bh = benjamini_hochberg(&scores, 0.05).unwrap();
        assert_relative_eq!(bh, -(0.008f64).log10(), max_relative = 1e-12);
    }

    #[test]
    fn test_bh_rank_exactly_on_boundary_passes() {
        // p(j) = j/m * level for j <= k, so rank k sits exactly on the line
        let m = 10;
        for k in 1..=m {
            let p: Vec<f64> = (1..=m)
                .map(|j| if j <= k { j as f64 / m as f64 * 0.05 } else { 0.9 })
                .collect();
            let scores: Vec<f64> = p.iter().map(|p: &f64| -p.log10()).collect();
            let bh = benjamini_hochberg(&scores, 0.05);
            assert_eq!(bh, Some(scores[k - 1]), "k = {}", k);
        }
    }

    #[test]
    fn test_bh_no_rank_returns_none() {
        let scores = [0.5, 0.3, 0.1];
        assert!(benjamini_hochberg(&scores, 0.05).is_none());
        assert!(benjamini_hochberg(&[], 0.05).is_none());
    }

    #[test]
    fn test_bh_falls_back_to_bonferroni() {
        let table = table_from_scores(&[0.5, 0.3, 0.1, 1.0]);
        let t = compute_thresholds(&table, &RankingConfig::default()).unwrap();
        assert_eq!(t.bh_threshold, t.bonferroni_threshold05);
        assert_eq!(t.total_associations, 4);
    }

    #[test]
    fn test_bh_never_stricter_than_bonferroni() {
        // A single extreme hit among noise: BH rank 1 has p far below 0.05/m
        let table = table_from_scores(&[12.0, 0.2, 0.1]);
        let t = compute_thresholds(&table, &RankingConfig::default()).unwrap();
        assert!(t.bh_threshold <= t.bonferroni_threshold05);
        assert!(12.0 >= t.bh_threshold);
    }

    #[test]
    fn test_bh_below_bonferroni_with_many_hits() {
        let mut scores = vec![8.0; 20];
        scores.extend(std::iter::repeat(0.1).take(80));
        scores.push(3.0);
        let table = table_from_scores(&scores);
        let t = compute_thresholds(&table, &RankingConfig::default()).unwrap();
        // rank 21 (p = 1e-3) passes 21/101 * 0.05, so BH admits the 3.0 record
        assert_relative_eq!(t.bh_threshold, 3.0);
        assert!(t.bh_threshold < t.bonferroni_threshold05);
    }

    #[test]
    fn test_empty_table_errors() {
        let table = AssociationTable::from_records("empty", Vec::new()).unwrap();
        let err = compute_thresholds(&table, &RankingConfig::default()).unwrap_err();
        assert!(matches!(err, RankError::EmptyTable { .. }));
    }
}
