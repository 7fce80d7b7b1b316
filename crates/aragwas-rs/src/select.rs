//! Top-association selection
//!
//! Three selection modes:
//! - `Top(n)`: the n most significant associations of the whole table
//! - `TopPerChromosome(n)`: the n most significant per chromosome, grouped
//!   by chromosome in natural order (the layout the legacy loader served)
//! - `Threshold(cutoff)`: every association at or above a score cutoff, or
//!   at or below a p-value cutoff
//!
//! Ordering is always descending score with ties kept in table order, so
//! equal scores come back first-seen first.

use std::fmt;
use std::str::FromStr;

use crate::config::RankingConfig;
use crate::error::{RankError, Result};
use crate::table::AssociationTable;
use crate::threshold::compute_thresholds;
use crate::types::{score_desc_then_index, HitCounts, SelectionResult, Thresholds};

/// Unit of a threshold cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// Keep records with score >= value
    Score(f64),
    /// Keep records with p-value <= value, compared as score >= -log10(value)
    PValue(f64),
}

impl Cutoff {
    /// Legacy convention: values below 1 are p-values, anything else is a score.
    pub fn infer(value: f64) -> Self {
        if value < 1.0 {
            Cutoff::PValue(value)
        } else {
            Cutoff::Score(value)
        }
    }

    /// The cutoff on the score scale.
    pub fn as_score(&self) -> Result<f64> {
        match *self {
            Cutoff::Score(s) => {
                if !s.is_finite() {
                    return Err(RankError::invalid_cutoff(format!("score cutoff {} is not finite", s)));
                }
                Ok(s)
            }
            Cutoff::PValue(p) => {
                if !p.is_finite() || p <= 0.0 || p > 1.0 {
                    return Err(RankError::invalid_cutoff(format!(
                        "p-value cutoff {} must be in (0, 1]",
                        p
                    )));
                }
                Ok(-p.log10())
            }
        }
    }
}

/// Unit a caller supplies a threshold cutoff in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffUnit {
    Score,
    PValue,
    /// Decide per value, see `Cutoff::infer`
    #[default]
    Auto,
}

impl FromStr for CutoffUnit {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "score" | "log10p" => Ok(CutoffUnit::Score),
            "pvalue" | "p-value" | "p" => Ok(CutoffUnit::PValue),
            "auto" => Ok(CutoffUnit::Auto),
            other => Err(RankError::invalid_mode(format!(
                "unknown cutoff unit '{}'. Use: score, pvalue, or auto",
                other
            ))),
        }
    }
}

/// How to choose associations from a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionMode {
    Top(usize),
    TopPerChromosome(usize),
    Threshold(Cutoff),
}

impl SelectionMode {
    /// Build a mode from its name and a numeric argument.
    ///
    /// `mode` is one of `top`, `top-per-chromosome`, `threshold`. For the top
    /// modes `value` must be a positive whole number; `unit` only applies to
    /// `threshold`.
    pub fn parse(mode: &str, value: f64, unit: CutoffUnit) -> Result<Self> {
        let as_count = |v: f64| -> Result<usize> {
            if !v.is_finite() || v < 1.0 || v.fract() != 0.0 {
                return Err(RankError::invalid_cutoff(format!(
                    "top-N needs a positive whole number, got {}",
                    v
                )));
            }
            Ok(v as usize)
        };
        match mode.to_lowercase().as_str() {
            "top" => Ok(SelectionMode::Top(as_count(value)?)),
            "top-per-chromosome" | "top_per_chromosome" | "per-chromosome" => {
                Ok(SelectionMode::TopPerChromosome(as_count(value)?))
            }
            "threshold" => {
                let cutoff = match unit {
                    CutoffUnit::Score => Cutoff::Score(value),
                    CutoffUnit::PValue => Cutoff::PValue(value),
                    CutoffUnit::Auto => Cutoff::infer(value),
                };
                cutoff.as_score()?;
                Ok(SelectionMode::Threshold(cutoff))
            }
            other => Err(RankError::invalid_mode(format!(
                "unknown selection mode '{}'. Use: top, top-per-chromosome, or threshold",
                other
            ))),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Top(n) => write!(f, "top {}", n),
            SelectionMode::TopPerChromosome(n) => write!(f, "top {} per chromosome", n),
            SelectionMode::Threshold(Cutoff::Score(s)) => write!(f, "score >= {}", s),
            SelectionMode::Threshold(Cutoff::PValue(p)) => write!(f, "p-value <= {}", p),
        }
    }
}

/// Select associations from `table`.
///
/// Thresholds in the result always describe the full table, whatever the
/// mode, cutoff or MAF filter.
pub fn select(table: &AssociationTable, mode: SelectionMode, config: &RankingConfig) -> Result<SelectionResult> {
    let thresholds = compute_thresholds(table, config)?;
    let indices = select_indices(table, mode, config)?;

    log::debug!(
        "Study '{}': selected {} of {} associations ({})",
        table.study_id(),
        indices.len(),
        table.total_count(),
        mode
    );

    Ok(SelectionResult {
        associations: indices.into_iter().map(|i| table.record(i)).collect(),
        thresholds,
    })
}

/// Row indices chosen by `mode`, in output order.
pub fn select_indices(table: &AssociationTable, mode: SelectionMode, config: &RankingConfig) -> Result<Vec<usize>> {
    if table.is_empty() {
        return Err(RankError::empty(table.study_id()));
    }
    config.validate()?;
    let scores = table.scores();
    let maf = table.maf();
    let keep = |i: usize| maf[i] >= config.min_maf;

    let indices = match mode {
        SelectionMode::Top(n) => {
            check_count(n)?;
            let candidates: Vec<usize> = (0..table.total_count()).filter(|&i| keep(i)).collect();
            top_n(candidates, n, |i| scores[i])
        }
        SelectionMode::TopPerChromosome(n) => {
            check_count(n)?;
            let mut out = Vec::new();
            for (_chrom, rows) in table.indices_by_chromosome() {
                let candidates: Vec<usize> = rows.into_iter().filter(|&i| keep(i)).collect();
                out.extend(top_n(candidates, n, |i| scores[i]));
            }
            out
        }
        SelectionMode::Threshold(cutoff) => {
            let min_score = cutoff.as_score()?;
            let mut hits: Vec<usize> = (0..table.total_count())
                .filter(|&i| keep(i) && scores[i] >= min_score)
                .collect();
            hits.sort_by(|&a, &b| score_desc_then_index((scores[a], a), (scores[b], b)));
            hits
        }
    };
    Ok(indices)
}

/// Count associations at or above each threshold.
pub fn count_hits(table: &AssociationTable, thresholds: &Thresholds) -> HitCounts {
    let mut hits = HitCounts {
        bonferroni01: 0,
        bonferroni05: 0,
        bh: 0,
        total_associations: thresholds.total_associations,
    };
    for &s in table.scores().iter() {
        if s >= thresholds.bonferroni_threshold01 {
            hits.bonferroni01 += 1;
        }
        if s >= thresholds.bonferroni_threshold05 {
            hits.bonferroni05 += 1;
        }
        if s >= thresholds.bh_threshold {
            hits.bh += 1;
        }
    }
    hits
}

fn check_count(n: usize) -> Result<()> {
    if n == 0 {
        return Err(RankError::invalid_cutoff("top-N must be at least 1"));
    }
    Ok(())
}

/// The `n` best candidates by score, sorted. Partial selection keeps this
/// O(len + n log n) on large tables.
fn top_n<F: Fn(usize) -> f64>(mut candidates: Vec<usize>, n: usize, score: F) -> Vec<usize> {
    let cmp = |a: &usize, b: &usize| score_desc_then_index((score(*a), *a), (score(*b), *b));
    if candidates.len() > n {
        candidates.select_nth_unstable_by(n - 1, cmp);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(cmp);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssociationRecord;

    fn table() -> AssociationTable {
        let records = vec![
            AssociationRecord::new("1", 100, 2.0, 0.10, 10),
            AssociationRecord::new("1", 200, 6.0, 0.20, 20),
            AssociationRecord::new("1", 300, 4.0, 0.01, 1),
            AssociationRecord::new("2", 150, 4.0, 0.30, 30),
            AssociationRecord::new("2", 250, 5.0, 0.40, 40),
            AssociationRecord::new("10", 50, 4.0, 0.25, 25),
            AssociationRecord::new("3", 75, 1.0, 0.15, 15),
        ];
        AssociationTable::from_records("toy", records).unwrap()
    }

    fn positions(result: &SelectionResult) -> Vec<u32> {
        result.associations.iter().map(|r| r.position).collect()
    }

    #[test]
    fn test_top_n_descending_with_stable_ties() {
        let t = table();
        let res = select(&t, SelectionMode::Top(4), &RankingConfig::default()).unwrap();
        // 6.0, 5.0, then three 4.0s in table order, only the first fits
        assert_eq!(positions(&res), vec![200, 250, 300, 150]);
    }

    #[test]
    fn test_top_n_larger_than_table() {
        let t = table();
        let res = select(&t, SelectionMode::Top(100), &RankingConfig::default()).unwrap();
        assert_eq!(res.len(), 7);
        assert_eq!(positions(&res), vec![200, 250, 300, 150, 50, 100, 75]);
    }

    #[test]
    fn test_top_per_chromosome_groups_in_natural_order() {
        let t = table();
        let res = select(&t, SelectionMode::TopPerChromosome(1), &RankingConfig::default()).unwrap();
        let chroms: Vec<&str> = res.associations.iter().map(|r| r.chromosome.as_str()).collect();
        assert_eq!(chroms, vec!["1", "2", "3", "10"]);
        assert_eq!(positions(&res), vec![200, 250, 75, 50]);
    }

    #[test]
    fn test_threshold_by_score_and_pvalue_agree() {
        let t = table();
        let cfg = RankingConfig::default();
        let by_score = select(&t, SelectionMode::Threshold(Cutoff::Score(3.0)), &cfg).unwrap();
        let by_p = select(&t, SelectionMode::Threshold(Cutoff::PValue(1e-3)), &cfg).unwrap();
        assert_eq!(positions(&by_score), vec![200, 250, 300, 150, 50]);
        assert_eq!(by_score, by_p);
    }

    #[test]
    fn test_threshold_monotone_in_cutoff() {
        let t = table();
        let cfg = RankingConfig::default();
        let mut last = usize::MAX;
        for cutoff in [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0] {
            let n = select(&t, SelectionMode::Threshold(Cutoff::Score(cutoff)), &cfg).unwrap().len();
            assert!(n <= last);
            last = n;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_min_maf_filters_candidates_not_thresholds() {
        let t = table();
        let cfg = RankingConfig::default().with_min_maf(0.05);
        let res = select(&t, SelectionMode::Top(3), &cfg).unwrap();
        assert_eq!(positions(&res), vec![200, 250, 150]);
        assert_eq!(res.thresholds.total_associations, 7);
    }

    #[test]
    fn test_select_indices_rejects_invalid_min_maf() {
        let t = table();
        for min_maf in [f64::NAN, -0.1, 0.6] {
            let cfg = RankingConfig::default().with_min_maf(min_maf);
            assert!(
                matches!(select_indices(&t, SelectionMode::Top(3), &cfg), Err(RankError::InvalidCutoff(_))),
                "min_maf = {}",
                min_maf
            );
        }
    }

    #[test]
    fn test_invalid_arguments() {
        let t = table();
        let cfg = RankingConfig::default();
        assert!(matches!(select(&t, SelectionMode::Top(0), &cfg), Err(RankError::InvalidCutoff(_))));
        assert!(matches!(
            select(&t, SelectionMode::Threshold(Cutoff::Score(f64::NAN)), &cfg),
            Err(RankError::InvalidCutoff(_))
        ));
        assert!(matches!(
            select(&t, SelectionMode::Threshold(Cutoff::PValue(0.0)), &cfg),
            Err(RankError::InvalidCutoff(_))
        ));
        assert!(matches!(
            SelectionMode::parse("bottom", 5.0, CutoffUnit::Auto),
            Err(RankError::InvalidMode(_))
        ));
        assert!(matches!(
            SelectionMode::parse("top", 2.5, CutoffUnit::Auto),
            Err(RankError::InvalidCutoff(_))
        ));
        assert!(matches!(
            SelectionMode::parse("threshold", f64::INFINITY, CutoffUnit::Score),
            Err(RankError::InvalidCutoff(_))
        ));
        assert!("furlongs".parse::<CutoffUnit>().is_err());
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(SelectionMode::parse("top", 10.0, CutoffUnit::Auto).unwrap(), SelectionMode::Top(10));
        assert_eq!(
            SelectionMode::parse("threshold", 5.0, CutoffUnit::Auto).unwrap(),
            SelectionMode::Threshold(Cutoff::Score(5.0))
        );
        assert_eq!(
            SelectionMode::parse("threshold", 1e-5, CutoffUnit::Auto).unwrap(),
            SelectionMode::Threshold(Cutoff::PValue(1e-5))
        );
        assert_eq!(
            SelectionMode::parse("Top-Per-Chromosome", 3.0, CutoffUnit::Auto).unwrap(),
            SelectionMode::TopPerChromosome(3)
        );
    }

    #[test]
    fn test_count_hits() {
        let t = table();
        let thresholds = Thresholds {
            bonferroni_threshold01: 5.5,
            bonferroni_threshold05: 4.5,
            bh_threshold: 4.0,
            total_associations: 7,
        };
        let hits = count_hits(&t, &thresholds);
        assert_eq!(hits.bonferroni01, 1);
        assert_eq!(hits.bonferroni05, 2);
        assert_eq!(hits.bh, 5);
        assert_eq!(hits.total_associations, 7);
    }
}
