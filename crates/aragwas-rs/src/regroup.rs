//! Re-ordering of a selection for presentation.
//!
//! Every operation here is a pure permutation: the records that come out are
//! the records that went in, field for field, only their order changes.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{RankError, Result};
use crate::types::{natural_chrom_cmp, AssociationRecord, SelectionResult};

/// Order to regroup a selection into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegroupKey {
    /// Descending score across all chromosomes
    #[default]
    Score,
    /// Chromosome (natural order), selection order within a chromosome
    Chromosome,
    /// Chromosome (natural order), then ascending position
    Position,
    /// Selection order unchanged
    Identity,
}

impl FromStr for RegroupKey {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "score" => Ok(RegroupKey::Score),
            "chromosome" | "chr" => Ok(RegroupKey::Chromosome),
            "position" | "genomic" => Ok(RegroupKey::Position),
            "identity" | "none" => Ok(RegroupKey::Identity),
            other => Err(RankError::invalid_mode(format!(
                "unknown regroup key '{}'. Use: score, chromosome, position, or identity",
                other
            ))),
        }
    }
}

/// Regroup the associations of a selection.
pub fn regroup(selection: &SelectionResult, key: RegroupKey) -> Vec<AssociationRecord> {
    regroup_records(&selection.associations, key)
}

/// Regroup an arbitrary slice of records.
pub fn regroup_records(records: &[AssociationRecord], key: RegroupKey) -> Vec<AssociationRecord> {
    match key {
        RegroupKey::Identity => records.to_vec(),
        RegroupKey::Score => regroup_by(records, |a, b| b.score.total_cmp(&a.score)),
        RegroupKey::Chromosome => regroup_by(records, |a, b| natural_chrom_cmp(&a.chromosome, &b.chromosome)),
        RegroupKey::Position => regroup_by(records, |a, b| {
            natural_chrom_cmp(&a.chromosome, &b.chromosome).then_with(|| a.position.cmp(&b.position))
        }),
    }
}

/// Regroup with a caller-supplied ordering. The sort is stable, so records
/// the comparator considers equal keep their relative order.
pub fn regroup_by<F>(records: &[AssociationRecord], mut cmp: F) -> Vec<AssociationRecord>
where
    F: FnMut(&AssociationRecord, &AssociationRecord) -> Ordering,
{
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| cmp(&records[a], &records[b]));
    order.into_iter().map(|i| records[i].clone()).collect()
}

/// Split records into per-chromosome groups, groups in natural order and
/// records in their incoming order.
pub fn group_by_chromosome(records: &[AssociationRecord]) -> Vec<(String, Vec<AssociationRecord>)> {
    let mut groups: Vec<(String, Vec<AssociationRecord>)> = Vec::new();
    for rec in regroup_records(records, RegroupKey::Chromosome) {
        let same_group = groups.last().map_or(false, |(chrom, _)| *chrom == rec.chromosome);
        if same_group {
            if let Some((_, members)) = groups.last_mut() {
                members.push(rec);
            }
        } else {
            groups.push((rec.chromosome.clone(), vec![rec]));
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Thresholds;

    fn selection() -> SelectionResult {
        SelectionResult {
            associations: vec![
                AssociationRecord::new("1", 6369772, 5.559458119903501, 0.1386861313868613, 19),
                AssociationRecord::new("1", 120, 5.1, 0.2, 27),
                AssociationRecord::new("4", 429928, 6.555416448260276, 0.4233576642335766, 58),
                AssociationRecord::new("5", 18606578, 5.078449, 0.4744525547445255, 65),
                AssociationRecord::new("5", 18577788, 6.219812361173065, 0.15328467153284672, 21),
                AssociationRecord::new("10", 7, 5.1, 0.3, 41),
            ],
            thresholds: Thresholds {
                bonferroni_threshold01: 7.3,
                bonferroni_threshold05: 6.6,
                bh_threshold: 6.6,
                total_associations: 1000,
            },
        }
    }

    fn is_permutation(a: &[AssociationRecord], b: &[AssociationRecord]) -> bool {
        a.len() == b.len() && a.iter().all(|r| b.iter().filter(|x| *x == r).count() == a.iter().filter(|x| *x == r).count())
    }

    #[test]
    fn test_identity_round_trip() {
        let sel = selection();
        assert_eq!(regroup(&sel, RegroupKey::Identity), sel.associations);
    }

    #[test]
    fn test_score_regroup() {
        let sel = selection();
        let out = regroup(&sel, RegroupKey::Score);
        assert_eq!(out[0].position, 429928);
        assert_eq!(out[out.len() - 1].position, 18606578);
        // equal scores keep incoming order
        assert_eq!(out[3].position, 120);
        assert_eq!(out[4].position, 7);
        assert!(is_permutation(&out, &sel.associations));
    }

    #[test]
    fn test_position_regroup() {
        let out = regroup(&selection(), RegroupKey::Position);
        let keys: Vec<(&str, u32)> = out.iter().map(|r| (r.chromosome.as_str(), r.position)).collect();
        assert_eq!(
            keys,
            vec![("1", 120), ("1", 6369772), ("4", 429928), ("5", 18577788), ("5", 18606578), ("10", 7)]
        );
    }

    #[test]
    fn test_regroup_preserves_values_exactly() {
        let sel = selection();
        for key in [RegroupKey::Score, RegroupKey::Chromosome, RegroupKey::Position] {
            let out = regroup(&sel, key);
            assert!(is_permutation(&out, &sel.associations), "{:?}", key);
            let original = sel.associations.iter().find(|r| r.position == 6369772).unwrap();
            let moved = out.iter().find(|r| r.position == 6369772).unwrap();
            assert_eq!(original.score.to_bits(), moved.score.to_bits());
            assert_eq!(original.maf.to_bits(), moved.maf.to_bits());
        }
    }

    #[test]
    fn test_group_by_chromosome() {
        let groups = group_by_chromosome(&selection().associations);
        let labels: Vec<&str> = groups.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(labels, vec!["1", "4", "5", "10"]);
        assert_eq!(groups[2].1.len(), 2);
        assert_eq!(groups[2].1[0].position, 18606578);
    }

    #[test]
    fn test_custom_key() {
        let out = regroup_by(&selection().associations, |a, b| a.mac.cmp(&b.mac));
        let macs: Vec<u32> = out.iter().map(|r| r.mac).collect();
        assert_eq!(macs, vec![19, 21, 27, 41, 58, 65]);
    }

    #[test]
    fn test_parse_key() {
        assert_eq!("position".parse::<RegroupKey>().unwrap(), RegroupKey::Position);
        assert!(matches!("zigzag".parse::<RegroupKey>(), Err(RankError::InvalidMode(_))));
    }
}
