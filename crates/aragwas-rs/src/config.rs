//! Significance levels and candidate filters used when ranking a table.

use crate::error::{RankError, Result};

/// Ranking configuration.
///
/// The defaults reproduce the legacy service: Bonferroni at 0.01 and 0.05,
/// Benjamini-Hochberg at 0.05, no MAF filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    /// Strict Bonferroni level (reported as `bonferroni_threshold01`)
    pub bonferroni_strict: f64,
    /// Lenient Bonferroni level (reported as `bonferroni_threshold05`)
    pub bonferroni_lenient: f64,
    /// False discovery rate for Benjamini-Hochberg
    pub fdr_level: f64,
    /// Candidates with a lower MAF are never selected. Thresholds still
    /// count every record.
    pub min_maf: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            bonferroni_strict: 0.01,
            bonferroni_lenient: 0.05,
            fdr_level: 0.05,
            min_maf: 0.0,
        }
    }
}

impl RankingConfig {
    pub fn with_min_maf(mut self, min_maf: f64) -> Self {
        self.min_maf = min_maf;
        self
    }

    pub fn with_fdr_level(mut self, level: f64) -> Self {
        self.fdr_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, level) in [
            ("bonferroni_strict", self.bonferroni_strict),
            ("bonferroni_lenient", self.bonferroni_lenient),
            ("fdr_level", self.fdr_level),
        ] {
            if !(level > 0.0 && level < 1.0) {
                return Err(RankError::invalid_cutoff(format!(
                    "{} must be in (0, 1), got {}",
                    name, level
                )));
            }
        }
        if self.bonferroni_strict > self.bonferroni_lenient {
            return Err(RankError::invalid_cutoff(format!(
                "bonferroni_strict ({}) must not exceed bonferroni_lenient ({})",
                self.bonferroni_strict, self.bonferroni_lenient
            )));
        }
        if !(0.0..=0.5).contains(&self.min_maf) {
            return Err(RankError::invalid_cutoff(format!(
                "min_maf must be in [0, 0.5], got {}",
                self.min_maf
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RankingConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.bonferroni_strict, 0.01);
        assert_eq!(cfg.bonferroni_lenient, 0.05);
    }

    #[test]
    fn test_rejects_swapped_levels() {
        let cfg = RankingConfig {
            bonferroni_strict: 0.05,
            bonferroni_lenient: 0.01,
            ..RankingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RankError::InvalidCutoff(_))));
    }

    #[test]
    fn test_rejects_bad_maf_and_levels() {
        assert!(RankingConfig::default().with_min_maf(0.7).validate().is_err());
        assert!(RankingConfig::default().with_min_maf(f64::NAN).validate().is_err());
        assert!(RankingConfig::default().with_fdr_level(0.0).validate().is_err());
        assert!(RankingConfig::default().with_fdr_level(1.5).validate().is_err());
    }
}
