//! aragwas-rs: association ranking engine for per-study GWAS results
//!
//! Given the association table of a study (chromosome, position,
//! score = -log10 p, MAF, MAC) this crate:
//! - computes multiple-testing thresholds over the full table
//!   (Bonferroni at two levels, Benjamini-Hochberg)
//! - selects the top-N associations, top-N per chromosome, or everything
//!   above a score or p-value cutoff
//! - regroups a selection for presentation without touching record values
//!
//! ## Module Organization
//! - `types`: record, thresholds and selection types
//! - `table`: immutable columnar `AssociationTable`
//! - `source`: `AssociationSource` trait, delimited-file and in-memory sources
//! - `config`: significance levels and candidate filters
//! - `threshold`: Bonferroni and Benjamini-Hochberg thresholds
//! - `select`: top-N / threshold selection and hit counts
//! - `regroup`: re-ordering of selections
//! - `batch`: parallel ranking across studies
//! - `output`: CSV writers
//!
//! ## Example
//! ```ignore
//! use aragwas_rs::{select, AssociationTable, DelimitedSource, RankingConfig, SelectionMode};
//!
//! let source = DelimitedSource::new("studies/");
//! let table = AssociationTable::load(&source, "study_42")?;
//! let top = select(&table, SelectionMode::Top(100), &RankingConfig::default())?;
//! println!("BH threshold: {}", top.thresholds.bh_threshold);
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod regroup;
pub mod select;
pub mod source;
pub mod table;
pub mod threshold;
pub mod types;

pub use batch::{rank_studies, StudyRanking};
pub use config::RankingConfig;
pub use error::{RankError, Result};
pub use output::{
    write_associations,
    write_associations_to_path,
    write_hits,
    write_hits_to_path,
    write_thresholds,
    write_thresholds_to_path,
    HitRow,
    ThresholdRow,
};
pub use regroup::{group_by_chromosome, regroup, regroup_by, regroup_records, RegroupKey};
pub use select::{count_hits, select, select_indices, Cutoff, CutoffUnit, SelectionMode};
pub use source::{AssociationSource, DelimitedSource, MemorySource};
pub use table::AssociationTable;
pub use threshold::{benjamini_hochberg, bonferroni, compute_thresholds};
pub use types::{natural_chrom_cmp, AssociationRecord, HitCounts, SelectionResult, Thresholds};
