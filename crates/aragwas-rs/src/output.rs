//! CSV output of selections and thresholds.
//!
//! Paths ending in `.gz` are gzip-compressed.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::{AssociationRecord, HitCounts, Thresholds};

/// One row of a thresholds report.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdRow<'a> {
    pub study_id: &'a str,
    pub bonferroni_threshold01: f64,
    pub bonferroni_threshold05: f64,
    pub bh_threshold: f64,
    pub total_associations: usize,
    pub hits_bonferroni01: Option<usize>,
    pub hits_bonferroni05: Option<usize>,
    pub hits_bh: Option<usize>,
}

impl<'a> ThresholdRow<'a> {
    pub fn new(study_id: &'a str, thresholds: &Thresholds, hits: Option<&HitCounts>) -> Self {
        Self {
            study_id,
            bonferroni_threshold01: thresholds.bonferroni_threshold01,
            bonferroni_threshold05: thresholds.bonferroni_threshold05,
            bh_threshold: thresholds.bh_threshold,
            total_associations: thresholds.total_associations,
            hits_bonferroni01: hits.map(|h| h.bonferroni01),
            hits_bonferroni05: hits.map(|h| h.bonferroni05),
            hits_bh: hits.map(|h| h.bh),
        }
    }
}

/// One row of a hit-count report.
#[derive(Debug, Clone, Serialize)]
pub struct HitRow<'a> {
    pub study_id: &'a str,
    pub total_associations: usize,
    pub bonferroni01: usize,
    pub bonferroni05: usize,
    pub bh: usize,
}

impl<'a> HitRow<'a> {
    pub fn new(study_id: &'a str, hits: &HitCounts) -> Self {
        Self {
            study_id,
            total_associations: hits.total_associations,
            bonferroni01: hits.bonferroni01,
            bonferroni05: hits.bonferroni05,
            bh: hits.bh,
        }
    }
}

/// Write records as CSV with header `chr,position,score,maf,mac`.
pub fn write_associations<W: Write>(writer: W, records: &[AssociationRecord]) -> Result<()> {
    write_rows(writer, records)
}

/// Write threshold rows as CSV.
pub fn write_thresholds<W: Write>(writer: W, rows: &[ThresholdRow<'_>]) -> Result<()> {
    write_rows(writer, rows)
}

/// Write hit-count rows as CSV.
pub fn write_hits<W: Write>(writer: W, rows: &[HitRow<'_>]) -> Result<()> {
    write_rows(writer, rows)
}

/// Write records to `path`, gzip-compressed when it ends in `.gz`.
pub fn write_associations_to_path<P: AsRef<Path>>(path: P, records: &[AssociationRecord]) -> Result<()> {
    with_path_writer(path.as_ref(), |w| write_associations(w, records))
}

/// Write threshold rows to `path`, gzip-compressed when it ends in `.gz`.
pub fn write_thresholds_to_path<P: AsRef<Path>>(path: P, rows: &[ThresholdRow<'_>]) -> Result<()> {
    with_path_writer(path.as_ref(), |w| write_thresholds(w, rows))
}

/// Write hit-count rows to `path`, gzip-compressed when it ends in `.gz`.
pub fn write_hits_to_path<P: AsRef<Path>>(path: P, rows: &[HitRow<'_>]) -> Result<()> {
    with_path_writer(path.as_ref(), |w| write_hits(w, rows))
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn with_path_writer<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let file = BufWriter::new(File::create(path)?);
    if path.extension().map_or(false, |e| e == "gz") {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write(&mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        write(&mut file)?;
        file.flush()?;
    }
    Ok(())
}
