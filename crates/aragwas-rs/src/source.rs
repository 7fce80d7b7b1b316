//! Association data sources.
//!
//! The engine only needs "give me the table for this study". Two sources are
//! provided:
//! - `DelimitedSource`: one CSV/TSV file per study under a root directory,
//!   optionally gzip-compressed
//! - `MemorySource`: records held in memory, keyed by study id

use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::{RankError, Result};
use crate::table::AssociationTable;
use crate::types::AssociationRecord;

/// Something that can produce the association table of a study.
pub trait AssociationSource {
    /// Human-readable reference used in logs and error context.
    fn describe(&self) -> String;

    /// Open and fully read the table for `study_id`.
    fn open(&self, study_id: &str) -> Result<AssociationTable>;
}

const CHROM_COLUMNS: &[&str] = &["chr", "chrom", "chromosome"];
const POSITION_COLUMNS: &[&str] = &["position", "pos", "bp"];
const SCORE_COLUMNS: &[&str] = &["score", "log10p", "neg_log10_p"];
const PVALUE_COLUMNS: &[&str] = &["pvalue", "p_value", "pval", "p"];
const MAF_COLUMNS: &[&str] = &["maf"];
const MAC_COLUMNS: &[&str] = &["mac"];

const EXTENSIONS: &[&str] = &["csv", "tsv", "txt", "csv.gz", "tsv.gz", "txt.gz"];

/// One delimited file per study: `<root>/<study_id>.<ext>`.
///
/// Expected columns (case-insensitive, first match wins):
/// chr, position, score or pvalue, maf, mac
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    root: PathBuf,
}

impl DelimitedSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the first existing file for `study_id`.
    pub fn resolve(&self, study_id: &str) -> Result<PathBuf> {
        for ext in EXTENSIONS {
            let candidate = self.root.join(format!("{}.{}", study_id, ext));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(RankError::source_unavailable(
            study_id,
            self.root.display().to_string(),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no {}.{{{}}} file", study_id, EXTENSIONS.join(",")),
            ),
        ))
    }
}

impl AssociationSource for DelimitedSource {
    fn describe(&self) -> String {
        format!("delimited files under {}", self.root.display())
    }

    fn open(&self, study_id: &str) -> Result<AssociationTable> {
        let path = self.resolve(study_id)?;
        let source_ref = path.display().to_string();
        let file = File::open(&path)
            .map_err(|e| RankError::source_unavailable(study_id, &source_ref, e))?;

        let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let records = read_delimited(reader, study_id, &source_ref)?;
        AssociationTable::from_records(study_id, records).map_err(|e| match e {
            RankError::MalformedData { message, .. } => {
                RankError::malformed(study_id, &source_ref, message)
            }
            other => other,
        })
    }
}

/// Detect delimiter (tab, comma, space) from a header line.
pub fn detect_delimiter(first_line: &str) -> u8 {
    if first_line.contains('\t') {
        b'\t'
    } else if first_line.contains(',') {
        b','
    } else {
        b' '
    }
}

/// Rewrite whitespace-separated lines with single spaces between fields.
fn collapse_whitespace(first_line: &str, rest: &str) -> String {
    let mut out = String::with_capacity(first_line.len() + rest.len());
    for line in first_line.lines().chain(rest.lines()) {
        let mut fields = line.split_whitespace();
        if let Some(first) = fields.next() {
            out.push_str(first);
            for field in fields {
                out.push(' ');
                out.push_str(field);
            }
        }
        out.push('\n');
    }
    out
}

fn find_col(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Parse association records from a delimited stream with a header row.
pub fn read_delimited<R: Read>(reader: R, study_id: &str, source_ref: &str) -> Result<Vec<AssociationRecord>> {
    let unavailable = |e: std::io::Error| RankError::source_unavailable(study_id, source_ref, e);
    let malformed = |msg: String| RankError::malformed(study_id, source_ref, msg);

    let mut buffered = BufReader::new(reader);
    let mut first_line = String::new();
    buffered.read_line(&mut first_line).map_err(unavailable)?;
    if first_line.trim().is_empty() {
        return Err(malformed("missing header row".to_string()));
    }
    let delim = detect_delimiter(&first_line);

    // Whitespace-separated tables are often column-aligned with runs of
    // spaces; csv would read each extra space as an empty field.
    let input: Box<dyn Read + '_> = if delim == b' ' {
        let mut rest = String::new();
        buffered.read_to_string(&mut rest).map_err(unavailable)?;
        Box::new(Cursor::new(collapse_whitespace(&first_line, &rest).into_bytes()))
    } else {
        Box::new(Cursor::new(first_line.into_bytes()).chain(buffered))
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delim)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = rdr
        .headers()
        .map_err(|e| malformed(format!("reading header: {}", e)))?
        .clone();

    let require = |names: &[&str], what: &str| -> Result<usize> {
        find_col(&headers, names).ok_or_else(|| malformed(format!("missing {} column", what)))
    };
    let idx_chrom = require(CHROM_COLUMNS, "chromosome")?;
    let idx_pos = require(POSITION_COLUMNS, "position")?;
    let idx_maf = require(MAF_COLUMNS, "maf")?;
    let idx_mac = require(MAC_COLUMNS, "mac")?;
    let score_col = match (find_col(&headers, SCORE_COLUMNS), find_col(&headers, PVALUE_COLUMNS)) {
        (Some(i), _) => ScoreColumn::Score(i),
        (None, Some(i)) => ScoreColumn::PValue(i),
        (None, None) => return Err(malformed("missing score or pvalue column".to_string())),
    };

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(io) => unavailable(io),
            other => malformed(format!("{:?}", other)),
        })?;
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let missing = |name: &str| malformed(format!("line {}: missing {}", line, name));
        let parse_u32 = |idx: usize, name: &str| -> Result<u32> {
            let raw = non_empty(&record, idx).ok_or_else(|| missing(name))?;
            raw.parse::<u32>()
                .map_err(|_| malformed(format!("line {}: {} '{}' is not a non-negative integer", line, name, raw)))
        };
        let parse_f64 = |idx: usize, name: &str| -> Result<f64> {
            let raw = non_empty(&record, idx).ok_or_else(|| missing(name))?;
            raw.parse::<f64>()
                .map_err(|_| malformed(format!("line {}: {} '{}' is not a number", line, name, raw)))
        };

        let score = match score_col {
            ScoreColumn::Score(i) => parse_f64(i, "score")?,
            ScoreColumn::PValue(i) => {
                let p = parse_f64(i, "pvalue")?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(malformed(format!("line {}: pvalue {} outside [0, 1]", line, p)));
                }
                -p.log10()
            }
        };
        if score.is_nan() {
            return Err(malformed(format!("line {}: score is NaN", line)));
        }
        let maf = parse_f64(idx_maf, "maf")?;
        if !(0.0..=1.0).contains(&maf) {
            return Err(malformed(format!("line {}: maf {} outside [0, 1]", line, maf)));
        }

        records.push(AssociationRecord {
            chromosome: non_empty(&record, idx_chrom)
                .ok_or_else(|| missing("chromosome"))?
                .to_string(),
            position: parse_u32(idx_pos, "position")?,
            score,
            maf,
            mac: parse_u32(idx_mac, "mac")?,
        });
    }

    Ok(records)
}

fn non_empty(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum ScoreColumn {
    Score(usize),
    PValue(usize),
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    studies: HashMap<String, Vec<AssociationRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, study_id: impl Into<String>, records: Vec<AssociationRecord>) {
        self.studies.insert(study_id.into(), records);
    }

    pub fn with_study(mut self, study_id: impl Into<String>, records: Vec<AssociationRecord>) -> Self {
        self.insert(study_id, records);
        self
    }
}

impl AssociationSource for MemorySource {
    fn describe(&self) -> String {
        format!("in-memory source ({} studies)", self.studies.len())
    }

    fn open(&self, study_id: &str) -> Result<AssociationTable> {
        let records = self.studies.get(study_id).ok_or_else(|| {
            RankError::source_unavailable(
                study_id,
                "memory",
                std::io::Error::new(std::io::ErrorKind::NotFound, "unknown study"),
            )
        })?;
        AssociationTable::from_records(study_id, records.clone())
    }
}
