use anyhow::{bail, Context, Result};
use aragwas_rs::{
    count_hits, rank_studies, regroup, select, write_associations, write_associations_to_path,
    write_hits, write_hits_to_path, write_thresholds, write_thresholds_to_path, AssociationTable,
    CutoffUnit, DelimitedSource, HitRow, RankingConfig, RegroupKey, SelectionMode, ThresholdRow,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// aragwas: rank GWAS associations and compute multiple-testing thresholds
#[derive(Parser)]
#[command(
    name = "aragwas",
    version,
    about = "aragwas: rank GWAS associations per study (Bonferroni, Benjamini-Hochberg, top hits)"
)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct LevelArgs {
    /// Strict Bonferroni level
    #[arg(long, default_value_t = 0.01, help_heading = "Threshold")]
    bonferroni_strict: f64,

    /// Lenient Bonferroni level
    #[arg(long, default_value_t = 0.05, help_heading = "Threshold")]
    bonferroni_lenient: f64,

    /// Benjamini-Hochberg false discovery rate
    #[arg(long, default_value_t = 0.05, help_heading = "Threshold")]
    fdr: f64,

    /// Minimum minor allele frequency for selected associations
    #[arg(long, default_value_t = 0.0, help_heading = "Threshold")]
    min_maf: f64,
}

impl LevelArgs {
    fn to_config(&self) -> Result<RankingConfig> {
        let config = RankingConfig {
            bonferroni_strict: self.bonferroni_strict,
            bonferroni_lenient: self.bonferroni_lenient,
            fdr_level: self.fdr,
            min_maf: self.min_maf,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Clone)]
struct SelectionArgs {
    /// Selection mode: top, top-per-chromosome, or threshold
    #[arg(long, default_value = "top", help_heading = "Selection")]
    mode: String,

    /// N for the top modes, cutoff for threshold mode
    #[arg(long, default_value_t = 100.0, help_heading = "Selection")]
    value: f64,

    /// Unit of a threshold cutoff: score, pvalue, or auto (< 1 means p-value)
    #[arg(long, default_value = "auto", help_heading = "Selection")]
    unit: String,

    /// Output order: score, chromosome, position, or identity
    #[arg(long, default_value = "identity", help_heading = "Selection")]
    regroup: String,
}

impl SelectionArgs {
    fn mode(&self) -> Result<SelectionMode> {
        let unit: CutoffUnit = self.unit.parse()?;
        Ok(SelectionMode::parse(&self.mode, self.value, unit)?)
    }

    fn regroup_key(&self) -> Result<RegroupKey> {
        Ok(self.regroup.parse()?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute multiple-testing thresholds for one or more studies
    #[command(after_help = "EXAMPLES:
    # Thresholds for two studies, with hit counts
    aragwas thresholds --source studies/ --study 12 --study 13 --hits

METHODS:
    bonferroni  -log10(level / n_associations) at the strict and lenient level
    bh          Benjamini-Hochberg; falls back to lenient Bonferroni when no rank passes")]
    Thresholds {
        /// Directory holding one <study>.csv/.tsv[.gz] per study
        #[arg(long, help_heading = "Input/Output")]
        source: PathBuf,

        /// Study identifier (repeatable)
        #[arg(long = "study", required = true, help_heading = "Input/Output")]
        studies: Vec<String>,

        /// Output CSV (stdout if omitted)
        #[arg(long, help_heading = "Input/Output")]
        out: Option<PathBuf>,

        /// Also count associations above each threshold
        #[arg(long, default_value_t = false)]
        hits: bool,

        #[command(flatten)]
        levels: LevelArgs,
    },

    /// Count associations passing each threshold
    #[command(after_help = "EXAMPLES:
    # Bonferroni and BH hit counts for two studies
    aragwas hits --source studies/ --study 12 --study 13 --out hits.csv")]
    Hits {
        #[arg(long, help_heading = "Input/Output")]
        source: PathBuf,

        /// Study identifier (repeatable)
        #[arg(long = "study", required = true, help_heading = "Input/Output")]
        studies: Vec<String>,

        /// Output CSV (stdout if omitted)
        #[arg(long, help_heading = "Input/Output")]
        out: Option<PathBuf>,

        #[command(flatten)]
        levels: LevelArgs,
    },

    /// Select top associations of a study
    #[command(after_help = "EXAMPLES:
    # 10 best associations per chromosome
    aragwas top --source studies/ --study 12 --mode top-per-chromosome --value 10

    # Everything with p <= 1e-5, most significant first
    aragwas top --source studies/ --study 12 --mode threshold --value 1e-5 --regroup score")]
    Top {
        #[arg(long, help_heading = "Input/Output")]
        source: PathBuf,

        #[arg(long, help_heading = "Input/Output")]
        study: String,

        /// Output CSV (stdout if omitted)
        #[arg(long, help_heading = "Input/Output")]
        out: Option<PathBuf>,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        levels: LevelArgs,
    },

    /// Rank many studies in parallel, one output file per study
    Batch {
        #[arg(long, help_heading = "Input/Output")]
        source: PathBuf,

        /// Comma-separated study identifiers
        #[arg(long, help_heading = "Input/Output")]
        studies: String,

        /// Output directory for <study>.top.csv and thresholds.csv
        #[arg(long, help_heading = "Input/Output")]
        out_dir: PathBuf,

        /// Worker threads (0 = all cores)
        #[arg(long, default_value_t = 0)]
        threads: usize,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        levels: LevelArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Thresholds { source, studies, out, hits, levels } => {
            run_thresholds(&source, &studies, out.as_deref(), hits, &levels.to_config()?)
        }
        Commands::Hits { source, studies, out, levels } => {
            run_hits(&source, &studies, out.as_deref(), &levels.to_config()?)
        }
        Commands::Top { source, study, out, selection, levels } => {
            run_top(&source, &study, out.as_deref(), &selection, &levels.to_config()?)
        }
        Commands::Batch { source, studies, out_dir, threads, selection, levels } => {
            run_batch(&source, &parse_csv_list(&studies), &out_dir, threads, &selection, &levels.to_config()?)
        }
    }
}

fn init_logging(level: &str) {
    let filter = level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using warn", level);
        log::LevelFilter::Warn
    });
    env_logger::Builder::new().filter_level(filter).init();
}

fn parse_csv_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn run_thresholds(
    source_dir: &Path,
    studies: &[String],
    out: Option<&Path>,
    with_hits: bool,
    config: &RankingConfig,
) -> Result<()> {
    let source = DelimitedSource::new(source_dir);
    let mut computed = Vec::with_capacity(studies.len());
    for study in studies {
        let table = AssociationTable::load(&source, study)
            .with_context(|| format!("loading study '{}'", study))?;
        let thresholds = aragwas_rs::compute_thresholds(&table, config)?;
        let hits = with_hits.then(|| count_hits(&table, &thresholds));
        computed.push((thresholds, hits));
    }

    let rows: Vec<ThresholdRow<'_>> = studies
        .iter()
        .zip(&computed)
        .map(|(study, (t, h))| ThresholdRow::new(study, t, h.as_ref()))
        .collect();

    match out {
        Some(path) => {
            write_thresholds_to_path(path, &rows)?;
            eprintln!("Thresholds for {} studies written to {}", rows.len(), path.display());
        }
        None => write_thresholds(std::io::stdout().lock(), &rows)?,
    }
    Ok(())
}

fn run_hits(source_dir: &Path, studies: &[String], out: Option<&Path>, config: &RankingConfig) -> Result<()> {
    let source = DelimitedSource::new(source_dir);
    let mut counts = Vec::with_capacity(studies.len());
    for study in studies {
        let table = AssociationTable::load(&source, study)
            .with_context(|| format!("loading study '{}'", study))?;
        let thresholds = aragwas_rs::compute_thresholds(&table, config)?;
        counts.push(count_hits(&table, &thresholds));
    }

    let rows: Vec<HitRow<'_>> = studies
        .iter()
        .zip(&counts)
        .map(|(study, hits)| HitRow::new(study, hits))
        .collect();

    match out {
        Some(path) => {
            write_hits_to_path(path, &rows)?;
            eprintln!("Hit counts for {} studies written to {}", rows.len(), path.display());
        }
        None => write_hits(std::io::stdout().lock(), &rows)?,
    }
    Ok(())
}

fn run_top(
    source_dir: &Path,
    study: &str,
    out: Option<&Path>,
    selection: &SelectionArgs,
    config: &RankingConfig,
) -> Result<()> {
    let start = Instant::now();
    let mode = selection.mode()?;
    let key = selection.regroup_key()?;

    let source = DelimitedSource::new(source_dir);
    let table = AssociationTable::load(&source, study)
        .with_context(|| format!("loading study '{}'", study))?;
    eprintln!("Loaded {} associations for study {}", table.total_count(), study);

    let result = select(&table, mode, config)?;
    let records = regroup(&result, key);
    let t = &result.thresholds;
    eprintln!(
        "Selected {} associations ({}); Bonferroni 0.01 = {:.4}, 0.05 = {:.4}, BH = {:.4}",
        records.len(),
        mode,
        t.bonferroni_threshold01,
        t.bonferroni_threshold05,
        t.bh_threshold
    );

    match out {
        Some(path) => {
            write_associations_to_path(path, &records)?;
            eprintln!("Results written to {}", path.display());
        }
        None => write_associations(std::io::stdout().lock(), &records)?,
    }
    log::debug!("top finished in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn run_batch(
    source_dir: &Path,
    studies: &[String],
    out_dir: &Path,
    threads: usize,
    selection: &SelectionArgs,
    config: &RankingConfig,
) -> Result<()> {
    if studies.is_empty() {
        bail!("No studies given. Use --studies a,b,c");
    }
    let mode = selection.mode()?;
    let key = selection.regroup_key()?;

    if threads > 0 {
        aragwas_rs::batch::configure_threads(threads);
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let start = Instant::now();
    let source = DelimitedSource::new(source_dir);
    let rankings = rank_studies(&source, studies, mode, config);

    let mut rows = Vec::new();
    let mut failed = 0usize;
    for ranking in &rankings {
        match &ranking.result {
            Ok(result) => {
                let path = out_dir.join(format!("{}.top.csv", ranking.study_id));
                write_associations_to_path(&path, &regroup(result, key))?;
                rows.push(ThresholdRow::new(&ranking.study_id, &result.thresholds, None));
            }
            Err(e) => {
                failed += 1;
                eprintln!("Study {}: {}", ranking.study_id, e);
            }
        }
    }
    write_thresholds_to_path(out_dir.join("thresholds.csv"), &rows)?;

    eprintln!(
        "Ranked {} of {} studies in {:.2}s",
        rankings.len() - failed,
        rankings.len(),
        start.elapsed().as_secs_f64()
    );
    if failed > 0 {
        bail!("{} studies failed", failed);
    }
    Ok(())
}
