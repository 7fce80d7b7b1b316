//! Ranking many studies at once.
//!
//! Studies share nothing, so each one is loaded, thresholded and selected on
//! its own rayon task.

use rayon::prelude::*;

use crate::config::RankingConfig;
use crate::error::Result;
use crate::select::{select, SelectionMode};
use crate::source::AssociationSource;
use crate::table::AssociationTable;
use crate::types::SelectionResult;

/// Configure the global rayon pool. Only the first call has an effect.
pub fn configure_threads(n_threads: usize) {
    if rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
        .is_err()
    {
        log::warn!("Thread pool already initialised, ignoring request for {} threads", n_threads);
    }
}

/// Outcome for one study of a batch.
#[derive(Debug)]
pub struct StudyRanking {
    pub study_id: String,
    pub result: Result<SelectionResult>,
}

/// Rank every study in `study_ids` in parallel.
///
/// Results come back in input order. A failing study does not stop the
/// others; its error is reported in its own slot.
pub fn rank_studies<S>(
    source: &S,
    study_ids: &[String],
    mode: SelectionMode,
    config: &RankingConfig,
) -> Vec<StudyRanking>
where
    S: AssociationSource + Sync + ?Sized,
{
    study_ids
        .par_iter()
        .map(|study_id| {
            let result = AssociationTable::load(source, study_id)
                .and_then(|table| select(&table, mode, config));
            if let Err(e) = &result {
                log::warn!("Study '{}' failed: {}", study_id, e);
            }
            StudyRanking {
                study_id: study_id.clone(),
                result,
            }
        })
        .collect()
}
