use std::collections::BTreeSet;

use ahash::AHashMap;
use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::metric::MetricKey;
use crate::ous::worker::{filtered_shard_stats, SketchFilter};
use crate::ous::{RespondentShape, ShardResult, SurveyOptions};
use crate::sketch::SketchInput;

/// An inclusive range of respondent ids processed by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardRange {
    pub start: u64,
    pub end: u64,
}

impl ShardRange {
    pub fn new(start: u64, end: u64) -> Self { Self { start, end } }

    #[inline] pub fn contains(&self, id: u64) -> bool { self.start <= id && id <= self.end }
}

/// Split the distinct respondent ids into at most `shard_count` contiguous
/// ranges of near-equal respondent counts. Ranges are gap-free from the
/// smallest to the largest id.
pub fn derive_shard_ranges(ids: impl IntoIterator<Item = u64>, shard_count: usize) -> Vec<ShardRange> {
    let ids: Vec<u64> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    if ids.is_empty() || shard_count == 0 { return vec![] }

    let chunk = ids.len().div_ceil(shard_count);
    let starts: Vec<u64> = ids.chunks(chunk).map(|c| c[0]).collect();
    let last = ids[ids.len() - 1];

    starts.iter().enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).map_or(last, |next| next - 1);
            ShardRange::new(start, end)
        })
        .collect()
}

/// Check that `ranges` are well-formed, pairwise disjoint, and cover every id.
pub fn check_shard_partition(ranges: &[ShardRange], ids: impl IntoIterator<Item = u64>) -> Result<()> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    for range in &sorted {
        if range.start > range.end {
            return Err(ReportError::ShardPartition(format!("empty range [{}, {}]", range.start, range.end)).into());
        }
    }
    for pair in sorted.windows(2) {
        if pair[1].start <= pair[0].end {
            return Err(ReportError::ShardPartition(format!(
                "ranges [{}, {}] and [{}, {}] overlap",
                pair[0].start, pair[0].end, pair[1].start, pair[1].end,
            )).into());
        }
    }
    for id in ids {
        let idx = sorted.partition_point(|range| range.end < id);
        if !sorted.get(idx).is_some_and(|range| range.contains(id)) {
            return Err(ReportError::ShardPartition(format!("respondent {id} is not covered by any range")).into());
        }
    }
    Ok(())
}

/// Merge shard results into one. Counters sum, class breakdowns merge key by
/// key, and metrics with equal `(metric_id, class_id, sketch_id)` add their
/// values. The result does not depend on the order of `partials`, up to
/// metric order and floating point rounding.
pub fn merge_shard_results(partials: impl IntoIterator<Item = ShardResult>) -> ShardResult {
    let mut merged = ShardResult::default();
    let mut index: AHashMap<MetricKey, usize> = AHashMap::new();

    for partial in partials {
        merged.stats.merge(&partial.stats);
        for metric in partial.metrics {
            match index.get(&metric.key()) {
                Some(&i) => merged.metrics[i].value += metric.value,
                None => {
                    index.insert(metric.key(), merged.metrics.len());
                    merged.metrics.push(metric);
                }
            }
        }
    }
    merged
}

/// Run the shard worker over every range in parallel, then merge in range order.
///
/// The ranges must partition the respondent ids present in `shapes`. The
/// sketch is unioned once, before any shard runs.
pub fn run_sharded(
    shapes: &[RespondentShape],
    ranges: &[ShardRange],
    sketch: Option<&SketchInput>,
    options: &SurveyOptions,
) -> Result<ShardResult> {
    check_shard_partition(ranges, shapes.iter().filter_map(RespondentShape::resp_id))?;

    let filter = sketch.map(SketchFilter::new).transpose()?;
    let partials = ranges.par_iter()
        .map(|&range| filtered_shard_stats(shapes, range, filter.as_ref(), options))
        .collect::<Result<Vec<_>>>()?;

    Ok(merge_shard_results(partials))
}

/// Compare the merged respondent count of an unfiltered run with the number
/// of distinct valid respondents counted directly from the shapes.
pub fn verify_respondent_total(merged: &ShardResult, shapes: &[RespondentShape]) -> Result<()> {
    let distinct = shapes.iter()
        .filter(|shape| shape.people().is_some())
        .filter_map(RespondentShape::resp_id)
        .collect::<BTreeSet<_>>()
        .len() as u64;

    if merged.stats.respondents != distinct {
        return Err(ReportError::RespondentMismatch { merged: merged.stats.respondents, distinct }.into());
    }
    Ok(())
}
