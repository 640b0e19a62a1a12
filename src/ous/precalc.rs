use anyhow::Result;
use tracing::info;

use crate::config::ReportConfig;
use crate::ous::{
    derive_shard_ranges, run_sharded, verify_respondent_total, ClassCountStats, OusStats,
    RespondentShape, ShardResult, SurveyOptions, PEOPLE_COUNT_ALL, UNKNOWN_COMMUNITY,
};
use crate::report::{DataClass, MetricGroup};

pub const OVERALL_METRIC: &str = "ousOverallDemographicOverlap";
pub const SECTOR_METRIC: &str = "ousSectorDemographicOverlap";
pub const COMMUNITY_METRIC: &str = "ousCommunityDemographicOverlap";
pub const GEAR_METRIC: &str = "ousGearDemographicOverlap";

/// Survey-wide totals: every shard without a sketch filter, checked against
/// an independent count of distinct respondents.
pub fn precalc_totals(shapes: &[RespondentShape], config: &ReportConfig) -> Result<ShardResult> {
    let ranges = match &config.shard_ranges {
        Some(ranges) => ranges.clone(),
        None => derive_shard_ranges(shapes.iter().filter_map(RespondentShape::resp_id), config.shard_count),
    };
    info!(shapes = shapes.len(), shards = ranges.len(), "precalculating survey totals");

    let merged = run_sharded(shapes, &ranges, None, &SurveyOptions::from_config(config))?;
    verify_respondent_total(&merged, shapes)?;
    Ok(merged)
}

/// Class lists for the demographic report, derived from survey-wide stats.
pub fn ous_metric_groups(stats: &OusStats) -> Vec<MetricGroup> {
    let classes = |breakdown: &ClassCountStats, display: fn(&str) -> String| {
        breakdown.keys()
            .map(|class_id| DataClass::new(class_id.as_str(), display(class_id)))
            .collect::<Vec<_>>()
    };

    let mut communities = classes(&stats.by_community, str::to_string);
    if !stats.by_community.contains_key(UNKNOWN_COMMUNITY) {
        communities.push(DataClass::new(UNKNOWN_COMMUNITY, "Unknown"));
    }

    vec![
        MetricGroup::new(OVERALL_METRIC, vec![DataClass::new(PEOPLE_COUNT_ALL, "Total")]),
        MetricGroup::new(SECTOR_METRIC, classes(&stats.by_sector, str::to_string)),
        MetricGroup::new(COMMUNITY_METRIC, communities),
        MetricGroup::new(GEAR_METRIC, classes(&stats.by_gear, capitalize)),
    ]
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
