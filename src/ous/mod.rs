mod precalc;
mod shape;
mod shard;
mod stats;
mod worker;

pub use precalc::{ous_metric_groups, precalc_totals, COMMUNITY_METRIC, GEAR_METRIC, OVERALL_METRIC, SECTOR_METRIC};
pub use shape::{community_class_id, format_community_name, RespondentShape};
pub use shard::{check_shard_partition, derive_shard_ranges, merge_shard_results, run_sharded, verify_respondent_total, ShardRange};
pub use stats::{ClassCountStats, CountStats, OusStats, ShardResult};
pub use worker::{compute_shard_stats, SurveyOptions};

/// Metric id for people represented.
pub const PEOPLE_COUNT: &str = "ousPeopleCount";
/// Metric id for respondents.
pub const RESPONDENT_COUNT: &str = "ousRespondentCount";
/// Class id of the overall people metric.
pub const PEOPLE_COUNT_ALL: &str = "ousPeopleCount_all";
/// Class id of the overall respondent metric.
pub const RESPONDENT_COUNT_ALL: &str = "ousRespondentCount_all";

pub const UNKNOWN_COMMUNITY: &str = "unknown-community";
pub const UNKNOWN_SECTOR: &str = "unknown-sector";
pub const UNKNOWN_GEAR: &str = "unknown-gear";
