mod engine;
mod reduce;
mod summary;

pub use engine::{aggregate_group_metrics, GroupAggregator};
pub use summary::{flatten_by_group_all_class, verify_group_totals, GroupSummary};
