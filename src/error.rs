use thiserror::Error;

/// Failures raised by the group engine and the survey aggregator.
///
/// Configuration errors and geometry failures abort the computation. Malformed
/// survey records never surface here; they are logged and skipped.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The classifier returned a group that is not in the ranked group list.
    #[error("unknown group '{group}' for sketch {sketch}")]
    UnknownGroup { group: String, sketch: String },

    /// A class declared by a metric group has no reference features.
    #[error("no reference features loaded for class '{0}'")]
    MissingFeatures(String),

    /// A sketch carries a `protection_level` value other than high/medium.
    #[error("invalid protection level '{level}' on sketch {sketch}")]
    InvalidProtectionLevel { level: String, sketch: String },

    /// A percent metric was requested for a class with no total metric.
    #[error("no total metric for metric '{metric_id}' class '{class_id}'")]
    MissingDenominator { metric_id: String, class_id: String },

    /// Input geometry is corrupt (non-finite coordinates).
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Shard ranges do not exactly cover the respondent ids.
    #[error("shard ranges do not partition respondent ids: {0}")]
    ShardPartition(String),

    /// Merged respondent count disagrees with an independent distinct count.
    #[error("merged respondents {merged} != distinct respondents {distinct}")]
    RespondentMismatch { merged: u64, distinct: u64 },

    /// A group total for a class exceeds the total for that class.
    #[error("group totals for class '{class_id}' sum to {sum}, exceeding total {total}")]
    TotalExceeded { class_id: String, sum: f64, total: f64 },
}
