use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ous::ShardRange;

/// Group id for highly protected areas (ranked first).
pub const HIGH_PROTECTION: &str = "HIGH_PROTECTION";
/// Group id for moderately protected areas.
pub const MEDIUM_PROTECTION: &str = "MEDIUM_PROTECTION";
/// Pseudo-level counted for lockout sketches; never a group in the engine.
pub const NO_PROTECTION: &str = "NO_PROTECTION";

/// Deployment configuration for reports, read from a JSON file.
/// Every field falls back to the Belize deployment defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Group ids, highest precedence first.
    pub groups: Vec<String>,
    /// `designation` codes classified as high protection.
    pub high_designations: Vec<String>,
    /// `designation` codes classified as medium protection.
    pub medium_designations: Vec<String>,
    /// Sketch class id of lockout areas, which are reported without groups.
    pub lockout_sketch_class_id: String,
    /// Region prefixes stripped from normalized community names.
    pub community_regions: Vec<String>,
    /// Explicit respondent id ranges; derived from the data when absent.
    pub shard_ranges: Option<Vec<ShardRange>>,
    /// Number of shards to derive when no explicit ranges are given.
    pub shard_count: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            groups: strings(&[HIGH_PROTECTION, MEDIUM_PROTECTION]),
            high_designations: strings(&["Ia", "Ib", "II", "III", HIGH_PROTECTION]),
            medium_designations: strings(&["IV", "V", "VI", "OECM", "LMMA", MEDIUM_PROTECTION]),
            lockout_sketch_class_id: "1555".into(),
            community_regions: strings(&["belize_", "corozal_", "stann_creek_", "toledo_"]),
            shard_ranges: None,
            shard_count: 5,
        }
    }
}

impl ReportConfig {
    /// Read configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_rank_high_first() {
        let config = ReportConfig::default();
        assert_eq!(config.groups, vec![HIGH_PROTECTION, MEDIUM_PROTECTION]);
        assert_eq!(config.lockout_sketch_class_id, "1555");
        assert!(config.shard_ranges.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"shard_count": 3, "shard_ranges": [{{"start": 0, "end": 10}}]}}"#).unwrap();

        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shard_count, 3);
        assert_eq!(config.shard_ranges, Some(vec![ShardRange::new(0, 10)]));
        assert_eq!(config.groups.len(), 2);
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReportConfig::from_file(&dir.path().join("nope.json")).is_err());
    }
}
