use std::collections::BTreeMap;

use anyhow::Result;
use tracing::debug;

use crate::config::{ReportConfig, HIGH_PROTECTION, MEDIUM_PROTECTION};
use crate::error::ReportError;
use crate::sketch::{SketchInput, SketchProperties};

/// Assigns each individual sketch to exactly one protection level.
///
/// A `protection_level` attribute ("high"/"medium") wins; otherwise the
/// `designation` code is looked up, and anything unrecognized is medium.
#[derive(Debug, Clone)]
pub struct ProtectionClassifier {
    high_designations: Vec<String>,
    medium_designations: Vec<String>,
}

impl Default for ProtectionClassifier {
    fn default() -> Self { Self::from_config(&ReportConfig::default()) }
}

impl ProtectionClassifier {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            high_designations: config.high_designations.clone(),
            medium_designations: config.medium_designations.clone(),
        }
    }

    /// Protection level of a single sketch.
    pub fn classify(&self, properties: &SketchProperties) -> Result<&'static str> {
        if let Some(level) = properties.user_attribute("protection_level").filter(|s| !s.is_empty()) {
            return match level.as_str() {
                "high" => Ok(HIGH_PROTECTION),
                "medium" => Ok(MEDIUM_PROTECTION),
                _ => Err(ReportError::InvalidProtectionLevel { level, sketch: properties.id.clone() }.into()),
            };
        }

        let designation = properties.user_attribute("designation").unwrap_or_default();
        if self.high_designations.contains(&designation) {
            return Ok(HIGH_PROTECTION);
        }
        if !self.is_medium_designation(&designation) {
            debug!(sketch = %properties.id, designation = %designation, "unrecognized designation, treating as medium");
        }
        Ok(MEDIUM_PROTECTION)
    }

    /// True if the designation code is one of the known medium codes.
    pub fn is_medium_designation(&self, designation: &str) -> bool {
        self.medium_designations.iter().any(|d| d == designation)
    }

    /// Map of sketch id to protection level for every individual sketch.
    pub fn sketch_levels(&self, sketch: &SketchInput) -> Result<BTreeMap<String, String>> {
        sketch.sketches().iter()
            .map(|child| -> Result<(String, String)> { Ok((child.id().to_string(), self.classify(&child.properties)?.to_string())) })
            .collect()
    }
}
