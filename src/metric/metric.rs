use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tagged measurement exchanged with the report renderer.
///
/// A metric without a `group_id` is a total (denominator) metric.
/// Field names serialize as `metricId`, `classId`, `groupId`, `sketchId`,
/// `value` and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub metric_id: String,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub sketch_id: Option<String>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Identity of a metric for merging partial results: metric, class and sketch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub metric_id: String,
    pub class_id: Option<String>,
    pub sketch_id: Option<String>,
}

impl Metric {
    /// Create an untagged metric with the given id and value.
    pub fn new(metric_id: impl Into<String>, value: f64) -> Self {
        Self {
            metric_id: metric_id.into(),
            class_id: None,
            group_id: None,
            sketch_id: None,
            value,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_class(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_sketch(mut self, sketch_id: impl Into<String>) -> Self {
        self.sketch_id = Some(sketch_id.into());
        self
    }

    /// Set the sketch id only when one is given.
    pub fn with_sketch_opt(mut self, sketch_id: Option<&str>) -> Self {
        self.sketch_id = sketch_id.map(str::to_string);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[inline] pub fn class_id(&self) -> Option<&str> { self.class_id.as_deref() }

    #[inline] pub fn group_id(&self) -> Option<&str> { self.group_id.as_deref() }

    #[inline] pub fn sketch_id(&self) -> Option<&str> { self.sketch_id.as_deref() }

    /// True if this metric is a total (no group assigned).
    #[inline] pub fn is_total(&self) -> bool { self.group_id.is_none() }

    /// Merge key of this metric.
    pub fn key(&self) -> MetricKey {
        MetricKey {
            metric_id: self.metric_id.clone(),
            class_id: self.class_id.clone(),
            sketch_id: self.sketch_id.clone(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metric({}", self.metric_id)?;
        if let Some(class_id) = &self.class_id { write!(f, ", class='{class_id}'")?; }
        if let Some(group_id) = &self.group_id { write!(f, ", group='{group_id}'")?; }
        if let Some(sketch_id) = &self.sketch_id { write!(f, ", sketch='{sketch_id}'")?; }
        write!(f, ", value={})", self.value)
    }
}
