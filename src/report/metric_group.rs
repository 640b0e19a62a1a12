use serde::{Deserialize, Serialize};

/// One class of a metric group, with the label shown by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataClass {
    pub class_id: String,
    #[serde(default)]
    pub display: String,
}

impl DataClass {
    pub fn new(class_id: impl Into<String>, display: impl Into<String>) -> Self {
        Self { class_id: class_id.into(), display: display.into() }
    }
}

/// A metric id and the classes reported under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricGroup {
    pub metric_id: String,
    pub classes: Vec<DataClass>,
}

impl MetricGroup {
    pub fn new(metric_id: impl Into<String>, classes: Vec<DataClass>) -> Self {
        Self { metric_id: metric_id.into(), classes }
    }

    #[inline] pub fn class_ids(&self) -> impl Iterator<Item = &str> { self.classes.iter().map(|c| c.class_id.as_str()) }
}
