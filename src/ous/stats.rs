use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::ous::{PEOPLE_COUNT, PEOPLE_COUNT_ALL, RESPONDENT_COUNT, RESPONDENT_COUNT_ALL};

/// Respondent and people counts for one class (or overall).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CountStats {
    pub respondents: u64,
    pub people: f64,
}

impl CountStats {
    fn add(&mut self, other: &CountStats) {
        self.respondents += other.respondents;
        self.people += other.people;
    }
}

/// Counts keyed by class (sector, community or gear).
pub type ClassCountStats = BTreeMap<String, CountStats>;

/// Survey statistics for one shard, or for the merged survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OusStats {
    pub respondents: u64,
    pub people: f64,
    pub by_sector: ClassCountStats,
    pub by_community: ClassCountStats,
    pub by_gear: ClassCountStats,
}

impl OusStats {
    /// Credit one respondent to a class.
    pub(super) fn credit(breakdown: &mut ClassCountStats, class_id: &str, people: f64) {
        breakdown.entry(class_id.to_string())
            .or_default()
            .add(&CountStats { respondents: 1, people });
    }

    /// Add another shard's counts into this one, key by key.
    pub fn merge(&mut self, other: &OusStats) {
        fn merge_classes(into: &mut ClassCountStats, from: &ClassCountStats) {
            for (class_id, counts) in from {
                into.entry(class_id.clone()).or_default().add(counts);
            }
        }

        self.respondents += other.respondents;
        self.people += other.people;
        merge_classes(&mut self.by_sector, &other.by_sector);
        merge_classes(&mut self.by_community, &other.by_community);
        merge_classes(&mut self.by_gear, &other.by_gear);
    }

    /// Metrics for these stats: the two overall metrics, then a people and a
    /// respondent metric per class for sectors, communities and gears.
    pub fn to_metrics(&self, sketch_id: Option<&str>) -> Vec<Metric> {
        let overall = [
            Metric::new(PEOPLE_COUNT, self.people).with_class(PEOPLE_COUNT_ALL),
            Metric::new(RESPONDENT_COUNT, self.respondents as f64).with_class(RESPONDENT_COUNT_ALL),
        ];

        let classes = [&self.by_sector, &self.by_community, &self.by_gear].into_iter()
            .flat_map(|breakdown| breakdown.iter())
            .flat_map(|(class_id, counts)| [
                Metric::new(PEOPLE_COUNT, counts.people).with_class(class_id.as_str()),
                Metric::new(RESPONDENT_COUNT, counts.respondents as f64).with_class(class_id.as_str()),
            ]);

        overall.into_iter()
            .chain(classes)
            .map(|metric| metric.with_sketch_opt(sketch_id))
            .collect()
    }
}

/// The output of one shard worker: its stats and the derived metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardResult {
    pub stats: OusStats,
    pub metrics: Vec<Metric>,
}

impl ShardResult {
    pub fn from_stats(stats: OusStats, sketch_id: Option<&str>) -> Self {
        let metrics = stats.to_metrics(sketch_id);
        Self { stats, metrics }
    }
}
