use std::collections::BTreeMap;

use anyhow::Result;
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::debug;

use crate::error::ReportError;
use crate::geom::{OverlapOperation, ReferenceFeatures};
use crate::group::reduce::reduced_group_overlap;
use crate::metric::Metric;
use crate::sketch::SketchInput;

/// Computes rank-aware group totals for one metric over a sketch or collection.
///
/// Groups are ranked by their position in `groups` (first = highest). When
/// sketches of different groups overlap, the higher-ranked group keeps the
/// shared territory; sketches within one group are never counted twice.
#[derive(Debug, Clone)]
pub struct GroupAggregator<'a> {
    metric_id: &'a str,
    groups: &'a [String],
    features_by_class: &'a BTreeMap<String, ReferenceFeatures>,
    classes: Option<Vec<&'a str>>,
    only_present_groups: bool,
}

/// A sketch metric with its group rank resolved.
struct Grouped {
    metric: Metric,
    rank: usize,
}

impl<'a> GroupAggregator<'a> {
    pub fn new(
        metric_id: &'a str,
        groups: &'a [String],
        features_by_class: &'a BTreeMap<String, ReferenceFeatures>,
    ) -> Self {
        Self { metric_id, groups, features_by_class, classes: None, only_present_groups: false }
    }

    /// Restrict group totals to these classes instead of every class in `features_by_class`.
    pub fn only_classes(mut self, classes: impl IntoIterator<Item = &'a str>) -> Self {
        self.classes = Some(classes.into_iter().collect());
        self
    }

    /// Only emit group totals for groups with at least one member sketch in the class.
    pub fn only_present_groups(mut self, only_present: bool) -> Self {
        self.only_present_groups = only_present;
        self
    }

    /// Annotate the per-sketch metrics with their group and append one group
    /// total per (group, class).
    ///
    /// For a collection, group totals carry the collection's id. For a single
    /// sketch, the annotated sketch metric is its own group's total and every
    /// other group gets an explicit zero.
    pub fn aggregate<C>(
        &self,
        sketch: &SketchInput,
        metrics: &[Metric],
        classify: C,
        operation: &dyn OverlapOperation,
    ) -> Result<Vec<Metric>>
    where
        C: Fn(&Metric) -> Option<String>,
    {
        let grouped = self.group_sketch_metrics(sketch, metrics, classify)?;

        // Group membership by sketch, independent of class.
        let membership: BTreeMap<&str, usize> = grouped.iter()
            .filter_map(|g| g.metric.sketch_id().map(|id| (id, g.rank)))
            .collect();

        let tasks: Vec<(usize, &String, &ReferenceFeatures)> = (0..self.groups.len())
            .flat_map(|rank| self.features_by_class.iter().map(move |(class, features)| (rank, class, features)))
            .filter(|(_, class, _)| self.classes.as_ref().is_none_or(|classes| classes.contains(&class.as_str())))
            .collect();

        let totals = tasks.par_iter()
            .map(|&(rank, class_id, features)| {
                self.group_class_total(sketch, &grouped, &membership, rank, class_id, features, operation)
            })
            .collect::<Result<Vec<Option<Metric>>>>()?;

        Ok(grouped.into_iter()
            .map(|g| g.metric)
            .chain(totals.into_iter().flatten())
            .collect())
    }

    /// Filter to individual sketch metrics for this metric id and tag them with a group.
    fn group_sketch_metrics<C>(&self, sketch: &SketchInput, metrics: &[Metric], classify: C) -> Result<Vec<Grouped>>
    where
        C: Fn(&Metric) -> Option<String>,
    {
        metrics.iter()
            .filter(|m| m.metric_id == self.metric_id)
            .filter(|m| match (sketch.is_collection(), m.sketch_id()) {
                (true, Some(id)) => id != sketch.id(),
                (false, Some(id)) => id == sketch.id(),
                (_, None) => false,
            })
            .map(|m| -> Result<Grouped> {
                let group = classify(m);
                let rank = group.as_deref()
                    .and_then(|group| self.groups.iter().position(|g| g == group))
                    .ok_or_else(|| ReportError::UnknownGroup {
                        group: group.clone().unwrap_or_else(|| "<none>".into()),
                        sketch: m.sketch_id().unwrap_or_default().to_string(),
                    })?;
                let metric = m.clone().with_group(self.groups[rank].as_str());
                Ok(Grouped { metric, rank })
            })
            .collect()
    }

    /// Total for one (group, class) pair, or `None` when nothing should be emitted.
    #[allow(clippy::too_many_arguments)]
    fn group_class_total(
        &self,
        sketch: &SketchInput,
        grouped: &[Grouped],
        membership: &BTreeMap<&str, usize>,
        rank: usize,
        class_id: &str,
        features: &ReferenceFeatures,
        operation: &dyn OverlapOperation,
    ) -> Result<Option<Metric>> {
        let group_id = self.groups[rank].as_str();
        let class_metrics: Vec<&Metric> = grouped.iter()
            .filter(|g| g.rank == rank && g.metric.class_id() == Some(class_id))
            .map(|g| &g.metric)
            .collect();

        if self.only_present_groups && class_metrics.is_empty() { return Ok(None) }

        let total = Metric::new(self.metric_id, 0.0)
            .with_class(class_id)
            .with_group(group_id)
            .with_sketch(sketch.id())
            .with_extra("sketchName", sketch.name());

        if !sketch.is_collection() {
            // The annotated sketch metric already is this group's total.
            return Ok(class_metrics.is_empty().then_some(total));
        }

        let current: Vec<&str> = membership.iter()
            .filter(|&(_, &r)| r == rank)
            .map(|(&id, _)| id)
            .collect();
        let higher: Vec<&str> = membership.iter()
            .filter(|&(_, &r)| r < rank)
            .map(|(&id, _)| id)
            .collect();

        let value = match (current.as_slice(), higher.is_empty()) {
            ([], _) => 0.0,
            ([only], true) => match class_metrics.iter().find(|m| m.sketch_id() == Some(*only)) {
                Some(metric) => metric.value,
                None => self.reduce(sketch, &current, &higher, features, operation)?,
            },
            _ => self.reduce(sketch, &current, &higher, features, operation)?,
        };

        debug!(metric = self.metric_id, group = group_id, class = class_id, value, "group total");
        Ok(Some(Metric { value, ..total }.with_extra("isCollection", true)))
    }

    fn reduce(
        &self,
        sketch: &SketchInput,
        current: &[&str],
        higher: &[&str],
        features: &ReferenceFeatures,
        operation: &dyn OverlapOperation,
    ) -> Result<f64> {
        let geometries = |ids: &[&str]| -> Vec<&MultiPolygon<f64>> {
            ids.iter().filter_map(|id| sketch.sketch(id)).map(|s| &s.geometry).collect()
        };
        reduced_group_overlap(self.metric_id, &geometries(current), &geometries(higher), features, operation)
    }
}

/// Group metrics for one metric id; see [`GroupAggregator::aggregate`].
///
/// `classify` maps a per-sketch metric to its group id. A group id outside
/// `groups` is a configuration error.
pub fn aggregate_group_metrics<C>(
    metric_id: &str,
    groups: &[String],
    sketch: &SketchInput,
    classify: C,
    metrics: &[Metric],
    features_by_class: &BTreeMap<String, ReferenceFeatures>,
    operation: &dyn OverlapOperation,
) -> Result<Vec<Metric>>
where
    C: Fn(&Metric) -> Option<String>,
{
    GroupAggregator::new(metric_id, groups, features_by_class)
        .aggregate(sketch, metrics, classify, operation)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::config::{HIGH_PROTECTION, MEDIUM_PROTECTION};
    use crate::geom::{Geometries, PolygonAreaOverlap};
    use crate::sketch::{Sketch, SketchCollection, SketchProperties};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
    }

    fn groups() -> Vec<String> {
        vec![HIGH_PROTECTION.to_string(), MEDIUM_PROTECTION.to_string()]
    }

    fn coral() -> BTreeMap<String, ReferenceFeatures> {
        BTreeMap::from([(
            "coral".to_string(),
            ReferenceFeatures::Polygons(Geometries::new(vec![rect(-50.0, -50.0, 50.0, 50.0)])),
        )])
    }

    fn collection(sketches: Vec<(&str, MultiPolygon<f64>)>) -> SketchInput {
        SketchInput::from(SketchCollection {
            properties: SketchProperties::new("coll", "Network"),
            sketches: sketches.into_iter()
                .map(|(id, geom)| Sketch::new(SketchProperties::new(id, id), geom))
                .collect(),
        })
    }

    fn sketch_metric(sketch: &str, value: f64) -> Metric {
        Metric::new("area", value).with_class("coral").with_sketch(sketch)
    }

    fn group_total<'m>(metrics: &'m [Metric], group: &str) -> &'m Metric {
        metrics.iter()
            .find(|m| m.group_id() == Some(group) && m.sketch_id() == Some("coll"))
            .unwrap()
    }

    /// Counts overlap calls and delegates to the area operation.
    struct Counting(AtomicUsize);

    impl OverlapOperation for Counting {
        fn overlap(&self, metric_id: &str, features: &ReferenceFeatures, sketches: &[MultiPolygon<f64>]) -> Result<f64> {
            self.0.fetch_add(1, Ordering::SeqCst);
            PolygonAreaOverlap.overlap(metric_id, features, sketches)
        }
    }

    #[test]
    fn annotates_sketch_metrics_with_group() {
        let input = collection(vec![("a", rect(0.0, 0.0, 1.0, 1.0)), ("b", rect(5.0, 5.0, 6.0, 6.0))]);
        let metrics = vec![sketch_metric("a", 1.0), sketch_metric("b", 1.0), sketch_metric("coll", 2.0)];
        let classify = |m: &Metric| Some((if m.sketch_id() == Some("a") { HIGH_PROTECTION } else { MEDIUM_PROTECTION }).to_string());

        let out = aggregate_group_metrics("area", &groups(), &input, classify, &metrics, &coral(), &PolygonAreaOverlap).unwrap();
        let a = out.iter().find(|m| m.sketch_id() == Some("a")).unwrap();
        assert_eq!(a.group_id(), Some(HIGH_PROTECTION));
        // Collection-level input metric is not a group member.
        assert!(out.iter().all(|m| !(m.sketch_id() == Some("coll") && m.group_id().is_none())));
        assert_eq!(out.len(), 2 + 2);
    }

    #[test]
    fn empty_group_yields_zero_total() {
        let input = collection(vec![("a", rect(0.0, 0.0, 2.0, 2.0))]);
        let metrics = vec![sketch_metric("a", 4.0)];
        let out = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some(HIGH_PROTECTION.to_string()), &metrics, &coral(), &PolygonAreaOverlap,
        ).unwrap();
        assert_eq!(group_total(&out, MEDIUM_PROTECTION).value, 0.0);
        assert_eq!(group_total(&out, HIGH_PROTECTION).value, 4.0);
    }

    #[test]
    fn single_member_uses_raw_value_without_overlap_call() {
        let input = collection(vec![("a", rect(0.0, 0.0, 2.0, 5.0))]);
        let metrics = vec![sketch_metric("a", 10.0)];
        let counting = Counting(AtomicUsize::new(0));
        let out = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some(HIGH_PROTECTION.to_string()), &metrics, &coral(), &counting,
        ).unwrap();
        assert_eq!(group_total(&out, HIGH_PROTECTION).value, 10.0);
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shortcut_agrees_with_reduction() {
        let geom = rect(0.0, 0.0, 2.0, 5.0);
        let input = collection(vec![("a", geom.clone())]);
        let raw = PolygonAreaOverlap.overlap("area", &coral()["coral"], &[geom.clone()]).unwrap();
        let reduced = reduced_group_overlap("area", &[&geom], &[], &coral()["coral"], &PolygonAreaOverlap).unwrap();
        let out = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some(HIGH_PROTECTION.to_string()),
            &[sketch_metric("a", raw)], &coral(), &PolygonAreaOverlap,
        ).unwrap();
        assert!((group_total(&out, HIGH_PROTECTION).value - reduced).abs() < 1e-9);
        assert!((reduced - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rank_precedence_removes_lower_group_overlap() {
        let input = collection(vec![("high", rect(0.0, 0.0, 2.0, 2.0)), ("medium", rect(1.0, 0.0, 3.0, 2.0))]);
        let metrics = vec![sketch_metric("high", 4.0), sketch_metric("medium", 4.0)];
        let classify = |m: &Metric| Some((if m.sketch_id() == Some("high") { HIGH_PROTECTION } else { MEDIUM_PROTECTION }).to_string());

        let out = aggregate_group_metrics("area", &groups(), &input, classify, &metrics, &coral(), &PolygonAreaOverlap).unwrap();
        assert!((group_total(&out, HIGH_PROTECTION).value - 4.0).abs() < 1e-9);
        assert!((group_total(&out, MEDIUM_PROTECTION).value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn single_sketch_gets_zero_for_other_groups() {
        let input = SketchInput::from(Sketch::new(SketchProperties::new("solo", "Solo"), rect(0.0, 0.0, 1.0, 1.0)));
        let metrics = vec![Metric::new("area", 1.0).with_class("coral").with_sketch("solo")];
        let out = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some(MEDIUM_PROTECTION.to_string()), &metrics, &coral(), &PolygonAreaOverlap,
        ).unwrap();

        assert_eq!(out.len(), 2);
        let own = out.iter().find(|m| m.group_id() == Some(MEDIUM_PROTECTION)).unwrap();
        assert_eq!(own.value, 1.0);
        let other = out.iter().find(|m| m.group_id() == Some(HIGH_PROTECTION)).unwrap();
        assert_eq!(other.value, 0.0);
        assert_eq!(other.sketch_id(), Some("solo"));
    }

    #[test]
    fn only_present_groups_skips_empty_groups() {
        let input = collection(vec![("a", rect(0.0, 0.0, 1.0, 1.0))]);
        let features = coral();
        let groups = groups();
        let out = GroupAggregator::new("area", &groups, &features)
            .only_present_groups(true)
            .aggregate(&input, &[sketch_metric("a", 1.0)], |_| Some(HIGH_PROTECTION.to_string()), &PolygonAreaOverlap)
            .unwrap();
        assert!(out.iter().all(|m| m.group_id() != Some(MEDIUM_PROTECTION)));
    }

    #[test]
    fn class_restriction_limits_totals() {
        let input = collection(vec![("a", rect(0.0, 0.0, 1.0, 1.0))]);
        let mut features = coral();
        features.insert("seagrass".to_string(), ReferenceFeatures::Polygons(Geometries::new(vec![rect(0.0, 0.0, 1.0, 1.0)])));
        let groups = groups();

        let out = GroupAggregator::new("area", &groups, &features)
            .only_classes(["seagrass"])
            .aggregate(&input, &[sketch_metric("a", 1.0)], |_| Some(HIGH_PROTECTION.to_string()), &PolygonAreaOverlap)
            .unwrap();
        let totals: Vec<_> = out.iter().filter(|m| m.sketch_id() == Some("coll")).collect();
        assert_eq!(totals.len(), 2);
        assert!(totals.iter().all(|m| m.class_id() == Some("seagrass")));
    }

    #[test]
    fn unknown_group_is_config_error() {
        let input = collection(vec![("a", rect(0.0, 0.0, 1.0, 1.0))]);
        let err = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some("LOW_PROTECTION".to_string()),
            &[sketch_metric("a", 1.0)], &coral(), &PolygonAreaOverlap,
        ).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::UnknownGroup { group, sketch }) if group == "LOW_PROTECTION" && sketch == "a"
        ));
    }

    #[test]
    fn overlap_failure_propagates() {
        let input = collection(vec![("a", rect(0.0, 0.0, 1.0, 1.0)), ("b", rect(0.5, 0.0, 1.5, 1.0))]);
        let failing = |_: &str, _: &ReferenceFeatures, _: &[MultiPolygon<f64>]| -> Result<f64> {
            anyhow::bail!("raster read failed")
        };
        let result = aggregate_group_metrics(
            "area", &groups(), &input, |_| Some(HIGH_PROTECTION.to_string()),
            &[sketch_metric("a", 1.0), sketch_metric("b", 1.0)], &coral(), &failing,
        );
        assert!(result.is_err());
    }
}
