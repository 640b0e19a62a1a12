use std::collections::BTreeMap;

use anyhow::{bail, Result};
use openmpa::geojson::{read_from_json_file, read_metrics_json, read_reference_features_from_geojson_file, read_sketch_from_geojson_file, write_metrics_json};
use openmpa::{
    class_overlap_report, to_percent_metrics, verify_group_totals, MetricGroup, OverlapOperation,
    PointCountOverlap, PolygonAreaOverlap, ReferenceFeatures,
};
use tracing::info;

use crate::cli::{Cli, GroupsArgs, Measure};

pub fn run(cli: &Cli, args: &GroupsArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let metric_group: MetricGroup = read_from_json_file(&args.metric_group)?;
    let sketch = read_sketch_from_geojson_file(&args.sketch)?;

    let mut features_by_class: BTreeMap<String, ReferenceFeatures> = BTreeMap::new();
    for (class_id, path) in &args.features {
        info!(class = %class_id, path = %path.display(), "loading reference features");
        if features_by_class.insert(class_id.clone(), read_reference_features_from_geojson_file(path)?).is_some() {
            bail!("Reference features given twice for class '{class_id}'");
        }
    }

    let operation: &dyn OverlapOperation = match args.measure {
        Measure::Area => &PolygonAreaOverlap,
        Measure::Count => &PointCountOverlap,
    };

    info!(sketch = sketch.id(), metric = %metric_group.metric_id, "computing class overlap");
    let mut metrics = class_overlap_report(&config, &metric_group, &sketch, &features_by_class, operation)?;

    if let Some(path) = &args.totals {
        let totals = read_metrics_json(path)?;
        if sketch.is_collection() {
            verify_group_totals(sketch.id(), &metrics, &totals)?;
        }
        let percent_id = format!("{}Perc", metric_group.metric_id);
        let percents = to_percent_metrics(&metrics, &totals, Some(&percent_id))?;
        metrics.extend(percents);
    }

    write_metrics_json(args.output.as_deref(), &metrics)
}
