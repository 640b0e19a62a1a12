use anyhow::Result;
use openmpa::geojson::{read_respondent_shapes_from_geojson_file, read_sketch_from_geojson_file, write_metrics_json};
use openmpa::survey::{derive_shard_ranges, run_sharded, RespondentShape, SurveyOptions};
use tracing::info;

use crate::cli::{Cli, OusArgs};

pub fn run(cli: &Cli, args: &OusArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let shapes = read_respondent_shapes_from_geojson_file(&args.shapes)?;
    let sketch = read_sketch_from_geojson_file(&args.sketch)?;

    let ranges = match &config.shard_ranges {
        Some(ranges) => ranges.clone(),
        None => derive_shard_ranges(shapes.iter().filter_map(RespondentShape::resp_id), config.shard_count),
    };
    info!(shapes = shapes.len(), shards = ranges.len(), sketch = sketch.id(), "computing survey overlap");

    let merged = run_sharded(&shapes, &ranges, Some(&sketch), &SurveyOptions::from_config(&config))?;
    info!(respondents = merged.stats.respondents, people = merged.stats.people, "survey overlap done");

    write_metrics_json(args.output.as_deref(), &merged.metrics)
}
