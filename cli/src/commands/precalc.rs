use anyhow::Result;
use openmpa::geojson::{read_respondent_shapes_from_geojson_file, write_metrics_json, write_to_json_file};
use openmpa::survey::{ous_metric_groups, precalc_totals};
use tracing::info;

use crate::cli::{Cli, PrecalcArgs};

pub fn run(cli: &Cli, args: &PrecalcArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let shapes = read_respondent_shapes_from_geojson_file(&args.shapes)?;

    let totals = precalc_totals(&shapes, &config)?;
    info!(respondents = totals.stats.respondents, people = totals.stats.people, "survey totals");

    if let Some(path) = &args.classes {
        info!(path = %path.display(), "writing metric groups");
        write_to_json_file(path, &ous_metric_groups(&totals.stats))?;
    }

    write_metrics_json(args.output.as_deref(), &totals.metrics)
}
