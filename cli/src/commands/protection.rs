use anyhow::Result;
use openmpa::geojson::{read_sketch_from_geojson_file, write_metrics_json};
use openmpa::{protection_counts, ProtectionClassifier};

use crate::cli::{Cli, ProtectionArgs};

pub fn run(cli: &Cli, args: &ProtectionArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let sketch = read_sketch_from_geojson_file(&args.sketch)?;

    let classifier = ProtectionClassifier::from_config(&config);
    let metrics = protection_counts(&args.metric_id, &sketch, &classifier, &config.lockout_sketch_class_id)?;

    write_metrics_json(args.output.as_deref(), &metrics)
}
