use std::path::PathBuf;

/// Marine protected area report CLI
#[derive(clap::Parser, Debug)]
#[command(name = "openmpa", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Report configuration (JSON), defaults to the built-in deployment settings
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Class overlap metrics with protection group totals for a sketch
    Groups(GroupsArgs),

    /// Demographic survey overlap for a sketch
    Ous(OusArgs),

    /// Survey-wide demographic totals and class lists
    Precalc(PrecalcArgs),

    /// Count sketches per protection level
    Protection(ProtectionArgs),
}

/// How overlap with reference features is measured.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum Measure {
    /// Covered area of reference polygons
    #[default]
    Area,
    /// Number of reference points inside
    Count,
}

#[derive(clap::Args, Debug)]
pub struct GroupsArgs {
    /// Sketch or sketch collection (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub sketch: PathBuf,

    /// Metric group with the classes to report (JSON)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub metric_group: PathBuf,

    /// Reference features for a class, as CLASS=PATH (repeatable)
    #[arg(short, long = "features", value_parser = parse_class_path, required = true)]
    pub features: Vec<(String, PathBuf)>,

    /// Overlap measure
    #[arg(long, value_enum, default_value_t)]
    pub measure: Measure,

    /// Class totals (metrics JSON); adds percent metrics and checks group totals
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub totals: Option<PathBuf>,

    /// Output metrics file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct OusArgs {
    /// Survey shapes (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub shapes: PathBuf,

    /// Sketch or sketch collection to filter shapes by (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub sketch: PathBuf,

    /// Output metrics file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct PrecalcArgs {
    /// Survey shapes (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub shapes: PathBuf,

    /// Output metrics file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Write the derived metric groups (class lists) to this file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub classes: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ProtectionArgs {
    /// Sketch or sketch collection (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub sketch: PathBuf,

    /// Metric id of the count metrics
    #[arg(long, default_value = "protectionCount")]
    pub metric_id: String,

    /// Output metrics file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

fn parse_class_path(value: &str) -> Result<(String, PathBuf), String> {
    let (class_id, path) = value.split_once('=')
        .ok_or_else(|| format!("expected CLASS=PATH, got '{value}'"))?;
    if class_id.is_empty() { return Err(format!("missing class id in '{value}'")) }
    Ok((class_id.to_string(), PathBuf::from(path)))
}
