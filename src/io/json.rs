use std::{fs::File, io::{BufReader, BufWriter, Write}, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::metric::Metric;

/// The document exchanged with the report renderer.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MetricsDocument {
    metrics: Vec<Metric>,
}

/// Write metrics as `{"metrics": [...]}`.
pub fn write_metrics_to_json_bytes(metrics: &[Metric]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(&serde_json::json!({ "metrics": metrics }))
        .context("Failed to serialize metrics to JSON")
}

/// Read metrics from a `{"metrics": [...]}` document.
pub fn read_metrics_from_json_bytes(bytes: &[u8]) -> Result<Vec<Metric>> {
    let document: MetricsDocument = serde_json::from_slice(bytes).context("Failed to parse metrics JSON")?;
    Ok(document.metrics)
}

/// Read metrics from a `{"metrics": [...]}` file.
pub fn read_metrics_json(path: &Path) -> Result<Vec<Metric>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read metrics file: {}", path.display()))?;
    read_metrics_from_json_bytes(&bytes)
        .with_context(|| format!("Failed to parse metrics file: {}", path.display()))
}

/// Write metrics to `path`, or to stdout when no path is given.
pub fn write_metrics_json(path: Option<&Path>, metrics: &[Metric]) -> Result<()> {
    let bytes = write_metrics_to_json_bytes(metrics)?;
    match path {
        Some(path) => write_json_file(path, &bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}

/// Serialize any value to a pretty JSON file at `path`.
pub fn write_to_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("Failed to serialize JSON")?;
    write_json_file(path, &bytes)
}

/// Deserialize a JSON file at `path`.
pub fn read_from_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}

fn write_json_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
