pub mod groups;
pub mod ous;
pub mod precalc;
pub mod protection;

use anyhow::Result;
use openmpa::ReportConfig;

use crate::cli::Cli;

/// The configuration named on the command line, or the defaults.
pub(crate) fn load_config(cli: &Cli) -> Result<ReportConfig> {
    match &cli.config {
        Some(path) => ReportConfig::from_file(path),
        None => Ok(ReportConfig::default()),
    }
}
