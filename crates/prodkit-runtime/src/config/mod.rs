//! Runtime config loader (strict parsing).

pub mod schema;

use std::fs;

use prodkit_core::error::{ProdkitError, Result};

pub use schema::{HealthzSection, ProdkitConfig, ReporterSection, StatsdSection};

/// Used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "prodkit.yaml";

pub fn load_from_file(path: &str) -> Result<ProdkitConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ProdkitError::Io(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ProdkitConfig> {
    let cfg: ProdkitConfig = serde_yaml::from_str(s)
        .map_err(|e| ProdkitError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
