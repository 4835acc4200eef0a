use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use prodkit_core::error::{ProdkitError, Result};
use prodkit_core::BuildMetadata;

use crate::reporter::ReporterConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProdkitConfig {
    pub version: u32,

    #[serde(default)]
    pub reporter: ReporterSection,

    /// Absent: metrics stay in process and are served at `/metrics`.
    #[serde(default)]
    pub statsd: Option<StatsdSection>,

    #[serde(default)]
    pub healthz: HealthzSection,
}

impl ProdkitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ProdkitError::UnsupportedVersion);
        }

        self.reporter.validate()?;
        if let Some(statsd) = &self.statsd {
            statsd.validate()?;
        }
        self.healthz.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterSection {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default)]
    pub default_tags: Vec<String>,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            default_tags: Vec::new(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl ReporterSection {
    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(ProdkitError::InvalidConfig(
                "reporter.period_ms must be greater than 0".into(),
            ));
        }
        if let Some(bad) = self.default_tags.iter().find(|t| t.trim().is_empty()) {
            return Err(ProdkitError::InvalidConfig(format!(
                "reporter.default_tags contains an empty tag: {bad:?}"
            )));
        }
        check_rate("reporter.sample_rate", self.sample_rate)
    }

    /// Reporter settings with the given build identity.
    pub fn to_reporter_config(&self, build: BuildMetadata) -> ReporterConfig {
        ReporterConfig {
            period: Duration::from_millis(self.period_ms),
            default_tags: self.default_tags.clone(),
            sample_rate: self.sample_rate,
            build,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsdSection {
    pub addr: String,
}

impl StatsdSection {
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(ProdkitError::InvalidConfig("statsd.addr must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthzSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_alive_on_start")]
    pub alive_on_start: bool,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for HealthzSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            alive_on_start: default_alive_on_start(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl HealthzSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        check_rate("healthz.sample_rate", self.sample_rate)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            ProdkitError::InvalidConfig("healthz.listen must be a valid SocketAddr".into())
        })
    }
}

fn check_rate(field: &str, rate: f64) -> Result<()> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(ProdkitError::InvalidConfig(format!("{field} must be in (0, 1]")))
    }
}

fn default_period_ms() -> u64 {
    5000
}
fn default_sample_rate() -> f64 {
    1.0
}
fn default_listen() -> String {
    "0.0.0.0:8081".into()
}
fn default_alive_on_start() -> bool {
    true
}
