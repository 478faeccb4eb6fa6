use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::FlowSeverityPolicy;
use crate::error::Result;
use crate::report::{Policy, RiskThresholds};

/// Top-level configuration from `.flowguard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External catalog file. The built-in AWS catalog is used when unset.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,
    #[serde(default)]
    pub flow_severity: FlowSeverityPolicy,
    /// Fail scans whose input contains operations missing from the catalog.
    #[serde(default)]
    pub strict: bool,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    ///
    /// A relative `catalog` path is resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;

        if let (Some(catalog), Some(dir)) = (&config.catalog, path.parent()) {
            if catalog.is_relative() {
                config.catalog = Some(dir.join(catalog));
            }
        }

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.thresholds.validate()
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# flow-guard configuration

# External catalog (TOML or JSON). Omit to use the built-in AWS catalog.
# catalog = "catalog.toml"

[scoring]
# How matched operation scores combine into a flow's severity
# (sum, max, coverage_weighted).
flow_severity = "sum"

# Fail when the input holds operations the catalog does not know.
strict = false

# Aggregate score needed for each risk level; below medium is low.
[scoring.thresholds]
critical = 150
high = 80
medium = 30

[policy]
# Minimum risk level to fail the scan (low, medium, high, critical).
fail_on = "high"

# Flow tiers to evaluate; empty evaluates all of them.
# tiers = ["critical", "high"]

# Flow names to suppress.
# ignore_flows = ["IAM Groups Escalation"]
"#
    }
}
