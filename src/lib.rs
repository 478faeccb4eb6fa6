//! flow-guard — risk scoring and attack-flow detection for AWS principals.
//!
//! Offline and catalog-driven. Given the operations a principal can invoke,
//! scores each capability, detects full and partial attack flows (log
//! deletion, infrastructure destruction, access blocking, ...) and buckets
//! the aggregate score into a risk level.
//!
//! # Quick Start
//!
//! ```no_run
//! use flowguard::catalog::Catalog;
//! use flowguard::config::Config;
//! use flowguard::principal::PrincipalOperationSet;
//! use flowguard::Scanner;
//!
//! let scanner = Scanner::new(Catalog::builtin().unwrap(), Config::default()).unwrap();
//! let principal: PrincipalOperationSet =
//!     ["cloudtrail_delete_trail", "cloudtrail_stop_logging"].into_iter().collect();
//! let scan = scanner.evaluate(&principal).unwrap();
//! println!("{} ({})", scan.report.aggregate_score, scan.report.risk_level);
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod principal;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog::{Catalog, Priority};
use config::Config;
use engine::{FlowMatch, FlowMatcher, ScoringEngine, ScoringResult};
use error::{GuardError, Result};
use output::OutputFormat;
use principal::PrincipalOperationSet;
use report::{PolicyVerdict, Report, ReportAssembler, RiskLevel};

/// Options for a scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.flowguard.toml` in the working directory).
    pub config_path: Option<PathBuf>,
    /// Catalog file overriding both the config and the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for fail_on threshold.
    pub fail_on_override: Option<RiskLevel>,
    /// CLI override for evaluated flow tiers.
    pub tiers: Vec<Priority>,
    /// Force strict mode regardless of config.
    pub strict: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            catalog_path: None,
            format: OutputFormat::Console,
            fail_on_override: None,
            tiers: Vec::new(),
            strict: false,
        }
    }
}

/// Complete scan report for one principal.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub principal: Option<String>,
    pub report: Report,
    pub verdict: PolicyVerdict,
}

/// Scores principals against a loaded catalog.
///
/// Holds the catalog behind an `Arc`; clones are cheap and `Scanner` is
/// `Send + Sync`, so one instance can serve many threads.
#[derive(Debug, Clone)]
pub struct Scanner {
    catalog: Arc<Catalog>,
    config: Config,
}

impl Scanner {
    pub fn new(catalog: Catalog, config: Config) -> Result<Self> {
        Self::with_shared_catalog(Arc::new(catalog), config)
    }

    pub fn with_shared_catalog(catalog: Arc<Catalog>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    /// Load config and catalog as described by `options`.
    pub fn from_options(options: &ScanOptions) -> Result<Self> {
        let config_path = options
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".flowguard.toml"));
        let mut config = Config::load(&config_path)?;

        if let Some(fail_on) = options.fail_on_override {
            config.policy.fail_on = fail_on;
        }
        if !options.tiers.is_empty() {
            config.policy.tiers = options.tiers.iter().copied().collect();
        }
        if options.strict {
            config.scoring.strict = true;
        }

        let catalog = match options.catalog_path.as_ref().or(config.catalog.as_ref()) {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading catalog");
                Catalog::load(path)?
            }
            None => Catalog::builtin()?,
        };

        Self::new(catalog, config)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn score(&self, principal: &PrincipalOperationSet) -> ScoringResult {
        ScoringEngine::new(self.catalog.operations()).score(principal)
    }

    pub fn match_flows(&self, principal: &PrincipalOperationSet) -> Vec<FlowMatch> {
        FlowMatcher::new(self.catalog.flows(), self.catalog.operations())
            .with_policy(self.config.scoring.flow_severity)
            .with_tiers(self.config.policy.tiers.iter().copied())
            .match_all(principal)
    }

    /// Score, match, assemble and evaluate policy for one principal.
    pub fn evaluate(&self, principal: &PrincipalOperationSet) -> Result<ScanReport> {
        let scoring = self.score(principal);
        if self.config.scoring.strict && !scoring.unknown.is_empty() {
            return Err(GuardError::UnknownOperations(scoring.unknown));
        }

        let matches = self.match_flows(principal);
        let report = ReportAssembler::new(self.config.scoring.thresholds).assemble(scoring, matches);
        let verdict = self.config.policy.evaluate(&report);
        let report = self.config.policy.apply(report);

        tracing::info!(
            principal = principal.principal.as_deref().unwrap_or("-"),
            score = report.aggregate_score,
            risk = %report.risk_level,
            ready = report.summary.ready_flows,
            partial = report.summary.partial_flows,
            "principal evaluated"
        );

        Ok(ScanReport {
            principal: principal.principal.clone(),
            report,
            verdict,
        })
    }
}

/// Run a complete scan: load config, catalog and input, then evaluate.
pub fn scan(input: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let scanner = Scanner::from_options(options)?;
    let principal = PrincipalOperationSet::load(input)?;
    scanner.evaluate(&principal)
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
