//! Report assembly: merges scoring and flow matching into one finding set
//! and buckets the aggregate score into a risk level.

pub mod policy;

use serde::{Deserialize, Serialize};

use crate::engine::{FlowMatch, FlowStatus, ScoredOperation, ScoringResult};
use crate::error::{GuardError, Result};

pub use policy::{Policy, PolicyVerdict};

/// Risk bucket of a principal's aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Minimum aggregate score for each risk level above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 150,
            high: 80,
            medium: 30,
        }
    }
}

impl RiskThresholds {
    /// Thresholds must be strictly descending from critical to medium.
    pub fn validate(&self) -> Result<()> {
        if self.critical > self.high && self.high > self.medium {
            Ok(())
        } else {
            Err(GuardError::config(
                "scoring.thresholds",
                format!(
                    "expected critical > high > medium, got {} / {} / {}",
                    self.critical, self.high, self.medium
                ),
            ))
        }
    }

    pub fn classify(&self, score: u64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub operations_held: usize,
    pub unknown_operations: usize,
    pub ready_flows: usize,
    pub partial_flows: usize,
    pub highest_flow_severity: Option<u64>,
}

impl ReportSummary {
    fn from_parts(operations: &[ScoredOperation], unknown: &[String], flows: &[FlowMatch]) -> Self {
        Self {
            operations_held: operations.len(),
            unknown_operations: unknown.len(),
            ready_flows: flows.iter().filter(|f| f.status == FlowStatus::Ready).count(),
            partial_flows: flows.iter().filter(|f| f.status == FlowStatus::Partial).count(),
            highest_flow_severity: flows.iter().map(|f| f.severity).max(),
        }
    }
}

/// Structured result for one principal. Rendering is left to `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub aggregate_score: u64,
    pub risk_level: RiskLevel,
    pub operations: Vec<ScoredOperation>,
    pub flows: Vec<FlowMatch>,
    pub unknown_operations: Vec<String>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn ready_flows(&self) -> impl Iterator<Item = &FlowMatch> {
        self.flows.iter().filter(|f| f.full_match)
    }

    pub fn partial_flows(&self) -> impl Iterator<Item = &FlowMatch> {
        self.flows.iter().filter(|f| !f.full_match)
    }

    pub(crate) fn refresh_summary(&mut self) {
        self.summary =
            ReportSummary::from_parts(&self.operations, &self.unknown_operations, &self.flows);
    }
}

/// Combines scoring and matching results into a `Report`.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    thresholds: RiskThresholds,
}

impl ReportAssembler {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn assemble(&self, scoring: ScoringResult, matches: Vec<FlowMatch>) -> Report {
        let summary = ReportSummary::from_parts(&scoring.operations, &scoring.unknown, &matches);
        Report {
            aggregate_score: scoring.aggregate,
            risk_level: self.thresholds.classify(scoring.aggregate),
            operations: scoring.operations,
            flows: matches,
            unknown_operations: scoring.unknown,
            summary,
        }
    }
}
