use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::{Report, RiskLevel};
use crate::catalog::Priority;

/// Policy verdict — the final pass/fail decision after suppressing
/// ignored flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub aggregate_score: u64,
    pub risk_level: RiskLevel,
    pub fail_threshold: RiskLevel,
    pub ready_flows: usize,
    pub partial_flows: usize,
}

/// Policy configuration loaded from `.flowguard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum risk level that fails the scan.
    #[serde(default = "default_fail_on")]
    pub fail_on: RiskLevel,
    /// Flow tiers to evaluate. Empty means every tier.
    #[serde(default)]
    pub tiers: BTreeSet<Priority>,
    /// Flow names suppressed from reports.
    #[serde(default)]
    pub ignore_flows: HashSet<String>,
}

fn default_fail_on() -> RiskLevel {
    RiskLevel::High
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: RiskLevel::High,
            tiers: BTreeSet::new(),
            ignore_flows: HashSet::new(),
        }
    }
}

impl Policy {
    /// Evaluate a report against this policy and produce a verdict.
    pub fn evaluate(&self, report: &Report) -> PolicyVerdict {
        let effective: Vec<_> = report
            .flows
            .iter()
            .filter(|f| !self.ignore_flows.contains(&f.flow))
            .collect();

        PolicyVerdict {
            pass: report.risk_level < self.fail_on,
            aggregate_score: report.aggregate_score,
            risk_level: report.risk_level,
            fail_threshold: self.fail_on,
            ready_flows: effective.iter().filter(|f| f.full_match).count(),
            partial_flows: effective.iter().filter(|f| !f.full_match).count(),
        }
    }

    /// Drop ignored flows from the report.
    pub fn apply(&self, mut report: Report) -> Report {
        if self.ignore_flows.is_empty() {
            return report;
        }
        report
            .flows
            .retain(|f| !self.ignore_flows.contains(&f.flow));
        report.refresh_summary();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FlowMatch, FlowStatus, ScoringResult};
    use crate::report::ReportAssembler;

    fn make_report(aggregate: u64, flows: &[(&str, bool)]) -> Report {
        let matches = flows
            .iter()
            .map(|&(name, full)| FlowMatch {
                flow: name.into(),
                label: String::new(),
                priority: Priority::Critical,
                description: String::new(),
                capabilities: vec![],
                matched: vec!["a_op".into()],
                missing: vec![],
                coverage: 1.0,
                full_match: full,
                status: if full {
                    FlowStatus::Ready
                } else {
                    FlowStatus::Partial
                },
                severity: 10,
            })
            .collect();
        ReportAssembler::default().assemble(
            ScoringResult {
                operations: vec![],
                aggregate,
                unknown: vec![],
            },
            matches,
        )
    }

    #[test]
    fn default_policy_fails_on_high() {
        let verdict = Policy::default().evaluate(&make_report(80, &[]));
        assert!(!verdict.pass);
        assert_eq!(verdict.risk_level, RiskLevel::High);
    }

    #[test]
    fn default_policy_passes_on_medium() {
        let verdict = Policy::default().evaluate(&make_report(79, &[]));
        assert!(verdict.pass);
    }

    #[test]
    fn ignored_flow_removed_from_report() {
        let mut policy = Policy::default();
        policy.ignore_flows.insert("Log Deletion".into());
        let report = make_report(10, &[("Log Deletion", true), ("Forensic Cleanup", false)]);

        let verdict = policy.evaluate(&report);
        assert_eq!(verdict.ready_flows, 0);
        assert_eq!(verdict.partial_flows, 1);

        let report = policy.apply(report);
        assert_eq!(report.flows.len(), 1);
        assert_eq!(report.summary.ready_flows, 0);
    }

    #[test]
    fn fail_on_critical_tolerates_high() {
        let policy = Policy {
            fail_on: RiskLevel::Critical,
            ..Policy::default()
        };
        assert!(policy.evaluate(&make_report(149, &[])).pass);
        assert!(!policy.evaluate(&make_report(150, &[])).pass);
    }
}
