use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Flow, FlowCatalog, OperationCatalog, Priority};
use crate::principal::PrincipalOperationSet;

/// How the scores of a flow's matched operations combine into its severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSeverityPolicy {
    /// Sum of matched operation scores.
    #[default]
    Sum,
    /// Highest matched operation score.
    Max,
    /// Sum scaled by coverage, rounded down.
    CoverageWeighted,
}

impl FlowSeverityPolicy {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sum" => Some(Self::Sum),
            "max" => Some(Self::Max),
            "coverage_weighted" | "weighted" => Some(Self::CoverageWeighted),
            _ => None,
        }
    }

    /// `matched` and `required` are operation counts. Coverage weighting is
    /// `sum * matched / required` in integers.
    fn severity(self, scores: &[u32], matched: usize, required: usize) -> u64 {
        let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
        match self {
            Self::Sum => sum,
            Self::Max => scores.iter().copied().max().map(u64::from).unwrap_or(0),
            Self::CoverageWeighted if required == 0 => 0,
            Self::CoverageWeighted => sum * matched as u64 / required as u64,
        }
    }
}

impl std::fmt::Display for FlowSeverityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Max => write!(f, "max"),
            Self::CoverageWeighted => write!(f, "coverage_weighted"),
        }
    }
}

/// Whether the principal can execute the flow now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStatus {
    /// Every required operation is held.
    Ready,
    /// Some, but not all, required operations are held.
    Partial,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Evaluation of one flow against a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMatch {
    pub flow: String,
    pub label: String,
    pub priority: Priority,
    pub description: String,
    pub capabilities: Vec<String>,
    /// Required operations the principal holds, sorted.
    pub matched: Vec<String>,
    /// Required operations the principal lacks, sorted.
    pub missing: Vec<String>,
    /// `matched / required`, in (0.0, 1.0].
    pub coverage: f64,
    pub full_match: bool,
    pub status: FlowStatus,
    pub severity: u64,
}

/// Evaluates every catalog flow against a principal's operations.
pub struct FlowMatcher<'a> {
    flows: &'a FlowCatalog,
    operations: &'a OperationCatalog,
    policy: FlowSeverityPolicy,
    tiers: BTreeSet<Priority>,
}

impl<'a> FlowMatcher<'a> {
    pub fn new(flows: &'a FlowCatalog, operations: &'a OperationCatalog) -> Self {
        Self {
            flows,
            operations,
            policy: FlowSeverityPolicy::default(),
            tiers: BTreeSet::new(),
        }
    }

    pub fn with_policy(mut self, policy: FlowSeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict evaluation to flows in these tiers. Empty means all tiers.
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = Priority>) -> Self {
        self.tiers = tiers.into_iter().collect();
        self
    }

    /// Match every flow, returning those with at least one held operation,
    /// ordered by descending severity then flow name.
    pub fn match_all(&self, principal: &PrincipalOperationSet) -> Vec<FlowMatch> {
        let candidates: Vec<&Flow> = self
            .flows
            .all()
            .iter()
            .filter(|flow| self.tiers.is_empty() || self.tiers.contains(&flow.priority))
            .collect();
        let mut matches: Vec<FlowMatch> = candidates
            .iter()
            .filter_map(|flow| self.evaluate(flow, principal))
            .collect();

        matches.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.flow.cmp(&b.flow))
        });

        tracing::debug!(
            evaluated = candidates.len(),
            matched = matches.len(),
            "flow matching complete"
        );
        matches
    }

    /// Evaluate one flow. `None` when the principal holds none of its operations.
    pub fn evaluate(&self, flow: &Flow, principal: &PrincipalOperationSet) -> Option<FlowMatch> {
        let (matched, missing): (Vec<&String>, Vec<&String>) =
            flow.required.iter().partition(|id| principal.contains(id));

        if matched.is_empty() {
            return None;
        }

        let scores: Vec<u32> = matched
            .iter()
            .filter_map(|id| self.operations.lookup(id))
            .map(|op| op.score)
            .collect();

        let full_match = missing.is_empty();
        let coverage = matched.len() as f64 / flow.required.len() as f64;
        let severity = self
            .policy
            .severity(&scores, matched.len(), flow.required.len());

        Some(FlowMatch {
            flow: flow.name.clone(),
            label: flow.label.clone(),
            priority: flow.priority,
            description: flow.description.clone(),
            capabilities: flow.capabilities.clone(),
            matched: matched.into_iter().cloned().collect(),
            missing: missing.into_iter().cloned().collect(),
            coverage,
            full_match,
            status: if full_match {
                FlowStatus::Ready
            } else {
                FlowStatus::Partial
            },
            severity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Operation};

    fn operations() -> OperationCatalog {
        OperationCatalog::new(
            [("a_op", 10), ("b_op", 20), ("c_op", 30)]
                .into_iter()
                .map(|(id, score)| Operation {
                    id: id.into(),
                    score,
                    category: Category::Other,
                    description: String::new(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn flow(name: &str, priority: Priority, required: &[&str]) -> Flow {
        Flow {
            name: name.into(),
            label: String::new(),
            priority,
            required: required.iter().map(|s| (*s).into()).collect(),
            description: String::new(),
            capabilities: vec![],
        }
    }

    fn principal(ids: &[&str]) -> PrincipalOperationSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn partial_match_reports_coverage_and_missing() {
        let ops = operations();
        let flows = FlowCatalog::new(vec![flow("F1", Priority::Critical, &["a_op", "b_op"])], &ops)
            .unwrap();
        let matches = FlowMatcher::new(&flows, &ops).match_all(&principal(&["a_op"]));

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.coverage, 0.5);
        assert!(!m.full_match);
        assert_eq!(m.status, FlowStatus::Partial);
        assert_eq!(m.severity, 10);
        assert_eq!(m.missing, vec!["b_op".to_string()]);
    }

    #[test]
    fn zero_overlap_flows_excluded() {
        let ops = operations();
        let flows = FlowCatalog::new(vec![flow("F1", Priority::Critical, &["a_op", "b_op"])], &ops)
            .unwrap();
        let matches = FlowMatcher::new(&flows, &ops).match_all(&principal(&["c_op"]));
        assert!(matches.is_empty());
    }

    #[test]
    fn ordered_by_severity_then_name() {
        let ops = operations();
        let flows = FlowCatalog::new(
            vec![
                flow("Zeta", Priority::Critical, &["a_op", "b_op"]),
                flow("Alpha", Priority::Critical, &["c_op"]),
                flow("Beta", Priority::Critical, &["b_op", "a_op", "c_op"]),
            ],
            &ops,
        )
        .unwrap();
        let matches =
            FlowMatcher::new(&flows, &ops).match_all(&principal(&["a_op", "b_op", "c_op"]));
        let names: Vec<_> = matches.iter().map(|m| m.flow.as_str()).collect();
        // Beta = 60, Alpha = 30, Zeta = 30
        assert_eq!(names, vec!["Beta", "Alpha", "Zeta"]);
    }

    #[test]
    fn severity_policies() {
        let ops = operations();
        let flows =
            FlowCatalog::new(vec![flow("F", Priority::Critical, &["a_op", "b_op", "c_op"])], &ops)
                .unwrap();
        let p = principal(&["b_op", "c_op"]);

        let sev = |policy| {
            FlowMatcher::new(&flows, &ops)
                .with_policy(policy)
                .match_all(&p)[0]
                .severity
        };
        assert_eq!(sev(FlowSeverityPolicy::Sum), 50);
        assert_eq!(sev(FlowSeverityPolicy::Max), 30);
        // 50 * 2/3 = 33.3
        assert_eq!(sev(FlowSeverityPolicy::CoverageWeighted), 33);
    }

    #[test]
    fn coverage_weighted_is_exact_on_whole_products() {
        // 7 of 10 held, matched scores sum to 90: 90 * 7 / 10 = 63.
        let ids: Vec<String> = (0..10).map(|i| format!("op_{i}")).collect();
        let ops = OperationCatalog::new(
            ids.iter()
                .enumerate()
                .map(|(i, id)| Operation {
                    id: id.clone(),
                    score: if i < 7 { [10, 10, 10, 10, 10, 20, 20][i] } else { 5 },
                    category: Category::Other,
                    description: String::new(),
                })
                .collect(),
        )
        .unwrap();
        let required: Vec<&str> = ids.iter().map(String::as_str).collect();
        let flows = FlowCatalog::new(vec![flow("Wide", Priority::Critical, &required)], &ops).unwrap();

        let matches = FlowMatcher::new(&flows, &ops)
            .with_policy(FlowSeverityPolicy::CoverageWeighted)
            .match_all(&principal(&required[..7]));
        assert_eq!(matches[0].coverage, 0.7);
        assert_eq!(matches[0].severity, 63);
    }

    #[test]
    fn tier_filter_limits_evaluated_flows() {
        let ops = operations();
        let flows = FlowCatalog::new(
            vec![
                flow("Crit", Priority::Critical, &["a_op"]),
                flow("Med", Priority::Medium, &["a_op"]),
            ],
            &ops,
        )
        .unwrap();
        let matches = FlowMatcher::new(&flows, &ops)
            .with_tiers([Priority::Medium])
            .match_all(&principal(&["a_op"]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].flow, "Med");
    }

    #[test]
    fn policy_parses_leniently() {
        assert_eq!(
            FlowSeverityPolicy::from_str_lenient("Coverage-Weighted"),
            Some(FlowSeverityPolicy::CoverageWeighted)
        );
        assert_eq!(FlowSeverityPolicy::from_str_lenient("avg"), None);
    }
}
