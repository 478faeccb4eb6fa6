use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::OperationCatalog;
use crate::error::{GuardError, IntegrityViolation, Result};

/// A named combination of operations that together enable an attack objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    /// Cosmetic label (usually an emoji) shown next to the name.
    pub label: String,
    pub priority: Priority,
    /// Operations that must all be held for a full match.
    pub required: BTreeSet<String>,
    pub description: String,
    pub capabilities: Vec<String>,
}

/// Priority tier of a flow, used to filter which flows a scan evaluates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    #[default]
    Critical,
}

impl Priority {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Parse a list of tier names; any unknown name is a configuration error.
    pub fn parse_list<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>> {
        values
            .iter()
            .map(|value| {
                let value = value.as_ref();
                Self::from_str_lenient(value).ok_or_else(|| {
                    GuardError::config(
                        "tier",
                        format!(
                            "unknown tier '{}' (expected critical, high, medium or low)",
                            value
                        ),
                    )
                })
            })
            .collect()
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable set of flows, validated against an operation catalog.
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: Vec<Flow>,
}

impl FlowCatalog {
    /// Build the catalog, failing with every unresolved reference and
    /// duplicate name found.
    pub fn new(flows: Vec<Flow>, operations: &OperationCatalog) -> Result<Self> {
        let (catalog, violations) = Self::build(flows, operations);
        if violations.is_empty() {
            Ok(catalog)
        } else {
            Err(GuardError::CatalogIntegrity(violations))
        }
    }

    pub(crate) fn build(
        flows: Vec<Flow>,
        operations: &OperationCatalog,
    ) -> (Self, Vec<IntegrityViolation>) {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(flows.len());
        let mut violations = Vec::new();

        for flow in flows {
            if !seen.insert(flow.name.clone()) {
                violations.push(IntegrityViolation::DuplicateFlow(flow.name));
                continue;
            }
            violations.extend(
                flow.required
                    .iter()
                    .filter(|id| !operations.contains(id))
                    .map(|id| IntegrityViolation::UnresolvedOperation {
                        flow: flow.name.clone(),
                        operation: id.clone(),
                    }),
            );
            kept.push(flow);
        }

        (Self { flows: kept }, violations)
    }

    /// All flows in declaration order.
    pub fn all(&self) -> &[Flow] {
        &self.flows
    }

    pub fn get(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
