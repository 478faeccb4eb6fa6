use serde::{Deserialize, Serialize};

use crate::catalog::{Category, OperationCatalog};
use crate::principal::PrincipalOperationSet;

/// A catalog operation held by the principal, with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredOperation {
    pub id: String,
    pub category: Category,
    pub score: u32,
    pub description: String,
}

/// Per-principal scoring output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Held operations, highest score first, then by identifier.
    pub operations: Vec<ScoredOperation>,
    /// Sum of the distinct held operations' scores.
    pub aggregate: u64,
    /// Input identifiers the catalog does not track, sorted.
    pub unknown: Vec<String>,
}

/// Scores a principal's operations against an operation catalog.
pub struct ScoringEngine<'a> {
    operations: &'a OperationCatalog,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(operations: &'a OperationCatalog) -> Self {
        Self { operations }
    }

    /// Score every catalog operation in `principal`. Unknown identifiers do
    /// not contribute; they are returned in `unknown`.
    pub fn score(&self, principal: &PrincipalOperationSet) -> ScoringResult {
        let mut operations = Vec::new();
        let mut unknown = Vec::new();

        for id in principal.iter() {
            match self.operations.lookup(id) {
                Some(op) => operations.push(ScoredOperation {
                    id: op.id.clone(),
                    category: op.category,
                    score: op.score,
                    description: op.description.clone(),
                }),
                None => unknown.push(id.to_string()),
            }
        }

        operations.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        let aggregate = operations.iter().map(|op| u64::from(op.score)).sum();

        if !unknown.is_empty() {
            tracing::warn!(
                count = unknown.len(),
                operations = %unknown.join(","),
                "principal holds operations not tracked by the catalog"
            );
        }

        ScoringResult {
            operations,
            aggregate,
            unknown,
        }
    }
}
