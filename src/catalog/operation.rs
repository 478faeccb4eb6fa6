use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, IntegrityViolation, Result};

/// A single cloud API capability with its risk score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Service-prefixed identifier (e.g., "cloudtrail_delete_trail").
    pub id: String,
    /// Risk score on the catalog's scale (0-60 for the built-in catalog).
    pub score: u32,
    pub category: Category,
    pub description: String,
}

/// Service family an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Iam,
    Sts,
    S3,
    Ec2,
    Rds,
    Lambda,
    CloudFormation,
    Logging,
    Secrets,
    SystemsManager,
    Kms,
    Other,
}

impl Category {
    /// Derive the category from an identifier's service prefix.
    pub fn from_identifier(id: &str) -> Self {
        const PREFIXES: &[(&str, Category)] = &[
            ("iam_", Category::Iam),
            ("sts_", Category::Sts),
            ("s3_", Category::S3),
            ("ec2_", Category::Ec2),
            ("rds_", Category::Rds),
            ("lambda_", Category::Lambda),
            ("cloudformation_", Category::CloudFormation),
            ("cloudtrail_", Category::Logging),
            ("cloudwatch_", Category::Logging),
            ("secrets_manager_", Category::Secrets),
            ("systems_manager_", Category::SystemsManager),
            ("kms_", Category::Kms),
        ];

        PREFIXES
            .iter()
            .find(|(prefix, _)| id.starts_with(prefix))
            .map(|&(_, category)| category)
            .unwrap_or(Category::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iam => write!(f, "IAM"),
            Self::Sts => write!(f, "STS"),
            Self::S3 => write!(f, "S3"),
            Self::Ec2 => write!(f, "EC2"),
            Self::Rds => write!(f, "RDS"),
            Self::Lambda => write!(f, "Lambda"),
            Self::CloudFormation => write!(f, "CloudFormation"),
            Self::Logging => write!(f, "Logging"),
            Self::Secrets => write!(f, "Secrets"),
            Self::SystemsManager => write!(f, "Systems Manager"),
            Self::Kms => write!(f, "KMS"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Immutable identifier -> operation index.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

impl OperationCatalog {
    /// Build the catalog, failing if any identifier is declared twice.
    pub fn new(operations: Vec<Operation>) -> Result<Self> {
        let (catalog, violations) = Self::build(operations);
        if violations.is_empty() {
            Ok(catalog)
        } else {
            Err(GuardError::CatalogIntegrity(violations))
        }
    }

    /// Index operations, keeping the first declaration of each identifier
    /// and reporting every later one.
    pub(crate) fn build(operations: Vec<Operation>) -> (Self, Vec<IntegrityViolation>) {
        let mut kept = Vec::with_capacity(operations.len());
        let mut index = HashMap::with_capacity(operations.len());
        let mut violations = Vec::new();

        for op in operations {
            if index.contains_key(&op.id) {
                violations.push(IntegrityViolation::DuplicateOperation(op.id));
                continue;
            }
            index.insert(op.id.clone(), kept.len());
            kept.push(op);
        }

        (
            Self {
                operations: kept,
                index,
            },
            violations,
        )
    }

    pub fn lookup(&self, id: &str) -> Option<&Operation> {
        self.index.get(id).map(|&i| &self.operations[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All operations in declaration order.
    pub fn all(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str, score: u32) -> Operation {
        Operation {
            id: id.into(),
            score,
            category: Category::from_identifier(id),
            description: String::new(),
        }
    }

    #[test]
    fn category_follows_service_prefix() {
        assert_eq!(Category::from_identifier("iam_create_user"), Category::Iam);
        assert_eq!(
            Category::from_identifier("cloudwatch_logs_delete_log_group"),
            Category::Logging
        );
        assert_eq!(
            Category::from_identifier("secrets_manager_delete_secret"),
            Category::Secrets
        );
        assert_eq!(Category::from_identifier("glue_get_tables"), Category::Other);
    }

    #[test]
    fn lookup_finds_declared_operations() {
        let catalog = OperationCatalog::new(vec![op("s3_buckets", 30), op("iam_users", 15)]).unwrap();
        assert_eq!(catalog.lookup("iam_users").map(|o| o.score), Some(15));
        assert!(catalog.lookup("iam_groups").is_none());
        assert_eq!(catalog.all()[0].id, "s3_buckets");
    }

    #[test]
    fn duplicates_are_all_reported() {
        let err = OperationCatalog::new(vec![
            op("s3_buckets", 30),
            op("s3_buckets", 10),
            op("iam_users", 15),
            op("iam_users", 15),
        ])
        .unwrap_err();

        match err {
            GuardError::CatalogIntegrity(v) => assert_eq!(
                v,
                vec![
                    IntegrityViolation::DuplicateOperation("s3_buckets".into()),
                    IntegrityViolation::DuplicateOperation("iam_users".into()),
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }
}
