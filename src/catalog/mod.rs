//! Operation and flow catalogs.
//!
//! Catalogs are declarative data (TOML or JSON) parsed into
//! `CatalogDefinition`, checked for malformed entries, then validated for
//! referential integrity. A loaded `Catalog` is immutable and can be shared
//! across threads without locking.

pub mod flow;
pub mod operation;

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

pub use flow::{Flow, FlowCatalog, Priority};
pub use operation::{Category, Operation, OperationCatalog};

/// Built-in AWS catalog shipped with the crate.
const BUILTIN_AWS: &str = include_str!("aws.toml");

/// Lowercase alphanumeric segments joined by single underscores
/// (`cloudtrail_delete_trail`, `a`).
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").expect("valid identifier regex"));

/// Raw catalog data as written in a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub operations: Vec<OperationDefinition>,
    #[serde(default)]
    pub flows: Vec<FlowDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub id: String,
    /// Signed; negative values are rejected during validation.
    pub score: i64,
    /// Derived from the identifier prefix when omitted.
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl CatalogDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a catalog file. `.json` files are parsed as JSON, anything else
    /// as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    fn validate_operation(index: usize, def: OperationDefinition) -> Result<Operation> {
        let id = def.id.trim();
        if id.is_empty() {
            return Err(GuardError::config(
                format!("operations[{}]", index),
                "empty operation id",
            ));
        }
        let entry = format!("operation '{}'", id);
        if !IDENTIFIER_RE.is_match(id) {
            return Err(GuardError::config(
                entry,
                "identifier must be lowercase and underscore-separated",
            ));
        }
        if def.score < 0 {
            return Err(GuardError::config(
                entry,
                format!("negative score {}", def.score),
            ));
        }
        let score = u32::try_from(def.score)
            .map_err(|_| GuardError::config(&entry, format!("score {} out of range", def.score)))?;

        Ok(Operation {
            id: id.to_string(),
            score,
            category: def.category.unwrap_or_else(|| Category::from_identifier(id)),
            description: def.description,
        })
    }

    fn validate_flow(index: usize, def: FlowDefinition) -> Result<Flow> {
        let name = def.name.trim();
        if name.is_empty() {
            return Err(GuardError::config(
                format!("flows[{}]", index),
                "empty flow name",
            ));
        }
        if def.required.iter().any(|id| id.trim().is_empty()) {
            return Err(GuardError::config(
                format!("flow '{}'", name),
                "empty required operation id",
            ));
        }
        let required: std::collections::BTreeSet<String> = def
            .required
            .iter()
            .map(|id| id.trim().to_string())
            .collect();
        if required.is_empty() {
            return Err(GuardError::config(
                format!("flow '{}'", name),
                "flow requires no operations",
            ));
        }

        Ok(Flow {
            name: name.to_string(),
            label: def.label,
            priority: def.priority,
            required,
            description: def.description,
            capabilities: def.capabilities,
        })
    }
}

/// Validated operation and flow catalogs.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    operations: OperationCatalog,
    flows: FlowCatalog,
}

impl Catalog {
    /// Validate a definition. Malformed entries fail with a configuration
    /// error naming the entry; integrity problems across both catalogs are
    /// collected into one `CatalogIntegrity` error.
    pub fn from_definition(def: CatalogDefinition) -> Result<Self> {
        let operations = def
            .operations
            .into_iter()
            .enumerate()
            .map(|(i, op)| CatalogDefinition::validate_operation(i, op))
            .collect::<Result<Vec<_>>>()?;
        let flows = def
            .flows
            .into_iter()
            .enumerate()
            .map(|(i, flow)| CatalogDefinition::validate_flow(i, flow))
            .collect::<Result<Vec<_>>>()?;

        let (operations, mut violations) = OperationCatalog::build(operations);
        let (flows, flow_violations) = FlowCatalog::build(flows, &operations);
        violations.extend(flow_violations);

        if !violations.is_empty() {
            return Err(GuardError::CatalogIntegrity(violations));
        }

        tracing::debug!(
            operations = operations.len(),
            flows = flows.len(),
            "catalog loaded"
        );
        Ok(Self { operations, flows })
    }

    /// The embedded AWS catalog.
    pub fn builtin() -> Result<Self> {
        Self::from_definition(CatalogDefinition::from_toml_str(BUILTIN_AWS)?)
    }

    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_definition(CatalogDefinition::load(path)?)
    }

    pub fn operations(&self) -> &OperationCatalog {
        &self.operations
    }

    pub fn flows(&self) -> &FlowCatalog {
        &self.flows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrityViolation;

    #[test]
    fn builtin_catalog_is_consistent() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.operations().len() > 100);
        assert!(catalog.flows().get("Log Deletion").is_some());
        assert!(catalog.flows().get("Forensic Cleanup").is_some());
        assert_eq!(
            catalog
                .operations()
                .lookup("cloudtrail_delete_trail")
                .map(|o| o.score),
            Some(60)
        );
        assert!(catalog.operations().all().iter().all(|o| o.score <= 60));
    }

    #[test]
    fn unresolved_flow_reference_fails_load() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "cloudtrail_delete_trail"
            score = 60

            [[flows]]
            name = "Log Deletion"
            required = ["cloudtrail_delete_trail", "cloudtrail_stop_logging"]
            "#,
        )
        .unwrap();
        let err = Catalog::from_definition(def).unwrap_err();
        let GuardError::CatalogIntegrity(violations) = err else {
            panic!("expected integrity error");
        };
        assert_eq!(
            violations,
            vec![IntegrityViolation::UnresolvedOperation {
                flow: "Log Deletion".into(),
                operation: "cloudtrail_stop_logging".into(),
            }]
        );
    }

    #[test]
    fn duplicates_and_dangling_references_reported_together() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "s3_buckets"
            score = 30

            [[operations]]
            id = "s3_buckets"
            score = 10

            [[flows]]
            name = "S3"
            required = ["s3_buckets", "s3_objects"]
            "#,
        )
        .unwrap();
        match Catalog::from_definition(def).unwrap_err() {
            GuardError::CatalogIntegrity(v) => assert_eq!(v.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_score_is_configuration_error() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "iam_create_user"
            score = -5
            "#,
        )
        .unwrap();
        let err = Catalog::from_definition(def).unwrap_err();
        match err {
            GuardError::Configuration { entry, message } => {
                assert_eq!(entry, "operation 'iam_create_user'");
                assert!(message.contains("negative"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_flow_name_is_configuration_error() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "iam_create_user"
            score = 60

            [[flows]]
            name = "  "
            required = ["iam_create_user"]
            "#,
        )
        .unwrap();
        let err = Catalog::from_definition(def).unwrap_err();
        assert!(matches!(err, GuardError::Configuration { ref entry, .. } if entry == "flows[0]"));
    }

    #[test]
    fn malformed_identifier_rejected() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "DeleteTrail"
            score = 60
            "#,
        )
        .unwrap();
        let err = Catalog::from_definition(def).unwrap_err();
        assert!(err.to_string().contains("operation 'DeleteTrail'"));
    }

    #[test]
    fn flow_without_requirements_rejected() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[flows]]
            name = "Nothing"
            required = []
            "#,
        )
        .unwrap();
        assert!(matches!(
            Catalog::from_definition(def),
            Err(GuardError::Configuration { .. })
        ));
    }

    #[test]
    fn blank_required_id_rejected() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "svc_a"
            score = 10

            [[flows]]
            name = "Half"
            required = ["svc_a", " "]
            "#,
        )
        .unwrap();
        match Catalog::from_definition(def).unwrap_err() {
            GuardError::Configuration { entry, message } => {
                assert_eq!(entry, "flow 'Half'");
                assert!(message.contains("empty required"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn single_segment_identifiers_accepted() {
        let def = CatalogDefinition::from_toml_str(
            r#"
            [[operations]]
            id = "a"
            score = 10
            "#,
        )
        .unwrap();
        let catalog = Catalog::from_definition(def).unwrap();
        assert!(catalog.operations().contains("a"));

        for bad in ["a__b", "_a", "a_", "a-b"] {
            let def = CatalogDefinition {
                operations: vec![OperationDefinition {
                    id: bad.into(),
                    score: 1,
                    category: None,
                    description: String::new(),
                }],
                flows: vec![],
            };
            assert!(
                matches!(Catalog::from_definition(def), Err(GuardError::Configuration { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn json_catalog_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{
                "operations": [
                    {"id": "kms_disable_key", "score": 50, "category": "kms"},
                    {"id": "iam_delete_access_key", "score": 40}
                ],
                "flows": [
                    {"name": "Access Blocking", "priority": "high",
                     "required": ["kms_disable_key", "iam_delete_access_key"]}
                ]
            }"#,
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.operations().len(), 2);
        let flow = catalog.flows().get("Access Blocking").unwrap();
        assert_eq!(flow.priority, Priority::High);
        assert_eq!(
            catalog
                .operations()
                .lookup("iam_delete_access_key")
                .map(|o| o.category),
            Some(Category::Iam)
        );
    }
}
