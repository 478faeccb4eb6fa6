use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardError>;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Catalog integrity error: {}", join_violations(.0))]
    CatalogIntegrity(Vec<IntegrityViolation>),

    #[error("Configuration error in {entry}: {message}")]
    Configuration { entry: String, message: String },

    #[error("Unknown operations (strict mode): {}", .0.join(", "))]
    UnknownOperations(Vec<String>),

    #[error("Input error in {origin}: {message}")]
    Input { origin: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GuardError {
    pub fn exit_code(&self) -> i32 {
        2
    }

    pub(crate) fn config(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            entry: entry.into(),
            message: message.into(),
        }
    }
}

/// A single referential or uniqueness problem found while loading catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    DuplicateOperation(String),
    DuplicateFlow(String),
    UnresolvedOperation { flow: String, operation: String },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateOperation(id) => write!(f, "duplicate operation '{}'", id),
            Self::DuplicateFlow(name) => write!(f, "duplicate flow '{}'", name),
            Self::UnresolvedOperation { flow, operation } => {
                write!(f, "flow '{}' requires unknown operation '{}'", flow, operation)
            }
        }
    }
}

fn join_violations(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
