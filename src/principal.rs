//! The scan input: operations attributed to one principal.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// Set of operation identifiers a principal can invoke.
///
/// Set semantics: inserting an identifier twice has no effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalOperationSet {
    /// Optional principal name (user or role) carried into the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    pub operations: BTreeSet<String>,
}

/// Accepted JSON shapes: a bare array or an object with a principal name.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    List(Vec<String>),
    Named {
        #[serde(default)]
        principal: Option<String>,
        operations: Vec<String>,
    },
}

impl PrincipalOperationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            operations: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        self.operations.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.operations.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Parse one identifier per line. Blank lines and `#` comments are skipped.
    pub fn from_lines(content: &str) -> Self {
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Parse a JSON array of identifiers, or `{"principal": ..., "operations": [...]}`.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let input: JsonInput = serde_json::from_str(content)?;
        let (principal, ops) = match input {
            JsonInput::List(ops) => (None, ops),
            JsonInput::Named {
                principal,
                operations,
            } => (principal, operations),
        };
        let mut set: Self = ops.into_iter().collect();
        set.principal = principal;
        Ok(set)
    }

    /// Detect the format from content: JSON when it starts with `[` or `{`,
    /// line-based otherwise.
    pub fn parse(content: &str) -> Result<Self> {
        match content.trim_start().chars().next() {
            Some('[') | Some('{') => Self::from_json_str(content),
            _ => Ok(Self::from_lines(content)),
        }
    }

    /// Load from a file, or from stdin when `path` is `-`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path).map_err(|e| GuardError::Input {
                origin: path.display().to_string(),
                message: e.to_string(),
            })?
        };
        Self::parse(&content)
    }
}

impl<S: Into<String>> FromIterator<S> for PrincipalOperationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for PrincipalOperationSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}
