use std::fmt;

use serde::Serialize;

/// One problem found while validating a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Dotted path into the snapshot, e.g. `parameters._II_em.value[1]`.
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    issues: Vec<SchemaIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<SchemaIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<SchemaIssue> {
        self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schema snapshot failed validation:")?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
