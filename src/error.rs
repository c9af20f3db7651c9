use std::fmt::Write as _;

use thiserror::Error;

/// One manifest validation problem, anchored to the field that caused it
/// (e.g. `project.dependencies[3]`). Validation collects these instead of
/// failing on the first, so users see every problem in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> SchemaIssue {
        SchemaIssue {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("manifest is not valid TOML: {0}")]
    ManifestSyntax(#[from] toml_edit::TomlError),
    #[error("{}", render_issues(.issues))]
    ManifestSchema { issues: Vec<SchemaIssue> },
    #[error("{path} does not resolve: {message}")]
    InvalidReference { path: String, message: String },
}

fn render_issues(issues: &[SchemaIssue]) -> String {
    let mut out = format!(
        "manifest failed validation with {} error{}:",
        issues.len(),
        if issues.len() == 1 { "" } else { "s" },
    );
    for issue in issues {
        write!(out, "\n  - {}", issue).unwrap();
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_issue() {
        let err = BackendError::ManifestSchema {
            issues: vec![
                SchemaIssue::new("project.version", "not a valid version: 'one'"),
                SchemaIssue::new(
                    "project.dependencies[3]",
                    "unparseable requirement",
                ),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("2 errors"));
        assert!(rendered.contains("project.version"));
        assert!(rendered.contains("project.dependencies[3]"));
    }
}
