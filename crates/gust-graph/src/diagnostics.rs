//! Graph-construction diagnostics.
//!
//! Unlike [`crate::GraphError`], these are non-fatal: the graph is still
//! built, but callers (the workspace controller) should surface them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct GraphDiagnostic {
    pub scope: String,
    pub severity: Severity,
    pub message: String,
}

impl GraphDiagnostic {
    pub fn unresolved_dependency(package: &str, target: &str, names: Vec<String>) -> Self {
        Self {
            scope: format!("{package}::{target}"),
            severity: Severity::Warning,
            message: format!(
                "target '{target}' has unresolved dependencies: {}",
                names.join(", ")
            ),
        }
    }

    pub fn invalid_product(package: &str, product: &str, reason: &str) -> Self {
        Self {
            scope: format!("{package}::{product}"),
            severity: Severity::Error,
            message: reason.to_string(),
        }
    }

    pub fn invalid_binary_target(package: &str, target: &str, url: &str) -> Self {
        Self {
            scope: format!("{package}::{target}"),
            severity: Severity::Error,
            message: format!(
                "binary target url '{url}' does not end in a recognized archive extension (.zip)"
            ),
        }
    }
}
