//! Error taxonomy for registration, store mutation, settings validation and loading.
//!
//! Registration-time errors (`DuplicateKeyError`, `FactoryError`) are meant to be
//! propagated with `?` and abort setup. Everything a single tab can hit at runtime
//! (`ValidationError`, `LoaderFailure`, `FeatureNotFoundError`) is captured and rendered
//! through the error views instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Two features (or prototypes) were registered under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("feature key \"{0}\" is registered more than once")]
pub struct DuplicateKeyError(pub String);

/// Failures of `TabStore` mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("tab \"{0}\" already exists")]
    DuplicateId(String),

    #[error("tab \"{0}\" not found")]
    NotFound(String),

    #[error("updater changed tab id from \"{expected}\" to \"{actual}\"")]
    IdMismatch { expected: String, actual: String },
}

/// One step of a path into a settings value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Dotted path such as `filters[2].field`; `(root)` for the value itself.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "(root)".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(_) => out.push_str(&segment.to_string()),
            }
        }
        out
    }
}

/// Settings did not match the declared schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("invalid settings: {}", self.summary())]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }

    /// Issue messages keyed by their dotted path, in order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.issues
            .iter()
            .map(|issue| (issue.path_string(), issue.message.clone()))
            .collect()
    }

    fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{}: {}", issue.path_string(), issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The active tab points at a feature key nobody registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("tab \"{tab_id}\" references unregistered feature \"{feature_key}\"")]
pub struct FeatureNotFoundError {
    pub tab_id: String,
    pub feature_key: String,
}

/// The injected loader rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct LoaderFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl LoaderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl From<anyhow::Error> for LoaderFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for LoaderFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("loader data could not be (de)serialized: {}", err))
    }
}

/// Errors building or rendering through a `TabFactory`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    #[error("tab factory requires at least one tab prototype")]
    Empty,

    #[error("tab prototype with key \"{0}\" already exists")]
    DuplicateKey(String),

    #[error("schema for tab \"{0}\" must declare a `key` field as a literal")]
    MissingKeyLiteral(String),

    #[error("schema key literal (\"{literal}\") does not match prototype key \"{key}\"")]
    KeyMismatch { key: String, literal: String },

    #[error("no tab prototype registered for key \"{0}\"")]
    NoMatchingPrototype(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Display-safe error payload handed to error views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorReport {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issues: Vec::new(),
            detail: None,
        }
    }

    /// JSON rendering; never fails, falls back to the bare message.
    pub fn to_display_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl From<&ValidationError> for ErrorReport {
    fn from(err: &ValidationError) -> Self {
        Self {
            message: err.to_string(),
            issues: err.issues.clone(),
            detail: None,
        }
    }
}

impl From<&LoaderFailure> for ErrorReport {
    fn from(err: &LoaderFailure) -> Self {
        Self {
            message: err.message.clone(),
            issues: Vec::new(),
            detail: err.detail.clone(),
        }
    }
}

impl From<&FeatureNotFoundError> for ErrorReport {
    fn from(err: &FeatureNotFoundError) -> Self {
        Self::message(err.to_string())
    }
}

impl From<&FactoryError> for ErrorReport {
    fn from(err: &FactoryError) -> Self {
        match err {
            FactoryError::Validation(validation) => validation.into(),
            other => Self::message(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_path_string() {
        let issue = ValidationIssue::new(
            vec!["filters".into(), 2usize.into(), "field".into()],
            "expected string",
        );
        assert_eq!(issue.path_string(), "filters[2].field");
        assert_eq!(ValidationIssue::new(vec![], "x").path_string(), "(root)");
    }

    #[test]
    fn test_report_is_json() {
        let err = ValidationError::single(vec!["userId".into()], "expected string, found number");
        let text = ErrorReport::from(&err).to_display_string();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["issues"][0]["path"][0], "userId");
        assert!(parsed["message"].as_str().unwrap().contains("userId"));
    }

    #[test]
    fn test_loader_failure_report_keeps_detail() {
        let failure = LoaderFailure::new("boom").with_detail(serde_json::json!({ "status": 500 }));
        let report = ErrorReport::from(&failure);
        assert_eq!(report.detail, Some(serde_json::json!({ "status": 500 })));
        assert!(report.to_display_string().contains("boom"));
    }
}
