//! Structured error types shared across mela crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`MelaError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (momentum tags, separations, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the analysis pipeline.
///
/// Every variant except [`MelaError::Fit`] is fatal to a run. `Fit` is raised
/// for a single key and collected by the fit drivers instead of unwinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MelaError {
    /// Malformed or missing configuration or data.
    #[error("invalid input: {0}")]
    InvalidInput(ErrorInfo),
    /// Array dimensions disagree with the declared bin count or width.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(ErrorInfo),
    /// Two stages that must agree (bin counts, momentum sets) do not.
    #[error("incompatible inputs: {0}")]
    IncompatibleInputs(ErrorInfo),
    /// A data-integrity assumption was violated (e.g. no symmetrization rule applies).
    #[error("inconsistency: {0}")]
    Inconsistency(ErrorInfo),
    /// Numerical failure of a single fit.
    #[error("fit error: {0}")]
    Fit(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem errors raised by data sources and stores.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl MelaError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MelaError::InvalidInput(info)
            | MelaError::ShapeMismatch(info)
            | MelaError::IncompatibleInputs(info)
            | MelaError::Inconsistency(info)
            | MelaError::Fit(info)
            | MelaError::Serde(info)
            | MelaError::Io(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let info = match &mut self {
            MelaError::InvalidInput(info)
            | MelaError::ShapeMismatch(info)
            | MelaError::IncompatibleInputs(info)
            | MelaError::Inconsistency(info)
            | MelaError::Fit(info)
            | MelaError::Serde(info)
            | MelaError::Io(info) => info,
        };
        info.context.insert(key.into(), value.into());
        self
    }

    /// Shorthand for an [`MelaError::InvalidInput`] with code and message.
    pub fn invalid(code: &str, message: impl Into<String>) -> Self {
        MelaError::InvalidInput(ErrorInfo::new(code, message))
    }

    /// Returns true when the error only concerns a single fit key.
    pub fn is_local(&self) -> bool {
        matches!(self, MelaError::Fit(_))
    }
}
