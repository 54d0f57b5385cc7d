//! Error handling for the process engine
//!
//! This module defines the error taxonomy shared by chain assembly, link
//! resolution and execution, plus a Result alias used throughout the crate.

use thiserror::Error;

/// Main error type for chain assembly and execution
#[derive(Error, Debug)]
pub enum ChainError {
    /// Malformed or incompatible port types
    #[error("Schema error: {0}")]
    Schema(String),

    /// A link endpoint does not name an existing port
    #[error("Unresolved path '{path}': {reason}")]
    UnresolvedPath { path: String, reason: String },

    /// A component or boundary port name is already used
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// A destination input already has an incoming link
    #[error("Input '{dest}' already has an incoming link")]
    DuplicateLink { dest: String },

    /// The link graph among children contains a cycle
    #[error("Cycle detected in process graph: {path}")]
    CyclicGraph { path: String },

    /// A required input has no published record
    #[error("Missing input: '{port}' has no record")]
    MissingInput { port: String },

    /// A parameter value is malformed
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Transform-specific runtime failure
    #[error("Transform error: {0}")]
    Transform(String),

    /// Errors related to Rhai script compilation or evaluation
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised inside a named component or operation
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ChainError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, with all context layers peeled off.
    pub fn root(&self) -> &ChainError {
        let mut err = self;
        while let ChainError::WithContext { source, .. } = err {
            err = source;
        }
        err
    }

    /// Whether this error aborts chain construction (raised by `init`).
    pub fn is_build_time(&self) -> bool {
        matches!(
            self.root(),
            ChainError::Schema(_)
                | ChainError::UnresolvedPath { .. }
                | ChainError::DuplicateName(_)
                | ChainError::DuplicateLink { .. }
                | ChainError::CyclicGraph { .. }
                | ChainError::InvalidParameter { .. }
        )
    }

    pub(crate) fn unresolved(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ChainError::UnresolvedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ChainError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
