//! Error handling for Simplex
//!
//! Structural violations are raised before any mutation starts. Everything
//! else reports how far an operation got and leaves the graph as it is.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Simplex operations
pub type Result<T> = std::result::Result<T, SimplexError>;

/// Main error type for Simplex operations
#[derive(Error, Debug)]
pub enum SimplexError {
    // Structural Errors
    #[error("Simplex system '{system}' is missing its rest shape")]
    MissingRestShape { system: String },

    #[error("Cannot put a {item} into the {expected} group '{group}'")]
    WrongGroupType {
        group: String,
        expected: String,
        item: String,
    },

    #[error("A {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Unknown {kind}: {name}")]
    UnknownItem { kind: &'static str, name: String },

    #[error("'{name}' is not fully splittable: {reason}")]
    PartialSplit { name: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Solve type '{value}' is not one of min, allMul, extMul, mulAvgExt, mulAvgAll")]
    InvalidSolveType { value: String },

    // Host Errors
    #[error("Unable to find existing {kind} '{name}' on the host")]
    MissingHostObject { kind: &'static str, name: String },

    #[error("Host operation failed: {reason}")]
    Host { reason: String },

    // Falloff Errors
    #[error("Cannot compute weights for falloff '{name}': {reason}")]
    FalloffWeights { name: String, reason: String },

    // Definition Errors
    #[error("Unsupported definition encoding version: {version}")]
    UnsupportedVersion { version: String },

    #[error("Malformed simplex definition: {reason}")]
    MalformedDefinition { reason: String },

    #[error("Definition index {index} is out of range for {kind} (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Traversal '{name}' cannot be written in the legacy encoding: {reason}")]
    LegacyUnrepresentable { name: String, reason: String },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checksum mismatch in {path}: expected {expected}, found {found}")]
    Checksum {
        path: PathBuf,
        expected: String,
        found: String,
    },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimplexError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SimplexError::MissingRestShape { .. } => "MISSING_REST_SHAPE",
            SimplexError::WrongGroupType { .. } => "WRONG_GROUP_TYPE",
            SimplexError::DuplicateName { .. } => "DUPLICATE_NAME",
            SimplexError::UnknownItem { .. } => "UNKNOWN_ITEM",
            SimplexError::PartialSplit { .. } => "PARTIAL_SPLIT",
            SimplexError::InvalidValue { .. } => "INVALID_VALUE",
            SimplexError::InvalidSolveType { .. } => "INVALID_SOLVE_TYPE",
            SimplexError::MissingHostObject { .. } => "MISSING_HOST_OBJECT",
            SimplexError::Host { .. } => "HOST_ERROR",
            SimplexError::FalloffWeights { .. } => "FALLOFF_WEIGHTS",
            SimplexError::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            SimplexError::MalformedDefinition { .. } => "MALFORMED_DEFINITION",
            SimplexError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            SimplexError::LegacyUnrepresentable { .. } => "LEGACY_UNREPRESENTABLE",
            SimplexError::FileRead { .. } => "FILE_READ",
            SimplexError::FileWrite { .. } => "FILE_WRITE",
            SimplexError::Checksum { .. } => "CHECKSUM",
            SimplexError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Structural invariant violations. These are always raised before the
    /// graph is touched.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SimplexError::MissingRestShape { .. }
                | SimplexError::WrongGroupType { .. }
                | SimplexError::DuplicateName { .. }
                | SimplexError::PartialSplit { .. }
                | SimplexError::InvalidSolveType { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SimplexError::MissingHostObject { .. } => vec![
                "Retry the load with object creation enabled",
                "Check that the host scene contains the expected rig",
            ],
            SimplexError::PartialSplit { .. } => vec![
                "Name the progression, its controller and all of its shapes with the same axis token",
                "Or remove the axis token from all of them",
            ],
            SimplexError::UnsupportedVersion { .. } => vec![
                "Supported encoding versions: 1, 2, 3",
                "Re-export the definition from a newer tool",
            ],
            SimplexError::LegacyUnrepresentable { .. } => vec![
                "Write the current encoding instead of the legacy one",
            ],
            SimplexError::FalloffWeights { .. } => vec![
                "Set the falloff vertices before asking for weights",
                "Map falloffs need their weights loaded explicitly",
            ],
            SimplexError::Checksum { .. } => vec![
                "The cache file may be corrupted; re-export it from the source rig",
            ],
            _ => vec![],
        }
    }
}
