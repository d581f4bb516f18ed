use thiserror::Error;

/// A malformed or contradictory spec node. `path` is the dotted path of
/// the offending node (`<root>` for the top level).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{path}: unknown data type '{dtype}'")]
    UnknownDataType { path: String, dtype: String },

    #[error("{path}: duplicate {what} name '{name}'")]
    DuplicateName {
        path: String,
        what: &'static str,
        name: String,
    },

    #[error("{path}: duplicate {what} value {value}")]
    DuplicateValue {
        path: String,
        what: &'static str,
        value: i64,
    },

    #[error("{path}: conflicting endpoint markers: {}", .markers.join(", "))]
    ConflictingMarkers {
        path: String,
        markers: Vec<&'static str>,
    },

    #[error("{path}: endpoint needs at least one of getter_name, setter_name or caller_name")]
    MissingAccessor { path: String },

    #[error("{path}: missing required field '{field}'")]
    MissingField { path: String, field: &'static str },

    #[error("{path}: field '{field}' {reason}")]
    InvalidField {
        path: String,
        field: &'static str,
        reason: String,
    },

    #[error("{path}: '{name}' is not a valid identifier")]
    InvalidIdentifier { path: String, name: String },

    #[error("{path}: {what} value {value} out of range {min}..={max}")]
    OutOfRange {
        path: String,
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("malformed spec: {0}")]
    Syntax(String),

    #[error("failed to read spec {path}: {message}")]
    Io { path: String, message: String },
}

impl SchemaError {
    /// Dotted path of the offending node, when the error names one.
    pub fn node_path(&self) -> Option<&str> {
        match self {
            SchemaError::UnknownDataType { path, .. }
            | SchemaError::DuplicateName { path, .. }
            | SchemaError::DuplicateValue { path, .. }
            | SchemaError::ConflictingMarkers { path, .. }
            | SchemaError::MissingAccessor { path }
            | SchemaError::MissingField { path, .. }
            | SchemaError::InvalidField { path, .. }
            | SchemaError::InvalidIdentifier { path, .. }
            | SchemaError::OutOfRange { path, .. } => Some(path),
            SchemaError::Syntax(_) | SchemaError::Io { .. } => None,
        }
    }
}
