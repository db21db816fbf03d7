//! Error types for the mapping engine

use thiserror::Error;

/// Invalid identity fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Channel outside 1-16
    #[error("MIDI channel {0} out of range (1-16)")]
    ChannelOutOfRange(i64),

    /// Data byte outside 0-127
    #[error("MIDI data byte {0} out of range (0-127)")]
    DataOutOfRange(i64),

    /// Message type name not recognized
    #[error("Unknown MIDI message type '{0}'")]
    UnknownKind(String),
}

/// Table model errors
///
/// Row and column-id violations are caller bugs; the table is left untouched
/// when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Row index not in `[0, row_count)`
    #[error("Row {row} out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    /// Column id has no column definition
    #[error("Unknown column id {0}")]
    UnknownColumn(usize),

    /// Column name not recognized
    #[error("Unknown column '{0}'")]
    UnknownColumnName(String),
}

/// A single persisted record that could not be turned into a binding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Required attribute absent
    #[error("Element #{index}: missing attribute '{attribute}'")]
    MissingAttribute {
        index: usize,
        attribute: &'static str,
    },

    /// Attribute present but not usable (wrong type, not a number)
    #[error("Element #{index}: invalid value for '{attribute}': {value}")]
    InvalidAttribute {
        index: usize,
        attribute: &'static str,
        value: String,
    },

    /// Attributes parsed but describe no valid identity
    #[error("Element #{index}: {source}")]
    Identity {
        index: usize,
        #[source]
        source: IdentityError,
    },

    /// Element is not an attribute mapping
    #[error("Element #{index}: malformed element ({reason})")]
    Malformed { index: usize, reason: String },
}

/// Whole-document failures
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Text is not valid YAML
    #[error("Failed to parse profile YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML is valid but the root is not an element tree
    #[error("Profile root is not a document: {0}")]
    NotADocument(String),
}
