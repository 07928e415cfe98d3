//! Error types for schema construction and field packing.

use bitstream::BitError;
use thiserror::Error;

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for packing a single field.
pub type PackResult<T> = Result<T, PackError>;

/// Errors that abort building a data model.
///
/// Fields that merely cannot be packed are refused and logged instead; see
/// [`DataModelRepository`](crate::DataModelRepository).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A property carries a descriptor that does not parse.
    #[error("invalid packing '{descriptor}' on {owner}.{property}: {source}")]
    InvalidPacking {
        owner: String,
        property: String,
        descriptor: String,
        #[source]
        source: PackingParseError,
    },

    /// A model was requested for a type that is not a structure.
    #[error("type '{name}' is not a structure")]
    NotAStructure { name: String },
}

/// Errors from parsing a packing descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackingParseError {
    #[error("expected a packing key at offset {offset}")]
    ExpectedKey { offset: usize },

    #[error("unknown packing key '{key}'")]
    UnknownKey { key: String },

    #[error("expected '{expected}' for '{key}' at offset {offset}")]
    ExpectedToken {
        key: &'static str,
        expected: char,
        offset: usize,
    },

    #[error("expected ',' between entries at offset {offset}")]
    ExpectedSeparator { offset: usize },

    #[error("malformed number '{text}' for '{key}'")]
    InvalidNumber { key: &'static str, text: String },

    #[error("'{key}' bit count {bits} is outside {min}..={max}")]
    BitCountOutOfRange {
        key: &'static str,
        bits: u32,
        min: u8,
        max: u8,
    },

    #[error("float range [{min}, {max}] is empty")]
    InvalidRange { min: f32, max: f32 },

    #[error("delta range {max} must be positive")]
    InvalidDeltaRange { max: f32 },

    #[error("frequency {value} must not be negative")]
    InvalidFrequency { value: f32 },
}

/// Errors from packing or unpacking one value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error(transparent)]
    Bit(#[from] BitError),

    /// The value does not have the shape the packing expects.
    #[error("expected {expected}, found '{found}'")]
    TypeMismatch { expected: &'static str, found: String },
}
