//! Error types for codec operations.

use std::fmt;

use bitstream::BitError;
use schema::{PackError, SchemaError};
use thiserror::Error;

use crate::mapping::MappedId;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding, decoding or replicating messages.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Frame decoding error.
    #[error("wire error: {0}")]
    Wire(#[from] wire::DecodeError),

    /// Frame encoding error.
    #[error("wire encode error: {0}")]
    WireEncode(#[from] wire::EncodeError),

    /// Bitstream error.
    #[error("bitstream error: {0}")]
    Bitstream(#[from] BitError),

    /// A packed field failed to encode or decode.
    #[error("packing error: {0}")]
    Pack(#[from] PackError),

    /// No data model could be built for a type.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A string id that was never announced.
    #[error("unknown string id {id}")]
    UnknownString { id: MappedId },

    /// A path id that was never announced.
    #[error("unknown path id {id}")]
    UnknownPath { id: MappedId },

    /// An object id that is not attached or whose object is gone.
    #[error("unknown object id {id}")]
    UnknownObject { id: MappedId },

    /// A decoded id does not fit the id space.
    #[error("id {raw} is out of range")]
    IdOutOfRange { raw: u64 },

    /// A type path that does not name a registered type.
    #[error("type '{name}' is not registered")]
    UnknownType { name: String },

    /// A dictionary table has no ids left.
    #[error("{table} table is full ({limit} entries)")]
    DictionaryFull { table: DictionaryTable, limit: usize },

    /// An id was announced again with different content.
    #[error("{table} id {id} was re-announced with different content")]
    DictionaryConflict { table: DictionaryTable, id: MappedId },

    /// Id zero is reserved for empty values and cannot be announced.
    #[error("{table} id 0 is reserved")]
    ReservedId { table: DictionaryTable },

    /// Limits exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Decoded string bytes are not UTF-8.
    #[error("string field '{field}' is not valid UTF-8")]
    InvalidUtf8 { field: String },

    /// A call was given the wrong number of arguments.
    #[error("call needs argument {index} but only {actual} were given")]
    ArgumentCountMismatch { index: usize, actual: usize },

    /// The model of a nested structure is no longer cached.
    #[error("nested model for field '{field}' has been released")]
    ModelReleased { field: String },

    /// A value does not have the type its field or model expects.
    #[error("field '{field}' expects '{expected}', found '{found}'")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A received message type has no constructor.
    #[error("type '{name}' cannot be constructed")]
    NotConstructible { name: String },
}

/// Dictionary tables of a knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryTable {
    String,
    Path,
    Object,
}

impl fmt::Display for DictionaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Path => "path",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    ArrayCount,
    StringLength,
    PathDepth,
    NestingDepth,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ArrayCount => "array count",
            Self::StringLength => "string length",
            Self::PathDepth => "path depth",
            Self::NestingDepth => "nesting depth",
        };
        f.write_str(name)
    }
}
