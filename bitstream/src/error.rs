//! Error types for bitstream operations.

use thiserror::Error;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur during bit-level encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    /// Attempted to read past the declared end of the stream.
    #[error("attempted to read {requested} bits but only {available} bits available")]
    UnexpectedEof {
        /// Number of bits requested.
        requested: usize,
        /// Number of bits available.
        available: usize,
    },

    /// Attempted to write past the end of caller-supplied memory.
    ///
    /// Only writers created with [`BitWriter::over`](crate::BitWriter::over) report this;
    /// owned writers grow instead.
    #[error("attempted to write {attempted} bits but buffer capacity is {capacity} bits")]
    BufferOverflow {
        /// Total number of bits the write would need.
        attempted: usize,
        /// Maximum capacity in bits.
        capacity: usize,
    },

    /// Invalid bit count for the operation.
    #[error("invalid bit count {bits}, maximum allowed is {max_bits}")]
    InvalidBitCount {
        /// The invalid bit count provided.
        bits: usize,
        /// Maximum allowed bits for this operation.
        max_bits: usize,
    },

    /// Value exceeds the range representable by the specified number of bits.
    #[error("value {value} cannot be represented in {bits} bits")]
    ValueOutOfRange {
        /// The value that was out of range.
        value: u64,
        /// Number of bits available.
        bits: usize,
    },

    /// A raw block access was attempted off a byte boundary.
    #[error("raw block access at bit {bit_position} is not byte aligned")]
    MisalignedAccess {
        /// Cursor position at the time of the access.
        bit_position: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unexpected_eof() {
        let err = BitError::UnexpectedEof {
            requested: 8,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('8'), "should mention requested bits");
        assert!(msg.contains('3'), "should mention available bits");
    }

    #[test]
    fn error_display_buffer_overflow() {
        let err = BitError::BufferOverflow {
            attempted: 72,
            capacity: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("72"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn error_display_misaligned() {
        let err = BitError::MisalignedAccess { bit_position: 13 };
        assert!(err.to_string().contains("13"));
    }

    #[test]
    fn error_equality() {
        let a = BitError::InvalidBitCount {
            bits: 65,
            max_bits: 64,
        };
        let b = BitError::InvalidBitCount {
            bits: 65,
            max_bits: 64,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&BitError::MisalignedAccess { bit_position: 1 });
    }
}
