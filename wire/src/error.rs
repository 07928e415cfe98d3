//! Error types for frame encoding and decoding.

use thiserror::Error;

use crate::header::FrameKind;

/// Result type for frame decoding.
pub type WireResult<T> = Result<T, DecodeError>;

/// Errors from decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The frame has no discriminator byte.
    #[error("empty frame")]
    EmptyFrame,

    /// The first byte is not a known frame discriminator.
    #[error("unknown frame discriminator: 0x{found:02X}")]
    UnknownFrameKind { found: u8 },

    /// The frame is shorter than its header.
    #[error("{kind} frame too small: {actual} bytes, need at least {required}")]
    FrameTooSmall {
        kind: FrameKind,
        actual: usize,
        required: usize,
    },

    /// A path update frame carries bytes after its header.
    #[error("{kind} frame has {extra} trailing bytes")]
    TrailingBytes { kind: FrameKind, extra: usize },

    /// String update text is not valid UTF-8.
    #[error("string update {id} is not valid UTF-8 at byte {valid_up_to}")]
    InvalidUtf8 { id: u16, valid_up_to: usize },

    /// Limits exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimitKind {
    #[error("frame bytes")]
    FrameBytes,
    #[error("string update bytes")]
    StringUpdateBytes,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("buffer too small: need {needed}, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display_unknown_kind() {
        let err = DecodeError::UnknownFrameKind { found: 0x7F };
        assert!(err.to_string().contains("0x7F"));
    }

    #[test]
    fn decode_error_display_too_small() {
        let err = DecodeError::FrameTooSmall {
            kind: FrameKind::PathUpdate,
            actual: 3,
            required: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("path update"));
        assert!(msg.contains("need at least 7"));
    }

    #[test]
    fn decode_error_display_limits_exceeded() {
        let err = DecodeError::LimitsExceeded {
            kind: LimitKind::FrameBytes,
            limit: 4,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("frame bytes"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn encode_error_display() {
        let err = EncodeError::BufferTooSmall {
            needed: 10,
            available: 4,
        };
        assert!(err.to_string().contains("buffer too small"));
    }
}
