//! Frame decoding and encoding.

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{
    read_u16, write_u16, CallHeader, FrameKind, PathUpdateHeader, StringUpdateHeader, CALL,
    CALL_HEADER_SIZE, PATH_UPDATE, PATH_UPDATE_HEADER_SIZE, STRING_UPDATE,
    STRING_UPDATE_HEADER_SIZE,
};
use crate::limits::Limits;

/// A decoded replication frame borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Announces `header.id` as the string `text`.
    StringUpdate {
        header: StringUpdateHeader,
        text: &'a str,
    },
    /// Announces a path-table entry.
    PathUpdate(PathUpdateHeader),
    /// A call carrying an encoded message payload.
    Call {
        header: CallHeader,
        payload: &'a [u8],
    },
}

impl Frame<'_> {
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        match self {
            Self::StringUpdate { .. } => FrameKind::StringUpdate,
            Self::PathUpdate(_) => FrameKind::PathUpdate,
            Self::Call { .. } => FrameKind::Call,
        }
    }
}

/// Decodes one frame.
///
/// The header is validated against its kind's size and `limits` before any
/// body is looked at. Path updates must be exactly header-sized.
pub fn decode_frame<'a>(buf: &'a [u8], limits: &Limits) -> WireResult<Frame<'a>> {
    let Some(&discriminator) = buf.first() else {
        return Err(DecodeError::EmptyFrame);
    };
    if buf.len() > limits.max_frame_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::FrameBytes,
            limit: limits.max_frame_bytes,
            actual: buf.len(),
        });
    }

    let kind = FrameKind::parse(discriminator)?;
    let required = kind.header_size();
    if buf.len() < required {
        return Err(DecodeError::FrameTooSmall {
            kind,
            actual: buf.len(),
            required,
        });
    }

    match kind {
        FrameKind::StringUpdate => {
            let id = read_u16(buf, 1);
            let raw = &buf[STRING_UPDATE_HEADER_SIZE..];
            if raw.len() > limits.max_string_update_bytes {
                return Err(DecodeError::LimitsExceeded {
                    kind: LimitKind::StringUpdateBytes,
                    limit: limits.max_string_update_bytes,
                    actual: raw.len(),
                });
            }
            let text = std::str::from_utf8(raw).map_err(|err| DecodeError::InvalidUtf8 {
                id,
                valid_up_to: err.valid_up_to(),
            })?;
            Ok(Frame::StringUpdate {
                header: StringUpdateHeader { id },
                text,
            })
        }
        FrameKind::PathUpdate => {
            if buf.len() > PATH_UPDATE_HEADER_SIZE {
                return Err(DecodeError::TrailingBytes {
                    kind,
                    extra: buf.len() - PATH_UPDATE_HEADER_SIZE,
                });
            }
            Ok(Frame::PathUpdate(PathUpdateHeader {
                id: read_u16(buf, 1),
                text_id: read_u16(buf, 3),
                parent_id: read_u16(buf, 5),
            }))
        }
        FrameKind::Call => Ok(Frame::Call {
            header: CallHeader {
                message_type_id: read_u16(buf, 1),
            },
            payload: &buf[CALL_HEADER_SIZE..],
        }),
    }
}

/// Encoded size of a string update carrying `text`.
#[must_use]
pub const fn string_update_len(text: &str) -> usize {
    STRING_UPDATE_HEADER_SIZE + text.len()
}

/// Encodes a string update into `out`, returning the bytes written.
pub fn encode_string_update(
    header: &StringUpdateHeader,
    text: &str,
    limits: &Limits,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    if text.len() > limits.max_string_update_bytes {
        return Err(EncodeError::LimitsExceeded {
            kind: LimitKind::StringUpdateBytes,
            limit: limits.max_string_update_bytes,
            actual: text.len(),
        });
    }
    let needed = string_update_len(text);
    check_frame(needed, limits, out)?;

    out[0] = STRING_UPDATE;
    write_u16(out, 1, header.id);
    out[STRING_UPDATE_HEADER_SIZE..needed].copy_from_slice(text.as_bytes());
    Ok(needed)
}

/// Encodes a path update into `out`, returning the bytes written.
pub fn encode_path_update(
    header: &PathUpdateHeader,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    check_buffer(PATH_UPDATE_HEADER_SIZE, out)?;

    out[0] = PATH_UPDATE;
    write_u16(out, 1, header.id);
    write_u16(out, 3, header.text_id);
    write_u16(out, 5, header.parent_id);
    Ok(PATH_UPDATE_HEADER_SIZE)
}

/// Encodes a call header followed by `payload` into `out`, returning the bytes written.
pub fn encode_call(
    header: &CallHeader,
    payload: &[u8],
    limits: &Limits,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let needed = CALL_HEADER_SIZE + payload.len();
    check_frame(needed, limits, out)?;

    out[0] = CALL;
    write_u16(out, 1, header.message_type_id);
    out[CALL_HEADER_SIZE..needed].copy_from_slice(payload);
    Ok(needed)
}

fn check_frame(needed: usize, limits: &Limits, out: &[u8]) -> Result<(), EncodeError> {
    if needed > limits.max_frame_bytes {
        return Err(EncodeError::LimitsExceeded {
            kind: LimitKind::FrameBytes,
            limit: limits.max_frame_bytes,
            actual: needed,
        });
    }
    check_buffer(needed, out)
}

fn check_buffer(needed: usize, out: &[u8]) -> Result<(), EncodeError> {
    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }
    Ok(())
}
