//! Frame discriminators and fixed-size frame headers.
//!
//! Every multi-byte header field is little-endian.

use std::fmt;

use crate::error::DecodeError;

/// Discriminator of a string-table update frame.
pub const STRING_UPDATE: u8 = 0xAB;

/// Discriminator of a path-table update frame.
pub const PATH_UPDATE: u8 = 0xCC;

/// Discriminator of a call frame.
pub const CALL: u8 = 0x42;

/// String update header size in bytes: discriminator and id.
pub const STRING_UPDATE_HEADER_SIZE: usize = 1 + 2;

/// Path update header size in bytes: discriminator, id, text id and parent id.
pub const PATH_UPDATE_HEADER_SIZE: usize = 1 + 2 + 2 + 2;

/// Call header size in bytes: discriminator and message type id.
pub const CALL_HEADER_SIZE: usize = 1 + 2;

/// Kind of a replication frame, selected by its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    StringUpdate = STRING_UPDATE,
    PathUpdate = PATH_UPDATE,
    Call = CALL,
}

impl FrameKind {
    /// Parses a frame kind from its discriminator byte.
    pub const fn parse(discriminator: u8) -> Result<Self, DecodeError> {
        match discriminator {
            STRING_UPDATE => Ok(Self::StringUpdate),
            PATH_UPDATE => Ok(Self::PathUpdate),
            CALL => Ok(Self::Call),
            found => Err(DecodeError::UnknownFrameKind { found }),
        }
    }

    /// Size of this kind's fixed header.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            Self::StringUpdate => STRING_UPDATE_HEADER_SIZE,
            Self::PathUpdate => PATH_UPDATE_HEADER_SIZE,
            Self::Call => CALL_HEADER_SIZE,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StringUpdate => "string update",
            Self::PathUpdate => "path update",
            Self::Call => "call",
        };
        f.write_str(name)
    }
}

/// Header of a string update. The UTF-8 text follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringUpdateHeader {
    pub id: u16,
}

/// Header of a path update. Path updates carry no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathUpdateHeader {
    pub id: u16,
    /// String-table id of this path segment.
    pub text_id: u16,
    /// Path-table id of the parent path, zero for a root segment.
    pub parent_id: u16,
}

/// Header of a call. The encoded payload follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallHeader {
    /// Path-table id of the message type name.
    pub message_type_id: u16,
}

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub(crate) fn write_u16(out: &mut [u8], offset: usize, value: u16) {
    out[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}
