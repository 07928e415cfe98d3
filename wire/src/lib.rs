//! Frame layout for the replica codec.
//!
//! This crate handles the byte-level framing of replication traffic: frame
//! discriminators, fixed-size headers and limit enforcement. It does not know
//! about data models or dictionaries, only the structure of frames.
//!
//! | frame | layout |
//! |---|---|
//! | string update | `0xAB`, `u16 id`, UTF-8 text |
//! | path update | `0xCC`, `u16 id`, `u16 text id`, `u16 parent id` |
//! | call | `0x42`, `u16 message type id`, payload |
//!
//! # Design Principles
//!
//! - **Stable wire format** - Header fields are little-endian and never reordered.
//! - **Bounded decoding** - Every frame is checked against its header size and [`Limits`] first.
//! - **No domain knowledge** - This crate handles framing, not replication state.

mod error;
mod frame;
mod header;
mod limits;

pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use frame::{
    decode_frame, encode_call, encode_path_update, encode_string_update, string_update_len, Frame,
};
pub use header::{
    CallHeader, FrameKind, PathUpdateHeader, StringUpdateHeader, CALL, CALL_HEADER_SIZE,
    PATH_UPDATE, PATH_UPDATE_HEADER_SIZE, STRING_UPDATE, STRING_UPDATE_HEADER_SIZE,
};
pub use limits::Limits;
