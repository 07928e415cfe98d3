//! Schema-driven message replication for the replica codec.
//!
//! This crate ties together bitstream, wire, and schema:
//! - [`encode_from_native`] / [`decode_to_native`] move reflected values through a [`schema::DataModel`]
//! - [`KnowledgeBase`] assigns compact ids to strings, paths and shared objects
//! - [`MessageReplicator`] turns typed messages into frames and back
//!
//! # Design Principles
//!
//! - **Ids, not text** - Repeated strings and paths cross the wire once.
//! - **Drop, don't crash** - A malformed frame is reported and ignored; earlier state survives.
//! - **Bounded decoding** - Counts, lengths and depths from the peer are checked against [`CodecLimits`].

mod error;
mod knowledge;
mod limits;
mod mapping;
mod native;
mod replicator;

pub use error::{CodecError, CodecResult, DictionaryTable, LimitKind};
pub use knowledge::{DictionaryUpdate, KnowledgeBase, KnowledgeResolver};
pub use limits::CodecLimits;
pub use mapping::{
    DataModelMapper, DataModelResolver, MappedId, RESOURCE_PATH_SEPARATOR, TYPE_PATH_SEPARATOR,
};
pub use native::{decode_call, decode_to_native, encode_call, encode_from_native};
pub use replicator::{ErrorHook, MessageDispatcher, MessageReplicator, MessageSink};
pub use wire::Limits as WireLimits;
