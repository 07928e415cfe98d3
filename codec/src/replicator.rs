//! Message replication over a pair of per-connection dictionaries.

use std::fmt;
use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use parking_lot::Mutex;
use schema::{DataModel, DataModelRepository, Reflect, TypeInfo, TypeRegistry, Typed};
use tracing::{trace, warn};
use wire::{
    CallHeader, Frame, Limits as WireLimits, PathUpdateHeader, StringUpdateHeader,
    CALL_HEADER_SIZE, PATH_UPDATE_HEADER_SIZE,
};

use crate::error::{CodecError, CodecResult, DictionaryTable};
use crate::knowledge::{DictionaryUpdate, KnowledgeBase};
use crate::limits::CodecLimits;
use crate::mapping::{DataModelMapper, DataModelResolver, MappedId, TYPE_PATH_SEPARATOR};
use crate::native::{decode_to_native, encode_from_native};

/// Receives frames ready for transport.
pub trait MessageSink {
    fn send_frame(&mut self, frame: &[u8]);
}

impl<F: FnMut(&[u8])> MessageSink for F {
    fn send_frame(&mut self, frame: &[u8]) {
        self(frame);
    }
}

/// Receives decoded messages.
pub trait MessageDispatcher {
    fn dispatch(&mut self, message: Box<dyn Reflect>, ty: &'static TypeInfo);
}

impl<F: FnMut(Box<dyn Reflect>, &'static TypeInfo)> MessageDispatcher for F {
    fn dispatch(&mut self, message: Box<dyn Reflect>, ty: &'static TypeInfo) {
        self(message, ty);
    }
}

/// Callback for frames that could not be processed.
pub type ErrorHook = Box<dyn Fn(&CodecError) + Send + Sync>;

/// Sends and receives typed messages for one connection.
///
/// Each replicator owns an outgoing and an incoming [`KnowledgeBase`]. The
/// outgoing one stays locked from the first id allocation of a send until its
/// call frame has reached the sink, so concurrent sends cannot announce ids
/// out of order.
///
/// ```
/// use std::sync::Arc;
/// use codec::MessageReplicator;
/// use schema::{reflect_struct, DataModelRepository, Reflect, TypeInfo, TypeRegistry};
///
/// #[derive(Debug, Default)]
/// struct Ping {
///     seq: u16,
/// }
///
/// reflect_struct!(Ping { seq: u16 = "" });
///
/// let repository = Arc::new(DataModelRepository::new());
/// let sender = MessageReplicator::new(Arc::clone(&repository), Arc::new(TypeRegistry::new()));
/// let receiver = MessageReplicator::new(repository, Arc::new(TypeRegistry::new()));
/// receiver.register_type::<Ping>();
///
/// let mut frames = Vec::new();
/// sender.send(&Ping { seq: 7 }, &mut |frame: &[u8]| frames.push(frame.to_vec())).unwrap();
///
/// let mut received = Vec::new();
/// for frame in &frames {
///     assert!(receiver.process_message_data(frame, &mut |message: Box<dyn Reflect>, _: &'static TypeInfo| {
///         received.push(message.downcast_ref::<Ping>().unwrap().seq);
///     }));
/// }
/// assert_eq!(received, vec![7]);
/// ```
pub struct MessageReplicator {
    repository: Arc<DataModelRepository>,
    types: Arc<TypeRegistry>,
    outgoing: Mutex<KnowledgeBase>,
    incoming: Mutex<KnowledgeBase>,
    limits: CodecLimits,
    wire_limits: WireLimits,
    error_hook: ErrorHook,
}

impl MessageReplicator {
    /// Creates a replicator sharing `repository` and resolving received types through `types`.
    #[must_use]
    pub fn new(repository: Arc<DataModelRepository>, types: Arc<TypeRegistry>) -> Self {
        let limits = CodecLimits::default();
        Self {
            repository,
            types,
            outgoing: Mutex::new(KnowledgeBase::new(&limits)),
            incoming: Mutex::new(KnowledgeBase::new(&limits)),
            limits,
            wire_limits: WireLimits::default(),
            error_hook: Box::new(|err| warn!(%err, "dropped replication frame")),
        }
    }

    /// Replaces the codec limits. Both dictionaries start over.
    #[must_use]
    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        let mut outgoing = KnowledgeBase::new(&limits);
        outgoing.set_string_update_limits(&self.wire_limits);
        self.outgoing = Mutex::new(outgoing);
        self.incoming = Mutex::new(KnowledgeBase::new(&limits));
        self.limits = limits;
        self
    }

    /// Replaces the frame limits. Strings too long to announce under them
    /// are refused when first mapped.
    #[must_use]
    pub fn with_wire_limits(mut self, wire_limits: WireLimits) -> Self {
        self.outgoing.get_mut().set_string_update_limits(&wire_limits);
        self.wire_limits = wire_limits;
        self
    }

    /// Replaces the hook that receives errors of dropped frames.
    #[must_use]
    pub fn with_error_hook(mut self, hook: impl Fn(&CodecError) + Send + Sync + 'static) -> Self {
        self.error_hook = Box::new(hook);
        self
    }

    /// Makes `T` and the types it reaches known to the receiving side.
    pub fn register_type<T: Typed>(&self) {
        self.types.register::<T>();
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<DataModelRepository> {
        &self.repository
    }

    #[must_use]
    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Runs `f` with the outgoing dictionary locked.
    pub fn with_outgoing<R>(&self, f: impl FnOnce(&mut KnowledgeBase) -> R) -> R {
        f(&mut self.outgoing.lock())
    }

    /// Runs `f` with the incoming dictionary locked.
    pub fn with_incoming<R>(&self, f: impl FnOnce(&mut KnowledgeBase) -> R) -> R {
        f(&mut self.incoming.lock())
    }

    /// Encodes `message` and hands the resulting frames to `sink`.
    pub fn send<T: Typed>(&self, message: &T, sink: &mut dyn MessageSink) -> CodecResult<()> {
        self.send_dyn(message, sink)
    }

    /// Encodes a reflected message and hands the resulting frames to `sink`.
    ///
    /// Dictionary updates go out first. They are sent even when encoding the
    /// payload fails, since their ids are already allocated.
    pub fn send_dyn(&self, message: &dyn Reflect, sink: &mut dyn MessageSink) -> CodecResult<()> {
        let info = message.reflected_type();
        let model = self.repository.build_model_for_type(info)?;

        let mut outgoing = self.outgoing.lock();
        let encoded = encode_message(&model, message, &mut outgoing);
        let flushed = self.flush_updates(&mut outgoing, sink);
        let (type_id, payload) = encoded?;
        flushed?;

        let header = CallHeader {
            message_type_id: frame_id(DictionaryTable::Path, type_id)?,
        };
        let mut frame = vec![0u8; CALL_HEADER_SIZE + payload.len()];
        wire::encode_call(&header, &payload, &self.wire_limits, &mut frame)?;
        sink.send_frame(&frame);
        trace!(
            message = info.name(),
            type_id,
            bytes = frame.len(),
            "sent call frame"
        );
        Ok(())
    }

    /// Processes one received frame.
    ///
    /// Returns `false` if the frame was dropped; the error goes to the error hook.
    /// Dictionary entries from earlier frames are never rolled back.
    pub fn process_message_data(
        &self,
        frame: &[u8],
        dispatcher: &mut dyn MessageDispatcher,
    ) -> bool {
        match self.process_frame(frame, dispatcher) {
            Ok(()) => true,
            Err(err) => {
                (self.error_hook)(&err);
                false
            }
        }
    }

    fn process_frame(
        &self,
        frame: &[u8],
        dispatcher: &mut dyn MessageDispatcher,
    ) -> CodecResult<()> {
        match wire::decode_frame(frame, &self.wire_limits)? {
            Frame::StringUpdate { header, text } => {
                self.incoming
                    .lock()
                    .apply_string_update(MappedId::from(header.id), text)?;
            }
            Frame::PathUpdate(header) => {
                self.incoming.lock().apply_path_update(
                    MappedId::from(header.id),
                    MappedId::from(header.text_id),
                    MappedId::from(header.parent_id),
                )?;
            }
            Frame::Call { header, payload } => {
                let (message, info) = self.decode_call(header, payload)?;
                trace!(message = info.name(), "dispatching call");
                dispatcher.dispatch(message, info);
            }
        }
        Ok(())
    }

    fn decode_call(
        &self,
        header: CallHeader,
        payload: &[u8],
    ) -> CodecResult<(Box<dyn Reflect>, &'static TypeInfo)> {
        let incoming = self.incoming.lock();
        let resolver = incoming.resolver(&self.types);
        let type_id = MappedId::from(header.message_type_id);
        let info = resolver
            .resolve_type_ref(type_id)?
            .info()
            .ok_or(CodecError::UnknownPath { id: type_id })?;
        let model = self.repository.build_model_for_type(info)?;
        let mut message = info
            .create_instance()
            .ok_or_else(|| CodecError::NotConstructible {
                name: info.name().to_owned(),
            })?;
        let mut reader = BitReader::new(payload);
        decode_to_native(&model, message.as_mut(), &resolver, &self.limits, &mut reader)?;
        Ok((message, info))
    }

    /// Announces queued updates in order. On failure the failed update and
    /// everything after it stay queued, so no later frame refers to an id the
    /// peer was never told about.
    fn flush_updates(
        &self,
        outgoing: &mut KnowledgeBase,
        sink: &mut dyn MessageSink,
    ) -> CodecResult<()> {
        let mut updates = outgoing.drain_updates().into_iter();
        while let Some(update) = updates.next() {
            if let Err(err) = self.send_update(&update, sink) {
                let mut unsent = vec![update];
                unsent.extend(updates);
                outgoing.requeue_updates(unsent);
                return Err(err);
            }
        }
        Ok(())
    }

    fn send_update(&self, update: &DictionaryUpdate, sink: &mut dyn MessageSink) -> CodecResult<()> {
        match update {
            DictionaryUpdate::String { id, text } => {
                let header = StringUpdateHeader {
                    id: frame_id(DictionaryTable::String, *id)?,
                };
                let mut frame = vec![0u8; wire::string_update_len(text)];
                wire::encode_string_update(&header, text, &self.wire_limits, &mut frame)?;
                trace!(id, text = text.as_str(), "sent string update");
                sink.send_frame(&frame);
            }
            DictionaryUpdate::Path {
                id,
                text_id,
                parent_id,
            } => {
                let header = PathUpdateHeader {
                    id: frame_id(DictionaryTable::Path, *id)?,
                    text_id: frame_id(DictionaryTable::String, *text_id)?,
                    parent_id: frame_id(DictionaryTable::Path, *parent_id)?,
                };
                let mut frame = [0u8; PATH_UPDATE_HEADER_SIZE];
                wire::encode_path_update(&header, &mut frame)?;
                trace!(id, text_id, parent_id, "sent path update");
                sink.send_frame(&frame);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MessageReplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageReplicator")
            .field("limits", &self.limits)
            .field("wire_limits", &self.wire_limits)
            .finish_non_exhaustive()
    }
}

fn encode_message(
    model: &DataModel,
    message: &dyn Reflect,
    outgoing: &mut KnowledgeBase,
) -> CodecResult<(MappedId, Vec<u8>)> {
    let type_id = outgoing.map_path(message.reflected_type().name(), TYPE_PATH_SEPARATOR)?;
    let mut writer = BitWriter::new();
    encode_from_native(model, message, outgoing, &mut writer)?;
    Ok((type_id, writer.finish()))
}

fn frame_id(table: DictionaryTable, id: MappedId) -> CodecResult<u16> {
    u16::try_from(id).map_err(|_| CodecError::DictionaryFull {
        table,
        limit: usize::from(u16::MAX),
    })
}
