use std::sync::Arc;

use codec::{CodecLimits, MessageReplicator};
use proptest::prelude::*;
use schema::{reflect_struct, DataModelRepository, Reflect, Symbol, TypeInfo, TypeRegistry};

#[derive(Debug, Default, Clone, PartialEq)]
struct Inventory {
    slots: Vec<u16>,
    tag: Symbol,
    note: String,
    locked: bool,
}

reflect_struct!(Inventory {
    slots: Vec<u16> = "u:10,maxCount:16",
    tag: Symbol = "",
    note: String = "maxLength:32",
    locked: bool = "b",
});

fn inventory() -> impl Strategy<Value = Inventory> {
    (
        prop::collection::vec(0u16..1024, 0..16),
        prop::sample::select(vec!["", "sword", "shield", "potion"]),
        "[a-z ]{0,32}",
        any::<bool>(),
    )
        .prop_map(|(slots, tag, note, locked)| Inventory {
            slots,
            tag: Symbol::new(tag),
            note,
            locked,
        })
}

fn peers() -> (MessageReplicator, MessageReplicator) {
    let repository = Arc::new(DataModelRepository::new());
    let sender = MessageReplicator::new(Arc::clone(&repository), Arc::new(TypeRegistry::new()))
        .with_limits(CodecLimits::for_testing());
    let receiver = MessageReplicator::new(repository, Arc::new(TypeRegistry::new()))
        .with_limits(CodecLimits::for_testing())
        .with_error_hook(|_| {});
    receiver.register_type::<Inventory>();
    (sender, receiver)
}

fn relay(sender: &MessageReplicator, receiver: &MessageReplicator, message: &Inventory) -> Vec<Inventory> {
    let mut frames = Vec::new();
    sender
        .send(message, &mut |frame: &[u8]| frames.push(frame.to_vec()))
        .unwrap();
    let mut received = Vec::new();
    for frame in &frames {
        receiver.process_message_data(frame, &mut |message: Box<dyn Reflect>, _: &'static TypeInfo| {
            if let Some(inventory) = message.downcast_ref::<Inventory>() {
                received.push(inventory.clone());
            }
        });
    }
    received
}

proptest! {
    #[test]
    fn messages_loop_back(messages in prop::collection::vec(inventory(), 1..8)) {
        let (sender, receiver) = peers();
        for message in &messages {
            let received = relay(&sender, &receiver, message);
            prop_assert_eq!(received, vec![message.clone()]);
        }
    }

    #[test]
    fn garbage_never_breaks_later_messages(
        message in inventory(),
        garbage in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 0..8),
    ) {
        let (sender, receiver) = peers();
        prop_assert_eq!(relay(&sender, &receiver, &message), vec![message.clone()]);
        for frame in &garbage {
            receiver.process_message_data(frame, &mut |_: Box<dyn Reflect>, _: &'static TypeInfo| {});
        }
        // Garbage may announce new ids but cannot rebind the ones already in use.
        prop_assert_eq!(relay(&sender, &receiver, &message), vec![message]);
    }
}
