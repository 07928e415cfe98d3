#![no_main]

use std::sync::{Arc, OnceLock};

use codec::{CodecLimits, MessageReplicator, WireLimits};
use libfuzzer_sys::fuzz_target;
use schema::{reflect_struct, DataModelRepository, Reflect, ResourceRef, Symbol, TypeInfo, TypeRegistry};

#[derive(Debug, Default)]
struct Fragment {
    flags: Vec<bool>,
    tag: Symbol,
    text: String,
    icon: ResourceRef,
    children: Vec<Fragment>,
}

reflect_struct!(Fragment {
    flags: Vec<bool> = "b,maxCount:8",
    tag: Symbol = "",
    text: String = "maxLength:16",
    icon: ResourceRef = "",
    children: Vec<Fragment> = "maxCount:2",
});

fn repository() -> Arc<DataModelRepository> {
    static REPOSITORY: OnceLock<Arc<DataModelRepository>> = OnceLock::new();
    Arc::clone(REPOSITORY.get_or_init(|| Arc::new(DataModelRepository::new())))
}

fuzz_target!(|data: &[u8]| {
    let receiver = MessageReplicator::new(repository(), Arc::new(TypeRegistry::new()))
        .with_limits(CodecLimits::for_testing())
        .with_wire_limits(WireLimits::for_testing())
        .with_error_hook(|_| {});
    receiver.register_type::<Fragment>();

    // Length-prefixed frames share one replicator so dictionary state carries over.
    let mut idx = 0usize;
    while idx < data.len() && idx < 4096 {
        let len = (data[idx] as usize % 120).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(data.len());
        let frame = &data[idx..end];
        idx = end;
        receiver.process_message_data(frame, &mut |_: Box<dyn Reflect>, _: &'static TypeInfo| {});
    }
});
