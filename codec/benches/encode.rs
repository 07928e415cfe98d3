#![allow(missing_docs)]
use std::hint::black_box;
use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use codec::{decode_to_native, encode_from_native, CodecLimits, KnowledgeBase, MessageReplicator};
use criterion::{criterion_group, criterion_main, Criterion};
use schema::{reflect_struct, DataModelRepository, Symbol, TypeRegistry};

#[derive(Debug, Default, Clone)]
#[repr(C)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

reflect_struct!(Vec3 {
    x: f32 = "",
    y: f32 = "",
    z: f32 = "",
});

#[derive(Debug, Default, Clone)]
struct Unit {
    position: Vec3,
    facing: Vec3,
    health: u16,
    team: Symbol,
    waypoints: Vec<Vec3>,
}

reflect_struct!(object Unit {
    position: Vec3 = "pos",
    facing: Vec3 = "dir",
    health: u16 = "u:10",
    team: Symbol = "",
    waypoints: Vec<Vec3> = "delta,64,maxCount:8",
});

fn unit() -> Unit {
    Unit {
        position: Vec3 {
            x: 120.5,
            y: -40.25,
            z: 8.0,
        },
        facing: Vec3 {
            x: 0.0,
            y: 1.0,
            z: 0.0,
        },
        health: 750,
        team: Symbol::new("red"),
        waypoints: (0..8)
            .map(|i| Vec3 {
                x: i as f32,
                y: -(i as f32),
                z: 0.5,
            })
            .collect(),
    }
}

fn bench_native(c: &mut Criterion) {
    let repository = DataModelRepository::new();
    let model = repository.model_for::<Unit>().expect("unit model");
    let value = unit();
    let mut knowledge = KnowledgeBase::default();

    let mut writer = BitWriter::new();
    encode_from_native(&model, &value, &mut knowledge, &mut writer).expect("encode");
    let bytes = writer.finish();

    let mut receiver = KnowledgeBase::default();
    for update in knowledge.drain_updates() {
        if let codec::DictionaryUpdate::String { id, text } = update {
            receiver.apply_string_update(id, &text).expect("apply");
        }
    }
    let types = TypeRegistry::new();
    let limits = CodecLimits::default();

    let mut group = c.benchmark_group("native");
    group.bench_function("encode_unit", |b| {
        let mut buf = [0u8; 256];
        b.iter(|| {
            let mut writer = BitWriter::over(&mut buf);
            encode_from_native(&model, black_box(&value), &mut knowledge, &mut writer)
                .expect("encode");
            black_box(writer.bytes_written());
        });
    });
    group.bench_function("decode_unit", |b| {
        let resolver = receiver.resolver(&types);
        let mut out = Unit::default();
        b.iter(|| {
            let mut reader = BitReader::new(black_box(&bytes));
            decode_to_native(&model, &mut out, &resolver, &limits, &mut reader).expect("decode");
        });
    });
    group.finish();
}

fn bench_replicator(c: &mut Criterion) {
    let repository = Arc::new(DataModelRepository::new());
    let replicator = MessageReplicator::new(repository, Arc::new(TypeRegistry::new()));
    let value = unit();

    c.bench_function("replicator_send", |b| {
        b.iter(|| {
            let mut total = 0;
            replicator
                .send(black_box(&value), &mut |frame: &[u8]| total += frame.len())
                .expect("send");
            black_box(total);
        });
    });
}

criterion_group!(benches, bench_native, bench_replicator);
criterion_main!(benches);
