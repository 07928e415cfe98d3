//! Deterministic model checksums.

use blake3::Hasher;

use crate::model::{DataModelField, DataModelFieldType, DataModelKind};
use crate::packing::{FieldPacking, PackingMode};

/// Computes a layout checksum over a model's name, kind and fields.
///
/// Only wire-relevant data is hashed: native offsets and sizes are left out
/// so that peers built for different targets still agree.
pub(crate) fn model_checksum(name: &str, kind: DataModelKind, fields: &[DataModelField]) -> u64 {
    let mut hasher = Hasher::new();
    write_str(&mut hasher, name);
    write_u8(&mut hasher, kind_tag(kind));
    write_u32(&mut hasher, fields.len() as u32);

    for field in fields {
        write_str(&mut hasher, field.native_name());
        write_u8(&mut hasher, field_type_tag(field.field_type()));
        write_u8(&mut hasher, u8::from(field.is_array()));
        write_str(&mut hasher, field.native_type().name());
        write_packing(&mut hasher, field.packing());
        if let Some(nested) = field.nested_model() {
            write_str(&mut hasher, nested.name());
        }
    }

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn kind_tag(kind: DataModelKind) -> u8 {
    match kind {
        DataModelKind::Object => 0,
        DataModelKind::Struct => 1,
        DataModelKind::Function => 2,
    }
}

fn field_type_tag(field_type: DataModelFieldType) -> u8 {
    match field_type {
        DataModelFieldType::Packed => 0,
        DataModelFieldType::Struct => 1,
        DataModelFieldType::StringId => 2,
        DataModelFieldType::StringBuf => 3,
        DataModelFieldType::TypeRef => 4,
        DataModelFieldType::ObjectPtr => 5,
        DataModelFieldType::WeakObjectPtr => 6,
        DataModelFieldType::ResourceRef => 7,
    }
}

fn mode_tag(mode: PackingMode) -> u8 {
    match mode {
        PackingMode::Default => 0,
        PackingMode::Bit => 1,
        PackingMode::Unsigned => 2,
        PackingMode::Signed => 3,
        PackingMode::RangeFloat => 4,
        PackingMode::Position => 5,
        PackingMode::DeltaPosition => 6,
        PackingMode::NormalFull => 7,
        PackingMode::NormalRough => 8,
        PackingMode::PitchYaw => 9,
        PackingMode::AllAngles => 10,
    }
}

// Frequency is a scheduling hint and does not change the encoding.
fn write_packing(hasher: &mut Hasher, packing: &FieldPacking) {
    write_u8(hasher, mode_tag(packing.mode));
    write_u8(hasher, packing.quantization.bit_count());
    write_u32(hasher, packing.quantization.min().to_bits());
    write_u32(hasher, packing.quantization.max().to_bits());
    write_u16(hasher, packing.max_length);
    write_u16(hasher, packing.max_count);
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u16(hasher: &mut Hasher, value: u16) {
    hasher.update(&value.to_le_bytes());
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
