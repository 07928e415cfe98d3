//! Moving native values through a data model.
//!
//! Fields are visited in model order. Arrays are an adaptive count followed
//! by their elements; strings are `bit(has data)` then an adaptive length,
//! alignment and the raw bytes. Every reference kind is an adaptive id
//! obtained from the mapper.

use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use schema::{
    DataModel, DataModelField, DataModelFieldType, DataModelKind, ObjectRef, Reflect, ResourceRef,
    Symbol, TypeRef, WeakObjectRef,
};
use tracing::warn;

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::mapping::{DataModelMapper, DataModelResolver, MappedId, RESOURCE_PATH_SEPARATOR};

/// Encodes `value` through `model`.
///
/// Strings longer than their `maxLength` and arrays longer than their
/// `maxCount` are cut and logged, not rejected.
pub fn encode_from_native(
    model: &DataModel,
    value: &dyn Reflect,
    mapper: &mut dyn DataModelMapper,
    writer: &mut BitWriter<'_>,
) -> CodecResult<()> {
    check_model(model, value)?;
    for field in model.fields() {
        let slot = value
            .field(field.native_index())
            .ok_or_else(|| type_mismatch(field, value))?;
        encode_field(field, slot, mapper, writer)?;
    }
    Ok(())
}

/// Decodes into `value` through `model`.
///
/// The destination must already exist; arrays are resized to the decoded count.
/// Structures nested deeper than [`CodecLimits::max_nesting_depth`] are
/// rejected before they are entered.
pub fn decode_to_native(
    model: &DataModel,
    value: &mut dyn Reflect,
    resolver: &dyn DataModelResolver,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
) -> CodecResult<()> {
    decode_struct(model, value, resolver, limits, reader, 0)
}

/// Encodes call arguments through a function model.
pub fn encode_call(
    model: &DataModel,
    args: &[&dyn Reflect],
    mapper: &mut dyn DataModelMapper,
    writer: &mut BitWriter<'_>,
) -> CodecResult<()> {
    for field in model.fields() {
        let index = field.native_index();
        let arg = args
            .get(index)
            .ok_or(CodecError::ArgumentCountMismatch {
                index,
                actual: args.len(),
            })?;
        encode_field(field, *arg, mapper, writer)?;
    }
    Ok(())
}

/// Decodes call arguments through a function model.
pub fn decode_call(
    model: &DataModel,
    args: &mut [&mut dyn Reflect],
    resolver: &dyn DataModelResolver,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
) -> CodecResult<()> {
    let actual = args.len();
    for field in model.fields() {
        let index = field.native_index();
        let arg = args
            .get_mut(index)
            .ok_or(CodecError::ArgumentCountMismatch { index, actual })?;
        decode_field(field, &mut **arg, resolver, limits, reader, 0)?;
    }
    Ok(())
}

fn decode_struct(
    model: &DataModel,
    value: &mut dyn Reflect,
    resolver: &dyn DataModelResolver,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
    depth: usize,
) -> CodecResult<()> {
    check_model(model, value)?;
    for field in model.fields() {
        match value.field_mut(field.native_index()) {
            Some(slot) => decode_field(field, slot, resolver, limits, reader, depth)?,
            None => return Err(type_mismatch(field, value)),
        }
    }
    Ok(())
}

fn check_model(model: &DataModel, value: &dyn Reflect) -> CodecResult<()> {
    let found = value.reflected_type().name();
    if model.kind() != DataModelKind::Function && found != model.name() {
        return Err(CodecError::TypeMismatch {
            field: String::new(),
            expected: model.name().to_owned(),
            found: found.to_owned(),
        });
    }
    Ok(())
}

fn encode_field(
    field: &DataModelField,
    value: &dyn Reflect,
    mapper: &mut dyn DataModelMapper,
    writer: &mut BitWriter<'_>,
) -> CodecResult<()> {
    if !field.is_array() {
        return encode_value(field, value, mapper, writer);
    }

    let array = value.as_array().ok_or_else(|| type_mismatch(field, value))?;
    let max_count = usize::from(field.packing().max_count);
    let mut count = array.len();
    if max_count > 0 && count > max_count {
        warn!(
            field = field.native_name(),
            count, max_count, "array clamped to maxCount"
        );
        count = max_count;
    }
    writer.write_adaptive_number(count as u64)?;
    for index in 0..count {
        let element = array
            .element(index)
            .ok_or_else(|| type_mismatch(field, value))?;
        encode_value(field, element, mapper, writer)?;
    }
    Ok(())
}

fn decode_field(
    field: &DataModelField,
    value: &mut dyn Reflect,
    resolver: &dyn DataModelResolver,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
    depth: usize,
) -> CodecResult<()> {
    if !field.is_array() {
        return decode_value(field, value, resolver, limits, reader, depth);
    }

    let raw = reader.read_adaptive_number()?;
    let max_count = usize::from(field.packing().max_count);
    let limit = if max_count > 0 {
        max_count.min(limits.max_array_count)
    } else {
        limits.max_array_count
    };
    let count = usize::try_from(raw).unwrap_or(usize::MAX);
    if count > limit {
        return Err(CodecError::LimitsExceeded {
            kind: LimitKind::ArrayCount,
            limit,
            actual: count,
        });
    }

    let array = match value.as_array_mut() {
        Some(array) => array,
        None => return Err(type_mismatch(field, value)),
    };
    array.resize(count);
    for index in 0..count {
        let element = array
            .element_mut(index)
            .ok_or_else(|| CodecError::TypeMismatch {
                field: field.native_name().to_owned(),
                expected: field.native_type().name().to_owned(),
                found: format!("no element {index}"),
            })?;
        decode_value(field, element, resolver, limits, reader, depth)?;
    }
    Ok(())
}

fn encode_value(
    field: &DataModelField,
    value: &dyn Reflect,
    mapper: &mut dyn DataModelMapper,
    writer: &mut BitWriter<'_>,
) -> CodecResult<()> {
    match field.field_type() {
        DataModelFieldType::Packed => field.packing().pack_data(value, writer)?,
        DataModelFieldType::Struct => {
            let nested = nested_model(field)?;
            encode_from_native(&nested, value, mapper, writer)?;
        }
        DataModelFieldType::StringBuf => {
            let text = downcast::<String>(field, value)?;
            write_string(field, text, writer)?;
        }
        DataModelFieldType::StringId => {
            let symbol = downcast::<Symbol>(field, value)?;
            write_id(writer, mapper.map_string(symbol.as_str())?)?;
        }
        DataModelFieldType::TypeRef => {
            let ty = downcast::<TypeRef>(field, value)?;
            write_id(writer, mapper.map_type_ref(*ty)?)?;
        }
        DataModelFieldType::ObjectPtr => {
            let object = downcast::<ObjectRef>(field, value)?;
            write_id(writer, mapper.map_object(object)?)?;
        }
        DataModelFieldType::WeakObjectPtr => {
            let object = downcast::<WeakObjectRef>(field, value)?;
            write_id(writer, mapper.map_weak_object(object)?)?;
        }
        DataModelFieldType::ResourceRef => {
            let resource = downcast::<ResourceRef>(field, value)?;
            if resource.is_empty() {
                writer.write_bit(false)?;
            } else {
                writer.write_bit(true)?;
                write_id(writer, mapper.map_type_ref(resource.class())?)?;
                write_id(
                    writer,
                    mapper.map_path(resource.path(), RESOURCE_PATH_SEPARATOR)?,
                )?;
            }
        }
    }
    Ok(())
}

fn decode_value(
    field: &DataModelField,
    value: &mut dyn Reflect,
    resolver: &dyn DataModelResolver,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
    depth: usize,
) -> CodecResult<()> {
    match field.field_type() {
        DataModelFieldType::Packed => field.packing().unpack_data(value, reader)?,
        DataModelFieldType::Struct => {
            let depth = depth + 1;
            if depth > limits.max_nesting_depth {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::NestingDepth,
                    limit: limits.max_nesting_depth,
                    actual: depth,
                });
            }
            let nested = nested_model(field)?;
            decode_struct(&nested, value, resolver, limits, reader, depth)?;
        }
        DataModelFieldType::StringBuf => {
            let text = read_string(field, limits, reader)?;
            *downcast_mut::<String>(field, value)? = text;
        }
        DataModelFieldType::StringId => {
            let id = read_id(reader)?;
            let symbol = Symbol::new(resolver.resolve_string(id)?);
            *downcast_mut::<Symbol>(field, value)? = symbol;
        }
        DataModelFieldType::TypeRef => {
            let ty = resolver.resolve_type_ref(read_id(reader)?)?;
            *downcast_mut::<TypeRef>(field, value)? = ty;
        }
        DataModelFieldType::ObjectPtr => {
            let object = resolver.resolve_object(read_id(reader)?)?;
            *downcast_mut::<ObjectRef>(field, value)? = object;
        }
        DataModelFieldType::WeakObjectPtr => {
            let object = resolver.resolve_object(read_id(reader)?)?;
            *downcast_mut::<WeakObjectRef>(field, value)? = object.downgrade();
        }
        DataModelFieldType::ResourceRef => {
            let resource = if reader.read_bit()? {
                let class = resolver.resolve_type_ref(read_id(reader)?)?;
                let path = resolver.resolve_path(read_id(reader)?, RESOURCE_PATH_SEPARATOR)?;
                ResourceRef::new(class, path)
            } else {
                ResourceRef::default()
            };
            *downcast_mut::<ResourceRef>(field, value)? = resource;
        }
    }
    Ok(())
}

fn write_string(
    field: &DataModelField,
    text: &str,
    writer: &mut BitWriter<'_>,
) -> CodecResult<()> {
    let max_length = usize::from(field.packing().max_length);
    let mut end = text.len();
    if max_length > 0 && end > max_length {
        end = max_length;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        warn!(
            field = field.native_name(),
            length = text.len(),
            max_length,
            "string truncated to maxLength"
        );
    }
    let bytes = &text.as_bytes()[..end];
    writer.write_bit(!bytes.is_empty())?;
    if !bytes.is_empty() {
        writer.write_adaptive_number(bytes.len() as u64)?;
        writer.align_to_byte()?;
        writer.write_block(bytes)?;
    }
    Ok(())
}

fn read_string(
    field: &DataModelField,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
) -> CodecResult<String> {
    if !reader.read_bit()? {
        return Ok(String::new());
    }
    let raw = reader.read_adaptive_number()?;
    let max_length = usize::from(field.packing().max_length);
    let limit = if max_length > 0 {
        max_length.min(limits.max_string_length)
    } else {
        limits.max_string_length
    };
    let length = usize::try_from(raw).unwrap_or(usize::MAX);
    if length > limit {
        return Err(CodecError::LimitsExceeded {
            kind: LimitKind::StringLength,
            limit,
            actual: length,
        });
    }
    reader.align_to_byte()?;
    let bytes = reader.read_block_slice(length)?;
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err(CodecError::InvalidUtf8 {
            field: field.native_name().to_owned(),
        }),
    }
}

fn write_id(writer: &mut BitWriter<'_>, id: MappedId) -> CodecResult<()> {
    writer.write_adaptive_number(u64::from(id))?;
    Ok(())
}

fn read_id(reader: &mut BitReader<'_>) -> CodecResult<MappedId> {
    let raw = reader.read_adaptive_number()?;
    MappedId::try_from(raw).map_err(|_| CodecError::IdOutOfRange { raw })
}

fn nested_model(field: &DataModelField) -> CodecResult<Arc<DataModel>> {
    field.nested_model().ok_or_else(|| CodecError::ModelReleased {
        field: field.native_name().to_owned(),
    })
}

fn type_mismatch(field: &DataModelField, value: &dyn Reflect) -> CodecError {
    CodecError::TypeMismatch {
        field: field.native_name().to_owned(),
        expected: field.native_type().name().to_owned(),
        found: value.reflected_type().name().to_owned(),
    }
}

fn type_mismatch_unchecked(field: &DataModelField) -> CodecError {
    CodecError::TypeMismatch {
        field: field.native_name().to_owned(),
        expected: field.native_type().name().to_owned(),
        found: String::from("unknown"),
    }
}

fn downcast<'v, T: Reflect>(field: &DataModelField, value: &'v dyn Reflect) -> CodecResult<&'v T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| type_mismatch(field, value))
}

fn downcast_mut<'v, T: Reflect>(
    field: &DataModelField,
    value: &'v mut dyn Reflect,
) -> CodecResult<&'v mut T> {
    if !value.as_any().is::<T>() {
        return Err(type_mismatch(field, value));
    }
    value
        .downcast_mut::<T>()
        .ok_or_else(|| type_mismatch_unchecked(field))
}
