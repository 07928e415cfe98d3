//! Per-field packing policy: descriptor parsing, type checks and bit packing.

use std::fmt;
use std::str::FromStr;

use bitstream::{BitReader, BitWriter};

use crate::error::{PackError, PackResult, PackingParseError};
use crate::quantization::Quantization;
use crate::reflect::{Primitive, PrimitiveKind, Reflect, TypeInfo, TypeKind};

/// Quantizer for the X axis of [`PackingMode::Position`].
pub const POSITION_X: Quantization = Quantization::with_range(20, -8192.0, 8192.0);
/// Quantizer for the Y axis of [`PackingMode::Position`].
pub const POSITION_Y: Quantization = Quantization::with_range(20, -8192.0, 8192.0);
/// Quantizer for the Z axis of [`PackingMode::Position`].
pub const POSITION_Z: Quantization = Quantization::with_range(15, -512.0, 512.0);
/// Per-axis bit count of [`PackingMode::DeltaPosition`].
pub const DELTA_POSITION_BITS: u8 = 10;
/// Quantizer for X and Y of [`PackingMode::NormalFull`].
pub const NORMAL_FULL: Quantization = Quantization::with_range(15, -1.0, 1.0);
/// Quantizer for X and Y of [`PackingMode::NormalRough`].
pub const NORMAL_ROUGH: Quantization = Quantization::with_range(4, -1.0, 1.0);
/// Quantizer for both angles of [`PackingMode::PitchYaw`].
pub const FULL_ANGLE: Quantization = Quantization::with_range(16, 0.0, 360.0);
/// Quantizer for pitch in [`PackingMode::AllAngles`].
pub const SMALL_PITCH: Quantization = Quantization::with_range(10, 0.0, 360.0);
/// Quantizer for yaw in [`PackingMode::AllAngles`].
pub const SMALL_YAW: Quantization = Quantization::with_range(10, 0.0, 360.0);
/// Quantizer for roll in [`PackingMode::AllAngles`].
pub const SMALL_ROLL: Quantization = Quantization::with_range(8, 0.0, 360.0);

const NORMALIZE_THRESHOLD: f32 = 1e-5;

/// Encoding strategy for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PackingMode {
    /// Raw bit pattern of the native value.
    #[default]
    Default,
    /// `b`: a `bool` in one bit.
    Bit,
    /// `u:N`: an unsigned integer saturated to `N` bits.
    Unsigned,
    /// `s:N`: a signed integer saturated to `N` bits, offset-binary.
    Signed,
    /// `f:N,min,max`: each float component quantized onto `N` bits over `[min, max]`.
    RangeFloat,
    /// `pos`: a three-float position with [`POSITION_X`], [`POSITION_Y`] and [`POSITION_Z`].
    Position,
    /// `delta,max`: a three-float offset, [`DELTA_POSITION_BITS`] per axis over `[-max, max]`.
    DeltaPosition,
    /// `normal`: a unit vector as quantized X and Y plus the sign of Z.
    NormalFull,
    /// `dir`: like [`NormalFull`](Self::NormalFull) with [`NORMAL_ROUGH`] precision.
    NormalRough,
    /// `pitchYaw`: two angles in degrees, [`FULL_ANGLE`] each.
    PitchYaw,
    /// `angles`: pitch, yaw and roll in degrees at reduced precision.
    AllAngles,
}

/// Packing policy for one field, parsed from a descriptor such as `"f:10,-1,1"`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPacking {
    pub mode: PackingMode,
    /// Quantizer for `Unsigned`, `Signed`, `RangeFloat` and `DeltaPosition`.
    pub quantization: Quantization,
    /// Maximum string length in bytes; zero means unlimited.
    pub max_length: u16,
    /// Maximum array element count; zero means unlimited.
    pub max_count: u16,
    /// Update frequency hint. Not used by the codec.
    pub frequency: f32,
}

impl Default for FieldPacking {
    fn default() -> Self {
        Self {
            mode: PackingMode::Default,
            quantization: Quantization::new(1),
            max_length: 0,
            max_count: 0,
            frequency: 0.0,
        }
    }
}

impl FieldPacking {
    /// Parses a packing descriptor. An empty descriptor yields [`PackingMode::Default`].
    pub fn parse(text: &str) -> Result<Self, PackingParseError> {
        let mut packing = Self::default();
        let mut cursor = Cursor::new(text);

        loop {
            cursor.skip_whitespace();
            if cursor.at_end() {
                break;
            }
            let offset = cursor.pos;
            let key = cursor.identifier();
            match key {
                "" => return Err(PackingParseError::ExpectedKey { offset }),
                "b" => packing.mode = PackingMode::Bit,
                "u" => {
                    cursor.expect(':', "u")?;
                    let bits = cursor.bit_count("u", 1, 24)?;
                    packing.mode = PackingMode::Unsigned;
                    packing.quantization = Quantization::new(bits);
                }
                "s" => {
                    cursor.expect(':', "s")?;
                    let bits = cursor.bit_count("s", 2, 24)?;
                    packing.mode = PackingMode::Signed;
                    packing.quantization = Quantization::new(bits);
                }
                "f" => {
                    cursor.expect(':', "f")?;
                    let bits = cursor.bit_count("f", 4, 16)?;
                    cursor.expect(',', "f")?;
                    let min = cursor.float("f")?;
                    cursor.expect(',', "f")?;
                    let max = cursor.float("f")?;
                    if !(min < max) {
                        return Err(PackingParseError::InvalidRange { min, max });
                    }
                    packing.mode = PackingMode::RangeFloat;
                    packing.quantization = Quantization::with_range(bits, min, max);
                }
                "pos" => packing.mode = PackingMode::Position,
                "delta" => {
                    cursor.expect(',', "delta")?;
                    let max = cursor.float("delta")?;
                    if !(max > 0.0) {
                        return Err(PackingParseError::InvalidDeltaRange { max });
                    }
                    packing.mode = PackingMode::DeltaPosition;
                    packing.quantization = Quantization::with_range(DELTA_POSITION_BITS, -max, max);
                }
                "normal" => packing.mode = PackingMode::NormalFull,
                "dir" => packing.mode = PackingMode::NormalRough,
                "pitchYaw" => packing.mode = PackingMode::PitchYaw,
                "angles" => packing.mode = PackingMode::AllAngles,
                "freq" => {
                    cursor.expect(':', "freq")?;
                    let value = cursor.float("freq")?;
                    if value < 0.0 {
                        return Err(PackingParseError::InvalidFrequency { value });
                    }
                    packing.frequency = value;
                }
                "maxCount" => {
                    cursor.expect(':', "maxCount")?;
                    packing.max_count = cursor.integer("maxCount")?;
                }
                "maxLength" => {
                    cursor.expect(':', "maxLength")?;
                    packing.max_length = cursor.integer("maxLength")?;
                }
                other => {
                    return Err(PackingParseError::UnknownKey {
                        key: other.to_owned(),
                    })
                }
            }

            cursor.skip_whitespace();
            if cursor.at_end() {
                break;
            }
            if !cursor.eat(',') {
                return Err(PackingParseError::ExpectedSeparator { offset: cursor.pos });
            }
        }

        Ok(packing)
    }

    /// Checks whether this packing can encode values of `ty`.
    ///
    /// Arrays are checked through their element type; arrays of arrays are rejected.
    #[must_use]
    pub fn check_type_compatibility(&self, ty: &TypeInfo, is_array_element: bool) -> bool {
        if let TypeKind::Array(inner) = ty.kind() {
            return !is_array_element && self.check_type_compatibility(inner.get(), true);
        }

        let primitive = match ty.kind() {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        };
        let bits = usize::from(self.quantization.bit_count());

        match self.mode {
            PackingMode::Default => primitive.is_some() && ty.size() <= 8,
            PackingMode::Bit => primitive == Some(PrimitiveKind::Bool),
            PackingMode::Unsigned => {
                primitive.is_some_and(|kind| kind.is_unsigned() && kind.size() * 8 >= bits)
            }
            PackingMode::Signed => {
                primitive.is_some_and(|kind| kind.is_signed() && kind.size() * 8 >= bits)
            }
            PackingMode::RangeFloat => float_count(ty) >= 1,
            PackingMode::Position
            | PackingMode::DeltaPosition
            | PackingMode::NormalFull
            | PackingMode::NormalRough
            | PackingMode::AllAngles => float_count(ty) == 3,
            PackingMode::PitchYaw => matches!(float_count(ty), 2 | 3),
        }
    }

    /// Fixed bit cost of one value, or `None` when it depends on the data.
    ///
    /// For `RangeFloat` this is the cost of one float component.
    #[must_use]
    pub fn calc_bit_count(&self) -> Option<usize> {
        let bits = |q: Quantization| usize::from(q.bit_count());
        match self.mode {
            PackingMode::Default => None,
            PackingMode::Bit => Some(1),
            PackingMode::Unsigned | PackingMode::Signed | PackingMode::RangeFloat => {
                Some(bits(self.quantization))
            }
            PackingMode::Position => Some(bits(POSITION_X) + bits(POSITION_Y) + bits(POSITION_Z)),
            PackingMode::DeltaPosition => Some(3 * bits(self.quantization)),
            PackingMode::NormalFull => Some(2 * bits(NORMAL_FULL) + 1),
            PackingMode::NormalRough => Some(2 * bits(NORMAL_ROUGH) + 1),
            PackingMode::PitchYaw => Some(2 * bits(FULL_ANGLE)),
            PackingMode::AllAngles => {
                Some(bits(SMALL_PITCH) + bits(SMALL_YAW) + bits(SMALL_ROLL))
            }
        }
    }

    /// Fixed bit cost of one whole value of `ty`.
    ///
    /// Unlike [`calc_bit_count`](Self::calc_bit_count) this counts every
    /// `RangeFloat` component, and resolves `Default` for values that are
    /// written bit-packed. Eight-byte defaults depend on alignment and stay `None`.
    #[must_use]
    pub fn bit_count_for(&self, ty: &TypeInfo) -> Option<usize> {
        match self.mode {
            PackingMode::Default => match ty.kind() {
                TypeKind::Primitive(kind) if kind.size() <= 4 => Some(kind.size() * 8),
                _ => None,
            },
            PackingMode::RangeFloat => Some(self.calc_bit_count()? * float_count(ty)),
            _ => self.calc_bit_count(),
        }
    }

    /// Writes one value.
    pub fn pack_data(&self, value: &dyn Reflect, writer: &mut BitWriter<'_>) -> PackResult<()> {
        match self.mode {
            PackingMode::Default => pack_default(value, writer),
            PackingMode::Bit => {
                let bit = match value.primitive() {
                    Some(Primitive::Bool(bit)) => bit,
                    _ => return Err(mismatch("bool", value)),
                };
                writer.write_bit(bit)?;
                Ok(())
            }
            PackingMode::Unsigned => {
                let raw = value
                    .primitive()
                    .and_then(Primitive::as_unsigned)
                    .ok_or_else(|| mismatch("unsigned integer", value))?;
                write_quantized(writer, &self.quantization, self.quantization.quantize_unsigned(raw))
            }
            PackingMode::Signed => {
                let raw = value
                    .primitive()
                    .and_then(Primitive::as_signed)
                    .ok_or_else(|| mismatch("signed integer", value))?;
                write_quantized(writer, &self.quantization, self.quantization.quantize_signed(raw))
            }
            PackingMode::RangeFloat => {
                for index in 0..component_count(value) {
                    let component = float_component(value, index)?;
                    write_float(writer, &self.quantization, component)?;
                }
                Ok(())
            }
            PackingMode::Position => {
                let [x, y, z] = read_floats::<3>(value)?;
                write_float(writer, &POSITION_X, x)?;
                write_float(writer, &POSITION_Y, y)?;
                write_float(writer, &POSITION_Z, z)
            }
            PackingMode::DeltaPosition => {
                for component in read_floats::<3>(value)? {
                    write_float(writer, &self.quantization, component)?;
                }
                Ok(())
            }
            PackingMode::NormalFull => pack_normal(&NORMAL_FULL, value, writer),
            PackingMode::NormalRough => pack_normal(&NORMAL_ROUGH, value, writer),
            PackingMode::PitchYaw => {
                for angle in read_floats::<2>(value)? {
                    write_float(writer, &FULL_ANGLE, wrap_angle(angle))?;
                }
                Ok(())
            }
            PackingMode::AllAngles => {
                let [pitch, yaw, roll] = read_floats::<3>(value)?;
                write_float(writer, &SMALL_PITCH, wrap_angle(pitch))?;
                write_float(writer, &SMALL_YAW, wrap_angle(yaw))?;
                write_float(writer, &SMALL_ROLL, wrap_angle(roll))
            }
        }
    }

    /// Reads one value into `value`.
    ///
    /// Every component is read before anything is stored, so a stream that runs
    /// out leaves `value` untouched.
    pub fn unpack_data(&self, value: &mut dyn Reflect, reader: &mut BitReader<'_>) -> PackResult<()> {
        match self.mode {
            PackingMode::Default => unpack_default(value, reader),
            PackingMode::Bit => {
                let bit = reader.read_bit()?;
                store(value, Primitive::Bool(bit))
            }
            PackingMode::Unsigned => {
                let kind = primitive_kind(value)?;
                let encoded = read_quantized(reader, &self.quantization)?;
                let decoded = Primitive::from_unsigned(kind, u64::from(encoded))
                    .ok_or_else(|| mismatch("unsigned integer", value))?;
                store(value, decoded)
            }
            PackingMode::Signed => {
                let kind = primitive_kind(value)?;
                let encoded = read_quantized(reader, &self.quantization)?;
                let decoded =
                    Primitive::from_signed(kind, self.quantization.unquantize_signed(encoded))
                        .ok_or_else(|| mismatch("signed integer", value))?;
                store(value, decoded)
            }
            PackingMode::RangeFloat => {
                let count = component_count(value);
                let mut components = Vec::with_capacity(count);
                for _ in 0..count {
                    components.push(read_float(reader, &self.quantization)?);
                }
                write_floats(value, &components)
            }
            PackingMode::Position => {
                let x = read_float(reader, &POSITION_X)?;
                let y = read_float(reader, &POSITION_Y)?;
                let z = read_float(reader, &POSITION_Z)?;
                write_floats(value, &[x, y, z])
            }
            PackingMode::DeltaPosition => {
                let x = read_float(reader, &self.quantization)?;
                let y = read_float(reader, &self.quantization)?;
                let z = read_float(reader, &self.quantization)?;
                write_floats(value, &[x, y, z])
            }
            PackingMode::NormalFull => unpack_normal(&NORMAL_FULL, value, reader),
            PackingMode::NormalRough => unpack_normal(&NORMAL_ROUGH, value, reader),
            PackingMode::PitchYaw => {
                let pitch = read_float(reader, &FULL_ANGLE)?;
                let yaw = read_float(reader, &FULL_ANGLE)?;
                write_floats(value, &[pitch, yaw])
            }
            PackingMode::AllAngles => {
                let pitch = read_float(reader, &SMALL_PITCH)?;
                let yaw = read_float(reader, &SMALL_YAW)?;
                let roll = read_float(reader, &SMALL_ROLL)?;
                write_floats(value, &[pitch, yaw, roll])
            }
        }
    }
}

impl FromStr for FieldPacking {
    type Err = PackingParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for FieldPacking {
    /// Writes the descriptor this packing parses from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let q = &self.quantization;
        match self.mode {
            PackingMode::Default => {}
            PackingMode::Bit => parts.push("b".to_owned()),
            PackingMode::Unsigned => parts.push(format!("u:{}", q.bit_count())),
            PackingMode::Signed => parts.push(format!("s:{}", q.bit_count())),
            PackingMode::RangeFloat => {
                parts.push(format!("f:{},{},{}", q.bit_count(), q.min(), q.max()));
            }
            PackingMode::Position => parts.push("pos".to_owned()),
            PackingMode::DeltaPosition => parts.push(format!("delta,{}", q.max())),
            PackingMode::NormalFull => parts.push("normal".to_owned()),
            PackingMode::NormalRough => parts.push("dir".to_owned()),
            PackingMode::PitchYaw => parts.push("pitchYaw".to_owned()),
            PackingMode::AllAngles => parts.push("angles".to_owned()),
        }
        if self.frequency > 0.0 {
            parts.push(format!("freq:{}", self.frequency));
        }
        if self.max_count > 0 {
            parts.push(format!("maxCount:{}", self.max_count));
        }
        if self.max_length > 0 {
            parts.push(format!("maxLength:{}", self.max_length));
        }
        f.write_str(&parts.join(","))
    }
}

/// Number of `f32` components a packing can address in `ty`.
fn float_count(ty: &TypeInfo) -> usize {
    match ty.kind() {
        TypeKind::Primitive(PrimitiveKind::F32) => 1,
        TypeKind::Struct(info) => info.contiguous_float_count(),
        _ => 0,
    }
}

fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    let wrapped = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn mismatch(expected: &'static str, value: &dyn Reflect) -> PackError {
    PackError::TypeMismatch {
        expected,
        found: value.reflected_type().name().to_owned(),
    }
}

fn primitive_kind(value: &dyn Reflect) -> PackResult<PrimitiveKind> {
    value
        .primitive()
        .map(Primitive::kind)
        .ok_or_else(|| mismatch("primitive", value))
}

fn store(value: &mut dyn Reflect, primitive: Primitive) -> PackResult<()> {
    if value.set_primitive(primitive) {
        Ok(())
    } else {
        Err(mismatch("matching primitive", value))
    }
}

fn write_quantized(writer: &mut BitWriter<'_>, q: &Quantization, encoded: u32) -> PackResult<()> {
    writer.write_bits(u64::from(encoded), q.bit_count())?;
    Ok(())
}

fn read_quantized(reader: &mut BitReader<'_>, q: &Quantization) -> PackResult<u32> {
    Ok(reader.read_bits(q.bit_count())? as u32)
}

fn write_float(writer: &mut BitWriter<'_>, q: &Quantization, value: f32) -> PackResult<()> {
    write_quantized(writer, q, q.quantize_float(value))
}

fn read_float(reader: &mut BitReader<'_>, q: &Quantization) -> PackResult<f32> {
    Ok(q.unquantize_float(read_quantized(reader, q)?))
}

/// Number of float components: one for a bare float, else the property count.
fn component_count(value: &dyn Reflect) -> usize {
    if value.primitive().is_some() {
        return 1;
    }
    (0..).take_while(|index| value.field(*index).is_some()).count()
}

fn float_component(value: &dyn Reflect, index: usize) -> PackResult<f32> {
    let component = if value.primitive().is_some() {
        (index == 0).then(|| value.primitive()).flatten()
    } else {
        value.field(index).and_then(Reflect::primitive)
    };
    match component {
        Some(Primitive::F32(component)) => Ok(component),
        _ => Err(mismatch("f32 components", value)),
    }
}

fn read_floats<const N: usize>(value: &dyn Reflect) -> PackResult<[f32; N]> {
    let mut out = [0.0; N];
    for (index, slot) in out.iter_mut().enumerate() {
        *slot = float_component(value, index)?;
    }
    Ok(out)
}

fn write_floats(value: &mut dyn Reflect, components: &[f32]) -> PackResult<()> {
    if value.primitive().is_some() {
        return match components {
            [single] => store(value, Primitive::F32(*single)),
            _ => Err(mismatch("f32 components", value)),
        };
    }
    for (index, component) in components.iter().enumerate() {
        let stored = value
            .field_mut(index)
            .is_some_and(|field| field.set_primitive(Primitive::F32(*component)));
        if !stored {
            return Err(mismatch("f32 components", value));
        }
    }
    Ok(())
}

fn pack_default(value: &dyn Reflect, writer: &mut BitWriter<'_>) -> PackResult<()> {
    let primitive = value
        .primitive()
        .ok_or_else(|| mismatch("primitive", value))?;
    let size = primitive.kind().size();
    if size <= 4 {
        writer.write_bits(primitive.to_bits(), (size * 8) as u8)?;
    } else {
        writer.align_to_byte()?;
        writer.write_block(&primitive.to_bits().to_le_bytes())?;
    }
    Ok(())
}

fn unpack_default(value: &mut dyn Reflect, reader: &mut BitReader<'_>) -> PackResult<()> {
    let kind = primitive_kind(value)?;
    let size = kind.size();
    let bits = if size <= 4 {
        reader.read_bits((size * 8) as u8)?
    } else {
        reader.align_to_byte()?;
        let mut raw = [0u8; 8];
        reader.read_block(&mut raw)?;
        u64::from_le_bytes(raw)
    };
    store(value, Primitive::from_bits(kind, bits))
}

fn pack_normal(q: &Quantization, value: &dyn Reflect, writer: &mut BitWriter<'_>) -> PackResult<()> {
    let [mut x, mut y, mut z] = read_floats::<3>(value)?;
    let length_sq = x * x + y * y + z * z;
    if length_sq > NORMALIZE_THRESHOLD {
        let inv_length = length_sq.sqrt().recip();
        x *= inv_length;
        y *= inv_length;
        z *= inv_length;
    }
    write_float(writer, q, x)?;
    write_float(writer, q, y)?;
    writer.write_bit(z < 0.0)?;
    Ok(())
}

fn unpack_normal(
    q: &Quantization,
    value: &mut dyn Reflect,
    reader: &mut BitReader<'_>,
) -> PackResult<()> {
    let x = read_float(reader, q)?;
    let y = read_float(reader, q)?;
    let negative = reader.read_bit()?;
    let z_sq = 1.0 - x * x - y * y;
    let z = if z_sq > 0.0 { z_sq.sqrt() } else { 0.0 };
    write_floats(value, &[x, y, if negative { -z } else { z }])
}

/// Byte cursor over a descriptor.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, key: &'static str) -> Result<(), PackingParseError> {
        self.skip_whitespace();
        if self.eat(expected) {
            self.skip_whitespace();
            Ok(())
        } else {
            Err(PackingParseError::ExpectedToken {
                key,
                expected,
                offset: self.pos,
            })
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn identifier(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn number_text(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    }

    fn float(&mut self, key: &'static str) -> Result<f32, PackingParseError> {
        let text = self.number_text();
        text.parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| PackingParseError::InvalidNumber {
                key,
                text: text.to_owned(),
            })
    }

    fn integer<T: FromStr>(&mut self, key: &'static str) -> Result<T, PackingParseError> {
        let text = self.take_while(|c| c.is_ascii_digit());
        text.parse::<T>()
            .map_err(|_| PackingParseError::InvalidNumber {
                key,
                text: text.to_owned(),
            })
    }

    fn bit_count(&mut self, key: &'static str, min: u8, max: u8) -> Result<u8, PackingParseError> {
        let bits: u32 = self.integer(key)?;
        if bits < u32::from(min) || bits > u32::from(max) {
            return Err(PackingParseError::BitCountOutOfRange { key, bits, min, max });
        }
        Ok(bits as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Typed;

    fn parse(text: &str) -> FieldPacking {
        FieldPacking::parse(text).unwrap()
    }

    #[derive(Debug, Default, PartialEq)]
    #[repr(C)]
    struct Vec3 {
        x: f32,
        y: f32,
        z: f32,
    }

    crate::reflect_struct!(Vec3 {
        x: f32 = "",
        y: f32 = "",
        z: f32 = "",
    });

    #[derive(Debug, Default)]
    struct NotFloats {
        x: f32,
        n: u32,
    }

    crate::reflect_struct!(NotFloats {
        x: f32 = "",
        n: u32 = "",
    });

    fn roundtrip<T: Reflect + Default>(packing: &FieldPacking, value: &T) -> (T, usize) {
        let mut writer = BitWriter::new();
        packing.pack_data(value, &mut writer).unwrap();
        let bits = writer.bits_written();
        let bytes = writer.finish();
        let mut reader = BitReader::with_bit_len(&bytes, bits);
        let mut out = T::default();
        packing.unpack_data(&mut out, &mut reader).unwrap();
        assert!(reader.is_empty());
        (out, bits)
    }

    #[test]
    fn parse_modes() {
        assert_eq!(parse("").mode, PackingMode::Default);
        assert_eq!(parse("b").mode, PackingMode::Bit);
        let unsigned = parse("u:6");
        assert_eq!(unsigned.mode, PackingMode::Unsigned);
        assert_eq!(unsigned.quantization.bit_count(), 6);
        let ranged = parse("f:10,-1,1");
        assert_eq!(ranged.mode, PackingMode::RangeFloat);
        assert_eq!(ranged.quantization.min(), -1.0);
        assert_eq!(ranged.quantization.max(), 1.0);
        assert_eq!(parse("pos").mode, PackingMode::Position);
        let delta = parse("delta,10");
        assert_eq!(delta.mode, PackingMode::DeltaPosition);
        assert_eq!(delta.quantization.max(), 10.0);
        assert_eq!(parse("normal").mode, PackingMode::NormalFull);
        assert_eq!(parse("dir").mode, PackingMode::NormalRough);
        assert_eq!(parse("pitchYaw").mode, PackingMode::PitchYaw);
        assert_eq!(parse("angles").mode, PackingMode::AllAngles);
    }

    #[test]
    fn parse_modifiers() {
        let packing = parse(" f:10, -10, 10 , maxCount:10, freq:2.5");
        assert_eq!(packing.mode, PackingMode::RangeFloat);
        assert_eq!(packing.max_count, 10);
        assert_eq!(packing.frequency, 2.5);
        assert_eq!(parse("maxLength:10").max_length, 10);
        assert_eq!(parse("maxLength:10").mode, PackingMode::Default);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            FieldPacking::parse("bogus"),
            Err(PackingParseError::UnknownKey { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("u:25"),
            Err(PackingParseError::BitCountOutOfRange { bits: 25, .. })
        ));
        assert!(matches!(
            FieldPacking::parse("s:1"),
            Err(PackingParseError::BitCountOutOfRange { bits: 1, .. })
        ));
        assert!(matches!(
            FieldPacking::parse("f:3,0,1"),
            Err(PackingParseError::BitCountOutOfRange { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("f:8,1,1"),
            Err(PackingParseError::InvalidRange { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("delta,0"),
            Err(PackingParseError::InvalidDeltaRange { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("u6"),
            Err(PackingParseError::UnknownKey { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("u:"),
            Err(PackingParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("maxCount:70000"),
            Err(PackingParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            FieldPacking::parse("b b"),
            Err(PackingParseError::ExpectedSeparator { .. })
        ));
        assert!(matches!(
            FieldPacking::parse(",b"),
            Err(PackingParseError::ExpectedKey { offset: 0 })
        ));
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "",
            "b",
            "u:6",
            "s:12",
            "f:10,-1,1",
            "pos",
            "delta,10",
            "normal",
            "dir",
            "pitchYaw",
            "angles",
            "b,maxCount:10",
            "maxLength:10",
            "f:8,0,360,freq:5",
        ] {
            let packing = parse(text);
            assert_eq!(packing.to_string(), text);
            assert_eq!(parse(&packing.to_string()), packing);
        }
    }

    #[test]
    fn bit_counts() {
        assert_eq!(parse("").calc_bit_count(), None);
        assert_eq!(parse("b").calc_bit_count(), Some(1));
        assert_eq!(parse("u:6").calc_bit_count(), Some(6));
        assert_eq!(parse("s:12").calc_bit_count(), Some(12));
        assert_eq!(parse("f:10,-1,1").calc_bit_count(), Some(10));
        assert_eq!(parse("pos").calc_bit_count(), Some(55));
        assert_eq!(parse("delta,10").calc_bit_count(), Some(30));
        assert_eq!(parse("normal").calc_bit_count(), Some(31));
        assert_eq!(parse("dir").calc_bit_count(), Some(9));
        assert_eq!(parse("pitchYaw").calc_bit_count(), Some(32));
        assert_eq!(parse("angles").calc_bit_count(), Some(28));
    }

    #[test]
    fn compatibility_rules() {
        assert!(parse("b").check_type_compatibility(bool::type_info(), false));
        assert!(!parse("b").check_type_compatibility(u8::type_info(), false));
        assert!(parse("u:8").check_type_compatibility(u8::type_info(), false));
        assert!(!parse("u:9").check_type_compatibility(u8::type_info(), false));
        assert!(!parse("u:8").check_type_compatibility(i8::type_info(), false));
        assert!(parse("s:12").check_type_compatibility(i16::type_info(), false));
        assert!(!parse("s:12").check_type_compatibility(i8::type_info(), false));
        assert!(parse("f:8,0,1").check_type_compatibility(f32::type_info(), false));
        assert!(parse("f:8,0,1").check_type_compatibility(Vec3::type_info(), false));
        assert!(!parse("f:8,0,1").check_type_compatibility(f64::type_info(), false));
        assert!(!parse("f:8,0,1").check_type_compatibility(NotFloats::type_info(), false));
        assert!(parse("pos").check_type_compatibility(Vec3::type_info(), false));
        assert!(!parse("pos").check_type_compatibility(f32::type_info(), false));
        assert!(parse("pitchYaw").check_type_compatibility(Vec3::type_info(), false));
        assert!(parse("").check_type_compatibility(f64::type_info(), false));
        assert!(!parse("").check_type_compatibility(String::type_info(), false));
        assert!(!parse("").check_type_compatibility(Vec3::type_info(), false));
    }

    #[test]
    fn compatibility_through_arrays() {
        assert!(parse("b").check_type_compatibility(Vec::<bool>::type_info(), false));
        assert!(!parse("b").check_type_compatibility(Vec::<bool>::type_info(), true));
        assert!(!parse("b").check_type_compatibility(Vec::<Vec<bool>>::type_info(), false));
    }

    #[test]
    fn default_packing_is_bit_exact() {
        let packing = parse("");
        let (out, bits) = roundtrip(&packing, &-123.456f32);
        assert_eq!(out, -123.456f32);
        assert_eq!(bits, 32);
        let (out, bits) = roundtrip(&packing, &-7i16);
        assert_eq!(out, -7);
        assert_eq!(bits, 16);
        let (out, bits) = roundtrip(&packing, &f64::MIN_POSITIVE);
        assert_eq!(out, f64::MIN_POSITIVE);
        assert_eq!(bits, 64);
    }

    #[test]
    fn default_wide_values_are_little_endian_blocks() {
        let mut writer = BitWriter::new();
        writer.write_bit(true).unwrap();
        parse("")
            .pack_data(&0x0102_0304_0506_0708u64, &mut writer)
            .unwrap();
        assert_eq!(
            writer.finish(),
            vec![0x80, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn integer_modes_saturate() {
        let (out, bits) = roundtrip(&parse("u:6"), &255u8);
        assert_eq!((out, bits), (63, 6));
        let (out, _) = roundtrip(&parse("s:12"), &-4000i32);
        assert_eq!(out, -2048);
        let (out, _) = roundtrip(&parse("s:12"), &4000i32);
        assert_eq!(out, 2047);
    }

    #[test]
    fn range_float_packs_every_component() {
        let packing = parse("f:10,-10,10");
        let input = Vec3 {
            x: 1.0,
            y: -2.0,
            z: 30.0,
        };
        let (out, bits) = roundtrip(&packing, &input);
        assert_eq!(bits, 30);
        let err = packing.quantization.quantization_error();
        assert!((out.x - 1.0).abs() <= err);
        assert!((out.y + 2.0).abs() <= err);
        assert_eq!(out.z, 10.0);
    }

    #[test]
    fn position_ranges() {
        let input = Vec3 {
            x: 100.5,
            y: -9000.0,
            z: 600.0,
        };
        let (out, bits) = roundtrip(&parse("pos"), &input);
        assert_eq!(bits, 55);
        assert!((out.x - 100.5).abs() <= POSITION_X.quantization_error());
        assert_eq!(out.y, -8192.0);
        assert_eq!(out.z, 512.0);
    }

    #[test]
    fn normal_reconstructs_third_axis() {
        let input = Vec3 {
            x: 0.0,
            y: 0.0,
            z: -2.0,
        };
        let (out, bits) = roundtrip(&parse("normal"), &input);
        assert_eq!(bits, 31);
        assert!(out.x.abs() < 1e-3);
        assert!(out.y.abs() < 1e-3);
        assert!((out.z + 1.0).abs() < 1e-3);

        let diagonal = Vec3 {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        };
        let (out, _) = roundtrip(&parse("dir"), &diagonal);
        let expected = 1.0 / 3.0f32.sqrt();
        let tolerance = NORMAL_ROUGH.quantization_error() * 2.0;
        assert!((out.x - expected).abs() <= tolerance);
        assert!((out.y - expected).abs() <= tolerance);
        assert!(out.z > 0.0);
    }

    #[test]
    fn angles_wrap() {
        assert_eq!(wrap_angle(370.0), 10.0);
        assert_eq!(wrap_angle(-90.0), 270.0);
        assert_eq!(wrap_angle(720.0), 0.0);
        let input = Vec3 {
            x: -90.0,
            y: 450.0,
            z: 180.0,
        };
        let (out, bits) = roundtrip(&parse("angles"), &input);
        assert_eq!(bits, 28);
        assert!((out.x - 270.0).abs() <= SMALL_PITCH.quantization_error());
        assert!((out.y - 90.0).abs() <= SMALL_YAW.quantization_error());
        assert!((out.z - 180.0).abs() <= SMALL_ROLL.quantization_error());
    }

    #[test]
    fn pitch_yaw_leaves_third_component() {
        let input = Vec3 {
            x: 45.0,
            y: -45.0,
            z: 99.0,
        };
        let (out, bits) = roundtrip(&parse("pitchYaw"), &input);
        assert_eq!(bits, 32);
        assert_eq!(out.z, 0.0);
        assert!((out.y - 315.0).abs() <= FULL_ANGLE.quantization_error());
    }

    #[test]
    fn unpack_on_exhausted_stream_leaves_value() {
        let mut value = Vec3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        };
        let bytes = [0xFFu8; 4];
        let mut reader = BitReader::new(&bytes);
        let err = parse("pos").unpack_data(&mut value, &mut reader).unwrap_err();
        assert!(matches!(err, PackError::Bit(_)));
        assert_eq!(
            value,
            Vec3 {
                x: 1.0,
                y: 2.0,
                z: 3.0
            }
        );
    }

    #[test]
    fn pack_rejects_wrong_value_type() {
        let mut writer = BitWriter::new();
        let err = parse("b").pack_data(&5u8, &mut writer).unwrap_err();
        assert!(matches!(err, PackError::TypeMismatch { expected: "bool", .. }));
    }
}
