//! Reflection query surface consumed by the model builder.
//!
//! Types describe themselves through a [`TypeInfo`] (name, size, kind and, for
//! structures, their properties with offsets and packing annotations). Values
//! are reached through the [`Reflect`] accessor view instead of raw offsets.
//!
//! Plain structures get both through [`reflect_struct!`](crate::reflect_struct).

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

/// Kinds of primitive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Native size in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Returns `true` for unsigned integer kinds.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Returns `true` for signed integer kinds.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }
}

/// A primitive value read from or written through [`Reflect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Primitive {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Raw bit pattern, zero-extended to 64 bits.
    #[must_use]
    pub fn to_bits(self) -> u64 {
        match self {
            Self::Bool(v) => v as u64,
            Self::U8(v) => v as u64,
            Self::U16(v) => v as u64,
            Self::U32(v) => v as u64,
            Self::U64(v) => v,
            Self::I8(v) => v as u8 as u64,
            Self::I16(v) => v as u16 as u64,
            Self::I32(v) => v as u32 as u64,
            Self::I64(v) => v as u64,
            Self::F32(v) => v.to_bits() as u64,
            Self::F64(v) => v.to_bits(),
        }
    }

    /// Rebuilds a value of `kind` from its raw bit pattern.
    #[must_use]
    pub fn from_bits(kind: PrimitiveKind, bits: u64) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(bits != 0),
            PrimitiveKind::U8 => Self::U8(bits as u8),
            PrimitiveKind::U16 => Self::U16(bits as u16),
            PrimitiveKind::U32 => Self::U32(bits as u32),
            PrimitiveKind::U64 => Self::U64(bits),
            PrimitiveKind::I8 => Self::I8(bits as u8 as i8),
            PrimitiveKind::I16 => Self::I16(bits as u16 as i16),
            PrimitiveKind::I32 => Self::I32(bits as u32 as i32),
            PrimitiveKind::I64 => Self::I64(bits as i64),
            PrimitiveKind::F32 => Self::F32(f32::from_bits(bits as u32)),
            PrimitiveKind::F64 => Self::F64(f64::from_bits(bits)),
        }
    }

    /// Value of an unsigned integer, if this is one.
    #[must_use]
    pub const fn as_unsigned(self) -> Option<u64> {
        match self {
            Self::U8(v) => Some(v as u64),
            Self::U16(v) => Some(v as u64),
            Self::U32(v) => Some(v as u64),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }

    /// Value of a signed integer, if this is one.
    #[must_use]
    pub const fn as_signed(self) -> Option<i64> {
        match self {
            Self::I8(v) => Some(v as i64),
            Self::I16(v) => Some(v as i64),
            Self::I32(v) => Some(v as i64),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Builds an unsigned integer of `kind`, saturating at its maximum.
    #[must_use]
    pub fn from_unsigned(kind: PrimitiveKind, value: u64) -> Option<Self> {
        Some(match kind {
            PrimitiveKind::U8 => Self::U8(u8::try_from(value).unwrap_or(u8::MAX)),
            PrimitiveKind::U16 => Self::U16(u16::try_from(value).unwrap_or(u16::MAX)),
            PrimitiveKind::U32 => Self::U32(u32::try_from(value).unwrap_or(u32::MAX)),
            PrimitiveKind::U64 => Self::U64(value),
            _ => return None,
        })
    }

    /// Builds a signed integer of `kind`, saturating at its bounds.
    #[must_use]
    pub fn from_signed(kind: PrimitiveKind, value: i64) -> Option<Self> {
        Some(match kind {
            PrimitiveKind::I8 => Self::I8(value.clamp(i8::MIN.into(), i8::MAX.into()) as i8),
            PrimitiveKind::I16 => Self::I16(value.clamp(i16::MIN.into(), i16::MAX.into()) as i16),
            PrimitiveKind::I32 => Self::I32(value.clamp(i32::MIN.into(), i32::MAX.into()) as i32),
            PrimitiveKind::I64 => Self::I64(value),
            _ => return None,
        })
    }
}

/// Shape of a reflected type.
#[derive(Debug)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    /// Owned text buffer.
    String,
    /// Interned name, replicated as a string-table id.
    Symbol,
    /// Reference to a reflected structure type.
    TypeRef,
    /// Strong reference to a shared object.
    ObjectRef,
    /// Weak reference to a shared object.
    WeakObjectRef,
    /// Typed path to an external resource.
    ResourceRef,
    /// Growable array of the inner type.
    Array(TypeHandle),
    Struct(StructInfo),
}

/// Lazily resolved reference to a [`TypeInfo`].
///
/// Holding a function instead of the info itself lets a type mention itself
/// among its own properties.
#[derive(Clone, Copy)]
pub struct TypeHandle(fn() -> &'static TypeInfo);

impl TypeHandle {
    /// Wraps a type info accessor.
    #[must_use]
    pub const fn new(get: fn() -> &'static TypeInfo) -> Self {
        Self(get)
    }

    /// Handle for `T`.
    #[must_use]
    pub const fn of<T: Typed>() -> Self {
        Self(T::type_info)
    }

    /// Resolves the handle.
    #[must_use]
    pub fn get(self) -> &'static TypeInfo {
        (self.0)()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.get().name()).finish()
    }
}

/// One reflected property of a structure.
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    name: &'static str,
    offset: usize,
    ty: TypeHandle,
    annotation: Option<&'static str>,
}

impl PropertyInfo {
    /// Creates a property description.
    ///
    /// `annotation` is the packing descriptor; `None` means the property is not replicated.
    #[must_use]
    pub const fn new(
        name: &'static str,
        offset: usize,
        ty: TypeHandle,
        annotation: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            offset,
            ty,
            annotation,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Byte offset inside the owning structure.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.ty.get()
    }

    /// Byte size of the property.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ty.get().size()
    }

    #[must_use]
    pub const fn annotation(&self) -> Option<&'static str> {
        self.annotation
    }
}

/// Property list of a structure type.
#[derive(Debug)]
pub struct StructInfo {
    object: bool,
    properties: Vec<PropertyInfo>,
}

impl StructInfo {
    /// Creates a structure description. `object` marks types with object identity.
    #[must_use]
    pub const fn new(object: bool, properties: Vec<PropertyInfo>) -> Self {
        Self { object, properties }
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        self.object
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Number of `f32` components if the structure is made only of contiguous
    /// `f32` properties, otherwise zero.
    #[must_use]
    pub fn contiguous_float_count(&self) -> usize {
        let float_size = PrimitiveKind::F32.size();
        let contiguous = self.properties.iter().enumerate().all(|(index, prop)| {
            prop.offset == index * float_size
                && matches!(
                    prop.type_info().kind(),
                    TypeKind::Primitive(PrimitiveKind::F32)
                )
        });
        if contiguous {
            self.properties.len()
        } else {
            0
        }
    }
}

/// Description of a reflected type.
pub struct TypeInfo {
    name: Cow<'static, str>,
    type_id: TypeId,
    size: usize,
    kind: TypeKind,
    constructor: Option<fn() -> Box<dyn Reflect>>,
}

impl TypeInfo {
    /// Describes `T` with the given name and kind.
    #[must_use]
    pub fn new<T: Any>(name: impl Into<Cow<'static, str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            kind,
            constructor: None,
        }
    }

    /// Attaches a constructor producing a default instance.
    #[must_use]
    pub fn with_constructor(mut self, constructor: fn() -> Box<dyn Reflect>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Fully qualified name, `::`-separated.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Native size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Property list, if this is a structure.
    #[must_use]
    pub const fn as_struct(&self) -> Option<&StructInfo> {
        match &self.kind {
            TypeKind::Struct(info) => Some(info),
            _ => None,
        }
    }

    /// Element type, if this is an array.
    #[must_use]
    pub fn array_element(&self) -> Option<&'static Self> {
        match &self.kind {
            TypeKind::Array(inner) => Some(inner.get()),
            _ => None,
        }
    }

    /// Creates a default instance, if the type registered a constructor.
    #[must_use]
    pub fn create_instance(&self) -> Option<Box<dyn Reflect>> {
        self.constructor.map(|construct| construct())
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeInfo {}

/// Runtime accessor view over a reflected value.
pub trait Reflect: Any + Send + Sync {
    /// Type description of the concrete value.
    fn reflected_type(&self) -> &'static TypeInfo;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Property `index` of a structure, in declaration order.
    fn field(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }

    fn as_array(&self) -> Option<&dyn ReflectArray> {
        None
    }

    fn as_array_mut(&mut self) -> Option<&mut dyn ReflectArray> {
        None
    }

    /// The value, if this is a primitive.
    fn primitive(&self) -> Option<Primitive> {
        None
    }

    /// Stores `value` if it has this primitive's exact kind. Returns `false` otherwise.
    fn set_primitive(&mut self, _value: Primitive) -> bool {
        false
    }
}

/// Types with a statically known [`TypeInfo`].
pub trait Typed: Reflect + Sized {
    fn type_info() -> &'static TypeInfo;
}

/// Accessor view over a reflected array.
pub trait ReflectArray {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect>;

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    /// Grows or shrinks to exactly `len` elements. New elements are defaults.
    fn resize(&mut self, len: usize);
}

impl dyn Reflect {
    /// Downcasts to a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcasts to a concrete mutable type.
    #[must_use]
    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Default constructor used by [`TypeInfo::with_constructor`].
#[must_use]
pub fn construct<T: Reflect + Default>() -> Box<dyn Reflect> {
    Box::new(T::default())
}

/// Returns the shared info for a generic instantiation, building it once.
fn generic_type_info<T: Any>(build: impl FnOnce() -> TypeInfo) -> &'static TypeInfo {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, &'static TypeInfo>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();
    if let Some(info) = cache.read().get(&key) {
        return info;
    }
    // Built outside the lock: nested generics re-enter this function.
    let info = build();
    *cache
        .write()
        .entry(key)
        .or_insert_with(|| Box::leak(Box::new(info)))
}

/// Interned name replicated through the string table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a reflected type, or none.
#[derive(Clone, Copy, Default)]
pub struct TypeRef(Option<&'static TypeInfo>);

impl TypeRef {
    /// Reference to `T`.
    #[must_use]
    pub fn of<T: Typed>() -> Self {
        Self(Some(T::type_info()))
    }

    #[must_use]
    pub const fn from_info(info: &'static TypeInfo) -> Self {
        Self(Some(info))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn info(&self) -> Option<&'static TypeInfo> {
        self.0
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.map(TypeInfo::type_id) == other.0.map(TypeInfo::type_id)
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(info) => write!(f, "TypeRef({})", info.name()),
            None => f.write_str("TypeRef(null)"),
        }
    }
}

/// Payload type behind an [`ObjectRef`].
pub type SharedObject = dyn Any + Send + Sync;

/// Strong reference to a shared object. Identity is the allocation address.
#[derive(Clone, Default)]
pub struct ObjectRef(Option<Arc<SharedObject>>);

impl ObjectRef {
    /// Wraps a new object.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self(Some(Arc::new(object)))
    }

    #[must_use]
    pub fn from_arc(object: Arc<SharedObject>) -> Self {
        Self(Some(object))
    }

    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Address identifying the object, `None` for null.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        self.0.as_ref().map(|arc| Arc::as_ptr(arc).cast::<()>() as usize)
    }

    /// Downcasts to a concrete object type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone()?.downcast::<T>().ok()
    }

    /// Creates a weak reference to the same object.
    #[must_use]
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(self.0.as_ref().map(Arc::downgrade))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(address) => write!(f, "ObjectRef({address:#x})"),
            None => f.write_str("ObjectRef(null)"),
        }
    }
}

/// Weak reference to a shared object.
#[derive(Clone, Default)]
pub struct WeakObjectRef(Option<Weak<SharedObject>>);

impl WeakObjectRef {
    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    /// Strong reference if the object is still alive, null otherwise.
    #[must_use]
    pub fn upgrade(&self) -> ObjectRef {
        ObjectRef(self.0.as_ref().and_then(Weak::upgrade))
    }

    /// Address identifying the object, `None` if null or dropped.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        self.upgrade().identity()
    }
}

impl From<&ObjectRef> for WeakObjectRef {
    fn from(object: &ObjectRef) -> Self {
        object.downgrade()
    }
}

impl PartialEq for WeakObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(address) => write!(f, "WeakObjectRef({address:#x})"),
            None => f.write_str("WeakObjectRef(null)"),
        }
    }
}

/// Typed `/`-separated path to an external resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRef {
    class: TypeRef,
    path: String,
}

impl ResourceRef {
    #[must_use]
    pub fn new(class: TypeRef, path: impl Into<String>) -> Self {
        Self {
            class,
            path: path.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> TypeRef {
        self.class
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A resource reference without a path carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

macro_rules! impl_reflect_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Typed for $ty {
                fn type_info() -> &'static TypeInfo {
                    static INFO: OnceLock<TypeInfo> = OnceLock::new();
                    INFO.get_or_init(|| {
                        TypeInfo::new::<$ty>(
                            stringify!($ty),
                            TypeKind::Primitive(PrimitiveKind::$variant),
                        )
                        .with_constructor(construct::<$ty>)
                    })
                }
            }

            impl Reflect for $ty {
                fn reflected_type(&self) -> &'static TypeInfo {
                    <$ty as Typed>::type_info()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }

                fn primitive(&self) -> Option<Primitive> {
                    Some(Primitive::$variant(*self))
                }

                fn set_primitive(&mut self, value: Primitive) -> bool {
                    if let Primitive::$variant(inner) = value {
                        *self = inner;
                        true
                    } else {
                        false
                    }
                }
            }
        )*
    };
}

impl_reflect_primitive!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

macro_rules! impl_reflect_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Typed for $ty {
                fn type_info() -> &'static TypeInfo {
                    static INFO: OnceLock<TypeInfo> = OnceLock::new();
                    INFO.get_or_init(|| {
                        TypeInfo::new::<$ty>(stringify!($ty), TypeKind::$kind)
                            .with_constructor(construct::<$ty>)
                    })
                }
            }

            impl Reflect for $ty {
                fn reflected_type(&self) -> &'static TypeInfo {
                    <$ty as Typed>::type_info()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }
        )*
    };
}

impl_reflect_value!(
    String => String,
    Symbol => Symbol,
    TypeRef => TypeRef,
    ObjectRef => ObjectRef,
    WeakObjectRef => WeakObjectRef,
    ResourceRef => ResourceRef,
);

impl<T: Typed + Default> Typed for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        generic_type_info::<Self>(|| {
            TypeInfo::new::<Self>(
                format!("Vec<{}>", T::type_info().name()),
                TypeKind::Array(TypeHandle::of::<T>()),
            )
            .with_constructor(construct::<Self>)
        })
    }
}

impl<T: Typed + Default> Reflect for Vec<T> {
    fn reflected_type(&self) -> &'static TypeInfo {
        <Self as Typed>::type_info()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_array(&self) -> Option<&dyn ReflectArray> {
        Some(self)
    }

    fn as_array_mut(&mut self) -> Option<&mut dyn ReflectArray> {
        Some(self)
    }
}

impl<T: Typed + Default> ReflectArray for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|element| element as &dyn Reflect)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.get_mut(index).map(|element| element as &mut dyn Reflect)
    }

    fn resize(&mut self, len: usize) {
        self.resize_with(len, T::default);
    }
}

/// Implements [`Typed`] and [`Reflect`] for a plain structure.
///
/// Each property is listed as `name: Type = "descriptor"` when replicated, or
/// `name: Type` when not. The `object` prefix marks a type with object identity.
/// The structure must implement `Default`.
///
/// ```
/// use schema::{reflect_struct, Typed};
///
/// #[derive(Debug, Default)]
/// #[repr(C)]
/// struct Vector3 {
///     x: f32,
///     y: f32,
///     z: f32,
/// }
///
/// reflect_struct!(Vector3 {
///     x: f32 = "",
///     y: f32 = "",
///     z: f32 = "",
/// });
///
/// let info = Vector3::type_info();
/// assert_eq!(info.as_struct().unwrap().contiguous_float_count(), 3);
/// ```
#[macro_export]
macro_rules! reflect_struct {
    (@annotation) => {
        ::core::option::Option::None
    };
    (@annotation $annotation:literal) => {
        ::core::option::Option::Some($annotation)
    };
    (@impl $object:literal, $name:ident { $($field:ident : $ty:ty $(= $annotation:literal)?),* $(,)? }) => {
        impl $crate::Typed for $name {
            fn type_info() -> &'static $crate::TypeInfo {
                static INFO: ::std::sync::OnceLock<$crate::TypeInfo> = ::std::sync::OnceLock::new();
                INFO.get_or_init(|| {
                    $crate::TypeInfo::new::<$name>(
                        concat!(module_path!(), "::", stringify!($name)),
                        $crate::TypeKind::Struct($crate::StructInfo::new(
                            $object,
                            vec![$(
                                $crate::PropertyInfo::new(
                                    stringify!($field),
                                    ::core::mem::offset_of!($name, $field),
                                    $crate::TypeHandle::of::<$ty>(),
                                    $crate::reflect_struct!(@annotation $($annotation)?),
                                ),
                            )*],
                        )),
                    )
                    .with_constructor($crate::construct::<$name>)
                })
            }
        }

        impl $crate::Reflect for $name {
            fn reflected_type(&self) -> &'static $crate::TypeInfo {
                <Self as $crate::Typed>::type_info()
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            #[allow(unused_assignments)]
            fn field(&self, index: usize) -> Option<&dyn $crate::Reflect> {
                let mut slot = 0usize;
                $(
                    if index == slot {
                        return Some(&self.$field);
                    }
                    slot += 1;
                )*
                None
            }

            #[allow(unused_assignments)]
            fn field_mut(&mut self, index: usize) -> Option<&mut dyn $crate::Reflect> {
                let mut slot = 0usize;
                $(
                    if index == slot {
                        return Some(&mut self.$field);
                    }
                    slot += 1;
                )*
                None
            }
        }
    };
    (object $name:ident { $($body:tt)* }) => {
        $crate::reflect_struct!(@impl true, $name { $($body)* });
    };
    ($name:ident { $($body:tt)* }) => {
        $crate::reflect_struct!(@impl false, $name { $($body)* });
    };
}
