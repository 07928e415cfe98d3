//! Field packing rules, reflection surface and data models for the replica codec.
//!
//! This crate turns reflected native types into wire schemas:
//! - Quantization of bounded floats and integers
//! - Field packing descriptors such as `"u:6"` or `"f:10,-1,1"`
//! - A reflection surface describing structures, arrays and references
//! - Data models compiled once per type and cached in a [`DataModelRepository`]
//!
//! # Design Principles
//!
//! - **Schema from annotations** - Only properties carrying a packing descriptor are replicated.
//! - **Refuse, don't guess** - Fields whose packing does not fit the native type are left out and logged.
//! - **Deterministic checksums** - Equal model layouts hash equally on every peer.
//!
//! ```
//! use schema::{reflect_struct, DataModelRepository};
//!
//! #[derive(Debug, Default)]
//! struct Player {
//!     alive: bool,
//!     health: u8,
//!     name: String,
//! }
//!
//! reflect_struct!(Player {
//!     alive: bool = "b",
//!     health: u8 = "u:7",
//!     name: String = "maxLength:32",
//! });
//!
//! let repository = DataModelRepository::new();
//! let model = repository.model_for::<Player>().unwrap();
//! assert_eq!(model.fields().len(), 3);
//! ```

mod error;
mod function;
mod hash;
mod model;
mod packing;
mod quantization;
mod reflect;
mod registry;
mod repository;

pub use error::{PackError, PackResult, PackingParseError, SchemaError, SchemaResult};
pub use function::{FunctionInfo, ParamInfo};
pub use model::{DataModel, DataModelField, DataModelFieldType, DataModelKind};
pub use packing::{
    FieldPacking, PackingMode, DELTA_POSITION_BITS, FULL_ANGLE, NORMAL_FULL, NORMAL_ROUGH,
    POSITION_X, POSITION_Y, POSITION_Z, SMALL_PITCH, SMALL_ROLL, SMALL_YAW,
};
pub use quantization::Quantization;
pub use reflect::{
    construct, ObjectRef, Primitive, PrimitiveKind, PropertyInfo, Reflect, ReflectArray,
    ResourceRef, SharedObject, StructInfo, Symbol, TypeHandle, TypeInfo, TypeKind, TypeRef, Typed,
    WeakObjectRef,
};
pub use registry::TypeRegistry;
pub use repository::DataModelRepository;
