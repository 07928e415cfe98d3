//! Mapper and resolver seams between data models and dictionaries.
//!
//! Encoding never writes names, paths or object identities inline. It asks a
//! [`DataModelMapper`] for a small id instead, and decoding asks a
//! [`DataModelResolver`] to turn the id back. Id `0` always stands for the
//! empty string, the empty path and the null object.

use schema::{ObjectRef, TypeInfo, TypeRef, WeakObjectRef};

use crate::error::{CodecError, CodecResult};

/// Dictionary id. Zero is reserved for empty values.
pub type MappedId = u32;

/// Separator of type paths such as `game::Player`.
pub const TYPE_PATH_SEPARATOR: &str = "::";

/// Separator of resource paths such as `textures/stone.png`.
pub const RESOURCE_PATH_SEPARATOR: &str = "/";

/// Send side: maps values to ids, allocating new ids on first use.
pub trait DataModelMapper {
    /// Maps a string. The empty string maps to zero.
    fn map_string(&mut self, text: &str) -> CodecResult<MappedId>;

    /// Maps a path split on `separator`. A path without segments maps to zero.
    fn map_path(&mut self, path: &str, separator: &str) -> CodecResult<MappedId>;

    /// Maps an object by identity. The null object maps to zero.
    fn map_object(&mut self, object: &ObjectRef) -> CodecResult<MappedId>;

    fn map_weak_object(&mut self, object: &WeakObjectRef) -> CodecResult<MappedId> {
        self.map_object(&object.upgrade())
    }

    /// Maps a type reference through its `::` separated name.
    fn map_type_ref(&mut self, ty: TypeRef) -> CodecResult<MappedId> {
        match ty.info() {
            Some(info) => self.map_path(info.name(), TYPE_PATH_SEPARATOR),
            None => Ok(0),
        }
    }
}

/// Receive side: resolves ids announced earlier on the same connection.
pub trait DataModelResolver {
    /// Resolves a string id. Zero resolves to the empty string.
    fn resolve_string(&self, id: MappedId) -> CodecResult<&str>;

    /// Resolves a path id, joining its segments with `separator`.
    fn resolve_path(&self, id: MappedId, separator: &str) -> CodecResult<String>;

    /// Resolves an object id. Zero resolves to the null object.
    fn resolve_object(&self, id: MappedId) -> CodecResult<ObjectRef>;

    /// Looks up a locally known type by full name.
    fn find_type(&self, name: &str) -> Option<&'static TypeInfo>;

    fn resolve_type_ref(&self, id: MappedId) -> CodecResult<TypeRef> {
        if id == 0 {
            return Ok(TypeRef::none());
        }
        let name = self.resolve_path(id, TYPE_PATH_SEPARATOR)?;
        match self.find_type(&name) {
            Some(info) => Ok(TypeRef::from_info(info)),
            None => Err(CodecError::UnknownType { name }),
        }
    }
}
