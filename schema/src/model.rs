//! Compiled per-type schemas.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use tracing::error;

use crate::error::{SchemaError, SchemaResult};
use crate::hash::model_checksum;
use crate::packing::{FieldPacking, PackingMode};
use crate::reflect::{TypeInfo, TypeKind};
use crate::repository::ModelCache;

/// What a data model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataModelKind {
    /// A structure with object identity.
    Object,
    /// A plain value structure.
    Struct,
    /// The argument list of a remote call.
    Function,
}

/// How one field travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataModelFieldType {
    /// Packed through its [`FieldPacking`].
    Packed,
    /// Nested structure encoded through its own model.
    Struct,
    /// Interned name, sent as a string-table id.
    StringId,
    /// Owned text, sent inline.
    StringBuf,
    /// Type reference, sent as a path id.
    TypeRef,
    /// Strong object reference, sent as an object id.
    ObjectPtr,
    /// Weak object reference, sent as an object id.
    WeakObjectPtr,
    /// Resource reference, sent as a type path id and a resource path id.
    ResourceRef,
}

/// One field of a [`DataModel`].
#[derive(Debug, Clone)]
pub struct DataModelField {
    field_type: DataModelFieldType,
    is_array: bool,
    packing: FieldPacking,
    nested: Option<Weak<DataModel>>,
    native_name: &'static str,
    native_index: usize,
    native_offset: usize,
    native_size: usize,
    native_type: &'static TypeInfo,
}

impl DataModelField {
    #[must_use]
    pub const fn field_type(&self) -> DataModelFieldType {
        self.field_type
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.is_array
    }

    #[must_use]
    pub const fn packing(&self) -> &FieldPacking {
        &self.packing
    }

    /// Model of a nested structure field.
    ///
    /// Nested models are owned by the repository; this returns `None` once it is gone.
    #[must_use]
    pub fn nested_model(&self) -> Option<Arc<DataModel>> {
        self.nested.as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub const fn native_name(&self) -> &'static str {
        self.native_name
    }

    /// Property index in the owning structure, or argument index for functions.
    #[must_use]
    pub const fn native_index(&self) -> usize {
        self.native_index
    }

    #[must_use]
    pub const fn native_offset(&self) -> usize {
        self.native_offset
    }

    #[must_use]
    pub const fn native_size(&self) -> usize {
        self.native_size
    }

    /// Type of one value: the element type for arrays.
    #[must_use]
    pub const fn native_type(&self) -> &'static TypeInfo {
        self.native_type
    }

    /// Fixed bit cost of this field, or `None` if it depends on the data.
    #[must_use]
    pub fn fixed_bit_count(&self) -> Option<usize> {
        if self.is_array {
            return None;
        }
        match self.field_type {
            DataModelFieldType::Packed => self.packing.bit_count_for(self.native_type),
            DataModelFieldType::Struct => self.nested_model()?.fixed_bit_count(),
            _ => None,
        }
    }
}

impl fmt::Display for DataModelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {:?}", self.native_name, self.field_type)?;
        if self.is_array {
            f.write_str("[]")?;
        }
        if let Some(nested) = self.nested_model() {
            write!(f, " -> '{}'", nested.name())?;
        }
        write!(
            f,
            " at offset {} size {}",
            self.native_offset, self.native_size
        )?;
        let descriptor = self.packing.to_string();
        if !descriptor.is_empty() {
            write!(f, " packing '{descriptor}'")?;
        }
        Ok(())
    }
}

/// Compiled schema for one structure type or function signature.
///
/// Fields are fixed once the model is published; the order of
/// [`fields`](Self::fields) is the wire order.
#[derive(Debug)]
pub struct DataModel {
    name: String,
    kind: DataModelKind,
    fields: OnceLock<Vec<DataModelField>>,
    checksum: OnceLock<u64>,
}

impl DataModel {
    /// An empty model registered before its fields are built.
    pub(crate) fn placeholder(name: &str, kind: DataModelKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            fields: OnceLock::new(),
            checksum: OnceLock::new(),
        }
    }

    /// Freezes the field list.
    pub(crate) fn publish(&self, fields: Vec<DataModelField>) {
        let checksum = model_checksum(&self.name, self.kind, &fields);
        let _ = self.fields.set(fields);
        let _ = self.checksum.set(checksum);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> DataModelKind {
        self.kind
    }

    /// Fields in wire order. Empty while the model is still being built.
    #[must_use]
    pub fn fields(&self) -> &[DataModelField] {
        self.fields.get().map_or(&[], Vec::as_slice)
    }

    /// Looks up a field by its native name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&DataModelField> {
        self.fields().iter().find(|field| field.native_name == name)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.fields.get().is_some()
    }

    /// Digest of the model layout. Peers with equal checksums agree on the wire format.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        self.checksum.get().copied().unwrap_or_default()
    }

    /// Total bit cost when every field has a fixed cost.
    #[must_use]
    pub fn fixed_bit_count(&self) -> Option<usize> {
        self.fields()
            .iter()
            .try_fold(0, |total, field| Some(total + field.fixed_bit_count()?))
    }
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model for '{}' ({:?}), {} field(s)",
            self.name,
            self.kind,
            self.fields().len()
        )?;
        for (index, field) in self.fields().iter().enumerate() {
            writeln!(f, "  Field[{index}]: {field}")?;
        }
        Ok(())
    }
}

/// A replicated property or argument about to become a field.
pub(crate) struct FieldSource<'a> {
    pub owner: &'a str,
    pub name: &'static str,
    pub index: usize,
    pub offset: usize,
    pub ty: &'static TypeInfo,
    pub annotation: &'a str,
}

/// Builds the field list for `sources`.
///
/// Fields that cannot be packed are logged and left out. A descriptor that
/// does not parse fails the whole model.
pub(crate) fn build_fields(
    cache: &mut ModelCache,
    sources: Vec<FieldSource<'_>>,
) -> SchemaResult<Vec<DataModelField>> {
    let mut fields = Vec::with_capacity(sources.len());
    for source in sources {
        if let Some(field) = build_field(cache, &source)? {
            fields.push(field);
        }
    }
    Ok(fields)
}

fn build_field(
    cache: &mut ModelCache,
    source: &FieldSource<'_>,
) -> SchemaResult<Option<DataModelField>> {
    let owner = source.owner;
    let property = source.name;
    let packing =
        FieldPacking::parse(source.annotation).map_err(|err| SchemaError::InvalidPacking {
            owner: owner.to_owned(),
            property: property.to_owned(),
            descriptor: source.annotation.to_owned(),
            source: err,
        })?;

    let (data_type, is_array) = match source.ty.array_element() {
        Some(element) => (element, true),
        None => (source.ty, false),
    };

    if !is_array && packing.max_count > 0 {
        error!(owner, property, "maxCount is only allowed on array properties");
        return Ok(None);
    }
    if packing.max_length > 0 && !matches!(data_type.kind(), TypeKind::String) {
        error!(owner, property, "maxLength is only allowed on string properties");
        return Ok(None);
    }

    let mut nested = None;
    let field_type = match data_type.kind() {
        TypeKind::String => DataModelFieldType::StringBuf,
        TypeKind::Symbol => DataModelFieldType::StringId,
        TypeKind::TypeRef => DataModelFieldType::TypeRef,
        TypeKind::ObjectRef => DataModelFieldType::ObjectPtr,
        TypeKind::WeakObjectRef => DataModelFieldType::WeakObjectPtr,
        TypeKind::ResourceRef => DataModelFieldType::ResourceRef,
        TypeKind::Struct(_) if packing.mode == PackingMode::Default => {
            match cache.model_for_type(data_type) {
                Ok(model) => {
                    nested = Some(Arc::downgrade(&model));
                    DataModelFieldType::Struct
                }
                Err(err) => {
                    error!(owner, property, %err, "no data model for nested structure");
                    return Ok(None);
                }
            }
        }
        _ => {
            if !packing.check_type_compatibility(data_type, is_array) {
                error!(
                    owner,
                    property,
                    packing = %packing,
                    native_type = data_type.name(),
                    "packing is not compatible with the property type"
                );
                return Ok(None);
            }
            DataModelFieldType::Packed
        }
    };

    if !matches!(
        field_type,
        DataModelFieldType::Packed | DataModelFieldType::Struct
    ) && packing.mode != PackingMode::Default
    {
        error!(
            owner,
            property,
            packing = %packing,
            "packing modes only apply to primitive and structure properties"
        );
        return Ok(None);
    }

    Ok(Some(DataModelField {
        field_type,
        is_array,
        packing,
        nested,
        native_name: source.name,
        native_index: source.index,
        native_offset: source.offset,
        native_size: source.ty.size(),
        native_type: data_type,
    }))
}
