//! Shared cache of compiled data models.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{SchemaError, SchemaResult};
use crate::function::FunctionInfo;
use crate::model::{build_fields, DataModel, DataModelKind, FieldSource};
use crate::reflect::{TypeInfo, Typed};

/// Builds and caches one [`DataModel`] per structure type and per function.
///
/// A model is registered before its fields are built, so a structure that
/// contains itself resolves to the model under construction. If a build fails
/// every model registered during it is dropped again.
#[derive(Debug, Default)]
pub struct DataModelRepository {
    cache: Mutex<ModelCache>,
}

impl DataModelRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the model for a structure type, building it on first use.
    pub fn build_model_for_type(&self, info: &'static TypeInfo) -> SchemaResult<Arc<DataModel>> {
        let mut cache = self.cache.lock();
        let model = cache.model_for_type(info);
        cache.settle(model.is_ok());
        model
    }

    /// Typed shorthand for [`build_model_for_type`](Self::build_model_for_type).
    pub fn model_for<T: Typed>(&self) -> SchemaResult<Arc<DataModel>> {
        self.build_model_for_type(T::type_info())
    }

    /// Returns the argument model for a function, building it on first use.
    ///
    /// Functions are cached by name.
    pub fn build_model_for_function(&self, info: &FunctionInfo) -> SchemaResult<Arc<DataModel>> {
        let mut cache = self.cache.lock();
        let model = cache.model_for_function(info);
        cache.settle(model.is_ok());
        model
    }

    /// Returns a cached model without building it.
    #[must_use]
    pub fn cached(&self, info: &TypeInfo) -> Option<Arc<DataModel>> {
        self.cache.lock().types.get(&info.type_id()).cloned()
    }

    /// Returns a cached function model without building it.
    #[must_use]
    pub fn cached_function(&self, name: &str) -> Option<Arc<DataModel>> {
        self.cache.lock().functions.get(name).cloned()
    }

    /// Number of cached structure and function models.
    #[must_use]
    pub fn len(&self) -> usize {
        let cache = self.cache.lock();
        cache.types.len() + cache.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache state guarded by the repository lock.
#[derive(Debug, Default)]
pub(crate) struct ModelCache {
    types: HashMap<TypeId, Arc<DataModel>>,
    functions: HashMap<String, Arc<DataModel>>,
    /// Types registered since the outermost build started.
    pending: Vec<TypeId>,
}

impl ModelCache {
    /// Returns or builds the model for `info`. Called with the lock held.
    pub(crate) fn model_for_type(&mut self, info: &'static TypeInfo) -> SchemaResult<Arc<DataModel>> {
        let type_id = info.type_id();
        if let Some(model) = self.types.get(&type_id) {
            return Ok(Arc::clone(model));
        }

        let structure = info.as_struct().ok_or_else(|| SchemaError::NotAStructure {
            name: info.name().to_owned(),
        })?;
        let kind = if structure.is_object() {
            DataModelKind::Object
        } else {
            DataModelKind::Struct
        };

        let model = Arc::new(DataModel::placeholder(info.name(), kind));
        let mark = self.pending.len();
        self.types.insert(type_id, Arc::clone(&model));
        self.pending.push(type_id);

        let owner = info.name();
        let sources = structure
            .properties()
            .iter()
            .enumerate()
            .filter_map(|(index, prop)| match prop.annotation() {
                Some(annotation) => Some(FieldSource {
                    owner,
                    name: prop.name(),
                    index,
                    offset: prop.offset(),
                    ty: prop.type_info(),
                    annotation,
                }),
                None => {
                    trace!(owner, property = prop.name(), "property is not replicated");
                    None
                }
            })
            .collect();

        match build_fields(self, sources) {
            Ok(fields) => {
                model.publish(fields);
                debug!(
                    model = owner,
                    fields = model.fields().len(),
                    checksum = model.checksum(),
                    "built data model"
                );
                Ok(model)
            }
            Err(err) => {
                self.rollback(mark);
                Err(err)
            }
        }
    }

    fn model_for_function(&mut self, info: &FunctionInfo) -> SchemaResult<Arc<DataModel>> {
        if let Some(model) = self.functions.get(info.name()) {
            return Ok(Arc::clone(model));
        }

        let owner = info.name();
        let sources = info
            .params()
            .iter()
            .enumerate()
            .map(|(index, param)| FieldSource {
                owner,
                name: param.name(),
                index,
                offset: 0,
                ty: param.type_info(),
                annotation: param.annotation().unwrap_or(""),
            })
            .collect();

        let fields = build_fields(self, sources)?;
        let model = Arc::new(DataModel::placeholder(owner, DataModelKind::Function));
        model.publish(fields);
        debug!(
            function = owner,
            fields = model.fields().len(),
            checksum = model.checksum(),
            "built function model"
        );
        self.functions.insert(owner.to_owned(), Arc::clone(&model));
        Ok(model)
    }

    fn rollback(&mut self, mark: usize) {
        for type_id in self.pending.drain(mark..) {
            self.types.remove(&type_id);
        }
    }

    /// Ends an outermost build.
    fn settle(&mut self, success: bool) {
        if !success {
            self.rollback(0);
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{reflect_struct, DataModelFieldType};

    #[derive(Debug, Default)]
    struct Tree {
        value: u8,
        children: Vec<Tree>,
    }

    reflect_struct!(Tree {
        value: u8 = "u:4",
        children: Vec<Tree> = "maxCount:2",
    });

    #[derive(Debug, Default)]
    struct Broken {
        ok: bool,
        bad: u8,
    }

    reflect_struct!(Broken {
        ok: bool = "b",
        bad: u8 = "u:banana",
    });

    #[derive(Debug, Default)]
    struct HoldsBroken {
        inner: Broken,
        tree: Tree,
    }

    reflect_struct!(HoldsBroken {
        inner: Broken = "",
        tree: Tree = "",
    });

    #[test]
    fn recursive_type_points_at_itself() {
        let repository = DataModelRepository::new();
        let model = repository.model_for::<Tree>().unwrap();
        let children = model.field("children").unwrap();
        assert_eq!(children.field_type(), DataModelFieldType::Struct);
        assert!(children.is_array());
        assert!(Arc::ptr_eq(&children.nested_model().unwrap(), &model));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn models_are_cached() {
        let repository = DataModelRepository::new();
        let first = repository.model_for::<Tree>().unwrap();
        let second = repository.model_for::<Tree>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalid_descriptor_fails_and_leaves_no_entry() {
        let repository = DataModelRepository::new();
        let err = repository.model_for::<Broken>().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPacking { ref property, .. } if property == "bad"));
        assert!(repository.cached(Broken::type_info()).is_none());
        assert!(repository.is_empty());
    }

    #[test]
    fn failed_nested_model_refuses_only_that_field() {
        let repository = DataModelRepository::new();
        let model = repository.model_for::<HoldsBroken>().unwrap();
        assert_eq!(model.fields().len(), 1);
        assert_eq!(model.fields()[0].native_name(), "tree");
        assert!(repository.cached(Broken::type_info()).is_none());
        assert!(repository.cached(Tree::type_info()).is_some());
    }

    #[test]
    fn non_structure_is_rejected() {
        let repository = DataModelRepository::new();
        let err = repository.model_for::<u32>().unwrap_err();
        assert!(matches!(err, SchemaError::NotAStructure { .. }));
    }

    #[test]
    fn function_model_indexes_arguments() {
        let repository = DataModelRepository::new();
        let info = FunctionInfo::new("Chat::say")
            .param::<String>("text", "maxLength:16")
            .plain_param::<u16>("channel")
            .param::<Tree>("attachment", "");
        let model = repository.build_model_for_function(&info).unwrap();
        assert_eq!(model.kind(), DataModelKind::Function);
        let indices: Vec<_> = model.fields().iter().map(|f| f.native_index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(model.fields()[0].field_type(), DataModelFieldType::StringBuf);
        assert_eq!(model.fields()[1].field_type(), DataModelFieldType::Packed);
        assert_eq!(model.fields()[2].field_type(), DataModelFieldType::Struct);
        let again = repository.build_model_for_function(&info).unwrap();
        assert!(Arc::ptr_eq(&model, &again));
        assert!(repository.cached_function("Chat::say").is_some());
    }
}
