//! Name lookup for reflected types.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::trace;

use crate::reflect::{TypeInfo, TypeKind, Typed};

/// Maps type names to their [`TypeInfo`].
///
/// Registering a structure also registers every structure it reaches through
/// its properties, so a receiver only needs to register its root message types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: RwLock<HashMap<String, &'static TypeInfo>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` and the types it reaches.
    pub fn register<T: Typed>(&self) {
        self.register_info(T::type_info());
    }

    /// Registers `info` and the types it reaches.
    pub fn register_info(&self, info: &'static TypeInfo) {
        let mut visited = HashSet::new();
        let mut by_name = self.by_name.write();
        let mut stack = vec![info];
        while let Some(info) = stack.pop() {
            if !visited.insert(info.type_id()) {
                continue;
            }
            if by_name.insert(info.name().to_owned(), info).is_none() {
                trace!(name = info.name(), "registered type");
            }
            match info.kind() {
                TypeKind::Array(element) => stack.push(element.get()),
                TypeKind::Struct(structure) => {
                    stack.extend(structure.properties().iter().map(|prop| prop.type_info()));
                }
                _ => {}
            }
        }
    }

    /// Looks up a type by its full name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&'static TypeInfo> {
        self.by_name.read().get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.read().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
