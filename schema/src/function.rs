//! Reflected function signatures for remote calls.

use std::borrow::Cow;

use crate::reflect::{TypeHandle, TypeInfo, Typed};

/// One parameter of a [`FunctionInfo`].
#[derive(Debug, Clone)]
pub struct ParamInfo {
    name: &'static str,
    ty: TypeHandle,
    annotation: Option<&'static str>,
}

impl ParamInfo {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.ty.get()
    }

    /// Packing descriptor, if the parameter has one.
    #[must_use]
    pub const fn annotation(&self) -> Option<&'static str> {
        self.annotation
    }
}

/// Name and parameter list of a callable message.
///
/// ```
/// use schema::FunctionInfo;
///
/// let info = FunctionInfo::new("Chat::say")
///     .param::<String>("text", "maxLength:64")
///     .param::<u8>("channel", "u:3");
/// assert_eq!(info.params().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    name: Cow<'static, str>,
    params: Vec<ParamInfo>,
}

impl FunctionInfo {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter with a packing descriptor.
    #[must_use]
    pub fn param<T: Typed>(mut self, name: &'static str, annotation: &'static str) -> Self {
        self.params.push(ParamInfo {
            name,
            ty: TypeHandle::of::<T>(),
            annotation: Some(annotation),
        });
        self
    }

    /// Appends a parameter encoded with default packing.
    #[must_use]
    pub fn plain_param<T: Typed>(mut self, name: &'static str) -> Self {
        self.params.push(ParamInfo {
            name,
            ty: TypeHandle::of::<T>(),
            annotation: None,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }
}
