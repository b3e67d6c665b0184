//! Schema types and the per-type codec dispatch.
//!
//! A [Type] is a closed set of shapes: scalars, homogeneous lists, maps with scalar keys, and
//! references to other models. Every encode and decode matches on it exhaustively.

use crate::{
    config::Scope, value::Record, BufferError, Error, InputError, Model, Value,
};
use bytes::{Buf, BufMut};
use std::{fmt, sync::Arc};

pub mod list;
pub mod map;
pub mod reference;
pub mod scalar;

pub use reference::{Declaration, ModelRef};

/// The primitive kinds a value can have on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    Bytes,
}

impl ScalarKind {
    /// Every kind, in declaration order.
    pub const ALL: [ScalarKind; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Text,
        Self::Bytes,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }

    /// The encoded width of fixed-size kinds. `None` for length-prefixed kinds.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::Text | Self::Bytes => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a field.
#[derive(Clone, Debug)]
pub enum Type {
    Scalar(ScalarKind),
    List(Box<Type>),
    Map(ScalarKind, Box<Type>),
    Model(ModelRef),
}

impl Type {
    pub const BOOL: Self = Self::Scalar(ScalarKind::Bool);
    pub const I8: Self = Self::Scalar(ScalarKind::I8);
    pub const I16: Self = Self::Scalar(ScalarKind::I16);
    pub const I32: Self = Self::Scalar(ScalarKind::I32);
    pub const I64: Self = Self::Scalar(ScalarKind::I64);
    pub const U8: Self = Self::Scalar(ScalarKind::U8);
    pub const U16: Self = Self::Scalar(ScalarKind::U16);
    pub const U32: Self = Self::Scalar(ScalarKind::U32);
    pub const U64: Self = Self::Scalar(ScalarKind::U64);
    pub const F32: Self = Self::Scalar(ScalarKind::F32);
    pub const F64: Self = Self::Scalar(ScalarKind::F64);
    pub const TEXT: Self = Self::Scalar(ScalarKind::Text);
    pub const BYTES: Self = Self::Scalar(ScalarKind::Bytes);

    /// A homogeneous list of `element`.
    pub fn list(element: impl Into<Type>) -> Self {
        Self::List(Box::new(element.into()))
    }

    /// A map from `key` scalars to `value`.
    pub fn map(key: ScalarKind, value: impl Into<Type>) -> Self {
        Self::Map(key, Box::new(value.into()))
    }

    /// A nested reference to an already constructed model.
    pub fn model(model: &Arc<Model>) -> Self {
        Self::Model(ModelRef::bound(model))
    }

    /// Returns the name of the first referenced model that can no longer be reached.
    pub(crate) fn dangling(&self) -> Option<&str> {
        match self {
            Self::Scalar(_) => None,
            Self::List(element) => element.dangling(),
            Self::Map(_, value) => value.dangling(),
            Self::Model(reference) => reference.is_dangling().then(|| reference.name()),
        }
    }

    /// Encodes `value` as this type.
    pub(crate) fn write(
        &self,
        value: &Value,
        buf: &mut impl BufMut,
        scope: Scope<'_>,
    ) -> Result<(), Error> {
        match self {
            Self::Scalar(kind) => Ok(scalar::write(*kind, value, buf)?),
            Self::List(element) => list::write(element, value, buf, scope),
            Self::Map(key, element) => map::write(*key, element, value, buf, scope),
            Self::Model(reference) => {
                let model = reference.resolve()?;
                let scope = scope
                    .nested()
                    .ok_or(InputError::TooDeep(scope.cfg.max_depth))?;
                reference::write(&model, value, buf, scope)
            }
        }
    }

    /// Decodes a value of this type into its canonical dynamic representation.
    pub(crate) fn read(&self, buf: &mut impl Buf, scope: Scope<'_>) -> Result<Value, Error> {
        match self {
            Self::Scalar(kind) => Ok(scalar::read(*kind, buf, scope.cfg)?.into()),
            Self::List(element) => list::read(element, buf, scope),
            Self::Map(key, element) => map::read(*key, element, buf, scope),
            Self::Model(reference) => {
                let model = reference.resolve()?;
                let scope = scope
                    .nested()
                    .ok_or(BufferError::TooDeep(scope.cfg.max_depth))?;
                let mut record = Record::new();
                model.read_body(buf, &mut record, scope)?;
                Ok(Value::Record(record))
            }
        }
    }
}

impl From<ScalarKind> for Type {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::List(element) => write!(f, "list of {element}"),
            Self::Map(key, value) => write!(f, "map ({key} -> {value})"),
            Self::Model(reference) => write!(f, "model {}", reference.name()),
        }
    }
}
