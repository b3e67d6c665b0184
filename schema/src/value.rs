//! Dynamically typed values.
//!
//! A [Value] holds whatever a schema [crate::Type] can describe. Decoding into a dynamic destination
//! always produces the canonical variant for each kind (an `int16` field becomes [Value::I16], a
//! `text` field becomes [Value::Text], and so on).

use crate::types::ScalarKind;
use bytes::Bytes;
use std::{cmp::Ordering, collections::BTreeMap, fmt};

/// A dynamically typed value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Bytes),
    List(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    Record(Record),
}

impl Value {
    /// A short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            scalar => scalar.kind().map_or("value", ScalarKind::name),
        }
    }

    /// The scalar kind of this value, if it is a scalar.
    pub fn kind(&self) -> Option<ScalarKind> {
        Some(match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Text(_) => ScalarKind::Text,
            Self::Bytes(_) => ScalarKind::Bytes,
            Self::List(_) | Self::Map(_) | Self::Record(_) => return None,
        })
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Self::$variant(value)
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i8, I8);
impl_from!(i16, I16);
impl_from!(i32, I32);
impl_from!(i64, I64);
impl_from!(u8, U8);
impl_from!(u16, U16);
impl_from!(u32, U32);
impl_from!(u64, U64);
impl_from!(f32, F32);
impl_from!(f64, F64);
impl_from!(String, Text);
impl_from!(Bytes, Bytes);
impl_from!(Vec<Value>, List);
impl_from!(BTreeMap<Key, Value>, Map);
impl_from!(Record, Record);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A scalar value used as a map key.
///
/// Keys are totally ordered (floats by [f64::total_cmp]) so that dynamic maps iterate, and
/// therefore encode, deterministically.
#[derive(Clone, Debug)]
pub enum Key {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Bytes),
}

impl Key {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Text(_) => ScalarKind::Text,
            Self::Bytes(_) => ScalarKind::Bytes,
        }
    }

    /// Converts the key into the equivalent scalar [Value].
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::I8(v) => Value::I8(*v),
            Self::I16(v) => Value::I16(*v),
            Self::I32(v) => Value::I32(*v),
            Self::I64(v) => Value::I64(*v),
            Self::U8(v) => Value::U8(*v),
            Self::U16(v) => Value::U16(*v),
            Self::U32(v) => Value::U32(*v),
            Self::U64(v) => Value::U64(*v),
            Self::F32(v) => Value::F32(*v),
            Self::F64(v) => Value::F64(*v),
            Self::Text(v) => Value::Text(v.clone()),
            Self::Bytes(v) => Value::Bytes(v.clone()),
        }
    }

    fn rank(&self) -> u8 {
        self.kind() as u8
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Bool(v) => Self::Bool(v),
            Key::I8(v) => Self::I8(v),
            Key::I16(v) => Self::I16(v),
            Key::I32(v) => Self::I32(v),
            Key::I64(v) => Self::I64(v),
            Key::U8(v) => Self::U8(v),
            Key::U16(v) => Self::U16(v),
            Key::U32(v) => Self::U32(v),
            Key::U64(v) => Self::U64(v),
            Key::F32(v) => Self::F32(v),
            Key::F64(v) => Self::F64(v),
            Key::Text(v) => Self::Text(v),
            Key::Bytes(v) => Self::Bytes(v),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = Value;

    /// Fails (returning the value) if the value is not a scalar.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Bool(v) => Self::Bool(v),
            Value::I8(v) => Self::I8(v),
            Value::I16(v) => Self::I16(v),
            Value::I32(v) => Self::I32(v),
            Value::I64(v) => Self::I64(v),
            Value::U8(v) => Self::U8(v),
            Value::U16(v) => Self::U16(v),
            Value::U32(v) => Self::U32(v),
            Value::U64(v) => Self::U64(v),
            Value::F32(v) => Self::F32(v),
            Value::F64(v) => Self::F64(v),
            Value::Text(v) => Self::Text(v),
            Value::Bytes(v) => Self::Bytes(v),
            other => return Err(other),
        })
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::I8(a), Self::I8(b)) => a.cmp(b),
            (Self::I16(a), Self::I16(b)) => a.cmp(b),
            (Self::I32(a), Self::I32(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::U8(a), Self::U8(b)) => a.cmp(b),
            (Self::U16(a), Self::U16(b)) => a.cmp(b),
            (Self::U32(a), Self::U32(b)) => a.cmp(b),
            (Self::U64(a), Self::U64(b)) => a.cmp(b),
            (Self::F32(a), Self::F32(b)) => a.total_cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_key_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Key {
            fn from(value: $type) -> Self {
                Self::$variant(value)
            }
        }
    };
}

impl_key_from!(bool, Bool);
impl_key_from!(i8, I8);
impl_key_from!(i16, I16);
impl_key_from!(i32, I32);
impl_key_from!(i64, I64);
impl_key_from!(u8, U8);
impl_key_from!(u16, U16);
impl_key_from!(u32, U32);
impl_key_from!(u64, U64);
impl_key_from!(f32, F32);
impl_key_from!(f64, F64);
impl_key_from!(String, Text);
impl_key_from!(Bytes, Bytes);

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A dynamically keyed record: the schema-less counterpart of a struct.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    /// Inserts a value, returning the previous value stored under `label`.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(label.into(), value.into())
    }

    pub fn remove(&mut self, label: &str) -> Option<Value> {
        self.0.remove(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(label, value)| (label.as_str(), value))
    }
}

impl<L: Into<String>, V: Into<Value>> FromIterator<(L, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, value)| (label.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }
}
