//! Binds model fields to the members of a record.
//!
//! Anything that can be encoded or decoded with a [Model] implements [Addressable]. Dynamic
//! records ([Record], string-keyed maps, and [Value::Record]) are addressed by label. Static
//! records declared with [addressable!](crate::addressable) are addressed by member position,
//! resolved once per type and cached on the model.
//!
//! ```
//! use commonware_schema::{addressable, Field, Model, Type};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     id: i64,
//!     name: Option<String>,
//! }
//!
//! addressable!(User { id, name => "userName" });
//!
//! let model = Model::new(
//!     "user",
//!     [
//!         Field::required(0, "id", Type::I64),
//!         Field::optional(1, "userName", Type::TEXT),
//!     ],
//! )
//! .unwrap();
//!
//! let user = User { id: 7, name: Some("ada".into()) };
//! let encoded = model.encode(&user).unwrap();
//!
//! let mut decoded = User::default();
//! model.decode(encoded, &mut decoded).unwrap();
//! assert_eq!(decoded, user);
//! ```

use crate::{
    model::{Field, Model},
    value::{Key, Record},
    Error, InputError, ScalarKind, Value,
};
use bytes::Bytes;
use std::{
    any::TypeId,
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
    sync::{Arc, PoisonError, RwLock},
};
use tracing::trace;

/// How the members of a record are located.
#[derive(Clone, Copy, Debug)]
pub enum Layout {
    /// Members are looked up by label.
    Keyed,
    /// Members are a fixed set of labels, addressed by position in `labels`.
    Members {
        shape: TypeId,
        labels: &'static [&'static str],
    },
    /// The value has no members (e.g. a scalar).
    Opaque(&'static str),
}

/// A member of a record, as resolved for one field.
#[derive(Clone, Copy, Debug)]
pub struct Member<'a> {
    label: &'a str,
    slot: Option<usize>,
}

impl<'a> Member<'a> {
    pub fn new(label: &'a str, slot: Option<usize>) -> Self {
        Self { label, slot }
    }

    pub fn label(&self) -> &'a str {
        self.label
    }

    /// The position of the member in [Layout::Members], when known.
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }
}

/// A record whose members can be read and written by a [Model].
pub trait Addressable {
    fn layout(&self) -> Layout;

    /// Returns the value of `member`, or `None` if it is absent.
    fn get(&self, member: Member<'_>) -> Option<Cow<'_, Value>>;

    /// Assigns a decoded value to `member`.
    fn set(&mut self, member: Member<'_>, value: Value) -> Result<(), InputError>;
}

/// The member labels of a static record, in declaration order.
pub trait Shape {
    const LABELS: &'static [&'static str];

    fn position(label: &str) -> Option<usize> {
        Self::LABELS.iter().position(|candidate| *candidate == label)
    }
}

/// Converts a member into its dynamic representation.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Converts a decoded value into a member. The value must have exactly the member's kind.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, InputError>;
}

/// Converts a map key into its dynamic representation.
pub trait ToKey {
    fn to_key(&self) -> Key;
}

/// Converts a decoded map key into a member's key.
pub trait FromKey: Sized {
    fn from_key(key: Key) -> Result<Self, InputError>;
}

/// A member of a static record.
///
/// `load` returns `None` when the member is absent, which is how optional members (`Option<T>`)
/// are skipped on encode. `store` on a nested record merges the decoded fields into the existing
/// member, so members the payload omits keep their values.
pub trait Slot {
    fn load(&self) -> Option<Value>;
    fn store(&mut self, value: Value) -> Result<(), InputError>;
}

fn mismatch(expected: &str, found: &Value) -> InputError {
    InputError::Mismatch {
        expected: expected.to_string(),
        found: found.type_name(),
    }
}

macro_rules! impl_scalar {
    ($type:ty, $variant:ident, $kind:ident) => {
        impl ToValue for $type {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }

        impl FromValue for $type {
            fn from_value(value: Value) -> Result<Self, InputError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(mismatch(ScalarKind::$kind.name(), &other)),
                }
            }
        }

        impl ToKey for $type {
            fn to_key(&self) -> Key {
                Key::$variant(self.clone())
            }
        }

        impl FromKey for $type {
            fn from_key(key: Key) -> Result<Self, InputError> {
                match key {
                    Key::$variant(inner) => Ok(inner),
                    other => Err(mismatch(ScalarKind::$kind.name(), &other.to_value())),
                }
            }
        }

        impl Slot for $type {
            fn load(&self) -> Option<Value> {
                Some(self.to_value())
            }

            fn store(&mut self, value: Value) -> Result<(), InputError> {
                *self = Self::from_value(value)?;
                Ok(())
            }
        }
    };
}

impl_scalar!(bool, Bool, Bool);
impl_scalar!(i8, I8, I8);
impl_scalar!(i16, I16, I16);
impl_scalar!(i32, I32, I32);
impl_scalar!(i64, I64, I64);
impl_scalar!(u8, U8, U8);
impl_scalar!(u16, U16, U16);
impl_scalar!(u32, U32, U32);
impl_scalar!(u64, U64, U64);
impl_scalar!(f32, F32, F32);
impl_scalar!(f64, F64, F64);
impl_scalar!(String, Text, Text);
impl_scalar!(Bytes, Bytes, Bytes);

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, InputError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: ToValue + FromValue> Slot for Vec<T> {
    fn load(&self) -> Option<Value> {
        Some(self.to_value())
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

fn entries<K: FromKey, V: FromValue, C: FromIterator<(K, V)>>(
    value: Value,
) -> Result<C, InputError> {
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, value)| Ok((K::from_key(key)?, V::from_value(value)?)))
            .collect(),
        other => Err(mismatch("map", &other)),
    }
}

impl<K: ToKey, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, value)| (key.to_key(), value.to_value()))
                .collect(),
        )
    }
}

impl<K: FromKey + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self, InputError> {
        entries(value)
    }
}

impl<K: ToKey + FromKey + Ord, V: ToValue + FromValue> Slot for BTreeMap<K, V> {
    fn load(&self) -> Option<Value> {
        Some(self.to_value())
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

impl<K: ToKey, V: ToValue> ToValue for HashMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, value)| (key.to_key(), value.to_value()))
                .collect(),
        )
    }
}

impl<K: FromKey + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> Result<Self, InputError> {
        entries(value)
    }
}

impl<K: ToKey + FromKey + Eq + Hash, V: ToValue + FromValue> Slot for HashMap<K, V> {
    fn load(&self) -> Option<Value> {
        Some(self.to_value())
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

impl<T: ToValue + FromValue + Slot> Slot for Option<T> {
    fn load(&self) -> Option<Value> {
        self.as_ref().map(ToValue::to_value)
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        match self {
            Some(inner) => inner.store(value),
            None => {
                *self = Some(T::from_value(value)?);
                Ok(())
            }
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, InputError> {
        Ok(value)
    }
}

impl Slot for Value {
    fn load(&self) -> Option<Value> {
        Some(self.clone())
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        *self = value;
        Ok(())
    }
}

impl ToValue for Record {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, InputError> {
        match value {
            Value::Record(record) => Ok(record),
            other => Err(mismatch("record", &other)),
        }
    }
}

impl Slot for Record {
    fn load(&self) -> Option<Value> {
        Some(self.to_value())
    }

    fn store(&mut self, value: Value) -> Result<(), InputError> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

impl Addressable for Record {
    fn layout(&self) -> Layout {
        Layout::Keyed
    }

    fn get(&self, member: Member<'_>) -> Option<Cow<'_, Value>> {
        Record::get(self, member.label()).map(Cow::Borrowed)
    }

    fn set(&mut self, member: Member<'_>, value: Value) -> Result<(), InputError> {
        self.insert(member.label(), value);
        Ok(())
    }
}

impl Addressable for BTreeMap<String, Value> {
    fn layout(&self) -> Layout {
        Layout::Keyed
    }

    fn get(&self, member: Member<'_>) -> Option<Cow<'_, Value>> {
        BTreeMap::get(self, member.label()).map(Cow::Borrowed)
    }

    fn set(&mut self, member: Member<'_>, value: Value) -> Result<(), InputError> {
        self.insert(member.label().to_string(), value);
        Ok(())
    }
}

impl<S: BuildHasher> Addressable for HashMap<String, Value, S> {
    fn layout(&self) -> Layout {
        Layout::Keyed
    }

    fn get(&self, member: Member<'_>) -> Option<Cow<'_, Value>> {
        HashMap::get(self, member.label()).map(Cow::Borrowed)
    }

    fn set(&mut self, member: Member<'_>, value: Value) -> Result<(), InputError> {
        self.insert(member.label().to_string(), value);
        Ok(())
    }
}

impl Addressable for Value {
    fn layout(&self) -> Layout {
        match self {
            Self::Record(_) => Layout::Keyed,
            other => Layout::Opaque(other.type_name()),
        }
    }

    fn get(&self, member: Member<'_>) -> Option<Cow<'_, Value>> {
        match self {
            Self::Record(record) => Addressable::get(record, member),
            _ => None,
        }
    }

    fn set(&mut self, member: Member<'_>, value: Value) -> Result<(), InputError> {
        match self {
            Self::Record(record) => Addressable::set(record, member, value),
            other => Err(InputError::NotAddressable(other.type_name())),
        }
    }
}

/// Member positions for each field of a model, in field order.
type Slots = Arc<[Option<usize>]>;

/// Per-type member positions, computed on first use.
#[derive(Default)]
pub(crate) struct SlotCache(RwLock<HashMap<TypeId, Slots>>);

impl SlotCache {
    fn get_or_insert(&self, model: &Model, shape: TypeId, labels: &[&str]) -> Slots {
        if let Some(slots) = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shape)
        {
            return slots.clone();
        }
        let slots: Slots = model
            .fields()
            .map(|field| labels.iter().position(|label| *label == field.label()))
            .collect();
        trace!(model = model.name(), members = labels.len(), "resolved member slots");
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(shape)
            .or_insert(slots)
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// The fields of a model, bound to the members of one record.
pub(crate) struct Binding(Option<Slots>);

impl Binding {
    /// Resolves how the fields of `model` map onto `record`.
    pub(crate) fn new<R: Addressable + ?Sized>(model: &Model, record: &R) -> Result<Self, Error> {
        match record.layout() {
            Layout::Keyed => Ok(Self(None)),
            Layout::Members { shape, labels } => {
                Ok(Self(Some(model.slots().get_or_insert(model, shape, labels))))
            }
            Layout::Opaque(name) => Err(InputError::NotAddressable(name).into()),
        }
    }

    fn member<'a>(&self, position: usize, field: &'a Field) -> Option<Member<'a>> {
        match &self.0 {
            None => Some(Member::new(field.label(), None)),
            Some(slots) => slots
                .get(position)
                .copied()
                .flatten()
                .map(|slot| Member::new(field.label(), Some(slot))),
        }
    }

    /// Reads the field at `position` from `record`. `None` if the field is absent.
    pub(crate) fn load<'r, R: Addressable + ?Sized>(
        &self,
        record: &'r R,
        position: usize,
        field: &Field,
    ) -> Option<Cow<'r, Value>> {
        record.get(self.member(position, field)?)
    }

    /// Writes a decoded field into `record`. Fields with no matching member are dropped.
    pub(crate) fn store<R: Addressable + ?Sized>(
        &self,
        record: &mut R,
        position: usize,
        field: &Field,
        value: Value,
    ) -> Result<(), Error> {
        let Some(member) = self.member(position, field) else {
            trace!(field = field.label(), "skipped field without member");
            return Ok(());
        };
        record
            .set(member, value)
            .map_err(|err| Error::from(err).within_field(field.label()))
    }
}

/// Implements [Addressable] (and the member conversions) for a struct.
///
/// Each listed member is bound to the field whose label matches its name, or the label given
/// after `=>`. Members must implement [Slot]; `Option<T>` members are absent when `None`. The
/// struct must implement [Default] so it can be decoded when nested.
#[macro_export]
macro_rules! addressable {
    ($record:ty { $($member:ident $(=> $label:literal)?),* $(,)? }) => {
        impl $crate::Shape for $record {
            const LABELS: &'static [&'static str] = &[$($crate::__label!($member $(, $label)?)),*];
        }

        impl $crate::Addressable for $record {
            fn layout(&self) -> $crate::Layout {
                $crate::Layout::Members {
                    shape: ::core::any::TypeId::of::<Self>(),
                    labels: <Self as $crate::Shape>::LABELS,
                }
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn get(
                &self,
                member: $crate::Member<'_>,
            ) -> ::core::option::Option<::std::borrow::Cow<'_, $crate::Value>> {
                let slot = member
                    .slot()
                    .or_else(|| <Self as $crate::Shape>::position(member.label()))?;
                let mut position = 0usize;
                $(
                    if slot == position {
                        return $crate::Slot::load(&self.$member).map(::std::borrow::Cow::Owned);
                    }
                    position += 1;
                )*
                ::core::option::Option::None
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn set(
                &mut self,
                member: $crate::Member<'_>,
                value: $crate::Value,
            ) -> ::core::result::Result<(), $crate::InputError> {
                let ::core::option::Option::Some(slot) = member
                    .slot()
                    .or_else(|| <Self as $crate::Shape>::position(member.label()))
                else {
                    return ::core::result::Result::Ok(());
                };
                let mut position = 0usize;
                $(
                    if slot == position {
                        return $crate::Slot::store(&mut self.$member, value);
                    }
                    position += 1;
                )*
                ::core::result::Result::Ok(())
            }
        }

        impl $crate::ToValue for $record {
            fn to_value(&self) -> $crate::Value {
                let mut record = $crate::Record::new();
                $(
                    if let ::core::option::Option::Some(value) = $crate::Slot::load(&self.$member) {
                        record.insert($crate::__label!($member $(, $label)?), value);
                    }
                )*
                $crate::Value::Record(record)
            }
        }

        impl $crate::FromValue for $record {
            fn from_value(
                value: $crate::Value,
            ) -> ::core::result::Result<Self, $crate::InputError> {
                let mut out = <Self as ::core::default::Default>::default();
                $crate::Slot::store(&mut out, value)?;
                ::core::result::Result::Ok(out)
            }
        }

        impl $crate::Slot for $record {
            fn load(&self) -> ::core::option::Option<$crate::Value> {
                ::core::option::Option::Some($crate::ToValue::to_value(self))
            }

            fn store(
                &mut self,
                value: $crate::Value,
            ) -> ::core::result::Result<(), $crate::InputError> {
                let record = match value {
                    $crate::Value::Record(record) => record,
                    other => {
                        return ::core::result::Result::Err($crate::InputError::Mismatch {
                            expected: ::std::string::String::from(stringify!($record)),
                            found: other.type_name(),
                        })
                    }
                };
                for (label, value) in record {
                    $crate::Addressable::set(self, $crate::Member::new(&label, None), value)?;
                }
                ::core::result::Result::Ok(())
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __label {
    ($member:ident) => {
        stringify!($member)
    };
    ($member:ident, $label:literal) => {
        $label
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{addressable, Type};

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
        label: Option<String>,
    }

    addressable!(Point { x, y, label => "name" });

    fn point_model() -> Model {
        Model::new(
            "point",
            [
                Field::required(0, "x", Type::I32),
                Field::required(1, "y", Type::I32),
                Field::optional(2, "name", Type::TEXT),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_labels() {
        assert_eq!(Point::LABELS, &["x", "y", "name"]);
        assert_eq!(Point::position("name"), Some(2));
        assert_eq!(Point::position("label"), None);
    }

    #[test]
    fn test_get_by_label_and_slot() {
        let point = Point { x: 1, y: 2, label: None };
        assert_eq!(
            point.get(Member::new("y", None)).unwrap().into_owned(),
            Value::I32(2)
        );
        assert_eq!(
            point.get(Member::new("ignored", Some(0))).unwrap().into_owned(),
            Value::I32(1)
        );
        assert!(point.get(Member::new("name", None)).is_none());
        assert!(point.get(Member::new("z", None)).is_none());
    }

    #[test]
    fn test_set_exact_kind() {
        let mut point = Point::default();
        point.set(Member::new("x", None), Value::I32(5)).unwrap();
        point
            .set(Member::new("name", None), Value::from("origin"))
            .unwrap();
        assert_eq!(point.x, 5);
        assert_eq!(point.label.as_deref(), Some("origin"));

        let err = point.set(Member::new("y", None), Value::I64(5)).unwrap_err();
        assert_eq!(
            err,
            InputError::Mismatch {
                expected: "int32".to_string(),
                found: "int64"
            }
        );
    }

    #[test]
    fn test_to_value_skips_absent() {
        let point = Point { x: 1, y: 2, label: None };
        let Value::Record(record) = point.to_value() else {
            panic!("expected a record");
        };
        assert_eq!(record.len(), 2);
        assert!(!record.contains("name"));
    }

    #[test]
    fn test_from_value_ignores_unknown_members() {
        let record: Record = [("x", Value::I32(3)), ("w", Value::Bool(true))]
            .into_iter()
            .collect();
        let point = Point::from_value(Value::Record(record)).unwrap();
        assert_eq!(point, Point { x: 3, y: 0, label: None });
        assert!(Point::from_value(Value::I32(3)).is_err());
    }

    #[test]
    fn test_slots_cached_once() {
        let model = point_model();
        let point = Point { x: 1, y: 2, label: None };
        model.encode(&point).unwrap();
        model.encode(&point).unwrap();
        assert_eq!(model.slots().len(), 1);

        // Dynamic records never populate the cache.
        model.encode(&point.to_value()).unwrap();
        assert_eq!(model.slots().len(), 1);
    }

    #[test]
    fn test_collections() {
        let list = vec![1u8, 2, 3];
        assert_eq!(Vec::<u8>::from_value(list.to_value()).unwrap(), list);

        let map: BTreeMap<String, Vec<bool>> =
            [("a".to_string(), vec![true])].into_iter().collect();
        assert_eq!(
            BTreeMap::<String, Vec<bool>>::from_value(map.to_value()).unwrap(),
            map
        );

        let hashed: HashMap<u16, f64> = [(1, 0.5), (2, 1.5)].into_iter().collect();
        assert_eq!(
            HashMap::<u16, f64>::from_value(hashed.to_value()).unwrap(),
            hashed
        );

        let err = Vec::<u8>::from_value(Value::List(vec![Value::U16(1)])).unwrap_err();
        assert!(matches!(err, InputError::Mismatch { found: "uint16", .. }));
    }

    #[test]
    fn test_value_addressable() {
        let mut scalar = Value::I8(1);
        assert!(matches!(scalar.layout(), Layout::Opaque("int8")));
        assert_eq!(
            scalar.set(Member::new("x", None), Value::I8(2)),
            Err(InputError::NotAddressable("int8"))
        );

        let mut record = Value::Record(Record::new());
        record.set(Member::new("x", None), Value::I8(2)).unwrap();
        assert_eq!(
            record.get(Member::new("x", None)).unwrap().into_owned(),
            Value::I8(2)
        );
    }

    #[test]
    fn test_string_keyed_maps() {
        let model = point_model();
        let mut source: HashMap<String, Value> = HashMap::new();
        source.insert("x".into(), Value::I32(1));
        source.insert("y".into(), Value::I32(2));
        let encoded = model.encode(&source).unwrap();

        let mut dest: BTreeMap<String, Value> = BTreeMap::new();
        model.decode(encoded, &mut dest).unwrap();
        assert_eq!(dest.len(), 2);
        assert_eq!(dest["y"], Value::I32(2));
    }
}
