//! Models: validated schemas of indexed, labelled, typed fields.
//!
//! A model is built once and then shared, by reference, across any number of concurrent encode
//! and decode calls. The only state it mutates after construction is an internal cache of member
//! positions for static records (see [crate::resolver]).
//!
//! # Example
//!
//! ```
//! use commonware_schema::{Field, Model, Record, Type, Value};
//!
//! let user = Model::new(
//!     "user",
//!     [
//!         Field::required(0, "id", Type::I64),
//!         Field::optional(1, "name", Type::TEXT),
//!     ],
//! )
//! .unwrap();
//!
//! let mut source = Record::new();
//! source.insert("id", 42i64);
//! let encoded = user.encode(&source).unwrap();
//! assert_eq!(encoded.len(), 4 + 4 + 1 + 8);
//!
//! let decoded = user.decode_record(encoded).unwrap();
//! assert_eq!(decoded.get("id"), Some(&Value::I64(42)));
//! assert!(!decoded.contains("name"));
//! ```

use crate::{
    codec,
    config::{Config, Scope},
    resolver::{Addressable, Binding, SlotCache},
    types::Declaration,
    util::{at_least, read_len, write_len},
    BufferError, Error, InputError, ModelError, Record, Type,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};
use tracing::debug;

/// A field declaration.
#[derive(Clone, Debug)]
pub struct Field {
    index: u8,
    label: String,
    ty: Type,
    required: Option<bool>,
}

impl Field {
    /// A field whose requiredness follows the model default.
    pub fn new(index: u8, label: impl Into<String>, ty: impl Into<Type>) -> Self {
        Self {
            index,
            label: label.into(),
            ty: ty.into(),
            required: None,
        }
    }

    pub fn required(index: u8, label: impl Into<String>, ty: impl Into<Type>) -> Self {
        Self {
            required: Some(true),
            ..Self::new(index, label, ty)
        }
    }

    pub fn optional(index: u8, label: impl Into<String>, ty: impl Into<Type>) -> Self {
        Self {
            required: Some(false),
            ..Self::new(index, label, ty)
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Returns true if the field must be present. Fields built with [Field::new] are required
    /// until a model says otherwise.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }
}

/// Configures and validates a [Model].
#[must_use]
pub struct Builder {
    name: String,
    required_by_default: bool,
    fields: Vec<Field>,
}

impl Builder {
    /// Sets the requiredness of fields built with [Field::new] (default: `true`).
    pub fn required_by_default(mut self, required: bool) -> Self {
        self.required_by_default = required;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validates the declared fields and constructs the model.
    pub fn build(self) -> Result<Model, ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyName);
        }

        let mut indices = HashSet::with_capacity(self.fields.len());
        let mut labels = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.label.is_empty() {
                return Err(ModelError::EmptyLabel(self.name, field.index));
            }
            if !indices.insert(field.index) {
                return Err(ModelError::DuplicateIndex(self.name, field.index));
            }
            if !labels.insert(field.label.as_str()) {
                return Err(ModelError::DuplicateLabel(self.name, field.label.clone()));
            }
            if field.ty.dangling().is_some() {
                return Err(ModelError::DanglingReference(self.name, field.label.clone()));
            }
        }

        let default = self.required_by_default;
        let mut fields = self.fields;
        fields.sort_by_key(|field| field.index);
        for field in &mut fields {
            field.required.get_or_insert(default);
        }
        let positions = fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.index, position))
            .collect();
        let labels = fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.label.clone(), position))
            .collect();

        debug!(model = %self.name, fields = fields.len(), "built model");
        Ok(Model {
            name: self.name,
            fields,
            positions,
            labels,
            slots: SlotCache::default(),
        })
    }

    /// Constructs the model and binds it to `declaration`, resolving every reference the
    /// declaration has handed out.
    pub fn bind(self, declaration: &Declaration) -> Result<Arc<Model>, ModelError> {
        declaration.bind(self.build()?)
    }
}

/// A validated schema.
pub struct Model {
    name: String,
    fields: Vec<Field>,
    positions: HashMap<u8, usize>,
    labels: HashMap<String, usize>,
    slots: SlotCache,
}

impl Model {
    /// Constructs a model in which fields are required unless declared optional.
    pub fn new(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<Self, ModelError> {
        Self::builder(name).fields(fields).build()
    }

    pub fn builder(name: impl Into<String>) -> Builder {
        Builder {
            name: name.into(),
            required_by_default: true,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: u8) -> Option<&Field> {
        self.positions.get(&index).map(|position| &self.fields[*position])
    }

    pub fn field_by_label(&self, label: &str) -> Option<&Field> {
        self.labels.get(label).map(|position| &self.fields[*position])
    }

    /// Iterates over fields in ascending index order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &Field> {
        self.fields.iter()
    }

    pub(crate) fn slots(&self) -> &SlotCache {
        &self.slots
    }

    /// Encodes `source` as a versioned message.
    pub fn encode<S: Addressable + ?Sized>(&self, source: &S) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        codec::write_message(self, source, &mut buf, &Config::default())?;
        Ok(buf.freeze())
    }

    /// Decodes a versioned message into `dest`.
    ///
    /// On failure `dest` may be partially populated and should be discarded.
    pub fn decode<D: Addressable + ?Sized>(
        &self,
        mut buf: impl Buf,
        dest: &mut D,
    ) -> Result<(), Error> {
        codec::read_message(self, &mut buf, dest, &Config::default())
    }

    /// Decodes a versioned message into a new [Record].
    pub fn decode_record(&self, buf: impl Buf) -> Result<Record, Error> {
        let mut record = Record::new();
        self.decode(buf, &mut record)?;
        Ok(record)
    }

    /// Writes the present fields of `source` in ascending index order.
    pub(crate) fn write_body<S: Addressable + ?Sized>(
        &self,
        source: &S,
        buf: &mut impl BufMut,
        scope: Scope<'_>,
    ) -> Result<(), Error> {
        let binding = Binding::new(self, source)?;
        let mut present = Vec::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            match binding.load(source, position, field) {
                Some(value) => present.push((field, value)),
                None if field.is_required() => {
                    return Err(Error::from(InputError::MissingRequired).within_field(&field.label))
                }
                None => {}
            }
        }

        write_len(buf, present.len())?;
        for (field, value) in present {
            buf.put_u8(field.index);
            field
                .ty
                .write(&value, buf, scope)
                .map_err(|err| err.within_field(&field.label))?;
        }
        Ok(())
    }

    /// Reads a field count and that many indexed fields into `dest`, then checks that every
    /// required field was present.
    pub(crate) fn read_body<D: Addressable + ?Sized>(
        &self,
        buf: &mut impl Buf,
        dest: &mut D,
        scope: Scope<'_>,
    ) -> Result<(), Error> {
        let binding = Binding::new(self, &*dest)?;
        let count = read_len(buf, scope.cfg)?;
        let mut seen = [false; 256];
        for _ in 0..count {
            at_least(buf, 1)?;
            let index = buf.get_u8();
            let position = *self
                .positions
                .get(&index)
                .ok_or(BufferError::UnknownIndex(index))?;
            if seen[index as usize] {
                return Err(BufferError::DuplicateIndex(index).into());
            }
            seen[index as usize] = true;

            let field = &self.fields[position];
            let value = field
                .ty
                .read(buf, scope)
                .map_err(|err| err.within_field(&field.label))?;
            binding.store(dest, position, field, value)?;
        }

        if let Some(missing) = self
            .fields
            .iter()
            .find(|field| field.is_required() && !seen[field.index as usize])
        {
            return Err(Error::from(BufferError::MissingRequired).within_field(&missing.label));
        }
        Ok(())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}
