//! References from one model to another.
//!
//! A reference to an existing model ([Type::model](super::Type::model)) holds it strongly. Models
//! that refer to themselves, or to each other, are built in two phases: a [Declaration] is created
//! first and handed out as a reference, then the model is bound to it with
//! [Builder::bind](crate::Builder::bind). Declared references hold the bound model weakly, so a
//! cyclic schema graph does not keep itself alive.
//!
//! ```
//! use commonware_schema::{Declaration, Field, Model, Type};
//!
//! let node = Declaration::new("node");
//! let model = Model::builder("node")
//!     .field(Field::required(0, "value", Type::I64))
//!     .field(Field::optional(1, "children", Type::list(node.reference())))
//!     .bind(&node)
//!     .unwrap();
//! assert_eq!(model.name(), "node");
//! ```

use crate::{config::Scope, value::Record, Error, InputError, Model, ModelError, Value};
use bytes::BufMut;
use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};
use tracing::debug;

/// A model that may be referenced before it is constructed.
pub struct Declaration {
    name: String,
    model: OnceLock<Weak<Model>>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            model: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once a model has been bound.
    pub fn is_bound(&self) -> bool {
        self.model.get().is_some()
    }

    /// A type referring to the model that will be bound to this declaration.
    pub fn reference(self: &Arc<Self>) -> super::Type {
        super::Type::Model(ModelRef(Target::Declared(self.clone())))
    }

    /// Publishes `model` as the target of every reference handed out by this declaration.
    pub(crate) fn bind(&self, model: Model) -> Result<Arc<Model>, ModelError> {
        if model.name() != self.name {
            return Err(ModelError::NameMismatch(
                self.name.clone(),
                model.name().to_string(),
            ));
        }
        let model = Arc::new(model);
        self.model
            .set(Arc::downgrade(&model))
            .map_err(|_| ModelError::AlreadyBound(self.name.clone()))?;
        debug!(model = %self.name, "bound declared model");
        Ok(model)
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Clone)]
enum Target {
    Bound(Arc<Model>),
    Declared(Arc<Declaration>),
}

/// A reference to a nested model.
#[derive(Clone)]
pub struct ModelRef(Target);

impl ModelRef {
    pub(crate) fn bound(model: &Arc<Model>) -> Self {
        Self(Target::Bound(model.clone()))
    }

    /// The name of the referenced model.
    pub fn name(&self) -> &str {
        match &self.0 {
            Target::Bound(model) => model.name(),
            Target::Declared(declaration) => declaration.name(),
        }
    }

    /// Returns true if the reference was bound to a model that has since been dropped.
    pub(crate) fn is_dangling(&self) -> bool {
        match &self.0 {
            Target::Bound(_) => false,
            Target::Declared(declaration) => declaration
                .model
                .get()
                .is_some_and(|model| model.strong_count() == 0),
        }
    }

    /// Returns the referenced model.
    pub fn resolve(&self) -> Result<Arc<Model>, ModelError> {
        match &self.0 {
            Target::Bound(model) => Ok(model.clone()),
            Target::Declared(declaration) => declaration
                .model
                .get()
                .ok_or_else(|| ModelError::Unbound(declaration.name.clone()))?
                .upgrade()
                .ok_or_else(|| ModelError::Dropped(declaration.name.clone())),
        }
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name()).finish()
    }
}

/// Encodes a nested record as the schema body of `model`.
pub(crate) fn write(
    model: &Model,
    value: &Value,
    buf: &mut impl BufMut,
    scope: Scope<'_>,
) -> Result<(), Error> {
    match value {
        Value::Record(record) => model.write_body(record, buf, scope),
        Value::Map(entries) => {
            let mut record = Record::new();
            for (key, value) in entries {
                let Value::Text(label) = key.to_value() else {
                    return Err(InputError::NonTextKey(key.kind().name()).into());
                };
                record.insert(label, value.clone());
            }
            model.write_body(&record, buf, scope)
        }
        _ => Err(InputError::Mismatch {
            expected: format!("model {}", model.name()),
            found: value.type_name(),
        }
        .into()),
    }
}
