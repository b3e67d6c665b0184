//! Error types for schema construction, encoding, and decoding.

use crate::types::ScalarKind;
use std::fmt;
use thiserror::Error;

/// A schema misconfiguration, detected when a [crate::Model] is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model name is empty")]
    EmptyName,
    #[error("empty label for index {1} in model {0}")]
    EmptyLabel(String, u8),
    #[error("duplicate index {1} in model {0}")]
    DuplicateIndex(String, u8),
    #[error("duplicate label {1} in model {0}")]
    DuplicateLabel(String, String),
    #[error("field {1} in model {0} references a dropped model")]
    DanglingReference(String, String),
    #[error("model {0} was dropped")]
    Dropped(String),
    #[error("model {0} is declared but not bound")]
    Unbound(String),
    #[error("model {0} is already bound")]
    AlreadyBound(String),
    #[error("declaration {0} cannot bind model {1}")]
    NameMismatch(String, String),
}

/// An encode input (or decode destination) that does not fit the schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("missing required field")]
    MissingRequired,
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },
    #[error("{value} out of range for {kind}")]
    Overflow { value: String, kind: ScalarKind },
    #[error("record key must be text, found {0}")]
    NonTextKey(&'static str),
    #[error("{0} is not addressable")]
    NotAddressable(&'static str),
    #[error("length {0} exceeds u32")]
    TooLong(usize),
    #[error("nesting deeper than {0}")]
    TooDeep(usize),
    #[error("map key {0} repeats an earlier key once encoded")]
    DuplicateKey(String),
}

/// Malformed, truncated, or schema-incompatible encoded data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("length {0} exceeds remaining {1} bytes")]
    LengthExceeded(usize, usize),
    #[error("invalid length: {0}")]
    InvalidLength(usize),
    #[error("unknown field index {0}")]
    UnknownIndex(u8),
    #[error("duplicate field index {0}")]
    DuplicateIndex(u8),
    #[error("duplicate map key {0}")]
    DuplicateKey(String),
    #[error("missing required field")]
    MissingRequired,
    #[error("invalid utf-8")]
    InvalidUtf8,
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("nesting deeper than {0}")]
    TooDeep(usize),
}

/// One step into a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// A field of a model, by label.
    Field(String),
    /// An element of a list.
    Item(usize),
    /// An entry of a map, by rendered key.
    Key(String),
}

/// The location of a failure inside a message (e.g. `$.author.tags[2]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The segments from the outermost model inwards.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns true if the failure happened outside of any field.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost field label, if any.
    pub fn field(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|segment| match segment {
            Segment::Field(label) => Some(label.as_str()),
            _ => None,
        })
    }

    fn push_front(&mut self, segment: Segment) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                Segment::Field(label) => write!(f, ".{label}")?,
                Segment::Item(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Error type for schema operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid model: {0}")]
    Model(#[from] ModelError),
    #[error("unexpected input at {0}: {1}")]
    Input(Path, InputError),
    #[error("invalid buffer at {0}: {1}")]
    Buffer(Path, BufferError),
    #[error("incompatible buffer version: found {0}, expected {1}")]
    Version(u32, u32),
}

impl Error {
    pub(crate) fn input(err: InputError) -> Self {
        Self::Input(Path::default(), err)
    }

    pub(crate) fn buffer(err: BufferError) -> Self {
        Self::Buffer(Path::default(), err)
    }

    /// Prefixes the location of this error with `segment`.
    pub(crate) fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            Self::Input(path, _) | Self::Buffer(path, _) => path.push_front(segment),
            Self::Model(_) | Self::Version(..) => {}
        }
        self
    }

    pub(crate) fn within_field(self, label: &str) -> Self {
        self.within(Segment::Field(label.to_string()))
    }

    /// The location of an input or buffer error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Input(path, _) | Self::Buffer(path, _) => Some(path),
            Self::Model(_) | Self::Version(..) => None,
        }
    }
}

impl From<InputError> for Error {
    fn from(err: InputError) -> Self {
        Self::input(err)
    }
}

impl From<BufferError> for Error {
    fn from(err: BufferError) -> Self {
        Self::buffer(err)
    }
}
