//! Encode and decode structured data described by runtime schemas.
//!
//! # Overview
//!
//! A compact binary serialization library designed to efficiently and safely:
//! - Serialize records into a versioned binary format described by a [Model]
//! - Deserialize untrusted binary input into static or dynamic records
//!
//! Models are declared as values (no code generation). Each [Field] has a one-byte index (used on
//! the wire instead of its label), a label (used to find the field in a record), a [Type], and a
//! requiredness. Records are anything [Addressable]: dynamic [Record]s and string-keyed maps, or
//! structs declared with [addressable!].
//!
//! # Format
//!
//! All integers are little-endian.
//!
//! ```text
//! Message    := Version(u32) SchemaBody
//! SchemaBody := FieldCount(u32) (Index(u8) Value)*       -- ascending index order
//! Scalar     := fixed-width numeric | bool (1 byte) | Length(u32) bytes
//! List(T)    := Count(u32) T*
//! Map(K, V)  := Count(u32) (K V)*
//! Model(M)   := SchemaBody of M
//! ```
//!
//! # Supported Types
//!
//! - Scalars: `bool`, `i8`..`i64`, `u8`..`u64`, `f32`, `f64`, text, and bytes
//! - Homogeneous lists of any type
//! - Maps from scalar keys to any type
//! - Nested models, including self-referential and mutually recursive ones (see [Declaration])
//!
//! # Example
//!
//! ```
//! use commonware_schema::{addressable, Field, Model, Record, Type, Value};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     id: i64,
//!     name: Option<String>,
//! }
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Post {
//!     title: String,
//!     author: User,
//!     tags: Vec<String>,
//! }
//!
//! addressable!(User { id, name });
//! addressable!(Post { title, author, tags });
//!
//! let user = Arc::new(
//!     Model::new(
//!         "user",
//!         [
//!             Field::required(0, "id", Type::I64),
//!             Field::optional(1, "name", Type::TEXT),
//!         ],
//!     )
//!     .unwrap(),
//! );
//! let post = Model::new(
//!     "post",
//!     [
//!         Field::new(0, "title", Type::TEXT),
//!         Field::new(1, "author", Type::model(&user)),
//!         Field::optional(2, "tags", Type::list(Type::TEXT)),
//!     ],
//! )
//! .unwrap();
//!
//! let source = Post {
//!     title: "hello".into(),
//!     author: User { id: 1, name: Some("ada".into()) },
//!     tags: vec!["intro".into()],
//! };
//! let encoded = post.encode(&source).unwrap();
//!
//! // Decode into the same static shape...
//! let mut decoded = Post::default();
//! post.decode(encoded.clone(), &mut decoded).unwrap();
//! assert_eq!(decoded, source);
//!
//! // ...or into a dynamic record.
//! let record: Record = post.decode_record(encoded).unwrap();
//! let author = record.get("author").and_then(Value::as_record).unwrap();
//! assert_eq!(author.get("name"), Some(&Value::from("ada")));
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod pool;
pub mod resolver;
pub mod types;
mod util;
pub mod value;

// Re-export main types and traits
pub use codec::{Codec, PROTOCOL_VERSION};
pub use config::{Config, RangeCfg};
pub use error::{BufferError, Error, InputError, ModelError, Path, Segment};
pub use model::{Builder, Field, Model};
pub use pool::{BufferPool, PooledBuffer};
pub use resolver::{
    Addressable, FromKey, FromValue, Layout, Member, Shape, Slot, ToKey, ToValue,
};
pub use types::{Declaration, ModelRef, ScalarKind, Type};
pub use value::{Key, Record, Value};
