//! Message framing.
//!
//! A message is a `u32` protocol version followed by the schema body of the outermost model.
//! Nested models reuse the body encoding without a version. A decoded message must consume the
//! whole buffer.

use crate::{
    config::{Config, Scope},
    pool::BufferPool,
    resolver::{Addressable, Binding},
    util::at_least,
    BufferError, Error, Model, Record,
};
use bytes::{Buf, BufMut, Bytes};
use tracing::debug;

/// The version stamped on every encoded message.
pub const PROTOCOL_VERSION: u32 = 1;

/// Writes the version and the schema body of `source`.
pub(crate) fn write_message<S: Addressable + ?Sized>(
    model: &Model,
    source: &S,
    buf: &mut impl BufMut,
    cfg: &Config,
) -> Result<(), Error> {
    // Reject opaque sources before anything is written.
    Binding::new(model, source)?;
    buf.put_u32_le(PROTOCOL_VERSION);
    model.write_body(source, buf, Scope::new(cfg))
}

/// Checks the version, reads the schema body into `dest`, and rejects trailing bytes.
pub(crate) fn read_message<D: Addressable + ?Sized>(
    model: &Model,
    buf: &mut impl Buf,
    dest: &mut D,
    cfg: &Config,
) -> Result<(), Error> {
    // Reject opaque destinations before anything is consumed.
    Binding::new(model, &*dest)?;
    at_least(buf, 4)?;
    let version = buf.get_u32_le();
    if version != PROTOCOL_VERSION {
        debug!(
            model = model.name(),
            found = version,
            expected = PROTOCOL_VERSION,
            "rejected message version"
        );
        return Err(Error::Version(version, PROTOCOL_VERSION));
    }
    model.read_body(buf, dest, Scope::new(cfg))?;
    if buf.has_remaining() {
        return Err(BufferError::ExtraData(buf.remaining()).into());
    }
    Ok(())
}

/// Encodes and decodes messages with a shared configuration and buffer pool.
///
/// ```
/// use commonware_schema::{BufferPool, Codec, Config, Field, Model, Record, Type};
///
/// let model = Model::new("point", [Field::new(0, "x", Type::I32)]).unwrap();
/// let codec = Codec::with_pool(Config::default(), BufferPool::new(64, 4));
///
/// let mut point = Record::new();
/// point.insert("x", 3i32);
/// let encoded = codec.encode(&model, &point).unwrap();
/// assert_eq!(codec.pool().idle(), 1);
/// assert_eq!(codec.decode_record(&model, encoded).unwrap(), point);
/// ```
#[derive(Debug, Default)]
pub struct Codec {
    cfg: Config,
    pool: BufferPool,
}

impl Codec {
    pub fn new(cfg: Config) -> Self {
        Self::with_pool(cfg, BufferPool::default())
    }

    pub fn with_pool(cfg: Config, pool: BufferPool) -> Self {
        Self { cfg, pool }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Encodes `source` using a buffer checked out of the pool for the duration of the call.
    ///
    /// The message is copied out so the buffer's capacity returns to the pool.
    pub fn encode<S: Addressable + ?Sized>(
        &self,
        model: &Model,
        source: &S,
    ) -> Result<Bytes, Error> {
        let mut buf = self.pool.acquire();
        write_message(model, source, &mut *buf, &self.cfg)?;
        Ok(Bytes::copy_from_slice(&buf))
    }

    /// Decodes a message into `dest`.
    ///
    /// On failure `dest` may be partially populated and should be discarded.
    pub fn decode<D: Addressable + ?Sized>(
        &self,
        model: &Model,
        mut buf: impl Buf,
        dest: &mut D,
    ) -> Result<(), Error> {
        read_message(model, &mut buf, dest, &self.cfg)
    }

    /// Decodes a message into a new [Record].
    pub fn decode_record(&self, model: &Model, buf: impl Buf) -> Result<Record, Error> {
        let mut record = Record::new();
        self.decode(model, buf, &mut record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, InputError, RangeCfg, Type, Value};

    fn point() -> Model {
        Model::new(
            "point",
            [Field::new(0, "x", Type::I32), Field::new(1, "y", Type::I32)],
        )
        .unwrap()
    }

    fn record(x: i32, y: i32) -> Record {
        [("x", x), ("y", y)].into_iter().collect()
    }

    #[test]
    fn test_version_stamp() {
        let encoded = point().encode(&record(1, 2)).unwrap();
        assert_eq!(&encoded[..4], &PROTOCOL_VERSION.to_le_bytes());
    }

    #[test]
    fn test_version_mismatch() {
        let mut encoded = point().encode(&record(1, 2)).unwrap().to_vec();
        encoded[0] = 2;
        let mut buf = encoded.as_slice();
        let mut dest = Record::new();
        let err = read_message(&point(), &mut buf, &mut dest, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Version(2, PROTOCOL_VERSION)));
        // Nothing past the version was consumed.
        assert_eq!(buf.len(), encoded.len() - 4);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_truncated_version() {
        assert!(matches!(
            point().decode_record(&[1u8, 0][..]),
            Err(Error::Buffer(_, BufferError::EndOfBuffer))
        ));
    }

    #[test]
    fn test_extra_data() {
        let mut encoded = point().encode(&record(1, 2)).unwrap().to_vec();
        encoded.extend_from_slice(&[0, 0]);
        assert!(matches!(
            point().decode_record(encoded.as_slice()),
            Err(Error::Buffer(_, BufferError::ExtraData(2)))
        ));
    }

    #[test]
    fn test_opaque_source_writes_nothing() {
        let mut buf: Vec<u8> = Vec::new();
        let err = write_message(&point(), &Value::I32(1), &mut buf, &Config::default());
        assert!(matches!(
            err,
            Err(Error::Input(_, InputError::NotAddressable("int32")))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pool_returns_buffer_on_error() {
        let codec = Codec::new(Config::default());
        let mut incomplete = Record::new();
        incomplete.insert("x", 1i32);
        assert!(codec.encode(&point(), &incomplete).is_err());
        assert_eq!(codec.pool().idle(), 1);

        let encoded = codec.encode(&point(), &record(3, 4)).unwrap();
        assert_eq!(codec.pool().idle(), 1);
        assert_eq!(codec.decode_record(&point(), encoded).unwrap(), record(3, 4));
    }

    #[test]
    fn test_pooled_capacity_retained() {
        let codec = Codec::with_pool(Config::default(), BufferPool::new(64, 1));
        let encoded = codec.encode(&point(), &record(5, 6)).unwrap();
        assert_eq!(encoded.len(), 4 + 4 + 2 * (1 + 4));
        assert!(codec.pool().acquire().capacity() >= 64);
    }

    #[test]
    fn test_length_limits() {
        let model = Model::new("tags", [Field::new(0, "tags", Type::list(Type::U8))]).unwrap();
        let mut source = Record::new();
        source.insert("tags", Value::List(vec![Value::U8(1), Value::U8(2), Value::U8(3)]));

        let strict = Codec::new(Config {
            lengths: RangeCfg::from(..=2),
            ..Config::default()
        });
        let encoded = strict.encode(&model, &source).unwrap();
        let err = strict.decode_record(&model, encoded.clone()).unwrap_err();
        let Error::Buffer(path, BufferError::InvalidLength(3)) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(path.to_string(), "$.tags");
        assert!(model.decode_record(encoded).is_ok());
    }
}
