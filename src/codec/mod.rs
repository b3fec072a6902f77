//! Codec contract and wire framing.
//!
//! A [`Codec`] converts one Rust type to and from the CQL binary format and a
//! textual literal format. NULL only exists where the Rust type can express it:
//! [`OptionCodec`] wraps any codec and maps `None` to an absent value.
//!
//! Nested values (collection elements, map entries, UDT fields) are framed as a
//! 4-byte big-endian length followed by the value's bytes, with length `-1` for
//! an absent value.

pub mod collection;
pub mod enums;
pub mod mapping;
pub mod primitive;
pub mod udt;

use std::any::Any;
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CqlError, CqlResult};
use crate::parser::{is_null_literal, NULL_TOKEN};
use crate::types::WireType;

pub use collection::{
    Container, ContainerBuilder, KeyOrder, ListCodec, MapCodec, MapContainer, Natural, Reversed,
    SetCodec, SortedMap, SortedMapCodec,
};
pub use enums::{nominal_codec, ordinal_codec, CqlEnum, NominalCodec, OrdinalCodec};
pub use mapping::{decimal_codec, DecimalCodec, MappingCodec};
pub use primitive::*;
pub use udt::{
    FieldCodecs, FieldLiterals, FieldValues, IdenticalOrderCodec, ReorderedCodec, UdtCodec,
    UdtCodecCache, UserType,
};

/// Conversion between one Rust type and a CQL type.
///
/// Codecs are immutable after construction and safe to share across threads.
pub trait Codec: Send + Sync {
    type Value: Send + Sync + 'static;

    /// The CQL type this codec serves.
    fn wire_type(&self) -> WireType;

    /// Encode a value. `Ok(None)` means absent and is only produced for NULL.
    fn encode(&self, value: &Self::Value) -> CqlResult<Option<Vec<u8>>>;

    /// Decode bytes written by [`Codec::encode`]. `None` is an absent value.
    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Self::Value>;

    /// Render a value as a CQL literal.
    fn format(&self, value: &Self::Value) -> String;

    /// Parse a CQL literal produced by [`Codec::format`].
    fn parse(&self, text: &str) -> CqlResult<Self::Value>;

    fn accepts_type(&self, wire_type: &WireType) -> bool {
        self.wire_type().is_compatible(wire_type)
    }

    fn accepts_value(&self, value: &dyn Any) -> bool {
        value.is::<Self::Value>()
    }

    /// Encode a type-erased value, used by the registry.
    fn encode_dyn(&self, value: &dyn Any) -> CqlResult<Option<Vec<u8>>> {
        match value.downcast_ref::<Self::Value>() {
            Some(v) => self.encode(v),
            None => Err(CqlError::illegal_value(
                self.wire_type(),
                "<erased>",
                format!("expected a {}", std::any::type_name::<Self::Value>()),
            )),
        }
    }
}

impl<C: Codec + ?Sized> Codec for Arc<C> {
    type Value = C::Value;

    fn wire_type(&self) -> WireType {
        (**self).wire_type()
    }

    fn encode(&self, value: &Self::Value) -> CqlResult<Option<Vec<u8>>> {
        (**self).encode(value)
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Self::Value> {
        (**self).decode(bytes)
    }

    fn format(&self, value: &Self::Value) -> String {
        (**self).format(value)
    }

    fn parse(&self, text: &str) -> CqlResult<Self::Value> {
        (**self).parse(text)
    }

    fn accepts_type(&self, wire_type: &WireType) -> bool {
        (**self).accepts_type(wire_type)
    }

    fn accepts_value(&self, value: &dyn Any) -> bool {
        (**self).accepts_value(value)
    }

    fn encode_dyn(&self, value: &dyn Any) -> CqlResult<Option<Vec<u8>>> {
        (**self).encode_dyn(value)
    }
}

/// Rust types with a default codec, resolved at compile time.
///
/// Derived UDTs and collection codecs use this to find their element codecs.
pub trait CqlType: Sized + Send + Sync + 'static {
    type Codec: Codec<Value = Self> + 'static;

    /// True when the type has a NULL representation.
    const NULLABLE: bool = false;

    fn codec() -> Self::Codec;

    /// Codec for a column of the given live type.
    ///
    /// Types that contain UDTs override this so nested fields follow the live
    /// field order instead of their declaration.
    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        let codec = Self::codec();
        if codec.accepts_type(wire_type) {
            Ok(codec)
        } else {
            Err(type_mismatch::<Self>(&codec.wire_type(), wire_type))
        }
    }
}

/// A live column type that a Rust type's codec cannot serve.
pub(crate) fn type_mismatch<T>(expected: &WireType, actual: &WireType) -> CqlError {
    CqlError::schema_mismatch(
        actual.to_string(),
        format!("{} maps to {}", std::any::type_name::<T>(), expected),
    )
}

impl<T: CqlType> CqlType for Option<T> {
    type Codec = OptionCodec<T::Codec>;
    const NULLABLE: bool = true;

    fn codec() -> Self::Codec {
        OptionCodec::new(T::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        T::codec_for(wire_type).map(OptionCodec::new)
    }
}

/// Lifts a codec to `Option<T>`, giving it a NULL representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionCodec<C> {
    inner: C,
}

impl<C: Codec> OptionCodec<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Codec> Codec for OptionCodec<C> {
    type Value = Option<C::Value>;

    fn wire_type(&self) -> WireType {
        self.inner.wire_type()
    }

    fn encode(&self, value: &Self::Value) -> CqlResult<Option<Vec<u8>>> {
        match value {
            Some(v) => self.inner.encode(v),
            None => Ok(None),
        }
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Self::Value> {
        match bytes {
            Some(b) => self.inner.decode(Some(b)).map(Some),
            None => Ok(None),
        }
    }

    fn format(&self, value: &Self::Value) -> String {
        match value {
            Some(v) => self.inner.format(v),
            None => NULL_TOKEN.to_string(),
        }
    }

    fn parse(&self, text: &str) -> CqlResult<Self::Value> {
        if is_null_literal(text) {
            return Ok(None);
        }
        self.inner.parse(text).map(Some)
    }

    fn accepts_type(&self, wire_type: &WireType) -> bool {
        self.inner.accepts_type(wire_type)
    }

    /// Accepts `Option<T>` samples and bare samples of the inner type.
    fn accepts_value(&self, value: &dyn Any) -> bool {
        value.is::<Self::Value>() || self.inner.accepts_value(value)
    }

    fn encode_dyn(&self, value: &dyn Any) -> CqlResult<Option<Vec<u8>>> {
        match value.downcast_ref::<Self::Value>() {
            Some(v) => self.encode(v),
            None => self.inner.encode_dyn(value),
        }
    }
}

// ==================== Framing ====================

/// Length sentinel for an absent value.
pub const NULL_LENGTH: i32 = -1;

/// Write a length-prefixed value, or the NULL sentinel.
pub fn write_value(buf: &mut BytesMut, value: Option<&[u8]>) -> CqlResult<()> {
    match value {
        None => buf.put_i32(NULL_LENGTH),
        Some(data) => {
            buf.put_i32(frame_len(data.len())?);
            buf.put_slice(data);
        }
    }
    Ok(())
}

/// Write an element or entry count.
pub fn write_count(buf: &mut BytesMut, count: usize) -> CqlResult<()> {
    buf.put_i32(frame_len(count)?);
    Ok(())
}

fn frame_len(len: usize) -> CqlResult<i32> {
    i32::try_from(len).map_err(|_| {
        CqlError::illegal_value("frame", format!("{} bytes", len), "exceeds i32::MAX")
    })
}

/// Read an element or entry count.
pub fn read_count(buf: &mut &[u8], wire_type: &WireType) -> CqlResult<usize> {
    if buf.remaining() < 4 {
        return Err(CqlError::decode(
            wire_type,
            format!("truncated count: {} bytes left", buf.remaining()),
        ));
    }
    let count = buf.get_i32();
    usize::try_from(count)
        .map_err(|_| CqlError::decode(wire_type, format!("negative count {}", count)))
}

/// Read a length-prefixed value; `None` for the NULL sentinel.
pub fn read_value<'a>(buf: &mut &'a [u8], wire_type: &WireType) -> CqlResult<Option<&'a [u8]>> {
    if buf.remaining() < 4 {
        return Err(CqlError::decode(
            wire_type,
            format!("truncated length prefix: {} bytes left", buf.remaining()),
        ));
    }
    let len = buf.get_i32();
    if len < 0 {
        if len == NULL_LENGTH {
            return Ok(None);
        }
        return Err(CqlError::decode(wire_type, format!("invalid length {}", len)));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(CqlError::decode(
            wire_type,
            format!("value needs {} bytes, {} left", len, buf.remaining()),
        ));
    }
    let input: &'a [u8] = *buf;
    let (value, rest) = input.split_at(len);
    *buf = rest;
    Ok(Some(value))
}

/// Fail if a decoder left bytes behind.
pub fn expect_consumed(buf: &[u8], wire_type: &WireType) -> CqlResult<()> {
    if buf.is_empty() {
        Ok(())
    } else {
        Err(CqlError::decode(
            wire_type,
            format!("{} trailing bytes", buf.len()),
        ))
    }
}

/// Unwrap a present value, or fail for codecs without a NULL representation.
pub fn require<'a>(bytes: Option<&'a [u8]>, wire_type: &WireType) -> CqlResult<&'a [u8]> {
    bytes.ok_or_else(|| CqlError::unexpected_null(wire_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_roundtrip() {
        let mut buf = BytesMut::new();
        write_count(&mut buf, 2).unwrap();
        write_value(&mut buf, Some(b"ab")).unwrap();
        write_value(&mut buf, None).unwrap();
        assert_eq!(
            &buf[..],
            &[0, 0, 0, 2, 0, 0, 0, 2, b'a', b'b', 0xFF, 0xFF, 0xFF, 0xFF][..]
        );

        let mut input: &[u8] = &buf;
        let ty = WireType::list(WireType::Blob);
        assert_eq!(read_count(&mut input, &ty).unwrap(), 2);
        assert_eq!(read_value(&mut input, &ty).unwrap(), Some(&b"ab"[..]));
        assert_eq!(read_value(&mut input, &ty).unwrap(), None);
        assert!(expect_consumed(input, &ty).is_ok());
    }

    #[test]
    fn test_read_value_rejects_truncation() {
        let ty = WireType::Blob;
        let mut input: &[u8] = &[0, 0, 0, 5, 1, 2];
        assert!(matches!(read_value(&mut input, &ty), Err(CqlError::Decode { .. })));

        let mut input: &[u8] = &[0, 0];
        assert!(read_value(&mut input, &ty).is_err());

        let mut input: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFE];
        assert!(read_value(&mut input, &ty).is_err());
    }

    #[test]
    fn test_option_codec_null_handling() {
        let codec = OptionCodec::new(IntCodec);
        assert_eq!(codec.encode(&None).unwrap(), None);
        assert_eq!(codec.decode(None).unwrap(), None);
        assert_eq!(codec.format(&None), "NULL");
        assert_eq!(codec.parse("null").unwrap(), None);
        assert_eq!(codec.parse(" NuLl ").unwrap(), None);
        assert_eq!(codec.parse("7").unwrap(), Some(7));
        assert!(matches!(
            IntCodec.decode(None),
            Err(CqlError::UnexpectedNull { .. })
        ));
    }

    #[test]
    fn test_option_codec_accepts_both_shapes() {
        let codec = OptionCodec::new(IntCodec);
        assert!(codec.accepts_value(&Some(1i32)));
        assert!(codec.accepts_value(&1i32));
        assert!(!codec.accepts_value(&1i64));
        assert_eq!(codec.encode_dyn(&5i32).unwrap(), Some(vec![0, 0, 0, 5]));
        assert_eq!(codec.encode_dyn(&None::<i32>).unwrap(), None);
    }
}
