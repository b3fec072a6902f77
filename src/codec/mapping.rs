//! Codecs derived from another codec through a pair of conversions.
//!
//! The wire format stays with the inner codec; a [`MappingCodec`] only converts
//! values on the way in and out. Enum codecs and `decimal` are built this way.

use std::any::Any;
use std::marker::PhantomData;

use rust_decimal::Decimal;

use super::primitive::{UnscaledDecimal, UnscaledDecimalCodec};
use super::{Codec, CqlType};
use crate::error::{CqlError, CqlResult};
use crate::types::WireType;

/// Lifts `Codec<Value = I>` to `Codec<Value = O>`.
///
/// `into_inner` is total. `into_outer` may reject inner values that have no outer
/// counterpart (an unknown enum name, a decimal beyond 96 bits).
pub struct MappingCodec<
    C: Codec,
    O,
    F = fn(<C as Codec>::Value) -> CqlResult<O>,
    G = fn(&O) -> <C as Codec>::Value,
> {
    inner: C,
    into_outer: F,
    into_inner: G,
    _outer: PhantomData<fn() -> O>,
}

impl<C, O, F, G> MappingCodec<C, O, F, G>
where
    C: Codec,
    F: Fn(C::Value) -> CqlResult<O>,
    G: Fn(&O) -> C::Value,
{
    pub fn new(inner: C, into_outer: F, into_inner: G) -> Self {
        Self {
            inner,
            into_outer,
            into_inner,
            _outer: PhantomData,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C, O, F, G> Clone for MappingCodec<C, O, F, G>
where
    C: Codec + Clone,
    F: Clone,
    G: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            into_outer: self.into_outer.clone(),
            into_inner: self.into_inner.clone(),
            _outer: PhantomData,
        }
    }
}

impl<C, O, F, G> Codec for MappingCodec<C, O, F, G>
where
    C: Codec,
    O: Send + Sync + 'static,
    F: Fn(C::Value) -> CqlResult<O> + Send + Sync,
    G: Fn(&O) -> C::Value + Send + Sync,
{
    type Value = O;

    fn wire_type(&self) -> WireType {
        self.inner.wire_type()
    }

    fn encode(&self, value: &O) -> CqlResult<Option<Vec<u8>>> {
        self.inner.encode(&(self.into_inner)(value))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<O> {
        (self.into_outer)(self.inner.decode(bytes)?)
    }

    fn format(&self, value: &O) -> String {
        self.inner.format(&(self.into_inner)(value))
    }

    fn parse(&self, text: &str) -> CqlResult<O> {
        (self.into_outer)(self.inner.parse(text)?)
    }

    fn accepts_type(&self, wire_type: &WireType) -> bool {
        self.inner.accepts_type(wire_type)
    }

    fn accepts_value(&self, value: &dyn Any) -> bool {
        value.is::<O>()
    }
}

impl<C: Codec + std::fmt::Debug, O, F, G> std::fmt::Debug for MappingCodec<C, O, F, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingCodec")
            .field("inner", &self.inner)
            .field("outer", &std::any::type_name::<O>())
            .finish()
    }
}

// ==================== Decimal ====================

/// `decimal` as [`rust_decimal::Decimal`].
pub type DecimalCodec = MappingCodec<UnscaledDecimalCodec, Decimal>;

pub fn decimal_codec() -> DecimalCodec {
    DecimalCodec::new(UnscaledDecimalCodec, unscaled_to_decimal, decimal_to_unscaled)
}

fn decimal_to_unscaled(value: &Decimal) -> UnscaledDecimal {
    UnscaledDecimal {
        unscaled: value.mantissa(),
        scale: value.scale() as i32,
    }
}

fn unscaled_to_decimal(raw: UnscaledDecimal) -> CqlResult<Decimal> {
    let out_of_range = || {
        CqlError::decode(
            WireType::Decimal,
            format!("{}E{} does not fit a 96-bit decimal", raw.unscaled, -i64::from(raw.scale)),
        )
    };
    let (mantissa, scale) = if raw.scale < 0 {
        let factor = 10i128
            .checked_pow(raw.scale.unsigned_abs())
            .ok_or_else(out_of_range)?;
        (raw.unscaled.checked_mul(factor).ok_or_else(out_of_range)?, 0)
    } else {
        (raw.unscaled, raw.scale as u32)
    };
    Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| out_of_range())
}

impl CqlType for Decimal {
    type Codec = DecimalCodec;

    fn codec() -> DecimalCodec {
        decimal_codec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IntCodec;
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Celsius(i32);

    #[test]
    fn test_mapping_delegates_wire_format() {
        let codec = MappingCodec::new(
            IntCodec,
            |v: i32| Ok(Celsius(v)),
            |c: &Celsius| c.0,
        );
        assert_eq!(codec.wire_type(), WireType::Int);
        let bytes = codec.encode(&Celsius(21)).unwrap();
        assert_eq!(bytes, IntCodec.encode(&21).unwrap());
        assert_eq!(codec.decode(bytes.as_deref()).unwrap(), Celsius(21));
        assert_eq!(codec.format(&Celsius(-4)), "-4");
        assert_eq!(codec.parse("-4").unwrap(), Celsius(-4));
        assert!(codec.accepts_value(&Celsius(0)));
        assert!(!codec.accepts_value(&0i32));
    }

    #[test]
    fn test_decimal_roundtrip() {
        let codec = decimal_codec();
        for text in ["0", "123.45", "-0.005", "79228162514264337593543950335"] {
            let value = Decimal::from_str(text).unwrap();
            let bytes = codec.encode(&value).unwrap();
            assert_eq!(codec.decode(bytes.as_deref()).unwrap(), value);
            assert_eq!(codec.parse(&codec.format(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_decimal_wire_layout() {
        let value = Decimal::from_str("1.50").unwrap();
        assert_eq!(
            decimal_codec().encode(&value).unwrap(),
            Some(vec![0, 0, 0, 2, 0x00, 0x96])
        );
    }

    #[test]
    fn test_decimal_negative_scale_and_overflow() {
        let codec = decimal_codec();
        let raw = UnscaledDecimalCodec
            .encode(&UnscaledDecimal { unscaled: 12, scale: -3 })
            .unwrap();
        assert_eq!(
            codec.decode(raw.as_deref()).unwrap(),
            Decimal::from_str("12000").unwrap()
        );

        let huge = UnscaledDecimalCodec
            .encode(&UnscaledDecimal { unscaled: i128::MAX, scale: 0 })
            .unwrap();
        assert!(matches!(
            codec.decode(huge.as_deref()),
            Err(CqlError::Decode { .. })
        ));
    }
}
