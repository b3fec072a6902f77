//! Scalar codecs.
//!
//! Fixed-width numerics are big-endian and reject any other byte length.
//! Text literals follow CQL: strings are single-quoted, blobs are `0x`-prefixed
//! hex, timestamps/dates/times/inets are quoted.

use std::net::IpAddr;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, Timelike, Utc};
use uuid::Uuid;

use super::{require, Codec, CqlType};
use crate::error::{CqlError, CqlResult};
use crate::parser::{quote, unquote};
use crate::types::WireType;

fn fixed<const N: usize>(bytes: &[u8], wire_type: &WireType) -> CqlResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| CqlError::invalid_length(wire_type, N, bytes.len()))
}

fn parse_number<T: std::str::FromStr>(text: &str, wire_type: &WireType) -> CqlResult<T>
where
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e: T::Err| CqlError::illegal_argument(wire_type, text, e.to_string()))
}

fn quoted_text(text: &str, wire_type: &WireType) -> CqlResult<String> {
    unquote(text)
        .ok_or_else(|| CqlError::illegal_argument(wire_type, text, "expected a quoted literal"))
}

/// Quoted or bare text, for types whose literals are usually quoted.
fn maybe_quoted(text: &str) -> String {
    unquote(text).unwrap_or_else(|| text.trim().to_string())
}

// ==================== Integer Types ====================

macro_rules! fixed_width_codec {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $wire:expr, $len:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Codec for $name {
            type Value = $ty;

            fn wire_type(&self) -> WireType {
                $wire
            }

            fn encode(&self, value: &$ty) -> CqlResult<Option<Vec<u8>>> {
                Ok(Some(value.to_be_bytes().to_vec()))
            }

            fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<$ty> {
                let wire = $wire;
                let bytes = require(bytes, &wire)?;
                Ok(<$ty>::from_be_bytes(fixed::<$len>(bytes, &wire)?))
            }

            fn format(&self, value: &$ty) -> String {
                value.to_string()
            }

            fn parse(&self, text: &str) -> CqlResult<$ty> {
                parse_number(text, &$wire)
            }
        }
    };
}

fixed_width_codec!(
    /// `tinyint` as `i8`.
    TinyintCodec, i8, WireType::Tinyint, 1
);
fixed_width_codec!(
    /// `smallint` as `i16`.
    SmallintCodec, i16, WireType::Smallint, 2
);
fixed_width_codec!(
    /// `int` as `i32`.
    IntCodec, i32, WireType::Int, 4
);
fixed_width_codec!(
    /// `bigint` as `i64`.
    BigintCodec, i64, WireType::Bigint, 8
);
fixed_width_codec!(
    /// `counter` as `i64`.
    CounterCodec, i64, WireType::Counter, 8
);

// ==================== Float Types ====================

macro_rules! float_codec {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $wire:expr, $len:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Codec for $name {
            type Value = $ty;

            fn wire_type(&self) -> WireType {
                $wire
            }

            fn encode(&self, value: &$ty) -> CqlResult<Option<Vec<u8>>> {
                Ok(Some(value.to_be_bytes().to_vec()))
            }

            fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<$ty> {
                let wire = $wire;
                let bytes = require(bytes, &wire)?;
                Ok(<$ty>::from_be_bytes(fixed::<$len>(bytes, &wire)?))
            }

            fn format(&self, value: &$ty) -> String {
                if value.is_nan() {
                    "NaN".to_string()
                } else if value.is_infinite() {
                    let sign = if *value > 0.0 { "" } else { "-" };
                    format!("{}Infinity", sign)
                } else {
                    value.to_string()
                }
            }

            fn parse(&self, text: &str) -> CqlResult<$ty> {
                parse_number(text, &$wire)
            }
        }
    };
}

float_codec!(
    /// `float` as `f32`.
    FloatCodec, f32, WireType::Float, 4
);
float_codec!(
    /// `double` as `f64`.
    DoubleCodec, f64, WireType::Double, 8
);

// ==================== Boolean ====================

/// `boolean` as `bool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    type Value = bool;

    fn wire_type(&self) -> WireType {
        WireType::Boolean
    }

    fn encode(&self, value: &bool) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(vec![u8::from(*value)]))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<bool> {
        let bytes = require(bytes, &WireType::Boolean)?;
        let [b] = fixed::<1>(bytes, &WireType::Boolean)?;
        Ok(b != 0)
    }

    fn format(&self, value: &bool) -> String {
        value.to_string()
    }

    fn parse(&self, text: &str) -> CqlResult<bool> {
        match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Ok(true),
            t if t.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(CqlError::illegal_argument(
                WireType::Boolean,
                text,
                "expected true or false",
            )),
        }
    }
}

// ==================== String Types ====================

/// `text` / `varchar` as `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    type Value = String;

    fn wire_type(&self) -> WireType {
        WireType::Text
    }

    fn encode(&self, value: &String) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(value.as_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<String> {
        let bytes = require(bytes, &WireType::Text)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CqlError::decode(WireType::Text, format!("invalid UTF-8: {}", e)))
    }

    fn format(&self, value: &String) -> String {
        quote(value)
    }

    fn parse(&self, text: &str) -> CqlResult<String> {
        quoted_text(text, &WireType::Text)
    }
}

/// `ascii` as `String`, restricted to US-ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiCodec;

impl Codec for AsciiCodec {
    type Value = String;

    fn wire_type(&self) -> WireType {
        WireType::Ascii
    }

    fn encode(&self, value: &String) -> CqlResult<Option<Vec<u8>>> {
        if !value.is_ascii() {
            return Err(CqlError::illegal_value(
                WireType::Ascii,
                quote(value),
                "contains non-ASCII characters",
            ));
        }
        Ok(Some(value.as_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<String> {
        let bytes = require(bytes, &WireType::Ascii)?;
        if !bytes.is_ascii() {
            return Err(CqlError::decode(WireType::Ascii, "non-ASCII byte"));
        }
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    fn format(&self, value: &String) -> String {
        quote(value)
    }

    fn parse(&self, text: &str) -> CqlResult<String> {
        let value = quoted_text(text, &WireType::Ascii)?;
        if !value.is_ascii() {
            return Err(CqlError::illegal_argument(
                WireType::Ascii,
                text,
                "contains non-ASCII characters",
            ));
        }
        Ok(value)
    }
}

// ==================== Bytes ====================

/// `blob` as [`Bytes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobCodec;

impl Codec for BlobCodec {
    type Value = Bytes;

    fn wire_type(&self) -> WireType {
        WireType::Blob
    }

    fn encode(&self, value: &Bytes) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(value.to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Bytes> {
        let bytes = require(bytes, &WireType::Blob)?;
        Ok(Bytes::copy_from_slice(bytes))
    }

    fn format(&self, value: &Bytes) -> String {
        let mut out = String::with_capacity(2 + value.len() * 2);
        out.push_str("0x");
        for b in value.iter() {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }

    fn parse(&self, text: &str) -> CqlResult<Bytes> {
        let trimmed = text.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| CqlError::illegal_argument(WireType::Blob, text, "missing 0x prefix"))?;
        if !hex.is_ascii() || hex.len() % 2 != 0 {
            return Err(CqlError::illegal_argument(
                WireType::Blob,
                text,
                "expected an even number of hex digits",
            ));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| CqlError::illegal_argument(WireType::Blob, text, e.to_string()))?;
        Ok(Bytes::from(bytes))
    }
}

// ==================== UUID ====================

fn decode_uuid(bytes: Option<&[u8]>, wire_type: &WireType) -> CqlResult<Uuid> {
    let bytes = require(bytes, wire_type)?;
    Ok(Uuid::from_bytes(fixed::<16>(bytes, wire_type)?))
}

fn parse_uuid(text: &str, wire_type: &WireType) -> CqlResult<Uuid> {
    Uuid::parse_str(&maybe_quoted(text))
        .map_err(|e| CqlError::illegal_argument(wire_type, text, e.to_string()))
}

/// `uuid` as [`Uuid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    type Value = Uuid;

    fn wire_type(&self) -> WireType {
        WireType::Uuid
    }

    fn encode(&self, value: &Uuid) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(value.as_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Uuid> {
        decode_uuid(bytes, &WireType::Uuid)
    }

    fn format(&self, value: &Uuid) -> String {
        value.hyphenated().to_string()
    }

    fn parse(&self, text: &str) -> CqlResult<Uuid> {
        parse_uuid(text, &WireType::Uuid)
    }
}

/// `timeuuid` as [`Uuid`], restricted to version 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeuuidCodec;

impl Codec for TimeuuidCodec {
    type Value = Uuid;

    fn wire_type(&self) -> WireType {
        WireType::Timeuuid
    }

    fn encode(&self, value: &Uuid) -> CqlResult<Option<Vec<u8>>> {
        if value.get_version_num() != 1 {
            return Err(CqlError::illegal_value(
                WireType::Timeuuid,
                value.to_string(),
                format!("version {} is not a time-based UUID", value.get_version_num()),
            ));
        }
        Ok(Some(value.as_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<Uuid> {
        decode_uuid(bytes, &WireType::Timeuuid)
    }

    fn format(&self, value: &Uuid) -> String {
        value.hyphenated().to_string()
    }

    fn parse(&self, text: &str) -> CqlResult<Uuid> {
        parse_uuid(text, &WireType::Timeuuid)
    }
}

// ==================== Temporal Types ====================

const NANOS_PER_MILLI: u32 = 1_000_000;

/// Why a `DateTime` has no exact millisecond timestamp, if it has none.
fn inexact_millis(value: &DateTime<Utc>) -> Option<&'static str> {
    let nanos = value.timestamp_subsec_nanos();
    if nanos >= 1_000_000_000 {
        Some("leap seconds have no timestamp representation")
    } else if nanos % NANOS_PER_MILLI != 0 {
        Some("sub-millisecond precision is not representable")
    } else {
        None
    }
}

/// `timestamp` as `DateTime<Utc>`, millisecond precision.
///
/// Values finer than a millisecond are rejected rather than truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec;

impl Codec for TimestampCodec {
    type Value = DateTime<Utc>;

    fn wire_type(&self) -> WireType {
        WireType::Timestamp
    }

    fn encode(&self, value: &DateTime<Utc>) -> CqlResult<Option<Vec<u8>>> {
        if let Some(reason) = inexact_millis(value) {
            return Err(CqlError::illegal_value(WireType::Timestamp, value.to_rfc3339(), reason));
        }
        Ok(Some(value.timestamp_millis().to_be_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<DateTime<Utc>> {
        let bytes = require(bytes, &WireType::Timestamp)?;
        let millis = i64::from_be_bytes(fixed::<8>(bytes, &WireType::Timestamp)?);
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            CqlError::decode(WireType::Timestamp, format!("{} ms is out of range", millis))
        })
    }

    fn format(&self, value: &DateTime<Utc>) -> String {
        let precision = match inexact_millis(value) {
            None => SecondsFormat::Millis,
            Some(_) => SecondsFormat::Nanos,
        };
        quote(&value.to_rfc3339_opts(precision, true))
    }

    fn parse(&self, text: &str) -> CqlResult<DateTime<Utc>> {
        let raw = maybe_quoted(text);
        if let Ok(millis) = raw.parse::<i64>() {
            return DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                CqlError::illegal_argument(WireType::Timestamp, text, "out of range")
            });
        }
        let value = DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CqlError::illegal_argument(WireType::Timestamp, text, e.to_string()))?;
        match inexact_millis(&value) {
            None => Ok(value),
            Some(reason) => Err(CqlError::illegal_argument(WireType::Timestamp, text, reason)),
        }
    }
}

/// Days are unsigned with the epoch at 2^31.
const DATE_EPOCH_OFFSET: i64 = 1 << 31;

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// `date` as `NaiveDate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl Codec for DateCodec {
    type Value = NaiveDate;

    fn wire_type(&self) -> WireType {
        WireType::Date
    }

    fn encode(&self, value: &NaiveDate) -> CqlResult<Option<Vec<u8>>> {
        let days = value.signed_duration_since(unix_epoch()).num_days() + DATE_EPOCH_OFFSET;
        let days = u32::try_from(days).map_err(|_| {
            CqlError::illegal_value(WireType::Date, value.to_string(), "outside the date range")
        })?;
        Ok(Some(days.to_be_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<NaiveDate> {
        let bytes = require(bytes, &WireType::Date)?;
        let days = i64::from(u32::from_be_bytes(fixed::<4>(bytes, &WireType::Date)?));
        TimeDelta::try_days(days - DATE_EPOCH_OFFSET)
            .and_then(|delta| unix_epoch().checked_add_signed(delta))
            .ok_or_else(|| CqlError::decode(WireType::Date, format!("day {} is out of range", days)))
    }

    fn format(&self, value: &NaiveDate) -> String {
        quote(&value.format("%Y-%m-%d").to_string())
    }

    fn parse(&self, text: &str) -> CqlResult<NaiveDate> {
        NaiveDate::parse_from_str(&maybe_quoted(text), "%Y-%m-%d")
            .map_err(|e| CqlError::illegal_argument(WireType::Date, text, e.to_string()))
    }
}

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// `time` as `NaiveTime`, nanoseconds since midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCodec;

impl Codec for TimeCodec {
    type Value = NaiveTime;

    fn wire_type(&self) -> WireType {
        WireType::Time
    }

    fn encode(&self, value: &NaiveTime) -> CqlResult<Option<Vec<u8>>> {
        let nanos = i64::from(value.nanosecond());
        if nanos >= NANOS_PER_SECOND {
            return Err(CqlError::illegal_value(
                WireType::Time,
                value.to_string(),
                "leap seconds have no time representation",
            ));
        }
        let total = i64::from(value.num_seconds_from_midnight()) * NANOS_PER_SECOND + nanos;
        Ok(Some(total.to_be_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<NaiveTime> {
        let bytes = require(bytes, &WireType::Time)?;
        let total = i64::from_be_bytes(fixed::<8>(bytes, &WireType::Time)?);
        if !(0..86_400 * NANOS_PER_SECOND).contains(&total) {
            return Err(CqlError::decode(
                WireType::Time,
                format!("{} ns is outside a day", total),
            ));
        }
        NaiveTime::from_num_seconds_from_midnight_opt(
            (total / NANOS_PER_SECOND) as u32,
            (total % NANOS_PER_SECOND) as u32,
        )
        .ok_or_else(|| CqlError::decode(WireType::Time, format!("{} ns is invalid", total)))
    }

    fn format(&self, value: &NaiveTime) -> String {
        quote(&value.format("%H:%M:%S%.9f").to_string())
    }

    fn parse(&self, text: &str) -> CqlResult<NaiveTime> {
        let value = NaiveTime::parse_from_str(&maybe_quoted(text), "%H:%M:%S%.f")
            .map_err(|e| CqlError::illegal_argument(WireType::Time, text, e.to_string()))?;
        if i64::from(value.nanosecond()) >= NANOS_PER_SECOND {
            return Err(CqlError::illegal_argument(WireType::Time, text, "leap second"));
        }
        Ok(value)
    }
}

// ==================== Arbitrary Precision ====================

/// Minimal two's-complement big-endian bytes.
pub(crate) fn encode_varint(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub(crate) fn decode_varint(bytes: &[u8], wire_type: &WireType) -> CqlResult<i128> {
    if bytes.is_empty() {
        return Err(CqlError::invalid_length(wire_type, "at least 1", 0));
    }
    if bytes.len() > 16 {
        return Err(CqlError::decode(
            wire_type,
            format!("{}-byte integer overflows 128 bits", bytes.len()),
        ));
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

/// `varint` as `i128`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarintCodec;

impl Codec for VarintCodec {
    type Value = i128;

    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn encode(&self, value: &i128) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(encode_varint(*value)))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<i128> {
        decode_varint(require(bytes, &WireType::Varint)?, &WireType::Varint)
    }

    fn format(&self, value: &i128) -> String {
        value.to_string()
    }

    fn parse(&self, text: &str) -> CqlResult<i128> {
        parse_number(text, &WireType::Varint)
    }
}

/// A decimal as the wire carries it: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnscaledDecimal {
    pub unscaled: i128,
    pub scale: i32,
}

/// `decimal` as [`UnscaledDecimal`]: 4-byte scale followed by a varint.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnscaledDecimalCodec;

impl Codec for UnscaledDecimalCodec {
    type Value = UnscaledDecimal;

    fn wire_type(&self) -> WireType {
        WireType::Decimal
    }

    fn encode(&self, value: &UnscaledDecimal) -> CqlResult<Option<Vec<u8>>> {
        let mut out = value.scale.to_be_bytes().to_vec();
        out.extend_from_slice(&encode_varint(value.unscaled));
        Ok(Some(out))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<UnscaledDecimal> {
        let bytes = require(bytes, &WireType::Decimal)?;
        if bytes.len() < 5 {
            return Err(CqlError::invalid_length(WireType::Decimal, "at least 5", bytes.len()));
        }
        let (scale, unscaled) = bytes.split_at(4);
        Ok(UnscaledDecimal {
            unscaled: decode_varint(unscaled, &WireType::Decimal)?,
            scale: i32::from_be_bytes(fixed::<4>(scale, &WireType::Decimal)?),
        })
    }

    fn format(&self, value: &UnscaledDecimal) -> String {
        if value.scale <= 0 {
            return if value.scale == 0 {
                value.unscaled.to_string()
            } else {
                format!("{}E+{}", value.unscaled, -i64::from(value.scale))
            };
        }
        let digits = value.unscaled.unsigned_abs().to_string();
        let scale = value.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        let sign = if value.unscaled < 0 { "-" } else { "" };
        format!("{}{}.{}", sign, int_part, frac_part)
    }

    fn parse(&self, text: &str) -> CqlResult<UnscaledDecimal> {
        let invalid = |reason: &str| CqlError::illegal_argument(WireType::Decimal, text, reason);
        let trimmed = text.trim();
        let (mantissa, exponent) = match trimmed.find(['e', 'E']) {
            Some(pos) => (
                &trimmed[..pos],
                trimmed[pos + 1..]
                    .parse::<i32>()
                    .map_err(|_| invalid("invalid exponent"))?,
            ),
            None => (trimmed, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if frac_part.contains(['-', '+']) {
            return Err(invalid("sign inside fraction"));
        }
        let unscaled: i128 = format!("{}{}", int_part, frac_part)
            .parse()
            .map_err(|_| invalid("invalid digits"))?;
        let scale = i32::try_from(frac_part.len())
            .ok()
            .and_then(|s| s.checked_sub(exponent))
            .ok_or_else(|| invalid("scale out of range"))?;
        Ok(UnscaledDecimal { unscaled, scale })
    }
}

// ==================== Network ====================

/// `inet` as `IpAddr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InetCodec;

impl Codec for InetCodec {
    type Value = IpAddr;

    fn wire_type(&self) -> WireType {
        WireType::Inet
    }

    fn encode(&self, value: &IpAddr) -> CqlResult<Option<Vec<u8>>> {
        Ok(Some(match value {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<IpAddr> {
        let bytes = require(bytes, &WireType::Inet)?;
        match bytes.len() {
            4 => Ok(IpAddr::from(fixed::<4>(bytes, &WireType::Inet)?)),
            16 => Ok(IpAddr::from(fixed::<16>(bytes, &WireType::Inet)?)),
            n => Err(CqlError::invalid_length(WireType::Inet, "4 or 16", n)),
        }
    }

    fn format(&self, value: &IpAddr) -> String {
        quote(&value.to_string())
    }

    fn parse(&self, text: &str) -> CqlResult<IpAddr> {
        maybe_quoted(text)
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                CqlError::illegal_argument(WireType::Inet, text, e.to_string())
            })
    }
}

// ==================== Default Codecs ====================

macro_rules! cql_type {
    ($($ty:ty => $codec:ident),* $(,)?) => {
        $(
            impl CqlType for $ty {
                type Codec = $codec;

                fn codec() -> $codec {
                    $codec
                }
            }
        )*
    };
}

cql_type! {
    bool => BooleanCodec,
    i8 => TinyintCodec,
    i16 => SmallintCodec,
    i32 => IntCodec,
    i64 => BigintCodec,
    i128 => VarintCodec,
    f32 => FloatCodec,
    f64 => DoubleCodec,
    String => TextCodec,
    Bytes => BlobCodec,
    Uuid => UuidCodec,
    DateTime<Utc> => TimestampCodec,
    NaiveDate => DateCodec,
    NaiveTime => TimeCodec,
    UnscaledDecimal => UnscaledDecimalCodec,
    IpAddr => InetCodec,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roundtrip<C: Codec>(codec: &C, value: C::Value) -> C::Value {
        let bytes = codec.encode(&value).unwrap();
        codec.decode(bytes.as_deref()).unwrap()
    }

    #[test]
    fn test_int_binary() {
        assert_eq!(IntCodec.encode(&42).unwrap(), Some(vec![0, 0, 0, 42]));
        assert_eq!(IntCodec.decode(Some(&[0xFF, 0xFF, 0xFF, 0xFE])).unwrap(), -2);
    }

    #[test]
    fn test_fixed_width_rejects_wrong_length() {
        let err = IntCodec.decode(Some(&[0, 0, 1])).unwrap_err();
        assert!(matches!(err, CqlError::InvalidLength { actual: 3, .. }));
        assert!(BigintCodec.decode(Some(&[0; 4])).is_err());
        assert!(BooleanCodec.decode(Some(&[])).is_err());
        assert!(UuidCodec.decode(Some(&[0; 15])).is_err());
    }

    #[test]
    fn test_text_literals() {
        let value = "it's".to_string();
        assert_eq!(TextCodec.format(&value), "'it''s'");
        assert_eq!(TextCodec.parse("'it''s'").unwrap(), value);
        assert!(TextCodec.parse("bare").is_err());
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        let err = AsciiCodec.encode(&"héllo".to_string()).unwrap_err();
        assert!(matches!(err, CqlError::IllegalValue { .. }));
        assert!(AsciiCodec.decode(Some("héllo".as_bytes())).is_err());
    }

    #[test]
    fn test_blob_hex() {
        let blob = Bytes::from_static(&[0xCA, 0xFE, 0x01]);
        assert_eq!(BlobCodec.format(&blob), "0xcafe01");
        assert_eq!(BlobCodec.parse("0xCAFE01").unwrap(), blob);
        assert!(BlobCodec.parse("cafe").is_err());
        assert!(BlobCodec.parse("0xabc").is_err());
        assert_eq!(BlobCodec.parse("0x").unwrap(), Bytes::new());
    }

    #[test]
    fn test_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(roundtrip(&TimestampCodec, ts), ts);
        assert_eq!(TimestampCodec.format(&ts), "'2024-03-01T12:30:00.000Z'");
        assert_eq!(TimestampCodec.parse("'2024-03-01T12:30:00.000Z'").unwrap(), ts);
        assert_eq!(
            TimestampCodec.parse(&ts.timestamp_millis().to_string()).unwrap(),
            ts
        );
    }

    #[test]
    fn test_timestamp_rejects_sub_millisecond() {
        let ts = Utc.timestamp_opt(1_700_000_000, 1_500_000).unwrap();
        assert!(matches!(
            TimestampCodec.encode(&ts),
            Err(CqlError::IllegalValue { .. })
        ));
        assert_eq!(
            TimestampCodec.format(&ts),
            "'2023-11-14T22:13:20.001500000Z'"
        );
        assert!(matches!(
            TimestampCodec.parse("'2023-11-14T22:13:20.001500Z'"),
            Err(CqlError::IllegalArgument { .. })
        ));

        let exact = Utc.timestamp_opt(1_700_000_000, 1_000_000).unwrap();
        assert_eq!(roundtrip(&TimestampCodec, exact), exact);
        assert_eq!(TimestampCodec.parse(&TimestampCodec.format(&exact)).unwrap(), exact);
    }

    #[test]
    fn test_leap_seconds_are_rejected() {
        let leap = NaiveTime::from_hms_nano_opt(23, 59, 59, 1_500_000_000).unwrap();
        assert!(matches!(
            TimeCodec.encode(&leap),
            Err(CqlError::IllegalValue { .. })
        ));
        assert!(TimeCodec.parse("'23:59:60.5'").is_err());

        let leap_ts = NaiveDate::from_ymd_opt(2016, 12, 31)
            .unwrap()
            .and_time(leap)
            .and_utc();
        assert!(matches!(
            TimestampCodec.encode(&leap_ts),
            Err(CqlError::IllegalValue { .. })
        ));
    }

    #[test]
    fn test_date_epoch_offset() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(DateCodec.encode(&epoch).unwrap(), Some(vec![0x80, 0, 0, 0]));
        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(roundtrip(&DateCodec, before), before);
        assert_eq!(DateCodec.parse(&DateCodec.format(&before)).unwrap(), before);
    }

    #[test]
    fn test_time() {
        let t = NaiveTime::from_hms_nano_opt(23, 59, 59, 123_456_789).unwrap();
        assert_eq!(roundtrip(&TimeCodec, t), t);
        assert_eq!(TimeCodec.format(&t), "'23:59:59.123456789'");
        assert_eq!(TimeCodec.parse("'23:59:59.123456789'").unwrap(), t);
        let out_of_day = (86_400 * NANOS_PER_SECOND).to_be_bytes();
        assert!(TimeCodec.decode(Some(&out_of_day)).is_err());
    }

    #[test]
    fn test_varint_minimal_encoding() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(127), vec![0x7F]);
        assert_eq!(encode_varint(128), vec![0x00, 0x80]);
        assert_eq!(encode_varint(-1), vec![0xFF]);
        assert_eq!(encode_varint(-129), vec![0xFF, 0x7F]);
        for v in [0, 1, -1, 255, -256, i128::MAX, i128::MIN] {
            assert_eq!(roundtrip(&VarintCodec, v), v);
        }
        assert!(VarintCodec.decode(Some(&[])).is_err());
        assert!(VarintCodec.decode(Some(&[1; 17])).is_err());
    }

    #[test]
    fn test_unscaled_decimal_text() {
        let cases = [
            (UnscaledDecimal { unscaled: 12345, scale: 2 }, "123.45"),
            (UnscaledDecimal { unscaled: -5, scale: 3 }, "-0.005"),
            (UnscaledDecimal { unscaled: 7, scale: 0 }, "7"),
            (UnscaledDecimal { unscaled: 7, scale: -2 }, "7E+2"),
        ];
        for (value, text) in cases {
            assert_eq!(UnscaledDecimalCodec.format(&value), text);
            assert_eq!(UnscaledDecimalCodec.parse(text).unwrap(), value);
            assert_eq!(roundtrip(&UnscaledDecimalCodec, value), value);
        }
    }

    #[test]
    fn test_inet() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();
        assert_eq!(InetCodec.encode(&v4).unwrap().unwrap().len(), 4);
        assert_eq!(roundtrip(&InetCodec, v6), v6);
        assert_eq!(InetCodec.parse(&InetCodec.format(&v6)).unwrap(), v6);
        assert!(InetCodec.decode(Some(&[1, 2, 3])).is_err());
    }

    #[test]
    fn test_timeuuid_requires_v1() {
        let v4 = Uuid::new_v4();
        assert!(TimeuuidCodec.encode(&v4).is_err());
        assert!(UuidCodec.encode(&v4).is_ok());
        assert_eq!(UuidCodec.parse(&UuidCodec.format(&v4)).unwrap(), v4);
    }

    #[test]
    fn test_float_special_values() {
        assert_eq!(DoubleCodec.format(&f64::INFINITY), "Infinity");
        assert_eq!(DoubleCodec.parse("-Infinity").unwrap(), f64::NEG_INFINITY);
        assert!(DoubleCodec.parse("NaN").unwrap().is_nan());
        assert_eq!(roundtrip(&FloatCodec, 1.5f32), 1.5);
    }
}
