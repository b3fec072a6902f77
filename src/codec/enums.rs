//! Enum codecs.
//!
//! Nominal codecs store the variant's wire name as `text`; ordinal codecs store
//! its declaration index as `int`. Both are [`MappingCodec`]s, so the wire logic
//! stays in [`TextCodec`] and [`IntCodec`].
//!
//! ```ignore
//! #[derive(CqlEnum)]
//! #[cql(rename_all = "SCREAMING_SNAKE_CASE")]
//! enum Status { Active, OnHold }        // 'ACTIVE', 'ON_HOLD'
//!
//! #[derive(CqlEnum)]
//! #[cql(ordinal)]
//! enum Priority { Low, High }           // 0, 1
//! ```

use super::mapping::MappingCodec;
use super::primitive::{IntCodec, TextCodec};
use crate::error::{CqlError, CqlResult};

/// A closed enumeration with a fixed, statically known variant list.
///
/// Usually derived with `#[derive(CqlEnum)]`, which also picks the default codec.
pub trait CqlEnum: Sized + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    /// Wire names, in declaration order.
    const NAMES: &'static [&'static str];

    fn ordinal(&self) -> usize;

    fn from_ordinal(ordinal: usize) -> Option<Self>;

    fn name(&self) -> &'static str {
        Self::NAMES[self.ordinal()]
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(Self::from_ordinal)
    }
}

/// Variant stored by name as `text`.
pub type NominalCodec<E> = MappingCodec<TextCodec, E>;

/// Variant stored by declaration index as `int`.
pub type OrdinalCodec<E> = MappingCodec<IntCodec, E>;

pub fn nominal_codec<E: CqlEnum>() -> NominalCodec<E> {
    NominalCodec::new(TextCodec, variant_by_name::<E>, variant_name::<E>)
}

pub fn ordinal_codec<E: CqlEnum>() -> OrdinalCodec<E> {
    OrdinalCodec::new(IntCodec, variant_by_ordinal::<E>, variant_ordinal::<E>)
}

fn variant_by_name<E: CqlEnum>(name: String) -> CqlResult<E> {
    E::from_name(&name).ok_or(CqlError::NoSuchVariant {
        enum_name: E::TYPE_NAME,
        value: format!("'{}'", name),
    })
}

fn variant_name<E: CqlEnum>(value: &E) -> String {
    value.name().to_string()
}

fn variant_by_ordinal<E: CqlEnum>(ordinal: i32) -> CqlResult<E> {
    usize::try_from(ordinal)
        .ok()
        .and_then(E::from_ordinal)
        .ok_or(CqlError::NoSuchVariant {
            enum_name: E::TYPE_NAME,
            value: format!("ordinal {} of {}", ordinal, E::NAMES.len()),
        })
}

fn variant_ordinal<E: CqlEnum>(value: &E) -> i32 {
    // Variant lists are far below i32::MAX.
    value.ordinal() as i32
}
