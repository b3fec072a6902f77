//! Codec registry.
//!
//! Codecs are registered at startup and looked up by the statement layer, either
//! with a static Rust type (`resolve::<T>`) or with a declared [`WireType`] and an
//! optional type-erased sample value (`resolve_for`).
//!
//! # Ambiguity
//!
//! When more than one registered codec accepts a lookup, the most recently
//! registered one wins. [`CodecRegistry::with_defaults`] registers every
//! `OptionCodec` before its plain codec, so a bare `i32` sample resolves to
//! `IntCodec` while an `Option<i32>` sample resolves to `OptionCodec<IntCodec>`.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::codec::*;
use crate::error::{CqlError, CqlResult};
use crate::types::WireType;

/// A codec with its value type erased.
pub trait ErasedCodec: Send + Sync {
    fn wire_type(&self) -> WireType;

    /// Rust type name of the values this codec handles.
    fn value_type(&self) -> &'static str;

    fn accepts_type(&self, wire_type: &WireType) -> bool;

    fn accepts_value(&self, value: &dyn Any) -> bool;

    fn encode_any(&self, value: &dyn Any) -> CqlResult<Option<Vec<u8>>>;

    fn decode_any(&self, bytes: Option<&[u8]>) -> CqlResult<Box<dyn Any + Send + Sync>>;

    fn format_any(&self, value: &dyn Any) -> CqlResult<String>;

    fn parse_any(&self, text: &str) -> CqlResult<Box<dyn Any + Send + Sync>>;
}

struct Erased<C>(C);

impl<C: Codec> ErasedCodec for Erased<C> {
    fn wire_type(&self) -> WireType {
        self.0.wire_type()
    }

    fn value_type(&self) -> &'static str {
        type_name::<C::Value>()
    }

    fn accepts_type(&self, wire_type: &WireType) -> bool {
        self.0.accepts_type(wire_type)
    }

    fn accepts_value(&self, value: &dyn Any) -> bool {
        self.0.accepts_value(value)
    }

    fn encode_any(&self, value: &dyn Any) -> CqlResult<Option<Vec<u8>>> {
        self.0.encode_dyn(value)
    }

    fn decode_any(&self, bytes: Option<&[u8]>) -> CqlResult<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(self.0.decode(bytes)?))
    }

    fn format_any(&self, value: &dyn Any) -> CqlResult<String> {
        match value.downcast_ref::<C::Value>() {
            Some(v) => Ok(self.0.format(v)),
            None => Err(CqlError::illegal_value(
                self.0.wire_type(),
                "<erased>",
                format!("expected a {}", type_name::<C::Value>()),
            )),
        }
    }

    fn parse_any(&self, text: &str) -> CqlResult<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(self.0.parse(text)?))
    }
}

struct Registration {
    value_type: TypeId,
    erased: Arc<dyn ErasedCodec>,
    /// `Arc<dyn Codec<Value = T>>` for the codec's value type `T`.
    typed: Box<dyn Any + Send + Sync>,
}

/// Startup-time codec table; read-only once shared.
#[derive(Default)]
pub struct CodecRegistry {
    entries: Vec<Registration>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every scalar codec and its `OptionCodec` wrapper.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_nullable(BooleanCodec)
            .register_nullable(TinyintCodec)
            .register_nullable(SmallintCodec)
            .register_nullable(IntCodec)
            .register_nullable(BigintCodec)
            .register_nullable(CounterCodec)
            .register_nullable(FloatCodec)
            .register_nullable(DoubleCodec)
            .register_nullable(AsciiCodec)
            .register_nullable(TextCodec)
            .register_nullable(BlobCodec)
            .register_nullable(UuidCodec)
            .register_nullable(TimeuuidCodec)
            .register_nullable(TimestampCodec)
            .register_nullable(DateCodec)
            .register_nullable(TimeCodec)
            .register_nullable(VarintCodec)
            .register_nullable(decimal_codec())
            .register_nullable(InetCodec);
        registry
    }

    pub fn register<C: Codec + 'static>(&mut self, codec: C) -> &mut Self {
        let codec = Arc::new(codec);
        let typed: Arc<dyn Codec<Value = C::Value>> = codec.clone();
        tracing::trace!(
            "Registering codec {} <-> {}",
            codec.wire_type(),
            type_name::<C::Value>()
        );
        self.entries.push(Registration {
            value_type: TypeId::of::<C::Value>(),
            erased: Arc::new(Erased(codec)),
            typed: Box::new(typed),
        });
        self
    }

    /// Register `OptionCodec<C>`, then `C`.
    pub fn register_nullable<C: Codec + Clone + 'static>(&mut self, codec: C) -> &mut Self {
        self.register(OptionCodec::new(codec.clone()));
        self.register(codec)
    }

    /// Codec for values of `T` stored as `wire_type`.
    pub fn resolve<T: 'static>(&self, wire_type: &WireType) -> CqlResult<Arc<dyn Codec<Value = T>>> {
        let wanted = TypeId::of::<T>();
        let found = self
            .entries
            .iter()
            .rev()
            .filter(|r| r.value_type == wanted && r.erased.accepts_type(wire_type))
            .find_map(|r| r.typed.downcast_ref::<Arc<dyn Codec<Value = T>>>())
            .cloned();

        tracing::trace!(
            "Codec lookup {} / {}: {}",
            wire_type,
            type_name::<T>(),
            if found.is_some() { "hit" } else { "miss" }
        );
        found.ok_or_else(|| CqlError::CodecNotFound {
            wire_type: wire_type.to_string(),
            value_type: type_name::<T>().to_string(),
        })
    }

    /// Codec for `wire_type` that also accepts `sample`, when one is given.
    pub fn resolve_for(
        &self,
        wire_type: &WireType,
        sample: Option<&dyn Any>,
    ) -> CqlResult<Arc<dyn ErasedCodec>> {
        let found = self
            .entries
            .iter()
            .rev()
            .find(|r| {
                r.erased.accepts_type(wire_type)
                    && sample.is_none_or(|value| r.erased.accepts_value(value))
            })
            .map(|r| Arc::clone(&r.erased));

        tracing::trace!(
            "Codec lookup {} with{} sample: {}",
            wire_type,
            if sample.is_some() { "" } else { "out" },
            if found.is_some() { "hit" } else { "miss" }
        );
        found.ok_or_else(|| CqlError::CodecNotFound {
            wire_type: wire_type.to_string(),
            value_type: if sample.is_some() {
                "given sample".to_string()
            } else {
                "any value".to_string()
            },
        })
    }

    /// Codec accepting `sample`, whatever its wire type.
    pub fn resolve_value(&self, sample: &dyn Any) -> CqlResult<Arc<dyn ErasedCodec>> {
        self.entries
            .iter()
            .rev()
            .find(|r| r.erased.accepts_value(sample))
            .map(|r| Arc::clone(&r.erased))
            .ok_or_else(|| CqlError::CodecNotFound {
                wire_type: "any type".to_string(),
                value_type: "given sample".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|r| format!("{} <-> {}", r.erased.wire_type(), r.erased.value_type())),
            )
            .finish()
    }
}
