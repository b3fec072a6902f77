//! User-defined type codecs.
//!
//! A Rust struct declares its fields in one order; the live schema declares the
//! UDT's fields in another (after `ALTER TYPE ... ADD`, or a deliberately
//! reordered struct). The schema order is authoritative on the wire.
//!
//! - [`IdenticalOrderCodec`]: schema and struct agree position by position.
//! - [`ReorderedCodec`]: follows a permutation computed once at construction.
//! - [`UdtCodec`]: picks one of the two for a given schema.
//! - [`UdtCodecCache`]: one `UdtCodec` per schema version.
//!
//! Field codecs are built from the live field types, so a UDT nested in a field
//! or a collection follows its own live order too.
//!
//! The wire form is the concatenation of the schema's fields, each framed like a
//! collection element. Fields missing at the end of the bytes decode as NULL.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::BytesMut;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{read_value, type_mismatch, write_value, Codec, CqlType};
use crate::error::{CqlError, CqlResult};
use crate::parser::{split_entries, NULL_TOKEN};
use crate::types::{FieldDescriptor, SchemaVersion, UdtType, WireType};

/// A field codec with its concrete type erased; see [`FieldCodecs`].
pub type ErasedFieldCodec = Box<dyn Any + Send + Sync>;

/// A struct mapped to a user-defined type.
///
/// Implemented by `#[derive(CqlUdt)]`. Field indices are declaration indices.
pub trait UserType: Sized + Send + Sync + 'static {
    /// UDT name as declared in the schema.
    const TYPE_NAME: &'static str;

    /// Column names in declaration order, after renaming.
    const FIELD_NAMES: &'static [&'static str];

    fn field_types() -> Vec<WireType>;

    /// Whether each field has a NULL representation.
    fn field_nullability() -> Vec<bool>;

    /// The field's codec for a live column type, as `<F as CqlType>::Codec`.
    fn field_codec(index: usize, wire_type: &WireType) -> CqlResult<ErasedFieldCodec>;

    fn encode_field(&self, index: usize, codecs: &FieldCodecs) -> CqlResult<Option<Vec<u8>>>;

    fn format_field(&self, index: usize, codecs: &FieldCodecs) -> String;

    fn decode_fields(fields: &FieldValues<'_>) -> CqlResult<Self>;

    fn parse_fields(fields: &FieldLiterals<'_>) -> CqlResult<Self>;

    /// The UDT as the struct itself describes it.
    fn declared_type() -> UdtType {
        let fields = Self::FIELD_NAMES
            .iter()
            .zip(Self::field_types())
            .map(|(name, ty)| FieldDescriptor::new(*name, ty))
            .collect();
        UdtType::new(Self::TYPE_NAME, fields)
    }
}

/// Field codecs built against a live schema, by declaration index.
///
/// A slot is empty when the schema lacks the field or when no schema is known;
/// the field's default codec serves it then.
#[derive(Default)]
pub struct FieldCodecs(Vec<Option<ErasedFieldCodec>>);

impl FieldCodecs {
    pub fn get<T: CqlType>(&self, index: usize) -> Option<&T::Codec> {
        self.0.get(index)?.as_ref()?.downcast_ref::<T::Codec>()
    }
}

impl fmt::Debug for FieldCodecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodecs")
            .field("built", &self.0.iter().filter(|c| c.is_some()).count())
            .finish()
    }
}

/// Raw field bytes by declaration index; `None` is NULL or absent.
#[derive(Debug, Clone)]
pub struct FieldValues<'a> {
    values: Vec<Option<&'a [u8]>>,
    codecs: &'a FieldCodecs,
}

impl<'a> FieldValues<'a> {
    pub fn new(values: Vec<Option<&'a [u8]>>, codecs: &'a FieldCodecs) -> Self {
        Self { values, codecs }
    }

    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.values.get(index).copied().flatten()
    }

    pub fn codecs(&self) -> &'a FieldCodecs {
        self.codecs
    }
}

/// Field literals by declaration index; `None` when the literal omits the field.
#[derive(Debug, Clone)]
pub struct FieldLiterals<'a> {
    literals: Vec<Option<&'a str>>,
    codecs: &'a FieldCodecs,
}

impl<'a> FieldLiterals<'a> {
    pub fn new(literals: Vec<Option<&'a str>>, codecs: &'a FieldCodecs) -> Self {
        Self { literals, codecs }
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.literals.get(index).copied().flatten()
    }

    pub fn codecs(&self) -> &'a FieldCodecs {
        self.codecs
    }
}

// Called from derived code.

#[doc(hidden)]
pub fn field_type<T: CqlType>() -> WireType {
    T::codec().wire_type()
}

#[doc(hidden)]
pub fn field_codec<T: CqlType>(wire_type: &WireType) -> CqlResult<ErasedFieldCodec> {
    Ok(Box::new(T::codec_for(wire_type)?))
}

#[doc(hidden)]
pub fn encode_field<T: CqlType>(
    codecs: &FieldCodecs,
    index: usize,
    value: &T,
) -> CqlResult<Option<Vec<u8>>> {
    match codecs.get::<T>(index) {
        Some(codec) => codec.encode(value),
        None => T::codec().encode(value),
    }
}

#[doc(hidden)]
pub fn format_field<T: CqlType>(codecs: &FieldCodecs, index: usize, value: &T) -> String {
    match codecs.get::<T>(index) {
        Some(codec) => codec.format(value),
        None => T::codec().format(value),
    }
}

#[doc(hidden)]
pub fn decode_field<T: CqlType>(fields: &FieldValues<'_>, index: usize) -> CqlResult<T> {
    let bytes = fields.get(index);
    match fields.codecs().get::<T>(index) {
        Some(codec) => codec.decode(bytes),
        None => T::codec().decode(bytes),
    }
}

#[doc(hidden)]
pub fn parse_field<T: CqlType>(fields: &FieldLiterals<'_>, index: usize) -> CqlResult<T> {
    let literal = fields.get(index).unwrap_or(NULL_TOKEN);
    match fields.codecs().get::<T>(index) {
        Some(codec) => codec.parse(literal),
        None => T::codec().parse(literal),
    }
}

#[doc(hidden)]
pub fn field_out_of_range<T: UserType>(index: usize) -> CqlError {
    CqlError::illegal_value(
        T::TYPE_NAME,
        format!("field #{}", index),
        format!("{} declares {} fields", T::TYPE_NAME, T::FIELD_NAMES.len()),
    )
}

/// Codec of a derived UDT nested in another type, built for its live definition.
#[doc(hidden)]
pub fn udt_codec_for<T: UserType>(wire_type: &WireType) -> CqlResult<UdtCodec<T>> {
    match wire_type {
        WireType::Udt(udt) if udt.name == T::TYPE_NAME => UdtCodec::new(udt.clone()),
        other => Err(type_mismatch::<T>(&WireType::Udt(T::declared_type()), other)),
    }
}

// ==================== Shared Wire Logic ====================

fn encode_in_order<T: UserType>(
    value: &T,
    codecs: &FieldCodecs,
    order: impl Iterator<Item = usize>,
) -> CqlResult<Option<Vec<u8>>> {
    let mut buf = BytesMut::new();
    for declared in order {
        write_value(&mut buf, value.encode_field(declared, codecs)?.as_deref())?;
    }
    Ok(Some(buf.to_vec()))
}

/// Read schema-ordered fields into declaration slots.
fn decode_in_order<T: UserType>(
    wire: &WireType,
    codecs: &FieldCodecs,
    bytes: Option<&[u8]>,
    slot: impl Fn(usize) -> usize,
    field_count: usize,
) -> CqlResult<T> {
    let mut input = bytes.ok_or_else(|| CqlError::unexpected_null(wire))?;
    let mut values = vec![None; T::FIELD_NAMES.len()];
    for position in 0..field_count {
        if input.is_empty() {
            break;
        }
        values[slot(position)] = read_value(&mut input, wire)?;
    }
    if !input.is_empty() {
        return Err(CqlError::decode(
            wire,
            format!(
                "{} bytes left after {} schema fields",
                input.len(),
                field_count
            ),
        ));
    }
    T::decode_fields(&FieldValues::new(values, codecs))
}

fn format_in_order<T: UserType>(
    value: &T,
    codecs: &FieldCodecs,
    schema: &UdtType,
    slot: impl Fn(usize) -> usize,
) -> String {
    let parts: Vec<String> = schema
        .fields
        .iter()
        .enumerate()
        .map(|(position, field)| {
            format!("{}:{}", field.name, value.format_field(slot(position), codecs))
        })
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn parse_in_order<T: UserType>(
    wire: &WireType,
    codecs: &FieldCodecs,
    schema: &UdtType,
    text: &str,
    slot: impl Fn(usize) -> usize,
) -> CqlResult<T> {
    let entries = split_entries(text, '{', '}')
        .map_err(|reason| CqlError::illegal_argument(wire, text, reason))?;
    let mut literals = vec![None; T::FIELD_NAMES.len()];
    for (name, literal) in entries {
        let (position, _) = schema.field(name).ok_or_else(|| {
            CqlError::illegal_argument(wire, text, format!("unknown field '{}'", name))
        })?;
        literals[slot(position)] = Some(literal);
    }
    T::parse_fields(&FieldLiterals::new(literals, codecs))
}

/// True when the schema lists exactly the struct's field names, in the same order.
fn is_declared_order<T: UserType>(schema: &UdtType) -> bool {
    schema.fields.len() == T::FIELD_NAMES.len()
        && schema
            .fields
            .iter()
            .zip(T::FIELD_NAMES)
            .all(|(field, name)| field.name == *name)
}

/// Declaration index of every schema field.
fn declared_indices<T: UserType>(schema: &UdtType) -> CqlResult<Vec<usize>> {
    schema
        .fields
        .iter()
        .map(|field| {
            T::FIELD_NAMES
                .iter()
                .position(|name| *name == field.name)
                .ok_or_else(|| {
                    CqlError::schema_mismatch(
                        schema.qualified_name(),
                        format!(
                            "schema field '{}' has no counterpart in {}",
                            field.name,
                            T::TYPE_NAME
                        ),
                    )
                })
        })
        .collect()
}

/// Build each field's codec from its live type.
fn build_field_codecs<T: UserType>(
    schema: &UdtType,
    schema_to_declared: &[usize],
) -> CqlResult<FieldCodecs> {
    let mut codecs: Vec<Option<ErasedFieldCodec>> =
        std::iter::repeat_with(|| None).take(T::FIELD_NAMES.len()).collect();
    for (field, &declared) in schema.fields.iter().zip(schema_to_declared) {
        let codec = T::field_codec(declared, &field.wire_type).map_err(|e| {
            CqlError::schema_mismatch(
                schema.qualified_name(),
                format!(
                    "field '{}' is {} in the schema, which {} cannot map: {}",
                    field.name,
                    field.wire_type,
                    T::TYPE_NAME,
                    e
                ),
            )
        })?;
        codecs[declared] = Some(codec);
    }
    Ok(FieldCodecs(codecs))
}

// ==================== Identical Order ====================

/// Encodes fields positionally; valid only when the schema matches the declaration.
pub struct IdenticalOrderCodec<T> {
    schema: UdtType,
    wire: WireType,
    codecs: FieldCodecs,
    _type: PhantomData<fn() -> T>,
}

impl<T: UserType> IdenticalOrderCodec<T> {
    pub fn new(schema: UdtType) -> CqlResult<Self> {
        if !is_declared_order::<T>(&schema) {
            return Err(CqlError::schema_mismatch(
                schema.qualified_name(),
                format!(
                    "field order differs from {} declaration ({})",
                    T::TYPE_NAME,
                    T::FIELD_NAMES.join(", ")
                ),
            ));
        }
        let identity: Vec<usize> = (0..schema.fields.len()).collect();
        let codecs = build_field_codecs::<T>(&schema, &identity)?;
        Ok(Self::with_codecs(schema, codecs))
    }

    fn with_codecs(schema: UdtType, codecs: FieldCodecs) -> Self {
        Self {
            wire: WireType::Udt(schema.clone()),
            schema,
            codecs,
            _type: PhantomData,
        }
    }

    pub fn schema(&self) -> &UdtType {
        &self.schema
    }
}

impl<T: UserType> Codec for IdenticalOrderCodec<T> {
    type Value = T;

    fn wire_type(&self) -> WireType {
        self.wire.clone()
    }

    fn encode(&self, value: &T) -> CqlResult<Option<Vec<u8>>> {
        encode_in_order(value, &self.codecs, 0..self.schema.fields.len())
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<T> {
        decode_in_order(&self.wire, &self.codecs, bytes, |p| p, self.schema.fields.len())
    }

    fn format(&self, value: &T) -> String {
        format_in_order(value, &self.codecs, &self.schema, |p| p)
    }

    fn parse(&self, text: &str) -> CqlResult<T> {
        parse_in_order(&self.wire, &self.codecs, &self.schema, text, |p| p)
    }
}

// ==================== Reordered ====================

/// Encodes fields through a schema-to-declaration permutation.
pub struct ReorderedCodec<T> {
    schema: UdtType,
    wire: WireType,
    codecs: FieldCodecs,
    /// Declaration index for each schema position.
    schema_to_declared: Vec<usize>,
    /// Schema position for each declared field; `None` when the schema lacks it.
    declared_to_schema: Vec<Option<usize>>,
    _type: PhantomData<fn() -> T>,
}

impl<T: UserType> ReorderedCodec<T> {
    pub fn new(schema: UdtType) -> CqlResult<Self> {
        let schema_to_declared = declared_indices::<T>(&schema)?;
        let codecs = build_field_codecs::<T>(&schema, &schema_to_declared)?;

        let mut declared_to_schema = vec![None; T::FIELD_NAMES.len()];
        for (position, &declared) in schema_to_declared.iter().enumerate() {
            declared_to_schema[declared] = Some(position);
        }

        let nullable = T::field_nullability();
        for (declared, position) in declared_to_schema.iter().enumerate() {
            if position.is_none() && !nullable[declared] {
                return Err(CqlError::schema_mismatch(
                    schema.qualified_name(),
                    format!(
                        "non-optional field '{}' of {} is missing from the schema",
                        T::FIELD_NAMES[declared],
                        T::TYPE_NAME
                    ),
                ));
            }
        }

        Ok(Self {
            wire: WireType::Udt(schema.clone()),
            schema,
            codecs,
            schema_to_declared,
            declared_to_schema,
            _type: PhantomData,
        })
    }

    pub fn schema(&self) -> &UdtType {
        &self.schema
    }

    /// Schema position of a declared field, if the schema has it.
    pub fn schema_position(&self, declared: usize) -> Option<usize> {
        self.declared_to_schema.get(declared).copied().flatten()
    }
}

impl<T: UserType> Codec for ReorderedCodec<T> {
    type Value = T;

    fn wire_type(&self) -> WireType {
        self.wire.clone()
    }

    fn encode(&self, value: &T) -> CqlResult<Option<Vec<u8>>> {
        encode_in_order(value, &self.codecs, self.schema_to_declared.iter().copied())
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<T> {
        decode_in_order(
            &self.wire,
            &self.codecs,
            bytes,
            |p| self.schema_to_declared[p],
            self.schema_to_declared.len(),
        )
    }

    fn format(&self, value: &T) -> String {
        format_in_order(value, &self.codecs, &self.schema, |p| self.schema_to_declared[p])
    }

    fn parse(&self, text: &str) -> CqlResult<T> {
        parse_in_order(&self.wire, &self.codecs, &self.schema, text, |p| {
            self.schema_to_declared[p]
        })
    }
}

// ==================== Unified ====================

enum Strategy<T> {
    Identical(IdenticalOrderCodec<T>),
    Reordered(ReorderedCodec<T>),
}

/// UDT codec for one schema version, choosing its strategy at construction.
pub struct UdtCodec<T> {
    strategy: Strategy<T>,
}

impl<T: UserType> UdtCodec<T> {
    /// Build against the live schema. Fails with `SchemaMismatch` when the schema
    /// and the struct cannot be reconciled.
    pub fn new(schema: UdtType) -> CqlResult<Self> {
        let name = schema.qualified_name();
        let strategy = if is_declared_order::<T>(&schema) {
            IdenticalOrderCodec::new(schema).map(Strategy::Identical)
        } else {
            ReorderedCodec::new(schema).map(Strategy::Reordered)
        };
        match strategy {
            Ok(strategy) => {
                if matches!(strategy, Strategy::Identical(_)) {
                    tracing::debug!("UDT {} matches {} declaration order", name, T::TYPE_NAME);
                } else {
                    tracing::debug!(
                        "UDT {} differs from {} declaration order, using field permutation",
                        name,
                        T::TYPE_NAME
                    );
                }
                Ok(Self { strategy })
            }
            Err(e) => {
                tracing::warn!("Cannot map UDT {} to {}: {}", name, T::TYPE_NAME, e);
                Err(e)
            }
        }
    }

    /// Codec for the struct's own declaration, used when no live schema is known.
    pub fn declared() -> Self {
        Self {
            strategy: Strategy::Identical(IdenticalOrderCodec::with_codecs(
                T::declared_type(),
                FieldCodecs::default(),
            )),
        }
    }

    pub fn schema(&self) -> &UdtType {
        match &self.strategy {
            Strategy::Identical(codec) => codec.schema(),
            Strategy::Reordered(codec) => codec.schema(),
        }
    }

    pub fn is_identical_order(&self) -> bool {
        matches!(self.strategy, Strategy::Identical(_))
    }
}

impl<T: UserType> Codec for UdtCodec<T> {
    type Value = T;

    fn wire_type(&self) -> WireType {
        match &self.strategy {
            Strategy::Identical(codec) => codec.wire_type(),
            Strategy::Reordered(codec) => codec.wire_type(),
        }
    }

    fn encode(&self, value: &T) -> CqlResult<Option<Vec<u8>>> {
        match &self.strategy {
            Strategy::Identical(codec) => codec.encode(value),
            Strategy::Reordered(codec) => codec.encode(value),
        }
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<T> {
        match &self.strategy {
            Strategy::Identical(codec) => codec.decode(bytes),
            Strategy::Reordered(codec) => codec.decode(bytes),
        }
    }

    fn format(&self, value: &T) -> String {
        match &self.strategy {
            Strategy::Identical(codec) => codec.format(value),
            Strategy::Reordered(codec) => codec.format(value),
        }
    }

    fn parse(&self, text: &str) -> CqlResult<T> {
        match &self.strategy {
            Strategy::Identical(codec) => codec.parse(text),
            Strategy::Reordered(codec) => codec.parse(text),
        }
    }
}

// ==================== Cache ====================

/// One [`UdtCodec`] per schema version.
///
/// Concurrent first uses of a version build the codec once; later lookups share it.
pub struct UdtCodecCache<T> {
    codecs: DashMap<SchemaVersion, Arc<UdtCodec<T>>>,
}

impl<T: UserType> UdtCodecCache<T> {
    pub fn new() -> Self {
        Self {
            codecs: DashMap::new(),
        }
    }

    pub fn codec_for(&self, schema: &UdtType) -> CqlResult<Arc<UdtCodec<T>>> {
        let version = schema.version();
        if let Some(codec) = self.codecs.get(&version) {
            return Ok(Arc::clone(codec.value()));
        }
        match self.codecs.entry(version) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let codec = Arc::new(UdtCodec::new(schema.clone())?);
                entry.insert(Arc::clone(&codec));
                Ok(codec)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl<T: UserType> Default for UdtCodecCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
