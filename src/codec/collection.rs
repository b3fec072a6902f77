//! List, set and map codecs.
//!
//! One decode algorithm serves every target container: the container type is a
//! type parameter of the codec and supplies a [`ContainerBuilder`]. The `frozen`
//! flag only changes the reported [`WireType`].
//!
//! ```text
//! list<int> [1, NULL]  =>  00000002  00000004 00000001  FFFFFFFF
//! map<int, text>       =>  count, then (len key, len value) per entry
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use bytes::BytesMut;

use super::{
    expect_consumed, read_count, read_value, require, type_mismatch, write_count, write_value,
    Codec, CqlType,
};
use crate::error::{CqlError, CqlResult};
use crate::parser::{is_null_literal, split_elements, split_entries};
use crate::types::WireType;

// ==================== Containers ====================

/// Incremental construction of a decoded container.
pub trait ContainerBuilder<T> {
    type Output;

    fn push(&mut self, element: T);

    fn build(self) -> Self::Output;
}

/// A sequence-like or set-like container of `T`.
pub trait Container<T: 'static>: Sized + Send + Sync + 'static {
    type Builder: ContainerBuilder<T, Output = Self>;

    fn builder(capacity: usize) -> Self::Builder;

    fn size(&self) -> usize;

    fn elements(&self) -> impl Iterator<Item = &T>;
}

/// A map-like container of `K -> V`.
pub trait MapContainer<K: 'static, V: 'static>: Sized + Send + Sync + 'static {
    type Builder: ContainerBuilder<(K, V), Output = Self>;

    fn builder(capacity: usize) -> Self::Builder;

    fn size(&self) -> usize;

    fn entries(&self) -> impl Iterator<Item = (&K, &V)>;
}

impl<T> ContainerBuilder<T> for Vec<T> {
    type Output = Vec<T>;

    fn push(&mut self, element: T) {
        Vec::push(self, element);
    }

    fn build(self) -> Vec<T> {
        self
    }
}

impl<T: Send + Sync + 'static> Container<T> for Vec<T> {
    type Builder = Vec<T>;

    fn builder(capacity: usize) -> Vec<T> {
        Vec::with_capacity(capacity)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T> ContainerBuilder<T> for VecDeque<T> {
    type Output = VecDeque<T>;

    fn push(&mut self, element: T) {
        self.push_back(element);
    }

    fn build(self) -> VecDeque<T> {
        self
    }
}

impl<T: Send + Sync + 'static> Container<T> for VecDeque<T> {
    type Builder = VecDeque<T>;

    fn builder(capacity: usize) -> VecDeque<T> {
        VecDeque::with_capacity(capacity)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Ord> ContainerBuilder<T> for BTreeSet<T> {
    type Output = BTreeSet<T>;

    fn push(&mut self, element: T) {
        self.insert(element);
    }

    fn build(self) -> BTreeSet<T> {
        self
    }
}

impl<T: Ord + Send + Sync + 'static> Container<T> for BTreeSet<T> {
    type Builder = BTreeSet<T>;

    fn builder(_capacity: usize) -> BTreeSet<T> {
        BTreeSet::new()
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Eq + Hash, S: BuildHasher> ContainerBuilder<T> for HashSet<T, S> {
    type Output = HashSet<T, S>;

    fn push(&mut self, element: T) {
        self.insert(element);
    }

    fn build(self) -> HashSet<T, S> {
        self
    }
}

impl<T, S> Container<T> for HashSet<T, S>
where
    T: Eq + Hash + Send + Sync + 'static,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Builder = HashSet<T, S>;

    fn builder(capacity: usize) -> HashSet<T, S> {
        HashSet::with_capacity_and_hasher(capacity, S::default())
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> ContainerBuilder<(K, V)> for HashMap<K, V, S> {
    type Output = HashMap<K, V, S>;

    fn push(&mut self, (key, value): (K, V)) {
        self.insert(key, value);
    }

    fn build(self) -> HashMap<K, V, S> {
        self
    }
}

impl<K, V, S> MapContainer<K, V> for HashMap<K, V, S>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Builder = HashMap<K, V, S>;

    fn builder(capacity: usize) -> HashMap<K, V, S> {
        HashMap::with_capacity_and_hasher(capacity, S::default())
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

impl<K: Ord, V> ContainerBuilder<(K, V)> for BTreeMap<K, V> {
    type Output = BTreeMap<K, V>;

    fn push(&mut self, (key, value): (K, V)) {
        self.insert(key, value);
    }

    fn build(self) -> BTreeMap<K, V> {
        self
    }
}

impl<K, V> MapContainer<K, V> for BTreeMap<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Builder = BTreeMap<K, V>;

    fn builder(_capacity: usize) -> BTreeMap<K, V> {
        BTreeMap::new()
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

// ==================== Sorted Map ====================

/// A total order over keys, chosen at the type level.
pub trait KeyOrder<K>: Send + Sync + 'static {
    fn compare(a: &K, b: &K) -> Ordering;
}

/// The key type's own `Ord`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Natural;

impl<K: Ord> KeyOrder<K> for Natural {
    fn compare(a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// The inverse of another order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reversed<O = Natural>(PhantomData<fn() -> O>);

impl<K, O: KeyOrder<K>> KeyOrder<K> for Reversed<O> {
    fn compare(a: &K, b: &K) -> Ordering {
        O::compare(b, a)
    }
}

/// A map kept sorted by `O`; iteration and encoding follow that order.
pub struct SortedMap<K, V, O = Natural> {
    entries: Vec<(K, V)>,
    _order: PhantomData<fn() -> O>,
}

impl<K, V, O: KeyOrder<K>> SortedMap<K, V, O> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            _order: PhantomData,
        }
    }

    fn position(&self, key: &K) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| O::compare(k, key))
    }

    /// Insert, returning the previous value for an equal key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).ok().map(|i| &self.entries[i].1)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.position(key).ok().map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl<K, V, O: KeyOrder<K>> Default for SortedMap<K, V, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, O> Clone for SortedMap<K, V, O> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            _order: PhantomData,
        }
    }
}

impl<K: PartialEq, V: PartialEq, O> PartialEq for SortedMap<K, V, O> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for SortedMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K, V, O: KeyOrder<K>> FromIterator<(K, V)> for SortedMap<K, V, O> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V, O: KeyOrder<K>> ContainerBuilder<(K, V)> for SortedMap<K, V, O> {
    type Output = SortedMap<K, V, O>;

    fn push(&mut self, (key, value): (K, V)) {
        self.insert(key, value);
    }

    fn build(self) -> Self {
        self
    }
}

impl<K, V, O> MapContainer<K, V> for SortedMap<K, V, O>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: KeyOrder<K>,
{
    type Builder = SortedMap<K, V, O>;

    fn builder(capacity: usize) -> Self {
        Self::with_capacity(capacity)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

// ==================== Shared Framing ====================

/// Each element needs at least its 4-byte length, which bounds preallocation.
fn capacity_hint(count: usize, remaining: &[u8]) -> usize {
    count.min(remaining.len() / 4)
}

fn encode_elements<'a, C: Codec>(
    element: &C,
    wire: &WireType,
    count: usize,
    items: impl Iterator<Item = &'a C::Value>,
    allow_null: bool,
) -> CqlResult<Option<Vec<u8>>> {
    let mut buf = BytesMut::new();
    write_count(&mut buf, count)?;
    for item in items {
        let bytes = element.encode(item)?;
        if bytes.is_none() && !allow_null {
            return Err(CqlError::illegal_value(
                wire,
                element.format(item),
                "sets cannot contain null elements",
            ));
        }
        write_value(&mut buf, bytes.as_deref())?;
    }
    Ok(Some(buf.to_vec()))
}

fn decode_elements<C, B>(
    element: &C,
    wire: &WireType,
    bytes: Option<&[u8]>,
    allow_null: bool,
    builder: impl FnOnce(usize) -> B,
) -> CqlResult<B::Output>
where
    C: Codec,
    B: ContainerBuilder<C::Value>,
{
    let mut input = require(bytes, wire)?;
    if input.is_empty() {
        return Ok(builder(0).build());
    }
    let count = read_count(&mut input, wire)?;
    let mut out = builder(capacity_hint(count, input));
    for i in 0..count {
        let raw = read_value(&mut input, wire)?;
        if raw.is_none() && !allow_null {
            return Err(CqlError::decode(wire, format!("null element at index {}", i)));
        }
        out.push(element.decode(raw)?);
    }
    expect_consumed(input, wire)?;
    Ok(out.build())
}

fn format_elements<'a, C: Codec>(element: &C, items: impl Iterator<Item = &'a C::Value>) -> String {
    let parts: Vec<String> = items.map(|item| element.format(item)).collect();
    format!("{{{}}}", parts.join(","))
}

fn parse_elements<C, B>(
    element: &C,
    wire: &WireType,
    text: &str,
    allow_null: bool,
    builder: impl FnOnce(usize) -> B,
) -> CqlResult<B::Output>
where
    C: Codec,
    B: ContainerBuilder<C::Value>,
{
    let parts = split_elements(text, '{', '}')
        .map_err(|reason| CqlError::illegal_argument(wire, text, reason))?;
    let mut out = builder(parts.len());
    for part in parts {
        if !allow_null && is_null_literal(part) {
            return Err(CqlError::illegal_argument(
                wire,
                text,
                "sets cannot contain null elements",
            ));
        }
        out.push(element.parse(part)?);
    }
    Ok(out.build())
}

// ==================== List ====================

/// `list<T>` into any [`Container`]; null elements are allowed.
pub struct ListCodec<C: Codec, L = Vec<<C as Codec>::Value>> {
    element: C,
    frozen: bool,
    _container: PhantomData<fn() -> L>,
}

impl<C: Codec> ListCodec<C> {
    pub fn new(element: C) -> Self {
        Self::with_container(element)
    }
}

impl<C: Codec, L> ListCodec<C, L> {
    /// A list codec decoding into `L`.
    pub fn with_container(element: C) -> Self {
        Self {
            element,
            frozen: false,
            _container: PhantomData,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn element(&self) -> &C {
        &self.element
    }
}

impl<C: Codec, L: Container<C::Value>> Codec for ListCodec<C, L> {
    type Value = L;

    fn wire_type(&self) -> WireType {
        WireType::list(self.element.wire_type()).with_frozen(self.frozen)
    }

    fn encode(&self, value: &L) -> CqlResult<Option<Vec<u8>>> {
        encode_elements(&self.element, &self.wire_type(), value.size(), value.elements(), true)
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<L> {
        decode_elements(&self.element, &self.wire_type(), bytes, true, L::builder)
    }

    fn format(&self, value: &L) -> String {
        format_elements(&self.element, value.elements())
    }

    fn parse(&self, text: &str) -> CqlResult<L> {
        parse_elements(&self.element, &self.wire_type(), text, true, L::builder)
    }
}

impl<C: Codec + fmt::Debug, L> fmt::Debug for ListCodec<C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCodec")
            .field("element", &self.element)
            .field("frozen", &self.frozen)
            .finish()
    }
}

// ==================== Set ====================

/// `set<T>` into any [`Container`]; null elements are rejected both ways.
pub struct SetCodec<C: Codec, S = BTreeSet<<C as Codec>::Value>> {
    element: C,
    frozen: bool,
    _container: PhantomData<fn() -> S>,
}

impl<C: Codec> SetCodec<C> {
    pub fn new(element: C) -> Self {
        Self::with_container(element)
    }
}

impl<C: Codec, S> SetCodec<C, S> {
    /// A set codec decoding into `S`.
    pub fn with_container(element: C) -> Self {
        Self {
            element,
            frozen: false,
            _container: PhantomData,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn element(&self) -> &C {
        &self.element
    }
}

impl<C: Codec, S: Container<C::Value>> Codec for SetCodec<C, S> {
    type Value = S;

    fn wire_type(&self) -> WireType {
        WireType::set(self.element.wire_type()).with_frozen(self.frozen)
    }

    fn encode(&self, value: &S) -> CqlResult<Option<Vec<u8>>> {
        encode_elements(&self.element, &self.wire_type(), value.size(), value.elements(), false)
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<S> {
        decode_elements(&self.element, &self.wire_type(), bytes, false, S::builder)
    }

    fn format(&self, value: &S) -> String {
        format_elements(&self.element, value.elements())
    }

    fn parse(&self, text: &str) -> CqlResult<S> {
        parse_elements(&self.element, &self.wire_type(), text, false, S::builder)
    }
}

impl<C: Codec + fmt::Debug, S> fmt::Debug for SetCodec<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetCodec")
            .field("element", &self.element)
            .field("frozen", &self.frozen)
            .finish()
    }
}

// ==================== Map ====================

/// `map<K, V>` into any [`MapContainer`]. Keys may not be null; values may.
pub struct MapCodec<KC: Codec, VC: Codec, M = BTreeMap<<KC as Codec>::Value, <VC as Codec>::Value>>
{
    key: KC,
    value: VC,
    frozen: bool,
    _container: PhantomData<fn() -> M>,
}

/// A map codec whose encode order is the type-level key order `O`.
pub type SortedMapCodec<KC, VC, O = Natural> =
    MapCodec<KC, VC, SortedMap<<KC as Codec>::Value, <VC as Codec>::Value, O>>;

impl<KC: Codec, VC: Codec> MapCodec<KC, VC> {
    pub fn new(key: KC, value: VC) -> Self {
        Self::with_container(key, value)
    }
}

impl<KC: Codec, VC: Codec, O: KeyOrder<KC::Value>> SortedMapCodec<KC, VC, O> {
    pub fn sorted(key: KC, value: VC) -> Self {
        Self::with_container(key, value)
    }
}

impl<KC: Codec, VC: Codec, M> MapCodec<KC, VC, M> {
    /// A map codec decoding into `M`.
    pub fn with_container(key: KC, value: VC) -> Self {
        Self {
            key,
            value,
            frozen: false,
            _container: PhantomData,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }
}

impl<KC, VC, M> Codec for MapCodec<KC, VC, M>
where
    KC: Codec,
    VC: Codec,
    M: MapContainer<KC::Value, VC::Value>,
{
    type Value = M;

    fn wire_type(&self) -> WireType {
        WireType::map(self.key.wire_type(), self.value.wire_type()).with_frozen(self.frozen)
    }

    fn encode(&self, value: &M) -> CqlResult<Option<Vec<u8>>> {
        let mut buf = BytesMut::new();
        write_count(&mut buf, value.size())?;
        for (k, v) in value.entries() {
            let key = self.key.encode(k)?.ok_or_else(|| {
                CqlError::illegal_value(self.wire_type(), self.key.format(k), "map keys cannot be null")
            })?;
            write_value(&mut buf, Some(key.as_slice()))?;
            write_value(&mut buf, self.value.encode(v)?.as_deref())?;
        }
        Ok(Some(buf.to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> CqlResult<M> {
        let wire = self.wire_type();
        let mut input = require(bytes, &wire)?;
        if input.is_empty() {
            return Ok(M::builder(0).build());
        }
        let count = read_count(&mut input, &wire)?;
        let mut out = M::builder(count.min(input.len() / 8));
        for i in 0..count {
            let key = read_value(&mut input, &wire)?
                .ok_or_else(|| CqlError::decode(&wire, format!("null key at entry {}", i)))?;
            let value = read_value(&mut input, &wire)?;
            out.push((self.key.decode(Some(key))?, self.value.decode(value)?));
        }
        expect_consumed(input, &wire)?;
        Ok(out.build())
    }

    fn format(&self, value: &M) -> String {
        let parts: Vec<String> = value
            .entries()
            .map(|(k, v)| format!("{}:{}", self.key.format(k), self.value.format(v)))
            .collect();
        format!("{{{}}}", parts.join(","))
    }

    fn parse(&self, text: &str) -> CqlResult<M> {
        let wire = self.wire_type();
        let entries = split_entries(text, '{', '}')
            .map_err(|reason| CqlError::illegal_argument(&wire, text, reason))?;
        let mut out = M::builder(entries.len());
        for (k, v) in entries {
            if is_null_literal(k) {
                return Err(CqlError::illegal_argument(&wire, text, "map keys cannot be null"));
            }
            out.push((self.key.parse(k)?, self.value.parse(v)?));
        }
        Ok(out.build())
    }
}

impl<KC: Codec + fmt::Debug, VC: Codec + fmt::Debug, M> fmt::Debug for MapCodec<KC, VC, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapCodec")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("frozen", &self.frozen)
            .finish()
    }
}

// ==================== Default Codecs ====================

fn list_for<T: CqlType, L>(wire_type: &WireType) -> CqlResult<ListCodec<T::Codec, L>> {
    match wire_type {
        WireType::List { element, frozen } => Ok(ListCodec {
            element: T::codec_for(element)?,
            frozen: *frozen,
            _container: PhantomData,
        }),
        other => Err(type_mismatch::<L>(&WireType::list(T::codec().wire_type()), other)),
    }
}

fn set_for<T: CqlType, S>(wire_type: &WireType) -> CqlResult<SetCodec<T::Codec, S>> {
    match wire_type {
        WireType::Set { element, frozen } => Ok(SetCodec {
            element: T::codec_for(element)?,
            frozen: *frozen,
            _container: PhantomData,
        }),
        other => Err(type_mismatch::<S>(&WireType::set(T::codec().wire_type()), other)),
    }
}

fn map_for<K: CqlType, V: CqlType, M>(
    wire_type: &WireType,
) -> CqlResult<MapCodec<K::Codec, V::Codec, M>> {
    match wire_type {
        WireType::Map { key, value, frozen } => Ok(MapCodec {
            key: K::codec_for(key)?,
            value: V::codec_for(value)?,
            frozen: *frozen,
            _container: PhantomData,
        }),
        other => Err(type_mismatch::<M>(
            &WireType::map(K::codec().wire_type(), V::codec().wire_type()),
            other,
        )),
    }
}

impl<T: CqlType> CqlType for Vec<T> {
    type Codec = ListCodec<T::Codec, Vec<T>>;

    fn codec() -> Self::Codec {
        ListCodec::with_container(T::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        list_for::<T, Self>(wire_type)
    }
}

impl<T: CqlType> CqlType for VecDeque<T> {
    type Codec = ListCodec<T::Codec, VecDeque<T>>;

    fn codec() -> Self::Codec {
        ListCodec::with_container(T::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        list_for::<T, Self>(wire_type)
    }
}

impl<T: CqlType + Ord> CqlType for BTreeSet<T> {
    type Codec = SetCodec<T::Codec, BTreeSet<T>>;

    fn codec() -> Self::Codec {
        SetCodec::with_container(T::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        set_for::<T, Self>(wire_type)
    }
}

impl<T, S> CqlType for HashSet<T, S>
where
    T: CqlType + Eq + Hash,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Codec = SetCodec<T::Codec, HashSet<T, S>>;

    fn codec() -> Self::Codec {
        SetCodec::with_container(T::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        set_for::<T, Self>(wire_type)
    }
}

impl<K: CqlType + Ord, V: CqlType> CqlType for BTreeMap<K, V> {
    type Codec = MapCodec<K::Codec, V::Codec, BTreeMap<K, V>>;

    fn codec() -> Self::Codec {
        MapCodec::with_container(K::codec(), V::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        map_for::<K, V, Self>(wire_type)
    }
}

impl<K, V, S> CqlType for HashMap<K, V, S>
where
    K: CqlType + Eq + Hash,
    V: CqlType,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Codec = MapCodec<K::Codec, V::Codec, HashMap<K, V, S>>;

    fn codec() -> Self::Codec {
        MapCodec::with_container(K::codec(), V::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        map_for::<K, V, Self>(wire_type)
    }
}

impl<K: CqlType, V: CqlType, O: KeyOrder<K>> CqlType for SortedMap<K, V, O> {
    type Codec = MapCodec<K::Codec, V::Codec, SortedMap<K, V, O>>;

    fn codec() -> Self::Codec {
        MapCodec::with_container(K::codec(), V::codec())
    }

    fn codec_for(wire_type: &WireType) -> CqlResult<Self::Codec> {
        map_for::<K, V, Self>(wire_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{IntCodec, OptionCodec, TextCodec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_with_null_elements() {
        let codec = ListCodec::new(OptionCodec::new(IntCodec));
        let value = vec![Some(1), None];
        let bytes = codec.encode(&value).unwrap().unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(codec.decode(Some(&bytes)).unwrap(), value);
        assert_eq!(codec.format(&value), "{1,NULL}");
        assert_eq!(codec.parse("{ 1 , null }").unwrap(), value);
    }

    #[test]
    fn test_empty_is_not_null() {
        let codec = ListCodec::new(IntCodec);
        assert_eq!(codec.encode(&vec![]).unwrap(), Some(vec![0, 0, 0, 0]));
        assert_eq!(codec.decode(Some(&[0, 0, 0, 0])).unwrap(), Vec::<i32>::new());
        assert!(matches!(codec.decode(None), Err(CqlError::UnexpectedNull { .. })));

        let nullable = OptionCodec::new(ListCodec::new(IntCodec));
        assert_eq!(nullable.encode(&None).unwrap(), None);
        assert_eq!(nullable.format(&None), "NULL");
        assert_eq!(nullable.parse("Null").unwrap(), None);
        assert_eq!(nullable.parse("{}").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_list_into_other_container() {
        let codec: ListCodec<IntCodec, VecDeque<i32>> = ListCodec::with_container(IntCodec);
        let value: VecDeque<i32> = [3, 1, 2].into_iter().collect();
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(bytes, ListCodec::new(IntCodec).encode(&vec![3, 1, 2]).unwrap());
        assert_eq!(codec.decode(bytes.as_deref()).unwrap(), value);
    }

    #[test]
    fn test_set_rejects_null_element() {
        let codec: SetCodec<_, Vec<Option<i32>>> =
            SetCodec::with_container(OptionCodec::new(IntCodec));
        let err = codec.encode(&vec![Some(1), None]).unwrap_err();
        assert!(matches!(err, CqlError::IllegalValue { ref value, .. } if value == "NULL"));

        let wire = [0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(codec.decode(Some(&wire)), Err(CqlError::Decode { .. })));
        assert!(matches!(
            codec.parse("{1,NULL}"),
            Err(CqlError::IllegalArgument { .. })
        ));
    }

    #[test]
    fn test_frozen_changes_type_only() {
        let plain = SetCodec::new(IntCodec);
        let frozen = SetCodec::new(IntCodec).frozen();
        assert_eq!(frozen.wire_type().to_string(), "frozen<set<int>>");
        let value: BTreeSet<i32> = [1, 2].into_iter().collect();
        assert_eq!(plain.encode(&value).unwrap(), frozen.encode(&value).unwrap());
        assert!(frozen.accepts_type(&WireType::set(WireType::Int)));
    }

    #[test]
    fn test_map_roundtrip_and_format() {
        let codec = MapCodec::new(IntCodec, TextCodec);
        let value: BTreeMap<i32, String> =
            [(1, "a".to_string()), (2, "it's".to_string())].into_iter().collect();
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(bytes.as_deref()).unwrap(), value);
        assert_eq!(codec.format(&value), "{1:'a',2:'it''s'}");
        assert_eq!(codec.parse("{ 1 : 'a' , 2:'it''s' }").unwrap(), value);
        assert_eq!(codec.wire_type().to_string(), "map<int, text>");
    }

    #[test]
    fn test_map_rejects_null_key() {
        let codec: MapCodec<_, _, HashMap<Option<i32>, i32>> =
            MapCodec::with_container(OptionCodec::new(IntCodec), IntCodec);
        let value: HashMap<Option<i32>, i32> = [(None, 1)].into_iter().collect();
        assert!(matches!(
            codec.encode(&value),
            Err(CqlError::IllegalValue { .. })
        ));
    }

    #[test]
    fn test_sorted_map_encodes_in_key_order() {
        let codec = SortedMapCodec::<IntCodec, TextCodec, Reversed>::sorted(IntCodec, TextCodec);
        let mut value: SortedMap<i32, String, Reversed> = SortedMap::new();
        value.insert(1, "one".to_string());
        value.insert(3, "three".to_string());
        value.insert(2, "two".to_string());
        assert_eq!(value.keys().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(codec.format(&value), "{3:'three',2:'two',1:'one'}");

        let decoded = codec.decode(codec.encode(&value).unwrap().as_deref()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(value.insert(2, "deux".to_string()).as_deref(), Some("two"));
        assert_eq!(value.get(&2).map(String::as_str), Some("deux"));
    }

    #[test]
    fn test_parse_errors_carry_input() {
        let codec = ListCodec::new(IntCodec);
        for bad in ["{1,2", "1,2}", "{1,,2}", "NULL"] {
            match codec.parse(bad) {
                Err(CqlError::IllegalArgument { input, .. }) => assert_eq!(input, bad),
                other => panic!("expected IllegalArgument for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let codec = ListCodec::new(IntCodec);
        let wire = [0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 9, 0xAA];
        assert!(matches!(codec.decode(Some(&wire)), Err(CqlError::Decode { .. })));
    }

    #[test]
    fn test_cql_type_composes_nested_codecs() {
        let codec = <BTreeMap<String, Vec<Option<i64>>>>::codec();
        assert_eq!(codec.wire_type().to_string(), "map<text, list<bigint>>");
        let value: BTreeMap<String, Vec<Option<i64>>> =
            [("k".to_string(), vec![Some(1), None])].into_iter().collect();
        assert_eq!(codec.parse(&codec.format(&value)).unwrap(), value);
    }
}
