//! Resumable paging.
//!
//! The execution layer hands back a driver-native [`PagingState`] after each
//! page. A [`Pager`] tracks where a query is and exports that state as an opaque
//! token a caller can keep; resuming checks the token against the statement
//! that wants to continue.
//!
//! ```text
//! NoCursor --page--> HasCursor --page--> HasCursor ... --page--> Exhausted
//!     \----------------------last page-----------------------------^
//! ```

pub mod serializer;

pub use serializer::{PagingStateSerializer, SafeSerializer, SimpleSerializer};

use std::fmt;

use crate::codec::Codec;
use crate::error::{CqlError, CqlResult, FingerprintMismatch};

/// Opaque continuation token produced by the execution layer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PagingState(Vec<u8>);

impl PagingState {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for PagingState {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PagingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PagingState({} bytes)", self.0.len())
    }
}

/// Query text plus encoded bound values of one execution.
///
/// Two fingerprints are equal only when the text and every bound value match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint {
    query: String,
    values: Vec<Option<Vec<u8>>>,
}

impl QueryFingerprint {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(query: impl Into<String>, values: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            query: query.into(),
            values,
        }
    }

    /// Append a bound value, encoded with its codec.
    pub fn bind<C: Codec>(mut self, codec: &C, value: &C::Value) -> CqlResult<Self> {
        self.values.push(codec.encode(value)?);
        Ok(self)
    }

    /// Append an already-encoded bound value.
    pub fn bind_encoded(mut self, value: Option<Vec<u8>>) -> Self {
        self.values.push(value);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn values(&self) -> &[Option<Vec<u8>>] {
        &self.values
    }

    /// First difference between this (recorded) fingerprint and `actual`.
    pub fn mismatch(&self, actual: &QueryFingerprint) -> Option<FingerprintMismatch> {
        if self.query != actual.query {
            return Some(FingerprintMismatch::QueryText {
                expected: self.query.clone(),
                actual: actual.query.clone(),
            });
        }
        if self.values.len() != actual.values.len() {
            return Some(FingerprintMismatch::ParameterCount {
                expected: self.values.len(),
                actual: actual.values.len(),
            });
        }
        self.values
            .iter()
            .zip(&actual.values)
            .position(|(a, b)| a != b)
            .map(|index| FingerprintMismatch::Parameter { index })
    }
}

/// Position of a query in its result stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// No page fetched yet.
    NoCursor,
    /// More rows exist past this state.
    HasCursor(PagingState),
    /// The last page has been fetched.
    Exhausted,
}

impl PageState {
    /// State after fetching a page that returned `next`.
    pub fn advance(self, next: Option<PagingState>) -> CqlResult<PageState> {
        match self {
            PageState::Exhausted => Err(CqlError::PagingExhausted),
            PageState::NoCursor | PageState::HasCursor(_) => Ok(match next {
                Some(state) => PageState::HasCursor(state),
                None => PageState::Exhausted,
            }),
        }
    }

    pub fn cursor(&self) -> Option<&PagingState> {
        match self {
            PageState::HasCursor(state) => Some(state),
            _ => None,
        }
    }
}

/// Paging state machine for one statement.
#[derive(Debug, Clone)]
pub struct Pager {
    fingerprint: QueryFingerprint,
    state: PageState,
}

impl Pager {
    /// A fresh query.
    pub fn new(fingerprint: QueryFingerprint) -> Self {
        Self {
            fingerprint,
            state: PageState::NoCursor,
        }
    }

    /// Continue from a token exported by [`Pager::export`].
    pub fn resume(
        fingerprint: QueryFingerprint,
        token: &str,
        serializer: &dyn PagingStateSerializer,
    ) -> CqlResult<Self> {
        let cursor = serializer.deserialize_str(token, &fingerprint)?;
        Ok(Self {
            fingerprint,
            state: PageState::HasCursor(cursor),
        })
    }

    /// Record the state returned with the page just fetched.
    pub fn record_page(&mut self, next: Option<PagingState>) -> CqlResult<()> {
        let state = std::mem::replace(&mut self.state, PageState::Exhausted);
        match state.clone().advance(next) {
            Ok(advanced) => {
                self.state = advanced;
                Ok(())
            }
            Err(e) => {
                self.state = state;
                Err(e)
            }
        }
    }

    /// Token for the next page; `None` unless more rows exist.
    pub fn export(&self, serializer: &dyn PagingStateSerializer) -> CqlResult<Option<String>> {
        self.state
            .cursor()
            .map(|cursor| serializer.serialize_to_string(cursor, &self.fingerprint))
            .transpose()
    }

    /// State to send with the next request; `None` for the first page.
    pub fn next_request(&self) -> CqlResult<Option<&PagingState>> {
        match &self.state {
            PageState::NoCursor => Ok(None),
            PageState::HasCursor(state) => Ok(Some(state)),
            PageState::Exhausted => Err(CqlError::PagingExhausted),
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn fingerprint(&self) -> &QueryFingerprint {
        &self.fingerprint
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }
}
