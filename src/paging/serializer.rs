//! Paging state serializers.
//!
//! [`SafeSerializer`] (the default) binds the state to its query fingerprint and
//! signs the result:
//!
//! ```text
//! u8   version (1)
//! i32  state length,  state bytes
//! i32  query length,  query UTF-8
//! i32  value count,   per value: i32 length (-1 = NULL), bytes
//! [32] HMAC-SHA256 over everything above
//! ```
//!
//! [`SimpleSerializer`] passes the raw state through. It cannot tell a token from
//! another query of the same shape apart from a genuine one.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bytes::{Buf, BufMut, BytesMut};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{PagingState, QueryFingerprint};
use crate::codec::{write_count, write_value, NULL_LENGTH};
use crate::error::{CqlError, CqlResult};

type HmacSha256 = Hmac<Sha256>;

const ENVELOPE_VERSION: u8 = 1;
const TAG_LEN: usize = 32;

/// Key used when no secret is configured.
const BUILTIN_KEY: &[u8] = b"qail-cql paging-state v1";

/// Converts paging state to a transportable form and back.
pub trait PagingStateSerializer: Send + Sync {
    fn serialize(&self, state: &PagingState, fingerprint: &QueryFingerprint) -> CqlResult<Vec<u8>>;

    /// Recover the state for the statement identified by `fingerprint`.
    fn deserialize(&self, bytes: &[u8], fingerprint: &QueryFingerprint) -> CqlResult<PagingState>;

    /// URL-safe base64 of [`PagingStateSerializer::serialize`].
    fn serialize_to_string(
        &self,
        state: &PagingState,
        fingerprint: &QueryFingerprint,
    ) -> CqlResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.serialize(state, fingerprint)?))
    }

    fn deserialize_str(&self, text: &str, fingerprint: &QueryFingerprint) -> CqlResult<PagingState> {
        let bytes = URL_SAFE_NO_PAD
            .decode(text.trim())
            .map_err(|e| CqlError::CorruptedState(format!("invalid base64: {}", e)))?;
        self.deserialize(&bytes, fingerprint)
    }
}

// ==================== Simple ====================

/// Raw paging state, without integrity or statement checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSerializer;

impl PagingStateSerializer for SimpleSerializer {
    fn serialize(&self, state: &PagingState, _fingerprint: &QueryFingerprint) -> CqlResult<Vec<u8>> {
        Ok(state.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8], _fingerprint: &QueryFingerprint) -> CqlResult<PagingState> {
        if bytes.is_empty() {
            return Err(CqlError::CorruptedState("empty paging state".to_string()));
        }
        Ok(PagingState::new(bytes))
    }
}

// ==================== Safe ====================

/// Signed envelope of paging state and query fingerprint.
#[derive(Clone)]
pub struct SafeSerializer {
    key: Vec<u8>,
}

impl SafeSerializer {
    /// Signs with the built-in key.
    pub fn new() -> Self {
        Self::with_secret(BUILTIN_KEY)
    }

    pub fn with_secret(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> CqlResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CqlError::Config(format!("invalid paging secret: {}", e)))
    }
}

impl Default for SafeSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SafeSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeSerializer").finish_non_exhaustive()
    }
}

impl PagingStateSerializer for SafeSerializer {
    fn serialize(&self, state: &PagingState, fingerprint: &QueryFingerprint) -> CqlResult<Vec<u8>> {
        let mut buf = BytesMut::new();
        buf.put_u8(ENVELOPE_VERSION);
        write_value(&mut buf, Some(state.as_bytes()))?;
        write_value(&mut buf, Some(fingerprint.query().as_bytes()))?;
        write_count(&mut buf, fingerprint.values().len())?;
        for value in fingerprint.values() {
            write_value(&mut buf, value.as_deref())?;
        }

        let mut mac = self.mac()?;
        mac.update(&buf);
        buf.put_slice(&mac.finalize().into_bytes());
        Ok(buf.to_vec())
    }

    fn deserialize(&self, bytes: &[u8], fingerprint: &QueryFingerprint) -> CqlResult<PagingState> {
        if bytes.len() < 1 + TAG_LEN {
            return Err(CqlError::CorruptedState(format!(
                "{} bytes is too short for a signed paging state",
                bytes.len()
            )));
        }
        let (body, tag) = bytes.split_at(bytes.len() - TAG_LEN);
        let mut mac = self.mac()?;
        mac.update(body);
        if mac.verify_slice(tag).is_err() {
            tracing::debug!("Rejected paging state: integrity check failed");
            return Err(CqlError::CorruptedState("integrity check failed".to_string()));
        }

        let (state, recorded) = read_envelope(body)?;
        if let Some(mismatch) = recorded.mismatch(fingerprint) {
            tracing::debug!("Rejected paging state: {}", mismatch);
            return Err(CqlError::StatementMismatch(mismatch));
        }
        Ok(state)
    }
}

fn read_envelope(mut body: &[u8]) -> CqlResult<(PagingState, QueryFingerprint)> {
    if body.get_u8() != ENVELOPE_VERSION {
        return Err(CqlError::CorruptedState("unknown envelope version".to_string()));
    }
    let state = read_field(&mut body)?
        .ok_or_else(|| CqlError::CorruptedState("missing paging state".to_string()))?;
    let query = read_field(&mut body)?
        .ok_or_else(|| CqlError::CorruptedState("missing query text".to_string()))?;
    let query = String::from_utf8(query)
        .map_err(|_| CqlError::CorruptedState("query text is not UTF-8".to_string()))?;

    let count = read_i32(&mut body)?;
    let count = usize::try_from(count)
        .map_err(|_| CqlError::CorruptedState(format!("negative value count {}", count)))?;
    let mut values = Vec::with_capacity(count.min(body.len() / 4));
    for _ in 0..count {
        values.push(read_field(&mut body)?);
    }
    if !body.is_empty() {
        return Err(CqlError::CorruptedState(format!("{} trailing bytes", body.len())));
    }
    Ok((PagingState::new(state), QueryFingerprint::with_values(query, values)))
}

fn read_i32(body: &mut &[u8]) -> CqlResult<i32> {
    if body.remaining() < 4 {
        return Err(CqlError::CorruptedState("truncated envelope".to_string()));
    }
    Ok(body.get_i32())
}

fn read_field(body: &mut &[u8]) -> CqlResult<Option<Vec<u8>>> {
    let len = read_i32(body)?;
    if len == NULL_LENGTH {
        return Ok(None);
    }
    let len = usize::try_from(len)
        .map_err(|_| CqlError::CorruptedState(format!("invalid length {}", len)))?;
    if body.remaining() < len {
        return Err(CqlError::CorruptedState("truncated envelope".to_string()));
    }
    let field = body[..len].to_vec();
    body.advance(len);
    Ok(Some(field))
}
