//! Paging across a simulated execution layer.

use pretty_assertions::assert_eq;
use qail_cql::prelude::*;

const QUERY: &str = "SELECT id FROM orders WHERE customer = ?";

/// In-memory stand-in for a CQL session. Its paging state is the big-endian
/// offset of the next row, as opaque to callers as a real driver's.
struct MockSession {
    rows: Vec<(i32, i32)>,
    page_size: usize,
}

impl MockSession {
    fn new(page_size: usize) -> Self {
        let rows = (0..25).map(|id| (id % 2, id)).collect();
        Self { rows, page_size }
    }

    fn execute(
        &self,
        customer: i32,
        paging_state: Option<&PagingState>,
    ) -> anyhow::Result<(Vec<i32>, Option<PagingState>)> {
        let start = match paging_state {
            Some(state) => {
                let bytes: [u8; 4] = state.as_bytes().try_into()?;
                u32::from_be_bytes(bytes) as usize
            }
            None => 0,
        };
        let matching: Vec<i32> = self
            .rows
            .iter()
            .filter(|(c, _)| *c == customer)
            .map(|(_, id)| *id)
            .collect();
        let end = (start + self.page_size).min(matching.len());
        let next = (end < matching.len()).then(|| PagingState::new((end as u32).to_be_bytes()));
        Ok((matching[start..end].to_vec(), next))
    }

    /// Fetch one page through the pager and record the returned state.
    fn fetch(&self, customer: i32, pager: &mut Pager) -> anyhow::Result<Vec<i32>> {
        let (rows, next) = self.execute(customer, pager.next_request()?)?;
        pager.record_page(next)?;
        Ok(rows)
    }
}

fn fingerprint(customer: i32) -> QueryFingerprint {
    QueryFingerprint::new(QUERY)
        .bind(&IntCodec, &customer)
        .unwrap()
}

#[test]
fn test_resume_continues_where_it_stopped() -> anyhow::Result<()> {
    let session = MockSession::new(4);
    let serializer = SafeSerializer::with_secret("test secret");

    // Uninterrupted run.
    let mut all = Vec::new();
    let mut pager = Pager::new(fingerprint(1));
    while !pager.is_exhausted() {
        all.extend(session.fetch(1, &mut pager)?);
    }
    assert_eq!(all, (0..25).filter(|id| id % 2 == 1).collect::<Vec<_>>());

    // Same run, handing the token to a fresh pager after every page.
    let mut resumed = Vec::new();
    let mut pager = Pager::new(fingerprint(1));
    loop {
        resumed.extend(session.fetch(1, &mut pager)?);
        match pager.export(&serializer)? {
            Some(token) => pager = Pager::resume(fingerprint(1), &token, &serializer)?,
            None => break,
        }
    }
    assert_eq!(resumed, all);
    assert!(matches!(
        pager.next_request(),
        Err(CqlError::PagingExhausted)
    ));
    Ok(())
}

#[test]
fn test_token_rejected_for_other_statement() -> anyhow::Result<()> {
    let session = MockSession::new(3);
    let serializer = SafeSerializer::new();

    let mut pager = Pager::new(fingerprint(0));
    session.fetch(0, &mut pager)?;
    let token = pager.export(&serializer)?.unwrap_or_default();

    let other_params = Pager::resume(fingerprint(1), &token, &serializer);
    assert!(matches!(
        other_params,
        Err(CqlError::StatementMismatch(FingerprintMismatch::Parameter { index: 0 }))
    ));

    let other_query = QueryFingerprint::new("SELECT id FROM returns WHERE customer = ?")
        .bind(&IntCodec, &0)?;
    assert!(matches!(
        Pager::resume(other_query, &token, &serializer),
        Err(CqlError::StatementMismatch(FingerprintMismatch::QueryText { .. }))
    ));

    let unbound = QueryFingerprint::new(QUERY);
    assert!(matches!(
        Pager::resume(unbound, &token, &serializer),
        Err(CqlError::StatementMismatch(FingerprintMismatch::ParameterCount { .. }))
    ));
    Ok(())
}

#[test]
fn test_tampered_token_is_corrupted_state() -> anyhow::Result<()> {
    let session = MockSession::new(3);
    let serializer = SafeSerializer::new();

    let mut pager = Pager::new(fingerprint(0));
    session.fetch(0, &mut pager)?;
    let cursor = pager.state().cursor().cloned().unwrap_or_else(|| PagingState::new(vec![]));
    let mut bytes = serializer.serialize(&cursor, pager.fingerprint())?;

    // Move the offset forward by flipping a byte of the embedded state.
    bytes[5] ^= 0x10;
    let err = serializer.deserialize(&bytes, &fingerprint(0)).unwrap_err();
    assert!(matches!(err, CqlError::CorruptedState(_)));
    Ok(())
}

#[test]
fn test_simple_serializer_trusts_any_token() -> anyhow::Result<()> {
    let session = MockSession::new(3);
    let serializer = SimpleSerializer;

    let mut pager = Pager::new(fingerprint(0));
    session.fetch(0, &mut pager)?;
    let token = pager.export(&serializer)?.unwrap_or_default();

    // Accepted for an unrelated statement; the execution layer sees the raw offset.
    let mut foreign = Pager::resume(fingerprint(1), &token, &serializer)?;
    let rows = session.fetch(1, &mut foreign)?;
    assert_eq!(rows, vec![7, 9, 11]);
    Ok(())
}

#[test]
fn test_config_selects_serializer() -> anyhow::Result<()> {
    let config = CqlConfig::from_toml_str("[paging]\nserializer = \"simple\"")?;
    let serializer = config.paging_serializer();

    let state = PagingState::new(vec![0, 0, 0, 3]);
    let token = serializer.serialize_to_string(&state, &fingerprint(0))?;
    assert_eq!(serializer.deserialize_str(&token, &fingerprint(1))?, state);

    let safe = CqlConfig::builder()
        .serializer(SerializerKind::Safe)
        .secret("k")
        .build()
        .paging_serializer();
    let token = safe.serialize_to_string(&state, &fingerprint(0))?;
    assert!(safe.deserialize_str(&token, &fingerprint(1)).is_err());
    Ok(())
}
