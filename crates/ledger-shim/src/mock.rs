//! In-memory ledger host
//!
//! `MockStub` keeps committed state in a `BTreeMap` and stages writes in a
//! per-transaction write set, mirroring a peer: reads never observe the
//! current transaction's writes, and a rolled-back transaction leaves no
//! trace. Open query cursors are counted so tests can assert that every
//! cursor was closed.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StubError, StubResult};
use crate::rich_query::RichQuery;
use crate::stub::{ChaincodeStub, ClientIdentity, QueryResponseMetadata, StateQueryIterator, KV};

/// Write set of one transaction; `None` marks a delete
pub type WriteSet = BTreeMap<String, Option<Vec<u8>>>;

#[derive(Clone, Debug)]
struct PendingTransaction {
    tx_id: String,
    timestamp: DateTime<Utc>,
    writes: WriteSet,
}

/// A transaction that reached the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedTransaction {
    pub tx_id: String,
    pub writes: WriteSet,
}

#[derive(Debug)]
pub struct MockStub {
    channel: String,
    state: BTreeMap<String, Vec<u8>>,
    pending: Option<PendingTransaction>,
    committed: Vec<CommittedTransaction>,
    open_cursors: Rc<Cell<usize>>,
}

impl MockStub {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: BTreeMap::new(),
            pending: None,
            committed: Vec::new(),
            open_cursors: Rc::new(Cell::new(0)),
        }
    }

    /// Derive a transaction id the way a peer does: hex(sha256(nonce || creator))
    pub fn derive_tx_id(nonce: &[u8], creator: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(creator);
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }

    pub fn begin_transaction(
        &mut self,
        tx_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> StubResult<()> {
        if let Some(pending) = &self.pending {
            return Err(StubError::TransactionInProgress(pending.tx_id.clone()));
        }
        let tx_id = tx_id.into();
        debug!(channel = %self.channel, tx_id = %tx_id, "begin transaction");
        self.pending = Some(PendingTransaction {
            tx_id,
            timestamp,
            writes: WriteSet::new(),
        });
        Ok(())
    }

    /// Apply the pending write set to world state
    pub fn commit(&mut self) -> StubResult<CommittedTransaction> {
        let pending = self.pending.take().ok_or(StubError::NoTransaction)?;
        for (key, write) in &pending.writes {
            match write {
                Some(value) => {
                    self.state.insert(key.clone(), value.clone());
                }
                None => {
                    self.state.remove(key);
                }
            }
        }
        debug!(tx_id = %pending.tx_id, writes = pending.writes.len(), "commit transaction");
        let committed = CommittedTransaction {
            tx_id: pending.tx_id,
            writes: pending.writes,
        };
        self.committed.push(committed.clone());
        Ok(committed)
    }

    /// Discard the pending write set
    pub fn rollback(&mut self) -> StubResult<()> {
        let pending = self.pending.take().ok_or(StubError::NoTransaction)?;
        debug!(tx_id = %pending.tx_id, "rollback transaction");
        Ok(())
    }

    /// Write directly to committed state, bypassing transactions
    pub fn seed_state(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.state.insert(key.into(), value.into());
    }

    /// Committed value for a key
    pub fn committed_state(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    pub fn committed_transactions(&self) -> &[CommittedTransaction] {
        &self.committed
    }

    /// Cursors handed out and not yet closed
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.get()
    }

    fn pending_mut(&mut self) -> StubResult<&mut PendingTransaction> {
        self.pending.as_mut().ok_or(StubError::NoTransaction)
    }

    fn run_query(&self, query: &RichQuery) -> StubResult<Vec<KV>> {
        let mut matched: Vec<(&String, &Vec<u8>, Value)> = Vec::new();
        for (key, value) in &self.state {
            // Only JSON objects are indexed by the state database
            let document: Value = match serde_json::from_slice(value) {
                Ok(document @ Value::Object(_)) => document,
                _ => continue,
            };
            if query.matches(&document)? {
                matched.push((key, value, document));
            }
        }

        matched.sort_by(|a, b| query.compare((a.0.as_str(), &a.2), (b.0.as_str(), &b.2)));

        Ok(matched
            .into_iter()
            .map(|(key, value, _)| KV {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn open_cursor(&self, items: Vec<KV>) -> MockQueryIterator {
        self.open_cursors.set(self.open_cursors.get() + 1);
        MockQueryIterator {
            items: items.into_iter(),
            open_cursors: Rc::clone(&self.open_cursors),
            closed: false,
        }
    }
}

impl ChaincodeStub for MockStub {
    fn tx_id(&self) -> &str {
        self.pending
            .as_ref()
            .map_or("", |pending| pending.tx_id.as_str())
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.pending
            .as_ref()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |pending| pending.timestamp)
    }

    fn get_state(&self, key: &str) -> StubResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(StubError::EmptyKey);
        }
        Ok(self.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> StubResult<()> {
        if key.is_empty() {
            return Err(StubError::EmptyKey);
        }
        self.pending_mut()?
            .writes
            .insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> StubResult<()> {
        if key.is_empty() {
            return Err(StubError::EmptyKey);
        }
        self.pending_mut()?.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn get_query_result<'a>(
        &'a self,
        query: &str,
    ) -> StubResult<Box<dyn StateQueryIterator + 'a>> {
        let parsed = RichQuery::parse(query)?;
        let mut items = self.run_query(&parsed)?;
        if let Some(limit) = parsed.limit() {
            items.truncate(limit);
        }
        Ok(Box::new(self.open_cursor(items)))
    }

    fn get_query_result_with_pagination<'a>(
        &'a self,
        query: &str,
        page_size: i32,
        bookmark: &str,
    ) -> StubResult<(Box<dyn StateQueryIterator + 'a>, QueryResponseMetadata)> {
        if page_size <= 0 {
            return Err(StubError::InvalidQuery(format!(
                "page size must be positive, got {}",
                page_size
            )));
        }

        // The page size replaces any limit in the query document
        let parsed = RichQuery::parse(query)?;
        let items = self.run_query(&parsed)?;

        let start = if bookmark.is_empty() {
            0
        } else {
            items
                .iter()
                .position(|kv| kv.key == bookmark)
                .map(|index| index + 1)
                .ok_or_else(|| StubError::InvalidBookmark(bookmark.to_string()))?
        };

        let page: Vec<KV> = items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        let metadata = QueryResponseMetadata {
            fetched_records_count: page.len() as i32,
            bookmark: page.last().map(|kv| kv.key.clone()).unwrap_or_default(),
        };

        Ok((Box::new(self.open_cursor(page)), metadata))
    }
}

#[derive(Debug)]
struct MockQueryIterator {
    items: std::vec::IntoIter<KV>,
    open_cursors: Rc<Cell<usize>>,
    closed: bool,
}

impl Iterator for MockQueryIterator {
    type Item = StubResult<KV>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return Some(Err(StubError::Iterator("cursor already closed".to_string())));
        }
        self.items.next().map(Ok)
    }
}

impl StateQueryIterator for MockQueryIterator {
    fn close(&mut self) -> StubResult<()> {
        if !self.closed {
            self.closed = true;
            self.open_cursors.set(self.open_cursors.get().saturating_sub(1));
        }
        Ok(())
    }
}

/// Caller credential with a fixed subject and attribute set
#[derive(Clone, Debug)]
pub struct MockIdentity {
    id: String,
    msp_id: String,
    attributes: BTreeMap<String, String>,
}

impl MockIdentity {
    /// Identity whose certificate subject CN is `common_name`
    pub fn new(common_name: &str, msp_id: &str) -> Self {
        let org = msp_id.trim_end_matches("MSP").to_lowercase();
        let raw = format!(
            "x509::CN={},OU=client,O=Hyperledger,ST=North Carolina,C=US::CN=ca.{}.example.com,O={}.example.com,L=Durham,ST=North Carolina,C=US",
            common_name, org, org
        );
        Self::from_raw_id(STANDARD.encode(raw.as_bytes()), msp_id)
    }

    /// Identity with an arbitrary (possibly malformed) id blob
    pub fn from_raw_id(id: impl Into<String>, msp_id: &str) -> Self {
        Self {
            id: id.into(),
            msp_id: msp_id.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

impl ClientIdentity for MockIdentity {
    fn get_id(&self) -> StubResult<String> {
        Ok(self.id.clone())
    }

    fn get_msp_id(&self) -> StubResult<String> {
        Ok(self.msp_id.clone())
    }

    fn get_attribute_value(&self, name: &str) -> StubResult<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }
}
