//! Host contracts
//!
//! Every call runs inside exactly one transaction. Reads observe the
//! committed world state; writes become visible only after the host
//! commits the transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::composite_key;
use crate::error::StubResult;

/// A key/value pair yielded by a state query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KV {
    pub key: String,
    pub value: Vec<u8>,
}

/// Paging metadata returned alongside a paginated query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponseMetadata {
    pub fetched_records_count: i32,
    pub bookmark: String,
}

/// Cursor over query results.
///
/// Hosts may hold resources for an open cursor; callers must `close` it
/// on every path, including early returns.
pub trait StateQueryIterator: Iterator<Item = StubResult<KV>> {
    fn close(&mut self) -> StubResult<()>;
}

/// Deterministic world-state access for a single transaction
pub trait ChaincodeStub {
    /// Unique id of the current transaction
    fn tx_id(&self) -> &str;

    /// Timestamp fixed by the transaction proposal (identical on every peer)
    fn tx_timestamp(&self) -> DateTime<Utc>;

    fn get_state(&self, key: &str) -> StubResult<Option<Vec<u8>>>;

    fn put_state(&mut self, key: &str, value: &[u8]) -> StubResult<()>;

    fn del_state(&mut self, key: &str) -> StubResult<()>;

    fn create_composite_key(&self, object_type: &str, attributes: &[&str]) -> StubResult<String> {
        composite_key::create_composite_key(object_type, attributes)
    }

    /// Run a rich (selector) query against the state database
    fn get_query_result<'a>(
        &'a self,
        query: &str,
    ) -> StubResult<Box<dyn StateQueryIterator + 'a>>;

    /// Run a rich query returning at most `page_size` records, resuming
    /// after `bookmark` (empty for the first page)
    fn get_query_result_with_pagination<'a>(
        &'a self,
        query: &str,
        page_size: i32,
        bookmark: &str,
    ) -> StubResult<(Box<dyn StateQueryIterator + 'a>, QueryResponseMetadata)>;
}

/// The verified caller credential
pub trait ClientIdentity {
    /// Base64 of `x509::<subject DN>::<issuer DN>`
    fn get_id(&self) -> StubResult<String>;

    fn get_msp_id(&self) -> StubResult<String>;

    /// Certificate attribute value, `None` when the attribute is absent
    fn get_attribute_value(&self, name: &str) -> StubResult<Option<String>>;
}
