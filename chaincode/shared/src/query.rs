//! Query engine
//!
//! Selectors are assembled from typed predicates and serialized through
//! serde, so caller-supplied identifiers are always escaped. Results keep
//! the order the state database returns; cursors are released on every
//! exit path.

use ledger_shim::{ChaincodeStub, StateQueryIterator};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ChaincodeError, ChaincodeResult};
use crate::types::DocType;

/// Builder for a rich query document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuilder {
    predicates: Vec<(String, Value)>,
    any_of: Vec<(String, Value)>,
    /// Fields sorted descending, in order
    sort_desc: Vec<String>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field equality; predicates keep insertion order
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.push((field.to_string(), value.into()));
        self
    }

    pub fn doc_type(self, doc_type: DocType) -> Self {
        self.eq("docType", doc_type.as_str())
    }

    /// Match when `field` equals any of `values`. A single value becomes a
    /// plain equality.
    pub fn any_of(mut self, field: &str, values: &[&str]) -> Self {
        match values {
            [] => self,
            [single] => self.eq(field, *single),
            many => {
                self.any_of = many
                    .iter()
                    .map(|value| (field.to_string(), Value::from(*value)))
                    .collect();
                self
            }
        }
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort_desc.push(field.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Serialize to `{"selector":{...},"sort":[...],"limit":n}`
    pub fn build(&self) -> ChaincodeResult<String> {
        let document = QueryDocument {
            selector: Selector {
                predicates: &self.predicates,
                any_of: &self.any_of,
            },
            sort: self
                .sort_desc
                .iter()
                .map(|field| SingleEntry(field, Value::from("desc")))
                .collect(),
            limit: self.limit,
        };
        Ok(serde_json::to_string(&document)?)
    }
}

#[derive(Serialize)]
struct QueryDocument<'a> {
    selector: Selector<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sort: Vec<SingleEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

struct Selector<'a> {
    predicates: &'a [(String, Value)],
    any_of: &'a [(String, Value)],
}

impl Serialize for Selector<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(!self.any_of.is_empty());
        let mut map = serializer.serialize_map(Some(self.predicates.len() + extra))?;
        for (field, value) in self.predicates {
            map.serialize_entry(field, value)?;
        }
        if !self.any_of.is_empty() {
            let branches: Vec<SingleEntry<'_>> = self
                .any_of
                .iter()
                .map(|(field, value)| SingleEntry(field, value.clone()))
                .collect();
            map.serialize_entry("$or", &branches)?;
        }
        map.end()
    }
}

/// `{field: value}`
struct SingleEntry<'a>(&'a str, Value);

impl Serialize for SingleEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, &self.1)?;
        map.end()
    }
}

/// A matched record: state key plus stored bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRecord {
    pub key: String,
    pub value: Vec<u8>,
}

/// One page of a paginated query, values embedded verbatim
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub records: Vec<Box<RawValue>>,
    pub bookmark: String,
    pub fetched_records_count: i32,
}

/// Closes the wrapped cursor when dropped
struct CursorGuard<'a> {
    cursor: Option<Box<dyn StateQueryIterator + 'a>>,
}

impl<'a> CursorGuard<'a> {
    fn new(cursor: Box<dyn StateQueryIterator + 'a>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    fn next_record(&mut self) -> ChaincodeResult<Option<QueryRecord>> {
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Ok(None),
        };
        match cursor.next() {
            Some(item) => {
                let kv = item?;
                Ok(Some(QueryRecord {
                    key: kv.key,
                    value: kv.value,
                }))
            }
            None => Ok(None),
        }
    }

    fn drain(mut self) -> ChaincodeResult<Vec<QueryRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        self.close()?;
        Ok(records)
    }

    fn close(&mut self) -> ChaincodeResult<()> {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close()?;
        }
        Ok(())
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close query cursor");
        }
    }
}

/// Run a query and collect every match in index order
pub fn execute(stub: &dyn ChaincodeStub, query: &QueryBuilder) -> ChaincodeResult<Vec<QueryRecord>> {
    let query = query.build()?;
    debug!(query = %query, "rich query");
    let cursor = CursorGuard::new(stub.get_query_result(&query)?);
    cursor.drain()
}

/// Run a query for one page of results
pub fn execute_paginated(
    stub: &dyn ChaincodeStub,
    query: &QueryBuilder,
    page_size: u32,
    max_page_size: u32,
    bookmark: &str,
) -> ChaincodeResult<QueryPage> {
    if page_size == 0 || page_size > max_page_size {
        return Err(ChaincodeError::InvalidInput(format!(
            "page size must be between 1 and {}, got {}",
            max_page_size, page_size
        )));
    }
    let page_size = i32::try_from(page_size)
        .map_err(|_| ChaincodeError::InvalidInput(format!("page size {} is too large", page_size)))?;

    let query = query.build()?;
    debug!(query = %query, page_size, bookmark, "paginated rich query");
    let (cursor, metadata) = stub.get_query_result_with_pagination(&query, page_size, bookmark)?;
    let records = CursorGuard::new(cursor).drain()?;

    Ok(QueryPage {
        records: raw_values(&records)?,
        bookmark: metadata.bookmark,
        fetched_records_count: metadata.fetched_records_count,
    })
}

/// Key of the first match, if any
pub fn first_key(stub: &dyn ChaincodeStub, query: &QueryBuilder) -> ChaincodeResult<Option<String>> {
    let query = query.build()?;
    debug!(query = %query, "rich query (first match)");
    let mut cursor = CursorGuard::new(stub.get_query_result(&query)?);
    let first = cursor.next_record()?.map(|record| record.key);
    cursor.close()?;
    Ok(first)
}

/// Stored values as raw JSON, in order
pub fn raw_values(records: &[QueryRecord]) -> ChaincodeResult<Vec<Box<RawValue>>> {
    records
        .iter()
        .map(|record| Ok(serde_json::from_slice::<Box<RawValue>>(&record.value)?))
        .collect()
}
