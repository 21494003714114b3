//! Entity index
//!
//! Maps `(id, docType)` to the latest record bytes under a composite key.
//! Lookups honour the `active` soft-delete flag; the raw accessors do not.

use ledger_shim::ChaincodeStub;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ContractConfig;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::types::DocType;
use crate::validation::require_identifier;

#[derive(Clone, Copy, Debug)]
pub struct EntityIndex<'a> {
    namespace: &'a str,
}

impl<'a> EntityIndex<'a> {
    pub fn new(config: &'a ContractConfig) -> Self {
        Self {
            namespace: &config.entity_index_namespace,
        }
    }

    pub fn key(&self, stub: &dyn ChaincodeStub, id: &str, doc_type: DocType) -> ChaincodeResult<String> {
        require_identifier("id", id)?;
        Ok(stub.create_composite_key(self.namespace, &[id, doc_type.as_str()])?)
    }

    pub fn put(
        &self,
        stub: &mut dyn ChaincodeStub,
        id: &str,
        doc_type: DocType,
        bytes: &[u8],
    ) -> ChaincodeResult<()> {
        let key = self.key(stub, id, doc_type)?;
        stub.put_state(&key, bytes)?;
        Ok(())
    }

    /// Bytes of an active record, `None` when absent
    pub fn get(
        &self,
        stub: &dyn ChaincodeStub,
        id: &str,
        doc_type: DocType,
    ) -> ChaincodeResult<Option<Vec<u8>>> {
        let key = self.key(stub, id, doc_type)?;
        let bytes = match stub.get_state(&key)? {
            Some(bytes) => bytes,
            None => {
                debug!(id, doc_type = %doc_type, "entity not found");
                return Ok(None);
            }
        };
        if !is_active(&bytes)? {
            return Err(ChaincodeError::EntityInactive {
                id: id.to_string(),
                doc_type,
            });
        }
        Ok(Some(bytes))
    }

    /// Like `get`, but absent or inactive records are `NotFound`
    pub fn get_active(
        &self,
        stub: &dyn ChaincodeStub,
        id: &str,
        doc_type: DocType,
    ) -> ChaincodeResult<Vec<u8>> {
        match self.get(stub, id, doc_type) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) | Err(ChaincodeError::EntityInactive { .. }) => Err(ChaincodeError::NotFound(
                format!("{} {} does not exist or is inactive", doc_type, id),
            )),
            Err(err) => Err(err),
        }
    }

    pub fn read_typed<T: DeserializeOwned>(
        &self,
        stub: &dyn ChaincodeStub,
        id: &str,
        doc_type: DocType,
    ) -> ChaincodeResult<T> {
        let bytes = self.get_active(stub, id, doc_type)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Existence regardless of the active flag
    pub fn exists(&self, stub: &dyn ChaincodeStub, id: &str, doc_type: DocType) -> ChaincodeResult<bool> {
        Ok(self.get_entity_raw(stub, id, doc_type)?.is_some())
    }

    /// Stored bytes of an entity regardless of the active flag
    pub fn get_entity_raw(
        &self,
        stub: &dyn ChaincodeStub,
        id: &str,
        doc_type: DocType,
    ) -> ChaincodeResult<Option<Vec<u8>>> {
        let key = self.key(stub, id, doc_type)?;
        self.get_raw(stub, &key)
    }

    pub fn get_raw(&self, stub: &dyn ChaincodeStub, key: &str) -> ChaincodeResult<Option<Vec<u8>>> {
        Ok(stub.get_state(key)?)
    }

    /// Records keyed by their committing transaction id
    pub fn get_by_tx(&self, stub: &dyn ChaincodeStub, tx_id: &str) -> ChaincodeResult<Option<Vec<u8>>> {
        require_identifier("txId", tx_id)?;
        self.get_raw(stub, tx_id)
    }

    pub fn delete(&self, stub: &mut dyn ChaincodeStub, key: &str) -> ChaincodeResult<()> {
        stub.del_state(key)?;
        Ok(())
    }
}

/// A missing `active` field counts as active
pub fn is_active(bytes: &[u8]) -> ChaincodeResult<bool> {
    let document: Value = serde_json::from_slice(bytes)?;
    Ok(!matches!(document.get("active"), Some(Value::Bool(false))))
}
