//! Per-invocation context handed to every operation

use ledger_shim::{ChaincodeStub, ClientIdentity};
use tracing::warn;

use crate::access_control::Policy;
use crate::config::ContractConfig;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::identity::{CallerAttributes, IdentityResolver};
use crate::index::EntityIndex;
use crate::types::DocType;

pub struct Context<'a> {
    stub: &'a mut dyn ChaincodeStub,
    identity: &'a dyn ClientIdentity,
    config: &'a ContractConfig,
}

impl<'a> Context<'a> {
    pub fn new(
        stub: &'a mut dyn ChaincodeStub,
        identity: &'a dyn ClientIdentity,
        config: &'a ContractConfig,
    ) -> Self {
        Self {
            stub,
            identity,
            config,
        }
    }

    pub fn stub(&self) -> &dyn ChaincodeStub {
        &*self.stub
    }

    pub fn stub_mut(&mut self) -> &mut dyn ChaincodeStub {
        &mut *self.stub
    }

    pub fn config(&self) -> &'a ContractConfig {
        self.config
    }

    pub fn tx_id(&self) -> String {
        self.stub.tx_id().to_string()
    }

    /// Resolve the caller credential
    pub fn caller(&self) -> ChaincodeResult<CallerAttributes> {
        IdentityResolver::new(self.identity, self.config).caller()
    }

    /// Resolve the caller and require its own record, and its
    /// organization's hospital, to be registered and active. Callers
    /// without a role or organization skip the matching check.
    pub fn active_caller(&self) -> ChaincodeResult<CallerAttributes> {
        let caller = self.caller()?;
        let index = self.index();
        let mut checks = Vec::with_capacity(2);
        if let Some(role) = caller.role {
            checks.push((caller.identity.as_str(), role.doc_type()));
        }
        if let Some(organization) = caller.organization.as_deref() {
            checks.push((organization, DocType::Hospital));
        }
        for (id, doc_type) in checks {
            match index.get_active(self.stub(), id, doc_type) {
                Ok(_) => {}
                Err(ChaincodeError::NotFound(_)) => {
                    warn!(caller = %caller.identity, id, doc_type = %doc_type, "caller is not active");
                    return Err(ChaincodeError::Unauthorized(format!(
                        "{} {} is not registered or is suspended",
                        doc_type, id
                    )));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(caller)
    }

    pub fn index(&self) -> EntityIndex<'a> {
        EntityIndex::new(self.config)
    }

    pub fn policy(&self) -> Policy<'a> {
        Policy::new(self.config)
    }
}
