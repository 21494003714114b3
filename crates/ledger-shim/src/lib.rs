//! Ledger Shim
//!
//! The contracts the hospital chaincode consumes from its host:
//! - `ChaincodeStub`: deterministic world-state access (get/put/delete,
//!   composite keys, rich queries with pagination, transaction id/time)
//! - `ClientIdentity`: the verified caller credential and its attributes
//!
//! It also ships `MockStub` and `MockIdentity`, an in-memory host with
//! per-transaction write sets and a selector evaluator, used by every
//! test in the workspace.

pub mod composite_key;
pub mod error;
pub mod mock;
pub mod rich_query;
pub mod stub;

pub use composite_key::create_composite_key;
pub use error::{StubError, StubResult};
pub use mock::{CommittedTransaction, MockIdentity, MockStub};
pub use stub::{ChaincodeStub, ClientIdentity, QueryResponseMetadata, StateQueryIterator, KV};
