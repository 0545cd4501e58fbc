//! Endpoint groups of the gateway API.
//!
//! Every group is a trait implemented by [`XooaClient`](crate::XooaClient)
//! so callers can depend on the operations they use and substitute mocks
//! (feature `test-util`) in their tests.

pub mod blockchain;
pub mod identities;
pub mod invoke;
pub mod query;
pub mod result;

pub use {
    blockchain::BlockchainApi,
    identities::IdentitiesApi,
    invoke::InvokeApi,
    query::QueryApi,
    result::ResultApi,
};
#[cfg(any(test, feature = "test-util"))]
pub use {
    blockchain::MockBlockchainApi,
    identities::MockIdentitiesApi,
    invoke::MockInvokeApi,
    query::MockQueryApi,
    result::MockResultApi,
};
