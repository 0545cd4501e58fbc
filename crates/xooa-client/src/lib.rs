//! Client of the Xooa blockchain gateway.
//!
//! Every operation maps to a single REST call of the gateway. Blocking calls
//! return an [`Outcome`]: the final result when the gateway answered within
//! the requested [`Timeout`], or a [`dto::PendingTransaction`] whose result
//! can be polled later through [`ResultApi`]. The `*_async` variants ask the
//! gateway for a pending transaction right away.
//!
//! Smart contract events are delivered through [`events::Subscription`].

pub mod api;
pub mod arguments;
mod client;
pub mod config;
pub mod dto;
mod error;
pub mod events;
mod gateway;
pub mod http_client;
mod metrics;

pub use {
    api::{BlockchainApi, IdentitiesApi, InvokeApi, QueryApi, ResultApi},
    arguments::Arguments,
    client::XooaClient,
    error::Error,
    gateway::{DEFAULT_APP_URL, Outcome, Timeout},
    reqwest::StatusCode,
};
