//! Observability plumbing shared by the SDK, the command line tool and the
//! tests: logging initialisation and the process wide metrics registry.
pub mod config;
pub mod metrics;
pub mod tracing;

pub use config::Config;
