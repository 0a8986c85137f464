//! Vigil command line
//!
//! Scripted failure scenarios, the static server with its health endpoint
//! and a health check, behind the `vigil` binary.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod scenario;
pub mod server;
pub mod telemetry;

pub use cli::{build_cli, run};
pub use scenario::{Scenario, ScenarioReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
