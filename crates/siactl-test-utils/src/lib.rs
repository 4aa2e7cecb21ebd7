#![deny(unsafe_code)]

//! Shared test utilities for the siactl workspace.
//!
//! Provides reusable fixtures, config builders, a recording process launcher,
//! an in-process mock of the daemon's HTTP API, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! siactl-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod launcher;
pub mod tracing_setup;

pub use config::{StaticCredentials, TestConfigBuilder};
pub use daemon::{MOCK_VERSION, MockDaemon, RecordedRequest, unused_port};
pub use launcher::RecordingLauncher;
