#![deny(unsafe_code)]

//! Launcher and HTTP client for the `siad` daemon.
//!
//! [`SiaClient`] owns the merged configuration, spawns the daemon with flags
//! computed by [`flags::build_flags`], and talks to the daemon's local REST
//! API once it is running. Process creation goes through the
//! [`ProcessLauncher`] capability so tests can substitute a recording fake.

/// Daemon client: launch, HTTP access, and liveness probing.
pub mod client;
/// Error taxonomy shared by every client operation.
pub mod error;
/// Pure mapping from merged settings to `siad` command-line flags.
pub mod flags;
/// Best-effort detection of the current process owner.
pub mod identity;
/// Process-spawning capability and the handle it returns.
pub mod launcher;
/// Typed daemon API responses.
pub mod types;

pub use client::{
    ApiRequest, ClientBuilder, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_MAX_SOCKETS, DEFAULT_USER_AGENT, SiaClient,
};
pub use error::ClientError;
pub use flags::build_flags;
pub use launcher::{DaemonProcess, ProcessLauncher, SpawnRequest, TokioLauncher};
pub use reqwest::Method;
pub use types::{DaemonVersion, GatewayInfo, GatewayPeer};
