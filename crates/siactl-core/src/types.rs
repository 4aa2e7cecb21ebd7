//! Typed responses for the daemon endpoints the client wraps.
//!
//! Fields the daemon may omit default to empty values so older and newer
//! daemons both decode.

use serde::{Deserialize, Serialize};

/// `GET /daemon/version`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonVersion {
    pub version: String,
    pub gitrevision: String,
    pub buildtime: String,
}

/// `GET /gateway`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayInfo {
    pub netaddress: String,
    pub peers: Vec<GatewayPeer>,
    pub maxdownloadspeed: i64,
    pub maxuploadspeed: i64,
}

/// A peer entry in [`GatewayInfo`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayPeer {
    pub inbound: bool,
    pub local: bool,
    pub netaddress: String,
    pub version: String,
}

/// Error body the daemon returns with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}
