//! Errors returned by [`SiaClient`](crate::SiaClient) operations.

use std::path::PathBuf;

use siactl_config::ConfigError;

/// Errors from constructing or using a daemon client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configuration was invalid or the credentials source failed.
    #[error("client configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("could not find daemon binary at {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Any HTTP failure: connect, timeout, non-2xx status, or bad body.
    #[error("request to {endpoint} failed: {message}")]
    Request {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("launched process {pid} but it is not answering API calls")]
    ProcessUnresponsive { pid: u32 },

    #[error("unable to reach daemon at {url}")]
    DaemonUnreachable { url: String },
}

impl ClientError {
    pub(crate) fn request(
        endpoint: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Request {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// HTTP status of a failed request, when the daemon answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }
}
