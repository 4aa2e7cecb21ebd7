//! Process-spawning capability.
//!
//! [`SiaClient::launch`](crate::SiaClient::launch) never creates processes
//! directly; it hands a [`SpawnRequest`] to a [`ProcessLauncher`]. The
//! default [`TokioLauncher`] starts a real child process. Tests substitute a
//! launcher that records requests instead.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

/// Everything needed to start the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Path of the executable.
    pub program: PathBuf,
    /// Command-line flags, in order.
    pub args: Vec<String>,
    /// Owner hint: run the child as this uid when the platform supports it.
    pub uid: Option<u32>,
}

/// Handle to a spawned daemon.
///
/// Dropping the handle does not kill the daemon.
#[derive(Debug)]
pub struct DaemonProcess {
    pid: u32,
    child: Option<Child>,
}

impl DaemonProcess {
    /// Wrap a freshly spawned tokio child.
    pub fn from_child(child: Child) -> io::Result<Self> {
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("spawned process exited before reporting a pid"))?;
        Ok(Self {
            pid,
            child: Some(child),
        })
    }

    /// A handle that only knows a pid, for launchers that do not own a child.
    pub fn detached(pid: u32) -> Self {
        Self { pid, child: None }
    }

    /// Process id assigned at spawn time.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Wait for the daemon to exit. Returns `None` for detached handles.
    pub async fn wait(&mut self) -> io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.wait().await.map(Some),
            None => Ok(None),
        }
    }

    /// Non-blocking exit check. Returns `None` while running or when detached.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => Ok(None),
        }
    }
}

/// Capability to start a daemon process.
pub trait ProcessLauncher: Send + Sync {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<DaemonProcess>;
}

/// Spawns real child processes with `tokio::process`.
///
/// stdout and stderr are inherited; the working directory is left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<DaemonProcess> {
        let mut command = Command::new(&request.program);
        command.args(&request.args).stdin(Stdio::null());

        #[cfg(unix)]
        if let Some(uid) = request.uid {
            command.uid(uid);
        }

        DaemonProcess::from_child(command.spawn()?)
    }
}
