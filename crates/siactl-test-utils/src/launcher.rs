//! A [`ProcessLauncher`] that records spawn requests instead of running them.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use siactl_core::{DaemonProcess, ProcessLauncher, SpawnRequest};

/// Records every [`SpawnRequest`] and hands back detached handles with
/// increasing fake pids, starting at 4000.
#[derive(Debug, Clone)]
pub struct RecordingLauncher {
    requests: Arc<Mutex<Vec<SpawnRequest>>>,
    next_pid: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            next_pid: Arc::new(AtomicU32::new(4000)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent spawns fail with `PermissionDenied`.
    pub fn fail_spawns(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Snapshot of the recorded requests, oldest first.
    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn spawn_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<DaemonProcess> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        Ok(DaemonProcess::detached(pid))
    }
}
