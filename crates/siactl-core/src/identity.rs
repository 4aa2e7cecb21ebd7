//! Effective-uid lookup for the process-owner hint passed to the launcher.
//!
//! Reads `/proc/self/status` instead of calling into libc so the crate stays
//! free of `unsafe`. Platforms without procfs report no identity, and the
//! daemon is then spawned without an owner hint.

/// The effective user id of the current process, if the platform exposes it.
pub fn effective_uid() -> Option<u32> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_effective_uid(&status))
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Extract the effective uid from a procfs `status` document.
///
/// The `Uid:` line lists real, effective, saved-set and filesystem ids.
pub(crate) fn parse_effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|line| line.starts_with("Uid:"))
        .and_then(|line| line.split_whitespace().nth(2))
        .and_then(|uid| uid.parse().ok())
}
