//! Mapping from [`DaemonSettings`] to `siad` command-line flags.
//!
//! Each present setting produces exactly one flag; absent settings produce
//! none. Flags are emitted in a fixed order so the output is stable:
//!
//! ```text
//! --agent  --api-addr  --authenticate-api  --disable-api-security
//! --host-addr  --modules  --no-bootstrap  --profile  --profile-directory
//! --rpc-addr  --sia-directory  --temp-password
//! ```

use siactl_config::DaemonSettings;

/// Build the ordered flag list for launching the daemon.
pub fn build_flags(settings: &DaemonSettings) -> Vec<String> {
    let mut flags = Vec::new();

    if let Some(agent) = &settings.agent {
        flags.push(format!("--agent={agent}"));
    }

    flags.push(format!(
        "--api-addr={}:{}",
        settings.api_host, settings.api_port
    ));
    flags.push(format!("--authenticate-api={}", settings.authenticate_api));

    if settings.disable_api_security {
        flags.push("--disable-api-security".to_string());
    }

    flags.push(format!("--host-addr=:{}", settings.host_port));

    if let Some(modules) = &settings.modules {
        let codes = modules.codes();
        if !codes.is_empty() {
            flags.push(format!("--modules={codes}"));
        }
    }

    if settings.no_bootstrap {
        flags.push("--no-bootstrap".to_string());
    }
    if let Some(profile) = &settings.profile {
        flags.push(format!("--profile={profile}"));
    }
    if let Some(dir) = &settings.profile_directory {
        flags.push(format!("--profile-directory={}", dir.display()));
    }

    flags.push(format!("--rpc-addr=:{}", settings.rpc_port));

    if let Some(dir) = &settings.data_directory {
        flags.push(format!("--sia-directory={}", dir.display()));
    }

    if settings.authenticate_api
        && let Some(password) = &settings.api_password
    {
        flags.push(format!("--temp-password={}", password.expose()));
    }

    flags
}
