//! Fuzz target for daemon flag construction.
//!
//! Run with: cargo +nightly fuzz run fuzz_build_flags
//!
//! Any config that parses and resolves must produce a flag list carrying the
//! three address flags and exactly one `--authenticate-api=` flag.

#![no_main]

use libfuzzer_sys::fuzz_target;
use siactl_config::{AppConfig, NoCredentials};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = AppConfig::parse(s) else {
        return;
    };
    let Ok(settings) = config.client.resolve(&NoCredentials) else {
        return;
    };

    let flags = siactl_core::build_flags(&settings);
    let count = |prefix: &str| flags.iter().filter(|f| f.starts_with(prefix)).count();
    assert_eq!(count("--api-addr="), 1);
    assert_eq!(count("--host-addr="), 1);
    assert_eq!(count("--rpc-addr="), 1);
    assert_eq!(count("--authenticate-api="), 1);
});
