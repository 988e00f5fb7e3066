#![allow(dead_code)]
//! Shared fixtures for the integration tests.

use github_notifier::config::Environment;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// Builds an environment snapshot from literal pairs.
pub fn env(vars: &[(&str, &str)]) -> Environment {
    vars.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Writes `content` to a temporary file with the given extension.
///
/// The returned handle must be kept alive for as long as the file is needed.
pub fn config_file(content: &str, extension: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    write!(file, "{}", content).unwrap();
    file
}
