//! Configuration management for the notifier
//!
//! Two layers feed the routing configuration:
//!
//! - the structured configuration, loaded with `figment` from a TOML or JSON
//!   file and from the `CONFIG` environment variable (a JSON object), and
//! - the flat `ENV_SOURCE_*` / `ENV_DESTINATION_*` namespace, decoded by
//!   [`env`].
//!
//! [`Config::resolve`] merges the two (environment on top), validates every
//! entity and checks that each source only notifies declared destinations.
//! The result is immutable and shared by reference for the life of the
//! process.

pub mod env;
pub mod partial;
pub mod validate;

use crate::cli::Cli;
use crate::core::{Destination, DestinationKind, Source, SourceKind};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use partial::{Merge, PartialDestination, PartialSource, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the structured configuration as JSON.
pub const STRUCTURED_CONFIG_ENV: &str = "CONFIG";
/// Environment variable naming the configuration file when `--config` is absent.
pub const CONFIG_FILE_ENV: &str = "NOTIFIER_CONFIG_FILE";
/// Prefix for runtime settings overrides, e.g. `NOTIFIER_LOG_LEVEL=debug`.
pub const SETTINGS_ENV_PREFIX: &str = "NOTIFIER_";

/// A snapshot of the process environment.
pub type Environment = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} is required for {family} {id}")]
    MissingField {
        field: &'static str,
        family: &'static str,
        id: String,
    },

    #[error("Invalid value for {field} of {id}: {value}")]
    InvalidValue {
        field: &'static str,
        value: String,
        id: String,
    },

    #[error("Invalid notifyTo destination: {destination_id} for source {source_id}")]
    UnknownDestination {
        source_id: String,
        destination_id: String,
    },

    #[error("Config file not found at specified path: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid CONFIG environment variable, expected a JSON object: {0}")]
    MalformedStructuredConfig(#[source] serde_json::Error),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// The structured configuration fragment: whole partial entities keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, PartialSource>,
    #[serde(default)]
    pub destinations: BTreeMap<String, PartialDestination>,
}

/// Runtime settings that are not part of the routing model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The logging level for the application.
    pub log_level: String,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_seconds: u64,
}

/// Everything the configuration file layers produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub log_level: String,
    pub http_timeout_seconds: u64,
    #[serde(default)]
    pub sources: BTreeMap<String, PartialSource>,
    #[serde(default)]
    pub destinations: BTreeMap<String, PartialDestination>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_timeout_seconds: 10,
            sources: BTreeMap::new(),
            destinations: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Loads the layered configuration.
    ///
    /// Layers, lowest precedence first: built-in defaults, the config file
    /// (`--config` or `NOTIFIER_CONFIG_FILE`, JSON when the extension is
    /// `.json`, TOML otherwise), the `CONFIG` JSON variable, `NOTIFIER_*`
    /// settings overrides, and finally the command line.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        let path = cli
            .config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from));
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            debug!(path = %path.display(), "Loading configuration file");
            figment = merge_file(figment, &path);
        }

        if let Ok(json) = std::env::var(STRUCTURED_CONFIG_ENV) {
            debug!("Loading structured configuration from {}", STRUCTURED_CONFIG_ENV);
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&json)
                .map_err(ConfigError::MalformedStructuredConfig)?;
            figment = figment.merge(Json::string(&json));
        }

        let config = figment
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX).only(&["log_level", "http_timeout_seconds"]))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// Separates runtime settings from the structured routing fragment.
    pub fn split(self) -> (Settings, RawConfig) {
        (
            Settings {
                log_level: self.log_level,
                http_timeout_seconds: self.http_timeout_seconds,
            },
            RawConfig {
                sources: self.sources,
                destinations: self.destinations,
            },
        )
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

/// The validated, immutable routing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Config {
    sources: BTreeMap<String, Source>,
    destinations: BTreeMap<String, Destination>,
}

impl Config {
    /// Merges the structured fragment with the decoded environment and
    /// validates the result.
    ///
    /// Fails on the first missing required field, invalid value, or
    /// `notifyTo` entry that names an undeclared destination.
    pub fn resolve(structured: RawConfig, env: &Environment) -> Result<Self, ConfigError> {
        let sources = resolve_sources(structured.sources, env::decode_sources(env))?;
        let destinations =
            resolve_destinations(structured.destinations, env::decode_destinations(env))?;
        check_references(&sources, &destinations)?;

        Ok(Self {
            sources,
            destinations,
        })
    }

    pub fn sources(&self) -> &BTreeMap<String, Source> {
        &self.sources
    }

    pub fn destinations(&self) -> &BTreeMap<String, Destination> {
        &self.destinations
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    pub fn destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.get(id)
    }
}

/// Overlays each layer onto the accumulated fragments, in order.
///
/// A fragment is taken only when its own tag, or the tag already
/// accumulated for that id, is a known variant. Anything else is dropped.
fn merge_layers<T, F>(layers: [BTreeMap<String, T>; 2], is_known: F) -> BTreeMap<String, T>
where
    T: Merge + Tagged + Default,
    F: Fn(&str) -> bool,
{
    let mut merged: BTreeMap<String, T> = BTreeMap::new();
    for layer in layers {
        for (id, fragment) in layer {
            let known_incoming = fragment.tag().is_some_and(&is_known);
            let known_existing = merged
                .get(&id)
                .and_then(|existing| existing.tag())
                .is_some_and(&is_known);
            if known_incoming || known_existing {
                merged.entry(id).or_default().merge(fragment);
            } else {
                debug!(id = %id, "Dropping fragment without a known type");
            }
        }
    }
    merged
}

fn resolve_sources(
    structured: BTreeMap<String, PartialSource>,
    from_env: BTreeMap<String, PartialSource>,
) -> Result<BTreeMap<String, Source>, ConfigError> {
    let merged = merge_layers([structured, from_env], |tag| {
        SourceKind::from_tag(tag).is_some()
    });

    let mut validated = BTreeMap::new();
    for (id, partial) in merged {
        if let Some(source) = validate::validate_source(&id, partial)? {
            validated.insert(id, source);
        }
    }
    Ok(validated)
}

fn resolve_destinations(
    structured: BTreeMap<String, PartialDestination>,
    from_env: BTreeMap<String, PartialDestination>,
) -> Result<BTreeMap<String, Destination>, ConfigError> {
    let merged = merge_layers([structured, from_env], |tag| {
        DestinationKind::from_tag(tag).is_some()
    });

    let mut validated = BTreeMap::new();
    for (id, partial) in merged {
        if let Some(destination) = validate::validate_destination(&id, partial)? {
            validated.insert(id, destination);
        }
    }
    Ok(validated)
}

fn check_references(
    sources: &BTreeMap<String, Source>,
    destinations: &BTreeMap<String, Destination>,
) -> Result<(), ConfigError> {
    for (source_id, source) in sources {
        if let Some(missing) = source
            .notify_to
            .iter()
            .find(|id| !destinations.contains_key(id.as_str()))
        {
            return Err(ConfigError::UnknownDestination {
                source_id: source_id.clone(),
                destination_id: missing.clone(),
            });
        }
    }
    Ok(())
}
