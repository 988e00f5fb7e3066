//! Decodes the flat `ENV_SOURCE_*` / `ENV_DESTINATION_*` namespace.
//!
//! Keys follow `ENV_<FAMILY>_<ID>_<PATH>`. The id runs up to the first
//! underscore after the prefix and may contain letters, digits and hyphens;
//! the remainder is the property path. Both are lower-cased. Each family has
//! a fixed table of recognized paths, anything else is skipped.

use crate::config::partial::{
    PartialDebugOptions, PartialDestination, PartialDestinationConfig, PartialOptions,
    PartialSource, PartialSourceConfig,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, trace};

static SOURCE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ENV_SOURCE_([0-9a-zA-Z-]+)_(.+)$").expect("source key pattern is valid")
});

static DESTINATION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ENV_DESTINATION_([0-9a-zA-Z-]+)_(.+)$")
        .expect("destination key pattern is valid")
});

/// Writes one raw env value into the matching field of a partial entity.
type Setter<T> = fn(&mut T, &str);

const SOURCE_PROPERTIES: &[(&str, Setter<PartialSource>)] = &[
    ("type", |s, v| s.kind = Some(v.to_string())),
    ("enabled", |s, v| s.enabled = Some(flag(v))),
    ("notify_to", |s, v| s.notify_to = Some(list(v))),
    ("options_debug_print_payload", |s, v| {
        debug_options(&mut s.options).print_payload = Some(flag(v))
    }),
    ("config_webhook_secret", |s, v| {
        source_config(s).webhook_secret = Some(v.to_string())
    }),
];

const DESTINATION_PROPERTIES: &[(&str, Setter<PartialDestination>)] = &[
    ("type", |d, v| d.kind = Some(v.to_string())),
    ("enabled", |d, v| d.enabled = Some(flag(v))),
    ("options_debug_print_payload", |d, v| {
        debug_options(&mut d.options).print_payload = Some(flag(v))
    }),
    ("config_url", |d, v| destination_config(d).url = Some(v.to_string())),
    ("config_token", |d, v| destination_config(d).token = Some(v.to_string())),
    ("config_default_post_visibility", |d, v| {
        destination_config(d).default_post_visibility = Some(v.to_string())
    }),
    ("config_webhook_url", |d, v| {
        destination_config(d).webhook_url = Some(v.to_string())
    }),
    ("config_username", |d, v| {
        destination_config(d).username = Some(v.to_string())
    }),
    ("config_avatar_url", |d, v| {
        destination_config(d).avatar_url = Some(v.to_string())
    }),
];

/// Only the literal string `true` enables a flag.
fn flag(value: &str) -> bool {
    value == "true"
}

fn list(value: &str) -> Vec<String> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.len() != value.split(',').count() {
        debug!(value, "Discarding empty items from list value");
    }
    items
}

fn debug_options(options: &mut Option<PartialOptions>) -> &mut PartialDebugOptions {
    options
        .get_or_insert_with(PartialOptions::default)
        .debug
        .get_or_insert_with(PartialDebugOptions::default)
}

fn source_config(source: &mut PartialSource) -> &mut PartialSourceConfig {
    source.config.get_or_insert_with(PartialSourceConfig::default)
}

fn destination_config(destination: &mut PartialDestination) -> &mut PartialDestinationConfig {
    destination
        .config
        .get_or_insert_with(PartialDestinationConfig::default)
}

fn decode<I, K, V, T>(vars: I, pattern: &Regex, properties: &[(&str, Setter<T>)]) -> BTreeMap<String, T>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
    T: Default,
{
    let mut entities: BTreeMap<String, T> = BTreeMap::new();

    for (key, value) in vars {
        let key = key.as_ref();
        let Some(captures) = pattern.captures(key) else {
            continue;
        };

        let id = captures[1].to_lowercase();
        let path = captures[2].to_lowercase();
        let entity = entities.entry(id).or_default();

        match properties.iter().find(|(name, _)| *name == path) {
            Some((_, set)) => set(entity, value.as_ref()),
            None => trace!(key, "Ignoring unrecognized property path"),
        }
    }

    entities
}

/// Collects every `ENV_SOURCE_<ID>_<PATH>` variable into partial sources keyed by id.
pub fn decode_sources<I, K, V>(vars: I) -> BTreeMap<String, PartialSource>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    decode(vars, &SOURCE_KEY, SOURCE_PROPERTIES)
}

/// Collects every `ENV_DESTINATION_<ID>_<PATH>` variable into partial destinations keyed by id.
pub fn decode_destinations<I, K, V>(vars: I) -> BTreeMap<String, PartialDestination>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    decode(vars, &DESTINATION_KEY, DESTINATION_PROPERTIES)
}
