//! Partially-specified entities and their merge rules.
//!
//! Both the structured configuration and the decoded environment produce
//! these loose shapes. Every field is optional so that either side can
//! contribute only what it knows; validation happens later in
//! [`crate::config::validate`].

use serde::{Deserialize, Serialize};

/// Field-by-field overlay of one fragment onto another.
///
/// `Some` values in `other` win, `None` values leave `self` untouched, and
/// nested sections recurse. Vectors are replaced as a whole.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

fn overwrite<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

fn merge_nested<T: Merge + Default>(target: &mut Option<T>, value: Option<T>) {
    if let Some(value) = value {
        target.get_or_insert_with(T::default).merge(value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDebugOptions {
    pub print_payload: Option<bool>,
}

impl Merge for PartialDebugOptions {
    fn merge(&mut self, other: Self) {
        overwrite(&mut self.print_payload, other.print_payload);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialOptions {
    pub debug: Option<PartialDebugOptions>,
}

impl Merge for PartialOptions {
    fn merge(&mut self, other: Self) {
        merge_nested(&mut self.debug, other.debug);
    }
}

/// Source-specific configuration fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSourceConfig {
    pub webhook_secret: Option<String>,
}

impl Merge for PartialSourceConfig {
    fn merge(&mut self, other: Self) {
        overwrite(&mut self.webhook_secret, other.webhook_secret);
    }
}

/// A source as declared by one configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSource {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub enabled: Option<bool>,
    pub notify_to: Option<Vec<String>>,
    pub options: Option<PartialOptions>,
    pub config: Option<PartialSourceConfig>,
}

impl Merge for PartialSource {
    fn merge(&mut self, other: Self) {
        overwrite(&mut self.kind, other.kind);
        overwrite(&mut self.enabled, other.enabled);
        overwrite(&mut self.notify_to, other.notify_to);
        merge_nested(&mut self.options, other.options);
        merge_nested(&mut self.config, other.config);
    }
}

/// Destination configuration fields. Holds the union of every variant's
/// fields; the validator picks out the ones its variant needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDestinationConfig {
    // Misskey
    pub url: Option<String>,
    pub token: Option<String>,
    pub default_post_visibility: Option<String>,
    // Discord
    pub webhook_url: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl Merge for PartialDestinationConfig {
    fn merge(&mut self, other: Self) {
        overwrite(&mut self.url, other.url);
        overwrite(&mut self.token, other.token);
        overwrite(&mut self.default_post_visibility, other.default_post_visibility);
        overwrite(&mut self.webhook_url, other.webhook_url);
        overwrite(&mut self.username, other.username);
        overwrite(&mut self.avatar_url, other.avatar_url);
    }
}

/// A destination as declared by one configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDestination {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub enabled: Option<bool>,
    pub options: Option<PartialOptions>,
    pub config: Option<PartialDestinationConfig>,
}

impl Merge for PartialDestination {
    fn merge(&mut self, other: Self) {
        overwrite(&mut self.kind, other.kind);
        overwrite(&mut self.enabled, other.enabled);
        merge_nested(&mut self.options, other.options);
        merge_nested(&mut self.config, other.config);
    }
}

/// Access to the declared `type` tag, used to decide merge eligibility.
pub trait Tagged {
    fn tag(&self) -> Option<&str>;
}

impl Tagged for PartialSource {
    fn tag(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

impl Tagged for PartialDestination {
    fn tag(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}
