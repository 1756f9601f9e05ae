#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tunables and connection settings for the inventory sync engine.
//!
//! Engine tunables live in a TOML document embedded at compile time
//! (`config/default.toml`). A file named by `INVENTORY_SYNC_CONFIG` is
//! merged over it key by key, so an override only needs the values it
//! changes. Connection settings (URLs, tokens, location) are read from
//! environment variables by [`ConnectionSettings::from_env`].

use std::path::Path;

use inventory_sync_catalog_models::Channel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Environment variable naming an override config file.
pub const CONFIG_PATH_ENV: &str = "INVENTORY_SYNC_CONFIG";

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The override file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML document failed to parse or did not match the schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required environment variable is unset or empty.
    #[error("Missing environment variable {name}")]
    MissingEnv {
        /// Variable name.
        name: &'static str,
    },

    /// A value parsed but is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Attribute keys holding per-channel visibility on ERP products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityKeys {
    /// Attribute key for channel A.
    pub channel_a: String,
    /// Attribute key for channel B.
    pub channel_b: String,
}

/// ERP price tier numbers bound to each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTiers {
    /// Tier read for channel A.
    pub channel_a: u32,
    /// Tier read for channel B.
    pub channel_b: u32,
}

/// Rule that binds storefront variants to channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMapping {
    /// Lookup order decides: first variant is A, second is B, the rest are
    /// unmapped.
    Positional,
    /// A named variant option decides. Variants whose option value matches
    /// neither channel are unmapped.
    Option {
        /// Option name (e.g., `"Channel"`).
        name: String,
        /// Option value marking channel A (e.g., `"B2C"`).
        channel_a_value: String,
        /// Option value marking channel B (e.g., `"B2B"`).
        channel_b_value: String,
    },
}

impl ChannelMapping {
    /// Channel for the variant at `position` carrying `options`.
    ///
    /// Does not resolve conflicts between variants; callers assign each
    /// channel at most once.
    #[must_use]
    pub fn channel_for(
        &self,
        position: usize,
        options: &[inventory_sync_catalog_models::Attribute],
    ) -> Channel {
        match self {
            Self::Positional => match position {
                0 => Channel::A,
                1 => Channel::B,
                _ => Channel::Unmapped,
            },
            Self::Option {
                name,
                channel_a_value,
                channel_b_value,
            } => {
                let value = options
                    .iter()
                    .find(|opt| opt.key.eq_ignore_ascii_case(name))
                    .map(|opt| opt.value.as_str());
                match value {
                    Some(v) if v.eq_ignore_ascii_case(channel_a_value) => Channel::A,
                    Some(v) if v.eq_ignore_ascii_case(channel_b_value) => Channel::B,
                    _ => Channel::Unmapped,
                }
            }
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// SKUs per storefront variant lookup.
    pub lookup_batch_size: usize,
    /// Products per internal sub-chunk.
    pub sub_chunk_size: usize,
    /// Products processed concurrently within a sub-chunk.
    pub concurrency: usize,
    /// Pause between sub-chunks in milliseconds.
    pub sub_chunk_delay_ms: u64,
    /// Chunk size used when the caller does not pass a limit.
    pub default_limit: u64,
    /// How many per-product results a chunk response carries.
    pub results_preview: usize,
    /// Largest price difference still treated as a match.
    pub price_tolerance: Decimal,
    /// Visibility attribute keys.
    pub visibility_keys: VisibilityKeys,
    /// Price tier numbers.
    pub price_tiers: PriceTiers,
    /// Variant-to-channel binding rule.
    pub channel_mapping: ChannelMapping,
}

impl Default for SyncConfig {
    /// Embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the document is embedded and tested).
    fn default() -> Self {
        parse_merged(None)
            .unwrap_or_else(|e| panic!("Failed to parse embedded sync config: {e}"))
    }
}

impl SyncConfig {
    /// Loads the embedded defaults and applies the override file named by
    /// [`CONFIG_PATH_ENV`], if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the override file cannot be read, does not
    /// parse, or produces out-of-range values.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    /// Loads the embedded defaults with the file at `path` merged over them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse,
    /// or produces out-of-range values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading sync config override from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_override_str(&text)
    }

    /// Parses `text` as an override over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `text` does not parse or the merged
    /// values are out of range.
    pub fn from_override_str(text: &str) -> Result<Self, ConfigError> {
        parse_merged(Some(text))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("lookup_batch_size", self.lookup_batch_size),
            ("sub_chunk_size", self.sub_chunk_size),
            ("concurrency", self.concurrency),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        if self.default_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "default_limit must be greater than zero".to_string(),
            });
        }
        if self.price_tolerance.is_sign_negative() {
            return Err(ConfigError::Invalid {
                message: format!("price_tolerance {} is negative", self.price_tolerance),
            });
        }
        if self.price_tiers.channel_a == self.price_tiers.channel_b {
            return Err(ConfigError::Invalid {
                message: format!(
                    "price tiers for both channels are {}",
                    self.price_tiers.channel_a
                ),
            });
        }
        Ok(())
    }
}

fn parse_merged(override_text: Option<&str>) -> Result<SyncConfig, ConfigError> {
    let mut base: toml::Table = toml::de::from_str(DEFAULT_TOML)?;
    if let Some(text) = override_text {
        let overlay: toml::Table = toml::de::from_str(text)?;
        merge_tables(&mut base, overlay);
    }
    let config: SyncConfig = toml::Value::Table(base).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Deep-merges `overlay` into `base`. Nested tables merge key by key except
/// `channel_mapping`, whose variant tag makes partial merges meaningless.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming))
                if key != "channel_mapping" =>
            {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// ERP connection settings.
#[derive(Debug, Clone)]
pub struct ErpSettings {
    /// REST API base URL, without trailing slash.
    pub base_url: String,
    /// Static bearer token.
    pub token: String,
    /// Location whose stock is authoritative.
    pub location_id: String,
}

/// Storefront connection settings.
#[derive(Debug, Clone)]
pub struct StorefrontSettings {
    /// GraphQL admin endpoint.
    pub graphql_url: String,
    /// Admin access token.
    pub access_token: String,
}

/// Connection settings for both sides of the sync.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// ERP side.
    pub erp: ErpSettings,
    /// Storefront side.
    pub storefront: StorefrontSettings,
}

impl ConnectionSettings {
    /// Reads settings from `ERP_BASE_URL`, `ERP_TOKEN`, `ERP_LOCATION_ID`
    /// (default `"1"`), `STOREFRONT_GRAPHQL_URL` and
    /// `STOREFRONT_ACCESS_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] for the first required variable
    /// that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            erp: ErpSettings {
                base_url: required_env("ERP_BASE_URL")?
                    .trim_end_matches('/')
                    .to_string(),
                token: required_env("ERP_TOKEN")?,
                location_id: std::env::var("ERP_LOCATION_ID")
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| "1".to_string()),
            },
            storefront: StorefrontSettings {
                graphql_url: required_env("STOREFRONT_GRAPHQL_URL")?,
                access_token: required_env("STOREFRONT_ACCESS_TOKEN")?,
            },
        })
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv { name })
}
