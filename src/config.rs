//! Process configuration, read once at startup.
//!
//! Every key maps to an upper-case environment variable of the same name
//! (`connect_string` <- `CONNECT_STRING`). The connection string, the proxy
//! switch and the five webhook secrets are required; everything under
//! [`Settings`] falls back to its default.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::FixedOffset;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::error::ExplError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connect_string: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub use_proxy_headers: bool,
    #[serde(flatten)]
    pub secrets: WebhookSecrets,
    #[serde(flatten)]
    pub settings: Settings,
}

/// One shared secret per webhook operation.
#[derive(Clone, Deserialize)]
pub struct WebhookSecrets {
    #[serde(rename = "webhook_token_add")]
    pub add: String,
    #[serde(rename = "webhook_token_expl")]
    pub expl: String,
    #[serde(rename = "webhook_token_del")]
    pub del: String,
    #[serde(rename = "webhook_token_find")]
    pub find: String,
    #[serde(rename = "webhook_token_top")]
    pub top: String,
}

/// Secrets are compared byte for byte, so their variables bypass the value
/// parsing of the `Env` provider (`007` must not become `7`).
const SECRET_VARS: [&str; 5] = [
    "WEBHOOK_TOKEN_ADD",
    "WEBHOOK_TOKEN_EXPL",
    "WEBHOOK_TOKEN_DEL",
    "WEBHOOK_TOKEN_FIND",
    "WEBHOOK_TOKEN_TOP",
];

impl WebhookSecrets {
    /// The secret variables that are set, keyed like the `Env` provider keys
    /// them, values untouched.
    fn from_env() -> BTreeMap<String, String> {
        SECRET_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| (name.to_ascii_lowercase(), value))
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ExplError> {
        let secrets = [&self.add, &self.expl, &self.del, &self.find, &self.top];
        match SECRET_VARS
            .into_iter()
            .zip(secrets)
            .find(|(_, secret)| secret.is_empty())
        {
            Some((name, _)) => Err(ExplError::InvalidConfig(format!("{name} must not be empty"))),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecrets { .. }")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub loglevel: String,
    /// Prefix for minted links, e.g. `https://expl.example.org`. Empty keeps
    /// links relative.
    pub public_url: String,
    pub handler_timeout_secs: u64,
    /// Limits are counted in UTF-16 code units.
    pub max_key_length: usize,
    pub max_value_length: usize,
    pub max_expl_count: usize,
    pub max_find_count: usize,
    pub max_top_count: usize,
    pub expl_token_validity_secs: u64,
    pub find_token_validity_secs: u64,
    pub time_format: String,
    pub utc_offset_minutes: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            public_url: String::new(),
            handler_timeout_secs: 10,
            max_key_length: 50,
            max_value_length: 500,
            max_expl_count: 5,
            max_find_count: 5,
            max_top_count: 10,
            expl_token_validity_secs: 24 * 60 * 60,
            find_token_validity_secs: 60 * 60,
            time_format: "%Y-%m-%d %H:%M".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl Settings {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    pub fn expl_token_validity(&self) -> Duration {
        Duration::from_secs(self.expl_token_validity_secs)
    }

    pub fn find_token_validity(&self) -> Duration {
        Duration::from_secs(self.find_token_validity_secs)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ExplError> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            ExplError::InvalidConfig(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn load() -> Result<Self, ExplError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Settings::default()))
                .merge(Env::raw().ignore(&SECRET_VARS))
                .merge(Serialized::defaults(WebhookSecrets::from_env())),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ExplError> {
        let config: Self = figment.extract()?;
        config.secrets.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

/// Accepts `true`/`false`, `1`/`0`, `t`/`f` in any case.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => Ok(b),
        Scalar::Int(1) | Scalar::UInt(1) => Ok(true),
        Scalar::Int(0) | Scalar::UInt(0) => Ok(false),
        Scalar::Str(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(D::Error::custom(format!("cannot convert to bool: {s}"))),
        },
        _ => Err(D::Error::custom("cannot convert to bool")),
    }
}
