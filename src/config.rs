//! Configuration for the gateway, the preference store and retries

use serde::{Deserialize, Serialize};
use std::path::Path;
use log::{debug, error};

pub const DEFAULT_GATEWAY_URL: &str
  = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_GATEWAY_KEY: &str = "LEXASSIST_GATEWAY_API_KEY";
const ENV_GATEWAY_URL: &str = "LEXASSIST_GATEWAY_URL";
const ENV_GATEWAY_TIMEOUT: &str = "LEXASSIST_GATEWAY_TIMEOUT_SECS";
const ENV_DEFAULT_MODEL: &str = "LEXASSIST_DEFAULT_MODEL";
const ENV_STORE_URL: &str = "LEXASSIST_STORE_URL";
const ENV_STORE_KEY: &str = "LEXASSIST_STORE_KEY";

fn default_gateway_url() -> String
{   DEFAULT_GATEWAY_URL.to_string()
}

fn default_model() -> String
{   DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64
{   DEFAULT_TIMEOUT_SECS
}

/// Completion gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig
{   /// Bearer credential for the gateway
    pub api_key: String
  , /// API base URL, `/chat/completions` is appended
    #[serde(default = "default_gateway_url")]
    pub api_base: String
  , /// Deadline for one completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64
  , /// Model used when neither override nor preference applies
    #[serde(default = "default_model")]
    pub default_model: String
}

/// Preference store connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig
{   pub url: String
  , pub api_key: String
}

/// Caller-side retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig
{   /// Enable retrying transient failures around a run
    pub enabled: bool
  , /// Max retry attempts per run
    pub max_retries: usize
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f32
  , /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   enabled: false
          , max_retries: 0
          , backoff_multiplier: 2.0
          , initial_backoff_ms: 500
        }
    }
}

/// Full configuration, passed explicitly into the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig
{   pub gateway: GatewayConfig
  , pub store: StoreConfig
  , #[serde(default)]
    pub retry: RetryConfig
}

impl AssistConfig
{   /// Build from process environment; fails when a required value is absent
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   debug!("Loading configuration from environment");
        let required = |name: &str| {
          std::env::var(name).map_err(|_| {
            error!("{} is not configured", name);
            crate::error::Error::ConfigurationError(
              format!("{} is not configured", name)
            )
          })
        };

        let timeout_secs = match std::env::var(ENV_GATEWAY_TIMEOUT)
        {   Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
              crate::error::Error::ConfigurationError(
                format!("{} must be a whole number of seconds", ENV_GATEWAY_TIMEOUT)
              )
            })?
          , Err(_) => DEFAULT_TIMEOUT_SECS
        };

        let config = AssistConfig
        {   gateway: GatewayConfig
            {   api_key: required(ENV_GATEWAY_KEY)?
              , api_base: std::env::var(ENV_GATEWAY_URL)
                  .unwrap_or_else(|_| default_gateway_url())
              , timeout_secs
              , default_model: std::env::var(ENV_DEFAULT_MODEL)
                  .unwrap_or_else(|_| default_model())
            }
          , store: StoreConfig
            {   url: required(ENV_STORE_URL)?
              , api_key: required(ENV_STORE_KEY)?
            }
          , retry: RetryConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: &Path)
      -> Result<Self, crate::error::Error>
    {   debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::ConfigurationError(
            format!("cannot read {}: {}", path.display(), e)
          )
        })?;
        let config: AssistConfig = serde_json::from_str(&raw)
          .map_err(|e| {
            crate::error::Error::ConfigurationError(
              format!("cannot parse {}: {}", path.display(), e)
            )
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot serve any request
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   let checks = [
          (self.gateway.api_key.trim().is_empty(), "gateway api_key")
        , (self.gateway.api_base.trim().is_empty(), "gateway api_base")
        , (self.gateway.default_model.trim().is_empty(), "gateway default_model")
        , (self.gateway.timeout_secs == 0, "gateway timeout_secs")
        , (self.store.url.trim().is_empty(), "store url")
        , (self.store.api_key.trim().is_empty(), "store api_key")
        ];
        for (missing, name) in checks
        {   if missing
            {   error!("Invalid configuration: {}", name);
                return Err(crate::error::Error::ConfigurationError(
                  format!("{} is missing or empty", name)
                ));
            }
        }
        Ok(())
    }
}
