//! Per-user model preference: store access and model resolution

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use log::{debug, trace, warn, error};

const PREFERENCES_TABLE: &str = "user_preferences";

/// Entry in the catalogue of models offered to users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo
{   pub id: &'static str
  , pub name: &'static str
  , pub description: &'static str
}

/// Models the gateway is known to serve; ids outside this list still pass through
pub fn known_models() -> &'static [ModelInfo]
{   const MODELS: &[ModelInfo] = &[
      ModelInfo
      {   id: "google/gemini-2.5-flash"
        , name: "Gemini 2.5 Flash"
        , description: "Balanced speed and quality - Best for most tasks"
      }
    , ModelInfo
      {   id: "google/gemini-2.5-pro"
        , name: "Gemini 2.5 Pro"
        , description: "Highest quality - Complex reasoning and analysis"
      }
    , ModelInfo
      {   id: "google/gemini-2.5-flash-lite"
        , name: "Gemini 2.5 Flash Lite"
        , description: "Fastest - Simple tasks and quick responses"
      }
    , ModelInfo
      {   id: "openai/gpt-5"
        , name: "GPT-5"
        , description: "Premium - Excellent for nuanced legal work"
      }
    , ModelInfo
      {   id: "openai/gpt-5-mini"
        , name: "GPT-5 Mini"
        , description: "Efficient - Good balance of speed and capability"
      }
    , ModelInfo
      {   id: "openai/gpt-5-nano"
        , name: "GPT-5 Nano"
        , description: "Economic - High-volume simple tasks"
      }
    ];
    MODELS
}

/// Narrow read/write interface to the external preference store
#[async_trait]
pub trait PreferenceStore: Send + Sync
{   /// `Ok(None)` when the user has no stored preference
    async fn get_preferred_model(&self, user_id: &str)
      -> Result<Option<String>, crate::error::Error>;

    /// Upsert keyed by user id; last write wins
    async fn set_preferred_model(&self, user_id: &str, model: &str)
      -> Result<(), crate::error::Error>;
}

// ===== REST store =====

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferenceRow
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>
  , preferred_model: Option<String>
}

/// PostgREST-style `user_preferences` table
pub struct RestPreferenceStore
{   base_url: String
  , api_key: String
  , http_client: reqwest::Client
}

impl RestPreferenceStore
{   pub fn new(config: &crate::config::StoreConfig, timeout: Duration)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating RestPreferenceStore");
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| {
            error!("Failed to build store client: {}", e);
            crate::error::Error::ConfigurationError(e.to_string())
          })?;
        Ok(RestPreferenceStore
        {   base_url: config.url.trim_end_matches('/').to_string()
          , api_key: config.api_key.clone()
          , http_client
        })
    }

    fn table_url(&self) -> String
    {   format!("{}/rest/v1/{}", self.base_url, PREFERENCES_TABLE)
    }

    fn store_error(e: impl std::fmt::Display) -> crate::error::Error
    {   crate::error::Error::PreferenceStore(e.to_string())
    }
}

#[async_trait]
impl PreferenceStore for RestPreferenceStore
{   async fn get_preferred_model(&self, user_id: &str)
      -> Result<Option<String>, crate::error::Error>
    {   trace!("Reading preferred_model for {}", user_id);
        let response = self.http_client
          .get(self.table_url())
          .query(&[
            ("user_id", format!("eq.{}", user_id))
          , ("select", "preferred_model".to_string())
          ])
          .header("apikey", &self.api_key)
          .header("Authorization", format!("Bearer {}", self.api_key))
          .send()
          .await
          .map_err(Self::store_error)?;

        let status = response.status();
        trace!("Preference read status: {}", status);
        if !status.is_success()
        {   return Err(Self::store_error(
              format!("preference read returned {}", status)
            ));
        }

        let rows: Vec<PreferenceRow> = response.json().await
          .map_err(Self::store_error)?;
        Ok(rows.into_iter()
          .next()
          .and_then(|row| row.preferred_model)
          .filter(|m| !m.trim().is_empty()))
    }

    async fn set_preferred_model(&self, user_id: &str, model: &str)
      -> Result<(), crate::error::Error>
    {   debug!("Upserting preferred_model for {}", user_id);
        let row = PreferenceRow
        {   user_id: Some(user_id.to_string())
          , preferred_model: Some(model.to_string())
        };
        let response = self.http_client
          .post(self.table_url())
          .query(&[("on_conflict", "user_id")])
          .header("apikey", &self.api_key)
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Prefer", "resolution=merge-duplicates")
          .json(&[row])
          .send()
          .await
          .map_err(Self::store_error)?;

        let status = response.status();
        if !status.is_success()
        {   error!("Preference upsert failed: {}", status);
            return Err(Self::store_error(
              format!("preference upsert returned {}", status)
            ));
        }
        Ok(())
    }
}

// ===== In-memory store =====

/// Process-local store, used when no external store is wired in
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferenceStore
{   rows: Arc<RwLock<HashMap<String, String>>>
}

impl MemoryPreferenceStore
{   pub fn new() -> Self
    {   MemoryPreferenceStore::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore
{   async fn get_preferred_model(&self, user_id: &str)
      -> Result<Option<String>, crate::error::Error>
    {   Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn set_preferred_model(&self, user_id: &str, model: &str)
      -> Result<(), crate::error::Error>
    {   self.rows.write().await
          .insert(user_id.to_string(), model.to_string());
        Ok(())
    }
}

// ===== Resolver =====

/// Picks the model for a run: override, then stored preference, then default
pub struct ModelResolver
{   store: Arc<dyn PreferenceStore>
  , default_model: String
}

impl ModelResolver
{   pub fn new(store: Arc<dyn PreferenceStore>, default_model: String)
      -> Self
    {   ModelResolver
        {   store
          , default_model
        }
    }

    /// Never fails; store errors degrade to the default model
    pub async fn resolve(
      &self
    , model_override: Option<&str>
    , user_id: &str
    ) -> String
    {   if let Some(model) = model_override
          .map(str::trim)
          .filter(|m| !m.is_empty())
        {   debug!("Using requested model: {}", model);
            return model.to_string();
        }

        match self.store.get_preferred_model(user_id).await
        {   Ok(Some(model)) => {
              debug!("Using stored preference for {}: {}", user_id, model);
              model
            }
          , Ok(None) => {
              debug!("No stored preference for {}", user_id);
              self.default_model.clone()
            }
          , Err(e) => {
              warn!("Preference lookup failed, using default: {}", e);
              self.default_model.clone()
            }
        }
    }

    /// Save a user's preferred model
    pub async fn save(&self, user_id: &str, model: &str)
      -> Result<(), crate::error::Error>
    {   let model = model.trim();
        if model.is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              "model identifier is empty".to_string()
            ));
        }
        self.store.set_preferred_model(user_id, model).await
    }

    /// The stored preference, or the default when none applies
    pub async fn current(&self, user_id: &str) -> String
    {   self.resolve(None, user_id).await
    }
}
