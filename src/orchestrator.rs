//! Request orchestration: one independent run per task
//!
//! A run is `Pending` while its future is in flight and resolves to exactly
//! one [`Outcome`]. Nothing is cached between runs.

use std::sync::Arc;
use std::time::Duration;
use log::{debug, info, error};

use crate::preference::{ModelResolver, PreferenceStore, RestPreferenceStore};
use crate::providers::{CompletionGateway, HttpGateway};
use crate::request::{Caller, GatewayRequest, NormalizedResponse, TaskReply, TaskRequest};

/// Terminal state of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome
{   Completed(NormalizedResponse)
  , Failed(crate::error::Error)
}

impl Outcome
{   pub fn into_result(self)
      -> Result<NormalizedResponse, crate::error::Error>
    {   match self
        {   Outcome::Completed(response) => Ok(response)
          , Outcome::Failed(e) => Err(e)
        }
    }

    pub fn is_completed(&self) -> bool
    {   matches!(self, Outcome::Completed(_))
    }
}

impl From<Outcome> for TaskReply
{   fn from(outcome: Outcome) -> Self
    {   TaskReply::from(outcome.into_result())
    }
}

pub struct Orchestrator
{   gateway: Arc<dyn CompletionGateway>
  , resolver: ModelResolver
}

impl Orchestrator
{   pub fn new(
      gateway: Arc<dyn CompletionGateway>
    , resolver: ModelResolver
    ) -> Self
    {   Orchestrator
        {   gateway
          , resolver
        }
    }

    /// Wire the HTTP gateway and REST store from a validated config
    pub fn from_config(config: &crate::config::AssistConfig)
      -> Result<Self, crate::error::Error>
    {   config.validate()?;
        let gateway = HttpGateway::new(&config.gateway)?;
        let store = RestPreferenceStore::new(
          &config.store
        , Duration::from_secs(config.gateway.timeout_secs)
        )?;
        Ok(Orchestrator::with_store(
          Arc::new(gateway)
        , Arc::new(store)
        , config.gateway.default_model.clone()
        ))
    }

    pub fn with_store(
      gateway: Arc<dyn CompletionGateway>
    , store: Arc<dyn PreferenceStore>
    , default_model: String
    ) -> Self
    {   Orchestrator::new(gateway, ModelResolver::new(store, default_model))
    }

    /// Build the exact gateway call a run would make
    pub async fn prepare(&self, caller: &Caller, request: &TaskRequest)
      -> Result<GatewayRequest, crate::error::Error>
    {   let user_id = caller.identity()
          .ok_or(crate::error::Error::Unauthorized)?;
        let model = self.resolver
          .resolve(request.model_override.as_deref(), user_id)
          .await;
        let prompts = crate::prompts::select(request);
        Ok(GatewayRequest::new(model, prompts))
    }

    /// Execute one task end to end
    pub async fn run(&self, caller: &Caller, request: &TaskRequest)
      -> Outcome
    {   let gateway_request = match self.prepare(caller, request).await
        {   Ok(r) => r
          , Err(e) => {
              error!("Rejecting {:?} request: {}", request.kind(), e);
              return Outcome::Failed(e);
            }
        };
        info!(
          "Running {:?} task with model: {}",
          request.kind(), gateway_request.model
        );

        let metadata = crate::normalize::metadata_for(
          request
        , &gateway_request.model
        );
        let result = self.gateway.complete(&gateway_request).await;

        match crate::normalize::normalize(result, metadata)
        {   Ok(response) => {
              debug!("{:?} task completed", request.kind());
              Outcome::Completed(response)
            }
          , Err(e) => {
              error!("{:?} task failed: {}", request.kind(), e);
              Outcome::Failed(e)
            }
        }
    }

    /// Store the caller's preferred model
    pub async fn save_preference(&self, caller: &Caller, model: &str)
      -> Result<(), crate::error::Error>
    {   let user_id = caller.identity()
          .ok_or(crate::error::Error::Unauthorized)?;
        self.resolver.save(user_id, model).await
    }

    /// Model a run without override would use for this caller
    pub async fn current_model(&self, caller: &Caller)
      -> Result<String, crate::error::Error>
    {   let user_id = caller.identity()
          .ok_or(crate::error::Error::Unauthorized)?;
        Ok(self.resolver.current(user_id).await)
    }
}
