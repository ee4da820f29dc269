use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use log::{debug, trace, error};

use crate::request::{GatewayRequest, GatewayResult};

// ===== Response envelope =====

// Only choices[0].message.content is read; every other field may be absent
// or of any shape.

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub choices: Vec<serde_json::Value>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: Option<ResponseMessage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

/// One chat-completion call against the external gateway
#[async_trait]
pub trait CompletionGateway: Send + Sync
{   async fn complete(&self, request: &GatewayRequest) -> GatewayResult;
}

/// Map a non-success status to its failure kind
pub fn classify_status(status: u16, body: &str) -> crate::error::Error
{   match status
    {   429 => crate::error::Error::RateLimited
      , 402 => crate::error::Error::PaymentRequired
      , _ => crate::error::Error::GatewayError
        {   status
          , message: body.to_string()
        }
    }
}

/// Pull the first choice's text out of a success body
pub fn extract_completion(body: &str) -> GatewayResult
{   let response: ChatCompletionResponse = serde_json::from_str(body)
      .map_err(|e| {
        error!("Parse error: {}", e);
        crate::error::Error::MalformedResponse(e.to_string())
      })?;

    response.choices.into_iter()
      .next()
      .and_then(|c| serde_json::from_value::<Choice>(c).ok())
      .and_then(|c| c.message)
      .and_then(|m| m.content)
      .filter(|text| !text.trim().is_empty())
      .ok_or_else(|| {
        error!("No completion content in response");
        crate::error::Error::MalformedResponse(
          "response contained no completion content".to_string()
        )
      })
}

/// HTTPS gateway client; holds no per-request state
pub struct HttpGateway
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl HttpGateway
{   pub fn new(config: &crate::config::GatewayConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating HttpGateway for {}", config.api_base);
        if config.api_key.trim().is_empty()
        {   return Err(crate::error::Error::ConfigurationError(
              "gateway api_key is not configured".to_string()
            ));
        }
        if config.timeout_secs == 0
        {   return Err(crate::error::Error::ConfigurationError(
              "gateway timeout_secs must be greater than zero".to_string()
            ));
        }
        let http_client = reqwest::Client::builder()
          .timeout(Duration::from_secs(config.timeout_secs))
          .build()
          .map_err(|e| {
            error!("Failed to build gateway client: {}", e);
            crate::error::Error::ConfigurationError(e.to_string())
          })?;
        Ok(HttpGateway
        {   api_key: config.api_key.clone()
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , http_client
        })
    }

    fn endpoint(&self) -> String
    {   format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl CompletionGateway for HttpGateway
{   async fn complete(&self, request: &GatewayRequest) -> GatewayResult
    {   debug!("Sending completion request for: {}", request.model);
        trace!(
          "Gateway request: model={} messages={} max_tokens={}",
          request.model, request.messages.len(), request.max_tokens
        );

        let response = self.http_client
          .post(self.endpoint())
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            if e.is_timeout()
            {   error!("Gateway timed out");
                crate::error::Error::Timeout
            } else
            {   error!("HTTP error: {}", e);
                crate::error::Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Gateway response status: {}", status);

        let body = response.text().await.map_err(|e| {
          if e.is_timeout()
          {   crate::error::Error::Timeout
          } else
          {   crate::error::Error::HttpError(e.to_string())
          }
        })?;

        if !status.is_success()
        {   let failure = classify_status(status.as_u16(), &body);
            error!("Gateway returned {}: {}", status, failure);
            return Err(failure);
        }

        extract_completion(&body)
    }
}
