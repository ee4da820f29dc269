use std::fmt;

/// Error type for orchestration runs
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Caller identity missing or not authenticated
    Unauthorized
  , /// Gateway answered 429
    RateLimited
  , /// Gateway answered 402
    PaymentRequired
  , /// Gateway answered any other non-success status
    GatewayError
    {   status: u16
      , message: String
    }
  , /// Missing credential or store parameters at startup
    ConfigurationError(String)
  , /// Success status but no extractable completion
    MalformedResponse(String)
  , /// Transport failure before a status was received
    HttpError(String)
  , /// Gateway did not answer before the deadline
    Timeout
  , /// Preference store read/write failure
    PreferenceStore(String)
  , /// Payload rejected before any external call
    InvalidRequest(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Message shown to the end user, one per failure kind
    pub fn user_message(&self) -> String
    {   match self
        {   Error::Unauthorized => {
              "Unauthorized. Please sign in and try again.".to_string()
            }
          , Error::RateLimited => {
              "Rate limit exceeded. Please try again shortly."
                .to_string()
            }
          , Error::PaymentRequired => {
              "Payment required. Please add credits to your AI gateway workspace."
                .to_string()
            }
          , Error::GatewayError { status, .. } => {
              format!("AI gateway error: {}", status)
            }
          , Error::ConfigurationError(msg) => {
              format!("Service is not configured: {}", msg)
            }
          , Error::MalformedResponse(_) => {
              "The AI gateway returned a response with no usable content."
                .to_string()
            }
          , Error::HttpError(_) => {
              "Could not reach the AI gateway. Please try again."
                .to_string()
            }
          , Error::Timeout => {
              "The AI gateway did not respond in time. Please try again."
                .to_string()
            }
          , Error::PreferenceStore(_) => {
              "Failed to save model preference.".to_string()
            }
          , Error::InvalidRequest(msg) => {
              format!("Invalid request: {}", msg)
            }
          , Error::Other(msg) => msg.clone()
        }
    }

    /// Status code carried by the inbound error reply
    pub fn http_status(&self) -> u16
    {   match self
        {   Error::Unauthorized => 401
          , Error::RateLimited => 429
          , Error::PaymentRequired => 402
          , Error::GatewayError { .. }
          | Error::MalformedResponse(_)
          | Error::HttpError(_) => 502
          , Error::Timeout => 504
          , Error::InvalidRequest(_) => 400
          , Error::ConfigurationError(_)
          | Error::PreferenceStore(_)
          | Error::Other(_) => 500
        }
    }

    /// Whether a caller may reasonably retry the whole run
    pub fn is_transient(&self) -> bool
    {   match self
        {   Error::RateLimited
          | Error::Timeout
          | Error::HttpError(_) => true
          , Error::GatewayError { status, .. } => *status >= 500
          , _ => false
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Unauthorized => {
              write!(f, "Unauthorized")
            }
          , Error::RateLimited => {
              write!(f, "rate limit exceeded, retry later")
            }
          , Error::PaymentRequired => {
              write!(f, "insufficient credits")
            }
          , Error::GatewayError { status, message } => {
              write!(f, "AI gateway error {}: {}", status, message)
            }
          , Error::ConfigurationError(msg) => {
              write!(f, "Configuration error: {}", msg)
            }
          , Error::MalformedResponse(msg) => {
              write!(f, "Malformed gateway response: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::PreferenceStore(msg) => {
              write!(f, "Preference store error: {}", msg)
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
