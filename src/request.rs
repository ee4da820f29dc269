//! Task, prompt and reply types shared by every orchestration stage

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===== Caller =====

/// Identity of whoever issued the request, resolved upstream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Caller
{   pub user_id: Option<String>
}

impl Caller
{   pub fn authenticated(user_id: impl Into<String>) -> Self
    {   Caller
        {   user_id: Some(user_id.into())
        }
    }

    pub fn anonymous() -> Self
    {   Caller::default()
    }

    /// The caller's identity, if it is usable
    pub fn identity(&self) -> Option<&str>
    {   self.user_id.as_deref()
          .map(str::trim)
          .filter(|id| !id.is_empty())
    }
}

// ===== Task parameters =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchParams
{   pub query: String
  , #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String
  , #[serde(default = "default_practice_area")]
    pub practice_area: String
  , #[serde(default = "default_citation_style")]
    pub citation_style: String
  , #[serde(default = "default_format")]
    pub format: String
}

fn default_jurisdiction() -> String { "california".to_string() }
fn default_practice_area() -> String { "contract".to_string() }
fn default_citation_style() -> String { "bluebook".to_string() }
fn default_format() -> String { "irac".to_string() }

/// Document analysis sub-mode; unknown names are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisType
{   Summarize
  , Clauses
  , Risk
  , Compare
  , Other(String)
}

impl From<String> for AnalysisType
{   fn from(s: String) -> Self
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "summarize" => AnalysisType::Summarize
          , "clauses" => AnalysisType::Clauses
          , "risk" => AnalysisType::Risk
          , "compare" => AnalysisType::Compare
          , _ => AnalysisType::Other(s)
        }
    }
}

impl From<AnalysisType> for String
{   fn from(t: AnalysisType) -> Self
    {   t.as_str().to_string()
    }
}

impl AnalysisType
{   pub fn as_str(&self) -> &str
    {   match self
        {   AnalysisType::Summarize => "summarize"
          , AnalysisType::Clauses => "clauses"
          , AnalysisType::Risk => "risk"
          , AnalysisType::Compare => "compare"
          , AnalysisType::Other(name) => name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParams
{   pub document_text: String
  , pub analysis_type: AnalysisType
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftingParams
{   pub prompt: String
  , pub template: String
  , pub style: String
  , pub length: String
  , pub jurisdiction: String
}

/// Kind-specific parameters; the variant is the task kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters", rename_all = "kebab-case")]
pub enum TaskParams
{   Research(ResearchParams)
  , DocumentAnalysis(AnalysisParams)
  , Drafting(DraftingParams)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind
{   Research
  , DocumentAnalysis
  , Drafting
}

/// One user action; built once and never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest
{   #[serde(flatten)]
    pub params: TaskParams
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>
}

impl TaskRequest
{   pub fn research(params: ResearchParams) -> Self
    {   TaskRequest
        {   params: TaskParams::Research(params)
          , model_override: None
        }
    }

    pub fn analysis(params: AnalysisParams) -> Self
    {   TaskRequest
        {   params: TaskParams::DocumentAnalysis(params)
          , model_override: None
        }
    }

    pub fn drafting(params: DraftingParams) -> Self
    {   TaskRequest
        {   params: TaskParams::Drafting(params)
          , model_override: None
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self
    {   self.model_override = Some(model.into());
        self
    }

    pub fn kind(&self) -> TaskKind
    {   match self.params
        {   TaskParams::Research(_) => TaskKind::Research
          , TaskParams::DocumentAnalysis(_) => TaskKind::DocumentAnalysis
          , TaskParams::Drafting(_) => TaskKind::Drafting
        }
    }
}

// ===== Prompt and gateway payloads =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair
{   pub system_prompt: String
  , pub user_prompt: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

/// Body of one chat-completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: usize
}

pub const TEMPERATURE: f32 = 0.3;
pub const MAX_TOKENS: usize = 4000;

impl GatewayRequest
{   /// System message first, then the user message
    pub fn new(model: String, prompts: PromptPair) -> Self
    {   GatewayRequest
        {   model
          , messages: vec![
              ChatMessage
              {   role: "system".to_string()
                , content: prompts.system_prompt
              }
            , ChatMessage
              {   role: "user".to_string()
                , content: prompts.user_prompt
              }
            ]
          , temperature: TEMPERATURE
          , max_tokens: MAX_TOKENS
        }
    }

    pub fn system_prompt(&self) -> Option<&str>
    {   self.messages.iter()
          .find(|m| m.role == "system")
          .map(|m| m.content.as_str())
    }
}

/// Generated text or the classified failure of one gateway call
pub type GatewayResult = Result<String, crate::error::Error>;

// ===== Replies =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResponse
{   pub content: String
  , pub metadata: BTreeMap<String, String>
}

/// Inbound reply: `{content, metadata}` or `{error, status}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskReply
{   Content(NormalizedResponse)
  , Error
    {   error: String
      , status: u16
    }
}

impl From<Result<NormalizedResponse, crate::error::Error>> for TaskReply
{   fn from(result: Result<NormalizedResponse, crate::error::Error>)
      -> Self
    {   match result
        {   Ok(response) => TaskReply::Content(response)
          , Err(e) => TaskReply::Error
            {   error: e.user_message()
              , status: e.http_status()
            }
        }
    }
}
