pub mod error;
pub mod config;
pub mod request;
pub mod prompts;
pub mod preference;
pub mod providers;
pub mod normalize;
pub mod orchestrator;
pub mod failover;
pub mod client;

pub use client::AssistBackend;
pub use orchestrator::{Orchestrator, Outcome};
pub use request::{
  AnalysisParams, AnalysisType, Caller, DraftingParams, ResearchParams,
  TaskKind, TaskReply, TaskRequest,
};

/*

lexassist: AI request orchestration for the legal assistant.

Every user action (research question, document analysis, drafting
request) becomes one TaskRequest and one run:

  caller -> Orchestrator -> { ModelResolver, prompts::select }
         -> CompletionGateway -> normalize -> caller

A run is stateless and bounded by exactly one gateway call. The only
shared resource is the preference store.

*/

/// LEXASSIST BACKEND INTERFACE:

// ===== RunTask =====

pub type RunTaskReply = Outcome;
pub type RunTaskReplySender
  = tokio::sync::mpsc::UnboundedSender<RunTaskReply>;

pub struct RunTaskArgs
{   pub caller: Caller
  , pub request: TaskRequest
  , pub reply: RunTaskReplySender
}

// ===== SetPreference =====

pub type SetPreferenceReply = Result<(), crate::error::Error>;
pub type SetPreferenceReplySender
  = tokio::sync::mpsc::UnboundedSender<SetPreferenceReply>;

pub struct SetPreferenceArgs
{   pub caller: Caller
  , pub model: String
  , pub reply: SetPreferenceReplySender
}

// ===== GetPreference =====

pub type GetPreferenceReply = Result<String, crate::error::Error>;
pub type GetPreferenceReplySender
  = tokio::sync::mpsc::UnboundedSender<GetPreferenceReply>;

pub struct GetPreferenceArgs
{   pub caller: Caller
  , pub reply: GetPreferenceReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== AssistHand (sender side) =====

pub struct AssistHand
{   pub run_task_tx
      : tokio::sync::mpsc::UnboundedSender<RunTaskArgs>
  , pub set_preference_tx
      : tokio::sync::mpsc::UnboundedSender<SetPreferenceArgs>
  , pub get_preference_tx
      : tokio::sync::mpsc::UnboundedSender<GetPreferenceArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== AssistFoot (receiver side) =====

pub struct AssistFoot
{   pub run_task_rx
      : tokio::sync::mpsc::UnboundedReceiver<RunTaskArgs>
  , pub set_preference_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetPreferenceArgs>
  , pub get_preference_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetPreferenceArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
