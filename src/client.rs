use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::AssistFoot;

/// Public API for the assistant backend - owns the task
pub struct AssistBackend
{   hand: crate::AssistHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl AssistBackend
{   /// Create and spawn a new backend
    /// Returns immediately - spawns background task
    pub fn new(orchestrator: crate::Orchestrator) -> Self
    {   debug!("Creating AssistBackend with task ownership");

        let (run_task_tx, run_task_rx)
          = mpsc::unbounded_channel();
        let (set_preference_tx, set_preference_rx)
          = mpsc::unbounded_channel();
        let (get_preference_tx, get_preference_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AssistHand
        {   run_task_tx
          , set_preference_tx
          , get_preference_tx
          , kill_process_tx
        };

        let foot = crate::AssistFoot
        {   run_task_rx
          , set_preference_rx
          , get_preference_rx
          , kill_process_rx
        };

        let orchestrator = Arc::new(orchestrator);
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, orchestrator).await
        });

        AssistBackend
        {   hand
          , _task_handle
        }
    }

    fn disconnected() -> crate::error::Error
    {   error!("Backend channel closed");
        crate::error::Error::Other(
          "Backend disconnected".to_string()
        )
    }

    /// Queue any task - returns almost immediately
    pub async fn run_task(
      &self
    , caller: crate::Caller
    , request: crate::TaskRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RunTaskReply>,
        crate::error::Error
      >
    {   debug!("run_task queuing {:?} command", request.kind());
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::RunTaskArgs
        {   caller
          , request
          , reply: reply_tx
        };

        self.hand.run_task_tx
          .send(cmd)
          .map_err(|_| Self::disconnected())?;

        Ok(reply_rx)
    }

    /// Queue a legal research question
    pub async fn research(
      &self
    , caller: crate::Caller
    , params: crate::ResearchParams
    , model_override: Option<String>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RunTaskReply>,
        crate::error::Error
      >
    {   let mut request = crate::TaskRequest::research(params);
        request.model_override = model_override;
        self.run_task(caller, request).await
    }

    /// Queue a document analysis
    pub async fn analyze(
      &self
    , caller: crate::Caller
    , params: crate::AnalysisParams
    , model_override: Option<String>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RunTaskReply>,
        crate::error::Error
      >
    {   let mut request = crate::TaskRequest::analysis(params);
        request.model_override = model_override;
        self.run_task(caller, request).await
    }

    /// Queue a drafting request
    pub async fn draft(
      &self
    , caller: crate::Caller
    , params: crate::DraftingParams
    , model_override: Option<String>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RunTaskReply>,
        crate::error::Error
      >
    {   let mut request = crate::TaskRequest::drafting(params);
        request.model_override = model_override;
        self.run_task(caller, request).await
    }

    /// Save the caller's preferred model - returns almost immediately
    pub async fn set_preference(
      &self
    , caller: crate::Caller
    , model: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SetPreferenceReply>,
        crate::error::Error
      >
    {   debug!("set_preference queuing model: {}", model);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SetPreferenceArgs
        {   caller
          , model
          , reply: reply_tx
        };

        self.hand.set_preference_tx
          .send(cmd)
          .map_err(|_| Self::disconnected())?;

        Ok(reply_rx)
    }

    /// Look up the model the caller's runs default to
    pub async fn get_preference(
      &self
    , caller: crate::Caller
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetPreferenceReply>,
        crate::error::Error
      >
    {   debug!("get_preference queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GetPreferenceArgs
        {   caller
          , reply: reply_tx
        };

        self.hand.get_preference_tx
          .send(cmd)
          .map_err(|_| Self::disconnected())?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down AssistBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes: each command is moved into its own task so
/// a slow gateway call never holds up the loop or another run.
async fn run_backend_loop(
  foot: crate::AssistFoot
, orchestrator: Arc<crate::Orchestrator>
)
{   debug!("Starting AssistBackend event loop");
    let AssistFoot
    {   mut run_task_rx
      , mut set_preference_rx
      , mut get_preference_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = run_task_rx.recv() => {
          debug!("Received RunTask: {:?}", cmd.request.kind());
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let outcome = orchestrator
              .run(&cmd.caller, &cmd.request)
              .await;
            let _ = cmd.reply.send(outcome);
          });
        }
      , Some(cmd) = set_preference_rx.recv() => {
          debug!("Received SetPreference");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let result = orchestrator
              .save_preference(&cmd.caller, &cmd.model)
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = get_preference_rx.recv() => {
          debug!("Received GetPreference");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let result = orchestrator
              .current_model(&cmd.caller)
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("AssistBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
