use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use tokio_test::{assert_err, assert_ok};

use lexassist::config::{GatewayConfig, StoreConfig};
use lexassist::error::Error;
use lexassist::preference::{
  MemoryPreferenceStore, PreferenceStore, RestPreferenceStore,
};
use lexassist::providers::{CompletionGateway, HttpGateway};
use lexassist::request::{GatewayRequest, GatewayResult};
use lexassist::{
  AnalysisParams, AnalysisType, AssistBackend, Caller, DraftingParams,
  Orchestrator, Outcome, ResearchParams, TaskRequest,
};

const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Gateway double that records every call
struct MockGateway
{   result: GatewayResult
  , calls: AtomicUsize
  , last_request: Mutex<Option<GatewayRequest>>
  , gate: Option<Arc<Barrier>>
}

impl MockGateway
{   fn new(result: GatewayResult) -> Arc<Self>
    {   Arc::new(MockGateway
        {   result
          , calls: AtomicUsize::new(0)
          , last_request: Mutex::new(None)
          , gate: None
        })
    }

    /// Every call blocks until `parties` calls are in flight together
    fn gated(result: GatewayResult, parties: usize) -> Arc<Self>
    {   Arc::new(MockGateway
        {   result
          , calls: AtomicUsize::new(0)
          , last_request: Mutex::new(None)
          , gate: Some(Arc::new(Barrier::new(parties)))
        })
    }

    fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> GatewayRequest
    {   self.last_request.lock().unwrap().clone()
          .expect("gateway was never called")
    }
}

#[async_trait]
impl CompletionGateway for MockGateway
{   async fn complete(&self, request: &GatewayRequest) -> GatewayResult
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(gate) = &self.gate
        {   gate.wait().await;
        }
        self.result.clone()
    }
}

fn orchestrator_with(
  gateway: Arc<MockGateway>
, store: MemoryPreferenceStore
) -> Orchestrator
{   Orchestrator::with_store(gateway, Arc::new(store), DEFAULT_MODEL.to_string())
}

fn research_request() -> TaskRequest
{   TaskRequest::research(ResearchParams
    {   query: "What are the elements of breach of contract under California law?"
          .to_string()
      , jurisdiction: "california".to_string()
      , practice_area: "contract".to_string()
      , citation_style: "bluebook".to_string()
      , format: "irac".to_string()
    })
}

fn drafting_request() -> TaskRequest
{   TaskRequest::drafting(DraftingParams
    {   prompt: "Draft a mutual NDA...".to_string()
      , template: "nda".to_string()
      , style: "formal".to_string()
      , length: "medium".to_string()
      , jurisdiction: "california".to_string()
    })
}

/// Serve exactly one HTTP response on a local port; yields the raw request
async fn one_shot_server(status: u16, body: &str)
  -> (String, tokio::task::JoinHandle<String>)
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let request = read_request(&mut socket).await;
      let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status, body.len(), body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
      request
    });
    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String
{   let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop
    {   let n = socket.read(&mut chunk).await.unwrap();
        if n == 0
        {   break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n")
        {   let length = text[..end]
              .lines()
              .find_map(|l| {
                let lower = l.to_ascii_lowercase();
                lower.strip_prefix("content-length:")
                  .map(|v| v.trim().parse::<usize>().unwrap_or(0))
              })
              .unwrap_or(0);
            if buf.len() >= end + 4 + length
            {   break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn gateway_config(api_base: String, timeout_secs: u64) -> GatewayConfig
{   GatewayConfig
    {   api_key: "test-key".to_string()
      , api_base
      , timeout_secs
      , default_model: DEFAULT_MODEL.to_string()
    }
}

fn sample_gateway_request() -> GatewayRequest
{   GatewayRequest::new(
      DEFAULT_MODEL.to_string()
    , lexassist::prompts::select(&research_request())
    )
}

// ===== Orchestration scenarios =====

#[tokio::test]
async fn research_run_completes_with_gateway_text()
{   let gateway = MockGateway::new(Ok("ISSUE: ...".to_string()));
    let orchestrator = orchestrator_with(gateway.clone(), MemoryPreferenceStore::new());

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &research_request())
      .await;

    let response = assert_ok!(outcome.into_result());
    assert_eq!(response.content, "ISSUE: ...");
    assert_eq!(response.metadata["model"], DEFAULT_MODEL);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn rate_limited_gateway_fails_run()
{   let gateway = MockGateway::new(Err(Error::RateLimited));
    let orchestrator = orchestrator_with(gateway.clone(), MemoryPreferenceStore::new());

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &research_request())
      .await;

    assert_eq!(outcome, Outcome::Failed(Error::RateLimited));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn drafting_system_prompt_carries_parameters()
{   let gateway = MockGateway::new(Ok("MUTUAL NONDISCLOSURE AGREEMENT".to_string()));
    let orchestrator = orchestrator_with(gateway.clone(), MemoryPreferenceStore::new());

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &drafting_request())
      .await;
    assert!(outcome.is_completed());

    let sent = gateway.last_request();
    let system = sent.system_prompt().unwrap();
    for needle in ["nda", "formal", "medium", "california"]
    {   assert!(system.contains(needle), "system prompt lacks {}", needle);
    }
    assert_eq!(sent.messages[1].content, "Draft a mutual NDA...");
    assert_eq!(sent.max_tokens, 4000);
}

#[tokio::test]
async fn unauthenticated_caller_never_reaches_gateway()
{   let gateway = MockGateway::new(Ok("unused".to_string()));
    let orchestrator = orchestrator_with(gateway.clone(), MemoryPreferenceStore::new());

    for caller in [Caller::anonymous(), Caller::authenticated("")]
    {   let outcome = orchestrator.run(&caller, &research_request()).await;
        assert_eq!(outcome, Outcome::Failed(Error::Unauthorized));
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn stored_preference_selects_model_unless_overridden()
{   let store = MemoryPreferenceStore::new();
    assert_ok!(store.set_preferred_model("u-1", "openai/gpt-5").await);
    let gateway = MockGateway::new(Ok("text".to_string()));
    let orchestrator = orchestrator_with(gateway.clone(), store);
    let caller = Caller::authenticated("u-1");

    orchestrator.run(&caller, &research_request()).await;
    assert_eq!(gateway.last_request().model, "openai/gpt-5");

    let request = research_request().with_model("google/gemini-2.5-pro");
    orchestrator.run(&caller, &request).await;
    assert_eq!(gateway.last_request().model, "google/gemini-2.5-pro");
}

#[tokio::test]
async fn analysis_reply_includes_file_name()
{   let gateway = MockGateway::new(Ok("Summary".to_string()));
    let orchestrator = orchestrator_with(gateway, MemoryPreferenceStore::new());
    let request = TaskRequest::analysis(AnalysisParams
    {   document_text: "This Lease is made...".to_string()
      , analysis_type: AnalysisType::Summarize
      , file_name: Some("lease.txt".to_string())
    });

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &request)
      .await;
    let reply = serde_json::to_value(lexassist::TaskReply::from(outcome)).unwrap();
    assert_eq!(reply["content"], "Summary");
    assert_eq!(reply["metadata"]["fileName"], "lease.txt");
}

#[tokio::test]
async fn saving_preference_requires_identity()
{   let gateway = MockGateway::new(Ok("text".to_string()));
    let orchestrator = orchestrator_with(gateway, MemoryPreferenceStore::new());

    let err = assert_err!(
      orchestrator.save_preference(&Caller::anonymous(), "openai/gpt-5").await
    );
    assert_eq!(err, Error::Unauthorized);

    let caller = Caller::authenticated("u-9");
    assert_ok!(orchestrator.save_preference(&caller, "openai/gpt-5-mini").await);
    assert_eq!(assert_ok!(orchestrator.current_model(&caller).await), "openai/gpt-5-mini");
}

// ===== HTTP gateway =====

#[tokio::test]
async fn http_gateway_returns_first_choice()
{   let (base, server) = one_shot_server(
      200
    , r#"{"choices":[{"message":{"role":"assistant","content":"Elements: ..."}}]}"#
    ).await;
    let gateway = assert_ok!(HttpGateway::new(&gateway_config(base, 5)));

    let text = assert_ok!(gateway.complete(&sample_gateway_request()).await);
    assert_eq!(text, "Elements: ...");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /chat/completions"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer test-key"));
    assert!(raw.contains(r#""role":"system""#));
    assert!(raw.contains(r#""max_tokens":4000"#));
}

#[tokio::test]
async fn http_gateway_maps_statuses()
{   let cases: Vec<(u16, Error)> = vec![
      (429, Error::RateLimited)
    , (402, Error::PaymentRequired)
    , (500, Error::GatewayError { status: 500, message: "{}".to_string() })
    , (404, Error::GatewayError { status: 404, message: "{}".to_string() })
    ];
    for (status, expected) in cases
    {   let (base, server) = one_shot_server(status, "{}").await;
        let gateway = assert_ok!(HttpGateway::new(&gateway_config(base, 5)));
        let err = assert_err!(gateway.complete(&sample_gateway_request()).await);
        assert_eq!(err, expected);
        let _ = server.await;
    }
}

#[tokio::test]
async fn http_gateway_empty_choices_is_malformed()
{   let (base, server) = one_shot_server(200, r#"{"choices":[]}"#).await;
    let gateway = Arc::new(assert_ok!(HttpGateway::new(&gateway_config(base, 5))));
    let orchestrator = Orchestrator::with_store(
      gateway
    , Arc::new(MemoryPreferenceStore::new())
    , DEFAULT_MODEL.to_string()
    );

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &research_request())
      .await;
    assert!(matches!(outcome, Outcome::Failed(Error::MalformedResponse(_))));
    let _ = server.await;
}

#[tokio::test]
async fn http_gateway_times_out()
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _silent = tokio::spawn(async move {
      let (socket, _) = listener.accept().await.unwrap();
      tokio::time::sleep(std::time::Duration::from_secs(10)).await;
      drop(socket);
    });
    let gateway = assert_ok!(HttpGateway::new(
      &gateway_config(format!("http://{}", addr), 1)
    ));

    let err = assert_err!(gateway.complete(&sample_gateway_request()).await);
    assert_eq!(err, Error::Timeout);
}

#[test]
fn http_gateway_requires_credential()
{   let config = gateway_config("http://127.0.0.1:1".to_string(), 5);
    let config = GatewayConfig
    {   api_key: String::new()
      , ..config
    };
    assert!(matches!(
      HttpGateway::new(&config)
    , Err(Error::ConfigurationError(_))
    ));
}

// ===== REST preference store =====

fn store_for(url: String) -> RestPreferenceStore
{   let config = StoreConfig
    {   url
      , api_key: "anon-key".to_string()
    };
    RestPreferenceStore::new(&config, std::time::Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn rest_store_reads_preference()
{   let (base, server) = one_shot_server(
      200
    , r#"[{"preferred_model":"openai/gpt-5"}]"#
    ).await;
    let store = store_for(base);

    let model = assert_ok!(store.get_preferred_model("u-1").await);
    assert_eq!(model.as_deref(), Some("openai/gpt-5"));

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /rest/v1/user_preferences?"));
    assert!(raw.contains("user_id=eq.u-1"));
}

#[tokio::test]
async fn rest_store_no_rows_is_none()
{   let (base, server) = one_shot_server(200, "[]").await;
    let store = store_for(base);
    assert_eq!(assert_ok!(store.get_preferred_model("u-1").await), None);
    let _ = server.await;
}

#[tokio::test]
async fn rest_store_upserts_by_user()
{   let (base, server) = one_shot_server(201, "").await;
    let store = store_for(base);

    assert_ok!(store.set_preferred_model("u-1", "openai/gpt-5-nano").await);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /rest/v1/user_preferences?on_conflict=user_id"));
    assert!(raw.to_ascii_lowercase().contains("prefer: resolution=merge-duplicates"));
    assert!(raw.contains(r#""preferred_model":"openai/gpt-5-nano""#));
}

#[tokio::test]
async fn failing_rest_store_degrades_to_default_model()
{   let (base, server) = one_shot_server(500, r#"{"message":"down"}"#).await;
    let gateway = MockGateway::new(Ok("text".to_string()));
    let orchestrator = Orchestrator::with_store(
      gateway.clone()
    , Arc::new(store_for(base))
    , DEFAULT_MODEL.to_string()
    );

    let outcome = orchestrator
      .run(&Caller::authenticated("u-1"), &research_request())
      .await;
    assert!(outcome.is_completed());
    assert_eq!(gateway.last_request().model, DEFAULT_MODEL);
    let _ = server.await;
}

// ===== Backend task =====

#[tokio::test]
async fn backend_runs_tasks_concurrently()
{   let gateway = MockGateway::gated(Ok("done".to_string()), 4);
    let backend = AssistBackend::new(
      orchestrator_with(gateway.clone(), MemoryPreferenceStore::new())
    );

    let mut receivers = Vec::new();
    for i in 0..4
    {   let caller = Caller::authenticated(format!("u-{}", i));
        receivers.push(assert_ok!(backend.run_task(caller, drafting_request()).await));
    }
    // completes only if all four gateway calls overlap
    let all = async {
      for mut rx in receivers
      {   let outcome = rx.recv().await.unwrap();
          assert!(outcome.is_completed());
      }
    };
    assert_ok!(
      tokio::time::timeout(std::time::Duration::from_secs(5), all).await
    );
    assert_eq!(gateway.calls(), 4);

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn backend_preference_round_trip()
{   let gateway = MockGateway::new(Err(Error::PaymentRequired));
    let backend = AssistBackend::new(
      orchestrator_with(gateway, MemoryPreferenceStore::new())
    );
    let caller = Caller::authenticated("u-1");

    let mut rx = assert_ok!(
      backend.set_preference(caller.clone(), "openai/gpt-5".to_string()).await
    );
    assert_ok!(rx.recv().await.unwrap());

    let mut rx = assert_ok!(backend.get_preference(caller.clone()).await);
    assert_eq!(rx.recv().await.unwrap(), Ok("openai/gpt-5".to_string()));

    let mut rx = assert_ok!(
      backend.research(caller, research_request_params(), None).await
    );
    assert_eq!(rx.recv().await.unwrap(), Outcome::Failed(Error::PaymentRequired));

    assert_ok!(backend.shutdown().await);
}

fn research_request_params() -> ResearchParams
{   match research_request().params
    {   lexassist::request::TaskParams::Research(p) => p
      , _ => unreachable!()
    }
}
