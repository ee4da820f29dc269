//! lexassist CLI: run one research, analysis or drafting task

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use log::{debug, error};

use lexassist::config::AssistConfig;
use lexassist::failover::RetryPolicy;
use lexassist::request::NormalizedResponse;
use lexassist::{
  AnalysisParams, AnalysisType, Caller, DraftingParams, Orchestrator,
  ResearchParams, TaskReply, TaskRequest,
};

#[derive(Parser, Debug)]
#[command(name = "lexassist", version, about = "Legal research, analysis and drafting via an AI gateway")]
struct Cli
{   /// JSON configuration file (environment is used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>

  , /// Authenticated user id
    #[arg(short, long, env = "LEXASSIST_USER_ID")]
    user: Option<String>

  , /// Model override for this run
    #[arg(short, long)]
    model: Option<String>

  , /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8

  , #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command
{   /// Ask a legal research question (IRAC answer)
    Research
    {   query: String
      , #[arg(long, default_value = "california")]
        jurisdiction: String
      , #[arg(long, default_value = "contract")]
        practice_area: String
      , #[arg(long, default_value = "bluebook")]
        citation_style: String
      , #[arg(long, default_value = "irac")]
        format: String
    }
  , /// Analyze a document read from a file
    Analyze
    {   file: PathBuf
      , /// summarize, clauses, risk or compare
        #[arg(long, default_value = "summarize")]
        analysis_type: String
    }
  , /// Draft a legal document from a description
    Draft
    {   prompt: String
      , #[arg(long, default_value = "nda")]
        template: String
      , #[arg(long, default_value = "formal")]
        style: String
      , #[arg(long, default_value = "medium")]
        length: String
      , #[arg(long, default_value = "california")]
        jurisdiction: String
    }
  , /// Save the preferred model for the user
    SetModel
    {   model: String
    }
  , /// Show the model runs default to for the user
    GetModel
  , /// List known model identifiers
    Models
}

fn init_logging(verbose: u8)
{   let level = match verbose
    {   0 => "warn"
      , 1 => "info"
      , 2 => "debug"
      , _ => "trace"
    };
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(level)
    ).init();
}

fn load_config(path: Option<&PathBuf>)
  -> Result<AssistConfig, lexassist::error::Error>
{   match path
    {   Some(p) => AssistConfig::from_json_file(p)
      , None => AssistConfig::from_env()
    }
}

fn print_json<T: serde::Serialize>(value: &T)
{   match serde_json::to_string_pretty(value)
    {   Ok(s) => println!("{}", s)
      , Err(e) => error!("Failed to encode output: {}", e)
    }
}

fn fail(e: lexassist::error::Error) -> ExitCode
{   error!("{}", e);
    print_json(&TaskReply::from(Err::<NormalizedResponse, _>(e)));
    ExitCode::FAILURE
}

/// Config and orchestrator for commands that reach external services
fn connect(path: Option<&PathBuf>)
  -> Result<(AssistConfig, Orchestrator), lexassist::error::Error>
{   let config = load_config(path)?;
    let orchestrator = Orchestrator::from_config(&config)?;
    Ok((config, orchestrator))
}

async fn run_task(
  path: Option<&PathBuf>
, caller: &Caller
, request: TaskRequest
, model: Option<String>
) -> ExitCode
{   let (config, orchestrator) = match connect(path)
    {   Ok(c) => c
      , Err(e) => return fail(e)
    };
    let request = match model
    {   Some(m) => request.with_model(m)
      , None => request
    };

    let policy = RetryPolicy::from_config(&config.retry);
    let outcome = policy
      .run(|| orchestrator.run(caller, &request))
      .await;

    let ok = outcome.is_completed();
    print_json(&TaskReply::from(outcome));
    if ok
    {   ExitCode::SUCCESS
    } else
    {   ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_ref();
    let caller = cli.user
      .map(Caller::authenticated)
      .unwrap_or_else(Caller::anonymous);
    debug!("Caller: {:?}", caller.identity());

    match cli.command
    {   Command::Models => {
          for m in lexassist::preference::known_models()
          {   println!("{:<30} {:<22} {}", m.id, m.name, m.description);
          }
          ExitCode::SUCCESS
        }
      , Command::SetModel { model } => {
          let (_, orchestrator) = match connect(config_path)
          {   Ok(c) => c
            , Err(e) => return fail(e)
          };
          match orchestrator.save_preference(&caller, &model).await
          {   Ok(()) => {
                println!("Now using {}", model);
                ExitCode::SUCCESS
              }
            , Err(e) => fail(e)
          }
        }
      , Command::GetModel => {
          let (_, orchestrator) = match connect(config_path)
          {   Ok(c) => c
            , Err(e) => return fail(e)
          };
          match orchestrator.current_model(&caller).await
          {   Ok(model) => {
                println!("{}", model);
                ExitCode::SUCCESS
              }
            , Err(e) => fail(e)
          }
        }
      , Command::Research
        {   query, jurisdiction, practice_area, citation_style, format
        } => {
          let request = TaskRequest::research(ResearchParams
          {   query
            , jurisdiction
            , practice_area
            , citation_style
            , format
          });
          run_task(config_path, &caller, request, cli.model).await
        }
      , Command::Analyze { file, analysis_type } => {
          let document_text = match std::fs::read_to_string(&file)
          {   Ok(text) => text
            , Err(e) => return fail(lexassist::error::Error::InvalidRequest(
                format!("cannot read {}: {}", file.display(), e)
              ))
          };
          let file_name = file.file_name()
            .map(|n| n.to_string_lossy().into_owned());
          let request = TaskRequest::analysis(AnalysisParams
          {   document_text
            , analysis_type: AnalysisType::from(analysis_type)
            , file_name
          });
          run_task(config_path, &caller, request, cli.model).await
        }
      , Command::Draft
        {   prompt, template, style, length, jurisdiction
        } => {
          let request = TaskRequest::drafting(DraftingParams
          {   prompt
            , template
            , style
            , length
            , jurisdiction
          });
          run_task(config_path, &caller, request, cli.model).await
        }
    }
}
