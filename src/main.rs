mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::extract;
use crate::cmd::sync::{self, SyncCommandArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::gemini::GeminiClient;
use crate::infra::github::GitHubClient;
use crate::infra::jira::JiraClient;
use crate::services::TestCaseGenerator;

#[derive(Parser)]
#[command(
    name = "reqsync",
    author,
    version,
    about = "Turn a requirements document into Jira tickets and GitHub branches"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or find) a ticket and a branch for every requirement in a document.
    Sync(SyncArgs),
    /// Print the requirements found in a document without contacting any service.
    Extract(ExtractArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Requirements document (.docx, or plain text with blank-line separated blocks).
    document: PathBuf,
    /// Override the configured Jira project key.
    #[arg(short, long)]
    project: Option<String>,
    /// Override the configured GitHub repository (owner/name).
    #[arg(short, long)]
    repo: Option<String>,
    /// Override the base branch new branches start from.
    #[arg(short, long)]
    base: Option<String>,
    /// Always call the language model instead of reusing cached test cases.
    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct ExtractArgs {
    /// Requirements document (.docx, or plain text with blank-line separated blocks).
    document: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(())
        }
        Commands::Extract(args) => {
            let requirements = extract::run(&args.document)?;
            println!("Extracted {} requirement(s):", requirements.len());
            for requirement in requirements {
                println!("- {}", requirement.text);
            }
            Ok(())
        }
        Commands::Sync(args) => run_sync(args).await,
    }
}

async fn run_sync(args: SyncArgs) -> AppResult<()> {
    let mut config = AppConfig::load()?;
    config.apply_overrides(args.project, args.repo, args.base);
    config.validate()?;

    if config.gemini_api_key.is_none() {
        eprintln!(
            "Warning: Gemini API key not configured; every ticket will get placeholder test cases."
        );
    }

    let test_case_generator: Arc<dyn TestCaseGenerator> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.max_output_tokens,
        config.request_timeout,
    )?);

    let version_control = Arc::new(GitHubClient::new(
        config.github_token.clone(),
        config.repository()?,
        config.request_timeout,
    )?);
    let issue_tracker = Arc::new(JiraClient::new(
        config.jira_base_url.clone(),
        config.jira_email.clone(),
        config.jira_token.clone(),
        config.jira_issue_type.clone(),
        config.request_timeout,
    )?);

    tracing::info!(
        project = config.project_key.as_deref().unwrap_or_default(),
        repository = config.github_repo.as_deref().unwrap_or_default(),
        base = %config.base_branch,
        summary_match = config.summary_match.as_str(),
        model = %config.gemini_model,
        "starting sync"
    );

    let context = AppContext::new(config, version_control, issue_tracker, test_case_generator);

    let report = sync::run(
        &context,
        SyncCommandArgs {
            document: args.document,
            use_cache: !args.no_cache,
        },
    )
    .await?;

    println!();
    println!("{}", report.render());
    if report.has_failures() {
        println!("Some requirements failed; rerun after fixing the errors above. Completed ones are skipped.");
    }

    Ok(())
}
