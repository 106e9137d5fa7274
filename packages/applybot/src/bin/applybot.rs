//! Command-line entry point.
//!
//! `run` applies to postings, `summary` and `list` read the ledger. Output of
//! every command is JSON on stdout; logs go to stderr, and also to daily
//! files under `LOG_DIR` when it is set.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use applybot::{
    stores, ApplicationOrchestrator, ApplicationStatus, ApplicationStore, Config, JobFetcher,
    JsonFileFetcher, OpenAiGenerator, RunConfig, SidecarClient, TimeFilter, UserProfile,
};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "applybot")]
#[command(about = "Paced Easy-Apply job applications with a durable ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search and apply
    Run(RunArgs),

    /// Per-status counts of recorded applications
    Summary,

    /// Recorded applications, oldest first
    List {
        /// Only this status (applied, skipped, manual_review, error)
        #[arg(long)]
        status: Option<ApplicationStatus>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Run settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Applicant profile (JSON) used for cover letters
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Read postings from a JSON file instead of searching
    #[arg(long)]
    postings: Option<PathBuf>,

    #[arg(long)]
    keywords: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// day, week or month
    #[arg(long)]
    time_filter: Option<TimeFilter>,

    #[arg(long)]
    max_jobs: Option<u32>,

    #[arg(long)]
    max_jobs_per_session: Option<u32>,

    #[arg(long)]
    min_seconds_per_job: Option<u64>,

    #[arg(long)]
    no_cover_letter: bool,

    /// Resume uploaded with each application
    #[arg(long)]
    resume: Option<PathBuf>,
}

impl RunArgs {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)
                .with_context(|| format!("Failed to load run config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(keywords) = &self.keywords {
            config.search.keywords = keywords.clone();
        }
        if let Some(location) = &self.location {
            config.search.location = location.clone();
        }
        if let Some(time_filter) = self.time_filter {
            config.search.time_filter = time_filter;
        }
        if let Some(max_jobs) = self.max_jobs {
            config.limits.max_jobs_total = max_jobs;
        }
        if let Some(per_session) = self.max_jobs_per_session {
            config.limits.max_jobs_per_session = per_session;
        }
        if let Some(min_seconds) = self.min_seconds_per_job {
            config.limits.min_seconds_per_job = min_seconds;
        }
        if self.no_cover_letter {
            config.cover_letter.enabled = false;
        }
        if self.resume.is_some() {
            config.resume_path = self.resume.clone();
        }

        config.validate().context("Invalid run config")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    // Held until exit so buffered file logs are flushed.
    let (file_writer, _file_guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) = file_log_writer(dir);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,applybot=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
        }))
        .init();

    let store = stores::connect(&config.database_url)
        .await
        .context("Failed to open application store")?;

    match cli.command {
        Commands::Run(args) => cmd_run(&config, store, args).await,
        Commands::Summary => cmd_summary(store.as_ref()).await,
        Commands::List { status } => cmd_list(store.as_ref(), status).await,
    }
}

async fn cmd_run(config: &Config, store: Arc<dyn ApplicationStore>, args: RunArgs) -> Result<()> {
    let run_config = args.run_config()?;

    let automation_url = config
        .automation_url
        .as_deref()
        .context("AUTOMATION_URL must be set to run")?;
    let sidecar = SidecarClient::new(automation_url)
        .context("Invalid AUTOMATION_URL")?
        .with_timeout(
            std::time::Duration::from_secs(120),
            run_config.limits.min_per_job(),
        )
        .with_resume(run_config.resume_path.clone());

    let fetcher: Box<dyn JobFetcher> = match &args.postings {
        Some(path) => Box::new(JsonFileFetcher::new(path)),
        None => Box::new(sidecar.clone()),
    };

    let mut orchestrator = ApplicationOrchestrator::new(store, sidecar, run_config.clone());

    if run_config.cover_letter.enabled {
        match (&config.openai_api_key, &args.profile) {
            (Some(api_key), Some(profile_path)) => {
                let profile = UserProfile::from_file(profile_path)
                    .with_context(|| format!("Failed to load profile {}", profile_path.display()))?;
                let generator = OpenAiGenerator::new(api_key.clone(), config.openai_model.clone())
                    .with_timeout(run_config.cover_letter.timeout());
                orchestrator = orchestrator.with_generator(Arc::new(generator), profile);
            }
            (None, _) => warn!("OPENAI_API_KEY not set, applying without cover letters"),
            (_, None) => warn!("no --profile given, applying without cover letters"),
        }
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), cancel.clone()));

    let summary = orchestrator
        .run_search(fetcher.as_ref(), &cancel)
        .await
        .context("Run aborted")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Daily-rolling log files under `dir`, written off the logging thread.
fn file_log_writer(dir: &Path) -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "applybot.log"))
}

/// Cancel `cancel` once `signal` fires. A signal listener that fails to
/// install leaves the run going.
async fn cancel_on_signal(
    signal: impl Future<Output = std::io::Result<()>>,
    cancel: CancellationToken,
) {
    match signal.await {
        Ok(()) => {
            info!("received shutdown signal, stopping run");
            cancel.cancel();
        }
        Err(e) => warn!(
            error = %e,
            "could not listen for shutdown signal, Ctrl-C will not stop the run cleanly"
        ),
    }
}

async fn cmd_summary(store: &dyn ApplicationStore) -> Result<()> {
    let counts = store
        .summary_counts()
        .await
        .context("Failed to read summary counts")?;

    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}

async fn cmd_list(store: &dyn ApplicationStore, status: Option<ApplicationStatus>) -> Result<()> {
    let records = store
        .list(status)
        .await
        .context("Failed to list applications")?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
