use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reviewgate_ai::{ClassifierGateway, GeminiClient};
use reviewgate_core::config::{DEFAULT_ENDPOINT, DEFAULT_LISTEN_ADDR, DEFAULT_MODEL};
use reviewgate_core::{AppConfig, ApprovalRule, ClassifierConfig, SchedulerConfig, decide};
use reviewgate_server::AppState;
use reviewgate_service::{RankingSelector, ReadAssembler, SchedulerDriver};
use reviewgate_store::{DuckStore, MemoryStore, ReviewStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reviewgate", version, about = "LLM-moderated business reviews")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalOpts {
    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-call classifier timeout in seconds.
    #[arg(long, env = "REVIEWGATE_TIMEOUT_SECS", default_value_t = 20)]
    timeout_secs: u64,

    /// DuckDB file. Without it reviews live in memory for the life of the process.
    #[arg(long, env = "REVIEWGATE_DB")]
    db: Option<PathBuf>,

    #[arg(long, value_enum, env = "REVIEWGATE_APPROVAL_RULE", default_value_t = RuleArg::SafetyOnly)]
    approval_rule: RuleArg,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run the daily rerank in-process.
    Serve {
        #[arg(long, env = "REVIEWGATE_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
        listen: String,

        /// Shared secret required in `x-webhook-secret` on review submission.
        #[arg(long, env = "REVIEWGATE_WEBHOOK_SECRET", hide_env_values = true)]
        webhook_secret: Option<String>,

        /// UTC time of day for the scheduled rerank (HH:MM).
        #[arg(long, env = "REVIEWGATE_DAILY_AT", default_value = "00:00", value_parser = parse_time)]
        daily_at: NaiveTime,

        #[arg(long, env = "REVIEWGATE_CONCURRENCY", default_value_t = 1)]
        concurrency: usize,
    },
    /// Classify a piece of review text and print the verdict.
    Classify {
        content: String,
    },
    /// List a business's approved reviews in display order.
    List {
        business_id: String,
        /// Review to float to the front.
        #[arg(long)]
        anchor: Option<i64>,
    },
    /// Re-select the pinned reviews of one business.
    Rerank {
        business_id: String,
    },
    /// Rerank every business with approved reviews once.
    RunDaily {
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    SafetyOnly,
    SafetyAndSentiment,
}

impl From<RuleArg> for ApprovalRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::SafetyOnly => ApprovalRule::SafetyOnly,
            RuleArg::SafetyAndSentiment => ApprovalRule::SafetyAndSentiment,
        }
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM, got `{s}`: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            listen,
            webhook_secret,
            daily_at,
            concurrency,
        } => {
            let mut config = app_config(&cli.opts)?;
            config.listen_addr = listen;
            config.webhook_secret = webhook_secret;
            config.scheduler = SchedulerConfig {
                daily_at,
                concurrency,
            };
            config.validate().context("invalid configuration")?;
            tracing::info!("reviewgate v{}", env!("CARGO_PKG_VERSION"));

            let store = open_store(config.database.as_deref())?;
            let gateway = gateway(&config.classifier)?;
            let state = AppState::new(store, gateway, &config);
            reviewgate_server::serve(&config, state).await?;
        }
        Command::Classify { content } => {
            let config = app_config(&cli.opts)?;
            config.validate().context("invalid configuration")?;
            let gateway = gateway(&config.classifier)?;
            let outcome = gateway
                .classify_review(&content)
                .await
                .context("classifier call failed")?;
            let status = decide(outcome.value(), config.approval_rule);
            let out = serde_json::json!({
                "status": status,
                "fallback": outcome.is_fallback(),
                "analysis": outcome.value(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::List {
            business_id,
            anchor,
        } => {
            let store = open_store(cli.opts.db.as_deref())?;
            let reviews = ReadAssembler::new(store)
                .list(&business_id, anchor)
                .await
                .with_context(|| format!("listing reviews for {business_id}"))?;
            println!("{}", serde_json::to_string_pretty(&reviews)?);
        }
        Command::Rerank { business_id } => {
            let config = app_config(&cli.opts)?;
            config.validate().context("invalid configuration")?;
            let store = open_store(config.database.as_deref())?;
            let selector = RankingSelector::new(store, gateway(&config.classifier)?);
            let report = selector
                .rerank(&business_id)
                .await
                .with_context(|| format!("reranking {business_id}"))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::RunDaily { concurrency } => {
            let config = app_config(&cli.opts)?;
            config.validate().context("invalid configuration")?;
            let store = open_store(config.database.as_deref())?;
            let selector = RankingSelector::new(store.clone(), gateway(&config.classifier)?);
            let report = SchedulerDriver::new(store, selector, concurrency)
                .run_daily()
                .await
                .context("daily rerank failed")?;
            tracing::info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                "daily rerank finished"
            );
            println!("{}", serde_json::to_string_pretty(&report.results)?);
        }
    }
    Ok(())
}

fn app_config(opts: &GlobalOpts) -> Result<AppConfig> {
    let api_key = opts
        .api_key
        .clone()
        .context("GEMINI_API_KEY is not set (pass --api-key or export it)")?;
    let mut classifier = ClassifierConfig::new(api_key);
    classifier.model = opts.model.clone();
    classifier.endpoint = opts.endpoint.clone();
    classifier.timeout = Duration::from_secs(opts.timeout_secs);

    let mut config = AppConfig::new(classifier);
    config.approval_rule = opts.approval_rule.into();
    config.database = opts.db.clone();
    Ok(config)
}

fn gateway(config: &ClassifierConfig) -> Result<ClassifierGateway> {
    let client = GeminiClient::new(config).context("building Gemini client")?;
    Ok(ClassifierGateway::new(Arc::new(client), config.timeout))
}

fn open_store(path: Option<&Path>) -> Result<Arc<dyn ReviewStore>> {
    match path {
        Some(path) => {
            let store = DuckStore::open_persistent(path)
                .with_context(|| format!("opening review database {}", path.display()))?;
            tracing::info!(path = %path.display(), "using DuckDB review store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no --db given, reviews are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
