use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use paramed_core::config::Config;
use paramed_core::monitor::ProgressMonitor;
use paramed_core::pipeline::map_documents;
use paramed_core::report::{ProgressReport, QualityReport, QuizValidation};
use paramed_core::{
    Catalogue, ExtractionMode, ExtractionPipeline, RunOptions, group_conversations, seed_catalogue,
};
use paramed_llm::openai::{CompletionSettings, OpenAiProvider};
use paramed_skills::SkillMatcher;
use paramed_store::document::DocumentReader;
use paramed_store::types::{NewMessage, UserId};
use paramed_store::{MessageStore, SqliteStore};
use tokio::sync::watch;

/// Content maintenance for the paramedic skill-training catalogue.
#[derive(Parser, Debug)]
#[command(name = "paramed", version, about)]
struct Cli {
    /// Configuration file (default: $PARAMED_CONFIG, then config/default.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract procedure steps from documents and replace them in the store.
    ExtractSteps(ExtractArgs),
    /// Generate quiz questions from documents and replace them in the store.
    ExtractQuiz(ExtractArgs),
    /// Resolve a skill name against the catalogue.
    Match { name: String },
    /// Match document file names against the catalogue without calling the model.
    Map {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Rewrite step numbers to 1..=n for every skill.
    RepairSteps,
    /// Print catalogue coverage.
    Progress,
    /// Score step and quiz content per skill.
    Quality,
    /// Check every stored quiz question.
    ValidateQuiz,
    /// Poll progress until Ctrl-C.
    Monitor {
        /// Seconds between polls (default: monitor.interval_secs).
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Load categories, subjects and skills from a TOML catalogue.
    Seed { file: PathBuf },
    /// Student/instructor messages.
    #[command(subcommand)]
    Messages(MessagesCommand),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Document directory (default: extraction.documents_dir).
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    skip: usize,
    #[arg(long)]
    limit: Option<usize>,
    /// Pause between documents (default: extraction.delay_ms).
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Only target skills that have no content of this kind yet.
    #[arg(long)]
    only_unpopulated: bool,
    /// Extract and match, but write nothing.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum MessagesCommand {
    Send {
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
        #[arg(long, default_value = "")]
        subject: String,
        body: String,
    },
    /// List conversations for a user, newest first.
    Inbox { user: i64 },
    /// Mark every message from `other` to `user` as read.
    Read { user: i64, other: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.verbose);

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;

    let store = open_store(&config.store.sqlite_path).await?;

    match cli.command {
        Command::ExtractSteps(args) => extract(&config, &store, ExtractionMode::Steps, args).await,
        Command::ExtractQuiz(args) => extract(&config, &store, ExtractionMode::Quiz, args).await,
        Command::Match { name } => match_name(&config, &store, &name).await,
        Command::Map { dir } => map(&config, &store, dir).await,
        Command::RepairSteps => {
            let summary = store.renumber_all_steps().await?;
            println!(
                "renumbered {} rows across {} skills",
                summary.rows_changed, summary.skills_touched
            );
            Ok(())
        }
        Command::Progress => {
            print!("{}", ProgressReport::collect(&store).await?);
            Ok(())
        }
        Command::Quality => {
            print!("{}", QualityReport::collect(&store, &config.quality).await?);
            Ok(())
        }
        Command::ValidateQuiz => {
            print!("{}", QuizValidation::collect(&store).await?);
            Ok(())
        }
        Command::Monitor { interval } => {
            monitor(store, interval.unwrap_or(config.monitor.interval_secs)).await;
            Ok(())
        }
        Command::Seed { file } => {
            let catalogue = Catalogue::load(&file)?;
            let summary = seed_catalogue(&store, &catalogue).await?;
            println!(
                "created {} categories, {} subjects, {} skills ({} skills already present)",
                summary.categories, summary.subjects, summary.skills, summary.skills_existing
            );
            Ok(())
        }
        Command::Messages(cmd) => messages(&store, cmd).await,
    }
}

fn init_subscriber(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_store(path: &str) -> anyhow::Result<SqliteStore> {
    if path != ":memory:"
        && let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    SqliteStore::new(path)
        .await
        .with_context(|| format!("failed to open database {path}"))
}

fn create_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    let api_key = config
        .secrets
        .llm_api_key
        .as_ref()
        .context("no API key: set PARAMED_LLM_API_KEY or OPENAI_API_KEY")?;
    let provider = OpenAiProvider::new(
        api_key.expose(),
        CompletionSettings {
            base_url: config.llm.base_url.clone(),
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            timeout: Duration::from_secs(config.llm.timeout_secs),
        },
    );
    tracing::debug!(?provider, key = %api_key, "provider configured");
    Ok(provider)
}

fn create_matcher(config: &Config) -> anyhow::Result<SkillMatcher> {
    SkillMatcher::new(&config.matching).context("invalid [matching] section")
}

fn documents_dir(config: &Config, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from(&config.extraction.documents_dir))
}

async fn extract(
    config: &Config,
    store: &SqliteStore,
    mode: ExtractionMode,
    args: ExtractArgs,
) -> anyhow::Result<()> {
    let provider = create_provider(config)?;
    let pipeline = ExtractionPipeline::new(&provider, store, create_matcher(config)?)
        .with_char_budget(config.extraction.char_budget)
        .with_quiz_questions(config.extraction.quiz_questions);

    let options = RunOptions {
        mode,
        skip: args.skip,
        limit: args.limit,
        delay: Duration::from_millis(args.delay_ms.unwrap_or(config.extraction.delay_ms)),
        only_unpopulated: args.only_unpopulated,
        dry_run: args.dry_run,
    };
    let dir = documents_dir(config, args.dir);
    let summary = pipeline
        .run(&dir, &options)
        .await
        .with_context(|| format!("extraction run over {} failed", dir.display()))?;
    print!("{}", summary.render());
    Ok(())
}

async fn match_name(config: &Config, store: &SqliteStore, name: &str) -> anyhow::Result<()> {
    let skills = store.list_skills().await?;
    match create_matcher(config)?.find(name, &skills) {
        Some(found) => println!(
            "{name:?} -> {} (id {}, {})",
            found.skill.name, found.skill.id, found.tier
        ),
        None => println!("{name:?} -> no match among {} skills", skills.len()),
    }
    Ok(())
}

async fn map(config: &Config, store: &SqliteStore, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = documents_dir(config, dir);
    let rows = map_documents(&DocumentReader::new(), &create_matcher(config)?, store, &dir).await?;

    let mut unmatched = 0;
    for row in &rows {
        let file = row.file.file_name().map_or_else(
            || row.file.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        match &row.skill {
            Some((skill, tier)) => println!("  {file:<48} -> {skill} ({tier})"),
            None => {
                unmatched += 1;
                println!("  {file:<48} -> (no match)");
            }
        }
    }
    println!("{} documents, {unmatched} unmatched", rows.len());
    Ok(())
}

async fn monitor(store: SqliteStore, interval_secs: u64) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let mut monitor = ProgressMonitor::new(store, Duration::from_secs(interval_secs), shutdown_rx);
    monitor
        .run(|snapshot, delta| println!("{snapshot} ({delta})"))
        .await;
}

async fn messages(store: &SqliteStore, cmd: MessagesCommand) -> anyhow::Result<()> {
    match cmd {
        MessagesCommand::Send {
            from,
            to,
            subject,
            body,
        } => {
            let id = store
                .send(NewMessage {
                    sender: UserId(from),
                    recipient: UserId(to),
                    subject,
                    body,
                })
                .await?;
            println!("sent message {id}");
        }
        MessagesCommand::Inbox { user } => {
            let user = UserId(user);
            let conversations = group_conversations(user, &store.messages_for(user).await?);
            if conversations.is_empty() {
                println!("no messages");
            }
            for c in conversations {
                println!(
                    "  user {:<6} {:>3} messages, {:>3} unread, last {} {:?}",
                    c.counterpart.0,
                    c.message_count,
                    c.unread_count,
                    c.last_message.created_at,
                    c.last_message.subject
                );
            }
        }
        MessagesCommand::Read { user, other } => {
            let changed = store
                .mark_conversation_read(UserId(user), UserId(other))
                .await?;
            println!("marked {changed} messages read");
        }
    }
    Ok(())
}
