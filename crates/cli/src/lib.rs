use anyhow::{Context as AnyhowContext, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use racha_commands::report::{build_list, my_status};
use racha_commands::CommandRouter;
use racha_ledger::{Category, LedgerBook, LedgerEntry, LedgerFile, LedgerStore};
use std::io;
use std::path::{Path, PathBuf};

pub mod config;
pub mod transport;

pub use config::{BotConfig, ConfigError};
pub use transport::{serve, serve_with_rosters, snapshot_rosters, RosterFactory, ServeStats};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "racha")]
#[command(about = "Payment ledger bot for pickup game group chats", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for replies)
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (overrides RACHA_CONFIG and ./racha.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger document path (overrides config file and RACHA_LEDGER_PATH)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer chat messages read as JSON lines from stdin
    Serve,

    /// Render a category list from the stored ledger
    List(ListArgs),

    /// Render one participant's payment status
    Status(StatusArgs),

    /// Print the JSON schema of the stdio protocol
    Schema,
}

#[derive(Args)]
struct ListArgs {
    /// Chat id
    #[arg(long)]
    chat: String,

    /// mensalidade | churrasco | diaria
    #[arg(long, value_parser = parse_category)]
    category: Category,

    /// Roster member, in display order (repeatable; default: recorded names)
    #[arg(long = "member")]
    members: Vec<String>,
}

#[derive(Args)]
struct StatusArgs {
    /// Chat id
    #[arg(long)]
    chat: String,

    /// Participant name as recorded in the ledger
    #[arg(long)]
    name: String,
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse()
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Schema = cli.command {
        return run_schema();
    }

    let config = BotConfig::resolve(cli.config.as_deref(), cli.ledger.clone())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => run_serve(&config).await?,
        Commands::List(args) => run_list(&config, args).await?,
        Commands::Status(args) => run_status(&config, args).await?,
        Commands::Schema => run_schema()?,
    }

    Ok(())
}

async fn run_serve(config: &BotConfig) -> Result<()> {
    let file = LedgerFile::new(&config.ledger_path);
    let store = LedgerStore::open(file, config.flush_config())
        .await
        .with_context(|| format!("Failed to open ledger {}", config.ledger_path.display()))?;
    info!(
        "Serving stdio (debounce {}ms, retry {}ms)",
        config.debounce_ms, config.retry_ms
    );

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    };
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    serve(
        CommandRouter::new(store),
        input,
        tokio::io::stdout(),
        shutdown,
    )
    .await?;
    Ok(())
}

/// Reads the ledger without creating it; a missing document is an empty one.
async fn read_book(path: &Path) -> Result<LedgerBook> {
    let file = LedgerFile::new(path);
    if !tokio::fs::try_exists(path).await? {
        warn!("Ledger {} does not exist yet", path.display());
        return Ok(LedgerBook::new());
    }
    file.load()
        .await
        .with_context(|| format!("Failed to read ledger {}", path.display()))
}

async fn chat_entry(config: &BotConfig, chat_id: &str) -> Result<LedgerEntry> {
    let book = read_book(&config.ledger_path).await?;
    Ok(book
        .get(chat_id)
        .cloned()
        .unwrap_or_else(|| LedgerEntry::new(chat_id, Utc::now())))
}

async fn run_list(config: &BotConfig, args: ListArgs) -> Result<()> {
    let entry = chat_entry(config, &args.chat).await?;
    let roster = if args.members.is_empty() {
        entry
            .paid_names(args.category)
            .map(str::to_string)
            .collect()
    } else {
        args.members
    };
    print_stdout(&build_list(&roster, &entry, args.category))
}

async fn run_status(config: &BotConfig, args: StatusArgs) -> Result<()> {
    let entry = chat_entry(config, &args.chat).await?;
    print_stdout(&my_status(&entry, &args.name))
}

fn run_schema() -> Result<()> {
    let schema = racha_protocol::wire_schema()?;
    print_stdout(&serde_json::to_string_pretty(&schema)?)
}
