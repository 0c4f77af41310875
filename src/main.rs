use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use waymark::{
    read_config, run, Command, CommandContext, Config, HandlebarsTemplate, NamingMode,
    SqliteStore, Store, CONFIG_FILE,
};

const USAGE_COMMANDS: &str = "Commands:
    up                   Migrate the DB to the most recent version available
    up-by-one            Migrate the DB up by 1
    up-to VERSION        Migrate the DB to a specific VERSION
    down                 Roll back the version by 1
    down-to VERSION      Roll back to a specific VERSION
    redo                 Re-run the latest migration
    reset                Roll back all migrations
    status               Dump the migration status for the current DB
    version              Print the current version of the database
    create NAME [rs|sql] [key=value ...]
                         Creates new migration file with the current timestamp
    fix                  Apply sequential ordering to migrations";

/// Waymark - versioned schema migrations for SQLite
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = USAGE_COMMANDS)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, env = "WAYMARK_DATABASE")]
    database: Option<PathBuf>,

    /// Directory holding migration files
    #[arg(long, env = "WAYMARK_DIR")]
    dir: Option<PathBuf>,

    /// Name of the version history table
    #[arg(long, env = "WAYMARK_TABLE")]
    table: Option<String>,

    /// Use sequential numbering for new migrations
    #[arg(short, long)]
    sequential: bool,

    /// Apply migrations without reading or writing version history
    #[arg(long)]
    no_versioning: bool,

    /// Apply unapplied migrations older than the current version
    #[arg(long)]
    allow_missing: bool,

    /// Custom template file for `create`
    #[arg(long)]
    template: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Command to run
    command: String,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Args {
    /// Layer command-line flags over the file configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.dir {
            config.dir = dir.clone();
        }
        if let Some(table) = &self.table {
            config.table = table.clone();
        }
        if self.sequential {
            config.naming = NamingMode::Sequential;
        }
        config.options.no_versioning |= self.no_versioning;
        config.options.allow_missing |= self.allow_missing;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "waymark=debug" } else { "waymark=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = read_config(&args.config)
        .await
        .with_context(|| format!("failed to read {}", args.config.display()))?
        .unwrap_or_default();
    let config = args.apply(config);

    let command = Command::parse(&args.command, &args.args)?;

    // Cancel the run on Ctrl-C; the migration in flight rolls back
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling migration run");
            signal_token.cancel();
        }
    });

    let mut context = CommandContext::new(config).with_cancellation(cancel);

    if command.needs_store() {
        let path = args
            .database
            .as_ref()
            .context("no database given: pass --database or set WAYMARK_DATABASE")?;
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?,
        );
        info!(database = %path.display(), "Opened database");
        context = context.with_store(store);
    }

    if let Some(path) = &args.template {
        let template = HandlebarsTemplate::from_file(path)
            .await
            .with_context(|| format!("failed to load template {}", path.display()))?;
        context = context.with_template(Arc::new(template));
    }

    let output = run(command, &context).await?;
    print!("{}", output);
    Ok(())
}
