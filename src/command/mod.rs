//! Command surface: parses a command name plus arguments and dispatches it
//! to the engine or to the file creation helpers.
//!
//! # Usage
//!
//! ```ignore
//! let command = Command::parse("up-to", &["20240101000000".to_string()])?;
//! let output = run(command, &context).await?;
//! print!("{output}");
//! ```

mod types;

pub use types::{parse_params, Command, CommandOutput};

use crate::config::Config;
use crate::create::{create_migration, fix_migrations, CreateError, CreateOptions};
use crate::engine::MigrationExecutor;
use crate::ledger::VersionLedger;
use crate::migration::{
    collect_migrations, DirSource, MigrationError, MigrationSource, ProceduralRegistry,
};
use crate::store::{Store, StoreError};
use crate::template::MigrationTemplate;
use crate::utils::{MAX_VERSION, MIN_VERSION};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0:?}: no such command")]
    UnknownCommand(String),

    #[error("Command '{0}' needs a database connection")]
    StoreRequired(&'static str),

    #[error("Migration error: {0}")]
    MigrationError(#[from] MigrationError),

    #[error("Create error: {0}")]
    CreateError(#[from] CreateError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub config: Config,
    pub registry: ProceduralRegistry,
    /// Where migrations are read from. `None` = `config.dir` on disk.
    pub source: Option<Arc<dyn MigrationSource>>,
    pub store: Option<Arc<dyn Store>>,
    /// Custom template for `create`.
    pub template: Option<Arc<dyn MigrationTemplate>>,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: ProceduralRegistry::new(),
            source: None,
            store: None,
            template: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_registry(mut self, registry: ProceduralRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn MigrationSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_template(mut self, template: Arc<dyn MigrationTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    async fn executor(&self, command: &Command) -> Result<MigrationExecutor, CommandError> {
        let store = self
            .store
            .clone()
            .ok_or(CommandError::StoreRequired(command.name()))?;

        let migrations = match &self.source {
            Some(source) => {
                collect_migrations(source.as_ref(), &self.registry, MIN_VERSION, MAX_VERSION)
                    .await?
            }
            None => {
                let source = DirSource::new(&self.config.dir);
                collect_migrations(&source, &self.registry, MIN_VERSION, MAX_VERSION).await?
            }
        };

        let ledger = VersionLedger::new(store, self.config.table.clone())?;
        Ok(MigrationExecutor::new(migrations, ledger, self.config.options)
            .with_cancellation(self.cancel.clone()))
    }
}

/// Run `command` against `context`.
pub async fn run(command: Command, context: &CommandContext) -> Result<CommandOutput, CommandError> {
    debug!(command = command.name(), "Running command");

    match command {
        Command::Create { name, kind, params } => {
            let options = CreateOptions {
                name,
                kind,
                values: params,
                template: context.template.clone(),
            };
            let result = create_migration(&context.config.dir, context.config.naming, options).await?;
            Ok(CommandOutput::Created(result))
        }
        Command::Fix => Ok(CommandOutput::Fixed(
            fix_migrations(&context.config.dir).await?,
        )),
        Command::Up => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.up().await?))
        }
        Command::UpByOne => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.up_by_one().await?))
        }
        Command::UpTo(version) => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.up_to(version).await?))
        }
        Command::Down => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.down().await?))
        }
        Command::DownTo(version) => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.down_to(version).await?))
        }
        Command::Redo => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.redo().await?))
        }
        Command::Reset => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Migrated(executor.reset().await?))
        }
        Command::Status => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Status(executor.status().await?))
        }
        Command::Version => {
            let executor = context.executor(&command).await?;
            Ok(CommandOutput::Version(executor.version().await?))
        }
    }
}
