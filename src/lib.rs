pub mod command;
pub mod config;
pub mod create;
pub mod engine;
pub mod ledger;
pub mod migration;
pub mod store;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use command::{run, Command, CommandContext, CommandError, CommandOutput};
pub use config::{read_config, write_config, Config, ConfigError, NamingMode, RunOptions, CONFIG_FILE};
pub use create::{create_migration, fix_migrations, CreateError, CreateOptions, CreateResult};
pub use engine::{AppliedMigration, MigrationExecutor, MigrationResult, MigrationStatus};
pub use ledger::{VersionLedger, VersionRecord};
pub use migration::{
    collect_migrations, ActionContext, ActionError, Artifact, DirSource, EmbeddedSource, Migration,
    MigrationCollection, MigrationDirection, MigrationError, MigrationKind, MigrationSource,
    ProceduralMigration, ProceduralRegistry,
};
pub use store::{SqliteStore, Store, StoreError, UnitOfWork};
pub use template::{HandlebarsTemplate, MigrationTemplate, TemplateContext, TemplateError};
pub use utils::{MAX_VERSION, MIN_VERSION};
