//! Migration definitions: parsing, ordering and discovery.
//!
//! # Overview
//!
//! - A [`MigrationSource`] lists artifacts (files on disk or embedded strings)
//! - The parser turns each artifact into a [`Migration`]: SQL files carry
//!   their statements between `-- +up` / `-- +down` markers, Rust migrations
//!   are looked up in a [`ProceduralRegistry`] by file name
//! - A [`MigrationCollection`] holds them sorted by version and answers the
//!   range and neighbour queries the engine needs
//!
//! # Usage
//!
//! ```ignore
//! let source = DirSource::new("migrations");
//! let migrations = collect_migrations(&source, &registry, MIN_VERSION, MAX_VERSION).await?;
//! let pending = migrations.up_to(current, MAX_VERSION);
//! ```

mod collection;
mod parser;
mod registry;
mod source;
mod types;

pub use collection::MigrationCollection;
pub use parser::{parse_artifact, parse_kind, parse_version};
pub use registry::ProceduralRegistry;
pub use source::{collect_migrations, is_migration_file_name, DirSource, EmbeddedSource, MigrationSource};
pub use types::{
    ActionContext, ActionError, Artifact, Migration, MigrationBody, MigrationDirection,
    MigrationError, MigrationKind, ProceduralMigration,
};
