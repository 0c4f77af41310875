use super::CommandError;
use crate::create::CreateResult;
use crate::engine::{MigrationResult, MigrationStatus};
use crate::migration::{MigrationDirection, MigrationKind};
use crate::utils::MIN_VERSION;
use std::collections::BTreeMap;
use std::fmt;

/// Every command the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Up,
    UpByOne,
    UpTo(i64),
    Down,
    DownTo(i64),
    Create {
        name: String,
        kind: MigrationKind,
        params: BTreeMap<String, String>,
    },
    Redo,
    Reset,
    Status,
    Version,
    Fix,
}

impl Command {
    /// Parse a command name and its positional arguments.
    pub fn parse(name: &str, args: &[String]) -> Result<Self, CommandError> {
        match name {
            "up" => Ok(Command::Up),
            "up-by-one" => Ok(Command::UpByOne),
            "up-to" => Ok(Command::UpTo(parse_version_arg(name, args)?)),
            "down" => Ok(Command::Down),
            "down-to" => Ok(Command::DownTo(parse_version_arg(name, args)?)),
            "create" => parse_create(args),
            "redo" => Ok(Command::Redo),
            "reset" => Ok(Command::Reset),
            "status" => Ok(Command::Status),
            "version" => Ok(Command::Version),
            "fix" => Ok(Command::Fix),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Up => "up",
            Command::UpByOne => "up-by-one",
            Command::UpTo(_) => "up-to",
            Command::Down => "down",
            Command::DownTo(_) => "down-to",
            Command::Create { .. } => "create",
            Command::Redo => "redo",
            Command::Reset => "reset",
            Command::Status => "status",
            Command::Version => "version",
            Command::Fix => "fix",
        }
    }

    /// Whether the command reads or writes the database.
    pub fn needs_store(&self) -> bool {
        !matches!(self, Command::Create { .. } | Command::Fix)
    }
}

fn parse_version_arg(command: &str, args: &[String]) -> Result<i64, CommandError> {
    let arg = args.first().ok_or_else(|| {
        CommandError::InvalidArgument(format!(
            "{} must be of form: waymark [OPTIONS] {} VERSION",
            command, command
        ))
    })?;

    let version: i64 = arg.parse().map_err(|_| {
        CommandError::InvalidArgument(format!("version must be a number (got '{}')", arg))
    })?;

    if version < MIN_VERSION {
        return Err(CommandError::InvalidArgument(format!(
            "version must not be negative (got '{}')",
            arg
        )));
    }

    Ok(version)
}

fn parse_create(args: &[String]) -> Result<Command, CommandError> {
    let name = args.first().ok_or_else(|| {
        CommandError::InvalidArgument(
            "create must be of form: waymark [OPTIONS] create NAME [rs|sql] [key=value ...]"
                .to_string(),
        )
    })?;

    let kind = match args.get(1) {
        Some(token) => MigrationKind::from_token(token).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "unknown migration kind '{}', expected 'rs' or 'sql'",
                token
            ))
        })?,
        None => MigrationKind::default(),
    };

    Ok(Command::Create {
        name: name.clone(),
        kind,
        params: parse_params(args)?,
    })
}

/// `key=value` pairs after `NAME KIND`. Pairs are only recognised once the
/// kind has been given explicitly.
pub fn parse_params(args: &[String]) -> Result<BTreeMap<String, String>, CommandError> {
    let mut params = BTreeMap::new();
    for pair in args.iter().skip(2) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "expected pairs separated by equal sign 'key=value' (got '{}')",
                pair
            ))
        })?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

/// What a command produced.
#[derive(Debug, Clone)]
pub enum CommandOutput {
    Migrated(MigrationResult),
    Created(CreateResult),
    Fixed(Vec<(String, String)>),
    Status(Vec<MigrationStatus>),
    Version(i64),
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Migrated(result) => {
                if result.applied.is_empty() {
                    return writeln!(f, "no migrations to run. current version: {}", result.to_version);
                }
                for applied in &result.applied {
                    let label = match applied.direction {
                        MigrationDirection::Up => "OK  ",
                        MigrationDirection::Down => "UNDO",
                    };
                    writeln!(f, "{} {}", label, applied.name)?;
                }
                writeln!(f, "current version: {}", result.to_version)
            }
            CommandOutput::Created(result) => {
                writeln!(f, "Created new file: {}", result.path.display())
            }
            CommandOutput::Fixed(renamed) => {
                if renamed.is_empty() {
                    return writeln!(f, "nothing to fix");
                }
                for (from, to) in renamed {
                    writeln!(f, "RENAMED {} => {}", from, to)?;
                }
                Ok(())
            }
            CommandOutput::Status(statuses) => {
                writeln!(f, "    Applied At                  Migration")?;
                writeln!(f, "    =======================================")?;
                for status in statuses {
                    let applied = status
                        .applied_at
                        .map(|at| at.format("%a %b %e %H:%M:%S %Y").to_string())
                        .unwrap_or_else(|| "Pending".to_string());
                    writeln!(f, "    {:<24} -- {}", applied, status.name)?;
                }
                Ok(())
            }
            CommandOutput::Version(version) => writeln!(f, "version {}", version),
        }
    }
}
