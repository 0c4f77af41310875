//! Turns one migration artifact into a [`Migration`].

use super::registry::ProceduralRegistry;
use super::types::{Artifact, Migration, MigrationBody, MigrationError, MigrationKind};
use crate::utils::MIN_VERSION;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^--\s*\+(up|down|statement-begin|statement-end)\s*$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Up,
    Down,
    StatementBegin,
    StatementEnd,
}

fn marker(line: &str) -> Option<Marker> {
    let caps = MARKER.captures(line)?;
    match caps[1].to_ascii_lowercase().as_str() {
        "up" => Some(Marker::Up),
        "down" => Some(Marker::Down),
        "statement-begin" => Some(Marker::StatementBegin),
        "statement-end" => Some(Marker::StatementEnd),
        _ => None,
    }
}

/// Extract the version prefix from a file name (`00042_add_users.sql` -> 42).
///
/// Versions start at 1; 0 is the ledger's "nothing applied" value.
pub fn parse_version(name: &str) -> Result<i64, MigrationError> {
    let prefix = name.split(['_', '.']).next().unwrap_or_default();

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MigrationError::MalformedIdentifier(name.to_string()));
    }

    match prefix.parse::<i64>() {
        Ok(version) if version > MIN_VERSION => Ok(version),
        _ => Err(MigrationError::MalformedIdentifier(name.to_string())),
    }
}

/// Determine the kind of an artifact from its extension.
pub fn parse_kind(name: &str) -> Result<MigrationKind, MigrationError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext {
        "sql" => Ok(MigrationKind::Script),
        "rs" => Ok(MigrationKind::Procedural),
        other => Err(MigrationError::UnsupportedKind(
            name.to_string(),
            other.to_string(),
        )),
    }
}

/// Parse an artifact into a migration.
///
/// Script artifacts carry their statements in the body; procedural ones are
/// resolved from `registry` by file name.
pub fn parse_artifact(
    artifact: &Artifact,
    registry: &ProceduralRegistry,
) -> Result<Migration, MigrationError> {
    let version = parse_version(&artifact.name)?;
    let kind = parse_kind(&artifact.name)?;

    let body = match kind {
        MigrationKind::Script => {
            let (up, down) = parse_script(&artifact.name, &artifact.body)?;
            MigrationBody::Script { up, down }
        }
        MigrationKind::Procedural => {
            let procedural = registry
                .get(&artifact.name)
                .ok_or_else(|| MigrationError::Unregistered(artifact.name.clone()))?;
            MigrationBody::Procedural(procedural)
        }
    };

    Ok(Migration {
        version,
        name: artifact.name.clone(),
        kind,
        body,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Split a SQL body into up and down statements.
fn parse_script(name: &str, body: &str) -> Result<(Vec<String>, Vec<String>), MigrationError> {
    let mut up = Vec::new();
    let mut down = Vec::new();
    let mut section = Section::Preamble;
    let mut seen_up = false;
    let mut in_block = false;
    let mut buf = String::new();

    let mut flush = |section: Section, buf: &mut String| {
        let statement = buf.trim();
        if !statement.is_empty() {
            match section {
                Section::Up => up.push(statement.to_string()),
                Section::Down => down.push(statement.to_string()),
                Section::Preamble => {}
            }
        }
        buf.clear();
    };

    for line in body.lines() {
        let trimmed = line.trim();

        if let Some(marker) = marker(trimmed) {
            match marker {
                Marker::Up | Marker::Down => {
                    if in_block {
                        return Err(MigrationError::UnterminatedStatement(name.to_string()));
                    }
                    flush(section, &mut buf);
                    if marker == Marker::Up {
                        section = Section::Up;
                        seen_up = true;
                    } else {
                        section = Section::Down;
                    }
                }
                Marker::StatementBegin => {
                    flush(section, &mut buf);
                    in_block = true;
                }
                Marker::StatementEnd => {
                    flush(section, &mut buf);
                    in_block = false;
                }
            }
            continue;
        }

        if section == Section::Preamble {
            continue;
        }
        if !in_block && (trimmed.is_empty() || trimmed.starts_with("--")) {
            continue;
        }

        buf.push_str(line);
        buf.push('\n');

        if !in_block && trimmed.ends_with(';') {
            flush(section, &mut buf);
        }
    }

    if in_block {
        return Err(MigrationError::UnterminatedStatement(name.to_string()));
    }
    flush(section, &mut buf);

    if !seen_up {
        return Err(MigrationError::MissingUpMarker(name.to_string()));
    }

    Ok((up, down))
}
