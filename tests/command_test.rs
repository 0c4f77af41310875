mod common;

use common::{create_test_dir, init_migrations_dir, write_table_migration};
use std::sync::Arc;
use waymark::{
    run, Command, CommandContext, CommandError, CommandOutput, Config, MigrationError,
    SqliteStore, Store,
};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============ Dispatch Tests ============

#[tokio::test]
async fn test_full_cycle_through_commands() {
    let temp_dir = create_test_dir();
    let dir = init_migrations_dir(temp_dir.path()).await;
    write_table_migration(&dir, "00001_users.sql", "users").await;
    write_table_migration(&dir, "00002_posts.sql", "posts").await;
    write_table_migration(&dir, "00003_tags.sql", "tags").await;

    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::open(&temp_dir.path().join("app.db")).expect("Should open database"));
    let context = CommandContext::new(Config {
        dir,
        ..Config::default()
    })
    .with_store(store);

    let steps: Vec<(&str, Vec<String>, i64)> = vec![
        ("up-by-one", vec![], 1),
        ("up-to", args(&["2"]), 2),
        ("up", vec![], 3),
        ("down", vec![], 2),
        ("redo", vec![], 2),
        ("down-to", args(&["1"]), 1),
        ("reset", vec![], 0),
    ];

    for (name, command_args, expected) in steps {
        let command = Command::parse(name, &command_args).expect("Should parse command");
        let output = run(command, &context)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e));
        match output {
            CommandOutput::Migrated(result) => {
                assert_eq!(result.to_version, expected, "after {}", name)
            }
            other => panic!("unexpected output from {}: {:?}", name, other),
        }
    }

    let output = run(Command::Version, &context).await.unwrap();
    assert!(matches!(output, CommandOutput::Version(0)));
}

#[tokio::test]
async fn test_down_with_nothing_applied() {
    let temp_dir = create_test_dir();
    let dir = init_migrations_dir(temp_dir.path()).await;
    write_table_migration(&dir, "00001_users.sql", "users").await;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let context = CommandContext::new(Config {
        dir,
        ..Config::default()
    })
    .with_store(store);

    let result = run(Command::Down, &context).await;
    assert!(matches!(
        result,
        Err(CommandError::MigrationError(MigrationError::NoPrevious(0)))
    ));
}

#[tokio::test]
async fn test_missing_migration_dir() {
    let temp_dir = create_test_dir();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let context = CommandContext::new(Config {
        dir: temp_dir.path().join("nowhere"),
        ..Config::default()
    })
    .with_store(store);

    let result = run(Command::Status, &context).await;
    assert!(matches!(
        result,
        Err(CommandError::MigrationError(MigrationError::SourceNotFound(_)))
    ));
}

// ============ Parse Tests ============

#[test]
fn test_invalid_version_argument_is_reported() {
    let err = Command::parse("down-to", &args(&["v2"])).unwrap_err();
    assert!(matches!(err, CommandError::InvalidArgument(_)));
    assert!(err.to_string().contains("v2"));
}

#[test]
fn test_malformed_create_pair() {
    let err = Command::parse("create", &args(&["users", "sql", "comment"])).unwrap_err();
    assert!(err.to_string().contains("key=value"));
}
