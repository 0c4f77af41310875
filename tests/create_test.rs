mod common;

use common::create_test_dir;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::fs;
use waymark::create::list_migration_files;
use waymark::{
    create_migration, run, Command, CommandContext, CommandOutput, Config, CreateError,
    CreateOptions, HandlebarsTemplate, MigrationKind, NamingMode,
};

async fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut entries = fs::read_dir(dir).await.expect("Should read dir");
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.expect("Should read entry") {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    names
}

// ============ Sequential Naming Tests ============

#[tokio::test]
async fn test_sequential_identifiers_are_gap_free() {
    let temp_dir = create_test_dir();
    let dir = temp_dir.path();

    for name in ["create_table", "add_users", "add_indices", "update_users"] {
        create_migration(
            dir,
            NamingMode::Sequential,
            CreateOptions {
                name: name.to_string(),
                kind: MigrationKind::Script,
                ..Default::default()
            },
        )
        .await
        .expect("Should create migration");
    }

    let files = file_names(dir).await;
    assert_eq!(files.len(), 4);
    for (i, file) in files.iter().enumerate() {
        let expected = format!("{:05}", i + 1);
        assert!(
            file.starts_with(&expected),
            "failed to find {} prefix in {}",
            expected,
            file
        );
    }
    assert_eq!(files[1], "00002_add_users.sql");
}

#[tokio::test]
async fn test_sequential_via_command() {
    let temp_dir = create_test_dir();
    let config = Config {
        dir: temp_dir.path().to_path_buf(),
        naming: NamingMode::Sequential,
        ..Config::default()
    };
    let context = CommandContext::new(config);

    for name in ["create_table", "add_users"] {
        let command = Command::parse("create", &[name.to_string()]).expect("Should parse");
        run(command, &context).await.expect("Should create");
    }

    assert_eq!(
        list_migration_files(temp_dir.path()).await.unwrap(),
        vec!["00001_create_table.rs", "00002_add_users.rs"]
    );
}

// ============ Template Tests ============

#[tokio::test]
async fn test_custom_template() {
    let temp_dir = create_test_dir();
    let dir = temp_dir.path();

    let template = HandlebarsTemplate::new(
        "\n{{lookup Values \"comment\"}}\nName {{CamelName}}\nVersion {{Version}}\n",
    )
    .expect("Should compile template");

    let mut values = BTreeMap::new();
    values.insert("comment".to_string(), "// hello world".to_string());

    create_migration(
        dir,
        NamingMode::Sequential,
        CreateOptions {
            name: "foo".to_string(),
            kind: MigrationKind::Procedural,
            values,
            template: Some(Arc::new(template)),
        },
    )
    .await
    .expect("Should create migration");

    let files = file_names(dir).await;
    assert_eq!(files.len(), 1, "should be only one file, got {:?}", files);
    assert_eq!(files[0], "00001_foo.rs");

    let content = fs::read_to_string(dir.join(&files[0])).await.unwrap();
    assert_eq!(content, "\n// hello world\nName Foo\nVersion 00001\n");
}

#[tokio::test]
async fn test_template_file_with_params_from_command() {
    let temp_dir = create_test_dir();
    let template_path = temp_dir.path().join("migration.hbs");
    fs::write(&template_path, "-- {{lookup Values \"author\"}} wrote {{CamelName}}\n")
        .await
        .unwrap();

    let migrations = temp_dir.path().join("migrations");
    let config = Config {
        dir: migrations.clone(),
        naming: NamingMode::Sequential,
        ..Config::default()
    };
    let template = HandlebarsTemplate::from_file(&template_path).await.unwrap();
    let context = CommandContext::new(config).with_template(Arc::new(template));

    let args: Vec<String> = ["seed_data", "sql", "author=ops"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let command = Command::parse("create", &args).unwrap();
    let output = run(command, &context).await.unwrap();

    let CommandOutput::Created(result) = output else {
        panic!("expected a created file");
    };
    let content = fs::read_to_string(&result.path).await.unwrap();
    assert_eq!(content, "-- ops wrote SeedData\n");
}

#[tokio::test]
async fn test_undefined_template_field_writes_nothing() {
    let temp_dir = create_test_dir();
    let template = HandlebarsTemplate::new("{{Missing}}").unwrap();

    let result = create_migration(
        temp_dir.path(),
        NamingMode::Sequential,
        CreateOptions {
            name: "foo".to_string(),
            kind: MigrationKind::Script,
            template: Some(Arc::new(template)),
            ..Default::default()
        },
    )
    .await;

    assert!(matches!(result, Err(CreateError::TemplateError(_))));
    assert!(file_names(temp_dir.path()).await.is_empty());
}

// ============ Fix Tests ============

#[tokio::test]
async fn test_fix_after_timestamp_creates() {
    let temp_dir = create_test_dir();
    let dir = temp_dir.path();

    create_migration(
        dir,
        NamingMode::Sequential,
        CreateOptions {
            name: "first".to_string(),
            kind: MigrationKind::Script,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    fs::write(dir.join("20240101120000_second.sql"), "-- +up\n")
        .await
        .unwrap();

    let context = CommandContext::new(Config {
        dir: dir.to_path_buf(),
        ..Config::default()
    });
    let output = run(Command::Fix, &context).await.unwrap();
    assert!(matches!(output, CommandOutput::Fixed(ref renamed) if renamed.len() == 1));

    assert_eq!(
        file_names(dir).await,
        vec!["00001_first.sql", "00002_second.sql"]
    );
}
