//! Configuration file loading tests

use modloader::{LoaderConfig, LoaderError, PathResolver};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loader.toml");
    fs::write(
        &path,
        r#"
cwd = "https://example.com/app/"
extension = ".mjs"

[alias]
react = "vendor/react"

[paths]
vendor = "https://cdn.example.com/vendor"

[logging]
filter = "modloader=debug"
"#,
    )
    .unwrap();

    let config = LoaderConfig::from_file(&path).unwrap();
    assert_eq!(config.protocol(), "https:");
    assert_eq!(config.base(), "https://example.com/app/");
    assert_eq!(
        config.logging.as_ref().and_then(|l| l.filter.as_deref()),
        Some("modloader=debug")
    );

    let resolver = PathResolver::new(&config);
    assert_eq!(
        resolver.resolve("react", None),
        "https://cdn.example.com/vendor/react.mjs"
    );
}

#[test]
fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loader.json");
    fs::write(
        &path,
        r#"{"cwd": "http://h/app/", "base": "http://h/app/lib/", "alias": {"a": "b"}}"#,
    )
    .unwrap();

    let config = LoaderConfig::from_file(&path).unwrap();
    assert_eq!(config.base(), "http://h/app/lib/");
    assert_eq!(config.extension, ".js");
    assert_eq!(config.alias.get("a").map(String::as_str), Some("b"));
}

#[test]
fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loader.toml");
    fs::write(&path, "cwd = \"http://h/app\"\n").unwrap();
    assert!(matches!(
        LoaderConfig::from_file(&path),
        Err(LoaderError::Config(_))
    ));

    fs::write(&path, "alias = 3\n").unwrap();
    assert!(matches!(
        LoaderConfig::from_file(&path),
        Err(LoaderError::Config(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = LoaderConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}
