//! End-to-end checks of the configuration lifecycle against sample files.

use std::path::{Path, PathBuf};

use teamplify_core::config::{ConfigStore, OptionKey, SystemResolver, root_url};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_default_configuration_is_valid_except_product_key() {
    let source = ConfigStore::new();
    let errors = source.validate_with(&SystemResolver).unwrap_err();
    assert_eq!(
        errors.messages(),
        ["[main] product_key: Product key is missing"]
    );

    let text = source.dumps();
    assert!(text.starts_with('['));

    let mut store = ConfigStore::new();
    store.loads(&text).unwrap();
    let errors = store.validate_with(&SystemResolver).unwrap_err();
    assert_eq!(
        errors.messages(),
        ["[main] product_key: Product key is missing"]
    );
}

#[test]
fn test_valid_configuration() {
    let backup = TempDir::new().unwrap();
    let mut store = ConfigStore::new();
    store.load(&fixture("conf_sample_valid.ini")).unwrap();
    store.set_key(OptionKey::DbBackupMount, backup.path().to_string_lossy());

    let env = store.validate_with(&SystemResolver).unwrap().env();

    // Options absent from the file keep their defaults.
    assert_eq!(env["DB_PORT"], "3306");
    assert!(env.contains_key("CRYPTO_SIGNING_KEY"));
    assert_eq!(env["WORKER_FAT_COUNT"], "3");
    assert_eq!(env["COMPOSE_PROFILES"], "nossl");
    assert_eq!(root_url(&env), "http://localhost:8080");
}

#[test]
fn test_deeply_invalid_configuration() {
    let mut store = ConfigStore::new();
    store.load(&fixture("conf_sample_invalid.ini")).unwrap();

    let errors = store.validate_with(&SystemResolver).unwrap_err();
    assert_eq!(
        errors.messages(),
        [
            "[main] product_key: Invalid product key: 42",
            "[web] port: Must be an integer. You provided: gav",
            "[web] use_ssl: Must be one of the following: no, builtin, external. You provided: not sure",
            "[db] host: Can't resolve hostname: -1 # comment after value",
            "[db] port: Must be less or equal to 65535. You provided: 70000",
            "[db] backup_mount: Must be a directory: not a valid path",
            "[db] unknown_key: Unknown option",
            "[email] address_from: Invalid email: not even a email",
            "[email] smtp_protocol: Must be one of the following: plain, ssl, tls. You provided: tcp",
            "Unknown section: [unknown_section]",
        ]
    );
    assert!(errors.to_string().starts_with("10 errors found:\n -> "));
}

#[test]
fn test_configure_round_trip_strips_unknown_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("teamplify.ini");
    std::fs::copy(fixture("conf_sample_invalid.ini"), &path).unwrap();

    let mut store = ConfigStore::new();
    store.load(&path).unwrap();
    let saved = store.remove_unknown().dump(None).unwrap();
    assert_eq!(saved, path);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("[unknown_section]"));
    assert!(!text.contains("unknown_key"));
    assert!(text.contains("product_key = 42"));
    assert!(text.contains("[worker]"));
    assert!(text.contains("; please note: Teamplify does not require email address confirmation"));

    let mut reloaded = ConfigStore::new();
    reloaded.load(&path).unwrap();
    assert_eq!(reloaded.dumps(), store.dumps());
}
