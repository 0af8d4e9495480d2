#![allow(clippy::unwrap_used)]
// File round-trip tests for profile storage.

use pretty_assertions::assert_eq;

use diafon_config::{Config, Profile, load_config_from, save_config_to};

#[test]
fn test_missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.output, "table");
    assert_eq!(cfg.defaults.timeout, 30);
    assert!(cfg.profiles.is_empty());
}

#[test]
fn test_saved_profile_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut profile = Profile::new("user@example.com", "0A1B2C3D");
    profile.title = Some("Ada Lovelace".into());
    profile.password_env = Some("HOME_DOOR_PW".into());

    let mut cfg = Config::default();
    cfg.upsert_profile("default", profile.clone());
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.profile("default").unwrap(), &profile);
}

#[test]
fn test_hand_written_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "home"

[defaults]
output = "json"
scan_interval = 60

[profiles.home]
email = "user@example.com"
phone_id = "PHONE"
push = false
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.active_profile_name(None), "home");
    assert_eq!(cfg.defaults.output, "json");
    assert_eq!(cfg.defaults.scan_interval, 60);
    assert!(cfg.defaults.push);

    let home = cfg.profile("home").unwrap();
    assert_eq!(home.push, Some(false));
    assert!(home.password.is_none());
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "profiles = 3").unwrap();

    assert!(load_config_from(&path).is_err());
}
