//! Environment discovery order. Everything runs in one test because the
//! working directory and the environment variables are process wide.

use std::env;
use std::fs;

use lib_rtcv::configs::env_config::{ENV_CONTENTS_VAR, ENV_FILE_VAR};
use lib_rtcv::{ConfigError, LoginUsersRestriction, ScraperClient, ScraperEnv, ScraperError};

fn env_json(primary: &str) -> String {
    format!(
        r#"{{
            "login_users": [{{ "username": "scraper", "password": "pw" }}],
            "primary_server": {{
                "server_location": "{}",
                "api_key_id": "id",
                "api_key": "key"
            }}
        }}"#,
        primary
    )
}

fn set(key: &str, value: &str) {
    // SAFETY: this test binary runs a single test, no other thread reads the environment.
    unsafe { env::set_var(key, value) };
}

fn unset(key: &str) {
    // SAFETY: see `set`.
    unsafe { env::remove_var(key) };
}

#[test]
fn env_sources_are_tried_in_order() {
    let dir = tempfile::tempdir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    unset(ENV_FILE_VAR);
    unset(ENV_CONTENTS_VAR);

    // Nothing configured.
    let err = ScraperEnv::load().unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().contains(ENV_CONTENTS_VAR));

    // An unreadable env.json defers to the contents variable.
    fs::create_dir("env.json").unwrap();
    set(ENV_CONTENTS_VAR, &env_json("https://unreadable.example.org"));
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://unreadable.example.org");
    unset(ENV_CONTENTS_VAR);
    let err = ScraperEnv::load().unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("env.json"));
    fs::remove_dir("env.json").unwrap();

    // env.jsonc with comments is the last resort.
    fs::write(
        "env.jsonc",
        format!("// generated\n{}", env_json("https://jsonc.example.org")),
    )
    .unwrap();
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://jsonc.example.org");

    // The contents variable wins over env.jsonc.
    set(ENV_CONTENTS_VAR, &env_json("https://var.example.org"));
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://var.example.org");

    // env.json wins over the contents variable.
    fs::write("env.json", env_json("https://json.example.org")).unwrap();
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://json.example.org");

    // A custom file replaces env.json.
    fs::write("custom.json", env_json("https://custom.example.org")).unwrap();
    set(ENV_FILE_VAR, "custom.json");
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://custom.example.org");

    // A missing custom file falls back to the variable, then fails without trying env.jsonc.
    set(ENV_FILE_VAR, "missing.json");
    let loaded = ScraperEnv::load().unwrap();
    assert_eq!(loaded.primary_server.server_location, "https://var.example.org");
    unset(ENV_CONTENTS_VAR);
    let err = ScraperEnv::load().unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().contains("missing.json"));

    // Invalid contents are reported, not skipped.
    unset(ENV_FILE_VAR);
    fs::write("env.json", r#"{ "primary_server": { "server_location": "" } }"#).unwrap();
    assert!(ScraperEnv::load().is_err());

    // The client builds straight from the discovered env.
    fs::write("env.json", env_json("https://client.example.org")).unwrap();
    let client = ScraperClient::from_env(LoginUsersRestriction::One).unwrap();
    assert_eq!(client.servers().count(), 1);
    assert_eq!(client.login_user().map(|u| u.username.as_str()), Some("scraper"));

    assert!(ScraperClient::from_env(LoginUsersRestriction::None).is_ok());
    fs::write(
        "env.json",
        r#"{ "primary_server": { "server_location": "https://a.example.org", "api_key_id": "id", "api_key": "key" } }"#,
    )
    .unwrap();
    let err = ScraperClient::from_env(LoginUsersRestriction::OneOrMore).map(|_| ()).unwrap_err();
    assert!(matches!(
        err,
        ScraperError::Config(ConfigError::LoginUsers { found: 0, .. })
    ));
}
