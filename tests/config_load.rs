// tests/config_load.rs
// Mutates process env and CWD, so every test here is serialized.

use std::{env, fs};

use adlapse::config::{AdLapseConfig, ENV_CONFIG_PATH};
use adlapse::content::news::FeedFormat;
use serial_test::serial;

const ENV_KEYS: [&str; 8] = [
    ENV_CONFIG_PATH,
    "ADLAPSE_POLL_MS",
    "ADLAPSE_ROTATION_SECS",
    "ADLAPSE_PREFS_TIMEOUT_MS",
    "ADLAPSE_FETCH_TIMEOUT_MS",
    "ADLAPSE_BIND",
    "ADLAPSE_CONTENT_URL",
    "ADLAPSE_PREFS_PATH",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[serial]
#[test]
fn default_uses_env_path_then_cwd_then_builtin() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) nothing on disk: built-in defaults
    let cfg = AdLapseConfig::load_default().unwrap();
    assert_eq!(cfg.detection.poll_interval_ms, 500);
    assert_eq!(cfg.detection.rotation_interval_secs, 20);
    assert_eq!(cfg.service.endpoint, "http://127.0.0.1:8787");

    // 2) ./config/adlapse.toml
    fs::create_dir_all("config").unwrap();
    fs::write(
        "config/adlapse.toml",
        "[detection]\nrotation_interval_secs = 30\n",
    )
    .unwrap();
    let cfg = AdLapseConfig::load_default().unwrap();
    assert_eq!(cfg.detection.rotation_interval_secs, 30);

    // 3) explicit path wins
    let custom = tmp.path().join("custom.toml");
    fs::write(
        &custom,
        r#"
[content]
news_format = "rss"
news_url = "https://news.example.test/world.xml"
news_label = "World Desk"

[selectors]
ad_timer = [".vp-ad-countdown"]
"#,
    )
    .unwrap();
    env::set_var(ENV_CONFIG_PATH, &custom);
    let cfg = AdLapseConfig::load_default().unwrap();
    assert_eq!(cfg.detection.rotation_interval_secs, 20);
    assert_eq!(cfg.content.news_format, FeedFormat::Rss);
    assert_eq!(cfg.content.news_label, "World Desk");
    assert_eq!(cfg.selectors.ad_timer, vec![".vp-ad-countdown".to_string()]);
    assert_eq!(
        cfg.selectors.seek_unavailable,
        ".atvwebplayersdk-seek-unavailable-text"
    );

    // 4) explicit path that does not exist is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
    assert!(AdLapseConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(old).unwrap();
}

#[serial]
#[test]
fn env_overrides_then_sanitizing() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("adlapse.toml");
    fs::write(&path, "[detection]\npoll_interval_ms = 250\n").unwrap();

    env::set_var("ADLAPSE_ROTATION_SECS", "5");
    env::set_var("ADLAPSE_POLL_MS", "0");
    env::set_var("ADLAPSE_FETCH_TIMEOUT_MS", "not-a-number");
    env::set_var("ADLAPSE_CONTENT_URL", " http://10.0.0.2:9000/ ");
    env::set_var("ADLAPSE_PREFS_PATH", "/var/lib/adlapse/prefs.json");

    let cfg = AdLapseConfig::load_from(&path).unwrap();
    assert_eq!(cfg.detection.rotation_interval_secs, 5);
    // zero from env is sanitized back to the default, not to the file value
    assert_eq!(cfg.detection.poll_interval_ms, 500);
    assert_eq!(cfg.detection.fetch_timeout_ms, 10_000);
    assert_eq!(cfg.service.endpoint, "http://10.0.0.2:9000");
    assert_eq!(
        cfg.preferences.path,
        std::path::PathBuf::from("/var/lib/adlapse/prefs.json")
    );

    clear_env();
}

#[serial]
#[test]
fn malformed_toml_is_reported_with_path() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.toml");
    fs::write(&path, "[detection\npoll_interval_ms = ").unwrap();

    let err = AdLapseConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));
}
