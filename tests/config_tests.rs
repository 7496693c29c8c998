//! Configuration loading from files and the process environment.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pretty_assertions::assert_eq;

use khoj_chat::chat::FileAccessMode;
use khoj_chat::config::KhojConfig;
use khoj_chat::error::KhojError;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets variables for the duration of a test and restores them on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = vars
            .iter()
            .map(|(name, value)| {
                let previous = std::env::var(name).ok();
                std::env::set_var(name, value);
                (*name, previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, previous) in &self.saved {
            match previous {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[test]
fn from_file_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
url = "http://localhost:42110"
api_key = "kk-local"
results_count = 3
agent = "sage"
file_access = "write"
"#,
    )
    .unwrap();

    let config = KhojConfig::from_file(&path).unwrap();
    assert_eq!(config.url, "http://localhost:42110");
    assert_eq!(config.api_key.as_deref(), Some("kk-local"));
    assert_eq!(config.results_count, 3);
    assert_eq!(config.agent.as_deref(), Some("sage"));
    assert_eq!(config.file_access, FileAccessMode::Write);
    assert_eq!(config.timeout_secs, 120);
}

#[test]
fn malformed_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "results_count = \"three\"").unwrap();

    match KhojConfig::from_file(&path) {
        Err(KhojError::Configuration(msg)) => assert!(msg.contains("broken.toml")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn from_env_overlays_defaults() {
    let _env = EnvGuard::set(&[
        ("KHOJ_URL", "https://khoj.example.org/"),
        ("KHOJ_TIMEOUT_SECS", "30"),
        ("KHOJ_TIMEZONE", "America/Toronto"),
    ]);

    let config = KhojConfig::from_env().unwrap();
    assert_eq!(config.url, "https://khoj.example.org");
    assert_eq!(config.chat_url(), "https://khoj.example.org/api/chat?client=khoj-chat");
    assert_eq!(config.timeout_secs, 30);
    assert_eq!(config.location.timezone.as_deref(), Some("America/Toronto"));
}

#[test]
fn from_env_rejects_unknown_access_mode() {
    let _env = EnvGuard::set(&[("KHOJ_FILE_ACCESS", "admin")]);
    assert!(matches!(
        KhojConfig::from_env(),
        Err(KhojError::Configuration(msg)) if msg.contains("KHOJ_FILE_ACCESS")
    ));
}
