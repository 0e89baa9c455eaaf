mod common;

use common::{restore_env, ENV_LOCK};
use letmecount_mcp::errors::ToolError;
use letmecount_mcp::services::config::AppConfig;
use std::time::Duration;

const KEYS: [&str; 3] = [
    "LETMECOUNT_API_URL",
    "LETMECOUNT_MCP_PORT",
    "LETMECOUNT_HTTP_TIMEOUT_MS",
];

fn snapshot() -> Vec<(&'static str, Option<String>)> {
    KEYS.iter().map(|key| (*key, std::env::var(key).ok())).collect()
}

fn restore(previous: Vec<(&'static str, Option<String>)>) {
    for (key, value) in previous {
        restore_env(key, value);
    }
}

#[tokio::test]
async fn defaults_apply_without_environment() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    for key in KEYS {
        std::env::remove_var(key);
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.api_url.as_str(), "http://localhost:8888/");
    assert_eq!(config.port, 8000);
    assert_eq!(config.request_timeout, None);

    restore(previous);
}

#[tokio::test]
async fn environment_values_are_used() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    std::env::set_var("LETMECOUNT_API_URL", "https://count.example.test/api");
    std::env::set_var("LETMECOUNT_MCP_PORT", "8123");
    std::env::set_var("LETMECOUNT_HTTP_TIMEOUT_MS", "1500");

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.api_url.as_str(), "https://count.example.test/api");
    assert_eq!(config.port, 8123);
    assert_eq!(config.request_timeout, Some(Duration::from_millis(1500)));

    restore(previous);
}

#[tokio::test]
async fn invalid_environment_becomes_config_error_with_hint() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    std::env::set_var("LETMECOUNT_API_URL", "not a url");
    std::env::remove_var("LETMECOUNT_MCP_PORT");
    std::env::remove_var("LETMECOUNT_HTTP_TIMEOUT_MS");

    let err: ToolError = AppConfig::from_env().expect_err("invalid").into();
    assert_eq!(err.code, "CONFIG");
    assert!(err.message.contains("not a url"));
    assert!(err.hint.as_deref().unwrap_or("").contains("LETMECOUNT_API_URL"));

    restore(previous);
}
