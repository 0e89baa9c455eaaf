#![allow(dead_code)]

use letmecount_mcp::app::App;
use letmecount_mcp::services::config::AppConfig;
use letmecount_mcp::services::dispatcher::Dispatcher;
use letmecount_mcp::services::logger::{LogLevel, Logger};
use letmecount_mcp::services::session::SessionState;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn restore_env(key: &str, previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

pub fn quiet_logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

pub fn config_for(api_url: &str) -> AppConfig {
    AppConfig::from_values(Some(api_url), None, None).expect("config")
}

pub fn dispatcher_for(api_url: &str) -> Dispatcher {
    Dispatcher::new(
        quiet_logger(),
        &config_for(api_url),
        Arc::new(SessionState::new()),
    )
    .expect("dispatcher")
}

pub fn app_for(api_url: &str) -> App {
    let dispatcher = dispatcher_for(api_url);
    let session = dispatcher.session().clone();
    App::with_executor(
        quiet_logger(),
        config_for(api_url),
        session,
        Arc::new(dispatcher),
    )
}

/// A local address with nothing listening on it.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}
