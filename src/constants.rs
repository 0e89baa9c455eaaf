pub mod server {
    pub const NAME: &str = "letmecount-api";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PROTOCOL_VERSION: &str = "2025-06-18";
    pub const LOG_CONTEXT: &str = "letmecount";
}

pub mod env {
    pub const API_URL: &str = "LETMECOUNT_API_URL";
    pub const MCP_PORT: &str = "LETMECOUNT_MCP_PORT";
    pub const HTTP_TIMEOUT_MS: &str = "LETMECOUNT_HTTP_TIMEOUT_MS";
    pub const LOG_LEVEL: &str = "LETMECOUNT_LOG_LEVEL";
    pub const LOG_LEVEL_FALLBACK: &str = "LOG_LEVEL";
}

pub mod network {
    pub const DEFAULT_API_URL: &str = "http://localhost:8888";
    pub const DEFAULT_MCP_PORT: u16 = 8000;
    pub const MCP_HTTP_PATH: &str = "/api/mcp";
    pub const HEALTH_PATH: &str = "/health";
    pub const MAX_TIMEOUT_MS: u64 = 600_000;
}

pub mod content_types {
    pub const LD_JSON: &str = "application/ld+json";
    pub const ACCEPT: &str = "application/ld+json, application/json";
}

pub mod outcome {
    pub const NO_CONTENT_SENTINEL: &str = "Operation successful.";
    pub const LOGIN_MESSAGE: &str = "Login successful. Bearer token configured.";
    pub const LOGIN_TOKEN_FIELD: &str = "token";
    pub const LOG_BODY_PREVIEW_BYTES: usize = 512;
}
