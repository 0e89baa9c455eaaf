use crate::constants::server;
use crate::errors::{McpError, ToolError};
use crate::mcp::catalog::{normalize_args, tool_by_name, tool_catalog, unknown_tool_error, validate_tool_args};
use crate::services::config::AppConfig;
use crate::services::dispatcher::{Dispatcher, RequestExecutor, RequestOutcome};
use crate::services::logger::Logger;
use crate::services::session::{SessionState, SessionStatus};
use serde_json::Value;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: AppConfig,
    session: Arc<SessionState>,
    executor: Arc<dyn RequestExecutor>,
}

impl App {
    fn validate_tool_wiring() -> Result<(), ToolError> {
        let mut problems = Vec::new();
        let logins = tool_catalog()
            .iter()
            .filter(|tool| tool.operation.login)
            .count();
        if logins != 1 {
            problems.push(format!("expected exactly one login tool, found {}", logins));
        }
        for tool in tool_catalog().iter() {
            let required: Vec<&str> = tool
                .input_schema
                .get("required")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            for param in tool.operation.path_params() {
                if !required.contains(&param) {
                    problems.push(format!(
                        "{}: path parameter '{}' is not a required argument",
                        tool.name, param
                    ));
                }
            }
        }
        if problems.is_empty() {
            return Ok(());
        }
        Err(ToolError::internal("Tool catalog is inconsistent")
            .with_hint("Every path placeholder in tool_catalog.json must be a required argument.")
            .with_details(serde_json::json!({ "problems": problems })))
    }

    pub fn initialize(config: AppConfig) -> Result<Self, ToolError> {
        let logger = Logger::new(server::LOG_CONTEXT);
        Self::validate_tool_wiring()?;
        let session = Arc::new(SessionState::new());
        let dispatcher = Dispatcher::new(logger.clone(), &config, session.clone())?;
        logger.info(
            "Dispatcher ready",
            Some(&serde_json::json!({
                "api_url": config.api_url.as_str(),
                "tools": tool_catalog().len(),
            })),
        );
        Ok(Self::with_executor(logger, config, session, Arc::new(dispatcher)))
    }

    /// Wires an arbitrary executor; used by tests to stand in for the backend.
    pub fn with_executor(
        logger: Logger,
        config: AppConfig,
        session: Arc<SessionState>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Self {
        Self {
            logger,
            config,
            session,
            executor,
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Validates the arguments, then runs the tool's operation. Only unknown
    /// tools and invalid arguments are errors; backend failures come back as
    /// a [`RequestOutcome`].
    pub async fn call_tool(
        &self,
        name: &str,
        args: Option<&Value>,
    ) -> Result<RequestOutcome, McpError> {
        let tool = tool_by_name(name).ok_or_else(|| unknown_tool_error(name))?;
        let args = normalize_args(args);
        validate_tool_args(name, &args)?;
        Ok(self.executor.execute(&tool.operation, &args).await)
    }

    pub fn health(&self) -> Value {
        let authenticated = self.session.status() == SessionStatus::Authenticated;
        serde_json::json!({
            "status": "ok",
            "server": server::NAME,
            "version": server::VERSION,
            "api_url": self.config.api_url.as_str(),
            "authenticated": authenticated,
            "tools": tool_catalog().len(),
            "log": self.logger.stats(),
        })
    }
}
