use crate::constants::{content_types, outcome as outcome_constants, server};
use crate::errors::ToolError;
use crate::services::config::AppConfig;
use crate::services::logger::Logger;
use crate::services::operation::{ArgEncoding, OperationDescriptor};
use crate::services::session::SessionState;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::{Map, Value};
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Successful payload of a backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// 204 or an empty 2xx body; rendered as a fixed sentinel string.
    NoContent,
}

impl Payload {
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Json(value) => value.clone(),
            Payload::NoContent => {
                Value::String(outcome_constants::NO_CONTENT_SENTINEL.to_string())
            }
        }
    }
}

/// The single result shape of every dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Payload),
    HttpError { status: u16, body: String },
    TransportError { message: String },
}

impl RequestOutcome {
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "request failed without an error message".to_string()
        } else {
            message
        };
        RequestOutcome::TransportError { message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RequestOutcome::Success(_) => "success",
            RequestOutcome::HttpError { .. } => "http_error",
            RequestOutcome::TransportError { .. } => "transport_error",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestOutcome::Success(payload) => serde_json::json!({
                "outcome": self.kind(),
                "data": payload.to_value(),
            }),
            RequestOutcome::HttpError { status, body } => serde_json::json!({
                "outcome": self.kind(),
                "status": status,
                "body": body,
            }),
            RequestOutcome::TransportError { message } => serde_json::json!({
                "outcome": self.kind(),
                "message": message,
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("missing path parameter '{0}'")]
    MissingPathParam(String),
    #[error("path parameter '{0}' must be a string or a number")]
    InvalidPathParam(String),
    #[error("backend URL cannot be used as a base")]
    InvalidBaseUrl,
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
}

/// Fully assembled request, ready to hand to the HTTP client.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: reqwest::Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, descriptor: &OperationDescriptor, args: &Value) -> RequestOutcome;
}

#[derive(Clone)]
pub struct Dispatcher {
    logger: Logger,
    client: Client,
    base_url: Url,
    request_timeout: Option<Duration>,
    session: Arc<SessionState>,
}

impl Dispatcher {
    pub fn new(
        logger: Logger,
        config: &AppConfig,
        session: Arc<SessionState>,
    ) -> Result<Self, ToolError> {
        // One operation, one request: a 3xx comes back as an HttpError.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| {
                ToolError::internal(format!("Failed to build HTTP client: {}", err))
            })?;
        Ok(Self {
            logger: logger.child("dispatcher"),
            client,
            base_url: config.api_url.clone(),
            request_timeout: config.request_timeout,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    async fn send(&self, prepared: PreparedRequest) -> RequestOutcome {
        let mut request = self
            .client
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers);
        if let Some(body) = prepared.body.as_ref() {
            match serde_json::to_vec(body) {
                Ok(bytes) => request = request.body(bytes),
                Err(err) => {
                    return RequestOutcome::transport(format!(
                        "request not sent: body is not serializable: {}",
                        err
                    ))
                }
            }
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return RequestOutcome::transport(describe_reqwest_error(&err)),
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => reduce_response(status, &body),
            Err(err) => RequestOutcome::transport(format!(
                "failed to read {} response body: {}",
                status,
                describe_reqwest_error(&err)
            )),
        }
    }

    fn complete_login(&self, outcome: RequestOutcome) -> RequestOutcome {
        let payload = match outcome {
            RequestOutcome::Success(payload) => payload,
            other => return other,
        };
        let token = match &payload {
            Payload::Json(value) => value
                .get(outcome_constants::LOGIN_TOKEN_FIELD)
                .and_then(|v| v.as_str())
                .filter(|t| !t.trim().is_empty()),
            Payload::NoContent => None,
        };
        let Some(token) = token else {
            return RequestOutcome::transport(format!(
                "login response did not contain a '{}' field",
                outcome_constants::LOGIN_TOKEN_FIELD
            ));
        };
        self.session.set(token);
        self.logger.info("Bearer token configured", None);
        RequestOutcome::Success(Payload::Json(serde_json::json!({
            "authenticated": true,
            "message": outcome_constants::LOGIN_MESSAGE,
        })))
    }
}

#[async_trait]
impl RequestExecutor for Dispatcher {
    async fn execute(&self, descriptor: &OperationDescriptor, args: &Value) -> RequestOutcome {
        let call_id = uuid::Uuid::new_v4().to_string();
        let token = if descriptor.login {
            None
        } else {
            self.session.get()
        };

        let prepared = match build_request(&self.base_url, descriptor, args, token.as_deref()) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.logger.warn(
                    "Request not sent",
                    Some(&serde_json::json!({
                        "call_id": call_id,
                        "path": descriptor.path,
                        "error": err.to_string(),
                    })),
                );
                return RequestOutcome::transport(format!("request not sent: {}", err));
            }
        };

        let method = prepared.method.to_string();
        let path = prepared.url.path().to_string();
        let started = Instant::now();
        let outcome = self.send(prepared).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            RequestOutcome::Success(_) => self.logger.debug(
                "Backend request completed",
                Some(&serde_json::json!({
                    "call_id": call_id,
                    "method": method,
                    "path": path,
                    "duration_ms": duration_ms,
                })),
            ),
            RequestOutcome::HttpError { status, body } => self.logger.warn(
                "Backend returned an error status",
                Some(&serde_json::json!({
                    "call_id": call_id,
                    "method": method,
                    "path": path,
                    "status": status,
                    "body": preview(body, outcome_constants::LOG_BODY_PREVIEW_BYTES),
                    "duration_ms": duration_ms,
                })),
            ),
            RequestOutcome::TransportError { message } => self.logger.warn(
                "Backend request failed",
                Some(&serde_json::json!({
                    "call_id": call_id,
                    "method": method,
                    "path": path,
                    "error": message,
                    "duration_ms": duration_ms,
                })),
            ),
        }

        if descriptor.login {
            return self.complete_login(outcome);
        }
        outcome
    }
}

/// Assembles method, URL, headers and body for one operation. Pure, so the
/// header and encoding rules can be checked without a backend.
pub fn build_request(
    base_url: &Url,
    descriptor: &OperationDescriptor,
    args: &Value,
    token: Option<&str>,
) -> Result<PreparedRequest, BuildError> {
    let mut fields: Map<String, Value> = args
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    let mut url = base_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| BuildError::InvalidBaseUrl)?;
        segments.pop_if_empty();
        for segment in descriptor.path.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(param) => {
                    let value = fields
                        .remove(param)
                        .ok_or_else(|| BuildError::MissingPathParam(param.to_string()))?;
                    let rendered = match value {
                        Value::String(text) if !text.trim().is_empty() => text,
                        Value::Number(num) => num.to_string(),
                        Value::String(_) => {
                            return Err(BuildError::MissingPathParam(param.to_string()))
                        }
                        _ => return Err(BuildError::InvalidPathParam(param.to_string())),
                    };
                    if rendered == "." || rendered == ".." {
                        return Err(BuildError::InvalidPathParam(param.to_string()));
                    }
                    segments.push(&rendered);
                }
                None => {
                    segments.push(segment);
                }
            }
        }
    }

    let mut body = None;
    match descriptor.encoding {
        ArgEncoding::Query => {
            let pairs = query_pairs(descriptor, &fields);
            if !pairs.is_empty() {
                let mut query = url.query_pairs_mut();
                for (key, value) in pairs.iter() {
                    query.append_pair(key, value);
                }
            }
        }
        ArgEncoding::Body => body = Some(Value::Object(fields)),
        ArgEncoding::None => {}
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        header_value(CONTENT_TYPE.as_str(), &descriptor.content_type)?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(content_types::ACCEPT));
    headers.insert(
        USER_AGENT,
        header_value(
            USER_AGENT.as_str(),
            &format!("{}/{}", env!("CARGO_PKG_NAME"), server::VERSION),
        )?,
    );
    for (name, value) in descriptor.headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| BuildError::InvalidHeader(name.clone()))?;
        if name == AUTHORIZATION {
            continue;
        }
        headers.insert(name.clone(), header_value(name.as_str(), value)?);
    }
    if !descriptor.login {
        if let Some(token) = token {
            let mut value = header_value(AUTHORIZATION.as_str(), &format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }

    Ok(PreparedRequest {
        method: descriptor.method.to_reqwest(),
        url,
        headers,
        body,
    })
}

fn query_pairs(descriptor: &OperationDescriptor, fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (arg, value) in fields.iter() {
        let key = descriptor.query_key_for(arg);
        match value {
            Value::Array(items) => {
                let key = if key.ends_with("[]") {
                    key.to_string()
                } else {
                    format!("{}[]", key)
                };
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push((key.clone(), scalar_to_string(item)));
                }
            }
            other => pairs.push((key.to_string(), scalar_to_string(other))),
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, BuildError> {
    HeaderValue::from_str(value).map_err(|_| BuildError::InvalidHeader(name.to_string()))
}

/// Maps a status and raw body onto a [`RequestOutcome`].
pub fn reduce_response(status: u16, body: &[u8]) -> RequestOutcome {
    if !(200..300).contains(&status) {
        return RequestOutcome::HttpError {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        };
    }
    if status == 204 || body.iter().all(|b| b.is_ascii_whitespace()) {
        return RequestOutcome::Success(Payload::NoContent);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => RequestOutcome::Success(Payload::Json(value)),
        Err(err) => RequestOutcome::transport(format!(
            "backend returned status {} with an undecodable body: {}",
            status, err
        )),
    }
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn preview(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [+{} bytes]", &text[..end], text.len() - end)
}
