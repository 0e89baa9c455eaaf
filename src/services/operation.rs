use crate::constants::content_types;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Where the arguments left over after path substitution end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgEncoding {
    #[default]
    None,
    Query,
    Body,
}

fn default_content_type() -> String {
    content_types::LD_JSON.to_string()
}

/// Static HTTP shape of one backend action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub method: HttpMethod,
    /// Path relative to the backend base URL; `{name}` segments are filled
    /// from the argument of the same name.
    pub path: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub encoding: ArgEncoding,
    /// Argument name to query key, e.g. `tags` to `tag`. Array values get
    /// the `[]` suffix regardless of renaming.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Marks the credential-issuing operation: sent without Authorization,
    /// and a successful response stores the returned token.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub login: bool,
}

impl OperationDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_type: default_content_type(),
            encoding: ArgEncoding::None,
            query_keys: BTreeMap::new(),
            headers: BTreeMap::new(),
            login: false,
        }
    }

    pub fn with_encoding(mut self, encoding: ArgEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_query_key(mut self, arg: impl Into<String>, key: impl Into<String>) -> Self {
        self.query_keys.insert(arg.into(), key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn as_login(mut self) -> Self {
        self.login = true;
        self
    }

    /// Names of the `{placeholder}` segments in the path template, in order.
    pub fn path_params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                break;
            };
            out.push(&after[..end]);
            rest = &after[end + 1..];
        }
        out
    }

    pub fn query_key_for<'a>(&'a self, arg: &'a str) -> &'a str {
        self.query_keys.get(arg).map(String::as_str).unwrap_or(arg)
    }
}
