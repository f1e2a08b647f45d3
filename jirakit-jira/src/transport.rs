use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{Error, Result},
    request::{ApiRequest, Credential},
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Executes one request, exactly once.
///
/// `Ok(None)` means the server answered successfully with an empty body or
/// a bare `null`.
pub trait Transport {
    fn invoke(&self, request: &ApiRequest) -> Result<Option<Value>>;
}

pub struct HttpTransport {
    http: Client,
    credential: Option<Credential>,
}

impl HttpTransport {
    pub fn new(insecure: bool, credential: Option<Credential>) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("jirakit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, credential })
    }

    fn with_auth(&self, request: RequestBuilder, explicit: Option<&Credential>) -> RequestBuilder {
        match explicit.or(self.credential.as_ref()) {
            Some(Credential::Basic { user, password }) => request.basic_auth(user, Some(password)),
            Some(Credential::Bearer { token }) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl Transport for HttpTransport {
    fn invoke(&self, request: &ApiRequest) -> Result<Option<Value>> {
        debug!(method = %request.method, uri = %request.uri, "jira request");

        let mut builder = self.http.request(request.method.clone(), &request.uri);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder = self.with_auth(builder, request.credential.as_ref());

        let response = builder.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            debug!(status = status.as_u16(), uri = %request.uri, "jira request failed");
            return Err(api_error(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&text)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

/// Translates a non-2xx answer, keeping the server payload untouched.
///
/// JIRA reports failures as
/// `{"errorMessages": ["..."], "errors": {"field": "..."}}`.
pub fn api_error(status: u16, body: &str) -> Error {
    let payload = serde_json::from_str::<Value>(body).ok().or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
    });

    let mut messages = Vec::new();
    if let Some(json) = payload.as_ref().filter(|value| value.is_object()) {
        if let Some(list) = json.get("errorMessages").and_then(Value::as_array) {
            messages.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(errors) = json.get("errors").and_then(Value::as_object) {
            messages.extend(errors.iter().map(|(field, message)| match message.as_str() {
                Some(text) => format!("{field}: {text}"),
                None => format!("{field}: {message}"),
            }));
        }
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            messages.push(message.to_string());
        }
    }

    let message = if messages.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            trimmed.to_string()
        }
    } else {
        messages.join("; ")
    };

    Error::Transport {
        status,
        message,
        payload,
    }
}
