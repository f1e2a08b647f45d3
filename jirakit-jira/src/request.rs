use std::fmt;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Basic { user: String, password: String },
    Bearer { token: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Fully specified call against the REST API.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub uri: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub credential: Option<Credential>,
}

impl ApiRequest {
    /// `template` is relative to `base`; `{0}`, `{1}`… are replaced by `args`.
    pub fn new(method: Method, base: &str, template: &str, args: &[&str]) -> Self {
        let path = fill_template(template, args);
        Self {
            method,
            uri: format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')),
            query: Vec::new(),
            body: None,
            credential: None,
        }
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn body<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }
}

/// Positional, purely textual substitution. Unknown placeholders are kept.
pub fn fill_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index = after[..close].parse::<usize>().ok()?;
            let arg = args.get(index)?;
            Some((*arg, close))
        });

        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde::Serialize;
    use serde_json::json;

    use super::{fill_template, ApiRequest, Credential};

    #[test]
    fn fills_positional_placeholders() {
        assert_eq!(
            fill_template("issue/{0}/watchers", &["DEMO-1"]),
            "issue/DEMO-1/watchers"
        );
        assert_eq!(fill_template("{1}/{0}", &["a", "b"]), "b/a");
    }

    #[test]
    fn substitution_is_single_pass_and_keeps_unknown_placeholders() {
        assert_eq!(fill_template("x/{0}/{1}", &["{1}"]), "x/{1}/{1}");
        assert_eq!(fill_template("x/{name}", &["a"]), "x/{name}");
    }

    #[test]
    fn joins_base_and_template() {
        let request = ApiRequest::new(
            Method::GET,
            "https://jira.example.com/rest/api/2/",
            "/issue/{0}",
            &["DEMO-9"],
        );
        assert_eq!(request.uri, "https://jira.example.com/rest/api/2/issue/DEMO-9");
        assert!(request.body.is_none());
    }

    #[test]
    fn serializes_body_without_absent_fields() {
        #[derive(Serialize)]
        struct Body {
            name: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            description: Option<String>,
        }

        let request = ApiRequest::new(Method::POST, "https://x", "version", &[])
            .body(&Body {
                name: "1.0".to_string(),
                description: None,
            })
            .expect("body");
        assert_eq!(request.body, Some(json!({"name": "1.0"})));
    }

    #[test]
    fn credential_debug_hides_secrets() {
        let basic = Credential::Basic {
            user: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{basic:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
