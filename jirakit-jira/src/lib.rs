pub mod convert;
mod error;
mod operations;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

use jirakit_config::{ApiVersion, AuthMethod, ConfigError, JirakitConfig};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

pub use convert::{Converted, MetaReport};
pub use error::{Error, Result};
pub use operations::{Confirmation, VersionFields, VersionSpec};
pub use request::{ApiRequest, Credential};
pub use transport::{HttpTransport, Transport};

/// Entry point for every operation. Built once from configuration and
/// passed wherever a call against the server is needed.
pub struct JiraClient {
    api_version: ApiVersion,
    server: String,
    credential: Option<Credential>,
    transport: Box<dyn Transport>,
}

impl JiraClient {
    pub fn from_config(config: &JirakitConfig) -> Result<Self> {
        let server = config.server()?.to_string();
        let session = session_credential(config)?;
        let transport = HttpTransport::new(config.insecure, session)?;

        Ok(Self::with_transport(
            server,
            config.api_version,
            Box::new(transport),
        ))
    }

    pub fn with_transport(
        server: impl Into<String>,
        api_version: ApiVersion,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            api_version,
            server: server.into().trim_end_matches('/').to_string(),
            credential: None,
            transport,
        }
    }

    /// Credential sent with every request instead of the session default.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn issue_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.server, key)
    }

    fn request(&self, method: Method, template: &str, args: &[&str]) -> ApiRequest {
        let base = format!("{}/rest/api/{}", self.server, self.api_version);
        ApiRequest::new(method, &base, template, args).credential(self.credential.clone())
    }

    fn invoke(&self, request: ApiRequest) -> Result<Option<Value>> {
        debug!(method = %request.method, uri = %request.uri, "invoking");
        self.transport.invoke(&request)
    }
}

fn session_credential(config: &JirakitConfig) -> Result<Option<Credential>> {
    let Some(secret) = config.jira_password.as_deref() else {
        return Ok(None);
    };

    match config.auth_method {
        AuthMethod::Basic => {
            let user = config
                .jira_user
                .as_deref()
                .ok_or(ConfigError::Missing("jira_user for basic auth"))?;
            Ok(Some(Credential::Basic {
                user: user.to_string(),
                password: secret.to_string(),
            }))
        }
        AuthMethod::Bearer => Ok(Some(Credential::Bearer {
            token: secret.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use jirakit_config::{ApiVersion, AuthMethod, ConfigError, JirakitConfig};

    use super::{session_credential, Credential, Error, JiraClient};

    fn config(yaml: &str) -> JirakitConfig {
        JirakitConfig::from_yaml(yaml).expect("config")
    }

    #[test]
    fn missing_server_is_not_configured() {
        let error = match JiraClient::from_config(&config("jira_user: bob\n")) {
            Err(error) => error,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(
            error,
            Error::Config(ConfigError::Missing("jira_server"))
        ));
    }

    #[test]
    fn builds_client_from_config() {
        let client = JiraClient::from_config(&config(
            "jira_server: jira.example.com/\napi_version: \"3\"\n",
        ))
        .expect("client");

        assert_eq!(client.server(), "https://jira.example.com");
        assert_eq!(client.api_version(), ApiVersion::V3);
        assert_eq!(client.issue_url("DEMO-1"), "https://jira.example.com/browse/DEMO-1");
    }

    #[test]
    fn session_credential_follows_auth_method() {
        let basic = session_credential(&config(
            "jira_server: x\njira_user: alice\njira_password: pw\nauth_method: basic\n",
        ))
        .expect("basic");
        assert_eq!(
            basic,
            Some(Credential::Basic {
                user: "alice".to_string(),
                password: "pw".to_string(),
            })
        );

        let bearer = session_credential(&config("jira_server: x\njira_password: tok\n"))
            .expect("bearer");
        assert_eq!(
            bearer,
            Some(Credential::Bearer {
                token: "tok".to_string(),
            })
        );

        let anonymous = session_credential(&config("jira_server: x\n")).expect("none");
        assert_eq!(anonymous, None);
    }

    #[test]
    fn basic_auth_without_user_is_not_configured() {
        let error = session_credential(&config(
            "jira_server: x\njira_password: pw\nauth_method: basic\n",
        ))
        .expect_err("user");
        assert!(matches!(error, Error::Config(ConfigError::Missing(_))));
    }
}
