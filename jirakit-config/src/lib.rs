use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

static CURRENT_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)currentUser\(\)").expect("valid currentUser pattern"));

/// Problems with the settings themselves, as opposed to reading the file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not configured")]
    Missing(&'static str),

    #[error("unsupported {key} '{value}', expected one of: {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("cannot read jira_password from {provider} entry '{key}': {reason}")]
    Secret {
        provider: SecretProvider,
        key: String,
        reason: String,
    },

    #[error("board '{0}' not found in configuration")]
    UnknownBoard(String),

    #[error("no boards configured")]
    NoBoards,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    V2,
    V3,
}

impl ApiVersion {
    /// Path segment under `/rest/api/`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "2",
            Self::V3 => "3",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().trim_start_matches(['v', 'V']) {
            "2" => Ok(Self::V2),
            "3" => Ok(Self::V3),
            _ => Err(ConfigError::Invalid {
                key: "api_version",
                value: value.to_string(),
                expected: "2, 3",
            }),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMethod {
    Basic,
    #[default]
    Bearer,
}

impl AuthMethod {
    /// Cloud (v3) takes email + API token; Server/DC (v2) takes a PAT.
    fn default_for(api_version: ApiVersion) -> Self {
        match api_version {
            ApiVersion::V2 => Self::Bearer,
            ApiVersion::V3 => Self::Basic,
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            _ => Err(ConfigError::Invalid {
                key: "auth_method",
                value: value.to_string(),
                expected: "basic, bearer",
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretProvider {
    Pass,
    Passage,
}

impl SecretProvider {
    fn command(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Passage => "passage",
        }
    }
}

impl fmt::Display for SecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// A named saved query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub name: String,
    pub jql: String,
    pub order_by: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JirakitConfig {
    pub jira_server: Option<String>,
    pub jira_user: Option<String>,
    pub jira_password: Option<String>,
    pub api_version: ApiVersion,
    pub auth_method: AuthMethod,
    pub insecure: bool,
    pub boards: Vec<BoardConfig>,
}

/// Settings may sit at the top level or under `general`; `general` wins.
#[derive(Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: RawSettings,
    #[serde(flatten)]
    top_level: RawSettings,
    #[serde(default)]
    boards: Vec<RawBoard>,
}

#[derive(Default, Deserialize)]
struct RawSettings {
    jira_server: Option<String>,
    jira_user: Option<String>,
    jira_password: Option<String>,
    api_version: Option<RawScalar>,
    auth_method: Option<String>,
    insecure: Option<bool>,
}

impl RawSettings {
    fn or(self, fallback: Self) -> Self {
        Self {
            jira_server: self.jira_server.or(fallback.jira_server),
            jira_user: self.jira_user.or(fallback.jira_user),
            jira_password: self.jira_password.or(fallback.jira_password),
            api_version: self.api_version.or(fallback.api_version),
            auth_method: self.auth_method.or(fallback.auth_method),
            insecure: self.insecure.or(fallback.insecure),
        }
    }
}

/// `api_version: 3` and `api_version: "3"` are both accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(u64),
    Text(String),
}

impl RawScalar {
    fn into_text(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }
}

#[derive(Default, Deserialize)]
struct RawBoard {
    name: Option<String>,
    jql: Option<String>,
    order_by: Option<String>,
    description: Option<String>,
}

impl JirakitConfig {
    pub fn load_default() -> Result<Self> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let payload = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::from_yaml(&payload).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn from_yaml(payload: &str) -> Result<Self> {
        let raw: RawConfig =
            serde_yaml::from_str(payload).with_context(|| "invalid YAML config format")?;
        Ok(Self::from_raw(raw, fetch_secret)?)
    }

    /// Normalized server root, e.g. `https://jira.example.com`.
    pub fn server(&self) -> Result<&str, ConfigError> {
        self.jira_server
            .as_deref()
            .ok_or(ConfigError::Missing("jira_server"))
    }

    /// Named board, or the first one when no name is given.
    pub fn resolve_board(&self, requested_name: Option<&str>) -> Result<&BoardConfig, ConfigError> {
        match requested_name {
            Some(name) => self
                .boards
                .iter()
                .find(|board| board.name == name)
                .ok_or_else(|| ConfigError::UnknownBoard(name.to_string())),
            None => self.boards.first().ok_or(ConfigError::NoBoards),
        }
    }

    /// Board JQL with its ORDER BY clause and the configured user in place
    /// of `currentUser()`.
    pub fn board_jql(&self, requested_name: Option<&str>) -> Result<String, ConfigError> {
        let board = self.resolve_board(requested_name)?;
        let jql = match board.order_by.as_deref() {
            Some(order_by) if !board.jql.to_ascii_lowercase().contains("order by") => {
                format!("{} ORDER BY {order_by}", board.jql)
            }
            _ => board.jql.clone(),
        };

        Ok(resolve_current_user_jql(&jql, self.jira_user.as_deref()))
    }

    fn from_raw<F>(raw: RawConfig, fetch: F) -> Result<Self, ConfigError>
    where
        F: Fn(SecretProvider, &str) -> Result<String, String>,
    {
        let settings = raw.general.or(raw.top_level);

        let api_version = match settings.api_version {
            Some(value) => ApiVersion::parse(&value.into_text())?,
            None => ApiVersion::default(),
        };
        let auth_method = match settings.auth_method.and_then(non_empty) {
            Some(value) => AuthMethod::parse(&value)?,
            None => AuthMethod::default_for(api_version),
        };
        let jira_password = match settings.jira_password.and_then(non_empty) {
            Some(value) => Some(resolve_password(value, fetch)?),
            None => None,
        };

        let boards = raw
            .boards
            .into_iter()
            .filter_map(|board| {
                Some(BoardConfig {
                    name: board.name.and_then(non_empty)?,
                    jql: board.jql.and_then(non_empty)?,
                    order_by: board.order_by.and_then(non_empty),
                    description: board.description.and_then(non_empty),
                })
            })
            .collect();

        Ok(Self {
            jira_server: settings.jira_server.and_then(normalize_server),
            jira_user: settings.jira_user.and_then(non_empty),
            jira_password,
            api_version,
            auth_method,
            insecure: settings.insecure.unwrap_or(false),
            boards,
        })
    }
}

/// `JIRAKIT_CONFIG_FILE`, else `~/.config/jirakit/config.yaml`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = env::var_os("JIRAKIT_CONFIG_FILE") {
        return PathBuf::from(path);
    }

    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("jirakit")
        .join("config.yaml")
}

pub fn resolve_current_user_jql(jql: &str, jira_user: Option<&str>) -> String {
    let Some(user) = jira_user.map(str::trim).filter(|user| !user.is_empty()) else {
        return jql.to_string();
    };

    let quoted = format!("\"{}\"", user.replace('\\', "\\\\").replace('"', "\\\""));
    CURRENT_USER
        .replace_all(jql, regex::NoExpand(&quoted))
        .into_owned()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn normalize_server(value: String) -> Option<String> {
    let server = non_empty(value)?;
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        Some(server.to_string())
    } else {
        Some(format!("https://{server}"))
    }
}

/// Plain passwords pass through; `pass::<key>` and `passage::<key>` must
/// resolve or loading fails.
fn resolve_password<F>(value: String, fetch: F) -> Result<String, ConfigError>
where
    F: Fn(SecretProvider, &str) -> Result<String, String>,
{
    let Some((provider, key)) = secret_reference(&value) else {
        return Ok(value);
    };

    fetch(provider, key).map_err(|reason| ConfigError::Secret {
        provider,
        key: key.to_string(),
        reason,
    })
}

fn secret_reference(value: &str) -> Option<(SecretProvider, &str)> {
    let (prefix, key) = value.split_once("::")?;
    let provider = match prefix {
        "pass" => SecretProvider::Pass,
        "passage" => SecretProvider::Passage,
        _ => return None,
    };
    let key = key.trim();
    (!key.is_empty()).then_some((provider, key))
}

/// First line of `<provider> show <key>`.
fn fetch_secret(provider: SecretProvider, key: &str) -> Result<String, String> {
    let output = Command::new(provider.command())
        .arg("show")
        .arg(key)
        .output()
        .map_err(|error| format!("failed to run {provider}: {error}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{provider} exited with {}: {}", output.status, stderr.trim()));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .and_then(non_empty)
        .ok_or_else(|| "entry is empty".to_string())
}
