use jirakit_config::ConfigError;
use jirakit_domain::{InputError, RecordKind};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("cannot resolve {entity} '{reference}': {source}")]
    Prerequisite {
        entity: RecordKind,
        reference: String,
        #[source]
        source: Box<Error>,
    },

    #[error("jira request failed: status={status} message={message}")]
    Transport {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    #[error("jira request could not be sent: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed JSON in jira response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected exactly one entry in {collection}, found {found}")]
    Cardinality { collection: String, found: usize },

    #[error("{0}")]
    EmptyResult(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// HTTP status for errors the server answered with.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Prerequisite { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Cardinality anomalies are reported and the operation carries on.
    pub fn is_terminating(&self) -> bool {
        !matches!(self, Self::Cardinality { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
