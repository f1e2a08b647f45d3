use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Issue,
    User,
    Version,
    Project,
    EditMetaField,
    CreateMetaField,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::User => "User",
            Self::Version => "Version",
            Self::Project => "Project",
            Self::EditMetaField => "EditMetaField",
            Self::CreateMetaField => "CreateMetaField",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote issue. `fields` holds whatever the server returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default)]
    pub http_url: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Issue {
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.fields
            .get("status")
            .and_then(|status| status.get("name"))
            .and_then(Value::as_str)
    }

    pub fn assignee(&self) -> Option<&str> {
        let user = self.fields.get("assignee")?;
        ["displayName", "name", "emailAddress"]
            .iter()
            .find_map(|field| user.get(*field).and_then(Value::as_str))
    }

    /// Plain-text description; Atlassian document format is flattened.
    pub fn description(&self) -> String {
        normalize_description(self.fields.get("description"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub rest_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default)]
    pub lead: Option<String>,
}

/// One entry of an edit/create metadata response, copied as the server sent it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaField {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub has_default_value: bool,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub auto_complete_url: Option<String>,
}

/// Any output record, tagged with its kind when serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    Issue(Issue),
    User(User),
    Version(Version),
    Project(Project),
    EditMetaField(MetaField),
    CreateMetaField(MetaField),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Issue(_) => RecordKind::Issue,
            Self::User(_) => RecordKind::User,
            Self::Version(_) => RecordKind::Version,
            Self::Project(_) => RecordKind::Project,
            Self::EditMetaField(_) => RecordKind::EditMetaField,
            Self::CreateMetaField(_) => RecordKind::CreateMetaField,
        }
    }
}

impl From<Issue> for Record {
    fn from(value: Issue) -> Self {
        Self::Issue(value)
    }
}

impl From<User> for Record {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl From<Version> for Record {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl From<Project> for Record {
    fn from(value: Project) -> Self {
        Self::Project(value)
    }
}

fn normalize_description(value: Option<&Value>) -> String {
    let Some(payload) = value else {
        return String::new();
    };

    if let Some(text) = payload.as_str() {
        return text.to_string();
    }

    if let Some(raw) = payload.get("raw").and_then(Value::as_str) {
        return raw.to_string();
    }

    let is_doc = payload
        .get("type")
        .and_then(Value::as_str)
        .map(|value| value == "doc")
        .unwrap_or(false);

    if !is_doc {
        return String::new();
    }

    let mut out = String::new();
    extract_adf_text(payload, &mut out);
    out.trim().to_string()
}

fn extract_adf_text(node: &Value, out: &mut String) {
    let children = node.get("content").and_then(Value::as_array);
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("hardBreak") => out.push('\n'),
        Some("paragraph" | "heading" | "blockquote" | "listItem") => {
            for child in children.into_iter().flatten() {
                extract_adf_text(child, out);
            }
            out.push('\n');
        }
        _ => {
            for child in children.into_iter().flatten() {
                extract_adf_text(child, out);
            }
        }
    }
}
