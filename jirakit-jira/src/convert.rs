//! JSON payload → tagged record conversion.

use chrono::NaiveDate;
use jirakit_domain::{Issue, MetaField, Project, Record, User, Version};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

/// Result of a list-shaped conversion: typed records, or the untouched
/// payload when it did not have the expected shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Converted<T> {
    Records(Vec<T>),
    Raw(Value),
}

impl<T> Converted<T> {
    pub fn records(&self) -> Option<&[T]> {
        match self {
            Self::Records(records) => Some(records),
            Self::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// Metadata fields plus the non-terminating anomalies met while converting.
#[derive(Debug)]
pub struct MetaReport {
    pub fields: Vec<MetaField>,
    pub anomalies: Vec<Error>,
    tag: fn(MetaField) -> Record,
}

impl MetaReport {
    pub fn records(&self) -> Vec<Record> {
        self.fields.iter().cloned().map(self.tag).collect()
    }
}

#[derive(Deserialize)]
pub(crate) struct IssuePayload {
    id: String,
    key: String,
    #[serde(rename = "self")]
    self_url: Option<String>,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPayload {
    name: Option<String>,
    display_name: Option<String>,
    email_address: Option<String>,
    account_id: Option<String>,
    #[serde(rename = "self")]
    self_url: Option<String>,
    active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionPayload {
    id: Option<String>,
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    released: bool,
    start_date: Option<NaiveDate>,
    release_date: Option<NaiveDate>,
    project_id: Option<i64>,
    project: Option<String>,
    #[serde(rename = "self")]
    self_url: Option<String>,
}

#[derive(Deserialize)]
struct ProjectPayload {
    id: String,
    key: String,
    name: Option<String>,
    #[serde(rename = "self")]
    self_url: Option<String>,
    lead: Option<UserPayload>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaFieldPayload {
    key: Option<String>,
    name: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    has_default_value: bool,
    #[serde(default)]
    operations: Vec<String>,
    #[serde(default)]
    allowed_values: Vec<Value>,
    schema: Option<Value>,
    auto_complete_url: Option<String>,
}

pub fn issue(value: Value, server: &str) -> Result<Issue> {
    let payload: IssuePayload = serde_json::from_value(value)?;
    Ok(into_issue(payload, server))
}

pub(crate) fn into_issue(payload: IssuePayload, server: &str) -> Issue {
    let http_url = format!("{}/browse/{}", server.trim_end_matches('/'), payload.key);
    Issue {
        id: payload.id,
        key: payload.key,
        rest_url: payload.self_url,
        http_url: Some(http_url),
        fields: payload.fields,
    }
}

pub fn user(value: Value) -> Result<User> {
    let payload: UserPayload = serde_json::from_value(value)?;
    Ok(into_user(payload))
}

fn into_user(payload: UserPayload) -> User {
    User {
        name: payload.name,
        display_name: payload.display_name,
        email_address: payload.email_address,
        account_id: payload.account_id,
        rest_url: payload.self_url,
        active: payload.active,
    }
}

/// Watchers live under `watchers`; anything else is handed back as is.
pub fn watchers(value: Value) -> Result<Converted<User>> {
    let Some(list) = value.get("watchers").and_then(Value::as_array) else {
        return Ok(Converted::Raw(value));
    };

    list.iter()
        .cloned()
        .map(user)
        .collect::<Result<Vec<_>>>()
        .map(Converted::Records)
}

pub fn version(value: Value) -> Result<Version> {
    let payload: VersionPayload = serde_json::from_value(value)?;
    Ok(Version {
        id: payload.id,
        name: payload.name,
        description: payload.description,
        archived: payload.archived,
        released: payload.released,
        start_date: payload.start_date,
        release_date: payload.release_date,
        project_id: payload.project_id,
        project_key: payload.project,
        rest_url: payload.self_url,
    })
}

pub fn versions(value: Value) -> Result<Converted<Version>> {
    let Value::Array(list) = value else {
        return Ok(Converted::Raw(value));
    };

    list.into_iter()
        .map(version)
        .collect::<Result<Vec<_>>>()
        .map(Converted::Records)
}

pub fn project(value: Value) -> Result<Project> {
    let payload: ProjectPayload = serde_json::from_value(value)?;
    Ok(Project {
        id: payload.id,
        key: payload.key,
        name: payload.name,
        rest_url: payload.self_url,
        lead: payload.lead.and_then(|lead| {
            lead.display_name
                .or(lead.name)
                .or(lead.account_id)
        }),
    })
}

/// `issue/{key}/editmeta`: one record per object-valued entry of `fields`.
///
/// Some servers nest a `projects` collection in `fields`; when present it
/// must hold exactly one project with exactly one issue type.
pub fn edit_meta(value: &Value) -> Result<MetaReport> {
    let Some(fields) = value.get("fields").and_then(Value::as_object) else {
        return Err(Error::EmptyResult(
            "edit metadata response has no fields".to_string(),
        ));
    };

    let mut anomalies = Vec::new();
    if let Some(projects) = fields.get("projects") {
        check_projects(projects, &mut anomalies);
    }

    Ok(MetaReport {
        fields: meta_fields(fields)?,
        anomalies,
        tag: Record::EditMetaField,
    })
}

/// `issue/createmeta`: fields of the single project/issue type pair.
pub fn create_meta(value: &Value) -> Result<MetaReport> {
    let mut anomalies = Vec::new();
    let projects = value.get("projects").unwrap_or(&Value::Null);
    let issue_type = check_projects(projects, &mut anomalies);

    let fields = match issue_type
        .and_then(|issue_type| issue_type.get("fields"))
        .and_then(Value::as_object)
    {
        Some(fields) => meta_fields(fields)?,
        None => Vec::new(),
    };

    Ok(MetaReport {
        fields,
        anomalies,
        tag: Record::CreateMetaField,
    })
}

/// Reports wrong cardinality for projects and their issue types, returning
/// the first issue type of the first project when there is one.
fn check_projects<'a>(projects: &'a Value, anomalies: &mut Vec<Error>) -> Option<&'a Value> {
    let projects = as_slice(projects);
    check_cardinality("projects", projects.len(), anomalies);
    let project = projects.first()?;

    let issue_types = as_slice(project.get("issuetypes").unwrap_or(&Value::Null));
    check_cardinality("issuetypes", issue_types.len(), anomalies);
    issue_types.first()
}

fn check_cardinality(collection: &str, found: usize, anomalies: &mut Vec<Error>) {
    if found == 1 {
        return;
    }
    let anomaly = Error::Cardinality {
        collection: collection.to_string(),
        found,
    };
    warn!(%anomaly, "unexpected metadata shape");
    anomalies.push(anomaly);
}

fn as_slice(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn meta_fields(fields: &Map<String, Value>) -> Result<Vec<MetaField>> {
    fields
        .iter()
        .filter(|(_, entry)| entry.is_object())
        .map(|(id, entry)| {
            let payload: MetaFieldPayload = serde_json::from_value(entry.clone())?;
            Ok(MetaField {
                id: payload.key.unwrap_or_else(|| id.clone()),
                name: payload.name,
                required: payload.required,
                has_default_value: payload.has_default_value,
                operations: payload.operations,
                allowed_values: payload.allowed_values,
                schema: payload.schema,
                auto_complete_url: payload.auto_complete_url,
            })
        })
        .collect()
}
