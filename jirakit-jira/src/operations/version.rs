use chrono::NaiveDate;
use jirakit_domain::{InputError, ProjectRef, RecordKind, Version, VersionRef};
use reqwest::Method;
use serde::Serialize;

use crate::{
    convert,
    error::{Error, Result},
    operations::Confirmation,
    JiraClient,
};

/// How the body of a new version is put together.
#[derive(Clone, Debug, PartialEq)]
pub enum VersionSpec {
    /// Copy every field of an existing version (duplication).
    FromVersion(Version),
    /// Only the fields the caller set are sent.
    FromFields(VersionFields),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VersionFields {
    pub name: String,
    pub project: ProjectRef,
    pub description: Option<String>,
    pub archived: Option<bool>,
    pub released: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
}

impl VersionFields {
    pub fn new(name: impl Into<String>, project: impl Into<ProjectRef>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            description: None,
            archived: None,
            released: None,
            start_date: None,
            release_date: None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionBody {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    released: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<i64>,
}

impl VersionSpec {
    fn name(&self) -> &str {
        match self {
            Self::FromVersion(version) => &version.name,
            Self::FromFields(fields) => &fields.name,
        }
    }
}

impl JiraClient {
    pub fn get_version(&self, version: &VersionRef) -> Result<Version> {
        let id = version.id()?;
        let request = self.request(Method::GET, "version/{0}", &[id]);
        let payload = self
            .invoke(request)?
            .ok_or_else(|| Error::EmptyResult(format!("no version found for id '{id}'")))?;
        convert::version(payload)
    }

    /// Creates a version. Nothing is sent, not even a project lookup, unless
    /// `confirmation` allows it. Repeating the call creates a duplicate.
    pub fn new_version(
        &self,
        spec: &VersionSpec,
        confirmation: Confirmation,
    ) -> Result<Option<Version>> {
        if spec.name().trim().is_empty() {
            return Err(InputError::Empty(RecordKind::Version).into());
        }
        if !confirmation.allows("create version", spec.name()) {
            return Ok(None);
        }

        let body = self.version_body(spec)?;
        let request = self.request(Method::POST, "version", &[]).body(&body)?;
        match self.invoke(request)? {
            Some(payload) => convert::version(payload).map(Some),
            None => Ok(None),
        }
    }

    /// Returns whether the call was made.
    pub fn remove_version(&self, version: &VersionRef, confirmation: Confirmation) -> Result<bool> {
        let id = version.id()?;
        if !confirmation.allows("remove version", id) {
            return Ok(false);
        }

        let request = self.request(Method::DELETE, "version/{0}", &[id]);
        self.invoke(request)?;
        Ok(true)
    }

    fn version_body(&self, spec: &VersionSpec) -> Result<VersionBody> {
        match spec {
            VersionSpec::FromVersion(version) => {
                let (project, project_id) = match (version.project_id, &version.project_key) {
                    (Some(id), _) => (None, Some(id)),
                    (None, Some(key)) => (Some(key.clone()), None),
                    (None, None) => {
                        return Err(InputError::Malformed {
                            kind: RecordKind::Version,
                            reason: "version has no project".to_string(),
                        }
                        .into())
                    }
                };

                Ok(VersionBody {
                    name: version.name.clone(),
                    description: version.description.clone(),
                    archived: Some(version.archived),
                    released: Some(version.released),
                    start_date: version.start_date,
                    release_date: version.release_date,
                    project,
                    project_id,
                })
            }
            VersionSpec::FromFields(fields) => Ok(VersionBody {
                name: fields.name.clone(),
                description: fields.description.clone(),
                archived: fields.archived,
                released: fields.released,
                start_date: fields.start_date,
                release_date: fields.release_date,
                project: None,
                project_id: Some(self.resolve_project_id(&fields.project)?),
            }),
        }
    }
}
