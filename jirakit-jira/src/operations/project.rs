use jirakit_domain::{Project, ProjectRef, RecordKind, Version};
use reqwest::Method;

use crate::{
    convert::{self, Converted},
    error::{Error, Result},
    JiraClient,
};

impl JiraClient {
    pub fn get_project(&self, key_or_id: &str) -> Result<Project> {
        let request = self.request(Method::GET, "project/{0}", &[key_or_id]);
        let payload = self
            .invoke(request)?
            .ok_or_else(|| Error::EmptyResult(format!("no project found for '{key_or_id}'")))?;
        convert::project(payload)
    }

    /// Versions are optional; an empty answer means none.
    pub fn get_project_versions(&self, project: &ProjectRef) -> Result<Converted<Version>> {
        let request = self.request(Method::GET, "project/{0}/versions", &[project.key_or_id()]);
        match self.invoke(request)? {
            Some(payload) => convert::versions(payload),
            None => Ok(Converted::Records(Vec::new())),
        }
    }

    /// Numeric project id; a bare key is looked up on the server.
    pub(crate) fn resolve_project_id(&self, project: &ProjectRef) -> Result<i64> {
        let id = match project {
            ProjectRef::Project(project) => project.id.clone(),
            ProjectRef::Key(key) => {
                self.get_project(key)
                    .map_err(|source| Error::Prerequisite {
                        entity: RecordKind::Project,
                        reference: key.clone(),
                        source: Box::new(source),
                    })?
                    .id
            }
        };

        id.parse::<i64>().map_err(|_| Error::Prerequisite {
            entity: RecordKind::Project,
            reference: project.key_or_id().to_string(),
            source: Box::new(Error::EmptyResult(format!("project id '{id}' is not numeric"))),
        })
    }
}
