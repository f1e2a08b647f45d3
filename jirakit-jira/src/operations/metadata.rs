use jirakit_domain::{IssueRef, ProjectRef};
use reqwest::Method;

use crate::{
    convert::{self, MetaReport},
    error::{Error, Result},
    JiraClient,
};

impl JiraClient {
    /// Edit metadata is required: an empty answer is an error. Cardinality
    /// anomalies are collected in the report and the conversion goes on.
    pub fn get_issue_edit_metadata(&self, issue: &IssueRef) -> Result<MetaReport> {
        let request = self.request(Method::GET, "issue/{0}/editmeta", &[issue.key()]);
        let payload = self.invoke(request)?.ok_or_else(|| {
            Error::EmptyResult(format!("no edit metadata found for issue {}", issue.key()))
        })?;
        convert::edit_meta(&payload)
    }

    /// `issue_type` is an issue type id when numeric, otherwise its name.
    pub fn get_issue_create_metadata(
        &self,
        project: &ProjectRef,
        issue_type: &str,
    ) -> Result<MetaReport> {
        let project_id = self.resolve_project_id(project)?;
        let numeric = !issue_type.is_empty() && issue_type.chars().all(|c| c.is_ascii_digit());
        let issue_type_parameter = if numeric {
            "issuetypeIds"
        } else {
            "issuetypeNames"
        };

        let request = self
            .request(Method::GET, "issue/createmeta", &[])
            .query("projectIds", project_id.to_string())
            .query(issue_type_parameter, issue_type)
            .query("expand", "projects.issuetypes.fields");
        let payload = self.invoke(request)?.ok_or_else(|| {
            Error::EmptyResult(format!(
                "no create metadata found for project {} and issue type {issue_type}",
                project.key_or_id()
            ))
        })?;
        convert::create_meta(&payload)
    }
}

#[cfg(test)]
mod tests {
    use jirakit_domain::{IssueRef, Project, ProjectRef, RecordKind};
    use serde_json::json;

    use crate::{testing::Recorder, Error};

    #[test]
    fn edit_metadata_yields_tagged_fields() {
        let recorder = Recorder::default();
        recorder.respond(json!({
            "fields": {
                "summary": {"required": true, "name": "Summary", "operations": ["set"]}
            }
        }));

        let report = recorder
            .client()
            .get_issue_edit_metadata(&IssueRef::from("DEMO-1"))
            .expect("report");

        assert!(report.anomalies.is_empty());
        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), RecordKind::EditMetaField);
        assert!(recorder.requests()[0].uri.ends_with("/issue/DEMO-1/editmeta"));
    }

    #[test]
    fn edit_metadata_with_empty_projects_is_reported_not_fatal() {
        let recorder = Recorder::default();
        recorder.respond(json!({
            "fields": {
                "projects": [],
                "labels": {"required": false, "name": "Labels"}
            }
        }));

        let report = recorder
            .client()
            .get_issue_edit_metadata(&IssueRef::from("DEMO-1"))
            .expect("report");

        assert_eq!(report.anomalies.len(), 1);
        assert!(matches!(report.anomalies[0], Error::Cardinality { found: 0, .. }));
        assert_eq!(report.fields[0].id, "labels");
    }

    #[test]
    fn missing_edit_metadata_is_terminating() {
        let recorder = Recorder::default();
        recorder.respond_empty();

        let error = recorder
            .client()
            .get_issue_edit_metadata(&IssueRef::from("DEMO-1"))
            .expect_err("empty");
        assert!(matches!(error, Error::EmptyResult(_)));
        assert!(error.is_terminating());
    }

    #[test]
    fn create_metadata_queries_by_project_and_issue_type() {
        let recorder = Recorder::default();
        recorder.respond(json!({
            "projects": [{
                "id": "10000",
                "issuetypes": [{"id": "1", "fields": {"summary": {"required": true}}}]
            }]
        }));
        let project = ProjectRef::from(Project {
            id: "10000".to_string(),
            key: "DEMO".to_string(),
            ..Project::default()
        });

        let report = recorder
            .client()
            .get_issue_create_metadata(&project, "Bug")
            .expect("report");

        assert!(report.anomalies.is_empty());
        assert_eq!(report.records()[0].kind(), RecordKind::CreateMetaField);
        let query = &recorder.requests()[0].query;
        assert!(query.contains(&("projectIds".to_string(), "10000".to_string())));
        assert!(query.contains(&("issuetypeNames".to_string(), "Bug".to_string())));
    }
}
