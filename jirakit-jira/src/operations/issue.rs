use jirakit_config::ApiVersion;
use jirakit_domain::{Issue, IssueRef};
use reqwest::Method;
use serde::Deserialize;

use crate::{
    convert::{self, IssuePayload},
    error::Result,
    JiraClient,
};

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPayload {
    #[serde(default)]
    issues: Vec<IssuePayload>,
    #[serde(default)]
    total: usize,
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: bool,
}

/// Position in a search: an offset on v2, an opaque token on v3.
enum Cursor {
    Offset(usize),
    Token(Option<String>),
}

impl JiraClient {
    /// `None` when the server answers with an empty body.
    pub fn get_issue(&self, issue: &IssueRef) -> Result<Option<Issue>> {
        let request = self.request(Method::GET, "issue/{0}", &[issue.key()]);
        let Some(payload) = self.invoke(request)? else {
            return Ok(None);
        };
        convert::issue(payload, &self.server).map(Some)
    }

    /// Runs `jql`, following pages of `page_size` until the result is exhausted.
    pub fn search_issues(&self, jql: &str, page_size: usize) -> Result<Vec<Issue>> {
        let page_size = page_size.max(1);
        let mut issues = Vec::new();
        let mut cursor = match self.api_version {
            ApiVersion::V2 => Cursor::Offset(0),
            ApiVersion::V3 => Cursor::Token(None),
        };

        loop {
            let page = self.search_issues_page(jql, &cursor, page_size)?;
            if page.issues.is_empty() {
                break;
            }
            issues.extend(
                page.issues
                    .into_iter()
                    .map(|payload| convert::into_issue(payload, &self.server)),
            );

            cursor = match cursor {
                Cursor::Offset(start_at) if start_at + page_size < page.total => {
                    Cursor::Offset(start_at + page_size)
                }
                Cursor::Token(_) if !page.is_last && page.next_page_token.is_some() => {
                    Cursor::Token(page.next_page_token)
                }
                _ => break,
            };
        }

        Ok(issues)
    }

    fn search_issues_page(
        &self,
        jql: &str,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<SearchPayload> {
        let mut request = self
            .request(Method::GET, self.search_endpoint(), &[])
            .query("jql", jql)
            .query("maxResults", page_size.to_string())
            .query("fields", "*navigable");
        match cursor {
            Cursor::Offset(start_at) => request = request.query("startAt", start_at.to_string()),
            Cursor::Token(Some(token)) => request = request.query("nextPageToken", token.as_str()),
            Cursor::Token(None) => {}
        }

        match self.invoke(request)? {
            Some(payload) => Ok(serde_json::from_value(payload)?),
            None => Ok(SearchPayload::default()),
        }
    }

    fn search_endpoint(&self) -> &str {
        match self.api_version {
            ApiVersion::V2 => "search",
            ApiVersion::V3 => "search/jql",
        }
    }
}

#[cfg(test)]
mod tests {
    use jirakit_config::ApiVersion;
    use jirakit_domain::IssueRef;
    use reqwest::Method;
    use serde_json::json;

    use crate::{testing::Recorder, Error};

    #[test]
    fn gets_issue_by_key() {
        let recorder = Recorder::default();
        recorder.respond(json!({
            "id": "10001",
            "key": "DEMO-1",
            "self": "https://jira.example.com/rest/api/2/issue/10001",
            "fields": {"summary": "Broken build"}
        }));

        let issue = recorder
            .client()
            .get_issue(&IssueRef::from("DEMO-1"))
            .expect("issue")
            .expect("some");

        assert_eq!(issue.key, "DEMO-1");
        assert_eq!(issue.summary(), Some("Broken build"));
        let requests = recorder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(
            requests[0].uri,
            "https://jira.example.com/rest/api/2/issue/DEMO-1"
        );
    }

    #[test]
    fn typed_issue_input_uses_its_key() {
        let recorder = Recorder::default();
        let input = json!({"kind": "Issue", "id": "10001", "key": "DEMO-4"});
        let issue = IssueRef::from_input(&input).expect("issue");

        recorder.client().get_issue(&issue).expect("call");
        assert!(recorder.requests()[0].uri.ends_with("/issue/DEMO-4"));
    }

    #[test]
    fn wrong_input_shape_fails_before_any_request() {
        let recorder = Recorder::default();
        let client = recorder.client();

        for input in [json!({"key": "DEMO-1"}), json!({"kind": "Version", "name": "1.0"}), json!([1])] {
            let error = IssueRef::from_input(&input)
                .map_err(Error::from)
                .and_then(|issue| client.get_issue(&issue))
                .expect_err("type mismatch");
            assert!(matches!(error, Error::Input(_)), "{input}");
        }

        assert!(recorder.requests().is_empty());
    }

    #[test]
    fn empty_answer_is_no_output() {
        let recorder = Recorder::default();
        recorder.respond_empty();
        let issue = recorder
            .client()
            .get_issue(&IssueRef::from("DEMO-1"))
            .expect("call");
        assert!(issue.is_none());
    }

    #[test]
    fn transport_errors_pass_through_untouched() {
        let recorder = Recorder::default();
        recorder.fail(Error::Transport {
            status: 404,
            message: "Issue does not exist".to_string(),
            payload: Some(json!({"errorMessages": ["Issue does not exist"]})),
        });

        let error = recorder
            .client()
            .get_issue(&IssueRef::from("NOPE-1"))
            .expect_err("404");
        assert_eq!(error.status(), Some(404));
        assert!(error.is_terminating());
    }

    #[test]
    fn search_follows_pages_until_total() {
        let recorder = Recorder::default();
        recorder
            .respond(json!({
                "total": 3,
                "issues": [{"id": "1", "key": "DEMO-1"}, {"id": "2", "key": "DEMO-2"}]
            }))
            .respond(json!({
                "total": 3,
                "issues": [{"id": "3", "key": "DEMO-3"}]
            }));

        let issues = recorder
            .client()
            .search_issues("project = DEMO", 2)
            .expect("search");

        let keys = issues.iter().map(|issue| issue.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["DEMO-1", "DEMO-2", "DEMO-3"]);

        let requests = recorder.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].uri.ends_with("/rest/api/2/search"));
        assert!(requests[1]
            .query
            .contains(&("startAt".to_string(), "2".to_string())));
        assert_eq!(
            issues[0].http_url.as_deref(),
            Some("https://jira.example.com/browse/DEMO-1")
        );
    }

    #[test]
    fn search_uses_jql_endpoint_on_api_v3() {
        let recorder = Recorder::default();
        recorder.respond(json!({"issues": []}));

        recorder
            .client_for_version(ApiVersion::V3)
            .search_issues("project = DEMO", 50)
            .expect("search");

        assert!(recorder.requests()[0].uri.ends_with("/rest/api/3/search/jql"));
    }

    #[test]
    fn search_follows_next_page_token_on_api_v3() {
        let recorder = Recorder::default();
        recorder
            .respond(json!({
                "issues": [{"id": "1", "key": "DEMO-1"}],
                "nextPageToken": "page-2",
                "isLast": false
            }))
            .respond(json!({
                "issues": [{"id": "2", "key": "DEMO-2"}],
                "isLast": true
            }));

        let issues = recorder
            .client_for_version(ApiVersion::V3)
            .search_issues("project = DEMO", 1)
            .expect("search");

        assert_eq!(issues.len(), 2);
        let requests = recorder.requests();
        assert_eq!(requests.len(), 2);
        let token = ("nextPageToken".to_string(), "page-2".to_string());
        assert!(!requests[0].query.contains(&token));
        assert!(requests[1].query.contains(&token));
        assert!(requests
            .iter()
            .all(|request| request.query.iter().all(|(name, _)| name != "startAt")));
    }
}
