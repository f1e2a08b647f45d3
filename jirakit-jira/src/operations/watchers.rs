use jirakit_config::ApiVersion;
use jirakit_domain::{IssueRef, User};
use reqwest::Method;
use serde_json::Value;

use crate::{
    convert::{self, Converted},
    error::Result,
    operations::Confirmation,
    JiraClient,
};

impl JiraClient {
    /// An empty answer yields no watchers rather than an error.
    pub fn get_issue_watchers(&self, issue: &IssueRef) -> Result<Converted<User>> {
        let request = self.request(Method::GET, "issue/{0}/watchers", &[issue.key()]);
        match self.invoke(request)? {
            Some(payload) => convert::watchers(payload),
            None => Ok(Converted::Records(Vec::new())),
        }
    }

    /// Returns whether the call was made.
    pub fn add_issue_watcher(
        &self,
        issue: &IssueRef,
        user: &str,
        confirmation: Confirmation,
    ) -> Result<bool> {
        if !confirmation.allows(&format!("add watcher {user}"), issue.key()) {
            return Ok(false);
        }

        let request = self
            .request(Method::POST, "issue/{0}/watchers", &[issue.key()])
            .body(&Value::String(user.to_string()))?;
        self.invoke(request)?;
        Ok(true)
    }

    /// Returns whether the call was made.
    pub fn remove_issue_watcher(
        &self,
        issue: &IssueRef,
        user: &str,
        confirmation: Confirmation,
    ) -> Result<bool> {
        if !confirmation.allows(&format!("remove watcher {user}"), issue.key()) {
            return Ok(false);
        }

        let parameter = if self.api_version == ApiVersion::V3 {
            "accountId"
        } else {
            "username"
        };
        let request = self
            .request(Method::DELETE, "issue/{0}/watchers", &[issue.key()])
            .query(parameter, user);
        self.invoke(request)?;
        Ok(true)
    }
}
