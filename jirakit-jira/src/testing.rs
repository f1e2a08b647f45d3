use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use jirakit_config::ApiVersion;
use serde_json::Value;

use crate::{
    error::Result, request::ApiRequest, transport::Transport, Error, JiraClient,
};

/// In-memory transport that records requests and replays queued answers.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    requests: Rc<RefCell<Vec<ApiRequest>>>,
    responses: Rc<RefCell<VecDeque<Result<Option<Value>>>>>,
}

impl Recorder {
    pub(crate) fn respond(&self, value: Value) -> &Self {
        self.responses.borrow_mut().push_back(Ok(Some(value)));
        self
    }

    pub(crate) fn respond_empty(&self) -> &Self {
        self.responses.borrow_mut().push_back(Ok(None));
        self
    }

    pub(crate) fn fail(&self, error: Error) -> &Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub(crate) fn client(&self) -> JiraClient {
        self.client_for_version(ApiVersion::V2)
    }

    pub(crate) fn client_for_version(&self, api_version: ApiVersion) -> JiraClient {
        JiraClient::with_transport(
            "https://jira.example.com",
            api_version,
            Box::new(self.clone()),
        )
    }
}

impl Transport for Recorder {
    fn invoke(&self, request: &ApiRequest) -> Result<Option<Value>> {
        self.requests.borrow_mut().push(request.clone());
        self.responses.borrow_mut().pop_front().unwrap_or(Ok(None))
    }
}
