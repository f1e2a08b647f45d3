mod records;
mod refs;

pub use records::{Issue, MetaField, Project, Record, RecordKind, User, Version};
pub use refs::{record_from_input, InputError, IssueRef, ProjectRef, TaggedRecord, VersionRef};

/// Where an issue search takes its JQL from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySource {
    pub board: Option<String>,
    pub query: Option<String>,
}

impl QuerySource {
    pub fn is_query_mode(&self) -> bool {
        self.query.is_some()
    }
}
