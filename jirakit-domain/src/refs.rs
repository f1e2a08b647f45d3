use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;

use crate::records::{Issue, Project, RecordKind, User, Version};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("expected a {expected} record or an identifying string, got {found}")]
    TypeMismatch { expected: RecordKind, found: String },

    #[error("{0} identifier cannot be empty")]
    Empty(RecordKind),

    #[error("invalid {kind} record: {reason}")]
    Malformed { kind: RecordKind, reason: String },
}

/// Records that can arrive on a pipeline, tagged with their `kind`.
pub trait TaggedRecord: DeserializeOwned {
    const KIND: RecordKind;
}

impl TaggedRecord for Issue {
    const KIND: RecordKind = RecordKind::Issue;
}

impl TaggedRecord for User {
    const KIND: RecordKind = RecordKind::User;
}

impl TaggedRecord for Version {
    const KIND: RecordKind = RecordKind::Version;
}

impl TaggedRecord for Project {
    const KIND: RecordKind = RecordKind::Project;
}

/// What a raw pipeline value turned out to be once validated.
enum Classified<T> {
    Identifier(String),
    Tagged(T),
}

fn classify<T: TaggedRecord>(value: &Value) -> Result<Classified<T>, InputError> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(InputError::Empty(T::KIND));
            }
            Ok(Classified::Identifier(trimmed.to_string()))
        }
        Value::Number(number) if number.is_u64() => Ok(Classified::Identifier(number.to_string())),
        Value::Object(map) if map.get("kind").and_then(Value::as_str) == Some(T::KIND.as_str()) => {
            T::deserialize(value)
                .map(Classified::Tagged)
                .map_err(|error| InputError::Malformed {
                    kind: T::KIND,
                    reason: error.to_string(),
                })
        }
        other => Err(InputError::TypeMismatch {
            expected: T::KIND,
            found: describe(other),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(number) if number.is_u64() => "an integer".to_string(),
        Value::Number(number) if number.is_i64() => "a negative number".to_string(),
        Value::Number(_) => "a non-integer number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
            Some(kind) => format!("a {kind} record"),
            None => "an untagged object".to_string(),
        },
    }
}

/// Accepts only a record tagged with `T`'s kind; bare identifiers are rejected.
pub fn record_from_input<T: TaggedRecord>(value: &Value) -> Result<T, InputError> {
    match classify::<T>(value)? {
        Classified::Tagged(record) => Ok(record),
        Classified::Identifier(_) => Err(InputError::TypeMismatch {
            expected: T::KIND,
            found: describe(value),
        }),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IssueRef {
    Key(String),
    Issue(Issue),
}

impl IssueRef {
    pub fn from_input(value: &Value) -> Result<Self, InputError> {
        match classify::<Issue>(value)? {
            Classified::Identifier(key) => Ok(Self::Key(key)),
            Classified::Tagged(issue) => Ok(Self::Issue(issue)),
        }
    }

    /// Key (or numeric id) used in resource paths.
    pub fn key(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Issue(issue) => &issue.key,
        }
    }
}

impl From<&str> for IssueRef {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<Issue> for IssueRef {
    fn from(value: Issue) -> Self {
        Self::Issue(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectRef {
    Key(String),
    Project(Project),
}

impl ProjectRef {
    pub fn from_input(value: &Value) -> Result<Self, InputError> {
        match classify::<Project>(value)? {
            Classified::Identifier(key) => Ok(Self::Key(key)),
            Classified::Tagged(project) => Ok(Self::Project(project)),
        }
    }

    pub fn key_or_id(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Project(project) => &project.key,
        }
    }
}

impl From<&str> for ProjectRef {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<Project> for ProjectRef {
    fn from(value: Project) -> Self {
        Self::Project(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VersionRef {
    Id(String),
    Version(Version),
}

impl VersionRef {
    pub fn from_input(value: &Value) -> Result<Self, InputError> {
        match classify::<Version>(value)? {
            Classified::Identifier(id) => Ok(Self::Id(id)),
            Classified::Tagged(version) if version.id.is_none() => Err(InputError::Malformed {
                kind: RecordKind::Version,
                reason: "missing id".to_string(),
            }),
            Classified::Tagged(version) => Ok(Self::Version(version)),
        }
    }

    pub fn id(&self) -> Result<&str, InputError> {
        match self {
            Self::Id(id) => Ok(id),
            Self::Version(version) => {
                version
                    .id
                    .as_deref()
                    .ok_or_else(|| InputError::Malformed {
                        kind: RecordKind::Version,
                        reason: "missing id".to_string(),
                    })
            }
        }
    }
}

impl From<&str> for VersionRef {
    fn from(value: &str) -> Self {
        Self::Id(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{record_from_input, InputError, IssueRef, ProjectRef, VersionRef};
    use crate::records::{RecordKind, User, Version};

    #[test]
    fn accepts_bare_keys_and_trims_them() {
        let issue = IssueRef::from_input(&json!("  DEMO-1 ")).expect("issue");
        assert_eq!(issue, IssueRef::Key("DEMO-1".to_string()));
        assert_eq!(issue.key(), "DEMO-1");
    }

    #[test]
    fn accepts_integer_ids() {
        let version = VersionRef::from_input(&json!(10200)).expect("version");
        assert_eq!(version.id().expect("id"), "10200");
    }

    #[test]
    fn accepts_tagged_issue_records() {
        let value = json!({
            "kind": "Issue",
            "id": "10001",
            "key": "DEMO-7",
            "fields": {"summary": "hi"}
        });

        let issue = IssueRef::from_input(&value).expect("issue");
        assert!(matches!(issue, IssueRef::Issue(_)));
        assert_eq!(issue.key(), "DEMO-7");
    }

    #[test]
    fn rejects_records_of_the_wrong_kind() {
        let value = json!({"kind": "User", "name": "alice"});
        let error = IssueRef::from_input(&value).expect_err("mismatch");

        assert_eq!(
            error,
            InputError::TypeMismatch {
                expected: RecordKind::Issue,
                found: "a User record".to_string(),
            }
        );
    }

    #[test]
    fn rejects_untagged_objects_arrays_and_booleans() {
        for value in [json!({"key": "DEMO-1"}), json!(["DEMO-1"]), json!(true), json!(null)] {
            let error = ProjectRef::from_input(&value).expect_err("mismatch");
            assert!(matches!(error, InputError::TypeMismatch { .. }), "{value}");
        }
    }

    #[test]
    fn rejects_empty_strings() {
        let error = IssueRef::from_input(&json!("   ")).expect_err("empty");
        assert_eq!(error, InputError::Empty(RecordKind::Issue));
    }

    #[test]
    fn tagged_version_without_id_is_malformed() {
        let error =
            VersionRef::from_input(&json!({"kind": "Version", "name": "1.0"})).expect_err("id");
        assert!(matches!(error, InputError::Malformed { .. }));
    }

    #[test]
    fn tagged_project_resolves_to_its_key() {
        let value = json!({"kind": "Project", "id": "10000", "key": "DEMO"});
        let project = ProjectRef::from_input(&value).expect("project");
        assert_eq!(project.key_or_id(), "DEMO");
    }

    #[test]
    fn record_from_input_requires_a_tagged_record() {
        let value = json!({"kind": "Version", "name": "1.0", "project_id": 1});
        let version: Version = record_from_input(&value).expect("version");
        assert_eq!(version.project_id, Some(1));

        let error = record_from_input::<Version>(&json!("1.0")).expect_err("bare");
        assert_eq!(
            error,
            InputError::TypeMismatch {
                expected: RecordKind::Version,
                found: "a string".to_string(),
            }
        );

        let error = record_from_input::<User>(&json!({"kind": "Issue", "id": "1", "key": "X-1"}))
            .expect_err("wrong kind");
        assert!(matches!(error, InputError::TypeMismatch { expected: RecordKind::User, .. }));
    }

    #[test]
    fn describes_numbers_by_sign_and_shape() {
        let found = |value| match ProjectRef::from_input(&value) {
            Err(InputError::TypeMismatch { found, .. }) => found,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(found(json!(-5)), "a negative number");
        assert_eq!(found(json!(1.5)), "a non-integer number");
        assert_eq!(
            record_from_input::<Version>(&json!(7)).expect_err("bare id"),
            InputError::TypeMismatch {
                expected: RecordKind::Version,
                found: "an integer".to_string(),
            }
        );
    }
}
