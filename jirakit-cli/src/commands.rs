use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, Lines, Write},
    path::Path,
    time::Instant,
};

use anyhow::{bail, Context, Result};
use jirakit_config::{resolve_current_user_jql, JirakitConfig};
use jirakit_domain::{
    record_from_input, IssueRef, ProjectRef, QuerySource, Record, Version, VersionRef,
};
use jirakit_jira::{Confirmation, Converted, JiraClient, VersionFields, VersionSpec};
use serde_json::Value;

use crate::{
    cli_args::{
        Command, CreateVersionArgs, GlobalOptions, IssueCommand, MetaCommand, ProjectCommand,
        VersionCommand, WatchersCommand,
    },
    telemetry,
    utils::describe_input,
};

/// One line of output.
#[derive(Debug, PartialEq)]
pub enum Emit {
    Record(Record),
    Raw(Value),
}

/// A pipeline item that never became a value, e.g. a malformed JSON line.
#[derive(Debug, PartialEq)]
pub struct BadInput {
    position: String,
    reason: String,
}

impl BadInput {
    fn new(position: String, error: &anyhow::Error) -> Self {
        Self {
            position,
            reason: format!("{error:#}"),
        }
    }
}

impl fmt::Display for BadInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.reason)
    }
}

type Input = std::result::Result<Value, BadInput>;

pub struct Session {
    pub config: JirakitConfig,
    pub client: JiraClient,
    pub confirmation: Confirmation,
}

pub fn load_session(global: &GlobalOptions) -> Result<Session> {
    let config = match &global.config {
        Some(path) => JirakitConfig::load_from_path(path)?,
        None => JirakitConfig::load_default()?,
    };

    let mut client =
        JiraClient::from_config(&config).with_context(|| "failed to set up Jira client")?;
    if let Some(credential) = global.credential() {
        client = client.with_credential(credential);
    }

    Ok(Session {
        config,
        client,
        confirmation: Confirmation::from_dry_run(global.dry_run),
    })
}

/// Runs one command; returns how many pipeline items failed.
pub fn execute<R: BufRead, W: Write>(
    session: &Session,
    command: Command,
    stdin: R,
    out: &mut W,
) -> Result<usize> {
    let client = &session.client;
    let confirmation = session.confirmation;

    match command {
        Command::Issue(IssueCommand::Get { issues }) => {
            let inputs = read_inputs(issues, stdin);
            run_each("get-issue", inputs, out, |input| {
                let issue = IssueRef::from_input(input)?;
                Ok(client.get_issue(&issue)?.map(record).into_iter().collect())
            })
        }
        Command::Issue(IssueCommand::Search {
            query,
            board,
            page_size,
        }) => {
            let jql = search_jql(&session.config, &QuerySource { board, query })?;
            run_each("search-issues", [Ok(Value::String(jql))], out, |input| {
                let jql = input.as_str().unwrap_or_default();
                Ok(client
                    .search_issues(jql, page_size)?
                    .into_iter()
                    .map(record)
                    .collect())
            })
        }
        Command::Issue(IssueCommand::Browse { issue }) => {
            let issue = IssueRef::from_input(&parse_input(&issue)?)?;
            let url = match &issue {
                IssueRef::Issue(typed) => typed
                    .http_url
                    .clone()
                    .unwrap_or_else(|| client.issue_url(&typed.key)),
                IssueRef::Key(key) => client.issue_url(key),
            };
            webbrowser::open(&url).with_context(|| format!("failed to open {url}"))?;
            Ok(0)
        }
        Command::Watchers(WatchersCommand::List { issues }) => {
            let inputs = read_inputs(issues, stdin);
            run_each("get-watchers", inputs, out, |input| {
                let issue = IssueRef::from_input(input)?;
                Ok(converted(client.get_issue_watchers(&issue)?))
            })
        }
        Command::Watchers(WatchersCommand::Add { issue, user }) => {
            run_each("add-watcher", [Ok(parse_input(&issue)?)], out, |input| {
                let issue = IssueRef::from_input(input)?;
                client.add_issue_watcher(&issue, &user, confirmation)?;
                Ok(Vec::new())
            })
        }
        Command::Watchers(WatchersCommand::Remove { issue, user }) => {
            run_each("remove-watcher", [Ok(parse_input(&issue)?)], out, |input| {
                let issue = IssueRef::from_input(input)?;
                client.remove_issue_watcher(&issue, &user, confirmation)?;
                Ok(Vec::new())
            })
        }
        Command::Project(ProjectCommand::Get { projects }) => {
            let inputs = read_inputs(projects, stdin);
            run_each("get-project", inputs, out, |input| {
                let project = ProjectRef::from_input(input)?;
                Ok(vec![record(client.get_project(project.key_or_id())?)])
            })
        }
        Command::Version(VersionCommand::Get { versions }) => {
            let inputs = read_inputs(versions, stdin);
            run_each("get-version", inputs, out, |input| {
                let version = VersionRef::from_input(input)?;
                Ok(vec![record(client.get_version(&version)?)])
            })
        }
        Command::Version(VersionCommand::List { projects }) => {
            let inputs = read_inputs(projects, stdin);
            run_each("get-versions", inputs, out, |input| {
                let project = ProjectRef::from_input(input)?;
                Ok(converted(client.get_project_versions(&project)?))
            })
        }
        Command::Version(VersionCommand::Create(args)) => {
            create_versions(client, confirmation, args, stdin, out)
        }
        Command::Version(VersionCommand::Remove { versions }) => {
            let inputs = read_inputs(versions, stdin);
            run_each("remove-version", inputs, out, |input| {
                let version = VersionRef::from_input(input)?;
                client.remove_version(&version, confirmation)?;
                Ok(Vec::new())
            })
        }
        Command::Meta(MetaCommand::Edit { issues }) => {
            let inputs = read_inputs(issues, stdin);
            run_each("get-edit-metadata", inputs, out, |input| {
                let issue = IssueRef::from_input(input)?;
                let report = client.get_issue_edit_metadata(&issue)?;
                Ok(report.records().into_iter().map(Emit::Record).collect())
            })
        }
        Command::Meta(MetaCommand::Create {
            project,
            issue_type,
        }) => {
            run_each("get-create-metadata", [Ok(parse_input(&project)?)], out, |input| {
                let project = ProjectRef::from_input(input)?;
                let report = client.get_issue_create_metadata(&project, &issue_type)?;
                Ok(report.records().into_iter().map(Emit::Record).collect())
            })
        }
    }
}

fn create_versions<R: BufRead, W: Write>(
    client: &JiraClient,
    confirmation: Confirmation,
    args: CreateVersionArgs,
    stdin: R,
    out: &mut W,
) -> Result<usize> {
    const OP: &str = "create-version";

    let Some(path) = &args.from_json else {
        let project = args.project.as_deref().unwrap_or_default();
        let name = args.name.clone().unwrap_or_default();
        let spec = VersionSpec::FromFields(VersionFields {
            name: name.clone(),
            project: ProjectRef::from_input(&parse_input(project)?)?,
            description: args.description.clone(),
            archived: args.archived,
            released: args.released,
            start_date: args.start_date,
            release_date: args.release_date,
        });
        return run_each(OP, [Ok(Value::String(name))], out, |_| {
            Ok(client.new_version(&spec, confirmation)?.map(record).into_iter().collect())
        });
    };

    let duplicate = |input: &Value| -> jirakit_jira::Result<Vec<Emit>> {
        let version: Version = record_from_input(input)?;
        let spec = VersionSpec::FromVersion(version);
        Ok(client.new_version(&spec, confirmation)?.map(record).into_iter().collect())
    };

    if path == Path::new("-") {
        return run_each(OP, InputLines::new(stdin), out, duplicate);
    }
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    run_each(OP, InputLines::new(BufReader::new(file)), out, duplicate)
}

fn search_jql(config: &JirakitConfig, source: &QuerySource) -> Result<String> {
    if source.is_query_mode() {
        let query = source.query.as_deref().unwrap_or_default().trim();
        if query.is_empty() {
            bail!("JQL query cannot be empty");
        }
        return Ok(resolve_current_user_jql(query, config.jira_user.as_deref()));
    }

    Ok(config.board_jql(source.board.as_deref())?)
}

/// Each item succeeds or fails on its own; a failure never stops the rest.
/// Output is flushed per item so piped commands see records as they come.
fn run_each<I, W, F>(op: &str, inputs: I, out: &mut W, mut step: F) -> Result<usize>
where
    I: IntoIterator<Item = Input>,
    W: Write,
    F: FnMut(&Value) -> jirakit_jira::Result<Vec<Emit>>,
{
    let mut failures = 0;
    for input in inputs {
        let started = Instant::now();
        let (subject, outcome) = match input {
            Ok(value) => (
                describe_input(&value),
                step(&value).map_err(|error| error.to_string()),
            ),
            Err(bad) => (bad.position, Err(bad.reason)),
        };

        match outcome {
            Ok(emitted) => {
                telemetry::emit_success(op, &subject, started.elapsed());
                for emit in &emitted {
                    write_emit(out, emit)?;
                }
                out.flush()?;
            }
            Err(reason) => {
                failures += 1;
                telemetry::emit_failure(op, &subject, started.elapsed(), &reason);
                eprintln!("error: {op} {subject}: {reason}");
            }
        }
    }
    Ok(failures)
}

fn write_emit<W: Write>(out: &mut W, emit: &Emit) -> Result<()> {
    match emit {
        Emit::Record(record) => serde_json::to_writer(&mut *out, record)?,
        Emit::Raw(value) => serde_json::to_writer(&mut *out, value)?,
    }
    writeln!(out)?;
    Ok(())
}

fn record(value: impl Into<Record>) -> Emit {
    Emit::Record(value.into())
}

fn converted<T: Into<Record>>(value: Converted<T>) -> Vec<Emit> {
    match value {
        Converted::Records(records) => records.into_iter().map(record).collect(),
        Converted::Raw(raw) => vec![Emit::Raw(raw)],
    }
}

/// Arguments win; without them inputs are read lazily from stdin.
fn read_inputs<'a, R: BufRead + 'a>(
    args: Vec<String>,
    stdin: R,
) -> Box<dyn Iterator<Item = Input> + 'a> {
    if args.is_empty() {
        return Box::new(InputLines::new(stdin));
    }
    Box::new(args.into_iter().enumerate().map(|(index, arg)| {
        parse_input(&arg).map_err(|error| BadInput::new(format!("argument {}", index + 1), &error))
    }))
}

/// Non-blank lines of a reader, parsed one at a time. A read error ends the
/// stream after being reported once.
struct InputLines<R> {
    lines: Lines<R>,
    number: usize,
    finished: bool,
}

impl<R: BufRead> InputLines<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            number: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for InputLines<R> {
    type Item = Input;

    fn next(&mut self) -> Option<Input> {
        if self.finished {
            return None;
        }
        loop {
            self.number += 1;
            let position = format!("line {}", self.number);
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(error) => {
                    self.finished = true;
                    let error = anyhow::Error::new(error).context("failed to read input");
                    return Some(Err(BadInput::new(position, &error)));
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(parse_input(&text).map_err(|error| BadInput::new(position, &error)));
        }
    }
}

/// A bare key/id, or a JSON record when the text looks like one.
fn parse_input(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).with_context(|| "malformed JSON record");
    }
    Ok(Value::String(trimmed.to_string()))
}
