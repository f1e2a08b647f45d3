use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use jirakit_jira::Credential;

#[derive(Parser, Debug)]
#[command(
    name = "jirakit",
    version,
    about = "Query and update a JIRA server from the command line",
    after_help = "Identifier arguments can be left out; they are then read from stdin, one per line,\n\
                  either as a bare key/id or as a record printed by another jirakit command."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Config file (defaults to ~/.config/jirakit/config.yaml)
    #[arg(long, global = true, env = "JIRAKIT_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Show what would change without sending any mutating request
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// User for basic auth, overriding the configured credential
    #[arg(long, global = true, requires = "password", conflicts_with = "token")]
    pub user: Option<String>,

    /// Password or API token for --user
    #[arg(long, global = true, requires = "user")]
    pub password: Option<String>,

    /// Bearer token, overriding the configured credential
    #[arg(long, global = true)]
    pub token: Option<String>,
}

impl GlobalOptions {
    pub fn credential(&self) -> Option<Credential> {
        if let Some(token) = &self.token {
            return Some(Credential::Bearer {
                token: token.clone(),
            });
        }

        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(Credential::Basic {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get, search and open issues
    #[command(subcommand)]
    Issue(IssueCommand),

    /// List and change issue watchers
    #[command(subcommand)]
    Watchers(WatchersCommand),

    /// Look up projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Get, list, create and remove versions
    #[command(subcommand)]
    Version(VersionCommand),

    /// Field metadata for editing or creating issues
    #[command(subcommand)]
    Meta(MetaCommand),
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Fetch issues by key or id
    Get { issues: Vec<String> },

    /// Run a JQL query or a configured board
    Search {
        #[arg(long, short = 'q', conflicts_with = "board")]
        query: Option<String>,

        #[arg(long)]
        board: Option<String>,

        #[arg(long, default_value_t = 200)]
        page_size: usize,
    },

    /// Open an issue in the browser
    Browse { issue: String },
}

#[derive(Subcommand, Debug)]
pub enum WatchersCommand {
    /// List the watchers of issues
    List { issues: Vec<String> },

    /// Add a watcher (user name, or account id on API v3)
    Add { issue: String, user: String },

    /// Remove a watcher (user name, or account id on API v3)
    Remove { issue: String, user: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Fetch projects by key or id
    Get { projects: Vec<String> },
}

#[derive(Subcommand, Debug)]
pub enum VersionCommand {
    /// Fetch versions by id
    Get { versions: Vec<String> },

    /// List the versions of projects
    List { projects: Vec<String> },

    /// Create a version from fields, or duplicate Version records
    Create(CreateVersionArgs),

    /// Remove versions by id
    Remove { versions: Vec<String> },
}

#[derive(Args, Debug, Clone)]
pub struct CreateVersionArgs {
    /// File of Version records to duplicate, one per line ("-" for stdin)
    #[arg(long, conflicts_with_all = ["name", "project"], required_unless_present = "name")]
    pub from_json: Option<PathBuf>,

    #[arg(long, requires = "project")]
    pub name: Option<String>,

    /// Project key, or numeric id
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub archived: Option<bool>,

    #[arg(long)]
    pub released: Option<bool>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub release_date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum MetaCommand {
    /// Editable fields of issues
    Edit { issues: Vec<String> },

    /// Fields available when creating an issue
    Create {
        #[arg(long)]
        project: String,

        /// Issue type id or name
        #[arg(long)]
        issue_type: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use jirakit_jira::Credential;

    use super::{Cli, Command, IssueCommand, VersionCommand};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("jirakit").chain(args.iter().copied()))
    }

    #[test]
    fn issue_get_accepts_many_keys() {
        let cli = parse(&["issue", "get", "DEMO-1", "DEMO-2"]).expect("cli");
        let Command::Issue(IssueCommand::Get { issues }) = cli.command else {
            panic!("expected issue get");
        };
        assert_eq!(issues, vec!["DEMO-1", "DEMO-2"]);
    }

    #[test]
    fn rejects_board_and_query_together() {
        let error = parse(&["issue", "search", "--board", "mine", "--query", "project = DEMO"])
            .expect_err("conflict");
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn create_version_by_fields() {
        let cli = parse(&[
            "--dry-run",
            "version",
            "create",
            "--name",
            "1.0",
            "--project",
            "DEMO",
            "--release-date",
            "2026-06-30",
        ])
        .expect("cli");

        assert!(cli.global.dry_run);
        let Command::Version(VersionCommand::Create(args)) = cli.command else {
            panic!("expected version create");
        };
        assert_eq!(args.name.as_deref(), Some("1.0"));
        assert_eq!(args.description, None);
        assert_eq!(args.archived, None);
        assert_eq!(
            args.release_date,
            chrono::NaiveDate::from_ymd_opt(2026, 6, 30)
        );
    }

    #[test]
    fn create_version_requires_name_or_source() {
        assert!(parse(&["version", "create"]).is_err());
        assert!(parse(&["version", "create", "--name", "1.0"]).is_err());
        assert!(parse(&["version", "create", "--from-json", "-", "--name", "1.0"]).is_err());
        assert!(parse(&["version", "create", "--from-json", "-"]).is_ok());
    }

    #[test]
    fn credential_overrides() {
        let cli = parse(&["--user", "alice", "--password", "pw", "project", "get", "DEMO"])
            .expect("cli");
        assert_eq!(
            cli.global.credential(),
            Some(Credential::Basic {
                user: "alice".to_string(),
                password: "pw".to_string(),
            })
        );

        let cli = parse(&["--token", "tok", "project", "get"]).expect("cli");
        assert_eq!(
            cli.global.credential(),
            Some(Credential::Bearer {
                token: "tok".to_string(),
            })
        );

        assert!(parse(&["--user", "alice", "project", "get"]).is_err());
    }
}
