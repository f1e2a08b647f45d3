mod issue;
mod metadata;
mod project;
mod version;
mod watchers;

use tracing::info;

pub use version::{VersionFields, VersionSpec};

/// Gate in front of every mutating call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Granted,
    Declined,
}

impl Confirmation {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            Self::Declined
        } else {
            Self::Granted
        }
    }

    pub fn allows(self, action: &str, target: &str) -> bool {
        match self {
            Self::Granted => true,
            Self::Declined => {
                info!(action, target, "not confirmed, skipping");
                false
            }
        }
    }
}
