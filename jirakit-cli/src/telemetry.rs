use std::{io, time::Duration};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils::compact_error;

const LOG_ENV: &str = "JIRAKIT_LOG";

/// Logs go to stderr so stdout stays a clean stream of records.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

pub fn emit_success(op: &str, subject: &str, elapsed: Duration) {
    info!(
        target: "jirakit::telemetry",
        op,
        subject,
        status = "ok",
        duration_ms = duration_ms(elapsed),
        "operation finished"
    );
}

pub fn emit_failure(op: &str, subject: &str, elapsed: Duration, error: &str) {
    warn!(
        target: "jirakit::telemetry",
        op,
        subject,
        status = "error",
        duration_ms = duration_ms(elapsed),
        error = %compact_error(error),
        "operation failed"
    );
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
