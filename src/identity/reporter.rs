use tracing::error;

use crate::error::AppError;

/// Receives errors the session resolver absorbs into the `none` role.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, err: &AppError);
}

/// Default reporter: structured log line at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, err: &AppError) {
        error!(target: "alumni_portal::auth", "{}: code={} message={}", context, err.code_str(), err.message());
    }
}
