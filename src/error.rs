use thiserror::Error;

/// Failures that abort a turn.
///
/// Malformed or unknown function calls never show up here: the dispatcher
/// treats them as plain text.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("function `{function}` expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of `{function}` must be a string or a number, got {found}")]
    InvalidArgument {
        function: &'static str,
        index: usize,
        found: &'static str,
    },

    #[error("function `{function}` failed: {reason:#}")]
    Backend {
        function: &'static str,
        reason: anyhow::Error,
    },

    #[error("exceeded function-call chain limit of {limit}")]
    ChainLimitExceeded { limit: usize },

    #[error("model transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("chat UI transport failed: {0:#}")]
    Ui(anyhow::Error),
}
