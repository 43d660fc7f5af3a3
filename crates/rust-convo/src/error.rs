//! Error types for rust-convo.
//!
//! This module defines all error types used throughout the library.
//! Step failures carry the expected and actual text so that a failed run
//! can be diagnosed from the error alone; the full picture lives in the
//! [`Transcript`] attached to a [`RunFailure`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transcript::Transcript;

/// Maximum length of message text to display in error messages.
const MAX_TEXT_DISPLAY: usize = 200;

/// Format message text for display, truncating if necessary.
fn format_text_snippet(text: &str) -> String {
    if text.is_empty() {
        return "(empty)".to_string();
    }

    if text.len() <= MAX_TEXT_DISPLAY {
        return format!("'{text}'");
    }

    let mut cut = MAX_TEXT_DISPLAY;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("'{}' ... ({} bytes total)", &text[..cut], text.len())
}

/// Format an unmet expectation message.
fn format_unmet_expectation(step: usize, expected: &str, actual: &str, negated: bool) -> String {
    let verb = if negated { "not to match" } else { "to match" };
    format!(
        "step {step}: expected bot reply {verb} {}\n  actual: {}",
        format_text_snippet(expected),
        format_text_snippet(actual)
    )
}

/// Format a structured-data mismatch message.
fn format_structured_mismatch(
    step: usize,
    key: &str,
    expected: &serde_json::Value,
    actual: Option<&serde_json::Value>,
) -> String {
    match actual {
        Some(actual) => format!(
            "step {step}: structured value at '{key}' differs\n  expected: {expected}\n  actual: {actual}"
        ),
        None => format!("step {step}: structured key '{key}' missing (expected {expected})"),
    }
}

/// The main error type for rust-convo operations.
#[derive(Debug, Error)]
pub enum ConvoError {
    /// The bot reply did not satisfy the expected pattern (accounting for negation).
    #[error("{}", format_unmet_expectation(*step, expected, actual, *negated))]
    UnmetExpectation {
        /// Index of the failing step.
        step: usize,
        /// The expected text after scripting-memory substitution.
        expected: String,
        /// The text the bot actually sent.
        actual: String,
        /// Whether the step was negated.
        negated: bool,
    },

    /// A structured-data assertion key was missing or held a different value.
    #[error("{}", format_structured_mismatch(*step, key, expected, actual.as_ref()))]
    StructuredMismatch {
        /// Index of the failing step.
        step: usize,
        /// Dotted path of the asserted key.
        key: String,
        /// Expected value.
        expected: serde_json::Value,
        /// Actual value, `None` when the key is missing.
        actual: Option<serde_json::Value>,
    },

    /// A step named a sender outside the recognized set.
    #[error("step {step}: invalid sender '{sender}' (expected one of: me, bot)")]
    InvalidSender {
        /// Index of the failing step.
        step: usize,
        /// The sender as written in the script.
        sender: String,
    },

    /// An expected pattern could not be compiled.
    #[error("step {step}: malformed pattern '{pattern}': {source}")]
    MalformedPattern {
        /// Index of the failing step.
        step: usize,
        /// The pattern source that failed to compile.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The container failed to deliver or accept a message.
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the container collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// The container was used before `start`.
    #[error("container '{id}' is not started")]
    NotStarted {
        /// Container identifier.
        id: String,
    },

    /// The connector dropped its reply channel.
    #[error("container '{id}' closed its reply channel")]
    Closed {
        /// Container identifier.
        id: String,
    },

    /// No reply arrived within the configured reply timeout.
    #[error("no bot reply within {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// The connector signaled a failure.
    #[error("connector failure: {message}")]
    Connector {
        /// Description reported by the connector.
        message: String,
    },
}

/// Result type alias for rust-convo operations.
pub type Result<T> = std::result::Result<T, ConvoError>;

/// Stable discriminant of a [`ConvoError`], recorded on transcript steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ConvoError::UnmetExpectation`].
    UnmetExpectation,
    /// See [`ConvoError::StructuredMismatch`].
    StructuredMismatch,
    /// See [`ConvoError::InvalidSender`].
    InvalidSender,
    /// See [`ConvoError::MalformedPattern`].
    MalformedPattern,
    /// See [`ConvoError::Container`].
    Container,
    /// See [`ConvoError::Config`].
    Config,
    /// See [`ConvoError::Io`].
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnmetExpectation => "unmet expectation",
            Self::StructuredMismatch => "structured mismatch",
            Self::InvalidSender => "invalid sender",
            Self::MalformedPattern => "malformed pattern",
            Self::Container => "container",
            Self::Config => "config",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

impl ConvoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnmetExpectation { .. } => ErrorKind::UnmetExpectation,
            Self::StructuredMismatch { .. } => ErrorKind::StructuredMismatch,
            Self::InvalidSender { .. } => ErrorKind::InvalidSender,
            Self::MalformedPattern { .. } => ErrorKind::MalformedPattern,
            Self::Container(_) => ErrorKind::Container,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Index of the step that raised this error, if it is a step failure.
    #[must_use]
    pub const fn step(&self) -> Option<usize> {
        match self {
            Self::UnmetExpectation { step, .. }
            | Self::StructuredMismatch { step, .. }
            | Self::InvalidSender { step, .. }
            | Self::MalformedPattern { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Check if this error is an expectation failure (text, structured or pattern).
    #[must_use]
    pub const fn is_expectation_failure(&self) -> bool {
        matches!(
            self,
            Self::UnmetExpectation { .. }
                | Self::StructuredMismatch { .. }
                | Self::MalformedPattern { .. }
        )
    }
}

/// A rejected conversation run.
///
/// Carries the partial transcript up to and including the failing step,
/// whose `err` field is populated.
#[derive(Debug, Error)]
#[error("convo '{convo}' failed: {source}")]
pub struct RunFailure {
    /// Name of the conversation that failed.
    pub convo: String,
    /// The partial transcript.
    pub transcript: Transcript,
    /// The error that aborted the run.
    #[source]
    pub source: ConvoError,
}

impl RunFailure {
    /// Get the partial transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Take the partial transcript, consuming the failure.
    #[must_use]
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// Get the kind of the aborting error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Get the aborting error.
    #[must_use]
    pub const fn error(&self) -> &ConvoError {
        &self.source
    }
}
