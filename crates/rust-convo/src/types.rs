//! Common types for rust-convo.
//!
//! This module defines the message, sender and run-state types shared by
//! the runner, the container and the transcript.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The party a conversation step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The tester: the message is sent to the system under test.
    Me,
    /// The system under test: the message is expected from it.
    Bot,
}

impl Sender {
    /// Get the sender as it is written in scripts.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Me => "me",
            Self::Bot => "bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSender(pub String);

impl fmt::Display for UnknownSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sender '{}'", self.0)
    }
}

impl std::error::Error for UnknownSender {}

impl FromStr for Sender {
    type Err = UnknownSender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me" => Ok(Self::Me),
            "bot" => Ok(Self::Bot),
            other => Err(UnknownSender(other.to_string())),
        }
    }
}

/// A message exchanged with the system under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Who sent (or is expected to send) the message.
    pub sender: String,
    /// The message text.
    pub message_text: String,
    /// Auxiliary arguments (button payloads, form values).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Structured payload, if the channel delivers one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_data: Option<serde_json::Value>,
}

impl Message {
    /// Create a message from the tester.
    #[must_use]
    pub fn me(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Me.as_str().to_string(),
            message_text: text.into(),
            ..Default::default()
        }
    }

    /// Create a message from the bot.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot.as_str().to_string(),
            message_text: text.into(),
            ..Default::default()
        }
    }

    /// Attach auxiliary arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_source_data(mut self, data: serde_json::Value) -> Self {
        self.source_data = Some(data);
        self
    }

    /// Get the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.message_text
    }
}

/// State of a conversation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// The run has been created but no step has been attempted.
    #[default]
    NotStarted,
    /// Steps are being executed.
    Running,
    /// Every step was satisfied.
    Completed,
    /// A step failed; no further steps were attempted.
    Failed,
}

impl RunState {
    /// Check if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check whether `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a run, as published on the transcript bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run completed.
    Success,
    /// The run was rejected.
    Failure,
}

impl RunOutcome {
    /// Check if this is a successful outcome.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Identity of a run, handed to transcript listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Identifier of the container the run executed against.
    pub container: String,
    /// Name of the conversation.
    pub convo: String,
    /// Source of the conversation (file name or other origin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RunContext {
    /// Create a new run context.
    #[must_use]
    pub fn new(container: impl Into<String>, convo: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            convo: convo.into(),
            source: None,
        }
    }

    /// Set the conversation source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
