//! Transcript format definitions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConvoError, ErrorKind};
use crate::memory::Diagnostic;
use crate::types::Message;

/// The error recorded on a failed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl From<&ConvoError> for StepError {
    fn from(err: &ConvoError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One attempted step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptStep {
    /// When the step started.
    pub step_begin: DateTime<Utc>,
    /// When the step finished; never before `step_begin`.
    pub step_end: DateTime<Utc>,
    /// The message sent (me steps) or received (bot steps).
    pub actual: Option<Message>,
    /// The scripted message (me steps) or the substituted expectation (bot steps).
    pub expected: Option<Message>,
    /// Whether the step was negated.
    pub not: bool,
    /// The error that failed this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<StepError>,
}

impl TranscriptStep {
    /// Get the step duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.step_end - self.step_begin)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Check if this step failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.err.is_some()
    }

    /// Get the text of the actual message, if any.
    #[must_use]
    pub fn actual_text(&self) -> Option<&str> {
        self.actual.as_ref().map(Message::text)
    }

    /// Get the text of the expected message, if any.
    #[must_use]
    pub fn expected_text(&self) -> Option<&str> {
        self.expected.as_ref().map(Message::text)
    }
}

/// The record of one conversation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// When the run started.
    pub convo_begin: DateTime<Utc>,
    /// When the run finished; never before `convo_begin`.
    pub convo_end: DateTime<Utc>,
    /// Attempted steps, in order.
    pub steps: Vec<TranscriptStep>,
    /// Variable bindings that collided with a builtin token.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Transcript {
    /// Create an empty transcript starting at `begin`.
    #[must_use]
    pub const fn new(begin: DateTime<Utc>) -> Self {
        Self {
            convo_begin: begin,
            convo_end: begin,
            steps: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Get the run duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.convo_end - self.convo_begin)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Get the number of attempted steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if no step was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get the failed step and its index.
    #[must_use]
    pub fn failed_step(&self) -> Option<(usize, &TranscriptStep)> {
        self.steps.iter().enumerate().find(|(_, s)| s.is_failed())
    }

    /// Check if no step failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_step().is_none()
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a transcript from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a transcript.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn step(begin: DateTime<Utc>, ms: i64, err: Option<StepError>) -> TranscriptStep {
        TranscriptStep {
            step_begin: begin,
            step_end: begin + TimeDelta::milliseconds(ms),
            actual: Some(Message::bot("hi")),
            expected: Some(Message::bot("hi")),
            not: false,
            err,
        }
    }

    #[test]
    fn durations() {
        let begin = Utc::now();
        let mut transcript = Transcript::new(begin);
        transcript.steps.push(step(begin, 250, None));
        transcript.convo_end = begin + TimeDelta::milliseconds(300);

        assert_eq!(transcript.duration(), Duration::from_millis(300));
        assert_eq!(transcript.steps[0].duration(), Duration::from_millis(250));
    }

    #[test]
    fn failed_step_lookup() {
        let begin = Utc::now();
        let mut transcript = Transcript::new(begin);
        transcript.steps.push(step(begin, 1, None));
        assert!(transcript.is_success());

        let err = ConvoError::InvalidSender {
            step: 1,
            sender: "robot".to_string(),
        };
        transcript.steps.push(step(begin, 1, Some(StepError::from(&err))));

        let (index, failed) = transcript.failed_step().unwrap();
        assert_eq!(index, 1);
        assert_eq!(failed.err.as_ref().unwrap().kind, ErrorKind::InvalidSender);
        assert!(!transcript.is_success());
    }

    #[test]
    fn json_uses_camel_case() {
        let begin = Utc::now();
        let mut transcript = Transcript::new(begin);
        transcript.steps.push(step(begin, 5, None));

        let json = transcript.to_json().unwrap();
        assert!(json.contains("convoBegin"));
        assert!(json.contains("stepEnd"));
        assert!(json.contains("messageText"));
        assert!(!json.contains("\"err\""));

        assert_eq!(Transcript::from_json(&json).unwrap(), transcript);
    }
}
