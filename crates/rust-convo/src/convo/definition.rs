//! Conversation definitions.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Sender, UnknownSender};

/// One scripted turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvoStep {
    /// Sender as written in the script; must be `me` or `bot`.
    pub sender: String,
    /// Message text; may embed placeholders, builtin tokens or an utterance name.
    pub message_text: String,
    /// Whether the expectation is negated.
    pub not: bool,
    /// Auxiliary arguments sent alongside the text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Structured payload (me steps) or assertions (bot steps).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Map<String, Value>>,
    /// Milliseconds to wait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_ms: Option<u64>,
}

impl ConvoStep {
    /// Create a step with an arbitrary sender.
    #[must_use]
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message_text: text.into(),
            ..Default::default()
        }
    }

    /// Create a step that sends text.
    #[must_use]
    pub fn me(text: impl Into<String>) -> Self {
        Self::new(Sender::Me.as_str(), text)
    }

    /// Create a step that expects text.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot.as_str(), text)
    }

    /// Create a step that only waits.
    #[must_use]
    pub fn pause(ms: u64) -> Self {
        Self::bot("").with_pause_ms(ms)
    }

    /// Set the negation flag.
    #[must_use]
    pub const fn with_not(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    /// Set the auxiliary arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the structured payload or assertions.
    #[must_use]
    pub fn with_json(mut self, json: Map<String, Value>) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the pause.
    #[must_use]
    pub const fn with_pause_ms(mut self, ms: u64) -> Self {
        self.pause_ms = Some(ms);
        self
    }

    /// Parse the sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender is not `me` or `bot`.
    pub fn parse_sender(&self) -> Result<Sender, UnknownSender> {
        self.sender.parse()
    }

    /// Get the pause as a duration.
    #[must_use]
    pub const fn pause_duration(&self) -> Option<Duration> {
        match self.pause_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }

    /// Check if the step has no text and no structured data.
    #[must_use]
    pub fn is_content_empty(&self) -> bool {
        self.message_text.is_empty() && self.json.is_none()
    }

    /// Check if the step only waits.
    #[must_use]
    pub fn is_pause_only(&self) -> bool {
        self.pause_ms.is_some() && self.is_content_empty()
    }
}

/// A compiled conversation: ordered steps plus identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Convo {
    /// Conversation name.
    pub name: String,
    /// Where the conversation came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Steps, in conversation order.
    pub steps: Vec<ConvoStep>,
    /// Named utterance lists.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub utterances: BTreeMap<String, Vec<String>>,
}

impl Convo {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Start building a conversation.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ConvoBuilder {
        ConvoBuilder::new(name)
    }

    /// Get the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the source.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Get the steps.
    #[must_use]
    pub fn steps(&self) -> &[ConvoStep] {
        &self.steps
    }

    /// Get the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get a named utterance list.
    #[must_use]
    pub fn utterance(&self, name: &str) -> Option<&[String]> {
        self.utterances.get(name).map(Vec::as_slice)
    }

    /// Expand a step text into its alternatives.
    ///
    /// Text naming an utterance yields every alternative; any other text
    /// yields itself.
    #[must_use]
    pub fn alternatives(&self, text: &str) -> Vec<String> {
        match self.utterance(text) {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => vec![text.to_string()],
        }
    }
}

/// Builder for [`Convo`].
#[derive(Debug, Clone)]
pub struct ConvoBuilder {
    convo: Convo,
}

impl ConvoBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            convo: Convo::new(name),
        }
    }

    /// Set the source.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.convo.source = Some(source.into());
        self
    }

    /// Add a step.
    #[must_use]
    pub fn step(mut self, step: ConvoStep) -> Self {
        self.convo.steps.push(step);
        self
    }

    /// Add a step that sends text.
    #[must_use]
    pub fn me(self, text: impl Into<String>) -> Self {
        self.step(ConvoStep::me(text))
    }

    /// Add a step that expects text.
    #[must_use]
    pub fn bot(self, text: impl Into<String>) -> Self {
        self.step(ConvoStep::bot(text))
    }

    /// Add a step that expects the reply not to match.
    #[must_use]
    pub fn not_bot(self, text: impl Into<String>) -> Self {
        self.step(ConvoStep::bot(text).with_not(true))
    }

    /// Add a step that only waits.
    #[must_use]
    pub fn pause_ms(self, ms: u64) -> Self {
        self.step(ConvoStep::pause(ms))
    }

    /// Add a step with a raw sender.
    #[must_use]
    pub fn sender(self, sender: impl Into<String>, text: impl Into<String>) -> Self {
        self.step(ConvoStep::new(sender, text))
    }

    /// Add a named utterance list.
    #[must_use]
    pub fn utterance<I, S>(mut self, name: impl Into<String>, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.convo.utterances.insert(
            name.into(),
            alternatives.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Build the conversation.
    #[must_use]
    pub fn build(self) -> Convo {
        self.convo
    }
}
