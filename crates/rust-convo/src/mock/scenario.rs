//! Mock scenarios for testing conversations.
//!
//! A scenario maps trigger texts to canned bot replies, with optional
//! delays, structured payloads and injected failures.

use std::time::Duration;

use serde_json::Value;

use crate::types::Message;

/// A canned bot reply.
#[derive(Debug, Clone, PartialEq)]
pub struct MockReply {
    /// The reply message.
    pub message: Message,
    /// Delay before the reply is delivered.
    pub delay: Duration,
}

impl MockReply {
    /// Create a text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message: Message::bot(text),
            delay: Duration::ZERO,
        }
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_json(mut self, data: Value) -> Self {
        self.message.source_data = Some(data);
        self
    }

    /// Set the delay in milliseconds.
    #[must_use]
    pub const fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

/// What happens when a message matches a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Deliver these replies in order.
    Reply(Vec<MockReply>),
    /// Signal a connector failure to the waiting run.
    Fail(String),
}

/// A trigger text and its reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRule {
    /// Exact message text that fires the rule.
    pub trigger: String,
    /// What the bot does.
    pub reaction: Reaction,
}

/// What the bot does with a message no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Stay silent.
    #[default]
    Silent,
    /// Reply with the received text.
    Echo,
    /// Reply with a fixed text.
    Reply(String),
}

/// A complete mock scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    name: String,
    greeting: Vec<MockReply>,
    rules: Vec<ScenarioRule>,
    fallback: Fallback,
    start_error: Option<String>,
}

impl Scenario {
    /// Create a silent scenario.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a scenario that echoes every message.
    #[must_use]
    pub fn echo() -> Self {
        Self::new("echo").fallback(Fallback::Echo)
    }

    /// Deliver a reply as soon as the connector starts.
    #[must_use]
    pub fn greeting(mut self, reply: impl Into<String>) -> Self {
        self.greeting.push(MockReply::text(reply));
        self
    }

    /// Reply with a text when the trigger is received.
    #[must_use]
    pub fn on(self, trigger: impl Into<String>, reply: impl Into<String>) -> Self {
        self.respond(trigger, [MockReply::text(reply)])
    }

    /// Reply with a text and structured payload when the trigger is received.
    #[must_use]
    pub fn on_json(self, trigger: impl Into<String>, reply: impl Into<String>, data: Value) -> Self {
        self.respond(trigger, [MockReply::text(reply).with_json(data)])
    }

    /// Deliver several replies when the trigger is received.
    #[must_use]
    pub fn respond<I>(mut self, trigger: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = MockReply>,
    {
        self.rules.push(ScenarioRule {
            trigger: trigger.into(),
            reaction: Reaction::Reply(replies.into_iter().collect()),
        });
        self
    }

    /// Signal a connector failure when the trigger is received.
    #[must_use]
    pub fn fail_on(mut self, trigger: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(ScenarioRule {
            trigger: trigger.into(),
            reaction: Reaction::Fail(message.into()),
        });
        self
    }

    /// Set the fallback for unmatched messages.
    #[must_use]
    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Make the connector refuse to start.
    #[must_use]
    pub fn refuse_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    /// Get the scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the greeting replies.
    #[must_use]
    pub fn greeting_replies(&self) -> &[MockReply] {
        &self.greeting
    }

    /// Get the rules.
    #[must_use]
    pub fn rules(&self) -> &[ScenarioRule] {
        &self.rules
    }

    /// Get the error the connector fails to start with.
    #[must_use]
    pub fn start_error(&self) -> Option<&str> {
        self.start_error.as_deref()
    }

    /// Decide how the bot reacts to a message.
    #[must_use]
    pub fn react(&self, message: &Message) -> Reaction {
        if let Some(rule) = self.rules.iter().find(|r| r.trigger == message.message_text) {
            return rule.reaction.clone();
        }
        match &self.fallback {
            Fallback::Silent => Reaction::Reply(Vec::new()),
            Fallback::Echo => Reaction::Reply(vec![MockReply::text(message.message_text.clone())]),
            Fallback::Reply(text) => Reaction::Reply(vec![MockReply::text(text.clone())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let scenario = Scenario::new("s").on("hi", "first").on("hi", "second");
        assert_eq!(
            scenario.react(&Message::me("hi")),
            Reaction::Reply(vec![MockReply::text("first")])
        );
    }

    #[test]
    fn fallbacks() {
        let msg = Message::me("unknown");
        assert_eq!(Scenario::new("s").react(&msg), Reaction::Reply(Vec::new()));
        assert_eq!(
            Scenario::echo().react(&msg),
            Reaction::Reply(vec![MockReply::text("unknown")])
        );
        assert_eq!(
            Scenario::new("s")
                .fallback(Fallback::Reply("pardon?".to_string()))
                .react(&msg),
            Reaction::Reply(vec![MockReply::text("pardon?")])
        );
    }

    #[test]
    fn failure_rule() {
        let scenario = Scenario::new("s").fail_on("crash", "boom");
        assert_eq!(
            scenario.react(&Message::me("crash")),
            Reaction::Fail("boom".to_string())
        );
    }
}
