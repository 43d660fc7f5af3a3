//! Mock connector implementation for testing.
//!
//! This module provides a connector that answers from a [`Scenario`]
//! instead of talking to a real system under test.

use std::sync::{Arc, Mutex};

use super::scenario::{MockReply, Reaction, Scenario};
use crate::container::{BoxFuture, Connector, ConnectorResult, ReplySink};
use crate::error::ContainerError;
use crate::types::Message;

/// Shared state for the mock connector.
#[derive(Debug, Default)]
struct MockState {
    /// Sink replies are pushed into while started.
    sink: Option<ReplySink>,
    /// Messages received from the tester.
    sent: Vec<Message>,
}

/// A connector answering from a scenario.
///
/// Clones share state, so a clone kept by a test can inspect what was sent
/// after the original moved into a container.
#[derive(Debug, Clone)]
pub struct MockConnector {
    scenario: Arc<Scenario>,
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    /// Create a connector for a scenario.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario: Arc::new(scenario),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a connector that echoes every message.
    #[must_use]
    pub fn echo() -> Self {
        Self::new(Scenario::echo())
    }

    /// Get the scenario.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Check if the connector is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.lock().sink.is_some()
    }

    /// Get the messages received so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.lock().sent.clone()
    }

    /// Get the texts of the messages received so far.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .map(|m| m.message_text.clone())
            .collect()
    }

    /// Take the messages received so far.
    #[must_use]
    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Push an unsolicited bot reply. Returns `false` if not started.
    pub fn push(&self, message: Message) -> bool {
        self.lock().sink.as_ref().is_some_and(|sink| sink.bot_says(message))
    }

    fn deliver(sink: ReplySink, replies: Vec<MockReply>) {
        if replies.iter().all(|r| r.delay.is_zero()) {
            for reply in replies {
                sink.bot_says(reply.message);
            }
            return;
        }

        tokio::spawn(async move {
            for reply in replies {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                if !sink.bot_says(reply.message) {
                    break;
                }
            }
        });
    }
}

impl Connector for MockConnector {
    fn start(&mut self, sink: ReplySink) -> BoxFuture<'_, ConnectorResult<()>> {
        Box::pin(async move {
            if let Some(message) = self.scenario.start_error() {
                return Err(ContainerError::Connector {
                    message: message.to_string(),
                });
            }
            self.lock().sink = Some(sink.clone());
            Self::deliver(sink, self.scenario.greeting_replies().to_vec());
            Ok(())
        })
    }

    fn user_says(&mut self, message: Message) -> BoxFuture<'_, ConnectorResult<()>> {
        Box::pin(async move {
            let sink = {
                let mut state = self.lock();
                state.sent.push(message.clone());
                state.sink.clone()
            };
            let Some(sink) = sink else {
                return Err(ContainerError::Connector {
                    message: "mock connector is not started".to_string(),
                });
            };

            match self.scenario.react(&message) {
                Reaction::Reply(replies) => Self::deliver(sink, replies),
                Reaction::Fail(message) => {
                    sink.fail(ContainerError::Connector { message });
                }
            }
            Ok(())
        })
    }

    fn stop(&mut self) -> BoxFuture<'_, ConnectorResult<()>> {
        Box::pin(async move {
            self.lock().sink = None;
            Ok(())
        })
    }
}
