//! Conversation execution engine.
//!
//! The runner walks a [`Convo`] step by step against a [`Container`]:
//! outgoing steps are substituted from scripting memory and sent, incoming
//! steps await the next reply and are matched, pause steps suspend the run.
//! The first failing step ends the run; its partial transcript is attached
//! to the returned [`RunFailure`]. Every run publishes its transcript
//! exactly once before returning.

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::definition::{Convo, ConvoStep};
use crate::config::RunConfig;
use crate::container::{Connector, Container};
use crate::error::{ConvoError, RunFailure};
use crate::expect::{Expectation, ExpectationMatcher, PatternCache};
use crate::memory::{BuiltinRegistry, ScriptingMemory};
use crate::transcript::{PendingStep, Transcript, TranscriptBus, TranscriptRecorder};
use crate::types::{Message, RunContext, RunOutcome, RunState, Sender};

/// Result of a conversation run.
pub type RunResult = std::result::Result<Transcript, RunFailure>;

/// Executes conversations.
///
/// A runner holds no per-run state: each run gets its own scripting
/// memory, pattern cache and transcript, so one runner may drive many
/// conversations concurrently.
#[derive(Debug, Clone)]
pub struct ConvoRunner {
    config: RunConfig,
    builtins: Arc<BuiltinRegistry>,
    bus: Arc<TranscriptBus>,
}

impl Default for ConvoRunner {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl ConvoRunner {
    /// Create a runner with the standard builtins and a fresh bus.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            builtins: BuiltinRegistry::standard(),
            bus: Arc::new(TranscriptBus::new()),
        }
    }

    /// Use a custom builtin registry.
    #[must_use]
    pub fn with_builtins(mut self, builtins: Arc<BuiltinRegistry>) -> Self {
        self.builtins = builtins;
        self
    }

    /// Publish transcripts on a shared bus.
    #[must_use]
    pub fn with_bus(mut self, bus: Arc<TranscriptBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Get the run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Get the transcript bus.
    #[must_use]
    pub const fn bus(&self) -> &Arc<TranscriptBus> {
        &self.bus
    }

    /// Run a conversation against a started container.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the partial transcript if any step
    /// fails.
    pub async fn run<C: Connector>(&self, container: &mut Container<C>, convo: &Convo) -> RunResult {
        let span = tracing::info_span!("convo", convo = %convo.name(), container = %container.id());
        self.execute(container, convo).instrument(span).await
    }

    /// Start the container, run the conversation, then stop the container.
    ///
    /// A container that fails to start yields a failed run with an empty
    /// transcript, published like any other.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] if the container cannot start or a step fails.
    pub async fn run_session<C: Connector>(
        &self,
        container: &mut Container<C>,
        convo: &Convo,
    ) -> RunResult {
        if let Err(err) = container.start().await {
            let context = Self::context(container, convo);
            let transcript = TranscriptRecorder::start().finish();
            tracing::error!(convo = %convo.name(), error = %err, "container failed to start");
            self.bus.publish(&context, &transcript, RunOutcome::Failure);
            return Err(RunFailure {
                convo: convo.name().to_string(),
                transcript,
                source: err.into(),
            });
        }

        let result = self.run(container, convo).await;

        if let Err(err) = container.stop().await {
            tracing::warn!(container = %container.id(), error = %err, "container failed to stop");
        }
        result
    }

    fn context<C: Connector>(container: &Container<C>, convo: &Convo) -> RunContext {
        let context = RunContext::new(container.id(), convo.name());
        match convo.source() {
            Some(source) => context.with_source(source),
            None => context,
        }
    }

    async fn execute<C: Connector>(&self, container: &mut Container<C>, convo: &Convo) -> RunResult {
        let context = Self::context(container, convo);
        let cache = Arc::new(PatternCache::default());
        let matcher = ExpectationMatcher::with_cache(Arc::clone(&cache));
        let mut memory =
            ScriptingMemory::for_run(Arc::clone(&self.builtins), &self.config).with_cache(cache);
        let mut recorder = TranscriptRecorder::start();
        let mut state = RunState::NotStarted;

        transition(&mut state, RunState::Running);
        tracing::info!(steps = convo.len(), "conversation started");

        let mut failure = None;
        for (index, step) in convo.steps().iter().enumerate() {
            let mut pending = recorder.begin_step();
            pending.set_not(step.not);

            let outcome = self
                .execute_step(index, step, convo, container, &mut memory, &matcher, &mut pending)
                .await;

            match outcome {
                Ok(()) => {
                    recorder.complete_step(pending);
                }
                Err(err) => {
                    recorder.fail_step(pending, &err);
                    failure = Some(err);
                    break;
                }
            }
        }

        recorder.record_diagnostics(memory.diagnostics());
        let transcript = recorder.finish();

        match failure {
            None => {
                transition(&mut state, RunState::Completed);
                tracing::info!(
                    steps = transcript.len(),
                    duration_ms = transcript.duration().as_millis() as u64,
                    "conversation completed"
                );
                self.bus.publish(&context, &transcript, RunOutcome::Success);
                Ok(transcript)
            }
            Some(err) => {
                transition(&mut state, RunState::Failed);
                tracing::error!(step = ?err.step(), kind = %err.kind(), error = %err, "conversation failed");
                self.bus.publish(&context, &transcript, RunOutcome::Failure);
                Err(RunFailure {
                    convo: convo.name().to_string(),
                    transcript,
                    source: err,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_step<C: Connector>(
        &self,
        index: usize,
        step: &ConvoStep,
        convo: &Convo,
        container: &mut Container<C>,
        memory: &mut ScriptingMemory,
        matcher: &ExpectationMatcher,
        pending: &mut PendingStep,
    ) -> Result<(), ConvoError> {
        pending.set_expected(scripted(step));

        // A pure pause needs no sender.
        if step.is_pause_only() {
            tracing::debug!(step = index, pause_ms = ?step.pause_ms, "pause");
            pause(step).await;
            return Ok(());
        }

        let sender = step.parse_sender().map_err(|e| ConvoError::InvalidSender {
            step: index,
            sender: e.0,
        })?;

        match sender {
            Sender::Me => {
                let text = convo
                    .alternatives(&step.message_text)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                let mut message = Message::me(memory.apply(&text))
                    .with_args(memory.apply_to_args(&step.args));
                if let Some(json) = &step.json {
                    message = message.with_source_data(memory.apply_to_json(&Value::Object(json.clone())));
                }

                tracing::debug!(step = index, text = %message.message_text, "me says");
                pending.set_actual(message.clone());
                container.user_says(message).await?;
            }
            Sender::Bot => {
                let expectation = Expectation {
                    alternatives: convo.alternatives(&step.message_text),
                    json: step.json.clone(),
                    not: step.not,
                }
                .substitute(memory);

                let mut expected = Message::bot(expectation.display());
                if let Some(json) = &expectation.json {
                    expected = expected.with_source_data(Value::Object(json.clone()));
                }
                pending.set_expected(expected);

                let actual = container.wait_bot_says().await?;
                tracing::debug!(step = index, text = %actual.message_text, "bot says");
                pending.set_actual(actual.clone());

                let bindings = matcher.resolve(memory, index, &expectation, &actual)?;
                for binding in &bindings {
                    tracing::debug!(step = index, variable = %binding.name, value = %binding.value, "bound");
                }
            }
        }

        pause(step).await;
        Ok(())
    }
}

/// The step as scripted, before substitution.
fn scripted(step: &ConvoStep) -> Message {
    Message {
        sender: step.sender.clone(),
        message_text: step.message_text.clone(),
        args: step.args.clone(),
        source_data: step.json.clone().map(Value::Object),
    }
}

async fn pause(step: &ConvoStep) {
    if let Some(duration) = step.pause_duration() {
        tokio::time::sleep(duration).await;
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug_assert!(state.can_transition_to(next), "illegal transition {state} -> {next}");
    tracing::debug!(from = %state, to = %next, "run state");
    *state = next;
}
