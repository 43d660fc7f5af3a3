//! Run recording.
//!
//! The wall clock is read once, when recording starts; every later
//! timestamp is that reading offset by a monotonic clock, so timestamps
//! within a transcript never go backwards.

use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};

use super::format::{StepError, Transcript, TranscriptStep};
use crate::error::ConvoError;
use crate::memory::Diagnostic;
use crate::types::Message;

/// Offset `begin` by the monotonic time between `origin` and `at`.
fn offset(begin: DateTime<Utc>, origin: Instant, at: Instant) -> DateTime<Utc> {
    let elapsed =
        TimeDelta::from_std(at.saturating_duration_since(origin)).unwrap_or(TimeDelta::MAX);
    begin.checked_add_signed(elapsed).unwrap_or(begin)
}

/// A step that has begun but not yet been appended.
#[derive(Debug, Clone)]
pub struct PendingStep {
    begin: DateTime<Utc>,
    started: Instant,
    actual: Option<Message>,
    expected: Option<Message>,
    not: bool,
}

impl PendingStep {
    /// Set the expected message.
    pub fn set_expected(&mut self, message: Message) {
        self.expected = Some(message);
    }

    /// Set the actual message.
    pub fn set_actual(&mut self, message: Message) {
        self.actual = Some(message);
    }

    /// Set the negation flag.
    pub const fn set_not(&mut self, not: bool) {
        self.not = not;
    }

    /// Get the step's begin timestamp.
    #[must_use]
    pub const fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    fn finish(self, err: Option<StepError>) -> TranscriptStep {
        TranscriptStep {
            step_begin: self.begin,
            step_end: offset(self.begin, self.started, Instant::now()),
            actual: self.actual,
            expected: self.expected,
            not: self.not,
            err,
        }
    }
}

/// Records the transcript of one run.
#[derive(Debug)]
pub struct TranscriptRecorder {
    started: Instant,
    transcript: Transcript,
}

impl Default for TranscriptRecorder {
    fn default() -> Self {
        Self::start()
    }
}

impl TranscriptRecorder {
    /// Start recording; `convo_begin` is now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            transcript: Transcript::new(Utc::now()),
        }
    }

    /// Begin a step; `step_begin` is now.
    #[must_use]
    pub fn begin_step(&self) -> PendingStep {
        let started = Instant::now();
        PendingStep {
            begin: offset(self.transcript.convo_begin, self.started, started),
            started,
            actual: None,
            expected: None,
            not: false,
        }
    }

    /// Finish a step successfully and append it.
    pub fn complete_step(&mut self, step: PendingStep) -> &TranscriptStep {
        self.push(step.finish(None))
    }

    /// Finish a step with an error and append it.
    pub fn fail_step(&mut self, step: PendingStep, err: &ConvoError) -> &TranscriptStep {
        self.push(step.finish(Some(StepError::from(err))))
    }

    fn push(&mut self, step: TranscriptStep) -> &TranscriptStep {
        self.transcript.steps.push(step);
        let last = self.transcript.steps.len() - 1;
        &self.transcript.steps[last]
    }

    /// Attach the diagnostics collected while filling variables.
    pub fn record_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        self.transcript.diagnostics.extend_from_slice(diagnostics);
    }

    /// Get the number of recorded steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.transcript.steps.len()
    }

    /// Finish recording; `convo_end` is now.
    #[must_use]
    pub fn finish(mut self) -> Transcript {
        self.transcript.convo_end =
            offset(self.transcript.convo_begin, self.started, Instant::now());
        self.transcript
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn records_steps_in_order() {
        let mut recorder = TranscriptRecorder::start();

        let mut first = recorder.begin_step();
        first.set_actual(Message::me("hi"));
        recorder.complete_step(first);

        let mut second = recorder.begin_step();
        second.set_not(true);
        recorder.complete_step(second);

        let transcript = recorder.finish();
        assert_eq!(transcript.steps.len(), 2);
        assert_eq!(transcript.steps[0].actual_text(), Some("hi"));
        assert!(transcript.steps[1].not);
    }

    #[test]
    fn timestamps_are_ordered() {
        let mut recorder = TranscriptRecorder::start();
        let step = recorder.begin_step();
        std::thread::sleep(Duration::from_millis(20));
        let recorded = recorder.complete_step(step);
        assert!(recorded.step_begin <= recorded.step_end);
        assert!(recorded.duration() >= Duration::from_millis(20));

        let transcript = recorder.finish();
        assert!(transcript.convo_begin <= transcript.convo_end);
        assert!(transcript.steps[0].step_begin >= transcript.convo_begin);
    }

    #[test]
    fn failed_step_carries_error() {
        let mut recorder = TranscriptRecorder::start();
        let step = recorder.begin_step();
        let err = ConvoError::InvalidSender {
            step: 0,
            sender: "robot".to_string(),
        };
        recorder.fail_step(step, &err);

        let transcript = recorder.finish();
        assert!(transcript.steps[0].err.as_ref().unwrap().message.contains("robot"));
    }
}
