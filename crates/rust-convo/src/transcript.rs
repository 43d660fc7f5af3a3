//! Conversation transcripts and their publication.
//!
//! This module provides the timestamped, step-by-step record of a run,
//! the recorder that builds it, and the bus that hands finalized
//! transcripts to listeners.

pub mod bus;
pub mod format;
pub mod recorder;

pub use bus::{ListenerId, TranscriptBus, TranscriptEvent, TranscriptListener};
pub use format::{StepError, Transcript, TranscriptStep};
pub use recorder::{PendingStep, TranscriptRecorder};
