//! Transcript publication.
//!
//! Every run publishes its finalized transcript exactly once, whether it
//! completed or failed, so observers never see a run vanish.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::format::Transcript;
use crate::types::{RunContext, RunOutcome};

/// The transcript-available event.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptEvent<'a> {
    /// Which container and conversation the run belonged to.
    pub context: &'a RunContext,
    /// The finalized transcript, complete or partial.
    pub transcript: &'a Transcript,
    /// How the run ended.
    pub outcome: RunOutcome,
}

/// A receiver of transcript events.
pub trait TranscriptListener: Send + Sync {
    /// Handle a published transcript.
    fn on_transcript(&self, event: &TranscriptEvent<'_>);
}

impl<F> TranscriptListener for F
where
    F: Fn(&TranscriptEvent<'_>) + Send + Sync,
{
    fn on_transcript(&self, event: &TranscriptEvent<'_>) {
        self(event);
    }
}

/// Handle returned by [`TranscriptBus::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Publish/subscribe hub for transcript events.
#[derive(Default)]
pub struct TranscriptBus {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn TranscriptListener>)>>,
    next_id: AtomicU64,
}

impl TranscriptBus {
    /// Create a bus without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn register<L>(&self, listener: L) -> ListenerId
    where
        L: TranscriptListener + 'static,
    {
        self.register_shared(Arc::new(listener))
    }

    /// Register a listener that is also held elsewhere.
    pub fn register_shared(&self, listener: Arc<dyn TranscriptListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Get the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Check if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a transcript to every listener, in registration order.
    ///
    /// Listeners are snapshotted first, so a listener may register or
    /// unregister others without deadlocking. Returns the number notified.
    pub fn publish(&self, context: &RunContext, transcript: &Transcript, outcome: RunOutcome) -> usize {
        let listeners: Vec<Arc<dyn TranscriptListener>> = self
            .listeners
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let event = TranscriptEvent {
            context,
            transcript,
            outcome,
        };
        for listener in &listeners {
            listener.on_transcript(&event);
        }

        tracing::debug!(
            convo = %context.convo,
            container = %context.container,
            ?outcome,
            listeners = listeners.len(),
            "published transcript"
        );
        listeners.len()
    }
}

impl fmt::Debug for TranscriptBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptBus")
            .field("listeners", &self.len())
            .finish()
    }
}
