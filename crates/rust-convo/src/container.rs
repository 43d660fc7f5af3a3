//! The container around a connector to the system under test.
//!
//! A [`Connector`] transmits outgoing messages and pushes replies into a
//! [`ReplySink`] whenever they arrive. The [`Container`] owns the receiving
//! end of that sink, so a run awaits the next delivered reply instead of
//! polling the connector. Reply timeouts live here, not in the runner.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::RunConfig;
use crate::error::ContainerError;
use crate::types::Message;

/// Boxed future returned by [`Connector`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for connector operations.
pub type ConnectorResult<T> = std::result::Result<T, ContainerError>;

/// Sending half of a container's reply inbox.
///
/// Connectors push bot replies (or failures) into the sink at any time
/// after [`Connector::start`].
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: mpsc::UnboundedSender<ConnectorResult<Message>>,
}

impl ReplySink {
    /// Create a sink and its receiving inbox.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConnectorResult<Message>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a bot reply. Returns `false` if the container is gone.
    pub fn bot_says(&self, message: Message) -> bool {
        self.tx.send(Ok(message)).is_ok()
    }

    /// Signal a failure to the waiting run. Returns `false` if the container is gone.
    pub fn fail(&self, error: ContainerError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Check if the container has dropped its inbox.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Transport to a chat-capable system under test.
pub trait Connector: Send {
    /// Connect and begin pushing replies into `sink`.
    fn start(&mut self, sink: ReplySink) -> BoxFuture<'_, ConnectorResult<()>>;

    /// Transmit a message from the tester.
    fn user_says(&mut self, message: Message) -> BoxFuture<'_, ConnectorResult<()>>;

    /// Disconnect.
    fn stop(&mut self) -> BoxFuture<'_, ConnectorResult<()>>;
}

/// A connector plus the inbox its replies are delivered to.
#[derive(Debug)]
pub struct Container<C> {
    id: String,
    connector: C,
    inbox: Option<mpsc::UnboundedReceiver<ConnectorResult<Message>>>,
    wait_reply: Option<Duration>,
}

impl<C: Connector> Container<C> {
    /// Create a container around a connector.
    #[must_use]
    pub fn new(id: impl Into<String>, connector: C) -> Self {
        Self {
            id: id.into(),
            connector,
            inbox: None,
            wait_reply: None,
        }
    }

    /// Take the reply timeout from a run configuration.
    #[must_use]
    pub const fn with_config(mut self, config: &RunConfig) -> Self {
        self.wait_reply = config.timeout.wait_reply();
        self
    }

    /// Set how long [`wait_bot_says`](Self::wait_bot_says) waits for a reply.
    #[must_use]
    pub const fn with_wait_reply(mut self, timeout: Option<Duration>) -> Self {
        self.wait_reply = timeout;
        self
    }

    /// Get the container identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Check if the container has been started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.inbox.is_some()
    }

    /// Get the connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Get the connector mutably.
    pub const fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Start the connector with a fresh inbox.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if it cannot start.
    pub async fn start(&mut self) -> ConnectorResult<()> {
        let (sink, inbox) = ReplySink::channel();
        self.connector.start(sink).await?;
        self.inbox = Some(inbox);
        tracing::debug!(container = %self.id, "container started");
        Ok(())
    }

    /// Stop the connector and drop the inbox.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if it cannot stop cleanly.
    pub async fn stop(&mut self) -> ConnectorResult<()> {
        if self.inbox.take().is_none() {
            return Ok(());
        }
        tracing::debug!(container = %self.id, "container stopping");
        self.connector.stop().await
    }

    /// Send a message from the tester.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotStarted`] before [`start`](Self::start),
    /// or the connector's error.
    pub async fn user_says(&mut self, message: Message) -> ConnectorResult<()> {
        if self.inbox.is_none() {
            return Err(ContainerError::NotStarted {
                id: self.id.clone(),
            });
        }
        self.connector.user_says(message).await
    }

    /// Await the next bot reply.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotStarted`] before [`start`](Self::start),
    /// [`ContainerError::Closed`] if the connector dropped its sink,
    /// [`ContainerError::Timeout`] if the reply timeout elapsed, or the
    /// failure the connector signaled.
    pub async fn wait_bot_says(&mut self) -> ConnectorResult<Message> {
        let Some(inbox) = self.inbox.as_mut() else {
            return Err(ContainerError::NotStarted {
                id: self.id.clone(),
            });
        };

        let received = match self.wait_reply {
            Some(duration) => tokio::time::timeout(duration, inbox.recv())
                .await
                .map_err(|_| ContainerError::Timeout { duration })?,
            None => inbox.recv().await,
        };

        match received {
            Some(reply) => reply,
            None => Err(ContainerError::Closed {
                id: self.id.clone(),
            }),
        }
    }
}
