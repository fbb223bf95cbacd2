//! Server facade: construction, publishing entry points, lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_protocol::message::Message;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::actors::{PublisherActor, PublisherActorHandle, PublisherMetrics};
use crate::config::Config;
use crate::errors::RelayError;

/// A running broadcast server.
///
/// Construction blocks until the event loop owns a bound socket, so a
/// publish issued right after [`bind`](Self::bind) returns is never
/// dropped. The value is consumed by [`shutdown`](Self::shutdown), which
/// makes disposing twice unrepresentable.
#[derive(Debug)]
pub struct RelayServer {
    handle: PublisherActorHandle,
    task: JoinHandle<()>,
    metrics: Arc<PublisherMetrics>,
}

impl RelayServer {
    /// Bind the broadcast socket and start the event loop.
    ///
    /// # Errors
    ///
    /// [`RelayError::Bind`] if the address cannot be bound; no task is
    /// left running in that case.
    pub async fn bind(config: &Config) -> Result<Self, RelayError> {
        let metrics = PublisherMetrics::new();
        let (handle, task) = PublisherActor::spawn(config, Arc::clone(&metrics)).await?;

        info!(target: "relay.server", addr = %handle.local_addr(), "relay server ready");
        Ok(Self {
            handle,
            task,
            metrics,
        })
    }

    /// Address the broadcast socket is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// A cloneable producer handle for publishing from other tasks.
    #[must_use]
    pub fn publisher(&self) -> PublisherActorHandle {
        self.handle.clone()
    }

    /// Shared metrics handle.
    #[must_use]
    pub fn metrics(&self) -> Arc<PublisherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Enqueue a multipart payload for broadcast.
    ///
    /// See [`PublisherActorHandle::publish`].
    ///
    /// # Errors
    ///
    /// [`RelayError::NotRunning`] once the event loop has stopped.
    pub async fn publish(&self, message: Message) -> Result<(), RelayError> {
        self.handle.publish(message).await
    }

    /// Stop the event loop and release the broadcast socket.
    ///
    /// Sends the shutdown command, then waits up to `deadline` for the
    /// event loop to finish its in-flight dispatch, close every subscriber
    /// connection, and exit.
    ///
    /// # Errors
    ///
    /// [`RelayError::ShutdownTimeout`] if the loop does not exit within
    /// the deadline; [`RelayError::TaskFailed`] if it terminated
    /// abnormally.
    pub async fn shutdown(self, deadline: Duration) -> Result<(), RelayError> {
        if self.handle.shutdown_signal().await.is_err() {
            // The loop is already gone; still reap the task below.
            warn!(target: "relay.server", "event loop already stopped before shutdown");
        }

        match tokio::time::timeout(deadline, self.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_error)) => Err(RelayError::TaskFailed(join_error.to_string())),
            Err(_) => Err(RelayError::ShutdownTimeout),
        }
    }
}
