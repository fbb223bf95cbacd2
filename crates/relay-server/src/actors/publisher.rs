//! `PublisherActor` - the event loop that owns the broadcast socket.
//!
//! The actor is the only task that ever touches the socket, from bind to
//! close; the socket is a local of its run function and never escapes.
//! Producers reach it through the bounded command channel, new subscribers
//! and their chatter arrive as socket events, and a fixed-interval ticker
//! drives heartbeats. A `tokio::select!` multiplexes the three sources and
//! exactly one handler runs at a time.
//!
//! # Startup
//!
//! `spawn` does not return until the task has bound the socket and
//! signalled readiness. A bind failure therefore surfaces from `spawn`
//! itself, and a publish issued immediately after construction is never
//! dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_protocol::message::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace};

use crate::config::Config;
use crate::errors::RelayError;
use crate::socket::{BroadcastSocket, SocketEvent};

use super::messages::PublisherCommand;
use super::metrics::PublisherMetrics;

/// Command channel buffer size for the publisher mailbox.
const PUBLISHER_CHANNEL_BUFFER: usize = 500;

/// Handle to a `PublisherActor`.
#[derive(Clone, Debug)]
pub struct PublisherActorHandle {
    sender: mpsc::Sender<PublisherCommand>,
    local_addr: SocketAddr,
}

impl PublisherActorHandle {
    /// Address the broadcast socket is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Enqueue a multipart payload for broadcast.
    ///
    /// Returns once the command is on the control channel; delivery to
    /// subscribers is asynchronous and best-effort, and subscriber-side
    /// problems never fail this call. Waits only while the channel is at
    /// capacity.
    ///
    /// # Errors
    ///
    /// [`RelayError::NotRunning`] once the event loop has stopped.
    pub async fn publish(&self, message: Message) -> Result<(), RelayError> {
        self.sender
            .send(PublisherCommand::Publish { message })
            .await
            .map_err(|_| RelayError::NotRunning)
    }

    /// Enqueue the shutdown command.
    ///
    /// The loop exits after finishing its in-flight dispatch; await the
    /// task handle returned by [`PublisherActor::spawn`] to observe the
    /// exit.
    ///
    /// # Errors
    ///
    /// [`RelayError::NotRunning`] if the event loop already stopped.
    pub async fn shutdown_signal(&self) -> Result<(), RelayError> {
        self.sender
            .send(PublisherCommand::Shutdown)
            .await
            .map_err(|_| RelayError::NotRunning)
    }
}

/// One multiplexed readiness result inside the event loop.
enum Wakeup {
    Command(Option<PublisherCommand>),
    Socket(SocketEvent),
    Heartbeat,
}

/// The `PublisherActor` implementation.
pub struct PublisherActor {
    /// Command receiver (the control channel's server end).
    receiver: mpsc::Receiver<PublisherCommand>,
    /// Address to bind the broadcast socket to.
    bind_address: String,
    /// Interval between heartbeat broadcasts.
    heartbeat_interval: Duration,
    /// Shared metrics.
    metrics: Arc<PublisherMetrics>,
}

impl PublisherActor {
    /// Spawn the event loop and wait for it to come up.
    ///
    /// Returns a handle and the task join handle.
    ///
    /// # Errors
    ///
    /// [`RelayError::Bind`] if the broadcast socket cannot be bound; the
    /// task has already exited in that case and nothing is left running.
    pub async fn spawn(
        config: &Config,
        metrics: Arc<PublisherMetrics>,
    ) -> Result<(PublisherActorHandle, JoinHandle<()>), RelayError> {
        let (sender, receiver) = mpsc::channel(PUBLISHER_CHANNEL_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();

        let actor = Self {
            receiver,
            bind_address: config.bind_address.clone(),
            heartbeat_interval: config.heartbeat_interval,
            metrics,
        };
        let task_handle = tokio::spawn(actor.run(ready_tx));

        let local_addr = match ready_rx.await {
            Ok(Ok(addr)) => addr,
            Ok(Err(error)) => return Err(error),
            Err(_) => {
                return Err(RelayError::TaskFailed(
                    "event loop exited during startup".to_string(),
                ))
            }
        };

        Ok((PublisherActorHandle { sender, local_addr }, task_handle))
    }

    /// Run the event loop. The socket lives and dies inside this function;
    /// nothing else can reach it.
    #[instrument(skip_all, name = "relay.actor.publisher", fields(addr = %self.bind_address))]
    async fn run(self, ready: oneshot::Sender<Result<SocketAddr, RelayError>>) {
        let Self {
            mut receiver,
            bind_address,
            heartbeat_interval,
            metrics,
        } = self;

        let mut socket = match BroadcastSocket::bind(&bind_address).await {
            Ok(socket) => socket,
            Err(source) => {
                let _ = ready.send(Err(RelayError::Bind {
                    addr: bind_address,
                    source,
                }));
                return;
            }
        };
        socket.set_welcome(Message::welcome());

        let local_addr = match socket.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                let _ = ready.send(Err(RelayError::Bind {
                    addr: bind_address,
                    source,
                }));
                socket.close().await;
                return;
            }
        };

        // First beat one full interval after startup; a stalled loop does
        // not burst-compensate missed beats.
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if ready.send(Ok(local_addr)).is_err() {
            // The constructor caller vanished before startup completed.
            socket.close().await;
            return;
        }

        info!(
            target: "relay.actor.publisher",
            addr = %local_addr,
            heartbeat_interval = ?heartbeat_interval,
            "publisher started"
        );

        loop {
            let wakeup = tokio::select! {
                command = receiver.recv() => Wakeup::Command(command),
                event = socket.next_event() => Wakeup::Socket(event),
                _ = heartbeat.tick() => Wakeup::Heartbeat,
            };

            match wakeup {
                Wakeup::Command(Some(PublisherCommand::Publish { message })) => {
                    Self::handle_publish(&mut socket, &metrics, &message).await;
                }
                Wakeup::Command(Some(PublisherCommand::Shutdown)) => {
                    info!(target: "relay.actor.publisher", "shutdown command received");
                    break;
                }
                Wakeup::Command(None) => {
                    info!(target: "relay.actor.publisher", "all handles dropped, exiting");
                    break;
                }
                Wakeup::Socket(event) => {
                    Self::handle_socket_event(&mut socket, &metrics, event).await;
                }
                Wakeup::Heartbeat => {
                    Self::handle_heartbeat(&mut socket, &metrics).await;
                }
            }
        }

        let subscribers = socket.peer_count();
        socket.close().await;
        info!(
            target: "relay.actor.publisher",
            subscribers,
            published = metrics.published(),
            heartbeats = metrics.heartbeats(),
            "publisher stopped"
        );
    }

    /// Forward a publish payload onto the broadcast socket.
    ///
    /// Send failures drop the failing peer and are not retried; the next
    /// publish is still attempted.
    async fn handle_publish(
        socket: &mut BroadcastSocket,
        metrics: &PublisherMetrics,
        message: &Message,
    ) {
        trace!(
            target: "relay.actor.publisher",
            frames = message.frame_count(),
            bytes = message.payload_len(),
            "forwarding publish payload"
        );
        let before = socket.peer_count();
        let delivered = socket.broadcast(message).await;
        metrics.record_publish();
        metrics.record_dropped_sends(before.saturating_sub(delivered) as u64);
        metrics.set_subscribers(delivered);
    }

    /// React to a broadcast socket event.
    async fn handle_socket_event(
        socket: &mut BroadcastSocket,
        metrics: &PublisherMetrics,
        event: SocketEvent,
    ) {
        match event {
            SocketEvent::Connected { stream, addr } => {
                if socket.register(stream, addr).await.is_some() {
                    metrics.set_subscribers(socket.peer_count());
                }
            }
            SocketEvent::Notification { peer } => {
                // Subscription-layer chatter; dropped, never forwarded.
                debug!(target: "relay.actor.publisher", %peer, "discarded subscriber notification");
            }
            SocketEvent::Disconnected { peer } => {
                debug!(target: "relay.actor.publisher", %peer, "subscriber disconnected");
                metrics.set_subscribers(socket.peer_count());
            }
        }
    }

    /// Broadcast the fixed heartbeat marker.
    async fn handle_heartbeat(socket: &mut BroadcastSocket, metrics: &PublisherMetrics) {
        let before = socket.peer_count();
        let delivered = socket.broadcast(&Message::heartbeat()).await;
        metrics.record_heartbeat();
        metrics.record_dropped_sends(before.saturating_sub(delivered) as u64);
        metrics.set_subscribers(delivered);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn quiet_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            heartbeat_interval: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_spawn_reports_the_bound_address() {
        let (handle, task) = PublisherActor::spawn(&quiet_config(), PublisherMetrics::new())
            .await
            .expect("spawn should succeed on an ephemeral port");

        assert_ne!(handle.local_addr().port(), 0);

        handle.shutdown_signal().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("event loop should exit promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_surfaces_from_spawn() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            bind_address: occupied.local_addr().unwrap().to_string(),
            heartbeat_interval: Duration::from_secs(3600),
        };

        let result = PublisherActor::spawn(&config, PublisherMetrics::new()).await;
        assert!(matches!(result, Err(RelayError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_publish_after_stop_fails_deterministically() {
        let (handle, task) = PublisherActor::spawn(&quiet_config(), PublisherMetrics::new())
            .await
            .unwrap();

        handle.shutdown_signal().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        let result = handle
            .publish(Message::single(Bytes::from_static(b"late")))
            .await;
        assert!(matches!(result, Err(RelayError::NotRunning)));
    }

    #[tokio::test]
    async fn test_cloned_handles_publish_to_the_same_loop() {
        let metrics = PublisherMetrics::new();
        let (handle, task) = PublisherActor::spawn(&quiet_config(), Arc::clone(&metrics))
            .await
            .unwrap();

        let clone = handle.clone();
        handle
            .publish(Message::single(Bytes::from_static(b"a")))
            .await
            .unwrap();
        clone
            .publish(Message::single(Bytes::from_static(b"b")))
            .await
            .unwrap();

        handle.shutdown_signal().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        // Both commands were dispatched before the shutdown command.
        assert_eq!(metrics.published(), 2);
    }

    #[tokio::test]
    async fn test_loop_exits_when_every_handle_is_dropped() {
        let (handle, task) = PublisherActor::spawn(&quiet_config(), PublisherMetrics::new())
            .await
            .unwrap();

        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("event loop should exit once all handles are gone")
            .unwrap();
    }
}
