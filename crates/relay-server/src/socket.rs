//! Publish-side broadcast socket.
//!
//! [`BroadcastSocket`] couples a TCP listener with the set of framed
//! subscriber connections. Registering a connection sends the configured
//! welcome message to that subscriber before it sees any broadcast
//! traffic. Anything a subscriber sends back is subscription-layer
//! chatter, surfaced as a notification for the owner to drop. Broadcasts
//! are best-effort: a peer that fails a send is removed and the remaining
//! peers are unaffected.
//!
//! The socket is intended to live, from bind to close, inside a single
//! task; nothing here is synchronized for concurrent use.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;

use futures::future::select_all;
use futures::{SinkExt, StreamExt};
use relay_protocol::codec::MessageCodec;
use relay_protocol::message::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

/// Identifier for a registered subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Readiness event produced by [`BroadcastSocket::next_event`].
#[derive(Debug)]
pub enum SocketEvent {
    /// A subscriber completed the transport handshake and awaits
    /// registration via [`BroadcastSocket::register`].
    Connected {
        /// The accepted connection.
        stream: TcpStream,
        /// The subscriber's remote address.
        addr: SocketAddr,
    },

    /// A subscriber sent a message upstream; the payload was read and
    /// dropped. Never forwarded as broadcast content.
    Notification {
        /// The chattering subscriber.
        peer: PeerId,
    },

    /// A subscriber hung up or failed; it has already been removed.
    Disconnected {
        /// The departed subscriber.
        peer: PeerId,
    },
}

/// The publish-side broadcast socket.
pub struct BroadcastSocket {
    listener: TcpListener,
    peers: HashMap<PeerId, Framed<TcpStream, MessageCodec>>,
    next_peer: u64,
    welcome: Option<Message>,
}

impl BroadcastSocket {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Any bind error (address in use, invalid address, permissions)
    /// surfaces here; it is fatal to server startup.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            peers: HashMap::new(),
            next_peer: 0,
            welcome: None,
        })
    }

    /// Configure the message sent automatically to each new subscriber on
    /// registration.
    pub fn set_welcome(&mut self, message: Message) {
        self.welcome = Some(message);
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `local_addr` failure.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Wait for the next readiness event.
    ///
    /// Cancel safe: the accept and the per-peer reads hold no state
    /// outside the listener and the framed buffers, so losing the race in
    /// a `select!` loses no data. Registration, which writes the welcome
    /// message, is a separate step the owner runs to completion.
    pub async fn next_event(&mut self) -> SocketEvent {
        let Self {
            listener, peers, ..
        } = self;

        loop {
            let inbound = async {
                if peers.is_empty() {
                    return std::future::pending().await;
                }
                let reads = peers
                    .iter_mut()
                    .map(|(peer, framed)| Box::pin(async move { (*peer, framed.next().await) }));
                let ((peer, item), _, _) = select_all(reads).await;
                (peer, item)
            };

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => return SocketEvent::Connected { stream, addr },
                    Err(error) => {
                        // Transient accept failures (e.g. fd exhaustion)
                        // leave the listener usable; keep waiting.
                        warn!(target: "relay.socket", %error, "accept failed");
                    }
                },
                (peer, item) = inbound => match item {
                    Some(Ok(message)) => {
                        trace!(
                            target: "relay.socket",
                            %peer,
                            frames = message.frame_count(),
                            "read and dropped inbound message from subscriber"
                        );
                        return SocketEvent::Notification { peer };
                    }
                    Some(Err(error)) => {
                        debug!(target: "relay.socket", %peer, %error, "subscriber stream error");
                        peers.remove(&peer);
                        return SocketEvent::Disconnected { peer };
                    }
                    None => {
                        peers.remove(&peer);
                        return SocketEvent::Disconnected { peer };
                    }
                },
            }
        }
    }

    /// Adopt a connection produced by [`next_event`], sending the welcome
    /// message before the subscriber sees any broadcast traffic.
    ///
    /// Returns `None` if the welcome send fails; the connection is
    /// discarded in that case.
    pub async fn register(&mut self, stream: TcpStream, addr: SocketAddr) -> Option<PeerId> {
        let peer = PeerId(self.next_peer);
        self.next_peer += 1;

        let mut framed = Framed::new(stream, MessageCodec::new());
        if let Some(welcome) = &self.welcome {
            if let Err(error) = framed.send(welcome.clone()).await {
                warn!(
                    target: "relay.socket",
                    %peer,
                    %addr,
                    %error,
                    "welcome send failed, discarding subscriber"
                );
                return None;
            }
        }

        self.peers.insert(peer, framed);
        debug!(
            target: "relay.socket",
            %peer,
            %addr,
            subscribers = self.peers.len(),
            "subscriber registered"
        );
        Some(peer)
    }

    /// Broadcast a message to every registered subscriber, frame order
    /// preserved.
    ///
    /// Best-effort: a peer whose send fails is dropped without a retry and
    /// without affecting the rest. Returns the number of subscribers that
    /// accepted the message.
    pub async fn broadcast(&mut self, message: &Message) -> usize {
        if message.is_empty() {
            trace!(target: "relay.socket", "skipping empty broadcast");
            return self.peers.len();
        }

        let mut failed: Vec<PeerId> = Vec::new();
        for (peer, framed) in &mut self.peers {
            if let Err(error) = framed.send(message.clone()).await {
                warn!(
                    target: "relay.socket",
                    peer = %peer,
                    %error,
                    "send failed, dropping subscriber"
                );
                failed.push(*peer);
            }
        }
        for peer in &failed {
            self.peers.remove(peer);
        }
        self.peers.len()
    }

    /// Release every subscriber connection; the listener closes on drop.
    pub async fn close(mut self) {
        for (peer, mut framed) in self.peers.drain() {
            if let Err(error) = framed.close().await {
                debug!(
                    target: "relay.socket",
                    %peer,
                    %error,
                    "error closing subscriber stream"
                );
            }
        }
    }
}

impl fmt::Debug for BroadcastSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastSocket")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("peers", &self.peers.len())
            .field("welcome", &self.welcome)
            .finish()
    }
}
