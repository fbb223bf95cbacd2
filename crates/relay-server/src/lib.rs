//! Relay Server Library
//!
//! This library provides a reliable publish/subscribe broadcast endpoint:
//! a single task owns the network-facing broadcast socket, producers hand
//! messages off through an in-process command channel, heartbeats are
//! broadcast at a fixed interval so subscribers can detect a dead server,
//! and every new subscriber is greeted with a welcome message so it can
//! tell "just connected" apart from "missed messages".
//!
//! # Architecture
//!
//! ```text
//! producer tasks ──publish──▶ PublisherActorHandle
//!                                   │ mpsc command channel
//!                                   ▼
//!                             PublisherActor (one task)
//!                             ├── owns the BroadcastSocket (bind to close)
//!                             ├── heartbeat interval ticker
//!                             └── subscriber connect/disconnect events
//! ```
//!
//! # Key Design Decisions
//!
//! - **Exclusive socket ownership**: the socket is a local of the event
//!   loop's run function; no other task can reach it, so no locking is
//!   needed and handler dispatch is strictly one at a time.
//! - **Whole messages as commands**: a multipart payload crosses the
//!   control channel as one command, so frames from concurrent producers
//!   can never interleave on the wire.
//! - **Best-effort delivery**: a subscriber that fails a send is dropped;
//!   heartbeats and welcomes signal liveness and newness, not delivery.
//! - **Synchronous startup**: construction blocks until the event loop
//!   owns a bound socket, so bind failures surface to the constructor and
//!   an immediately-issued publish is never dropped.
//!
//! # Modules
//!
//! - [`actors`] - Event loop, control-channel protocol, metrics
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types
//! - [`server`] - The facade producers and operators interact with
//! - [`socket`] - The publish-side broadcast socket

pub mod actors;
pub mod config;
pub mod errors;
pub mod server;
pub mod socket;
