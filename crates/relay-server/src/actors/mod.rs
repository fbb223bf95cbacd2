//! Actor event loop and control-channel protocol.
//!
//! One task owns the broadcast socket; everything else talks to it
//! through typed commands over `tokio::sync::mpsc`.

pub mod messages;
pub mod metrics;
pub mod publisher;

pub use messages::PublisherCommand;
pub use metrics::PublisherMetrics;
pub use publisher::{PublisherActor, PublisherActorHandle};
