//! Command protocol between producer tasks and the publisher actor.
//!
//! Producers never touch the broadcast socket; every request crosses the
//! control channel as a tagged command consumed by the owning task.

use relay_protocol::message::Message;

/// Commands accepted by the `PublisherActor`.
#[derive(Debug)]
pub enum PublisherCommand {
    /// Broadcast a multipart payload to every current subscriber.
    ///
    /// The whole payload travels as one command, so frames from two
    /// concurrent producers can never interleave on the wire.
    Publish {
        /// The payload, forwarded frame-for-frame without modification.
        message: Message,
    },

    /// Stop the event loop once the in-flight dispatch completes.
    Shutdown,
}
