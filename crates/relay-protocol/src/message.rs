//! Multipart messages and the fixed protocol markers.

use bytes::Bytes;

/// Welcome marker, delivered to each subscriber as soon as its
/// subscription is registered.
pub const WELCOME: &[u8] = b"WM";

/// Heartbeat marker, broadcast at a fixed interval as a liveness signal.
pub const HEARTBEAT: &[u8] = b"HB";

/// A multipart message: an ordered sequence of opaque byte frames.
///
/// Frames are carried verbatim; the protocol attaches no meaning to their
/// contents beyond the single-frame [`WELCOME`] and [`HEARTBEAT`] markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Bytes>,
}

impl Message {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message from an ordered sequence of frames.
    #[must_use]
    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// Create a single-frame message.
    #[must_use]
    pub fn single(frame: impl Into<Bytes>) -> Self {
        Self {
            frames: vec![frame.into()],
        }
    }

    /// The fixed welcome message.
    #[must_use]
    pub fn welcome() -> Self {
        Self::single(Bytes::from_static(WELCOME))
    }

    /// The fixed heartbeat message.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::single(Bytes::from_static(HEARTBEAT))
    }

    /// Append a frame.
    pub fn push_frame(&mut self, frame: impl Into<Bytes>) {
        self.frames.push(frame.into());
    }

    /// The frames, in order.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Consume the message, yielding its frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the message has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total payload size across all frames, in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.frames.iter().map(Bytes::len).sum()
    }

    /// Whether this is the fixed welcome message.
    #[must_use]
    pub fn is_welcome(&self) -> bool {
        matches!(self.frames.as_slice(), [frame] if frame.as_ref() == WELCOME)
    }

    /// Whether this is the fixed heartbeat message.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        matches!(self.frames.as_slice(), [frame] if frame.as_ref() == HEARTBEAT)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_construction() {
        let message = Message::single(Bytes::from_static(b"payload"));
        assert_eq!(message.frame_count(), 1);
        assert_eq!(message.payload_len(), 7);
        assert_eq!(message.frames().first().unwrap().as_ref(), b"payload");
    }

    #[test]
    fn push_preserves_frame_order() {
        let mut message = Message::new();
        message.push_frame(Bytes::from_static(b"first"));
        message.push_frame(Bytes::from_static(b"second"));
        message.push_frame(Bytes::from_static(b"third"));

        let frames: Vec<&[u8]> = message.frames().iter().map(AsRef::as_ref).collect();
        assert_eq!(
            frames,
            [b"first".as_slice(), b"second".as_slice(), b"third".as_slice()]
        );
    }

    #[test]
    fn marker_predicates() {
        assert!(Message::welcome().is_welcome());
        assert!(!Message::welcome().is_heartbeat());
        assert!(Message::heartbeat().is_heartbeat());
        assert!(!Message::heartbeat().is_welcome());

        // Same bytes split across two frames is not a marker.
        let mut split = Message::single(Bytes::from_static(b"H"));
        split.push_frame(Bytes::from_static(b"B"));
        assert!(!split.is_heartbeat());

        assert!(!Message::single(Bytes::from_static(b"HBX")).is_heartbeat());
        assert!(!Message::new().is_welcome());
    }

    #[test]
    fn empty_message() {
        let message = Message::new();
        assert!(message.is_empty());
        assert_eq!(message.frame_count(), 0);
        assert_eq!(message.payload_len(), 0);
    }

    #[test]
    fn into_frames_round_trips() {
        let frames = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let message = Message::from_frames(frames.clone());
        assert_eq!(message.into_frames(), frames);
    }
}
