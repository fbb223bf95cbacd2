//! Relay server error types.
//!
//! Only startup errors surface synchronously, to the constructor caller.
//! Errors inside handler dispatch are logged and never reach `publish`
//! callers, whose calls already returned once the command was enqueued.

use thiserror::Error;

/// Relay server error type.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Binding the broadcast socket failed at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying bind error.
        #[source]
        source: std::io::Error,
    },

    /// The event loop is no longer running; the command was not enqueued.
    #[error("server is not running")]
    NotRunning,

    /// The event loop did not exit within the shutdown deadline.
    #[error("shutdown deadline elapsed before the event loop exited")]
    ShutdownTimeout,

    /// The event loop task terminated abnormally.
    #[error("event loop task failed: {0}")]
    TaskFailed(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        let bind = RelayError::Bind {
            addr: "127.0.0.1:5570".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            format!("{bind}"),
            "failed to bind 127.0.0.1:5570: address in use"
        );

        assert_eq!(format!("{}", RelayError::NotRunning), "server is not running");
        assert_eq!(
            format!("{}", RelayError::TaskFailed("panicked".to_string())),
            "event loop task failed: panicked"
        );
    }

    #[test]
    fn test_bind_error_preserves_source() {
        let error = RelayError::Bind {
            addr: "0.0.0.0:5570".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        let source = std::error::Error::source(&error).expect("bind error must carry a source");
        assert!(source.to_string().contains("address in use"));
    }
}
