//! Hub error types.

use thiserror::Error;

/// Errors surfaced by the hub to connection handlers.
///
/// I/O errors on individual connections are deliberately absent: a failed
/// read or write tears down only the peer that experienced it and is never
/// propagated as a hub-level error.
#[derive(Debug, Error)]
pub enum HubError {
    /// The relay loop is no longer running; no further events can be
    /// submitted.
    #[error("relay channel closed")]
    RelayClosed,
    /// The hub refused a registration because the connection limit was
    /// reached.
    #[error("connection limit reached ({limit})")]
    AtCapacity {
        /// The configured connection limit.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_closed_display() {
        let err = HubError::RelayClosed;
        assert_eq!(err.to_string(), "relay channel closed");
    }

    #[test]
    fn at_capacity_display_includes_limit() {
        let err = HubError::AtCapacity { limit: 50 };
        assert_eq!(err.to_string(), "connection limit reached (50)");
    }

    #[test]
    fn errors_are_debuggable() {
        let err = HubError::AtCapacity { limit: 1 };
        assert!(format!("{err:?}").contains("AtCapacity"));
    }
}
