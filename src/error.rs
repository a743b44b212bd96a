use thiserror::Error;

// ------------------------------------------------------------
// Error taxonomy
// ------------------------------------------------------------
//
// Two layers of failure exist in this exporter:
//
// - SourceError:  the Plex API boundary failed (transport,
//                 authentication, or response shape)
// - CollectError: a sub-collector could not produce a usable
//                 update for the current cycle
//
// The collection cycle contains CollectErrors per collector;
// only a lost connection escalates to the supervisory loop,
// which rebuilds the whole exporter.
//

/// Failures raised by the Plex API boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The Plex token was rejected.
    ///
    /// Fatal at startup. The server will keep rejecting the same
    /// token, so there is no point in retrying.
    #[error("plex token was rejected by the server")]
    Unauthorized,

    /// The server could not be reached at the transport level.
    ///
    /// Fatal at startup; during the run phase this is the one
    /// error class treated as transient (reconnect + retry).
    #[error("plex server is unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-success HTTP status other
    /// than 401.
    #[error("plex server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The response body did not match the expected shape.
    #[error("unexpected response shape: {0}")]
    Protocol(String),
}

/// Failures raised inside a sub-collector.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The batch item-resolve returned a different number of items
    /// than history entries were requested for.
    ///
    /// Pairing is positional, so a mismatch would silently attribute
    /// durations to the wrong users. Aborting this collector's update
    /// for the cycle is preferred over mis-pairing.
    #[error("history/item alignment mismatch: {entries} entries, {items} resolved items")]
    Misaligned { entries: usize, items: usize },
}

impl CollectError {
    /// True for errors that mean the connection itself is gone and
    /// the supervisory loop should rebuild the exporter, rather than
    /// the cycle skipping one collector.
    pub fn is_transient(&self) -> bool {
        matches!(self, CollectError::Source(SourceError::Unreachable(_)))
    }
}
