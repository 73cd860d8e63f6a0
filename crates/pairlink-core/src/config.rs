//! Limits and timeouts shared by both endpoints.

use std::time::Duration;

/// Default deadline for one connection's whole exchange
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(250);

/// Default advisory deadline for one handler call
pub const DEFAULT_HANDLE_TIMEOUT: Duration = Duration::from_millis(250);

/// Default maximum payload a receiver accepts
pub const DEFAULT_BODY_LIMIT: usize = 1024;

/// Time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Single deadline covering handshake, resume and exchange on one
    /// connection. Armed once at open, never reset.
    pub connection: Duration,
    /// Advisory deadline handed to handlers. The transport never preempts a
    /// handler that overruns it.
    pub handle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { connection: DEFAULT_CONNECTION_TIMEOUT, handle: DEFAULT_HANDLE_TIMEOUT }
    }
}

/// Size and time limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size accepted by the reader (0 disables the check)
    pub body: usize,
    /// Time bounds
    pub timeouts: Timeouts,
}

impl Default for Limits {
    fn default() -> Self {
        Self { body: DEFAULT_BODY_LIMIT, timeouts: Timeouts::default() }
    }
}

impl Limits {
    /// Override the body limit.
    #[must_use]
    pub fn with_body(mut self, body: usize) -> Self {
        self.body = body;
        self
    }

    /// Override the connection deadline.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection = timeout;
        self
    }

    /// Override the handler deadline.
    #[must_use]
    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.handle = timeout;
        self
    }
}
