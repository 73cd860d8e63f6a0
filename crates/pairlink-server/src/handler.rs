//! Topic handlers.
//!
//! A handler receives the request payload and a [`HandlerContext`] carrying
//! the caller's address, an advisory deadline and the server's shutdown
//! signal. The server never preempts a handler: one that overruns its deadline
//! or outlives [`crate::Server::close`] still gets its response delivered if
//! the connection deadline allows. Long-running handlers race their work
//! against [`HandlerContext::cancelled`].
//!
//! Any `async` closure of the right shape is a handler:
//!
//! ```ignore
//! server.handle("echo", |_ctx: HandlerContext, request: Data| async move {
//!     Ok::<_, HandlerError>(request)
//! }).await;
//! ```

use std::{future::Future, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use pairlink_proto::{Data, ProtocolError};
use thiserror::Error;
use tokio::{sync::watch, time::Instant};

/// Per-request context handed to handlers.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    remote: SocketAddr,
    deadline: Instant,
    shutdown: watch::Receiver<bool>,
}

impl HandlerContext {
    /// Context for a request from `remote` due by `deadline`, detached from
    /// any server shutdown.
    pub fn new(remote: SocketAddr, deadline: Instant) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self { remote, deadline, shutdown }
    }

    /// Follow `shutdown`: the context counts as cancelled once it reads `true`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Caller's address.
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Advisory deadline.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Resolves once the deadline passes. Handlers that want to honor the
    /// deadline race their work against this.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }

    /// Whether the server is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once the deadline passes or the server shuts down, whichever
    /// comes first.
    pub async fn cancelled(&self) {
        let mut shutdown = self.shutdown.clone();
        let closing = async move {
            let detached = shutdown.wait_for(|closing| *closing).await.is_err();
            if detached {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = tokio::time::sleep_until(self.deadline) => {},
            () = closing => {},
        }
    }
}

/// Error a handler reports back to the caller.
///
/// Only the message crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Message sent to the caller.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<ProtocolError> for HandlerError {
    fn from(e: ProtocolError) -> Self {
        Self::new(e.to_string())
    }
}

/// Request handler for one topic.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Produce the response for `request`.
    async fn handle(&self, ctx: HandlerContext, request: Data) -> Result<Data, HandlerError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext, Data) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Data, HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: HandlerContext, request: Data) -> Result<Data, HandlerError> {
        (self)(ctx, request).await
    }
}
