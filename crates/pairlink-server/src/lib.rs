//! Pairlink server.
//!
//! Accepts TCP connections, runs one protocol session per connection on its
//! own task, and dispatches each decrypted request to the handler registered
//! for its topic.
//!
//! ```text
//! accept ──spawn──> open ─> [Handshake] ─> [Resume] ─> Exchange ─> close
//!                                                        │
//!                                          registry[topic].handle()
//! ```
//!
//! Tasks share the handler registry and the endpoint key, both behind
//! reader/writer locks, plus the shutdown signal every handler can observe
//! through its [`HandlerContext`].

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use handler::{Handler, HandlerContext, HandlerError};
pub use registry::Registry;
pub use server::Server;
