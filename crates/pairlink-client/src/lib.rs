//! Pairlink client.
//!
//! One logical call is one [`Client::send`]: it dials a fresh TCP connection,
//! establishes or resumes the session key, performs a single encrypted
//! exchange and closes the connection. Failed attempts are retried with a
//! linearly growing delay; unreachable peers are not.
//!
//! The negotiated key is cached on the client and reused by later calls until
//! the server stops accepting it.

#![forbid(unsafe_code)]

pub mod client;
pub mod error;
pub mod retry;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use retry::{RetryPolicy, delay_for};
