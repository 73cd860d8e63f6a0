//! Pairlink protocol core
//!
//! Everything both endpoints share: the per-connection protocol state
//! machine, deadline-bound package I/O, the cached session key, timing
//! metrics, and the configuration knobs that bound all of it.
//!
//! # Architecture
//!
//! [`HandshakeSession`] is a pure state machine: it validates which package may
//! come next and tracks the session key, but performs no I/O. The client and
//! server crates drive it over a [`Connection`], which owns the stream and the
//! single deadline that covers the whole exchange.
//!
//! Time and randomness that affect behavior (retry sleeps, resume challenges) go
//! through [`Environment`] so tests can substitute a deterministic one.
//!
//! # Components
//!
//! - [`connection`]: framed, length-bounded, deadline-bound package I/O
//! - [`session`]: handshake/resume/exchange state machine
//! - [`key_cache`]: lock-guarded endpoint key
//! - [`metrics`]: per-exchange phase timings
//! - [`config`]: limits and timeouts
//! - [`mod@env`]: environment abstraction (time, sleep, RNG)
//! - [`error`]: connection and session error types

pub mod config;
pub mod connection;
pub mod env;
pub mod error;
pub mod key_cache;
pub mod metrics;
pub mod session;

pub use config::{Limits, Timeouts};
pub use connection::Connection;
pub use env::{Environment, SystemEnv};
pub use error::{ConnectionError, SessionError};
pub use key_cache::KeyCache;
pub use metrics::{Metrics, Phase};
pub use session::{HandshakeSession, Role, SessionState};
