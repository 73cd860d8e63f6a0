//! Retrying request client.
//!
//! # Attempt flow
//!
//! ```text
//! sleep(attempt * base_delay)
//!   dial (connection timeout) ──fail──> Connection error, stop
//!   open (nodelay, peer addr) ──fail──> PresetConnection error, stop
//!   no cached key?  Handshake: public key ──> wrapped key
//!   cached key?     Resume:    sealed challenge ──> verdict
//!   Exchange:       sealed request ──> sealed response | Error package
//! ```
//!
//! Every attempt uses a fresh connection and a fresh [`HandshakeSession`].
//! The key cache is written only after a handshake reply unwraps, and cleared
//! (compare-and-clear, so a concurrent call's newer key survives) when the
//! server refuses it.

use std::{io, time::Duration};

use pairlink_core::{
    Connection, Environment, HandshakeSession, KeyCache, Limits, Metrics, Phase, SessionError,
    SystemEnv,
};
use pairlink_crypto::{CipherKey, KeyPair};
use pairlink_proto::{
    CryptMessage, Data, Message, Package, PackageType, Rejection, ResumeVerdict,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::{error::ClientError, retry::RetryPolicy};

/// Size of the random challenge sealed under the cached key on resume
pub const CHALLENGE_SIZE: usize = 16;

/// Client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Payload limit and connection deadline
    pub limits: Limits,
    /// Attempts and spacing
    pub retry: RetryPolicy,
    /// Test the cached key before exchanging under it
    pub resume: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { limits: Limits::default(), retry: RetryPolicy::default(), resume: true }
    }
}

impl ClientConfig {
    /// Override limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Override the connection deadline.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.limits = self.limits.with_connection_timeout(timeout);
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable or disable the resume challenge.
    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
}

/// Client endpoint bound to one server address.
///
/// Shareable across tasks by reference; concurrent calls share the key cache.
#[derive(Debug)]
pub struct Client<E: Environment = SystemEnv> {
    addr: String,
    config: ClientConfig,
    keypair: KeyPair,
    keys: KeyCache,
    env: E,
}

impl Client<SystemEnv> {
    /// Client for `addr` (`host:port`), generating its RSA key pair.
    ///
    /// # Errors
    ///
    /// `Setup` if key generation fails.
    pub fn new(addr: impl Into<String>, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_env(addr, config, SystemEnv)
    }
}

impl<E: Environment> Client<E> {
    /// Client with an explicit environment.
    pub fn with_env(
        addr: impl Into<String>,
        config: ClientConfig,
        env: E,
    ) -> Result<Self, ClientError> {
        let keypair = KeyPair::generate().map_err(ClientError::Setup)?;
        Ok(Self { addr: addr.into(), config, keypair, keys: KeyCache::new(), env })
    }

    /// Server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Currently cached session key.
    pub async fn cached_key(&self) -> Option<CipherKey> {
        self.keys.get().await
    }

    /// Send `request` on `topic` and return the handler's response.
    ///
    /// # Errors
    ///
    /// - `Connection`/`PresetConnection` as soon as the server is unreachable
    /// - `Remote` or an unsupported-topic `Rejected` as soon as the server
    ///   answers with them
    /// - otherwise the last attempt's error once all attempts fail
    pub async fn send(&self, topic: &str, request: Data) -> Result<Data, ClientError> {
        let mut last = ClientError::NoAttempts;

        for (attempt, delay) in self.config.retry.schedule().enumerate() {
            self.env.sleep(delay).await;

            match self.attempt(topic, request.bytes()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    error!(topic, attempt, error = %e, "attempt failed");
                    last = e;
                },
                Err(e) => {
                    warn!(topic, attempt, error = %e, "giving up");
                    return Err(e);
                },
            }
        }

        Err(last)
    }

    /// Send a CBOR-encoded value and decode the CBOR response.
    pub async fn send_value<T, R>(&self, topic: &str, value: &T) -> Result<R, ClientError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(topic, Data::from_value(value)?).await?;
        Ok(response.value()?)
    }

    async fn attempt(&self, topic: &str, content: &[u8]) -> Result<Data, ClientError> {
        let mut conn = self.dial().await?;
        let peer = conn.peer_addr();

        let mut metrics = Metrics::new(peer.to_string(), self.env.now());
        metrics.set_topic(topic);

        let mut session = match self.keys.get().await {
            Some(key) => HandshakeSession::resuming(key),
            None => HandshakeSession::initiator(),
        };

        if session.needs_handshake() {
            self.handshake(&mut conn, &mut session).await?;
            metrics.fix(Phase::Handshake, self.env.now());
        } else if self.config.resume {
            self.resume(&mut conn, &mut session).await?;
            metrics.fix(Phase::Resume, self.env.now());
        }

        let key = session.key().cloned().ok_or(SessionError::MissingKey(session.state()))?;

        session.on_request(PackageType::Exchange)?;
        let sealed = Message::request(topic, content).seal(&key)?;
        conn.write_package(&Package::new(PackageType::Exchange, sealed.into_bytes())).await?;
        metrics.fix(Phase::Write, self.env.now());

        let reply = conn.read_package().await?;
        session.on_reply(reply.kind())?;

        if reply.kind() == PackageType::Error {
            session.fail();
            let rejection = Rejection::from_payload(reply.payload())?;
            if rejection == Rejection::Decrypt {
                self.keys.invalidate_if(&key).await;
            }
            return Err(ClientError::Rejected(rejection));
        }

        let response = match CryptMessage::from(reply.payload()).open(&key) {
            Ok(message) => message,
            Err(e) => {
                session.fail();
                self.keys.invalidate_if(&key).await;
                return Err(e.into());
            },
        };
        metrics.fix(Phase::Read, self.env.now());
        session.complete()?;

        info!("{}", metrics.line());

        if let Some(reason) = response.error {
            return Err(ClientError::Remote(reason));
        }
        Ok(Data::from_bytes(response.content).with_addr(peer))
    }

    async fn dial(&self) -> Result<Connection<TcpStream>, ClientError> {
        let timeout = self.config.limits.timeouts.connection;
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ClientError::Connection(e)),
            Err(_) => {
                return Err(ClientError::Connection(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "dial timed out",
                )));
            },
        };

        Ok(Connection::open(stream, &self.config.limits)?)
    }

    async fn handshake(
        &self,
        conn: &mut Connection<TcpStream>,
        session: &mut HandshakeSession,
    ) -> Result<(), ClientError> {
        session.on_request(PackageType::Handshake)?;
        let public = self.keypair.public_key().to_der()?;
        conn.write_package(&Package::new(PackageType::Handshake, public)).await?;

        let reply = conn.read_package().await?;
        session.on_reply(reply.kind())?;
        if reply.kind() == PackageType::Error {
            session.fail();
            return Err(ClientError::Rejected(Rejection::from_payload(reply.payload())?));
        }

        let key = match self.keypair.private_key().unwrap_key(reply.payload()) {
            Ok(key) => key,
            Err(e) => {
                session.fail();
                return Err(e.into());
            },
        };
        session.establish(key.clone())?;
        self.keys.store(key).await;

        debug!(peer = %conn.peer_addr(), "handshake complete");
        Ok(())
    }

    async fn resume(
        &self,
        conn: &mut Connection<TcpStream>,
        session: &mut HandshakeSession,
    ) -> Result<(), ClientError> {
        session.on_request(PackageType::Resume)?;
        let key = session.key().cloned().ok_or(SessionError::MissingKey(session.state()))?;

        let mut challenge = [0u8; CHALLENGE_SIZE];
        self.env.random_bytes(&mut challenge);
        conn.write_package(&Package::new(PackageType::Resume, key.encrypt(&challenge)?)).await?;

        let reply = conn.read_package().await?;
        session.on_reply(reply.kind())?;
        if reply.kind() == PackageType::Error {
            session.fail();
            return Err(ClientError::Rejected(Rejection::from_payload(reply.payload())?));
        }

        match ResumeVerdict::from_payload(reply.payload())? {
            ResumeVerdict::Possible => {
                session.establish(key)?;
                debug!(peer = %conn.peer_addr(), "session resumed");
                Ok(())
            },
            ResumeVerdict::Impossible => {
                session.fail();
                self.keys.invalidate_if(&key).await;
                Err(ClientError::CipherKey)
            },
        }
    }
}
