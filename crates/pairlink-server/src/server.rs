//! Accept loop and per-connection responder.
//!
//! # Connection flow
//!
//! ```text
//! Handshake  public key DER      ──> endpoint key wrapped under it
//!            unusable key        ──> Error(InvalidKey), close
//! Resume     sealed challenge    ──> verdict 0x01, continue
//!            wrong or no key     ──> verdict 0x00, close
//! Exchange   sealed request      ──> sealed response, close
//!            does not decrypt    ──> Error(Decrypt), close
//!            unknown topic       ──> Error(UnsupportedTopic), close
//! ```
//!
//! Out-of-order packages fail the session and close the connection with an
//! Error(Protocol) reply. A payload-level failure on one connection never
//! touches the endpoint key; only the client decides to drop its copy.

use std::{future::Future, sync::Arc};

use pairlink_core::{
    Connection, Environment, HandshakeSession, KeyCache, Metrics, Phase, SystemEnv,
};
use pairlink_crypto::{CipherKey, PublicKey};
use pairlink_proto::{CryptMessage, Data, Message, Package, PackageType, Rejection, ResumeVerdict};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
};
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    error::ServerError,
    handler::{Handler, HandlerContext},
    registry::Registry,
};

struct Shared<E> {
    config: ServerConfig,
    registry: Registry,
    keys: KeyCache,
    shutdown: watch::Sender<bool>,
    env: E,
}

/// Server endpoint.
///
/// Cheap to clone; clones share the registry, the endpoint key and the
/// shutdown signal.
pub struct Server<E: Environment = SystemEnv> {
    shared: Arc<Shared<E>>,
}

impl Server<SystemEnv> {
    /// Server with no handlers.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_env(config, SystemEnv)
    }
}

impl<E: Environment> Server<E> {
    /// Server with no handlers and an explicit environment.
    pub fn with_env(config: ServerConfig, env: E) -> Self {
        let (shutdown, _) = watch::channel(false);
        let shared = Shared {
            config,
            registry: Registry::new(),
            keys: KeyCache::new(),
            shutdown,
            env,
        };
        Self { shared: Arc::new(shared) }
    }

    /// Configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Register `handler` for `topic`, replacing any previous one.
    pub async fn handle(&self, topic: impl Into<String>, handler: impl Handler) {
        let topic = topic.into();
        if self.shared.registry.register(topic.clone(), Arc::new(handler)).await {
            debug!(%topic, "handler replaced");
        }
    }

    /// Handler registry.
    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Endpoint key, once the first handshake generated it.
    pub async fn cached_key(&self) -> Option<CipherKey> {
        self.shared.keys.get().await
    }

    /// Bind the configured address and serve until [`Server::close`].
    pub async fn serve(&self) -> Result<(), ServerError> {
        let listener =
            TcpListener::bind(&self.shared.config.addr).await.map_err(ServerError::Bind)?;
        self.serve_on(listener).await
    }

    /// Serve an already bound listener until [`Server::close`].
    ///
    /// Returns once the listener is closed. Connections already accepted run
    /// to completion on their own tasks.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr().map_err(ServerError::Bind)?;
        let mut shutdown = self.shared.shutdown.subscribe();
        info!(%local, "listening");

        while !*shutdown.borrow_and_update() {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(ServerError::Accept)?;
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.serve_connection(stream).await {
                            warn!(%peer, error = %e, "connection failed");
                        }
                    });
                },
                _ = shutdown.changed() => {},
            }
        }

        info!(%local, "listener closed");
        Ok(())
    }

    /// Stop accepting connections.
    ///
    /// In-flight connections still deliver their responses; their handlers
    /// observe the shutdown through [`HandlerContext::cancelled`].
    pub fn close(&self) {
        self.shared.shutdown.send_replace(true);
    }

    /// Close the server once `parent` completes.
    ///
    /// Ties the server's lifetime to an outer signal such as Ctrl-C or an
    /// embedding application's own shutdown future.
    pub fn cancel_on<F>(&self, parent: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = self.clone();
        tokio::spawn(async move {
            parent.await;
            debug!("parent cancelled");
            server.close();
        });
    }

    /// Whether [`Server::close`] has been called.
    pub fn is_closed(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    async fn serve_connection(&self, stream: TcpStream) -> Result<(), ServerError> {
        let mut conn = Connection::open(stream, &self.shared.config.limits)?;
        let peer = conn.peer_addr();
        let mut metrics = Metrics::new(peer.to_string(), self.shared.env.now());
        let mut session = HandshakeSession::responder();

        loop {
            let package = conn.read_package().await?;

            if let Err(e) = session.on_request(package.kind()) {
                let reason = e.to_string();
                reject(&mut conn, Rejection::Protocol { reason }).await;
                return Err(e.into());
            }

            match package.kind() {
                PackageType::Handshake => {
                    let key = self.answer_handshake(&mut conn, package.payload()).await?;
                    session.establish(key)?;
                    metrics.fix(Phase::Handshake, self.shared.env.now());
                },
                PackageType::Resume => {
                    let Some(key) = self.answer_resume(&mut conn, package.payload()).await? else {
                        debug!(%peer, "resume impossible");
                        return Ok(());
                    };
                    session.establish(key)?;
                    metrics.fix(Phase::Resume, self.shared.env.now());
                },
                PackageType::Exchange => {
                    self.answer_exchange(&mut conn, &mut metrics, package.payload()).await?;
                    session.complete()?;
                    info!("{}", metrics.line());
                    return Ok(());
                },
                // Rejected by the session before reaching here
                PackageType::Error => return Ok(()),
            }
        }
    }

    async fn answer_handshake(
        &self,
        conn: &mut Connection<TcpStream>,
        payload: &[u8],
    ) -> Result<CipherKey, ServerError> {
        let wrapped = match PublicKey::from_der(payload) {
            Ok(public) => {
                let key = self.shared.keys.get_or_generate().await;
                public.wrap_key(&key).map(|wrapped| (key, wrapped))
            },
            Err(e) => Err(e),
        };

        match wrapped {
            Ok((key, wrapped)) => {
                conn.write_package(&Package::new(PackageType::Handshake, wrapped)).await?;
                Ok(key)
            },
            Err(e) => {
                reject(conn, Rejection::InvalidKey).await;
                Err(e.into())
            },
        }
    }

    /// Answer a resume challenge. `None` means the challenge failed and the
    /// connection should close.
    async fn answer_resume(
        &self,
        conn: &mut Connection<TcpStream>,
        payload: &[u8],
    ) -> Result<Option<CipherKey>, ServerError> {
        let key = self
            .shared
            .keys
            .get()
            .await
            .filter(|key| key.decrypt(payload).is_ok());

        conn.write_package(&ResumeVerdict::from_outcome(key.is_some()).to_package()).await?;
        Ok(key)
    }

    async fn answer_exchange(
        &self,
        conn: &mut Connection<TcpStream>,
        metrics: &mut Metrics,
        payload: &[u8],
    ) -> Result<(), ServerError> {
        let Some(key) = self.shared.keys.get().await else {
            reject(conn, Rejection::Decrypt).await;
            return Err(ServerError::NoKey);
        };

        let request = match CryptMessage::from(payload).open(&key) {
            Ok(request) => request,
            Err(e) => {
                reject(conn, Rejection::Decrypt).await;
                return Err(e.into());
            },
        };
        let topic = request.topic;
        metrics.set_topic(topic.as_str());
        metrics.fix(Phase::Read, self.shared.env.now());

        let Some(handler) = self.shared.registry.get(&topic).await else {
            reject(conn, Rejection::UnsupportedTopic { topic: topic.clone() }).await;
            return Err(ServerError::UnsupportedTopic(topic));
        };

        let peer = conn.peer_addr();
        let ctx = HandlerContext::new(
            peer,
            tokio::time::Instant::now() + self.shared.config.limits.timeouts.handle,
        )
        .with_shutdown(self.shared.shutdown.subscribe());
        let request = Data::from_bytes(request.content).with_addr(peer);
        let reply = match handler.handle(ctx.clone(), request).await {
            Ok(response) => Message::reply(topic.as_str(), response.into_bytes()),
            Err(e) => {
                debug!(%topic, error = %e, "handler failed");
                Message::failure(topic.as_str(), e.message())
            },
        };
        if ctx.is_expired() {
            warn!(%topic, %peer, "handler overran its deadline");
        } else if ctx.is_shutting_down() {
            debug!(%topic, %peer, "handler finished during shutdown");
        }
        metrics.fix(Phase::Handle, self.shared.env.now());

        let sealed = reply.seal(&key)?;
        conn.write_package(&Package::new(PackageType::Exchange, sealed.into_bytes())).await?;
        metrics.fix(Phase::Write, self.shared.env.now());
        Ok(())
    }
}

impl<E: Environment> Clone for Server<E> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<E: Environment> std::fmt::Debug for Server<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("config", &self.shared.config).finish_non_exhaustive()
    }
}

/// Best-effort Error reply; the connection closes either way.
async fn reject(conn: &mut Connection<TcpStream>, rejection: Rejection) {
    let sent = match rejection.to_package() {
        Ok(package) => conn.write_package(&package).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match sent {
        Ok(()) => warn!(peer = %conn.peer_addr(), %rejection, "rejected"),
        Err(e) => debug!(peer = %conn.peer_addr(), error = %e, "rejection not delivered"),
    }
}
