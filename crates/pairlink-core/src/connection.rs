//! Framed package I/O over one stream.
//!
//! A [`Connection`] arms a single deadline when it is opened. Every read and
//! write races that same deadline, so a slow peer cannot stretch the exchange
//! by trickling bytes across many calls.
//!
//! Reads parse the 5-byte header first and reject unknown types and oversized
//! payloads before allocating the payload buffer.

use std::{net::SocketAddr, time::Duration};

use bytes::BytesMut;
use pairlink_proto::{Package, PackageHeader};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::{Instant, timeout_at},
};
use tracing::trace;

use crate::{config::Limits, error::ConnectionError};

/// Deadline-bound, length-bounded package stream.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    deadline: Instant,
    body_limit: usize,
}

impl Connection<TcpStream> {
    /// Prepare an accepted or dialed TCP stream.
    ///
    /// # Errors
    ///
    /// `Preset` if the socket cannot be configured or has no peer address.
    pub fn open(stream: TcpStream, limits: &Limits) -> Result<Self, ConnectionError> {
        stream.set_nodelay(true).map_err(ConnectionError::Preset)?;
        let peer = stream.peer_addr().map_err(ConnectionError::Preset)?;
        Ok(Self::new(stream, peer, limits.timeouts.connection, limits.body))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `stream`, arming the deadline `timeout` from now.
    pub fn new(stream: S, peer: SocketAddr, timeout: Duration, body_limit: usize) -> Self {
        Self { stream, peer, deadline: Instant::now() + timeout, body_limit }
    }

    /// Remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Instant after which all I/O fails with `Timeout`.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Read one package.
    ///
    /// # Errors
    ///
    /// - `Timeout` once the deadline passes
    /// - `Closed` if the peer hangs up mid-package
    /// - `Protocol` for unknown types or payloads over the limit
    pub async fn read_package(&mut self) -> Result<Package, ConnectionError> {
        timeout_at(self.deadline, self.read_inner()).await.map_err(|_| ConnectionError::Timeout)?
    }

    /// Write one package and flush.
    pub async fn write_package(&mut self, package: &Package) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::with_capacity(package.encoded_len());
        package.encode(&mut buf);

        trace!(kind = ?package.kind(), size = package.payload().len(), peer = %self.peer, "write package");

        let stream = &mut self.stream;
        timeout_at(self.deadline, async move {
            stream.write_all(&buf).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| ConnectionError::Timeout)?
        .map_err(ConnectionError::Io)
    }

    async fn read_inner(&mut self) -> Result<Package, ConnectionError> {
        let mut header_buf = [0u8; PackageHeader::SIZE];
        self.stream.read_exact(&mut header_buf).await.map_err(ConnectionError::from_read)?;

        let header = PackageHeader::from_bytes(&header_buf)?;
        let kind = header.validate(self.body_limit)?;

        let mut payload = vec![0u8; header.payload_size()];
        self.stream.read_exact(&mut payload).await.map_err(ConnectionError::from_read)?;

        trace!(?kind, size = payload.len(), peer = %self.peer, "read package");
        Ok(Package::new(kind, payload))
    }
}
