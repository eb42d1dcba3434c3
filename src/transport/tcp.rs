//! TCP stream wrapper for the Telnet service port.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::SessionError;

/// One TCP connection to a device's Telnet port.
///
/// This is deliberately thin: connect with a deadline, read raw chunks,
/// write CRLF-terminated lines. Prompt interpretation lives in the channel
/// layer, login policy in the session layer.
pub struct TelnetStream {
    stream: TcpStream,
    host: Ipv4Addr,
}

impl TelnetStream {
    /// Dial `host:port` with a connect deadline.
    ///
    /// Any connect-phase failure (timeout, refusal, unroutable) maps to
    /// [`SessionError::Unreachable`]: the device never spoke, so there is
    /// nothing to retry.
    pub async fn connect(
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let addr = SocketAddr::from((host, port));
        debug!("connecting to {addr}");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SessionError::Unreachable { host })?
            .map_err(|e| {
                debug!("connect to {addr} failed: {e}");
                SessionError::Unreachable { host }
            })?;

        // Prompt fragments should not sit in Nagle buffers.
        stream.set_nodelay(true).ok();

        Ok(Self { stream, host })
    }

    /// The peer address this stream is connected to.
    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    /// Write a literal line terminated by CRLF and flush it.
    pub async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await
    }

    /// Read the next chunk of inbound bytes. `Ok(0)` means the peer closed.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).await
    }

    /// Shut down the write half; the socket itself closes on drop.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("shutdown of {} returned: {e}", self.host);
        }
    }
}
