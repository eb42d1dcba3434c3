//! Telnet session: one connection, login handshake, command execution.
//!
//! A [`TelnetSession`] only exists in the authenticated state: the sole
//! constructor is [`TelnetSession::login`], which drives the handshake
//! state machine under a single timer and hands back a ready session.
//! Anything that can execute a command has, by construction, already
//! logged in.

use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, info};
use regex::Regex;
use tokio::time::Instant;

use crate::channel::login::{advance, LoginAction, LoginPhase};
use crate::channel::PromptBuffer;
use crate::error::SessionError;
use crate::transport::{Credentials, TelnetConfig, TelnetStream};

/// Probe command for the post-login identification read.
const IDENTIFY_PROBE: &str = "cat /tmp/app_version";

/// Remote answer when the identification file does not exist.
const NOT_FOUND: &str = "No such file";

static DEVICE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("device id pattern"));

/// How one login attempt ended, before retry policy is applied.
enum AttemptError {
    /// Do not retry: the device never spoke.
    Permanent(SessionError),
    /// Bytes arrived but no prompt matched; a retry may succeed.
    Transient,
}

/// An authenticated Telnet session with one device.
pub struct TelnetSession {
    host: Ipv4Addr,
    stream: Option<TelnetStream>,
    buffer: PromptBuffer,
    config: TelnetConfig,
}

impl TelnetSession {
    /// Connect to `host` and drive the full login handshake.
    ///
    /// One timer (`config.timeout`) governs the whole handshake. If it
    /// fires with zero bytes ever received the host is treated as
    /// [`SessionError::Unreachable`] and never retried. If bytes were
    /// received but no prompt matched, the attempt is transient: the
    /// socket is torn down, and after `config.retry_backoff` the
    /// handshake restarts from a fresh connection with a fresh buffer,
    /// up to `config.retries` extra attempts.
    pub async fn login(
        host: Ipv4Addr,
        credentials: &Credentials,
        config: TelnetConfig,
    ) -> Result<Self, SessionError> {
        let attempts = config.retries + 1;
        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!("retrying login to {host} (attempt {attempt}/{attempts})");
                tokio::time::sleep(config.retry_backoff).await;
            }
            match Self::attempt(host, credentials, &config).await {
                Ok(session) => return Ok(session),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient) => continue,
            }
        }
        Err(SessionError::HandshakeFailed { host, attempts })
    }

    /// One full handshake on a fresh connection.
    async fn attempt(
        host: Ipv4Addr,
        credentials: &Credentials,
        config: &TelnetConfig,
    ) -> Result<Self, AttemptError> {
        // The connect phase gets half the handshake budget, leaving the
        // rest for the prompt exchange.
        let mut stream = TelnetStream::connect(host, config.port, config.timeout / 2)
            .await
            .map_err(AttemptError::Permanent)?;

        let mut buffer = PromptBuffer::default();
        let mut phase = LoginPhase::AwaitingUsername;
        let mut had_response = false;
        let deadline = Instant::now() + config.timeout;
        let mut chunk = [0u8; 1024];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Self::expired(host, had_response));
            }

            let read = tokio::time::timeout(remaining, stream.read_chunk(&mut chunk)).await;
            let n = match read {
                Err(_) => return Err(Self::expired(host, had_response)),
                Ok(Ok(0)) => {
                    debug!("{host} closed the connection during the handshake");
                    return Err(Self::expired(host, had_response));
                }
                Ok(Err(e)) => {
                    debug!("read error during handshake with {host}: {e}");
                    return Err(Self::expired(host, had_response));
                }
                Ok(Ok(n)) => n,
            };

            had_response = true;
            buffer.extend(&chunk[..n]);

            // Prompts may arrive coalesced, so keep stepping the automaton
            // until it has nothing left to do with the accumulated text.
            loop {
                let (next, action) = advance(phase, &buffer.text());
                phase = next;
                match action {
                    Some(LoginAction::SendUsername) => {
                        debug!("{host}: username prompt, sending username");
                        Self::write_or_transient(&mut stream, credentials.username()).await?;
                    }
                    Some(LoginAction::SendPassword) => {
                        debug!("{host}: password prompt, sending password");
                        Self::write_or_transient(&mut stream, credentials.password()).await?;
                    }
                    Some(LoginAction::Complete) => {
                        info!("login to {host} succeeded");
                        return Ok(Self {
                            host,
                            stream: Some(stream),
                            buffer,
                            config: config.clone(),
                        });
                    }
                    None => break,
                }
            }
        }
    }

    async fn write_or_transient(stream: &mut TelnetStream, line: &str) -> Result<(), AttemptError> {
        // A write failure this deep means the device spoke and then went
        // away; that is a transient condition, not unreachability.
        stream.send_line(line).await.map_err(|e| {
            debug!("write during handshake with {} failed: {e}", stream.host());
            AttemptError::Transient
        })
    }

    fn expired(host: Ipv4Addr, had_response: bool) -> AttemptError {
        if had_response {
            AttemptError::Transient
        } else {
            AttemptError::Permanent(SessionError::Unreachable { host })
        }
    }

    /// The device this session is logged into.
    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    /// Execute one command and collect output until a shell-prompt marker
    /// appears or `timeout` fires.
    ///
    /// Returns `(output, completed)`. A timeout is not an error: the
    /// partial buffer is returned with `completed == false` so a stuck
    /// command never deadlocks its caller.
    pub async fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<(String, bool), SessionError> {
        let Self { stream, buffer, .. } = self;
        let stream = stream.as_mut().ok_or(SessionError::Closed)?;

        buffer.clear();
        debug!("{}: executing `{command}`", stream.host());
        stream.send_line(command).await?;

        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 2048];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok((buffer.take_text(), false));
            }

            match tokio::time::timeout(remaining, stream.read_chunk(&mut chunk)).await {
                Err(_) => return Ok((buffer.take_text(), false)),
                Ok(Ok(0)) => return Err(SessionError::Closed),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(n)) => {
                    buffer.extend(&chunk[..n]);
                    if buffer.tail_has_marker() {
                        return Ok((buffer.take_text(), true));
                    }
                }
            }
        }
    }

    /// Read the device identifier.
    ///
    /// Runs the fixed identification probe under its own timeout and
    /// extracts the first plausible identifier token. Timeouts, transport
    /// errors and a missing file all resolve to `None`; identification
    /// never fails a login that already succeeded.
    pub async fn identify(&mut self) -> Option<String> {
        let timeout = self.config.identify_timeout;
        match self.execute(IDENTIFY_PROBE, timeout).await {
            Ok((output, _)) => extract_device_id(&output),
            Err(e) => {
                debug!("identification read on {} failed: {e}", self.host);
                None
            }
        }
    }

    /// Tear the session down. Safe to call more than once; only the first
    /// call touches the socket.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await;
            debug!("session with {} closed", self.host);
        }
    }
}

fn extract_device_id(output: &str) -> Option<String> {
    if output.contains(NOT_FOUND) {
        return None;
    }
    output
        .lines()
        .skip(1) // first line echoes the probe command
        .map(str::trim)
        .find(|line| DEVICE_ID.is_match(line))
        .map(str::to_string)
}
