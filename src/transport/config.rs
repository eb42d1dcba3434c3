//! Telnet connection configuration.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// The credential pair the managed screens ship with.
const DEFAULT_USERNAME: &str = "root";
const DEFAULT_PASSWORD: &str = "ya!2dkwy7-934^";

/// Telnet login credentials.
///
/// The password is held as a [`SecretString`] so it stays out of `Debug`
/// output and logs.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(self.username.clone(), self.password.expose_secret())
    }
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The username, sent as a literal CRLF-terminated line.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Expose the password for writing onto the wire.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

/// Telnet session configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Service port (default: 23).
    pub port: u16,

    /// One timer for the whole login handshake, from TCP connect through
    /// authenticated shell prompt.
    pub timeout: Duration,

    /// How many transient handshake failures to retry. Each retry is a
    /// fresh connection with a fresh buffer.
    pub retries: u32,

    /// Pause between handshake retries.
    pub retry_backoff: Duration,

    /// Timeout for the post-login identification read.
    pub identify_timeout: Duration,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            port: 23,
            timeout: Duration::from_secs(5),
            retries: 3,
            retry_backoff: Duration::from_millis(500),
            identify_timeout: Duration::from_secs(3),
        }
    }
}

impl TelnetConfig {
    /// Override the service port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the handshake timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry bound.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}
