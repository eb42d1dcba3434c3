//! Ordered command execution over an authenticated session.
//!
//! The sequencer is strictly serial: one command's completion (prompt or
//! timeout) gates the next, and nothing is pipelined. A per-command
//! timeout keeps the partial output and moves on; a whole-sequence
//! watchdog is the only thing allowed to abort the run.

use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::error::{SequenceError, SessionError};
use crate::session::TelnetSession;

/// Default per-command timeout.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// The watchdog never drops below this, however short the script.
const WATCHDOG_FLOOR: Duration = Duration::from_secs(10);

/// One shell command with its execution policy.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command text, written as a literal CRLF-terminated line.
    pub text: String,

    /// How long to wait for a shell prompt after sending.
    pub timeout: Duration,

    /// Pause after completion before the next command is sent. Used to
    /// let a remote service restart.
    pub delay: Duration,
}

impl CommandSpec {
    /// Create a command with the default timeout and no delay.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            delay: Duration::ZERO,
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause after this command completes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Result of one command in a sequence.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// The command that was sent.
    pub command: String,

    /// Accumulated output with the command echo and trailing prompt
    /// removed; partial if `completed` is false.
    pub output: String,

    /// False when the per-command timeout fired before a shell prompt
    /// was observed.
    pub completed: bool,
}

impl CommandResult {
    /// Whether the output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.output.contains(pattern)
    }
}

/// Drives an authenticated session through an ordered command script.
pub struct CommandSequencer;

impl CommandSequencer {
    /// Run `commands` in order over `session`.
    ///
    /// Takes the session by value; it is torn down on every exit path,
    /// success or failure. Individual command timeouts are absorbed into
    /// their [`CommandResult`]; only a session failure or the global
    /// watchdog aborts the sequence.
    pub async fn run(
        mut session: TelnetSession,
        commands: &[CommandSpec],
    ) -> Result<Vec<CommandResult>, SequenceError> {
        let budget = Self::watchdog_budget(commands);
        let host = session.host();
        debug!("running {} command(s) on {host}, watchdog {budget:?}", commands.len());

        let outcome = tokio::time::timeout(budget, Self::drive(&mut session, commands)).await;
        session.close().await;

        match outcome {
            Ok(results) => results.map_err(SequenceError::from),
            Err(_) => {
                warn!("sequence on {host} hit the watchdog after {budget:?}");
                Err(SequenceError::WatchdogExpired { budget })
            }
        }
    }

    async fn drive(
        session: &mut TelnetSession,
        commands: &[CommandSpec],
    ) -> Result<Vec<CommandResult>, SessionError> {
        let mut results = Vec::with_capacity(commands.len());
        for spec in commands {
            let (output, completed) = session.execute(&spec.text, spec.timeout).await?;
            if !completed {
                debug!(
                    "`{}` on {} timed out after {:?}, keeping partial output",
                    spec.text,
                    session.host(),
                    spec.timeout
                );
            }
            results.push(CommandResult {
                command: spec.text.clone(),
                output: normalize_output(&spec.text, &output),
                completed,
            });
            if !spec.delay.is_zero() {
                tokio::time::sleep(spec.delay).await;
            }
        }
        Ok(results)
    }

    /// Twice the sum of the configured per-command budgets, floored so a
    /// short script still gets a workable window.
    fn watchdog_budget(commands: &[CommandSpec]) -> Duration {
        let configured: Duration = commands.iter().map(|c| c.timeout + c.delay).sum();
        (configured * 2).max(WATCHDOG_FLOOR)
    }
}

/// Strip the echoed command line and the trailing prompt line, leaving
/// only what the command itself printed. Verification logic must never
/// match against its own command echo.
fn normalize_output(command: &str, raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    if let Some(first) = lines.first() {
        if first.trim() == command.trim() {
            lines.remove(0);
        }
    }

    if let Some(last) = lines.last() {
        let trimmed = last.trim();
        let prompt_only = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_whitespace() || matches!(c, '#' | '$' | '>' | '~'));
        if prompt_only {
            lines.pop();
        }
    }

    lines.join("\n")
}
