//! Pure login-handshake state machine.
//!
//! The transition function works over the full accumulated session text
//! and owns no I/O, so the whole handshake can be exercised in tests by
//! feeding synthetic byte sequences. The session layer performs the
//! [`LoginAction`]s it emits.

use super::patterns;

/// Phase of a login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    /// Connected, waiting for the device to ask for a username.
    AwaitingUsername,

    /// Username sent, waiting for the password prompt.
    AwaitingPassword,

    /// Password sent, waiting for evidence of an authenticated shell.
    AwaitingShell,

    /// Logged in; the device shell is ready for commands.
    Authenticated,
}

/// Side effect the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    /// Write the username as a CRLF-terminated line.
    SendUsername,

    /// Write the password as a CRLF-terminated line.
    SendPassword,

    /// The handshake is done; cancel the login timer.
    Complete,
}

/// Advance the handshake one step against the accumulated session text.
///
/// Returns the (possibly unchanged) phase and the action it requires.
/// Each credential is sent at most once: a phase that has already fired
/// its action is left behind, so re-testing the same text is harmless.
pub fn advance(phase: LoginPhase, text: &str) -> (LoginPhase, Option<LoginAction>) {
    match phase {
        LoginPhase::AwaitingUsername if patterns::has_username_prompt(text) => {
            (LoginPhase::AwaitingPassword, Some(LoginAction::SendUsername))
        }
        LoginPhase::AwaitingPassword if patterns::has_password_prompt(text) => {
            (LoginPhase::AwaitingShell, Some(LoginAction::SendPassword))
        }
        LoginPhase::AwaitingShell if patterns::has_shell_prompt(text) => {
            (LoginPhase::Authenticated, Some(LoginAction::Complete))
        }
        _ => (phase, None),
    }
}
