//! Prompt vocabulary for the managed screens.
//!
//! Everything here is heuristic by design: the devices run a plain busybox
//! shell over Telnet, so "ready for input" is signalled by nothing more
//! than a prompt character, and login/password prompts are recognized by
//! substring. All text tests are case-insensitive.

use memchr::memchr3;

/// Substrings that announce the username prompt.
const USERNAME_PROMPTS: [&str; 2] = ["login:", "username:"];

/// Substring that announces the password prompt.
const PASSWORD_PROMPT: &str = "password:";

/// Post-login banner fragments some firmware prints instead of an
/// immediate prompt character.
const BANNERS: [&str; 2] = ["last login", "welcome"];

/// Whether the accumulated text is asking for a username.
pub fn has_username_prompt(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    USERNAME_PROMPTS.iter().any(|p| text.contains(p))
}

/// Whether the accumulated text is asking for a password.
pub fn has_password_prompt(text: &str) -> bool {
    text.to_ascii_lowercase().contains(PASSWORD_PROMPT)
}

/// Whether the bytes contain a shell-prompt marker (`#`, `$`, `>`).
pub fn has_shell_marker(data: &[u8]) -> bool {
    memchr3(b'#', b'$', b'>', data).is_some()
}

/// Whether the accumulated text shows an authenticated shell: a prompt
/// marker anywhere, or a known login banner.
pub fn has_shell_prompt(text: &str) -> bool {
    if has_shell_marker(text.as_bytes()) {
        return true;
    }
    let text = text.to_ascii_lowercase();
    BANNERS.iter().any(|b| text.contains(b))
}
