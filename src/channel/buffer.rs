//! Accumulation buffer with Telnet and terminal noise filtered out.
//!
//! Prompts arrive split across packets, so inbound bytes are accumulated
//! and never discarded mid-handshake. Before a chunk is appended, Telnet
//! IAC command and subnegotiation sequences are dropped (they are never
//! answered; option negotiation is out of scope) and ANSI escape sequences
//! are stripped, so pattern tests run over clean text.
//!
//! Shell-prompt detection only searches the last `search_depth` bytes;
//! a long `cat` of a config file should not slow down every marker test.

use bytes::BytesMut;

use super::patterns;

const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;
const WILL: u8 = 251;
const DONT: u8 = 254;

/// Decoder state for the Telnet IAC filter. Sequences can split across
/// reads, so the state survives between `extend` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IacState {
    /// Plain data.
    Data,
    /// Saw IAC, awaiting the command byte.
    Command,
    /// Saw IAC WILL/WONT/DO/DONT, awaiting the option byte.
    Option,
    /// Inside an IAC SB ... subnegotiation.
    Subnegotiation,
    /// Saw IAC inside a subnegotiation, awaiting SE or an escaped byte.
    SubnegotiationCommand,
}

/// Buffer for accumulating session output and testing it for prompts.
#[derive(Debug)]
pub struct PromptBuffer {
    buffer: BytesMut,
    iac_state: IacState,

    /// How many bytes from the end to search for shell-prompt markers.
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a buffer with the given marker search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            iac_state: IacState::Data,
            search_depth,
        }
    }

    /// Append a chunk of raw inbound bytes, filtering IAC sequences and
    /// stripping ANSI escapes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut plain = Vec::with_capacity(data.len());
        for &byte in data {
            self.iac_state = match self.iac_state {
                IacState::Data => {
                    if byte == IAC {
                        IacState::Command
                    } else {
                        plain.push(byte);
                        IacState::Data
                    }
                }
                IacState::Command => match byte {
                    IAC => {
                        // Escaped 0xff data byte.
                        plain.push(IAC);
                        IacState::Data
                    }
                    SB => IacState::Subnegotiation,
                    WILL..=DONT => IacState::Option,
                    _ => IacState::Data,
                },
                IacState::Option => IacState::Data,
                IacState::Subnegotiation => {
                    if byte == IAC {
                        IacState::SubnegotiationCommand
                    } else {
                        IacState::Subnegotiation
                    }
                }
                IacState::SubnegotiationCommand => {
                    if byte == SE {
                        IacState::Data
                    } else {
                        IacState::Subnegotiation
                    }
                }
            };
        }

        let cleaned = strip_ansi_escapes::strip(&plain);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Whether a shell-prompt marker appears in the buffer tail.
    pub fn tail_has_marker(&self) -> bool {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        patterns::has_shell_marker(&self.buffer[start..])
    }

    /// The accumulated text (lossy UTF-8).
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Take the accumulated text out of the buffer and reset it.
    pub fn take_text(&mut self) -> String {
        let taken = self.buffer.split();
        String::from_utf8_lossy(&taken).into_owned()
    }

    /// Drop accumulated contents. The IAC decoder state is kept; a
    /// sequence can straddle a command boundary.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Current accumulated length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has accumulated.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
