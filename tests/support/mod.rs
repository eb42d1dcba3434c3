//! In-process mock of a managed screen's Telnet service.
//!
//! Each mock binds an ephemeral loopback port and plays one of a few
//! personalities: a host that accepts and stays silent, a host that
//! talks but never prompts, or a full screen that walks the login flow
//! and answers queued command responses.

// Each test binary pulls in the subset of this module it needs.
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the mock does with each accepted connection.
#[derive(Debug, Clone)]
pub enum Personality {
    /// Accept and never send a byte.
    Silent,

    /// Immediately send banner text that matches no prompt, then go quiet.
    Chatty(String),

    /// Full screen: login prompts, then one queued response list per
    /// connection. When a connection's queue (or the session list) runs
    /// dry, commands are answered with a bare prompt.
    Screen(Vec<Vec<String>>),
}

pub struct MockScreen {
    addr: SocketAddr,
    connections: Arc<AtomicU32>,
    handle: JoinHandle<()>,
}

impl MockScreen {
    pub async fn spawn(personality: Personality) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicU32::new(0));

        let counter = connections.clone();
        let sessions = Arc::new(Mutex::new(match &personality {
            Personality::Screen(sessions) => sessions.clone(),
            _ => Vec::new(),
        }));

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let personality = personality.clone();
                let sessions = sessions.clone();
                tokio::spawn(async move {
                    match personality {
                        Personality::Silent => {
                            // Hold the connection open without speaking.
                            let mut reader = BufReader::new(stream);
                            let mut sink = String::new();
                            while reader.read_line(&mut sink).await.unwrap_or(0) > 0 {}
                        }
                        Personality::Chatty(banner) => {
                            let mut stream = stream;
                            let _ = stream.write_all(banner.as_bytes()).await;
                            let mut reader = BufReader::new(stream);
                            let mut sink = String::new();
                            while reader.read_line(&mut sink).await.unwrap_or(0) > 0 {}
                        }
                        Personality::Screen(_) => {
                            let responses = {
                                let mut sessions = sessions.lock().unwrap();
                                if sessions.is_empty() {
                                    Vec::new()
                                } else {
                                    sessions.remove(0)
                                }
                            };
                            let _ = serve_screen(stream, responses).await;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            connections,
            handle,
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::LOCALHOST
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// How many connections have been accepted so far.
    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockScreen {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Response prefix that makes the mock withhold the prompt after a
/// command, simulating a command that never finishes.
pub const NO_PROMPT: &str = "<<noprompt>>";

/// Walk one connection through login, then answer commands from the queue.
async fn serve_screen(stream: TcpStream, mut responses: Vec<String>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    write_half.write_all(b"screen login: ").await?;
    line.clear();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    write_half.write_all(b"Password: ").await?;
    line.clear();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    write_half.write_all(b"\r\n~ # ").await?;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let command = line.trim_end_matches(['\r', '\n']).to_string();
        let response = if responses.is_empty() {
            String::new()
        } else {
            responses.remove(0)
        };

        // Echo the command the way a terminal would, then the output,
        // then a fresh prompt (unless this response withholds it).
        let (body, with_prompt) = match response.strip_prefix(NO_PROMPT) {
            Some(rest) => (rest.to_string(), false),
            None => (response, true),
        };
        let mut reply = format!("{command}\r\n");
        if !body.is_empty() {
            reply.push_str(&body);
            reply.push_str("\r\n");
        }
        if with_prompt {
            reply.push_str("~ # ");
        }
        write_half.write_all(reply.as_bytes()).await?;
    }
}

/// Responses for a successful endpoint-switch script run against a
/// new-generation device, ending with `log_line` as the grep result.
pub fn switch_script_responses(cn_host: &str, en_host: &str, log_line: &str) -> Vec<String> {
    let patched = format!(
        "[mqtt]\ncn_host={cn_host}\ncn_port=1883\nen_host={en_host}\nen_port=1883"
    );
    vec![
        String::new(),                                  // cp backup
        "[mqtt]\ncn_host=old.example.com".to_string(),  // cat (audit)
        String::new(),                                  // echo -e overwrite
        patched,                                        // cat (verify slot)
        String::new(),                                  // sync
        String::new(),                                  // truncate log
        String::new(),                                  // kill
        "waiting for service restart".to_string(),      // settle echo
        log_line.to_string(),                           // cat | grep
    ]
}
