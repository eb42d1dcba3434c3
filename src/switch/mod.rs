//! Cloud-endpoint switch workflow.
//!
//! Rewrites the MQTT broker configuration on a managed screen, restarts
//! the client service, and verifies from the device's own log that it
//! reconnected to the target endpoint. The whole mutation runs over one
//! scripted Telnet command sequence.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;

use crate::error::Error;
use crate::sequence::{CommandResult, CommandSequencer, CommandSpec};
use crate::session::TelnetSession;
use crate::transport::{Credentials, TelnetConfig};

/// Marker file whose presence distinguishes the two firmware generations.
const GENERATION_MARKER: &str = "/tmp/app_version";

/// Remote answer when the marker file does not exist.
const NOT_FOUND: &str = "No such file";

/// Index of the post-edit config dump in the script below.
const CONFIG_VERIFY_SLOT: usize = 3;

/// Which endpoint profile to switch a device to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    /// Fleet units shipped outside mainland China.
    Overseas,
    /// Mainland China fleet units.
    China,
}

impl FromStr for VersionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OVERSEAS" => Ok(Self::Overseas),
            "CHINA" => Ok(Self::China),
            other => Err(format!("unknown version kind '{other}'")),
        }
    }
}

/// A named cloud-endpoint profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionProfile {
    /// Human-readable profile name, used in result messages.
    pub name: &'static str,

    /// Broker host written into the `cn_host` field.
    pub cn_host: &'static str,

    /// Broker host written into the `en_host` field.
    pub en_host: &'static str,
}

const OVERSEAS: VersionProfile = VersionProfile {
    name: "overseas",
    cn_host: "cloud-service-us.austinelec.com",
    en_host: "cloud-service-us.austinelec.com",
};

const CHINA: VersionProfile = VersionProfile {
    name: "mainland China",
    cn_host: "cloud-service.austinelec.com",
    en_host: "cloud-service.austinelec.com",
};

impl VersionKind {
    /// The endpoint profile for this kind.
    pub fn profile(self) -> &'static VersionProfile {
        match self {
            Self::Overseas => &OVERSEAS,
            Self::China => &CHINA,
        }
    }
}

/// Firmware generation, inferred from the marker file.
///
/// This is a heuristic, not a version query: nothing on the device reports
/// its generation, but only the newer firmware creates the marker, and
/// the two generations keep their MQTT config and log in different places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generation {
    New,
    Legacy,
}

impl Generation {
    fn config_path(self) -> &'static str {
        match self {
            Self::New => "/customer/config/mqtt.ini",
            Self::Legacy => "/software/mqtt.ini",
        }
    }

    fn log_path(self) -> &'static str {
        match self {
            Self::New => "/software/log/mymqtt.log",
            Self::Legacy => "/software/mqtt/mymqtt.log",
        }
    }
}

/// Structured outcome of a switch attempt. This workflow never throws
/// past its own boundary; every failure mode lands here with a message
/// that distinguishes an unreachable device, a config that did not
/// verify, and a log that did not verify.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchOutcome {
    /// Whether both verification stages passed.
    pub success: bool,

    /// Operator-facing explanation.
    pub message: String,
}

/// Connection settings for a switch run.
#[derive(Debug, Clone, Default)]
pub struct SwitchOptions {
    /// Credential pair to log in with.
    pub credentials: Credentials,

    /// Session configuration (port, handshake timeout, retry bound).
    pub telnet: TelnetConfig,
}

/// Switch the device at `ip` to the given endpoint profile, using the
/// fleet defaults for credentials and connection settings.
pub async fn switch_version(ip: Ipv4Addr, kind: VersionKind) -> SwitchOutcome {
    switch_version_with(ip, kind, SwitchOptions::default()).await
}

/// Switch the device at `ip` to the given endpoint profile.
pub async fn switch_version_with(
    ip: Ipv4Addr,
    kind: VersionKind,
    options: SwitchOptions,
) -> SwitchOutcome {
    let profile = kind.profile();
    info!("switching {ip} to the {} profile", profile.name);

    match run_switch(ip, profile, &options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("switch of {ip} failed before verification: {e}");
            SwitchOutcome {
                success: false,
                message: format!("could not reach device {ip}: {e}"),
            }
        }
    }
}

async fn run_switch(
    ip: Ipv4Addr,
    profile: &VersionProfile,
    options: &SwitchOptions,
) -> Result<SwitchOutcome, Error> {
    let generation = detect_generation(ip, options).await?;
    info!(
        "{ip} runs {generation:?} firmware, config {}, log {}",
        generation.config_path(),
        generation.log_path()
    );

    let script = build_script(profile, generation);
    let session = login(ip, options).await?;
    let results = CommandSequencer::run(session, &script).await?;

    Ok(verify(ip, profile, &results))
}

/// Probe for the generation marker file on its own session.
async fn detect_generation(ip: Ipv4Addr, options: &SwitchOptions) -> Result<Generation, Error> {
    let session = login(ip, options).await?;
    let probe = [CommandSpec::new(format!("ls -la {GENERATION_MARKER}"))];
    let results = CommandSequencer::run(session, &probe).await?;

    let output = results.first().map(|r| r.output.as_str()).unwrap_or("");
    if output.contains(NOT_FOUND) {
        Ok(Generation::Legacy)
    } else {
        Ok(Generation::New)
    }
}

async fn login(ip: Ipv4Addr, options: &SwitchOptions) -> Result<TelnetSession, Error> {
    let session = TelnetSession::login(ip, &options.credentials, options.telnet.clone()).await?;
    Ok(session)
}

/// The reconfiguration script. The config file is overwritten outright
/// with literal `key=value` lines; line-patching the old contents proved
/// fragile on devices whose config had drifted.
fn build_script(profile: &VersionProfile, generation: Generation) -> Vec<CommandSpec> {
    let config = generation.config_path();
    let log = generation.log_path();

    vec![
        CommandSpec::new(format!("cp {config} {config}.bak")),
        CommandSpec::new(format!("cat {config}")).with_timeout(Duration::from_secs(3)),
        CommandSpec::new(format!(
            "echo -e \"[mqtt]\\ncn_host={}\\ncn_port=1883\\nen_host={}\\nen_port=1883\" > {config}",
            profile.cn_host, profile.en_host
        )),
        CommandSpec::new(format!("cat {config}")).with_timeout(Duration::from_secs(3)),
        CommandSpec::new("sync"),
        CommandSpec::new(format!("echo \"\" > {log}")),
        CommandSpec::new("kill -9 $(pidof mymqtt)"),
        CommandSpec::new("echo \"waiting for service restart\"").with_delay(Duration::from_secs(3)),
        CommandSpec::new(format!("cat {log} | grep {}", profile.cn_host))
            .with_timeout(Duration::from_secs(5)),
    ]
}

/// Two-stage verification: the rewritten config must carry both hosts,
/// and the restarted service's log must mention the target host.
fn verify(ip: Ipv4Addr, profile: &VersionProfile, results: &[CommandResult]) -> SwitchOutcome {
    let config_dump = results
        .get(CONFIG_VERIFY_SLOT)
        .map(|r| r.output.as_str())
        .unwrap_or("");
    let config_ok = config_dump.contains(&format!("cn_host={}", profile.cn_host))
        && config_dump.contains(&format!("en_host={}", profile.en_host));
    if !config_ok {
        warn!("{ip}: rewritten config did not verify");
        return SwitchOutcome {
            success: false,
            message: format!(
                "config verification failed on {ip}: expected host entries not found after rewrite"
            ),
        };
    }

    let log_dump = results.last().map(|r| r.output.as_str()).unwrap_or("");
    if log_dump.contains(profile.cn_host) {
        info!("{ip} switched to the {} profile", profile.name);
        SwitchOutcome {
            success: true,
            message: format!("device {ip} switched to the {} profile", profile.name),
        }
    } else {
        warn!("{ip}: service log did not verify");
        SwitchOutcome {
            success: false,
            message: format!(
                "log verification failed on {ip}: {} not seen in the restarted service log",
                profile.cn_host
            ),
        }
    }
}
