//! Session-level behavior against mock devices: the permanent/transient
//! failure split, bounded retry, identification, and command execution.

mod support;

use std::net::Ipv4Addr;
use std::time::Duration;

use telswitch::error::SessionError;
use telswitch::{CommandSequencer, CommandSpec, Credentials, TelnetConfig, TelnetSession};

use support::{MockScreen, Personality, NO_PROMPT};

fn fast_config(port: u16) -> TelnetConfig {
    TelnetConfig::default()
        .with_port(port)
        .with_timeout(Duration::from_millis(300))
        .with_retries(2)
}

#[tokio::test]
async fn silent_host_is_unreachable_with_zero_retries() {
    let mock = MockScreen::spawn(Personality::Silent).await;
    let config = fast_config(mock.port());

    let result = TelnetSession::login(mock.ip(), &Credentials::default(), config).await;

    assert!(matches!(
        result,
        Err(SessionError::Unreachable { host }) if host == Ipv4Addr::LOCALHOST
    ));
    // Permanent failure: exactly one connection, no retry.
    assert_eq!(mock.connection_count(), 1);
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    // Bind and immediately drop a listener so the port is closed.
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result =
        TelnetSession::login(Ipv4Addr::LOCALHOST, &Credentials::default(), fast_config(port)).await;

    assert!(matches!(result, Err(SessionError::Unreachable { .. })));
}

#[tokio::test]
async fn unrecognized_banner_retries_to_the_bound_then_fails() {
    let mock = MockScreen::spawn(Personality::Chatty(
        "BusyBox v1.22 built-in serial console\r\n".to_string(),
    ))
    .await;
    let config = TelnetConfig::default()
        .with_port(mock.port())
        .with_timeout(Duration::from_millis(200))
        .with_retries(2);

    let result = TelnetSession::login(mock.ip(), &Credentials::default(), config).await;

    assert!(matches!(
        result,
        Err(SessionError::HandshakeFailed { attempts: 3, .. })
    ));
    // Transient failure: the initial attempt plus both retries, each on a
    // fresh connection.
    assert_eq!(mock.connection_count(), 3);
}

#[tokio::test]
async fn login_and_identify_read_the_device_id() {
    let mock = MockScreen::spawn(Personality::Screen(vec![vec!["V2.3.1_856".to_string()]])).await;

    let mut session =
        TelnetSession::login(mock.ip(), &Credentials::default(), fast_config(mock.port()))
            .await
            .unwrap();
    let device_id = session.identify().await;
    session.close().await;

    assert_eq!(device_id.as_deref(), Some("V2.3.1_856"));
}

#[tokio::test]
async fn missing_identity_file_yields_unknown_id_not_failure() {
    let mock = MockScreen::spawn(Personality::Screen(vec![vec![
        "cat: /tmp/app_version: No such file or directory".to_string(),
    ]]))
    .await;

    let mut session =
        TelnetSession::login(mock.ip(), &Credentials::default(), fast_config(mock.port()))
            .await
            .unwrap();
    let device_id = session.identify().await;
    session.close().await;

    assert_eq!(device_id, None);
}

#[tokio::test]
async fn stuck_command_keeps_partial_output_and_sequence_continues() {
    let mock = MockScreen::spawn(Personality::Screen(vec![vec![
        format!("{NO_PROMPT}reading flash, please wait"),
        "done".to_string(),
    ]]))
    .await;

    let session =
        TelnetSession::login(mock.ip(), &Credentials::default(), fast_config(mock.port()))
            .await
            .unwrap();

    let commands = [
        CommandSpec::new("cat /proc/slow").with_timeout(Duration::from_millis(300)),
        CommandSpec::new("echo done"),
    ];
    let results = CommandSequencer::run(session, &commands).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(!results[0].completed);
    assert!(results[0].output.contains("reading flash"));
    assert!(results[1].completed);
    assert!(results[1].output.contains("done"));
}

#[tokio::test]
async fn command_output_excludes_echo_and_prompt() {
    let mock = MockScreen::spawn(Personality::Screen(vec![vec![
        "[mqtt]\ncn_host=a.example.com".to_string(),
    ]]))
    .await;

    let session =
        TelnetSession::login(mock.ip(), &Credentials::default(), fast_config(mock.port()))
            .await
            .unwrap();
    let results = CommandSequencer::run(session, &[CommandSpec::new("cat /tmp/mqtt.ini")])
        .await
        .unwrap();

    assert_eq!(results[0].output, "[mqtt]\ncn_host=a.example.com");
}
