//! Integration tests for connect, send_command and disconnect against mock ports.

mod common;

use common::{connected, fast_config, frame_for, VERSION_NAK, VERSION_REPLY};
use plm_rs::constants::{PLM_ACK, PLM_NAK};
use plm_rs::plm::serial_mock::MockPortOpener;
use plm_rs::{DeviceAddress, PlmError, PlmSession, SessionState};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_every_command_acks_with_all_fields() {
    let (_opener, port, mut session) = connected().await;
    let catalog = session.config().catalog.clone();

    for cmd in catalog.send_commands() {
        let args = vec![0x01; cmd.args];
        let reply_def = catalog.frame(cmd.command_byte()).unwrap();
        port.respond_to(&cmd.compose(&args), &frame_for(reply_def, PLM_ACK));

        let reply = session.send_command(&cmd.name, &args).await.unwrap();
        assert!(reply.is_success(), "{} failed", cmd.name);
        assert_eq!(reply.reply_byte, cmd.command_byte());
        let expected: Vec<&str> = reply_def.pattern.field_names().collect();
        assert_eq!(reply.fields.names().collect::<Vec<_>>(), expected, "{}", cmd.name);
    }
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_nak_is_failed_and_field_empty() {
    let (_opener, port, mut session) = connected().await;
    let catalog = session.config().catalog.clone();

    for cmd in catalog.send_commands() {
        let args = vec![0x00; cmd.args];
        let reply_def = catalog.frame(cmd.command_byte()).unwrap();
        port.respond_to(&cmd.compose(&args), &frame_for(reply_def, PLM_NAK));

        let reply = session.send_command(&cmd.name, &args).await.unwrap();
        assert!(!reply.is_success(), "{} succeeded", cmd.name);
        assert_eq!(reply.ack, Some(PLM_NAK));
        assert!(reply.fields.is_empty());
    }
}

#[tokio::test]
async fn test_written_bytes_are_template_plus_args() {
    let (_opener, port, mut session) = connected().await;
    port.respond_to(
        &[0x02, 0x62, 0xAA, 0xBB, 0xCC, 0x0F, 0x11, 0xFF],
        &[0x02, 0x62, 0xAA, 0xBB, 0xCC, 0x0F, 0x11, 0xFF, 0x06],
    );

    let fields = plm_rs::send_command(
        &mut session,
        "SEND_STANDARD_MESSAGE",
        &[0xAA, 0xBB, 0xCC, 0x0F, 0x11, 0xFF],
    )
    .await
    .unwrap();
    assert_eq!(port.get_tx_data(), vec![0x02, 0x62, 0xAA, 0xBB, 0xCC, 0x0F, 0x11, 0xFF]);
    assert_eq!(fields.get("to").unwrap().to_string(), "aabbcc");
    assert_eq!(fields.get("cmd1").unwrap().as_u8(), Some(0x11));
}

#[tokio::test]
async fn test_unrelated_frames_before_reply_are_passed_over() {
    let (_opener, port, mut session) = connected().await;
    let mut response = vec![0x02, 0x50, 0x44, 0x55, 0x66, 0x1A, 0x2B, 0x3C, 0x0B, 0x11, 0xFF];
    response.extend_from_slice(&[0x02, 0x58, 0x06]);
    response.extend_from_slice(&[0x02, 0x6E, 0x06]);
    port.respond_to(&[0x02, 0x6E], &response);

    let reply = session.send_command("LED_OFF", &[]).await.unwrap();
    assert!(reply.is_success());
    assert_eq!(reply.reply_byte, 0x6E);
    assert_eq!(port.pending_rx(), 0);
}

#[tokio::test]
async fn test_unknown_command_does_no_io() {
    let (_opener, port, mut session) = connected().await;
    let err = session.send_command("FLY_TO_MOON", &[]).await.unwrap_err();
    assert!(matches!(err, PlmError::UnknownCommand(name) if name == "FLY_TO_MOON"));
    assert!(port.get_tx_data().is_empty());
    assert!(session.is_ready());
}

#[tokio::test]
async fn test_wrong_argument_count_does_no_io() {
    let (_opener, port, mut session) = connected().await;
    let err = session
        .send_command("SEND_STANDARD_MESSAGE", &[0x01, 0x02])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlmError::InvalidArguments { expected: 6, actual: 2, .. }
    ));
    assert!(port.get_tx_data().is_empty());
}

#[tokio::test]
async fn test_short_write_is_write_error_and_drops_link() {
    let (_opener, port, mut session) = connected().await;
    port.set_max_write(Some(1));

    let err = session.send_command("LED_ON", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        PlmError::WriteError { written: 1, expected: 2, .. }
    ));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(port.is_closed());
}

#[tokio::test]
async fn test_failed_write_is_write_error() {
    let (_opener, port, mut session) = connected().await;
    port.set_next_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"));

    let err = session.send_command("LED_ON", &[]).await.unwrap_err();
    assert!(matches!(err, PlmError::WriteError { written: 0, .. }));
    assert!(matches!(
        session.send_command("LED_ON", &[]).await,
        Err(PlmError::NotConnected)
    ));
}

#[tokio::test]
async fn test_unrecognized_frame_fails_the_call() {
    let (_opener, port, mut session) = connected().await;
    port.respond_to(&[0x02, 0x6D], &[0x02, 0x99, 0x00, 0x00]);

    let err = session.send_command("LED_ON", &[]).await.unwrap_err();
    assert!(matches!(err, PlmError::UnrecognizedFrame(0x99)));
    // the link itself is fine
    assert!(session.is_ready());
}

#[tokio::test]
async fn test_silent_modem_times_out() {
    let (_opener, _port, mut session) = connected().await;
    let err = session.send_command("LED_ON", &[]).await.unwrap_err();
    assert!(matches!(err, PlmError::FrameTimeout { .. }));
    assert!(session.is_ready());
}

#[tokio::test]
async fn test_chatty_line_without_reply_hits_deadline() {
    let (_opener, port, mut session) = connected().await;
    let chatter = port.clone();
    let feeder = tokio::spawn(async move {
        loop {
            chatter.queue_frame(0x58, &[0x06]);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let started = Instant::now();
    let err = session.send_command("LED_ON", &[]).await.unwrap_err();
    let elapsed = started.elapsed();
    feeder.abort();

    assert!(matches!(err, PlmError::FrameTimeout { discarded: 0 }));
    // reply_timeout_ms is 500 in the fast config, read timeout only 20
    assert!(elapsed >= Duration::from_millis(500), "gave up after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(session.is_ready());
}

#[tokio::test]
async fn test_connect_discovered_without_matching_port() {
    let mut session = PlmSession::with_opener(fast_config(), MockPortOpener::new());
    let err = session.connect_discovered().await.unwrap_err();
    assert!(matches!(
        err,
        PlmError::PlmNotFound { .. } | PlmError::SerialPortError(_)
    ));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_connect_binds_second_candidate() {
    let opener = MockPortOpener::new();
    let first = opener.add_port("/dev/ttyUSB0");
    first.respond_to(&[0x02, 0x60], &VERSION_NAK);
    let second = opener.add_port("/dev/ttyUSB1");
    second.respond_to(&[0x02, 0x60], &VERSION_REPLY);

    let mut session = PlmSession::with_opener(fast_config(), opener.clone());
    let candidates = vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()];
    let identity = session.connect(&candidates).await.unwrap();

    assert_eq!(identity.address, DeviceAddress::new(0x1A, 0x2B, 0x3C));
    assert_eq!(session.port_name(), Some("/dev/ttyUSB1"));
    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(opener.opened().len(), 2);
    assert_eq!(opener.opened()[0].1.baudrate, 19200);
}

#[tokio::test]
async fn test_connect_skips_silent_and_missing_ports() {
    let opener = MockPortOpener::new();
    let silent = opener.add_port("COM3");
    let modem = opener.add_port("COM5");
    modem.respond_to(&[0x02, 0x60], &VERSION_REPLY);

    let mut session = PlmSession::with_opener(fast_config(), opener);
    let candidates = vec!["COM1".to_string(), "COM3".to_string(), "COM5".to_string()];
    session.connect(&candidates).await.unwrap();
    assert_eq!(session.port_name(), Some("COM5"));
    assert!(silent.is_closed());
}

#[tokio::test]
async fn test_connect_without_modem() {
    let opener = MockPortOpener::new();
    opener.add_port("/dev/ttyUSB0").respond_to(&[0x02, 0x60], &VERSION_NAK);

    let mut session = PlmSession::with_opener(fast_config(), opener);
    let err = session
        .connect(&["/dev/ttyUSB0".to_string(), "/dev/ttyS0".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, PlmError::PlmNotFound { candidates: 2 }));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.identity().is_none());

    let err = session.connect(&[]).await.unwrap_err();
    assert!(matches!(err, PlmError::PlmNotFound { candidates: 0 }));
}

#[tokio::test]
async fn test_reconnect_closes_previous_port() {
    let (opener, first, mut session) = connected().await;
    let second = opener.add_port("/dev/ttyUSB1");
    second.respond_to(&[0x02, 0x60], &VERSION_REPLY);

    session.connect(&["/dev/ttyUSB1".to_string()]).await.unwrap();
    assert!(first.is_closed());
    assert_eq!(session.port_name(), Some("/dev/ttyUSB1"));
    assert!(session.is_ready());
}
