//! Integration tests for the `plm-rs` crate's top-level API.

mod common;

use common::connected;
use plm_rs::{connect, PlmConfig, PlmError};

#[tokio::test]
async fn test_connect_missing_port() {
    let config = PlmConfig::builtin().unwrap();
    let result = connect(config, &["/dev/plm-rs-no-such-port".to_string()]).await;
    assert!(matches!(result, Err(PlmError::PlmNotFound { candidates: 1 })));
}

#[tokio::test]
async fn test_send_command_rejection_is_ack_failure() {
    let (_opener, port, mut session) = connected().await;
    port.respond_to(&[0x02, 0x67], &[0x02, 0x67, 0x15]);

    let reply = session.send_command("RESET_IM", &[]).await.unwrap();
    let err = reply.into_result().unwrap_err();
    assert!(matches!(err, PlmError::AckFailure { ref command, .. } if command == "RESET_IM"));
}

#[test]
fn test_builtin_config() {
    let config = PlmConfig::builtin().unwrap();
    assert!(config.catalog.command("GET_VERSION").is_some());
    assert_eq!(config.directory.len(), 3);
}

#[tokio::test]
async fn test_wrappers_accept_any_port_opener() {
    let (_opener, port, mut session) = connected().await;
    port.respond_to(&[0x02, 0x6D], &[0x02, 0x6D, 0x06]);

    let fields = plm_rs::send_command(&mut session, "LED_ON", &[]).await.unwrap();
    assert_eq!(fields.get("ack").unwrap().as_u8(), Some(0x06));

    let summary = plm_rs::monitor(&mut session, Some(0x50), std::future::ready(()))
        .await
        .unwrap();
    assert_eq!(summary.reported, 0);

    plm_rs::disconnect(&mut session).await;
    assert!(port.is_closed());
    assert!(!session.is_ready());
}
