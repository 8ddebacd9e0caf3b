//! End-to-end tests for the terminal client against a live relay
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::time::Duration;

use integration_tests::{next_frame, send_text, TestServer};
use relay_client::{ClientError, RelayClient};
use relay_gateway::CloseCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn client_for(server: &TestServer) -> RelayClient {
    RelayClient::new("127.0.0.1", server.addr.port())
}

#[tokio::test]
async fn test_client_relays_both_ways() {
    let server = TestServer::start().await.unwrap();
    let client = client_for(&server);
    let alice = client.log_in("alice", "password1").await.unwrap();
    let bob = server.login_token("bob", "password2").await.unwrap();

    let (mut input, input_rx) = tokio::io::duplex(1024);
    let (output_tx, output_rx) = tokio::io::duplex(1024);
    let chat = tokio::spawn(async move {
        client
            .chat(&alice, BufReader::new(input_rx), output_tx)
            .await
    });
    let mut printed = BufReader::new(output_rx).lines();

    let mut bob_socket = server.connect(&bob).await.unwrap();
    server.wait_for_health(|h| h.attached == 2).await.unwrap();

    send_text(&mut bob_socket, "hi alice").await.unwrap();
    let line = timeout(WAIT, printed.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(line.starts_with('['), "{line}");
    assert!(line.ends_with("] bob hi alice"), "{line}");

    input.write_all(b"hello bob\n").await.unwrap();
    let frame = next_frame(&mut bob_socket).await.unwrap();
    assert_eq!(frame.message.username, "alice");
    assert_eq!(frame.message.text, "hello bob");

    // End of input ends the client's stream and frees its session
    drop(input);
    let end = timeout(WAIT, chat).await.unwrap().unwrap();
    assert!(end.is_ok(), "{end:?}");

    let health = server.wait_for_health(|h| h.sessions == 1).await.unwrap();
    assert_eq!(health.attached, 1);
}

#[tokio::test]
async fn test_client_reports_logout_close() {
    let server = TestServer::start().await.unwrap();
    let client = client_for(&server);
    let token = client.log_in("alice", "password1").await.unwrap();

    let (_input, input_rx) = tokio::io::duplex(64);
    let chat = {
        let client = client.clone();
        let token = token.clone();
        tokio::spawn(async move { client.chat(&token, BufReader::new(input_rx), tokio::io::sink()).await })
    };
    server.wait_for_health(|h| h.attached == 1).await.unwrap();

    server.logout(Some(&token)).await.unwrap();

    let end = timeout(WAIT, chat).await.unwrap().unwrap().unwrap();
    assert_eq!(end.close_code(), Some(CloseCode::Normal));
    assert_eq!(end.reason, "logged out");
}

#[tokio::test]
async fn test_client_log_in_rejections_carry_error_codes() {
    let server = TestServer::start().await.unwrap();
    let client = client_for(&server);
    client.log_in("alice", "password1").await.unwrap();

    match client.log_in("alice", "password1").await {
        Err(ClientError::Rejected { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "ALREADY_LOGGED_IN");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }

    match client.log_in("x", "password1").await {
        Err(ClientError::Rejected { status, code, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(code, "INVALID_ARGUMENT");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}
