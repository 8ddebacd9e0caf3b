//! End-to-end tests for the relay's HTTP and WebSocket surface
//!
//! Each test spawns its own server backed by in-memory storage, so no
//! external services are needed.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use integration_tests::{
    assert_error, assert_status, expect_close, next_frame, send_raw, send_text, TestServer,
};
use relay_gateway::CloseCode;
use reqwest::StatusCode;

// ============================================================================
// Account Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let health = server.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.sessions, 0);
    assert_eq!(health.attached, 0);
}

#[tokio::test]
async fn test_login_registers_new_account() {
    let server = TestServer::start().await.unwrap();

    let token = server.login_token("alice", "password1").await.unwrap();
    assert!(!token.is_empty());
    assert_eq!(server.health().await.unwrap().sessions, 1);
}

#[tokio::test]
async fn test_login_twice_is_conflict() {
    let server = TestServer::start().await.unwrap();
    server.login_token("alice", "password1").await.unwrap();

    let response = server.login("alice", "password1").await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "ALREADY_LOGGED_IN");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();
    assert_status(server.logout(Some(&token)).await.unwrap(), StatusCode::NO_CONTENT)
        .await
        .unwrap();

    let response = server.login("alice", "not-the-password").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_CREDENTIALS");
    assert_eq!(server.health().await.unwrap().sessions, 0);
}

#[tokio::test]
async fn test_login_validates_lengths() {
    let server = TestServer::start().await.unwrap();

    let long_username = "u".repeat(25);
    let long_password = "p".repeat(26);
    // 13 characters, 26 bytes
    let wide_username = "é".repeat(13);
    let cases: [(&str, &str); 5] = [
        ("a", "password1"),
        (&long_username, "password1"),
        (&wide_username, "password1"),
        ("alice", "pw"),
        ("alice", &long_password),
    ];

    for (username, password) in cases {
        let response = server.login(username, password).await.unwrap();
        let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
        assert_eq!(code, "INVALID_ARGUMENT", "{username}/{password}");
    }
    assert_eq!(server.health().await.unwrap().sessions, 0);
}

#[tokio::test]
async fn test_login_with_malformed_body() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .client
        .post(format!("{}/api/login", server.base_url()))
        .header("Content-Type", "application/json")
        .body("{\"username\":")
        .send()
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_logout_rules() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();

    let missing = server.logout(None).await.unwrap();
    assert_status(missing, StatusCode::UNAUTHORIZED).await.unwrap();

    let forged = server.logout(Some("not-a-token")).await.unwrap();
    assert_status(forged, StatusCode::UNAUTHORIZED).await.unwrap();

    let ok = server.logout(Some(&token)).await.unwrap();
    assert_status(ok, StatusCode::NO_CONTENT).await.unwrap();

    let again = server.logout(Some(&token)).await.unwrap();
    let code = assert_error(again, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "NOT_LOGGED_IN");
}

// ============================================================================
// Chat Stream Tests
// ============================================================================

#[tokio::test]
async fn test_chat_without_token_is_rejected() {
    let server = TestServer::start().await.unwrap();

    match server.connect_anonymous().await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        Err(other) => panic!("expected an HTTP rejection, got {other:?}"),
        Ok(_) => panic!("upgrade should have been refused"),
    }
}

#[tokio::test]
async fn test_chat_after_logout_closes_not_logged_in() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();
    server.logout(Some(&token)).await.unwrap();

    let mut socket = server.connect(&token).await.unwrap();
    let (code, _) = expect_close(&mut socket).await.unwrap();
    assert_eq!(code, CloseCode::NotLoggedIn.as_u16());
}

#[tokio::test]
async fn test_two_users_chat_end_to_end() {
    let server = TestServer::start().await.unwrap();
    let user1 = server.login_token("user1", "password1").await.unwrap();
    let user2 = server.login_token("user2", "password2").await.unwrap();

    let mut socket1 = server.connect(&user1).await.unwrap();
    let mut socket2 = server.connect(&user2).await.unwrap();
    server.wait_for_health(|h| h.attached == 2).await.unwrap();

    for text in ["user1-1", "user1-2", "user1-3"] {
        send_text(&mut socket1, text).await.unwrap();
    }
    for text in ["user2-1", "user2-2"] {
        send_text(&mut socket2, text).await.unwrap();
    }

    let mut to_user2 = Vec::new();
    for _ in 0..3 {
        let frame = next_frame(&mut socket2).await.unwrap();
        assert_eq!(frame.message.username, "user1");
        to_user2.push(frame.message.text);
    }
    let mut to_user1 = Vec::new();
    for _ in 0..2 {
        let frame = next_frame(&mut socket1).await.unwrap();
        assert_eq!(frame.message.username, "user2");
        to_user1.push(frame.message.text);
    }
    assert_eq!(to_user2, ["user1-1", "user1-2", "user1-3"]);
    assert_eq!(to_user1, ["user2-1", "user2-2"]);

    // Ending both streams empties the registry
    socket1.close(None).await.unwrap();
    socket2.close(None).await.unwrap();
    let health = server
        .wait_for_health(|h| h.sessions == 0)
        .await
        .unwrap();
    assert_eq!(health.attached, 0);
}

#[tokio::test]
async fn test_logout_ends_open_stream() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();
    let mut socket = server.connect(&token).await.unwrap();
    server.wait_for_health(|h| h.attached == 1).await.unwrap();

    assert_status(server.logout(Some(&token)).await.unwrap(), StatusCode::NO_CONTENT)
        .await
        .unwrap();

    let (code, reason) = expect_close(&mut socket).await.unwrap();
    assert_eq!(code, CloseCode::Normal.as_u16());
    assert_eq!(reason, "logged out");
    assert_eq!(server.health().await.unwrap().sessions, 0);
}

#[tokio::test]
async fn test_sender_does_not_receive_own_message() {
    let server = TestServer::start().await.unwrap();
    let alice = server.login_token("alice", "password1").await.unwrap();
    let bob = server.login_token("bob", "password2").await.unwrap();

    let mut alice_socket = server.connect(&alice).await.unwrap();
    let mut bob_socket = server.connect(&bob).await.unwrap();
    server.wait_for_health(|h| h.attached == 2).await.unwrap();

    send_text(&mut alice_socket, "first").await.unwrap();
    send_text(&mut bob_socket, "second").await.unwrap();

    // alice's next frame is bob's message, never her own
    let frame = next_frame(&mut alice_socket).await.unwrap();
    assert_eq!(frame.message.username, "bob");
    assert_eq!(frame.message.text, "second");
}

#[tokio::test]
async fn test_invalid_kind_closes_stream() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();
    let mut socket = server.connect(&token).await.unwrap();
    server.wait_for_health(|h| h.attached == 1).await.unwrap();

    send_raw(&mut socket, r#"{"message":{"kind":"shout","text":"HEY"}}"#)
        .await
        .unwrap();

    let (code, _) = expect_close(&mut socket).await.unwrap();
    assert_eq!(code, CloseCode::InvalidArgument.as_u16());
    server.wait_for_health(|h| h.sessions == 0).await.unwrap();
}

#[tokio::test]
async fn test_malformed_frame_closes_stream() {
    let server = TestServer::start().await.unwrap();
    let token = server.login_token("alice", "password1").await.unwrap();
    let mut socket = server.connect(&token).await.unwrap();

    send_raw(&mut socket, "definitely not json").await.unwrap();

    let (code, _) = expect_close(&mut socket).await.unwrap();
    assert_eq!(code, CloseCode::InvalidArgument.as_u16());
}
