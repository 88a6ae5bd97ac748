//! WebSocket channel against a loopback echo server.

use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;

use tidecall::transport::SignalingChannel;
use tidecall::transport::websocket::WebSocketChannel;

async fn ws_echo(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        while let Some(Ok(message)) = socket.recv().await {
            if let Message::Text(text) = message {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    })
}

async fn spawn_echo_server() -> String {
    let app = Router::new().route("/ws", get(ws_echo));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("ws://{addr}/ws")
}

#[tokio::test]
async fn text_frames_round_trip() {
    let url = spawn_echo_server().await;
    let channel = WebSocketChannel::connect(&url).await.unwrap();

    let frame = r#"{"type":"offer","sdp":"o="}"#;
    channel.send(frame.to_string()).await.unwrap();

    let echoed = tokio::time::timeout(Duration::from_secs(5), channel.recv())
        .await
        .expect("timed out waiting for echo");
    assert_eq!(echoed.as_deref(), Some(frame));

    channel.disconnect().await;
}

#[tokio::test]
async fn invalid_url_is_a_setup_error() {
    let result = WebSocketChannel::connect("not a url").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unreachable_server_is_a_setup_error() {
    // Port 9 (discard) is almost never listening
    let result = WebSocketChannel::connect("ws://127.0.0.1:9/ws").await;
    assert!(result.is_err());
}
