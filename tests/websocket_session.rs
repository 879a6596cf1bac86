//! End-to-end sessions against a loopback WebSocket server.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calibration_panel::{AppConfig, ConnectionState, Dashboard};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const INFERENCE: &str = r#"{"topic":"inference.tap","timestamp":1700000000.0,"frame_id":4001,"detections":[{"person_id":1,"bbox":[10,10,50,90],"keypoints":[{"name":"nose","x":30,"y":20,"conf":0.9}],"confidence":0.8}]}"#;
const TRACKER: &str = r#"{"topic":"tracker.tap","timestamp":1700000000.1,"event":"person_detected","event_payload":{"person_id":1},"tracks":[{"person_id":1,"bbox_smoothed":[10,10,50,90]}]}"#;

/// Accept connections forever, handing each one to `handler` with its index.
async fn spawn_server<F, Fut>(handler: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(WebSocketStream<TcpStream>, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            if let Ok(ws) = tokio_tungstenite::accept_async(tcp).await {
                tokio::spawn(handler(ws, index));
            }
        }
    });

    (format!("ws://{}/ws", addr), accepted)
}

fn config_for(url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.connection.url = Some(url.to_string());
    config.reconnect.base_delay_ms = 50;
    config
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition reached before timeout");
}

async fn drain(ws: &mut WebSocketStream<TcpStream>) {
    while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test]
async fn stream_feeds_reducers_and_normal_close_ends_session() {
    let (url, accepted) = spawn_server(|mut ws, _| async move {
        let frames = vec![
            Message::Text("{definitely not json".to_string()),
            Message::Text(INFERENCE.to_string()),
            Message::Text(r#"{"topic":"camera.tap"}"#.to_string()),
            Message::Binary(TRACKER.as_bytes().to_vec()),
        ];
        for frame in frames {
            ws.send(frame).await.expect("send frame");
        }
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        }))
        .await
        .expect("close");
        drain(&mut ws).await;
    })
    .await;

    let dashboard = Dashboard::new(config_for(&url)).expect("valid endpoint");
    dashboard.start().expect("start");

    let telemetry = Arc::clone(dashboard.telemetry());
    wait_until(|| {
        let counters = telemetry.frame_counters();
        counters.decoded == 2 && counters.schema_invalid == 1 && counters.unknown_topic == 1
    })
    .await;
    wait_until(|| dashboard.connection_state() == ConnectionState::Disconnected).await;

    let status = dashboard.status();
    assert_eq!(status.current_frame, 4001);
    assert_eq!(status.metrics.active_tracks, 1);
    assert_eq!(status.event_count, 1);
    assert!(!status.connection.connected);

    // normal closure from the server is final
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert!(telemetry.reconnect_delays().is_empty());
}

#[tokio::test]
async fn shutdown_sends_normal_close() {
    let (tx, mut rx) = mpsc::unbounded_channel::<Option<u16>>();
    let (url, accepted) = spawn_server(move |mut ws, _| {
        let tx = tx.clone();
        async move {
            ws.send(Message::Text(INFERENCE.to_string()))
                .await
                .expect("send frame");
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Close(frame) = message {
                    let _ = tx.send(frame.map(|frame| u16::from(frame.code)));
                    break;
                }
            }
        }
    })
    .await;

    let dashboard = Dashboard::new(config_for(&url)).expect("valid endpoint");
    dashboard.start().expect("start");
    wait_until(|| dashboard.status().current_frame == 4001).await;

    dashboard.shutdown().await.expect("shutdown");
    assert_eq!(dashboard.connection_state(), ConnectionState::Disconnected);

    let code = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("close frame received");
    assert_eq!(code, Some(Some(1000)));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn abnormal_close_reconnects_and_recovers() {
    let (url, accepted) = spawn_server(|mut ws, index| async move {
        if index == 0 {
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Error,
                    reason: "internal".into(),
                }))
                .await;
            drain(&mut ws).await;
        } else {
            let _ = ws.send(Message::Text(INFERENCE.to_string())).await;
            drain(&mut ws).await;
        }
    })
    .await;

    let dashboard = Dashboard::new(config_for(&url)).expect("valid endpoint");
    dashboard.start().expect("start");

    wait_until(|| dashboard.status().current_frame == 4001).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    assert_eq!(dashboard.telemetry().reconnect_delays(), vec![50]);
    assert!(dashboard.connection_state().is_connected());

    dashboard.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let mut config = config_for(&format!("ws://{}/ws", addr));
    config.reconnect.base_delay_ms = 10;
    config.reconnect.max_attempts = 3;
    let dashboard = Dashboard::new(config).expect("valid endpoint");
    dashboard.start().expect("start");

    wait_until(|| matches!(dashboard.connection_state(), ConnectionState::Failed { .. })).await;
    assert_eq!(
        dashboard.connection_state(),
        ConnectionState::Failed { attempts: 3 }
    );
    assert_eq!(dashboard.telemetry().reconnect_delays(), vec![10, 20, 40]);
}
