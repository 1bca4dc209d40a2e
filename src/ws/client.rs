use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::events::{decode_frame, encode_frame, InboundEvent, OutboundEvent};
use super::transport::SocketTransport;

const OUTBOUND_QUEUE: usize = 32;
const INBOUND_QUEUE: usize = 256;
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection to the socket event service.
///
/// Reading and writing run on dedicated tasks; the handle only queues frames,
/// so it can be used from synchronous UI code.
#[derive(Clone)]
pub struct SocketClient {
    tx: mpsc::Sender<WsMessage>,
    connected: Arc<AtomicBool>,
}

impl SocketClient {
    /// Open the connection and return the handle plus the stream of decoded events.
    pub async fn connect(
        url: &str,
        token: Option<&str>,
    ) -> Result<(Self, mpsc::Receiver<InboundEvent>)> {
        let mut request = url
            .into_client_request()
            .with_context(|| format!("invalid socket url: {url}"))?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("token is not a valid header value")?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _) = connect_async(request)
            .await
            .with_context(|| format!("socket connect to {url} failed"))?;
        info!(url, "socket connected");

        let (mut sink, mut source) = stream.split();
        let connected = Arc::new(AtomicBool::new(true));
        let (out_tx, mut out_rx) = mpsc::channel::<WsMessage>(OUTBOUND_QUEUE);
        let (in_tx, in_rx) = mpsc::channel::<InboundEvent>(INBOUND_QUEUE);

        let reader_done = Arc::new(Notify::new());

        // Dedicated writer task keeps the socket flushing independently of callers.
        let writer_flag = connected.clone();
        let writer_stop = reader_done.clone();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    msg = out_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                    // the server went away; nothing queued can be delivered
                    _ = writer_stop.notified() => break,
                };
                let closing = matches!(msg, WsMessage::Close(_));
                match timeout(SEND_TIMEOUT, sink.send(msg)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(error = %err, "socket write failed");
                        break;
                    }
                    Err(_) => {
                        warn!("socket write timed out");
                        continue;
                    }
                }
                if closing {
                    break;
                }
            }
            writer_flag.store(false, Ordering::SeqCst);
            let _ = sink.close().await;
        });

        let reader_flag = connected.clone();
        tokio::spawn(async move {
            // tungstenite answers pings on its own
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(raw)) => match decode_frame(raw.as_str()) {
                        Ok(event) => {
                            debug!(event = event.name(), "socket event received");
                            if in_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "ignoring undecodable socket frame"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "socket read failed");
                        break;
                    }
                }
            }
            reader_flag.store(false, Ordering::SeqCst);
            reader_done.notify_one();
            info!("socket disconnected");
        });

        Ok((
            Self {
                tx: out_tx,
                connected,
            },
            in_rx,
        ))
    }

    /// Close the connection. Later emits are rejected.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.tx.try_send(WsMessage::Close(None));
            info!("socket disconnect requested");
        }
    }
}

impl SocketTransport for SocketClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(&self, event: OutboundEvent) -> Result<()> {
        if !self.is_connected() {
            bail!("socket disconnected");
        }
        let text = encode_frame(&event)?;
        self.tx
            .try_send(WsMessage::Text(text.into()))
            .map_err(|err| anyhow!("socket queue rejected {}: {err}", event.name()))?;
        debug!(event = event.name(), "socket event queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::presence::UserStatus;
    use crate::ws::events::ToggleDeletionPayload;
    use axum::extract::ws::{Message as ServerMessage, WebSocketUpgrade};
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn spawn_server(seen: mpsc::Sender<(Option<String>, String)>) -> String {
        let app = Router::new().route(
            "/ws",
            get(move |ws: WebSocketUpgrade, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    ws.on_upgrade(move |mut socket| async move {
                        let hello = json!({
                            "event": "userStatusChanged",
                            "data": {"userId": "u2", "isOnline": true}
                        });
                        let _ = socket.send(ServerMessage::Text(hello.to_string().into())).await;
                        let _ = socket.send(ServerMessage::Text("garbage".into())).await;
                        while let Some(Ok(msg)) = socket.recv().await {
                            if let ServerMessage::Text(text) = msg {
                                let _ = seen.send((auth.clone(), text.as_str().to_string())).await;
                            }
                        }
                    })
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{addr}/ws")
    }

    #[tokio::test]
    async fn exchanges_events_with_service() {
        let (seen_tx, mut seen_rx) = mpsc::channel(4);
        let url = spawn_server(seen_tx).await;

        let (client, mut events) = SocketClient::connect(&url, Some("secret")).await.unwrap();
        assert!(client.is_connected());

        let first = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            first,
            InboundEvent::UserStatusChanged(UserStatus {
                user_id: "u2".into(),
                is_online: true,
            })
        );

        client
            .emit(OutboundEvent::ToggleMessageDeletion(ToggleDeletionPayload {
                message_id: "m1".into(),
                is_deleted: true,
            }))
            .unwrap();

        let (auth, frame) = timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        let frame: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(frame["event"], json!("toggleMessageDeletion"));
        assert_eq!(frame["data"]["messageId"], json!("m1"));
    }

    async fn spawn_closing_server() -> String {
        let app = Router::new().route(
            "/ws",
            get(|ws: WebSocketUpgrade| async move {
                ws.on_upgrade(|mut socket| async move {
                    let _ = socket.send(ServerMessage::Close(None)).await;
                })
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{addr}/ws")
    }

    #[tokio::test]
    async fn server_close_stops_both_tasks() {
        let url = spawn_closing_server().await;
        let (client, mut events) = SocketClient::connect(&url, None).await.unwrap();

        let ended = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert!(ended.is_none());
        assert!(!client.is_connected());

        // the writer drops its receiver even though this handle is still alive
        timeout(Duration::from_secs(5), async {
            while !client.tx.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn emit_after_disconnect_is_rejected() {
        let (seen_tx, _seen_rx) = mpsc::channel(4);
        let url = spawn_server(seen_tx).await;

        let (client, _events) = SocketClient::connect(&url, None).await.unwrap();
        client.disconnect();
        assert!(!client.is_connected());

        let result = client.emit(OutboundEvent::ToggleMessageDeletion(ToggleDeletionPayload {
            message_id: "m1".into(),
            is_deleted: false,
        }));
        assert!(result.is_err());
    }
}
