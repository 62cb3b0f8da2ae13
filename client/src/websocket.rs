use futures_util::{SinkExt, StreamExt, stream::SplitStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use warboard_common::protocol::{ClientMessage, ServerMessage};

use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsReader = SplitStream<WsStream>;

/// WebSocket connection to one board. Pick reports are queued to a writer
/// task; layouts and hover updates come back through `receive_message`.
pub struct WarboardWebSocket {
    reports: mpsc::UnboundedSender<ClientMessage>,
    inbound: WsReader,
    pump: JoinHandle<()>,
}

impl WarboardWebSocket {
    /// Connect to a board via WebSocket
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Opening board socket: {}", url);

        let (socket, _) = connect_async(url).await?;
        let (mut outbound, inbound) = socket.split();

        // All outgoing traffic funnels through one task, so any number of
        // report handles can queue messages without sharing the sink.
        let (reports, mut outbox) = mpsc::unbounded_channel::<ClientMessage>();
        let pump = tokio::spawn(async move {
            while let Some(report) = outbox.recv().await {
                match serde_json::to_string(&report) {
                    Ok(json) => {
                        debug!("Sending report: {}", json);
                        if let Err(e) = outbound.send(Message::Text(json.into())).await {
                            warn!("Board socket write failed: {}", e);
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping unserializable report: {}", e),
                }
            }

            let _ = outbound.close().await;
        });

        Ok(Self {
            reports,
            inbound,
            pump,
        })
    }

    /// Get a cloneable sender for queueing reports
    pub fn get_sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.reports.clone()
    }

    /// Send a client message to the server
    pub async fn send_message(&self, message: ClientMessage) -> Result<()> {
        self.reports
            .send(message)
            .map_err(|_| "board socket writer closed")?;
        Ok(())
    }

    /// Receive the next server message, or `None` once the connection closed
    pub async fn receive_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.inbound.next().await {
            match frame? {
                Message::Text(text) => {
                    debug!("Received update: {}", text);
                    return Ok(Some(serde_json::from_str(&text)?));
                }
                Message::Close(_) => {
                    info!("Server closed the board socket");
                    return Ok(None);
                }
                // Ping, pong and binary frames carry no board updates
                _ => continue,
            }
        }

        Ok(None)
    }

    /// Close the connection, flushing any queued reports first
    pub async fn close(self) -> Result<()> {
        // With the last sender gone the pump drains its queue and exits
        drop(self.reports);
        let _ = self.pump.await;

        Ok(())
    }
}
