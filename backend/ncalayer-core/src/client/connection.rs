//! WebSocket connection to the signing agent.
//!
//! The read half is owned by a background task that feeds every inbound
//! frame into the connection's [`ExchangeSlot`]; the write half sits behind a
//! mutex so requests are transmitted one at a time.

use crate::client::Observer;
use crate::client::exchange::{ExchangeSlot, Inbound, PendingExchange};
use crate::error::NcaLayerError;

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) struct Connection {
    writer: Mutex<SplitSink<WsStream, Message>>,
    slot: Arc<ExchangeSlot>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Open the socket to `url`.
    ///
    /// The agent speaks first, so the returned exchange is registered before
    /// the reader starts and receives the greeting frame.
    pub(crate) async fn open(
        url: &str,
        on_response_ready: Option<Observer>,
    ) -> Result<(Self, PendingExchange), NcaLayerError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| {
            warn!("WebSocket connection to {url} failed: {e}");
            NcaLayerError::transport(e.to_string())
        })?;

        debug!("WebSocket connection to {url} established");

        let (write, read) = ws_stream.split();
        let slot = Arc::new(ExchangeSlot::new());
        let greeting = slot.open()?;
        let reader = tokio::spawn(read_loop(read, Arc::clone(&slot), on_response_ready));

        Ok((
            Self {
                writer: Mutex::new(write),
                slot,
                reader,
            },
            greeting,
        ))
    }

    /// Claim the response slot for the next request.
    pub(crate) fn reserve(&self) -> Result<PendingExchange, NcaLayerError> {
        self.slot.open()
    }

    /// Send one text frame.
    pub(crate) async fn transmit(&self, text: String) -> Result<(), NcaLayerError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| NcaLayerError::transport(format!("Failed to send request: {e}")))
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.slot.is_terminated()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Route inbound frames to the slot until the socket closes or fails.
async fn read_loop(
    mut read: SplitStream<WsStream>,
    slot: Arc<ExchangeSlot>,
    on_response_ready: Option<Observer>,
) {
    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
            Ok(Message::Close(frame)) => {
                debug!("NCALayer sent close frame: {frame:?}");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("NCALayer connection failed: {e}");
                slot.terminate(Inbound::Failed(e.to_string()));
                return;
            }
        };

        if let Some(observer) = &on_response_ready {
            observer(&text);
        }

        slot.deliver(text);
    }

    info!("NCALayer closed the connection");
    slot.terminate(Inbound::Closed);
}
