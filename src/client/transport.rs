//! WebSocket transport.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error};

use crate::error::TransportError;

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Frame(String),
    /// The socket is gone.
    Closed { reason: String },
}

/// Receiving half of an open connection.
///
/// Dropping it stops the reader task. The writer task stops by itself once
/// every clone of the outgoing sender has been dropped.
pub struct Transport {
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    reader: JoinHandle<()>,
}

impl Transport {
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.incoming.recv().await
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Open `url` and spawn the reader and writer tasks.
///
/// Returns the sender feeding the writer together with the event stream.
pub async fn open(url: &str) -> Result<(mpsc::UnboundedSender<String>, Transport), TransportError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();

    // Writer: forward queued commands until the session drops its sender.
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame.into())).await {
                error!(error = %e, "failed to send frame");
                return;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
        debug!("writer finished");
    });

    let reader = tokio::spawn(async move {
        let reason = loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => {
                    if in_tx.send(TransportEvent::Frame(text.to_string())).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| format!("closed by server: {}", f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket read error");
                    break e.to_string();
                }
                None => break "connection ended".to_string(),
            }
        };
        let _ = in_tx.send(TransportEvent::Closed { reason });
    });

    Ok((
        out_tx,
        Transport {
            incoming: in_rx,
            reader,
        },
    ))
}
