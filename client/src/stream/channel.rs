// Push-channel transport and the per-connection reader task.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use timing_core::model::StreamEvent;
use timing_core::sse::{decode_event, SseDecoder};

use crate::error::ClientError;
use crate::http::RaceApi;

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

/// Source of raw event-stream bytes. Each `open` is one connection attempt.
pub trait EventChannel: Send + Sync + 'static {
    fn open(&self) -> BoxFuture<'static, Result<ByteStream, ClientError>>;
}

#[derive(Clone, Debug)]
pub struct HttpEventChannel {
    api: RaceApi,
}

impl HttpEventChannel {
    pub fn new(api: RaceApi) -> Self {
        Self { api }
    }
}

impl EventChannel for HttpEventChannel {
    fn open(&self) -> BoxFuture<'static, Result<ByteStream, ClientError>> {
        let api = self.api.clone();
        async move {
            let response = api.open_events().await?;
            let bytes = response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ClientError::from));
            Ok::<ByteStream, ClientError>(bytes.boxed())
        }
        .boxed()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamSignal {
    Opened { conn: u64 },
    Event { conn: u64, event: StreamEvent },
    Closed { conn: u64, reason: String },
}

/// Reads one connection to completion. Always ends with `Closed` unless the receiver is gone.
pub async fn run_connection<C: EventChannel>(
    conn: u64,
    channel: Arc<C>,
    tx: mpsc::Sender<StreamSignal>,
) {
    let reason = match channel.open().await {
        Ok(mut stream) => {
            if tx.send(StreamSignal::Opened { conn }).await.is_err() {
                return;
            }
            let mut decoder = SseDecoder::new();
            loop {
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in decoder.push(&chunk) {
                            match decode_event(&frame) {
                                Ok(Some(event)) => {
                                    if tx.send(StreamSignal::Event { conn, event }).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(None) => debug!(conn, event = ?frame.event, "unhandled event"),
                                Err(err) => warn!(conn, error = %err, "discarding malformed event"),
                            }
                        }
                    }
                    Some(Err(err)) => break err.to_string(),
                    None => break "stream ended".to_string(),
                }
            }
        }
        Err(err) => err.to_string(),
    };
    let _ = tx.send(StreamSignal::Closed { conn, reason }).await;
}
