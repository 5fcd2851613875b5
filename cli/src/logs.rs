//! Websocket log streaming for a single execution.
//!
//! A spawned reader task owns the read half of the socket and writes every
//! frame to the caller's sink in arrival order. The caller side waits for
//! either the reader to finish or an interrupt; on interrupt it sends a
//! "going away" close frame on the write half and returns without joining
//! the reader.

use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, warn};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::Credentials;
use crate::error::{classify_status, classify_transport, ClientError};
use crate::request::RequestBuilder;

/// How a log stream finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The daemon closed the stream, or the connection dropped.
    Closed,
    /// The interrupt fired first and the daemon was told we are going away.
    Interrupted,
}

pub struct LogStreamer<'a> {
    credentials: &'a Credentials,
    client_version: &'a str,
    connect_timeout: Duration,
}

impl<'a> LogStreamer<'a> {
    pub fn new(credentials: &'a Credentials, client_version: &'a str, connect_timeout: Duration) -> Self {
        Self { credentials, client_version, connect_timeout }
    }

    pub fn url(&self, execution_id: u64) -> String {
        format!(
            "ws://{}{}?context_id={}",
            self.credentials.host,
            common::EXECUTION_LOGS_ROUTE,
            execution_id
        )
    }

    /// Stream logs into `sink` until the daemon closes the stream or
    /// `interrupt` completes, whichever happens first.
    pub async fn stream<W, I>(&self, execution_id: u64, sink: W, interrupt: I) -> Result<StreamEnd, ClientError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
        I: Future<Output = ()>,
    {
        let url = self.url(execution_id);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let builder = RequestBuilder::new(self.credentials, self.client_version);
        for (name, value) in builder.identity_headers() {
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Request(format!("invalid {} header: {}", name, e)))?;
            request.headers_mut().insert(name, value);
        }

        debug!("Opening log stream {}", url);
        let connected = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                let elapsed = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("websocket handshake with {} timed out after {:?}", url, self.connect_timeout),
                );
                classify_transport(&elapsed)
            })?;
        let (socket, _response) = connected.map_err(|e| self.classify_handshake(e))?;

        let (mut write, read) = socket.split();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(relay_frames(read, sink, done_tx));

        tokio::select! {
            _ = done_rx => {
                debug!("Log stream for execution {} ended", execution_id);
                Ok(StreamEnd::Closed)
            }
            _ = interrupt => {
                warn!("User interrupt while streaming logs for execution {}", execution_id);
                send_going_away(&mut write).await?;
                Ok(StreamEnd::Interrupted)
            }
        }
    }

    fn classify_handshake(&self, err: WsError) -> ClientError {
        match err {
            WsError::Http(response) => {
                let body = response
                    .body()
                    .as_deref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                classify_status(response.status().as_u16(), body, self.credentials)
            }
            other => classify_transport(&other),
        }
    }
}

async fn send_going_away<S>(write: &mut S) -> Result<(), ClientError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let frame = CloseFrame { code: CloseCode::Away, reason: "".into() };
    write
        .send(Message::Close(Some(frame)))
        .await
        .map_err(|e| classify_transport(&e))
}

async fn relay_frames<S, W>(mut read: S, mut sink: W, done: oneshot::Sender<()>)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = read.next().await {
        let line = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(reason)) => {
                debug!("Daemon closed log stream: {:?}", reason);
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!("Log stream read ended: {}", e);
                break;
            }
        };

        let written = async {
            sink.write_all(line.as_bytes()).await?;
            sink.write_all(b"\n").await?;
            sink.flush().await
        };
        if let Err(e) = written.await {
            warn!("Failed to write log line: {}", e);
            break;
        }
    }

    // The receiver is gone if the caller was interrupted.
    let _ = done.send(());
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for interrupts: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_execution_id_as_context() {
        let creds = Credentials {
            host: "daemon.example.com:5000".into(),
            email: String::new(),
            access_token: String::new(),
        };
        let streamer = LogStreamer::new(&creds, "v2.0.0", Duration::from_secs(1));
        assert_eq!(
            streamer.url(42),
            "ws://daemon.example.com:5000/execution/logs?context_id=42"
        );
    }

    #[tokio::test]
    async fn going_away_reports_rejected_close_frame() {
        let sent = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = std::sync::Arc::clone(&sent);
        let mut closed = Box::pin(futures::sink::unfold((), move |(), msg: Message| {
            record.lock().unwrap().push(msg);
            async { Err::<(), WsError>(WsError::AlreadyClosed) }
        }));

        let err = send_going_away(&mut closed).await.unwrap_err();

        assert!(matches!(err, ClientError::Network { timeout: false, .. }));
        match sent.lock().unwrap().as_slice() {
            [Message::Close(Some(frame))] => assert_eq!(frame.code, CloseCode::Away),
            other => panic!("unexpected frames: {other:?}"),
        };
    }

    #[tokio::test]
    async fn going_away_sends_close_with_away_code() {
        let sent = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = std::sync::Arc::clone(&sent);
        let mut open = Box::pin(futures::sink::unfold((), move |(), msg: Message| {
            record.lock().unwrap().push(msg);
            async { Ok::<(), WsError>(()) }
        }));

        send_going_away(&mut open).await.unwrap();
        assert!(matches!(sent.lock().unwrap().as_slice(), [Message::Close(Some(_))]));
    }
}
