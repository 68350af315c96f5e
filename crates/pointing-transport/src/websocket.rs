//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Addresses take the form `host:port/path`. Claiming binds `host:port`
//! and only upgrades requests for `/path`; a port that is already bound
//! is reported as [`TransportError::AddressTaken`]. The dialing side
//! picks its own [`PeerId`] and sends it, together with its metadata, in
//! the upgrade request query.
//!
//! Each upgrade runs in its own task under a deadline, so a socket that
//! connects and never speaks cannot hold up later joins.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::error::ProtocolError as WsProtocolError;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{query, Connection, Listener, Metadata, PeerId, Transport, TransportError};

/// How long an inbound socket may take to finish the upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`Transport`] that links peers over WebSocket.
#[derive(Debug, Clone, Copy)]
pub struct WebSocketTransport {
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Creates the transport with [`DEFAULT_HANDSHAKE_TIMEOUT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long listeners wait for an inbound upgrade before dropping
    /// the socket.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl Transport for WebSocketTransport {
    type Listener = WebSocketListener;
    type Connection = WebSocketConnection<MaybeTlsStream<TcpStream>>;

    async fn claim(&self, address: &str) -> Result<WebSocketListener, TransportError> {
        let (host, path) = split_address(address)?;
        let listener = TcpListener::bind(host).await.map_err(|e| {
            if e.kind() == io::ErrorKind::AddrInUse {
                TransportError::AddressTaken(address.to_string())
            } else {
                TransportError::AcceptFailed(e)
            }
        })?;
        let local = listener.local_addr().map_err(TransportError::AcceptFailed)?;
        let resolved = format!("{local}/{path}");
        tracing::info!(address = %resolved, "WebSocket transport listening");

        Ok(WebSocketListener {
            listener,
            path: format!("/{}", query::encode(path)).into(),
            address: resolved,
            local_id: PeerId::new(path),
            handshake_timeout: self.handshake_timeout,
            pending: JoinSet::new(),
        })
    }

    async fn connect(
        &self,
        address: &str,
        metadata: Metadata,
    ) -> Result<Self::Connection, TransportError> {
        let (host, path) = split_address(address)?;
        let local_id = PeerId::random();
        let handshake = query::format([
            ("peer", local_id.as_str()),
            ("name", metadata.name.as_str()),
        ]);
        let url = format!("ws://{host}/{}?{handshake}", query::encode(path));

        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        tracing::debug!(address, %local_id, "WebSocket connection opened");

        Ok(WebSocketConnection::new(local_id, PeerId::new(path), metadata, ws))
    }
}

/// Listening side of a claimed WebSocket address.
///
/// Dropping it releases the port and cancels upgrades still in flight.
pub struct WebSocketListener {
    listener: TcpListener,
    path: Arc<str>,
    address: String,
    local_id: PeerId,
    handshake_timeout: Duration,
    pending: JoinSet<Option<WebSocketConnection<TcpStream>>>,
}

impl Listener for WebSocketListener {
    type Connection = WebSocketConnection<TcpStream>;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted.map_err(TransportError::AcceptFailed)?;
                    self.pending.spawn(upgrade(
                        stream,
                        addr,
                        Arc::clone(&self.path),
                        self.local_id.clone(),
                        self.handshake_timeout,
                    ));
                }
                Some(done) = self.pending.join_next() => {
                    if let Ok(Some(conn)) = done {
                        return Ok(conn);
                    }
                }
            }
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Runs the server side of one upgrade. `None` means the socket was
/// dropped: wrong path, no peer id, a failed handshake, or the deadline.
async fn upgrade(
    stream: TcpStream,
    addr: SocketAddr,
    expected: Arc<str>,
    local_id: PeerId,
    deadline: Duration,
) -> Option<WebSocketConnection<TcpStream>> {
    let mut handshake = None;
    let callback = |request: &Request, response: Response| {
        match parse_handshake(request, &expected) {
            Some(found) => {
                handshake = Some(found);
                Ok(response)
            }
            None => Err(reject(StatusCode::NOT_FOUND, "unknown session")),
        }
    };
    let upgraded = tokio::time::timeout(
        deadline,
        tokio_tungstenite::accept_hdr_async(stream, callback),
    )
    .await;

    match upgraded {
        Ok(Ok(ws)) => match handshake {
            Some((remote_id, metadata)) => {
                tracing::debug!(%remote_id, %addr, "accepted WebSocket connection");
                Some(WebSocketConnection::new(local_id, remote_id, metadata, ws))
            }
            None => {
                tracing::debug!(%addr, "upgrade without peer handshake, dropping");
                None
            }
        },
        Ok(Err(e)) => {
            tracing::debug!(%addr, error = %e, "rejected WebSocket upgrade");
            None
        }
        Err(_) => {
            tracing::debug!(%addr, ?deadline, "WebSocket upgrade timed out, dropping");
            None
        }
    }
}

/// A single WebSocket connection.
///
/// The sink and stream halves are locked separately, so a `recv` waiting
/// for data never holds up a `send`.
pub struct WebSocketConnection<S> {
    local_id: PeerId,
    remote_id: PeerId,
    metadata: Metadata,
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(
        local_id: PeerId,
        remote_id: PeerId,
        metadata: Metadata,
        ws: WebSocketStream<S>,
    ) -> Self {
        let (sink, stream) = ws.split();
        Self {
            local_id,
            remote_id,
            metadata,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

impl<S> Connection for WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let msg = Message::Binary(data.to_vec().into());
        self.sink.lock().await.send(msg).await.map_err(send_error)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(
                    WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(WsProtocolError::ResetWithoutClosingHandshake),
                )) => return Ok(None),
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self.sink.lock().await.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(send_error(e)),
        }
    }

    fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    fn remote_id(&self) -> &PeerId {
        &self.remote_id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Splits `host:port/path` into its two halves.
fn split_address(address: &str) -> Result<(&str, &str), TransportError> {
    match address.split_once('/') {
        Some((host, path)) if !host.is_empty() && !path.is_empty() => Ok((host, path)),
        _ => Err(TransportError::InvalidAddress(format!(
            "expected host:port/path, got {address:?}"
        ))),
    }
}

/// Extracts the dialing peer's id and metadata from an upgrade request.
fn parse_handshake(request: &Request, expected_path: &str) -> Option<(PeerId, Metadata)> {
    if request.uri().path() != expected_path {
        return None;
    }
    let mut peer = None;
    let mut name = String::new();
    for (key, value) in query::parse(request.uri().query().unwrap_or("")) {
        match key.as_str() {
            "peer" if !value.is_empty() => peer = Some(PeerId::new(value)),
            "name" => name = value,
            _ => {}
        }
    }
    Some((peer?, Metadata { name }))
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

fn send_error(e: WsError) -> TransportError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            TransportError::ConnectionClosed(e.to_string())
        }
        other => TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, other)),
    }
}
