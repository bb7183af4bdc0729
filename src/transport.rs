// file: src/transport.rs
// description: WebSocket transport over plain TCP or rustls, behind connector traits
// reference: https://docs.rs/fastwebsockets/latest/fastwebsockets/

use crate::error::WalletError;
use fastwebsockets::{FragmentCollector, Frame, OpCode, Payload, Role, WebSocket};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace, warn};
use url::Url;

const MAX_HANDSHAKE_RESPONSE: usize = 16 * 1024;

/// One open, text-oriented connection.
pub trait Transport: Send + 'static {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// `None` once the peer has closed the connection.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, WalletError>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(&self, url: &Url) -> impl Future<Output = Result<Self::Transport, WalletError>> + Send;
}

pub trait WsStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> WsStream for T {}

type BoxedStream = Box<dyn WsStream>;

/// Connects `ws://` and `wss://` endpoints.
#[derive(Clone)]
pub struct WsConnector {
    tls: TlsConnector,
    timeout: Duration,
}

impl WsConnector {
    pub fn new(timeout: Duration) -> Result<Self, WalletError> {
        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        })
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            timeout,
        })
    }

    async fn open(&self, url: &Url) -> Result<WsTransport, WalletError> {
        let host = url
            .host_str()
            .ok_or_else(|| WalletError::HandshakeFailed {
                reason: format!("no host in {url}"),
            })?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| WalletError::UnsupportedScheme(url.scheme().to_string()))?;

        let tcp = TcpStream::connect((host.as_str(), port)).await?;
        tcp.set_nodelay(true)?;

        let mut stream: BoxedStream = match url.scheme() {
            "ws" => Box::new(tcp),
            "wss" => {
                let domain = rustls::pki_types::ServerName::try_from(host.clone()).map_err(|e| {
                    WalletError::HandshakeFailed {
                        reason: e.to_string(),
                    }
                })?;
                Box::new(self.tls.connect(domain, tcp).await?)
            }
            other => return Err(WalletError::UnsupportedScheme(other.to_string())),
        };

        handshake(&mut stream, url, &host).await?;

        let mut ws = WebSocket::after_handshake(stream, Role::Client);
        ws.set_writev(true);
        ws.set_auto_close(true);
        ws.set_auto_pong(true);

        Ok(WsTransport {
            ws: FragmentCollector::new(ws),
        })
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &Url) -> Result<WsTransport, WalletError> {
        tokio::time::timeout(self.timeout, self.open(url))
            .await
            .map_err(|_| WalletError::Timeout)?
    }
}

async fn handshake(stream: &mut BoxedStream, url: &Url, host: &str) -> Result<(), WalletError> {
    let key = fastwebsockets::handshake::generate_key();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let request = format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    // Read byte-wise up to the blank line so no frame bytes are consumed.
    let mut response = Vec::with_capacity(256);
    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_HANDSHAKE_RESPONSE {
            return Err(WalletError::HandshakeFailed {
                reason: "response headers too large".to_string(),
            });
        }
        let byte = stream.read_u8().await?;
        response.push(byte);
    }

    let response = String::from_utf8_lossy(&response);
    let status_line = response.lines().next().unwrap_or_default();
    if !status_line.contains(" 101 ") && !status_line.ends_with(" 101") {
        return Err(WalletError::HandshakeFailed {
            reason: status_line.to_string(),
        });
    }

    debug!("WebSocket handshake completed: {}", status_line);
    Ok(())
}

pub struct WsTransport {
    ws: FragmentCollector<BoxedStream>,
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), WalletError> {
        self.ws
            .write_frame(Frame::text(Payload::Owned(text.into_bytes())))
            .await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, WalletError>> {
        loop {
            let frame = match self.ws.read_frame().await {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            match frame.opcode {
                OpCode::Text => {
                    return Some(
                        String::from_utf8(frame.payload.to_vec())
                            .map_err(|e| WalletError::InvalidMessage(e.to_string())),
                    );
                }
                OpCode::Close => {
                    debug!("Received close frame");
                    return None;
                }
                OpCode::Binary => {
                    warn!("Binary messages not currently supported ({} bytes)", frame.payload.len());
                }
                _ => {
                    trace!("Ignoring control frame");
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.write_frame(Frame::close(1000, b"")).await {
            debug!("Failed to send close frame: {}", e);
        }
    }
}
