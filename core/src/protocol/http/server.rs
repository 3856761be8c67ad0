/*
 * server.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Telegrafo, a Telegram bot API client library.
 *
 * Telegrafo is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Telegrafo is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Telegrafo.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Inbound HTTP server for push delivery: accept loop, one task per
//! connection, handler callback per parsed request.
//!
//! Bind variants: TCP socket or a local Unix socket. Bind failures are
//! fatal; per-connection parse errors answer 400 and close only that
//! connection. Shutdown is cooperative: a flag checked between accept
//! rounds, so it takes effect at the next loop iteration.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::time::timeout;

use crate::error::TransportError;
use crate::protocol::http::codec::{self, ParsedRequest};

/// How often the accept loop wakes to check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handler contract: parsed request in, status code and body text out.
/// The body is forwarded undecoded; interpreting it belongs to the caller.
pub type RequestHandler = Arc<dyn Fn(&ParsedRequest) -> (u16, String) + Send + Sync>;

/// Stop switch for a running server. Cloneable; `stop()` takes effect at
/// the next accept-loop iteration.
#[derive(Clone)]
pub struct ServerHandle {
    running: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Local(UnixListener),
}

/// Bound inbound server. Construct with `bind_tcp` or `bind_local`, then
/// drive with `serve()` (typically inside `tokio::spawn`).
pub struct HttpServer {
    listener: Listener,
    handler: RequestHandler,
    running: Arc<AtomicBool>,
}

impl HttpServer {
    /// Bind a TCP listen socket. Errors (address in use, permission
    /// denied) are fatal to startup.
    pub async fn bind_tcp(
        host: &str,
        port: u16,
        handler: RequestHandler,
    ) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::Bind(format!("{}: {}", addr, e)))?;
        Ok(Self {
            listener: Listener::Tcp(listener),
            handler,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Bind a local Unix socket. A leftover socket file from a previous
    /// run is removed first.
    #[cfg(unix)]
    pub async fn bind_local(
        path: impl AsRef<std::path::Path>,
        handler: RequestHandler,
    ) -> Result<Self, TransportError> {
        let path = path.as_ref();
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path)
            .map_err(|e| TransportError::Bind(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            listener: Listener::Local(listener),
            handler,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Actual bound address of a TCP listener (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Listener::Tcp(l) => l.local_addr().ok(),
            #[cfg(unix)]
            Listener::Local(_) => None,
        }
    }

    /// Handle to stop the accept loop.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            running: self.running.clone(),
        }
    }

    /// Run the accept loop until the handle is stopped. One spawned task
    /// per accepted connection; connection failures never end the loop.
    pub async fn serve(self) {
        while self.running.load(Ordering::SeqCst) {
            match &self.listener {
                Listener::Tcp(listener) => {
                    match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                        Ok(Ok((stream, _peer))) => {
                            let handler = self.handler.clone();
                            tokio::spawn(handle_connection(stream, handler));
                        }
                        Ok(Err(e)) => {
                            eprintln!("[server] accept failed: {}", e);
                        }
                        Err(_) => {} // poll tick, re-check running flag
                    }
                }
                #[cfg(unix)]
                Listener::Local(listener) => {
                    match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                        Ok(Ok((stream, _peer))) => {
                            let handler = self.handler.clone();
                            tokio::spawn(handle_connection(stream, handler));
                        }
                        Ok(Err(e)) => {
                            eprintln!("[server] accept failed: {}", e);
                        }
                        Err(_) => {}
                    }
                }
            }
        }
    }
}

/// Serve one connection: parse requests as bytes arrive, invoke the
/// handler, write responses, honor the request's Connection header.
/// Parse errors answer 400 and close.
async fn handle_connection<S>(mut stream: S, handler: RequestHandler)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(8192);
    let mut tmp = [0u8; 8192];
    loop {
        let request = loop {
            match codec::try_parse_request(&buf) {
                Ok(Some((request, consumed))) => {
                    let _ = buf.split_to(consumed);
                    break request;
                }
                Ok(None) => {}
                Err(e) => {
                    let response = codec::build_response_with(400, "text/plain", "");
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                    eprintln!("[server] dropping connection after parse error: {}", e);
                    return;
                }
            }
            match stream.read(&mut tmp).await {
                Ok(0) => return, // peer closed between requests
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(_) => return,
            }
        };

        let close = matches!(request.headers.get("connection"),
            Some(v) if v.eq_ignore_ascii_case("close"));

        let (status, body) = (handler)(&request);
        let response = codec::build_response_with(status, "text/plain", &body);
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }
        if stream.flush().await.is_err() {
            return;
        }
        if close {
            let _ = stream.shutdown().await;
            return;
        }
    }
}
