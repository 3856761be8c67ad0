/*
 * connection.rs
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

//! One outbound HTTP connection: a plain TCP or TLS stream plus a
//! persistent read buffer. A connection carries one request/response
//! exchange at a time (no pipelining); leftover buffered bytes survive
//! between keep-alive exchanges.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream as TokioTlsStream;

use crate::error::TransportError;
use crate::net;
use crate::protocol::http::codec::{self, ParsedResponse};

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(TokioTlsStream<TcpStream>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// An open outbound connection to one (host, port, secure) endpoint.
pub struct HttpConnection {
    stream: HttpStream,
    read_buf: BytesMut,
    last_used: Instant,
    saw_eof: bool,
}

impl HttpConnection {
    /// TCP connect (and TLS handshake when `secure`) bounded by
    /// `connect_timeout`.
    pub async fn open(
        host: &str,
        port: u16,
        secure: bool,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let tcp = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Connect(format!("{}: {}", addr, e)))?;
        let stream = if secure {
            let tls = timeout(connect_timeout, net::tls_handshake(host, tcp))
                .await
                .map_err(|_| TransportError::Timeout)?
                .map_err(|e| TransportError::Connect(format!("{}: {}", addr, e)))?;
            HttpStream::Tls(tls)
        } else {
            HttpStream::Plain(tcp)
        };
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(8192),
            last_used: Instant::now(),
            saw_eof: false,
        })
    }

    /// Seconds the connection has sat idle in the pool.
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// False once the peer has closed its end; such a connection must not
    /// go back into the pool.
    pub fn reusable(&self) -> bool {
        !self.saw_eof
    }

    /// Write one request and read until a complete response is assembled,
    /// all bounded by `deadline`. A response without Content-Length is
    /// finished by the peer closing the connection.
    pub async fn roundtrip(
        &mut self,
        request: &[u8],
        deadline: Duration,
    ) -> Result<ParsedResponse, TransportError> {
        let result = timeout(deadline, self.roundtrip_inner(request)).await;
        self.last_used = Instant::now();
        match result {
            Ok(r) => r,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn roundtrip_inner(&mut self, request: &[u8]) -> Result<ParsedResponse, TransportError> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;

        let mut tmp = [0u8; 8192];
        loop {
            if let Some((response, consumed)) = codec::try_parse_response(&self.read_buf)? {
                let _ = self.read_buf.split_to(consumed);
                return Ok(response);
            }
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                // EOF: either a close-delimited body is now complete, or
                // the peer hung up mid-message.
                self.saw_eof = true;
                let response = codec::parse_response(&self.read_buf)?;
                self.read_buf.clear();
                return Ok(response);
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}
