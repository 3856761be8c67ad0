/*
 * error.rs
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

//! Transport-layer errors: URL parsing, wire-format parsing, sockets, server bind.

use std::fmt;
use std::io;

/// Errors from the HTTP transport: codec, client, server.
#[derive(Debug)]
pub enum TransportError {
    /// URL string could not be parsed (missing scheme or host).
    MalformedUrl(String),
    /// Inbound bytes are not a well-formed HTTP message (bad start line,
    /// unsupported framing such as chunked transfer encoding).
    MalformedMessage(String),
    /// Message ended before the declared Content-Length was satisfied.
    TruncatedMessage,
    /// TCP connect or TLS handshake failed.
    Connect(String),
    /// The caller's connect/read deadline elapsed.
    Timeout,
    /// Server could not bind its listen address (fatal at startup).
    Bind(String),
    /// Socket read/write error mid-exchange.
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::MalformedUrl(u) => write!(f, "malformed URL: {}", u),
            TransportError::MalformedMessage(m) => write!(f, "malformed HTTP message: {}", m),
            TransportError::TruncatedMessage => write!(f, "truncated HTTP message"),
            TransportError::Connect(m) => write!(f, "connect failed: {}", m),
            TransportError::Timeout => write!(f, "operation timed out"),
            TransportError::Bind(m) => write!(f, "bind failed: {}", m),
            TransportError::Io(e) => write!(f, "socket error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl TransportError {
    /// True for failures where a fresh connection is worth one retry:
    /// the pooled socket may simply have been closed by the peer.
    pub fn is_connection_error(&self) -> bool {
        match self {
            TransportError::Io(_) | TransportError::Connect(_) => true,
            TransportError::TruncatedMessage => true,
            _ => false,
        }
    }
}
