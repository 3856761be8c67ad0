/*
 * client.rs
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

//! HTTP client with keep-alive connection reuse.
//!
//! The pool holds at most one connection per (host, port, secure) key,
//! each behind its own async mutex: requests to the same endpoint
//! serialize on that mutex (one in-flight exchange per connection, no
//! pipelining), requests to different endpoints proceed independently.
//! After a failure on a pooled connection the entry is evicted and the
//! request retried exactly once on a fresh connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::error::TransportError;
use crate::protocol::http::args::RequestArg;
use crate::protocol::http::codec::{self, Method, ParsedResponse};
use crate::protocol::http::connection::HttpConnection;
use crate::url::Url;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Pooled connections idle past this are presumed dropped by the peer.
const POOL_IDLE_LIMIT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    host: String,
    port: u16,
    secure: bool,
}

type Slot = Arc<AsyncMutex<Option<HttpConnection>>>;

/// Client options. Request timeout is the default deadline for one full
/// exchange; callers with long-poll requests pass their own per call.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Cloneable HTTP client sharing one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    options: ClientOptions,
    pool: Arc<Mutex<HashMap<PoolKey, Slot>>>,
}

impl HttpClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            pool: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build and send one request, returning the parsed response.
    /// `timeout` overrides the configured request deadline when given.
    pub async fn request(
        &self,
        url: &Url,
        method: Method,
        args: &[RequestArg],
        force_multipart: bool,
        timeout: Option<Duration>,
    ) -> Result<ParsedResponse, TransportError> {
        let raw = codec::build_request(method, url, args, force_multipart);
        let deadline = timeout.unwrap_or(self.options.request_timeout);
        let key = PoolKey {
            host: url.host.clone(),
            port: url.port,
            secure: url.secure(),
        };

        // Per-key slot: lock held for the whole exchange, so one in-flight
        // request per endpoint while other endpoints proceed.
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        let pooled = match guard.take() {
            Some(conn) if conn.idle_for() < POOL_IDLE_LIMIT && conn.reusable() => Some(conn),
            _ => None,
        };
        let had_pooled = pooled.is_some();

        let mut conn = match pooled {
            Some(conn) => conn,
            None => HttpConnection::open(&key.host, key.port, key.secure, self.options.connect_timeout).await?,
        };

        let result = conn.roundtrip(&raw, deadline).await;
        let result = match result {
            Err(ref e) if had_pooled && e.is_connection_error() => {
                // Stale keep-alive connection; one retry on a fresh socket.
                eprintln!("[http] pooled connection to {}:{} failed ({}), retrying once", key.host, key.port, e);
                drop(conn);
                conn = HttpConnection::open(&key.host, key.port, key.secure, self.options.connect_timeout)
                    .await?;
                conn.roundtrip(&raw, deadline).await
            }
            other => other,
        };

        match result {
            Ok(response) => {
                if response.keep_alive() && conn.reusable() {
                    *guard = Some(conn);
                }
                Ok(response)
            }
            Err(e) => {
                // Connection state is suspect after any failure; evict.
                *guard = None;
                Err(e)
            }
        }
    }

    fn slot(&self, key: &PoolKey) -> Slot {
        let mut pool = self.pool.lock().unwrap();
        pool.entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}
