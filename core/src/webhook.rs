/*
 * webhook.rs
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

//! Push delivery: an embedded HTTP server receiving events the remote
//! service delivers to us. Requests on the configured path hand their
//! undecoded body to the update callback and get an empty 200 back; any
//! other path gets 404. Decoding the body is the callback's business.

use std::sync::Arc;

use crate::error::TransportError;
use crate::protocol::http::server::{HttpServer, RequestHandler, ServerHandle};
use crate::protocol::http::ParsedRequest;

/// Callback receiving each delivered event body, undecoded.
pub type UpdateCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Handler routing webhook deliveries: path match feeds the callback.
fn webhook_handler(path: String, on_update: UpdateCallback) -> RequestHandler {
    Arc::new(move |request: &ParsedRequest| {
        if request.path_without_query() == path {
            on_update(String::from_utf8_lossy(&request.body).into_owned());
            (200, String::new())
        } else {
            (404, String::new())
        }
    })
}

/// Webhook server bound to a TCP address. `path` is the URL path the
/// remote service was told to deliver to.
pub async fn bind_tcp(
    host: &str,
    port: u16,
    path: impl Into<String>,
    on_update: UpdateCallback,
) -> Result<HttpServer, TransportError> {
    HttpServer::bind_tcp(host, port, webhook_handler(path.into(), on_update)).await
}

/// Webhook server bound to a local Unix socket, for deployments where a
/// front proxy terminates TLS and forwards over the filesystem.
#[cfg(unix)]
pub async fn bind_local(
    socket_path: impl AsRef<std::path::Path>,
    path: impl Into<String>,
    on_update: UpdateCallback,
) -> Result<HttpServer, TransportError> {
    HttpServer::bind_local(socket_path, webhook_handler(path.into(), on_update)).await
}

/// Re-exported for callers that keep only the webhook module in scope.
pub type WebhookHandle = ServerHandle;
