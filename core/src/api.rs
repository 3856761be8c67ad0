/*
 * api.rs
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

//! Bot API request dispatch: method name + arguments in, response body
//! text out. The JSON inside bodies never gets interpreted here; decoding
//! belongs to the caller's `UpdateDecoder` (or equivalent), keeping this
//! crate free of any JSON dependency.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;
use crate::protocol::http::{HttpClient, Method, RequestArg};
use crate::url::Url;

/// Errors from API dispatch.
#[derive(Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, parse).
    Transport(TransportError),
    /// The server answered with an HTML page instead of an API body;
    /// usually a wrong bot token routed to an error page.
    UnexpectedHtml,
    /// The response body was not valid UTF-8.
    BodyNotText,
    /// The caller's decoder rejected a response body.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(e) => write!(f, "transport error: {}", e),
            ApiError::UnexpectedHtml => {
                write!(f, "got an HTML page instead of an API response; check the bot token")
            }
            ApiError::BodyNotText => write!(f, "response body is not UTF-8 text"),
            ApiError::Decode(m) => write!(f, "cannot decode response: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        ApiError::Transport(e)
    }
}

/// One event pulled from the remote service. The payload is the event's
/// raw JSON text, passed through undecoded; `id` orders events and feeds
/// the poll loop's offset cursor.
#[derive(Debug, Clone)]
pub struct Update {
    pub id: i64,
    pub payload: String,
}

/// External type-codec seam: turns a raw batch body into ordered updates.
/// Implementations live outside this crate, next to the JSON machinery.
pub trait UpdateDecoder: Send + Sync {
    fn decode_updates(&self, body: &str) -> Result<Vec<Update>, ApiError>;
}

/// Dispatches API methods against one bot endpoint:
/// `<base>/bot<token>/<method>`.
#[derive(Clone)]
pub struct Api {
    client: HttpClient,
    base: Url,
    token: String,
}

impl Api {
    /// `base_url` is the API root, e.g. `https://api.telegram.org`.
    /// An unparseable base URL is fatal to construction.
    pub fn new(
        client: HttpClient,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            client,
            base,
            token: token.into(),
        })
    }

    /// Call one API method and return the response body as text. GET when
    /// there are no arguments, POST otherwise (matching the wire behavior
    /// bot API servers expect). Non-2xx responses still return the body:
    /// the API encodes failure inside the JSON envelope, which the
    /// external codec interprets.
    pub async fn send_request(
        &self,
        method: &str,
        args: &[RequestArg],
        timeout: Option<Duration>,
    ) -> Result<String, ApiError> {
        let url = self.base.with_path(format!("/bot{}/{}", self.token, method));
        let http_method = if args.is_empty() { Method::Get } else { Method::Post };
        let force_multipart = false;
        let response = self
            .client
            .request(&url, http_method, args, force_multipart, timeout)
            .await?;
        let body = String::from_utf8(response.body).map_err(|_| ApiError::BodyNotText)?;
        if body.starts_with("<html>") {
            return Err(ApiError::UnexpectedHtml);
        }
        Ok(body)
    }
}
