/*
 * lib.rs
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

//! Telegrafo core: transport layer for a Telegram-style bot API.
//!
//! What lives here: the HTTP/1.1 wire codec (urlencoded and multipart
//! request generation, streaming parse), an outbound client with
//! keep-alive connection pooling over TCP or rustls TLS, an embedded
//! webhook server (TCP or local Unix socket) for push delivery, and the
//! long-poll loop for pull delivery. What deliberately does not: JSON.
//! Domain types and their (de)serialization are the caller's, reached
//! through the `RequestArg` and `UpdateDecoder` seams.

pub mod api;
pub mod config;
pub mod error;
pub mod longpoll;
pub mod net;
pub mod protocol;
pub mod url;
pub mod webhook;

pub use api::{Api, ApiError, Update, UpdateDecoder};
pub use error::TransportError;
pub use longpoll::{LongPoll, LongPollOptions, PollHandle};
pub use protocol::http::{HttpClient, HttpServer, Method, RequestArg};
pub use url::Url;
