/*
 * mod.rs
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

//! HTTP/1.1 transport: wire codec, outbound client with keep-alive pool,
//! inbound server for push delivery.
//!
//! - Codec: stateless build/parse functions (urlencoded and multipart
//!   bodies, fixed header order, Content-Length framing only; no chunked
//!   transfer, no HTTP/2).
//! - Client: one pooled connection per (host, port, secure), retry-once
//!   on stale keep-alive sockets, rustls for https.
//! - Server: TCP or local Unix-socket bind, one task per connection.

pub mod args;
pub mod client;
pub mod codec;
pub mod connection;
pub mod server;

pub use args::RequestArg;
pub use client::{ClientOptions, HttpClient};
pub use codec::{Headers, Method, ParsedRequest, ParsedResponse};
pub use connection::{HttpConnection, HttpStream};
pub use server::{HttpServer, RequestHandler, ServerHandle};
