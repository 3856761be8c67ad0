/*
 * url.rs
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

//! Absolute URL parsing: scheme://host[:port]/path. Only the pieces the
//! transport needs (scheme, host, port, path); query strings stay attached
//! to the path so the request line carries them verbatim.

use crate::error::TransportError;

/// Parsed absolute URL. `secure()` is true for the https scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Url {
    /// Parse `scheme://host[:port]/path`. Port defaults to 80 for http and
    /// 443 for https; other schemes must carry an explicit port. Path
    /// defaults to "/".
    pub fn parse(s: &str) -> Result<Self, TransportError> {
        let sep = s
            .find("://")
            .ok_or_else(|| TransportError::MalformedUrl(s.to_string()))?;
        let scheme = &s[..sep];
        if scheme.is_empty() {
            return Err(TransportError::MalformedUrl(s.to_string()));
        }
        let rest = &s[sep + 3..];
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rfind(':') {
            Some(i) => {
                let port = authority[i + 1..]
                    .parse::<u16>()
                    .map_err(|_| TransportError::MalformedUrl(s.to_string()))?;
                (&authority[..i], port)
            }
            None => {
                let port = match scheme {
                    "http" => 80,
                    "https" => 443,
                    _ => return Err(TransportError::MalformedUrl(s.to_string())),
                };
                (authority, port)
            }
        };
        if host.is_empty() {
            return Err(TransportError::MalformedUrl(s.to_string()));
        }
        Ok(Url {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// True when the scheme is https (TLS connection required).
    pub fn secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Same authority, different path. Used to address individual API
    /// methods below one base URL.
    pub fn with_path(&self, path: impl Into<String>) -> Url {
        Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path: path.into(),
        }
    }
}
