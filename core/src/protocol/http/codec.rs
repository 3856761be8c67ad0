/*
 * codec.rs
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

//! HTTP/1.1 wire codec: stateless build and parse functions.
//!
//! Generation: urlencoded and multipart request bodies from argument lists,
//! full requests with a fixed header order (Host, Connection, Content-Type,
//! Content-Length), plain-text responses. Parsing: strict one-message parse
//! plus incremental `try_parse_*` entry points for socket read loops.
//! Chunked transfer encoding is not supported and is rejected at parse time.

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::TransportError;
use crate::protocol::http::args::RequestArg;
use crate::url::Url;

/// Percent-encoding set for urlencoded bodies: everything except the
/// unreserved characters A-Za-z0-9 _ . - ~ is escaped (space becomes %20).
const FORM_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Length of generated multipart boundary tokens.
const BOUNDARY_LEN: usize = 32;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

/// Ordered header map. Names are stored lower-cased; lookup is by
/// lower-cased name, insertion order is preserved.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, name: &str, value: &str) {
        self.entries
            .push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed inbound request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Path without any query string, for route matching.
    pub fn path_without_query(&self) -> &str {
        match self.path.find('?') {
            Some(i) => &self.path[..i],
            None => &self.path,
        }
    }
}

/// A parsed inbound response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    /// True unless the peer asked to drop the connection.
    pub fn keep_alive(&self) -> bool {
        !matches!(self.headers.get("connection"), Some(v) if v.eq_ignore_ascii_case("close"))
    }
}

// ── Generation ───────────────────────────────────────────────────────

/// Percent-encode one value with the standard unreserved set.
pub fn url_encode(value: &str) -> String {
    percent_encode(value.as_bytes(), FORM_ENCODE).to_string()
}

/// Percent-encode with caller-declared additional legitimate characters
/// left unescaped (beyond A-Za-z0-9 _ . - ~).
pub fn url_encode_with(value: &str, additional: &str) -> String {
    if additional.is_empty() {
        return url_encode(value);
    }
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        let legit = b.is_ascii_alphanumeric()
            || matches!(b, b'_' | b'.' | b'-' | b'~')
            || additional.as_bytes().contains(&b);
        if legit {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// `name=value&name=value...` with percent-encoded values, preserving
/// argument order. Empty argument list yields an empty string.
pub fn build_www_form_urlencoded(args: &[RequestArg]) -> String {
    let mut out = String::new();
    for arg in args {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&arg.name);
        out.push('=');
        out.push_str(&percent_encode(&arg.value, FORM_ENCODE).to_string());
    }
    out
}

/// True when `candidate` occurs inside any argument's raw value.
fn boundary_collides(args: &[RequestArg], candidate: &str) -> bool {
    let needle = candidate.as_bytes();
    args.iter().any(|arg| {
        arg.value
            .windows(needle.len())
            .any(|window| window == needle)
    })
}

/// Generate a multipart boundary: a random alphanumeric token that does not
/// occur as a substring of any argument value. A boundary colliding with
/// part content would corrupt the message, so every candidate is checked
/// against all payloads and regenerated on collision.
pub fn generate_boundary(args: &[RequestArg]) -> String {
    loop {
        let candidate: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect();
        if !boundary_collides(args, &candidate) {
            return candidate;
        }
    }
}

/// multipart/form-data body. Each part: `--boundary`, a Content-Disposition
/// line (plus filename and Content-Type for file arguments), blank line,
/// raw value. Terminated with `--boundary--`.
pub fn build_multipart_form_data(args: &[RequestArg], boundary: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for arg in args {
        out.extend_from_slice(b"--");
        out.extend_from_slice(boundary.as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(b"Content-Disposition: form-data; name=\"");
        out.extend_from_slice(arg.name.as_bytes());
        out.extend_from_slice(b"\"");
        if arg.is_file {
            out.extend_from_slice(b"; filename=\"");
            out.extend_from_slice(arg.file_name.as_bytes());
            out.extend_from_slice(b"\"");
        }
        out.extend_from_slice(b"\r\n");
        if arg.is_file {
            out.extend_from_slice(b"Content-Type: ");
            out.extend_from_slice(arg.mime_type.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&arg.value);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--\r\n");
    out
}

/// Build a full request. Multipart encoding is chosen when forced or when
/// any argument is a file; otherwise the body is urlencoded. Header order
/// is fixed: Host, Connection, Content-Type, Content-Length. No trailing
/// CRLF after the body.
pub fn build_request(
    method: Method,
    url: &Url,
    args: &[RequestArg],
    force_multipart: bool,
) -> Vec<u8> {
    let multipart = force_multipart || args.iter().any(|a| a.is_file);
    let (content_type, body) = if multipart {
        let boundary = generate_boundary(args);
        let body = build_multipart_form_data(args, &boundary);
        (format!("multipart/form-data; boundary={}", boundary), body)
    } else {
        (
            "application/x-www-form-urlencoded".to_string(),
            build_www_form_urlencoded(args).into_bytes(),
        )
    };

    let mut out = Vec::with_capacity(body.len() + 256);
    out.extend_from_slice(method.as_str().as_bytes());
    out.extend_from_slice(b" ");
    out.extend_from_slice(url.path.as_bytes());
    out.extend_from_slice(b" HTTP/1.1\r\nHost: ");
    out.extend_from_slice(url.host.as_bytes());
    out.extend_from_slice(b"\r\nConnection: keep-alive\r\nContent-Type: ");
    out.extend_from_slice(content_type.as_bytes());
    out.extend_from_slice(b"\r\nContent-Length: ");
    out.extend_from_slice(body.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n\r\n");
    out.extend_from_slice(&body);
    out
}

/// Reason phrase for the status codes this server emits.
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Plain-text 200 response.
pub fn build_response(body: &str) -> String {
    build_response_with(200, "text/plain", body)
}

/// Response with explicit status and content type.
pub fn build_response_with(status: u16, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        status,
        reason_phrase(status),
        content_type,
        body.len(),
        body
    )
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Index just past the `\r\n\r\n` separating headers from body, if present.
fn find_body_start(raw: &[u8]) -> Option<usize> {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
}

/// Parse the header block (start line excluded) into a Headers map.
/// Lines without a colon are ignored, as on the wire they carry nothing.
fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Headers {
    let mut headers = Headers::new();
    for line in lines {
        if let Some(colon) = line.find(':') {
            headers.push(&line[..colon], &line[colon + 1..]);
        }
    }
    headers
}

/// Shared head parsing: header-block text, start line, headers, body
/// framing checks. Returns (start_line, headers, body_start).
fn parse_head(raw: &[u8]) -> Result<Option<(String, Headers, usize)>, TransportError> {
    let body_start = match find_body_start(raw) {
        Some(i) => i,
        None => return Ok(None),
    };
    let head = std::str::from_utf8(&raw[..body_start - 4])
        .map_err(|_| TransportError::MalformedMessage("header block is not UTF-8".into()))?;
    let mut lines = head.split("\r\n");
    let start_line = lines
        .next()
        .unwrap_or_default()
        .to_string();
    let headers = parse_header_lines(lines);
    if let Some(te) = headers.get("transfer-encoding") {
        if te.to_ascii_lowercase().contains("chunked") {
            return Err(TransportError::MalformedMessage(
                "chunked transfer encoding not supported".into(),
            ));
        }
    }
    Ok(Some((start_line, headers, body_start)))
}

/// Declared Content-Length, if any. A malformed value is a protocol error.
fn content_length(headers: &Headers) -> Result<Option<usize>, TransportError> {
    match headers.get("content-length") {
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|_| TransportError::MalformedMessage("invalid Content-Length".into())),
        None => Ok(None),
    }
}

/// Incremental request parse for server read loops. `Ok(None)` means more
/// bytes are needed; on success the number of consumed bytes is returned so
/// keep-alive connections can leave pipelined data in the buffer. A request
/// without Content-Length has a zero-length body.
pub fn try_parse_request(buf: &[u8]) -> Result<Option<(ParsedRequest, usize)>, TransportError> {
    let (start_line, headers, body_start) = match parse_head(buf)? {
        Some(head) => head,
        None => return Ok(None),
    };
    let mut parts = start_line.splitn(3, ' ');
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let version = parts.next().unwrap_or_default().to_string();
    if method.is_empty() || path.is_empty() || version.is_empty() {
        return Err(TransportError::MalformedMessage(format!(
            "bad request line: {}",
            start_line
        )));
    }
    let body_len = content_length(&headers)?.unwrap_or(0);
    if buf.len() < body_start + body_len {
        return Ok(None);
    }
    let body = buf[body_start..body_start + body_len].to_vec();
    Ok(Some((
        ParsedRequest {
            method,
            path,
            version,
            headers,
            body,
        },
        body_start + body_len,
    )))
}

/// Strict parse of one complete request. Missing bytes (no blank line yet,
/// or a body shorter than the declared Content-Length) are a
/// TruncatedMessage.
pub fn parse_request(raw: &[u8]) -> Result<ParsedRequest, TransportError> {
    match try_parse_request(raw)? {
        Some((req, _consumed)) => Ok(req),
        None => Err(TransportError::TruncatedMessage),
    }
}

/// Incremental response parse for client read loops. `Ok(None)` means more
/// bytes are needed. A response without Content-Length is delimited by
/// connection close and can only be finished by `parse_response` once EOF
/// is seen.
pub fn try_parse_response(buf: &[u8]) -> Result<Option<(ParsedResponse, usize)>, TransportError> {
    let (start_line, headers, body_start) = match parse_head(buf)? {
        Some(head) => head,
        None => return Ok(None),
    };
    let (version, status, reason) = parse_status_line(&start_line)?;
    let body_len = match content_length(&headers)? {
        Some(n) => n,
        // Close-delimited body: completeness is unknowable here.
        None => return Ok(None),
    };
    if buf.len() < body_start + body_len {
        return Ok(None);
    }
    let body = buf[body_start..body_start + body_len].to_vec();
    Ok(Some((
        ParsedResponse {
            version,
            status,
            reason,
            headers,
            body,
        },
        body_start + body_len,
    )))
}

/// Strict parse of one complete response. Without Content-Length the body
/// is everything after the blank line (the connection-close delimiter has
/// already been observed by the caller).
pub fn parse_response(raw: &[u8]) -> Result<ParsedResponse, TransportError> {
    let (start_line, headers, body_start) = match parse_head(raw)? {
        Some(head) => head,
        None => return Err(TransportError::TruncatedMessage),
    };
    let (version, status, reason) = parse_status_line(&start_line)?;
    let body = match content_length(&headers)? {
        Some(n) => {
            if raw.len() < body_start + n {
                return Err(TransportError::TruncatedMessage);
            }
            raw[body_start..body_start + n].to_vec()
        }
        None => raw[body_start..].to_vec(),
    };
    Ok(ParsedResponse {
        version,
        status,
        reason,
        headers,
        body,
    })
}

fn parse_status_line(line: &str) -> Result<(String, u16, String), TransportError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| TransportError::MalformedMessage(format!("bad status line: {}", line)))?;
    let reason = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TransportError::MalformedMessage(format!(
            "bad status line: {}",
            line
        )));
    }
    Ok((version.to_string(), status, reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_text_args() -> Vec<RequestArg> {
        vec![
            RequestArg::text("email", "test@example.com"),
            RequestArg::text("text", "Hello, world!"),
        ]
    }

    #[test]
    fn www_form_urlencoded() {
        let body = build_www_form_urlencoded(&email_text_args());
        assert_eq!(body, "email=test%40example.com&text=Hello%2C%20world%21");
        assert_eq!(build_www_form_urlencoded(&[]), "");
    }

    #[test]
    fn url_encode_additional_chars() {
        assert_eq!(url_encode("a b:c"), "a%20b%3Ac");
        assert_eq!(url_encode_with("a b:c", ":"), "a%20b:c");
    }

    #[test]
    fn request_generation() {
        let url = Url::parse("http://example.com/index.html").unwrap();
        let t = build_request(Method::Post, &url, &email_text_args(), false);
        let e = "POST /index.html HTTP/1.1\r\n\
                 Host: example.com\r\n\
                 Connection: keep-alive\r\n\
                 Content-Type: application/x-www-form-urlencoded\r\n\
                 Content-Length: 49\r\n\
                 \r\n\
                 email=test%40example.com&text=Hello%2C%20world%21";
        assert_eq!(String::from_utf8(t).unwrap(), e);
    }

    #[test]
    fn multipart_form_data() {
        let args = vec![
            RequestArg::text("email", "test@example.com"),
            RequestArg::file("text", b"Hello, world!".to_vec()).with_mime_type("text/plain"),
        ];
        let boundary = generate_boundary(&args);
        let t = build_multipart_form_data(&args, &boundary);
        let e = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"email\"\r\n\
             \r\n\
             test@example.com\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"text\"; filename=\"\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             Hello, world!\r\n\
             --{b}--\r\n",
            b = boundary
        );
        assert_eq!(String::from_utf8(t).unwrap(), e);
    }

    #[test]
    fn boundary_collision_detected() {
        let args = vec![RequestArg::file("doc", b"prefix MAGICTOKEN suffix".to_vec())];
        assert!(boundary_collides(&args, "MAGICTOKEN"));
        assert!(!boundary_collides(&args, "absent"));
    }

    #[test]
    fn boundary_never_inside_payload() {
        // Payload saturated with alphanumerics; the generator must still
        // come back with a token absent from every value.
        let mut payload = Vec::new();
        for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
            payload.extend(std::iter::repeat(c as u8).take(64));
        }
        let args = vec![
            RequestArg::file("blob", payload),
            RequestArg::text("note", "abcdefghijklmnopqrstuvwxyz0123456789"),
        ];
        for _ in 0..8 {
            let boundary = generate_boundary(&args);
            assert_eq!(boundary.len(), 32);
            assert!(boundary.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(!boundary_collides(&args, &boundary));
        }
    }

    #[test]
    fn response_generation() {
        let t = build_response("testdata");
        assert_eq!(
            t,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 8\r\n\r\ntestdata"
        );
        let t = build_response_with(404, "text/plain", "");
        assert_eq!(
            t,
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn request_parsing() {
        let data = b"POST /index.html HTTP/1.1\r\n\
                     Host: example.com\r\n\
                     Connection: keep-alive\r\n\
                     Content-Type: text/plain\r\n\
                     Content-Length: 8\r\n\
                     \r\n\
                     testdata";
        let req = parse_request(data).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/index.html");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.headers.get("host"), Some("example.com"));
        assert_eq!(req.headers.get("connection"), Some("keep-alive"));
        assert_eq!(req.headers.get("content-type"), Some("text/plain"));
        assert_eq!(req.headers.get("content-length"), Some("8"));
        assert_eq!(req.body, b"testdata");
    }

    #[test]
    fn response_parsing() {
        let data = b"HTTP/1.1 200 OK\r\n\
                     Content-Type: text/plain\r\n\
                     Content-Length: 8\r\n\
                     \r\n\
                     testdata";
        let resp = parse_response(data).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.headers.get("content-type"), Some("text/plain"));
        assert_eq!(resp.headers.get("content-length"), Some("8"));
        assert_eq!(resp.body, b"testdata");
        assert!(resp.keep_alive());
    }

    #[test]
    fn round_trip() {
        let url = Url::parse("https://api.example.org:8443/bot123/sendDocument").unwrap();
        let args = vec![
            RequestArg::text("chat_id", "42"),
            RequestArg::file("document", vec![0u8, 13, 10, 13, 10, 255])
                .with_mime_type("application/octet-stream")
                .with_file_name("blob.bin"),
        ];
        let raw = build_request(Method::Post, &url, &args, false);
        let req = parse_request(&raw).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/bot123/sendDocument");
        assert_eq!(req.headers.get("host"), Some("api.example.org"));
        assert_eq!(req.headers.get("connection"), Some("keep-alive"));
        assert_eq!(
            req.headers.get("content-length").unwrap().parse::<usize>().unwrap(),
            req.body.len()
        );
        // Body survives byte for byte, binary content included.
        let expected_body = &raw[raw.len() - req.body.len()..];
        assert_eq!(req.body, expected_body);
    }

    #[test]
    fn incremental_request_parse() {
        let data: &[u8] = b"POST /hook HTTP/1.1\r\nContent-Length: 4\r\n\r\nbodyEXTRA";
        assert!(try_parse_request(&data[..10]).unwrap().is_none());
        assert!(try_parse_request(&data[..data.len() - 6]).unwrap().is_none());
        let (req, consumed) = try_parse_request(data).unwrap().unwrap();
        assert_eq!(req.body, b"body");
        assert_eq!(&data[consumed..], b"EXTRA");
    }

    #[test]
    fn request_without_length_has_empty_body() {
        let data = b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, consumed) = try_parse_request(data).unwrap().unwrap();
        assert!(req.body.is_empty());
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn truncated_and_malformed() {
        assert!(matches!(
            parse_request(b"POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort"),
            Err(TransportError::TruncatedMessage)
        ));
        assert!(matches!(
            parse_request(b"NOTAREQUEST\r\n\r\n"),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            parse_response(b"HTTP/1.1 abc OK\r\n\r\n"),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n"),
            Err(TransportError::MalformedMessage(_))
        ));
    }

    #[test]
    fn close_delimited_response() {
        let data = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\npartial body";
        // Incremental parse cannot finish without a length...
        assert!(try_parse_response(data).unwrap().is_none());
        // ...but the strict parse at EOF takes the remainder as body.
        let resp = parse_response(data).unwrap();
        assert_eq!(resp.body, b"partial body");
        assert!(!resp.keep_alive());
    }

    #[test]
    fn path_without_query() {
        let data = b"GET /hook?secret=1 HTTP/1.1\r\n\r\n";
        let (req, _) = try_parse_request(data).unwrap().unwrap();
        assert_eq!(req.path, "/hook?secret=1");
        assert_eq!(req.path_without_query(), "/hook");
    }
}
