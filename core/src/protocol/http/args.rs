/*
 * args.rs
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

//! Request arguments: a named value that is either inline text or a file
//! attachment (payload + MIME type + file name). Built immediately before
//! one request and not reused.

use std::io;
use std::path::Path;

/// One named argument of an outbound API request.
///
/// Text arguments are UTF-8 and get percent-encoded into urlencoded bodies;
/// file arguments are opaque byte blobs and force multipart encoding.
#[derive(Debug, Clone)]
pub struct RequestArg {
    pub name: String,
    pub value: Vec<u8>,
    pub is_file: bool,
    pub mime_type: String,
    pub file_name: String,
}

impl RequestArg {
    /// Inline text argument.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into().into_bytes(),
            is_file: false,
            mime_type: String::new(),
            file_name: String::new(),
        }
    }

    /// File attachment argument. MIME type defaults to
    /// application/octet-stream and the file name to empty; refine with
    /// `with_mime_type` / `with_file_name`.
    pub fn file(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
            is_file: true,
            mime_type: "application/octet-stream".to_string(),
            file_name: String::new(),
        }
    }

    /// File attachment read from disk. The file name is the final path
    /// component.
    pub fn file_from_path(name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let value = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::file(name, value).with_file_name(file_name))
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Value as text. Text arguments are constructed from String and always
    /// valid UTF-8; file payloads go through lossy conversion (only used in
    /// diagnostics).
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}
