/*
 * config.rs
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

//! Bot configuration: API endpoint, token, webhook bind, poll tuning,
//! loaded from ~/.telegrafo/config.xml. All XML reading uses the
//! quick_xml parser; no regex or hand parsing.
//!
//! ```xml
//! <config>
//!   <api url="https://api.telegram.org"/>
//!   <token>123456:ABC-DEF</token>
//!   <webhook host="0.0.0.0" port="8443" path="/hook"/>
//!   <!-- or: <webhook socket="/run/telegrafo.sock" path="/hook"/> -->
//!   <poll limit="100" timeout="30"/>
//! </config>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Default API root when the config omits the <api> element.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const DEFAULT_POLL_LIMIT: u32 = 100;
const DEFAULT_POLL_TIMEOUT_SECS: u32 = 30;

/// Where the webhook server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookBind {
    Tcp { host: String, port: u16 },
    Local { socket: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub bind: WebhookBind,
    /// URL path deliveries arrive on.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub limit: u32,
    pub timeout_secs: u32,
}

/// Loaded bot configuration. Webhook section is optional (pull-mode bots
/// have none); poll settings always carry defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub api_url: String,
    pub token: String,
    pub webhook: Option<WebhookConfig>,
    pub poll: PollConfig,
}

/// ~/.telegrafo (HOME-based; None when HOME is unset).
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".telegrafo"))
}

/// ~/.telegrafo/config.xml
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.xml"))
}

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<BotConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    parse_config_str(&content)
}

fn attr_string(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn attr_number<T: std::str::FromStr>(
    e: &quick_xml::events::BytesStart<'_>,
    name: &[u8],
    context: &str,
) -> Result<Option<T>, String> {
    match attr_string(e, name) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("invalid {} attribute: {}", context, v)),
        None => Ok(None),
    }
}

/// Parse config XML from a string. Missing <api> and <poll> fall back to
/// defaults; a missing or empty <token> is an error.
pub fn parse_config_str(content: &str) -> Result<BotConfig, String> {
    let mut reader = Reader::from_str(content);

    let mut api_url = DEFAULT_API_URL.to_string();
    let mut token = String::new();
    let mut webhook: Option<WebhookConfig> = None;
    let mut poll = PollConfig {
        limit: DEFAULT_POLL_LIMIT,
        timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
    };
    let mut in_token = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"api" => {
                    if let Some(url) = attr_string(e, b"url") {
                        api_url = url;
                    }
                }
                b"token" => in_token = true,
                b"webhook" => {
                    let path = attr_string(e, b"path").unwrap_or_else(|| "/".to_string());
                    let bind = if let Some(socket) = attr_string(e, b"socket") {
                        WebhookBind::Local {
                            socket: PathBuf::from(socket),
                        }
                    } else {
                        let host = attr_string(e, b"host")
                            .unwrap_or_else(|| "127.0.0.1".to_string());
                        let port = attr_number::<u16>(e, b"port", "webhook port")?
                            .ok_or_else(|| "webhook element needs a port or socket".to_string())?;
                        WebhookBind::Tcp { host, port }
                    };
                    webhook = Some(WebhookConfig { bind, path });
                }
                b"poll" => {
                    if let Some(limit) = attr_number::<u32>(e, b"limit", "poll limit")? {
                        poll.limit = limit;
                    }
                    if let Some(timeout) = attr_number::<u32>(e, b"timeout", "poll timeout")? {
                        poll.timeout_secs = timeout;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_token => {
                let text = t
                    .unescape()
                    .map_err(|e| format!("config parse error: {}", e))?;
                token = text.trim().to_string();
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"token" => in_token = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("config parse error: {}", e)),
            _ => {}
        }
    }

    if token.is_empty() {
        return Err("config has no <token>".to_string());
    }
    Ok(BotConfig {
        api_url,
        token,
        webhook,
        poll,
    })
}
