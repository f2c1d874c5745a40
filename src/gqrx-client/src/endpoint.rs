// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Parsing of `host[:port]` receiver addresses.

use std::fmt;

use gqrx_protocol::DEFAULT_PORT;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_addr())
    }
}

/// Parse a receiver URL: `host`, `host:port`, `tcp://host:port` or `[v6]:port`.
/// The port defaults to 7356.
pub fn parse_endpoint(url: &str) -> Result<Endpoint, String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("receiver url is empty".into());
    }

    let addr = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
    let addr = addr.strip_suffix('/').unwrap_or(addr);

    parse_host_port(addr)
}

fn parse_host_port(input: &str) -> Result<Endpoint, String> {
    if let Some(rest) = input.strip_prefix('[') {
        let closing = rest
            .find(']')
            .ok_or("invalid receiver url: missing closing ']' for IPv6 host")?;
        let host = &rest[..closing];
        let remainder = &rest[closing + 1..];
        if host.is_empty() {
            return Err("invalid receiver url: host is empty".into());
        }
        let port = if remainder.is_empty() {
            DEFAULT_PORT
        } else if let Some(port_str) = remainder.strip_prefix(':') {
            parse_port(port_str)?
        } else {
            return Err("invalid receiver url: expected ':<port>' after ']'".into());
        };
        return Ok(Endpoint {
            host: host.to_string(),
            port,
        });
    }

    if input.contains(':') {
        if input.matches(':').count() > 1 {
            return Err("invalid receiver url: IPv6 host must be bracketed like [::1]:7356".into());
        }
        let (host, port_str) = input
            .rsplit_once(':')
            .ok_or("invalid receiver url: expected host:port")?;
        if host.is_empty() {
            return Err("invalid receiver url: host is empty".into());
        }
        return Ok(Endpoint {
            host: host.to_string(),
            port: parse_port(port_str)?,
        });
    }

    Ok(Endpoint {
        host: input.to_string(),
        port: DEFAULT_PORT,
    })
}

fn parse_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str
        .parse()
        .map_err(|_| format!("invalid receiver port: '{port_str}'"))?;
    if port == 0 {
        return Err("invalid receiver port: 0".into());
    }
    Ok(port)
}
