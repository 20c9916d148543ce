//! Parsing of D-Bus server addresses, such as
//! `unix:path=/run/user/1000/bus;unix:abstract=/tmp/dbus-XXXX`.

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use crate::error::{Error, ErrorKind, Result};

/// A single connectable server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Address {
    /// A unix socket in the filesystem, `unix:path=`.
    Unix(PathBuf),
    /// A unix socket in the abstract namespace, `unix:abstract=`.
    Abstract(Vec<u8>),
}

impl Address {
    /// Connect a blocking stream to the address.
    pub(crate) fn connect(&self) -> io::Result<UnixStream> {
        match self {
            Address::Unix(path) => UnixStream::connect(path),
            Address::Abstract(name) => connect_abstract(name),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unix(path) => write!(f, "unix:path={}", path.display()),
            Address::Abstract(name) => {
                write!(f, "unix:abstract={}", String::from_utf8_lossy(name))
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn connect_abstract(name: &[u8]) -> io::Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let address = SocketAddr::from_abstract_name(name)?;
    UnixStream::connect_addr(&address)
}

#[cfg(not(target_os = "linux"))]
fn connect_abstract(_: &[u8]) -> io::Result<UnixStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract unix sockets are only supported on Linux",
    ))
}

/// Parse every supported address out of a `;` separated address list, in
/// order.
///
/// # Errors
///
/// Errors if the string is syntactically invalid or if it contains no
/// address with a supported transport.
pub(crate) fn parse(string: &str) -> Result<Vec<Address>> {
    let mut addresses = Vec::new();

    for entry in string.split(';').filter(|entry| !entry.is_empty()) {
        let Some((transport, rest)) = entry.split_once(':') else {
            return Err(invalid(string));
        };

        let mut path = None;
        let mut abstract_name = None;

        for pair in rest.split(',').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(invalid(string));
            };

            let value = unescape(value).ok_or_else(|| invalid(string))?;

            match key {
                "path" => path = Some(value),
                "abstract" => abstract_name = Some(value),
                _ => {}
            }
        }

        if transport != "unix" {
            tracing::debug!(transport, "skipping unsupported transport");
            continue;
        }

        let address = match (path, abstract_name) {
            (Some(path), None) => Address::Unix(PathBuf::from(OsString::from_vec(path))),
            (None, Some(name)) => Address::Abstract(name),
            (None, None) => {
                // Listening addresses like `unix:tmpdir=` can't be connected to.
                tracing::debug!(entry, "skipping unix address without a socket");
                continue;
            }
            (Some(..), Some(..)) => return Err(invalid(string)),
        };

        addresses.push(address);
    }

    if addresses.is_empty() {
        return Err(Error::new(ErrorKind::UnsupportedAddress(string.into())));
    }

    Ok(addresses)
}

/// Format a filesystem path as a `unix:path=` address, escaping every byte
/// outside of the optionally-escaped set.
pub(crate) fn unix_path(path: &[u8]) -> String {
    const HEX: [u8; 16] = *b"0123456789abcdef";

    let mut out = String::from("unix:path=");

    for &b in path {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'/' | b'.' | b'\\' | b'*') {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[(b >> 4) as usize]));
            out.push(char::from(HEX[(b & 0xf) as usize]));
        }
    }

    out
}

fn invalid(string: &str) -> Error {
    Error::new(ErrorKind::InvalidAddress(string.into()))
}

/// Decode `%xx` escapes in an address value.
fn unescape(value: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();

    while let Some(b) = bytes.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }

        let hi = hex_value(bytes.next()?)?;
        let lo = hex_value(bytes.next()?)?;
        out.push((hi << 4) | lo);
    }

    Some(out)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
