//! Types related to SASL authentication which D-Bus performs.


use std::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::utils::{split_once, trim_end};

/// Trace information sent with `ANONYMOUS` authentication.
const ANONYMOUS_TRACE: &[u8] = b"sync-dbus";

/// A GUID sent by the server over SASL.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Guid(Box<str>);

impl Guid {
    /// Get the GUID as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid").field(&self.as_str()).finish()
    }
}

/// A SASL message.
pub(crate) enum SaslRequest<'a> {
    /// The AUTH message.
    Auth(Auth<'a>),
    /// The DATA message, answering a challenge.
    Data(&'a [u8]),
    /// The BEGIN message, after which the binary protocol starts.
    Begin,
}

impl SaslRequest<'_> {
    /// Append the line for this request.
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            SaslRequest::Auth(Auth::External(external)) => {
                buf.extend_from_slice(b"AUTH EXTERNAL ");
                buf.extend_from_slice(external);
            }
            SaslRequest::Auth(Auth::Anonymous) => {
                buf.extend_from_slice(b"AUTH ANONYMOUS ");
                hex_encode(ANONYMOUS_TRACE, buf);
            }
            SaslRequest::Data(data) => {
                buf.extend_from_slice(b"DATA");

                if !data.is_empty() {
                    buf.push(b' ');
                    hex_encode(data, buf);
                }
            }
            SaslRequest::Begin => {
                buf.extend_from_slice(b"BEGIN");
            }
        }

        buf.extend_from_slice(b"\r\n");
    }
}

/// A SASL response from the server.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SaslResponse {
    /// The OK message.
    Ok(Guid),
    /// The REJECTED message, listing supported mechanisms.
    Rejected(Box<str>),
    /// The DATA message, a challenge.
    Data(Box<[u8]>),
    /// The ERROR message.
    Error(Box<str>),
}

impl SaslResponse {
    /// Parse a single line received from the server.
    pub(crate) fn parse(line: &[u8]) -> Result<Self> {
        let line = trim_end(line);
        let (command, rest) = split_once(line, b' ').unwrap_or((line, &[]));

        match command {
            b"OK" if !rest.is_empty() => Ok(SaslResponse::Ok(Guid(lossy(rest)))),
            b"REJECTED" => Ok(SaslResponse::Rejected(lossy(rest))),
            b"DATA" => Ok(SaslResponse::Data(rest.into())),
            b"ERROR" => Ok(SaslResponse::Error(lossy(rest))),
            _ => Err(Error::new(ErrorKind::InvalidSasl(lossy(line)))),
        }
    }
}

/// The SASL authentication method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Auth<'a> {
    /// EXTERNAL authentication with literal payload.
    External(&'a [u8]),
    /// ANONYMOUS authentication, which the bus must be configured to allow.
    Anonymous,
}

impl<'a> Auth<'a> {
    /// Construct external authentication from the uid of the current process.
    #[cfg(all(unix, feature = "libc"))]
    pub fn external_from_uid(buf: &'a mut [u8; 32]) -> Auth<'a> {
        // SAFETY: getuid is always successful and has no side effects.
        let id = unsafe { libc::getuid() };
        Self::external_from_u32_ascii_hex(buf, id)
    }

    /// Construct an external authentication from a u32.
    ///
    /// The payload is the decimal representation of the id, hex encoded.
    pub fn external_from_u32_ascii_hex(buf: &'a mut [u8; 32], mut id: u32) -> Auth<'a> {
        const HEX: [u8; 16] = *b"0123456789abcdef";

        let mut n = 0;

        if id == 0 {
            buf[0] = b'0';
            buf[1] = b'3';
            n = 2;
        } else {
            while id > 0 {
                let byte = (id % 10) as u8 + b'0';
                buf[n] = HEX[(byte & 0xf) as usize];
                n += 1;
                buf[n] = HEX[(byte >> 4) as usize];
                n += 1;
                id /= 10;
            }
        }

        buf[..n].reverse();
        Auth::External(&buf[..n])
    }
}

fn hex_encode(bytes: &[u8], buf: &mut Vec<u8>) {
    const HEX: [u8; 16] = *b"0123456789abcdef";

    for &b in bytes {
        buf.push(HEX[(b >> 4) as usize]);
        buf.push(HEX[(b & 0xf) as usize]);
    }
}

fn lossy(bytes: &[u8]) -> Box<str> {
    String::from_utf8_lossy(bytes).into()
}
