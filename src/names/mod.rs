//! Validation of the names used in message headers.
//!
//! See the [naming rules] of the D-Bus specification.
//!
//! [naming rules]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-names

use crate::error::{Error, ErrorKind, Result};

#[cfg(test)]
mod tests;

/// Maximum length of any name.
const MAX_NAME_LENGTH: usize = 255;

/// Validate an interface name, such as `org.freedesktop.DBus`.
pub(crate) fn validate_interface(name: &str) -> Result<()> {
    check("interface", name, is_dotted(name, false))
}

/// Validate an error name, which follows the rules of interface names.
pub(crate) fn validate_error_name(name: &str) -> Result<()> {
    check("error", name, is_dotted(name, false))
}

/// Validate a member name, such as `Hello`.
pub(crate) fn validate_member(name: &str) -> Result<()> {
    check("member", name, is_element(name, false))
}

/// Validate a bus name, either unique (`:1.42`) or well-known
/// (`org.freedesktop.DBus`).
pub(crate) fn validate_bus_name(name: &str) -> Result<()> {
    let valid = match name.strip_prefix(':') {
        Some(rest) => rest.split('.').count() >= 2 && rest.split('.').all(is_unique_element),
        None => is_dotted(name, true),
    };

    check("bus", name, valid)
}

fn check(kind: &'static str, name: &str, valid: bool) -> Result<()> {
    if valid && name.len() <= MAX_NAME_LENGTH {
        return Ok(());
    }

    Err(Error::new(ErrorKind::InvalidName {
        kind,
        name: name.into(),
    }))
}

/// At least two elements separated by periods.
fn is_dotted(name: &str, dash: bool) -> bool {
    let mut count = 0;

    for element in name.split('.') {
        if !is_element(element, dash) {
            return false;
        }

        count += 1;
    }

    count >= 2
}

fn is_element(element: &str, dash: bool) -> bool {
    let mut bytes = element.bytes();

    let Some(first) = bytes.next() else {
        return false;
    };

    if first.is_ascii_digit() || !is_name_byte(first, dash) {
        return false;
    }

    bytes.all(|b| is_name_byte(b, dash))
}

/// Elements of unique names may start with a digit.
fn is_unique_element(element: &str) -> bool {
    !element.is_empty() && element.bytes().all(|b| is_name_byte(b, true))
}

#[inline]
fn is_name_byte(b: u8, dash: bool) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || (dash && b == b'-')
}
