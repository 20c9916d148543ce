use std::error;
use std::fmt;

use crate::{Message, Value};

/// An error reply sent by the peer of a call.
///
/// # Examples
///
/// ```
/// use sync_dbus::{Message, RemoteError, Serial};
///
/// let serial = Serial::new(1).unwrap();
///
/// let m = Message::error("org.freedesktop.DBus.Error.UnknownMethod", serial)
///     .with_argument("No such method")?;
///
/// let error = RemoteError::from_message(m);
/// assert_eq!(error.name(), "org.freedesktop.DBus.Error.UnknownMethod");
/// assert_eq!(error.message(), Some("No such method"));
/// assert_eq!(
///     error.to_string(),
///     "org.freedesktop.DBus.Error.UnknownMethod: No such method"
/// );
/// # Ok::<_, sync_dbus::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    name: Box<str>,
    message: Option<Box<str>>,
    arguments: Vec<Value>,
}

impl RemoteError {
    /// Construct a remote error out of an error message.
    ///
    /// The detail message is the first argument, if it is a string. Messages
    /// which are not errors produce an error with an empty name.
    pub fn from_message(message: Message) -> Self {
        let name = message.error_name().unwrap_or_default().into();
        let arguments = message.into_body();

        let message = arguments
            .first()
            .and_then(Value::as_str)
            .map(Box::from);

        Self {
            name,
            message,
            arguments,
        }
    }

    /// The error name, like `org.freedesktop.DBus.Error.ServiceUnknown`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human readable detail message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Every argument of the error reply, including the detail message.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.name, message),
            None => self.name.fmt(f),
        }
    }
}

impl error::Error for RemoteError {}
