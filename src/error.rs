use std::io;
use std::str::Utf8Error;
use std::time::Duration;

use crate::connection::TransportState;
use crate::{ObjectPathError, RemoteError, Serial, SignatureError};

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
///
/// Use [`Error::category`] to classify it and [`Error::remote`] to access the
/// error reply sent by a peer.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error {
    #[from]
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Classify the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Category, Message};
    ///
    /// let error = Message::new_method_call("org.example", "/", "org.example.Iface", "1nvalid")
    ///     .unwrap_err();
    /// assert_eq!(error.category(), Category::InvalidArgument);
    /// ```
    pub fn category(&self) -> Category {
        match &self.kind {
            ErrorKind::Signature(..)
            | ErrorKind::ObjectPath(..)
            | ErrorKind::InvalidName { .. }
            | ErrorKind::StringContainsNul
            | ErrorKind::StructHasNoFields
            | ErrorKind::ValueTooDeep
            | ErrorKind::ArrayElementMismatch { .. }
            | ErrorKind::InvalidArrayElement(..)
            | ErrorKind::DictKeyMustBeBasic(..)
            | ErrorKind::DictEntryNotInsideArray
            | ErrorKind::ArrayTooLong(..)
            | ErrorKind::MessageTooLong(..)
            | ErrorKind::MissingSerial
            | ErrorKind::NotMethodCall
            | ErrorKind::NoReplyExpected
            | ErrorKind::CallFinished => Category::InvalidArgument,
            ErrorKind::InvalidEndianness(..)
            | ErrorKind::InvalidProtocolVersion(..)
            | ErrorKind::InvalidMessageType(..)
            | ErrorKind::ZeroSerial
            | ErrorKind::ZeroReplySerial
            | ErrorKind::MissingPath
            | ErrorKind::MissingMember
            | ErrorKind::MissingInterface
            | ErrorKind::MissingErrorName
            | ErrorKind::MissingReplySerial
            | ErrorKind::InvalidHeaderField { .. }
            | ErrorKind::HeaderLengthMismatch { .. }
            | ErrorKind::BodyLengthMismatch { .. }
            | ErrorKind::ArrayLengthMismatch { .. }
            | ErrorKind::NoDecodeRule(..)
            | ErrorKind::NonZeroPadding { .. }
            | ErrorKind::BufferUnderflow
            | ErrorKind::InvalidBoolean(..)
            | ErrorKind::NotNullTerminated
            | ErrorKind::EmbeddedNul
            | ErrorKind::Utf8(..)
            | ErrorKind::MalformedSignature(..)
            | ErrorKind::MalformedObjectPath(..)
            | ErrorKind::VariantNotSingleType(..)
            | ErrorKind::NestingTooDeep
            | ErrorKind::ArrayTooLongOnWire(..)
            | ErrorKind::MessageTooLongOnWire(..)
            | ErrorKind::UnexpectedReply { .. } => Category::MalformedMessage,
            ErrorKind::MissingBus(..)
            | ErrorKind::InvalidAddress(..)
            | ErrorKind::UnsupportedAddress(..)
            | ErrorKind::Connect(..)
            | ErrorKind::AuthRejected(..)
            | ErrorKind::AuthError(..)
            | ErrorKind::InvalidSasl(..)
            | ErrorKind::UidUnavailable
            | ErrorKind::HelloRejected(..)
            | ErrorKind::InvalidState(..) => Category::ConnectionError,
            ErrorKind::Io(..) | ErrorKind::UnexpectedEof | ErrorKind::Closed => {
                Category::ConnectionClosed
            }
            ErrorKind::Remote(..) => Category::RemoteError,
            ErrorKind::TimedOut { .. } => Category::TimedOut,
        }
    }

    /// Test if the error leaves the connection it was raised on unusable.
    ///
    /// Callers must open a new connection after a fatal error.
    pub fn is_fatal(&self) -> bool {
        if let ErrorKind::UnexpectedReply { .. } = self.kind {
            return false;
        }

        matches!(
            self.category(),
            Category::MalformedMessage | Category::ConnectionClosed
        )
    }

    /// Test if the error is a timeout waiting for a reply.
    pub fn is_timed_out(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut { .. })
    }

    /// Access the error reply sent by the remote peer, if this is a
    /// [`Category::RemoteError`].
    pub fn remote(&self) -> Option<&RemoteError> {
        match &self.kind {
            ErrorKind::Remote(error) => Some(error),
            _ => None,
        }
    }

    /// Convert into the error reply sent by the remote peer, if this is a
    /// [`Category::RemoteError`].
    pub fn into_remote(self) -> Result<RemoteError, Self> {
        match self.kind {
            ErrorKind::Remote(error) => Ok(error),
            kind => Err(Self::new(kind)),
        }
    }

    /// Errors raised while a connection is being set up are reported as
    /// connection errors, even if they are transport failures.
    pub(crate) fn into_setup_error(self) -> Self {
        match self.kind {
            ErrorKind::Io(error) => Self::new(ErrorKind::Connect(error)),
            ErrorKind::UnexpectedEof | ErrorKind::Closed => Self::new(ErrorKind::Connect(
                io::Error::from(io::ErrorKind::UnexpectedEof),
            )),
            ErrorKind::TimedOut { .. } => {
                Self::new(ErrorKind::Connect(io::Error::from(io::ErrorKind::TimedOut)))
            }
            kind => Self::new(kind),
        }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => Self::new(ErrorKind::UnexpectedEof),
            _ => Self::new(ErrorKind::Io(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8(error))
    }
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Category {
    /// Bad input when constructing or issuing a call. Nothing was sent.
    InvalidArgument,
    /// A received frame could not be decoded. Fatal for the connection.
    MalformedMessage,
    /// The connection could not be set up.
    ConnectionError,
    /// The transport was closed, either by the peer or explicitly. Fatal for
    /// the connection.
    ConnectionClosed,
    /// The peer answered with an error reply.
    RemoteError,
    /// No reply arrived before the deadline.
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorKind {
    #[error(transparent)]
    Signature(SignatureError),
    #[error(transparent)]
    ObjectPath(ObjectPathError),
    #[error("Invalid {kind} name `{name}`")]
    InvalidName { kind: &'static str, name: Box<str> },
    #[error("String contains an embedded nul byte")]
    StringContainsNul,
    #[error("Struct has no fields")]
    StructHasNoFields,
    #[error("Value nests containers more than 64 deep")]
    ValueTooDeep,
    #[error("Array element of type `{actual}` does not match element type `{expected}`")]
    ArrayElementMismatch { expected: Box<str>, actual: Box<str> },
    #[error("Array element type `{0}` is not a single complete type")]
    InvalidArrayElement(Box<str>),
    #[error("Dict entry key of type `{0}` is not a basic type")]
    DictKeyMustBeBasic(Box<str>),
    #[error("Dict entry is not inside of an array")]
    DictEntryNotInsideArray,
    #[error("Array of length {0} is too long (max is 67108864)")]
    ArrayTooLong(usize),
    #[error("Message of length {0} is too long (max is 134217728)")]
    MessageTooLong(usize),
    #[error("Message has no serial assigned")]
    MissingSerial,
    #[error("Only method calls can wait for a reply")]
    NotMethodCall,
    #[error("Method call does not expect a reply")]
    NoReplyExpected,
    #[error("Call has already been performed")]
    CallFinished,
    #[error("Invalid endianness marker {0:#04x}")]
    InvalidEndianness(u8),
    #[error("Unsupported protocol version {0}")]
    InvalidProtocolVersion(u8),
    #[error("Invalid message type {0}")]
    InvalidMessageType(u8),
    #[error("Zero in header serial")]
    ZeroSerial,
    #[error("Zero REPLY_SERIAL header")]
    ZeroReplySerial,
    #[error("Missing required PATH header")]
    MissingPath,
    #[error("Missing required MEMBER header")]
    MissingMember,
    #[error("Missing required INTERFACE header")]
    MissingInterface,
    #[error("Missing required ERROR_NAME header")]
    MissingErrorName,
    #[error("Missing required REPLY_SERIAL header")]
    MissingReplySerial,
    #[error("Header field {code} has unexpected type `{signature}`")]
    InvalidHeaderField { code: u8, signature: Box<str> },
    #[error("Header fields declared {declared} bytes but {consumed} were consumed")]
    HeaderLengthMismatch { declared: usize, consumed: usize },
    #[error("Body declared {declared} bytes but {consumed} were consumed")]
    BodyLengthMismatch { declared: usize, consumed: usize },
    #[error("Array declared {declared} bytes but {consumed} were consumed")]
    ArrayLengthMismatch { declared: usize, consumed: usize },
    #[error("No decode rule for type code `{0}`")]
    NoDecodeRule(char),
    #[error("Non-zero padding byte at offset {offset}")]
    NonZeroPadding { offset: usize },
    #[error("Buffer underflow")]
    BufferUnderflow,
    #[error("Invalid boolean value {0}")]
    InvalidBoolean(u32),
    #[error("String is not null terminated")]
    NotNullTerminated,
    #[error("Received string contains an embedded nul byte")]
    EmbeddedNul,
    #[error(transparent)]
    Utf8(Utf8Error),
    #[error("Received invalid signature: {0}")]
    MalformedSignature(SignatureError),
    #[error("Received invalid object path: {0}")]
    MalformedObjectPath(ObjectPathError),
    #[error("Variant signature `{0}` is not a single complete type")]
    VariantNotSingleType(Box<str>),
    #[error("Containers are nested more than 64 deep")]
    NestingTooDeep,
    #[error("Array of length {0} is too long (max is 67108864)")]
    ArrayTooLongOnWire(u32),
    #[error("Message of length {0} is too long (max is 134217728)")]
    MessageTooLongOnWire(u64),
    #[error("Reply to `{member}` has unexpected signature `{signature}`")]
    UnexpectedReply {
        member: &'static str,
        signature: Box<str>,
    },
    #[error("Missing bus address, `{0}` is not set")]
    MissingBus(&'static str),
    #[error("Invalid D-Bus address `{0}`")]
    InvalidAddress(Box<str>),
    #[error("No supported transport in D-Bus address `{0}`")]
    UnsupportedAddress(Box<str>),
    #[error("Failed to connect to bus: {0}")]
    Connect(#[source] io::Error),
    #[error("Authentication rejected, server supports: {0}")]
    AuthRejected(Box<str>),
    #[error("Authentication failed: {0}")]
    AuthError(Box<str>),
    #[error("Invalid SASL response `{0}`")]
    InvalidSasl(Box<str>),
    #[error("Unix user id is not available for EXTERNAL authentication")]
    UidUnavailable,
    #[error("Bus rejected Hello: {0}")]
    HelloRejected(#[source] RemoteError),
    #[error("Invalid transport state `{0}`")]
    InvalidState(TransportState),
    #[error(transparent)]
    Io(io::Error),
    #[error("Connection closed by peer")]
    UnexpectedEof,
    #[error("Connection is closed")]
    Closed,
    #[error(transparent)]
    Remote(RemoteError),
    #[error("No reply to call {serial} within {timeout:?}")]
    TimedOut { serial: Serial, timeout: Duration },
}
