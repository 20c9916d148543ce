use crate::{ObjectPath, Serial};

/// The kind of a D-Bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageKind {
    /// Method call. This message type may prompt a reply.
    MethodCall {
        /// The path being called.
        path: ObjectPath,
        /// The member being called.
        member: Box<str>,
    },
    /// Method reply with returned data.
    MethodReturn {
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Error reply. If the first argument exists and is a string, it is an
    /// error message.
    Error {
        /// The name of the error.
        error_name: Box<str>,
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Signal emission.
    Signal {
        /// The path of the object emitting the signal.
        path: ObjectPath,
        /// The member being signalled.
        member: Box<str>,
    },
}
