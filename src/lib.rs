//! A minimal blocking D-Bus client core.
//!
//! Open a connection to a message bus, build method calls with typed
//! arguments, and wait for the reply or the error sent back by the peer.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use sync_dbus::{Connection, Message, Value};
//!
//! let mut c = Connection::session_bus()?;
//!
//! let mut m = Message::new_method_call(
//!     "org.freedesktop.DBus",
//!     "/org/freedesktop/DBus",
//!     "org.freedesktop.DBus",
//!     "NameHasOwner",
//! )?;
//!
//! m.add_argument("org.freedesktop.Notifications")?;
//!
//! let reply = c.call(m, Duration::from_secs(5))?;
//!
//! if let [Value::Boolean(has_owner)] = reply.arguments() {
//!     println!("has owner: {has_owner}");
//! }
//! # Ok::<_, sync_dbus::Error>(())
//! ```

#[doc(inline)]
pub use self::error::{Category, Error, Result};
mod error;

#[doc(inline)]
pub use self::protocol::{Endianness, Flags};
pub mod protocol;

mod frame;

mod utils;

mod names;

mod address;

#[doc(inline)]
pub use self::signature::{Signature, SignatureError};
pub mod signature;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathError};
pub mod object_path;

pub use self::value::{Array, Value};
mod value;

pub use self::message::{Message, MessageKind, Serial};
mod message;

mod codec;

pub mod sasl;

#[doc(inline)]
pub use self::connection::{Connection, ConnectionBuilder};
mod connection;

pub use self::call::{CallState, PendingCall, RemoteError, Reply, SyncCall};
mod call;

pub mod org_freedesktop_dbus;

#[cfg(test)]
mod testing;
