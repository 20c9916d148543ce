//! Types associated with the `org.freedesktop.DBus` interface, and calls to
//! the message bus itself.

use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{raw_enum, raw_set};
use crate::{names, Connection, Message, ObjectPath, Reply, SyncCall};

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: ObjectPath = ObjectPath::new_const("/org/freedesktop/DBus");

raw_set! {
    /// The flags to a `RequestName` call.
    #[repr(u32)]
    pub enum NameFlag {
        /// If an application A specifies this flag and succeeds in becoming the
        /// owner of the name, and another application B later calls
        /// `RequestName` with the `REPLACE_EXISTING` flag, then application A
        /// will lose ownership and receive a `org.freedesktop.DBus.NameLost`
        /// signal, and application B will become the new owner. If
        /// `ALLOW_REPLACEMENT` is not specified by application A, or
        /// `REPLACE_EXISTING` is not specified by application B, then
        /// application B will not replace application A as the owner.
        ALLOW_REPLACEMENT = 1,
        /// Try to replace the current owner if there is one. If this flag is
        /// not set the application will only become the owner of the name if
        /// there is no current owner. If this flag is set, the application will
        /// replace the current owner if the current owner specified
        /// `ALLOW_REPLACEMENT`.
        REPLACE_EXISTING = 2,
        /// Without this flag, if an application requests a name that is already
        /// owned, the application will be placed in a queue to own the name
        /// when the current owner gives it up. If this flag is given, the
        /// application will not be placed in the queue, the request for the
        /// name will simply fail. This flag also affects behavior when an
        /// application is replaced as name owner; by default the application
        /// moves back into the waiting queue, unless this flag was provided
        /// when the application became the name owner.
        DO_NOT_QUEUE = 4,
    }
}

raw_enum! {
    /// The reply to a `RequestName` call.
    #[repr(u32)]
    pub enum NameReply {
        /// The caller is now the primary owner of the name, replacing any
        /// previous owner. Either the name had no owner before, or the caller
        /// specified [`NameFlag::REPLACE_EXISTING`] and the current owner
        /// specified [`NameFlag::ALLOW_REPLACEMENT`].
        PRIMARY_OWNER = 1,
        /// The name already had an owner, [`NameFlag::DO_NOT_QUEUE`] was not
        /// specified, and either the current owner did not specify
        /// [`NameFlag::ALLOW_REPLACEMENT`] or the requesting application did
        /// not specify [`NameFlag::REPLACE_EXISTING`].
        IN_QUEUE = 2,
        /// The name already has an owner, [`NameFlag::DO_NOT_QUEUE`] was
        /// specified, and either [`NameFlag::ALLOW_REPLACEMENT`] was not
        /// specified by the current owner, or [`NameFlag::REPLACE_EXISTING`]
        /// was not specified by the requesting application.
        EXISTS = 3,
        /// The application trying to request ownership of a name is already the
        /// owner of it.
        ALREADY_OWNER = 4,
    }
}

raw_enum! {
    /// The reply to a `ReleaseName` call.
    #[repr(u32)]
    pub enum ReleaseNameReply {
        /// The caller has released their claim on the given name. Either the
        /// caller was the primary owner of the name, and the name is now
        /// unused or taken by somebody waiting in the queue for the name, or
        /// the caller was waiting in the queue for the name and has now been
        /// removed from the queue.
        RELEASED = 1,
        /// The given name does not exist on this bus.
        NON_EXISTENT = 2,
        /// The caller was not the primary owner of this name, and was also
        /// not waiting in the queue to own this name.
        NOT_OWNER = 3,
    }
}

impl Connection {
    /// Ask the bus to assign the given well-known name to this connection.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sync_dbus::Connection;
    /// use sync_dbus::org_freedesktop_dbus::{NameFlag, NameReply};
    ///
    /// let mut c = Connection::session_bus()?;
    /// let reply = c.request_name("se.tedro.Example", NameFlag::DO_NOT_QUEUE)?;
    /// assert_eq!(reply, NameReply::PRIMARY_OWNER);
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn request_name(&mut self, name: &str, flags: NameFlag) -> Result<NameReply> {
        names::validate_bus_name(name)?;

        let m = bus_call("RequestName")
            .with_argument(name)?
            .with_argument(flags.0)?;

        let reply = SyncCall::new(m).call(self)?;
        Ok(NameReply(single_u32(&reply, "RequestName")?))
    }

    /// Release a well-known name previously requested with
    /// [`Connection::request_name`].
    pub fn release_name(&mut self, name: &str) -> Result<ReleaseNameReply> {
        names::validate_bus_name(name)?;

        let m = bus_call("ReleaseName").with_argument(name)?;
        let reply = SyncCall::new(m).call(self)?;
        Ok(ReleaseNameReply(single_u32(&reply, "ReleaseName")?))
    }

    /// Get the unique id of the bus.
    pub fn bus_id(&mut self) -> Result<String> {
        let reply = SyncCall::new(bus_call("GetId")).call(self)?;

        match reply.arguments() {
            [value] => value
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| unexpected_reply("GetId", reply.signature().as_str())),
            _ => Err(unexpected_reply("GetId", reply.signature().as_str())),
        }
    }

    /// Get the Unix user id of the process owning the given bus name.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sync_dbus::Connection;
    ///
    /// let mut c = Connection::session_bus()?;
    /// let uid = c.unix_user("org.freedesktop.DBus")?;
    /// println!("bus runs as {uid}");
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn unix_user(&mut self, name: &str) -> Result<u32> {
        names::validate_bus_name(name)?;

        let m = bus_call("GetConnectionUnixUser").with_argument(name)?;
        let reply = SyncCall::new(m).call(self)?;
        single_u32(&reply, "GetConnectionUnixUser")
    }
}

fn bus_call(member: &'static str) -> Message {
    Message::method_call(PATH, member)
        .with_destination(DESTINATION)
        .with_interface(INTERFACE)
}

fn single_u32(reply: &Reply, member: &'static str) -> Result<u32> {
    match reply.arguments() {
        [value] => value
            .as_u32()
            .ok_or_else(|| unexpected_reply(member, reply.signature().as_str())),
        _ => Err(unexpected_reply(member, reply.signature().as_str())),
    }
}

fn unexpected_reply(member: &'static str, signature: &str) -> Error {
    Error::new(ErrorKind::UnexpectedReply {
        member,
        signature: signature.into(),
    })
}
