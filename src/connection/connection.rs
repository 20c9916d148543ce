use std::fmt;
use std::time::{Duration, Instant};

use crate::codec;
use crate::error::{Error, ErrorKind, Result};
use crate::message::SerialCounter;
use crate::org_freedesktop_dbus;
use crate::sasl::Guid;
use crate::{ConnectionBuilder, Endianness, Message, Reply, Serial, SyncCall};

use super::Transport;

/// A blocking connection to a message bus.
///
/// Every operation takes `&mut self`, so a connection only ever has one call
/// in flight.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use sync_dbus::{Connection, Message};
///
/// let mut c = Connection::session_bus()?;
///
/// let m = Message::new_method_call(
///     "org.freedesktop.DBus",
///     "/org/freedesktop/DBus",
///     "org.freedesktop.DBus.Peer",
///     "Ping",
/// )?;
///
/// let reply = c.call(m, Duration::from_secs(5))?;
/// assert!(reply.arguments().is_empty());
/// # Ok::<_, sync_dbus::Error>(())
/// ```
pub struct Connection {
    transport: Transport,
    serials: SerialCounter,
    name: Option<Box<str>>,
    guid: Guid,
    endianness: Endianness,
    timeout: Duration,
}

impl Connection {
    pub(super) fn new(
        transport: Transport,
        guid: Guid,
        endianness: Endianness,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            serials: SerialCounter::default(),
            name: None,
            guid,
            endianness,
            timeout,
        }
    }

    /// Connect to the session bus with the default configuration.
    ///
    /// See [`ConnectionBuilder::session_bus`].
    pub fn session_bus() -> Result<Self> {
        ConnectionBuilder::new().session_bus().connect()
    }

    /// Connect to the system bus with the default configuration.
    ///
    /// See [`ConnectionBuilder::system_bus`].
    pub fn system_bus() -> Result<Self> {
        ConnectionBuilder::new().system_bus().connect()
    }

    /// Connect to the bus at the given address, such as
    /// `unix:path=/run/user/1000/bus`.
    pub fn open(address: &str) -> Result<Self> {
        ConnectionBuilder::new().address(address).connect()
    }

    /// The unique name assigned by the bus in response to `Hello`.
    ///
    /// This is `None` if `Hello` was disabled through
    /// [`ConnectionBuilder::hello`].
    pub fn unique_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The GUID the server sent during authentication.
    pub fn server_guid(&self) -> &Guid {
        &self.guid
    }

    /// Test if the connection can still be used.
    ///
    /// This is `false` after [`Connection::close`] and after a fatal error.
    pub fn is_connected(&self) -> bool {
        !self.transport.is_closed()
    }

    /// The timeout used by [`SyncCall`] when none is set explicitly.
    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// The endianness of outgoing messages.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Send a message, returning the serial assigned to it.
    ///
    /// The message is encoded with the endianness of the connection.
    pub fn send(&mut self, mut message: Message) -> Result<Serial> {
        self.ensure_connected()?;

        let serial = self.serials.next_serial();
        message.serial = Some(serial);
        message.endianness = self.endianness;

        let frame = codec::encode(&message)?;

        tracing::debug!(
            %serial,
            kind = ?message.message_type(),
            destination = message.destination(),
            member = message.member(),
            "send"
        );

        let result = self.transport.send_frame(&frame);
        self.check(result)?;
        Ok(serial)
    }

    /// Block until a message is received.
    pub fn receive(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.receive_until(None)? {
                return Ok(message);
            }
        }
    }

    /// Block until a message is received or the timeout passes, in which case
    /// `None` is returned.
    ///
    /// A frame which is only partially received when the timeout passes is
    /// completed by the next receive.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<Message>> {
        self.receive_until(Instant::now().checked_add(timeout))
    }

    pub(crate) fn receive_until(&mut self, deadline: Option<Instant>) -> Result<Option<Message>> {
        self.ensure_connected()?;

        let result = self.transport.recv_frame(deadline);

        let Some(frame) = self.check(result)? else {
            return Ok(None);
        };

        let result = codec::decode(&frame);
        let message = self.check(result)?;

        tracing::trace!(
            serial = ?message.serial(),
            kind = ?message.message_type(),
            reply_serial = ?message.reply_serial(),
            "receive"
        );

        Ok(Some(message))
    }

    /// Send a method call and wait for its reply.
    ///
    /// This is a shorthand for [`SyncCall::call`] with an explicit timeout.
    pub fn call(&mut self, message: Message, timeout: Duration) -> Result<Reply> {
        SyncCall::new(message).with_timeout(timeout).call(self)
    }

    /// Shut down the connection.
    ///
    /// Later sends and receives fail with
    /// [`Category::ConnectionClosed`][crate::Category::ConnectionClosed].
    pub fn close(&mut self) {
        if !self.transport.is_closed() {
            tracing::debug!("closing connection");
            self.transport.shutdown();
        }
    }

    /// Send `Hello` and store the unique name the bus assigns.
    pub(super) fn hello(&mut self) -> Result<()> {
        let m = Message::method_call(org_freedesktop_dbus::PATH, "Hello")
            .with_destination(org_freedesktop_dbus::DESTINATION)
            .with_interface(org_freedesktop_dbus::INTERFACE);

        let reply = match SyncCall::new(m).call(self) {
            Ok(reply) => reply,
            Err(error) => {
                return Err(match error.into_remote() {
                    Ok(remote) => Error::new(ErrorKind::HelloRejected(remote)),
                    Err(error) => error,
                });
            }
        };

        let Some(name) = reply.arguments().first().and_then(|v| v.as_str()) else {
            return Err(Error::new(ErrorKind::UnexpectedReply {
                member: "Hello",
                signature: reply.signature().as_str().into(),
            }));
        };

        tracing::debug!(name, "assigned unique name");
        self.name = Some(name.into());
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.transport.is_closed() {
            return Err(Error::new(ErrorKind::Closed));
        }

        Ok(())
    }

    /// Shut down the transport if the result carries a fatal error.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_fatal() {
                tracing::debug!(%error, "closing connection after fatal error");
                self.transport.shutdown();
            }
        }

        result
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("guid", &self.guid)
            .field("endianness", &self.endianness)
            .field("timeout", &self.timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}
