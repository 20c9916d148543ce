use std::env;
use std::ffi::OsString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

use crate::address;
use crate::error::{Error, ErrorKind, Result};
use crate::sasl::{Auth, SaslRequest, SaslResponse};
use crate::{Connection, Endianness};

use super::Transport;

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const ENV_STARTER_BUS: &str = "DBUS_STARTER_ADDRESS";
const ENV_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// The default timeout of a method call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// How many `DATA` challenges we answer before giving up.
const MAX_SASL_CHALLENGES: usize = 8;

#[derive(Debug, Clone)]
enum BusKind {
    Session,
    System,
    Starter,
    Address(Box<str>),
}

#[derive(Debug, Clone, Copy)]
enum AuthKind {
    Anonymous,
    #[cfg(feature = "libc")]
    Uid,
    External(u32),
}

impl AuthKind {
    #[cfg(not(feature = "libc"))]
    const DEFAULT: Self = Self::Anonymous;
    #[cfg(feature = "libc")]
    const DEFAULT: Self = Self::Uid;
}

/// Builder of a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    bus: BusKind,
    auth: AuthKind,
    hello: bool,
    timeout: Duration,
    endianness: Endianness,
}

impl ConnectionBuilder {
    /// Construct a new connection builder.
    ///
    /// By default it connects to the session bus, authenticates with
    /// `EXTERNAL` using the uid of the current process, sends `Hello` and
    /// uses a call timeout of 25 seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            bus: BusKind::Session,
            auth: AuthKind::DEFAULT,
            hello: true,
            timeout: DEFAULT_TIMEOUT,
            endianness: Endianness::NATIVE,
        }
    }

    /// Connect to the session bus (default).
    ///
    /// The address is read from `DBUS_SESSION_BUS_ADDRESS`, falling back to
    /// the `bus` socket in `XDG_RUNTIME_DIR`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sync_dbus::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().session_bus().connect()?;
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn session_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Session;
        self
    }

    /// Connect to the system bus.
    ///
    /// The address is read from `DBUS_SYSTEM_BUS_ADDRESS`, falling back to
    /// `unix:path=/var/run/dbus/system_bus_socket`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sync_dbus::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().system_bus().connect()?;
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn system_bus(&mut self) -> &mut Self {
        self.bus = BusKind::System;
        self
    }

    /// Connect to the bus which activated this process, as found in
    /// `DBUS_STARTER_ADDRESS`.
    pub fn starter_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Starter;
        self
    }

    /// Connect to an explicit address, like `unix:path=/run/user/1000/bus`.
    ///
    /// Alternatives separated by `;` are tried in order.
    pub fn address(&mut self, address: &str) -> &mut Self {
        self.bus = BusKind::Address(address.into());
        self
    }

    /// Authenticate with `EXTERNAL` using the uid of the current process
    /// (default).
    #[cfg(feature = "libc")]
    pub fn auth_uid(&mut self) -> &mut Self {
        self.auth = AuthKind::Uid;
        self
    }

    /// Authenticate with `EXTERNAL` using an explicit uid.
    pub fn auth_external(&mut self, uid: u32) -> &mut Self {
        self.auth = AuthKind::External(uid);
        self
    }

    /// Authenticate with `ANONYMOUS`.
    pub fn auth_anonymous(&mut self) -> &mut Self {
        self.auth = AuthKind::Anonymous;
        self
    }

    /// Whether to send `Hello` after authenticating (default `true`).
    ///
    /// A message bus refuses any other message before `Hello`, but a direct
    /// connection to a peer must not send it.
    pub fn hello(&mut self, hello: bool) -> &mut Self {
        self.hello = hello;
        self
    }

    /// The timeout used for calls which don't set one.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use sync_dbus::ConnectionBuilder;
    ///
    /// let mut c = ConnectionBuilder::new();
    /// c.default_timeout(Duration::from_secs(5));
    /// ```
    pub fn default_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// The endianness of outgoing messages (native by default).
    pub fn endianness(&mut self, endianness: Endianness) -> &mut Self {
        self.endianness = endianness;
        self
    }

    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Fails with [`Category::ConnectionError`][crate::Category::ConnectionError]
    /// if no address could be found or connected to, or if authentication or
    /// `Hello` fails.
    pub fn connect(&self) -> Result<Connection> {
        let string = self.resolve_address()?;
        let addresses = address::parse(&string)?;

        let mut last = None;

        for address in &addresses {
            match address.connect() {
                Ok(stream) => {
                    tracing::debug!(%address, "connected");
                    return self.connect_stream(stream);
                }
                Err(error) => {
                    tracing::debug!(%address, %error, "failed to connect");
                    last = Some(error);
                }
            }
        }

        let error = last.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound));
        Err(Error::new(ErrorKind::Connect(error)))
    }

    /// Set up a connection over an already connected stream.
    ///
    /// This authenticates and, unless disabled, sends `Hello`.
    pub fn connect_stream(&self, stream: UnixStream) -> Result<Connection> {
        self.handshake(stream).map_err(Error::into_setup_error)
    }

    fn handshake(&self, stream: UnixStream) -> Result<Connection> {
        let mut transport = Transport::new(stream);

        let mut buf = [0; 32];

        let auth = match self.auth {
            AuthKind::Anonymous => Auth::Anonymous,
            #[cfg(feature = "libc")]
            AuthKind::Uid => Auth::external_from_uid(&mut buf),
            AuthKind::External(uid) => Auth::external_from_u32_ascii_hex(&mut buf, uid),
        };

        transport.sasl_send(&SaslRequest::Auth(auth))?;

        let mut challenges = 0;

        let guid = loop {
            match transport.sasl_recv()? {
                SaslResponse::Ok(guid) => break guid,
                SaslResponse::Rejected(mechanisms) => {
                    return Err(Error::new(ErrorKind::AuthRejected(mechanisms)));
                }
                SaslResponse::Error(message) => {
                    return Err(Error::new(ErrorKind::AuthError(message)));
                }
                SaslResponse::Data(..) => {
                    challenges += 1;

                    if challenges > MAX_SASL_CHALLENGES {
                        return Err(Error::new(ErrorKind::AuthError(
                            "too many challenges".into(),
                        )));
                    }

                    transport.sasl_send(&SaslRequest::Data(&[]))?;
                }
            }
        };

        tracing::debug!(%guid, "authenticated");
        transport.sasl_send(&SaslRequest::Begin)?;

        let mut c = Connection::new(transport, guid, self.endianness, self.timeout);

        if self.hello {
            c.hello()?;
        }

        Ok(c)
    }

    fn resolve_address(&self) -> Result<Box<str>> {
        match &self.bus {
            BusKind::Session => {
                if let Some(address) = env_address(ENV_SESSION_BUS)? {
                    return Ok(address);
                }

                let Some(runtime) = env::var_os(ENV_RUNTIME_DIR) else {
                    return Err(Error::new(ErrorKind::MissingBus(ENV_SESSION_BUS)));
                };

                let path = PathBuf::from(runtime).join("bus");
                Ok(address::unix_path(path.as_os_str().as_bytes()).into())
            }
            BusKind::System => match env_address(ENV_SYSTEM_BUS)? {
                Some(address) => Ok(address),
                None => Ok(DEFAULT_SYSTEM_BUS.into()),
            },
            BusKind::Starter => match env_address(ENV_STARTER_BUS)? {
                Some(address) => Ok(address),
                None => Err(Error::new(ErrorKind::MissingBus(ENV_STARTER_BUS))),
            },
            BusKind::Address(address) => Ok(address.clone()),
        }
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Read an address from the environment, treating an empty value as unset.
fn env_address(name: &str) -> Result<Option<Box<str>>> {
    let Some(value) = env::var_os(name) else {
        return Ok(None);
    };

    if value.is_empty() {
        return Ok(None);
    }

    match value.into_string() {
        Ok(value) => Ok(Some(value.into())),
        Err(value) => Err(Error::new(ErrorKind::InvalidAddress(lossy(value)))),
    }
}

fn lossy(value: OsString) -> Box<str> {
    value.to_string_lossy().into()
}
