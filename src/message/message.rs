use crate::error::Result;
use crate::names;
use crate::protocol::MessageType;
use crate::{Endianness, Flags, MessageKind, ObjectPath, Serial, Signature, Value};

/// A D-Bus message.
///
/// Messages are built with one of the constructors, optionally decorated with
/// the `with_*` methods, and extended with arguments through
/// [`Message::add_argument`]. The signature of the message always matches its
/// body.
///
/// # Examples
///
/// ```
/// use sync_dbus::{Message, MessageKind, Value};
///
/// let mut m = Message::new_method_call(
///     "org.gnome.Shell.Screenshot",
///     "/org/gnome/Shell/Screenshot",
///     "org.gnome.Shell.Screenshot",
///     "ScreenshotArea",
/// )?;
///
/// m.add_argument(0i32)?;
/// m.add_argument(0i32)?;
/// m.add_argument(true)?;
/// m.add_argument("screenshot.png")?;
///
/// assert!(matches!(m.kind(), MessageKind::MethodCall { .. }));
/// assert_eq!(m.signature(), "iibs");
/// assert_eq!(m.body()[2], Value::Boolean(true));
/// # Ok::<_, sync_dbus::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The type of the message.
    pub(crate) kind: MessageKind,
    /// Serial of the message, assigned when it is sent.
    pub(crate) serial: Option<Serial>,
    /// Flags in the message.
    pub(crate) flags: Flags,
    /// The interface of the message.
    pub(crate) interface: Option<Box<str>>,
    /// The destination of the message.
    pub(crate) destination: Option<Box<str>>,
    /// The sender of the message.
    pub(crate) sender: Option<Box<str>>,
    /// The signature of the body.
    pub(crate) signature: Signature,
    /// The body associated with the message.
    pub(crate) body: Vec<Value>,
    /// The endianness used to marshal the message.
    pub(crate) endianness: Endianness,
}

impl Message {
    fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            serial: None,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            signature: Signature::EMPTY,
            body: Vec::new(),
            endianness: Endianness::NATIVE,
        }
    }

    /// Construct a method call with an empty body, validating every name.
    ///
    /// # Errors
    ///
    /// Errors if the destination is not a valid bus name, the path is not a
    /// valid object path, the interface is not a valid interface name, or the
    /// member is not a valid member name.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::Message;
    ///
    /// let m = Message::new_method_call(
    ///     "org.gnome.Shell.Screenshot",
    ///     "/org/gnome/Shell/Screenshot",
    ///     "org.gnome.Shell.Screenshot",
    ///     "SelectArea",
    /// )?;
    ///
    /// assert_eq!(m.destination(), Some("org.gnome.Shell.Screenshot"));
    /// assert_eq!(m.member(), Some("SelectArea"));
    /// assert!(m.signature().is_empty());
    ///
    /// assert!(Message::new_method_call("org.example", "no/path", "org.example", "Call").is_err());
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn new_method_call(
        destination: &str,
        path: &str,
        interface: &str,
        member: &str,
    ) -> Result<Self> {
        names::validate_bus_name(destination)?;
        let path = ObjectPath::new(path.to_owned())?;
        names::validate_interface(interface)?;
        names::validate_member(member)?;

        Ok(Self::method_call(path, member)
            .with_destination(destination)
            .with_interface(interface))
    }

    /// Construct a method call.
    ///
    /// Names are validated when the message is sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Message, ObjectPath};
    ///
    /// const PATH: ObjectPath = ObjectPath::new_const("/org/freedesktop/DBus");
    ///
    /// let m = Message::method_call(PATH, "Hello")
    ///     .with_destination("org.freedesktop.DBus")
    ///     .with_interface("org.freedesktop.DBus");
    ///
    /// assert_eq!(m.path(), Some(&ObjectPath::new("/org/freedesktop/DBus")?));
    /// assert_eq!(m.interface(), Some("org.freedesktop.DBus"));
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn method_call<M>(path: ObjectPath, member: M) -> Self
    where
        M: Into<Box<str>>,
    {
        Self::new(MessageKind::MethodCall {
            path,
            member: member.into(),
        })
    }

    /// Construct a method return replying to the call with the given serial.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Message, Serial};
    ///
    /// let serial = Serial::new(7).unwrap();
    /// let m = Message::method_return(serial);
    /// assert_eq!(m.reply_serial(), Some(serial));
    /// ```
    pub fn method_return(reply_serial: Serial) -> Self {
        Self::new(MessageKind::MethodReturn { reply_serial })
    }

    /// Construct an error replying to the call with the given serial.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Message, Serial};
    ///
    /// let serial = Serial::new(7).unwrap();
    ///
    /// let mut m = Message::error("org.freedesktop.DBus.Error.Failed", serial);
    /// m.add_argument("something went wrong")?;
    ///
    /// assert_eq!(m.reply_serial(), Some(serial));
    /// assert_eq!(m.error_name(), Some("org.freedesktop.DBus.Error.Failed"));
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn error<N>(error_name: N, reply_serial: Serial) -> Self
    where
        N: Into<Box<str>>,
    {
        Self::new(MessageKind::Error {
            error_name: error_name.into(),
            reply_serial,
        })
    }

    /// Construct a signal emitted from the given path and interface.
    pub fn signal<I, M>(path: ObjectPath, interface: I, member: M) -> Self
    where
        I: Into<Box<str>>,
        M: Into<Box<str>>,
    {
        Self::new(MessageKind::Signal {
            path,
            member: member.into(),
        })
        .with_interface(interface)
    }

    /// Append an argument to the body, extending the signature.
    ///
    /// # Errors
    ///
    /// Errors if the shape of the value is invalid, or if the resulting
    /// signature would be too long or too deeply nested. The message is
    /// unchanged on errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Message, ObjectPath, Value};
    ///
    /// let mut m = Message::method_call(ObjectPath::ROOT, "Call");
    /// m.add_argument(Value::Struct(vec![Value::from(1u8), Value::from(2i32)]))?;
    /// assert_eq!(m.signature(), "(yi)");
    ///
    /// assert!(m.add_argument(Value::Struct(vec![])).is_err());
    /// assert_eq!(m.signature(), "(yi)");
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn add_argument<V>(&mut self, value: V) -> Result<()>
    where
        V: Into<Value>,
    {
        let value = value.into();
        value.validate()?;

        let mut signature = self.signature.as_str().to_owned();
        value.write_signature(&mut signature);
        self.signature = Signature::new(signature)?;
        self.body.push(value);
        Ok(())
    }

    /// Append an argument to the body, see [`Message::add_argument`].
    pub fn with_argument<V>(mut self, value: V) -> Result<Self>
    where
        V: Into<Value>,
    {
        self.add_argument(value)?;
        Ok(self)
    }

    /// Get the kind of the message.
    #[inline]
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub(crate) fn message_type(&self) -> MessageType {
        match self.kind {
            MessageKind::MethodCall { .. } => MessageType::METHOD_CALL,
            MessageKind::MethodReturn { .. } => MessageType::METHOD_RETURN,
            MessageKind::Error { .. } => MessageType::ERROR,
            MessageKind::Signal { .. } => MessageType::SIGNAL,
        }
    }

    /// Get the serial of the message, which is assigned once it is sent.
    #[inline]
    pub fn serial(&self) -> Option<Serial> {
        self.serial
    }

    /// Modify the serial of the message.
    ///
    /// A connection overrides the serial when the message is sent.
    pub fn with_serial(self, serial: Serial) -> Self {
        Self {
            serial: Some(serial),
            ..self
        }
    }

    /// Get the serial this message replies to, if it is a method return or an
    /// error.
    pub fn reply_serial(&self) -> Option<Serial> {
        match self.kind {
            MessageKind::MethodReturn { reply_serial } => Some(reply_serial),
            MessageKind::Error { reply_serial, .. } => Some(reply_serial),
            _ => None,
        }
    }

    /// Get the flags of the message.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Flags, Message, ObjectPath};
    ///
    /// let m = Message::method_call(ObjectPath::ROOT, "Hello");
    /// assert_eq!(m.flags(), Flags::default());
    ///
    /// let m2 = m.with_flags(Flags::NO_REPLY_EXPECTED);
    /// assert_eq!(m2.flags(), Flags::NO_REPLY_EXPECTED);
    /// ```
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Modify the flags of the message.
    pub fn with_flags(self, flags: Flags) -> Self {
        Self { flags, ..self }
    }

    /// Get the object path of a method call or a signal.
    pub fn path(&self) -> Option<&ObjectPath> {
        match &self.kind {
            MessageKind::MethodCall { path, .. } | MessageKind::Signal { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Get the member of a method call or a signal.
    pub fn member(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::MethodCall { member, .. } | MessageKind::Signal { member, .. } => {
                Some(member)
            }
            _ => None,
        }
    }

    /// Get the error name of an error.
    pub fn error_name(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Error { error_name, .. } => Some(error_name),
            _ => None,
        }
    }

    /// Get the interface of the message.
    #[inline]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Modify the interface of the message.
    pub fn with_interface<I>(self, interface: I) -> Self
    where
        I: Into<Box<str>>,
    {
        Self {
            interface: Some(interface.into()),
            ..self
        }
    }

    /// Get the destination of the message.
    #[inline]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Modify the destination of the message.
    pub fn with_destination<D>(self, destination: D) -> Self
    where
        D: Into<Box<str>>,
    {
        Self {
            destination: Some(destination.into()),
            ..self
        }
    }

    /// Get the sender of the message.
    #[inline]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Modify the sender of the message.
    ///
    /// The bus overrides the sender of messages passing through it.
    pub fn with_sender<S>(self, sender: S) -> Self
    where
        S: Into<Box<str>>,
    {
        Self {
            sender: Some(sender.into()),
            ..self
        }
    }

    /// Get the signature of the body.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Get the arguments in the body.
    #[inline]
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Convert into the arguments in the body.
    #[inline]
    pub fn into_body(self) -> Vec<Value> {
        self.body
    }

    /// Get the endianness used to marshal the message.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Modify the endianness used to marshal the message.
    pub fn with_endianness(self, endianness: Endianness) -> Self {
        Self { endianness, ..self }
    }

    /// Validate the names in the headers before they are put on the wire.
    pub(crate) fn validate_names(&self) -> Result<()> {
        match &self.kind {
            MessageKind::MethodCall { member, .. } => {
                names::validate_member(member)?;
            }
            MessageKind::Signal { member, .. } => {
                names::validate_member(member)?;
            }
            MessageKind::Error { error_name, .. } => {
                names::validate_error_name(error_name)?;
            }
            MessageKind::MethodReturn { .. } => {}
        }

        if let Some(interface) = &self.interface {
            names::validate_interface(interface)?;
        }

        if let Some(destination) = &self.destination {
            names::validate_bus_name(destination)?;
        }

        if let Some(sender) = &self.sender {
            names::validate_bus_name(sender)?;
        }

        Ok(())
    }
}
