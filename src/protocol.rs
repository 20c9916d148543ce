//! Low level details for the D-Bus protocol implementation.

/// Size of the fixed part of a message header, including the length prefix
/// of the header field array.
pub(crate) const FIXED_HEADER_LENGTH: usize = 16;

/// The only protocol version this crate speaks.
pub(crate) const PROTOCOL_VERSION: u8 = 1;

/// Maximum length in bytes of a single array.
pub(crate) const MAX_ARRAY_LENGTH: u32 = 1u32 << 26;

/// Maximum length in bytes of a whole message.
pub(crate) const MAX_MESSAGE_LENGTH: u32 = 1u32 << 27;

/// Maximum number of bytes in a signature.
pub(crate) const MAX_SIGNATURE_LENGTH: usize = 255;

/// Maximum nesting of arrays and structs, each counted separately.
pub(crate) const MAX_CONTAINER_DEPTH: usize = 32;

/// Maximum combined nesting of arrays, structs, dict entries and variants
/// inside of a single value.
pub(crate) const MAX_TOTAL_DEPTH: usize = 64;

macro_rules! raw_enum {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    _ => write!(f, "INVALID({:?})", self.0),
                }
            }
        }
    }
}

macro_rules! raw_set {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                struct Raw(&'static str);

                impl ::std::fmt::Debug for Raw {
                    #[inline]
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        write!(f, "{}", self.0)
                    }
                }

                struct Bits($repr);

                impl ::std::fmt::Debug for Bits {
                    #[inline]
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        write!(f, "{:b}", self.0)
                    }
                }

                let mut f = f.debug_set();

                let mut this = *self;

                $(
                    if this & Self::$variant {
                        f.entry(&Raw(stringify!($variant)));
                        this = this ^ Self::$variant;
                    }
                )*

                if this.0 != 0 {
                    f.entry(&Bits(this.0));
                }

                f.finish()
            }
        }

        impl ::std::ops::BitOr<$name> for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: $name) -> Self::Output {
                Self(self.0 | rhs.0)
            }
        }

        impl ::std::ops::BitAnd<$name> for $name {
            type Output = bool;

            #[inline]
            fn bitand(self, rhs: $name) -> Self::Output {
                self.0 & rhs.0 != 0
            }
        }

        impl ::std::ops::BitXor<$name> for $name {
            type Output = Self;

            #[inline]
            fn bitxor(self, rhs: $name) -> Self::Output {
                Self(self.0 ^ rhs.0)
            }
        }
    }
}

pub(crate) use raw_enum;
pub(crate) use raw_set;

raw_enum! {
    /// The endianness of a message.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian.
        LITTLE = b'l',
        /// Big endian.
        BIG = b'B',
    }
}

impl Endianness {
    /// Native endian.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Native endian.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;

    /// Interpret the endianness marker which starts every message.
    pub(crate) fn from_marker(byte: u8) -> Option<Self> {
        match Self(byte) {
            Self::LITTLE => Some(Self::LITTLE),
            Self::BIG => Some(Self::BIG),
            _ => None,
        }
    }
}

impl Default for Endianness {
    #[inline]
    fn default() -> Self {
        Self::NATIVE
    }
}

raw_enum! {
    /// The type of a message.
    #[repr(u8)]
    pub(crate) enum MessageType {
        /// Method call. This message type may prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply. If the first argument exists and is a string, it is an
        /// error message.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::Flags;
    ///
    /// let flags = Flags::EMPTY;
    /// assert!(!(flags & Flags::NO_REPLY_EXPECTED));
    ///
    /// let flags = Flags::EMPTY | Flags::NO_REPLY_EXPECTED;
    /// assert!(flags & Flags::NO_REPLY_EXPECTED);
    /// assert!(!(flags & Flags::NO_AUTO_START));
    /// ```
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// This message does not expect method return replies or error
        /// replies, even if it is of a type that can have a reply.
        NO_REPLY_EXPECTED = 1,
        /// The bus must not launch an owner for the destination name in
        /// response to this message.
        NO_AUTO_START = 2,
        /// The caller is prepared to wait for interactive authorization, which
        /// might take a considerable time to complete. Only valid on method
        /// calls.
        ALLOW_INTERACTIVE_AUTHORIZATION = 4,
    }
}

raw_enum! {
    /// Codes of the header fields in the `a(yv)` header array.
    #[repr(u8)]
    pub(crate) enum HeaderField {
        /// The object to send a call to, or the object a signal is emitted
        /// from.
        PATH = 1,
        /// The interface to invoke a method call on, or that a signal is
        /// emitted from.
        INTERFACE = 2,
        /// The member, either the method name or signal name.
        MEMBER = 3,
        /// The name of the error that occurred, for errors.
        ERROR_NAME = 4,
        /// The serial number of the message this message is a reply to.
        REPLY_SERIAL = 5,
        /// The name of the connection this message is intended for.
        DESTINATION = 6,
        /// Unique name of the sending connection.
        SENDER = 7,
        /// The signature of the message body. If omitted, it is assumed to be
        /// the empty signature.
        SIGNATURE = 8,
        /// The number of Unix file descriptors that accompany the message.
        UNIX_FDS = 9,
    }
}

raw_enum! {
    /// The type code inside of a signature.
    #[repr(u8)]
    pub(crate) enum Type {
        /// 8-bit unsigned integer
        BYTE = b'y',
        /// Boolean value, 0 is FALSE and 1 is TRUE. Everything else is invalid.
        BOOLEAN = b'b',
        /// 16-bit signed integer
        INT16 = b'n',
        /// 16-bit unsigned integer
        UINT16 = b'q',
        /// 32-bit signed integer
        INT32 = b'i',
        /// 32-bit unsigned integer
        UINT32 = b'u',
        /// 64-bit signed integer
        INT64 = b'x',
        /// 64-bit unsigned integer
        UINT64 = b't',
        /// IEEE 754 double
        DOUBLE = b'd',
        /// UTF-8 string (must be valid UTF-8). Must be nul terminated and
        /// contain no other nul bytes.
        STRING = b's',
        /// Name of an object instance
        OBJECT_PATH = b'o',
        /// A type signature
        SIGNATURE = b'g',
        /// Array.
        ARRAY = b'a',
        OPEN_PAREN = b'(',
        CLOSE_PAREN = b')',
        /// Variant type (the type of the value is part of the value itself).
        VARIANT = b'v',
        OPEN_BRACE = b'{',
        CLOSE_BRACE = b'}',
        /// Unix file descriptor.
        UNIX_FD = b'h',
    }
}

impl Type {
    /// Test if the type code is a basic (non-container) type.
    pub(crate) fn is_basic(self) -> bool {
        matches!(
            self,
            Type::BYTE
                | Type::BOOLEAN
                | Type::INT16
                | Type::UINT16
                | Type::INT32
                | Type::UINT32
                | Type::INT64
                | Type::UINT64
                | Type::DOUBLE
                | Type::STRING
                | Type::OBJECT_PATH
                | Type::SIGNATURE
                | Type::UNIX_FD
        )
    }

    /// The alignment of values starting with this type code.
    pub(crate) fn alignment(self) -> usize {
        match self {
            Type::BYTE | Type::SIGNATURE | Type::VARIANT => 1,
            Type::INT16 | Type::UINT16 => 2,
            Type::BOOLEAN
            | Type::INT32
            | Type::UINT32
            | Type::STRING
            | Type::OBJECT_PATH
            | Type::ARRAY
            | Type::UNIX_FD => 4,
            _ => 8,
        }
    }
}
