use crate::error::{Error, ErrorKind, Result};
use crate::protocol::MAX_TOTAL_DEPTH;
use crate::{ObjectPath, Signature};

use super::Array;

/// A single marshallable D-Bus value.
///
/// # Examples
///
/// ```
/// use sync_dbus::Value;
///
/// let value = Value::Struct(vec![Value::from(1u8), Value::from(2i32)]);
/// assert_eq!(value.signature(), "(yi)");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// A boolean, `b`.
    Boolean(bool),
    /// A byte, `y`.
    Byte(u8),
    /// Signed 16-bit integer, `n`.
    Int16(i16),
    /// Unsigned 16-bit integer, `q`.
    UInt16(u16),
    /// Signed 32-bit integer, `i`.
    Int32(i32),
    /// Unsigned 32-bit integer, `u`.
    UInt32(u32),
    /// Signed 64-bit integer, `x`.
    Int64(i64),
    /// Unsigned 64-bit integer, `t`.
    UInt64(u64),
    /// IEEE 754 double, `d`.
    Double(f64),
    /// A string, `s`. Must not contain nul bytes.
    String(String),
    /// An object path, `o`.
    ObjectPath(ObjectPath),
    /// A signature, `g`.
    Signature(Signature),
    /// An array, `a`.
    Array(Array),
    /// A struct with at least one field, `(...)`.
    Struct(Vec<Value>),
    /// A value which carries its own type, `v`.
    Variant(Box<Value>),
    /// A key-value pair, `{..}`. Only valid as an array element, and the key
    /// must be of a basic type.
    DictEntry(Box<(Value, Value)>),
}

impl Value {
    /// Construct a dict entry.
    pub fn dict_entry<K, V>(key: K, value: V) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::DictEntry(Box::new((key.into(), value.into())))
    }

    /// Construct a variant.
    pub fn variant<V>(value: V) -> Self
    where
        V: Into<Value>,
    {
        Value::Variant(Box::new(value.into()))
    }

    /// The signature of this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Array, Value};
    ///
    /// assert_eq!(Value::from(true).signature(), "b");
    /// assert_eq!(Value::from(Array::new("s")?).signature(), "as");
    /// assert_eq!(Value::variant(42u64).signature(), "v");
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn signature(&self) -> Signature {
        let mut signature = String::new();
        self.write_signature(&mut signature);
        Signature::new_unchecked(signature)
    }

    pub(crate) fn write_signature(&self, out: &mut String) {
        match self {
            Value::Boolean(..) => out.push('b'),
            Value::Byte(..) => out.push('y'),
            Value::Int16(..) => out.push('n'),
            Value::UInt16(..) => out.push('q'),
            Value::Int32(..) => out.push('i'),
            Value::UInt32(..) => out.push('u'),
            Value::Int64(..) => out.push('x'),
            Value::UInt64(..) => out.push('t'),
            Value::Double(..) => out.push('d'),
            Value::String(..) => out.push('s'),
            Value::ObjectPath(..) => out.push('o'),
            Value::Signature(..) => out.push('g'),
            Value::Array(array) => out.push_str(array.signature().as_str()),
            Value::Struct(fields) => {
                out.push('(');

                for field in fields {
                    field.write_signature(out);
                }

                out.push(')');
            }
            Value::Variant(..) => out.push('v'),
            Value::DictEntry(entry) => {
                out.push('{');
                entry.0.write_signature(out);
                entry.1.write_signature(out);
                out.push('}');
            }
        }
    }

    /// Test if this is a value of a basic type, which are the only types
    /// permitted as dict entry keys.
    pub fn is_basic(&self) -> bool {
        !matches!(
            self,
            Value::Array(..) | Value::Struct(..) | Value::Variant(..) | Value::DictEntry(..)
        )
    }

    /// Check that the shape of the value agrees with its signature.
    pub(crate) fn validate(&self) -> Result<()> {
        self.check(false, 0)
    }

    /// Check the value as found `depth` containers deep.
    pub(super) fn check(&self, in_array: bool, depth: usize) -> Result<()> {
        match self {
            Value::String(string) => {
                if string.contains('\0') {
                    return Err(Error::new(ErrorKind::StringContainsNul));
                }
            }
            Value::Array(array) => {
                let depth = enter(depth)?;

                // Items were checked when pushed, so only containers need to
                // be walked for their depth.
                for item in array.items().iter().filter(|item| !item.is_basic()) {
                    item.check(true, depth)?;
                }
            }
            Value::Struct(fields) => {
                let depth = enter(depth)?;

                if fields.is_empty() {
                    return Err(Error::new(ErrorKind::StructHasNoFields));
                }

                for field in fields {
                    field.check(false, depth)?;
                }
            }
            Value::Variant(value) => {
                value.check(false, enter(depth)?)?;
                // Nested containers must respect the signature limits.
                Signature::new(value.signature().as_str().to_owned())?;
            }
            Value::DictEntry(entry) => {
                if !in_array {
                    return Err(Error::new(ErrorKind::DictEntryNotInsideArray));
                }

                let (key, value) = &**entry;

                if !key.is_basic() {
                    return Err(Error::new(ErrorKind::DictKeyMustBeBasic(
                        key.signature().as_str().into(),
                    )));
                }

                let depth = enter(depth)?;
                key.check(false, depth)?;
                value.check(false, depth)?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn enter(depth: usize) -> Result<usize> {
    if depth >= MAX_TOTAL_DEPTH {
        return Err(Error::new(ErrorKind::ValueTooDeep));
    }

    Ok(depth + 1)
}

macro_rules! accessor {
    ($(#[doc = $doc:literal])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[doc = $doc])*
        #[inline]
        pub fn $name(&self) -> Option<$ty> {
            match *self {
                Value::$variant(value) => Some(value),
                _ => None,
            }
        }
    };
}

impl Value {
    accessor!(
        /// Get the value as a boolean.
        as_bool, Boolean, bool
    );
    accessor!(
        /// Get the value as a byte.
        as_u8, Byte, u8
    );
    accessor!(
        /// Get the value as a signed 16-bit integer.
        as_i16, Int16, i16
    );
    accessor!(
        /// Get the value as an unsigned 16-bit integer.
        as_u16, UInt16, u16
    );
    accessor!(
        /// Get the value as a signed 32-bit integer.
        as_i32, Int32, i32
    );
    accessor!(
        /// Get the value as an unsigned 32-bit integer.
        as_u32, UInt32, u32
    );
    accessor!(
        /// Get the value as a signed 64-bit integer.
        as_i64, Int64, i64
    );
    accessor!(
        /// Get the value as an unsigned 64-bit integer.
        as_u64, UInt64, u64
    );
    accessor!(
        /// Get the value as a double.
        as_f64, Double, f64
    );

    /// Get the value as a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(1u32).as_str(), None);
    /// ```
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Get the value as an object path.
    #[inline]
    pub fn as_object_path(&self) -> Option<&ObjectPath> {
        match self {
            Value::ObjectPath(value) => Some(value),
            _ => None,
        }
    }

    /// Get the value as a signature.
    #[inline]
    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Value::Signature(value) => Some(value),
            _ => None,
        }
    }

    /// Get the value as an array.
    #[inline]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(value) => Some(value),
            _ => None,
        }
    }

    /// Get the fields of a struct.
    #[inline]
    pub fn as_struct(&self) -> Option<&[Value]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get the value inside of a variant.
    #[inline]
    pub fn as_variant(&self) -> Option<&Value> {
        match self {
            Value::Variant(value) => Some(value),
            _ => None,
        }
    }

    /// Get the key and value of a dict entry.
    #[inline]
    pub fn as_dict_entry(&self) -> Option<(&Value, &Value)> {
        match self {
            Value::DictEntry(entry) => Some((&entry.0, &entry.1)),
            _ => None,
        }
    }

    /// Convert into a string.
    #[inline]
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

macro_rules! from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

from! {
    bool => Boolean,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
    ObjectPath => ObjectPath,
    Signature => Signature,
    Array => Array,
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}
