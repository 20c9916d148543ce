use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::{split_single, validate, Iter, SignatureError};

/// A validated D-Bus signature.
///
/// # Examples
///
/// ```
/// use sync_dbus::Signature;
///
/// const SIG: Signature = Signature::STRING;
///
/// assert!(Signature::new("aai").is_ok());
/// assert!(Signature::new("a").is_err());
/// assert_eq!(SIG, "s");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(Cow<'static, str>);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature::new_unchecked_const("");

    /// A single byte.
    pub const BYTE: Signature = Signature::new_unchecked_const("y");

    /// A boolean.
    pub const BOOLEAN: Signature = Signature::new_unchecked_const("b");

    /// Signed (two's complement) 16-bit integer.
    pub const INT16: Signature = Signature::new_unchecked_const("n");

    /// Unsigned 16-bit integer.
    pub const UINT16: Signature = Signature::new_unchecked_const("q");

    /// Signed (two's complement) 32-bit integer.
    pub const INT32: Signature = Signature::new_unchecked_const("i");

    /// Unsigned 32-bit integer.
    pub const UINT32: Signature = Signature::new_unchecked_const("u");

    /// Signed (two's complement) 64-bit integer.
    pub const INT64: Signature = Signature::new_unchecked_const("x");

    /// Unsigned 64-bit integer.
    pub const UINT64: Signature = Signature::new_unchecked_const("t");

    /// IEEE 754 double-precision floating point.
    pub const DOUBLE: Signature = Signature::new_unchecked_const("d");

    /// A string.
    pub const STRING: Signature = Signature::new_unchecked_const("s");

    /// An object path.
    pub const OBJECT_PATH: Signature = Signature::new_unchecked_const("o");

    /// A signature.
    pub const SIGNATURE: Signature = Signature::new_unchecked_const("g");

    /// A variant.
    pub const VARIANT: Signature = Signature::new_unchecked_const("v");

    const fn new_unchecked_const(signature: &'static str) -> Self {
        Self(Cow::Borrowed(signature))
    }

    /// Construct a new validated signature.
    ///
    /// # Errors
    ///
    /// Errors if the argument is not a valid signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::Signature;
    ///
    /// let sig = Signature::new("a{sv}")?;
    /// assert_eq!(sig.iter().count(), 1);
    /// # Ok::<_, sync_dbus::SignatureError>(())
    /// ```
    pub fn new<S>(signature: S) -> Result<Self, SignatureError>
    where
        S: Into<Cow<'static, str>>,
    {
        let signature = signature.into();
        validate(signature.as_bytes())?;
        Ok(Self(signature))
    }

    /// Construct a signature that is known to be valid.
    pub(crate) fn new_unchecked(signature: String) -> Self {
        Self(Cow::Owned(signature))
    }

    /// Get the signature as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the signature as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The length of the signature in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Test if the signature is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Test if the signature consists of exactly one complete type, which is
    /// what arrays and variants require.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::Signature;
    ///
    /// assert!(Signature::new("a(ii)")?.is_single_complete_type());
    /// assert!(!Signature::new("ii")?.is_single_complete_type());
    /// assert!(!Signature::EMPTY.is_single_complete_type());
    /// # Ok::<_, sync_dbus::SignatureError>(())
    /// ```
    pub fn is_single_complete_type(&self) -> bool {
        matches!(split_single(&self.0), Some((_, "")))
    }

    /// Iterate over the single complete types in the signature.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.0)
    }
}

impl Default for Signature {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.as_str()).finish()
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl AsRef<str> for Signature {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Signature {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        *self.0 == *other
    }
}

impl PartialEq<&str> for Signature {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        *self.0 == **other
    }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
