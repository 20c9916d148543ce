use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::{validate, Iter, ObjectPathError};

/// A validated object path.
///
/// The following rules define a [valid object path]. Implementations must not
/// send or accept messages with invalid object paths.
///
/// [valid object path]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling-object-path
///
/// * The path may be of any length.
/// * The path must begin with an ASCII '/' (integer 47) character, and must
///   consist of elements separated by slash characters.
/// * Each element must only contain the ASCII characters "[A-Z][a-z][0-9]_"
/// * No element may be the empty string.
/// * Multiple '/' characters cannot occur in sequence.
/// * A trailing '/' character is not allowed unless the path is the root path
///   (a single '/' character).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(Cow<'static, str>);

impl ObjectPath {
    /// The special `"/"` object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::ObjectPath;
    ///
    /// assert_eq!(ObjectPath::ROOT, ObjectPath::new("/")?);
    /// # Ok::<_, sync_dbus::ObjectPathError>(())
    /// ```
    pub const ROOT: Self = Self::new_const("/");

    /// Construct a new object path in a constant context.
    ///
    /// # Panics
    ///
    /// Panics if the argument is not a valid object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::ObjectPath;
    ///
    /// const PATH: ObjectPath = ObjectPath::new_const("/org/freedesktop/DBus");
    /// assert_eq!(PATH.iter().count(), 3);
    /// ```
    #[track_caller]
    pub const fn new_const(path: &'static str) -> Self {
        if !validate(path.as_bytes()) {
            panic!("Invalid D-Bus object path");
        }

        Self(Cow::Borrowed(path))
    }

    /// Construct a new validated object path.
    ///
    /// # Errors
    ///
    /// Errors if the argument is not a valid object path.
    ///
    /// See [`ObjectPath`] for more information.
    pub fn new<P>(path: P) -> Result<Self, ObjectPathError>
    where
        P: Into<Cow<'static, str>>,
    {
        let path = path.into();

        if !validate(path.as_bytes()) {
            return Err(ObjectPathError);
        }

        Ok(Self(path))
    }

    /// Get the object path as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Construct an iterator over the components of the object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::ObjectPath;
    ///
    /// let path = ObjectPath::new("/org/gnome/Shell/Screenshot")?;
    /// let mut it = path.iter();
    /// assert_eq!(it.next(), Some("org"));
    /// assert_eq!(it.next_back(), Some("Screenshot"));
    /// assert_eq!(it.next(), Some("gnome"));
    /// assert_eq!(it.next(), Some("Shell"));
    /// assert_eq!(it.next(), None);
    /// # Ok::<_, sync_dbus::ObjectPathError>(())
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.0)
    }

    /// Test if one path starts with another.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::ObjectPath;
    ///
    /// let a = ObjectPath::new("/org/gnome/Shell")?;
    /// let b = ObjectPath::new("/org/gnome")?;
    /// assert!(a.starts_with(&b));
    /// assert!(!b.starts_with(&a));
    /// assert!(a.starts_with(&ObjectPath::ROOT));
    /// # Ok::<_, sync_dbus::ObjectPathError>(())
    /// ```
    pub fn starts_with(&self, other: &ObjectPath) -> bool {
        let mut this = self.iter();

        for component in other.iter() {
            if this.next() != Some(component) {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectPath").field(&self.as_str()).finish()
    }
}

impl FromStr for ObjectPath {
    type Err = ObjectPathError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl AsRef<str> for ObjectPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ObjectPath {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        *self.0 == *other
    }
}

impl PartialEq<&str> for ObjectPath {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        *self.0 == **other
    }
}

impl<'a> IntoIterator for &'a ObjectPath {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
