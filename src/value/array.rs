use crate::error::{Error, ErrorKind, Result};
use crate::Signature;

use super::Value;

/// A typed D-Bus array.
///
/// The array carries the signature of its element type, so that an empty
/// array still marshals with the right type.
///
/// # Examples
///
/// ```
/// use sync_dbus::{Array, Value};
///
/// let mut array = Array::new("{sv}")?;
/// array.push(Value::dict_entry("width", Value::Variant(Box::new(Value::from(640u32)))))?;
///
/// assert_eq!(array.signature(), "a{sv}");
/// assert_eq!(array.len(), 1);
/// assert!(array.push(Value::from(1u32)).is_err());
/// # Ok::<_, sync_dbus::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    signature: Signature,
    items: Vec<Value>,
}

impl Array {
    /// Construct a new empty array with the given element signature.
    ///
    /// # Errors
    ///
    /// Errors if the element signature is not a single complete type.
    pub fn new<S>(element: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let element = element.as_ref();
        let signature = Signature::new(format!("a{element}"))?;

        if element.is_empty() || !signature.is_single_complete_type() {
            return Err(Error::new(ErrorKind::InvalidArrayElement(element.into())));
        }

        Ok(Self {
            signature,
            items: Vec::new(),
        })
    }

    /// Construct an array from a collection of values.
    ///
    /// # Errors
    ///
    /// Errors if the element signature is invalid or if any value does not
    /// match it.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Array, Value};
    ///
    /// let array = Array::from_values("i", [Value::from(1i32), Value::from(2i32)])?;
    /// assert_eq!(array.items(), [Value::Int32(1), Value::Int32(2)]);
    ///
    /// assert!(Array::from_values("s", [Value::from(1i32)]).is_err());
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn from_values<S, I>(element: S, items: I) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Value>,
    {
        let mut array = Self::new(element)?;

        for item in items {
            array.push(item)?;
        }

        Ok(array)
    }

    /// Construct an array whose items are known to match the signature.
    pub(crate) fn from_parts(signature: Signature, items: Vec<Value>) -> Self {
        Self { signature, items }
    }

    /// Append a value to the array.
    ///
    /// # Errors
    ///
    /// Errors if the signature of the value does not match the element
    /// signature of the array, in which case the array is unchanged.
    pub fn push(&mut self, value: Value) -> Result<()> {
        let actual = value.signature();

        if actual.as_str() != self.element_signature() {
            return Err(Error::new(ErrorKind::ArrayElementMismatch {
                expected: self.element_signature().into(),
                actual: actual.as_str().into(),
            }));
        }

        value.check(true, 1)?;
        self.items.push(value);
        Ok(())
    }

    /// The signature of the whole array, such as `as`.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The signature of the element type, such as `s`.
    #[inline]
    pub fn element_signature(&self) -> &str {
        self.signature.as_str().get(1..).unwrap_or_default()
    }

    /// The items of the array.
    #[inline]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Convert into the items of the array.
    #[inline]
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    /// The number of items in the array.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Test if the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items of the array.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Iterate over the entries of a dictionary, which is an array of dict
    /// entries. Items which are not dict entries are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use sync_dbus::{Array, Value};
    ///
    /// let array = Array::from_values("{su}", [
    ///     Value::dict_entry("a", 1u32),
    ///     Value::dict_entry("b", 2u32),
    /// ])?;
    ///
    /// let entries = array.entries().collect::<Vec<_>>();
    /// assert_eq!(entries, [(&Value::from("a"), &Value::from(1u32)), (&Value::from("b"), &Value::from(2u32))]);
    /// # Ok::<_, sync_dbus::Error>(())
    /// ```
    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Value)> + '_ {
        self.items.iter().filter_map(|item| match item {
            Value::DictEntry(entry) => Some((&entry.0, &entry.1)),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
