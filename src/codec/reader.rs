use std::str::from_utf8;

use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::protocol::{Endianness, Type, MAX_ARRAY_LENGTH, MAX_TOTAL_DEPTH};
use crate::signature::{alignment_of, split_single};
use crate::{Array, ObjectPath, Signature, Value};

use super::padding_to;

/// Unmarshals values from a complete message.
pub(super) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> Reader<'a> {
    pub(super) fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endianness,
        }
    }

    #[inline]
    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    /// Skip padding up to the given alignment. Padding must be zeroed.
    pub(super) fn align(&mut self, align: usize) -> Result<()> {
        let padding = padding_to(self.pos, align);
        let bytes = self.take(padding)?;

        if let Some(n) = bytes.iter().position(|&b| b != 0) {
            return Err(Error::new(ErrorKind::NonZeroPadding {
                offset: self.pos - padding + n,
            }));
        }

        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::new(ErrorKind::BufferUnderflow))?;

        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Load an aligned number.
    pub(super) fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        self.align(T::SIZE)?;
        let bytes = self.take(T::SIZE)?;
        Ok(T::load_from(bytes, self.endianness))
    }

    fn read_nul(&mut self) -> Result<()> {
        match self.take(1)? {
            [0] => Ok(()),
            _ => Err(Error::new(ErrorKind::NotNullTerminated)),
        }
    }

    /// Read a string or object path.
    pub(super) fn read_str(&mut self) -> Result<&'a str> {
        let len = self.load::<u32>()? as usize;
        let bytes = self.take(len)?;
        self.read_nul()?;

        if bytes.contains(&0) {
            return Err(Error::new(ErrorKind::EmbeddedNul));
        }

        Ok(from_utf8(bytes)?)
    }

    /// Read a signature, which has a single byte length prefix.
    pub(super) fn read_signature(&mut self) -> Result<Signature> {
        let len = self.load::<u8>()? as usize;
        let bytes = self.take(len)?;
        self.read_nul()?;
        let string = from_utf8(bytes)?;

        Signature::new(string.to_owned())
            .map_err(|error| Error::new(ErrorKind::MalformedSignature(error)))
    }

    /// Read a single value of the given single complete type.
    ///
    /// `depth` is the number of containers enclosing the value, which
    /// counts variants as well as arrays, structs and dict entries.
    pub(super) fn read_value(&mut self, signature: &str, depth: usize) -> Result<Value> {
        let Some(&code) = signature.as_bytes().first() else {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        };

        let value = match Type(code) {
            Type::BYTE => Value::Byte(self.load()?),
            Type::BOOLEAN => match self.load::<u32>()? {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                n => return Err(Error::new(ErrorKind::InvalidBoolean(n))),
            },
            Type::INT16 => Value::Int16(self.load()?),
            Type::UINT16 => Value::UInt16(self.load()?),
            Type::INT32 => Value::Int32(self.load()?),
            Type::UINT32 => Value::UInt32(self.load()?),
            Type::INT64 => Value::Int64(self.load()?),
            Type::UINT64 => Value::UInt64(self.load()?),
            Type::DOUBLE => Value::Double(self.load()?),
            Type::STRING => Value::String(self.read_str()?.to_owned()),
            Type::OBJECT_PATH => {
                let path = self.read_str()?;

                let path = ObjectPath::new(path.to_owned())
                    .map_err(|error| Error::new(ErrorKind::MalformedObjectPath(error)))?;

                Value::ObjectPath(path)
            }
            Type::SIGNATURE => Value::Signature(self.read_signature()?),
            Type::ARRAY => Value::Array(self.read_array(signature, enter(depth)?)?),
            Type::OPEN_PAREN => {
                let depth = enter(depth)?;
                self.align(8)?;

                let mut rest = signature
                    .get(1..signature.len() - 1)
                    .unwrap_or_default();

                let mut fields = Vec::new();

                while let Some((head, tail)) = split_single(rest) {
                    fields.push(self.read_value(head, depth)?);
                    rest = tail;
                }

                Value::Struct(fields)
            }
            Type::OPEN_BRACE => {
                let depth = enter(depth)?;
                self.align(8)?;

                let inner = signature
                    .get(1..signature.len() - 1)
                    .unwrap_or_default();

                let Some((key, value)) = split_single(inner) else {
                    return Err(Error::new(ErrorKind::BufferUnderflow));
                };

                let key = self.read_value(key, depth)?;
                let value = self.read_value(value, depth)?;
                Value::DictEntry(Box::new((key, value)))
            }
            Type::VARIANT => {
                let depth = enter(depth)?;
                let signature = self.read_signature()?;

                if !signature.is_single_complete_type() {
                    return Err(Error::new(ErrorKind::VariantNotSingleType(
                        signature.as_str().into(),
                    )));
                }

                Value::Variant(Box::new(self.read_value(signature.as_str(), depth)?))
            }
            _ => return Err(Error::new(ErrorKind::NoDecodeRule(char::from(code)))),
        };

        Ok(value)
    }

    fn read_array(&mut self, signature: &str, depth: usize) -> Result<Array> {
        let element = signature.get(1..).unwrap_or_default();
        let len = self.load::<u32>()?;

        if len > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::ArrayTooLongOnWire(len)));
        }

        // Padding to the first element is present even for empty arrays.
        self.align(alignment_of(element))?;

        let start = self.pos;
        let end = start + len as usize;

        if end > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let mut items = Vec::new();

        while self.pos < end {
            items.push(self.read_value(element, depth)?);
        }

        if self.pos != end {
            return Err(Error::new(ErrorKind::ArrayLengthMismatch {
                declared: len as usize,
                consumed: self.pos - start,
            }));
        }

        let signature = Signature::new_unchecked(signature.to_owned());
        Ok(Array::from_parts(signature, items))
    }
}

/// Enter a container at the given depth.
fn enter(depth: usize) -> Result<usize> {
    if depth >= MAX_TOTAL_DEPTH {
        return Err(Error::new(ErrorKind::NestingTooDeep));
    }

    Ok(depth + 1)
}
