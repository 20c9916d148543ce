use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::protocol::{Endianness, MAX_ARRAY_LENGTH};
use crate::signature::alignment_of;
use crate::Value;

/// Marshals values into a growing buffer.
///
/// Offsets are relative to the start of the message, which is what alignment
/// is computed from.
pub(super) struct Writer {
    buf: Vec<u8>,
    endianness: Endianness,
}

impl Writer {
    pub(super) fn new(endianness: Endianness) -> Self {
        Self {
            buf: Vec::new(),
            endianness,
        }
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(super) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Pad with zeros up to the given alignment.
    pub(super) fn pad(&mut self, align: usize) {
        let padding = padding_to(self.buf.len(), align);
        self.buf.resize(self.buf.len() + padding, 0);
    }

    /// Store an aligned number.
    pub(super) fn store<T>(&mut self, frame: T)
    where
        T: Frame,
    {
        self.pad(T::SIZE);
        frame.store_to(self.endianness, &mut self.buf);
    }

    /// Reserve space for a length which is filled in later with
    /// [`Writer::store_at`].
    pub(super) fn alloc_u32(&mut self) -> usize {
        self.pad(4);
        let at = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        at
    }

    /// Overwrite a previously allocated length.
    pub(super) fn store_at(&mut self, at: usize, value: u32) {
        let mut bytes = Vec::with_capacity(4);
        value.store_to(self.endianness, &mut bytes);
        self.buf[at..at + 4].copy_from_slice(&bytes);
    }

    /// Write a string or object path.
    pub(super) fn write_str(&mut self, string: &str) -> Result<()> {
        if string.contains('\0') {
            return Err(Error::new(ErrorKind::StringContainsNul));
        }

        let len = u32::try_from(string.len())
            .map_err(|_| Error::new(ErrorKind::MessageTooLong(string.len())))?;
        self.store(len);
        self.buf.extend_from_slice(string.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    /// Write a signature, which has a single byte length prefix.
    pub(super) fn write_signature(&mut self, signature: &str) {
        // Signatures are validated to at most 255 bytes.
        self.buf.push(signature.len() as u8);
        self.buf.extend_from_slice(signature.as_bytes());
        self.buf.push(0);
    }

    pub(super) fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Boolean(value) => self.store(u32::from(*value)),
            Value::Byte(value) => self.store(*value),
            Value::Int16(value) => self.store(*value),
            Value::UInt16(value) => self.store(*value),
            Value::Int32(value) => self.store(*value),
            Value::UInt32(value) => self.store(*value),
            Value::Int64(value) => self.store(*value),
            Value::UInt64(value) => self.store(*value),
            Value::Double(value) => self.store(*value),
            Value::String(value) => self.write_str(value)?,
            Value::ObjectPath(value) => self.write_str(value.as_str())?,
            Value::Signature(value) => self.write_signature(value.as_str()),
            Value::Array(array) => {
                let at = self.alloc_u32();
                // Padding to the element alignment is not part of the length
                // and is present even if the array is empty.
                self.pad(alignment_of(array.element_signature()));
                let start = self.buf.len();

                for item in array.items() {
                    self.write_value(item)?;
                }

                let len = self.buf.len() - start;

                if len > MAX_ARRAY_LENGTH as usize {
                    return Err(Error::new(ErrorKind::ArrayTooLong(len)));
                }

                self.store_at(at, len as u32);
            }
            Value::Struct(fields) => {
                self.pad(8);

                for field in fields {
                    self.write_value(field)?;
                }
            }
            Value::Variant(value) => {
                self.write_signature(value.signature().as_str());
                self.write_value(value)?;
            }
            Value::DictEntry(entry) => {
                self.pad(8);
                self.write_value(&entry.0)?;
                self.write_value(&entry.1)?;
            }
        }

        Ok(())
    }
}

/// Number of padding bytes needed to reach the given alignment.
#[inline]
pub(super) fn padding_to(len: usize, align: usize) -> usize {
    let mask = align - 1;
    (align - (len & mask)) & mask
}
