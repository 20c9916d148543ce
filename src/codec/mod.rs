//! Marshalling of messages to and from the D-Bus wire format.

use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::protocol::{
    Endianness, Flags, HeaderField, MessageType, FIXED_HEADER_LENGTH, MAX_ARRAY_LENGTH,
    MAX_MESSAGE_LENGTH, PROTOCOL_VERSION,
};
use crate::{Message, MessageKind, ObjectPath, Serial, Signature, Value};

use self::reader::Reader;
mod reader;

use self::writer::{padding_to, Writer};
mod writer;

#[cfg(test)]
mod tests;

/// Encode a message which has been assigned a serial.
///
/// # Errors
///
/// Errors if the message has no serial, if one of its header names is invalid
/// or if it exceeds the protocol limits.
pub(crate) fn encode(message: &Message) -> Result<Vec<u8>> {
    let serial = message
        .serial
        .ok_or_else(|| Error::new(ErrorKind::MissingSerial))?;

    message.validate_names()?;

    let mut w = Writer::new(message.endianness);
    w.store(message.endianness.0);
    w.store(message.message_type().0);
    w.store(message.flags.0);
    w.store(PROTOCOL_VERSION);
    let body_length_at = w.alloc_u32();
    w.store(serial.get());

    let fields_length_at = w.alloc_u32();
    w.pad(8);
    let fields_start = w.len();

    if let Some(path) = message.path() {
        header_field(&mut w, HeaderField::PATH, "o").write_str(path.as_str())?;
    }

    if let Some(interface) = message.interface() {
        header_field(&mut w, HeaderField::INTERFACE, "s").write_str(interface)?;
    }

    if let Some(member) = message.member() {
        header_field(&mut w, HeaderField::MEMBER, "s").write_str(member)?;
    }

    if let Some(error_name) = message.error_name() {
        header_field(&mut w, HeaderField::ERROR_NAME, "s").write_str(error_name)?;
    }

    if let Some(reply_serial) = message.reply_serial() {
        header_field(&mut w, HeaderField::REPLY_SERIAL, "u").store(reply_serial.get());
    }

    if let Some(destination) = message.destination() {
        header_field(&mut w, HeaderField::DESTINATION, "s").write_str(destination)?;
    }

    if let Some(sender) = message.sender() {
        header_field(&mut w, HeaderField::SENDER, "s").write_str(sender)?;
    }

    if !message.signature.is_empty() {
        header_field(&mut w, HeaderField::SIGNATURE, "g")
            .write_signature(message.signature.as_str());
    }

    let fields_length = w.len() - fields_start;

    if fields_length > MAX_ARRAY_LENGTH as usize {
        return Err(Error::new(ErrorKind::ArrayTooLong(fields_length)));
    }

    w.store_at(fields_length_at, fields_length as u32);
    w.pad(8);

    let body_start = w.len();

    for value in &message.body {
        w.write_value(value)?;
    }

    let body_length = w.len() - body_start;

    if w.len() > MAX_MESSAGE_LENGTH as usize {
        return Err(Error::new(ErrorKind::MessageTooLong(w.len())));
    }

    w.store_at(body_length_at, body_length as u32);
    Ok(w.into_bytes())
}

/// Start a header field struct, leaving the writer ready for its value.
fn header_field<'a>(w: &'a mut Writer, field: HeaderField, signature: &str) -> &'a mut Writer {
    w.pad(8);
    w.store(field.0);
    w.write_signature(signature);
    w
}

/// Compute the total length of a message from its fixed header.
///
/// # Errors
///
/// Errors if the endianness marker is invalid or the declared length exceeds
/// the protocol maximum.
pub(crate) fn frame_length(header: &[u8; FIXED_HEADER_LENGTH]) -> Result<usize> {
    let endianness = Endianness::from_marker(header[0])
        .ok_or_else(|| Error::new(ErrorKind::InvalidEndianness(header[0])))?;

    let body_length = u64::from(u32::load_from(&header[4..8], endianness));
    let fields_length = u32::load_from(&header[12..16], endianness) as usize;

    let header_length = FIXED_HEADER_LENGTH + fields_length;
    let header_length = header_length + padding_to(header_length, 8);
    let total = header_length as u64 + body_length;

    if total > u64::from(MAX_MESSAGE_LENGTH) {
        return Err(Error::new(ErrorKind::MessageTooLongOnWire(total)));
    }

    Ok(total as usize)
}

#[derive(Default)]
struct Headers {
    path: Option<ObjectPath>,
    interface: Option<Box<str>>,
    member: Option<Box<str>>,
    error_name: Option<Box<str>>,
    reply_serial: Option<Serial>,
    destination: Option<Box<str>>,
    sender: Option<Box<str>>,
    signature: Option<Signature>,
}

/// Decode exactly one complete message.
///
/// # Errors
///
/// Errors with a malformed message error if the bytes are not a valid message.
pub(crate) fn decode(bytes: &[u8]) -> Result<Message> {
    let Some(&marker) = bytes.first() else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    let endianness = Endianness::from_marker(marker)
        .ok_or_else(|| Error::new(ErrorKind::InvalidEndianness(marker)))?;

    let mut r = Reader::new(bytes, endianness);
    r.load::<u8>()?;

    let message_type = MessageType(r.load::<u8>()?);

    if !matches!(
        message_type,
        MessageType::METHOD_CALL
            | MessageType::METHOD_RETURN
            | MessageType::ERROR
            | MessageType::SIGNAL
    ) {
        return Err(Error::new(ErrorKind::InvalidMessageType(message_type.0)));
    }

    let flags = Flags(r.load::<u8>()?);
    let version = r.load::<u8>()?;

    if version != PROTOCOL_VERSION {
        return Err(Error::new(ErrorKind::InvalidProtocolVersion(version)));
    }

    let body_length = r.load::<u32>()? as usize;

    let serial =
        Serial::new(r.load::<u32>()?).ok_or_else(|| Error::new(ErrorKind::ZeroSerial))?;

    let fields_length = r.load::<u32>()?;

    if fields_length > MAX_ARRAY_LENGTH {
        return Err(Error::new(ErrorKind::ArrayTooLongOnWire(fields_length)));
    }

    let fields_length = fields_length as usize;
    let fields_start = r.pos();
    let fields_end = fields_start + fields_length;
    let mut headers = Headers::default();

    while r.pos() < fields_end {
        r.align(8)?;
        let code = r.load::<u8>()?;
        let signature = r.read_signature()?;

        if !signature.is_single_complete_type() {
            return Err(Error::new(ErrorKind::VariantNotSingleType(
                signature.as_str().into(),
            )));
        }

        let value = r.read_value(signature.as_str(), 0)?;
        read_header_field(&mut headers, HeaderField(code), value)?;
    }

    if r.pos() != fields_end {
        return Err(Error::new(ErrorKind::HeaderLengthMismatch {
            declared: fields_length,
            consumed: r.pos() - fields_start,
        }));
    }

    r.align(8)?;

    let body_start = r.pos();
    let available = bytes.len() - body_start;

    if available != body_length {
        return Err(Error::new(ErrorKind::BodyLengthMismatch {
            declared: body_length,
            consumed: available,
        }));
    }

    let signature = headers.signature.unwrap_or_default();
    let mut body = Vec::new();

    for ty in &signature {
        body.push(r.read_value(ty, 0)?);
    }

    let consumed = r.pos() - body_start;

    if consumed != body_length {
        return Err(Error::new(ErrorKind::BodyLengthMismatch {
            declared: body_length,
            consumed,
        }));
    }

    let kind = match message_type {
        MessageType::METHOD_CALL => MessageKind::MethodCall {
            path: headers.path.ok_or_else(|| Error::new(ErrorKind::MissingPath))?,
            member: headers
                .member
                .ok_or_else(|| Error::new(ErrorKind::MissingMember))?,
        },
        MessageType::METHOD_RETURN => MessageKind::MethodReturn {
            reply_serial: headers
                .reply_serial
                .ok_or_else(|| Error::new(ErrorKind::MissingReplySerial))?,
        },
        MessageType::ERROR => MessageKind::Error {
            error_name: headers
                .error_name
                .ok_or_else(|| Error::new(ErrorKind::MissingErrorName))?,
            reply_serial: headers
                .reply_serial
                .ok_or_else(|| Error::new(ErrorKind::MissingReplySerial))?,
        },
        _ => {
            if headers.interface.is_none() {
                return Err(Error::new(ErrorKind::MissingInterface));
            }

            MessageKind::Signal {
                path: headers.path.ok_or_else(|| Error::new(ErrorKind::MissingPath))?,
                member: headers
                    .member
                    .ok_or_else(|| Error::new(ErrorKind::MissingMember))?,
            }
        }
    };

    Ok(Message {
        kind,
        serial: Some(serial),
        flags,
        interface: headers.interface,
        destination: headers.destination,
        sender: headers.sender,
        signature,
        body,
        endianness,
    })
}

fn read_header_field(headers: &mut Headers, field: HeaderField, value: Value) -> Result<()> {
    match (field, value) {
        (HeaderField::PATH, Value::ObjectPath(path)) => {
            headers.path = Some(path);
        }
        (HeaderField::INTERFACE, Value::String(string)) => {
            headers.interface = Some(string.into());
        }
        (HeaderField::MEMBER, Value::String(string)) => {
            headers.member = Some(string.into());
        }
        (HeaderField::ERROR_NAME, Value::String(string)) => {
            headers.error_name = Some(string.into());
        }
        (HeaderField::REPLY_SERIAL, Value::UInt32(serial)) => {
            let serial = Serial::new(serial).ok_or_else(|| Error::new(ErrorKind::ZeroReplySerial))?;
            headers.reply_serial = Some(serial);
        }
        (HeaderField::DESTINATION, Value::String(string)) => {
            headers.destination = Some(string.into());
        }
        (HeaderField::SENDER, Value::String(string)) => {
            headers.sender = Some(string.into());
        }
        (HeaderField::SIGNATURE, Value::Signature(signature)) => {
            headers.signature = Some(signature);
        }
        // File descriptors are never passed, so the count is ignored.
        (HeaderField::UNIX_FDS, Value::UInt32(..)) => {}
        (field, value) if field.0 >= HeaderField::PATH.0 && field.0 <= HeaderField::UNIX_FDS.0 => {
            return Err(Error::new(ErrorKind::InvalidHeaderField {
                code: field.0,
                signature: value.signature().as_str().into(),
            }));
        }
        _ => {
            tracing::trace!(code = field.0, "skipping unknown header field");
        }
    }

    Ok(())
}
