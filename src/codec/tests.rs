use std::thread;

use crate::error::ErrorKind;
use crate::{
    Array, Category, Endianness, Flags, Message, MessageKind, ObjectPath, Serial, Signature, Value,
};

use super::{decode, encode, frame_length};

#[rustfmt::skip]
const LE_BLOB: [u8; 36] = [
    // byte 0
    // yyyyuu fixed headers
    b'l',
    // reply (which is the simplest message)
    b'\x02',
    // no auto-starting
    b'\x02',
    // D-Bus version = 1
    b'\x01',
    // byte 4
    // bytes in body = 4
    b'\x04', b'\x00', b'\x00', b'\x00',
    // byte 8
    // serial number = 0x12345678
    b'\x78', b'\x56', b'\x34', b'\x12',
    // byte 12
    // a(uv) variable headers start here
    // bytes in array of variable headers = 15
    // pad to 8-byte boundary = nothing
    b'\x0f', b'\0', b'\0', b'\0',
    // byte 16
    // in reply to:
    b'\x05',
    // variant signature = u
    // pad to 4-byte boundary = nothing
    b'\x01', b'u', b'\0',
    // 0xabcdef12
    // pad to 8-byte boundary = nothing
    b'\x12', b'\xef', b'\xcd', b'\xab',
    // byte 24
    // signature:
    b'\x08',
    // variant signature = g
    b'\x01', b'g', b'\0',
    // 1 byte, u, NUL (no alignment needed)
    b'\x01', b'u', b'\0',
    // pad to 8-byte boundary for body
    b'\0',
    // body; byte 32
    // 0xdeadbeef
    b'\xef', b'\xbe', b'\xad', b'\xde'
];

#[rustfmt::skip]
const BE_BLOB: [u8; 36] = [
    // byte 0
    // yyyyuu fixed headers
    b'B',
    // reply (which is the simplest message)
    b'\x02',
    // no auto-starting
    b'\x02',
    // D-Bus version = 1
    b'\x01',
    // byte 4
    // bytes in body = 4
    b'\x00', b'\x00', b'\x00', b'\x04',
    // byte 8
    // serial number = 0x12345678
    b'\x12', b'\x34', b'\x56', b'\x78',
    // byte 12
    // a(uv) variable headers start here
    // bytes in array of variable headers = 15
    // pad to 8-byte boundary = nothing
    b'\0', b'\0', b'\0', b'\x0f',
    // byte 16
    // in reply to:
    b'\x05',
    // variant signature = u
    // pad to 4-byte boundary = nothing
    b'\x01', b'u', b'\0',
    // 0xabcdef12
    // pad to 8-byte boundary = nothing
    b'\xab', b'\xcd', b'\xef', b'\x12',
    // byte 24
    // signature:
    b'\x08',
    // variant signature = g
    b'\x01', b'g', b'\0',
    // 1 byte, u, NUL (no alignment needed)
    b'\x01', b'u', b'\0',
    // pad to 8-byte boundary for body
    b'\0',
    // body; byte 32
    // 0xdeadbeef
    b'\xde', b'\xad', b'\xbe', b'\xef'
];

fn serial(n: u32) -> Serial {
    Serial::new(n).unwrap()
}

fn blob_message(endianness: Endianness) -> Message {
    Message::method_return(serial(0xabcdef12))
        .with_serial(serial(0x12345678))
        .with_flags(Flags::NO_AUTO_START)
        .with_endianness(endianness)
        .with_argument(0xdeadbeefu32)
        .unwrap()
}

/// A method return with a single boolean body, see the offsets in the
/// comments of `LE_BLOB`.
fn boolean_reply() -> Vec<u8> {
    let m = Message::method_return(serial(1))
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument(true)
        .unwrap();

    encode(&m).unwrap()
}

fn decode_error(bytes: &[u8]) -> crate::Error {
    let error = decode(bytes).unwrap_err();
    assert_eq!(error.category(), Category::MalformedMessage, "{error}");
    assert!(error.is_fatal());
    error
}

#[test]
fn encode_blobs() -> anyhow::Result<()> {
    assert_eq!(encode(&blob_message(Endianness::LITTLE))?, LE_BLOB);
    assert_eq!(encode(&blob_message(Endianness::BIG))?, BE_BLOB);
    Ok(())
}

#[test]
fn decode_blobs() -> anyhow::Result<()> {
    assert_eq!(decode(&LE_BLOB)?, blob_message(Endianness::LITTLE));
    assert_eq!(decode(&BE_BLOB)?, blob_message(Endianness::BIG));

    let m = decode(&BE_BLOB)?;
    assert_eq!(m.serial(), Some(serial(0x12345678)));
    assert_eq!(m.reply_serial(), Some(serial(0xabcdef12)));
    assert_eq!(m.body(), [Value::UInt32(0xdeadbeef)]);
    Ok(())
}

#[test]
fn frame_length_from_fixed_header() -> anyhow::Result<()> {
    let mut header = [0; 16];
    header.copy_from_slice(&LE_BLOB[..16]);
    assert_eq!(frame_length(&header)?, 36);

    header.copy_from_slice(&BE_BLOB[..16]);
    assert_eq!(frame_length(&header)?, 36);

    header[0] = b'x';
    assert!(frame_length(&header).is_err());

    // Body of u32::MAX bytes.
    header.copy_from_slice(&LE_BLOB[..16]);
    header[4..8].copy_from_slice(&[0xff; 4]);
    let error = frame_length(&header).unwrap_err();
    assert_eq!(error.category(), Category::MalformedMessage);
    Ok(())
}

#[test]
fn struct_field_alignment() -> anyhow::Result<()> {
    let m = Message::method_call(ObjectPath::ROOT, "Call")
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument(Value::Struct(vec![Value::Byte(1), Value::Int32(2)]))?;

    let bytes = encode(&m)?;
    assert_eq!(bytes[4..8], [8, 0, 0, 0]);
    // One byte, three bytes of padding, then the int32.
    assert_eq!(bytes[bytes.len() - 8..], [1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(decode(&bytes)?, m);
    Ok(())
}

#[test]
fn empty_array_is_padded_to_element() -> anyhow::Result<()> {
    let m = Message::method_call(ObjectPath::ROOT, "Call")
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument(Array::new("d")?)?;

    let bytes = encode(&m)?;
    assert_eq!(bytes[4..8], [8, 0, 0, 0]);
    assert_eq!(bytes[bytes.len() - 8..], [0; 8]);

    let decoded = decode(&bytes)?;
    let array = decoded.body()[0].as_array().unwrap();
    assert!(array.is_empty());
    assert_eq!(array.element_signature(), "d");
    Ok(())
}

#[test]
fn round_trip_every_value() -> anyhow::Result<()> {
    let mut dict = Array::new("{sv}")?;
    dict.push(Value::dict_entry("x", Value::variant(10i32)))?;
    dict.push(Value::dict_entry("name", Value::variant("screen")))?;
    dict.push(Value::dict_entry(
        "nested",
        Value::variant(Value::variant(Value::Struct(vec![Value::Byte(1), Value::UInt64(2)]))),
    ))?;

    let strings = Array::from_values("as", [Array::from_values("s", [Value::from("a")])?.into()])?;

    for endianness in [Endianness::LITTLE, Endianness::BIG] {
        let mut m = Message::new_method_call(
            "org.example.Service",
            "/org/example/Object",
            "org.example.Interface",
            "Method",
        )?
        .with_serial(serial(77))
        .with_sender(":1.5")
        .with_flags(Flags::ALLOW_INTERACTIVE_AUTHORIZATION)
        .with_endianness(endianness);

        m.add_argument(false)?;
        m.add_argument(0xffu8)?;
        m.add_argument(-2i16)?;
        m.add_argument(3u16)?;
        m.add_argument(-4i32)?;
        m.add_argument(5u32)?;
        m.add_argument(-6i64)?;
        m.add_argument(7u64)?;
        m.add_argument(8.5f64)?;
        m.add_argument("nine")?;
        m.add_argument(ObjectPath::new("/ten")?)?;
        m.add_argument(Signature::new("a{sv}")?)?;
        m.add_argument(dict.clone())?;
        m.add_argument(strings.clone())?;
        m.add_argument(Value::Struct(vec![Value::from("s"), Value::Struct(vec![Value::Int16(1)])]))?;

        assert_eq!(m.signature(), "bynqiuxtdsoga{sv}aas(s(n))");

        let bytes = encode(&m)?;
        assert_eq!(frame_length(bytes[..16].try_into()?)?, bytes.len());
        assert_eq!(decode(&bytes)?, m);
    }

    Ok(())
}

#[test]
fn signal_round_trip() -> anyhow::Result<()> {
    let m = Message::signal(ObjectPath::new("/org/example")?, "org.example.Iface", "Changed")
        .with_serial(serial(3))
        .with_argument(1u32)?;

    let decoded = decode(&encode(&m)?)?;
    assert_eq!(decoded, m);
    assert!(matches!(decoded.kind(), MessageKind::Signal { .. }));
    Ok(())
}

#[test]
fn error_round_trip() -> anyhow::Result<()> {
    let m = Message::error("org.example.Error.Failed", serial(9))
        .with_serial(serial(10))
        .with_argument("failure detail")?;

    let decoded = decode(&encode(&m)?)?;
    assert_eq!(decoded.error_name(), Some("org.example.Error.Failed"));
    assert_eq!(decoded.reply_serial(), Some(serial(9)));
    assert_eq!(decoded, m);
    Ok(())
}

#[test]
fn encode_requires_serial() {
    let m = Message::method_call(ObjectPath::ROOT, "Call");
    let error = encode(&m).unwrap_err();
    assert_eq!(error.category(), Category::InvalidArgument);
}

#[test]
fn encode_validates_names() {
    let m = Message::method_call(ObjectPath::ROOT, "Call")
        .with_serial(serial(1))
        .with_destination("not a name");

    let error = encode(&m).unwrap_err();
    assert_eq!(error.category(), Category::InvalidArgument);
}

#[test]
fn invalid_boolean() {
    let mut bytes = boolean_reply();
    assert_eq!(bytes[32], 1);
    bytes[32] = 2;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::InvalidBoolean(2)));
}

#[test]
fn non_zero_padding() {
    let mut bytes = boolean_reply();
    bytes[31] = 1;
    assert!(matches!(
        decode_error(&bytes).kind(),
        ErrorKind::NonZeroPadding { offset: 31 }
    ));
}

#[test]
fn invalid_fixed_header() {
    let mut bytes = boolean_reply();
    bytes[0] = b'x';
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::InvalidEndianness(b'x')));

    let mut bytes = boolean_reply();
    bytes[1] = 5;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::InvalidMessageType(5)));

    let mut bytes = boolean_reply();
    bytes[3] = 2;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::InvalidProtocolVersion(2)));

    let mut bytes = boolean_reply();
    bytes[8..12].copy_from_slice(&[0; 4]);
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::ZeroSerial));

    let mut bytes = boolean_reply();
    bytes[20..24].copy_from_slice(&[0; 4]);
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::ZeroReplySerial));
}

#[test]
fn body_length_mismatch() {
    let bytes = boolean_reply();
    assert!(matches!(
        decode_error(&bytes[..bytes.len() - 1]).kind(),
        ErrorKind::BodyLengthMismatch { declared: 4, consumed: 3 }
    ));

    let mut bytes = boolean_reply();
    bytes.extend_from_slice(&[0; 4]);
    assert!(matches!(
        decode_error(&bytes).kind(),
        ErrorKind::BodyLengthMismatch { declared: 4, consumed: 8 }
    ));
}

#[test]
fn missing_required_headers() {
    // A method return relabeled as a method call has no path.
    let mut bytes = boolean_reply();
    bytes[1] = 1;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::MissingPath));

    // A method call relabeled as a method return has no reply serial.
    let m = Message::method_call(ObjectPath::ROOT, "Call").with_serial(serial(1));
    let mut bytes = encode(&m).unwrap();
    bytes[1] = 2;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::MissingReplySerial));

    // ... and as an error it has no error name.
    bytes[1] = 3;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::MissingErrorName));

    // ... and as a signal it has no interface.
    bytes[1] = 4;
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::MissingInterface));
}

#[test]
fn header_field_of_wrong_type() {
    // Relabel REPLY_SERIAL as PATH, which must be an object path.
    let mut bytes = boolean_reply();
    assert_eq!(bytes[16], 5);
    bytes[16] = 1;
    assert!(matches!(
        decode_error(&bytes).kind(),
        ErrorKind::InvalidHeaderField { code: 1, .. }
    ));
}

#[test]
fn unknown_header_field_is_skipped() -> anyhow::Result<()> {
    let m = Message::method_return(serial(1))
        .with_serial(serial(2))
        .with_endianness(Endianness::LITTLE)
        .with_destination(":1.1");

    let mut bytes = encode(&m)?;
    assert_eq!(bytes[24], 6);
    bytes[24] = 0x30;

    let decoded = decode(&bytes)?;
    assert_eq!(decoded.destination(), None);
    assert_eq!(decoded.reply_serial(), Some(serial(1)));
    Ok(())
}

#[test]
fn unix_fd_has_no_decode_rule() {
    let m = Message::method_return(serial(1))
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument(5u32)
        .unwrap();

    let mut bytes = encode(&m).unwrap();
    assert_eq!(bytes[29], b'u');
    bytes[29] = b'h';
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::NoDecodeRule('h')));
}

#[test]
fn malformed_strings() {
    let m = Message::method_return(serial(1))
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument("abc")
        .unwrap();

    let bytes = encode(&m).unwrap();
    // Length prefix at 32, then "abc" and the terminating nul.
    assert_eq!(bytes[32..], [3, 0, 0, 0, b'a', b'b', b'c', 0]);

    let mut missing_nul = bytes.clone();
    missing_nul[39] = b'd';
    assert!(matches!(decode_error(&missing_nul).kind(), ErrorKind::NotNullTerminated));

    let mut embedded_nul = bytes.clone();
    embedded_nul[37] = 0;
    assert!(matches!(decode_error(&embedded_nul).kind(), ErrorKind::EmbeddedNul));

    let mut invalid_utf8 = bytes.clone();
    invalid_utf8[37] = 0xff;
    assert!(matches!(decode_error(&invalid_utf8).kind(), ErrorKind::Utf8(..)));
}

#[test]
fn oversized_array() {
    let m = Message::method_return(serial(1))
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE)
        .with_argument(Array::new("y").unwrap())
        .unwrap();

    let mut bytes = encode(&m).unwrap();
    bytes[32..36].copy_from_slice(&((1u32 << 26) + 1).to_le_bytes());
    assert!(matches!(decode_error(&bytes).kind(), ErrorKind::ArrayTooLongOnWire(..)));
}

/// Encode a body of one value without the nesting checks done by
/// `Message::add_argument`, the way a misbehaving peer could.
fn unchecked_frame(value: Value) -> Vec<u8> {
    let mut m = Message::method_return(serial(1))
        .with_serial(serial(1))
        .with_endianness(Endianness::LITTLE);

    m.signature = value.signature();
    m.body = vec![value];
    encode(&m).unwrap()
}

/// Arrays of variants, nested `n` times, adding two containers per level.
fn nested_variant_arrays(n: usize) -> Value {
    let mut value = Value::from(1u8);

    for _ in 0..n {
        let signature = Signature::new("av").unwrap();
        value = Value::Array(Array::from_parts(signature, vec![Value::variant(value)]));
    }

    value
}

#[test]
fn combined_nesting_limit() -> anyhow::Result<()> {
    let m = decode(&unchecked_frame(nested_variant_arrays(32)))?;
    assert_eq!(m.signature(), "av");

    // Only 33 variants, but 66 containers in total.
    let error = decode_error(&unchecked_frame(nested_variant_arrays(33)));
    assert!(matches!(error.kind(), ErrorKind::NestingTooDeep));
    Ok(())
}

#[test]
fn deep_nesting_does_not_exhaust_stack() -> anyhow::Result<()> {
    // Every variant wraps 32 arrays around 31 structs, which individually
    // respect the signature limits.
    fn build() -> Vec<u8> {
        let mut value = Value::from(1u8);

        for _ in 0..63 {
            value = Value::variant(value);

            for _ in 0..31 {
                value = Value::Struct(vec![value]);
            }

            for _ in 0..32 {
                let signature = Signature::new(format!("a{}", value.signature())).unwrap();
                value = Value::Array(Array::from_parts(signature, vec![value]));
            }
        }

        unchecked_frame(value)
    }

    let frame = thread::Builder::new()
        .stack_size(256 << 20)
        .spawn(build)?
        .join()
        .map_err(|_| anyhow::anyhow!("building frame panicked"))?;

    let result = thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || decode(&frame).map(|_| ()))?
        .join()
        .map_err(|_| anyhow::anyhow!("decoding panicked"))?;

    let error = result.unwrap_err();
    assert_eq!(error.category(), Category::MalformedMessage);
    assert!(matches!(error.kind(), ErrorKind::NestingTooDeep));
    Ok(())
}
