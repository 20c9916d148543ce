use std::sync::mpsc;
use std::time::Duration;

use anyhow::{ensure, Result};

use crate::testing::{self, GUID};
use crate::{
    Category, ConnectionBuilder, Endianness, Message, MessageKind, ObjectPath, Value,
};

const PATH: ObjectPath = ObjectPath::new_const("/se/tedro/Example");

fn ping() -> Message {
    Message::method_call(PATH, "Ping")
        .with_destination("se.tedro.Example")
        .with_interface("se.tedro.Example")
}

fn signal() -> Result<Message> {
    Ok(Message::signal(PATH, "se.tedro.Example", "Changed").with_argument(42u32)?)
}

#[test]
fn handshake_and_hello() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        let auth = bus.authenticate()?;
        ensure!(auth == "AUTH EXTERNAL 31303030", "{auth}");
        bus.hello(":1.42")
    })?;

    let c = ConnectionBuilder::new()
        .auth_external(1000)
        .connect_stream(stream)?;

    testing::join(handle)?;

    assert!(c.is_connected());
    assert_eq!(c.unique_name(), Some(":1.42"));
    assert!(format!("{c:?}").contains(":1.42"));
    assert_eq!(c.server_guid().as_str(), GUID);
    assert_eq!(c.default_timeout(), Duration::from_secs(25));
    Ok(())
}

#[test]
fn anonymous_auth() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        let auth = bus.authenticate()?;
        ensure!(auth == "AUTH ANONYMOUS 73796e632d64627573", "{auth}");
        Ok(())
    })?;

    let c = ConnectionBuilder::new()
        .auth_anonymous()
        .hello(false)
        .connect_stream(stream)?;

    testing::join(handle)?;
    assert_eq!(c.unique_name(), None);
    Ok(())
}

#[test]
fn data_challenge_is_answered() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        bus.read_auth()?;
        bus.write_line("DATA")?;
        let data = bus.read_line()?;
        ensure!(data == "DATA", "{data}");
        bus.write_line(&format!("OK {GUID}"))?;
        let begin = bus.read_line()?;
        ensure!(begin == "BEGIN", "{begin}");
        Ok(())
    })?;

    let c = ConnectionBuilder::new()
        .auth_external(0)
        .hello(false)
        .connect_stream(stream)?;

    testing::join(handle)?;
    assert_eq!(c.server_guid().as_str(), GUID);
    Ok(())
}

#[test]
fn rejected_auth() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        bus.read_auth()?;
        bus.write_line("REJECTED EXTERNAL")?;
        Ok(())
    })?;

    let error = ConnectionBuilder::new()
        .auth_anonymous()
        .connect_stream(stream)
        .unwrap_err();

    testing::join(handle)?;
    assert_eq!(error.category(), Category::ConnectionError);
    Ok(())
}

#[test]
fn closed_during_auth() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        bus.read_auth()?;
        Ok(())
    })?;

    let error = ConnectionBuilder::new()
        .auth_external(1000)
        .connect_stream(stream)
        .unwrap_err();

    testing::join(handle)?;
    assert_eq!(error.category(), Category::ConnectionError);
    Ok(())
}

#[test]
fn hello_rejected() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        bus.authenticate()?;
        let call = bus.expect_call("Hello")?;
        bus.reply_error(&call, "org.freedesktop.DBus.Error.AccessDenied", "Go away")
    })?;

    let error = ConnectionBuilder::new()
        .auth_external(1000)
        .connect_stream(stream)
        .unwrap_err();

    testing::join(handle)?;
    assert_eq!(error.category(), Category::ConnectionError);
    assert!(error.remote().is_none());
    Ok(())
}

#[test]
fn unsupported_and_unreachable_addresses() {
    let error = crate::Connection::open("tcp:host=localhost,port=1234").unwrap_err();
    assert_eq!(error.category(), Category::ConnectionError);

    let error =
        crate::Connection::open("unix:path=/nonexistent/sync-dbus/bus").unwrap_err();
    assert_eq!(error.category(), Category::ConnectionError);
}

#[test]
fn serials_are_unique_and_in_order() -> Result<()> {
    let (mut c, handle) = testing::connect(|mut bus| {
        for expected in 1..=3 {
            let m = bus.recv()?;
            ensure!(m.serial().map(|s| s.get()) == Some(expected));
            ensure!(m.member() == Some("Ping"));
            ensure!(m.destination() == Some("se.tedro.Example"));
        }

        Ok(())
    })?;

    let mut serials = Vec::new();

    for _ in 0..3 {
        serials.push(c.send(ping())?.get());
    }

    testing::join(handle)?;
    assert_eq!(serials, [1, 2, 3]);
    Ok(())
}

#[test]
fn configured_endianness() -> Result<()> {
    let (stream, handle) = testing::spawn(|mut bus| {
        bus.authenticate()?;
        let m = bus.recv()?;
        ensure!(m.endianness() == Endianness::BIG);
        Ok(())
    })?;

    let mut c = ConnectionBuilder::new()
        .auth_external(1000)
        .hello(false)
        .endianness(Endianness::BIG)
        .connect_stream(stream)?;

    c.send(ping().with_endianness(Endianness::LITTLE))?;
    testing::join(handle)?;
    Ok(())
}

#[test]
fn invalid_message_is_not_sent() -> Result<()> {
    let (mut c, handle) = testing::connect(|mut bus| {
        let m = bus.recv()?;
        ensure!(m.member() == Some("Ping"));
        Ok(())
    })?;

    let error = c
        .send(Message::method_call(PATH, "Not.Valid"))
        .unwrap_err();
    assert_eq!(error.category(), Category::InvalidArgument);
    assert!(c.is_connected());

    c.send(ping())?;
    testing::join(handle)?;
    Ok(())
}

#[test]
fn receive_message() -> Result<()> {
    let (mut c, handle) = testing::connect(|mut bus| bus.send(signal()?))?;

    let m = c.receive()?;
    testing::join(handle)?;

    assert!(matches!(m.kind(), MessageKind::Signal { .. }));
    assert_eq!(m.interface(), Some("se.tedro.Example"));
    assert_eq!(m.sender(), Some("org.freedesktop.DBus"));
    assert_eq!(m.body(), [Value::UInt32(42)]);
    Ok(())
}

#[test]
fn partial_frame_survives_timeout() -> Result<()> {
    let (tx, rx) = mpsc::channel::<()>();

    let (mut c, handle) = testing::connect(move |mut bus| {
        let frame = bus.encode(signal()?)?;
        bus.write_raw(&frame[..20])?;
        rx.recv()?;
        bus.write_raw(&frame[20..])?;
        Ok(())
    })?;

    assert!(c.receive_timeout(Duration::from_millis(50))?.is_none());
    assert!(c.is_connected());

    tx.send(())?;

    let m = c.receive()?;
    testing::join(handle)?;

    assert_eq!(m.member(), Some("Changed"));
    assert_eq!(m.body(), [Value::UInt32(42)]);
    Ok(())
}

#[test]
fn eof_mid_frame_closes_connection() -> Result<()> {
    let (mut c, handle) = testing::connect(|mut bus| {
        let frame = bus.encode(signal()?)?;
        bus.write_raw(&frame[..8])
    })?;

    testing::join(handle)?;

    let error = c.receive().unwrap_err();
    assert_eq!(error.category(), Category::ConnectionClosed);
    assert!(error.is_fatal());
    assert!(!c.is_connected());

    let error = c.send(ping()).unwrap_err();
    assert_eq!(error.category(), Category::ConnectionClosed);
    Ok(())
}

#[test]
fn malformed_frame_closes_connection() -> Result<()> {
    let (mut c, handle) = testing::connect(|mut bus| {
        let mut frame = bus.encode(signal()?)?;
        // Protocol version.
        frame[3] = 2;
        bus.write_raw(&frame)
    })?;

    let error = c.receive().unwrap_err();
    testing::join(handle)?;

    assert_eq!(error.category(), Category::MalformedMessage);
    assert!(!c.is_connected());

    let error = c.receive().unwrap_err();
    assert_eq!(error.category(), Category::ConnectionClosed);
    Ok(())
}

#[test]
fn close() -> Result<()> {
    let (mut c, handle) = testing::connect(|_| Ok(()))?;
    testing::join(handle)?;

    c.close();
    assert!(!c.is_connected());

    let error = c.send(ping()).unwrap_err();
    assert_eq!(error.category(), Category::ConnectionClosed);

    let error = c.receive().unwrap_err();
    assert_eq!(error.category(), Category::ConnectionClosed);

    // Closing twice is fine.
    c.close();
    Ok(())
}
