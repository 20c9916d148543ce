//! An in-process stand-in for a message bus daemon.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};

use anyhow::{bail, ensure, Context, Result};

use crate::codec;
use crate::message::SerialCounter;
use crate::protocol::FIXED_HEADER_LENGTH;
use crate::{Connection, ConnectionBuilder, Message, Serial, Value};

pub(crate) const GUID: &str = "5e1f0c4a9b6d2e7f8a3c1b0d4e6f7a8b";

/// The server side of a socket pair, speaking just enough of the bus
/// protocol for tests.
pub(crate) struct FakeBus {
    stream: UnixStream,
    serials: SerialCounter,
}

impl FakeBus {
    /// Read one CRLF terminated SASL line.
    pub(crate) fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0];

        loop {
            self.stream.read_exact(&mut byte)?;

            if byte[0] == b'\n' {
                break;
            }

            line.push(byte[0]);
        }

        ensure!(line.pop() == Some(b'\r'), "line is not terminated by CRLF");
        Ok(String::from_utf8(line)?)
    }

    pub(crate) fn write_line(&mut self, line: &str) -> Result<()> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\r\n")?;
        Ok(())
    }

    /// Read the leading nul byte and the `AUTH` line.
    pub(crate) fn read_auth(&mut self) -> Result<String> {
        let mut nul = [0xff];
        self.stream.read_exact(&mut nul)?;
        ensure!(nul == [0], "expected leading nul byte, got {nul:?}");
        self.read_line()
    }

    /// Accept any authentication and wait for `BEGIN`, returning the `AUTH`
    /// line.
    pub(crate) fn authenticate(&mut self) -> Result<String> {
        let auth = self.read_auth()?;
        self.write_line(&format!("OK {GUID}"))?;
        let begin = self.read_line()?;
        ensure!(begin == "BEGIN", "expected BEGIN, got {begin:?}");
        Ok(auth)
    }

    /// Receive and decode one message.
    pub(crate) fn recv(&mut self) -> Result<Message> {
        let mut header = [0; FIXED_HEADER_LENGTH];
        self.stream.read_exact(&mut header)?;
        let total = codec::frame_length(&header)?;

        let mut frame = header.to_vec();
        frame.resize(total, 0);
        self.stream.read_exact(&mut frame[FIXED_HEADER_LENGTH..])?;
        Ok(codec::decode(&frame)?)
    }

    /// Encode a message as sent by the bus, without writing it.
    pub(crate) fn encode(&mut self, message: Message) -> Result<Vec<u8>> {
        let serial = self.serials.next_serial();
        let message = message
            .with_serial(serial)
            .with_sender("org.freedesktop.DBus");
        Ok(codec::encode(&message)?)
    }

    pub(crate) fn send(&mut self, message: Message) -> Result<()> {
        let frame = self.encode(message)?;
        self.write_raw(&frame)
    }

    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    /// Receive a method call with the given member.
    pub(crate) fn expect_call(&mut self, member: &str) -> Result<Message> {
        let m = self.recv()?;
        ensure!(
            m.member() == Some(member),
            "expected call to {member}, got {:?}",
            m.member()
        );
        Ok(m)
    }

    /// Reply to a call with a method return.
    pub(crate) fn reply<I>(&mut self, call: &Message, arguments: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut m = Message::method_return(serial_of(call)?);

        for argument in arguments {
            m.add_argument(argument)?;
        }

        self.send(m)
    }

    /// Reply to a call with an error.
    pub(crate) fn reply_error(&mut self, call: &Message, name: &str, detail: &str) -> Result<()> {
        let m = Message::error(name, serial_of(call)?).with_argument(detail)?;
        self.send(m)
    }

    /// Answer `Hello` with the given unique name.
    pub(crate) fn hello(&mut self, name: &str) -> Result<()> {
        let call = self.expect_call("Hello")?;
        ensure!(call.destination() == Some("org.freedesktop.DBus"));
        ensure!(call.interface() == Some("org.freedesktop.DBus"));
        self.reply(&call, [Value::from(name)])
    }
}

fn serial_of(m: &Message) -> Result<Serial> {
    m.serial().context("message has no serial")
}

/// Run a fake bus on a thread, returning the client end of the socket.
pub(crate) fn spawn<F>(f: F) -> Result<(UnixStream, JoinHandle<Result<()>>)>
where
    F: FnOnce(FakeBus) -> Result<()> + Send + 'static,
{
    let (client, server) = UnixStream::pair()?;

    let handle = thread::spawn(move || {
        f(FakeBus {
            stream: server,
            serials: SerialCounter::default(),
        })
    });

    Ok((client, handle))
}

/// Connect to a fake bus which accepts authentication and then runs `f`.
///
/// `Hello` is not sent, so the first serial used by the connection is 1.
pub(crate) fn connect<F>(f: F) -> Result<(Connection, JoinHandle<Result<()>>)>
where
    F: FnOnce(FakeBus) -> Result<()> + Send + 'static,
{
    let (stream, handle) = spawn(move |mut bus| {
        bus.authenticate()?;
        f(bus)
    })?;

    let c = ConnectionBuilder::new()
        .auth_external(1000)
        .hello(false)
        .connect_stream(stream)?;

    Ok((c, handle))
}

/// Wait for the fake bus to finish, surfacing its errors.
pub(crate) fn join(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(..) => bail!("fake bus panicked"),
    }
}
