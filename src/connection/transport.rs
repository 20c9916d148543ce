use std::fmt;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Instant;

use crate::codec;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::FIXED_HEADER_LENGTH;
use crate::sasl::{SaslRequest, SaslResponse};
use crate::utils::trim_end;

/// Number of bytes read from the socket at a time.
const CHUNK_LENGTH: usize = 8192;

/// The longest SASL line we are prepared to buffer.
const MAX_SASL_LINE: usize = 16384;

#[derive(Debug, Clone, Copy)]
pub(crate) enum SaslState {
    // SASL state before the leading nul byte has been sent.
    Init,
    // Waiting for or sending SASL lines.
    Idle,
}

impl fmt::Display for SaslState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaslState::Init => write!(f, "sasl-init"),
            SaslState::Idle => write!(f, "sasl-idle"),
        }
    }
}

/// The state of the transport.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TransportState {
    // Newly opened socket in the SASL state.
    Sasl(SaslState),
    // Connection is open and idle.
    Idle,
    /// A frame of the given total length is being received.
    RecvBody(usize),
    /// The transport has been shut down.
    Closed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Sasl(state) => write!(f, "sasl ({state})"),
            TransportState::Idle => write!(f, "idle"),
            TransportState::RecvBody(..) => write!(f, "recv-body"),
            TransportState::Closed => write!(f, "closed"),
        }
    }
}

/// A framed byte stream over a unix socket.
pub(crate) struct Transport {
    // Stream of the connection.
    stream: UnixStream,
    // The state of the connection.
    state: TransportState,
    // Bytes received but not yet handed out. Partially read frames stay here
    // across timeouts.
    recv: Vec<u8>,
}

impl Transport {
    /// Construct a transport directly from a unix stream.
    pub(crate) fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            state: TransportState::Sasl(SaslState::Init),
            recv: Vec::new(),
        }
    }

    /// Test if the transport has been shut down.
    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.state, TransportState::Closed)
    }

    /// Send a SASL line. Sending `BEGIN` switches to the binary protocol.
    pub(crate) fn sasl_send(&mut self, request: &SaslRequest<'_>) -> Result<()> {
        let mut buf = Vec::new();

        match self.state {
            TransportState::Sasl(SaslState::Init) => {
                buf.push(0);
            }
            TransportState::Sasl(SaslState::Idle) => {}
            TransportState::Closed => return Err(Error::new(ErrorKind::Closed)),
            state => return Err(Error::new(ErrorKind::InvalidState(state))),
        }

        request.write_to(&mut buf);
        tracing::trace!(line = %String::from_utf8_lossy(trim_end(&buf)), "sasl request");
        self.stream.write_all(&buf)?;
        self.stream.flush()?;

        self.state = match request {
            SaslRequest::Begin => TransportState::Idle,
            _ => TransportState::Sasl(SaslState::Idle),
        };

        Ok(())
    }

    /// Receive a single SASL line.
    pub(crate) fn sasl_recv(&mut self) -> Result<SaslResponse> {
        match self.state {
            TransportState::Sasl(SaslState::Idle) => {}
            TransportState::Closed => return Err(Error::new(ErrorKind::Closed)),
            state => return Err(Error::new(ErrorKind::InvalidState(state))),
        }

        loop {
            if let Some(n) = self.recv.iter().position(|&b| b == b'\n') {
                let line = self.recv.drain(..=n).collect::<Vec<u8>>();
                tracing::trace!(line = %String::from_utf8_lossy(trim_end(&line)), "sasl response");
                return SaslResponse::parse(&line);
            }

            if self.recv.len() > MAX_SASL_LINE {
                return Err(Error::new(ErrorKind::InvalidSasl(
                    "line too long".into(),
                )));
            }

            self.recv_some(None)?;
        }
    }

    /// Write one complete frame.
    pub(crate) fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        match self.state {
            TransportState::Idle | TransportState::RecvBody(..) => {}
            TransportState::Closed => return Err(Error::new(ErrorKind::Closed)),
            state => return Err(Error::new(ErrorKind::InvalidState(state))),
        }

        self.stream.write_all(frame)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Receive one complete frame.
    ///
    /// Returns `None` if the deadline passes before the frame is complete.
    /// Whatever has been read so far is kept for the next call.
    pub(crate) fn recv_frame(&mut self, deadline: Option<Instant>) -> Result<Option<Vec<u8>>> {
        loop {
            match self.state {
                TransportState::Idle => {
                    let Some(header) = self.recv.get(..FIXED_HEADER_LENGTH) else {
                        if !self.recv_some(deadline)? {
                            return Ok(None);
                        }

                        continue;
                    };

                    let mut fixed = [0; FIXED_HEADER_LENGTH];
                    fixed.copy_from_slice(header);
                    let total = codec::frame_length(&fixed)?;
                    self.state = TransportState::RecvBody(total);
                }
                TransportState::RecvBody(total) => {
                    if self.recv.len() < total {
                        if !self.recv_some(deadline)? {
                            return Ok(None);
                        }

                        continue;
                    }

                    let frame = self.recv.drain(..total).collect::<Vec<u8>>();
                    self.state = TransportState::Idle;
                    tracing::trace!(len = frame.len(), "received frame");
                    return Ok(Some(frame));
                }
                TransportState::Closed => return Err(Error::new(ErrorKind::Closed)),
                state => return Err(Error::new(ErrorKind::InvalidState(state))),
            }
        }
    }

    /// Shut down the socket and drop anything buffered.
    pub(crate) fn shutdown(&mut self) {
        if let Err(error) = self.stream.shutdown(Shutdown::Both) {
            tracing::trace!(%error, "shutting down socket");
        }

        self.state = TransportState::Closed;
        self.recv = Vec::new();
    }

    /// Read whatever is available into the receive buffer.
    ///
    /// Returns `false` if the deadline passed before anything arrived.
    fn recv_some(&mut self, deadline: Option<Instant>) -> Result<bool> {
        let timeout = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());

                if remaining.is_zero() {
                    return Ok(false);
                }

                Some(remaining)
            }
            None => None,
        };

        self.stream.set_read_timeout(timeout)?;

        let mut chunk = [0; CHUNK_LENGTH];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(Error::new(ErrorKind::UnexpectedEof)),
                Ok(n) => {
                    self.recv.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(false);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
