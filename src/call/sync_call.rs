use std::time::{Duration, Instant};

use crate::error::{Error, ErrorKind, Result};
use crate::{Connection, Flags, Message, MessageKind, Serial};

use super::{PendingCall, Reply};

/// The state of a [`SyncCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CallState {
    /// The call has not been sent yet.
    Idle,
    /// The call has been sent with the given serial and is waiting for a
    /// reply.
    Sent(Serial),
    /// A method return was received.
    Completed,
    /// An error reply was received.
    CompletedWithError,
    /// No reply arrived before the deadline.
    TimedOut,
    /// The call could not be sent, or the connection failed while waiting.
    Failed,
}

/// A single blocking method call.
///
/// Sends the call and reads messages off the connection until the matching
/// reply arrives or the timeout passes. Messages which are not replies to the
/// call are dropped.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use sync_dbus::{CallState, Connection, Message, SyncCall};
///
/// let mut c = Connection::session_bus()?;
///
/// let m = Message::new_method_call(
///     "org.freedesktop.DBus",
///     "/org/freedesktop/DBus",
///     "org.freedesktop.DBus",
///     "ListNames",
/// )?;
///
/// let mut call = SyncCall::new(m).with_timeout(Duration::from_secs(5));
/// let reply = call.call(&mut c)?;
/// assert_eq!(call.state(), CallState::Completed);
/// assert_eq!(reply.signature(), "as");
/// # Ok::<_, sync_dbus::Error>(())
/// ```
#[derive(Debug)]
pub struct SyncCall {
    message: Option<Message>,
    timeout: Option<Duration>,
    state: CallState,
}

impl SyncCall {
    /// Prepare a call of the given method call message.
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
            timeout: None,
            state: CallState::Idle,
        }
    }

    /// Set the timeout of the call.
    ///
    /// If unset, the default timeout of the connection is used.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// The current state of the call.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Send the call and block until its reply arrives.
    ///
    /// # Errors
    ///
    /// * [`Category::InvalidArgument`] if the message is not a method call,
    ///   is flagged [`Flags::NO_REPLY_EXPECTED`], or the call already ran.
    ///   Nothing is sent in this case.
    /// * [`Category::RemoteError`] if the peer replied with an error.
    /// * [`Category::TimedOut`] if no reply arrived in time. A reply which
    ///   arrives later is ignored by subsequent calls.
    /// * [`Category::ConnectionClosed`] or [`Category::MalformedMessage`] if
    ///   the connection failed while waiting.
    ///
    /// [`Category::InvalidArgument`]: crate::Category::InvalidArgument
    /// [`Category::RemoteError`]: crate::Category::RemoteError
    /// [`Category::TimedOut`]: crate::Category::TimedOut
    /// [`Category::ConnectionClosed`]: crate::Category::ConnectionClosed
    /// [`Category::MalformedMessage`]: crate::Category::MalformedMessage
    pub fn call(&mut self, c: &mut Connection) -> Result<Reply> {
        let (CallState::Idle, Some(message)) = (self.state, &self.message) else {
            return Err(Error::new(ErrorKind::CallFinished));
        };

        if !matches!(message.kind(), MessageKind::MethodCall { .. }) {
            return Err(Error::new(ErrorKind::NotMethodCall));
        }

        if message.flags() & Flags::NO_REPLY_EXPECTED {
            return Err(Error::new(ErrorKind::NoReplyExpected));
        }

        let Some(message) = self.message.take() else {
            return Err(Error::new(ErrorKind::CallFinished));
        };

        let timeout = self.timeout.unwrap_or_else(|| c.default_timeout());

        let pending = match send(c, message, timeout) {
            Ok(pending) => pending,
            Err(error) => {
                self.state = CallState::Failed;
                return Err(error);
            }
        };

        self.state = CallState::Sent(pending.serial());

        loop {
            let message = match c.receive_until(pending.deadline()) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::debug!(serial = %pending.serial(), ?timeout, "call timed out");
                    self.state = CallState::TimedOut;

                    return Err(Error::new(ErrorKind::TimedOut {
                        serial: pending.serial(),
                        timeout,
                    }));
                }
                Err(error) => {
                    tracing::debug!(serial = %pending.serial(), %error, "call failed");
                    self.state = CallState::Failed;
                    return Err(error);
                }
            };

            match pending.accept(message) {
                Some(Ok(reply)) => {
                    tracing::debug!(
                        serial = %pending.serial(),
                        signature = %reply.signature(),
                        "call completed"
                    );

                    self.state = CallState::Completed;
                    return Ok(reply);
                }
                Some(Err(error)) => {
                    tracing::debug!(
                        serial = %pending.serial(),
                        name = error.name(),
                        "call completed with error"
                    );
                    self.state = CallState::CompletedWithError;
                    return Err(Error::new(ErrorKind::Remote(error)));
                }
                None => {}
            }
        }
    }
}

fn send(c: &mut Connection, message: Message, timeout: Duration) -> Result<PendingCall> {
    let destination = message.destination().map(Box::<str>::from);
    let member = message.member().map(Box::<str>::from).unwrap_or_default();

    let serial = c.send(message)?;

    // A timeout which overflows the clock is the same as no timeout.
    let deadline = Instant::now().checked_add(timeout);

    Ok(PendingCall::new(serial, destination, member, deadline))
}
