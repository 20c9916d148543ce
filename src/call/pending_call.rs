use std::time::Instant;

use crate::{Message, MessageKind, RemoteError, Serial};

use super::Reply;

/// The record of a sent method call which is waiting for its reply.
#[derive(Debug, Clone)]
pub struct PendingCall {
    serial: Serial,
    destination: Option<Box<str>>,
    member: Box<str>,
    deadline: Option<Instant>,
}

impl PendingCall {
    pub(crate) fn new(
        serial: Serial,
        destination: Option<Box<str>>,
        member: Box<str>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            serial,
            destination,
            member,
            deadline,
        }
    }

    /// The serial of the sent call.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// The destination the call was sent to.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The member which was called.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The point in time after which the call is abandoned. `None` waits
    /// forever.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Test if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Offer a received message to the call.
    ///
    /// Returns `None` if the message is not a reply to this call, which
    /// includes messages without a reply serial.
    pub fn accept(&self, message: Message) -> Option<Result<Reply, RemoteError>> {
        match message.kind() {
            MessageKind::MethodReturn { reply_serial } if *reply_serial == self.serial => {
                Some(Ok(Reply::new(message)))
            }
            MessageKind::Error { reply_serial, .. } if *reply_serial == self.serial => {
                Some(Err(RemoteError::from_message(message)))
            }
            _ => {
                tracing::trace!(
                    serial = ?message.serial(),
                    reply_serial = ?message.reply_serial(),
                    waiting = %self.serial,
                    "ignoring unrelated message"
                );

                None
            }
        }
    }
}
