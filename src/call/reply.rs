use crate::{Message, Serial, Signature, Value};

/// The successful reply to a method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    message: Message,
}

impl Reply {
    pub(crate) fn new(message: Message) -> Self {
        Self { message }
    }

    /// The returned arguments, in order.
    pub fn arguments(&self) -> &[Value] {
        self.message.body()
    }

    /// Take the returned arguments.
    pub fn into_arguments(self) -> Vec<Value> {
        self.message.into_body()
    }

    /// The signature of the returned arguments.
    pub fn signature(&self) -> &Signature {
        self.message.signature()
    }

    /// The serial of the call this is a reply to.
    pub fn reply_serial(&self) -> Option<Serial> {
        self.message.reply_serial()
    }

    /// The unique name of the peer which replied, if the bus set one.
    pub fn sender(&self) -> Option<&str> {
        self.message.sender()
    }

    /// The underlying method return message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Convert into the underlying method return message.
    pub fn into_message(self) -> Message {
        self.message
    }
}
