pub use self::message_kind::MessageKind;
mod message_kind;

pub use self::message::Message;
mod message;

pub use self::serial::Serial;
pub(crate) use self::serial::SerialCounter;
mod serial;
