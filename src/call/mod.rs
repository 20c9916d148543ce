//! The request/response state machine of a single method call.

pub use self::sync_call::{CallState, SyncCall};
mod sync_call;

pub use self::pending_call::PendingCall;
mod pending_call;

pub use self::reply::Reply;
mod reply;

pub use self::remote_error::RemoteError;
mod remote_error;
