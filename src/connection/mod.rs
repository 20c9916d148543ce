use self::transport::Transport;
pub(crate) use self::transport::TransportState;
mod transport;

pub use self::builder::ConnectionBuilder;
mod builder;

pub use self::connection::Connection;
mod connection;

#[cfg(test)]
mod tests;
