/// An error constructing an object path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid D-Bus object path")]
#[non_exhaustive]
pub struct ObjectPathError;
