use std::fmt;
use std::num::NonZeroU32;

/// The serial of a message, which is never zero.
///
/// # Examples
///
/// ```
/// use sync_dbus::Serial;
///
/// assert!(Serial::new(0).is_none());
/// assert_eq!(Serial::new(42).map(Serial::get), Some(42));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Serial(NonZeroU32);

impl Serial {
    /// Construct a serial, returning `None` if it is zero.
    #[inline]
    pub const fn new(serial: u32) -> Option<Self> {
        match NonZeroU32::new(serial) {
            Some(serial) => Some(Self(serial)),
            None => None,
        }
    }

    /// Get the numerical value of the serial.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hands out serials for outgoing messages.
///
/// Starts at 1 and wraps past `u32::MAX` back to 1.
#[derive(Debug, Default)]
pub(crate) struct SerialCounter {
    last: u32,
}

impl SerialCounter {
    #[cfg(test)]
    pub(crate) fn starting_after(last: u32) -> Self {
        Self { last }
    }

    pub(crate) fn next_serial(&mut self) -> Serial {
        let serial = NonZeroU32::new(self.last.wrapping_add(1)).unwrap_or(NonZeroU32::MIN);
        self.last = serial.get();
        Serial(serial)
    }
}
