use crate::protocol::Endianness;

/// A fixed-size number in the protocol.
///
/// Numbers are aligned to their own size.
pub(crate) trait Frame: Copy {
    /// The size and alignment of the frame.
    const SIZE: usize;

    /// Append the frame to the buffer using the given endianness.
    fn store_to(self, endianness: Endianness, out: &mut Vec<u8>);

    /// Load the frame from exactly [`Frame::SIZE`] bytes.
    fn load_from(bytes: &[u8], endianness: Endianness) -> Self;
}

impl Frame for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn store_to(self, _: Endianness, out: &mut Vec<u8>) {
        out.push(self);
    }

    #[inline]
    fn load_from(bytes: &[u8], _: Endianness) -> Self {
        bytes[0]
    }
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Frame for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn store_to(self, endianness: Endianness, out: &mut Vec<u8>) {
                    if endianness == Endianness::BIG {
                        out.extend_from_slice(&self.to_be_bytes());
                    } else {
                        out.extend_from_slice(&self.to_le_bytes());
                    }
                }

                #[inline]
                fn load_from(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut array = [0; std::mem::size_of::<$ty>()];
                    array.copy_from_slice(bytes);

                    if endianness == Endianness::BIG {
                        <$ty>::from_be_bytes(array)
                    } else {
                        <$ty>::from_le_bytes(array)
                    }
                }
            }
        )*
    }
}

impl_number!(u16, u32, u64, i16, i32, i64, f64);
