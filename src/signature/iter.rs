use crate::protocol::Type;

/// Split off the first complete type of a valid signature.
pub(crate) fn split_single(signature: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;

    for (n, b) in signature.bytes().enumerate() {
        match b {
            b'a' => continue,
            b'(' | b'{' => {
                depth += 1;
                continue;
            }
            b')' | b'}' => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }

        if depth == 0 {
            return Some(signature.split_at(n + 1));
        }
    }

    None
}

/// An iterator over the single complete types of a [`Signature`].
///
/// [`Signature`]: crate::Signature
pub struct Iter<'a> {
    rest: &'a str,
}

impl<'a> Iter<'a> {
    pub(super) fn new(rest: &'a str) -> Self {
        Self { rest }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (head, tail) = split_single(self.rest)?;
        self.rest = tail;
        Some(head)
    }
}

/// The alignment of values of the first type in a signature.
pub(crate) fn alignment_of(signature: &str) -> usize {
    match signature.as_bytes().first() {
        Some(&b) => Type(b).alignment(),
        None => 1,
    }
}
