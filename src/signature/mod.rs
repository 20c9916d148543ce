pub use self::signature::Signature;
mod signature;

pub use self::signature_error::SignatureError;
mod signature_error;

pub use self::iter::Iter;
pub(crate) use self::iter::{alignment_of, split_single};
mod iter;

use self::validation::validate;
mod validation;

#[cfg(test)]
mod tests;
