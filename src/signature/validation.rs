use crate::protocol::{Type, MAX_CONTAINER_DEPTH, MAX_SIGNATURE_LENGTH};

use super::SignatureError;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Array,
    Struct,
    Dict,
}

pub(super) fn validate(bytes: &[u8]) -> Result<(), SignatureError> {
    use SignatureError::*;

    if bytes.len() > MAX_SIGNATURE_LENGTH {
        return Err(SignatureTooLong);
    }

    let mut stack = Vec::<(Kind, usize)>::new();
    let mut arrays = 0;
    let mut structs = 0;

    for &b in bytes {
        let mut is_basic = match Type(b) {
            t if t.is_basic() => true,
            Type::VARIANT => false,
            Type::ARRAY => {
                if arrays == MAX_CONTAINER_DEPTH {
                    return Err(ExceededMaximumArrayRecursion);
                }

                stack.push((Kind::Array, 0));
                arrays += 1;
                continue;
            }
            Type::OPEN_PAREN => {
                if structs == MAX_CONTAINER_DEPTH {
                    return Err(ExceededMaximumStructRecursion);
                }

                stack.push((Kind::Struct, 0));
                structs += 1;
                continue;
            }
            Type::CLOSE_PAREN => {
                let n = match stack.pop() {
                    Some((Kind::Struct, n)) => n,
                    Some((Kind::Array, _)) => return Err(MissingArrayElementType),
                    _ => return Err(StructEndedButNotStarted),
                };

                if n == 0 {
                    return Err(StructHasNoFields);
                }

                structs -= 1;
                false
            }
            Type::OPEN_BRACE => {
                if !matches!(stack.last(), Some((Kind::Array, _))) {
                    return Err(DictEntryNotInsideArray);
                }

                stack.push((Kind::Dict, 0));
                continue;
            }
            Type::CLOSE_BRACE => {
                let n = match stack.pop() {
                    Some((Kind::Dict, n)) => n,
                    Some((Kind::Array, _)) => return Err(MissingArrayElementType),
                    _ => return Err(DictEndedButNotStarted),
                };

                match n {
                    0 => return Err(DictEntryHasNoFields),
                    1 => return Err(DictEntryHasOnlyOneField),
                    2 => {}
                    _ => return Err(DictEntryHasTooManyFields),
                }

                false
            }
            _ => return Err(UnknownTypeCode(b)),
        };

        // A complete type closes every array waiting for its element type.
        while let Some((Kind::Array, _)) = stack.last() {
            stack.pop();
            arrays -= 1;
            is_basic = false;
        }

        if let Some((Kind::Dict, 0)) = stack.last() {
            if !is_basic {
                return Err(DictKeyMustBeBasicType);
            }
        }

        if let Some((_, n)) = stack.last_mut() {
            *n += 1;
        }
    }

    match stack.pop() {
        Some((Kind::Array, _)) => Err(MissingArrayElementType),
        Some((Kind::Struct, _)) => Err(StructStartedButNotEnded),
        Some((Kind::Dict, _)) => Err(DictStartedButNotEnded),
        None => Ok(()),
    }
}
