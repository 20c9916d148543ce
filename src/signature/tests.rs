use super::{alignment_of, Signature, SignatureError};

use SignatureError::*;

macro_rules! test {
    ($input:expr, $expected:pat) => {{
        let actual = Signature::new($input.to_owned());

        assert!(
            matches!(actual, $expected),
            "{actual:?} does not match {}",
            stringify!($expected)
        );
    }};
}

#[test]
fn signature_tests() {
    test!("", Ok(..));
    test!("sss", Ok(..));
    test!("i", Ok(..));
    test!("b", Ok(..));
    test!("ai", Ok(..));
    test!("(i)", Ok(..));
    test!("a{sv}", Ok(..));
    test!("aa{s(iv)}", Ok(..));
    test!("w", Err(UnknownTypeCode(b'w')));
    test!("ah", Ok(..));
    test!("a", Err(MissingArrayElementType));
    test!("aaaaaa", Err(MissingArrayElementType));
    test!("ii(ii)a", Err(MissingArrayElementType));
    test!("ia", Err(MissingArrayElementType));
    test!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai", Ok(..));
    test!(
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai",
        Err(ExceededMaximumArrayRecursion)
    );
    test!(")", Err(StructEndedButNotStarted));
    test!("}", Err(DictEndedButNotStarted));
    test!("i)", Err(StructEndedButNotStarted));
    test!("a)", Err(MissingArrayElementType));
    test!("(", Err(StructStartedButNotEnded));
    test!("(i", Err(StructStartedButNotEnded));
    test!("(iiiii", Err(StructStartedButNotEnded));
    test!("(ai", Err(StructStartedButNotEnded));
    test!("()", Err(StructHasNoFields));
    test!("(())", Err(StructHasNoFields));
    test!("a()", Err(StructHasNoFields));
    test!("i()", Err(StructHasNoFields));
    test!("()i", Err(StructHasNoFields));
    test!("(a)", Err(MissingArrayElementType));
    test!("a{ia}", Err(MissingArrayElementType));
    test!("a{}", Err(DictEntryHasNoFields));
    test!("a{aii}", Err(DictKeyMustBeBasicType));
    test!("a{vi}", Err(DictKeyMustBeBasicType));
    test!(" ", Err(UnknownTypeCode(..)));
    test!("not a valid signature", Err(UnknownTypeCode(..)));
    test!("123", Err(UnknownTypeCode(..)));
    test!(".", Err(UnknownTypeCode(..)));
    /* https://bugs.freedesktop.org/show_bug.cgi?id=17803 */
    test!("a{(ii)i}", Err(DictKeyMustBeBasicType));
    test!("a{i}", Err(DictEntryHasOnlyOneField));
    test!("{is}", Err(DictEntryNotInsideArray));
    test!("a{isi}", Err(DictEntryHasTooManyFields));
    test!("i".repeat(255), Ok(..));
    test!("i".repeat(256), Err(SignatureTooLong));
    test! {
        "((((((((((((((((((((((((((((((((ii))))))))))))))))))))))))))))))))",
        Ok(..)
    };
    test! {
        "(((((((((((((((((((((((((((((((((ii)))))))))))))))))))))))))))))))))",
        Err(ExceededMaximumStructRecursion)
    };
}

#[test]
fn array_depth_is_released_after_each_array() {
    // 32 nested arrays, twice in a row.
    let nested = format!("{}i", "a".repeat(32));
    test!(nested.repeat(2), Ok(..));
}

#[test]
fn iterate_complete_types() {
    let sig = Signature::new("ia{sv}(yi)aas").unwrap();
    let types = sig.iter().collect::<Vec<_>>();
    assert_eq!(types, ["i", "a{sv}", "(yi)", "aas"]);
    assert_eq!(Signature::EMPTY.iter().count(), 0);
}

#[test]
fn single_complete_type() {
    assert!(Signature::STRING.is_single_complete_type());
    assert!(Signature::new("a{sv}").unwrap().is_single_complete_type());
    assert!(!Signature::new("si").unwrap().is_single_complete_type());
}

#[test]
fn alignment() {
    assert_eq!(alignment_of(""), 1);
    assert_eq!(alignment_of("y"), 1);
    assert_eq!(alignment_of("n"), 2);
    assert_eq!(alignment_of("a{sv}"), 4);
    assert_eq!(alignment_of("{sv}"), 8);
    assert_eq!(alignment_of("(yi)"), 8);
    assert_eq!(alignment_of("d"), 8);
    assert_eq!(alignment_of("v"), 1);
}
