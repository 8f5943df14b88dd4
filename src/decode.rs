//! Parsing BER encoded data.
//!
//! The functions [`decode`] and [`decode_all`] turn encoded octets into
//! [`Node`] trees without needing a schema: nesting is taken from the
//! constructed bit and the length octets alone, and the content of
//! primitive values is decoded by the universal tag registry where one
//! applies.
//!
//! The [`Source`] type is the cursor the decoder reads from. It remembers
//! its position in the overall input so errors can point at the octet
//! where things went wrong.

use bytes::{Buf, Bytes};
use log::trace;
use num_bigint::BigInt;
use crate::error::DecodeError;
use crate::length::Length;
use crate::node::{BitString, Node, Value};
use crate::oid::Oid;
use crate::string::StringKind;
use crate::tag::{Kind, Tag};

/// The maximum nesting depth the decoder accepts.
///
/// Each constructed value opens one level. Input nested deeper than this
/// is rejected with a malformed length error, keeping recursion bounded
/// on hostile input.
const MAX_DEPTH: usize = 64;


//------------ Source --------------------------------------------------------

/// The source of data for decoding.
///
/// A source is a cursor over a shared octets buffer. Taking data advances
/// the cursor; the position reported by [`pos`][Self::pos] is relative to
/// the start of the overall input even for sources created for the
/// content of a nested value.
#[derive(Clone, Debug)]
pub struct Source {
    /// The data yet to be read.
    data: Bytes,

    /// The position of the start of `data` in the overall input.
    start: usize,
}

impl Source {
    /// Creates a new source from the given data.
    pub fn new(data: Bytes) -> Self {
        Source { data, start: 0 }
    }

    /// Creates a source whose data starts at `start` in the input.
    pub(crate) fn with_offset(data: Bytes, start: usize) -> Self {
        Source { data, start }
    }

    /// Returns the current position in the overall input.
    pub fn pos(&self) -> usize {
        self.start
    }

    /// Returns the number of octets left to read.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the source has been read to its end.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Takes a single octet from the source.
    pub fn take_u8(&mut self) -> Result<u8, DecodeError> {
        if self.data.is_empty() {
            return Err(DecodeError::truncated(self.start))
        }
        let res = self.data[0];
        self.data.advance(1);
        self.start += 1;
        Ok(res)
    }

    /// Takes the next `len` octets from the source.
    pub fn take(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        if len > self.data.len() {
            return Err(DecodeError::truncated(self.start + self.data.len()))
        }
        let res = self.data.split_to(len);
        self.start += len;
        Ok(res)
    }
}


//------------ Decoding functions --------------------------------------------

/// Decodes exactly one value from the given data.
///
/// Trailing data after the value is an error, as is an end-of-contents
/// marker at the top level.
pub fn decode(data: impl Into<Bytes>) -> Result<Node, DecodeError> {
    let mut source = Source::new(data.into());
    let node = match decode_one(&mut source, 0)? {
        Some(node) => node,
        None => {
            return Err(DecodeError::structural(
                "end-of-contents outside indefinite length value", 0
            ))
        }
    };
    if !source.is_empty() {
        return Err(DecodeError::structural(
            "trailing data after value", source.pos()
        ))
    }
    Ok(node)
}

/// Decodes a sequence of values until the data runs out.
///
/// This is for inputs that concatenate several top-level values back to
/// back. Empty input yields an empty vec.
pub fn decode_all(data: impl Into<Bytes>) -> Result<Vec<Node>, DecodeError> {
    let mut source = Source::new(data.into());
    let mut res = Vec::new();
    while !source.is_empty() {
        match decode_one(&mut source, 0)? {
            Some(node) => res.push(node),
            None => {
                return Err(DecodeError::structural(
                    "end-of-contents outside indefinite length value",
                    source.pos()
                ))
            }
        }
    }
    Ok(res)
}

/// Decodes the next value from the source.
///
/// Returns `None` when the next value is an end-of-contents marker, which
/// the caller handling an indefinite length value consumes as its
/// delimiter.
fn decode_one(
    source: &mut Source, depth: usize
) -> Result<Option<Node>, DecodeError> {
    let pos = source.pos();
    let (tag, constructed) = Tag::take_from(source)?;
    let length = Length::take_from(source)?;
    trace!(
        "value at {}: tag {}, constructed {}, length {:?}",
        pos, tag, constructed, length
    );
    if tag == Tag::END_OF_CONTENTS && !constructed {
        if length != Length::Definite(0) {
            return Err(DecodeError::structural(
                "end-of-contents with content", pos
            ))
        }
        return Ok(None)
    }
    if depth >= MAX_DEPTH {
        return Err(DecodeError::malformed_length(
            "nesting too deep", pos
        ))
    }
    let node = if constructed {
        let mut children = Vec::new();
        let indefinite = match length.definite() {
            Some(len) => {
                let start = source.pos();
                let mut inner = Source::with_offset(
                    source.take(len)?, start
                );
                while !inner.is_empty() {
                    match decode_one(&mut inner, depth + 1)? {
                        Some(child) => children.push(child),
                        None => {
                            return Err(DecodeError::structural(
                                "end-of-contents in definite length value",
                                start
                            ))
                        }
                    }
                }
                false
            }
            None => {
                loop {
                    if source.is_empty() {
                        return Err(DecodeError::truncated(source.pos()))
                    }
                    match decode_one(source, depth + 1)? {
                        Some(child) => children.push(child),
                        None => break,
                    }
                }
                true
            }
        };
        Node::from_parts(
            tag.class(), tag.number(), indefinite,
            Value::Constructed(children)
        )
    }
    else {
        let len = match length.definite() {
            Some(len) => len,
            None => {
                return Err(DecodeError::malformed_length(
                    "indefinite length on primitive value", pos
                ))
            }
        };
        let body_pos = source.pos();
        let body = source.take(len)?;
        let value = if tag.is_universal() {
            decode_universal_body(tag.number(), body, body_pos)?
        }
        else {
            Value::Opaque(body)
        };
        Node::from_parts(tag.class(), tag.number(), false, value)
    };
    Ok(Some(node))
}

/// Decodes the content octets of a primitive universal value.
fn decode_universal_body(
    number: u32, body: Bytes, pos: usize
) -> Result<Value, DecodeError> {
    let kind = match Kind::from_tag(number) {
        Some(kind) => kind,
        None => {
            return Err(DecodeError::unsupported(
                "unrecognized universal tag", pos
            ))
        }
    };
    match kind {
        Kind::Boolean => {
            if body.len() != 1 {
                return Err(DecodeError::structural(
                    "BOOLEAN with more or less than one octet", pos
                ))
            }
            // BER allows any nonzero octet for TRUE.
            Ok(Value::Boolean(body[0] != 0))
        }
        Kind::Integer => {
            if body.is_empty() {
                return Err(DecodeError::structural(
                    "INTEGER with empty body", pos
                ))
            }
            Ok(Value::Integer(BigInt::from_signed_bytes_be(&body)))
        }
        Kind::BitString => {
            Ok(Value::BitString(BitString::from_body(&body, pos)?))
        }
        Kind::OctetString => Ok(Value::OctetString(body)),
        Kind::Null => {
            if !body.is_empty() {
                return Err(DecodeError::structural(
                    "NULL with content", pos
                ))
            }
            Ok(Value::Null)
        }
        Kind::Oid => Ok(Value::Oid(Oid::from_body(&body, pos)?)),
        Kind::Sequence | Kind::Set => {
            Err(DecodeError::structural(
                "primitive encoding of SEQUENCE or SET", pos
            ))
        }
        _ => {
            // What remains are the character string kinds.
            match StringKind::from_kind(kind) {
                Some(string) => Ok(Value::String(
                    string, string.decode_body(&body, pos)?
                )),
                None => Err(DecodeError::unsupported(
                    "unrecognized universal tag", pos
                )),
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tag::Class;

    #[test]
    fn primitive_values() {
        assert_eq!(
            decode(b"\x01\x01\xff".as_ref()).unwrap(),
            Node::boolean(true)
        );
        // Any nonzero octet is TRUE in BER.
        assert_eq!(
            decode(b"\x01\x01\x01".as_ref()).unwrap(),
            Node::boolean(true)
        );
        assert_eq!(
            decode(b"\x01\x01\x00".as_ref()).unwrap(),
            Node::boolean(false)
        );
        assert_eq!(
            decode(b"\x02\x03\x01\x00\x01".as_ref()).unwrap(),
            Node::integer(65537)
        );
        assert_eq!(
            decode(b"\x02\x01\x80".as_ref()).unwrap(),
            Node::integer(-128)
        );
        assert_eq!(
            decode(b"\x05\x00".as_ref()).unwrap(),
            Node::null()
        );
        assert_eq!(
            decode(b"\x04\x02\xde\xad".as_ref()).unwrap(),
            Node::octet_string(b"\xde\xad".as_ref())
        );
        assert_eq!(
            decode(b"\x0c\x02hi".as_ref()).unwrap(),
            Node::string(StringKind::Utf8, "hi")
        );
    }

    #[test]
    fn malformed_primitives() {
        for data in [
            b"\x01\x02\x00\x00".as_ref(), // BOOLEAN with two octets
            b"\x01\x00",                  // BOOLEAN with no octets
            b"\x02\x00",                  // INTEGER with empty body
            b"\x05\x01\x00",              // NULL with content
            b"\x30\x02\x00\x00",          // EOC inside definite length
            b"\x10\x00",                  // primitive SEQUENCE
        ] {
            assert_eq!(
                decode(data).unwrap_err().kind(),
                ErrorKind::StructuralViolation,
                "input {:02x?}", data
            );
        }
    }

    #[test]
    fn constructed_values() {
        let node = decode(
            b"\x30\x0a\x01\x01\xff\x02\x03\x01\x00\x01\x04\x02\xde\xad"
                .as_ref()
        ).unwrap();
        assert_eq!(node.children().len(), 3);
        assert_eq!(node.get(&[0]), Some(&Node::boolean(true)));
        assert_eq!(node.get(&[1]), Some(&Node::integer(65537)));
        assert!(!node.is_indefinite());
    }

    #[test]
    fn indefinite_length() {
        let node = decode(
            b"\x30\x80\x01\x01\xff\x00\x00".as_ref()
        ).unwrap();
        assert!(node.is_indefinite());
        assert_eq!(node.get(&[0]), Some(&Node::boolean(true)));

        // A missing end-of-contents marker is truncated input.
        assert_eq!(
            decode(b"\x30\x80\x01\x01\xff".as_ref()).unwrap_err().kind(),
            ErrorKind::TruncatedInput
        );
        // Primitive values must not use indefinite length.
        assert_eq!(
            decode(b"\x04\x80\x00\x00".as_ref()).unwrap_err().kind(),
            ErrorKind::MalformedLength
        );
    }

    #[test]
    fn non_universal_values() {
        let node = decode(b"\x85\x02\xab\xcd".as_ref()).unwrap();
        assert_eq!(node.class(), Class::ContextSpecific);
        assert_eq!(node.tag(), 5);
        assert_eq!(
            node.value(),
            &Value::Opaque(Bytes::from_static(b"\xab\xcd"))
        );

        let node = decode(b"\xa0\x03\x02\x01\x07".as_ref()).unwrap();
        assert_eq!(node.class(), Class::ContextSpecific);
        assert_eq!(node.get(&[0]), Some(&Node::integer(7)));
    }

    #[test]
    fn unknown_universal_tag() {
        // UNIVERSAL 9 (REAL) has no registered codec.
        assert_eq!(
            decode(b"\x09\x01\x00".as_ref()).unwrap_err().kind(),
            ErrorKind::UnsupportedEncoding
        );
    }

    #[test]
    fn toplevel_rules() {
        assert!(decode(b"\x00\x00".as_ref()).is_err());
        assert!(decode(b"\x05\x00\x05\x00".as_ref()).is_err());
        assert!(decode(b"".as_ref()).is_err());

        let all = decode_all(b"\x05\x00\x01\x01\x00".as_ref()).unwrap();
        assert_eq!(all, vec![Node::null(), Node::boolean(false)]);
        assert!(decode_all(b"".as_ref()).unwrap().is_empty());
        assert!(decode_all(b"\x00\x00".as_ref()).is_err());
    }

    #[test]
    fn truncated_input() {
        for data in [
            b"\x30".as_ref(), b"\x30\x05", b"\x30\x05\x01\x01",
            b"\x04\x03\xab",
        ] {
            assert_eq!(
                decode(data).unwrap_err().kind(),
                ErrorKind::TruncatedInput,
                "input {:02x?}", data
            );
        }
    }

    #[test]
    fn nesting_limit() {
        // 64 nested sequences decode, 65 do not.
        fn nested(depth: usize) -> Vec<u8> {
            let mut res = Vec::new();
            for _ in 0..depth {
                let mut next = vec![0x30];
                if res.len() < 0x80 {
                    next.push(res.len() as u8);
                }
                else {
                    next.push(0x81);
                    next.push(res.len() as u8);
                }
                next.extend_from_slice(&res);
                res = next;
            }
            res
        }
        assert!(decode(nested(64)).is_ok());
        assert_eq!(
            decode(nested(65)).unwrap_err().kind(),
            ErrorKind::MalformedLength
        );
    }

    #[test]
    fn error_positions() {
        // The bad length octet sits at offset 3.
        let err = decode(
            b"\x30\x04\x04\xff\x00\x00".as_ref()
        ).unwrap_err();
        assert_eq!(err.pos(), 3);
    }
}
