//! Generating encoded output from a node tree.
//!
//! This is a private module. Its functionality is available through the
//! encoding methods of [`Node`].
//!
//! Values are encoded back to front in memory: the content octets are
//! produced first so their number is known when the length octets are
//! written. Output always uses canonical length and value forms, so a
//! tree decoded from non-minimal BER re-encodes into the equivalent
//! canonical octets. The only deliberate exception is indefinite length,
//! which is reproduced for nodes carrying the flag.

use crate::error::EncodeError;
use crate::length::Length;
use crate::node::{Node, Value};
use crate::tag::{Class, Kind, Tag};

/// Appends the complete encoding of a node to `target`.
pub(crate) fn append_encoded(
    node: &Node, target: &mut Vec<u8>
) -> Result<(), EncodeError> {
    let body = encode_body(node)?;
    let tag = Tag::new(node.class(), node.tag());
    tag.append_encoded(node.is_constructed(), target);
    if node.is_indefinite() {
        Length::Indefinite.append_encoded(target);
        target.extend_from_slice(&body);
        target.extend_from_slice(&[0, 0]);
    }
    else {
        Length::Definite(body.len()).append_encoded(target);
        target.extend_from_slice(&body);
    }
    Ok(())
}

/// Returns the content octets of a node.
fn encode_body(node: &Node) -> Result<Vec<u8>, EncodeError> {
    let mut body = Vec::new();
    match *node.value() {
        Value::Boolean(value) => {
            // DER allows only 0xFF for TRUE.
            body.push(if value { 0xff } else { 0 });
        }
        Value::Integer(ref value) => {
            body = value.to_signed_bytes_be();
        }
        Value::BitString(ref value) => {
            value.append_body(&mut body);
        }
        Value::OctetString(ref value) => {
            body.extend_from_slice(value);
        }
        Value::Null => {}
        Value::Oid(ref value) => {
            value.append_body(&mut body)?;
        }
        Value::String(kind, ref value) => {
            body = kind.encode_body(value)?;
        }
        Value::Opaque(ref value) => {
            body.extend_from_slice(value);
        }
        Value::Constructed(ref children) => {
            if is_set(node) {
                append_set_body(children, &mut body)?;
            }
            else {
                for child in children {
                    append_encoded(child, &mut body)?;
                }
            }
        }
    }
    Ok(body)
}

/// Returns whether the node is a universal SET.
fn is_set(node: &Node) -> bool {
    node.class() == Class::Universal
        && node.tag() == Kind::Set.tag_number()
}

/// Appends the components of a SET in canonical order.
///
/// DER requires the components of a SET to be sorted by their tags,
/// class before number. Components with equal tags keep their insertion
/// order. The node itself stays untouched; only the output is reordered.
fn append_set_body(
    children: &[Node], target: &mut Vec<u8>
) -> Result<(), EncodeError> {
    let mut encoded = Vec::with_capacity(children.len());
    for child in children {
        let mut data = Vec::new();
        append_encoded(child, &mut data)?;
        encoded.push((child.sort_key(), data));
    }
    encoded.sort_by(|left, right| left.0.cmp(&right.0));
    for (_, data) in encoded {
        target.extend_from_slice(&data);
    }
    Ok(())
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use num_bigint::BigInt;
    use crate::node::BitString;
    use crate::string::StringKind;
    use super::*;

    fn encoded(node: &Node) -> Vec<u8> {
        node.encode_all().unwrap()
    }

    #[test]
    fn primitive_values() {
        assert_eq!(encoded(&Node::boolean(true)), b"\x01\x01\xff");
        assert_eq!(encoded(&Node::boolean(false)), b"\x01\x01\x00");
        assert_eq!(encoded(&Node::null()), b"\x05\x00");
        assert_eq!(
            encoded(&Node::integer(65537)), b"\x02\x03\x01\x00\x01"
        );
        assert_eq!(encoded(&Node::integer(0)), b"\x02\x01\x00");
        assert_eq!(encoded(&Node::integer(-128)), b"\x02\x01\x80");
        // 128 needs a leading zero octet to stay positive.
        assert_eq!(encoded(&Node::integer(128)), b"\x02\x02\x00\x80");
        assert_eq!(
            encoded(&Node::integer(BigInt::from(-1))), b"\x02\x01\xff"
        );
        assert_eq!(
            encoded(&Node::octet_string(b"\xde\xad".as_ref())),
            b"\x04\x02\xde\xad"
        );
        assert_eq!(
            encoded(&Node::string(StringKind::Ia5, "ok")),
            b"\x16\x02ok"
        );
        assert_eq!(
            encoded(&Node::bit_string(BitString::new(
                17, b"\xab\xcd\x80".as_ref()
            ))),
            b"\x03\x04\x07\xab\xcd\x80"
        );
    }

    #[test]
    fn sequence_keeps_order() {
        let mut seq = Node::sequence();
        seq.add(Node::integer(1));
        seq.add(Node::boolean(true));
        assert_eq!(
            encoded(&seq), b"\x30\x06\x02\x01\x01\x01\x01\xff"
        );
    }

    #[test]
    fn set_sorts_components() {
        // Insertion order INTEGER, BOOLEAN; the output sorts BOOLEAN
        // first since its tag number is lower.
        let mut set = Node::set();
        set.add(Node::integer(1));
        set.add(Node::boolean(true));
        let before = set.clone();
        assert_eq!(
            encoded(&set), b"\x31\x06\x01\x01\xff\x02\x01\x01"
        );
        // Sorting happens in the output only.
        assert_eq!(set, before);

        // Universal sorts before context specific regardless of number.
        let mut set = Node::set();
        set.add(Node::opaque(Class::ContextSpecific, 0, b"".as_ref()));
        set.add(Node::integer(1));
        assert_eq!(encoded(&set), b"\x31\x05\x02\x01\x01\x80\x00");
    }

    #[test]
    fn set_equal_tags_keep_order() {
        let mut set = Node::set();
        set.add(Node::integer(2));
        set.add(Node::integer(1));
        assert_eq!(
            encoded(&set), b"\x31\x06\x02\x01\x02\x02\x01\x01"
        );
    }

    #[test]
    fn indefinite_length() {
        let mut seq = Node::sequence();
        seq.add(Node::boolean(true));
        seq.set_indefinite(true);
        assert_eq!(encoded(&seq), b"\x30\x80\x01\x01\xff\x00\x00");
    }

    #[test]
    fn non_universal_set_tag_keeps_order() {
        // Only the universal SET is subject to canonical ordering.
        let mut node = Node::constructed(Class::ContextSpecific, 17);
        node.add(Node::integer(1));
        node.add(Node::boolean(true));
        assert_eq!(
            encoded(&node), b"\xb1\x06\x02\x01\x01\x01\x01\xff"
        );
    }
}
