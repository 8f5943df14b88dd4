//! The decoded value tree.
//!
//! This module contains [`Node`], the type at the heart of the crate. A
//! node is one decoded BER value: its tag, whether it was encoded with
//! indefinite length, and its content as a [`Value`]. Constructed values
//! hold their components as child nodes, so a complete encoded message
//! becomes a tree of nodes that can be inspected, modified, and encoded
//! again.

use std::fmt;
use std::io;
use bytes::Bytes;
use num_bigint::BigInt;
use crate::encode;
use crate::error::{DecodeError, EncodeError};
use crate::oid::Oid;
use crate::string::StringKind;
use crate::tag::{Class, Kind, Tag};


//------------ Node ----------------------------------------------------------

/// A single decoded BER value.
///
/// A node pairs an identifier, given as class and tag number, with a
/// [`Value`] holding the decoded content. Nodes remember whether their
/// encoding used indefinite length so that re-encoding an unmodified
/// tree reproduces the input octets exactly.
///
/// Constructed nodes can be navigated and edited through the composite
/// methods: [`get`][Self::get] and friends address components by index
/// path, [`add`][Self::add] and [`add_at`][Self::add_at] insert new
/// components, and [`set_at`][Self::set_at] replaces one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// The class of the value’s tag.
    class: Class,

    /// The number of the value’s tag.
    tag: u32,

    /// Whether the value was encoded with indefinite length.
    indefinite: bool,

    /// The decoded content.
    value: Value,
}

/// # Creation
///
impl Node {
    /// Creates a node from all its parts.
    pub(crate) fn from_parts(
        class: Class, tag: u32, indefinite: bool, value: Value
    ) -> Self {
        Node { class, tag, indefinite, value }
    }

    /// Creates an empty SEQUENCE.
    pub fn sequence() -> Self {
        Self::constructed(Class::Universal, Kind::Sequence.tag_number())
    }

    /// Creates an empty SET.
    pub fn set() -> Self {
        Self::constructed(Class::Universal, Kind::Set.tag_number())
    }

    /// Creates an empty constructed node with the given identifier.
    pub fn constructed(class: Class, tag: u32) -> Self {
        Node {
            class, tag,
            indefinite: false,
            value: Value::Constructed(Vec::new()),
        }
    }

    /// Creates a BOOLEAN node.
    pub fn boolean(value: bool) -> Self {
        Self::universal(Kind::Boolean, Value::Boolean(value))
    }

    /// Creates an INTEGER node.
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Self::universal(Kind::Integer, Value::Integer(value.into()))
    }

    /// Creates a BIT STRING node.
    pub fn bit_string(value: BitString) -> Self {
        Self::universal(Kind::BitString, Value::BitString(value))
    }

    /// Creates an OCTET STRING node.
    pub fn octet_string(value: impl Into<Bytes>) -> Self {
        Self::universal(Kind::OctetString, Value::OctetString(value.into()))
    }

    /// Creates a NULL node.
    pub fn null() -> Self {
        Self::universal(Kind::Null, Value::Null)
    }

    /// Creates an OBJECT IDENTIFIER node.
    pub fn oid(value: Oid) -> Self {
        Self::universal(Kind::Oid, Value::Oid(value))
    }

    /// Creates a character string node of the given kind.
    pub fn string(kind: StringKind, value: impl Into<String>) -> Self {
        Node {
            class: Class::Universal,
            tag: kind.tag_number(),
            indefinite: false,
            value: Value::String(kind, value.into()),
        }
    }

    /// Creates a node holding raw content octets.
    ///
    /// This is for primitive values of non-universal tags whose inner
    /// structure the crate cannot know.
    pub fn opaque(class: Class, tag: u32, body: impl Into<Bytes>) -> Self {
        Node {
            class, tag,
            indefinite: false,
            value: Value::Opaque(body.into()),
        }
    }

    fn universal(kind: Kind, value: Value) -> Self {
        Node {
            class: Class::Universal,
            tag: kind.tag_number(),
            indefinite: false,
            value,
        }
    }
}

/// # Access to Properties
///
impl Node {
    /// Returns the class of the node’s tag.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the number of the node’s tag.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Returns whether the node is a constructed value.
    pub fn is_constructed(&self) -> bool {
        matches!(self.value, Value::Constructed(_))
    }

    /// Returns whether the node was encoded with indefinite length.
    pub fn is_indefinite(&self) -> bool {
        self.indefinite
    }

    /// Sets whether the node is to be encoded with indefinite length.
    ///
    /// # Panics
    ///
    /// Panics when enabling indefinite length on a primitive node since
    /// only constructed values may use it.
    pub fn set_indefinite(&mut self, indefinite: bool) {
        if indefinite && !self.is_constructed() {
            panic!("indefinite length on a primitive value");
        }
        self.indefinite = indefinite;
    }

    /// Returns the content of the node.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the components of a constructed node.
    ///
    /// Returns an empty slice for primitive nodes.
    pub fn children(&self) -> &[Node] {
        match self.value {
            Value::Constructed(ref children) => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self.value {
            Value::Constructed(ref mut children) => Some(children),
            _ => None,
        }
    }
}

/// # Composite Access
///
impl Node {
    /// Returns the node at the given index path.
    ///
    /// Each element of `path` selects a component by position. The empty
    /// path addresses the node itself. Returns `None` if the path leads
    /// through a primitive node or past the end of a component list.
    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &index in path {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    /// Returns the node at the given index path mutably.
    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in path {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Returns the `index`th component with the given tag number.
    ///
    /// Components are considered in insertion order. Only the tag number
    /// is compared, not the class.
    pub fn get_tagged(&self, tag: u32, index: usize) -> Option<&Node> {
        self.children().iter()
            .filter(|child| child.tag == tag)
            .nth(index)
    }

    /// Returns the number of components with the given tag number.
    pub fn count_by_tag(&self, tag: u32) -> usize {
        self.children().iter()
            .filter(|child| child.tag == tag)
            .count()
    }

    /// Appends a component to a constructed node.
    ///
    /// # Panics
    ///
    /// Panics if the node is primitive.
    pub fn add(&mut self, node: Node) {
        match self.children_mut() {
            Some(children) => children.push(node),
            None => panic!("adding a component to a primitive value"),
        }
    }

    /// Inserts a node at the given index path.
    ///
    /// All but the last element of `path` address the constructed node to
    /// insert into; the last element gives the insertion index within its
    /// component list. Returns `false` without changing anything if the
    /// path does not lead to such a position.
    pub fn add_at(&mut self, node: Node, path: &[usize]) -> bool {
        let (index, parent_path) = match path.split_last() {
            Some(res) => res,
            None => return false,
        };
        let parent = match self.get_mut(parent_path) {
            Some(parent) => parent,
            None => return false,
        };
        match parent.children_mut() {
            Some(children) if *index <= children.len() => {
                children.insert(*index, node);
                true
            }
            _ => false,
        }
    }

    /// Replaces the node at the given index path.
    ///
    /// Returns `false` without changing anything if the path does not
    /// lead to a node. The empty path is rejected since a node cannot
    /// replace itself this way.
    pub fn set_at(&mut self, node: Node, path: &[usize]) -> bool {
        if path.is_empty() {
            return false
        }
        match self.get_mut(path) {
            Some(target) => {
                *target = node;
                true
            }
            None => false,
        }
    }
}

/// # Encoding
///
impl Node {
    /// Encodes the node and returns the resulting octets.
    pub fn encode_all(&self) -> Result<Vec<u8>, EncodeError> {
        let mut target = Vec::new();
        encode::append_encoded(self, &mut target)?;
        Ok(target)
    }

    /// Encodes the node into a writer.
    pub fn write_encoded<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), EncodeError> {
        target.write_all(&self.encode_all()?)?;
        Ok(())
    }

    /// Returns the key ordering components under DER for SET values.
    ///
    /// DER sorts the components of a SET by class first, tag number
    /// second. Definite length sorts before indefinite for otherwise
    /// equal tags.
    pub(crate) fn sort_key(&self) -> (u8, u32, bool) {
        (self.class.bits(), self.tag, self.indefinite)
    }
}


//--- Display

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl Node {
    fn fmt_indented(
        &self, f: &mut fmt::Formatter, depth: usize
    ) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        write!(f, "{}", Tag::new(self.class, self.tag))?;
        match self.value {
            Value::Boolean(value) => writeln!(f, " {}", value),
            Value::Integer(ref value) => writeln!(f, " {}", value),
            Value::BitString(ref value) => {
                writeln!(f, " ({} bits)", value.bit_len())
            }
            Value::OctetString(ref value) => {
                writeln!(f, " ({} octets)", value.len())
            }
            Value::Null => writeln!(f),
            Value::Oid(ref value) => writeln!(f, " {}", value),
            Value::String(_, ref value) => writeln!(f, " {:?}", value),
            Value::Opaque(ref value) => {
                writeln!(f, " ({} octets)", value.len())
            }
            Value::Constructed(ref children) => {
                writeln!(f, " {{")?;
                for child in children {
                    child.fmt_indented(f, depth + 1)?;
                }
                for _ in 0..depth {
                    f.write_str("  ")?;
                }
                writeln!(f, "}}")
            }
        }
    }
}


//------------ Value ---------------------------------------------------------

/// The decoded content of a node.
///
/// Universal tags with a registered codec decode into their typed
/// variant. Everything else is either [`Constructed`][Value::Constructed]
/// with child nodes or [`Opaque`][Value::Opaque] with the raw content
/// octets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// A BOOLEAN value.
    Boolean(bool),

    /// An INTEGER value of arbitrary size.
    Integer(BigInt),

    /// A BIT STRING value.
    BitString(BitString),

    /// An OCTET STRING value.
    OctetString(Bytes),

    /// The NULL value.
    Null,

    /// An OBJECT IDENTIFIER value.
    Oid(Oid),

    /// A character string value with its flavor.
    String(StringKind, String),

    /// A constructed value with its components.
    Constructed(Vec<Node>),

    /// The raw content octets of an unrecognized primitive value.
    Opaque(Bytes),
}


//------------ BitString -----------------------------------------------------

/// A BIT STRING value.
///
/// A bit string is an ordered sequence of bits. Its length need not be a
/// multiple of eight, so the type keeps the exact bit count alongside the
/// octets holding the bits. Bits are stored most significant first, with
/// the unused low bits of the final octet set to zero on a clean
/// encoding.
///
/// # BER Encoding
///
/// The first content octet gives the number of unused bits in the last
/// octet, followed by the octets holding the bits. An empty bit string is
/// a single zero octet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitString {
    /// The number of bits in the string.
    bit_len: u64,

    /// The octets holding the bits.
    data: Bytes,
}

impl BitString {
    /// Creates a bit string from its exact bit count and octets.
    ///
    /// The octets must be at least as many as the bit count requires;
    /// excess octets are kept but never encoded.
    pub fn new(bit_len: u64, data: impl Into<Bytes>) -> Self {
        BitString { bit_len, data: data.into() }
    }

    /// Creates a bit string using all bits of the given octets.
    pub fn from_octets(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        BitString { bit_len: data.len() as u64 * 8, data }
    }

    /// Returns the number of bits in the string.
    pub fn bit_len(&self) -> u64 {
        self.bit_len
    }

    /// Returns the octets holding the bits.
    pub fn octets(&self) -> &Bytes {
        &self.data
    }

    /// Returns the number of unused bits in the final octet.
    pub fn unused(&self) -> u8 {
        ((8 - self.bit_len % 8) % 8) as u8
    }

    /// Parses the content octets of a bit string value.
    pub fn from_body(body: &[u8], pos: usize) -> Result<Self, DecodeError> {
        let (&unused, data) = match body.split_first() {
            Some(res) => res,
            None => {
                return Err(DecodeError::structural(
                    "BIT STRING with empty body", pos
                ))
            }
        };
        if unused > 7 || (data.is_empty() && unused != 0) {
            return Err(DecodeError::structural(
                "illegal unused bit count in BIT STRING", pos
            ))
        }
        Ok(BitString {
            bit_len: data.len() as u64 * 8 - u64::from(unused),
            data: Bytes::copy_from_slice(data),
        })
    }

    /// Appends the content octets of the bit string to `target`.
    pub fn append_body(&self, target: &mut Vec<u8>) {
        let octets = (self.bit_len as usize).div_ceil(8);
        target.push(self.unused());
        target.extend_from_slice(&self.data[..octets]);
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Node {
        let mut seq = Node::sequence();
        seq.add(Node::boolean(true));
        seq.add(Node::integer(65537));
        seq.add(Node::octet_string(b"\xde\xad".as_ref()));
        seq
    }

    #[test]
    fn path_access() {
        let mut outer = Node::sequence();
        outer.add(sample());
        outer.add(Node::null());

        assert_eq!(outer.get(&[]), Some(&outer));
        assert_eq!(outer.get(&[0, 0]), Some(&Node::boolean(true)));
        assert_eq!(outer.get(&[0, 1]), Some(&Node::integer(65537)));
        assert_eq!(outer.get(&[1]), Some(&Node::null()));
        assert_eq!(outer.get(&[2]), None);
        assert_eq!(outer.get(&[1, 0]), None);

        if let Some(node) = outer.get_mut(&[0, 0]) {
            *node = Node::boolean(false);
        }
        assert_eq!(outer.get(&[0, 0]), Some(&Node::boolean(false)));
    }

    #[test]
    fn tagged_access() {
        let mut seq = Node::sequence();
        seq.add(Node::integer(1));
        seq.add(Node::null());
        seq.add(Node::integer(2));
        seq.add(Node::integer(3));

        assert_eq!(seq.count_by_tag(2), 3);
        assert_eq!(seq.count_by_tag(5), 1);
        assert_eq!(seq.count_by_tag(1), 0);
        assert_eq!(seq.get_tagged(2, 0), Some(&Node::integer(1)));
        assert_eq!(seq.get_tagged(2, 2), Some(&Node::integer(3)));
        assert_eq!(seq.get_tagged(2, 3), None);
    }

    #[test]
    fn edit_at_paths() {
        let mut seq = sample();

        assert!(seq.add_at(Node::null(), &[1]));
        assert_eq!(seq.get(&[1]), Some(&Node::null()));
        assert_eq!(seq.children().len(), 4);

        assert!(seq.set_at(Node::integer(7), &[0]));
        assert_eq!(seq.get(&[0]), Some(&Node::integer(7)));

        // Out of range, through a leaf, and the empty path all fail
        // without modification.
        let before = seq.clone();
        assert!(!seq.add_at(Node::null(), &[9]));
        assert!(!seq.add_at(Node::null(), &[0, 0]));
        assert!(!seq.set_at(Node::null(), &[]));
        assert!(!seq.set_at(Node::null(), &[9]));
        assert_eq!(seq, before);
    }

    #[test]
    #[should_panic]
    fn add_to_leaf() {
        Node::null().add(Node::boolean(true));
    }

    #[test]
    #[should_panic]
    fn indefinite_leaf() {
        Node::integer(1).set_indefinite(true);
    }

    #[test]
    fn bit_string_body() {
        // 17 bits use three octets with seven bits unused.
        let bits = BitString::from_body(b"\x07\xab\xcd\x80", 0).unwrap();
        assert_eq!(bits.bit_len(), 17);
        assert_eq!(bits.unused(), 7);
        let mut body = Vec::new();
        bits.append_body(&mut body);
        assert_eq!(body, b"\x07\xab\xcd\x80");

        let empty = BitString::from_body(b"\x00", 0).unwrap();
        assert_eq!(empty.bit_len(), 0);
        assert_eq!(empty.unused(), 0);
        let mut body = Vec::new();
        empty.append_body(&mut body);
        assert_eq!(body, b"\x00");

        assert!(BitString::from_body(b"", 0).is_err());
        assert!(BitString::from_body(b"\x08\xff", 0).is_err());
        assert!(BitString::from_body(b"\x01", 0).is_err());
    }

    #[test]
    fn bit_string_from_octets() {
        let bits = BitString::from_octets(b"\x01\x02".as_ref());
        assert_eq!(bits.bit_len(), 16);
        assert_eq!(bits.unused(), 0);
    }

    #[test]
    fn display_dump() {
        let text = sample().to_string();
        assert!(text.starts_with("SEQUENCE {"));
        assert!(text.contains("BOOLEAN true"));
        assert!(text.contains("INTEGER 65537"));
        assert!(text.contains("OCTETSTRING (2 octets)"));
    }
}
