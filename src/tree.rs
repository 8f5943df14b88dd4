//! A generic tree representation of decoded values.
//!
//! The [`TreeNode`] type is a plain element tree with a name, string
//! attributes, optional text, and child elements. It carries everything a
//! [`Node`] tree does, so converting a node to a tree and back loses
//! nothing, while the tree itself can be serialized with serde, fed to an
//! XML or JSON writer, or built by hand.
//!
//! # Mapping
//!
//! Universal values with a registered codec become elements named after
//! their kind, such as `BOOLEAN` or `OBJECTIDENTIFIER`, with their value
//! in the element text. Binary content is base64 encoded. Everything
//! carried outside the content octets travels in attributes: `class` and
//! `tag` identify non-universal values, `struct` distinguishes their
//! constructed from their primitive encoding, `bitlen` keeps the exact
//! bit count of a BIT STRING, `short` carries the symbolic name of an
//! object identifier, and `indefinite` marks values encoded with
//! indefinite length.

use std::collections::BTreeMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use crate::error::TreeError;
use crate::node::{BitString, Node, Value};
use crate::oid::{self, Oid, OidDictionary};
use crate::string::StringKind;
use crate::tag::{Class, Kind};


//------------ TreeNode ------------------------------------------------------

/// An element of the generic tree representation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TreeNode {
    /// The name of the element.
    pub name: String,

    /// The attributes of the element.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    /// The text content of the element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// The child elements of the element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a new element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        TreeNode { name: name.into(), ..Default::default() }
    }

    /// Adds an attribute and returns the element.
    pub fn attr(
        mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Sets the text content and returns the element.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds a child element and returns the element.
    pub fn child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}


//------------ Node to tree --------------------------------------------------

impl Node {
    /// Converts the node into its tree representation.
    ///
    /// Uses the process-wide object identifier dictionary for the
    /// symbolic names of identifiers.
    pub fn to_tree(&self) -> TreeNode {
        let mut dict = match oid::global().lock() {
            Ok(dict) => dict,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.to_tree_with(&mut dict)
    }

    /// Converts the node into its tree representation.
    ///
    /// Symbolic names of object identifiers come from the given
    /// dictionary, which grows by the identifiers it has not seen yet.
    pub fn to_tree_with(&self, dict: &mut OidDictionary) -> TreeNode {
        let mut res = if self.class() == Class::Universal {
            self.universal_to_tree(dict)
        }
        else {
            self.non_universal_to_tree(dict)
        };
        if self.is_indefinite() {
            res = res.attr("indefinite", "true");
        }
        res
    }

    fn universal_to_tree(&self, dict: &mut OidDictionary) -> TreeNode {
        let kind = match Kind::from_tag(self.tag()) {
            Some(kind) => kind,
            None => return self.non_universal_to_tree(dict),
        };
        match *self.value() {
            Value::Boolean(value) => {
                TreeNode::new(kind.name()).text(value.to_string())
            }
            Value::Integer(ref value) => {
                TreeNode::new(kind.name()).text(value.to_string())
            }
            Value::BitString(ref value) => {
                let octets = (value.bit_len() as usize).div_ceil(8);
                TreeNode::new(kind.name())
                    .attr("bitlen", value.bit_len().to_string())
                    .text(BASE64.encode(&value.octets()[..octets]))
            }
            Value::OctetString(ref value) => {
                TreeNode::new(kind.name()).text(BASE64.encode(value))
            }
            Value::Null => TreeNode::new(kind.name()),
            Value::Oid(ref value) => {
                TreeNode::new(kind.name())
                    .attr("short", dict.short_name(value))
                    .text(value.to_string())
            }
            Value::String(_, ref value) => {
                TreeNode::new(kind.name()).text(value.clone())
            }
            Value::Constructed(ref children) => {
                let mut res = TreeNode::new(kind.name());
                if !matches!(kind, Kind::Sequence | Kind::Set) {
                    // BER allows constructed encodings of string types.
                    res = res.attr("struct", "true");
                }
                for child in children {
                    res.children.push(child.to_tree_with(dict));
                }
                res
            }
            Value::Opaque(_) => self.non_universal_to_tree(dict),
        }
    }

    fn non_universal_to_tree(&self, dict: &mut OidDictionary) -> TreeNode {
        let mut res = TreeNode::new("struct")
            .attr("class", self.class().bits().to_string())
            .attr("tag", self.tag().to_string());
        match *self.value() {
            Value::Constructed(ref children) => {
                res = res.attr("struct", "true");
                for child in children {
                    res.children.push(child.to_tree_with(dict));
                }
            }
            Value::Opaque(ref value) => {
                res = res.attr("struct", "false")
                    .text(BASE64.encode(value));
            }
            // Universal values without a registered kind cannot be
            // decoded, so this arm is unreachable from decoded trees.
            _ => {
                res = res.attr("struct", "false");
            }
        }
        res
    }
}


//------------ Tree to node --------------------------------------------------

impl Node {
    /// Rebuilds a node from its tree representation.
    pub fn from_tree(tree: &TreeNode) -> Result<Self, TreeError> {
        let mut res = if tree.name == "struct" {
            Self::struct_from_tree(tree)?
        }
        else {
            Self::universal_from_tree(tree)?
        };
        match tree.attribute("indefinite") {
            None | Some("false") => {}
            Some("true") => {
                if !res.is_constructed() {
                    return Err(TreeError::invalid_attr(
                        "indefinite", "true"
                    ))
                }
                res.set_indefinite(true);
            }
            Some(value) => {
                return Err(TreeError::invalid_attr("indefinite", value))
            }
        }
        Ok(res)
    }

    fn struct_from_tree(tree: &TreeNode) -> Result<Self, TreeError> {
        let class = match tree.attribute("class") {
            Some(value) => {
                match value.parse::<u8>() {
                    Ok(bits) if bits <= 3 => Class::from_bits(bits),
                    _ => {
                        return Err(TreeError::invalid_attr("class", value))
                    }
                }
            }
            None => return Err(TreeError::MissingAttribute("class")),
        };
        let tag = match tree.attribute("tag") {
            Some(value) => {
                value.parse::<u32>().map_err(|_| {
                    TreeError::invalid_attr("tag", value)
                })?
            }
            None => return Err(TreeError::MissingAttribute("tag")),
        };
        if tree.attribute("struct") == Some("false") {
            let body = BASE64.decode(tree.text_or_empty())?;
            Ok(Node::opaque(class, tag, body))
        }
        else {
            let mut res = Node::constructed(class, tag);
            for child in &tree.children {
                res.add(Node::from_tree(child)?);
            }
            Ok(res)
        }
    }

    fn universal_from_tree(tree: &TreeNode) -> Result<Self, TreeError> {
        let kind = match Kind::from_name(&tree.name) {
            Some(kind) => kind,
            None => {
                return Err(TreeError::UnknownElement(tree.name.clone()))
            }
        };
        if matches!(kind, Kind::Sequence | Kind::Set)
            || tree.attribute("struct") == Some("true")
        {
            let mut res = Node::constructed(
                Class::Universal, kind.tag_number()
            );
            for child in &tree.children {
                res.add(Node::from_tree(child)?);
            }
            return Ok(res)
        }
        match kind {
            Kind::Boolean => {
                match tree.text_or_empty() {
                    "true" => Ok(Node::boolean(true)),
                    "false" => Ok(Node::boolean(false)),
                    text => Err(TreeError::InvalidText(
                        "BOOLEAN", text.into()
                    )),
                }
            }
            Kind::Integer => {
                let text = tree.text_or_empty();
                text.parse::<BigInt>()
                    .map(Node::integer)
                    .map_err(|_| {
                        TreeError::InvalidText("INTEGER", text.into())
                    })
            }
            Kind::BitString => {
                let bit_len = match tree.attribute("bitlen") {
                    Some(value) => {
                        value.parse::<u64>().map_err(|_| {
                            TreeError::invalid_attr("bitlen", value)
                        })?
                    }
                    None => {
                        return Err(TreeError::MissingAttribute("bitlen"))
                    }
                };
                let data = BASE64.decode(tree.text_or_empty())?;
                if (data.len() as u64) * 8 < bit_len {
                    return Err(TreeError::invalid_attr(
                        "bitlen", tree.text_or_empty()
                    ))
                }
                Ok(Node::bit_string(BitString::new(bit_len, data)))
            }
            Kind::OctetString => {
                Ok(Node::octet_string(Bytes::from(
                    BASE64.decode(tree.text_or_empty())?
                )))
            }
            Kind::Null => Ok(Node::null()),
            Kind::Oid => {
                let text = tree.text_or_empty();
                text.parse::<Oid>()
                    .map(Node::oid)
                    .map_err(|_| {
                        TreeError::InvalidText(
                            "OBJECTIDENTIFIER", text.into()
                        )
                    })
            }
            _ => {
                match StringKind::from_kind(kind) {
                    Some(string) => Ok(Node::string(
                        string, tree.text_or_empty()
                    )),
                    None => Err(TreeError::UnknownElement(
                        tree.name.clone()
                    )),
                }
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use super::*;

    fn round_trip(node: &Node) {
        let mut dict = OidDictionary::bundled();
        let tree = node.to_tree_with(&mut dict);
        assert_eq!(&Node::from_tree(&tree).unwrap(), node);
    }

    #[test]
    fn leaf_elements() {
        let mut dict = OidDictionary::bundled();
        assert_eq!(
            Node::boolean(true).to_tree_with(&mut dict),
            TreeNode::new("BOOLEAN").text("true")
        );
        assert_eq!(
            Node::integer(-42).to_tree_with(&mut dict),
            TreeNode::new("INTEGER").text("-42")
        );
        assert_eq!(
            Node::null().to_tree_with(&mut dict),
            TreeNode::new("NULL")
        );
        assert_eq!(
            Node::octet_string(b"\xde\xad".as_ref())
                .to_tree_with(&mut dict),
            TreeNode::new("OCTETSTRING").text("3q0=")
        );
        assert_eq!(
            Node::string(StringKind::Printable, "Test User 1")
                .to_tree_with(&mut dict),
            TreeNode::new("PrintableString").text("Test User 1")
        );
        assert_eq!(
            Node::bit_string(BitString::new(17, b"\xab\xcd\x80".as_ref()))
                .to_tree_with(&mut dict),
            TreeNode::new("BITSTRING")
                .attr("bitlen", "17").text("q82A")
        );
    }

    #[test]
    fn oid_short_name() {
        let mut dict = OidDictionary::bundled();
        let tree = Node::oid(Oid::from_str("2.5.4.3").unwrap())
            .to_tree_with(&mut dict);
        assert_eq!(tree.name, "OBJECTIDENTIFIER");
        assert_eq!(tree.attribute("short"), Some("commonName"));
        assert_eq!(tree.text.as_deref(), Some("2.5.4.3"));
        // The short attribute is informational and ignored coming back.
        assert_eq!(
            Node::from_tree(&tree).unwrap(),
            Node::oid(Oid::from_str("2.5.4.3").unwrap())
        );
    }

    #[test]
    fn constructed_elements() {
        let mut dict = OidDictionary::bundled();
        let mut seq = Node::sequence();
        seq.add(Node::boolean(true));
        seq.add(Node::set());
        let tree = seq.to_tree_with(&mut dict);
        assert_eq!(tree.name, "SEQUENCE");
        assert!(tree.attrs.is_empty());
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].name, "SET");
        round_trip(&seq);
    }

    #[test]
    fn non_universal_elements() {
        let mut dict = OidDictionary::bundled();

        let leaf = Node::opaque(
            Class::ContextSpecific, 5, b"\xab\xcd".as_ref()
        );
        let tree = leaf.to_tree_with(&mut dict);
        assert_eq!(tree.name, "struct");
        assert_eq!(tree.attribute("class"), Some("2"));
        assert_eq!(tree.attribute("tag"), Some("5"));
        assert_eq!(tree.attribute("struct"), Some("false"));
        round_trip(&leaf);

        let mut ctx = Node::constructed(Class::Application, 1);
        ctx.add(Node::integer(7));
        let tree = ctx.to_tree_with(&mut dict);
        assert_eq!(tree.attribute("class"), Some("1"));
        assert_eq!(tree.attribute("struct"), Some("true"));
        assert_eq!(tree.children.len(), 1);
        round_trip(&ctx);
    }

    #[test]
    fn indefinite_attribute() {
        let mut dict = OidDictionary::bundled();
        let mut seq = Node::sequence();
        seq.add(Node::null());
        seq.set_indefinite(true);
        let tree = seq.to_tree_with(&mut dict);
        assert_eq!(tree.attribute("indefinite"), Some("true"));
        round_trip(&seq);

        // The flag is rejected on elements that rebuild primitive.
        let bad = TreeNode::new("NULL").attr("indefinite", "true");
        assert!(Node::from_tree(&bad).is_err());
    }

    #[test]
    fn rebuild_errors() {
        assert!(matches!(
            Node::from_tree(&TreeNode::new("REAL")),
            Err(TreeError::UnknownElement(_))
        ));
        assert!(matches!(
            Node::from_tree(&TreeNode::new("BOOLEAN").text("TRUE")),
            Err(TreeError::InvalidText("BOOLEAN", _))
        ));
        assert!(matches!(
            Node::from_tree(&TreeNode::new("INTEGER").text("seven")),
            Err(TreeError::InvalidText("INTEGER", _))
        ));
        assert!(matches!(
            Node::from_tree(&TreeNode::new("struct").attr("tag", "5")),
            Err(TreeError::MissingAttribute("class"))
        ));
        assert!(matches!(
            Node::from_tree(
                &TreeNode::new("struct")
                    .attr("class", "7").attr("tag", "5")
            ),
            Err(TreeError::InvalidAttribute { name: "class", .. })
        ));
        assert!(matches!(
            Node::from_tree(&TreeNode::new("BITSTRING").text("AA==")),
            Err(TreeError::MissingAttribute("bitlen"))
        ));
        assert!(matches!(
            Node::from_tree(
                &TreeNode::new("OCTETSTRING").text("not base64!")
            ),
            Err(TreeError::Base64(_))
        ));
    }

    #[test]
    fn serde_smoke() {
        let mut dict = OidDictionary::bundled();
        let mut seq = Node::sequence();
        seq.add(Node::integer(65537));
        seq.add(Node::opaque(
            Class::ContextSpecific, 0, b"\x01".as_ref()
        ));
        let tree = seq.to_tree_with(&mut dict);
        let json = serde_json::to_string(&tree).unwrap();
        let back: TreeNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
        assert_eq!(Node::from_tree(&back).unwrap(), seq);
    }
}
