//! Schema-less handling of data encoded in BER and DER.
//!
//! This crate decodes data encoded according to the Basic Encoding Rules
//! (BER) or their canonical subset, the Distinguished Encoding Rules
//! (DER), as defined in ITU-T recommendation X.690, without requiring a
//! schema for the data. Instead, the nesting information present in the
//! encoding itself is used to build a tree of [`Node`] values that can be
//! inspected, modified, and encoded again.
//!
//! # Decoding and Encoding
//!
//! The [`decode`] function parses a single encoded value from a buffer
//! and [`decode_all`] parses a whole run of them. The resulting nodes
//! know the tag, the content, and whether indefinite length encoding was
//! used, so a decoded tree re-encodes through [`Node::encode_all`] into
//! octets equivalent to the input. Output is canonical where the rules
//! allow a choice: lengths use their shortest form and the components of
//! a SET are sorted as DER demands.
//!
//! Values with a universal tag registered in [`Kind`] decode into typed
//! values such as big integers or object identifiers. Values of all
//! other tags keep their raw content octets or, when constructed, their
//! decoded components.
//!
//! # The Generic Tree
//!
//! For interchange with generic formats, a node tree converts to and
//! from [`TreeNode`], a plain element tree with string attributes and
//! serde support. Object identifiers are annotated with symbolic names
//! from an [`OidDictionary`] on the way out.
//!
//! # Limitations
//!
//! Tag numbers are limited to `u32`, object identifier arcs to `u64`,
//! and nesting depth to 64 levels. Input beyond these limits is rejected
//! rather than silently mangled.

pub use self::decode::{decode, decode_all, Source};
pub use self::error::{DecodeError, EncodeError, ErrorKind, TreeError};
pub use self::length::Length;
pub use self::node::{BitString, Node, Value};
pub use self::oid::{Oid, OidDictionary, ParseOidError};
pub use self::string::StringKind;
pub use self::tag::{Class, Kind, Tag};
pub use self::tree::TreeNode;

pub mod decode;
pub mod error;
pub mod node;
pub mod oid;
pub mod string;
pub mod tree;

mod encode;
mod length;
mod tag;
