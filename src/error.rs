//! Errors when decoding, encoding, or rebuilding data.
//!
//! Decoding errors carry a category and the octet position where the
//! offending data started so that a caller can point at the exact place
//! in its input. Encoding and tree errors are simpler since their input
//! is structured data the caller built itself.

use std::borrow::Cow;
use std::fmt;
use std::io;
use thiserror::Error;


//------------ ErrorKind -----------------------------------------------------

/// The category of a decoding error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The length octets are broken or exceed a limit.
    ///
    /// This also covers values nested deeper than the decoder allows.
    MalformedLength,

    /// The encoding is legal but outside what this crate supports.
    ///
    /// Tag numbers beyond `u32` and object identifier arcs beyond `u64`
    /// fall into this category.
    UnsupportedEncoding,

    /// The content octets violate the rules of their type.
    StructuralViolation,

    /// The input ended in the middle of a value.
    TruncatedInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ErrorKind::MalformedLength => "malformed length",
            ErrorKind::UnsupportedEncoding => "unsupported encoding",
            ErrorKind::StructuralViolation => "structural violation",
            ErrorKind::TruncatedInput => "truncated input",
        })
    }
}


//------------ DecodeError ---------------------------------------------------

/// An error happened while decoding data.
///
/// The error keeps its [`ErrorKind`] for dispatch, a human-readable
/// message, and the position of the offending octets as an offset from
/// the start of the decoded input.
#[derive(Clone, Debug, Error)]
#[error("{kind} at offset {pos}: {msg}")]
pub struct DecodeError {
    kind: ErrorKind,
    msg: Cow<'static, str>,
    pos: usize,
}

impl DecodeError {
    /// Creates a new error from its parts.
    pub fn new(
        kind: ErrorKind, msg: impl Into<Cow<'static, str>>, pos: usize
    ) -> Self {
        DecodeError { kind, msg: msg.into(), pos }
    }

    /// Creates a malformed length error at the given position.
    pub fn malformed_length(
        msg: impl Into<Cow<'static, str>>, pos: usize
    ) -> Self {
        Self::new(ErrorKind::MalformedLength, msg, pos)
    }

    /// Creates an unsupported encoding error at the given position.
    pub fn unsupported(
        msg: impl Into<Cow<'static, str>>, pos: usize
    ) -> Self {
        Self::new(ErrorKind::UnsupportedEncoding, msg, pos)
    }

    /// Creates a structural violation error at the given position.
    pub fn structural(
        msg: impl Into<Cow<'static, str>>, pos: usize
    ) -> Self {
        Self::new(ErrorKind::StructuralViolation, msg, pos)
    }

    /// Creates a truncated input error at the given position.
    pub fn truncated(pos: usize) -> Self {
        Self::new(ErrorKind::TruncatedInput, "unexpected end of input", pos)
    }

    /// Returns the category of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the position of the error in the input.
    pub fn pos(&self) -> usize {
        self.pos
    }
}


//------------ EncodeError ---------------------------------------------------

/// An error happened while encoding data.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value cannot be expressed in BER.
    #[error("unsupported value: {0}")]
    Unsupported(Cow<'static, str>),

    /// Writing to the target failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EncodeError {
    /// Creates an unsupported value error.
    pub fn unsupported(msg: impl Into<Cow<'static, str>>) -> Self {
        EncodeError::Unsupported(msg.into())
    }
}


//------------ TreeError -----------------------------------------------------

/// An error happened while rebuilding a value from its tree form.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The element name is not one the tree mapping produces.
    #[error("unknown element {0:?}")]
    UnknownElement(String),

    /// A required attribute is missing.
    #[error("missing attribute {0:?}")]
    MissingAttribute(&'static str),

    /// An attribute value could not be parsed.
    #[error("invalid value {value:?} for attribute {name:?}")]
    InvalidAttribute {
        name: &'static str,
        value: String,
    },

    /// The element text could not be parsed as the expected type.
    #[error("invalid {0} value {1:?}")]
    InvalidText(&'static str, String),

    /// Binary content was not valid base64.
    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl TreeError {
    /// Creates an invalid attribute error.
    pub fn invalid_attr(name: &'static str, value: &str) -> Self {
        TreeError::InvalidAttribute { name, value: value.into() }
    }
}


//============ Tests =========================================================
