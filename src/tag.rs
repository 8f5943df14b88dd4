//! The identifier octets of a BER encoded value.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::fmt;
use crate::decode::Source;
use crate::error::DecodeError;


//------------ Class ---------------------------------------------------------

/// The class of a tag.
///
/// The top two bits of the first identifier octet select one of four
/// classes which determine the scope in which the tag number is to be
/// interpreted.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Class {
    /// Types whose meaning is the same in all applications.
    Universal,

    /// Types whose meaning is specific to an application.
    Application,

    /// Types whose meaning depends on where they appear within a
    /// constructed value.
    ContextSpecific,

    /// Types whose meaning is agreed between specific parties.
    Private,
}

impl Class {
    /// Returns the class for the given two-bit value.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is greater than 3.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            3 => Class::Private,
            _ => panic!("tag class from more than two bits"),
        }
    }

    /// Returns the two-bit value of the class.
    pub fn bits(self) -> u8 {
        match self {
            Class::Universal => 0,
            Class::Application => 1,
            Class::ContextSpecific => 2,
            Class::Private => 3,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Class::Universal => "UNIVERSAL",
            Class::Application => "APPLICATION",
            Class::ContextSpecific => "CONTEXT",
            Class::Private => "PRIVATE",
        })
    }
}


//------------ Tag -----------------------------------------------------------

/// The tag of a BER encoded value.
///
/// Each BER encoded value starts with a sequence of one or more octets
/// called the _identifier octets._ They encode the class and number of the
/// value’s tag as well as whether the value uses primitive or constructed
/// encoding. The `Tag` type represents class and number; the constructed
/// flag is handled separately since the same tag may appear in either
/// encoding.
///
/// Tag numbers up to 30 fit into the five low bits of the first identifier
/// octet. Larger numbers use the escape value 0x1F there and follow in
/// base 128, most significant group first, with bit 8 set on every octet
/// except the last.
///
/// # Limitations
///
/// Tag numbers are limited to the range of `u32`. Encodings with larger
/// numbers are rejected as unsupported.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Tag {
    class: Class,
    number: u32,
}

/// # Constants for Often Used Tag Values
///
impl Tag {
    /// The tag marking the end-of-contents in an indefinite length value.
    ///
    /// This is UNIVERSAL 0.
    pub const END_OF_CONTENTS: Self = Tag::universal(0);

    /// The tag for the BOOLEAN type, UNIVERSAL 1.
    pub const BOOLEAN: Self = Tag::universal(1);

    /// The tag for the INTEGER type, UNIVERSAL 2.
    pub const INTEGER: Self = Tag::universal(2);

    /// The tag for the BIT STRING type, UNIVERSAL 3.
    pub const BIT_STRING: Self = Tag::universal(3);

    /// The tag for the OCTET STRING type, UNIVERSAL 4.
    pub const OCTET_STRING: Self = Tag::universal(4);

    /// The tag for the NULL type, UNIVERSAL 5.
    pub const NULL: Self = Tag::universal(5);

    /// The tag for the OBJECT IDENTIFIER type, UNIVERSAL 6.
    pub const OID: Self = Tag::universal(6);

    /// The tag for the UTF8String type, UNIVERSAL 12.
    pub const UTF8_STRING: Self = Tag::universal(12);

    /// The tag for the SEQUENCE and SEQUENCE OF types, UNIVERSAL 16.
    pub const SEQUENCE: Self = Tag::universal(16);

    /// The tag for the SET and SET OF types, UNIVERSAL 17.
    pub const SET: Self = Tag::universal(17);

    /// The tag for the PrintableString type, UNIVERSAL 19.
    pub const PRINTABLE_STRING: Self = Tag::universal(19);

    /// The tag for the TeletexString type, UNIVERSAL 20.
    pub const TELETEX_STRING: Self = Tag::universal(20);

    /// The tag for the IA5String type, UNIVERSAL 22.
    pub const IA5_STRING: Self = Tag::universal(22);

    /// The tag for the UTCTime type, UNIVERSAL 23.
    pub const UTC_TIME: Self = Tag::universal(23);

    /// The tag for the VisibleString type, UNIVERSAL 26.
    pub const VISIBLE_STRING: Self = Tag::universal(26);

    /// The tag for the BMPString type, UNIVERSAL 30.
    pub const BMP_STRING: Self = Tag::universal(30);
}

impl Tag {
    /// The escape value signalling a multi-byte tag number.
    const MULTIBYTE_ESCAPE: u8 = 0x1f;

    /// The mask for the constructed bit in the first identifier octet.
    const CONSTRUCTED_MASK: u8 = 0x20;

    /// The mask for the continuation bit in subsequent identifier octets.
    const CONTINUATION_MASK: u8 = 0x80;

    /// Creates a new tag from class and number.
    pub const fn new(class: Class, number: u32) -> Self {
        Tag { class, number }
    }

    /// Creates a new tag in the universal class.
    pub const fn universal(number: u32) -> Self {
        Tag::new(Class::Universal, number)
    }

    /// Creates a new tag in the application class.
    pub const fn application(number: u32) -> Self {
        Tag::new(Class::Application, number)
    }

    /// Creates a new tag in the context specific class.
    pub const fn ctx(number: u32) -> Self {
        Tag::new(Class::ContextSpecific, number)
    }

    /// Creates a new tag in the private class.
    pub const fn private(number: u32) -> Self {
        Tag::new(Class::Private, number)
    }

    /// Returns the class of the tag.
    pub fn class(self) -> Class {
        self.class
    }

    /// Returns the number of the tag.
    pub fn number(self) -> u32 {
        self.number
    }

    /// Returns whether the tag is of the universal class.
    pub fn is_universal(self) -> bool {
        self.class == Class::Universal
    }

    /// Takes a tag from the beginning of a source.
    ///
    /// Upon success, returns both the tag and whether the value is
    /// constructed. Errors out if the source ends within the identifier
    /// octets or if the tag number does not fit into a `u32`.
    pub fn take_from(
        source: &mut Source
    ) -> Result<(Self, bool), DecodeError> {
        let pos = source.pos();
        let first = source.take_u8()?;
        let class = Class::from_bits(first >> 6);
        let constructed = first & Tag::CONSTRUCTED_MASK != 0;
        let low = first & Tag::MULTIBYTE_ESCAPE;
        if low != Tag::MULTIBYTE_ESCAPE {
            return Ok((Tag::new(class, low.into()), constructed))
        }
        let mut number: u32 = 0;
        loop {
            let octet = source.take_u8()?;
            if number > u32::MAX >> 7 {
                return Err(DecodeError::unsupported(
                    "tag number too large", pos
                ))
            }
            number = number << 7 | u32::from(octet & 0x7f);
            if octet & Tag::CONTINUATION_MASK == 0 {
                break
            }
        }
        Ok((Tag::new(class, number), constructed))
    }

    /// Returns the number of octets of the encoded form of the tag.
    pub fn encoded_len(self) -> usize {
        if self.number < Tag::MULTIBYTE_ESCAPE.into() {
            1
        }
        else {
            1 + Self::base128_len(self.number)
        }
    }

    /// Appends the encoded tag to the end of `target`.
    ///
    /// If `constructed` is `true`, the encoded tag will signal a value in
    /// constructed encoding and primitive encoding otherwise.
    ///
    /// Multi-byte tag numbers carry the continuation bit on every octet
    /// except the last, matching what [`take_from`][Self::take_from]
    /// expects back.
    pub fn append_encoded(self, constructed: bool, target: &mut Vec<u8>) {
        let mut first = self.class.bits() << 6;
        if constructed {
            first |= Tag::CONSTRUCTED_MASK;
        }
        if self.number < Tag::MULTIBYTE_ESCAPE.into() {
            target.push(first | self.number as u8);
            return
        }
        target.push(first | Tag::MULTIBYTE_ESCAPE);
        let len = Self::base128_len(self.number);
        for i in (0..len).rev() {
            let mut octet = (self.number >> (i * 7)) as u8 & 0x7f;
            if i > 0 {
                octet |= Tag::CONTINUATION_MASK;
            }
            target.push(octet);
        }
    }

    /// Returns the number of base 128 octets needed for `number`.
    fn base128_len(number: u32) -> usize {
        let bits = 32 - number.leading_zeros() as usize;
        bits.div_ceil(7).max(1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_universal() {
            if let Some(kind) = Kind::from_tag(self.number) {
                return f.write_str(kind.name())
            }
        }
        match self.class {
            Class::Universal => write!(f, "[UNIVERSAL {}]", self.number),
            Class::ContextSpecific => write!(f, "[{}]", self.number),
            class => write!(f, "[{} {}]", class, self.number),
        }
    }
}


//------------ Kind ----------------------------------------------------------

/// The semantic kind behind a universal tag number.
///
/// This is the tag registry: a closed mapping from the universal tag
/// numbers this crate knows to the codec responsible for them. Universal
/// tags outside this registry cannot be decoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    Oid,
    Utf8String,
    Sequence,
    Set,
    PrintableString,
    TeletexString,
    Ia5String,
    UtcTime,
    VisibleString,
    BmpString,
}

impl Kind {
    /// All registered kinds.
    const ALL: &'static [Kind] = &[
        Kind::Boolean, Kind::Integer, Kind::BitString, Kind::OctetString,
        Kind::Null, Kind::Oid, Kind::Utf8String, Kind::Sequence, Kind::Set,
        Kind::PrintableString, Kind::TeletexString, Kind::Ia5String,
        Kind::UtcTime, Kind::VisibleString, Kind::BmpString,
    ];

    /// Returns the kind registered for a universal tag number, if any.
    pub fn from_tag(number: u32) -> Option<Self> {
        match number {
            1 => Some(Kind::Boolean),
            2 => Some(Kind::Integer),
            3 => Some(Kind::BitString),
            4 => Some(Kind::OctetString),
            5 => Some(Kind::Null),
            6 => Some(Kind::Oid),
            12 => Some(Kind::Utf8String),
            16 => Some(Kind::Sequence),
            17 => Some(Kind::Set),
            19 => Some(Kind::PrintableString),
            20 => Some(Kind::TeletexString),
            22 => Some(Kind::Ia5String),
            23 => Some(Kind::UtcTime),
            26 => Some(Kind::VisibleString),
            30 => Some(Kind::BmpString),
            _ => None,
        }
    }

    /// Returns the universal tag of the kind.
    pub fn tag(self) -> Tag {
        Tag::universal(self.tag_number())
    }

    /// Returns the universal tag number of the kind.
    pub fn tag_number(self) -> u32 {
        match self {
            Kind::Boolean => 1,
            Kind::Integer => 2,
            Kind::BitString => 3,
            Kind::OctetString => 4,
            Kind::Null => 5,
            Kind::Oid => 6,
            Kind::Utf8String => 12,
            Kind::Sequence => 16,
            Kind::Set => 17,
            Kind::PrintableString => 19,
            Kind::TeletexString => 20,
            Kind::Ia5String => 22,
            Kind::UtcTime => 23,
            Kind::VisibleString => 26,
            Kind::BmpString => 30,
        }
    }

    /// Returns the name of the kind.
    ///
    /// The names double as element names in the tree representation.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "BOOLEAN",
            Kind::Integer => "INTEGER",
            Kind::BitString => "BITSTRING",
            Kind::OctetString => "OCTETSTRING",
            Kind::Null => "NULL",
            Kind::Oid => "OBJECTIDENTIFIER",
            Kind::Utf8String => "UTF8String",
            Kind::Sequence => "SEQUENCE",
            Kind::Set => "SET",
            Kind::PrintableString => "PrintableString",
            Kind::TeletexString => "TeletexString",
            Kind::Ia5String => "IA5String",
            Kind::UtcTime => "UTCTime",
            Kind::VisibleString => "VisibleString",
            Kind::BmpString => "BMPString",
        }
    }

    /// Returns the kind going with an element name.
    pub fn from_name(name: &str) -> Option<Self> {
        Kind::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}


//============ Tests =========================================================
