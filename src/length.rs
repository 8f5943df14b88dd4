//! The length octets.
//!
//! This is a private module. The [`Length`] defined herein is re-exported
//! by the crate root.

use std::mem::size_of;
use crate::decode::Source;
use crate::error::DecodeError;


//------------ Length --------------------------------------------------------

/// The length octets of an encoded value.
///
/// A length can either be definite, giving the actual number of content
/// octets of the value, or indefinite, in which case the content is
/// delimited by a special end-of-contents marker.
///
/// # BER Encoding
///
/// If the most significant bit of the first length octet is not set, the
/// remaining bits of that octet provide the definite length directly.
/// Otherwise the remaining bits give the number of octets that follow and
/// encode the definite length in big-endian order, unless they are all
/// zero, i.e., the first octet is 0x80, which signals indefinite length.
/// The octet 0xFF is reserved and rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Length {
    /// The value has this many content octets.
    Definite(usize),

    /// The content is delimited by an end-of-contents marker.
    Indefinite,
}

impl Length {
    /// Returns the length if it is definite.
    pub fn definite(self) -> Option<usize> {
        match self {
            Length::Definite(len) => Some(len),
            Length::Indefinite => None,
        }
    }

    /// Parses a length from the beginning of a source.
    pub fn take_from(source: &mut Source) -> Result<Self, DecodeError> {
        let pos = source.pos();
        let first = source.take_u8()?;
        if first & 0x80 == 0 {
            return Ok(Length::Definite(first.into()))
        }
        if first == 0x80 {
            return Ok(Length::Indefinite)
        }
        if first == 0xFF {
            return Err(DecodeError::malformed_length(
                "illegal length octet 0xff", pos
            ))
        }
        let count = usize::from(first & 0x7f);
        let mut len: usize = 0;
        for _ in 0..count {
            if len > usize::MAX >> 8 {
                return Err(DecodeError::malformed_length(
                    "excessive length", pos
                ))
            }
            len = len << 8 | usize::from(source.take_u8()?);
        }
        Ok(Length::Definite(len))
    }

    /// Returns the number of octets of the encoded form of the length.
    pub fn encoded_len(self) -> usize {
        match self {
            Length::Definite(len) if len < 0x80 => 1,
            Length::Definite(len) => {
                1 + Self::count_octets(len)
            }
            Length::Indefinite => 1,
        }
    }

    /// Appends the encoded length to the end of `target`.
    ///
    /// Definite lengths use the minimum number of octets as required by
    /// CER and DER.
    pub fn append_encoded(self, target: &mut Vec<u8>) {
        match self {
            Length::Definite(len) if len < 0x80 => {
                target.push(len as u8)
            }
            Length::Definite(len) => {
                let count = Self::count_octets(len);
                target.push(0x80 | count as u8);
                target.extend_from_slice(
                    &len.to_be_bytes()[size_of::<usize>() - count..]
                );
            }
            Length::Indefinite => target.push(0x80),
        }
    }

    /// Returns the number of value octets needed for a long-form length.
    fn count_octets(len: usize) -> usize {
        size_of::<usize>()
            - (len.leading_zeros() / 8) as usize
    }
}


//============ Tests =========================================================
