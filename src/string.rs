//! Character string types.
//!
//! BER defines a zoo of character string types which differ only in their
//! tag and the character repertoire and encoding of their content octets.
//! This module implements the ones the crate can decode: UTF8String,
//! PrintableString, TeletexString, IA5String, UTCTime (which is encoded
//! like a string and treated as one here), VisibleString, and BMPString.
//!
//! The character encoding is selected strictly by the tag and never
//! guessed from the content.

use crate::error::{DecodeError, EncodeError};
use crate::tag::Kind;


//------------ StringKind ----------------------------------------------------

/// The flavor of a character string value.
///
/// Each flavor fixes the character encoding of the content octets:
/// UTF8String uses UTF-8, BMPString uses big-endian 16 bit code units of
/// the Basic Multilingual Plane, and everything else is a single-byte
/// ASCII-compatible encoding restricted to seven bits here.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StringKind {
    Utf8,
    Printable,
    Teletex,
    Ia5,
    UtcTime,
    Visible,
    Bmp,
}

impl StringKind {
    /// Returns the string kind used for a universal tag number, if any.
    pub fn from_tag(number: u32) -> Option<Self> {
        Self::from_kind(Kind::from_tag(number)?)
    }

    /// Returns the string kind going with a registry kind, if any.
    pub fn from_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Utf8String => Some(StringKind::Utf8),
            Kind::PrintableString => Some(StringKind::Printable),
            Kind::TeletexString => Some(StringKind::Teletex),
            Kind::Ia5String => Some(StringKind::Ia5),
            Kind::UtcTime => Some(StringKind::UtcTime),
            Kind::VisibleString => Some(StringKind::Visible),
            Kind::BmpString => Some(StringKind::Bmp),
            _ => None,
        }
    }

    /// Returns the registry kind of the string kind.
    pub fn kind(self) -> Kind {
        match self {
            StringKind::Utf8 => Kind::Utf8String,
            StringKind::Printable => Kind::PrintableString,
            StringKind::Teletex => Kind::TeletexString,
            StringKind::Ia5 => Kind::Ia5String,
            StringKind::UtcTime => Kind::UtcTime,
            StringKind::Visible => Kind::VisibleString,
            StringKind::Bmp => Kind::BmpString,
        }
    }

    /// Returns the universal tag number of the string kind.
    pub fn tag_number(self) -> u32 {
        self.kind().tag_number()
    }

    /// Decodes the content octets of a string of this kind.
    ///
    /// Content that cannot be expressed back identically, such as
    /// non-ASCII octets in the single-byte kinds, is rejected rather than
    /// silently replaced so that decoded values always re-encode to the
    /// input bytes.
    pub fn decode_body(
        self, body: &[u8], pos: usize
    ) -> Result<String, DecodeError> {
        match self {
            StringKind::Utf8 => {
                match std::str::from_utf8(body) {
                    Ok(s) => Ok(s.into()),
                    Err(_) => Err(DecodeError::structural(
                        "invalid UTF-8 in UTF8String", pos
                    )),
                }
            }
            StringKind::Bmp => {
                if body.len() % 2 != 0 {
                    return Err(DecodeError::structural(
                        "odd number of octets in BMPString", pos
                    ))
                }
                let mut res = String::with_capacity(body.len() / 2);
                for unit in body.chunks_exact(2) {
                    let unit = u16::from_be_bytes([unit[0], unit[1]]);
                    match char::from_u32(unit.into()) {
                        Some(ch) => res.push(ch),
                        None => {
                            return Err(DecodeError::structural(
                                "surrogate code unit in BMPString", pos
                            ))
                        }
                    }
                }
                Ok(res)
            }
            _ => {
                if !body.is_ascii() {
                    return Err(DecodeError::structural(
                        "non-ASCII octet in restricted string", pos
                    ))
                }
                // Checked above: the body is pure ASCII.
                Ok(String::from_utf8(body.into()).expect("ascii"))
            }
        }
    }

    /// Encodes a string into content octets of this kind.
    pub fn encode_body(self, value: &str) -> Result<Vec<u8>, EncodeError> {
        match self {
            StringKind::Utf8 => Ok(value.as_bytes().into()),
            StringKind::Bmp => {
                let mut res = Vec::with_capacity(value.len() * 2);
                for ch in value.chars() {
                    let unit = u32::from(ch);
                    if unit > 0xFFFF {
                        return Err(EncodeError::unsupported(
                            "character outside the BMP in BMPString"
                        ))
                    }
                    res.extend_from_slice(&(unit as u16).to_be_bytes());
                }
                Ok(res)
            }
            _ => {
                if !value.is_ascii() {
                    return Err(EncodeError::unsupported(
                        "non-ASCII character in restricted string"
                    ))
                }
                Ok(value.as_bytes().into())
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_kinds() {
        for kind in [
            StringKind::Printable, StringKind::Teletex, StringKind::Ia5,
            StringKind::UtcTime, StringKind::Visible,
        ] {
            assert_eq!(
                kind.decode_body(b"Test User 1", 0).unwrap(),
                "Test User 1"
            );
            assert_eq!(
                kind.encode_body("Test User 1").unwrap(),
                b"Test User 1"
            );
            assert!(kind.decode_body(b"caf\xc3\xa9", 0).is_err());
            assert!(kind.encode_body("caf\u{e9}").is_err());
        }
    }

    #[test]
    fn utf8() {
        assert_eq!(
            StringKind::Utf8.decode_body(
                "überfällig".as_bytes(), 0
            ).unwrap(),
            "überfällig"
        );
        assert_eq!(
            StringKind::Utf8.encode_body("überfällig").unwrap(),
            "überfällig".as_bytes()
        );
        assert!(StringKind::Utf8.decode_body(b"\xff\xfe", 0).is_err());
    }

    #[test]
    fn bmp() {
        assert_eq!(
            StringKind::Bmp.decode_body(
                b"\x00T\x00e\x00s\x00t", 0
            ).unwrap(),
            "Test"
        );
        assert_eq!(
            StringKind::Bmp.encode_body("Test").unwrap(),
            b"\x00T\x00e\x00s\x00t"
        );
        assert_eq!(
            StringKind::Bmp.encode_body("\u{3042}").unwrap(),
            b"\x30\x42"
        );
        // Odd length and lone surrogates are rejected.
        assert!(StringKind::Bmp.decode_body(b"\x00T\x00", 0).is_err());
        assert!(StringKind::Bmp.decode_body(b"\xd8\x00", 0).is_err());
        // Outside the BMP there is no encoding.
        assert!(StringKind::Bmp.encode_body("\u{1f600}").is_err());
    }

    #[test]
    fn tag_mapping() {
        assert_eq!(StringKind::from_tag(12), Some(StringKind::Utf8));
        assert_eq!(StringKind::from_tag(19), Some(StringKind::Printable));
        assert_eq!(StringKind::from_tag(22), Some(StringKind::Ia5));
        assert_eq!(StringKind::from_tag(23), Some(StringKind::UtcTime));
        assert_eq!(StringKind::from_tag(26), Some(StringKind::Visible));
        assert_eq!(StringKind::from_tag(30), Some(StringKind::Bmp));
        assert_eq!(StringKind::from_tag(4), None);
        assert_eq!(StringKind::Bmp.tag_number(), 30);
    }
}
