//! ASN.1 Object Identifiers.
//!
//! This module contains the [`Oid`] type that implements object
//! identifiers, a construct used by ASN.1 to uniquely identify all sorts
//! of things, as well as the [`OidDictionary`] that maps identifier arcs
//! to symbolic names for display purposes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use log::debug;
use smallvec::SmallVec;
use thiserror::Error;
use crate::error::{DecodeError, EncodeError};


//------------ Oid -----------------------------------------------------------

/// An object identifier.
///
/// Object identifiers are globally unique, hierarchical values that are
/// used to identify objects or their type. When written, they are
/// presented as a sequence of integers separated by dots such as
/// ‘1.2.840.113549’. This type keeps the identifier as its sequence of
/// arcs.
///
/// # BER Encoding
///
/// The first two arcs are packed into a single sub-identifier as
/// `40 * arc0 + arc1` with `arc0` limited to 0, 1, or 2 and, for the
/// first two roots, `arc1` limited to 0..40. Every sub-identifier is
/// encoded in base 128, most significant group first, with bit 8 set on
/// every octet but the last.
///
/// # Limitations
///
/// Arc values are limited to the range of `u64`. Encodings with larger
/// arcs are rejected as unsupported.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Oid {
    arcs: SmallVec<[u64; 12]>,
}

impl Oid {
    /// Creates an object identifier from its arcs.
    pub fn new(arcs: impl IntoIterator<Item = u64>) -> Self {
        Oid { arcs: arcs.into_iter().collect() }
    }

    /// Returns the arcs of the identifier.
    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Returns a new identifier with `arc` appended.
    pub fn child(&self, arc: u64) -> Self {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Parses the content octets of an object identifier value.
    pub fn from_body(body: &[u8], pos: usize) -> Result<Self, DecodeError> {
        if body.is_empty() {
            return Err(DecodeError::structural(
                "OBJECT IDENTIFIER with empty body", pos
            ))
        }
        let mut arcs = SmallVec::new();
        let mut iter = body.iter();
        let mut first = true;
        loop {
            let mut value: u64 = 0;
            loop {
                let octet = match iter.next() {
                    Some(octet) => *octet,
                    None => {
                        return Err(DecodeError::structural(
                            "truncated sub-identifier", pos
                        ))
                    }
                };
                if value > u64::MAX >> 7 {
                    return Err(DecodeError::unsupported(
                        "sub-identifier too large", pos
                    ))
                }
                value = value << 7 | u64::from(octet & 0x7f);
                if octet & 0x80 == 0 {
                    break
                }
            }
            if first {
                // The first sub-identifier packs the first two arcs.
                if value < 40 {
                    arcs.push(0);
                    arcs.push(value);
                }
                else if value < 80 {
                    arcs.push(1);
                    arcs.push(value - 40);
                }
                else {
                    arcs.push(2);
                    arcs.push(value - 80);
                }
                first = false;
            }
            else {
                arcs.push(value);
            }
            if iter.as_slice().is_empty() {
                break
            }
        }
        Ok(Oid { arcs })
    }

    /// Appends the content octets of the identifier to `target`.
    pub fn append_body(
        &self, target: &mut Vec<u8>
    ) -> Result<(), EncodeError> {
        let (arc0, arc1) = match (self.arcs.first(), self.arcs.get(1)) {
            (Some(&arc0), Some(&arc1)) => (arc0, arc1),
            _ => {
                return Err(EncodeError::unsupported(
                    "object identifier needs at least two arcs"
                ))
            }
        };
        if arc0 > 2 || (arc0 < 2 && arc1 >= 40) {
            return Err(EncodeError::unsupported(
                "illegal first arcs in object identifier"
            ))
        }
        let first = arc0.checked_mul(40)
            .and_then(|v| v.checked_add(arc1))
            .ok_or_else(|| {
                EncodeError::unsupported("sub-identifier too large")
            })?;
        Self::append_base128(first, target);
        for &arc in &self.arcs[2..] {
            Self::append_base128(arc, target);
        }
        Ok(())
    }

    /// Appends a single sub-identifier in base 128.
    fn append_base128(value: u64, target: &mut Vec<u8>) {
        let bits = 64 - value.leading_zeros() as usize;
        let len = bits.div_ceil(7).max(1);
        for i in (0..len).rev() {
            let mut octet = (value >> (i * 7)) as u8 & 0x7f;
            if i > 0 {
                octet |= 0x80;
            }
            target.push(octet);
        }
    }
}

impl FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut arcs = SmallVec::new();
        for part in s.split('.') {
            arcs.push(
                part.parse().map_err(|_| ParseOidError(s.into()))?
            );
        }
        Ok(Oid { arcs })
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut arcs = self.arcs.iter();
        if let Some(arc) = arcs.next() {
            write!(f, "{}", arc)?;
        }
        for arc in arcs {
            write!(f, ".{}", arc)?;
        }
        Ok(())
    }
}


//------------ ParseOidError -------------------------------------------------

/// A string could not be parsed into an object identifier.
#[derive(Clone, Debug, Error)]
#[error("invalid object identifier {0:?}")]
pub struct ParseOidError(String);


//------------ OidDictionary -------------------------------------------------

/// A tree of symbolic names for object identifier arcs.
///
/// The dictionary renders object identifiers with human-readable names.
/// It is read-mostly: lookups for arcs without an entry lazily insert an
/// unnamed node so that repeated lookups walk the same path, and the tree
/// only ever grows.
///
/// A process-wide instance preloaded with the bundled definitions is
/// available through [`global`]. Code that wants reproducible lookups,
/// such as tests, can create and fill its own instance instead.
#[derive(Debug, Default)]
pub struct OidDictionary {
    root: DictNode,
}

impl OidDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary preloaded with the bundled definitions.
    pub fn bundled() -> Self {
        let mut res = Self::new();
        res.insert_definitions(DEFINITIONS);
        res
    }

    /// Bulk-loads arc-to-name definitions.
    ///
    /// Each definition pairs an identifier in dotted notation with the
    /// name of its final arc. Definitions with unparseable identifiers
    /// are skipped.
    pub fn insert_definitions(&mut self, defs: &[(&str, &str)]) {
        let mut count = 0;
        for (oid, name) in defs {
            if let Ok(oid) = Oid::from_str(oid) {
                self.insert(&oid, name);
                count += 1;
            }
        }
        debug!("loaded {} object identifier names", count);
    }

    /// Sets the name for the final arc of `oid`.
    ///
    /// Intermediate nodes are created as needed and keep whatever name
    /// they already have.
    pub fn insert(&mut self, oid: &Oid, name: &str) {
        let mut node = &mut self.root;
        for &arc in oid.arcs() {
            node = node.children.entry(arc).or_default();
        }
        node.name = Some(name.into());
    }

    /// Returns the display name of an identifier.
    ///
    /// The name strings together one element per arc, each either
    /// `Name(arc)` for a registered arc or `Unknown(arc)` otherwise,
    /// joined with dots. Arcs without an entry are inserted unnamed so
    /// the dictionary grows along with the identifiers it has seen.
    pub fn resolve_name(&mut self, oid: &Oid) -> String {
        let mut res = String::new();
        let mut node = &mut self.root;
        for &arc in oid.arcs() {
            node = node.children.entry(arc).or_default();
            if !res.is_empty() {
                res.push('.');
            }
            match node.name {
                Some(ref name) => {
                    res.push_str(name);
                }
                None => res.push_str("Unknown"),
            }
            res.push('(');
            res.push_str(&arc.to_string());
            res.push(')');
        }
        res
    }

    /// Returns the short name of an identifier.
    ///
    /// This is the name of the final arc alone, or `Unknown(arc)` if
    /// that arc has no name.
    pub fn short_name(&mut self, oid: &Oid) -> String {
        let mut node = &mut self.root;
        let mut res = String::new();
        for &arc in oid.arcs() {
            node = node.children.entry(arc).or_default();
            res = match node.name {
                Some(ref name) => name.clone(),
                None => format!("Unknown({})", arc),
            };
        }
        res
    }
}

//------------ DictNode ------------------------------------------------------

/// A single node of the dictionary tree.
#[derive(Debug, Default)]
struct DictNode {
    /// The symbolic name of the arc, if known.
    name: Option<String>,

    /// The child nodes keyed by their arc value.
    children: HashMap<u64, DictNode>,
}


//------------ Global dictionary ---------------------------------------------

/// Returns the process-wide dictionary.
///
/// The dictionary is created on first use, preloaded with the bundled
/// definitions, and lives for the rest of the process. Lazy inserts on
/// lookup misses are serialized through the mutex.
pub fn global() -> &'static Mutex<OidDictionary> {
    static GLOBAL: OnceLock<Mutex<OidDictionary>> = OnceLock::new();
    GLOBAL.get_or_init(|| Mutex::new(OidDictionary::bundled()))
}


//------------ Bundled definitions -------------------------------------------

/// The bundled arc-to-name table.
///
/// This covers the arcs that show up in certificates, keys, and PKCS
/// containers. It makes no attempt at completeness; unknown arcs simply
/// render as `Unknown(arc)`.
static DEFINITIONS: &[(&str, &str)] = &[
    ("0", "itu-t"),
    ("1", "iso"),
    ("2", "joint-iso-itu-t"),
    ("1.2", "member-body"),
    ("1.2.840", "us"),
    ("1.2.840.10040", "x9-57"),
    ("1.2.840.10040.4.1", "dsa"),
    ("1.2.840.10045", "ansi-X9-62"),
    ("1.2.840.10045.2.1", "ecPublicKey"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.2.840.113549", "rsadsi"),
    ("1.2.840.113549.1", "pkcs"),
    ("1.2.840.113549.1.1", "pkcs-1"),
    ("1.2.840.113549.1.1.1", "rsaEncryption"),
    ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.5", "pkcs-5"),
    ("1.2.840.113549.1.5.12", "id-PBKDF2"),
    ("1.2.840.113549.1.5.13", "id-PBES2"),
    ("1.2.840.113549.1.5.14", "id-PBMAC1"),
    ("1.2.840.113549.1.7", "pkcs-7"),
    ("1.2.840.113549.1.7.1", "data"),
    ("1.2.840.113549.1.7.2", "signedData"),
    ("1.2.840.113549.1.7.6", "encryptedData"),
    ("1.2.840.113549.1.9", "pkcs-9"),
    ("1.2.840.113549.1.9.1", "emailAddress"),
    ("1.2.840.113549.1.12", "pkcs-12"),
    ("1.2.840.113549.1.12.10.1.2", "pkcs-8ShroudedKeyBag"),
    ("1.2.840.113549.2.5", "md5"),
    ("1.2.840.113549.2.9", "hmacWithSHA256"),
    ("1.3", "identified-organization"),
    ("1.3.6", "dod"),
    ("1.3.6.1", "internet"),
    ("1.3.6.1.4", "private"),
    ("1.3.6.1.4.1", "enterprise"),
    ("1.3.6.1.5", "security"),
    ("1.3.6.1.5.5", "mechanisms"),
    ("1.3.6.1.5.5.7", "pkix"),
    ("1.3.6.1.5.5.7.1", "pe"),
    ("1.3.6.1.5.5.7.1.1", "authorityInfoAccess"),
    ("1.3.6.1.5.5.7.48.1", "ocsp"),
    ("1.3.6.1.5.5.7.48.2", "caIssuers"),
    ("1.3.14", "oiw"),
    ("1.3.14.3.2.26", "sha1"),
    ("2.5", "ds"),
    ("2.5.4", "attributeType"),
    ("2.5.4.3", "commonName"),
    ("2.5.4.5", "serialNumber"),
    ("2.5.4.6", "countryName"),
    ("2.5.4.7", "localityName"),
    ("2.5.4.8", "stateOrProvinceName"),
    ("2.5.4.10", "organizationName"),
    ("2.5.4.11", "organizationalUnitName"),
    ("2.5.29", "certificateExtension"),
    ("2.5.29.14", "subjectKeyIdentifier"),
    ("2.5.29.15", "keyUsage"),
    ("2.5.29.17", "subjectAltName"),
    ("2.5.29.19", "basicConstraints"),
    ("2.5.29.31", "cRLDistributionPoints"),
    ("2.5.29.35", "authorityKeyIdentifier"),
    ("2.16", "country"),
    ("2.16.840", "us"),
    ("2.16.840.1.101.3.4.2.1", "sha-256"),
    ("2.16.840.1.101.3.4.2.2", "sha-384"),
];


//============ Tests =========================================================
