//! BER (ITU-T X.690) reader for the LDAP dialect
//!
//! This module is the TLV layer the message decoders are built on: identifier
//! and length octets, content windows, and the universal primitives LDAP uses
//! (INTEGER, ENUMERATED, BOOLEAN, OCTET STRING, OBJECT IDENTIFIER).
//!
//! All parsers use `nom` streaming semantics: running out of input yields
//! [`nom::Err::Incomplete`], so a caller holding a partial PDU can feed more
//! bytes and retry from the same position.

use crate::error::{LdapError, Result};
use nom::bytes::streaming::take;
use nom::{Err, Needed};
use std::borrow::Cow;
use std::fmt;

/// Largest accepted tag number (maxInt, RFC 4511 §4.1.1).
pub const MAX_TAG_NUMBER: u32 = 2_147_483_647;

// Indefinite-length bodies may nest; bound the walk so a crafted stream of
// `xx 80` prefixes cannot exhaust the stack.
const MAX_INDEFINITE_NESTING: usize = 128;

/// BER tag class (top two bits of the identifier octet).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Class {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl Class {
    fn from_initial_octet(octet: u8) -> Class {
        match octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    pub(crate) fn bits(self) -> u8 {
        match self {
            Class::Universal => 0b0000_0000,
            Class::Application => 0b0100_0000,
            Class::ContextSpecific => 0b1000_0000,
            Class::Private => 0b1100_0000,
        }
    }
}

/// BER tag number.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Tag(pub u32);

impl Tag {
    pub const BOOLEAN: Tag = Tag(1);
    pub const INTEGER: Tag = Tag(2);
    pub const OCTET_STRING: Tag = Tag(4);
    pub const NULL: Tag = Tag(5);
    pub const OID: Tag = Tag(6);
    pub const ENUMERATED: Tag = Tag(10);
    pub const SEQUENCE: Tag = Tag(16);
    pub const SET: Tag = Tag(17);
}

/// Length of the content octets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

impl Length {
    /// Return the definite length, or fail for the indefinite form.
    pub fn definite(&self) -> std::result::Result<usize, LdapError> {
        match self {
            Length::Definite(n) => Ok(*n),
            Length::Indefinite => Err(LdapError::MalformedLength),
        }
    }
}

/// Decoded identifier and length octets of a single TLV.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    pub class: Class,
    pub constructed: bool,
    pub tag: Tag,
    pub length: Length,
}

impl Header {
    /// True for a primitive universal header with the given tag.
    fn is_primitive_universal(&self, tag: Tag) -> bool {
        self.class == Class::Universal && self.tag == tag && !self.constructed
    }
}

/// Parse the identifier and length octets of the next TLV.
pub fn parse_header(i: &[u8]) -> Result<Header> {
    let (i, b0) = take(1usize)(i)?;
    let b0 = b0[0];
    let class = Class::from_initial_octet(b0);
    let constructed = b0 & 0b0010_0000 != 0;
    let low_tag = u32::from(b0 & 0b0001_1111);
    let (i, tag) = if low_tag == 0b0001_1111 {
        parse_high_tag_number(i)?
    } else {
        (i, low_tag)
    };
    let (i, length) = parse_length(i)?;
    Ok((
        i,
        Header {
            class,
            constructed,
            tag: Tag(tag),
            length,
        },
    ))
}

// Tag numbers >= 31 continue in base-128, high bit marking continuation
// (X.690 8.1.2.4).
fn parse_high_tag_number(i: &[u8]) -> Result<u32> {
    let (i, body) = nom::bytes::streaming::take_while(|b| b & 0x80 != 0)(i)?;
    let (i, end) = take(1usize)(i)?;
    // a leading 0x80 is a padded (non-minimal) tag number
    if body.first() == Some(&0x80) || body.len() > 4 {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let mut tag: u64 = 0;
    for b in body {
        tag = (tag << 7) | u64::from(b & 0x7f);
    }
    tag = (tag << 7) | u64::from(end[0]);
    if tag > u64::from(MAX_TAG_NUMBER) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    Ok((i, tag as u32))
}

fn parse_length(i: &[u8]) -> Result<Length> {
    let (i, b0) = take(1usize)(i)?;
    let b0 = b0[0];
    if b0 == 0x80 {
        return Ok((i, Length::Indefinite));
    }
    if b0 & 0x80 == 0 {
        return Ok((i, Length::Definite(usize::from(b0))));
    }
    // long form: low 7 bits give the count of big-endian length octets.
    // 0xff is reserved (X.690 8.1.3.5.c). Redundant leading zero octets are
    // tolerated: directory servers in the wild pad lengths to 4 octets.
    let count = usize::from(b0 & 0x7f);
    if b0 == 0xff || count > 8 {
        return Err(Err::Error(LdapError::MalformedLength));
    }
    let (i, octets) = take(count)(i)?;
    let significant: &[u8] = {
        let mut s = octets;
        while let Some((&0, rest)) = s.split_first() {
            s = rest;
        }
        s
    };
    if significant.len() > 4 {
        return Err(Err::Error(LdapError::MalformedLength));
    }
    let mut len = 0usize;
    for b in significant {
        len = (len << 8) | usize::from(*b);
    }
    Ok((i, Length::Definite(len)))
}

/// Take the content octets described by `header`.
///
/// For the indefinite form (constructed only) the returned window excludes
/// the end-of-contents marker.
pub fn parse_content<'a>(i: &'a [u8], header: &Header) -> Result<'a, &'a [u8]> {
    match header.length {
        Length::Definite(n) => take(n)(i),
        Length::Indefinite => {
            if !header.constructed {
                return Err(Err::Error(LdapError::MalformedLength));
            }
            take_indefinite_content(i, 0)
        }
    }
}

// Walk child TLVs until the end-of-contents marker at this level. A plain
// scan for `00 00` is not enough: those bytes occur inside nested definite
// values.
fn take_indefinite_content(i: &[u8], depth: usize) -> Result<&[u8]> {
    if depth >= MAX_INDEFINITE_NESTING {
        return Err(Err::Error(LdapError::DepthExceeded));
    }
    let mut rem = i;
    loop {
        if rem.len() < 2 {
            if rem.first() == Some(&0x00) || rem.is_empty() {
                return Err(Err::Incomplete(Needed::new(2 - rem.len())));
            }
        } else if rem[0] == 0x00 && rem[1] == 0x00 {
            let content_len = i.len() - rem.len();
            return Ok((&rem[2..], &i[..content_len]));
        }
        let (r, header) = parse_header(rem)?;
        let (r, _) = match header.length {
            Length::Definite(n) => take(n)(r)?,
            Length::Indefinite => {
                if !header.constructed {
                    return Err(Err::Error(LdapError::MalformedLength));
                }
                take_indefinite_content(r, depth + 1)?
            }
        };
        rem = r;
    }
}

/// Parse one TLV: its header and its content window.
pub fn parse_element(i: &[u8]) -> Result<(Header, &[u8])> {
    let (i, header) = parse_header(i)?;
    let (i, content) = parse_content(i, &header)?;
    Ok((i, (header, content)))
}

/// Parse a value from BER bytes, borrowing from the input.
pub trait FromBer<'a>: Sized {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self>;
}

//
// ----------------------- PRIMITIVES -----------------------
//

/// BOOLEAN: any non-zero content octet decodes to `true`.
pub fn parse_boolean(i: &[u8]) -> Result<bool> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::BOOLEAN) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    if content.len() != 1 {
        return Err(Err::Error(LdapError::MalformedLength));
    }
    Ok((i, content[0] != 0))
}

/// Decode two's complement INTEGER content octets.
///
/// Redundant leading `0x00`/`0xff` octets are accepted; after trimming them
/// the value must fit 64 bits.
pub(crate) fn decode_integer_content(content: &[u8]) -> std::result::Result<i64, LdapError> {
    if content.is_empty() {
        return Err(LdapError::MalformedLength);
    }
    let mut idx = 0;
    while idx + 1 < content.len()
        && ((content[idx] == 0x00 && content[idx + 1] & 0x80 == 0)
            || (content[idx] == 0xff && content[idx + 1] & 0x80 != 0))
    {
        idx += 1;
    }
    let trimmed = &content[idx..];
    if trimmed.len() > 8 {
        return Err(LdapError::IntegerOutOfRange);
    }
    let mut value: i64 = if trimmed[0] & 0x80 != 0 { -1 } else { 0 };
    for b in trimmed {
        value = (value << 8) | i64::from(*b);
    }
    Ok(value)
}

/// INTEGER constrained to `(0 .. 2^32)`.
pub fn parse_u32(i: &[u8]) -> Result<u32> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::INTEGER) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let value = decode_integer_content(content).map_err(Err::Error)?;
    if value < 0 || value > i64::from(u32::MAX) {
        return Err(Err::Error(LdapError::IntegerOutOfRange));
    }
    Ok((i, value as u32))
}

/// ENUMERATED, returned as its non-negative discriminant.
pub fn parse_enumerated(i: &[u8]) -> Result<u32> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::ENUMERATED) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let value = decode_integer_content(content).map_err(Err::Error)?;
    if value < 0 || value > i64::from(u32::MAX) {
        return Err(Err::Error(LdapError::IntegerOutOfRange));
    }
    Ok((i, value as u32))
}

/// OCTET STRING, primitive form, returned as a slice of the input.
pub fn parse_octetstring_as_slice(i: &[u8]) -> Result<&[u8]> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::OCTET_STRING) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    Ok((i, content))
}

/// NULL with empty content.
pub fn parse_null(i: &[u8]) -> Result<()> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::NULL) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    if !content.is_empty() {
        return Err(Err::Error(LdapError::MalformedLength));
    }
    Ok((i, ()))
}

/// Object identifier kept in its base-128 wire form.
///
/// The dotted-decimal rendering is produced on demand by [`fmt::Display`];
/// nothing is allocated at parse time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Oid<'a>(pub Cow<'a, [u8]>);

impl<'a> Oid<'a> {
    /// Iterate over the arcs, expanding the packed first sub-identifier.
    pub fn arcs(&self) -> OidArcs<'_> {
        OidArcs {
            rem: &self.0,
            first: true,
            pending: None,
        }
    }
}

impl fmt::Display for Oid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, arc) in self.arcs().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

/// Iterator over the arcs of an [`Oid`].
#[derive(Debug)]
pub struct OidArcs<'a> {
    rem: &'a [u8],
    first: bool,
    pending: Option<u64>,
}

impl Iterator for OidArcs<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if let Some(second) = self.pending.take() {
            return Some(second);
        }
        if self.rem.is_empty() {
            return None;
        }
        let mut value: u64 = 0;
        while let Some((b, rest)) = self.rem.split_first() {
            self.rem = rest;
            value = (value << 7) | u64::from(b & 0x7f);
            if b & 0x80 == 0 {
                break;
            }
        }
        if self.first {
            self.first = false;
            // X.690 8.19.4: first sub-identifier packs the top two arcs
            let (top, second) = match value {
                0..=39 => (0, value),
                40..=79 => (1, value - 40),
                _ => (2, value - 80),
            };
            self.pending = Some(second);
            return Some(top);
        }
        Some(value)
    }
}

/// OBJECT IDENTIFIER, primitive form.
pub fn parse_oid(i: &[u8]) -> Result<Oid> {
    let (i, (header, content)) = parse_element(i)?;
    if !header.is_primitive_universal(Tag::OID) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    // content must be non-empty and its last octet must end a sub-identifier
    if content.is_empty() || content[content.len() - 1] & 0x80 != 0 {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    Ok((i, Oid(Cow::Borrowed(content))))
}

//
// ----------------------- COMBINATORS -----------------------
//

/// Parse a universal SEQUENCE and apply `f` to its content.
///
/// Content bytes not consumed by `f` are ignored, mirroring the tolerance of
/// the message grammar toward trailing elements.
pub fn parse_sequence_and_then<'a, T, F>(i: &'a [u8], f: F) -> Result<'a, T>
where
    F: FnOnce(&'a [u8]) -> Result<'a, T>,
{
    let (rem, (header, content)) = parse_element(i)?;
    if header.class != Class::Universal || header.tag != Tag::SEQUENCE || !header.constructed {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let (_, value) = f(content)?;
    Ok((rem, value))
}

/// Parse a universal SET and apply `f` to its content.
pub fn parse_set_and_then<'a, T, F>(i: &'a [u8], f: F) -> Result<'a, T>
where
    F: FnOnce(&'a [u8]) -> Result<'a, T>,
{
    let (rem, (header, content)) = parse_element(i)?;
    if header.class != Class::Universal || header.tag != Tag::SET || !header.constructed {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let (_, value) = f(content)?;
    Ok((rem, value))
}

/// Parse an implicitly tagged element of the given class and tag number and
/// apply `f` to its content.
pub fn parse_tagged_and_then<'a, T, F>(class: Class, tag: u32, i: &'a [u8], f: F) -> Result<'a, T>
where
    F: FnOnce(&'a [u8]) -> Result<'a, T>,
{
    let (rem, (header, content)) = parse_element(i)?;
    if header.class != class || header.tag != Tag(tag) {
        return Err(Err::Error(LdapError::MalformedTag));
    }
    let (_, value) = f(content)?;
    Ok((rem, value))
}

/// Like [`parse_tagged_and_then`], but yields `None` when the input is empty
/// or the next element carries a different tag.
pub fn parse_opt_tagged_and_then<'a, T, F>(
    class: Class,
    tag: u32,
    i: &'a [u8],
    f: F,
) -> Result<'a, Option<T>>
where
    F: FnOnce(&'a [u8]) -> Result<'a, T>,
{
    if i.is_empty() {
        return Ok((i, None));
    }
    let (_, header) = parse_header(i)?;
    if header.class != class || header.tag != Tag(tag) {
        return Ok((i, None));
    }
    let (rem, (_, content)) = parse_element(i)?;
    let (_, value) = f(content)?;
    Ok((rem, Some(value)))
}

//
// ----------------------- TESTS -----------------------
//
