//! LDAP control payloads and the typed-control registry
//!
//! A control rides on any message as `SEQUENCE { LDAPOID, BOOLEAN DEFAULT
//! FALSE, OCTET STRING OPTIONAL }`. The envelope is universal; interpreting
//! the value octets is per-OID. The registry maps an OID to its capability
//! triple (decode, encode, default) so dialects can add controls at startup
//! without touching the message decoders.

use crate::ber::{
    parse_boolean, parse_enumerated, parse_octetstring_as_slice, parse_sequence_and_then,
    parse_u32,
};
use crate::encoder::{
    build, int_content_len, tlv_len, write_boolean, write_integer, write_octetstring,
    write_sequence,
};
use crate::error::LdapError;
use crate::ldap::cow_bytes_static;
use log::debug;
use nom::combinator::{complete, opt};
use rusticata_macros::newtype_enum;
use std::borrow::Cow;
use std::collections::HashMap;

/// ManageDsaIT (RFC 3296); no value.
pub const CONTROL_MANAGE_DSA_IT: &str = "2.16.840.1.113730.3.4.2";
/// Subentries visibility (RFC 3672); BOOLEAN value.
pub const CONTROL_SUBENTRIES: &str = "1.3.6.1.4.1.4203.1.10.1";
/// Simple paged results (RFC 2696).
pub const CONTROL_PAGED_RESULTS: &str = "1.2.840.113556.1.4.319";
/// Entry change notification (draft-ietf-ldapext-psearch).
pub const CONTROL_ENTRY_CHANGE: &str = "2.16.840.1.113730.3.4.7";

/// Decoded control value.
///
/// Controls without a registered decoder keep their octets verbatim in
/// [`ControlValue::Raw`]; a registered decoder replaces them with a typed
/// payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ControlValue<'a> {
    /// No value octets on the wire.
    Absent,
    /// Opaque value of an unrecognized control.
    Raw(Cow<'a, [u8]>),
    ManageDsaIt,
    Subentries(bool),
    PagedResults(PagedResults),
    EntryChange(EntryChangeNotification),
}

impl ControlValue<'_> {
    pub fn to_static(&self) -> ControlValue<'static> {
        match self {
            ControlValue::Absent => ControlValue::Absent,
            ControlValue::Raw(b) => ControlValue::Raw(cow_bytes_static(b)),
            ControlValue::ManageDsaIt => ControlValue::ManageDsaIt,
            ControlValue::Subentries(v) => ControlValue::Subentries(*v),
            ControlValue::PagedResults(p) => ControlValue::PagedResults(p.clone()),
            ControlValue::EntryChange(e) => ControlValue::EntryChange(e.clone()),
        }
    }
}

// realSearchControlValue ::= SEQUENCE {
//      size            INTEGER (0..maxInt),
//      cookie          OCTET STRING }
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PagedResults {
    pub size: u32,
    pub cookie: Vec<u8>,
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct ChangeType(pub u32);

newtype_enum! {
impl debug ChangeType {
    Add = 1,
    Delete = 2,
    Modify = 4,
    ModDn = 8,
}
}

// EntryChangeNotification ::= SEQUENCE {
//      changeType ENUMERATED { add (1), delete (2), modify (4), modDN (8) },
//      previousDN   LDAPDN OPTIONAL,     -- modifyDN ops. only
//      changeNumber INTEGER OPTIONAL }   -- if supported
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryChangeNotification {
    pub change_type: ChangeType,
    pub previous_dn: Option<String>,
    pub change_number: Option<i64>,
}

/// Capability triple registered for a control OID.
#[derive(Clone, Copy, Debug)]
pub struct ControlHandler {
    /// Interpret the value octets, or reject them.
    pub decode: fn(&[u8]) -> Result<ControlValue<'static>, LdapError>,
    /// Serialize the typed payload back to value octets; `None` means the
    /// value is omitted on the wire.
    pub encode: fn(&ControlValue) -> Option<Vec<u8>>,
    /// Payload used when the control carries no value octets.
    pub default: fn() -> ControlValue<'static>,
}

/// OID to handler mapping, immutable once decoding starts.
#[derive(Clone, Debug)]
pub struct ControlRegistry {
    handlers: HashMap<String, ControlHandler>,
}

impl ControlRegistry {
    /// Registry without any typed decoder; every value stays raw.
    pub fn empty() -> Self {
        ControlRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the controls this crate knows how to type.
    pub fn with_known_controls() -> Self {
        let mut registry = ControlRegistry::empty();
        registry.register(
            CONTROL_MANAGE_DSA_IT,
            ControlHandler {
                decode: decode_manage_dsa_it,
                encode: encode_value,
                default: || ControlValue::ManageDsaIt,
            },
        );
        registry.register(
            CONTROL_SUBENTRIES,
            ControlHandler {
                decode: decode_subentries,
                encode: encode_value,
                default: || ControlValue::Absent,
            },
        );
        registry.register(
            CONTROL_PAGED_RESULTS,
            ControlHandler {
                decode: decode_paged_results,
                encode: encode_value,
                default: || ControlValue::Absent,
            },
        );
        registry.register(
            CONTROL_ENTRY_CHANGE,
            ControlHandler {
                decode: decode_entry_change,
                encode: encode_value,
                default: || ControlValue::Absent,
            },
        );
        registry
    }

    pub fn register(&mut self, oid: &str, handler: ControlHandler) {
        self.handlers.insert(oid.to_string(), handler);
    }

    pub fn get(&self, oid: &str) -> Option<&ControlHandler> {
        self.handlers.get(oid)
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        ControlRegistry::with_known_controls()
    }
}

/// Apply the registry to a freshly parsed control envelope.
///
/// A failing typed decode downgrades to the raw octets when the control is
/// not critical, and fails the surrounding message when it is.
pub(crate) fn interpret_control_value<'a>(
    registry: &ControlRegistry,
    oid: &str,
    criticality: bool,
    raw: Option<Cow<'a, [u8]>>,
) -> Result<ControlValue<'a>, LdapError> {
    let handler = match registry.get(oid) {
        Some(handler) => handler,
        None => {
            return Ok(match raw {
                Some(bytes) => ControlValue::Raw(bytes),
                None => ControlValue::Absent,
            })
        }
    };
    match raw {
        None => Ok((handler.default)()),
        Some(bytes) => match (handler.decode)(&bytes) {
            Ok(value) => Ok(value),
            Err(e) if criticality => Err(e),
            Err(e) => {
                debug!("control {} value rejected ({}), keeping raw octets", oid, e);
                Ok(ControlValue::Raw(bytes))
            }
        },
    }
}

/// Serialize a control value back to its octets.
pub fn encode_value(value: &ControlValue) -> Option<Vec<u8>> {
    match value {
        ControlValue::Absent | ControlValue::ManageDsaIt => None,
        ControlValue::Raw(bytes) => Some(bytes.to_vec()),
        ControlValue::Subentries(visibility) => {
            Some(build(tlv_len(1), |w| write_boolean(w, *visibility)))
        }
        ControlValue::PagedResults(paged) => {
            let content =
                tlv_len(int_content_len(i64::from(paged.size))) + tlv_len(paged.cookie.len());
            Some(build(tlv_len(content), |w| {
                write_sequence(w, content, |w| {
                    write_octetstring(w, &paged.cookie);
                    write_integer(w, i64::from(paged.size));
                })
            }))
        }
        ControlValue::EntryChange(change) => {
            let mut content = tlv_len(int_content_len(i64::from(change.change_type.0)));
            if let Some(dn) = &change.previous_dn {
                content += tlv_len(dn.len());
            }
            if let Some(number) = change.change_number {
                content += tlv_len(int_content_len(number));
            }
            Some(build(tlv_len(content), |w| {
                write_sequence(w, content, |w| {
                    if let Some(number) = change.change_number {
                        write_integer(w, number);
                    }
                    if let Some(dn) = &change.previous_dn {
                        write_octetstring(w, dn.as_bytes());
                    }
                    crate::encoder::write_enumerated(w, change.change_type.0);
                })
            }))
        }
    }
}

fn complete_value<T>(res: crate::error::Result<T>) -> Result<T, LdapError> {
    match res {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
        Err(nom::Err::Incomplete(_)) => Err(LdapError::InvalidControlValue),
    }
}

fn decode_manage_dsa_it(value: &[u8]) -> Result<ControlValue<'static>, LdapError> {
    if value.is_empty() {
        Ok(ControlValue::ManageDsaIt)
    } else {
        Err(LdapError::InvalidControlValue)
    }
}

fn decode_subentries(value: &[u8]) -> Result<ControlValue<'static>, LdapError> {
    let visibility = complete_value(parse_boolean(value))?;
    Ok(ControlValue::Subentries(visibility))
}

fn decode_paged_results(value: &[u8]) -> Result<ControlValue<'static>, LdapError> {
    let paged = complete_value(parse_sequence_and_then(value, |i| {
        let (i, size) = parse_u32(i)?;
        let (i, cookie) = parse_octetstring_as_slice(i)?;
        Ok((
            i,
            PagedResults {
                size,
                cookie: cookie.to_vec(),
            },
        ))
    }))?;
    Ok(ControlValue::PagedResults(paged))
}

fn decode_entry_change(value: &[u8]) -> Result<ControlValue<'static>, LdapError> {
    let change = complete_value(parse_sequence_and_then(value, |i| {
        let (i, change_type) = parse_enumerated(i)?;
        if !matches!(change_type, 1 | 2 | 4 | 8) {
            return Err(nom::Err::Error(LdapError::InvalidControlValue));
        }
        let (i, previous_dn) = opt(complete(|d| {
            let (d, bytes) = parse_octetstring_as_slice(d)?;
            let s = std::str::from_utf8(bytes)
                .or(Err(nom::Err::Error(LdapError::InvalidString)))?;
            Ok((d, s.to_string()))
        }))(i)?;
        let (i, change_number) = opt(complete(|d| {
            let (d, (header, content)) = crate::ber::parse_element(d)?;
            if header.class != crate::ber::Class::Universal
                || header.tag != crate::ber::Tag::INTEGER
                || header.constructed
            {
                return Err(nom::Err::Error(LdapError::MalformedTag));
            }
            let number = crate::ber::decode_integer_content(content).map_err(nom::Err::Error)?;
            Ok((d, number))
        }))(i)?;
        Ok((
            i,
            EntryChangeNotification {
                change_type: ChangeType(change_type),
                previous_dn,
                change_number,
            },
        ))
    }))?;
    Ok(ControlValue::EntryChange(change))
}

//
// ----------------------- TESTS -----------------------
//
