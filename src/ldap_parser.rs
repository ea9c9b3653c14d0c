// DEFINITIONS
// IMPLICIT TAGS
// EXTENSIBILITY IMPLIED

use crate::ber::{
    decode_integer_content, parse_boolean, parse_element, parse_enumerated, parse_header,
    parse_null, parse_octetstring_as_slice, parse_opt_tagged_and_then, parse_sequence_and_then,
    parse_tagged_and_then, parse_u32, Class, FromBer,
};
use crate::codec::DecodeOptions;
use crate::controls::{interpret_control_value, ControlRegistry};
use crate::error::*;
use crate::filter::*;
use crate::filter_parser::parse_filter;
use crate::ldap::*;
use nom::combinator::{complete, map, opt};
use nom::multi::{many0, many1};
use nom::Err;
use std::borrow::Cow;

// maxInt INTEGER ::= 2147483647 -- (2^^31 - 1) --
pub(crate) const MAX_INT: u32 = 2_147_483_647;

// MessageID ::= INTEGER (0 ..  maxInt)
impl<'a> FromBer<'a> for MessageID {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        let (i, id) = parse_u32(bytes)?;
        if id > MAX_INT {
            return Err(Err::Error(LdapError::IntegerOutOfRange));
        }
        Ok((i, MessageID(id)))
    }
}

// LDAPString ::= OCTET STRING -- UTF-8 encoded,
//                             -- [ISO10646] characters
impl<'a> FromBer<'a> for LdapString<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        let (i, b) = parse_ldap_octet_string_as_slice(bytes)?;
        // convert to UTF-8
        let s = std::str::from_utf8(b).or(Err(Err::Error(LdapError::InvalidString)))?;
        Ok((i, LdapString(Cow::Borrowed(s))))
    }
}

#[inline]
pub(crate) fn parse_ldap_octet_string_as_slice(i: &[u8]) -> Result<&[u8]> {
    parse_octetstring_as_slice(i)
}

// INTEGER (0 ..  maxInt)
#[inline]
fn parse_ldap_int_as_max_int(i: &[u8]) -> Result<u32> {
    let (i, value) = parse_u32(i)?;
    if value > MAX_INT {
        return Err(Err::Error(LdapError::IntegerOutOfRange));
    }
    Ok((i, value))
}

#[inline]
fn parse_ldap_enum_as_u32(i: &[u8]) -> Result<u32> {
    parse_enumerated(i)
}

// LDAPDN ::= LDAPString -- Constrained to <distinguishedName>
//                       -- [RFC4514]
impl<'a> FromBer<'a> for LdapDN<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        // read bytes
        let (i, b) = parse_octetstring_as_slice(bytes)?;
        // convert to UTF-8
        let s = std::str::from_utf8(b).or(Err(Err::Error(LdapError::InvalidDN)))?;
        Ok((i, LdapDN(Cow::Borrowed(s))))
    }
}

// RelativeLDAPDN ::= LDAPString -- Constrained to <name-component>
//                               -- [RFC4514]
impl<'a> FromBer<'a> for RelativeLdapDN<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        // read bytes
        let (i, b) = parse_octetstring_as_slice(bytes)?;
        // convert to UTF-8
        let s = std::str::from_utf8(b).or(Err(Err::Error(LdapError::InvalidDN)))?;
        Ok((i, RelativeLdapDN(Cow::Borrowed(s))))
    }
}

// LDAPOID ::= OCTET STRING -- Constrained to <numericoid>
//                          -- [RFC4512]
impl<'a> FromBer<'a> for LdapOID<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        // read bytes
        let (i, b) = parse_octetstring_as_slice(bytes)?;
        // convert to UTF-8
        let s = std::str::from_utf8(b).or(Err(Err::Error(LdapError::InvalidDN)))?;
        Ok((i, LdapOID(Cow::Borrowed(s))))
    }
}

// URI ::= LDAPString     -- limited to characters permitted in
//                                -- URIs
#[inline]
fn parse_ldap_uri(i: &[u8]) -> Result<LdapString> {
    LdapString::from_ber(i)
}

//
//
//
//
//
// ----------------------- LDAP OBJECTS -----------------------
//
//
//
//
//
//

// LDAPResult ::= SEQUENCE {
//      resultCode         ENUMERATED {
//           success                      (0),
//           ...  },
//      matchedDN          LDAPDN,
//      diagnosticMessage  LDAPString,
//      referral           [3] Referral OPTIONAL }
fn parse_ldap_result_content(i: &[u8]) -> Result<LdapResult> {
    let (i, result_code) = map(parse_ldap_enum_as_u32, ResultCode)(i)?;
    let (i, matched_dn) = LdapDN::from_ber(i)?;
    let (i, diagnostic_message) = LdapString::from_ber(i)?;
    // referral, when present, is left in the unparsed tail
    let result = LdapResult {
        result_code,
        matched_dn,
        diagnostic_message,
    };
    Ok((i, result))
}

// LDAPMessage ::= SEQUENCE {
//      messageID       MessageID,
//      protocolOp      CHOICE { ... },
//      controls       [0] Controls OPTIONAL }
impl<'a> FromBer<'a> for LdapMessage<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_ldap_message_with(&DecodeOptions::default(), bytes)
    }
}

/// Parse a single LDAP message under the given options, borrowing fields
/// from the input buffer.
///
/// ```rust
/// use ldap_codec::ldap::{LdapMessage, MessageID, ProtocolOpTag};
/// use ldap_codec::FromBer;
///
/// static DATA: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x06, 0x50, 0x01, 0x05];
///
/// # fn main() {
/// let res = LdapMessage::from_ber(DATA);
/// match res {
///     Ok((rem, msg)) => {
///         assert!(rem.is_empty());
///         assert_eq!(msg.message_id, MessageID(6));
///         assert_eq!(msg.protocol_op.tag(), ProtocolOpTag::AbandonRequest);
///     }
///     _ => panic!("LDAP parsing failed: {:?}", res),
/// }
/// # }
/// ```
pub fn parse_ldap_message_with<'a>(
    options: &DecodeOptions,
    bytes: &'a [u8],
) -> Result<'a, LdapMessage<'a>> {
    parse_sequence_and_then(bytes, |i| {
        let (i, message_id) = MessageID::from_ber(i)?;
        // read header of next element and look at the tag value
        let (_, header) = parse_header(i)?;
        if header.class != Class::Application {
            return Err(Err::Error(LdapError::InvalidMessageType));
        }
        let (i, protocol_op) = match header.tag.0 {
            0 => map(parse_ldap_bind_request, ProtocolOp::BindRequest)(i),
            1 => map(parse_ldap_bind_response, ProtocolOp::BindResponse)(i),
            2 => parse_ldap_unbind_request(i),
            3 => map(
                |d| parse_ldap_search_request(options, d),
                ProtocolOp::SearchRequest,
            )(i),
            4 => map(parse_ldap_search_result_entry, ProtocolOp::SearchResultEntry)(i),
            5 => map(parse_ldap_search_result_done, ProtocolOp::SearchResultDone)(i),
            6 => map(parse_ldap_modify_request, ProtocolOp::ModifyRequest)(i),
            7 => map(parse_ldap_modify_response, ProtocolOp::ModifyResponse)(i),
            8 => map(parse_ldap_add_request, ProtocolOp::AddRequest)(i),
            9 => map(parse_ldap_add_response, ProtocolOp::AddResponse)(i),
            10 => map(parse_ldap_del_request, ProtocolOp::DelRequest)(i),
            11 => map(parse_ldap_del_response, ProtocolOp::DelResponse)(i),
            12 => map(parse_ldap_moddn_request, ProtocolOp::ModDnRequest)(i),
            13 => map(parse_ldap_moddn_response, ProtocolOp::ModDnResponse)(i),
            14 => map(parse_ldap_compare_request, ProtocolOp::CompareRequest)(i),
            15 => map(parse_ldap_compare_response, ProtocolOp::CompareResponse)(i),
            16 => map(parse_ldap_abandon_request, ProtocolOp::AbandonRequest)(i),
            19 => map(
                parse_ldap_search_result_ref,
                ProtocolOp::SearchResultReference,
            )(i),
            23 => map(parse_ldap_extended_request, ProtocolOp::ExtendedRequest)(i),
            24 => map(parse_ldap_extended_response, ProtocolOp::ExtendedResponse)(i),
            25 => map(
                parse_ldap_intermediate_response,
                ProtocolOp::IntermediateResponse,
            )(i),
            _ => Err(Err::Error(LdapError::InvalidMessageType)),
        }?;
        // a control that fails to decode (e.g. a critical control with a bad
        // typed value) fails the message instead of being skipped
        let (i, controls) = parse_opt_tagged_and_then(Class::ContextSpecific, 0, i, |d| {
            let mut rem = d;
            let mut controls = Vec::new();
            while !rem.is_empty() {
                let (rest, control) = parse_ldap_control(&options.registry, rem)?;
                controls.push(control);
                rem = rest;
            }
            Ok((rem, controls))
        })?;
        let msg = LdapMessage {
            message_id,
            protocol_op,
            controls,
        };
        Ok((i, msg))
    })
}

/// Parse a list of LDAP messages and return a structure borrowing fields from the input buffer
pub fn parse_ldap_messages(i: &[u8]) -> Result<Vec<LdapMessage>> {
    many1(complete(LdapMessage::from_ber))(i)
}

// BindRequest ::= [APPLICATION 0] SEQUENCE {
//      version                 INTEGER (1 ..  127),
//      name                    LDAPDN,
//      authentication          AuthenticationChoice }
fn parse_ldap_bind_request(bytes: &[u8]) -> Result<BindRequest> {
    parse_tagged_and_then(Class::Application, 0, bytes, |i| {
        let (i, version) = parse_u32(i)?;
        if !(1..=3).contains(&version) {
            return Err(Err::Error(LdapError::InvalidBindVersion));
        }
        let version = version as u8;
        let (i, name) = LdapDN::from_ber(i)?;
        let (i, authentication) = AuthenticationChoice::from_ber(i)?;
        let req = BindRequest {
            version,
            name,
            authentication,
        };
        Ok((i, req))
    })
}

// BindResponse ::= [APPLICATION 1] SEQUENCE {
//      COMPONENTS OF LDAPResult,
//      serverSaslCreds    [7] OCTET STRING OPTIONAL }
fn parse_ldap_bind_response(bytes: &[u8]) -> Result<BindResponse> {
    parse_tagged_and_then(Class::Application, 1, bytes, |i| {
        let (i, result) = parse_ldap_result_content(i)?;
        let (i, server_sasl_creds) =
            parse_opt_tagged_and_then(Class::ContextSpecific, 7, i, |data| {
                Ok((&b""[..], Cow::Borrowed(data)))
            })?;
        let req = BindResponse {
            result,
            server_sasl_creds,
        };
        Ok((i, req))
    })
}

// UnbindRequest ::= [APPLICATION 2] NULL
fn parse_ldap_unbind_request(bytes: &[u8]) -> Result<ProtocolOp> {
    parse_tagged_and_then(Class::Application, 2, bytes, |i| {
        // accept empty content, otherwise expect NULL
        if !i.is_empty() {
            let (_, _) = parse_null(i)?;
        }
        Ok((i, ProtocolOp::UnbindRequest))
    })
}

// SearchRequest ::= [APPLICATION 3] SEQUENCE {
//      baseObject      LDAPDN,
//      scope           ENUMERATED {
//           baseObject              (0),
//           singleLevel             (1),
//           wholeSubtree            (2),
//           ...  },
//      derefAliases    ENUMERATED {
//           neverDerefAliases       (0),
//           derefInSearching        (1),
//           derefFindingBaseObj     (2),
//           derefAlways             (3) },
//      sizeLimit       INTEGER (0 ..  maxInt),
//      timeLimit       INTEGER (0 ..  maxInt),
//      typesOnly       BOOLEAN,
//      filter          Filter,
//      attributes      AttributeSelection }
fn parse_ldap_search_request<'a>(
    options: &DecodeOptions,
    bytes: &'a [u8],
) -> Result<'a, SearchRequest<'a>> {
    parse_tagged_and_then(Class::Application, 3, bytes, |i| {
        let (i, base_object) = LdapDN::from_ber(i)?;
        let (i, scope) = parse_ldap_enum_as_u32(i)?;
        if scope > 2 {
            return Err(Err::Error(LdapError::InvalidScope));
        }
        let (i, deref_aliases) = parse_ldap_enum_as_u32(i)?;
        if deref_aliases > 3 {
            return Err(Err::Error(LdapError::InvalidDerefAliases));
        }
        let (i, size_limit) = parse_ldap_int_as_max_int(i)?;
        let (i, time_limit) = parse_ldap_int_as_max_int(i)?;
        let (i, types_only) = parse_boolean(i)?;
        let (i, filter) = parse_filter(i, options.max_filter_depth)?;
        let (i, attributes) = parse_attribute_selection(i)?;
        let req = SearchRequest {
            base_object,
            scope: SearchScope(scope),
            deref_aliases: DerefAliases(deref_aliases),
            size_limit,
            time_limit,
            types_only,
            filter,
            attributes,
        };
        Ok((i, req))
    })
}

// SearchResultEntry ::= [APPLICATION 4] SEQUENCE {
//     objectName      LDAPDN,
//     attributes      PartialAttributeList }
fn parse_ldap_search_result_entry(bytes: &[u8]) -> Result<SearchResultEntry> {
    parse_tagged_and_then(Class::Application, 4, bytes, |i| {
        let (i, object_name) = LdapDN::from_ber(i)?;
        let (i, attributes) = parse_partial_attribute_list(i)?;
        let res = SearchResultEntry {
            object_name,
            attributes,
        };
        Ok((i, res))
    })
}

// SearchResultDone ::= [APPLICATION 5] LDAPResult
fn parse_ldap_search_result_done(bytes: &[u8]) -> Result<LdapResult> {
    parse_tagged_and_then(Class::Application, 5, bytes, parse_ldap_result_content)
}

// ModifyRequest ::= [APPLICATION 6] SEQUENCE {
//     object          LDAPDN,
//     changes         SEQUENCE OF change SEQUENCE {
//          operation       ENUMERATED {
//               add     (0),
//               delete  (1),
//               replace (2),
//               ...  },
//          modification    PartialAttribute } }
fn parse_ldap_modify_request(bytes: &[u8]) -> Result<ModifyRequest> {
    parse_tagged_and_then(Class::Application, 6, bytes, |i| {
        let (i, object) = LdapDN::from_ber(i)?;
        let (i, changes) = parse_sequence_and_then(i, many1(complete(Change::from_ber)))?;
        let res = ModifyRequest { object, changes };
        Ok((i, res))
    })
}

// ModifyResponse ::= [APPLICATION 7] LDAPResult
fn parse_ldap_modify_response(bytes: &[u8]) -> Result<ModifyResponse> {
    parse_tagged_and_then(Class::Application, 7, bytes, |i| {
        let (i, result) = parse_ldap_result_content(i)?;
        let res = ModifyResponse { result };
        Ok((i, res))
    })
}

// AddRequest ::= [APPLICATION 8] SEQUENCE {
//     entry           LDAPDN,
//     attributes      AttributeList }
fn parse_ldap_add_request(bytes: &[u8]) -> Result<AddRequest> {
    parse_tagged_and_then(Class::Application, 8, bytes, |i| {
        let (i, entry) = LdapDN::from_ber(i)?;
        let (i, attributes) = parse_attribute_list(i)?;
        let res = AddRequest { entry, attributes };
        Ok((i, res))
    })
}

// AddResponse ::= [APPLICATION 9] LDAPResult
fn parse_ldap_add_response(bytes: &[u8]) -> Result<LdapResult> {
    parse_tagged_and_then(Class::Application, 9, bytes, parse_ldap_result_content)
}

// DelRequest ::= [APPLICATION 10] LDAPDN
fn parse_ldap_del_request(bytes: &[u8]) -> Result<LdapDN> {
    parse_tagged_and_then(Class::Application, 10, bytes, |i| {
        let s = std::str::from_utf8(i).or(Err(Err::Error(LdapError::InvalidDN)))?;
        let dn = LdapDN(Cow::Borrowed(s));
        Ok((&b""[..], dn))
    })
}

// DelResponse ::= [APPLICATION 11] LDAPResult
fn parse_ldap_del_response(bytes: &[u8]) -> Result<LdapResult> {
    parse_tagged_and_then(Class::Application, 11, bytes, parse_ldap_result_content)
}

// ModifyDNRequest ::= [APPLICATION 12] SEQUENCE {
//     entry           LDAPDN,
//     newrdn          RelativeLDAPDN,
//     deleteoldrdn    BOOLEAN,
//     newSuperior     [0] LDAPDN OPTIONAL }
fn parse_ldap_moddn_request(bytes: &[u8]) -> Result<ModDnRequest> {
    parse_tagged_and_then(Class::Application, 12, bytes, |i| {
        let (i, entry) = LdapDN::from_ber(i)?;
        let (i, newrdn) = RelativeLdapDN::from_ber(i)?;
        let (i, deleteoldrdn) = parse_boolean(i)?;
        let (i, newsuperior) = parse_opt_tagged_and_then(Class::ContextSpecific, 0, i, |data| {
            let s = std::str::from_utf8(data).or(Err(Err::Error(LdapError::InvalidDN)))?;
            let dn = LdapDN(Cow::Borrowed(s));
            Ok((&b""[..], dn))
        })?;
        let res = ModDnRequest {
            entry,
            newrdn,
            deleteoldrdn,
            newsuperior,
        };
        Ok((i, res))
    })
}

// ModifyDNResponse ::= [APPLICATION 13] LDAPResult
fn parse_ldap_moddn_response(bytes: &[u8]) -> Result<LdapResult> {
    parse_tagged_and_then(Class::Application, 13, bytes, parse_ldap_result_content)
}

// CompareRequest ::= [APPLICATION 14] SEQUENCE {
//     entry           LDAPDN,
//     ava             AttributeValueAssertion }
fn parse_ldap_compare_request(bytes: &[u8]) -> Result<CompareRequest> {
    parse_tagged_and_then(Class::Application, 14, bytes, |i| {
        let (i, entry) = LdapDN::from_ber(i)?;
        let (i, ava) = AttributeValueAssertion::from_ber(i)?;
        let res = CompareRequest { entry, ava };
        Ok((i, res))
    })
}

// CompareResponse ::= [APPLICATION 15] LDAPResult
fn parse_ldap_compare_response(bytes: &[u8]) -> Result<LdapResult> {
    parse_tagged_and_then(Class::Application, 15, bytes, parse_ldap_result_content)
}

// AbandonRequest ::= [APPLICATION 16] MessageID
fn parse_ldap_abandon_request(bytes: &[u8]) -> Result<MessageID> {
    parse_tagged_and_then(Class::Application, 16, bytes, |content| {
        let id = decode_integer_content(content).map_err(Err::Error)?;
        if id < 0 || id > i64::from(MAX_INT) {
            return Err(Err::Error(LdapError::IntegerOutOfRange));
        }
        Ok((&b""[..], MessageID(id as u32)))
    })
}

// SearchResultReference ::= [APPLICATION 19] SEQUENCE
//                                   SIZE (1..MAX) OF uri URI
fn parse_ldap_search_result_ref(bytes: &[u8]) -> Result<Vec<LdapString>> {
    parse_tagged_and_then(
        Class::Application,
        19,
        bytes,
        many1(complete(parse_ldap_uri)),
    )
}

// ExtendedRequest ::= [APPLICATION 23] SEQUENCE {
//     requestName      [0] LDAPOID,
//     requestValue     [1] OCTET STRING OPTIONAL }
fn parse_ldap_extended_request(bytes: &[u8]) -> Result<ExtendedRequest> {
    parse_tagged_and_then(Class::Application, 23, bytes, |i| {
        let (i, request_name) = parse_tagged_and_then(Class::ContextSpecific, 0, i, |data| {
            let s = std::str::from_utf8(data).or(Err(Err::Error(LdapError::InvalidDN)))?;
            let oid = LdapOID(Cow::Borrowed(s));
            Ok((&b""[..], oid))
        })?;
        let (i, request_value) = parse_opt_tagged_and_then(Class::ContextSpecific, 1, i, |data| {
            Ok((&b""[..], Cow::Borrowed(data)))
        })?;
        let req = ExtendedRequest {
            request_name,
            request_value,
        };
        Ok((i, req))
    })
}

// ExtendedResponse ::= [APPLICATION 24] SEQUENCE {
//     COMPONENTS OF LDAPResult,
//     responseName     [10] LDAPOID OPTIONAL,
//     responseValue    [11] OCTET STRING OPTIONAL }
fn parse_ldap_extended_response(bytes: &[u8]) -> Result<ExtendedResponse> {
    parse_tagged_and_then(Class::Application, 24, bytes, |i| {
        let (i, result) = parse_ldap_result_content(i)?;
        let (i, response_name) = parse_opt_tagged_and_then(Class::ContextSpecific, 10, i, |data| {
            let s = std::str::from_utf8(data).or(Err(Err::Error(LdapError::InvalidDN)))?;
            let oid = LdapOID(Cow::Borrowed(s));
            Ok((&b""[..], oid))
        })?;
        let (i, response_value) =
            parse_opt_tagged_and_then(Class::ContextSpecific, 11, i, |data| {
                Ok((&b""[..], Cow::Borrowed(data)))
            })?;
        let resp = ExtendedResponse {
            result,
            response_name,
            response_value,
        };
        Ok((i, resp))
    })
}

// IntermediateResponse ::= [APPLICATION 25] SEQUENCE {
//      responseName     [0] LDAPOID OPTIONAL,
//      responseValue    [1] OCTET STRING OPTIONAL }
fn parse_ldap_intermediate_response(bytes: &[u8]) -> Result<IntermediateResponse> {
    parse_tagged_and_then(Class::Application, 25, bytes, |i| {
        let (i, response_name) = parse_opt_tagged_and_then(Class::ContextSpecific, 0, i, |data| {
            let s = std::str::from_utf8(data).or(Err(Err::Error(LdapError::InvalidDN)))?;
            let oid = LdapOID(Cow::Borrowed(s));
            Ok((&b""[..], oid))
        })?;
        let (i, response_value) = parse_opt_tagged_and_then(Class::ContextSpecific, 1, i, |data| {
            Ok((&b""[..], Cow::Borrowed(data)))
        })?;
        let resp = IntermediateResponse {
            response_name,
            response_value,
        };
        Ok((i, resp))
    })
}

// AuthenticationChoice ::= CHOICE {
//      simple                  [0] OCTET STRING,
//                              -- 1 and 2 reserved
//      sasl                    [3] SaslCredentials,
//      ...  }
impl<'a> FromBer<'a> for AuthenticationChoice<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        let (rem, (header, content)) = parse_element(bytes)?;
        if header.class != Class::ContextSpecific {
            return Err(Err::Error(LdapError::InvalidAuthenticationType));
        }
        match header.tag.0 {
            0 => Ok((rem, AuthenticationChoice::Simple(Cow::Borrowed(content)))),
            3 => {
                let (_, credentials) = parse_sasl_credentials(content)?;
                Ok((rem, AuthenticationChoice::Sasl(credentials)))
            }
            _ => Err(Err::Error(LdapError::InvalidAuthenticationType)),
        }
    }
}

// SaslCredentials ::= SEQUENCE {
//      mechanism               LDAPString,
//      credentials             OCTET STRING OPTIONAL }
fn parse_sasl_credentials(i: &[u8]) -> Result<SaslCredentials> {
    let (i, mechanism) = LdapString::from_ber(i)?;
    let (i, credentials) = opt(complete(map(
        parse_ldap_octet_string_as_slice,
        Cow::Borrowed,
    )))(i)?;
    let credentials = SaslCredentials {
        mechanism,
        credentials,
    };
    Ok((i, credentials))
}

// AttributeSelection ::= SEQUENCE OF selector LDAPString
//      -- The LDAPString is constrained to
//      -- <attributeSelector> in Section 4.5.1.8
fn parse_attribute_selection(bytes: &[u8]) -> Result<Vec<LdapString>> {
    parse_sequence_and_then(bytes, many0(complete(LdapString::from_ber)))
}

// PartialAttributeList ::= SEQUENCE OF partialAttribute PartialAttribute
fn parse_partial_attribute_list(bytes: &[u8]) -> Result<Vec<PartialAttribute>> {
    parse_sequence_and_then(bytes, many0(complete(PartialAttribute::from_ber)))
}

// AttributeList ::= SEQUENCE OF attribute Attribute
fn parse_attribute_list(bytes: &[u8]) -> Result<Vec<Attribute>> {
    parse_sequence_and_then(bytes, many0(complete(Attribute::from_ber)))
}

// change SEQUENCE {
//          operation       ENUMERATED {
//               add     (0),
//               delete  (1),
//               replace (2),
//               ...  },
//          modification    PartialAttribute }
impl<'a> FromBer<'a> for Change<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_sequence_and_then(bytes, |i| {
            let (i, operation) = map(parse_ldap_enum_as_u32, Operation)(i)?;
            let (i, modification) = PartialAttribute::from_ber(i)?;
            let change = Change {
                operation,
                modification,
            };
            Ok((i, change))
        })
    }
}

// Control ::= SEQUENCE {
//     controlType             LDAPOID,
//     criticality             BOOLEAN DEFAULT FALSE,
//     controlValue            OCTET STRING OPTIONAL }
pub(crate) fn parse_ldap_control<'a>(
    registry: &ControlRegistry,
    bytes: &'a [u8],
) -> Result<'a, Control<'a>> {
    parse_sequence_and_then(bytes, |i| {
        let (i, control_type) = LdapOID::from_ber(i)?;
        let (i, maybe_critical) = opt(complete(parse_boolean))(i)?;
        let criticality = maybe_critical.unwrap_or(false);
        let (i, raw_value) = opt(complete(map(
            parse_ldap_octet_string_as_slice,
            Cow::Borrowed,
        )))(i)?;
        let control_value = interpret_control_value(registry, &control_type.0, criticality, raw_value)
            .map_err(Err::Error)?;
        let control = Control {
            control_type,
            criticality,
            control_value,
        };
        Ok((i, control))
    })
}

//
//
//
//
//
// ----------------------- TESTS -----------------------
//
//
//
//
//
//

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_bind_request() {
        // version 3, name uid=admin, simple password "secret"
        const DATA: &[u8] = &hex!(
            "60 16 02 01 03 04 09 75 69 64 3d 61 64 6d 69 6e 80 06 73 65 63 72 65 74"
        );
        let (rem, req) = parse_ldap_bind_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.name.0, "uid=admin");
        assert_eq!(
            req.authentication,
            AuthenticationChoice::Simple(Cow::Borrowed(b"secret"))
        );
    }

    #[test]
    fn test_parse_bind_request_sasl() {
        const DATA: &[u8] = &hex!("60 11 02 01 03 04 00 a3 0a 04 08 43 52 41 4d 2d 4d 44 35");
        let (rem, req) = parse_ldap_bind_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.name.0, "");
        if let AuthenticationChoice::Sasl(sasl_credentials) = &req.authentication {
            assert_eq!(&sasl_credentials.mechanism.0, "CRAM-MD5");
            assert!(sasl_credentials.credentials.is_none());
        } else {
            panic!("wrong authentication type");
        }
    }

    #[test]
    fn test_parse_bind_request_empty_password() {
        // simple authentication with an empty octet string is legal
        const DATA: &[u8] = &hex!("60 10 02 01 03 04 09 75 69 64 3d 61 64 6d 69 6e 80 00");
        let (_, req) = parse_ldap_bind_request(DATA).expect("parsing failed");
        assert_eq!(
            req.authentication,
            AuthenticationChoice::Simple(Cow::Borrowed(b""))
        );
    }

    #[test]
    fn test_parse_bind_request_invalid_version() {
        const DATA: &[u8] = &hex!("60 07 02 01 04 04 00 80 00");
        let res = parse_ldap_bind_request(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidBindVersion)));
    }

    #[test]
    fn test_parse_bind_response_minimal() {
        const DATA: &[u8] = &hex!("61 84 00 00 00 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_bind_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_bind_response_sasl_creds() {
        const DATA: &[u8] = &hex!("61 0c 0a 01 0e 04 00 04 00 87 03 61 62 63");
        let (rem, resp) = parse_ldap_bind_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result.result_code, ResultCode::SaslBindInProgress);
        assert_eq!(resp.server_sasl_creds, Some(Cow::Borrowed(&b"abc"[..])));
    }

    #[test]
    fn test_parse_unbind_request() {
        const DATA: &[u8] = &hex!("42 00");
        let (rem, req) = parse_ldap_unbind_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(req, ProtocolOp::UnbindRequest);
    }

    #[test]
    fn test_parse_search_request() {
        const DATA: &[u8] = &hex!(
            "63 3b 04 11 64 63 3d 65 78 61 6d 70 6c 65 2c 64 63 3d 63 6f 6d"
            "0a 01 02 0a 01 00 02 01 00 02 01 00 01 01 00"
            "a4 15 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 06 82 04 41 6d 6f 73"
            "30 00"
        );
        let options = DecodeOptions::default();
        let (rem, req) = parse_ldap_search_request(&options, DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.base_object.0, "dc=example,dc=com");
        assert_eq!(req.scope, SearchScope::WholeSubtree);
        assert!(req.attributes.is_empty());
        if let Filter::Substrings(sub) = &req.filter {
            assert_eq!(
                sub.substrings,
                vec![Substring::Final(AssertionValue(Cow::Borrowed(b"Amos")))]
            );
        } else {
            panic!("wrong filter type");
        }
    }

    #[test]
    fn test_parse_search_request_invalid_scope() {
        const DATA: &[u8] = &hex!("63 20 04 00 0a 01 03 0a 01 00 02 01 00 02 01 00 01 01 00 87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00");
        let options = DecodeOptions::default();
        let res = parse_ldap_search_request(&options, DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidScope)));
    }

    #[test]
    fn test_parse_search_request_invalid_deref() {
        const DATA: &[u8] = &hex!("63 20 04 00 0a 01 00 0a 01 04 02 01 00 02 01 00 01 01 00 87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00");
        let options = DecodeOptions::default();
        let res = parse_ldap_search_request(&options, DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidDerefAliases)));
    }

    #[test]
    fn test_parse_search_result_entry() {
        const DATA: &[u8] = &hex!(
            "64 1b 04 06 64 63 3d 63 6f 6d 30 11 30 0f 04 02 63 6e 31 09 04 07 73 6f 6d 65 6f 6e 65"
        );
        let (rem, resp) = parse_ldap_search_result_entry(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&resp.object_name.0, "dc=com");
        assert_eq!(resp.attributes.len(), 1);
        assert_eq!(&resp.attributes[0].attr_type.0, "cn");
        assert_eq!(resp.attributes[0].attr_vals[0].as_text(), Some("someone"));
    }

    #[test]
    fn test_parse_search_result_done() {
        const DATA: &[u8] = &hex!("65 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_search_result_done(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_search_result_ref() {
        const DATA: &[u8] = &hex!(
            "73 24 04 22 6c 64 61 70 3a 2f 2f 6c 64 61 70 2e 65 78 61 6d 70 6c 65"
            "2e 63 6f 6d 2f 64 63 3d 65 78 61 6d 70 6c 65"
        );
        let (rem, v) = parse_ldap_search_result_ref(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(v.len(), 1);
        assert_eq!(&v[0].0, "ldap://ldap.example.com/dc=example");
    }

    #[test]
    fn test_parse_modify_request() {
        const DATA: &[u8] = &hex!(
            "66 20 04 06 64 63 3d 63 6f 6d 30 16 30 14 0a 01 02"
            "30 0f 04 02 63 6e 31 09 04 07 73 6f 6d 65 6f 6e 65"
        );
        let (rem, req) = parse_ldap_modify_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.object.0, "dc=com");
        assert_eq!(req.changes.len(), 1);
        assert_eq!(req.changes[0].operation, Operation::Replace);
        assert_eq!(&req.changes[0].modification.attr_type.0, "cn");
    }

    #[test]
    fn test_parse_modify_response() {
        const DATA: &[u8] = &hex!("67 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_modify_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_add_request() {
        const DATA: &[u8] = &hex!(
            "68 1b 04 06 64 63 3d 63 6f 6d 30 11 30 0f 04 02 63 6e 31 09 04 07 73 6f 6d 65 6f 6e 65"
        );
        let (rem, req) = parse_ldap_add_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.entry.0, "dc=com");
        assert_eq!(req.attributes.len(), 1);
    }

    #[test]
    fn test_parse_add_request_empty_vals() {
        // Attribute vals is SIZE (1..MAX): an empty SET is rejected
        const DATA: &[u8] = &hex!("68 12 04 06 64 63 3d 63 6f 6d 30 08 30 06 04 02 63 6e 31 00");
        parse_ldap_add_request(DATA).expect_err("expected error");
    }

    #[test]
    fn test_parse_add_response() {
        const DATA: &[u8] = &hex!("69 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_add_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_del_request() {
        const DATA: &[u8] = &hex!("4a 06 64 63 3d 63 6f 6d");
        let (rem, req) = parse_ldap_del_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.0, "dc=com");
    }

    #[test]
    fn test_parse_del_response() {
        const DATA: &[u8] = &hex!("6b 07 0a 01 20 04 00 04 00");
        let (rem, resp) = parse_ldap_del_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result_code, ResultCode::NoSuchObject);
    }

    #[test]
    fn test_parse_moddn_request() {
        const DATA: &[u8] = &hex!(
            "6c 1a 04 06 64 63 3d 63 6f 6d 04 05 63 6e 3d 61 62 01 01 ff 80 06 6f 75 3d 78 79 7a"
        );
        let (rem, req) = parse_ldap_moddn_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.entry.0, "dc=com");
        assert_eq!(&req.newrdn.0, "cn=ab");
        assert!(req.deleteoldrdn);
        assert_eq!(&req.newsuperior.unwrap().0, "ou=xyz");
    }

    #[test]
    fn test_parse_moddn_response() {
        const DATA: &[u8] = &hex!("6d 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_moddn_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_compare_request() {
        const DATA: &[u8] = &hex!(
            "6e 14 04 06 64 63 3d 63 6f 6d 30 0a 04 02 63 6e 04 04 74 65 73 74"
        );
        let (rem, req) = parse_ldap_compare_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.entry.0, "dc=com");
        assert_eq!(&req.ava.attribute_desc.0, "cn");
    }

    #[test]
    fn test_parse_compare_response() {
        const DATA: &[u8] = &hex!("6f 07 0a 01 06 04 00 04 00");
        let (rem, resp) = parse_ldap_compare_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result_code, ResultCode::CompareTrue);
    }

    #[test]
    fn test_parse_abandon_request() {
        const DATA: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x06, 0x50, 0x01, 0x05];
        let (rem, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(msg.message_id, MessageID(6));
        assert!(matches!(
            msg.protocol_op,
            ProtocolOp::AbandonRequest(MessageID(5))
        ))
    }

    #[test]
    fn test_parse_extended_req() {
        // StartTLS
        const DATA: &[u8] = &hex!(
            "77 18 80 16 31 2e 33 2e 36 2e 31 2e 34 2e 31 2e 31 34 36 36 2e 32 30 30 33 37"
        );
        let (rem, req) = parse_ldap_extended_request(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(&req.request_name.0, "1.3.6.1.4.1.1466.20037");
        assert!(req.request_value.is_none());
    }

    #[test]
    fn test_parse_extended_response() {
        const DATA: &[u8] = &hex!("78 07 0a 01 00 04 00 04 00");
        let (rem, resp) = parse_ldap_extended_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.result.result_code, ResultCode::Success);
    }

    #[test]
    fn test_parse_intermediate_response() {
        const DATA: &[u8] = &hex!("79 05 80 03 31 2e 32");
        let (rem, resp) = parse_ldap_intermediate_response(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(resp.response_name, Some(LdapOID(Cow::Borrowed("1.2"))));
        assert!(resp.response_value.is_none());
    }

    #[test]
    fn test_parse_message_id_out_of_range() {
        // 2^31 exceeds maxInt
        const DATA: &[u8] = &hex!("02 05 00 80 00 00 00");
        let res = MessageID::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::IntegerOutOfRange)));
    }

    #[test]
    fn test_parse_control_duplicate_oids_preserved() {
        const DATA: &[u8] = &hex!(
            "30 1d 02 01 05 42 00 a0 16"
            "30 09 04 07 31 2e 32 2e 33 2e 34"
            "30 09 04 07 31 2e 32 2e 33 2e 34"
        );
        let (rem, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        let controls = msg.controls.expect("controls");
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].control_type, controls[1].control_type);
    }

    #[test]
    fn test_parse_critical_unknown_control() {
        // criticality TRUE with an unregistered OID decodes fine at this layer
        const DATA: &[u8] = &hex!(
            "30 14 02 01 05 42 00 a0 0d 30 0b 04 06 31 2e 32 2e 33 34 01 01 ff"
        );
        let (_, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
        let controls = msg.controls.expect("controls");
        assert!(controls[0].criticality);
    }
}
