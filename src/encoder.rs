//! Canonical BER encoder for LDAP messages
//!
//! Re-serialization sizes every node bottom-up, allocates the output buffer
//! once, then writes right to left: a constructed TLV's children land first,
//! so its length octets are written when the exact content size is already
//! known. Because writes run backwards, composite writers emit their fields
//! in reverse field order.
//!
//! Output is canonical regardless of how the input was encoded: definite
//! lengths only, minimal-length integers, `0xff` for TRUE, DEFAULT values
//! omitted.

use crate::controls;
use crate::filter::*;
use crate::ldap::*;

use crate::ber::Class;

/// Reverse writer over a pre-sized buffer.
pub(crate) struct BerWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl BerWriter {
    fn new(total: usize) -> Self {
        BerWriter {
            buf: vec![0; total],
            pos: total,
        }
    }

    fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.pos, 0, "sizing pass disagrees with the writer");
        self.buf
    }

    pub(crate) fn prepend(&mut self, bytes: &[u8]) {
        let start = self.pos - bytes.len();
        self.buf[start..self.pos].copy_from_slice(bytes);
        self.pos = start;
    }

    pub(crate) fn prepend_byte(&mut self, byte: u8) {
        self.pos -= 1;
        self.buf[self.pos] = byte;
    }

    fn prepend_length(&mut self, len: usize) {
        if len < 128 {
            self.prepend_byte(len as u8);
        } else {
            let octets = len.to_be_bytes();
            let skip = octets.iter().take_while(|b| **b == 0).count();
            self.prepend(&octets[skip..]);
            self.prepend_byte(0x80 | (octets.len() - skip) as u8);
        }
    }

    fn prepend_tag(&mut self, class: Class, constructed: bool, tag: u32) {
        // every tag in the LDAP grammar fits the low-tag-number form
        debug_assert!(tag < 31);
        let constructed_bit = if constructed { 0b0010_0000 } else { 0 };
        self.prepend_byte(class.bits() | constructed_bit | tag as u8);
    }
}

/// Allocate `total` bytes and fill them through `f`.
pub(crate) fn build(total: usize, f: impl FnOnce(&mut BerWriter)) -> Vec<u8> {
    let mut w = BerWriter::new(total);
    f(&mut w);
    w.finish()
}

/// Emit one TLV: content through `f` (written backwards), then length, then tag.
pub(crate) fn write_tlv(
    w: &mut BerWriter,
    class: Class,
    constructed: bool,
    tag: u32,
    content_len: usize,
    f: impl FnOnce(&mut BerWriter),
) {
    f(w);
    w.prepend_length(content_len);
    w.prepend_tag(class, constructed, tag);
}

//
// ----------------------- SIZING -----------------------
//

fn length_octets(len: usize) -> usize {
    if len < 128 {
        1
    } else {
        let octets = len.to_be_bytes();
        1 + (octets.len() - octets.iter().take_while(|b| **b == 0).count())
    }
}

/// Size of a full TLV around `content_len` content octets (low tag numbers).
pub(crate) fn tlv_len(content_len: usize) -> usize {
    1 + length_octets(content_len) + content_len
}

/// Minimal two's complement width of an INTEGER value.
pub(crate) fn int_content_len(value: i64) -> usize {
    let octets = value.to_be_bytes();
    let mut idx = 0;
    while idx + 1 < octets.len()
        && ((octets[idx] == 0x00 && octets[idx + 1] & 0x80 == 0)
            || (octets[idx] == 0xff && octets[idx + 1] & 0x80 != 0))
    {
        idx += 1;
    }
    octets.len() - idx
}

//
// ----------------------- PRIMITIVE WRITERS -----------------------
//

fn write_integer_content(w: &mut BerWriter, value: i64) {
    let octets = value.to_be_bytes();
    let n = int_content_len(value);
    w.prepend(&octets[octets.len() - n..]);
}

pub(crate) fn write_integer(w: &mut BerWriter, value: i64) {
    write_tlv(w, Class::Universal, false, 2, int_content_len(value), |w| {
        write_integer_content(w, value)
    })
}

pub(crate) fn write_enumerated(w: &mut BerWriter, value: u32) {
    let value = i64::from(value);
    write_tlv(w, Class::Universal, false, 10, int_content_len(value), |w| {
        write_integer_content(w, value)
    })
}

pub(crate) fn write_boolean(w: &mut BerWriter, value: bool) {
    write_tlv(w, Class::Universal, false, 1, 1, |w| {
        w.prepend_byte(if value { 0xff } else { 0x00 })
    })
}

pub(crate) fn write_octetstring(w: &mut BerWriter, bytes: &[u8]) {
    write_tagged_bytes(w, Class::Universal, 4, bytes)
}

/// Implicitly tagged primitive with raw content octets.
fn write_tagged_bytes(w: &mut BerWriter, class: Class, tag: u32, bytes: &[u8]) {
    write_tlv(w, class, false, tag, bytes.len(), |w| w.prepend(bytes))
}

pub(crate) fn write_sequence(
    w: &mut BerWriter,
    content_len: usize,
    f: impl FnOnce(&mut BerWriter),
) {
    write_tlv(w, Class::Universal, true, 16, content_len, f)
}

fn write_set(w: &mut BerWriter, content_len: usize, f: impl FnOnce(&mut BerWriter)) {
    write_tlv(w, Class::Universal, true, 17, content_len, f)
}

//
// ----------------------- LDAP STRUCTURES -----------------------
//

fn string_len(s: &LdapString) -> usize {
    tlv_len(s.0.len())
}

fn write_string(w: &mut BerWriter, s: &LdapString) {
    write_octetstring(w, s.0.as_bytes())
}

fn dn_len(dn: &LdapDN) -> usize {
    tlv_len(dn.0.len())
}

fn write_dn(w: &mut BerWriter, dn: &LdapDN) {
    write_octetstring(w, dn.0.as_bytes())
}

// LDAPResult is used as COMPONENTS OF: no TLV of its own
fn result_content_len(result: &LdapResult) -> usize {
    tlv_len(int_content_len(i64::from(result.result_code.0)))
        + dn_len(&result.matched_dn)
        + tlv_len(result.diagnostic_message.0.len())
}

fn write_result_content(w: &mut BerWriter, result: &LdapResult) {
    write_string(w, &result.diagnostic_message);
    write_dn(w, &result.matched_dn);
    write_enumerated(w, result.result_code.0);
}

fn ava_content_len(ava: &AttributeValueAssertion) -> usize {
    tlv_len(ava.attribute_desc.0.len()) + tlv_len(ava.assertion_value.len())
}

fn write_ava_content(w: &mut BerWriter, ava: &AttributeValueAssertion) {
    write_octetstring(w, &ava.assertion_value);
    write_string(w, &ava.attribute_desc);
}

fn attribute_vals_content_len(vals: &[AttributeValue]) -> usize {
    vals.iter().map(|v| tlv_len(v.0.len())).sum()
}

fn attribute_content_len(attr_type: &LdapString, vals: &[AttributeValue]) -> usize {
    string_len(attr_type) + tlv_len(attribute_vals_content_len(vals))
}

fn write_attribute_content(w: &mut BerWriter, attr_type: &LdapString, vals: &[AttributeValue]) {
    let vals_content = attribute_vals_content_len(vals);
    write_set(w, vals_content, |w| {
        for value in vals.iter().rev() {
            write_octetstring(w, &value.0);
        }
    });
    write_string(w, attr_type);
}

//
// ----------------------- FILTERS -----------------------
//

fn substring_piece_len(piece: &Substring) -> usize {
    let value = match piece {
        Substring::Initial(v) | Substring::Any(v) | Substring::Final(v) => v,
    };
    tlv_len(value.0.len())
}

fn write_substring_piece(w: &mut BerWriter, piece: &Substring) {
    let (tag, value) = match piece {
        Substring::Initial(v) => (0, v),
        Substring::Any(v) => (1, v),
        Substring::Final(v) => (2, v),
    };
    write_tagged_bytes(w, Class::ContextSpecific, tag, &value.0);
}

fn substring_filter_content_len(filter: &SubstringFilter) -> usize {
    let pieces: usize = filter.substrings.iter().map(substring_piece_len).sum();
    string_len(&filter.filter_type) + tlv_len(pieces)
}

fn write_substring_filter_content(w: &mut BerWriter, filter: &SubstringFilter) {
    let pieces: usize = filter.substrings.iter().map(substring_piece_len).sum();
    write_sequence(w, pieces, |w| {
        for piece in filter.substrings.iter().rev() {
            write_substring_piece(w, piece);
        }
    });
    write_string(w, &filter.filter_type);
}

fn matching_rule_content_len(assertion: &MatchingRuleAssertion) -> usize {
    let mut len = tlv_len(assertion.assertion_value.0.len());
    if let Some(rule) = &assertion.matching_rule {
        len += tlv_len(rule.0.len());
    }
    if let Some(rule_type) = &assertion.rule_type {
        len += tlv_len(rule_type.0.len());
    }
    if assertion.dn_attributes.is_some() {
        len += tlv_len(1);
    }
    len
}

fn write_matching_rule_content(w: &mut BerWriter, assertion: &MatchingRuleAssertion) {
    if let Some(dn_attributes) = assertion.dn_attributes {
        write_tlv(w, Class::ContextSpecific, false, 4, 1, |w| {
            w.prepend_byte(if dn_attributes { 0xff } else { 0x00 })
        });
    }
    write_tagged_bytes(w, Class::ContextSpecific, 3, &assertion.assertion_value.0);
    if let Some(rule_type) = &assertion.rule_type {
        write_tagged_bytes(w, Class::ContextSpecific, 2, rule_type.0.as_bytes());
    }
    if let Some(rule) = &assertion.matching_rule {
        write_tagged_bytes(w, Class::ContextSpecific, 1, rule.0.as_bytes());
    }
}

fn filter_content_len(filter: &Filter) -> usize {
    match filter {
        Filter::And(set) | Filter::Or(set) => set.iter().map(filter_len).sum(),
        Filter::Not(inner) => filter_len(inner),
        Filter::EqualityMatch(ava)
        | Filter::GreaterOrEqual(ava)
        | Filter::LessOrEqual(ava)
        | Filter::ApproxMatch(ava) => ava_content_len(ava),
        Filter::Substrings(substrings) => substring_filter_content_len(substrings),
        Filter::Present(attribute) => attribute.0.len(),
        Filter::ExtensibleMatch(assertion) => matching_rule_content_len(assertion),
    }
}

fn filter_len(filter: &Filter) -> usize {
    tlv_len(filter_content_len(filter))
}

fn write_filter(w: &mut BerWriter, filter: &Filter) {
    let content = filter_content_len(filter);
    let (tag, constructed) = match filter {
        Filter::And(_) => (0, true),
        Filter::Or(_) => (1, true),
        Filter::Not(_) => (2, true),
        Filter::EqualityMatch(_) => (3, true),
        Filter::Substrings(_) => (4, true),
        Filter::GreaterOrEqual(_) => (5, true),
        Filter::LessOrEqual(_) => (6, true),
        Filter::Present(_) => (7, false),
        Filter::ApproxMatch(_) => (8, true),
        Filter::ExtensibleMatch(_) => (9, true),
    };
    write_tlv(w, Class::ContextSpecific, constructed, tag, content, |w| {
        match filter {
            Filter::And(set) | Filter::Or(set) => {
                for child in set.iter().rev() {
                    write_filter(w, child);
                }
            }
            Filter::Not(inner) => write_filter(w, inner),
            Filter::EqualityMatch(ava)
            | Filter::GreaterOrEqual(ava)
            | Filter::LessOrEqual(ava)
            | Filter::ApproxMatch(ava) => write_ava_content(w, ava),
            Filter::Substrings(substrings) => write_substring_filter_content(w, substrings),
            Filter::Present(attribute) => w.prepend(attribute.0.as_bytes()),
            Filter::ExtensibleMatch(assertion) => write_matching_rule_content(w, assertion),
        }
    });
}

//
// ----------------------- OPERATIONS -----------------------
//

fn authentication_len(auth: &AuthenticationChoice) -> usize {
    match auth {
        AuthenticationChoice::Simple(password) => tlv_len(password.len()),
        AuthenticationChoice::Sasl(sasl) => {
            let mut content = string_len(&sasl.mechanism);
            if let Some(credentials) = &sasl.credentials {
                content += tlv_len(credentials.len());
            }
            tlv_len(content)
        }
    }
}

fn write_authentication(w: &mut BerWriter, auth: &AuthenticationChoice) {
    match auth {
        AuthenticationChoice::Simple(password) => {
            write_tagged_bytes(w, Class::ContextSpecific, 0, password)
        }
        AuthenticationChoice::Sasl(sasl) => {
            let mut content = string_len(&sasl.mechanism);
            if let Some(credentials) = &sasl.credentials {
                content += tlv_len(credentials.len());
            }
            write_tlv(w, Class::ContextSpecific, true, 3, content, |w| {
                if let Some(credentials) = &sasl.credentials {
                    write_octetstring(w, credentials);
                }
                write_string(w, &sasl.mechanism);
            })
        }
    }
}

// empty attribute selectors survive decoding but are dropped on output
fn attribute_selection_content_len(attributes: &[LdapString]) -> usize {
    attributes
        .iter()
        .filter(|a| !a.0.is_empty())
        .map(string_len)
        .sum()
}

fn search_request_content_len(request: &SearchRequest) -> usize {
    dn_len(&request.base_object)
        + tlv_len(int_content_len(i64::from(request.scope.0)))
        + tlv_len(int_content_len(i64::from(request.deref_aliases.0)))
        + tlv_len(int_content_len(i64::from(request.size_limit)))
        + tlv_len(int_content_len(i64::from(request.time_limit)))
        + tlv_len(1)
        + filter_len(&request.filter)
        + tlv_len(attribute_selection_content_len(&request.attributes))
}

fn write_search_request_content(w: &mut BerWriter, request: &SearchRequest) {
    let selection = attribute_selection_content_len(&request.attributes);
    write_sequence(w, selection, |w| {
        for attribute in request.attributes.iter().rev() {
            if !attribute.0.is_empty() {
                write_string(w, attribute);
            }
        }
    });
    write_filter(w, &request.filter);
    write_boolean(w, request.types_only);
    write_integer(w, i64::from(request.time_limit));
    write_integer(w, i64::from(request.size_limit));
    write_enumerated(w, request.deref_aliases.0);
    write_enumerated(w, request.scope.0);
    write_dn(w, &request.base_object);
}

fn changes_content_len(changes: &[Change]) -> usize {
    changes
        .iter()
        .map(|change| {
            tlv_len(
                tlv_len(int_content_len(i64::from(change.operation.0)))
                    + tlv_len(attribute_content_len(
                        &change.modification.attr_type,
                        &change.modification.attr_vals,
                    )),
            )
        })
        .sum()
}

fn write_changes(w: &mut BerWriter, changes: &[Change]) {
    for change in changes.iter().rev() {
        let modification = attribute_content_len(
            &change.modification.attr_type,
            &change.modification.attr_vals,
        );
        let content = tlv_len(int_content_len(i64::from(change.operation.0))) + tlv_len(modification);
        write_sequence(w, content, |w| {
            write_sequence(w, modification, |w| {
                write_attribute_content(
                    w,
                    &change.modification.attr_type,
                    &change.modification.attr_vals,
                )
            });
            write_enumerated(w, change.operation.0);
        });
    }
}

fn op_content_len(op: &ProtocolOp) -> usize {
    match op {
        ProtocolOp::BindRequest(request) => {
            tlv_len(int_content_len(i64::from(request.version)))
                + dn_len(&request.name)
                + authentication_len(&request.authentication)
        }
        ProtocolOp::BindResponse(response) => {
            let mut len = result_content_len(&response.result);
            if let Some(credentials) = &response.server_sasl_creds {
                len += tlv_len(credentials.len());
            }
            len
        }
        ProtocolOp::UnbindRequest => 0,
        ProtocolOp::SearchRequest(request) => search_request_content_len(request),
        ProtocolOp::SearchResultEntry(entry) => {
            let attributes: usize = entry
                .attributes
                .iter()
                .map(|a| tlv_len(attribute_content_len(&a.attr_type, &a.attr_vals)))
                .sum();
            dn_len(&entry.object_name) + tlv_len(attributes)
        }
        ProtocolOp::SearchResultDone(result)
        | ProtocolOp::AddResponse(result)
        | ProtocolOp::DelResponse(result)
        | ProtocolOp::ModDnResponse(result)
        | ProtocolOp::CompareResponse(result) => result_content_len(result),
        ProtocolOp::SearchResultReference(uris) => uris.iter().map(string_len).sum(),
        ProtocolOp::ModifyRequest(request) => {
            dn_len(&request.object) + tlv_len(changes_content_len(&request.changes))
        }
        ProtocolOp::ModifyResponse(response) => result_content_len(&response.result),
        ProtocolOp::AddRequest(request) => {
            let attributes: usize = request
                .attributes
                .iter()
                .map(|a| tlv_len(attribute_content_len(&a.attr_type, &a.attr_vals)))
                .sum();
            dn_len(&request.entry) + tlv_len(attributes)
        }
        ProtocolOp::DelRequest(dn) => dn.0.len(),
        ProtocolOp::ModDnRequest(request) => {
            let mut len = dn_len(&request.entry)
                + tlv_len(request.newrdn.0.len())
                + tlv_len(1);
            if let Some(superior) = &request.newsuperior {
                len += tlv_len(superior.0.len());
            }
            len
        }
        ProtocolOp::CompareRequest(request) => {
            dn_len(&request.entry) + tlv_len(ava_content_len(&request.ava))
        }
        ProtocolOp::AbandonRequest(id) => int_content_len(i64::from(id.0)),
        ProtocolOp::ExtendedRequest(request) => {
            let mut len = tlv_len(request.request_name.0.len());
            if let Some(value) = &request.request_value {
                len += tlv_len(value.len());
            }
            len
        }
        ProtocolOp::ExtendedResponse(response) => {
            let mut len = result_content_len(&response.result);
            if let Some(name) = &response.response_name {
                len += tlv_len(name.0.len());
            }
            if let Some(value) = &response.response_value {
                len += tlv_len(value.len());
            }
            len
        }
        ProtocolOp::IntermediateResponse(response) => {
            let mut len = 0;
            if let Some(name) = &response.response_name {
                len += tlv_len(name.0.len());
            }
            if let Some(value) = &response.response_value {
                len += tlv_len(value.len());
            }
            len
        }
    }
}

fn op_is_constructed(op: &ProtocolOp) -> bool {
    !matches!(
        op,
        ProtocolOp::UnbindRequest | ProtocolOp::DelRequest(_) | ProtocolOp::AbandonRequest(_)
    )
}

fn write_op(w: &mut BerWriter, op: &ProtocolOp) {
    let content = op_content_len(op);
    let tag = op.tag().0;
    write_tlv(
        w,
        Class::Application,
        op_is_constructed(op),
        tag,
        content,
        |w| match op {
            ProtocolOp::BindRequest(request) => {
                write_authentication(w, &request.authentication);
                write_dn(w, &request.name);
                write_integer(w, i64::from(request.version));
            }
            ProtocolOp::BindResponse(response) => {
                if let Some(credentials) = &response.server_sasl_creds {
                    write_tagged_bytes(w, Class::ContextSpecific, 7, credentials);
                }
                write_result_content(w, &response.result);
            }
            ProtocolOp::UnbindRequest => {}
            ProtocolOp::SearchRequest(request) => write_search_request_content(w, request),
            ProtocolOp::SearchResultEntry(entry) => {
                let attributes: usize = entry
                    .attributes
                    .iter()
                    .map(|a| tlv_len(attribute_content_len(&a.attr_type, &a.attr_vals)))
                    .sum();
                write_sequence(w, attributes, |w| {
                    for attribute in entry.attributes.iter().rev() {
                        let content =
                            attribute_content_len(&attribute.attr_type, &attribute.attr_vals);
                        write_sequence(w, content, |w| {
                            write_attribute_content(w, &attribute.attr_type, &attribute.attr_vals)
                        });
                    }
                });
                write_dn(w, &entry.object_name);
            }
            ProtocolOp::SearchResultDone(result)
            | ProtocolOp::AddResponse(result)
            | ProtocolOp::DelResponse(result)
            | ProtocolOp::ModDnResponse(result)
            | ProtocolOp::CompareResponse(result) => write_result_content(w, result),
            ProtocolOp::SearchResultReference(uris) => {
                for uri in uris.iter().rev() {
                    write_string(w, uri);
                }
            }
            ProtocolOp::ModifyRequest(request) => {
                write_sequence(w, changes_content_len(&request.changes), |w| {
                    write_changes(w, &request.changes)
                });
                write_dn(w, &request.object);
            }
            ProtocolOp::ModifyResponse(response) => write_result_content(w, &response.result),
            ProtocolOp::AddRequest(request) => {
                let attributes: usize = request
                    .attributes
                    .iter()
                    .map(|a| tlv_len(attribute_content_len(&a.attr_type, &a.attr_vals)))
                    .sum();
                write_sequence(w, attributes, |w| {
                    for attribute in request.attributes.iter().rev() {
                        let content =
                            attribute_content_len(&attribute.attr_type, &attribute.attr_vals);
                        write_sequence(w, content, |w| {
                            write_attribute_content(w, &attribute.attr_type, &attribute.attr_vals)
                        });
                    }
                });
                write_dn(w, &request.entry);
            }
            ProtocolOp::DelRequest(dn) => w.prepend(dn.0.as_bytes()),
            ProtocolOp::ModDnRequest(request) => {
                if let Some(superior) = &request.newsuperior {
                    write_tagged_bytes(w, Class::ContextSpecific, 0, superior.0.as_bytes());
                }
                write_boolean(w, request.deleteoldrdn);
                write_octetstring(w, request.newrdn.0.as_bytes());
                write_dn(w, &request.entry);
            }
            ProtocolOp::CompareRequest(request) => {
                write_sequence(w, ava_content_len(&request.ava), |w| {
                    write_ava_content(w, &request.ava)
                });
                write_dn(w, &request.entry);
            }
            ProtocolOp::AbandonRequest(id) => write_integer_content(w, i64::from(id.0)),
            ProtocolOp::ExtendedRequest(request) => {
                if let Some(value) = &request.request_value {
                    write_tagged_bytes(w, Class::ContextSpecific, 1, value);
                }
                write_tagged_bytes(w, Class::ContextSpecific, 0, request.request_name.0.as_bytes());
            }
            ProtocolOp::ExtendedResponse(response) => {
                if let Some(value) = &response.response_value {
                    write_tagged_bytes(w, Class::ContextSpecific, 11, value);
                }
                if let Some(name) = &response.response_name {
                    write_tagged_bytes(w, Class::ContextSpecific, 10, name.0.as_bytes());
                }
                write_result_content(w, &response.result);
            }
            ProtocolOp::IntermediateResponse(response) => {
                if let Some(value) = &response.response_value {
                    write_tagged_bytes(w, Class::ContextSpecific, 1, value);
                }
                if let Some(name) = &response.response_name {
                    write_tagged_bytes(w, Class::ContextSpecific, 0, name.0.as_bytes());
                }
            }
        },
    );
}

//
// ----------------------- CONTROLS AND MESSAGE -----------------------
//

fn control_content_len(control: &Control) -> usize {
    let mut len = tlv_len(control.control_type.0.len());
    if control.criticality {
        len += tlv_len(1);
    }
    if let Some(value) = controls::encode_value(&control.control_value) {
        len += tlv_len(value.len());
    }
    len
}

fn write_control(w: &mut BerWriter, control: &Control) {
    let content = control_content_len(control);
    write_sequence(w, content, |w| {
        if let Some(value) = controls::encode_value(&control.control_value) {
            write_octetstring(w, &value);
        }
        // criticality DEFAULT FALSE is omitted when false
        if control.criticality {
            write_boolean(w, true);
        }
        write_octetstring(w, control.control_type.0.as_bytes());
    });
}

fn message_content_len(message: &LdapMessage) -> usize {
    let mut len = tlv_len(int_content_len(i64::from(message.message_id.0)))
        + tlv_len(op_content_len(&message.protocol_op));
    if let Some(controls) = &message.controls {
        let inner: usize = controls.iter().map(|c| tlv_len(control_content_len(c))).sum();
        len += tlv_len(inner);
    }
    len
}

/// Serialize a message to canonical BER.
///
/// Decoding the output yields a message equal to the input; if the input was
/// itself decoded from canonical bytes, the output is byte-identical to them.
pub fn encode_message(message: &LdapMessage) -> Vec<u8> {
    let content = message_content_len(message);
    build(tlv_len(content), |w| {
        write_sequence(w, content, |w| {
            if let Some(controls) = &message.controls {
                let inner: usize =
                    controls.iter().map(|c| tlv_len(control_content_len(c))).sum();
                write_tlv(w, Class::ContextSpecific, true, 0, inner, |w| {
                    for control in controls.iter().rev() {
                        write_control(w, control);
                    }
                });
            }
            write_op(w, &message.protocol_op);
            write_integer(w, i64::from(message.message_id.0));
        })
    })
}

//
// ----------------------- TESTS -----------------------
//

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::borrow::Cow;

    #[test]
    fn test_integer_minimal_widths() {
        assert_eq!(int_content_len(0), 1);
        assert_eq!(int_content_len(127), 1);
        assert_eq!(int_content_len(128), 2);
        assert_eq!(int_content_len(255), 2);
        assert_eq!(int_content_len(256), 2);
        assert_eq!(int_content_len(1000), 2);
        assert_eq!(int_content_len(-1), 1);
        assert_eq!(int_content_len(-129), 2);
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(build(tlv_len(1), |w| write_integer(w, 127)), hex!("02 01 7f"));
        assert_eq!(build(tlv_len(2), |w| write_integer(w, 128)), hex!("02 02 00 80"));
        assert_eq!(build(tlv_len(2), |w| write_integer(w, 1000)), hex!("02 02 03 e8"));
    }

    #[test]
    fn test_boolean_true_is_ff() {
        assert_eq!(build(3, |w| write_boolean(w, true)), hex!("01 01 ff"));
        assert_eq!(build(3, |w| write_boolean(w, false)), hex!("01 01 00"));
    }

    #[test]
    fn test_empty_octetstring() {
        assert_eq!(build(2, |w| write_octetstring(w, b"")), hex!("04 00"));
    }

    #[test]
    fn test_long_form_length() {
        let payload = vec![0xaa; 200];
        let out = build(tlv_len(200), |w| write_octetstring(w, &payload));
        assert_eq!(&out[..3], &hex!("04 81 c8"));
        assert_eq!(out.len(), 203);
    }

    #[test]
    fn test_unbind_message() {
        let msg = LdapMessage::new(MessageID(7), ProtocolOp::UnbindRequest);
        assert_eq!(encode_message(&msg), hex!("30 05 02 01 07 42 00"));
    }

    #[test]
    fn test_present_filter_bytes() {
        let filter = Filter::Present(LdapString(Cow::Borrowed("objectClass")));
        let out = build(filter_len(&filter), |w| write_filter(w, &filter));
        assert_eq!(out, hex!("87 0b 6f 62 6a 65 63 74 43 6c 61 73 73"));
    }

    #[test]
    fn test_empty_attribute_selector_dropped() {
        let request = SearchRequest {
            base_object: LdapDN(Cow::Borrowed("")),
            scope: SearchScope::BaseObject,
            deref_aliases: DerefAliases::NeverDerefAliases,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter: Filter::Present(LdapString(Cow::Borrowed("objectClass"))),
            attributes: vec![
                LdapString(Cow::Borrowed("")),
                LdapString(Cow::Borrowed("cn")),
            ],
        };
        let msg = LdapMessage::new(MessageID(2), ProtocolOp::SearchRequest(request));
        let out = encode_message(&msg);
        // only `cn` remains in the selection
        let tail = &out[out.len() - 6..];
        assert_eq!(tail, &hex!("30 04 04 02 63 6e"));
    }
}
