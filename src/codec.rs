//! Streaming decoder for LDAP PDUs
//!
//! [`LdapDecoder`] owns the read buffer of one connection. Bytes go in
//! through [`LdapDecoder::decode_step`]; complete messages come out detached
//! from the buffer, and a short read simply leaves the container suspended
//! until more bytes arrive. One container serves one connection; containers
//! on different connections are independent.

use crate::ber::{parse_element, parse_header, Class, FromBer, Length, Tag};
use crate::controls::ControlRegistry;
use crate::error::LdapError;
use crate::ldap::*;
use crate::ldap_parser::parse_ldap_message_with;
use bytes::{Buf, BytesMut};
use log::{debug, trace};
use nom::Err;
use std::borrow::Cow;

/// Default bound on filter nesting.
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 100;

/// Default bound on the size of a single PDU (16 MiB).
pub const DEFAULT_MAX_PDU_SIZE: usize = 16 * 1024 * 1024;

/// Knobs and registries consulted while decoding.
///
/// Options are built at startup and shared read-only afterwards; cloning is
/// cheap enough for one instance per connection.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// Reject filters nesting deeper than this many levels.
    pub max_filter_depth: usize,
    /// Reject PDUs whose outer TLV exceeds this many bytes.
    pub max_pdu_size: usize,
    /// Skip zero padding between PDUs instead of failing on it.
    pub accept_trailing_bytes: bool,
    /// Typed control decoders, keyed by OID.
    pub registry: ControlRegistry,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            accept_trailing_bytes: true,
            registry: ControlRegistry::with_known_controls(),
        }
    }
}

/// Where the container stands in the current TLV.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecoderState {
    /// Waiting for the first identifier octet of a PDU.
    Tag,
    /// Identifier octets seen, length octets still incomplete.
    Length,
    /// Header complete, decoding the value octets.
    Value,
    /// Header complete but the buffer holds less than the announced length.
    GatheringBytes,
    /// A full message was just handed out.
    PduDecoded,
    /// A decode error was hit; [`LdapDecoder::reset`] is required.
    Failed,
}

/// A rejected PDU, with a ready-to-send error response when the operation
/// kind has a response form.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DecodeRejection {
    pub reason: LdapError,
    pub response: Option<LdapMessage<'static>>,
}

/// Buffered, resumable decoder for one connection.
#[derive(Debug)]
pub struct LdapDecoder {
    buf: BytesMut,
    state: DecoderState,
    failure: Option<LdapError>,
    options: DecodeOptions,
}

impl Default for LdapDecoder {
    fn default() -> Self {
        LdapDecoder::new()
    }
}

impl LdapDecoder {
    pub fn new() -> Self {
        LdapDecoder::with_options(DecodeOptions::default())
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        LdapDecoder {
            buf: BytesMut::new(),
            state: DecoderState::Tag,
            failure: None,
            options,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Append connection bytes without attempting to decode.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Feed bytes, then try to advance; idempotent when called with empty
    /// input.
    pub fn decode_step(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<LdapMessage<'static>>, DecodeRejection> {
        self.feed(bytes);
        self.decode_next()
    }

    /// Try to decode the next complete PDU from the buffered bytes.
    ///
    /// `Ok(None)` means the buffer ends mid-TLV; feed more bytes and call
    /// again. After an `Err` the container stays in [`DecoderState::Failed`]
    /// until [`LdapDecoder::reset`].
    pub fn decode_next(
        &mut self,
    ) -> Result<Option<LdapMessage<'static>>, DecodeRejection> {
        if self.state == DecoderState::Failed {
            return Err(DecodeRejection {
                reason: self.failure.clone().unwrap_or(LdapError::Unknown),
                response: None,
            });
        }
        if self.state == DecoderState::PduDecoded {
            self.state = DecoderState::Tag;
        }
        if self.options.accept_trailing_bytes {
            let padding = self.buf.iter().take_while(|b| **b == 0).count();
            if padding > 0 {
                trace!("skipping {} zero padding bytes", padding);
                self.buf.advance(padding);
            }
        }
        if self.buf.is_empty() {
            self.state = DecoderState::Tag;
            return Ok(None);
        }
        // read the outer header first: it bounds the PDU and tells whether
        // the buffer can hold a complete message yet
        let mut outer_complete = false;
        match parse_header(&self.buf) {
            Err(Err::Incomplete(_)) => {
                // the identifier octet is in, length octets are not
                self.state = DecoderState::Length;
                return Ok(None);
            }
            Err(Err::Error(e)) | Err(Err::Failure(e)) => return self.fail(e, None),
            Ok((rest, header)) => {
                if let Length::Definite(content_len) = header.length {
                    let header_len = self.buf.len() - rest.len();
                    let total = header_len + content_len;
                    if total > self.options.max_pdu_size {
                        return self.fail(LdapError::PduTooLarge, None);
                    }
                    if self.buf.len() < total {
                        self.state = DecoderState::GatheringBytes;
                        return Ok(None);
                    }
                    outer_complete = true;
                } else if self.buf.len() > self.options.max_pdu_size {
                    // indefinite outer length: bound the buffered bytes
                    return self.fail(LdapError::PduTooLarge, None);
                }
            }
        }
        self.state = DecoderState::Value;
        match parse_ldap_message_with(&self.options, &self.buf) {
            Ok((rem, msg)) => {
                let consumed = self.buf.len() - rem.len();
                let msg = msg.to_static();
                self.buf.advance(consumed);
                self.state = DecoderState::PduDecoded;
                trace!(
                    "decoded PDU id={} op={}",
                    msg.message_id.0,
                    msg.protocol_op.tag()
                );
                Ok(Some(msg))
            }
            Err(Err::Incomplete(_)) if outer_complete => {
                // the whole PDU is buffered, so an inner element ran past its
                // enclosing length
                let reason = LdapError::MalformedLength;
                let response = salvage_response(&self.buf, &reason);
                self.fail(reason, response)
            }
            Err(Err::Incomplete(_)) => {
                // indefinite outer length, still waiting for end-of-contents
                self.state = DecoderState::GatheringBytes;
                Ok(None)
            }
            Err(Err::Error(e)) | Err(Err::Failure(e)) => {
                let response = salvage_response(&self.buf, &e);
                self.fail(e, response)
            }
        }
    }

    /// Drop the buffer and leave the terminal state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = DecoderState::Tag;
        self.failure = None;
    }

    fn fail(
        &mut self,
        reason: LdapError,
        response: Option<LdapMessage<'static>>,
    ) -> Result<Option<LdapMessage<'static>>, DecodeRejection> {
        debug!("PDU rejected: {}", reason);
        self.state = DecoderState::Failed;
        self.failure = Some(reason.clone());
        Err(DecodeRejection { reason, response })
    }
}

// Recover enough of the broken PDU (message id, operation tag) to prepare an
// error response for operations that have a response form.
fn salvage_response(buf: &[u8], reason: &LdapError) -> Option<LdapMessage<'static>> {
    let (_, (header, content)) = parse_element(buf).ok()?;
    if header.class != Class::Universal || header.tag != Tag::SEQUENCE {
        return None;
    }
    let (content, message_id) = MessageID::from_ber(content).ok()?;
    let (_, op_header) = parse_header(content).ok()?;
    if op_header.class != Class::Application {
        return None;
    }
    let result_code = match reason {
        LdapError::InvalidDN => ResultCode::InvalidDNSyntax,
        LdapError::InvalidAuthenticationType | LdapError::InvalidBindVersion => {
            ResultCode::AuthMethodNotSupported
        }
        _ => ResultCode::ProtocolError,
    };
    let result = LdapResult {
        result_code,
        matched_dn: LdapDN(Cow::Borrowed("")),
        diagnostic_message: LdapString(Cow::Owned(reason.to_string())),
    };
    let op = match op_header.tag.0 {
        0 => ProtocolOp::BindResponse(BindResponse {
            result,
            server_sasl_creds: None,
        }),
        3 => ProtocolOp::SearchResultDone(result),
        6 => ProtocolOp::ModifyResponse(ModifyResponse { result }),
        8 => ProtocolOp::AddResponse(result),
        10 => ProtocolOp::DelResponse(result),
        12 => ProtocolOp::ModDnResponse(result),
        14 => ProtocolOp::CompareResponse(result),
        23 => ProtocolOp::ExtendedResponse(ExtendedResponse {
            result,
            response_name: None,
            response_value: None,
        }),
        _ => return None,
    };
    Some(LdapMessage::new(message_id, op))
}

//
// ----------------------- TESTS -----------------------
//
