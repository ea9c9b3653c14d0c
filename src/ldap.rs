//! Definitions for LDAP types

use crate::controls::ControlValue;
use crate::filter::*;
use rusticata_macros::newtype_enum;
use std::borrow::Cow;

#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct ProtocolOpTag(pub u32);

newtype_enum! {
impl display ProtocolOpTag {
    BindRequest = 0,
    BindResponse = 1,
    UnbindRequest = 2,
    SearchRequest = 3,
    SearchResultEntry = 4,
    SearchResultDone = 5,
    ModifyRequest = 6,
    ModifyResponse = 7,
    AddRequest = 8,
    AddResponse = 9,
    DelRequest = 10,
    DelResponse = 11,
    ModDnRequest = 12,
    ModDnResponse = 13,
    CompareRequest = 14,
    CompareResponse = 15,
    AbandonRequest = 16,
    SearchResultReference = 19,
    ExtendedRequest = 23,
    ExtendedResponse = 24,
    IntermediateResponse = 25,
}
}

#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct ResultCode(pub u32);

newtype_enum! {
impl debug ResultCode {
    Success = 0,
    OperationsError = 1,
    ProtocolError = 2,
    TimeLimitExceeded = 3,
    SizeLimitExceeded = 4,
    CompareFalse = 5,
    CompareTrue = 6,
    AuthMethodNotSupported = 7,
    StrongerAuthRequired = 8,
    // -- 9 reserved --
    Referral = 10,
    AdminLimitExceeded = 11,
    UnavailableCriticalExtension = 12,
    ConfidentialityRequired = 13,
    SaslBindInProgress = 14,
    NoSuchAttribute = 16,
    UndefinedAttributeType = 17,
    InappropriateMatching = 18,
    ConstraintViolation = 19,
    AttributeOrValueExists = 20,
    InvalidAttributeSyntax = 21,
    // -- 22-31 unused --
    NoSuchObject = 32,
    AliasProblem = 33,
    InvalidDNSyntax = 34,
    // -- 35 reserved for undefined isLeaf --
    AliasDereferencingProblem = 36,
    // -- 37-47 unused --
    InappropriateAuthentication = 48,
    InvalidCredentials = 49,
    InsufficientAccessRights = 50,
    Busy = 51,
    Unavailable = 52,
    UnwillingToPerform = 53,
    LoopDetect = 54,
    // -- 55-63 unused --
    NamingViolation = 64,
    ObjectClassViolation = 65,
    NotAllowedOnNonLeaf = 66,
    NotAllowedOnRDN = 67,
    EntryAlreadyExists = 68,
    ObjectClassModsProhibited = 69,
    // -- 70 reserved for CLDAP --
    AffectsMultipleDSAs = 71,
    // -- 72-79 unused --
    Other = 80,
}
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct MessageID(pub u32);

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SearchScope(pub u32);

newtype_enum! {
impl debug SearchScope {
    BaseObject = 0,
    SingleLevel = 1,
    WholeSubtree = 2,
}
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DerefAliases(pub u32);

newtype_enum! {
impl debug DerefAliases {
    NeverDerefAliases = 0,
    DerefInSearching = 1,
    DerefFindingBaseObj = 2,
    DerefAlways = 3,
}
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Operation(pub u32);

newtype_enum! {
impl debug Operation {
    Add = 0,
    Delete = 1,
    Replace = 2,
}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapString<'a>(pub Cow<'a, str>);

/// Distinguished name in its textual form.
///
/// Only the UTF-8 encoding is checked here; grammar validation against RFC
/// 4514 belongs to the caller's DN layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapDN<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelativeLdapDN<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapOID<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapResult<'a> {
    pub result_code: ResultCode,
    pub matched_dn: LdapDN<'a>,
    pub diagnostic_message: LdapString<'a>,
    // referral           [3] Referral OPTIONAL
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindRequest<'a> {
    pub version: u8,
    pub name: LdapDN<'a>,
    pub authentication: AuthenticationChoice<'a>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaslCredentials<'a> {
    pub mechanism: LdapString<'a>,
    pub credentials: Option<Cow<'a, [u8]>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthenticationChoice<'a> {
    Simple(Cow<'a, [u8]>),
    Sasl(SaslCredentials<'a>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindResponse<'a> {
    pub result: LdapResult<'a>,
    pub server_sasl_creds: Option<Cow<'a, [u8]>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchRequest<'a> {
    pub base_object: LdapDN<'a>,
    pub scope: SearchScope,
    pub deref_aliases: DerefAliases,
    pub size_limit: u32,
    pub time_limit: u32,
    pub types_only: bool,
    pub filter: Filter<'a>,
    pub attributes: Vec<LdapString<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchResultEntry<'a> {
    pub object_name: LdapDN<'a>,
    pub attributes: Vec<PartialAttribute<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModifyRequest<'a> {
    pub object: LdapDN<'a>,
    pub changes: Vec<Change<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModifyResponse<'a> {
    pub result: LdapResult<'a>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Change<'a> {
    pub operation: Operation,
    pub modification: PartialAttribute<'a>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddRequest<'a> {
    pub entry: LdapDN<'a>,
    pub attributes: Vec<Attribute<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModDnRequest<'a> {
    pub entry: LdapDN<'a>,
    pub newrdn: RelativeLdapDN<'a>,
    pub deleteoldrdn: bool,
    pub newsuperior: Option<LdapDN<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompareRequest<'a> {
    pub entry: LdapDN<'a>,
    pub ava: AttributeValueAssertion<'a>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtendedRequest<'a> {
    pub request_name: LdapOID<'a>,
    pub request_value: Option<Cow<'a, [u8]>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtendedResponse<'a> {
    pub result: LdapResult<'a>,
    pub response_name: Option<LdapOID<'a>>,
    pub response_value: Option<Cow<'a, [u8]>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntermediateResponse<'a> {
    pub response_name: Option<LdapOID<'a>>,
    pub response_value: Option<Cow<'a, [u8]>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolOp<'a> {
    BindRequest(BindRequest<'a>),
    BindResponse(BindResponse<'a>),
    UnbindRequest,
    SearchRequest(SearchRequest<'a>),
    SearchResultEntry(SearchResultEntry<'a>),
    SearchResultDone(LdapResult<'a>),
    SearchResultReference(Vec<LdapString<'a>>),
    ModifyRequest(ModifyRequest<'a>),
    ModifyResponse(ModifyResponse<'a>),
    AddRequest(AddRequest<'a>),
    AddResponse(LdapResult<'a>),
    DelRequest(LdapDN<'a>),
    DelResponse(LdapResult<'a>),
    ModDnRequest(ModDnRequest<'a>),
    ModDnResponse(LdapResult<'a>),
    CompareRequest(CompareRequest<'a>),
    CompareResponse(LdapResult<'a>),
    //
    AbandonRequest(MessageID),
    ExtendedRequest(ExtendedRequest<'a>),
    ExtendedResponse(ExtendedResponse<'a>),
    IntermediateResponse(IntermediateResponse<'a>),
}

impl ProtocolOp<'_> {
    /// Get tag number associated with the operation
    pub fn tag(&self) -> ProtocolOpTag {
        let op = match self {
            ProtocolOp::BindRequest(_) => 0,
            ProtocolOp::BindResponse(_) => 1,
            ProtocolOp::UnbindRequest => 2,
            ProtocolOp::SearchRequest(_) => 3,
            ProtocolOp::SearchResultEntry(_) => 4,
            ProtocolOp::SearchResultDone(_) => 5,
            ProtocolOp::ModifyRequest(_) => 6,
            ProtocolOp::ModifyResponse(_) => 7,
            ProtocolOp::AddRequest(_) => 8,
            ProtocolOp::AddResponse(_) => 9,
            ProtocolOp::DelRequest(_) => 10,
            ProtocolOp::DelResponse(_) => 11,
            ProtocolOp::ModDnRequest(_) => 12,
            ProtocolOp::ModDnResponse(_) => 13,
            ProtocolOp::CompareRequest(_) => 14,
            ProtocolOp::CompareResponse(_) => 15,
            ProtocolOp::AbandonRequest(_) => 16,
            ProtocolOp::SearchResultReference(_) => 19,
            ProtocolOp::ExtendedRequest(_) => 23,
            ProtocolOp::ExtendedResponse(_) => 24,
            ProtocolOp::IntermediateResponse(_) => 25,
        };
        ProtocolOpTag(op)
    }

    /// Get the LDAP result, if present
    pub fn result(&self) -> Option<&LdapResult> {
        match self {
            ProtocolOp::BindResponse(r) => Some(&r.result),
            ProtocolOp::ModifyResponse(r) => Some(&r.result),
            ProtocolOp::ExtendedResponse(r) => Some(&r.result),
            ProtocolOp::SearchResultDone(ref r)
            | ProtocolOp::AddResponse(ref r)
            | ProtocolOp::DelResponse(ref r)
            | ProtocolOp::ModDnResponse(ref r)
            | ProtocolOp::CompareResponse(ref r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Control<'a> {
    pub control_type: LdapOID<'a>,
    pub criticality: bool,
    pub control_value: ControlValue<'a>,
}

/// An LDAP Message according to RFC4511
///
// LDAPMessage ::= SEQUENCE {
//      messageID       MessageID,
//      protocolOp      CHOICE {
//           bindRequest           BindRequest,
//           bindResponse          BindResponse,
//           unbindRequest         UnbindRequest,
//           searchRequest         SearchRequest,
//           searchResEntry        SearchResultEntry,
//           searchResDone         SearchResultDone,
//           searchResRef          SearchResultReference,
//           modifyRequest         ModifyRequest,
//           modifyResponse        ModifyResponse,
//           addRequest            AddRequest,
//           addResponse           AddResponse,
//           delRequest            DelRequest,
//           delResponse           DelResponse,
//           modDNRequest          ModifyDNRequest,
//           modDNResponse         ModifyDNResponse,
//           compareRequest        CompareRequest,
//           compareResponse       CompareResponse,
//           abandonRequest        AbandonRequest,
//           extendedReq           ExtendedRequest,
//           extendedResp          ExtendedResponse,
//           ...,
//           intermediateResponse  IntermediateResponse },
//      controls       [0] Controls OPTIONAL }
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapMessage<'a> {
    /// Message Identifier (32-bits unsigned integer)
    ///
    /// The messageID of a request MUST have a non-zero value different from the messageID of any
    /// other request in progress in the same LDAP session.  The zero value is reserved for the
    /// unsolicited notification message.
    pub message_id: MessageID,
    /// The LDAP operation from this LDAP message
    pub protocol_op: ProtocolOp<'a>,
    /// Message controls (optional)
    ///
    /// Controls provide a mechanism whereby the semantics and arguments of existing LDAP
    /// operations may be extended.  One or more controls may be attached to a single LDAP message.
    /// A control only affects the semantics of the message it is attached to.
    pub controls: Option<Vec<Control<'a>>>,
}

impl<'a> LdapMessage<'a> {
    /// Build a message around an operation, with no controls.
    pub fn new(message_id: MessageID, protocol_op: ProtocolOp<'a>) -> Self {
        LdapMessage {
            message_id,
            protocol_op,
            controls: None,
        }
    }
}

//
// ----------------------- OWNED CONVERSIONS -----------------------
//
// The streaming container hands messages out after the read buffer they were
// parsed from has been recycled, so every borrowing type can detach itself.

pub(crate) fn cow_str_static(c: &Cow<'_, str>) -> Cow<'static, str> {
    Cow::Owned(c.clone().into_owned())
}

pub(crate) fn cow_bytes_static(c: &Cow<'_, [u8]>) -> Cow<'static, [u8]> {
    Cow::Owned(c.clone().into_owned())
}

impl LdapString<'_> {
    pub fn to_static(&self) -> LdapString<'static> {
        LdapString(cow_str_static(&self.0))
    }
}

impl LdapDN<'_> {
    pub fn to_static(&self) -> LdapDN<'static> {
        LdapDN(cow_str_static(&self.0))
    }
}

impl RelativeLdapDN<'_> {
    pub fn to_static(&self) -> RelativeLdapDN<'static> {
        RelativeLdapDN(cow_str_static(&self.0))
    }
}

impl LdapOID<'_> {
    pub fn to_static(&self) -> LdapOID<'static> {
        LdapOID(cow_str_static(&self.0))
    }
}

impl LdapResult<'_> {
    pub fn to_static(&self) -> LdapResult<'static> {
        LdapResult {
            result_code: self.result_code,
            matched_dn: self.matched_dn.to_static(),
            diagnostic_message: self.diagnostic_message.to_static(),
        }
    }
}

impl SaslCredentials<'_> {
    pub fn to_static(&self) -> SaslCredentials<'static> {
        SaslCredentials {
            mechanism: self.mechanism.to_static(),
            credentials: self.credentials.as_ref().map(cow_bytes_static),
        }
    }
}

impl AuthenticationChoice<'_> {
    pub fn to_static(&self) -> AuthenticationChoice<'static> {
        match self {
            AuthenticationChoice::Simple(b) => AuthenticationChoice::Simple(cow_bytes_static(b)),
            AuthenticationChoice::Sasl(c) => AuthenticationChoice::Sasl(c.to_static()),
        }
    }
}

impl BindRequest<'_> {
    pub fn to_static(&self) -> BindRequest<'static> {
        BindRequest {
            version: self.version,
            name: self.name.to_static(),
            authentication: self.authentication.to_static(),
        }
    }
}

impl BindResponse<'_> {
    pub fn to_static(&self) -> BindResponse<'static> {
        BindResponse {
            result: self.result.to_static(),
            server_sasl_creds: self.server_sasl_creds.as_ref().map(cow_bytes_static),
        }
    }
}

impl SearchRequest<'_> {
    pub fn to_static(&self) -> SearchRequest<'static> {
        SearchRequest {
            base_object: self.base_object.to_static(),
            scope: self.scope,
            deref_aliases: self.deref_aliases,
            size_limit: self.size_limit,
            time_limit: self.time_limit,
            types_only: self.types_only,
            filter: self.filter.to_static(),
            attributes: self.attributes.iter().map(LdapString::to_static).collect(),
        }
    }
}

impl SearchResultEntry<'_> {
    pub fn to_static(&self) -> SearchResultEntry<'static> {
        SearchResultEntry {
            object_name: self.object_name.to_static(),
            attributes: self
                .attributes
                .iter()
                .map(PartialAttribute::to_static)
                .collect(),
        }
    }
}

impl Change<'_> {
    pub fn to_static(&self) -> Change<'static> {
        Change {
            operation: self.operation,
            modification: self.modification.to_static(),
        }
    }
}

impl ModifyRequest<'_> {
    pub fn to_static(&self) -> ModifyRequest<'static> {
        ModifyRequest {
            object: self.object.to_static(),
            changes: self.changes.iter().map(Change::to_static).collect(),
        }
    }
}

impl ModifyResponse<'_> {
    pub fn to_static(&self) -> ModifyResponse<'static> {
        ModifyResponse {
            result: self.result.to_static(),
        }
    }
}

impl AddRequest<'_> {
    pub fn to_static(&self) -> AddRequest<'static> {
        AddRequest {
            entry: self.entry.to_static(),
            attributes: self.attributes.iter().map(Attribute::to_static).collect(),
        }
    }
}

impl ModDnRequest<'_> {
    pub fn to_static(&self) -> ModDnRequest<'static> {
        ModDnRequest {
            entry: self.entry.to_static(),
            newrdn: self.newrdn.to_static(),
            deleteoldrdn: self.deleteoldrdn,
            newsuperior: self.newsuperior.as_ref().map(LdapDN::to_static),
        }
    }
}

impl CompareRequest<'_> {
    pub fn to_static(&self) -> CompareRequest<'static> {
        CompareRequest {
            entry: self.entry.to_static(),
            ava: self.ava.to_static(),
        }
    }
}

impl ExtendedRequest<'_> {
    pub fn to_static(&self) -> ExtendedRequest<'static> {
        ExtendedRequest {
            request_name: self.request_name.to_static(),
            request_value: self.request_value.as_ref().map(cow_bytes_static),
        }
    }
}

impl ExtendedResponse<'_> {
    pub fn to_static(&self) -> ExtendedResponse<'static> {
        ExtendedResponse {
            result: self.result.to_static(),
            response_name: self.response_name.as_ref().map(LdapOID::to_static),
            response_value: self.response_value.as_ref().map(cow_bytes_static),
        }
    }
}

impl IntermediateResponse<'_> {
    pub fn to_static(&self) -> IntermediateResponse<'static> {
        IntermediateResponse {
            response_name: self.response_name.as_ref().map(LdapOID::to_static),
            response_value: self.response_value.as_ref().map(cow_bytes_static),
        }
    }
}

impl ProtocolOp<'_> {
    pub fn to_static(&self) -> ProtocolOp<'static> {
        match self {
            ProtocolOp::BindRequest(r) => ProtocolOp::BindRequest(r.to_static()),
            ProtocolOp::BindResponse(r) => ProtocolOp::BindResponse(r.to_static()),
            ProtocolOp::UnbindRequest => ProtocolOp::UnbindRequest,
            ProtocolOp::SearchRequest(r) => ProtocolOp::SearchRequest(r.to_static()),
            ProtocolOp::SearchResultEntry(r) => ProtocolOp::SearchResultEntry(r.to_static()),
            ProtocolOp::SearchResultDone(r) => ProtocolOp::SearchResultDone(r.to_static()),
            ProtocolOp::SearchResultReference(v) => {
                ProtocolOp::SearchResultReference(v.iter().map(LdapString::to_static).collect())
            }
            ProtocolOp::ModifyRequest(r) => ProtocolOp::ModifyRequest(r.to_static()),
            ProtocolOp::ModifyResponse(r) => ProtocolOp::ModifyResponse(r.to_static()),
            ProtocolOp::AddRequest(r) => ProtocolOp::AddRequest(r.to_static()),
            ProtocolOp::AddResponse(r) => ProtocolOp::AddResponse(r.to_static()),
            ProtocolOp::DelRequest(r) => ProtocolOp::DelRequest(r.to_static()),
            ProtocolOp::DelResponse(r) => ProtocolOp::DelResponse(r.to_static()),
            ProtocolOp::ModDnRequest(r) => ProtocolOp::ModDnRequest(r.to_static()),
            ProtocolOp::ModDnResponse(r) => ProtocolOp::ModDnResponse(r.to_static()),
            ProtocolOp::CompareRequest(r) => ProtocolOp::CompareRequest(r.to_static()),
            ProtocolOp::CompareResponse(r) => ProtocolOp::CompareResponse(r.to_static()),
            ProtocolOp::AbandonRequest(id) => ProtocolOp::AbandonRequest(*id),
            ProtocolOp::ExtendedRequest(r) => ProtocolOp::ExtendedRequest(r.to_static()),
            ProtocolOp::ExtendedResponse(r) => ProtocolOp::ExtendedResponse(r.to_static()),
            ProtocolOp::IntermediateResponse(r) => ProtocolOp::IntermediateResponse(r.to_static()),
        }
    }
}

impl Control<'_> {
    pub fn to_static(&self) -> Control<'static> {
        Control {
            control_type: self.control_type.to_static(),
            criticality: self.criticality,
            control_value: self.control_value.to_static(),
        }
    }
}

impl LdapMessage<'_> {
    /// Detach the message from the buffer it was parsed from.
    pub fn to_static(&self) -> LdapMessage<'static> {
        LdapMessage {
            message_id: self.message_id,
            protocol_op: self.protocol_op.to_static(),
            controls: self
                .controls
                .as_ref()
                .map(|v| v.iter().map(Control::to_static).collect()),
        }
    }
}
