//! LDAP codec errors

use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::IResult;

/// Holds the result of parsing functions (LDAP)
///
/// Note that this type is also a `Result`, so usual functions (`map`, `unwrap` etc.) are available.
///
/// Note that this type is not named `LdapResult` to avoid conflicts with LDAP standard type
pub type Result<'a, T> = IResult<&'a [u8], T, LdapError>;

/// An error that can occur while decoding or encoding an LDAP PDU.
///
/// Truncated input is not represented here: streaming parsers signal it with
/// [`nom::Err::Incomplete`], and the caller resumes by feeding more bytes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LdapError {
    #[error("Malformed BER tag")]
    MalformedTag,

    #[error("Malformed BER length")]
    MalformedLength,

    #[error("PDU exceeds the configured size limit")]
    PduTooLarge,

    #[error("Invalid LDAP String encoding")]
    InvalidString,

    #[error("Invalid DN encoding")]
    InvalidDN,

    #[error("Invalid LDAP Authentication Type")]
    InvalidAuthenticationType,

    #[error("Bind protocol version out of range")]
    InvalidBindVersion,

    #[error("Search scope out of range")]
    InvalidScope,

    #[error("Alias dereferencing mode out of range")]
    InvalidDerefAliases,

    #[error("Integer value out of range")]
    IntegerOutOfRange,

    #[error("Invalid Substring sequence")]
    InvalidSubstring,

    #[error("Invalid Type for Filter")]
    InvalidFilterType,

    #[error("Empty set of filters")]
    EmptyFilterSet,

    #[error("Invalid matching rule assertion")]
    InvalidMatchingRule,

    #[error("Filter nesting exceeds the depth limit")]
    DepthExceeded,

    #[error("Invalid Type for Message")]
    InvalidMessageType,

    #[error("Invalid control value")]
    InvalidControlValue,

    #[error("Unknown error")]
    Unknown,

    #[error("nom error: {0:?}")]
    NomError(ErrorKind),
}

impl From<LdapError> for nom::Err<LdapError> {
    fn from(e: LdapError) -> nom::Err<LdapError> {
        nom::Err::Error(e)
    }
}

impl From<ErrorKind> for LdapError {
    fn from(e: ErrorKind) -> LdapError {
        LdapError::NomError(e)
    }
}

impl<I> ParseError<I> for LdapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        LdapError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        LdapError::NomError(kind)
    }
}

impl<I, E> FromExternalError<I, E> for LdapError {
    fn from_external_error(_input: I, kind: ErrorKind, _e: E) -> LdapError {
        LdapError::NomError(kind)
    }
}
