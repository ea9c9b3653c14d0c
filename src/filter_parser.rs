use crate::ber::{
    parse_element, parse_opt_tagged_and_then, parse_sequence_and_then, parse_set_and_then,
    parse_tagged_and_then, Class, FromBer,
};
use crate::codec::DEFAULT_MAX_FILTER_DEPTH;
use crate::error::*;
use crate::filter::*;
use crate::ldap::*;
use crate::ldap_parser::parse_ldap_octet_string_as_slice;
use nom::combinator::{complete, map};
use nom::multi::{many0, many1};
use nom::Err;
use std::borrow::Cow;

// AttributeDescription ::= LDAPString
//                         -- Constrained to <attributedescription>
//                         -- [RFC4512]
#[inline]
fn parse_ldap_attribute_description(i: &[u8]) -> Result<'_, LdapString<'_>> {
    LdapString::from_ber(i)
}

// AttributeValueAssertion ::= SEQUENCE {
//      attributeDesc   AttributeDescription,
//      assertionValue  AssertionValue }
pub(crate) fn parse_ldap_attribute_value_assertion_content(
    content: &[u8],
) -> Result<'_, AttributeValueAssertion<'_>> {
    let (content, attribute_desc) = parse_ldap_attribute_description(content)?;
    let (content, assertion_value) = parse_ldap_assertion_value(content)?;
    let assertion = AttributeValueAssertion {
        attribute_desc,
        assertion_value: assertion_value.into(),
    };
    Ok((content, assertion))
}

impl<'a> FromBer<'a> for AttributeValueAssertion<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_sequence_and_then(bytes, parse_ldap_attribute_value_assertion_content)
    }
}

// AssertionValue ::= OCTET STRING
#[inline]
fn parse_ldap_assertion_value(i: &[u8]) -> Result<'_, &[u8]> {
    parse_ldap_octet_string_as_slice(i)
}

// AttributeValue ::= OCTET STRING
#[inline]
fn parse_ldap_attribute_value(i: &[u8]) -> Result<'_, AttributeValue<'_>> {
    map(parse_ldap_octet_string_as_slice, |v| {
        AttributeValue(Cow::Borrowed(v))
    })(i)
}

// PartialAttribute ::= SEQUENCE {
//      type       AttributeDescription,
//      vals       SET OF value AttributeValue }
impl<'a> FromBer<'a> for PartialAttribute<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_sequence_and_then(bytes, |i| {
            let (i, attr_type) = LdapString::from_ber(i)?;
            let (i, attr_vals) =
                parse_set_and_then(i, many0(complete(parse_ldap_attribute_value)))?;
            let partial_attr = PartialAttribute {
                attr_type,
                attr_vals,
            };
            Ok((i, partial_attr))
        })
    }
}

// Attribute ::= PartialAttribute(WITH COMPONENTS {
//      ...,
//      vals (SIZE(1..MAX))})
impl<'a> FromBer<'a> for Attribute<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_sequence_and_then(bytes, |i| {
            let (i, attr_type) = LdapString::from_ber(i)?;
            let (i, attr_vals) =
                parse_set_and_then(i, many1(complete(parse_ldap_attribute_value)))?;
            let attr = Attribute {
                attr_type,
                attr_vals,
            };
            Ok((i, attr))
        })
    }
}

// Filter ::= CHOICE {
//     and             [0] SET SIZE (1..MAX) OF filter Filter,
//     or              [1] SET SIZE (1..MAX) OF filter Filter,
//     not             [2] Filter,
//     equalityMatch   [3] AttributeValueAssertion,
//     substrings      [4] SubstringFilter,
//     greaterOrEqual  [5] AttributeValueAssertion,
//     lessOrEqual     [6] AttributeValueAssertion,
//     present         [7] AttributeDescription,
//     approxMatch     [8] AttributeValueAssertion,
//     extensibleMatch [9] MatchingRuleAssertion,
//     ...  }
impl<'a> FromBer<'a> for Filter<'a> {
    fn from_ber(bytes: &'a [u8]) -> Result<'a, Self> {
        parse_filter(bytes, DEFAULT_MAX_FILTER_DEPTH)
    }
}

/// Parse one filter node, decrementing the remaining recursion depth.
pub(crate) fn parse_filter(bytes: &[u8], depth: usize) -> Result<'_, Filter<'_>> {
    if depth == 0 {
        return Err(Err::Error(LdapError::DepthExceeded));
    }
    let (rem, (header, content)) = parse_element(bytes)?;
    // tag is context-specific IMPLICIT
    if header.class != Class::ContextSpecific {
        return Err(Err::Error(LdapError::InvalidFilterType));
    }
    let (_, filter) = match header.tag.0 {
        0 => {
            let (rem, sub_filters) = parse_filter_set(content, depth)?;
            Ok((rem, Filter::And(sub_filters)))
        }
        1 => {
            let (rem, sub_filters) = parse_filter_set(content, depth)?;
            Ok((rem, Filter::Or(sub_filters)))
        }
        2 => map(|d| parse_filter(d, depth - 1), |f| Filter::Not(Box::new(f)))(content),
        3 => map(
            parse_ldap_attribute_value_assertion_content,
            Filter::EqualityMatch,
        )(content),
        4 => map(parse_ldap_substrings_filter_content, Filter::Substrings)(content),
        5 => map(
            parse_ldap_attribute_value_assertion_content,
            Filter::GreaterOrEqual,
        )(content),
        6 => map(
            parse_ldap_attribute_value_assertion_content,
            Filter::LessOrEqual,
        )(content),
        7 => {
            let s = std::str::from_utf8(content).or(Err(Err::Error(LdapError::InvalidString)))?;
            let s = LdapString(Cow::Borrowed(s));
            Ok(([].as_ref(), Filter::Present(s)))
        }
        8 => map(
            parse_ldap_attribute_value_assertion_content,
            Filter::ApproxMatch,
        )(content),
        9 => map(
            parse_ldap_matching_rule_assertion_content,
            Filter::ExtensibleMatch,
        )(content),
        _ => Err(Err::Error(LdapError::InvalidFilterType)),
    }?;
    // use the remaining bytes from the outer object
    Ok((rem, filter))
}

// and/or sets must not be empty on the wire, and every element must be a
// filter: an unparsable element fails the set instead of being skipped
fn parse_filter_set(content: &[u8], depth: usize) -> Result<'_, Vec<Filter<'_>>> {
    if content.is_empty() {
        return Err(Err::Error(LdapError::EmptyFilterSet));
    }
    let mut rem = content;
    let mut sub_filters = Vec::new();
    while !rem.is_empty() {
        let (rest, filter) = parse_filter(rem, depth - 1)?;
        sub_filters.push(filter);
        rem = rest;
    }
    Ok((rem, sub_filters))
}

// SubstringFilter ::= SEQUENCE {
//      type           AttributeDescription,
//      substrings     SEQUENCE SIZE (1..MAX) OF substring CHOICE {
//           initial [0] AssertionValue,  -- can occur at most once
//           any     [1] AssertionValue,
//           final   [2] AssertionValue } -- can occur at most once
//      }
fn parse_ldap_substrings_filter_content(i: &[u8]) -> Result<'_, SubstringFilter<'_>> {
    let (i, filter_type) = parse_ldap_attribute_description(i)?;
    if filter_type.0.is_empty() {
        return Err(Err::Error(LdapError::InvalidSubstring));
    }
    let (i, substrings) = parse_sequence_and_then(i, |inner| {
        if inner.is_empty() {
            return Err(Err::Error(LdapError::InvalidSubstring));
        }
        // a piece that fails to parse must fail the filter, not be skipped
        let mut rem = inner;
        let mut substrings = Vec::new();
        while !rem.is_empty() {
            let (rest, piece) = parse_ldap_substring(rem)?;
            substrings.push(piece);
            rem = rest;
        }
        Ok((rem, substrings))
    })?;
    validate_substring_sequence(&substrings).map_err(Err::Error)?;
    let filter = SubstringFilter {
        filter_type,
        substrings,
    };
    Ok((i, filter))
}

fn parse_ldap_substring(bytes: &[u8]) -> Result<'_, Substring<'_>> {
    let (rem, (header, content)) = parse_element(bytes)?;
    if header.class != Class::ContextSpecific {
        return Err(Err::Error(LdapError::InvalidSubstring));
    }
    // every piece is an AssertionValue (== OCTET STRING) and must be non-empty
    if content.is_empty() {
        return Err(Err::Error(LdapError::InvalidSubstring));
    }
    let b = AssertionValue(Cow::Borrowed(content));
    match header.tag.0 {
        0 => Ok((rem, Substring::Initial(b))),
        1 => Ok((rem, Substring::Any(b))),
        2 => Ok((rem, Substring::Final(b))),
        _ => Err(Err::Error(LdapError::InvalidSubstring)),
    }
}

// initial only in first position, final only in last: this also rules out
// duplicates of either
fn validate_substring_sequence(substrings: &[Substring]) -> std::result::Result<(), LdapError> {
    for (idx, piece) in substrings.iter().enumerate() {
        match piece {
            Substring::Initial(_) if idx != 0 => return Err(LdapError::InvalidSubstring),
            Substring::Final(_) if idx + 1 != substrings.len() => {
                return Err(LdapError::InvalidSubstring)
            }
            _ => {}
        }
    }
    Ok(())
}

// MatchingRuleAssertion ::= SEQUENCE {
//     matchingRule    [1] MatchingRuleId OPTIONAL,
//     type            [2] AttributeDescription OPTIONAL,
//     matchValue      [3] AssertionValue,
//     dnAttributes    [4] BOOLEAN DEFAULT FALSE }
fn parse_ldap_matching_rule_assertion_content(i: &[u8]) -> Result<'_, MatchingRuleAssertion<'_>> {
    // MatchingRuleId ::= LDAPString
    let (i, matching_rule) =
        parse_opt_tagged_and_then(Class::ContextSpecific, 1, i, |content| {
            let s = std::str::from_utf8(content).or(Err(Err::Error(LdapError::InvalidString)))?;
            let s = LdapString(Cow::Borrowed(s));
            Ok((&b""[..], s))
        })?;
    let (i, rule_type) = parse_opt_tagged_and_then(Class::ContextSpecific, 2, i, |content| {
        let s = std::str::from_utf8(content).or(Err(Err::Error(LdapError::InvalidString)))?;
        let s = AttributeDescription(Cow::Borrowed(s));
        Ok((&b""[..], s))
    })?;
    if matching_rule.is_none() && rule_type.is_none() {
        return Err(Err::Error(LdapError::InvalidMatchingRule));
    }
    let (i, assertion_value) = parse_tagged_and_then(Class::ContextSpecific, 3, i, |content| {
        let s = AssertionValue(Cow::Borrowed(content));
        Ok((&b""[..], s))
    })?;
    let (i, dn_attributes) = parse_opt_tagged_and_then(Class::ContextSpecific, 4, i, |content| {
        if content.len() != 1 {
            return Err(Err::Error(LdapError::MalformedLength));
        }
        Ok((&b""[..], content[0] != 0))
    })?;
    let assertion = MatchingRuleAssertion {
        matching_rule,
        rule_type,
        assertion_value,
        dn_attributes,
    };
    Ok((i, assertion))
}

//
// ----------------------- TESTS -----------------------
//

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_filter_present() {
        const DATA: &[u8] = &hex!("87 0b 6f 62 6a 65 63 74 43 6c 61 73 73");
        let (rem, filter) = Filter::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        assert_eq!(filter, Filter::Present(LdapString(Cow::Borrowed("objectClass"))));
    }

    #[test]
    fn test_parse_filter_equality() {
        // (cn=test)
        const DATA: &[u8] = &hex!("a3 0a 04 02 63 6e 04 04 74 65 73 74");
        let (rem, filter) = Filter::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        if let Filter::EqualityMatch(ava) = filter {
            assert_eq!(&ava.attribute_desc.0, "cn");
            assert_eq!(ava.assertion_value.as_ref(), b"test");
        } else {
            panic!("wrong filter type");
        }
    }

    #[test]
    fn test_parse_filter_empty_and() {
        const DATA: &[u8] = &hex!("a0 00");
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::EmptyFilterSet)));
    }

    #[test]
    fn test_parse_filter_unknown_constructor() {
        const DATA: &[u8] = &hex!("aa 02 04 00");
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidFilterType)));
    }

    fn wrap_not(data: Vec<u8>) -> Vec<u8> {
        let mut outer = vec![0xa2];
        if data.len() < 128 {
            outer.push(data.len() as u8);
        } else {
            outer.push(0x81);
            outer.push(data.len() as u8);
        }
        outer.extend_from_slice(&data);
        outer
    }

    #[test]
    fn test_parse_filter_depth_limit() {
        // 101 nested NOT constructors around a present filter
        let mut data = hex!("87 01 61").to_vec();
        for _ in 0..101 {
            data = wrap_not(data);
        }
        let res = Filter::from_ber(&data);
        assert_eq!(res, Err(Err::Error(LdapError::DepthExceeded)));
    }

    #[test]
    fn test_parse_filter_nested_within_limit() {
        let mut data = hex!("87 01 61").to_vec();
        for _ in 0..50 {
            data = wrap_not(data);
        }
        let (_, filter) = Filter::from_ber(&data).expect("parsing failed");
        let mut depth = 0;
        let mut current = &filter;
        while let Filter::Not(inner) = current {
            depth += 1;
            current = inner;
        }
        assert_eq!(depth, 50);
    }

    #[test]
    fn test_parse_substring_initial() {
        // (objectclass=t*)
        const DATA: &[u8] = &hex!(
            "a4 12 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 03 80 01 74"
        );
        let (rem, filter) = Filter::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        if let Filter::Substrings(sub) = filter {
            assert_eq!(&sub.filter_type.0, "objectclass");
            assert_eq!(
                sub.substrings,
                vec![Substring::Initial(AssertionValue(Cow::Borrowed(b"t")))]
            );
        } else {
            panic!("wrong filter type");
        }
    }

    #[test]
    fn test_parse_substring_final_before_initial() {
        // final piece followed by an initial piece
        const DATA: &[u8] = &hex!(
            "a4 15 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 06 82 01 61 80 01 62"
        );
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidSubstring)));
    }

    #[test]
    fn test_parse_substring_two_initials() {
        const DATA: &[u8] = &hex!(
            "a4 15 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 06 80 01 61 80 01 62"
        );
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidSubstring)));
    }

    #[test]
    fn test_parse_substring_empty_piece() {
        const DATA: &[u8] = &hex!("a4 11 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 02 81 00");
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidSubstring)));
    }

    #[test]
    fn test_parse_substring_empty_sequence() {
        const DATA: &[u8] = &hex!("a4 0f 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 00");
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidSubstring)));
    }

    #[test]
    fn test_parse_substring_literal_asterisk_any() {
        // an `any` piece whose content is the literal `*` byte is a valid
        // octet string
        const DATA: &[u8] = &hex!("a4 12 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 03 81 01 2a");
        let (_, filter) = Filter::from_ber(DATA).expect("parsing failed");
        if let Filter::Substrings(sub) = filter {
            assert_eq!(
                sub.substrings,
                vec![Substring::Any(AssertionValue(Cow::Borrowed(b"*")))]
            );
        } else {
            panic!("wrong filter type");
        }
    }

    #[test]
    fn test_parse_extensible_match() {
        // caseExactMatch rule with type and value
        const DATA: &[u8] = &hex!(
            "a9 17 81 08 32 2e 35 2e 31 33 2e 35 82 02 63 6e 83 04 74 65 73 74 84 01 ff"
        );
        let (rem, filter) = Filter::from_ber(DATA).expect("parsing failed");
        assert!(rem.is_empty());
        if let Filter::ExtensibleMatch(assertion) = filter {
            assert_eq!(assertion.matching_rule, Some(LdapString(Cow::Borrowed("2.5.13.5"))));
            assert_eq!(
                assertion.rule_type,
                Some(AttributeDescription(Cow::Borrowed("cn")))
            );
            assert_eq!(assertion.assertion_value.0.as_ref(), b"test");
            assert_eq!(assertion.dn_attributes, Some(true));
        } else {
            panic!("wrong filter type");
        }
    }

    #[test]
    fn test_parse_extensible_match_requires_rule_or_type() {
        // only matchValue present
        const DATA: &[u8] = &hex!("a9 06 83 04 74 65 73 74");
        let res = Filter::from_ber(DATA);
        assert_eq!(res, Err(Err::Error(LdapError::InvalidMatchingRule)));
    }
}
