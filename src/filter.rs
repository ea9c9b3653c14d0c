//! Definition for types used in LDAP filters

use crate::ldap::{cow_bytes_static, cow_str_static, LdapString};
use std::borrow::Cow;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter<'a> {
    And(Vec<Filter<'a>>),
    Or(Vec<Filter<'a>>),
    Not(Box<Filter<'a>>),
    EqualityMatch(AttributeValueAssertion<'a>),
    Substrings(SubstringFilter<'a>),
    GreaterOrEqual(AttributeValueAssertion<'a>),
    LessOrEqual(AttributeValueAssertion<'a>),
    Present(LdapString<'a>),
    ApproxMatch(AttributeValueAssertion<'a>),
    ExtensibleMatch(MatchingRuleAssertion<'a>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartialAttribute<'a> {
    pub attr_type: LdapString<'a>,
    pub attr_vals: Vec<AttributeValue<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute<'a> {
    pub attr_type: LdapString<'a>,
    pub attr_vals: Vec<AttributeValue<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeValueAssertion<'a> {
    pub attribute_desc: LdapString<'a>,
    pub assertion_value: Cow<'a, [u8]>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeDescription<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchingRuleAssertion<'a> {
    pub matching_rule: Option<LdapString<'a>>,
    pub rule_type: Option<AttributeDescription<'a>>,
    pub assertion_value: AssertionValue<'a>,
    pub dn_attributes: Option<bool>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubstringFilter<'a> {
    pub filter_type: LdapString<'a>,
    pub substrings: Vec<Substring<'a>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Substring<'a> {
    Initial(AssertionValue<'a>),
    Any(AssertionValue<'a>),
    Final(AssertionValue<'a>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssertionValue<'a>(pub Cow<'a, [u8]>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeValue<'a>(pub Cow<'a, [u8]>);

impl AttributeValue<'_> {
    /// View the raw bytes as text.
    ///
    /// Attribute values are text by default in LDAP; whether an attribute is
    /// genuinely binary is a schema decision made above this layer.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl AssertionValue<'_> {
    pub fn to_static(&self) -> AssertionValue<'static> {
        AssertionValue(cow_bytes_static(&self.0))
    }
}

impl AttributeValue<'_> {
    pub fn to_static(&self) -> AttributeValue<'static> {
        AttributeValue(cow_bytes_static(&self.0))
    }
}

impl AttributeDescription<'_> {
    pub fn to_static(&self) -> AttributeDescription<'static> {
        AttributeDescription(cow_str_static(&self.0))
    }
}

impl AttributeValueAssertion<'_> {
    pub fn to_static(&self) -> AttributeValueAssertion<'static> {
        AttributeValueAssertion {
            attribute_desc: self.attribute_desc.to_static(),
            assertion_value: cow_bytes_static(&self.assertion_value),
        }
    }
}

impl MatchingRuleAssertion<'_> {
    pub fn to_static(&self) -> MatchingRuleAssertion<'static> {
        MatchingRuleAssertion {
            matching_rule: self.matching_rule.as_ref().map(LdapString::to_static),
            rule_type: self.rule_type.as_ref().map(AttributeDescription::to_static),
            assertion_value: self.assertion_value.to_static(),
            dn_attributes: self.dn_attributes,
        }
    }
}

impl Substring<'_> {
    pub fn to_static(&self) -> Substring<'static> {
        match self {
            Substring::Initial(v) => Substring::Initial(v.to_static()),
            Substring::Any(v) => Substring::Any(v.to_static()),
            Substring::Final(v) => Substring::Final(v.to_static()),
        }
    }
}

impl SubstringFilter<'_> {
    pub fn to_static(&self) -> SubstringFilter<'static> {
        SubstringFilter {
            filter_type: self.filter_type.to_static(),
            substrings: self.substrings.iter().map(Substring::to_static).collect(),
        }
    }
}

impl PartialAttribute<'_> {
    pub fn to_static(&self) -> PartialAttribute<'static> {
        PartialAttribute {
            attr_type: self.attr_type.to_static(),
            attr_vals: self.attr_vals.iter().map(AttributeValue::to_static).collect(),
        }
    }
}

impl Attribute<'_> {
    pub fn to_static(&self) -> Attribute<'static> {
        Attribute {
            attr_type: self.attr_type.to_static(),
            attr_vals: self.attr_vals.iter().map(AttributeValue::to_static).collect(),
        }
    }
}

impl Filter<'_> {
    pub fn to_static(&self) -> Filter<'static> {
        match self {
            Filter::And(v) => Filter::And(v.iter().map(Filter::to_static).collect()),
            Filter::Or(v) => Filter::Or(v.iter().map(Filter::to_static).collect()),
            Filter::Not(f) => Filter::Not(Box::new(f.to_static())),
            Filter::EqualityMatch(a) => Filter::EqualityMatch(a.to_static()),
            Filter::Substrings(s) => Filter::Substrings(s.to_static()),
            Filter::GreaterOrEqual(a) => Filter::GreaterOrEqual(a.to_static()),
            Filter::LessOrEqual(a) => Filter::LessOrEqual(a.to_static()),
            Filter::Present(s) => Filter::Present(s.to_static()),
            Filter::ApproxMatch(a) => Filter::ApproxMatch(a.to_static()),
            Filter::ExtensibleMatch(m) => Filter::ExtensibleMatch(m.to_static()),
        }
    }
}
