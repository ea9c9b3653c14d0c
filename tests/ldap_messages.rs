use hex_literal::hex;
use ldap_codec::codec::{DecoderState, LdapDecoder};
use ldap_codec::controls::{ControlValue, PagedResults, CONTROL_PAGED_RESULTS};
use ldap_codec::encoder::encode_message;
use ldap_codec::error::LdapError;
use ldap_codec::filter::{AssertionValue, Filter, Substring};
use ldap_codec::ldap::{
    DerefAliases, LdapMessage, MessageID, ProtocolOp, ResultCode, SearchScope,
};
use ldap_codec::ldap_parser::parse_ldap_messages;
use ldap_codec::FromBer;

// SearchRequest for (objectclass=t*) over uid=akarasulu,dc=example,dc=com,
// scope singleLevel, deref always, limits 1000/1000, typesOnly TRUE,
// attributes attr0..attr2
const SEARCH_SUBSTRING_INITIAL: &[u8] = &hex!(
    "30 62 02 01 01 63 5d"
    "04 1f 75 69 64 3d 61 6b 61 72 61 73 75 6c 75 2c 64 63 3d 65 78 61 6d 70 6c 65 2c 64 63 3d 63 6f 6d"
    "0a 01 01 0a 01 03 02 02 03 e8 02 02 03 e8 01 01 ff"
    "a4 12 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 03 80 01 74"
    "30 15 04 05 61 74 74 72 30 04 05 61 74 74 72 31 04 05 61 74 74 72 32"
);

// SearchRequest for (objectclass=*Amos) over dc=example,dc=com
const SEARCH_SUBSTRING_FINAL: &[u8] = &hex!(
    "30 40 02 01 02 63 3b"
    "04 11 64 63 3d 65 78 61 6d 70 6c 65 2c 64 63 3d 63 6f 6d"
    "0a 01 02 0a 01 00 02 01 00 02 01 00 01 01 00"
    "a4 15 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 06 82 04 41 6d 6f 73"
    "30 00"
);

// SearchRequest for (objectClass=*) over the root DSE
const SEARCH_PRESENT: &[u8] = &hex!(
    "30 25 02 01 03 63 20 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
    "87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00"
);

#[test]
fn test_malformed_empty() {
    LdapMessage::from_ber(&hex!("30 00")).expect_err("expected error");
}

#[test]
fn test_decode_search_request_substring_initial() {
    let (rem, msg) = LdapMessage::from_ber(SEARCH_SUBSTRING_INITIAL).expect("parsing failed");
    assert!(rem.is_empty());
    assert_eq!(msg.message_id, MessageID(1));
    let req = match &msg.protocol_op {
        ProtocolOp::SearchRequest(req) => req,
        _ => panic!("wrong operation"),
    };
    assert_eq!(&req.base_object.0, "uid=akarasulu,dc=example,dc=com");
    assert_eq!(req.scope, SearchScope::SingleLevel);
    assert_eq!(req.deref_aliases, DerefAliases::DerefAlways);
    assert_eq!(req.size_limit, 1000);
    assert_eq!(req.time_limit, 1000);
    assert!(req.types_only);
    match &req.filter {
        Filter::Substrings(sub) => {
            assert_eq!(&sub.filter_type.0, "objectclass");
            assert_eq!(
                sub.substrings,
                vec![Substring::Initial(AssertionValue(b"t"[..].into()))]
            );
        }
        _ => panic!("wrong filter type"),
    }
    assert_eq!(
        req.attributes.iter().map(|a| a.0.as_ref()).collect::<Vec<_>>(),
        ["attr0", "attr1", "attr2"]
    );
    // bit-exact round trip
    assert_eq!(encode_message(&msg), SEARCH_SUBSTRING_INITIAL);
}

#[test]
fn test_decode_search_request_substring_final() {
    let (rem, msg) = LdapMessage::from_ber(SEARCH_SUBSTRING_FINAL).expect("parsing failed");
    assert!(rem.is_empty());
    let req = match &msg.protocol_op {
        ProtocolOp::SearchRequest(req) => req,
        _ => panic!("wrong operation"),
    };
    match &req.filter {
        Filter::Substrings(sub) => {
            assert_eq!(
                sub.substrings,
                vec![Substring::Final(AssertionValue(b"Amos"[..].into()))]
            );
        }
        _ => panic!("wrong filter type"),
    }
    assert_eq!(encode_message(&msg), SEARCH_SUBSTRING_FINAL);
}

#[test]
fn test_substring_ordering_violation_rejected() {
    // final piece before an initial piece inside a full message
    const DATA: &[u8] = &hex!(
        "30 2f 02 01 01 63 2a 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
        "a4 15 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 06 82 01 61 80 01 62"
        "30 00"
    );
    let mut decoder = LdapDecoder::new();
    let rejection = decoder.decode_step(DATA).expect_err("expected error");
    assert_eq!(rejection.reason, LdapError::InvalidSubstring);
    // search has a response form, so the rejection carries one
    let response = rejection.response.expect("a prepared response");
    assert_eq!(response.message_id, MessageID(1));
    match response.protocol_op {
        ProtocolOp::SearchResultDone(result) => {
            assert_eq!(result.result_code, ResultCode::ProtocolError);
        }
        _ => panic!("wrong response operation"),
    }
}

#[test]
fn test_substring_empty_sequence_rejected() {
    // substrings SEQUENCE containing a bare empty OCTET STRING
    const DATA: &[u8] = &hex!("a4 11 04 0b 6f 62 6a 65 63 74 63 6c 61 73 73 30 02 04 00");
    let res = Filter::from_ber(DATA);
    assert_eq!(res, Err(ldap_codec::Err::Error(LdapError::InvalidSubstring)));
}

#[test]
fn test_search_present_with_trailing_padding() {
    let mut input = SEARCH_PRESENT.to_vec();
    input.extend_from_slice(&[0u8; 6]);
    let mut decoder = LdapDecoder::new();
    let msg = decoder
        .decode_step(&input)
        .expect("decoding failed")
        .expect("a message");
    assert_eq!(msg.message_id, MessageID(3));
    let req = match &msg.protocol_op {
        ProtocolOp::SearchRequest(req) => req,
        _ => panic!("wrong operation"),
    };
    assert_eq!(
        req.filter,
        Filter::Present(ldap_codec::ldap::LdapString("objectClass".into()))
    );
    // the padding is not part of the canonical form
    assert_eq!(encode_message(&msg), SEARCH_PRESENT);
    assert_eq!(decoder.decode_next().expect("ok"), None);
    assert_eq!(decoder.state(), DecoderState::Tag);
}

#[test]
fn test_bind_request_invalid_version() {
    const DATA: &[u8] = &hex!("30 0c 02 01 01 60 07 02 01 04 04 00 80 00");
    let mut decoder = LdapDecoder::new();
    let rejection = decoder.decode_step(DATA).expect_err("expected error");
    assert_eq!(rejection.reason, LdapError::InvalidBindVersion);
    assert_eq!(decoder.state(), DecoderState::Failed);
    // no partial message survives: after a reset the container starts clean
    decoder.reset();
    assert_eq!(decoder.decode_next().expect("ok"), None);
    assert_eq!(decoder.state(), DecoderState::Tag);
}

#[test]
fn test_complex_filter_with_manage_dsa_it_control() {
    // (&(objectClass=person)(|(cn=Tori*)(sn=Jagger))) with ManageDsaIT
    const DATA: &[u8] = &hex!(
        "30 81 87 02 01 04 63 65"
        "04 1b 6f 75 3d 70 65 6f 70 6c 65 2c 64 63 3d 65 78 61 6d 70 6c 65 2c 64 63 3d 63 6f 6d"
        "0a 01 02 0a 01 03 02 01 00 02 01 00 01 01 00"
        "a0 35"
        "a3 15 04 0b 6f 62 6a 65 63 74 43 6c 61 73 73 04 06 70 65 72 73 6f 6e"
        "a1 1c"
        "a4 0c 04 02 63 6e 30 06 80 04 54 6f 72 69"
        "a3 0c 04 02 73 6e 04 06 4a 61 67 67 65 72"
        "30 00"
        "a0 1b 30 19 04 17 32 2e 31 36 2e 38 34 30 2e 31 2e 31 31 33 37 33 30 2e 33 2e 34 2e 32"
    );
    let (rem, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    assert!(rem.is_empty());
    let req = match &msg.protocol_op {
        ProtocolOp::SearchRequest(req) => req,
        _ => panic!("wrong operation"),
    };
    match &req.filter {
        Filter::And(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[0], Filter::EqualityMatch(_)));
            match &children[1] {
                Filter::Or(nested) => {
                    assert_eq!(nested.len(), 2);
                    assert!(matches!(nested[0], Filter::Substrings(_)));
                    assert!(matches!(nested[1], Filter::EqualityMatch(_)));
                }
                _ => panic!("wrong nested filter"),
            }
        }
        _ => panic!("wrong filter type"),
    }
    let controls = msg.controls.as_ref().expect("controls");
    assert_eq!(controls.len(), 1);
    assert_eq!(&controls[0].control_type.0, "2.16.840.1.113730.3.4.2");
    assert_eq!(controls[0].control_value, ControlValue::ManageDsaIt);
    assert_eq!(encode_message(&msg), DATA);
}

#[test]
fn test_paged_results_control_round_trip() {
    const DATA: &[u8] = &hex!(
        "30 4d 02 01 02 63 20 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
        "87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00"
        "a0 26 30 24 04 16 31 2e 32 2e 38 34 30 2e 31 31 33 35 35 36 2e 31 2e 34 2e 33 31 39"
        "01 01 ff 04 07 30 05 02 01 64 04 00"
    );
    let (rem, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    assert!(rem.is_empty());
    let controls = msg.controls.as_ref().expect("controls");
    assert_eq!(&controls[0].control_type.0, CONTROL_PAGED_RESULTS);
    assert!(controls[0].criticality);
    assert_eq!(
        controls[0].control_value,
        ControlValue::PagedResults(PagedResults {
            size: 100,
            cookie: Vec::new(),
        })
    );
    assert_eq!(encode_message(&msg), DATA);
}

#[test]
fn test_resumability_for_every_prefix() {
    let (_, expected) = LdapMessage::from_ber(SEARCH_SUBSTRING_INITIAL).expect("parsing failed");
    let expected = expected.to_static();
    for split in 1..SEARCH_SUBSTRING_INITIAL.len() {
        let mut decoder = LdapDecoder::new();
        assert_eq!(
            decoder
                .decode_step(&SEARCH_SUBSTRING_INITIAL[..split])
                .expect("prefix must not fail"),
            None,
            "prefix of {} bytes yielded a message",
            split
        );
        let msg = decoder
            .decode_step(&SEARCH_SUBSTRING_INITIAL[split..])
            .expect("decoding failed")
            .expect("a message");
        assert_eq!(msg, expected, "split at {} diverged", split);
    }
}

#[test]
fn test_non_canonical_integer_recanonicalized() {
    // message id encoded with a redundant leading zero
    const DATA: &[u8] = &hex!("30 07 02 02 00 01 42 00");
    const CANONICAL: &[u8] = &hex!("30 05 02 01 01 42 00");
    let (_, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    assert_eq!(msg.message_id, MessageID(1));
    let out = encode_message(&msg);
    assert_eq!(out, CANONICAL);
    let (_, again) = LdapMessage::from_ber(&out).expect("parsing failed");
    assert_eq!(again, msg);
}

#[test]
fn test_empty_attribute_selector_dropped_on_reencode() {
    // same request as SEARCH_PRESENT but with a single empty selector
    const DATA: &[u8] = &hex!(
        "30 27 02 01 03 63 22 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
        "87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 02 04 00"
    );
    let (_, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    let req = match &msg.protocol_op {
        ProtocolOp::SearchRequest(req) => req,
        _ => panic!("wrong operation"),
    };
    // legal on input
    assert_eq!(req.attributes.len(), 1);
    assert!(req.attributes[0].0.is_empty());
    // silently removed on output: the stream shrinks by two bytes
    assert_eq!(encode_message(&msg), SEARCH_PRESENT);
}

#[test]
fn test_parse_message_stream() {
    let mut input = SEARCH_PRESENT.to_vec();
    input.extend_from_slice(&hex!("30 05 02 01 04 42 00"));
    let (rem, messages) = parse_ldap_messages(&input).expect("parsing failed");
    assert!(rem.is_empty());
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_id, MessageID(3));
    assert_eq!(messages[1].protocol_op, ProtocolOp::UnbindRequest);
}

#[test]
fn test_critical_control_with_bad_value_fails_message() {
    // paged-results control, criticality TRUE, value is not a SEQUENCE
    const DATA: &[u8] = &hex!(
        "30 47 02 01 03 63 20 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
        "87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00"
        "a0 20 30 1e 04 16 31 2e 32 2e 38 34 30 2e 31 31 33 35 35 36 2e 31 2e 34 2e 33 31 39"
        "01 01 ff 04 01 ff"
    );
    let mut decoder = LdapDecoder::new();
    let rejection = decoder.decode_step(DATA).expect_err("expected error");
    assert_eq!(rejection.reason, LdapError::InvalidControlValue);
}

#[test]
fn test_non_critical_control_with_bad_value_downgrades() {
    // same control without criticality: the raw octets are kept
    const DATA: &[u8] = &hex!(
        "30 44 02 01 03 63 20 04 00 0a 01 00 0a 01 00 02 01 00 02 01 00 01 01 00"
        "87 0b 6f 62 6a 65 63 74 43 6c 61 73 73 30 00"
        "a0 1d 30 1b 04 16 31 2e 32 2e 38 34 30 2e 31 31 33 35 35 36 2e 31 2e 34 2e 33 31 39"
        "04 01 ff"
    );
    let (_, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    let controls = msg.controls.as_ref().expect("controls");
    assert_eq!(
        controls[0].control_value,
        ControlValue::Raw(b"\xff"[..].into())
    );
    assert_eq!(encode_message(&msg), DATA);
}

#[test]
fn test_control_order_and_multiplicity_preserved() {
    // two raw controls with the same OID, order must survive the round trip
    const DATA: &[u8] = &hex!(
        "30 29 02 01 05 42 00 a0 22"
        "30 0f 04 07 31 2e 32 2e 33 2e 34 01 01 ff 04 01 61"
        "30 0f 04 07 31 2e 32 2e 33 2e 34 01 01 ff 04 01 62"
    );
    let (_, msg) = LdapMessage::from_ber(DATA).expect("parsing failed");
    let controls = msg.controls.as_ref().expect("controls");
    assert_eq!(controls.len(), 2);
    assert_eq!(controls[0].control_value, ControlValue::Raw(b"a"[..].into()));
    assert_eq!(controls[1].control_value, ControlValue::Raw(b"b"[..].into()));
    assert_eq!(encode_message(&msg), DATA);
}
