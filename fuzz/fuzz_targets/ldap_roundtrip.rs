#![no_main]
use ldap_codec::encoder::encode_message;
use ldap_codec::ldap::LdapMessage;
use ldap_codec::FromBer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((_, msg)) = LdapMessage::from_ber(data) {
        // whatever decodes must re-encode, and re-encoding the canonical
        // bytes must be a fixed point
        let out = encode_message(&msg);
        let (_, again) = LdapMessage::from_ber(&out).expect("canonical bytes must decode");
        assert_eq!(encode_message(&again), out);
    }
});
