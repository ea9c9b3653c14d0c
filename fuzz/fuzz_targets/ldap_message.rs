#![no_main]
use ldap_codec::ldap::LdapMessage;
use ldap_codec::FromBer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = LdapMessage::from_ber(data);
});
