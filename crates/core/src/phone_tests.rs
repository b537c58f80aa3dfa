// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn from_registration_lowercases_and_replaces_colons() {
    let id = PhoneId::from_registration("AA:BB:CC:11:22:33", "Flame");
    assert_eq!(id.as_str(), "aa_bb_cc_11_22_33_flame");
}

#[test]
fn phone_config_matches_serial_or_phoneid() {
    let cfg = PhoneConfig {
        phoneid: PhoneId::new("aa_bb_flame"),
        serial: "SERIAL123".into(),
        ip: "10.0.0.5".into(),
        sutcmdport: 20701,
        machinetype: "flame".into(),
        osver: "4.4".into(),
        debug: 3,
    };
    assert!(cfg.matches("SERIAL123"));
    assert!(cfg.matches("aa_bb_flame"));
    assert!(!cfg.matches("other"));
}

#[test]
fn phone_config_round_trips_through_json() {
    let cfg = PhoneConfig {
        phoneid: PhoneId::new("aa_bb_flame"),
        serial: "SERIAL123".into(),
        ip: "10.0.0.5".into(),
        sutcmdport: 20701,
        machinetype: "flame".into(),
        osver: "4.4".into(),
        debug: 3,
    };
    let json = serde_json::to_string(&cfg).expect("serialize");
    let back: PhoneConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(cfg, back);
}
