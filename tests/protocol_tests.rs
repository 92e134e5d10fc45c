//! Tests for protocol-number translation.

use otelship::protocol::convert_protocol;

#[test]
fn test_known_protocol_numbers() {
    assert_eq!(convert_protocol("1"), "ICMP");
    assert_eq!(convert_protocol("6"), "TCP");
    assert_eq!(convert_protocol("17"), "UDP");
    assert_eq!(convert_protocol("47"), "GRE");
    assert_eq!(convert_protocol("50"), "ESP");
    assert_eq!(convert_protocol("51"), "AH");
    assert_eq!(convert_protocol("58"), "ICMPv6");
    assert_eq!(convert_protocol("89"), "OSPF");
    assert_eq!(convert_protocol("132"), "SCTP");
}

#[test]
fn test_unknown_protocol_passes_through() {
    assert_eq!(convert_protocol("999"), "999");
    assert_eq!(convert_protocol("tcp"), "tcp");
}

#[test]
fn test_empty_protocol_stays_empty() {
    assert_eq!(convert_protocol(""), "");
}
