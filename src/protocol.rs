//! IANA protocol-number translation for flow records.

/// Maps a numeric protocol string to its canonical name.
/// Unknown numbers (and the empty string) pass through unchanged.
pub fn convert_protocol(protocol: &str) -> &str {
    match protocol {
        "1" => "ICMP",
        "6" => "TCP",
        "17" => "UDP",
        "47" => "GRE",
        "50" => "ESP",
        "51" => "AH",
        "58" => "ICMPv6",
        "89" => "OSPF",
        "132" => "SCTP",
        other => other,
    }
}
