//! Interface-name classification.
//!
//! Devices disagree on what a port is called: Cisco IOS says
//! `GigabitEthernet0/10`, SONiC says `Ethernet48` with the faceplate number
//! in the alias (`Eth 13/1`), Dell OS10 encodes breakout lanes as
//! `ethernet1/1/11:3`. The classifier reduces all of them to the physical
//! port index printed on the chassis.

use std::sync::LazyLock;

use regex::Regex;

/// `.../<port>:<lane>` breakout suffix, e.g. `ethernet1/1/11:3` -> 11.
static COLON_BREAKOUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+):\d+$").unwrap());

/// SONiC-style `Eth <port>/<lane>` in a name or alias, e.g. `Eth 13/2` -> 13.
static ETH_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Eth\s*(\d+)\s*/\s*(\d+)").unwrap());

/// Bare `Eth <port>` suffix form.
static ETH_SIMPLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Eth\s*(\d+)$").unwrap());

/// Trailing digits of a vendor name, e.g. `GigabitEthernet0/10` -> 10.
static TRAILING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());

/// Derive the physical port index from an interface name and alias.
///
/// The alias is consulted before the name so that SONiC-style descriptions
/// override vendor auto-generated names. The one exception is the explicit
/// colon breakout suffix in the name, which outranks everything: a breakout
/// child's alias often contains `Eth <n>` text that would otherwise hijack
/// the classification.
pub fn physical_index(name: &str, alias: &str) -> Option<u32> {
    // Subinterfaces (Gi0/0.100) never map to a faceplate port.
    if name.contains('.') {
        return None;
    }

    if let Some(idx) = capture_u32(&COLON_BREAKOUT, name) {
        return Some(idx);
    }

    if !alias.is_empty() {
        if let Some(idx) = capture_u32(&ETH_PAIR, alias) {
            return Some(idx);
        }
        if let Some(idx) = capture_u32(&ETH_SIMPLE, alias) {
            return Some(idx);
        }
    }

    if let Some(idx) = capture_u32(&ETH_PAIR, name) {
        return Some(idx);
    }
    if let Some(idx) = capture_u32(&ETH_SIMPLE, name) {
        return Some(idx);
    }
    capture_u32(&TRAILING_DIGITS, name)
}

fn capture_u32(re: &Regex, haystack: &str) -> Option<u32> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Interfaces that never belong on the faceplate: management, loopback,
/// VLAN/tunnel/port-channel virtuals, CPU ports and the like.
pub fn is_ignored(name: &str) -> bool {
    if name.contains('.') {
        return true;
    }
    let lower = name.to_lowercase();
    if lower == "eth0" || lower.starts_with("tunnel") {
        return true;
    }
    const PREFIXES: &[&str] = &[
        "vl",
        "nu",
        "lo",
        "po",
        "st",
        "mg",
        "ma",
        "in",
        "bl",
        "co",
        "tu",
        "bd",
        "vi",
        "cpu",
        "bridge-aggregation",
        "br",
        "ap",
        "us",
        "lan",
    ];
    PREFIXES.iter().any(|p| lower.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_digits_rule() {
        assert_eq!(physical_index("GigabitEthernet0/10", ""), Some(10));
        assert_eq!(physical_index("Ethernet48", ""), Some(48));
        assert_eq!(physical_index("Eth1", ""), Some(1));
    }

    #[test]
    fn subinterfaces_are_rejected() {
        assert_eq!(physical_index("GigabitEthernet0/0.100", ""), None);
        assert_eq!(physical_index("Ethernet1.1", "Eth 5"), None);
    }

    #[test]
    fn alias_overrides_name() {
        // SONiC: lane-numbered ifName, faceplate port in the alias.
        assert_eq!(physical_index("Ethernet48", "Eth 13/1"), Some(13));
        assert_eq!(physical_index("Ethernet48", "Eth 13"), Some(13));
        assert_eq!(physical_index("Ethernet48", "eth13/4"), Some(13));
    }

    #[test]
    fn colon_breakout_outranks_alias() {
        // The name already encodes the breakout; an Eth-style alias must not
        // hijack the classification.
        assert_eq!(physical_index("ethernet1/1/11:3", "Eth 1/1"), Some(11));
        assert_eq!(physical_index("ethernet1/1/11:3", ""), Some(11));
    }

    #[test]
    fn no_digits_means_no_index() {
        assert_eq!(physical_index("mgmt", ""), None);
        assert_eq!(physical_index("", ""), None);
    }

    #[test]
    fn classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(physical_index("Ethernet48", "Eth 13/1"), Some(13));
        }
    }

    #[test]
    fn ignored_prefixes() {
        for name in [
            "eth0",
            "Tunnel0",
            "Vlan100",
            "Null0",
            "Loopback0",
            "Port-channel1",
            "mgmt0",
            "CPU",
            "Bridge-Aggregation1",
        ] {
            assert!(is_ignored(name), "{name} should be ignored");
        }
        for name in ["GigabitEthernet0/1", "Ethernet48", "eth1"] {
            assert!(!is_ignored(name), "{name} should not be ignored");
        }
    }

    #[test]
    fn appending_subinterface_suffix_makes_any_name_ignored() {
        for name in ["GigabitEthernet0/1", "Ethernet48", "eth1", "weird"] {
            assert!(is_ignored(&format!("{name}.10")));
        }
    }
}
