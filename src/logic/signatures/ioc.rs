//! Indicator-of-Compromise Extraction
//!
//! Pulls domain-like and IPv4-like strings out of raw sample bytes and
//! matches them against the blacklists of the signature database.

use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::bytes::Regex;

static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9_-]+\.)*[a-zA-Z0-9][a-zA-Z0-9_-]+\.[a-zA-Z]{2,11}")
        .expect("domain pattern is valid")
});

static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ipv4 pattern is valid")
});

/// Domain-like strings found in `content`, lowercased and deduplicated
pub fn extract_domains(content: &[u8]) -> BTreeSet<String> {
    DOMAIN_PATTERN
        .find_iter(content)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).to_lowercase())
        .collect()
}

/// IPv4 literals found in `content`; out-of-range octets are discarded
pub fn extract_ipv4(content: &[u8]) -> BTreeSet<Ipv4Addr> {
    IPV4_PATTERN
        .find_iter(content)
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok()?.parse().ok())
        .collect()
}

/// First blacklisted domain present in the candidates
pub fn find_malicious_domain(candidates: &BTreeSet<String>, blacklist: &HashSet<String>) -> Option<String> {
    candidates.iter().find(|d| blacklist.contains(*d)).cloned()
}

/// First blacklisted address present in the candidates
pub fn find_malicious_ip(candidates: &BTreeSet<Ipv4Addr>, blacklist: &HashSet<Ipv4Addr>) -> Option<Ipv4Addr> {
    candidates.iter().find(|ip| blacklist.contains(*ip)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domains_from_binary_noise() {
        let content = b"\x00\x01GET http://C2.Evil-Host.com/payload\x00\xffupdate.example.org\x00";
        let domains = extract_domains(content);

        assert!(domains.contains("c2.evil-host.com"));
        assert!(domains.contains("update.example.org"));
    }

    #[test]
    fn test_extract_ipv4_rejects_invalid_octets() {
        let content = b"connect 10.0.0.254 then 999.1.1.1 and 192.168.1.1\x00";
        let ips = extract_ipv4(content);

        assert!(ips.contains(&Ipv4Addr::new(10, 0, 0, 254)));
        assert!(ips.contains(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(ips.len(), 2);
    }

    #[test]
    fn test_find_malicious_domain_exact_match() {
        let candidates = extract_domains(b"beacon.bad.net and good.org");
        let blacklist: HashSet<String> = ["bad.net".to_string(), "beacon.bad.net".to_string()].into();

        assert_eq!(find_malicious_domain(&candidates, &blacklist), Some("beacon.bad.net".to_string()));

        let clean: HashSet<String> = ["other.com".to_string()].into();
        assert_eq!(find_malicious_domain(&candidates, &clean), None);
    }
}
