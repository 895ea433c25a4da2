//! Input checks shared by the workflows.

use crate::RackopsError;
use std::net::Ipv4Addr;

/// Minimum TTL (seconds) for a CDN enabled container.
pub const MIN_CDN_TTL: u32 = 900;

/// Minimum and default TTL (seconds) for DNS zones and records.
pub const MIN_DNS_TTL: u32 = 300;

/// Largest database volume we allow (GB).
pub const MAX_VOLUME_GB: u32 = 150;

/// Zero-padded two-digit index used in server names (server01, server02, ...).
pub fn pretty_hostname(index: u32) -> String {
    format!("{:02}", index)
}

/// Split an FQDN into its zone: everything after the first label.
/// At least three labels are required, so a bare zone like `example.com` is rejected.
pub fn zone_from_fqdn(fqdn: &str) -> Result<String, RackopsError> {
    let segments: Vec<&str> = fqdn.trim().trim_end_matches('.').split('.').collect();
    if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(RackopsError::InvalidInput(format!(
            "FQDN string '{}' is incorrectly formatted, please check and try again. \
             Base zone/domain in the format 'example.com' will not be accepted",
            fqdn
        )));
    }
    Ok(segments[1..].join("."))
}

pub fn check_min_ttl(ttl: u32, min: u32, what: &str) -> Result<u32, RackopsError> {
    if ttl < min {
        return Err(RackopsError::InvalidInput(format!(
            "Minimum {} permitted is {}s",
            what, min
        )));
    }
    Ok(ttl)
}

/// Parse a TTL typed by a user; `None` if not an integer or below `min`.
pub fn parse_ttl(input: &str, min: u32) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|t| *t >= min)
}

pub fn is_valid_ipv4(address: &str) -> bool {
    address.trim().parse::<Ipv4Addr>().is_ok()
}

pub fn check_volume_size(gb: u32) -> Result<u32, RackopsError> {
    if !(1..=MAX_VOLUME_GB).contains(&gb) {
        return Err(RackopsError::InvalidInput(format!(
            "Permitted volume size is between 1 and {} GB",
            MAX_VOLUME_GB
        )));
    }
    Ok(gb)
}

pub fn check_ssh_public_key(contents: &str) -> Result<&str, RackopsError> {
    if !contents.contains("ssh-") {
        return Err(RackopsError::InvalidInput(
            "SSH public key does not appear to be correctly formatted".to_string(),
        ));
    }
    Ok(contents)
}

/// `prefix.zone`, or the zone itself for an empty prefix.
pub fn record_name(prefix: &str, zone: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        zone.to_string()
    } else {
        format!("{}.{}", prefix, zone)
    }
}
