//! Probe validation
//!
//! [`validate`] runs the structural checks in a fixed order and stops at the
//! first failure, then enforces that no other enabled probe holds the same
//! FQDN or IPv4 address. Registration calls it twice: once on the caller's
//! input and once after geo enrichment.
//!
//! The individual key validators are public so lookups and mutations can
//! fail fast on malformed keys without touching the store.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};
use crate::probe::{GEO_UNKNOWN, Probe};
use crate::store::ProbeStoreAdapter;

/// Shortest possible dotted quad ("0.0.0.0")
const MIN_IPV4_LEN: usize = 7;

/// RFC 1035 total name length
const MAX_FQDN_LEN: usize = 253;

/// RFC 1035 label length
const MAX_LABEL_LEN: usize = 63;

/// Linux PATH_MAX
const MAX_PATH_LEN: usize = 4096;

/// Validate a probe and enforce key uniqueness against the store
///
/// Checks, in order: provider, ipv4, ipv6, fqdn, latitude, then uniqueness
/// of fqdn and ipv4 among enabled probes. Only read-only store queries are
/// issued.
pub async fn validate(probe: &Probe, store: &ProbeStoreAdapter) -> Result<()> {
    validate_fields(probe)?;
    ensure_unique(probe, store).await
}

/// Structural checks only, no store access
pub fn validate_fields(probe: &Probe) -> Result<()> {
    if !probe.provider.is_valid() {
        return Err(Error::validation(
            "provider",
            probe.provider.name(),
            "invalid provider",
        ));
    }

    validate_ipv4(&probe.ipv4)?;

    if !probe.ipv6.is_empty() {
        validate_ipv6(&probe.ipv6)?;
    }

    validate_fqdn(&probe.fqdn)?;

    if !probe.geo_latitude.is_empty() && probe.geo_latitude != GEO_UNKNOWN {
        validate_latitude(&probe.geo_latitude)?;
    }

    Ok(())
}

/// Fail if another enabled probe holds this probe's fqdn or ipv4
///
/// A stored record with the same id as `probe` is the probe itself and is
/// ignored, so an existing probe can be re-checked before enabling it.
pub async fn ensure_unique(probe: &Probe, store: &ProbeStoreAdapter) -> Result<()> {
    let holders = store.find_enabled_by_fqdn(&probe.fqdn).await?;
    if holders.iter().any(|other| other.id != probe.id) {
        return Err(Error::conflict("fqdn", &probe.fqdn));
    }

    let holders = store.find_enabled_by_ipv4(&probe.ipv4).await?;
    if holders.iter().any(|other| other.id != probe.id) {
        return Err(Error::conflict("ipv4", &probe.ipv4));
    }

    Ok(())
}

/// Validate a dotted-quad IPv4 literal
pub fn validate_ipv4(ipv4: &str) -> Result<Ipv4Addr> {
    if ipv4.len() < MIN_IPV4_LEN {
        return Err(Error::validation(
            "ipv4",
            ipv4,
            format!("must be at least {} characters", MIN_IPV4_LEN),
        ));
    }

    ipv4.parse::<Ipv4Addr>()
        .map_err(|e| Error::validation("ipv4", ipv4, e.to_string()))
}

/// Validate an IPv6 literal
pub fn validate_ipv6(ipv6: &str) -> Result<Ipv6Addr> {
    ipv6.parse::<Ipv6Addr>()
        .map_err(|e| Error::validation("ipv6", ipv6, e.to_string()))
}

/// Validate that a string is a syntactically valid DNS name
///
/// Accepts a single trailing root dot.
pub fn validate_fqdn(fqdn: &str) -> Result<()> {
    let name = fqdn.strip_suffix('.').unwrap_or(fqdn);

    if name.is_empty() {
        return Err(Error::validation("fqdn", fqdn, "cannot be empty"));
    }

    if name.len() > MAX_FQDN_LEN {
        return Err(Error::validation(
            "fqdn",
            fqdn,
            format!("too long: {} chars (max {})", name.len(), MAX_FQDN_LEN),
        ));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::validation("fqdn", fqdn, "empty label"));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::validation(
                "fqdn",
                fqdn,
                format!("label '{}' longer than {} chars", label, MAX_LABEL_LEN),
            ));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::validation(
                "fqdn",
                fqdn,
                format!("label '{}' has characters other than [a-zA-Z0-9-]", label),
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(
                "fqdn",
                fqdn,
                format!("label '{}' starts or ends with a hyphen", label),
            ));
        }
    }

    Ok(())
}

/// Validate a decimal latitude in [-90, 90]
pub fn validate_latitude(latitude: &str) -> Result<f64> {
    let value: f64 = latitude
        .trim()
        .parse()
        .map_err(|_| Error::validation("geo_latitude", latitude, "not a decimal number"))?;

    if !(-90.0..=90.0).contains(&value) {
        return Err(Error::validation(
            "geo_latitude",
            latitude,
            "must be between -90 and 90",
        ));
    }

    Ok(value)
}

/// Validate a traces path: absolute, no NUL bytes, within PATH_MAX
pub fn validate_traces_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::validation("traces_path", path, "cannot be empty"));
    }

    if !path.starts_with('/') {
        return Err(Error::validation("traces_path", path, "must be absolute"));
    }

    if path.contains('\0') {
        return Err(Error::validation("traces_path", path, "contains a NUL byte"));
    }

    if path.len() > MAX_PATH_LEN {
        return Err(Error::validation(
            "traces_path",
            path,
            format!("longer than {} bytes", MAX_PATH_LEN),
        ));
    }

    Ok(())
}

/// Check that `value` is non-empty, padded, standard-alphabet base64
///
/// This is a syntax check only. Decoding can still reject input whose
/// trailing bits are not canonical.
pub fn is_base64(value: &str) -> bool {
    if value.is_empty() || value.len() % 4 != 0 {
        return false;
    }

    let body = value.trim_end_matches('=');
    if value.len() - body.len() > 2 {
        return false;
    }

    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Both keys must be base64; neither is checked in isolation
pub fn validate_credentials(private_key: &str, public_key: &str) -> Result<()> {
    if !is_base64(private_key) || !is_base64(public_key) {
        return Err(Error::credential_format("malformed credentials"));
    }
    Ok(())
}

/// Decode a key that already passed [`is_base64`]
pub(crate) fn decode_key(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| Error::internal(format!("failed to decode {}: {}", field, e)))
}
