//! Content-derived probe identifiers
//!
//! The id is the lowercase hex SHA-512/224 digest of a canonical encoding of
//! the probe's content: every field except `id` and the timestamps. Field
//! order is fixed; strings are written as a big-endian `u32` length followed
//! by their UTF-8 bytes, so no two different field sets share an encoding.
//!
//! Two probes with identical content get the same id. The store rejects the
//! second insert.

use sha2::{Digest, Sha512_224};

use crate::probe::Probe;

/// Length of a derived id in characters
pub const ID_LEN: usize = 56;

/// Derive the identifier for a probe's current content
pub fn derive_id(probe: &Probe) -> String {
    hex::encode(Sha512_224::digest(canonical_bytes(probe)))
}

/// Canonical byte encoding of a probe, excluding its id and timestamps
pub fn canonical_bytes(probe: &Probe) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    put_str(&mut buf, &probe.fqdn);
    put_str(&mut buf, &probe.ipv4);
    put_str(&mut buf, &probe.ipv6);
    put_str(&mut buf, probe.provider.name());
    put_str(&mut buf, &probe.geo_longitude);
    put_str(&mut buf, &probe.geo_latitude);
    put_str(&mut buf, &probe.country);
    put_str(&mut buf, &probe.ssh_private_key);
    put_str(&mut buf, &probe.ssh_public_key);
    put_str(&mut buf, &probe.traces_path);
    buf.push(u8::from(probe.enabled));

    buf
}

fn put_str(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeDefaults;
    use crate::probe::NewProbe;
    use chrono::{TimeZone, Utc};

    fn sample() -> Probe {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        NewProbe::new("probe1.example.com", "10.0.0.1", "AWS")
            .into_probe(&ProbeDefaults::default(), now)
    }

    #[test]
    fn test_derive_is_deterministic() {
        let probe = sample();
        let id = derive_id(&probe);

        assert_eq!(id, derive_id(&probe.clone()));
        assert_eq!(id.len(), ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_id_field_is_not_hashed() {
        let probe = sample();
        let mut with_id = probe.clone();
        with_id.id = derive_id(&probe);

        assert_eq!(derive_id(&probe), derive_id(&with_id));
    }

    #[test]
    fn test_any_field_change_changes_id() {
        let base = sample();
        let base_id = derive_id(&base);

        let mut changed = base.clone();
        changed.ipv4 = "10.0.0.2".to_string();
        assert_ne!(derive_id(&changed), base_id);

        let mut changed = base.clone();
        changed.enabled = true;
        assert_ne!(derive_id(&changed), base_id);

        let mut changed = base.clone();
        changed.country = "ES".to_string();
        assert_ne!(derive_id(&changed), base_id);
    }

    #[test]
    fn test_registration_time_does_not_change_id() {
        let earlier = sample();
        let later = NewProbe::new("probe1.example.com", "10.0.0.1", "AWS").into_probe(
            &ProbeDefaults::default(),
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        );
        assert_ne!(earlier.created_at, later.created_at);

        assert_eq!(derive_id(&earlier), derive_id(&later));
    }

    #[test]
    fn test_length_prefix_separates_adjacent_fields() {
        let mut a = sample();
        a.fqdn = "ab".to_string();
        a.ipv4 = "c".to_string();

        let mut b = sample();
        b.fqdn = "a".to_string();
        b.ipv4 = "bc".to_string();

        assert_ne!(canonical_bytes(&a), canonical_bytes(&b));
        assert_ne!(derive_id(&a), derive_id(&b));
    }
}
