//! Contract Test: Disabled Visibility
//!
//! Constraints verified:
//! - Disabled probes are absent from list and key lookups
//! - Disabled probes remain reachable by id
//! - Key lookups reject malformed keys before touching the store
//! - Listing order is stable (creation time, then id)
//!
//! If this test fails, disabled probes leak into listings.

mod common;

use common::*;
use sinker_core::{Error, NewProbe};

#[tokio::test]
async fn disabled_probe_is_only_reachable_by_id() {
    let manager = memory_manager();

    let id = manager
        .register(NewProbe::new("probe1.example.com", "10.0.0.1", "AWS"))
        .await
        .unwrap();

    assert!(manager.list_all().await.unwrap().is_empty());
    assert!(manager.lookup_by_ipv4("10.0.0.1").await.unwrap().is_empty());
    assert!(
        manager
            .lookup_by_fqdn("probe1.example.com")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(manager.lookup_by_id(&id).await.unwrap().id, id);

    manager.enable(&id).await.unwrap();
    assert_eq!(manager.list_all().await.unwrap().len(), 1);
    assert_eq!(manager.lookup_by_ipv4("10.0.0.1").await.unwrap()[0].id, id);
    assert_eq!(
        manager.lookup_by_fqdn("probe1.example.com").await.unwrap()[0].id,
        id
    );
    assert_eq!(manager.count_enabled().await.unwrap(), 1);

    manager.disable(&id).await.unwrap();
    assert!(manager.list_all().await.unwrap().is_empty());
    assert_eq!(manager.count_enabled().await.unwrap(), 0);
    assert!(!manager.lookup_by_id(&id).await.unwrap().enabled);
}

#[tokio::test]
async fn malformed_lookup_keys_fail_fast() {
    let manager = memory_manager();

    let err = manager.lookup_by_ipv4("1.2.3").await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "ipv4", .. }));

    let err = manager.lookup_by_ipv4("999.0.0.1").await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "ipv4", .. }));

    let err = manager.lookup_by_fqdn("bad_name.example.com").await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "fqdn", .. }));

    let err = manager.lookup_by_id("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn list_is_ordered_by_creation() {
    let manager = memory_manager();

    let mut ids = Vec::new();
    for i in 1..=4 {
        let id = manager
            .register(
                NewProbe::new(format!("probe{}.example.com", i), format!("10.0.0.{}", i), "AWS")
                    .with_enabled(true),
            )
            .await
            .unwrap();
        ids.push(id);
    }

    // Registrations can share a clock tick; ties fall back to the id
    let mut expected = Vec::new();
    for id in &ids {
        let probe = manager.lookup_by_id(id).await.unwrap();
        expected.push((probe.created_at, probe.id));
    }
    expected.sort();

    let listed: Vec<_> = manager
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.created_at, p.id))
        .collect();
    assert_eq!(listed, expected);
    assert!(listed.windows(2).all(|w| w[0].0 <= w[1].0));
}
