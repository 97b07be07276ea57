//! Resource cache claims: first claim wins, losers stay containers.

use crate::prelude::*;
use std::thread;
use stowage_core::{VolumeError, VolumeKind, Version};

#[test]
fn claim_promotes_the_volume_and_registers_the_association() {
    let h = Harness::new();
    let cache = git_cache("abc123");
    let mut volume = h.created_volume("worker-1", "c1");

    volume.initialize_resource_cache(&cache).unwrap();
    assert_eq!(volume.kind(), VolumeKind::Resource);

    let found = h.repo.find_resource_cache_volume("worker-1", &cache).unwrap();
    assert_eq!(found.handle(), volume.handle());

    let resource_type = found.resource_type().unwrap();
    assert_eq!(resource_type.base_resource_type.name, "git");
    assert_eq!(resource_type.base_resource_type.version, "1.0");
    assert_eq!(resource_type.version, Version::single("ref", "abc123"));
}

#[test]
fn concurrent_claims_elect_exactly_one_winner() {
    let h = Harness::new();
    let cache = git_cache("abc123");

    let volumes: Vec<_> = (0..8)
        .map(|i| h.created_volume("worker-1", &format!("c{i}")))
        .collect();

    let kinds: Vec<VolumeKind> = thread::scope(|scope| {
        let handles: Vec<_> = volumes
            .into_iter()
            .map(|mut volume| {
                let cache = cache.clone();
                scope.spawn(move || {
                    volume.initialize_resource_cache(&cache).unwrap();
                    volume.kind()
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let winners = kinds.iter().filter(|k| **k == VolumeKind::Resource).count();
    let losers = kinds.iter().filter(|k| **k == VolumeKind::Container).count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);

    assert!(h.repo.find_resource_cache_volume("worker-1", &cache).is_some());
}

#[test]
fn claims_on_different_workers_are_independent() {
    let h = Harness::new();
    let cache = git_cache("abc123");

    let mut one = h.created_volume("worker-1", "c1");
    let mut two = h.created_volume("worker-2", "c2");
    one.initialize_resource_cache(&cache).unwrap();
    two.initialize_resource_cache(&cache).unwrap();

    assert_eq!(one.kind(), VolumeKind::Resource);
    assert_eq!(two.kind(), VolumeKind::Resource);
    assert_eq!(
        h.repo
            .find_resource_cache_volume("worker-1", &cache)
            .unwrap()
            .handle(),
        one.handle(),
    );
    assert_eq!(
        h.repo
            .find_resource_cache_volume("worker-2", &cache)
            .unwrap()
            .handle(),
        two.handle(),
    );
}

#[test]
fn different_versions_are_different_caches() {
    let h = Harness::new();
    let mut one = h.created_volume("worker-1", "c1");
    let mut two = h.created_volume("worker-1", "c2");

    one.initialize_resource_cache(&git_cache("abc123")).unwrap();
    two.initialize_resource_cache(&git_cache("def456")).unwrap();

    assert_eq!(one.kind(), VolumeKind::Resource);
    assert_eq!(two.kind(), VolumeKind::Resource);
}

#[test]
fn claim_requires_the_base_type_on_this_worker() {
    let h = Harness::new();
    // worker-2 does not advertise docker-image
    let mut volume = h.created_volume("worker-2", "c1");
    let cache = stowage_core::ResourceCache {
        resource_type: "docker-image".to_string(),
        version: Version::single("digest", "sha:abc"),
        source: Default::default(),
        params: Default::default(),
        resource_types: vec![],
    };

    assert_eq!(
        volume.initialize_resource_cache(&cache).unwrap_err(),
        VolumeError::BaseResourceTypeNotFound {
            worker: "worker-2".to_string(),
            name: "docker-image".to_string(),
        },
    );
}

#[test]
fn streamed_cache_is_authoritative_on_the_destination() {
    let h = Harness::new();
    let cache = git_cache("abc123");

    let mut source = h.created_volume("worker-1", "c1");
    source.initialize_resource_cache(&cache).unwrap();

    let mut destination = h
        .repo
        .create_volume(TEAM, "worker-2", VolumeKind::Resource)
        .unwrap()
        .created()
        .unwrap();
    destination
        .initialize_streamed_resource_cache(&cache, "worker-1")
        .unwrap();

    let found = h.repo.find_resource_cache_volume("worker-2", &cache).unwrap();
    assert_eq!(found.handle(), destination.handle());

    // Lineage is answered from the chain origin's registry
    let resource_type = found.resource_type().unwrap();
    assert_eq!(resource_type.base_resource_type.name, "git");
    assert_eq!(resource_type.base_resource_type.version, "1.0");
}
