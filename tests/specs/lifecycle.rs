//! Volume lifecycle: creating, created, failed, destroying, destroyed.

use crate::prelude::*;
use stowage_core::{ContainerHandle, VolumeError, VolumeKind, VolumeState};

#[test]
fn volume_moves_through_full_lifecycle() {
    let h = Harness::new();
    let creating = h
        .repo
        .create_container_volume(TEAM, "worker-1", &ContainerHandle::from("c1"), "/tmp")
        .unwrap();
    assert_eq!(creating.handle().as_str(), "vol-1");

    let created = creating.created().unwrap();
    assert_eq!(created.kind(), VolumeKind::Container);
    assert_eq!(created.path(), Some("/tmp"));

    let destroying = created.destroying().unwrap();
    assert!(destroying.destroy());

    // The handle resolves to nothing once the row is removed
    assert!(h.repo.find_volume(created.handle()).is_none());
}

#[test]
fn duplicate_settled_transitions_are_successes() {
    let h = Harness::new();
    let creating = h
        .repo
        .create_container_volume(TEAM, "worker-1", &ContainerHandle::from("c1"), "/tmp")
        .unwrap();

    let created = creating.created().unwrap();
    assert!(creating.created().is_ok());

    created.destroying().unwrap();
    let destroying = created.destroying().unwrap();
    assert!(destroying.destroy());
    assert!(!destroying.destroy());
}

#[test]
fn failed_volume_is_terminal() {
    let h = Harness::new();
    let creating = h
        .repo
        .create_container_volume(TEAM, "worker-1", &ContainerHandle::from("c1"), "/tmp")
        .unwrap();
    let failed = creating.failed().unwrap();
    assert_eq!(failed.handle(), creating.handle());

    assert_eq!(
        creating.created().unwrap_err(),
        VolumeError::MarkCreatedFailed {
            handle: creating.handle().clone(),
        },
    );
}

#[test]
fn conflicting_transition_reports_target_state() {
    let h = Harness::new();
    let creating = h
        .repo
        .create_container_volume(TEAM, "worker-1", &ContainerHandle::from("c1"), "/tmp")
        .unwrap();
    creating.created().unwrap();

    assert_eq!(
        creating.failed().unwrap_err(),
        VolumeError::MarkStateFailed {
            state: VolumeState::Failed,
        },
    );
}

#[test]
fn parent_outlives_children() {
    let h = Harness::new();
    let parent = h.created_volume("worker-1", "c1");
    let child = parent
        .create_child_for_container(&ContainerHandle::from("c2"), "/tmp/child")
        .unwrap()
        .created()
        .unwrap();

    assert_eq!(child.parent_handle(), Some(parent.handle()));
    assert_eq!(
        parent.destroying().unwrap_err(),
        VolumeError::CannotDestroyWithChildren,
    );

    assert!(child.destroying().unwrap().destroy());
    assert!(parent.destroying().unwrap().destroy());
}

#[test]
fn finders_track_the_lifecycle_phase() {
    let h = Harness::new();
    let container = ContainerHandle::from("c1");
    let creating = h
        .repo
        .create_container_volume(TEAM, "worker-1", &container, "/tmp")
        .unwrap();

    let (found_creating, found_created) =
        h.repo.find_container_volume(TEAM, "worker-1", &container, "/tmp");
    assert!(found_creating.is_some());
    assert!(found_created.is_none());

    creating.created().unwrap();
    let (found_creating, found_created) =
        h.repo.find_container_volume(TEAM, "worker-1", &container, "/tmp");
    assert!(found_creating.is_none());

    // Round-trip: everything supplied at creation comes back on the find
    let found = found_created.unwrap();
    assert_eq!(found.handle(), creating.handle());
    assert_eq!(found.kind(), VolumeKind::Container);
    assert_eq!(found.container_handle(), Some(&container));
    assert_eq!(found.path(), Some("/tmp"));
    assert_eq!(found.team_id(), TEAM);
    assert_eq!(found.worker_name(), "worker-1");
}

#[test]
fn deregistered_worker_hides_its_volumes() {
    let h = Harness::new();
    let volume = h.created_volume("worker-1", "c1");
    assert!(h.repo.find_volume(volume.handle()).is_some());

    h.store.delete_worker("worker-1");
    assert!(h.repo.find_volume(volume.handle()).is_none());
    assert!(h
        .repo
        .find_volumes_for_container(&ContainerHandle::from("c1"))
        .is_empty());
}
