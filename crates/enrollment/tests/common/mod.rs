#![allow(dead_code)]

use std::sync::Arc;

use registrar_core::retry::RetryPolicy;
use registrar_core::roles::{Actor, ROLE_INSTRUCTOR, ROLE_REGISTRAR, ROLE_STUDENT};
use registrar_core::store::SectionState;
use registrar_core::types::DbId;
use registrar_enrollment::{AdmissionController, InMemoryStore};

pub const INSTRUCTOR_ID: DbId = 500;
pub const REGISTRAR_ID: DbId = 900;

/// A live, unfrozen section taught by [`INSTRUCTOR_ID`].
pub fn section(id: DbId, capacity: i32, waitlist_capacity: i32) -> SectionState {
    SectionState {
        id,
        capacity,
        waitlist_capacity,
        freeze: false,
        deleted: false,
        instructor_id: INSTRUCTOR_ID,
    }
}

/// Retry quickly and without jitter so tests stay deterministic.
pub fn test_retry() -> RetryPolicy {
    RetryPolicy::new(4, 1, 2, 0.0)
}

/// A store seeded with `sections` and a controller over it.
pub async fn setup(sections: Vec<SectionState>) -> (InMemoryStore, AdmissionController) {
    let store = InMemoryStore::new();
    for s in sections {
        store.insert_section(s).await;
    }
    let controller = AdmissionController::new(Arc::new(store.clone()), test_retry());
    (store, controller)
}

pub fn student(user_id: DbId) -> Actor {
    Actor::new(user_id, vec![ROLE_STUDENT.to_string()])
}

pub fn instructor() -> Actor {
    Actor::new(INSTRUCTOR_ID, vec![ROLE_INSTRUCTOR.to_string()])
}

pub fn registrar() -> Actor {
    Actor::new(REGISTRAR_ID, vec![ROLE_REGISTRAR.to_string()])
}
