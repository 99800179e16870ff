//! Atomicity and retry behaviour under injected storage faults.

mod common;

use assert_matches::assert_matches;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::StoreError;
use registrar_enrollment::memory::{FaultKind, StoreOp};
use registrar_enrollment::EnrollmentError;

use common::{section, setup};

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_enroll_insert_leaves_no_rows() {
    let (store, controller) = setup(vec![section(1, 1, 1)]).await;
    store.fail_next(StoreOp::InsertEnrollment, FaultKind::Backend, 1);

    let err = controller.request_join(1, 1).await.unwrap_err();
    assert_matches!(err, EnrollmentError::Store(StoreError::Backend(_)));

    let tables = store.snapshot().await;
    assert!(tables.enrollments.is_empty());
    assert!(tables.waitlist.is_empty());
}

#[tokio::test]
async fn failed_waitlist_join_rolls_back_the_entry() {
    let (store, controller) = setup(vec![section(1, 0, 2)]).await;
    store.fail_next(StoreOp::InsertEnrollment, FaultKind::Backend, 1);

    controller.request_join(1, 1).await.unwrap_err();

    let tables = store.snapshot().await;
    assert!(tables.enrollments.is_empty());
    assert!(tables.waitlist.is_empty());
}

#[tokio::test]
async fn failed_renumbering_keeps_the_entry() {
    let (store, controller) = setup(vec![section(1, 0, 3)]).await;
    for user in 1..=3 {
        controller.request_join(user, 1).await.unwrap();
    }
    store.fail_next(StoreOp::ShiftWaitlistDown, FaultKind::Backend, 1);

    assert_matches!(
        controller.drop_waitlist(1, 1).await,
        Err(EnrollmentError::Store(StoreError::Backend(_)))
    );

    let tables = store.snapshot().await;
    assert_eq!(tables.waitlist_users(1), vec![1, 2, 3]);
    assert_eq!(tables.waitlist_positions(1), vec![0, 1, 2]);
    assert_eq!(tables.enrollments_for(1, 1)[0].status, EnrollmentStatus::Waitlisted);
}

#[tokio::test]
async fn failed_commit_leaves_no_rows() {
    let (store, controller) = setup(vec![section(1, 1, 0)]).await;
    store.fail_next(StoreOp::Commit, FaultKind::Backend, 1);

    controller.request_join(1, 1).await.unwrap_err();
    assert!(store.snapshot().await.enrollments.is_empty());
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflicts_are_retried_transparently() {
    let (store, controller) = setup(vec![section(1, 1, 0)]).await;
    store.fail_next(StoreOp::CountEnrolled, FaultKind::Conflict, 2);

    let outcome = controller.request_join(1, 1).await.unwrap();
    assert_eq!(outcome.enrollment.status, EnrollmentStatus::Enrolled);
    assert_eq!(store.snapshot().await.enrollments.len(), 1);
}

#[tokio::test]
async fn conflict_on_begin_is_retried() {
    let (store, controller) = setup(vec![section(1, 0, 2)]).await;
    store.fail_next(StoreOp::Begin, FaultKind::Conflict, 1);

    let outcome = controller.request_join(1, 1).await.unwrap();
    assert_eq!(outcome.waitlist_position, Some(0));
}

#[tokio::test]
async fn persistent_conflict_surfaces_after_bounded_attempts() {
    let (store, controller) = setup(vec![section(1, 1, 0)]).await;
    store.fail_next(StoreOp::Commit, FaultKind::Conflict, 10);

    assert_matches!(
        controller.request_join(1, 1).await,
        Err(EnrollmentError::StorageConflict { attempts: 4 })
    );
    assert!(store.snapshot().await.enrollments.is_empty());

    store.clear_faults();
    assert!(controller.request_join(1, 1).await.is_ok());
}

#[tokio::test]
async fn backend_failures_are_not_retried() {
    let (store, controller) = setup(vec![section(1, 1, 0)]).await;
    store.fail_next(StoreOp::LockSection, FaultKind::Backend, 1);

    assert_matches!(
        controller.request_join(1, 1).await,
        Err(EnrollmentError::Store(StoreError::Backend(_)))
    );
    // The single armed fault was consumed by the only attempt.
    assert!(controller.request_join(1, 1).await.is_ok());
}

#[tokio::test]
async fn retried_drop_still_compacts_once() {
    let (store, controller) = setup(vec![section(1, 0, 3)]).await;
    for user in 1..=3 {
        controller.request_join(user, 1).await.unwrap();
    }
    store.fail_next(StoreOp::SetEnrollmentStatus, FaultKind::Conflict, 1);

    controller.drop_waitlist(1, 1).await.unwrap();

    let tables = store.snapshot().await;
    assert_eq!(tables.waitlist_users(1), vec![2, 3]);
    assert_eq!(tables.waitlist_positions(1), vec![0, 1]);
}
