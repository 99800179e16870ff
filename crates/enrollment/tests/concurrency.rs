//! Invariants under concurrent and randomized operation sequences.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use registrar_core::admission::{RejectReason, MAX_WAITLISTS_PER_USER};
use registrar_core::status::EnrollmentStatus;
use registrar_enrollment::memory::Tables;
use registrar_enrollment::EnrollmentError;

use common::{section, setup};

fn assert_contiguous(tables: &Tables, section_id: i64) {
    let positions = tables.waitlist_positions(section_id);
    let expected: Vec<i32> = (0..positions.len() as i32).collect();
    assert_eq!(positions, expected, "waitlist of section {section_id} has gaps");
    assert_eq!(
        tables.count_status(section_id, EnrollmentStatus::Waitlisted),
        positions.len(),
        "every waitlist entry needs exactly one Waitlisted row"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_never_exceed_capacity() {
    let (store, controller) = setup(vec![section(1, 5, 0)]).await;
    let controller = Arc::new(controller);

    let handles = (1..=50).map(|user| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.request_join(user, 1).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 5);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(EnrollmentError::CapacityExceeded(RejectReason::WaitlistFull))
        ));
    }
    assert_eq!(store.snapshot().await.count_status(1, EnrollmentStatus::Enrolled), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waitlist_joins_respect_user_quota() {
    let sections = (1..=6).map(|id| section(id, 0, 10)).collect();
    let (store, controller) = setup(sections).await;
    let controller = Arc::new(controller);

    let handles = (1..=6).map(|section_id| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.request_join(7, section_id).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count() as i64;
    assert_eq!(admitted, MAX_WAITLISTS_PER_USER);
    assert_eq!(
        store.snapshot().await.user_waitlist_count(7) as i64,
        MAX_WAITLISTS_PER_USER
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_and_drops_keep_positions_contiguous() {
    let (store, controller) = setup(vec![section(1, 2, 40)]).await;
    let controller = Arc::new(controller);
    for user in 1..=20 {
        controller.request_join(user, 1).await.unwrap();
    }

    let handles = (1..=40).map(|user| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if user % 2 == 0 && user <= 20 {
                controller.drop_waitlist(user, 1).await.map(|_| ())
            } else {
                controller.request_join(user, 1).await.map(|_| ())
            }
        })
    });
    for joined in join_all(handles).await {
        let _ = joined.unwrap();
    }

    let tables = store.snapshot().await;
    assert_contiguous(&tables, 1);
    assert_eq!(tables.count_status(1, EnrollmentStatus::Enrolled), 2);
}

#[tokio::test]
async fn random_operation_sequence_keeps_positions_contiguous() {
    let (store, controller) = setup(vec![section(1, 3, 8), section(2, 0, 5)]).await;
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..400 {
        let user = rng.random_range(1..=20);
        let section_id = rng.random_range(1..=2);
        let result = match rng.random_range(0..4) {
            0 | 1 => controller.request_join(user, section_id).await.map(|_| ()),
            2 => controller.drop_waitlist(user, section_id).await.map(|_| ()),
            _ => controller.drop_enrollment(user, section_id).await.map(|_| ()),
        };
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    EnrollmentError::CapacityExceeded(_)
                        | EnrollmentError::AlreadyActive { .. }
                        | EnrollmentError::NotOnWaitlist { .. }
                        | EnrollmentError::EnrollmentNotFound { .. }
                ),
                "unexpected error: {err}"
            );
        }

        let tables = store.snapshot().await;
        assert_contiguous(&tables, 1);
        assert_contiguous(&tables, 2);
        assert!(tables.count_status(1, EnrollmentStatus::Enrolled) <= 3);
        assert!(tables.waitlist_positions(1).len() <= 8);
        assert!(tables.waitlist_positions(2).len() <= 5);
        for user in 1..=20 {
            assert!(tables.user_waitlist_count(user) as i64 <= MAX_WAITLISTS_PER_USER);
        }
    }
}
