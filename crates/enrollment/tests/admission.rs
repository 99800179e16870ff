//! Join, drop and promotion behaviour of the admission controller against
//! the in-memory store.

mod common;

use assert_matches::assert_matches;
use registrar_core::admission::RejectReason;
use registrar_core::status::EnrollmentStatus;
use registrar_enrollment::EnrollmentError;

use common::{instructor, registrar, section, setup, student};

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fills_seats_then_waitlist_then_rejects() {
    let (store, controller) = setup(vec![section(1, 1, 2)]).await;

    let first = controller.request_join(1, 1).await.unwrap();
    assert_eq!(first.enrollment.status, EnrollmentStatus::Enrolled);
    assert_eq!(first.waitlist_position, None);

    let second = controller.request_join(2, 1).await.unwrap();
    assert_eq!(second.enrollment.status, EnrollmentStatus::Waitlisted);
    assert_eq!(second.waitlist_position, Some(0));

    let third = controller.request_join(3, 1).await.unwrap();
    assert_eq!(third.waitlist_position, Some(1));

    let err = controller.request_join(4, 1).await.unwrap_err();
    assert_matches!(err, EnrollmentError::CapacityExceeded(RejectReason::WaitlistFull));

    let tables = store.snapshot().await;
    assert!(tables.enrollments_for(4, 1).is_empty());
    assert_eq!(tables.waitlist_users(1), vec![2, 3]);
}

#[tokio::test]
async fn leaving_the_waitlist_moves_later_users_up() {
    let (store, controller) = setup(vec![section(1, 1, 2)]).await;
    for user in 1..=3 {
        controller.request_join(user, 1).await.unwrap();
    }

    let dropped = controller.drop_waitlist(2, 1).await.unwrap();
    assert_eq!(dropped.status, EnrollmentStatus::Dropped);

    let tables = store.snapshot().await;
    assert_eq!(tables.waitlist_users(1), vec![3]);
    assert_eq!(tables.waitlist_positions(1), vec![0]);
    assert_eq!(tables.enrollments_for(2, 1)[0].status, EnrollmentStatus::Dropped);
    assert_eq!(tables.enrollments_for(3, 1)[0].status, EnrollmentStatus::Waitlisted);
}

#[tokio::test]
async fn fourth_waitlist_is_rejected_by_quota() {
    let sections = (10..=13).map(|id| section(id, 0, 5)).collect();
    let (store, controller) = setup(sections).await;

    for section_id in 10..=12 {
        let outcome = controller.request_join(7, section_id).await.unwrap();
        assert_eq!(outcome.waitlist_position, Some(0));
    }

    let err = controller.request_join(7, 13).await.unwrap_err();
    assert_matches!(
        err,
        EnrollmentError::CapacityExceeded(RejectReason::WaitlistQuotaReached)
    );

    let tables = store.snapshot().await;
    assert_eq!(tables.user_waitlist_count(7), 3);
    assert!(tables.waitlist_positions(13).is_empty());
}

#[tokio::test]
async fn quota_does_not_block_a_free_seat() {
    let mut sections: Vec<_> = (10..=12).map(|id| section(id, 0, 5)).collect();
    sections.push(section(13, 1, 0));
    let (_store, controller) = setup(sections).await;

    for section_id in 10..=12 {
        controller.request_join(7, section_id).await.unwrap();
    }
    let outcome = controller.request_join(7, 13).await.unwrap();
    assert_eq!(outcome.enrollment.status, EnrollmentStatus::Enrolled);
}

#[tokio::test]
async fn join_rejects_frozen_deleted_and_missing_sections() {
    let mut frozen = section(1, 5, 5);
    frozen.freeze = true;
    let mut deleted = section(2, 5, 5);
    deleted.deleted = true;
    let (store, controller) = setup(vec![frozen, deleted]).await;

    assert_matches!(
        controller.request_join(1, 1).await,
        Err(EnrollmentError::Frozen(1))
    );
    assert_matches!(
        controller.request_join(1, 2).await,
        Err(EnrollmentError::SectionNotFound(2))
    );
    assert_matches!(
        controller.request_join(1, 3).await,
        Err(EnrollmentError::SectionNotFound(3))
    );
    assert!(store.snapshot().await.enrollments.is_empty());
}

#[tokio::test]
async fn joining_twice_is_rejected() {
    let (_store, controller) = setup(vec![section(1, 1, 2)]).await;
    controller.request_join(1, 1).await.unwrap();
    controller.request_join(2, 1).await.unwrap();

    assert_matches!(
        controller.request_join(1, 1).await,
        Err(EnrollmentError::AlreadyActive {
            status: EnrollmentStatus::Enrolled,
            ..
        })
    );
    assert_matches!(
        controller.request_join(2, 1).await,
        Err(EnrollmentError::AlreadyActive {
            status: EnrollmentStatus::Waitlisted,
            ..
        })
    );
}

#[tokio::test]
async fn rejoining_after_a_drop_creates_a_new_row() {
    let (store, controller) = setup(vec![section(1, 1, 0)]).await;
    controller.request_join(1, 1).await.unwrap();
    controller.drop_enrollment(1, 1).await.unwrap();

    let again = controller.request_join(1, 1).await.unwrap();
    assert_eq!(again.enrollment.status, EnrollmentStatus::Enrolled);

    let rows = store.snapshot().await;
    let statuses: Vec<_> = rows.enrollments_for(1, 1).iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![EnrollmentStatus::Dropped, EnrollmentStatus::Enrolled]);
}

// ---------------------------------------------------------------------------
// Drop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_drop_returns_the_dropped_row() {
    let (_store, controller) = setup(vec![section(1, 1, 0)]).await;
    let joined = controller.request_join(1, 1).await.unwrap();

    let first = controller.drop_enrollment(1, 1).await.unwrap();
    let second = controller.drop_enrollment(1, 1).await.unwrap();

    assert_eq!(first.id, joined.enrollment.id);
    assert_eq!(first.status, EnrollmentStatus::Dropped);
    assert_eq!(second, first);
}

#[tokio::test]
async fn drop_without_any_row_is_not_found() {
    let (_store, controller) = setup(vec![section(1, 1, 0)]).await;
    assert_matches!(
        controller.drop_enrollment(1, 1).await,
        Err(EnrollmentError::EnrollmentNotFound {
            user_id: 1,
            section_id: 1
        })
    );
}

#[tokio::test]
async fn drop_enrollment_leaves_a_waitlisted_row_alone() {
    let (store, controller) = setup(vec![section(1, 0, 2)]).await;
    controller.request_join(1, 1).await.unwrap();

    let row = controller.drop_enrollment(1, 1).await.unwrap();
    assert_eq!(row.status, EnrollmentStatus::Waitlisted);
    assert_eq!(store.snapshot().await.waitlist_users(1), vec![1]);
}

#[tokio::test]
async fn drop_waitlist_requires_an_entry() {
    let (_store, controller) = setup(vec![section(1, 1, 2)]).await;
    controller.request_join(1, 1).await.unwrap();

    assert_matches!(
        controller.drop_waitlist(1, 1).await,
        Err(EnrollmentError::NotOnWaitlist { .. })
    );
}

#[tokio::test]
async fn frozen_section_blocks_drops() {
    let (store, controller) = setup(vec![section(1, 1, 1)]).await;
    controller.request_join(1, 1).await.unwrap();
    controller.request_join(2, 1).await.unwrap();

    let mut frozen = section(1, 1, 1);
    frozen.freeze = true;
    store.insert_section(frozen).await;

    assert_matches!(controller.drop_enrollment(1, 1).await, Err(EnrollmentError::Frozen(1)));
    assert_matches!(controller.drop_waitlist(2, 1).await, Err(EnrollmentError::Frozen(1)));
}

#[tokio::test]
async fn dropping_a_seat_does_not_promote() {
    let (store, controller) = setup(vec![section(1, 1, 2)]).await;
    controller.request_join(1, 1).await.unwrap();
    controller.request_join(2, 1).await.unwrap();

    controller.drop_enrollment(1, 1).await.unwrap();

    let tables = store.snapshot().await;
    assert_eq!(tables.count_status(1, EnrollmentStatus::Enrolled), 0);
    assert_eq!(tables.waitlist_users(1), vec![2]);

    // The next joiner takes the vacated seat directly.
    let late = controller.request_join(5, 1).await.unwrap();
    assert_eq!(late.enrollment.status, EnrollmentStatus::Enrolled);
}

#[tokio::test]
async fn section_drop_is_limited_to_staff_and_self() {
    let (_store, controller) = setup(vec![section(1, 5, 0)]).await;
    for user in 1..=4 {
        controller.request_join(user, 1).await.unwrap();
    }

    assert_matches!(
        controller.drop_section_enrollment(&student(2), 1, 1).await,
        Err(EnrollmentError::Forbidden(_))
    );

    let by_instructor = controller
        .drop_section_enrollment(&instructor(), 1, 1)
        .await
        .unwrap();
    assert_eq!(by_instructor.status, EnrollmentStatus::Dropped);

    let by_registrar = controller
        .drop_section_enrollment(&registrar(), 2, 1)
        .await
        .unwrap();
    assert_eq!(by_registrar.status, EnrollmentStatus::Dropped);

    let by_self = controller
        .drop_section_enrollment(&student(3), 3, 1)
        .await
        .unwrap();
    assert_eq!(by_self.status, EnrollmentStatus::Dropped);
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn promotion_enrolls_the_head_and_compacts() {
    let (store, controller) = setup(vec![section(1, 1, 3)]).await;
    for user in 1..=4 {
        controller.request_join(user, 1).await.unwrap();
    }
    controller.drop_enrollment(1, 1).await.unwrap();

    let promoted = controller
        .promote_next(&instructor(), 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.user_id, 2);
    assert_eq!(promoted.status, EnrollmentStatus::Enrolled);

    let tables = store.snapshot().await;
    assert_eq!(tables.waitlist_users(1), vec![3, 4]);
    assert_eq!(tables.waitlist_positions(1), vec![0, 1]);
    assert_eq!(tables.count_status(1, EnrollmentStatus::Enrolled), 1);
}

#[tokio::test]
async fn promotion_needs_an_open_seat() {
    let (_store, controller) = setup(vec![section(1, 1, 2)]).await;
    controller.request_join(1, 1).await.unwrap();
    controller.request_join(2, 1).await.unwrap();

    assert_matches!(
        controller.promote_next(&registrar(), 1).await,
        Err(EnrollmentError::NoOpenSeat(1))
    );
}

#[tokio::test]
async fn promotion_with_empty_waitlist_is_a_no_op() {
    let (_store, controller) = setup(vec![section(1, 2, 2)]).await;
    assert_eq!(controller.promote_next(&registrar(), 1).await.unwrap(), None);
}

#[tokio::test]
async fn students_cannot_promote() {
    let (_store, controller) = setup(vec![section(1, 1, 2)]).await;
    assert_matches!(
        controller.promote_next(&student(1), 1).await,
        Err(EnrollmentError::Forbidden(_))
    );
}
