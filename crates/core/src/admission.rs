//! Admission decision: seat, waitlist slot, or rejection.
//!
//! Pure function over row counts read inside the locked join transaction.
//! Nothing here is cached; callers re-read every count per request.

use serde::Serialize;

/// A user may wait on at most this many sections at once.
pub const MAX_WAITLISTS_PER_USER: i64 = 3;

/// Counts observed inside the join transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub capacity: i64,
    pub enrolled: i64,
    pub waitlist_capacity: i64,
    pub section_waitlist: i64,
    pub user_waitlist: i64,
}

/// Why a join request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The section has no seat and its waitlist is at capacity.
    WaitlistFull,
    /// The section has no seat and the user already waits on
    /// [`MAX_WAITLISTS_PER_USER`] sections.
    WaitlistQuotaReached,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::WaitlistFull => "Section is full and waitlist is full",
            RejectReason::WaitlistQuotaReached => {
                "Section is full and the user is already on the maximum number of waitlists"
            }
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Enroll,
    /// Append to the waitlist tail at this zero-based position.
    Waitlist { position: i32 },
    Reject(RejectReason),
}

/// Decide what a join request gets.
///
/// A free seat always wins. Otherwise both waitlist gates must pass: the
/// section's waitlist has room and the user is under the global quota.
/// When both gates fail the section-level reason is reported.
pub fn decide(snapshot: &AdmissionSnapshot) -> AdmissionDecision {
    if snapshot.enrolled < snapshot.capacity {
        return AdmissionDecision::Enroll;
    }
    if snapshot.section_waitlist >= snapshot.waitlist_capacity {
        return AdmissionDecision::Reject(RejectReason::WaitlistFull);
    }
    if snapshot.user_waitlist >= MAX_WAITLISTS_PER_USER {
        return AdmissionDecision::Reject(RejectReason::WaitlistQuotaReached);
    }
    let position = i32::try_from(snapshot.section_waitlist).unwrap_or(i32::MAX);
    AdmissionDecision::Waitlist { position }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(capacity: i64, enrolled: i64, wl_cap: i64, wl: i64, user_wl: i64) -> AdmissionSnapshot {
        AdmissionSnapshot {
            capacity,
            enrolled,
            waitlist_capacity: wl_cap,
            section_waitlist: wl,
            user_waitlist: user_wl,
        }
    }

    #[test]
    fn free_seat_enrolls_even_when_user_quota_is_spent() {
        assert_eq!(decide(&snapshot(2, 1, 0, 0, 3)), AdmissionDecision::Enroll);
    }

    #[test]
    fn full_section_appends_at_tail() {
        assert_eq!(
            decide(&snapshot(1, 1, 5, 2, 0)),
            AdmissionDecision::Waitlist { position: 2 }
        );
    }

    #[test]
    fn full_waitlist_rejects() {
        assert_eq!(
            decide(&snapshot(1, 1, 2, 2, 0)),
            AdmissionDecision::Reject(RejectReason::WaitlistFull)
        );
    }

    #[test]
    fn quota_rejects_regardless_of_section_waitlist_room() {
        assert_eq!(
            decide(&snapshot(1, 1, 10, 0, MAX_WAITLISTS_PER_USER)),
            AdmissionDecision::Reject(RejectReason::WaitlistQuotaReached)
        );
    }

    #[test]
    fn zero_capacity_section_goes_straight_to_waitlist() {
        assert_eq!(
            decide(&snapshot(0, 0, 1, 0, 0)),
            AdmissionDecision::Waitlist { position: 0 }
        );
    }

    #[test]
    fn over_capacity_after_shrink_still_rejects_direct_enrollment() {
        // Capacity lowered below the current head count by a section update.
        assert_eq!(
            decide(&snapshot(2, 3, 0, 0, 0)),
            AdmissionDecision::Reject(RejectReason::WaitlistFull)
        );
    }
}
