//! Reservation model and its state-machine transitions.
//!
//! Guard conditions (role checks, timing rules, conflict re-checks) live in
//! the Booking Coordinator (`salastech-db::coordinator`); the mutators here
//! only ever perform the mechanical part of a transition once its guard has
//! already passed, with the surrounding guard logic kept in the
//! coordinator layer.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, ReservationStatus, Timestamp};

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Reservation {
    pub id: Id,
    pub room_id: Id,
    pub user_id: Id,

    #[validate(length(min = 3, max = 100))]
    pub title: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub start_at: Timestamp,
    pub end_at: Timestamp,

    pub status: ReservationStatus,

    pub approved_by: Option<Id>,
    pub approved_at: Option<Timestamp>,

    /// Set when the scheduler, not a human approver, confirmed this
    /// reservation via the 24h auto-approval tick (`autoApprove`).
    pub auto_approved: bool,

    pub cancellation_reason: Option<String>,

    /// Set once `sendReminders` has emitted a reminder for this reservation,
    /// so repeated ticks don't double-send (O4).
    pub reminded_at: Option<Timestamp>,

    /// Set by `archiveOld`; a tombstone rather than a row deletion (O3).
    pub archived_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reservation {
    pub fn new(
        room_id: Id,
        user_id: Id,
        title: String,
        description: Option<String>,
        start_at: Timestamp,
        end_at: Timestamp,
        status: ReservationStatus,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            room_id,
            user_id,
            title,
            description,
            start_at,
            end_at,
            status,
            approved_by: None,
            approved_at: None,
            auto_approved: false,
            cancellation_reason: None,
            reminded_at: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overlap test: `a.startAt < b.endAt ∧ b.startAt < a.endAt`
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start_at < end && start < self.end_at
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_at - self.start_at
    }

    /// PENDING -> CONFIRMED via explicit approval
    pub fn approve(&mut self, approver_id: Id, now: Timestamp) {
        self.status = ReservationStatus::Confirmed;
        self.approved_by = Some(approver_id);
        self.approved_at = Some(now);
        self.auto_approved = false;
        self.updated_at = now;
    }

    /// PENDING -> CONFIRMED via the scheduler's 24h auto-approval tick
    pub fn auto_approve(&mut self, now: Timestamp) {
        self.status = ReservationStatus::Confirmed;
        self.approved_by = None;
        self.approved_at = Some(now);
        self.auto_approved = true;
        self.updated_at = now;
    }

    /// PENDING -> CANCELLED via rejection (reason is mandatory)
    pub fn reject(&mut self, reason: String, now: Timestamp) {
        self.status = ReservationStatus::Cancelled;
        self.cancellation_reason = Some(reason);
        self.updated_at = now;
    }

    /// PENDING|CONFIRMED -> CANCELLED via cancellation
    pub fn cancel(&mut self, reason: Option<String>, now: Timestamp) {
        self.status = ReservationStatus::Cancelled;
        self.cancellation_reason = reason;
        self.updated_at = now;
    }

    /// CONFIRMED -> IN_PROGRESS tick
    pub fn start(&mut self, now: Timestamp) {
        self.status = ReservationStatus::InProgress;
        self.updated_at = now;
    }

    /// IN_PROGRESS -> FINISHED tick
    pub fn finish(&mut self, now: Timestamp) {
        self.status = ReservationStatus::Finished;
        self.updated_at = now;
    }

    /// Revert to PENDING after a non-admin edit changes the interval,
    /// clearing any prior approval.
    pub fn revert_to_pending(&mut self, now: Timestamp) {
        self.status = ReservationStatus::Pending;
        self.approved_by = None;
        self.approved_at = None;
        self.auto_approved = false;
        self.updated_at = now;
    }

    pub fn mark_reminded(&mut self, now: Timestamp) {
        self.reminded_at = Some(now);
    }

    pub fn archive(&mut self, now: Timestamp) {
        self.archived_at = Some(now);
    }
}

/// Reservation creation DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservation {
    pub room_id: Id,

    #[validate(length(min = 3, max = 100))]
    pub title: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

/// Partial update DTO; changing `start_at`/`end_at` re-triggers policy
/// validation and, for non-admins, reverts the reservation to PENDING.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReservation {
    #[validate(length(min = 3, max = 100))]
    pub title: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub start_at: Option<Timestamp>,
    pub end_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mk(start: Timestamp, end: Timestamp) -> Reservation {
        Reservation::new(
            Id::new_v4(),
            Id::new_v4(),
            "Team sync".into(),
            None,
            start,
            end,
            ReservationStatus::Pending,
        )
    }

    #[test]
    fn overlap_detects_touching_intervals_as_non_overlapping() {
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let r = mk(start, end);
        assert!(!r.overlaps(end, end + chrono::Duration::hours(1)));
        assert!(r.overlaps(start - chrono::Duration::minutes(30), start + chrono::Duration::minutes(1)));
    }

    #[test]
    fn approve_sets_approver_and_clears_auto_flag() {
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let mut r = mk(start, end);
        let approver = Id::new_v4();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap();
        r.approve(approver, now);
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.approved_by, Some(approver));
        assert!(!r.auto_approved);
    }

    #[test]
    fn auto_approve_has_no_human_approver() {
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let mut r = mk(start, end);
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 16, 9, 0, 0).unwrap();
        r.auto_approve(now);
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.approved_by, None);
        assert!(r.auto_approved);
    }
}
