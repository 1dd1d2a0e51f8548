//! Policy Engine: pure, side-effect-free validation of a candidate reservation
//! against schedule and role policy. No I/O, no clock access beyond the `now`
//! passed in — every check here must be a deterministic function of its inputs.

use serde::{Deserialize, Serialize};

use crate::clock::Calendar;
use crate::types::{
    Role, RoomStatus, Timestamp, ReservationStatus, AUTO_CONFIRM_DURATION_MINUTES,
    FORCE_PENDING_DURATION_MINUTES, MAX_DURATION_MINUTES, MAX_NOTICE_DAYS, MIN_DURATION_MINUTES,
    MIN_NOTICE_HOURS,
};

/// A single failed policy check. Checks run in a fixed order; the first
/// failure is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyViolation {
    RoomInactive,
    StartInPast,
    NoticeTooShort,
    NoticeTooLong,
    DurationOutOfRange,
    CrossesMidnight,
    OutsideBusinessHours,
    CrossDepartmentForbidden,
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Minimal view of a requester needed by the engine; the coordinator builds
/// this from a `User` row.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub role: Role,
    pub department_id: Option<uuid::Uuid>,
}

/// Minimal view of a room needed by the engine.
#[derive(Debug, Clone, Copy)]
pub struct RoomView {
    pub status: RoomStatus,
    pub department_id: uuid::Uuid,
}

/// Evaluate a candidate `[start, end)` interval for `requester` against
/// `room`, in the exact order spec'd: the first failing check is returned.
pub fn validate(
    requester: &Requester,
    room: &RoomView,
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
    calendar: &Calendar,
) -> Result<(), PolicyViolation> {
    if room.status != RoomStatus::Active {
        return Err(PolicyViolation::RoomInactive);
    }
    if !(start > now) {
        return Err(PolicyViolation::StartInPast);
    }
    let notice = start - now;
    if notice < chrono::Duration::hours(MIN_NOTICE_HOURS) {
        return Err(PolicyViolation::NoticeTooShort);
    }
    if notice > chrono::Duration::days(MAX_NOTICE_DAYS) {
        return Err(PolicyViolation::NoticeTooLong);
    }
    let duration = end - start;
    if duration < chrono::Duration::minutes(MIN_DURATION_MINUTES)
        || duration > chrono::Duration::minutes(MAX_DURATION_MINUTES)
    {
        return Err(PolicyViolation::DurationOutOfRange);
    }
    if start.date_naive() != end.date_naive() {
        return Err(PolicyViolation::CrossesMidnight);
    }
    let classification = calendar.classify(start);
    if classification.is_holiday {
        return Err(PolicyViolation::OutsideBusinessHours);
    }
    let window = calendar
        .window_for(classification.weekday)
        .ok_or(PolicyViolation::OutsideBusinessHours)?;
    let start_time = classification.local_time;
    let end_time = calendar.classify(end).local_time;
    if start_time < window.open || end_time > window.close {
        return Err(PolicyViolation::OutsideBusinessHours);
    }
    if requester.role.is_department_scoped() && requester.department_id != Some(room.department_id) {
        return Err(PolicyViolation::CrossDepartmentForbidden);
    }
    Ok(())
}

/// Decide the initial status for a freshly-created reservation.
///
/// `role ∈ {ADMIN, MANAGER, ADVANCED_USER}` or `duration <= 2h` confirms;
/// `duration > 4h` for a non-privileged user always forces PENDING. The two
/// rules disagree in the (2h, 4h] band for non-privileged users — the first
/// rule wins there, so the result is PENDING (see DESIGN.md, O1).
pub fn initial_status(role: Role, duration: chrono::Duration) -> ReservationStatus {
    if role.auto_confirms() {
        return ReservationStatus::Confirmed;
    }
    let minutes = duration.num_minutes();
    if minutes > FORCE_PENDING_DURATION_MINUTES {
        return ReservationStatus::Pending;
    }
    if minutes <= AUTO_CONFIRM_DURATION_MINUTES {
        return ReservationStatus::Confirmed;
    }
    ReservationStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn requester(role: Role, dept: Option<Uuid>) -> Requester {
        Requester { role, department_id: dept }
    }

    fn room(status: RoomStatus, dept: Uuid) -> RoomView {
        RoomView { status, department_id: dept }
    }

    #[test]
    fn happy_path_weekday_one_hour() {
        let cal = Calendar::brazilian_federal();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let dept = Uuid::new_v4();
        let r = requester(Role::Manager, Some(dept));
        let room = room(RoomStatus::Active, dept);
        assert_eq!(validate(&r, &room, start, end, now, &cal), Ok(()));
    }

    #[test]
    fn rejects_short_notice() {
        let cal = Calendar::brazilian_federal();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 11, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap();
        let dept = Uuid::new_v4();
        let r = requester(Role::Manager, Some(dept));
        let room = room(RoomStatus::Active, dept);
        assert_eq!(
            validate(&r, &room, start, end, now, &cal),
            Err(PolicyViolation::NoticeTooShort)
        );
    }

    #[test]
    fn rejects_cross_department_for_scoped_role() {
        let cal = Calendar::brazilian_federal();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 16, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 16, 15, 0, 0).unwrap();
        let r = requester(Role::User, Some(Uuid::new_v4()));
        let room = room(RoomStatus::Active, Uuid::new_v4());
        assert_eq!(
            validate(&r, &room, start, end, now, &cal),
            Err(PolicyViolation::CrossDepartmentForbidden)
        );
    }

    #[test]
    fn rejects_inactive_room_before_anything_else() {
        let cal = Calendar::brazilian_federal();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 11, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap();
        let dept = Uuid::new_v4();
        let r = requester(Role::Manager, Some(dept));
        let room = room(RoomStatus::Maintenance, dept);
        assert_eq!(
            validate(&r, &room, start, end, now, &cal),
            Err(PolicyViolation::RoomInactive)
        );
    }

    #[test]
    fn initial_status_privileged_always_confirmed() {
        assert_eq!(
            initial_status(Role::Manager, chrono::Duration::hours(6)),
            ReservationStatus::Confirmed
        );
    }

    #[test]
    fn initial_status_short_duration_confirmed() {
        assert_eq!(
            initial_status(Role::User, chrono::Duration::hours(1)),
            ReservationStatus::Confirmed
        );
    }

    #[test]
    fn initial_status_long_duration_pending() {
        assert_eq!(
            initial_status(Role::User, chrono::Duration::hours(5)),
            ReservationStatus::Pending
        );
    }

    #[test]
    fn initial_status_ambiguous_band_is_pending() {
        // (2h, 4h] band: spec resolves the tie to PENDING (O1)
        assert_eq!(
            initial_status(Role::User, chrono::Duration::hours(3)),
            ReservationStatus::Pending
        );
    }
}
