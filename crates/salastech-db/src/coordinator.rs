//! Booking Coordinator: the only place reservations are created or have
//! their interval changed. Conflict detection is only meaningful if
//! "check conflicts, then write" is atomic per room; a plain check-then-insert
//! straight against the repository would leave exactly that race open, which
//! this coordinator closes by serializing writers per room before they reach it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use salastech_core::clock::{Calendar, Clock};
use salastech_core::policy::{self, PolicyViolation, Requester, RoomView};
use salastech_core::{Error, Id, Reservation, ReservationStatus, Result, Role, Timestamp};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

use crate::{Database, DepartmentRepository, ReservationRepository, RoomRepository};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_STORAGE_RETRIES: u32 = 2;

/// Non-admin actors may only cancel a reservation at least this far ahead of its start.
const CANCEL_CUTOFF: chrono::Duration = chrono::Duration::hours(2);

/// Per-room async mutexes, keyed by room id. Entries are created lazily and
/// never removed — the map stays bounded by the number of rooms, not bookings.
#[derive(Clone, Default)]
pub struct RoomLockMap {
    locks: Arc<DashMap<Id, Arc<AsyncMutex<()>>>>,
}

impl RoomLockMap {
    pub fn new() -> Self {
        Self { locks: Arc::new(DashMap::new()) }
    }

    fn lock_for(&self, room_id: Id) -> Arc<AsyncMutex<()>> {
        self.locks.entry(room_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

pub struct BookingCoordinator<C: Clock> {
    db: Database,
    locks: RoomLockMap,
    clock: C,
    calendar: Calendar,
}

impl<C: Clock> BookingCoordinator<C> {
    pub fn new(db: Database, clock: C, calendar: Calendar) -> Self {
        Self { db, locks: RoomLockMap::new(), clock, calendar }
    }

    fn requester(&self, role: Role, department_id: Option<Id>) -> Requester {
        Requester { role, department_id }
    }

    async fn room_view(&self, room_id: Id) -> Result<(RoomView, salastech_core::Room)> {
        let room_repo = RoomRepository::new(self.db.clone());
        let room = run_with_retry(|| room_repo.find_by_id(room_id))?
            .ok_or_else(|| Error::NotFound { entity: "Room".into(), id: room_id.to_string() })?;
        Ok((RoomView { status: room.status, department_id: room.department_id }, room))
    }

    /// Create a reservation. Acquires the room's lock, re-validates policy
    /// and conflicts inside the critical section, decides the initial status,
    /// then persists.
    pub async fn create(
        &self,
        requester_role: Role,
        requester_department: Option<Id>,
        user_id: Id,
        room_id: Id,
        title: String,
        description: Option<String>,
        start_at: Timestamp,
        end_at: Timestamp,
    ) -> Result<Reservation> {
        let lock = self.locks.lock_for(room_id);
        let _guard = timeout(LOCK_TIMEOUT, lock.lock())
            .await
            .map_err(|_| Error::DeadlineExceeded)?;

        let (room_view, _room) = self.room_view(room_id).await?;
        let now = self.clock.now();
        let requester = self.requester(requester_role, requester_department);

        policy::validate(&requester, &room_view, start_at, end_at, now, &self.calendar)
            .map_err(Error::from)?;

        let reservation_repo = ReservationRepository::new(self.db.clone());
        let conflicts = run_with_retry(|| reservation_repo.find_conflicts(room_id, start_at, end_at, None))?;
        if !conflicts.is_empty() {
            return Err(Error::Conflict { conflicting_ids: conflicts.iter().map(|r| r.id).collect() });
        }

        let status = policy::initial_status(requester_role, end_at - start_at);
        let mut reservation = Reservation::new(room_id, user_id, title, description, start_at, end_at, status);
        if status == ReservationStatus::Confirmed && requester_role.auto_confirms() {
            reservation.approve(user_id, now);
            // auto_confirms via role, not scheduler, but there's no separate
            // human approver here — record the requester as approver only if
            // they can also approve; otherwise leave unapproved-but-confirmed.
            if !requester_role.can_approve() {
                reservation.approved_by = None;
            }
        }

        run_with_retry(|| reservation_repo.create(&reservation))?;
        Ok(reservation)
    }

    /// Change a reservation's interval. Non-admins revert to PENDING; the
    /// conflict and policy checks re-run against the new interval.
    pub async fn reschedule(
        &self,
        requester_role: Role,
        requester_department: Option<Id>,
        reservation_id: Id,
        new_start: Timestamp,
        new_end: Timestamp,
    ) -> Result<Reservation> {
        let reservation_repo = ReservationRepository::new(self.db.clone());
        let mut reservation = run_with_retry(|| reservation_repo.find_by_id(reservation_id))?
            .ok_or_else(|| Error::NotFound { entity: "Reservation".into(), id: reservation_id.to_string() })?;

        if reservation.status.is_terminal() {
            return Err(Error::TerminalState);
        }

        let room_id = reservation.room_id;
        let lock = self.locks.lock_for(room_id);
        let _guard = timeout(LOCK_TIMEOUT, lock.lock()).await.map_err(|_| Error::DeadlineExceeded)?;

        let (room_view, _room) = self.room_view(room_id).await?;
        let now = self.clock.now();
        let requester = self.requester(requester_role, requester_department);

        policy::validate(&requester, &room_view, new_start, new_end, now, &self.calendar)
            .map_err(Error::from)?;

        let conflicts =
            run_with_retry(|| reservation_repo.find_conflicts(room_id, new_start, new_end, Some(reservation_id)))?;
        if !conflicts.is_empty() {
            return Err(Error::Conflict { conflicting_ids: conflicts.iter().map(|r| r.id).collect() });
        }

        reservation.start_at = new_start;
        reservation.end_at = new_end;
        if !requester_role.can_approve() {
            reservation.revert_to_pending(now);
        } else {
            reservation.updated_at = now;
        }

        run_with_retry(|| reservation_repo.update(&reservation))?;
        Ok(reservation)
    }

    pub async fn approve(&self, approver_id: Id, reservation_id: Id) -> Result<Reservation> {
        let repo = ReservationRepository::new(self.db.clone());
        let mut reservation = run_with_retry(|| repo.find_by_id(reservation_id))?
            .ok_or_else(|| Error::NotFound { entity: "Reservation".into(), id: reservation_id.to_string() })?;
        if reservation.status != ReservationStatus::Pending {
            return Err(Error::TerminalState);
        }
        reservation.approve(approver_id, self.clock.now());
        run_with_retry(|| repo.update(&reservation))?;
        Ok(reservation)
    }

    pub async fn reject(&self, reservation_id: Id, reason: String) -> Result<Reservation> {
        if reason.trim().is_empty() {
            return Err(Error::Validation("a reason is required to reject a reservation".into()));
        }
        let repo = ReservationRepository::new(self.db.clone());
        let mut reservation = run_with_retry(|| repo.find_by_id(reservation_id))?
            .ok_or_else(|| Error::NotFound { entity: "Reservation".into(), id: reservation_id.to_string() })?;
        if reservation.status != ReservationStatus::Pending {
            return Err(Error::TerminalState);
        }
        reservation.reject(reason, self.clock.now());
        run_with_retry(|| repo.update(&reservation))?;
        Ok(reservation)
    }

    /// Cancel a reservation. The actor must be its requester or an
    /// admin/manager; non-admins additionally need at least 2 hours' notice
    /// ahead of the reservation's start, or (if it has already started) a
    /// non-empty reason.
    pub async fn cancel(
        &self,
        requester_role: Role,
        requester_id: Id,
        // Cancellation is ownership-scoped, not department-scoped (unlike
        // creation) — carried through for signature symmetry with
        // `create`/`reschedule` and kept available for any future
        // department-level audit/notification hook.
        _requester_department: Option<Id>,
        reservation_id: Id,
        reason: Option<String>,
    ) -> Result<Reservation> {
        let repo = ReservationRepository::new(self.db.clone());
        let mut reservation = run_with_retry(|| repo.find_by_id(reservation_id))?
            .ok_or_else(|| Error::NotFound { entity: "Reservation".into(), id: reservation_id.to_string() })?;

        let is_privileged = requester_role.can_approve();
        if reservation.user_id != requester_id && !is_privileged {
            return Err(Error::Forbidden("only the reservation's requester or an admin/manager can cancel it".into()));
        }

        if reservation.status.is_terminal() {
            return Err(Error::TerminalState);
        }

        let now = self.clock.now();
        if !is_privileged && reservation.start_at - now < CANCEL_CUTOFF {
            if reservation.start_at <= now {
                if reason.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(Error::Validation(
                        "a reason is required to cancel a reservation that has already started".into(),
                    ));
                }
            } else {
                return Err(Error::Validation(
                    "reservations can only be cancelled at least 2 hours before their start".into(),
                ));
            }
        }

        reservation.cancel(reason, now);
        run_with_retry(|| repo.update(&reservation))?;
        Ok(reservation)
    }
}

/// Retry a fallible storage operation up to `MAX_STORAGE_RETRIES` times
/// before surfacing `StorageUnavailable`.
fn run_with_retry<T>(mut op: impl FnMut() -> crate::Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < MAX_STORAGE_RETRIES => {
                attempt += 1;
                tracing::warn!(attempt, error = %e, "storage operation failed, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salastech_core::clock::FixedClock;
    use salastech_core::{Department, Room, User};
    use chrono::TimeZone;

    fn setup() -> (Database, Id, Id) {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();

        let dept_repo = DepartmentRepository::new(db.clone());
        let dept = Department::new("Eng".into(), "ENG".into());
        dept_repo.create(&dept).unwrap();

        let user_repo = crate::UserRepository::new(db.clone());
        let user = User::new("A".into(), "B".into(), "a@example.com".into(), "h".into(), Role::User, Some(dept.id));
        user_repo.create(&user).unwrap();

        let room_repo = RoomRepository::new(db.clone());
        let room = Room::new("ENG-1".into(), "Room 1".into(), 10, "Main".into(), 1, dept.id);
        room_repo.create(&room).unwrap();

        (db, room.id, user.id)
    }

    #[tokio::test]
    async fn happy_booking_by_manager_is_confirmed_and_self_approved() {
        let (db, room_id, user_id) = setup();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();

        let reservation = coordinator
            .create(Role::Manager, None, user_id, room_id, "Team sync".into(), None, start, end)
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.approved_by, Some(user_id));
        assert_eq!(reservation.approved_at, Some(now));
    }

    #[tokio::test]
    async fn short_notice_is_rejected_with_policy_violation() {
        let (db, room_id, user_id) = setup();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 11, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap();

        let err = coordinator
            .create(Role::Manager, None, user_id, room_id, "Too soon".into(), None, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation(PolicyViolation::NoticeTooShort)));
    }

    #[tokio::test]
    async fn second_overlapping_create_is_rejected() {
        let (db, room_id, user_id) = setup();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();

        let first = coordinator
            .create(Role::Manager, None, user_id, room_id, "First".into(), None, start, end)
            .await
            .unwrap();
        assert_eq!(first.status, ReservationStatus::Confirmed);

        let err = coordinator
            .create(
                Role::Manager,
                None,
                user_id,
                room_id,
                "Second".into(),
                None,
                start + chrono::Duration::minutes(30),
                end + chrono::Duration::minutes(30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn department_scoped_user_cannot_book_another_departments_room() {
        let (db, room_id, user_id) = setup();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();

        let err = coordinator
            .create(Role::User, Some(Id::nil()), user_id, room_id, "First".into(), None, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation(PolicyViolation::CrossDepartmentForbidden)));
    }

    /// P5: two concurrent `create` calls targeting the same room and
    /// overlapping intervals — exactly one succeeds, the other sees CONFLICT.
    /// The per-room lock is what makes this deterministic rather than a
    /// race on which writer's SELECT runs first.
    #[tokio::test]
    async fn concurrent_overlapping_creates_exactly_one_wins() {
        let (db, room_id, user_id) = setup();
        let now = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap();
        let clock = FixedClock::new(now);
        let coordinator = Arc::new(BookingCoordinator::new(db, clock, Calendar::brazilian_federal()));

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();

        let a = coordinator.clone();
        let b = coordinator.clone();
        let (r1, r2) = tokio::join!(
            a.create(Role::Manager, None, user_id, room_id, "A".into(), None, start, end),
            b.create(Role::Manager, None, user_id, room_id, "B".into(), None, start, end),
        );

        let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&r1, &r2].iter().filter(|r| matches!(r, Err(Error::Conflict { .. }))).count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    /// Scenario E: CONFIRMED -> IN_PROGRESS -> FINISHED, then cancel is rejected.
    #[tokio::test]
    async fn finished_reservation_cannot_be_cancelled() {
        let (db, room_id, user_id) = setup();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();

        let repo = ReservationRepository::new(db.clone());
        let mut reservation =
            Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        reservation.start(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap());
        reservation.finish(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap());
        repo.create(&reservation).unwrap();

        let clock = FixedClock::new(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 5, 0).unwrap());
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let err = coordinator.cancel(Role::User, user_id, None, reservation.id, None).await.unwrap_err();
        assert!(matches!(err, Error::TerminalState));
    }

    #[tokio::test]
    async fn non_owner_non_admin_cannot_cancel_someone_elses_reservation() {
        let (db, room_id, user_id) = setup();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let repo = ReservationRepository::new(db.clone());
        let reservation =
            Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        repo.create(&reservation).unwrap();

        let clock = FixedClock::new(chrono::Utc.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).unwrap());
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let other_user = Id::new_v4();
        let err = coordinator.cancel(Role::User, other_user, None, reservation.id, None).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn non_admin_cannot_cancel_within_two_hours_of_start() {
        let (db, room_id, user_id) = setup();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let repo = ReservationRepository::new(db.clone());
        let reservation =
            Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        repo.create(&reservation).unwrap();

        let clock = FixedClock::new(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 13, 0, 0).unwrap());
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let err = coordinator.cancel(Role::User, user_id, None, reservation.id, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn non_admin_cancelling_a_started_reservation_needs_a_reason() {
        let (db, room_id, user_id) = setup();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let repo = ReservationRepository::new(db.clone());
        let mut reservation =
            Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        reservation.start(start);
        repo.create(&reservation).unwrap();

        let clock = FixedClock::new(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 30, 0).unwrap());
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let without_reason = coordinator.cancel(Role::User, user_id, None, reservation.id, None).await.unwrap_err();
        assert!(matches!(without_reason, Error::Validation(_)));

        let with_reason = coordinator
            .cancel(Role::User, user_id, None, reservation.id, Some("no longer needed".into()))
            .await
            .unwrap();
        assert_eq!(with_reason.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn admin_can_cancel_any_reservation_at_any_time() {
        let (db, room_id, user_id) = setup();
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let repo = ReservationRepository::new(db.clone());
        let reservation =
            Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        repo.create(&reservation).unwrap();

        let clock = FixedClock::new(chrono::Utc.with_ymd_and_hms(2025, 4, 15, 13, 59, 0).unwrap());
        let coordinator = BookingCoordinator::new(db, clock, Calendar::brazilian_federal());

        let admin_id = Id::new_v4();
        let cancelled = coordinator.cancel(Role::Admin, admin_id, None, reservation.id, None).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }
}
