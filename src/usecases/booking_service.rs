//! Booking flow: free slots -> validate -> conditional insert -> notify.
//!
//! - Free slots come from the trainer's weekly availability minus that day's bookings
//! - New bookings are validated in the domain, then inserted only if still free
//! - Status changes go through the domain state machine and a compare-and-set update
//! - Notifications are best effort; a failed notification never undoes a booking

use crate::domain::slots::enumerate_free_slots;
use crate::domain::{
    Appointment, BookingRequest, BookingStatus, CandidateSlot, DomainError, Rejection, Trainer,
    status, validate_booking,
};
use crate::ports::{BookingRepo, NotificationPort, TrainerRepo};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{info, warn};

/// Compare-and-set attempts for one status change before giving up.
const STATUS_ATTEMPTS: usize = 2;

/// Booking service. Coordinates trainer availability, appointment storage and notifications.
pub struct BookingService {
    trainers: Arc<dyn TrainerRepo>,
    bookings: Arc<dyn BookingRepo>,
    notifier: Arc<dyn NotificationPort>,
    webhook: Option<Arc<dyn NotificationPort>>,
}

impl BookingService {
    pub fn new(
        trainers: Arc<dyn TrainerRepo>,
        bookings: Arc<dyn BookingRepo>,
        notifier: Arc<dyn NotificationPort>,
        webhook: Option<Arc<dyn NotificationPort>>,
    ) -> Self {
        Self {
            trainers,
            bookings,
            notifier,
            webhook,
        }
    }

    pub async fn trainers(&self) -> Result<Vec<Trainer>, DomainError> {
        self.trainers.list_trainers().await
    }

    async fn trainer(&self, trainer_id: i64) -> Result<Trainer, DomainError> {
        self.trainers
            .get_trainer(trainer_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Trainer {}", trainer_id)))
    }

    /// Free 30-minute slots of a trainer on `date`, earliest first.
    pub async fn free_slots(
        &self,
        trainer_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<CandidateSlot>, DomainError> {
        let trainer = self.trainer(trainer_id).await?;
        let booked = self.bookings.booked_intervals(trainer_id, date).await?;
        Ok(enumerate_free_slots(&trainer.availability, &booked, date))
    }

    /// Free slots that can still be booked at `now` (start strictly in the future).
    pub async fn bookable_slots(
        &self,
        trainer_id: i64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<CandidateSlot>, DomainError> {
        let mut slots = self.free_slots(trainer_id, date).await?;
        slots.retain(|s| s.start > now);
        Ok(slots)
    }

    /// Book a session. Rejections (`past-start`, `overlap`, ...) come back as
    /// `DomainError::Rejected`.
    pub async fn book(
        &self,
        member_id: i64,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, DomainError> {
        let trainer = self.trainer(request.trainer_id).await?;
        let booked = self
            .bookings
            .booked_between(
                request.trainer_id,
                request.proposed_start,
                request.proposed_end,
            )
            .await?;

        if let Err(rejection) = validate_booking(&request, &booked, now) {
            info!(
                member_id,
                trainer_id = request.trainer_id,
                code = rejection.code(),
                "booking rejected"
            );
            return Err(rejection.into());
        }

        // A concurrent booking may have landed between the read and the insert.
        let Some(appointment) = self
            .bookings
            .insert_if_free(member_id, &request, now)
            .await?
        else {
            warn!(
                member_id,
                trainer_id = request.trainer_id,
                "slot taken concurrently"
            );
            return Err(Rejection::Overlap.into());
        };

        info!(
            appointment_id = appointment.id,
            member_id,
            trainer_id = trainer.id,
            start = %appointment.start,
            "session booked"
        );
        self.notify_member(
            member_id,
            &format!(
                "Session with {} booked for {}.",
                trainer.name,
                appointment.start.format("%a %d %b %H:%M")
            ),
        )
        .await;

        Ok(appointment)
    }

    /// Member cancels one of their own upcoming sessions.
    pub async fn cancel(
        &self,
        member_id: i64,
        appointment_id: i64,
        now: NaiveDateTime,
    ) -> Result<Appointment, DomainError> {
        let appointment = self.appointment(appointment_id).await?;
        if appointment.member_id != member_id {
            return Err(Rejection::NotOwner.into());
        }
        let cancelled = self
            .change_status(appointment, BookingStatus::Cancelled, now)
            .await?;

        self.notify_member(
            member_id,
            &format!(
                "Session on {} was cancelled.",
                cancelled.start.format("%a %d %b %H:%M")
            ),
        )
        .await;
        Ok(cancelled)
    }

    /// Staff confirms a scheduled session.
    pub async fn confirm(
        &self,
        appointment_id: i64,
        now: NaiveDateTime,
    ) -> Result<Appointment, DomainError> {
        let appointment = self.appointment(appointment_id).await?;
        let member_id = appointment.member_id;
        let confirmed = self
            .change_status(appointment, BookingStatus::Confirmed, now)
            .await?;
        self.notify_member(
            member_id,
            &format!(
                "Your session on {} is confirmed.",
                confirmed.start.format("%a %d %b %H:%M")
            ),
        )
        .await;
        Ok(confirmed)
    }

    /// Staff marks a confirmed session as done.
    pub async fn complete(
        &self,
        appointment_id: i64,
        now: NaiveDateTime,
    ) -> Result<Appointment, DomainError> {
        let appointment = self.appointment(appointment_id).await?;
        self.change_status(appointment, BookingStatus::Completed, now)
            .await
    }

    async fn appointment(&self, appointment_id: i64) -> Result<Appointment, DomainError> {
        self.bookings
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Appointment {}", appointment_id)))
    }

    async fn change_status(
        &self,
        mut appointment: Appointment,
        to: BookingStatus,
        now: NaiveDateTime,
    ) -> Result<Appointment, DomainError> {
        for _ in 0..STATUS_ATTEMPTS {
            let from = appointment.status;
            let next = status::transition(from, to, appointment.start, now)?;
            if self
                .bookings
                .update_status(appointment.id, from, next)
                .await?
            {
                info!(appointment_id = appointment.id, %from, to = %next, "status changed");
                appointment.status = next;
                return Ok(appointment);
            }
            // Someone else moved it first; re-check against the fresh row.
            appointment = self.appointment(appointment.id).await?;
        }

        status::transition(appointment.status, to, appointment.start, now)?;
        warn!(
            appointment_id = appointment.id,
            status = %appointment.status,
            %to,
            "status changed concurrently"
        );
        Err(Rejection::ConcurrentUpdate.into())
    }

    async fn notify_member(&self, member_id: i64, message: &str) {
        if let Err(e) = self.notifier.notify(member_id, message).await {
            warn!(member_id, error = %e, "failed to store notification");
        }
        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.notify(member_id, message).await {
                warn!(member_id, error = %e, "webhook notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SqliteRepo;
    use crate::domain::{BookedInterval, WeeklyAvailability};
    use crate::ports::{InboxPort, TrainerRepo};
    use chrono::{Duration, Weekday};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records webhook calls instead of sending them.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait::async_trait]
    impl NotificationPort for RecordingNotifier {
        async fn notify(&self, member_id: i64, message: &str) -> Result<(), DomainError> {
            self.sent
                .lock()
                .unwrap()
                .push((member_id, message.to_string()));
            Ok(())
        }
    }

    struct FailingNotifier;

    /// Appointment storage that replays scripted answers. Every insert loses
    /// the race; `get_appointment` walks through `rows`, repeating the last one.
    #[derive(Default)]
    struct ScriptedBookings {
        rows: Mutex<VecDeque<Appointment>>,
        updates: Mutex<VecDeque<bool>>,
        attempted: Mutex<Vec<(BookingStatus, BookingStatus)>>,
    }

    impl ScriptedBookings {
        fn new(rows: Vec<Appointment>, updates: Vec<bool>) -> Self {
            Self {
                rows: Mutex::new(rows.into()),
                updates: Mutex::new(updates.into()),
                attempted: Mutex::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl BookingRepo for ScriptedBookings {
        async fn booked_intervals(
            &self,
            _trainer_id: i64,
            _date: NaiveDate,
        ) -> Result<Vec<BookedInterval>, DomainError> {
            Ok(vec![])
        }

        async fn booked_between(
            &self,
            _trainer_id: i64,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<Vec<BookedInterval>, DomainError> {
            Ok(vec![])
        }

        async fn insert_if_free(
            &self,
            _member_id: i64,
            _request: &BookingRequest,
            _created_at: NaiveDateTime,
        ) -> Result<Option<Appointment>, DomainError> {
            Ok(None)
        }

        async fn get_appointment(
            &self,
            _appointment_id: i64,
        ) -> Result<Option<Appointment>, DomainError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.len() > 1 {
                Ok(rows.pop_front())
            } else {
                Ok(rows.front().cloned())
            }
        }

        async fn update_status(
            &self,
            _appointment_id: i64,
            from: BookingStatus,
            to: BookingStatus,
        ) -> Result<bool, DomainError> {
            self.attempted.lock().unwrap().push((from, to));
            Ok(self.updates.lock().unwrap().pop_front().unwrap_or(false))
        }

        async fn member_appointments(
            &self,
            _member_id: i64,
        ) -> Result<Vec<Appointment>, DomainError> {
            Ok(vec![])
        }

        async fn save_rating(
            &self,
            _appointment_id: i64,
            _rating: u8,
            _feedback: Option<&str>,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }
    }

    #[async_trait::async_trait]
    impl NotificationPort for FailingNotifier {
        async fn notify(&self, _member_id: i64, _message: &str) -> Result<(), DomainError> {
            Err(DomainError::Notify("offline".into()))
        }
    }

    /// 2030-01-07 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        monday().and_hms_opt(h, m, 0).unwrap()
    }

    fn week_before() -> NaiveDateTime {
        at(8, 0) - Duration::days(7)
    }

    fn request(start: NaiveDateTime, end: NaiveDateTime) -> BookingRequest {
        BookingRequest {
            trainer_id: 1,
            proposed_start: start,
            proposed_end: end,
        }
    }

    fn appointment(status: BookingStatus) -> Appointment {
        Appointment {
            id: 1,
            member_id: 5,
            trainer_id: 1,
            trainer_name: Some("Dana".to_string()),
            start: at(9, 0),
            end: at(9, 30),
            status,
            rating: None,
            feedback: None,
            created_at: week_before(),
        }
    }

    async fn repo_with_trainer() -> Arc<SqliteRepo> {
        let repo = Arc::new(SqliteRepo::open_in_memory().await.unwrap());
        repo.upsert_trainer(&Trainer {
            id: 1,
            name: "Dana".to_string(),
            specialty: None,
            availability: WeeklyAvailability::new()
                .with(Weekday::Mon, "09:00-11:00".parse().unwrap()),
        })
        .await
        .unwrap();
        repo
    }

    /// Trainers from SQLite, appointments from a script, inbox recorded.
    async fn scripted(
        bookings: ScriptedBookings,
    ) -> (BookingService, Arc<ScriptedBookings>, Arc<RecordingNotifier>) {
        let bookings = Arc::new(bookings);
        let inbox = Arc::new(RecordingNotifier::default());
        let service = BookingService::new(
            repo_with_trainer().await,
            bookings.clone(),
            inbox.clone(),
            None,
        );
        (service, bookings, inbox)
    }

    async fn setup(
        webhook: Option<Arc<dyn NotificationPort>>,
    ) -> (BookingService, Arc<SqliteRepo>) {
        let repo = repo_with_trainer().await;
        let service = BookingService::new(repo.clone(), repo.clone(), repo.clone(), webhook);
        (service, repo)
    }

    #[tokio::test]
    async fn test_free_slots_reflect_bookings() {
        let (service, _) = setup(None).await;
        assert_eq!(service.free_slots(1, monday()).await.unwrap().len(), 4);

        service
            .book(5, request(at(9, 30), at(10, 30)), week_before())
            .await
            .unwrap();

        let labels: Vec<String> = service
            .free_slots(1, monday())
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels, ["09:00-09:30", "10:30-11:00"]);
    }

    #[tokio::test]
    async fn test_unknown_trainer() {
        let (service, _) = setup(None).await;
        let err = service.free_slots(42, monday()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bookable_slots_hide_started_ones() {
        let (service, _) = setup(None).await;
        let slots = service.bookable_slots(1, monday(), at(9, 30)).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, at(10, 0));
    }

    #[tokio::test]
    async fn test_book_rejections_carry_codes() {
        let (service, _) = setup(None).await;
        service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap();

        let overlap = service
            .book(6, request(at(9, 15), at(9, 45)), week_before())
            .await
            .unwrap_err();
        assert_eq!(overlap.rejection().map(Rejection::code), Some("overlap"));

        let past = service
            .book(6, request(at(10, 0), at(10, 30)), at(10, 0))
            .await
            .unwrap_err();
        assert_eq!(past.rejection().map(Rejection::code), Some("past-start"));
    }

    #[tokio::test]
    async fn test_book_notifies_inbox_and_webhook() {
        let recorder = Arc::new(RecordingNotifier::default());
        let webhook: Arc<dyn NotificationPort> = recorder.clone();
        let (service, repo) = setup(Some(webhook)).await;

        service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap();

        let inbox = repo.list_notifications(5, true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("Dana"));
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_webhook_keeps_booking() {
        let webhook: Arc<dyn NotificationPort> = Arc::new(FailingNotifier);
        let (service, repo) = setup(Some(webhook)).await;
        let appt = service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap();
        assert!(repo.get_appointment(appt.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let (service, _) = setup(None).await;
        let appt = service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap();

        let not_owner = service.cancel(6, appt.id, week_before()).await.unwrap_err();
        assert_eq!(not_owner.rejection(), Some(&Rejection::NotOwner));

        let too_late = service.cancel(5, appt.id, at(9, 0)).await.unwrap_err();
        assert_eq!(too_late.rejection(), Some(&Rejection::CancelNotAllowed));

        let cancelled = service.cancel(5, appt.id, week_before()).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let twice = service.cancel(5, appt.id, week_before()).await.unwrap_err();
        assert_eq!(twice.rejection(), Some(&Rejection::CancelNotAllowed));

        // The cancelled slot is bookable again.
        assert_eq!(service.free_slots(1, monday()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_confirm_then_complete() {
        let (service, _) = setup(None).await;
        let appt = service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap();

        let skipped = service.complete(appt.id, at(10, 0)).await.unwrap_err();
        assert_eq!(skipped.rejection().map(Rejection::code), Some("invalid-transition"));

        service.confirm(appt.id, week_before()).await.unwrap();
        let done = service.complete(appt.id, at(10, 0)).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_overlap() {
        let (service, _, inbox) = scripted(ScriptedBookings::default()).await;

        let err = service
            .book(5, request(at(9, 0), at(9, 30)), week_before())
            .await
            .unwrap_err();

        assert_eq!(err.rejection().map(Rejection::code), Some("overlap"));
        assert!(inbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_lost_to_cancellation_is_rechecked() {
        let (service, bookings, inbox) = scripted(ScriptedBookings::new(
            vec![
                appointment(BookingStatus::Scheduled),
                appointment(BookingStatus::Cancelled),
            ],
            vec![false],
        ))
        .await;

        let err = service.cancel(5, 1, week_before()).await.unwrap_err();

        assert_eq!(err.rejection(), Some(&Rejection::CancelNotAllowed));
        assert_eq!(bookings.attempted.lock().unwrap().len(), 1);
        assert!(inbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_retried_from_fresh_row() {
        let (service, bookings, inbox) = scripted(ScriptedBookings::new(
            vec![
                appointment(BookingStatus::Scheduled),
                appointment(BookingStatus::Confirmed),
            ],
            vec![false, true],
        ))
        .await;

        let cancelled = service.cancel(5, 1, week_before()).await.unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(
            *bookings.attempted.lock().unwrap(),
            [
                (BookingStatus::Scheduled, BookingStatus::Cancelled),
                (BookingStatus::Confirmed, BookingStatus::Cancelled),
            ]
        );
        assert_eq!(inbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_that_keeps_moving_is_concurrent_update() {
        let (service, bookings, _) = scripted(ScriptedBookings::new(
            vec![
                appointment(BookingStatus::Scheduled),
                appointment(BookingStatus::Confirmed),
                appointment(BookingStatus::Scheduled),
            ],
            vec![false, false],
        ))
        .await;

        let err = service.cancel(5, 1, week_before()).await.unwrap_err();

        assert_eq!(err.rejection().map(Rejection::code), Some("concurrent-update"));
        assert_eq!(bookings.attempted.lock().unwrap().len(), 2);
    }
}
