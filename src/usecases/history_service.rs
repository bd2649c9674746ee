//! Member session history: upcoming sessions, past sessions, ratings, CSV export.

use crate::adapters::export::appointments_to_csv;
use crate::domain::{Appointment, BookingStatus, DomainError, Rejection};
use crate::ports::BookingRepo;
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub struct HistoryService {
    bookings: Arc<dyn BookingRepo>,
}

impl HistoryService {
    pub fn new(bookings: Arc<dyn BookingRepo>) -> Self {
        Self { bookings }
    }

    /// Active sessions that have not started yet, earliest first.
    pub async fn upcoming(
        &self,
        member_id: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, DomainError> {
        let all = self.bookings.member_appointments(member_id).await?;
        Ok(all.into_iter().filter(|a| is_upcoming(a, now)).collect())
    }

    /// Everything that is not upcoming (past or cancelled), latest first.
    pub async fn history(
        &self,
        member_id: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, DomainError> {
        let mut past: Vec<Appointment> = self
            .bookings
            .member_appointments(member_id)
            .await?
            .into_iter()
            .filter(|a| !is_upcoming(a, now))
            .collect();
        past.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(past)
    }

    /// Rate a completed session once, 1 to 5 stars.
    pub async fn rate(
        &self,
        member_id: i64,
        appointment_id: i64,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<(), DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(Rejection::InvalidRating(rating).into());
        }
        let appointment = self
            .bookings
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Appointment {}", appointment_id)))?;
        if appointment.member_id != member_id {
            return Err(Rejection::NotOwner.into());
        }
        if appointment.status != BookingStatus::Completed || appointment.rating.is_some() {
            return Err(Rejection::NotRateable.into());
        }

        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());
        if !self
            .bookings
            .save_rating(appointment_id, rating, feedback)
            .await?
        {
            return Err(Rejection::NotRateable.into());
        }
        info!(appointment_id, member_id, rating, "session rated");
        Ok(())
    }

    /// Write the member's history as CSV to `path`. Returns the number of rows.
    pub async fn export_history_csv(
        &self,
        member_id: i64,
        now: NaiveDateTime,
        path: &Path,
    ) -> Result<usize, DomainError> {
        let history = self.history(member_id, now).await?;
        let csv = appointments_to_csv(&history).map_err(|e| DomainError::Export(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Export(format!("create {}: {}", parent.display(), e)))?;
        }
        fs::write(path, csv)
            .await
            .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), rows = history.len(), "history exported");
        Ok(history.len())
    }
}

fn is_upcoming(appointment: &Appointment, now: NaiveDateTime) -> bool {
    appointment.status.blocks_time()
        && appointment.status != BookingStatus::Completed
        && appointment.start > now
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SqliteRepo;
    use crate::domain::BookingRequest;
    use chrono::{Duration, NaiveDate};

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    async fn book(repo: &SqliteRepo, member_id: i64, start: NaiveDateTime) -> Appointment {
        let request = BookingRequest {
            trainer_id: 1,
            proposed_start: start,
            proposed_end: start + Duration::minutes(30),
        };
        repo.insert_if_free(member_id, &request, at(1, 0))
            .await
            .unwrap()
            .unwrap()
    }

    async fn complete(repo: &SqliteRepo, id: i64) {
        repo.update_status(id, BookingStatus::Scheduled, BookingStatus::Confirmed)
            .await
            .unwrap();
        repo.update_status(id, BookingStatus::Confirmed, BookingStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upcoming_and_history_split() {
        let repo = Arc::new(SqliteRepo::open_in_memory().await.unwrap());
        let past = book(&repo, 5, at(2, 9)).await;
        let soon = book(&repo, 5, at(9, 9)).await;
        let later = book(&repo, 5, at(10, 9)).await;
        let cancelled = book(&repo, 5, at(11, 9)).await;
        book(&repo, 6, at(12, 9)).await;
        repo.update_status(cancelled.id, BookingStatus::Scheduled, BookingStatus::Cancelled)
            .await
            .unwrap();

        let service = HistoryService::new(repo.clone());
        let now = at(5, 12);

        let upcoming: Vec<i64> = service
            .upcoming(5, now)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(upcoming, [soon.id, later.id]);

        let history: Vec<i64> = service
            .history(5, now)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(history, [cancelled.id, past.id]);
    }

    #[tokio::test]
    async fn test_rate_rules() {
        let repo = Arc::new(SqliteRepo::open_in_memory().await.unwrap());
        let appt = book(&repo, 5, at(2, 9)).await;
        let service = HistoryService::new(repo.clone());

        let not_done = service.rate(5, appt.id, 4, None).await.unwrap_err();
        assert_eq!(not_done.rejection(), Some(&Rejection::NotRateable));

        complete(&repo, appt.id).await;

        let bad = service.rate(5, appt.id, 6, None).await.unwrap_err();
        assert_eq!(bad.rejection(), Some(&Rejection::InvalidRating(6)));

        let stranger = service.rate(9, appt.id, 4, None).await.unwrap_err();
        assert_eq!(stranger.rejection(), Some(&Rejection::NotOwner));

        service.rate(5, appt.id, 4, Some("  solid  ")).await.unwrap();
        let stored = repo.get_appointment(appt.id).await.unwrap().unwrap();
        assert_eq!(stored.rating, Some(4));
        assert_eq!(stored.feedback.as_deref(), Some("solid"));

        let again = service.rate(5, appt.id, 5, None).await.unwrap_err();
        assert_eq!(again.rejection(), Some(&Rejection::NotRateable));
    }

    #[tokio::test]
    async fn test_export_history_csv() {
        let repo = Arc::new(SqliteRepo::open_in_memory().await.unwrap());
        let appt = book(&repo, 5, at(2, 9)).await;
        complete(&repo, appt.id).await;
        book(&repo, 5, at(20, 9)).await;

        let service = HistoryService::new(repo.clone());
        let path = std::env::temp_dir()
            .join(format!("gym_history_{}", std::process::id()))
            .join("history.csv");
        let rows = service.export_history_csv(5, at(5, 0), &path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(rows, 1);
        assert!(content.starts_with("Date;Start;End;Trainer;Status;Rating;Feedback"));
        assert!(content.contains("2030-01-02;09:00;09:30;#1;completed;;"));
    }
}
