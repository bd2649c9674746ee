//! SQLite-backed repository via libsql. Implements TrainerRepo, BookingRepo,
//! NotificationPort and InboxPort.
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text so that string order is
//! time order. Availability is stored as the raw `HH:MM-HH:MM` string per
//! weekday and parsed on read; malformed rows are logged and treated as closed.
//! All tables live in one database file: data/gym.db

use crate::domain::availability::WEEK;
use crate::domain::{
    Appointment, BookedInterval, BookingRequest, BookingStatus, DomainError, Notification,
    Trainer, WeeklyAvailability,
};
use crate::ports::{BookingRepo, InboxPort, NotificationPort, TrainerRepo};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use libsql::{Connection, Database, params};
use std::path::Path;
use tracing::{debug, info, warn};

const SQL_TIME: &str = "%Y-%m-%d %H:%M:%S";

const TRAINERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS trainers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    specialty TEXT
)"#;

/// One row per open weekday. weekday: 0 = Monday .. 6 = Sunday.
const AVAILABILITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS trainer_availability (
    trainer_id INTEGER NOT NULL,
    weekday INTEGER NOT NULL,
    hours TEXT NOT NULL,
    PRIMARY KEY (trainer_id, weekday)
)"#;

const APPOINTMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL,
    trainer_id INTEGER NOT NULL,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled',
    rating INTEGER,
    feedback TEXT,
    created_at TEXT NOT NULL
)"#;
const APPOINTMENTS_TRAINER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_appointments_trainer_start ON appointments (trainer_id, start_at)";
const APPOINTMENTS_MEMBER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_appointments_member_start ON appointments (member_id, start_at)";

const NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0
)"#;

const APPOINTMENT_COLUMNS: &str = r#"
    a.id, a.member_id, a.trainer_id, t.name, a.start_at, a.end_at,
    a.status, a.rating, a.feedback, a.created_at
"#;

fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Repo(e.to_string())
}

fn to_sql_time(t: NaiveDateTime) -> String {
    t.format(SQL_TIME).to_string()
}

fn from_sql_time(raw: &str) -> Result<NaiveDateTime, DomainError> {
    NaiveDateTime::parse_from_str(raw, SQL_TIME)
        .map_err(|e| DomainError::Repo(format!("bad timestamp '{}': {}", raw, e)))
}

/// SQLite repository. Holds a single connection so in-memory databases stay alive.
pub struct SqliteRepo {
    _db: Database,
    conn: Connection,
}

impl SqliteRepo {
    /// Connect to (or create) `gym.db` inside `base_dir` and ensure the schema exists.
    /// Call once at startup; the returned repo is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(repo_err)?;
        let db_path = base.join("gym.db");
        let repo = Self::open(&db_path.to_string_lossy()).await?;

        // WAL: concurrent readers + one writer. PRAGMA returns a row, so consume it.
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = repo
                .conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Repo(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(repo_err)?.is_some() {}
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");
        Ok(repo)
    }

    /// Private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, DomainError> {
        Self::open(":memory:").await
    }

    async fn open(path: &str) -> Result<Self, DomainError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        for ddl in [
            TRAINERS_TABLE,
            AVAILABILITY_TABLE,
            APPOINTMENTS_TABLE,
            APPOINTMENTS_TRAINER_INDEX,
            APPOINTMENTS_MEMBER_INDEX,
            NOTIFICATIONS_TABLE,
        ] {
            conn.execute(ddl, ()).await.map_err(repo_err)?;
        }

        Ok(Self { _db: db, conn })
    }

    async fn load_availability(&self, trainer_id: i64) -> Result<WeeklyAvailability, DomainError> {
        let mut rows = self
            .conn
            .query(
                "SELECT weekday, hours FROM trainer_availability WHERE trainer_id = ?1",
                params![trainer_id],
            )
            .await
            .map_err(repo_err)?;
        let mut raw = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let weekday: i64 = row.get(0).map_err(repo_err)?;
            let hours: String = row.get::<String>(1).unwrap_or_default();
            match WEEK.get(weekday as usize) {
                Some(day) => raw.push((*day, hours)),
                None => warn!(trainer_id, weekday, "availability row with invalid weekday"),
            }
        }

        let (availability, rejected) = WeeklyAvailability::parse_lenient(raw);
        for (day, reason) in rejected {
            warn!(trainer_id, %day, code = reason.code(), "{}", reason);
        }
        Ok(availability)
    }

    fn row_to_appointment(row: &libsql::Row) -> Result<Appointment, DomainError> {
        let start: String = row.get(4).map_err(repo_err)?;
        let end: String = row.get(5).map_err(repo_err)?;
        let status: String = row.get(6).map_err(repo_err)?;
        let created_at: String = row.get(9).map_err(repo_err)?;
        Ok(Appointment {
            id: row.get(0).map_err(repo_err)?,
            member_id: row.get(1).map_err(repo_err)?,
            trainer_id: row.get(2).map_err(repo_err)?,
            trainer_name: row.get::<String>(3).ok(),
            start: from_sql_time(&start)?,
            end: from_sql_time(&end)?,
            status: status.parse()?,
            rating: row.get::<i64>(7).ok().map(|r| r as u8),
            feedback: row.get::<String>(8).ok(),
            created_at: from_sql_time(&created_at)?,
        })
    }
}

#[async_trait::async_trait]
impl TrainerRepo for SqliteRepo {
    async fn list_trainers(&self) -> Result<Vec<Trainer>, DomainError> {
        let mut rows = self
            .conn
            .query("SELECT id, name, specialty FROM trainers ORDER BY name", ())
            .await
            .map_err(repo_err)?;
        let mut headers = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let id: i64 = row.get(0).map_err(repo_err)?;
            let name: String = row.get(1).map_err(repo_err)?;
            let specialty: Option<String> = row.get::<String>(2).ok();
            headers.push((id, name, specialty));
        }

        let mut trainers = Vec::with_capacity(headers.len());
        for (id, name, specialty) in headers {
            trainers.push(Trainer {
                id,
                name,
                specialty,
                availability: self.load_availability(id).await?,
            });
        }
        Ok(trainers)
    }

    async fn get_trainer(&self, trainer_id: i64) -> Result<Option<Trainer>, DomainError> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, specialty FROM trainers WHERE id = ?1",
                params![trainer_id],
            )
            .await
            .map_err(repo_err)?;
        let Some(row) = rows.next().await.map_err(repo_err)? else {
            return Ok(None);
        };
        let name: String = row.get(0).map_err(repo_err)?;
        let specialty: Option<String> = row.get::<String>(1).ok();
        Ok(Some(Trainer {
            id: trainer_id,
            name,
            specialty,
            availability: self.load_availability(trainer_id).await?,
        }))
    }

    async fn upsert_trainer(&self, trainer: &Trainer) -> Result<(), DomainError> {
        let tx = self.conn.transaction().await.map_err(repo_err)?;
        tx.execute(
            r#"
            INSERT INTO trainers (id, name, specialty) VALUES (?1, ?2, ?3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, specialty = excluded.specialty
            "#,
            params![trainer.id, trainer.name.as_str(), trainer.specialty.as_deref()],
        )
        .await
        .map_err(repo_err)?;
        tx.execute(
            "DELETE FROM trainer_availability WHERE trainer_id = ?1",
            params![trainer.id],
        )
        .await
        .map_err(repo_err)?;
        for (day, window) in trainer.availability.iter() {
            tx.execute(
                "INSERT INTO trainer_availability (trainer_id, weekday, hours) VALUES (?1, ?2, ?3)",
                params![
                    trainer.id,
                    day.num_days_from_monday() as i64,
                    window.to_string()
                ],
            )
            .await
            .map_err(repo_err)?;
        }
        tx.commit().await.map_err(repo_err)?;
        debug!(trainer_id = trainer.id, "trainer upserted");
        Ok(())
    }
}

#[async_trait::async_trait]
impl BookingRepo for SqliteRepo {
    async fn booked_intervals(
        &self,
        trainer_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, DomainError> {
        let from = date.and_time(chrono::NaiveTime::default());
        let to = from
            .checked_add_signed(Duration::days(1))
            .unwrap_or(NaiveDateTime::MAX);
        self.booked_between(trainer_id, from, to).await
    }

    async fn booked_between(
        &self,
        trainer_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<BookedInterval>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT start_at, end_at, status
                FROM appointments
                WHERE trainer_id = ?1
                  AND status <> 'cancelled'
                  AND start_at < ?3
                  AND end_at > ?2
                ORDER BY start_at
                "#,
                params![trainer_id, to_sql_time(from), to_sql_time(to)],
            )
            .await
            .map_err(repo_err)?;
        let mut intervals = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let start: String = row.get(0).map_err(repo_err)?;
            let end: String = row.get(1).map_err(repo_err)?;
            let status: String = row.get(2).map_err(repo_err)?;
            intervals.push(BookedInterval {
                start: from_sql_time(&start)?,
                end: from_sql_time(&end)?,
                status: status.parse()?,
            });
        }
        Ok(intervals)
    }

    async fn insert_if_free(
        &self,
        member_id: i64,
        request: &BookingRequest,
        created_at: NaiveDateTime,
    ) -> Result<Option<Appointment>, DomainError> {
        // One statement: SQLite serializes writers, so the NOT EXISTS check and
        // the insert cannot interleave with another booking. The id comes from
        // RETURNING; the shared connection's last rowid may belong to another insert.
        let mut rows = self
            .conn
            .query(
                r#"
                INSERT INTO appointments (member_id, trainer_id, start_at, end_at, status, created_at)
                SELECT ?1, ?2, ?3, ?4, 'scheduled', ?5
                WHERE NOT EXISTS (
                    SELECT 1 FROM appointments
                    WHERE trainer_id = ?2
                      AND status <> 'cancelled'
                      AND start_at < ?4
                      AND end_at > ?3
                )
                RETURNING id
                "#,
                params![
                    member_id,
                    request.trainer_id,
                    to_sql_time(request.proposed_start),
                    to_sql_time(request.proposed_end),
                    to_sql_time(created_at)
                ],
            )
            .await
            .map_err(repo_err)?;

        let Some(row) = rows.next().await.map_err(repo_err)? else {
            return Ok(None);
        };
        let id: i64 = row.get(0).map_err(repo_err)?;
        // Drain so the statement completes before the follow-up read.
        while rows.next().await.map_err(repo_err)?.is_some() {}

        info!(
            appointment_id = id,
            member_id,
            trainer_id = request.trainer_id,
            "appointment inserted"
        );
        self.get_appointment(id).await
    }

    async fn get_appointment(
        &self,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, DomainError> {
        let sql = format!(
            "SELECT {} FROM appointments a LEFT JOIN trainers t ON t.id = a.trainer_id WHERE a.id = ?1",
            APPOINTMENT_COLUMNS
        );
        let mut rows = self
            .conn
            .query(&sql, params![appointment_id])
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(Self::row_to_appointment(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        appointment_id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, DomainError> {
        let changed = self
            .conn
            .execute(
                "UPDATE appointments SET status = ?3 WHERE id = ?1 AND status = ?2",
                params![appointment_id, from.as_str(), to.as_str()],
            )
            .await
            .map_err(repo_err)?;
        Ok(changed == 1)
    }

    async fn member_appointments(&self, member_id: i64) -> Result<Vec<Appointment>, DomainError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM appointments a LEFT JOIN trainers t ON t.id = a.trainer_id
            WHERE a.member_id = ?1
            ORDER BY a.start_at
            "#,
            APPOINTMENT_COLUMNS
        );
        let mut rows = self
            .conn
            .query(&sql, params![member_id])
            .await
            .map_err(repo_err)?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            appointments.push(Self::row_to_appointment(&row)?);
        }
        Ok(appointments)
    }

    async fn save_rating(
        &self,
        appointment_id: i64,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<bool, DomainError> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE appointments SET rating = ?2, feedback = ?3
                WHERE id = ?1 AND status = 'completed' AND rating IS NULL
                "#,
                params![appointment_id, rating as i64, feedback],
            )
            .await
            .map_err(repo_err)?;
        Ok(changed == 1)
    }
}

#[async_trait::async_trait]
impl NotificationPort for SqliteRepo {
    async fn notify(&self, member_id: i64, message: &str) -> Result<(), DomainError> {
        let now = chrono::Local::now().naive_local();
        self.conn
            .execute(
                "INSERT INTO notifications (member_id, message, created_at) VALUES (?1, ?2, ?3)",
                params![member_id, message, to_sql_time(now)],
            )
            .await
            .map_err(repo_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InboxPort for SqliteRepo {
    async fn list_notifications(
        &self,
        member_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, member_id, message, created_at, is_read
                FROM notifications
                WHERE member_id = ?1 AND (?2 = 0 OR is_read = 0)
                ORDER BY created_at DESC, id DESC
                "#,
                params![member_id, unread_only as i64],
            )
            .await
            .map_err(repo_err)?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let created_at: String = row.get(3).map_err(repo_err)?;
            let is_read: i64 = row.get(4).map_err(repo_err)?;
            notifications.push(Notification {
                id: row.get(0).map_err(repo_err)?,
                member_id: row.get(1).map_err(repo_err)?,
                message: row.get(2).map_err(repo_err)?,
                created_at: from_sql_time(&created_at)?,
                read: is_read != 0,
            });
        }
        Ok(notifications)
    }

    async fn mark_read(&self, member_id: i64, notification_id: i64) -> Result<(), DomainError> {
        self.conn
            .execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND member_id = ?2",
                params![notification_id, member_id],
            )
            .await
            .map_err(repo_err)?;
        Ok(())
    }
}
