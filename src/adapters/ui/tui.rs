//! Implements InputPort. Inquire-based member menu.
//!
//! Book a session, review/cancel upcoming sessions, rate and export history,
//! read notifications, print a trainer's free slots as JSON.

use crate::domain::{
    Appointment, BookingRequest, BookingStatus, CandidateSlot, DomainError, Notification, Trainer,
};
use crate::ports::{InboxPort, InputPort};
use crate::usecases::{BookingService, HistoryService};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, DateSelect, InquireError, Select, Text};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Applies the prompt theme. Call once before the first prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("▶").with_fg(Color::LightRed));
    inquire::set_global_render_config(config);
}

fn input_err(e: InquireError) -> DomainError {
    DomainError::Input(e.to_string())
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Book,
    Upcoming,
    History,
    Notifications(usize),
    SlotsJson,
    Exit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Book => f.write_str("Book a session"),
            MenuItem::Upcoming => f.write_str("Upcoming sessions"),
            MenuItem::History => f.write_str("Session history"),
            MenuItem::Notifications(0) => f.write_str("Notifications"),
            MenuItem::Notifications(n) => write!(f, "Notifications ({} unread)", n),
            MenuItem::SlotsJson => f.write_str("Free slots as JSON"),
            MenuItem::Exit => f.write_str("Exit"),
        }
    }
}

/// Prompt option that shows a label and carries a value.
struct Choice<T> {
    label: String,
    value: T,
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn trainer_label(t: &Trainer) -> String {
    let days: Vec<String> = t
        .availability
        .iter()
        .map(|(day, window)| format!("{} {}", day, window))
        .collect();
    let hours = if days.is_empty() {
        "no hours".to_string()
    } else {
        days.join(", ")
    };
    match &t.specialty {
        Some(s) => format!("{} ({}) [{}]", t.name, s, hours),
        None => format!("{} [{}]", t.name, hours),
    }
}

fn appointment_line(a: &Appointment) -> String {
    let trainer = a
        .trainer_name
        .clone()
        .unwrap_or_else(|| format!("trainer #{}", a.trainer_id));
    let mut line = format!(
        "#{} {} {}-{} with {} [{}]",
        a.id,
        a.start.format("%a %d %b"),
        a.start.format("%H:%M"),
        a.end.format("%H:%M"),
        trainer,
        a.status
    );
    if let Some(r) = a.rating {
        line.push_str(&format!(" {}", "★".repeat(r as usize)));
    }
    line
}

fn notification_line(n: &Notification) -> String {
    let marker = if n.read { " " } else { "•" };
    format!(
        "{} {} {}",
        marker,
        n.created_at.format("%d %b %H:%M"),
        n.message
    )
}

/// TUI adapter. Acts for one member.
pub struct TuiInputPort {
    booking: Arc<BookingService>,
    history: Arc<HistoryService>,
    inbox: Arc<dyn InboxPort>,
    member_id: i64,
    horizon_days: u32,
    export_dir: PathBuf,
}

impl TuiInputPort {
    pub fn new(
        booking: Arc<BookingService>,
        history: Arc<HistoryService>,
        inbox: Arc<dyn InboxPort>,
        member_id: i64,
        horizon_days: u32,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            booking,
            history,
            inbox,
            member_id,
            horizon_days,
            export_dir,
        }
    }

    async fn pick_trainer(&self) -> Result<Option<Trainer>, DomainError> {
        let trainers = self.booking.trainers().await?;
        if trainers.is_empty() {
            println!("No trainers available yet.");
            return Ok(None);
        }
        let options: Vec<Choice<Trainer>> = trainers
            .into_iter()
            .map(|t| Choice {
                label: trainer_label(&t),
                value: t,
            })
            .collect();
        let picked = Select::new("Trainer:", options)
            .prompt()
            .map_err(input_err)?;
        Ok(Some(picked.value))
    }

    fn pick_date(&self) -> Result<NaiveDate, DomainError> {
        let today = Local::now().date_naive();
        let last = today + Duration::days(i64::from(self.horizon_days));
        DateSelect::new("Date:")
            .with_starting_date(today)
            .with_min_date(today)
            .with_max_date(last)
            .prompt()
            .map_err(input_err)
    }

    async fn book_flow(&self) -> Result<(), DomainError> {
        let Some(trainer) = self.pick_trainer().await? else {
            return Ok(());
        };
        let date = self.pick_date()?;

        let slots = self.booking.bookable_slots(trainer.id, date, now()).await?;
        if slots.is_empty() {
            println!("{} has no free slots on {}.", trainer.name, date.format("%a %d %b"));
            return Ok(());
        }

        let slot: CandidateSlot = Select::new("Time:", slots).prompt().map_err(input_err)?;
        let confirmed = Confirm::new(&format!(
            "Book {} on {} with {}?",
            slot,
            date.format("%a %d %b"),
            trainer.name
        ))
        .with_default(true)
        .prompt()
        .map_err(input_err)?;
        if !confirmed {
            return Ok(());
        }

        let appointment = self
            .booking
            .book(self.member_id, BookingRequest::from((trainer.id, slot)), now())
            .await?;
        println!("✓ Booked: {}", appointment_line(&appointment));
        Ok(())
    }

    async fn upcoming_flow(&self) -> Result<(), DomainError> {
        let upcoming = self.history.upcoming(self.member_id, now()).await?;
        if upcoming.is_empty() {
            println!("No upcoming sessions.");
            return Ok(());
        }
        for a in &upcoming {
            println!("  {}", appointment_line(a));
        }

        let cancel = Confirm::new("Cancel one of these?")
            .with_default(false)
            .prompt()
            .map_err(input_err)?;
        if !cancel {
            return Ok(());
        }

        let options: Vec<Choice<i64>> = upcoming
            .iter()
            .map(|a| Choice {
                label: appointment_line(a),
                value: a.id,
            })
            .collect();
        let picked = Select::new("Session to cancel:", options)
            .prompt()
            .map_err(input_err)?;
        let cancelled = self
            .booking
            .cancel(self.member_id, picked.value, now())
            .await?;
        println!("✓ Cancelled: {}", appointment_line(&cancelled));
        Ok(())
    }

    async fn history_flow(&self) -> Result<(), DomainError> {
        let history = self.history.history(self.member_id, now()).await?;
        if history.is_empty() {
            println!("No past sessions yet.");
            return Ok(());
        }
        for a in &history {
            println!("  {}", appointment_line(a));
        }

        let rateable: Vec<Choice<i64>> = history
            .iter()
            .filter(|a| a.status == BookingStatus::Completed && a.rating.is_none())
            .map(|a| Choice {
                label: appointment_line(a),
                value: a.id,
            })
            .collect();

        let mut actions = Vec::new();
        if !rateable.is_empty() {
            actions.push("Rate a session");
        }
        actions.push("Export to CSV");
        actions.push("Back");

        match Select::new("Action:", actions).prompt().map_err(input_err)? {
            "Rate a session" => {
                let picked = Select::new("Session:", rateable)
                    .prompt()
                    .map_err(input_err)?;
                let rating = CustomType::<u8>::new("Rating (1-5):")
                    .with_error_message("Enter a whole number from 1 to 5")
                    .prompt()
                    .map_err(input_err)?;
                let feedback = Text::new("Feedback (optional):")
                    .prompt()
                    .map_err(input_err)?;
                self.history
                    .rate(self.member_id, picked.value, rating, Some(feedback.as_str()))
                    .await?;
                println!("✓ Thanks for the feedback.");
            }
            "Export to CSV" => {
                let path = self
                    .export_dir
                    .join(format!("history_{}.csv", self.member_id));
                let rows = self
                    .history
                    .export_history_csv(self.member_id, now(), &path)
                    .await?;
                println!("✓ Exported {} sessions to {}", rows, path.display());
            }
            _ => {}
        }
        Ok(())
    }

    async fn notifications_flow(&self) -> Result<(), DomainError> {
        let notifications = self.inbox.list_notifications(self.member_id, false).await?;
        if notifications.is_empty() {
            println!("No notifications.");
            return Ok(());
        }
        for n in &notifications {
            println!("  {}", notification_line(n));
        }
        // Viewing the list marks everything shown as read.
        for n in notifications.iter().filter(|n| !n.read) {
            self.inbox.mark_read(self.member_id, n.id).await?;
        }
        Ok(())
    }

    async fn slots_json_flow(&self) -> Result<(), DomainError> {
        let Some(trainer) = self.pick_trainer().await? else {
            return Ok(());
        };
        let date = self.pick_date()?;
        let slots = self.booking.free_slots(trainer.id, date).await?;
        let json = serde_json::to_string_pretty(&slots)
            .map_err(|e| DomainError::Export(e.to_string()))?;
        println!("{}", json);
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let unread = self
                .inbox
                .list_notifications(self.member_id, true)
                .await?
                .len();
            let menu = vec![
                MenuItem::Book,
                MenuItem::Upcoming,
                MenuItem::History,
                MenuItem::Notifications(unread),
                MenuItem::SlotsJson,
                MenuItem::Exit,
            ];
            let choice = match Select::new("Main menu", menu).prompt() {
                Ok(choice) => choice,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(());
                }
                Err(e) => return Err(input_err(e)),
            };

            let result = match choice {
                MenuItem::Book => self.book_flow().await,
                MenuItem::Upcoming => self.upcoming_flow().await,
                MenuItem::History => self.history_flow().await,
                MenuItem::Notifications(_) => self.notifications_flow().await,
                MenuItem::SlotsJson => self.slots_json_flow().await,
                MenuItem::Exit => return Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(DomainError::Rejected(reason)) => println!("✗ {}", reason),
                Err(e @ DomainError::NotFound(_)) => println!("✗ {}", e),
                // Prompt dismissed; back to the menu.
                Err(DomainError::Input(_)) => {}
                Err(e) => return Err(e),
            }
        }
    }
}
