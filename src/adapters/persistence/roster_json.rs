//! Imports the trainer roster from a JSON file into a TrainerRepo.
//!
//! Format:
//! ```json
//! [{"id": 1, "name": "Dana", "specialty": "Strength",
//!   "availability": {"monday": "09:00-17:00", "friday": "07:00-12:00"}}]
//! ```
//! Unknown weekday keys and malformed hours are logged and skipped.

use crate::domain::availability::parse_weekday;
use crate::domain::{DomainError, Trainer, WeeklyAvailability};
use crate::ports::TrainerRepo;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: i64,
    name: String,
    #[serde(default)]
    specialty: Option<String>,
    /// weekday name -> "HH:MM-HH:MM"; "24:00" as the end means open until midnight
    #[serde(default)]
    availability: BTreeMap<String, String>,
}

/// JSON roster file.
pub struct RosterJson {
    path: PathBuf,
}

impl RosterJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read and parse the roster. A missing file yields an empty roster.
    pub async fn load(&self) -> Result<Vec<Trainer>, DomainError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => parse_roster(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no roster file, skipping import");
                Ok(Vec::new())
            }
            Err(e) => Err(DomainError::Config(format!(
                "read roster {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Load the roster and upsert every trainer. Returns how many were imported.
    pub async fn import_into(&self, repo: &dyn TrainerRepo) -> Result<usize, DomainError> {
        let trainers = self.load().await?;
        for trainer in &trainers {
            repo.upsert_trainer(trainer).await?;
        }
        if !trainers.is_empty() {
            info!(
                path = %self.path.display(),
                count = trainers.len(),
                "roster imported"
            );
        }
        Ok(trainers.len())
    }
}

/// Parse roster JSON text into trainers.
pub fn parse_roster(json: &str) -> Result<Vec<Trainer>, DomainError> {
    let entries: Vec<RosterEntry> =
        serde_json::from_str(json).map_err(|e| DomainError::Config(format!("roster: {}", e)))?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let mut days = Vec::with_capacity(entry.availability.len());
            for (key, hours) in entry.availability {
                match parse_weekday(&key) {
                    Some(day) => days.push((day, hours)),
                    None => warn!(trainer_id = entry.id, key = %key, "unknown weekday in roster"),
                }
            }
            let (availability, rejected) = WeeklyAvailability::parse_lenient(days);
            for (day, reason) in rejected {
                warn!(trainer_id = entry.id, %day, code = reason.code(), "{}", reason);
            }
            Trainer {
                id: entry.id,
                name: entry.name,
                specialty: entry.specialty,
                availability,
            }
        })
        .collect())
}
