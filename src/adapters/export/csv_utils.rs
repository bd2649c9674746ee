//! CSV export of session history. Uses the `csv` crate for quoting.

use crate::domain::Appointment;

pub const HISTORY_HEADER: [&str; 7] = [
    "Date", "Start", "End", "Trainer", "Status", "Rating", "Feedback",
];

/// Convert appointments to a `;`-delimited CSV string with a header row.
pub fn appointments_to_csv(appointments: &[Appointment]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(HISTORY_HEADER)?;

    for appt in appointments {
        let trainer = appt
            .trainer_name
            .clone()
            .unwrap_or_else(|| format!("#{}", appt.trainer_id));
        let rating = appt.rating.map(|r| r.to_string()).unwrap_or_default();
        // Keep one record per line.
        let feedback = appt
            .feedback
            .as_deref()
            .unwrap_or_default()
            .replace('\n', " ")
            .replace('\r', "");

        wtr.write_record([
            appt.start.format("%Y-%m-%d").to_string(),
            appt.start.format("%H:%M").to_string(),
            appt.end.format("%H:%M").to_string(),
            trainer,
            appt.status.to_string(),
            rating,
            feedback,
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}
