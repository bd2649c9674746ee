//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use gym_booking::adapters::integrations::WebhookNotifier;
use gym_booking::adapters::persistence::{RosterJson, SqliteRepo};
use gym_booking::adapters::ui::tui::TuiInputPort;
use gym_booking::ports::{BookingRepo, InboxPort, InputPort, NotificationPort, TrainerRepo};
use gym_booking::shared::config::AppConfig;
use gym_booking::usecases::{BookingService, HistoryService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    gym_booking::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config could not be loaded, using defaults");
        AppConfig::default()
    });
    let Some(member_id) = cfg.member_id else {
        anyhow::bail!("Set GYM_BOOKING_MEMBER_ID (env or .env) to the signed-in member's id");
    };

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), member_id, "data directory");

    // --- Persistence: one SQLite file serves every repository port ---
    let sqlite_repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );
    let trainers: Arc<dyn TrainerRepo> = Arc::clone(&sqlite_repo) as Arc<dyn TrainerRepo>;
    let bookings: Arc<dyn BookingRepo> = Arc::clone(&sqlite_repo) as Arc<dyn BookingRepo>;
    let notifier: Arc<dyn NotificationPort> =
        Arc::clone(&sqlite_repo) as Arc<dyn NotificationPort>;
    let inbox: Arc<dyn InboxPort> = Arc::clone(&sqlite_repo) as Arc<dyn InboxPort>;

    // --- Roster import (trainers + weekly hours) ---
    let roster = RosterJson::new(cfg.roster_path_or_default());
    roster
        .import_into(trainers.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // --- Optional webhook ---
    let webhook: Option<Arc<dyn NotificationPort>> = match cfg.webhook_url() {
        Some(url) => {
            info!(url = %url, "webhook notifications enabled");
            Some(Arc::new(WebhookNotifier::new(url)) as Arc<dyn NotificationPort>)
        }
        None => None,
    };

    // --- Services ---
    let booking_service = Arc::new(BookingService::new(
        Arc::clone(&trainers),
        Arc::clone(&bookings),
        notifier,
        webhook,
    ));
    let history_service = Arc::new(HistoryService::new(Arc::clone(&bookings)));

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        booking_service,
        history_service,
        inbox,
        member_id,
        cfg.horizon_days_or_default(),
        data_path.join("exports"),
    ));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
