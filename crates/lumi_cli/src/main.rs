//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lumi_core` linkage.
//! - Keep output deterministic apart from the current date.

use chrono::Utc;
use lumi_core::config::CoreConfig;
use lumi_core::db::{migrations, open_db_in_memory};
use lumi_core::service::progress::current_week_dates;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match CoreConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("lumi_core config error: {err}");
                std::process::exit(2);
            }
        },
        None => CoreConfig::default(),
    };

    println!("lumi_core ping={}", lumi_core::ping());
    println!("lumi_core version={}", lumi_core::core_version());
    match open_db_in_memory() {
        Ok(_) => println!("lumi_core schema_version={}", migrations::latest_version()),
        Err(err) => eprintln!("lumi_core db error: {err}"),
    }

    let today = Utc::now().with_timezone(&config.zone()).date_naive();
    let week = current_week_dates(today);
    println!(
        "lumi_core today={today} week={}..{} fallback_reminder_hour={}",
        week[0], week[6], config.fallback_reminder_hour
    );
}
