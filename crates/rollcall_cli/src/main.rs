//! CLI probe entry point.
//!
//! # Responsibility
//! - Verify `rollcall_core` linkage with deterministic output.
//! - Given a database path, open it and print each session with seats left.

use rollcall_core::{open_db, SessionRepository, SqliteSessionRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("rollcall_core ping={}", rollcall_core::ping());
    println!("rollcall_core version={}", rollcall_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match list_sessions(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rollcall_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn list_sessions(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let sessions = SqliteSessionRepository::new(&conn).list_sessions()?;
    println!("sessions={}", sessions.len());
    for session in sessions {
        let seats_left = session
            .seats_left()
            .map_or_else(|| "unlimited".to_string(), |seats| seats.to_string());
        println!(
            "{} status={} start_at={} confirmed={} waitlist={} seats_left={} topic={}",
            session.id,
            session.status.as_str(),
            session.start_at,
            session.confirmed_count,
            session.waitlist_count,
            seats_left,
            session.topic
        );
    }
    Ok(())
}
