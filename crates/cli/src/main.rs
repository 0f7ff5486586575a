//! Rollcall - attendance scanner CLI
//!
//! `rollcall scan` reads decoded QR payloads from stdin (one per line), the way
//! a hardware scanner or camera decoder pipes them in.

mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use rollcall_core::application::config::{CONFIRMATION_HOLD, DEDUP_COOLDOWN_MS, THROTTLE_DELAY};
use rollcall_core::application::{ChecksumPolicy, ScannerConfig, ScannerSession};
use rollcall_core::domain::{encode, NewMissionary};
use rollcall_core::port::id_provider::UuidProvider;
use rollcall_core::port::time_provider::SystemTimeProvider;
use rollcall_core::port::MissionaryRegistry;
use rollcall_infra_sqlite::{create_pool, run_migrations, SqliteAttendanceRepository};

const DEFAULT_DB_PATH: &str = "~/.rollcall/attendance.db";

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Attendance scanner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, global = true, env = "ROLLCALL_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Read scans from stdin and mark attendance
    Scan {
        /// Queue scans and process them in the background, one at a time
        #[arg(long)]
        batch: bool,

        /// Delay between queued items (ms)
        #[arg(long, env = "ROLLCALL_THROTTLE_MS", default_value_t = THROTTLE_DELAY.as_millis() as u64)]
        throttle_ms: u64,

        /// Window in which a repeat of the same scan is ignored (ms)
        #[arg(long, env = "ROLLCALL_COOLDOWN_MS", default_value_t = DEDUP_COOLDOWN_MS)]
        cooldown_ms: i64,

        /// How long a direct-mode confirmation blocks new scans (ms)
        #[arg(long, env = "ROLLCALL_HOLD_MS", default_value_t = CONFIRMATION_HOLD.as_millis() as u64)]
        hold_ms: u64,

        /// Checksum mismatch handling: warn | reject
        #[arg(long, env = "ROLLCALL_CHECKSUM_POLICY", default_value = "warn")]
        checksum_policy: ChecksumPolicy,

        /// Print the final queue as JSON instead of a table (batch mode)
        #[arg(long)]
        json: bool,
    },

    /// Register a missionary and print the QR payload for their badge
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        age: i32,

        #[arg(long)]
        chapter: String,

        /// Scan identifier printed into the QR code
        #[arg(long)]
        id_number: String,
    },

    /// Print the checksummed QR payload for an identifier
    Payload {
        id_number: String,
    },

    /// List recorded attendance, newest first
    Attendance {
        #[arg(short, long)]
        chapter: Option<String>,
    },

    /// List registered missionaries with today's attendance
    Roster {
        #[arg(short, long)]
        chapter: Option<String>,
    },

    /// Delete a missionary and their attendance history
    Remove {
        id_number: String,
    },
}

async fn open_repository(db: &str) -> Result<Arc<SqliteAttendanceRepository>> {
    let db_path = shellexpand::tilde(db).into_owned();
    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    info!(db_path = %db_path, "Initializing database...");
    let url = format!("sqlite://{}", db_path);
    let pool = create_pool(&url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    Ok(Arc::new(SqliteAttendanceRepository::new(
        pool,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
    )))
}

async fn run_scan(session: &ScannerSession, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(raw) = line.context("Failed to read scan input")? else {
                    break;
                };
                let outcome = session.submit(&raw).await;
                if let Some(line) = output::submit_line(&raw, &outcome) {
                    println!("{}", line);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, finishing up");
                break;
            }
        }
    }

    if session.is_batch_mode() {
        session.wait_idle().await;
        let items = session.items().await;
        if json {
            println!("{}", serde_json::to_string_pretty(&items)?);
        } else {
            println!();
            println!("{}", output::queue_table(&items));
            println!("{}", output::counts_line(&session.counts().await));
        }
        session.disable_batch_mode().await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            batch,
            throttle_ms,
            cooldown_ms,
            hold_ms,
            checksum_policy,
            json,
        } => {
            let repo = open_repository(&cli.db).await?;
            let config = ScannerConfig {
                dedup_cooldown_ms: cooldown_ms,
                throttle_delay: Duration::from_millis(throttle_ms),
                confirmation_hold: Duration::from_millis(hold_ms),
                checksum_policy,
            };
            let session = ScannerSession::new(
                config,
                repo,
                Arc::new(SystemTimeProvider),
                Arc::new(UuidProvider),
            );
            if batch {
                session.enable_batch_mode().await;
            }

            eprintln!(
                "{} ({} mode, one payload per line, Ctrl+D to finish)",
                "Ready to scan".cyan().bold(),
                if batch { "batch" } else { "direct" }
            );
            run_scan(&session, json).await?;
        }

        Commands::Register {
            name,
            age,
            chapter,
            id_number,
        } => {
            let repo = open_repository(&cli.db).await?;
            let missionary = repo
                .register(&NewMissionary {
                    name,
                    age,
                    chapter,
                    id_number,
                })
                .await
                .context("Failed to register missionary")?;

            println!("{}", "✓ Missionary registered successfully".green().bold());
            println!("  {} {}", "Name:".bold(), missionary.name);
            println!("  {} {}", "Chapter:".bold(), missionary.chapter);
            println!("  {} {}", "ID:".bold(), missionary.id_number);
            println!("  {} {}", "QR payload:".bold(), encode(&missionary.id_number));
        }

        Commands::Payload { id_number } => {
            println!("{}", encode(id_number.trim()));
        }

        Commands::Attendance { chapter } => {
            let repo = open_repository(&cli.db).await?;
            let records = repo
                .list_attendance(chapter.as_deref())
                .await
                .context("Failed to load attendance")?;

            if records.is_empty() {
                println!("{}", "No attendance recorded".yellow());
            } else {
                println!("{}", output::attendance_table(&records));
            }
        }

        Commands::Roster { chapter } => {
            let repo = open_repository(&cli.db).await?;
            let roster = repo
                .list_missionaries(chapter.as_deref())
                .await
                .context("Failed to load missionaries")?;

            if roster.is_empty() {
                println!("{}", "No missionaries registered".yellow());
            } else {
                let present = roster.iter().filter(|e| e.is_present()).count();
                println!("{}", output::roster_table(&roster));
                println!("{} of {} present today", present, roster.len());
            }
        }

        Commands::Remove { id_number } => {
            let repo = open_repository(&cli.db).await?;
            let removed = repo
                .delete_missionary(id_number.trim())
                .await
                .context("Failed to delete missionary")?;

            println!(
                "{} Deleted {} ({} Chapter)",
                "✓".green().bold(),
                removed.name,
                removed.chapter
            );
        }
    }

    Ok(())
}
