// Terminal rendering for scan results

use colored::Colorize;
use rollcall_core::application::{StatusCounts, SubmitOutcome};
use rollcall_core::domain::{AttendanceRecord, QueueItem, RosterEntry, ScanOutcome, ScanStatus};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "#")]
    position: usize,
    identifier: String,
    status: String,
    name: String,
    chapter: String,
    error: String,
    verified: String,
}

#[derive(Tabled)]
struct AttendanceRow {
    name: String,
    chapter: String,
    status: String,
    date: String,
}

#[derive(Tabled)]
struct RosterRow {
    name: String,
    chapter: String,
    #[tabled(rename = "id number")]
    id_number: String,
    age: i32,
    today: String,
}

fn dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn status_label(status: ScanStatus) -> String {
    match status {
        ScanStatus::Pending => "pending".yellow().to_string(),
        ScanStatus::Processing => "processing".cyan().to_string(),
        ScanStatus::Success => "success".green().to_string(),
        ScanStatus::Error => "error".red().to_string(),
    }
}

pub fn queue_table(items: &[QueueItem]) -> String {
    let rows: Vec<QueueRow> = items
        .iter()
        .enumerate()
        .map(|(i, item)| QueueRow {
            position: i + 1,
            identifier: item.identifier.clone(),
            status: status_label(item.status),
            name: dash(&item.name),
            chapter: dash(&item.chapter),
            error: dash(&item.error),
            verified: match (&item.checksum, item.verified) {
                (None, _) => "-".to_string(),
                (Some(_), true) => "yes".to_string(),
                (Some(_), false) => "MISMATCH".to_string(),
            },
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn attendance_table(records: &[AttendanceRecord]) -> String {
    let rows: Vec<AttendanceRow> = records
        .iter()
        .map(|r| AttendanceRow {
            name: r.missionary_name.clone(),
            chapter: r.chapter.clone(),
            status: r.status.clone(),
            date: r.attendance_date.clone(),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn roster_table(entries: &[RosterEntry]) -> String {
    let rows: Vec<RosterRow> = entries
        .iter()
        .map(|e| RosterRow {
            name: e.missionary.name.clone(),
            chapter: e.missionary.chapter.clone(),
            id_number: e.missionary.id_number.clone(),
            age: e.missionary.age,
            today: if e.is_present() {
                e.status().green().to_string()
            } else {
                e.status().dimmed().to_string()
            },
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn counts_line(counts: &StatusCounts) -> String {
    format!(
        "{} total | {} {} | {} {} | {} {} | {} {}",
        counts.total(),
        counts.pending,
        "pending".yellow(),
        counts.processing,
        "processing".cyan(),
        counts.success,
        "success".green(),
        counts.error,
        "error".red(),
    )
}

/// One line per submitted scan
pub fn submit_line(raw: &str, outcome: &SubmitOutcome) -> Option<String> {
    let line = match outcome {
        SubmitOutcome::Empty => return None,
        SubmitOutcome::Duplicate => format!("{} {}", "•".dimmed(), "repeat scan ignored".dimmed()),
        SubmitOutcome::ChecksumRejected(p) => format!(
            "{} {} rejected: checksum mismatch",
            "✗".red(),
            p.identifier
        ),
        SubmitOutcome::Queued(id) => format!("{} queued {}", "+".cyan(), id),
        SubmitOutcome::Busy => format!(
            "{} busy, scan '{}' not accepted",
            "…".yellow(),
            raw.trim()
        ),
        SubmitOutcome::Direct(outcome) => match outcome {
            ScanOutcome::Recorded(a) => format!(
                "{} Attendance marked for {} ({} Chapter)",
                "✓".green().bold(),
                a.name.bold(),
                a.chapter
            ),
            ScanOutcome::AlreadyMarked(a) => format!(
                "{} {} is already marked ({} Chapter)",
                "○".yellow(),
                a.name,
                a.chapter
            ),
            other => format!(
                "{} {}",
                "✗".red(),
                other.message().unwrap_or_default()
            ),
        },
    };
    Some(line)
}
