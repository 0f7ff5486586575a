// Rollcall Infrastructure - SQLite Adapter
// Implements: AttendanceRepository, MissionaryRegistry

mod attendance_repository;
mod connection;
mod migration;

pub use attendance_repository::SqliteAttendanceRepository;
pub use connection::create_pool;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by a mapping helper
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
