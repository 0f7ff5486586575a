// SQLite AttendanceRepository / MissionaryRegistry Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_core::domain::{
    encode, AttendanceRecord, Missionary, NewAttendance, NewMissionary, RosterEntry,
    ATTENDANCE_STATUS_PRESENT,
};
use rollcall_core::error::{AppError, Result};
use rollcall_core::port::{AttendanceRepository, IdProvider, MissionaryRegistry, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE / PRIMARY KEY constraint failed
                        AppError::Conflict(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    // FOREIGN KEY constraint failed: the referenced missionary is gone
                    "787" | "3850" => AppError::NotFound(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}

/// UTC calendar day of `millis`, the attendance period
fn attendance_date(millis: i64) -> Result<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .ok_or_else(|| AppError::Internal(format!("timestamp out of range: {}", millis)))
}

pub struct SqliteAttendanceRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl SqliteAttendanceRepository {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            pool,
            time_provider,
            id_provider,
        }
    }
}

#[async_trait]
impl AttendanceRepository for SqliteAttendanceRepository {
    async fn find_by_id_number(&self, id_number: &str) -> Result<Option<Missionary>> {
        let row = sqlx::query_as::<_, MissionaryRow>(
            r#"
            SELECT id, missionary_name, age, chapter, id_number, created_at
            FROM missionaries
            WHERE id_number = ?
            "#,
        )
        .bind(id_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MissionaryRow::into_missionary))
    }

    async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<AttendanceRecord> {
        let scanned_at = self.time_provider.now_millis();
        let record = AttendanceRecord {
            id: self.id_provider.generate_id(),
            missionary_id: attendance.missionary_id.clone(),
            missionary_name: attendance.missionary_name.clone(),
            chapter: attendance.chapter.clone(),
            status: ATTENDANCE_STATUS_PRESENT.to_string(),
            scanned_at,
            attendance_date: attendance_date(scanned_at)?,
        };

        // The (missionary_id, attendance_date) UNIQUE constraint turns a second
        // scan on the same day into AppError::Conflict
        sqlx::query(
            r#"
            INSERT INTO attendance_records (
                id, missionary_id, missionary_name, chapter,
                attendance_status, scanned_at, attendance_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.missionary_id)
        .bind(&record.missionary_name)
        .bind(&record.chapter)
        .bind(&record.status)
        .bind(record.scanned_at)
        .bind(&record.attendance_date)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(
            record_id = %record.id,
            missionary_id = %record.missionary_id,
            attendance_date = %record.attendance_date,
            "Attendance inserted"
        );
        Ok(record)
    }
}

#[async_trait]
impl MissionaryRegistry for SqliteAttendanceRepository {
    async fn register(&self, missionary: &NewMissionary) -> Result<Missionary> {
        missionary.validate()?;

        let created = Missionary {
            id: self.id_provider.generate_id(),
            name: missionary.name.trim().to_string(),
            age: missionary.age,
            chapter: missionary.chapter.trim().to_string(),
            id_number: missionary.id_number.trim().to_string(),
            created_at: self.time_provider.now_millis(),
        };

        sqlx::query(
            r#"
            INSERT INTO missionaries (
                id, missionary_name, age, chapter, id_number, qr_code, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(created.age)
        .bind(&created.chapter)
        .bind(&created.id_number)
        .bind(encode(&created.id_number))
        .bind(created.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(created)
    }

    async fn list_attendance(&self, chapter: Option<&str>) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, missionary_id, missionary_name, chapter,
                   attendance_status, scanned_at, attendance_date
            FROM attendance_records
            WHERE (?1 IS NULL OR chapter = ?1)
            ORDER BY scanned_at DESC, id DESC
            "#,
        )
        .bind(chapter)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AttendanceRow::into_record).collect())
    }

    async fn list_missionaries(&self, chapter: Option<&str>) -> Result<Vec<RosterEntry>> {
        let today = attendance_date(self.time_provider.now_millis())?;

        let rows = sqlx::query_as::<_, RosterRow>(
            r#"
            SELECT m.id, m.missionary_name, m.age, m.chapter, m.id_number, m.created_at,
                   a.id AS record_id, a.attendance_status, a.scanned_at
            FROM missionaries m
            LEFT JOIN attendance_records a
                ON a.missionary_id = m.id AND a.attendance_date = ?1
            WHERE (?2 IS NULL OR m.chapter = ?2)
            ORDER BY m.missionary_name, m.id
            "#,
        )
        .bind(&today)
        .bind(chapter)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_entry(&today))
            .collect())
    }

    async fn delete_missionary(&self, id_number: &str) -> Result<Missionary> {
        // attendance_records rows go with it via ON DELETE CASCADE
        let row = sqlx::query_as::<_, MissionaryRow>(
            r#"
            DELETE FROM missionaries
            WHERE id_number = ?
            RETURNING id, missionary_name, age, chapter, id_number, created_at
            "#,
        )
        .bind(id_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let removed = row
            .map(MissionaryRow::into_missionary)
            .ok_or_else(|| AppError::NotFound(format!("missionary {}", id_number)))?;

        info!(missionary_id = %removed.id, id_number = %removed.id_number, "Missionary deleted");
        Ok(removed)
    }
}

#[derive(sqlx::FromRow)]
struct MissionaryRow {
    id: String,
    missionary_name: String,
    age: i32,
    chapter: String,
    id_number: String,
    created_at: i64,
}

impl MissionaryRow {
    fn into_missionary(self) -> Missionary {
        Missionary {
            id: self.id,
            name: self.missionary_name,
            age: self.age,
            chapter: self.chapter,
            id_number: self.id_number,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: String,
    missionary_id: String,
    missionary_name: String,
    chapter: String,
    attendance_status: String,
    scanned_at: i64,
    attendance_date: String,
}

impl AttendanceRow {
    fn into_record(self) -> AttendanceRecord {
        AttendanceRecord {
            id: self.id,
            missionary_id: self.missionary_id,
            missionary_name: self.missionary_name,
            chapter: self.chapter,
            status: self.attendance_status,
            scanned_at: self.scanned_at,
            attendance_date: self.attendance_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RosterRow {
    id: String,
    missionary_name: String,
    age: i32,
    chapter: String,
    id_number: String,
    created_at: i64,
    record_id: Option<String>,
    attendance_status: Option<String>,
    scanned_at: Option<i64>,
}

impl RosterRow {
    fn into_entry(self, attendance_date: &str) -> RosterEntry {
        let attendance = match (self.record_id, self.attendance_status, self.scanned_at) {
            (Some(id), Some(status), Some(scanned_at)) => Some(AttendanceRecord {
                id,
                missionary_id: self.id.clone(),
                missionary_name: self.missionary_name.clone(),
                chapter: self.chapter.clone(),
                status,
                scanned_at,
                attendance_date: attendance_date.to_string(),
            }),
            _ => None,
        };

        RosterEntry {
            missionary: Missionary {
                id: self.id,
                name: self.missionary_name,
                age: self.age,
                chapter: self.chapter,
                id_number: self.id_number,
                created_at: self.created_at,
            },
            attendance,
        }
    }
}
