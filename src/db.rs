use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::ledger::{AttendanceLedger, AttendanceStatus};
use crate::roll::{AttendanceSink, SaveBatch};
use crate::roster::Person;

pub const DB_FILE: &str = "rollcall.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_students(
            course_id TEXT NOT NULL,
            id TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            document_number TEXT,
            photo TEXT,
            sort_order INTEGER NOT NULL,
            PRIMARY KEY(course_id, id),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_students_sort ON course_students(course_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_batches(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            session_date TEXT NOT NULL,
            saved_at TEXT NOT NULL,
            entry_count INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_batches_course ON attendance_batches(course_id, session_date)",
        [],
    )?;

    // One row per person per sitting; re-saving a sitting overwrites it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            course_id TEXT NOT NULL,
            session_date TEXT NOT NULL,
            person_id TEXT NOT NULL,
            status TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            PRIMARY KEY(course_id, session_date, person_id),
            FOREIGN KEY(batch_id) REFERENCES attendance_batches(id)
        )",
        [],
    )?;

    Ok(conn)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn course_exists(conn: &Connection, course_id: &str) -> anyhow::Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [course_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}

/// Replaces the stored roster of `course_id`, creating the course if needed.
/// Roster order is kept through `sort_order`.
pub fn replace_roster(
    conn: &Connection,
    course_id: &str,
    name: Option<&str>,
    people: &[Person],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO courses(id, name) VALUES(?, ?)
         ON CONFLICT(id) DO UPDATE SET name = COALESCE(?, courses.name)",
        (course_id, name.unwrap_or(course_id), name),
    )?;
    tx.execute("DELETE FROM course_students WHERE course_id = ?", [course_id])?;
    for (idx, p) in people.iter().enumerate() {
        tx.execute(
            "INSERT INTO course_students(course_id, id, first_name, last_name, document_number, photo, sort_order)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                course_id,
                &p.id,
                &p.first_name,
                &p.last_name,
                &p.document_number,
                &p.photo,
                idx as i64,
            ),
        )
        .with_context(|| format!("failed to insert person {}", p.id))?;
    }
    tx.commit()?;
    Ok(())
}

pub fn list_roster(conn: &Connection, course_id: &str) -> anyhow::Result<Vec<Person>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, document_number, photo
         FROM course_students
         WHERE course_id = ?
         ORDER BY sort_order",
    )?;
    let people = stmt
        .query_map([course_id], |r| {
            Ok(Person {
                id: r.get(0)?,
                first_name: r.get(1)?,
                last_name: r.get(2)?,
                document_number: r.get(3)?,
                photo: r.get(4)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(people)
}

/// Ledger of the last saved roll for a course and date. Rows with a status
/// code this daemon does not know are left out rather than guessed.
pub fn load_ledger(
    conn: &Connection,
    course_id: &str,
    date: NaiveDate,
) -> anyhow::Result<AttendanceLedger> {
    let mut stmt = conn.prepare(
        "SELECT person_id, status
         FROM attendance_records
         WHERE course_id = ? AND session_date = ?
         ORDER BY person_id",
    )?;
    let rows = stmt
        .query_map((course_id, date_key(date)), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    let mut ledger = AttendanceLedger::new();
    for (person_id, code) in rows {
        match AttendanceStatus::parse(&code) {
            Some(status) => ledger.set(&person_id, status),
            None => tracing::warn!(course_id, %person_id, %code, "skipping unknown attendance status"),
        }
    }
    if ledger.is_empty() {
        tracing::debug!(course_id, %date, "no saved roll");
    }
    Ok(ledger)
}

pub fn last_saved_at(
    conn: &Connection,
    course_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT saved_at FROM attendance_batches
             WHERE course_id = ? AND session_date = ?
             ORDER BY saved_at DESC
             LIMIT 1",
            (course_id, date_key(date)),
            |r| r.get(0),
        )
        .optional()?)
}

/// Writes a whole batch in one transaction: either every entry lands or
/// none does.
pub fn save_batch(conn: &Connection, batch: &SaveBatch) -> anyhow::Result<()> {
    let day = date_key(batch.date);
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO attendance_batches(id, course_id, session_date, saved_at, entry_count)
         VALUES(?, ?, ?, ?, ?)",
        (
            &batch.id,
            &batch.course_id,
            &day,
            chrono::Utc::now().to_rfc3339(),
            batch.entries.len() as i64,
        ),
    )
    .context("failed to record batch")?;
    for entry in &batch.entries {
        tx.execute(
            "INSERT INTO attendance_records(course_id, session_date, person_id, status, batch_id)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(course_id, session_date, person_id) DO UPDATE SET
               status = excluded.status,
               batch_id = excluded.batch_id",
            (
                &batch.course_id,
                &day,
                &entry.person_id,
                entry.status.code(),
                &batch.id,
            ),
        )
        .with_context(|| format!("failed to record person {}", entry.person_id))?;
    }
    tx.commit()?;
    Ok(())
}

impl AttendanceSink for Connection {
    fn persist(&mut self, batch: &SaveBatch) -> anyhow::Result<()> {
        save_batch(self, batch)
    }
}
