use chrono::{Datelike, NaiveDate, NaiveTime};
use rusqlite::{Connection, Row};

use crate::db::Repository;
use crate::error::{Igreja360Error, Result};
use crate::installments::add_months;
use crate::models::{Ministry, ScheduleType, Volunteer, VolunteerSchedule};
use crate::scheduling::{conflicts, parse_time, TimeRange};

// ---------------------------------------------------------------------------
// Ministries & volunteers
// ---------------------------------------------------------------------------

pub fn add_ministry(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO ministries (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn ministry_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM ministries WHERE name = ?1", [name], |row| row.get(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Igreja360Error::UnknownMinistry(name.to_string()),
            other => other.into(),
        })
}

pub fn list_ministries(conn: &Connection) -> Result<Vec<Ministry>> {
    let mut stmt = conn.prepare("SELECT id, name FROM ministries ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Ministry {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_volunteer(
    conn: &Connection,
    ministry_id: i64,
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO volunteers (ministry_id, name, phone, email) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![ministry_id, name, phone, email],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn volunteer_id(conn: &Connection, ministry_id: i64, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM volunteers WHERE ministry_id = ?1 AND name = ?2",
        rusqlite::params![ministry_id, name],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Igreja360Error::UnknownVolunteer(name.to_string()),
        other => other.into(),
    })
}

pub fn list_volunteers(conn: &Connection, ministry_id: Option<i64>) -> Result<Vec<Volunteer>> {
    let mut stmt = conn.prepare(
        "SELECT id, ministry_id, name, phone, email FROM volunteers \
         WHERE (?1 IS NULL OR ministry_id = ?1) ORDER BY name",
    )?;
    let rows = stmt
        .query_map([ministry_id], |row| {
            Ok(Volunteer {
                id: row.get(0)?,
                ministry_id: row.get(1)?,
                name: row.get(2)?,
                phone: row.get(3)?,
                email: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

fn time_text(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    parse_time(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<VolunteerSchedule> {
    Ok(VolunteerSchedule {
        id: row.get(0)?,
        ministry_id: row.get(1)?,
        volunteer_id: row.get(2)?,
        date: row.get(3)?,
        start_time: time_column(row, 4)?,
        end_time: time_column(row, 5)?,
        schedule_type: row.get(6)?,
        confirmed: row.get(7)?,
    })
}

const SCHEDULE_COLUMNS: &str =
    "id, ministry_id, volunteer_id, date, start_time, end_time, schedule_type, confirmed";

/// The overlap triggers abort with this message; surface it as a typed error.
fn map_conflict(e: rusqlite::Error, detail: impl FnOnce() -> String) -> Igreja360Error {
    match &e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("schedule conflict") => {
            Igreja360Error::ScheduleConflict(detail())
        }
        _ => e.into(),
    }
}

pub fn get_schedule(conn: &Connection, id: i64) -> Result<VolunteerSchedule> {
    let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM volunteer_schedules WHERE id = ?1");
    conn.query_row(&sql, [id], schedule_from_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Igreja360Error::NotFound(format!("Schedule {id}")),
            other => other.into(),
        })
}

pub fn list_schedules_for_month(
    conn: &Connection,
    ministry_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<VolunteerSchedule>> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Igreja360Error::InvalidDate(format!("{year:04}-{month:02}")))?;
    let end = add_months(start, 1);
    let sql = format!(
        "SELECT {SCHEDULE_COLUMNS} FROM volunteer_schedules \
         WHERE ministry_id = ?1 AND date >= ?2 AND date < ?3 \
         ORDER BY date, start_time, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![ministry_id, start, end], schedule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Schedules in the same month that collide with a proposed shift.
pub fn find_conflicts<R: Repository>(
    repo: &R,
    ministry_id: i64,
    volunteer_id: i64,
    date: NaiveDate,
    shift: &TimeRange,
    exclude_id: Option<i64>,
) -> Result<Vec<VolunteerSchedule>> {
    let existing = repo.schedules_for_month(ministry_id, date.year(), date.month())?;
    Ok(conflicts(volunteer_id, date, shift, &existing, exclude_id)
        .cloned()
        .collect())
}

fn describe(found: &[VolunteerSchedule]) -> String {
    found
        .iter()
        .map(|s| {
            format!(
                "#{} {} {}-{}",
                s.id,
                s.date,
                s.start_time.format("%H:%M"),
                s.end_time.format("%H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct NewSchedule {
    pub ministry_id: i64,
    pub volunteer_id: i64,
    pub date: NaiveDate,
    pub shift: TimeRange,
    pub schedule_type: ScheduleType,
}

/// Assign a shift. Rejected with `ScheduleConflict` if it overlaps an
/// existing shift for the same volunteer and day.
pub fn add_schedule(conn: &Connection, new: &NewSchedule) -> Result<i64> {
    let found = find_conflicts(conn, new.ministry_id, new.volunteer_id, new.date, &new.shift, None)?;
    if !found.is_empty() {
        return Err(Igreja360Error::ScheduleConflict(describe(&found)));
    }
    conn.execute(
        "INSERT INTO volunteer_schedules (ministry_id, volunteer_id, date, start_time, end_time, schedule_type) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            new.ministry_id,
            new.volunteer_id,
            new.date,
            time_text(new.shift.start),
            time_text(new.shift.end),
            new.schedule_type,
        ],
    )
    .map_err(|e| map_conflict(e, || "overlapping shift already stored".to_string()))?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, volunteer_id = new.volunteer_id, date = %new.date, "schedule added");
    Ok(id)
}

/// Move an existing schedule, keeping any field that is not given.
pub fn edit_schedule(
    conn: &Connection,
    id: i64,
    date: Option<NaiveDate>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<VolunteerSchedule> {
    let current = get_schedule(conn, id)?;
    let date = date.unwrap_or(current.date);
    let shift = TimeRange::new(
        start.unwrap_or(current.start_time),
        end.unwrap_or(current.end_time),
    )?;

    let found = find_conflicts(conn, current.ministry_id, current.volunteer_id, date, &shift, Some(id))?;
    if !found.is_empty() {
        return Err(Igreja360Error::ScheduleConflict(describe(&found)));
    }
    conn.execute(
        "UPDATE volunteer_schedules SET date = ?1, start_time = ?2, end_time = ?3 WHERE id = ?4",
        rusqlite::params![date, time_text(shift.start), time_text(shift.end), id],
    )
    .map_err(|e| map_conflict(e, || "overlapping shift already stored".to_string()))?;
    get_schedule(conn, id)
}

pub fn remove_schedule(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM volunteer_schedules WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(Igreja360Error::NotFound(format!("Schedule {id}")));
    }
    Ok(())
}

pub fn confirm_schedule(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE volunteer_schedules SET confirmed = 1 WHERE id = ?1",
        [id],
    )?;
    if changed == 0 {
        return Err(Igreja360Error::NotFound(format!("Schedule {id}")));
    }
    Ok(())
}
