use std::path::Path;

use rusqlite::Connection;

use crate::error::{Igreja360Error, Result};
use crate::models::{Transaction, VolunteerSchedule};
use crate::{ledger, roster};

pub const DB_FILE: &str = "igreja360.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    kind TEXT NOT NULL DEFAULT 'expense' CHECK (kind IN ('income', 'expense')),
    due_date TEXT,
    payment_date TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'paid', 'overdue')),
    installment_group_id TEXT,
    installment_number INTEGER,
    total_installments INTEGER,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_group ON transactions(installment_group_id);
CREATE INDEX IF NOT EXISTS idx_transactions_due ON transactions(status, due_date);

CREATE TABLE IF NOT EXISTS ministries (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS volunteers (
    id INTEGER PRIMARY KEY,
    ministry_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (ministry_id, name),
    FOREIGN KEY (ministry_id) REFERENCES ministries(id)
);

CREATE TABLE IF NOT EXISTS volunteer_schedules (
    id INTEGER PRIMARY KEY,
    ministry_id INTEGER NOT NULL,
    volunteer_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    schedule_type TEXT NOT NULL DEFAULT 'primary' CHECK (schedule_type IN ('primary', 'backup')),
    confirmed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    CHECK (end_time > start_time),
    FOREIGN KEY (ministry_id) REFERENCES ministries(id),
    FOREIGN KEY (volunteer_id) REFERENCES volunteers(id)
);

CREATE INDEX IF NOT EXISTS idx_schedules_volunteer_date ON volunteer_schedules(volunteer_id, date);

-- Times are stored as zero-padded HH:MM:SS so text comparison orders them.
CREATE TRIGGER IF NOT EXISTS volunteer_schedules_no_overlap_insert
BEFORE INSERT ON volunteer_schedules
WHEN EXISTS (
    SELECT 1 FROM volunteer_schedules s
    WHERE s.volunteer_id = NEW.volunteer_id
      AND s.date = NEW.date
      AND s.start_time < NEW.end_time
      AND s.end_time > NEW.start_time
)
BEGIN
    SELECT RAISE(ABORT, 'schedule conflict');
END;

CREATE TRIGGER IF NOT EXISTS volunteer_schedules_no_overlap_update
BEFORE UPDATE OF volunteer_id, date, start_time, end_time ON volunteer_schedules
WHEN EXISTS (
    SELECT 1 FROM volunteer_schedules s
    WHERE s.id <> NEW.id
      AND s.volunteer_id = NEW.volunteer_id
      AND s.date = NEW.date
      AND s.start_time < NEW.end_time
      AND s.end_time > NEW.start_time
)
BEGIN
    SELECT RAISE(ABORT, 'schedule conflict');
END;
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Open a database that `init` already created. Never creates the file.
pub fn open_initialized(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(Igreja360Error::NotInitialized(db_path.display().to_string()));
    }
    get_connection(db_path)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    tracing::debug!("schema ready");
    Ok(())
}

/// Read access the computations need, independent of where rows live.
pub trait Repository {
    /// Every transaction that belongs to an installment plan.
    fn installment_transactions(&self) -> Result<Vec<Transaction>>;

    /// All schedules of a ministry within one calendar month.
    fn schedules_for_month(
        &self,
        ministry_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<VolunteerSchedule>>;
}

impl Repository for Connection {
    fn installment_transactions(&self) -> Result<Vec<Transaction>> {
        ledger::list_installment_transactions(self)
    }

    fn schedules_for_month(
        &self,
        ministry_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<VolunteerSchedule>> {
        roster::list_schedules_for_month(self, ministry_id, year, month)
    }
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
