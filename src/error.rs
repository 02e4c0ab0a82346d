use thiserror::Error;

#[derive(Error, Debug)]
pub enum Igreja360Error {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "import")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid time: {0} (expected HH:MM)")]
    InvalidTime(String),

    #[error("Invalid shift: {0}")]
    InvalidShift(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transaction {0} has no installment group")]
    MissingInstallmentGroup(i64),

    #[error("Schedule conflict: {0}")]
    ScheduleConflict(String),

    #[error("Unknown ministry: {0}")]
    UnknownMinistry(String),

    #[error("Unknown volunteer: {0}")]
    UnknownVolunteer(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Import failed at row {row}: {message}")]
    Import { row: usize, message: String },

    #[error("No database at {0}. Run `igreja360 init` first.")]
    NotInitialized(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Igreja360Error>;
