use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;

use crate::error::{Igreja360Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Pending,
    Paid,
    Overdue,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Paid => "Pago",
            Self::Overdue => "Vencido",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Igreja360Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendente" => Ok(Self::Pending),
            "paid" | "pago" => Ok(Self::Paid),
            "overdue" | "vencido" | "atrasado" => Ok(Self::Overdue),
            other => Err(Igreja360Error::Other(format!("Unknown status: {other}"))),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Igreja360Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" | "entrada" => Ok(Self::Income),
            "expense" | "despesa" | "saida" | "saída" => Ok(Self::Expense),
            other => Err(Igreja360Error::Other(format!("Unknown transaction kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: TransactionStatus,
    pub installment_group_id: Option<String>,
    pub installment_number: Option<u32>,
    pub total_installments: Option<u32>,
}

/// A transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: TransactionStatus,
    pub installment_group_id: Option<String>,
    pub installment_number: Option<u32>,
    pub total_installments: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleType {
    Primary,
    Backup,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        }
    }
}

impl FromStr for ScheduleType {
    type Err = Igreja360Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "primary" => Ok(Self::Primary),
            "backup" => Ok(Self::Backup),
            other => Err(Igreja360Error::Other(format!("Unknown schedule type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolunteerSchedule {
    pub id: i64,
    pub ministry_id: i64,
    pub volunteer_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub schedule_type: ScheduleType,
    pub confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct Ministry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Volunteer {
    pub id: i64,
    pub ministry_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// SQLite text mapping
// ---------------------------------------------------------------------------

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for ScheduleType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ScheduleType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Convert to whole cents. Fractions of a cent and amounts beyond the
/// storable range are errors, never rounded.
pub fn money_to_cents(amount: Decimal) -> Result<i64> {
    let invalid = || Igreja360Error::InvalidAmount(amount.to_string());
    if amount.normalize().scale() > 2 {
        return Err(invalid());
    }
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(invalid)?;
    i64::try_from(scaled.trunc()).map_err(|_| invalid())
}

pub fn cents_to_money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
