use chrono::NaiveDate;
use rusqlite::{Connection, Row};

use crate::error::{Igreja360Error, Result};
use crate::models::{cents_to_money, money_to_cents, NewTransaction, Transaction, TransactionStatus};

const TRANSACTION_COLUMNS: &str = "id, description, amount_cents, kind, due_date, payment_date, status, \
     installment_group_id, installment_number, total_installments";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: cents_to_money(row.get(2)?),
        kind: row.get(3)?,
        due_date: row.get(4)?,
        payment_date: row.get(5)?,
        status: row.get(6)?,
        installment_group_id: row.get(7)?,
        installment_number: row.get(8)?,
        total_installments: row.get(9)?,
    })
}

pub fn insert_transaction(
    conn: &Connection,
    txn: &NewTransaction,
    import_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (description, amount_cents, kind, due_date, payment_date, status, \
         installment_group_id, installment_number, total_installments, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            txn.description,
            money_to_cents(txn.amount)?,
            txn.kind,
            txn.due_date,
            txn.payment_date,
            txn.status,
            txn.installment_group_id,
            txn.installment_number,
            txn.total_installments,
            import_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a batch atomically; either every row lands or none does.
pub fn insert_transactions(conn: &mut Connection, txns: &[NewTransaction]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(txns.len());
    for txn in txns {
        ids.push(insert_transaction(&tx, txn, None)?);
    }
    tx.commit()?;
    Ok(ids)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
    conn.query_row(&sql, [id], transaction_from_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Igreja360Error::NotFound(format!("Transaction {id}"))
            }
            other => other.into(),
        })
}

pub fn list_transactions(
    conn: &Connection,
    status: Option<TransactionStatus>,
) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY due_date IS NULL, due_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([status], transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_installment_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE installment_group_id IS NOT NULL \
         ORDER BY due_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_paid(conn: &Connection, id: i64, payment_date: NaiveDate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions SET status = 'paid', payment_date = ?1 WHERE id = ?2",
        rusqlite::params![payment_date, id],
    )?;
    if changed == 0 {
        return Err(Igreja360Error::NotFound(format!("Transaction {id}")));
    }
    tracing::info!(id, %payment_date, "transaction marked paid");
    Ok(())
}

/// Move pending rows whose due date has passed to overdue.
pub fn refresh_overdue(conn: &Connection, today: NaiveDate) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE transactions SET status = 'overdue' \
         WHERE status = 'pending' AND due_date IS NOT NULL AND due_date < ?1",
        [today],
    )?;
    if changed > 0 {
        tracing::info!(changed, "pending transactions moved to overdue");
    }
    Ok(changed)
}
