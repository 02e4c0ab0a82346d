use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{parse_money, today};
use crate::db::open_initialized;
use crate::error::Result;
use crate::fmt::{date_br, money};
use crate::ledger;
use crate::models::{NewTransaction, TransactionKind, TransactionStatus};
use crate::scheduling::parse_date;
use crate::settings::get_db_path;

pub fn add(description: &str, amount: &str, due: &str, kind: &str) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let txn = NewTransaction {
        description: description.to_string(),
        amount: parse_money(amount)?.abs(),
        kind: kind.parse::<TransactionKind>()?,
        due_date: Some(parse_date(due)?),
        payment_date: None,
        status: TransactionStatus::Pending,
        installment_group_id: None,
        installment_number: None,
        total_installments: None,
    };
    let id = ledger::insert_transaction(&conn, &txn, None)?;
    println!("Added transaction {id}: {description} {}", money(txn.amount));
    Ok(())
}

pub fn pay(id: i64, date: Option<&str>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let paid_on = match date {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    ledger::mark_paid(&conn, id, paid_on)?;
    let txn = ledger::get_transaction(&conn, id)?;
    println!("Paid: {} {} on {}", txn.description, money(txn.amount), date_br(Some(paid_on)));
    Ok(())
}

pub(crate) fn status_cell(status: TransactionStatus) -> Cell {
    let label = status.label();
    match status {
        TransactionStatus::Paid => Cell::new(label.green()),
        TransactionStatus::Pending => Cell::new(label.yellow()),
        TransactionStatus::Overdue => Cell::new(label.red().bold()),
    }
}

pub fn list(status: Option<&str>) -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    ledger::refresh_overdue(&conn, today())?;
    let status = status.map(str::parse::<TransactionStatus>).transpose()?;
    let rows = ledger::list_transactions(&conn, status)?;

    if rows.is_empty() {
        println!("No transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Due", "Description", "Kind", "Amount", "Status", "Paid On"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(date_br(t.due_date)),
            Cell::new(&t.description),
            Cell::new(t.kind.as_str()),
            Cell::new(money(t.amount)),
            status_cell(t.status),
            Cell::new(date_br(t.payment_date)),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}

#[cfg(feature = "import")]
pub fn import(file: &str, mappings: &[String]) -> Result<()> {
    use crate::importer::{import_file, parse_overrides};

    let overrides = parse_overrides(mappings)?;
    let mut conn = open_initialized(&get_db_path())?;
    let result = import_file(&mut conn, std::path::Path::new(file), &overrides)?;

    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    println!("{} imported, {} skipped (duplicates)", result.imported, result.skipped);
    let moved = ledger::refresh_overdue(&conn, today())?;
    if moved > 0 {
        println!("{moved} pending transactions are past due and now overdue");
    }
    Ok(())
}
