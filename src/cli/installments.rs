use colored::Colorize;
use comfy_table::{Cell, Table};

use super::transactions::status_cell;
use super::{parse_money, today};
use crate::db::{open_initialized, Repository};
use crate::error::Result;
use crate::fmt::{date_br, money};
use crate::installments::{compute_installment_stats, plan_installments, InstallmentStats};
use crate::ledger;
use crate::models::TransactionKind;
use crate::scheduling::parse_date;
use crate::settings::get_db_path;

pub fn plan(description: &str, total: &str, count: u32, first_due: &str, kind: &str) -> Result<()> {
    let mut conn = open_initialized(&get_db_path())?;
    let rows = plan_installments(
        description,
        parse_money(total)?,
        count,
        parse_date(first_due)?,
        kind.parse::<TransactionKind>()?,
    )?;
    ledger::insert_transactions(&mut conn, &rows)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Description", "Due", "Amount"]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(r.installment_number.unwrap_or_default()),
            Cell::new(&r.description),
            Cell::new(date_br(r.due_date)),
            Cell::new(money(r.amount)),
        ]);
    }
    println!("Installment plan created ({count}x)\n{table}");
    Ok(())
}

pub fn report() -> Result<()> {
    let conn = open_initialized(&get_db_path())?;
    let today = today();
    ledger::refresh_overdue(&conn, today)?;
    let stats = compute_installment_stats(&conn.installment_transactions()?, today)?;
    print_report(&stats);
    Ok(())
}

fn print_report(stats: &InstallmentStats) {
    let mut summary = Table::new();
    summary.set_header(vec!["Plans", "Paid", "Pending", "Overdue"]);
    summary.add_row(vec![
        Cell::new(stats.total_groups),
        Cell::new(money(stats.total_paid).green()),
        Cell::new(money(stats.total_pending).yellow()),
        Cell::new(money(stats.total_overdue).red()),
    ]);
    println!("Installments\n{summary}");

    if !stats.groups.is_empty() {
        let mut groups = Table::new();
        groups.set_header(vec![
            "Description", "Paid", "Pending", "Overdue", "Total", "Next Due", "First", "Last",
        ]);
        for g in &stats.groups {
            let name = if g.overdue_count > 0 {
                g.description.red().bold().to_string()
            } else {
                g.description.clone()
            };
            groups.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{}/{}", g.paid_count, g.total_installments)),
                Cell::new(g.pending_count),
                Cell::new(g.overdue_count),
                Cell::new(money(g.total_amount)),
                Cell::new(date_br(g.next_due_date)),
                Cell::new(date_br(g.first_due_date)),
                Cell::new(date_br(g.last_due_date)),
            ]);
        }
        println!("\nPlans\n{groups}");
    }

    if !stats.upcoming.is_empty() {
        let mut upcoming = Table::new();
        upcoming.set_header(vec!["Due", "Description", "Amount", "Status"]);
        for t in &stats.upcoming {
            upcoming.add_row(vec![
                Cell::new(date_br(t.due_date)),
                Cell::new(&t.description),
                Cell::new(money(t.amount)),
                status_cell(t.status),
            ]);
        }
        println!("\nDue in the next month\n{upcoming}");
    }

    let mut projection = Table::new();
    projection.set_header(vec!["Month", "Due", "Installments"]);
    for m in &stats.monthly_projection {
        projection.add_row(vec![
            Cell::new(&m.label),
            Cell::new(money(m.total_due)),
            Cell::new(m.installment_count),
        ]);
    }
    println!("\nProjection\n{projection}");

    let counts = &stats.status_counts;
    println!(
        "\nDistribution: {} paid, {} pending, {} overdue",
        counts.paid.to_string().green(),
        counts.pending.to_string().yellow(),
        counts.overdue.to_string().red()
    );
}
