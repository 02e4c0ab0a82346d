use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::error::{Igreja360Error, Result};
use crate::fmt::month_label;
use crate::models::{money_to_cents, NewTransaction, Transaction, TransactionKind, TransactionStatus};

const UPCOMING_LIMIT: usize = 10;
const PROJECTION_MONTHS: u32 = 6;

static INSTALLMENT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+/\d+\)$").expect("installment suffix pattern"));

pub fn strip_installment_suffix(description: &str) -> &str {
    match INSTALLMENT_SUFFIX.find(description) {
        Some(m) => &description[..m.start()],
        None => description,
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentGroup {
    pub group_id: String,
    pub description: String,
    pub total_installments: u32,
    pub total_amount: Decimal,
    pub paid_count: usize,
    pub pending_count: usize,
    pub overdue_count: usize,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub overdue_amount: Decimal,
    pub next_due_date: Option<NaiveDate>,
    pub first_due_date: Option<NaiveDate>,
    pub last_due_date: Option<NaiveDate>,
    pub installments: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyProjection {
    pub month_key: String,
    pub label: String,
    pub total_due: Decimal,
    pub installment_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentStats {
    pub total_groups: usize,
    pub total_pending: Decimal,
    pub total_paid: Decimal,
    pub total_overdue: Decimal,
    pub upcoming: Vec<Transaction>,
    pub groups: Vec<InstallmentGroup>,
    pub monthly_projection: Vec<MonthlyProjection>,
    pub status_counts: StatusCounts,
}

impl InstallmentGroup {
    fn new(group_id: &str, first: &Transaction) -> Self {
        Self {
            group_id: group_id.to_string(),
            description: strip_installment_suffix(&first.description).to_string(),
            total_installments: 0,
            total_amount: Decimal::ZERO,
            paid_count: 0,
            pending_count: 0,
            overdue_count: 0,
            paid_amount: Decimal::ZERO,
            pending_amount: Decimal::ZERO,
            overdue_amount: Decimal::ZERO,
            next_due_date: None,
            first_due_date: None,
            last_due_date: None,
            installments: Vec::new(),
        }
    }

    fn push(&mut self, txn: &Transaction) {
        self.total_amount += txn.amount;
        match txn.status {
            TransactionStatus::Paid => {
                self.paid_count += 1;
                self.paid_amount += txn.amount;
            }
            TransactionStatus::Pending => {
                self.pending_count += 1;
                self.pending_amount += txn.amount;
                if let Some(due) = txn.due_date {
                    self.next_due_date = Some(self.next_due_date.map_or(due, |d| d.min(due)));
                }
            }
            TransactionStatus::Overdue => {
                self.overdue_count += 1;
                self.overdue_amount += txn.amount;
            }
        }
        if let Some(due) = txn.due_date {
            self.first_due_date = Some(self.first_due_date.map_or(due, |d| d.min(due)));
            self.last_due_date = Some(self.last_due_date.map_or(due, |d| d.max(due)));
        }
        self.installments.push(txn.clone());
    }

    fn finish(&mut self) {
        self.installments
            .sort_by_key(|t| (t.installment_number.unwrap_or(u32::MAX), t.id));
        let declared = self
            .installments
            .iter()
            .filter_map(|t| t.total_installments)
            .max()
            .unwrap_or(0);
        self.total_installments = declared.max(self.installments.len() as u32);
    }
}

/// Aggregate installment transactions into per-group and global views.
///
/// Every row must carry an installment group id; callers filter before
/// handing rows in. `today` anchors the upcoming window and the projection.
pub fn compute_installment_stats(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<InstallmentStats> {
    let mut by_group: BTreeMap<&str, InstallmentGroup> = BTreeMap::new();
    let mut status_counts = StatusCounts::default();

    for txn in transactions {
        let group_id = txn
            .installment_group_id
            .as_deref()
            .ok_or(Igreja360Error::MissingInstallmentGroup(txn.id))?;
        by_group
            .entry(group_id)
            .or_insert_with(|| InstallmentGroup::new(group_id, txn))
            .push(txn);
        match txn.status {
            TransactionStatus::Paid => status_counts.paid += 1,
            TransactionStatus::Pending => status_counts.pending += 1,
            TransactionStatus::Overdue => status_counts.overdue += 1,
        }
    }

    let mut groups: Vec<InstallmentGroup> = by_group.into_values().collect();
    for group in &mut groups {
        group.finish();
    }

    let total_paid: Decimal = groups.iter().map(|g| g.paid_amount).sum();
    let total_pending: Decimal = groups.iter().map(|g| g.pending_amount).sum();
    let total_overdue: Decimal = groups.iter().map(|g| g.overdue_amount).sum();

    // Overdue groups first, then by next due date with "no date" last.
    groups.sort_by(|a, b| {
        let a_key = (a.overdue_count == 0, a.next_due_date.is_none(), a.next_due_date);
        let b_key = (b.overdue_count == 0, b.next_due_date.is_none(), b.next_due_date);
        a_key.cmp(&b_key).then_with(|| a.group_id.cmp(&b.group_id))
    });

    Ok(InstallmentStats {
        total_groups: groups.len(),
        total_pending,
        total_paid,
        total_overdue,
        upcoming: upcoming_installments(transactions, today),
        monthly_projection: monthly_projection(transactions, today),
        groups,
        status_counts,
    })
}

fn upcoming_installments(transactions: &[Transaction], today: NaiveDate) -> Vec<Transaction> {
    let horizon = add_months(today, 1);
    let mut upcoming: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Pending)
        .filter(|t| matches!(t.due_date, Some(due) if due > today && due < horizon))
        .collect();
    upcoming.sort_by_key(|t| (t.due_date, t.id));
    upcoming.into_iter().take(UPCOMING_LIMIT).cloned().collect()
}

fn monthly_projection(transactions: &[Transaction], today: NaiveDate) -> Vec<MonthlyProjection> {
    let current_month = first_of_month(today);
    (0..PROJECTION_MONTHS)
        .map(|offset| {
            let month_start = add_months(current_month, offset);
            let month_end = add_months(current_month, offset + 1);
            let due: Vec<&Transaction> = transactions
                .iter()
                .filter(|t| t.status != TransactionStatus::Paid)
                .filter(|t| matches!(t.due_date, Some(d) if d >= month_start && d < month_end))
                .collect();
            MonthlyProjection {
                month_key: month_start.format("%Y-%m").to_string(),
                label: month_label(month_start),
                total_due: due.iter().map(|t| t.amount).sum(),
                installment_count: due.len(),
            }
        })
        .collect()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Calendar month arithmetic, clamped to the last day of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// Plan creation
// ---------------------------------------------------------------------------

/// Split `total` into `count` monthly installments that share one group id.
///
/// Amounts are truncated to the cent and the leftover cents land on the
/// first installment, so the rows always add up to `total`.
pub fn plan_installments(
    description: &str,
    total: Decimal,
    count: u32,
    first_due: NaiveDate,
    kind: TransactionKind,
) -> Result<Vec<NewTransaction>> {
    if count == 0 {
        return Err(Igreja360Error::Other(
            "An installment plan needs at least one installment".to_string(),
        ));
    }
    if total <= Decimal::ZERO {
        return Err(Igreja360Error::InvalidAmount(total.to_string()));
    }
    money_to_cents(total)?;

    let group_id = uuid::Uuid::new_v4().to_string();
    let base = strip_installment_suffix(description.trim());
    let share = (total / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let remainder = total - share * Decimal::from(count);

    Ok((1..=count)
        .map(|n| NewTransaction {
            description: format!("{base} ({n}/{count})"),
            amount: if n == 1 { share + remainder } else { share },
            kind,
            due_date: Some(add_months(first_due, n - 1)),
            payment_date: None,
            status: TransactionStatus::Pending,
            installment_group_id: Some(group_id.clone()),
            installment_number: Some(n),
            total_installments: Some(count),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(
        id: i64,
        group: &str,
        n: u32,
        total: u32,
        amount: i64,
        due: Option<NaiveDate>,
        status: TransactionStatus,
    ) -> Transaction {
        Transaction {
            id,
            description: format!("Equipamento ({n}/{total})"),
            amount: Decimal::new(amount, 2),
            kind: TransactionKind::Expense,
            due_date: due,
            payment_date: None,
            status,
            installment_group_id: Some(group.to_string()),
            installment_number: Some(n),
            total_installments: Some(total),
        }
    }

    fn today() -> NaiveDate {
        date(2025, 6, 10)
    }

    #[test]
    fn test_empty_input_yields_zeroes() {
        let stats = compute_installment_stats(&[], today()).unwrap();
        assert_eq!(stats.total_groups, 0);
        assert_eq!(stats.total_paid, Decimal::ZERO);
        assert_eq!(stats.total_pending, Decimal::ZERO);
        assert_eq!(stats.total_overdue, Decimal::ZERO);
        assert!(stats.upcoming.is_empty());
        assert!(stats.groups.is_empty());
        assert_eq!(stats.status_counts, StatusCounts::default());
        assert_eq!(stats.monthly_projection.len(), 6);
        assert!(stats
            .monthly_projection
            .iter()
            .all(|m| m.total_due == Decimal::ZERO && m.installment_count == 0));
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_installment_suffix("Equipamento (3/12)"), "Equipamento");
        assert_eq!(strip_installment_suffix("Aluguel"), "Aluguel");
        assert_eq!(strip_installment_suffix("Som(1/2)"), "Som");
        assert_eq!(strip_installment_suffix("Reforma (1/2) extra"), "Reforma (1/2) extra");
    }

    #[test]
    fn test_buckets_partition_all_amounts() {
        let rows = vec![
            txn(1, "a", 1, 3, 10000, Some(date(2025, 5, 1)), TransactionStatus::Paid),
            txn(2, "a", 2, 3, 10000, Some(date(2025, 6, 1)), TransactionStatus::Overdue),
            txn(3, "a", 3, 3, 10000, Some(date(2025, 7, 1)), TransactionStatus::Pending),
            txn(4, "b", 1, 2, 3333, None, TransactionStatus::Pending),
            txn(5, "b", 2, 2, 3334, Some(date(2025, 8, 1)), TransactionStatus::Paid),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        let input_total: Decimal = rows.iter().map(|t| t.amount).sum();
        assert_eq!(
            stats.total_paid + stats.total_pending + stats.total_overdue,
            input_total
        );
        assert_eq!(stats.total_paid, Decimal::new(13334, 2));
        assert_eq!(stats.total_pending, Decimal::new(13333, 2));
        assert_eq!(stats.total_overdue, Decimal::new(10000, 2));
        assert_eq!(
            stats.status_counts,
            StatusCounts { paid: 2, pending: 2, overdue: 1 }
        );
        for g in &stats.groups {
            assert_eq!(
                g.paid_amount + g.pending_amount + g.overdue_amount,
                g.total_amount
            );
        }
    }

    #[test]
    fn test_group_dates_skip_missing_due_dates() {
        let rows = vec![
            txn(1, "b", 1, 3, 5000, None, TransactionStatus::Pending),
            txn(2, "b", 2, 3, 5000, Some(date(2025, 9, 1)), TransactionStatus::Pending),
            txn(3, "b", 3, 3, 5000, Some(date(2025, 7, 1)), TransactionStatus::Paid),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        let g = &stats.groups[0];
        assert_eq!(g.first_due_date, Some(date(2025, 7, 1)));
        assert_eq!(g.last_due_date, Some(date(2025, 9, 1)));
        assert_eq!(g.next_due_date, Some(date(2025, 9, 1)));
        assert_eq!(g.pending_count, 2);
        assert_eq!(g.description, "Equipamento");
    }

    #[test]
    fn test_fully_paid_group_has_no_next_due() {
        let rows = vec![
            txn(1, "a", 1, 2, 5000, Some(date(2025, 1, 1)), TransactionStatus::Paid),
            txn(2, "a", 2, 2, 5000, Some(date(2025, 2, 1)), TransactionStatus::Paid),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        assert_eq!(stats.groups[0].next_due_date, None);
        assert_eq!(stats.groups[0].total_amount, Decimal::new(10000, 2));
    }

    #[test]
    fn test_partial_group_tolerated() {
        let rows = vec![txn(7, "a", 4, 12, 2500, Some(date(2025, 7, 1)), TransactionStatus::Pending)];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        assert_eq!(stats.total_groups, 1);
        assert_eq!(stats.groups[0].total_installments, 12);
        assert_eq!(stats.groups[0].installments.len(), 1);
    }

    #[test]
    fn test_overdue_group_sorts_first() {
        let rows = vec![
            txn(1, "pending-only", 1, 2, 1000, Some(date(2025, 6, 12)), TransactionStatus::Pending),
            txn(2, "with-overdue", 1, 2, 1000, Some(date(2025, 5, 1)), TransactionStatus::Overdue),
            txn(3, "with-overdue", 2, 2, 1000, Some(date(2025, 12, 1)), TransactionStatus::Pending),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        assert_eq!(stats.groups[0].group_id, "with-overdue");
        assert_eq!(stats.groups[1].group_id, "pending-only");
    }

    #[test]
    fn test_groups_without_next_due_sort_last() {
        let rows = vec![
            txn(1, "paid", 1, 1, 1000, Some(date(2025, 1, 1)), TransactionStatus::Paid),
            txn(2, "late", 1, 1, 1000, Some(date(2025, 9, 1)), TransactionStatus::Pending),
            txn(3, "soon", 1, 1, 1000, Some(date(2025, 6, 20)), TransactionStatus::Pending),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        let order: Vec<&str> = stats.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["soon", "late", "paid"]);
    }

    #[test]
    fn test_upcoming_window_is_exclusive_and_capped() {
        let mut rows = Vec::new();
        // Due today and exactly one month out fall outside the window.
        rows.push(txn(100, "x", 1, 1, 1000, Some(today()), TransactionStatus::Pending));
        rows.push(txn(101, "y", 1, 1, 1000, Some(date(2025, 7, 10)), TransactionStatus::Pending));
        rows.push(txn(102, "z", 1, 1, 1000, Some(date(2025, 6, 11)), TransactionStatus::Overdue));
        for i in 0..12 {
            rows.push(txn(
                i,
                &format!("g{i}"),
                1,
                1,
                1000,
                Some(date(2025, 7, 9) - chrono::Duration::days(i)),
                TransactionStatus::Pending,
            ));
        }
        let stats = compute_installment_stats(&rows, today()).unwrap();
        assert_eq!(stats.upcoming.len(), 10);
        assert!(stats.upcoming.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        assert_eq!(stats.upcoming[0].due_date, Some(date(2025, 6, 28)));
        assert!(stats.upcoming.iter().all(|t| t.id < 100));
    }

    #[test]
    fn test_projection_current_month() {
        let rows = vec![txn(1, "a", 1, 1, 10000, Some(date(2025, 6, 15)), TransactionStatus::Pending)];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        let first = &stats.monthly_projection[0];
        assert_eq!(first.month_key, "2025-06");
        assert_eq!(first.label, "jun/25");
        assert_eq!(first.total_due, Decimal::new(100, 0));
        assert_eq!(first.installment_count, 1);
        for m in &stats.monthly_projection[1..] {
            assert_eq!(m.total_due, Decimal::ZERO);
            assert_eq!(m.installment_count, 0);
        }
    }

    #[test]
    fn test_projection_includes_overdue_excludes_paid() {
        let rows = vec![
            txn(1, "a", 1, 3, 5000, Some(date(2025, 6, 1)), TransactionStatus::Overdue),
            txn(2, "a", 2, 3, 5000, Some(date(2025, 6, 30)), TransactionStatus::Paid),
            txn(3, "a", 3, 3, 5000, Some(date(2025, 11, 30)), TransactionStatus::Pending),
            txn(4, "b", 1, 1, 5000, Some(date(2025, 12, 1)), TransactionStatus::Pending),
        ];
        let stats = compute_installment_stats(&rows, today()).unwrap();
        let keys: Vec<&str> = stats.monthly_projection.iter().map(|m| m.month_key.as_str()).collect();
        assert_eq!(keys, vec!["2025-06", "2025-07", "2025-08", "2025-09", "2025-10", "2025-11"]);
        assert_eq!(stats.monthly_projection[0].installment_count, 1);
        assert_eq!(stats.monthly_projection[5].total_due, Decimal::new(50, 0));
    }

    #[test]
    fn test_stats_are_idempotent() {
        let rows = vec![
            txn(3, "b", 1, 2, 1000, Some(date(2025, 7, 1)), TransactionStatus::Pending),
            txn(1, "a", 1, 2, 1000, Some(date(2025, 7, 1)), TransactionStatus::Pending),
            txn(2, "a", 2, 2, 1000, Some(date(2025, 8, 1)), TransactionStatus::Pending),
            txn(4, "b", 2, 2, 1000, Some(date(2025, 8, 1)), TransactionStatus::Pending),
        ];
        let first = compute_installment_stats(&rows, today()).unwrap();
        let second = compute_installment_stats(&rows, today()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.groups[0].group_id, "a");
    }

    #[test]
    fn test_missing_group_id_fails_fast() {
        let mut row = txn(9, "a", 1, 1, 1000, Some(date(2025, 7, 1)), TransactionStatus::Pending);
        row.installment_group_id = None;
        let err = compute_installment_stats(&[row], today()).unwrap_err();
        assert!(matches!(err, Igreja360Error::MissingInstallmentGroup(9)));
    }

    #[test]
    fn test_plan_splits_exactly() {
        let plan = plan_installments(
            "Projetor",
            Decimal::new(100000, 2),
            3,
            date(2025, 1, 31),
            TransactionKind::Expense,
        )
        .unwrap();
        assert_eq!(plan.len(), 3);
        let sum: Decimal = plan.iter().map(|t| t.amount).sum();
        assert_eq!(sum, Decimal::new(100000, 2));
        assert_eq!(plan[0].amount, Decimal::new(33334, 2));
        assert_eq!(plan[1].amount, Decimal::new(33333, 2));
        assert_eq!(plan[0].description, "Projetor (1/3)");
        assert_eq!(plan[2].description, "Projetor (3/3)");
        assert_eq!(plan[1].due_date, Some(date(2025, 2, 28)));
        assert_eq!(plan[2].due_date, Some(date(2025, 3, 31)));
        let group = plan[0].installment_group_id.clone();
        assert!(group.is_some());
        assert!(plan.iter().all(|t| t.installment_group_id == group));
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let d = date(2025, 1, 1);
        assert!(plan_installments("X", Decimal::new(100, 0), 0, d, TransactionKind::Expense).is_err());
        assert!(plan_installments("X", Decimal::ZERO, 2, d, TransactionKind::Expense).is_err());
        assert!(matches!(
            plan_installments("X", Decimal::new(10005, 3), 2, d, TransactionKind::Expense),
            Err(Igreja360Error::InvalidAmount(_))
        ));
        assert!(matches!(
            plan_installments("X", Decimal::MAX, 3, d, TransactionKind::Expense),
            Err(Igreja360Error::InvalidAmount(_))
        ));
    }
}
