use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::{Igreja360Error, Result};
use crate::ledger::insert_transaction;
use crate::models::{money_to_cents, NewTransaction, TransactionKind, TransactionStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse amounts as they show up in Brazilian and US spreadsheets:
/// "R$ 1.234,56", "1,234.56", "(50,00)", "-42.5".
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace('$', "")
        .replace('"', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let (negative, body) = match cleaned.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.to_string()),
        None => (false, cleaned.clone()),
    };

    let normalized = match (body.rfind(','), body.rfind('.')) {
        // Whichever separator comes last is the decimal one.
        (Some(c), Some(d)) if c > d => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (Some(_), None) => body.replace(',', "."),
        (None, Some(_)) if body.matches('.').count() > 1 => body.replace('.', ""),
        // "1.500" is one thousand five hundred in pt-BR sheets.
        (None, Some(d)) if body.len() - d - 1 == 3 => body.replace('.', ""),
        _ => body,
    };

    let value: Decimal = normalized
        .parse()
        .map_err(|_| Igreja360Error::InvalidAmount(raw.trim().to_string()))?;
    Ok(if negative { -value } else { value })
}

pub fn parse_date_flexible(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn fold_accents(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        ' ' | '-' | '.' => '_',
        other => other,
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().chars().map(fold_accents).collect()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn is_duplicate_row(conn: &Connection, txn: &NewTransaction) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE description = ?1 AND amount_cents = ?2 AND due_date IS ?3",
    )?;
    Ok(stmt.exists(rusqlite::params![
        txn.description,
        money_to_cents(txn.amount)?,
        txn.due_date
    ])?)
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Description,
    Amount,
    DueDate,
    PaymentDate,
    Status,
    InstallmentGroup,
    InstallmentNumber,
    TotalInstallments,
    Kind,
}

const ALL_FIELDS: &[Field] = &[
    Field::Description,
    Field::Amount,
    Field::DueDate,
    Field::PaymentDate,
    Field::Status,
    Field::InstallmentGroup,
    Field::InstallmentNumber,
    Field::TotalInstallments,
    Field::Kind,
];

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Amount => "amount",
            Self::DueDate => "due_date",
            Self::PaymentDate => "payment_date",
            Self::Status => "status",
            Self::InstallmentGroup => "installment_group",
            Self::InstallmentNumber => "installment_number",
            Self::TotalInstallments => "total_installments",
            Self::Kind => "kind",
        }
    }

    /// Normalized header names recognized without an explicit mapping.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Description => &["description", "descricao", "historico"],
            Self::Amount => &["amount", "valor", "value"],
            Self::DueDate => &["due_date", "vencimento", "data_vencimento", "data", "date"],
            Self::PaymentDate => &["payment_date", "pagamento", "data_pagamento", "pago_em"],
            Self::Status => &["status", "situacao"],
            Self::InstallmentGroup => &["installment_group", "grupo", "grupo_parcela", "parcelamento"],
            Self::InstallmentNumber => &["installment_number", "parcela", "numero_parcela"],
            Self::TotalInstallments => &["total_installments", "total_parcelas", "parcelas"],
            Self::Kind => &["kind", "type", "tipo"],
        }
    }

    fn required(&self) -> bool {
        matches!(self, Self::Description | Self::Amount | Self::DueDate)
    }

    pub fn from_key(key: &str) -> Option<Field> {
        let key = normalize_header(key);
        ALL_FIELDS.iter().find(|f| f.key() == key).copied()
    }
}

/// Parse `field=column` overrides given on the command line.
pub fn parse_overrides(raw: &[String]) -> Result<Vec<(Field, String)>> {
    raw.iter()
        .map(|entry| {
            let (field, column) = entry
                .split_once('=')
                .ok_or_else(|| Igreja360Error::Other(format!("Mapping must be field=column: {entry}")))?;
            let field = Field::from_key(field)
                .ok_or_else(|| Igreja360Error::Other(format!("Unknown import field: {field}")))?;
            Ok((field, column.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMapping {
    /// Resolve each field to a header index: explicit overrides first, then aliases.
    pub fn resolve(headers: &[String], overrides: &[(Field, String)]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut columns = BTreeMap::new();

        for (field, column) in overrides {
            let wanted = normalize_header(column);
            let idx = normalized.iter().position(|h| *h == wanted).ok_or_else(|| {
                Igreja360Error::Other(format!("Column '{column}' not found for {}", field.key()))
            })?;
            columns.insert(*field, idx);
        }

        for field in ALL_FIELDS {
            if columns.contains_key(field) {
                continue;
            }
            if let Some(idx) = normalized.iter().position(|h| field.aliases().contains(&h.as_str())) {
                columns.insert(*field, idx);
            }
        }

        let missing: Vec<&str> = ALL_FIELDS
            .iter()
            .filter(|f| f.required() && !columns.contains_key(f))
            .map(|f| f.key())
            .collect();
        if !missing.is_empty() {
            return Err(Igreja360Error::Other(format!(
                "Missing required columns: {} (use --map field=column)",
                missing.join(", ")
            )));
        }
        Ok(Self { columns })
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, field: Field) -> Option<&'r str> {
        let idx = *self.columns.get(&field)?;
        record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }

    fn to_transaction(&self, record: &csv::StringRecord) -> Result<NewTransaction> {
        let description = self
            .cell(record, Field::Description)
            .ok_or_else(|| Igreja360Error::Other("empty description".to_string()))?
            .to_string();
        let raw_amount = self
            .cell(record, Field::Amount)
            .ok_or_else(|| Igreja360Error::InvalidAmount(String::new()))?;
        let amount = parse_amount(raw_amount)?;
        money_to_cents(amount)?;
        let due_raw = self.cell(record, Field::DueDate).unwrap_or_default();
        let due_date = parse_date_flexible(due_raw)
            .ok_or_else(|| Igreja360Error::InvalidDate(due_raw.to_string()))?;
        let payment_date = match self.cell(record, Field::PaymentDate) {
            Some(raw) => Some(
                parse_date_flexible(raw).ok_or_else(|| Igreja360Error::InvalidDate(raw.to_string()))?,
            ),
            None => None,
        };
        let status = match self.cell(record, Field::Status) {
            Some(raw) => raw.parse()?,
            None if payment_date.is_some() => TransactionStatus::Paid,
            None => TransactionStatus::Pending,
        };
        let kind = match self.cell(record, Field::Kind) {
            Some(raw) => raw.parse()?,
            None if amount.is_sign_negative() => TransactionKind::Expense,
            None => TransactionKind::Income,
        };

        Ok(NewTransaction {
            description,
            amount: amount.abs(),
            kind,
            due_date: Some(due_date),
            payment_date,
            status,
            installment_group_id: self.cell(record, Field::InstallmentGroup).map(str::to_string),
            installment_number: self.count_cell(record, Field::InstallmentNumber)?,
            total_installments: self.count_cell(record, Field::TotalInstallments)?,
        })
    }

    fn count_cell(&self, record: &csv::StringRecord, field: Field) -> Result<Option<u32>> {
        self.cell(record, field)
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| Igreja360Error::Other(format!("{} must be a whole number: {raw}", field.key())))
            })
            .transpose()
    }
}

pub fn parse_file(file_path: &Path, overrides: &[(Field, String)]) -> Result<Vec<NewTransaction>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mapping = ColumnMapping::resolve(&headers, overrides)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // Header is line 1.
        let row = i + 2;
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let txn = mapping.to_transaction(&record).map_err(|e| Igreja360Error::Import {
            row,
            message: e.to_string(),
        })?;
        rows.push(txn);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Import a spreadsheet export. Nothing is written unless every row parses.
pub fn import_file(
    conn: &mut Connection,
    file_path: &Path,
    overrides: &[(Field, String)],
) -> Result<ImportResult> {
    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
        if stmt.exists([&checksum])? {
            tracing::info!(file = %file_path.display(), "file already imported");
            return Ok(ImportResult {
                imported: 0,
                skipped: 0,
                duplicate_file: true,
            });
        }
    }

    let parsed_rows = parse_file(file_path, overrides)?;
    tracing::debug!(rows = parsed_rows.len(), "parsed import file");

    let tx = conn.transaction()?;
    let dates: Vec<NaiveDate> = parsed_rows.iter().filter_map(|r| r.due_date).collect();
    tx.execute(
        "INSERT INTO imports (filename, record_count, date_range_start, date_range_end, checksum) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            parsed_rows.len() as i64,
            dates.iter().min(),
            dates.iter().max(),
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for row in &parsed_rows {
        if is_duplicate_row(&tx, row)? {
            skipped += 1;
            continue;
        }
        insert_transaction(&tx, row, Some(import_id))?;
        imported += 1;
    }
    tx.commit()?;

    Ok(ImportResult {
        imported,
        skipped,
        duplicate_file: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::ledger::{list_installment_transactions, list_transactions};

    fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_amount_brazilian() {
        assert_eq!(parse_amount("R$ 1.234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("50,00").unwrap(), Decimal::new(5000, 2));
        assert_eq!(parse_amount("1.234.567").unwrap(), Decimal::new(1234567, 0));
        assert_eq!(parse_amount("R$ 1.500").unwrap(), Decimal::new(1500, 0));
        assert_eq!(parse_amount("-2.000").unwrap(), Decimal::new(-2000, 0));
        assert_eq!(parse_amount("12.5").unwrap(), Decimal::new(125, 1));
    }

    #[test]
    fn test_parse_amount_us_and_negatives() {
        assert_eq!(parse_amount("1,234.56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("(500.00)").unwrap(), Decimal::new(-50000, 2));
        assert_eq!(parse_amount("\"-42.5\"").unwrap(), Decimal::new(-425, 1));
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_parse_date_flexible() {
        assert_eq!(parse_date_flexible("15/01/2025"), NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(parse_date_flexible("2025-01-15"), NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(parse_date_flexible("31/02/2025"), None);
        assert_eq!(parse_date_flexible("01/15/2025"), None);
    }

    #[test]
    fn test_mapping_uses_portuguese_headers() {
        let headers: Vec<String> = ["Descrição", "Valor", "Vencimento", "Situação"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = ColumnMapping::resolve(&headers, &[]).unwrap();
        assert_eq!(mapping.columns.get(&Field::Description), Some(&0));
        assert_eq!(mapping.columns.get(&Field::Status), Some(&3));
    }

    #[test]
    fn test_mapping_override_wins() {
        let headers: Vec<String> = ["Item", "Valor", "Quando"].iter().map(|s| s.to_string()).collect();
        assert!(ColumnMapping::resolve(&headers, &[]).is_err());
        let overrides = parse_overrides(&["description=Item".to_string(), "due_date=quando".to_string()]).unwrap();
        let mapping = ColumnMapping::resolve(&headers, &overrides).unwrap();
        assert_eq!(mapping.columns.get(&Field::DueDate), Some(&2));
    }

    #[test]
    fn test_parse_overrides_rejects_unknown_field() {
        assert!(parse_overrides(&["color=Cor".to_string()]).is_err());
        assert!(parse_overrides(&["amount".to_string()]).is_err());
    }

    #[test]
    fn test_import_installments() {
        let (dir, mut conn) = test_db();
        let path = write_csv(
            dir.path(),
            "parcelas.csv",
            "descricao,valor,vencimento,status,grupo,parcela,total_parcelas,tipo\n\
             Projetor (1/3),\"333,34\",10/01/2025,pago,proj,1,3,despesa\n\
             Projetor (2/3),\"333,33\",10/02/2025,pendente,proj,2,3,despesa\n\
             Projetor (3/3),\"333,33\",10/03/2025,pendente,proj,3,3,despesa\n\
             Oferta especial,\"500,00\",12/01/2025,pago,,,,receita\n",
        );
        let result = import_file(&mut conn, &path, &[]).unwrap();
        assert_eq!(result.imported, 4);
        assert_eq!(result.skipped, 0);
        let installments = list_installment_transactions(&conn).unwrap();
        assert_eq!(installments.len(), 3);
        assert_eq!(installments[0].status, TransactionStatus::Paid);
        assert_eq!(installments[2].total_installments, Some(3));
    }

    #[test]
    fn test_import_detects_file_duplicate() {
        let (dir, mut conn) = test_db();
        let path = write_csv(dir.path(), "a.csv", "description,amount,due_date\nLuz,100.00,2025-01-05\n");
        let r1 = import_file(&mut conn, &path, &[]).unwrap();
        assert_eq!(r1.imported, 1);
        let r2 = import_file(&mut conn, &path, &[]).unwrap();
        assert!(r2.duplicate_file);
        assert_eq!(r2.imported, 0);
    }

    #[test]
    fn test_import_skips_duplicate_rows() {
        let (dir, mut conn) = test_db();
        let a = write_csv(dir.path(), "a.csv", "description,amount,due_date\nLuz,100.00,2025-01-05\n");
        let b = write_csv(
            dir.path(),
            "b.csv",
            "description,amount,due_date\nLuz,100.00,2025-01-05\nAgua,80.00,2025-01-06\n",
        );
        import_file(&mut conn, &a, &[]).unwrap();
        let result = import_file(&mut conn, &b, &[]).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_bad_row_aborts_whole_import() {
        let (dir, mut conn) = test_db();
        let path = write_csv(
            dir.path(),
            "bad.csv",
            "description,amount,due_date\nLuz,100.00,2025-01-05\nAgua,oitenta,2025-01-06\n",
        );
        let err = import_file(&mut conn, &path, &[]).unwrap_err();
        assert!(matches!(err, Igreja360Error::Import { row: 3, .. }), "got: {err}");
        assert!(list_transactions(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_sub_cent_amount_fails_the_row() {
        let (dir, mut conn) = test_db();
        let path = write_csv(
            dir.path(),
            "cents.csv",
            "descricao,valor,vencimento\nLuz,\"10,005\",05/01/2025\n",
        );
        let err = import_file(&mut conn, &path, &[]).unwrap_err();
        assert!(matches!(err, Igreja360Error::Import { row: 2, .. }), "got: {err}");
        assert!(list_transactions(&conn, None).unwrap().is_empty());
    }
}
