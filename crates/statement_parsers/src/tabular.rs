//! Parser for spreadsheet exports: a 2-D grid of cells.
//!
//! The header row is located by synonym matching over the first rows,
//! columns are mapped to canonical roles, and every data row routes its
//! date/amount cells through the normalizer whether they arrive as
//! native numbers or locale strings.

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use models::{DetectedFormat, ParseMetadata, ParseResult, RawMovement};
use std::path::Path;

use crate::ParseOptions;

/// How many leading rows are scanned for a header row.
const HEADER_SCAN_ROWS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Date,
    ValueDate,
    Description,
    Amount,
    Balance,
    Category,
    Subcategory,
}

fn role_for(header: &str) -> Option<ColumnRole> {
    let text = header.trim().to_lowercase();
    let role = match text.as_str() {
        "fecha valor" | "f. valor" | "fecha de valor" | "value date" => ColumnRole::ValueDate,
        "fecha" | "f. operación" | "f. operacion" | "fecha operación" | "fecha operacion"
        | "fecha contable" | "date" => ColumnRole::Date,
        "concepto" | "descripción" | "descripcion" | "movimiento" | "detalle" | "description" => {
            ColumnRole::Description
        }
        "importe" | "importe (€)" | "cantidad" | "amount" => ColumnRole::Amount,
        "saldo" | "saldo (€)" | "disponible" | "balance" => ColumnRole::Balance,
        "categoría" | "categoria" | "category" => ColumnRole::Category,
        "subcategoría" | "subcategoria" | "subcategory" => ColumnRole::Subcategory,
        _ => return None,
    };
    Some(role)
}

#[derive(Debug, Default)]
struct ColumnMap {
    date: Option<usize>,
    value_date: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
    balance: Option<usize>,
    category: Option<usize>,
    subcategory: Option<usize>,
}

impl ColumnMap {
    fn assign(&mut self, role: ColumnRole, col: usize) {
        let slot = match role {
            ColumnRole::Date => &mut self.date,
            ColumnRole::ValueDate => &mut self.value_date,
            ColumnRole::Description => &mut self.description,
            ColumnRole::Amount => &mut self.amount,
            ColumnRole::Balance => &mut self.balance,
            ColumnRole::Category => &mut self.category,
            ColumnRole::Subcategory => &mut self.subcategory,
        };
        if slot.is_none() {
            *slot = Some(col);
        }
    }

    fn mapped_count(&self) -> usize {
        [
            self.date,
            self.value_date,
            self.description,
            self.amount,
            self.balance,
            self.category,
            self.subcategory,
        ]
        .iter()
        .filter(|c| c.is_some())
        .count()
    }

    /// The value date takes precedence over the generic date when both
    /// columns are present.
    fn effective_date_col(&self) -> Option<usize> {
        self.value_date.or(self.date)
    }
}

pub struct TabularStatementParser {
    options: ParseOptions,
}

impl TabularStatementParser {
    pub fn new() -> Self {
        Self {
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Convenience entry: opens an xlsx workbook and parses its first
    /// sheet. Only the file-level I/O can fail; everything downstream is
    /// reported through `ParseResult.errors`.
    pub fn parse_workbook_path<P: AsRef<Path>>(&self, path: P) -> Result<ParseResult> {
        let mut workbook: Xlsx<_> = open_workbook(path.as_ref())
            .with_context(|| format!("failed to open workbook: {}", path.as_ref().display()))?;

        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Ok(ParseResult::empty(
                DetectedFormat::Tabular,
                "no sheet present in workbook",
            ));
        };
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("failed to read sheet '{}'", sheet_name))?;

        Ok(self.parse_range(&range))
    }

    /// Parses a 2-D cell grid. Tolerant by default: bad rows are skipped
    /// with a diagnostic; only an absent/unrecognizable header stops the
    /// parse (with zero movements, never a hard fault).
    pub fn parse_range(&self, range: &Range<Data>) -> ParseResult {
        let (height, _) = range.get_size();
        if height == 0 {
            return ParseResult::empty(DetectedFormat::Tabular, "sheet contains no rows");
        }

        let Some((header_row, columns)) = find_header(range) else {
            return ParseResult::empty(
                DetectedFormat::Tabular,
                "no header row found in the first 15 rows (need at least 2 known column names)",
            );
        };

        let mut errors = Vec::new();
        let mut movements = Vec::new();

        for (row_idx, row) in range.rows().enumerate().skip(header_row + 1) {
            if row.iter().all(is_empty_cell) {
                continue;
            }
            match build_row_movement(row, &columns) {
                Ok(movement) => movements.push(movement),
                Err(reason) => errors.push(self.options.line_diagnostic(row_idx + 1, &reason)),
            }
        }

        // Reconciliation must see the original file order: source balances
        // are only self-consistent against it.
        if self.options.validate_balances {
            let report = validation::reconcile(&movements);
            errors.extend(report.warnings);
        }

        if !is_chronological(&movements) {
            let order = validation::chronological_indices(&movements);
            movements = order.into_iter().map(|i| movements[i].clone()).collect();
            errors.push(
                "rows were not in chronological order; output reordered by value date".to_string(),
            );
        }

        let metadata = ParseMetadata {
            period_start: movements.iter().map(|m| m.date).min(),
            period_end: movements.iter().map(|m| m.date).max(),
            line_count: height,
            movement_count: movements.len(),
        };

        ParseResult {
            movements,
            detected_format: DetectedFormat::Tabular,
            errors,
            metadata: Some(metadata),
        }
    }
}

impl Default for TabularStatementParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans the first rows for the first one holding at least 2 known
/// column names.
fn find_header(range: &Range<Data>) -> Option<(usize, ColumnMap)> {
    for (row_idx, row) in range.rows().enumerate().take(HEADER_SCAN_ROWS) {
        let mut columns = ColumnMap::default();
        for (col_idx, cell) in row.iter().enumerate() {
            if let Some(role) = role_for(&cell_str(cell)) {
                columns.assign(role, col_idx);
            }
        }
        if columns.mapped_count() >= 2 {
            return Some((row_idx, columns));
        }
    }
    None
}

fn build_row_movement(row: &[Data], columns: &ColumnMap) -> Result<RawMovement, String> {
    let date_col = columns
        .effective_date_col()
        .ok_or_else(|| "no date column mapped".to_string())?;
    let description_col = columns
        .description
        .ok_or_else(|| "no description column mapped".to_string())?;
    let amount_col = columns
        .amount
        .ok_or_else(|| "no amount column mapped".to_string())?;

    let date = cell_date(row.get(date_col)).ok_or_else(|| "missing or invalid date".to_string())?;
    let description = cell_str_opt(row.get(description_col))
        .ok_or_else(|| "missing description".to_string())?;
    let amount =
        cell_amount(row.get(amount_col)).ok_or_else(|| "missing or invalid amount".to_string())?;

    let balance = columns
        .balance
        .and_then(|col| cell_amount(row.get(col)))
        .unwrap_or(0.0);

    let mut movement = RawMovement::new(date, description, amount, balance);
    movement.source_category = columns.category.and_then(|col| cell_str_opt(row.get(col)));
    movement.source_subcategory = columns
        .subcategory
        .and_then(|col| cell_str_opt(row.get(col)));
    Ok(movement)
}

fn is_empty_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_str(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_str_opt(cell: Option<&Data>) -> Option<String> {
    let text = cell_str(cell?);
    (!text.is_empty()).then_some(text)
}

/// Dates arrive either as spreadsheet serial numbers or locale strings.
fn cell_date(cell: Option<&Data>) -> Option<NaiveDate> {
    match cell? {
        Data::Float(serial) => normalization::serial_to_date(*serial),
        Data::Int(serial) => normalization::serial_to_date(*serial as f64),
        Data::DateTime(dt) => normalization::serial_to_date(dt.as_f64()),
        Data::String(s) => normalization::parse_locale_date(s).ok(),
        _ => None,
    }
}

/// Amounts arrive either as native numbers or locale strings.
fn cell_amount(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => normalization::parse_locale_amount(s).ok(),
        _ => None,
    }
}

/// True when no later row carries an earlier value-date than one of its
/// predecessors.
fn is_chronological(movements: &[RawMovement]) -> bool {
    movements.windows(2).all(|pair| pair[0].date <= pair[1].date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn f(value: f64) -> Data {
        Data::Float(value)
    }

    fn grid(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1);
        let mut range = Range::new((0, 0), (height as u32 - 1, width as u32 - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    fn header() -> Vec<Data> {
        vec![s("Fecha"), s("Concepto"), s("Importe"), s("Saldo")]
    }

    #[test]
    fn test_basic_sheet() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            vec![s("Extracto de movimientos")],
            header(),
            vec![s("01/12/2023"), s("COMPRA MERCADONA"), s("-45,67"), s("1.234,56")],
            vec![s("02/12/2023"), s("NOMINA EMPRESA"), f(1850.0), f(3084.56)],
        ]);
        let result = parser.parse_range(&range);

        assert_eq!(result.movements.len(), 2);
        assert_eq!(result.movements[0].amount, -45.67);
        assert_eq!(result.movements[0].balance, 1234.56);
        assert_eq!(result.movements[1].amount, 1850.0);
        assert_eq!(result.detected_format, DetectedFormat::Tabular);
    }

    #[test]
    fn test_serial_dates_and_value_date_precedence() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            vec![s("Fecha"), s("Fecha valor"), s("Concepto"), s("Importe")],
            // 45292 = 2024-01-01; the contable date differs and must lose
            vec![s("31/12/2023"), f(45292.0), s("COMPRA REYES"), s("-10,00")],
        ]);
        let result = parser.parse_range(&range);

        assert_eq!(result.movements.len(), 1);
        assert_eq!(
            result.movements[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(result.movements[0].balance, 0.0);
    }

    #[test]
    fn test_no_header_row() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            vec![s("just"), s("random")],
            vec![s("cells"), s("here")],
        ]);
        let result = parser.parse_range(&range);

        assert!(result.movements.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("header"));
    }

    #[test]
    fn test_bad_rows_skipped_with_warning() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            header(),
            vec![s("01/12/2023"), s("COMPRA A"), s("-1,00"), s("99,00")],
            vec![s("31/02/2023"), s("FECHA MALA"), s("-1,00"), s("98,00")],
            vec![s("02/12/2023"), s(""), s("-1,00"), s("97,00")],
            vec![Data::Empty, Data::Empty, Data::Empty, Data::Empty],
        ]);
        let result = parser.parse_range(&range);

        assert_eq!(result.movements.len(), 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("date"));
        assert!(result.errors[1].contains("description"));
    }

    #[test]
    fn test_reverse_chronological_rows_reordered_with_diagnostic() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            header(),
            vec![s("02/01/2024"), s("SEGUNDO"), s("-10,00"), s("80,00")],
            vec![s("01/01/2024"), s("PRIMERO"), s("-10,00"), s("90,00")],
        ]);
        let result = parser.parse_range(&range);

        assert_eq!(result.movements.len(), 2);
        assert_eq!(result.movements[0].description, "PRIMERO");
        assert_eq!(result.movements[1].description, "SEGUNDO");
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("reordered")));
    }

    #[test]
    fn test_reconciliation_runs_on_original_order() {
        // Statement order (most-recent-first) is balance-consistent, so no
        // mismatch may be reported even though the output is reordered.
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            header(),
            vec![s("02/01/2024"), s("NOMINA"), s("1.000,00"), s("1.090,00")],
            vec![s("01/01/2024"), s("COMPRA"), s("-10,00"), s("90,00")],
        ]);
        let result = parser.parse_range(&range);

        assert!(result.errors.iter().all(|e| !e.contains("mismatch")));
        assert!(result.errors.iter().any(|e| e.contains("reordered")));
        assert_eq!(result.movements[0].description, "COMPRA");
    }

    #[test]
    fn test_source_categories_carried_over() {
        let parser = TabularStatementParser::new();
        let range = grid(vec![
            vec![
                s("Fecha"),
                s("Concepto"),
                s("Importe"),
                s("Saldo"),
                s("Categoría"),
                s("Subcategoría"),
            ],
            vec![
                s("01/12/2023"),
                s("COMPRA MERCADONA"),
                s("-45,67"),
                s("1.234,56"),
                s("Supermercado"),
                s("Alimentación"),
            ],
        ]);
        let result = parser.parse_range(&range);

        assert_eq!(
            result.movements[0].source_category.as_deref(),
            Some("Supermercado")
        );
        assert_eq!(
            result.movements[0].source_subcategory.as_deref(),
            Some("Alimentación")
        );
    }
}
