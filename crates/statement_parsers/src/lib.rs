//! BBVA statement parsers: plain pasted text, xlsx cell grids and
//! pre-extracted PDF text, all emitting the same `ParseResult`.

pub mod pdf;
pub mod tabular;
pub mod text;

pub use crate::pdf::parse_pdf_text;
pub use crate::tabular::TabularStatementParser;
pub use crate::text::TextStatementParser;

/// Institution name markers used for format detection.
pub const BANK_MARKERS: [&str; 2] = ["BBVA", "BANCO BILBAO VIZCAYA"];

/// Per-call parser configuration, threaded through every parse path.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Tolerant mode (the default): malformed lines/rows are skipped with
    /// a warning. Strict mode records them as errors instead.
    pub tolerate_format_errors: bool,
    /// Run the balance-reconciliation check where the source order allows
    /// it (tabular sources, before any reordering).
    pub validate_balances: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tolerate_format_errors: true,
            validate_balances: true,
        }
    }
}

impl ParseOptions {
    /// Formats a per-line/per-row failure according to the mode: a skip
    /// warning in tolerant mode, an error line in strict mode.
    pub(crate) fn line_diagnostic(&self, line: usize, reason: &str) -> String {
        if self.tolerate_format_errors {
            format!("skipped line {}: {}", line, reason)
        } else {
            format!("line {} failed: {}", line, reason)
        }
    }
}
