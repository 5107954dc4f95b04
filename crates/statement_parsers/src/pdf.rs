//! Parser for text already extracted from a PDF statement.
//!
//! PDF layout handling is an external concern; this path receives plain
//! text, checks the institution preamble and reuses the text parser.

use models::{DetectedFormat, ParseResult};

use crate::{text::TextStatementParser, ParseOptions, BANK_MARKERS};

/// How many leading lines may hold the statement preamble.
const PREAMBLE_LINES: usize = 10;

pub fn parse_pdf_text(text: &str, options: ParseOptions) -> ParseResult {
    if !has_statement_preamble(text) {
        return ParseResult::empty(
            DetectedFormat::PdfDerived,
            "extracted text has no recognizable statement preamble",
        );
    }

    let mut result = TextStatementParser::new().with_options(options).parse(text);
    result.detected_format = DetectedFormat::PdfDerived;
    result
}

fn has_statement_preamble(text: &str) -> bool {
    text.lines().take(PREAMBLE_LINES).any(|line| {
        let upper = line.to_uppercase();
        BANK_MARKERS.iter().any(|m| upper.contains(m)) || upper.contains("EXTRACTO")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_text_parses_and_retags() {
        let text = "EXTRACTO DE CUENTA\nBBVA\n\
                    01/12/2023 MERCADONA COMPRA SUPERMERCADO -45,67 EUR 1.234,56 EUR";
        let result = parse_pdf_text(text, ParseOptions::default());

        assert_eq!(result.detected_format, DetectedFormat::PdfDerived);
        assert_eq!(result.movements.len(), 1);
        assert_eq!(result.movements[0].amount, -45.67);
    }

    #[test]
    fn test_missing_preamble_yields_diagnostic() {
        let text = "01/12/2023 COMPRA ALGO -45,67 EUR 1.234,56 EUR";
        let result = parse_pdf_text(text, ParseOptions::default());

        assert!(result.movements.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("preamble"));
    }
}
