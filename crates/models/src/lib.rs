//! Shared value objects for the statement ingestion pipeline.
//!
//! Everything here is transient: produced and consumed within a single
//! ingestion call. Identity assignment belongs to the persistence layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One parsed line of a bank statement.
///
/// `amount` is signed: negative = outflow, positive = inflow.
/// `balance` is the account balance stated by the source right after this
/// movement; parsers default it to 0.0 when the source omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMovement {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_subcategory: Option<String>,
}

impl RawMovement {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: f64, balance: f64) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            balance,
            source_category: None,
            source_subcategory: None,
        }
    }
}

/// Which input shape a parse call recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectedFormat {
    PlainText,
    Tabular,
    PdfDerived,
}

/// Optional statement-level facts a parser was able to establish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    pub line_count: usize,
    pub movement_count: usize,
}

/// Output of any parser.
///
/// Parsers are tolerant by default: they accumulate diagnostic lines in
/// `errors` instead of aborting, so one call surfaces the complete picture
/// of a statement's quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub movements: Vec<RawMovement>,
    pub detected_format: DetectedFormat,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ParseMetadata>,
}

impl ParseResult {
    pub fn empty(format: DetectedFormat, diagnostic: impl Into<String>) -> Self {
        Self {
            movements: Vec::new(),
            detected_format: format,
            errors: vec![diagnostic.into()],
            metadata: None,
        }
    }
}

/// A movement rejected by the per-record validator, with every reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidMovement {
    pub movement: RawMovement,
    pub errors: Vec<String>,
}

/// Output of the per-record validator. A movement is either wholly valid
/// or sits in `invalid_movements` with its accumulated reasons; no partial
/// movement ever enters the valid set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub valid_movements: Vec<RawMovement>,
    pub invalid_movements: Vec<InvalidMovement>,
}

/// How a categorization rule's `pattern` is interpreted against the
/// movement description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    StartsWith,
    EndsWith,
    Exact,
    Regex,
}

impl MatchType {
    /// Evaluates `pattern` against `description` under this match type.
    ///
    /// Both sides are expected uppercased by the caller for the literal
    /// variants. A regex that fails to compile matches nothing; it must
    /// never take the pipeline down.
    pub fn matches(&self, pattern: &str, description: &str) -> bool {
        match self {
            MatchType::Contains => description.contains(pattern),
            MatchType::StartsWith => description.starts_with(pattern),
            MatchType::EndsWith => description.ends_with(pattern),
            MatchType::Exact => description == pattern,
            MatchType::Regex => match regex::Regex::new(pattern) {
                Ok(re) => re.is_match(description),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "invalid regex rule pattern, treated as non-matching");
                    false
                }
            },
        }
    }
}

/// An immutable categorization rule. Lower `priority` is evaluated first
/// and therefore wins ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub match_type: MatchType,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub priority: i32,
    pub active: bool,
}

/// A movement with the category the engine settled on. Created once per
/// input movement; only an explicit user override mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedMovement {
    #[serde(flatten)]
    pub movement: RawMovement,
    pub detected_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_subcategory: Option<String>,
    /// 0-100 inclusive.
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_rule: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_literals() {
        assert!(MatchType::Contains.matches("MERCADONA", "COMPRA MERCADONA VALENCIA"));
        assert!(MatchType::StartsWith.matches("COMPRA", "COMPRA MERCADONA"));
        assert!(MatchType::EndsWith.matches("MADRID", "TAXI MADRID"));
        assert!(MatchType::Exact.matches("NOMINA", "NOMINA"));
        assert!(!MatchType::Exact.matches("NOMINA", "NOMINA ENERO"));
    }

    #[test]
    fn test_match_type_regex() {
        assert!(MatchType::Regex.matches(r"RECIBO\s+\d+", "RECIBO 00123 LUZ"));
        assert!(!MatchType::Regex.matches(r"RECIBO\s+\d+", "RECIBO LUZ"));
    }

    #[test]
    fn test_broken_regex_matches_nothing() {
        assert!(!MatchType::Regex.matches(r"((unclosed", "ANYTHING"));
    }

    #[test]
    fn test_detected_format_tags() {
        let s = serde_json::to_string(&DetectedFormat::PdfDerived).unwrap();
        assert_eq!(s, "\"pdf-derived\"");
        let s = serde_json::to_string(&DetectedFormat::PlainText).unwrap();
        assert_eq!(s, "\"plain-text\"");
    }
}
