//! Parser for free-form pasted statement text.
//!
//! Detection first (institution markers, then a structural date/amount
//! co-occurrence check), then an ordered table of named line patterns;
//! if none of them matches anywhere, a generic per-line heuristic takes
//! over. Malformed individual lines never abort the parse.

use models::{DetectedFormat, ParseMetadata, ParseResult, RawMovement};
use regex::Regex;

use crate::{ParseOptions, BANK_MARKERS};

/// Keywords the bank embeds in descriptions that carry its own (coarse)
/// categorization. Matched against the uppercased description.
const SOURCE_CATEGORY_KEYWORDS: [(&str, &str); 6] = [
    ("NOMINA", "Nómina"),
    ("RECIBO", "Recibos"),
    ("TRANSFERENCIA", "Transferencias"),
    ("BIZUM", "Bizum"),
    ("COMISION", "Comisiones"),
    ("CAJERO", "Cajero"),
];

struct LinePattern {
    name: &'static str,
    regex: Regex,
}

/// Ordered table of known statement line shapes. The first pattern that
/// matches at least one line becomes the active format for the call.
fn line_patterns() -> Vec<LinePattern> {
    let table: [(&'static str, &'static str); 4] = [
        (
            "full",
            r"^\s*(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(-?[\d.,]+)\s*(?:EUR|€)\s+(-?[\d.,]+)\s*(?:EUR|€)\s*$",
        ),
        (
            "no-suffix",
            r"^\s*(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(-?[\d.,]+)\s+(-?[\d.,]+)\s*$",
        ),
        (
            "tab-delimited",
            r"^\s*(\d{2}/\d{2}/\d{4})\t+([^\t]+?)\t+(-?[\d.,]+)(?:\t+(-?[\d.,]+))?\s*$",
        ),
        (
            "quoted-csv",
            r#"^"(\d{2}/\d{2}/\d{4})","([^"]*)","(-?[\d.,]+)"(?:,"(-?[\d.,]+)")?\s*$"#,
        ),
    ];
    table
        .into_iter()
        .map(|(name, pattern)| LinePattern {
            name,
            regex: Regex::new(pattern).unwrap(),
        })
        .collect()
}

pub struct TextStatementParser {
    options: ParseOptions,
}

impl TextStatementParser {
    pub fn new() -> Self {
        Self {
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses a pasted statement blob. Never fails: unrecognizable input
    /// yields zero movements plus a diagnostic.
    pub fn parse(&self, text: &str) -> ParseResult {
        let text = normalize_newlines(text);
        let lines = collapse_blank_runs(&text);

        if !looks_like_statement(&text) {
            return ParseResult::empty(
                DetectedFormat::PlainText,
                "input does not look like a bank statement: no institution marker and no \
                 date/amount lines found",
            );
        }

        let mut errors = Vec::new();
        let mut movements = Vec::new();

        if let Some(pattern) = active_pattern(&lines) {
            tracing::debug!(pattern = pattern.name, "text statement line pattern selected");
            for (number, line) in numbered(&lines) {
                let Some(caps) = pattern.regex.captures(line) else {
                    continue; // header/footer noise, not a movement line
                };
                let balance = caps.get(4).map(|m| m.as_str());
                match build_movement(&caps[1], &caps[2], &caps[3], balance) {
                    Ok(movement) => movements.push(movement),
                    Err(reason) => errors.push(self.options.line_diagnostic(number, &reason)),
                }
            }
        } else {
            // Generic heuristic: a date token, then the first two
            // amount-shaped tokens (amount, balance); the description is
            // the text strictly between the date and the first amount.
            for (number, line) in numbered(&lines) {
                match generic_line(line) {
                    Some(Ok(movement)) => movements.push(movement),
                    Some(Err(reason)) => {
                        errors.push(self.options.line_diagnostic(number, &reason))
                    }
                    None => {}
                }
            }
            if movements.is_empty() && errors.is_empty() {
                errors.push("no movement lines recognized in statement text".to_string());
            }
        }

        let metadata = build_metadata(&lines, &movements);
        ParseResult {
            movements,
            detected_format: DetectedFormat::PlainText,
            errors,
            metadata: Some(metadata),
        }
    }
}

impl Default for TextStatementParser {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Splits into lines, collapsing runs of blank lines into one.
fn collapse_blank_runs(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        lines.push(line.to_string());
    }
    lines
}

/// Institution markers, or failing that a structural check: a date
/// pattern and a currency-amount pattern co-occurring anywhere.
fn looks_like_statement(text: &str) -> bool {
    let upper = text.to_uppercase();
    if BANK_MARKERS.iter().any(|m| upper.contains(m)) {
        return true;
    }
    let date_re = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();
    let amount_re = Regex::new(r"-?\d+(?:\.\d{3})*[.,]\d{2}(?:\s*(?:EUR|€))?").unwrap();
    date_re.is_match(text) && amount_re.is_match(text)
}

fn active_pattern(lines: &[String]) -> Option<LinePattern> {
    line_patterns()
        .into_iter()
        .find(|pattern| lines.iter().any(|line| pattern.regex.is_match(line)))
}

fn numbered(lines: &[String]) -> impl Iterator<Item = (usize, &str)> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.as_str()))
}

fn build_movement(
    date: &str,
    description: &str,
    amount: &str,
    balance: Option<&str>,
) -> Result<RawMovement, String> {
    let date = normalization::parse_locale_date(date).map_err(|e| e.to_string())?;
    let amount = normalization::parse_locale_amount(amount).map_err(|e| e.to_string())?;
    let balance = match balance {
        Some(raw) => normalization::parse_locale_amount(raw).map_err(|e| e.to_string())?,
        None => 0.0,
    };

    let description = description.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut movement = RawMovement::new(date, description, amount, balance);
    movement.source_category = detect_source_category(&movement.description);
    Ok(movement)
}

/// Fixed keyword lookup populating `source_category` from the bank's own
/// description vocabulary.
fn detect_source_category(description: &str) -> Option<String> {
    let upper = description.to_uppercase();
    SOURCE_CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map(|(_, label)| (*label).to_string())
}

/// Per-line fallback when no named pattern matches anywhere in the text.
fn generic_line(line: &str) -> Option<Result<RawMovement, String>> {
    let date_re = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();
    let amount_re = Regex::new(r"-?\d+(?:\.\d{3})*(?:,\d{1,2})?-?").unwrap();

    let date_match = date_re.find(line)?;
    let rest = &line[date_match.end()..];

    let mut amounts = amount_re.find_iter(rest);
    let first = amounts.next()?;
    let second = amounts.next();

    let description = rest[..first.start()].trim();
    if description.is_empty() {
        return None;
    }

    let amount = first.as_str();
    let balance = second.map(|m| m.as_str());
    Some(build_movement(date_match.as_str(), description, amount, balance))
}

fn build_metadata(lines: &[String], movements: &[RawMovement]) -> ParseMetadata {
    ParseMetadata {
        period_start: movements.iter().map(|m| m.date).min(),
        period_end: movements.iter().map(|m| m.date).max(),
        line_count: lines.len(),
        movement_count: movements.len(),
    }
}
