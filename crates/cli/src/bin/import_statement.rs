use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::{fs, path::PathBuf};

use categorization::{CategorizationEngine, InMemoryRuleStore};
use models::CategorizationRule;
use statement_parsers::{
    ParseOptions, parse_pdf_text, TabularStatementParser, TextStatementParser,
};
use validation::{reconcile, MovementValidator, ValidationOptions};

#[derive(Parser, Debug)]
#[command(
    name = "import-statement",
    about = "Parse, validate and categorize a bank statement, printing a JSON report."
)]
struct Args {
    /// Statement file: .xlsx/.xls workbook, .txt/.csv plain text, or
    /// text extracted from a PDF
    input: PathBuf,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Skip balance reconciliation against stated balances
    #[arg(long)]
    no_balance_check: bool,

    /// Exclude later duplicates instead of only counting them
    #[arg(long)]
    ignore_duplicates: bool,

    /// JSON file with extra categorization rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Account id for account-scoped rules
    #[arg(short, long)]
    account: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "import_statement=info,statement_parsers=info".into()),
        )
        .init();

    let args = Args::parse();

    let options = ParseOptions {
        tolerate_format_errors: !args.strict,
        validate_balances: !args.no_balance_check,
    };

    let parsed = parse_input(&args.input, options)?;
    tracing::info!(
        movements = parsed.movements.len(),
        errors = parsed.errors.len(),
        "parsed {}",
        args.input.display()
    );

    let validator = MovementValidator::with_options(ValidationOptions {
        ignore_duplicates: args.ignore_duplicates,
        ..ValidationOptions::default()
    });
    let validation = validator.validate_and_clean(&parsed.movements);

    let reconciliation = reconcile(&validation.valid_movements);

    let store = load_rule_store(args.rules.as_deref())?;
    let engine = CategorizationEngine::new();
    let categorized = engine
        .categorize_all(&store, args.account.as_deref(), &validation.valid_movements)
        .await;

    let report = json!({
        "input": args.input.display().to_string(),
        "detected_format": parsed.detected_format,
        "metadata": parsed.metadata,
        "parse_errors": parsed.errors,
        "validation": {
            "valid": validation.valid,
            "errors": validation.errors,
            "warnings": validation.warnings,
            "invalid_movements": validation.invalid_movements,
        },
        "reconciliation": reconciliation,
        "movements": categorized,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn parse_input(path: &std::path::Path, options: ParseOptions) -> Result<models::ParseResult> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("xlsx") | Some("xls") => TabularStatementParser::new()
            .with_options(options)
            .parse_workbook_path(path),
        Some("txt") | Some("csv") => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(TextStatementParser::new().with_options(options).parse(&text))
        }
        // Anything else is treated as text extracted from a PDF.
        _ => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(parse_pdf_text(&text, options))
        }
    }
}

fn load_rule_store(path: Option<&std::path::Path>) -> Result<InMemoryRuleStore> {
    let Some(path) = path else {
        return Ok(InMemoryRuleStore::new(Vec::new()));
    };
    let txt =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let rules: Vec<CategorizationRule> = serde_json::from_str(&txt)
        .with_context(|| format!("parsing rules from {}", path.display()))?;
    Ok(InMemoryRuleStore::new(rules))
}
