//! Running-balance reconciliation over an ordered movement sequence.
//!
//! Reconciliation is diagnostic only: discrepancies are reported with a
//! severity tier, never used to reject a movement. Balances equal to the
//! parsers' 0.0 "unknown" default are skipped so sources without balance
//! data do not produce false positives.

use chrono::NaiveDate;
use models::RawMovement;
use serde::Serialize;

/// Differences up to this are accepted as rounding noise.
pub const ACCEPTED_TOLERANCE: f64 = 0.02;
/// Differences up to this are reported as minor; above it, severe.
pub const MINOR_TOLERANCE: f64 = 1.00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancySeverity {
    Minor,
    Severe,
}

/// One adjacent-pair balance mismatch, keyed by the original file index
/// of the movement whose stated balance disagrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceDiscrepancy {
    pub index: usize,
    pub date: NaiveDate,
    pub description: String,
    pub expected_balance: f64,
    pub stated_balance: f64,
    pub difference: f64,
    pub severity: DiscrepancySeverity,
}

/// Whole-statement arithmetic, to help a human spot missing movements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementSummary {
    /// Oldest stated balance minus that movement's amount.
    pub opening_balance: Option<f64>,
    /// Algebraic sum of all amounts.
    pub total_amount: f64,
    pub computed_closing_balance: Option<f64>,
    pub stated_closing_balance: Option<f64>,
    pub closing_difference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub discrepancies: Vec<BalanceDiscrepancy>,
    pub warnings: Vec<String>,
    pub summary: StatementSummary,
}

/// Indices of `movements` in chronological order.
///
/// Primary key is the date; same-day ties break by reverse original
/// index, because statements list most-recent-first, so among same-day
/// entries the one appearing earlier in the file is chronologically
/// later.
pub fn chronological_indices(movements: &[RawMovement]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..movements.len()).collect();
    indices.sort_by(|&a, &b| {
        movements[a]
            .date
            .cmp(&movements[b].date)
            .then_with(|| b.cmp(&a))
    });
    indices
}

/// Walks the chronological order and checks every adjacent pair:
/// `expected = previous balance + current amount` against the stated
/// balance. Pure over its input; running it twice yields the same report.
pub fn reconcile(movements: &[RawMovement]) -> ReconciliationReport {
    let order = chronological_indices(movements);

    let mut discrepancies = Vec::new();
    let mut warnings = Vec::new();

    for pair in order.windows(2) {
        let prev = &movements[pair[0]];
        let current = &movements[pair[1]];

        // 0.0 is the parser default for "balance not stated by the source"
        if prev.balance == 0.0 || current.balance == 0.0 {
            continue;
        }

        let expected = prev.balance + current.amount;
        let difference = (current.balance - expected).abs();
        if difference <= ACCEPTED_TOLERANCE {
            continue;
        }

        let severity = if difference <= MINOR_TOLERANCE {
            DiscrepancySeverity::Minor
        } else {
            DiscrepancySeverity::Severe
        };
        warnings.push(format!(
            "{} balance mismatch on {} \"{}\": expected {:.2}, statement says {:.2} (off by {:.2})",
            match severity {
                DiscrepancySeverity::Minor => "minor",
                DiscrepancySeverity::Severe => "severe",
            },
            current.date.format("%d/%m/%Y"),
            current.description,
            expected,
            current.balance,
            difference,
        ));
        discrepancies.push(BalanceDiscrepancy {
            index: pair[1],
            date: current.date,
            description: current.description.clone(),
            expected_balance: normalization::round2(expected),
            stated_balance: current.balance,
            difference: normalization::round2(difference),
            severity,
        });
    }

    ReconciliationReport {
        discrepancies,
        warnings,
        summary: build_summary(movements, &order),
    }
}

fn build_summary(movements: &[RawMovement], order: &[usize]) -> StatementSummary {
    let total_amount: f64 = movements.iter().map(|m| m.amount).sum();

    let (oldest, newest) = match (order.first(), order.last()) {
        (Some(&first), Some(&last)) => (&movements[first], &movements[last]),
        _ => {
            return StatementSummary {
                total_amount: 0.0,
                ..Default::default()
            }
        }
    };

    let opening_balance = (oldest.balance != 0.0)
        .then(|| normalization::round2(oldest.balance - oldest.amount));
    let stated_closing_balance = (newest.balance != 0.0).then_some(newest.balance);
    let computed_closing_balance =
        opening_balance.map(|opening| normalization::round2(opening + total_amount));
    let closing_difference = match (stated_closing_balance, computed_closing_balance) {
        (Some(stated), Some(computed)) => Some(normalization::round2(stated - computed)),
        _ => None,
    };

    StatementSummary {
        opening_balance,
        total_amount: normalization::round2(total_amount),
        computed_closing_balance,
        stated_closing_balance,
        closing_difference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(date: &str, description: &str, amount: f64, balance: f64) -> RawMovement {
        RawMovement::new(
            NaiveDate::parse_from_str(date, "%d/%m/%Y").unwrap(),
            description,
            amount,
            balance,
        )
    }

    #[test]
    fn test_consistent_statement_has_no_discrepancies() {
        // most-recent-first, as statements arrive
        let movements = vec![
            movement("03/01/2024", "COMPRA FARMACIA", -12.00, 1038.00),
            movement("02/01/2024", "NOMINA EMPRESA SL", 1000.00, 1050.00),
            movement("01/01/2024", "COMPRA MERCADONA", -50.00, 50.00),
        ];

        let report = reconcile(&movements);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.summary.opening_balance, Some(100.00));
        assert_eq!(report.summary.total_amount, 938.00);
        assert_eq!(report.summary.stated_closing_balance, Some(1038.00));
        assert_eq!(report.summary.closing_difference, Some(0.0));
    }

    #[test]
    fn test_severity_tiers() {
        let movements = vec![
            movement("01/01/2024", "A", -50.00, 1000.00),
            movement("02/01/2024", "B", -10.00, 990.50), // off by 0.50 -> minor
            movement("03/01/2024", "C", -10.00, 900.00), // off by 80.50 -> severe
        ];
        // already oldest-first; same result either way, only order matters per-day
        let report = reconcile(&movements);
        assert_eq!(report.discrepancies.len(), 2);
        assert_eq!(report.discrepancies[0].severity, DiscrepancySeverity::Minor);
        assert_eq!(report.discrepancies[0].difference, 0.50);
        assert_eq!(report.discrepancies[1].severity, DiscrepancySeverity::Severe);
    }

    #[test]
    fn test_rounding_noise_accepted() {
        let movements = vec![
            movement("01/01/2024", "A", -50.00, 1000.00),
            movement("02/01/2024", "B", -10.00, 990.01),
        ];
        let report = reconcile(&movements);
        assert!(report.discrepancies.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_balances_skip_comparison() {
        let movements = vec![
            movement("01/01/2024", "A", -50.00, 0.0),
            movement("02/01/2024", "B", -10.00, 0.0),
        ];
        let report = reconcile(&movements);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.summary.opening_balance, None);
        assert_eq!(report.summary.total_amount, -60.00);
    }

    #[test]
    fn test_same_day_ties_break_by_reverse_file_index() {
        // Two same-day entries: the earlier file entry is the later one
        // chronologically, so chronological order is index 1 then index 0.
        let movements = vec![
            movement("01/01/2024", "LATER SAME DAY", -10.00, 80.00),
            movement("01/01/2024", "EARLIER SAME DAY", -10.00, 90.00),
        ];
        assert_eq!(chronological_indices(&movements), vec![1, 0]);

        let report = reconcile(&movements);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.summary.opening_balance, Some(100.00));
        assert_eq!(report.summary.stated_closing_balance, Some(80.00));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let movements = vec![
            movement("02/01/2024", "B", -10.00, 985.00),
            movement("01/01/2024", "A", -50.00, 1000.00),
        ];
        let first = reconcile(&movements);
        let second = reconcile(&movements);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let report = reconcile(&[]);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.summary, StatementSummary::default());
    }
}
