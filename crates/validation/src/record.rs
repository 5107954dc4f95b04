//! Field-level acceptance rules, applied uniformly whatever parser
//! produced the movement.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use models::{InvalidMovement, RawMovement, ValidationResult};

const DESCRIPTION_MIN: usize = 3;
const DESCRIPTION_MAX: usize = 500;
const FORBIDDEN_CHARS: [char; 5] = ['<', '>', '{', '}', '|'];

const AMOUNT_BOUND: f64 = 1_000_000.0;
const BALANCE_MIN: f64 = -1_000_000.0;
const BALANCE_MAX: f64 = 10_000_000.0;

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    /// When set, later duplicates are excluded instead of only counted.
    pub ignore_duplicates: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            min_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            max_date: Local::now().date_naive() + chrono::Duration::days(1),
            ignore_duplicates: false,
        }
    }
}

pub struct MovementValidator {
    options: ValidationOptions,
}

impl MovementValidator {
    pub fn new() -> Self {
        Self {
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// Validates every movement. A movement failing any check lands in
    /// `invalid_movements` with all its reasons; it never appears in the
    /// valid set. Duplicates are a count-only warning unless
    /// `ignore_duplicates` opts into exclusion.
    pub fn validate(&self, movements: &[RawMovement]) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut valid_movements = Vec::new();
        let mut invalid_movements = Vec::new();

        for (index, movement) in movements.iter().enumerate() {
            let reasons = self.check_movement(movement);
            if reasons.is_empty() {
                valid_movements.push(movement.clone());
            } else {
                errors.push(format!(
                    "movement {} ({}): {}",
                    index + 1,
                    movement.date.format("%d/%m/%Y"),
                    reasons.join("; ")
                ));
                invalid_movements.push(InvalidMovement {
                    movement: movement.clone(),
                    errors: reasons,
                });
            }
        }

        self.handle_duplicates(&mut valid_movements, &mut warnings, &mut invalid_movements);

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            valid_movements,
            invalid_movements,
        }
    }

    /// `validate` plus cleanup of the movements that passed: whitespace is
    /// trimmed/collapsed in descriptions and amount/balance are rounded to
    /// currency precision.
    pub fn validate_and_clean(&self, movements: &[RawMovement]) -> ValidationResult {
        let mut result = self.validate(movements);
        for movement in &mut result.valid_movements {
            movement.description = collapse_whitespace(&movement.description);
            movement.amount = normalization::round2(movement.amount);
            movement.balance = normalization::round2(movement.balance);
        }
        result
    }

    fn check_movement(&self, movement: &RawMovement) -> Vec<String> {
        let mut reasons = Vec::new();

        if movement.date < self.options.min_date || movement.date > self.options.max_date {
            reasons.push(format!(
                "date {} outside the allowed window {} - {}",
                movement.date.format("%d/%m/%Y"),
                self.options.min_date.format("%d/%m/%Y"),
                self.options.max_date.format("%d/%m/%Y"),
            ));
        }

        let description = movement.description.trim();
        if description.is_empty() {
            reasons.push("description is empty".to_string());
        } else if description.chars().count() < DESCRIPTION_MIN {
            reasons.push(format!(
                "description shorter than {} characters",
                DESCRIPTION_MIN
            ));
        } else if description.chars().count() > DESCRIPTION_MAX {
            reasons.push(format!(
                "description longer than {} characters",
                DESCRIPTION_MAX
            ));
        }
        if let Some(bad) = description
            .chars()
            .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control())
        {
            reasons.push(format!(
                "description contains forbidden character {:?}",
                bad
            ));
        }

        if !movement.amount.is_finite() {
            reasons.push("amount is not a finite number".to_string());
        } else {
            if movement.amount.abs() > AMOUNT_BOUND {
                reasons.push(format!("amount exceeds the ±{:.0} bound", AMOUNT_BOUND));
            }
            if !normalization::has_at_most_two_decimals(movement.amount) {
                reasons.push("amount has more than 2 decimal digits".to_string());
            }
        }

        if !movement.balance.is_finite() {
            reasons.push("balance is not a finite number".to_string());
        } else {
            if movement.balance < BALANCE_MIN || movement.balance > BALANCE_MAX {
                reasons.push(format!(
                    "balance outside the {:.0} - {:.0} bound",
                    BALANCE_MIN, BALANCE_MAX
                ));
            }
            if !normalization::has_at_most_two_decimals(movement.balance) {
                reasons.push("balance has more than 2 decimal digits".to_string());
            }
        }

        reasons
    }

    /// Duplicate key: date + amount (2dp) + trimmed lowercased description.
    fn handle_duplicates(
        &self,
        valid_movements: &mut Vec<RawMovement>,
        warnings: &mut Vec<String>,
        invalid_movements: &mut Vec<InvalidMovement>,
    ) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut duplicate_count = 0usize;
        let mut kept = Vec::with_capacity(valid_movements.len());

        for movement in valid_movements.drain(..) {
            let key = duplicate_key(&movement);
            let occurrences = seen.entry(key).or_insert(0);
            *occurrences += 1;

            if *occurrences > 1 {
                duplicate_count += 1;
                if self.options.ignore_duplicates {
                    invalid_movements.push(InvalidMovement {
                        movement,
                        errors: vec!["duplicate of an earlier movement, excluded".to_string()],
                    });
                    continue;
                }
            }
            kept.push(movement);
        }

        *valid_movements = kept;

        if duplicate_count > 0 {
            warnings.push(format!(
                "{} duplicate movement(s) detected (same date, amount and description)",
                duplicate_count
            ));
        }
    }
}

impl Default for MovementValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_key(movement: &RawMovement) -> String {
    format!(
        "{}|{:.2}|{}",
        movement.date,
        movement.amount,
        movement.description.trim().to_lowercase()
    )
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
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
    fn test_valid_movement_passes() {
        let validator = MovementValidator::new();
        let result = validator.validate(&[movement(
            "01/12/2023",
            "COMPRA MERCADONA",
            -45.67,
            1234.56,
        )]);
        assert!(result.valid);
        assert_eq!(result.valid_movements.len(), 1);
        assert!(result.invalid_movements.is_empty());
    }

    #[test]
    fn test_empty_description_always_invalid() {
        let validator = MovementValidator::new();
        let result = validator.validate(&[movement("01/12/2023", "", -45.67, 1234.56)]);
        assert!(!result.valid);
        assert!(result.valid_movements.is_empty());
        assert_eq!(result.invalid_movements.len(), 1);
        assert!(result.invalid_movements[0]
            .errors
            .iter()
            .any(|e| e.contains("description")));
    }

    #[test]
    fn test_date_window() {
        let validator = MovementValidator::new();
        let result = validator.validate(&[movement("01/12/2019", "OLD MOVEMENT", -5.0, 0.0)]);
        assert_eq!(result.invalid_movements.len(), 1);
        assert!(result.invalid_movements[0].errors[0].contains("window"));

        let future = Local::now().date_naive() + chrono::Duration::days(30);
        let too_new = RawMovement::new(future, "FUTURE MOVEMENT", -5.0, 0.0);
        let result = validator.validate(&[too_new]);
        assert_eq!(result.invalid_movements.len(), 1);
    }

    #[test]
    fn test_numeric_bounds_and_precision() {
        let validator = MovementValidator::new();
        let result = validator.validate(&[
            movement("01/12/2023", "HUGE AMOUNT", -2_000_000.0, 0.0),
            movement("01/12/2023", "TOO PRECISE", -1.239, 0.0),
            movement("01/12/2023", "BAD BALANCE", -1.0, 20_000_000.0),
        ]);
        assert_eq!(result.invalid_movements.len(), 3);
        assert!(result.invalid_movements[0].errors[0].contains("bound"));
        assert!(result.invalid_movements[1].errors[0].contains("decimal"));
        assert!(result.invalid_movements[2].errors[0].contains("balance"));
    }

    #[test]
    fn test_forbidden_characters() {
        let validator = MovementValidator::new();
        let result = validator.validate(&[movement("01/12/2023", "BAD <SCRIPT>", -1.0, 0.0)]);
        assert_eq!(result.invalid_movements.len(), 1);
        assert!(result.invalid_movements[0].errors[0].contains("forbidden"));
    }

    #[test]
    fn test_duplicates_reported_not_excluded() {
        let validator = MovementValidator::new();
        let twin = movement("01/12/2023", "COMPRA MERCADONA", -45.67, 100.0);
        let result = validator.validate(&[twin.clone(), twin]);

        // both retained, flagged once as a count warning
        assert_eq!(result.valid_movements.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("1 duplicate"));
    }

    #[test]
    fn test_duplicate_exclusion_opt_in() {
        let validator = MovementValidator::with_options(ValidationOptions {
            ignore_duplicates: true,
            ..Default::default()
        });
        let twin = movement("01/12/2023", "COMPRA MERCADONA", -45.67, 100.0);
        let result = validator.validate(&[twin.clone(), twin]);

        assert_eq!(result.valid_movements.len(), 1);
        assert_eq!(result.invalid_movements.len(), 1);
        assert!(result.invalid_movements[0].errors[0].contains("duplicate"));
    }

    #[test]
    fn test_validate_and_clean() {
        let validator = MovementValidator::new();
        let result = validator.validate_and_clean(&[movement(
            "01/12/2023",
            "  COMPRA   MERCADONA  ",
            -45.669999999,
            1234.56,
        )]);
        // pre-clean precision noise below 1e-6 of a cent is accepted
        assert_eq!(result.valid_movements.len(), 1);
        assert_eq!(result.valid_movements[0].description, "COMPRA MERCADONA");
        assert_eq!(result.valid_movements[0].amount, -45.67);
    }
}
