//! Numeric fallback heuristics, applied in order after the rule list
//! found no match. Each is named so the applied path shows up in
//! `applied_rule` and can be tuned or disabled independently.

/// Inflows above this look like salary payments.
pub const LARGE_INFLOW_THRESHOLD: f64 = 800.0;
/// Outflows below this qualify for the groceries heuristic.
pub const SMALL_OUTFLOW_LIMIT: f64 = 100.0;
/// Outflow band for the online-shopping heuristic.
pub const MEDIUM_OUTFLOW_MIN: f64 = 50.0;
pub const MEDIUM_OUTFLOW_MAX: f64 = 200.0;

const SUPERMARKET_KEYWORDS: [&str; 5] =
    ["SUPER", "MERCADO", "ALIMENTACION", "FRUTERIA", "CARNICERIA"];
const PURCHASE_KEYWORDS: [&str; 4] = ["COMPRA", "ONLINE", "PAYPAL", "TIENDA"];

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicOutcome {
    pub name: &'static str,
    pub category: &'static str,
    pub subcategory: Option<&'static str>,
    pub confidence: u8,
}

/// Runs the ordered heuristic chain. `description` must be uppercased.
pub fn apply(description: &str, amount: f64) -> Option<HeuristicOutcome> {
    if amount > LARGE_INFLOW_THRESHOLD {
        return Some(HeuristicOutcome {
            name: "large-inflow-salary",
            category: "Ingresos",
            subcategory: Some("Nómina"),
            confidence: 70,
        });
    }

    let outflow = amount < 0.0;
    let magnitude = amount.abs();

    if outflow
        && magnitude < SMALL_OUTFLOW_LIMIT
        && SUPERMARKET_KEYWORDS.iter().any(|k| description.contains(k))
    {
        return Some(HeuristicOutcome {
            name: "small-outflow-groceries",
            category: "Alimentación",
            subcategory: Some("Supermercado"),
            confidence: 60,
        });
    }

    if outflow
        && (MEDIUM_OUTFLOW_MIN..=MEDIUM_OUTFLOW_MAX).contains(&magnitude)
        && PURCHASE_KEYWORDS.iter().any(|k| description.contains(k))
    {
        return Some(HeuristicOutcome {
            name: "medium-outflow-online",
            category: "Compras",
            subcategory: Some("Online"),
            confidence: 50,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_inflow_is_salary() {
        let outcome = apply("TRANSFERENCIA RECIBIDA", 1200.0).unwrap();
        assert_eq!(outcome.name, "large-inflow-salary");
        assert_eq!(outcome.category, "Ingresos");
        assert_eq!(outcome.confidence, 70);
    }

    #[test]
    fn test_small_supermarket_outflow() {
        let outcome = apply("PAGO EN HIPERMERCADO LOCAL", -23.40).unwrap();
        assert_eq!(outcome.name, "small-outflow-groceries");
        assert_eq!(outcome.confidence, 60);
    }

    #[test]
    fn test_medium_online_outflow() {
        let outcome = apply("COMPRA EN TIENDA WEB", -120.0).unwrap();
        assert_eq!(outcome.name, "medium-outflow-online");
        assert_eq!(outcome.confidence, 50);
    }

    #[test]
    fn test_order_prefers_groceries_over_online() {
        // qualifies for both keyword sets and both bands overlap at 50-100
        let outcome = apply("COMPRA MERCADO CENTRAL", -80.0).unwrap();
        assert_eq!(outcome.name, "small-outflow-groceries");
    }

    #[test]
    fn test_no_heuristic_applies() {
        assert_eq!(apply("PAGO VARIOS", -500.0), None);
        assert_eq!(apply("ABONO PEQUEÑO", 20.0), None);
    }
}
