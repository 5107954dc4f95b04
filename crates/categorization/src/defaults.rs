//! Built-in default rules for Spanish statement descriptions.
//!
//! Externally supplied rules extend (and, with a lower priority value,
//! outrank) this set; it also serves as the fallback when the rule store
//! is unreachable.

use models::{CategorizationRule, MatchType};

fn rule(
    id: &str,
    name: &str,
    pattern: &str,
    match_type: MatchType,
    category: &str,
    subcategory: Option<&str>,
    priority: i32,
) -> CategorizationRule {
    CategorizationRule {
        id: id.to_string(),
        name: name.to_string(),
        pattern: pattern.to_string(),
        match_type,
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        priority,
        active: true,
    }
}

pub fn default_rules() -> Vec<CategorizationRule> {
    use MatchType::Contains;

    vec![
        rule("d01", "Mercadona", "MERCADONA", Contains, "Alimentación", Some("Supermercado"), 1),
        rule("d02", "Carrefour", "CARREFOUR", Contains, "Alimentación", Some("Supermercado"), 1),
        rule("d03", "Lidl", "LIDL", Contains, "Alimentación", Some("Supermercado"), 1),
        rule("d04", "Nómina", "NOMINA", Contains, "Ingresos", Some("Nómina"), 1),
        rule("d05", "Alquiler", "ALQUILER", Contains, "Vivienda", Some("Alquiler"), 1),
        rule("d06", "Supermercado genérico", "SUPERMERCADO", Contains, "Alimentación", Some("Supermercado"), 2),
        rule("d07", "Iberdrola", "IBERDROLA", Contains, "Hogar", Some("Luz"), 2),
        rule("d08", "Endesa", "ENDESA", Contains, "Hogar", Some("Luz"), 2),
        rule("d09", "Amazon", "AMAZON", Contains, "Compras", Some("Online"), 2),
        rule("d10", "Netflix", "NETFLIX", Contains, "Ocio", Some("Suscripciones"), 2),
        rule("d11", "Spotify", "SPOTIFY", Contains, "Ocio", Some("Suscripciones"), 2),
        rule("d12", "Repsol", "REPSOL", Contains, "Transporte", Some("Gasolina"), 2),
        rule("d13", "Cepsa", "CEPSA", Contains, "Transporte", Some("Gasolina"), 2),
        rule("d14", "Farmacia", "FARMACIA", Contains, "Salud", Some("Farmacia"), 2),
        rule("d15", "Movistar", "MOVISTAR", Contains, "Hogar", Some("Telefonía"), 2),
        rule("d16", "Vodafone", "VODAFONE", Contains, "Hogar", Some("Telefonía"), 2),
        rule("d17", "Restaurante", "RESTAURANTE", Contains, "Restaurantes", None, 3),
        rule("d18", "Bizum", "BIZUM", Contains, "Transferencias", Some("Bizum"), 3),
        rule("d19", "Comisión bancaria", "COMISION", Contains, "Comisiones bancarias", None, 3),
        rule("d20", "Retirada de cajero", "CAJERO", Contains, "Efectivo", Some("Cajero"), 3),
    ]
}

/// Mapping from the bank's own coarse category labels to our taxonomy.
/// Source-provided categories are informative but less reliable than the
/// rule engine, hence the fixed moderate confidence at the call site.
pub fn source_category_mapping(label: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapping = match label.trim().to_lowercase().as_str() {
        "supermercado" => ("Alimentación", Some("Supermercado")),
        "nómina" | "nomina" => ("Ingresos", Some("Nómina")),
        "recibos" => ("Hogar", Some("Recibos")),
        "transferencias" => ("Transferencias", None),
        "bizum" => ("Transferencias", Some("Bizum")),
        "comisiones" => ("Comisiones bancarias", None),
        "cajero" => ("Efectivo", Some("Cajero")),
        "tarjeta" => ("Compras", Some("Tarjeta")),
        "restaurantes" => ("Restaurantes", None),
        _ => return None,
    };
    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_active_with_unique_ids() {
        let rules = default_rules();
        assert!(rules.iter().all(|r| r.active));

        let mut ids: Vec<_> = rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn test_source_mapping_is_case_insensitive() {
        assert_eq!(
            source_category_mapping("SUPERMERCADO"),
            Some(("Alimentación", Some("Supermercado")))
        );
        assert_eq!(source_category_mapping("algo raro"), None);
    }
}
