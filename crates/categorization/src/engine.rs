use models::{CategorizationRule, CategorizedMovement, MatchType, RawMovement};

use crate::defaults::{default_rules, source_category_mapping};
use crate::heuristics;
use crate::store::RuleStore;

/// Confidence granted when the bank's own category label decides the
/// outcome: informative, but coarser than the rule engine.
const SOURCE_CATEGORY_CONFIDENCE: u8 = 60;
/// Confidence of the last-resort fallback buckets.
const FALLBACK_CONFIDENCE: u8 = 10;

/// Rule-path confidence is clamped to this band.
const RULE_CONFIDENCE_MIN: i32 = 50;
const RULE_CONFIDENCE_MAX: i32 = 100;

pub struct CategorizationEngine {
    rules: Vec<CategorizationRule>,
}

impl CategorizationEngine {
    /// Engine over the built-in default rules.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Engine over an explicit base rule list (defaults usually included
    /// by the caller when wanted).
    pub fn with_rules(rules: Vec<CategorizationRule>) -> Self {
        Self {
            rules: active_sorted(rules),
        }
    }

    /// The active, priority-ordered view the sync path evaluates.
    pub fn rules(&self) -> &[CategorizationRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: CategorizationRule) {
        self.rules.push(rule);
        self.rules = active_sorted(std::mem::take(&mut self.rules));
    }

    /// Replaces the rule with the same id. Returns false when absent.
    pub fn update_rule(&mut self, rule: CategorizationRule) -> bool {
        let Some(existing) = self.rules.iter_mut().find(|r| r.id == rule.id) else {
            return false;
        };
        *existing = rule;
        self.rules = active_sorted(std::mem::take(&mut self.rules));
        true
    }

    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != rule_id);
        before != self.rules.len()
    }

    /// Pure sync path over the engine's own rule list.
    pub fn categorize(&self, movement: &RawMovement) -> CategorizedMovement {
        categorize_with_rules(&self.rules, movement)
    }

    /// Categorizes a batch against a fresh store snapshot.
    ///
    /// The store call is the sole await point and the sole source of
    /// staleness; when it fails the engine degrades to its own base rules
    /// instead of failing the categorization call.
    pub async fn categorize_all(
        &self,
        store: &dyn RuleStore,
        account_id: Option<&str>,
        movements: &[RawMovement],
    ) -> Vec<CategorizedMovement> {
        let snapshot = match store.list_rules(account_id).await {
            Ok(stored) => {
                let mut combined = self.rules.clone();
                combined.extend(stored);
                active_sorted(combined)
            }
            Err(e) => {
                tracing::warn!(error = %e, "rule store unavailable, using built-in rules only");
                self.rules.clone()
            }
        };

        movements
            .iter()
            .map(|movement| categorize_with_rules(&snapshot, movement))
            .collect()
    }
}

impl Default for CategorizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn active_sorted(mut rules: Vec<CategorizationRule>) -> Vec<CategorizationRule> {
    rules.retain(|r| r.active);
    rules.sort_by_key(|r| r.priority);
    rules
}

/// Categorizes one movement against an active, priority-ordered rule
/// list. Never fails; the worst case is the low-confidence fallback.
pub fn categorize_with_rules(
    rules: &[CategorizationRule],
    movement: &RawMovement,
) -> CategorizedMovement {
    // 1. The source's own category, when we know how to map it.
    if let Some(label) = movement.source_category.as_deref() {
        if let Some((category, subcategory)) = source_category_mapping(label) {
            return categorized(
                movement,
                category,
                subcategory,
                SOURCE_CATEGORY_CONFIDENCE,
                Some("source-category".to_string()),
            );
        }
    }

    // 2. First matching rule in priority order wins.
    let description = movement.description.to_uppercase();
    for rule in rules {
        let pattern = match rule.match_type {
            MatchType::Regex => rule.pattern.clone(),
            _ => rule.pattern.to_uppercase(),
        };
        if rule.match_type.matches(&pattern, &description) {
            return categorized(
                movement,
                &rule.category,
                rule.subcategory.as_deref(),
                rule_confidence(rule, &description),
                Some(rule.name.clone()),
            );
        }
    }

    // 3. Ordered numeric heuristics.
    if let Some(outcome) = heuristics::apply(&description, movement.amount) {
        return categorized(
            movement,
            outcome.category,
            outcome.subcategory,
            outcome.confidence,
            Some(outcome.name.to_string()),
        );
    }

    // 4. Fixed low-confidence buckets.
    if movement.amount > 0.0 {
        categorized(movement, "Ingresos", Some("Otros"), FALLBACK_CONFIDENCE, None)
    } else {
        categorized(
            movement,
            "Gastos",
            Some("Sin clasificar"),
            FALLBACK_CONFIDENCE,
            None,
        )
    }
}

/// Base score by match type, +10 for a pattern covering more than half
/// the description, +(10 - priority), clamped to 50..=100.
fn rule_confidence(rule: &CategorizationRule, description: &str) -> u8 {
    let base: i32 = match rule.match_type {
        MatchType::Exact => 100,
        MatchType::Regex => 95,
        MatchType::StartsWith => 90,
        MatchType::Contains => 85,
        MatchType::EndsWith => 80,
    };

    let mut score = base;
    if rule.pattern.chars().count() * 2 > description.chars().count() {
        score += 10;
    }
    score += 10 - rule.priority;

    score.clamp(RULE_CONFIDENCE_MIN, RULE_CONFIDENCE_MAX) as u8
}

fn categorized(
    movement: &RawMovement,
    category: &str,
    subcategory: Option<&str>,
    confidence: u8,
    applied_rule: Option<String>,
) -> CategorizedMovement {
    CategorizedMovement {
        movement: movement.clone(),
        detected_category: category.to_string(),
        detected_subcategory: subcategory.map(str::to_string),
        confidence,
        applied_rule,
    }
}
