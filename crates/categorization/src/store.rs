use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use models::CategorizationRule;

/// External source of categorization rules.
///
/// The engine refreshes its snapshot from the store on every
/// categorization call; implementations should return a fresh view each
/// time. Timeouts and retries around the call are the caller's concern.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Returns global rules plus rules scoped to `account_id` when given.
    async fn list_rules(&self, account_id: Option<&str>) -> Result<Vec<CategorizationRule>>;
}

/// Fixed in-memory snapshot, for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    global: Vec<CategorizationRule>,
    by_account: HashMap<String, Vec<CategorizationRule>>,
}

impl InMemoryRuleStore {
    pub fn new(global: Vec<CategorizationRule>) -> Self {
        Self {
            global,
            by_account: HashMap::new(),
        }
    }

    pub fn with_account_rules(
        mut self,
        account_id: impl Into<String>,
        rules: Vec<CategorizationRule>,
    ) -> Self {
        self.by_account.insert(account_id.into(), rules);
        self
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_rules(&self, account_id: Option<&str>) -> Result<Vec<CategorizationRule>> {
        let mut rules = self.global.clone();
        if let Some(account_id) = account_id {
            if let Some(scoped) = self.by_account.get(account_id) {
                rules.extend(scoped.iter().cloned());
            }
        }
        Ok(rules)
    }
}
