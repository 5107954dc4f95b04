pub mod reconciliation;
pub mod record;

pub use crate::reconciliation::{
    chronological_indices, reconcile, BalanceDiscrepancy, DiscrepancySeverity,
    ReconciliationReport, StatementSummary,
};
pub use crate::record::{MovementValidator, ValidationOptions};
