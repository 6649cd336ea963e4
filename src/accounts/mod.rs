//! Account lookup layer
//!
//! Read-only source of customer identity and balances.
//! Currently a fixed demo ledger; can be replaced with a real one.

use crate::models::Money;
use crate::Result;

/// Balance reported when pending transactions are included.
pub const BALANCE_WITH_PENDING: Money = Money::from_cents(12_345);

/// Balance reported for settled transactions only.
pub const SETTLED_BALANCE: Money = Money::from_cents(10_000);

/// Trait for customer account lookups
#[async_trait::async_trait]
pub trait AccountLookup: Send + Sync {
    /// Display name for the customer. `provided_name` is what the caller sent.
    async fn resolve_name(&self, customer_id: i64, provided_name: &str) -> Result<String>;

    async fn resolve_balance(&self, customer_id: i64, include_pending: bool) -> Result<Money>;
}

/// Demo ledger: every customer keeps the name they give and shares one balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoAccounts;

impl DemoAccounts {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AccountLookup for DemoAccounts {
    async fn resolve_name(&self, _customer_id: i64, provided_name: &str) -> Result<String> {
        Ok(provided_name.to_string())
    }

    async fn resolve_balance(&self, _customer_id: i64, include_pending: bool) -> Result<Money> {
        if include_pending {
            Ok(BALANCE_WITH_PENDING)
        } else {
            Ok(SETTLED_BALANCE)
        }
    }
}
