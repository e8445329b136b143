//! Stateless discount-rule lookup used at order-creation time.
//!
//! The table maps coupon codes to rules. Order logic only ever consumes the resulting
//! `(discount, total)` pair, so new rule kinds (fixed amounts, expiry windows, minimum subtotals) slot in as
//! new [`CouponRule`] variants without touching the order flow.

use std::collections::HashMap;

use gfs_common::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponRule {
    /// A fixed percentage off the subtotal, rounded down to the nearest paisa.
    Percentage { percent: i64 },
}

impl CouponRule {
    pub fn discount_for(&self, subtotal: Money) -> Money {
        match self {
            CouponRule::Percentage { percent } => subtotal.percent(*percent),
        }
    }
}

/// What applying a coupon to a subtotal yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponOutcome {
    pub discount: Money,
    pub total: Money,
}

#[derive(Debug, Clone)]
pub struct CouponTable {
    rules: HashMap<String, CouponRule>,
}

impl Default for CouponTable {
    /// The launch rule set: `FLAT10` takes 10% off.
    fn default() -> Self {
        let mut table = Self::empty();
        table.add_rule("FLAT10", CouponRule::Percentage { percent: 10 });
        table
    }
}

impl CouponTable {
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    pub fn add_rule(&mut self, code: &str, rule: CouponRule) -> &mut Self {
        self.rules.insert(code.to_string(), rule);
        self
    }

    /// Looks the code up and applies its rule to the subtotal. Unknown codes return `None`.
    pub fn evaluate(&self, code: &str, subtotal: Money) -> Option<CouponOutcome> {
        let rule = self.rules.get(code)?;
        let discount = rule.discount_for(subtotal);
        Some(CouponOutcome { discount, total: subtotal - discount })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flat10_takes_ten_percent() {
        let table = CouponTable::default();
        let outcome = table.evaluate("FLAT10", Money::from(500)).unwrap();
        assert_eq!(outcome.discount, Money::from(50));
        assert_eq!(outcome.total, Money::from(450));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let table = CouponTable::default();
        assert!(table.evaluate("BOGUS", Money::from(500)).is_none());
        assert!(table.evaluate("flat10", Money::from(500)).is_none(), "codes are case-sensitive");
    }

    #[test]
    fn rules_are_pluggable() {
        let mut table = CouponTable::empty();
        table.add_rule("HALF", CouponRule::Percentage { percent: 50 });
        let outcome = table.evaluate("HALF", Money::from(1_000)).unwrap();
        assert_eq!(outcome.discount, Money::from(500));
        assert!(table.evaluate("FLAT10", Money::from(1_000)).is_none());
    }
}
