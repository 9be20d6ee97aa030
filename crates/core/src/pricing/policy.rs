//! Tax policies.
//!
//! Tax rules are jurisdiction-specific and live outside the engine. The
//! engine only asks a policy for the (unrounded) tax on a taxable base.

use rust_decimal::Decimal;
use staybook_shared::types::Money;

/// Computes tax for a taxable amount.
pub trait TaxPolicy: Send + Sync {
    /// Returns the tax owed on `taxable`, unrounded.
    ///
    /// `None` means the tax cannot be represented.
    fn tax_for(&self, taxable: Money) -> Option<Money>;
}

/// Charges no tax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
    fn tax_for(&self, _taxable: Money) -> Option<Money> {
        Some(Money::zero())
    }
}

/// Charges a single flat rate, e.g. `0.19` for nineteen percent.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateTax {
    rate: Decimal,
}

impl FlatRateTax {
    /// Creates a flat-rate policy.
    #[must_use]
    pub const fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// The configured rate.
    #[must_use]
    pub const fn rate(&self) -> Decimal {
        self.rate
    }
}

impl TaxPolicy for FlatRateTax {
    fn tax_for(&self, taxable: Money) -> Option<Money> {
        taxable.checked_scale(self.rate)
    }
}
