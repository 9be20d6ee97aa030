//! Quote calculation for stays.
//!
//! All arithmetic is done on `Decimal`. Fee and tax are computed on
//! unrounded intermediates and every component is rounded half-up to the
//! minor unit exactly once, at the end. The total is the sum of the rounded
//! components so that the breakdown always reconciles.

use staybook_shared::types::Money;

use crate::pricing::error::PricingError;
use crate::pricing::policy::TaxPolicy;
use crate::pricing::types::{
    FeeType, GuestStanding, PriceBreakdown, QuoteRequest, ServiceFee, ServiceFeeSnapshot,
};

/// Stateless pricing engine.
pub struct PricingEngine;

impl PricingEngine {
    /// Checks whether a fee schedule applies to a guest.
    ///
    /// The guest must meet both the rating and completed-bookings thresholds.
    pub fn check_eligibility(fee: &ServiceFee, standing: &GuestStanding) -> Result<(), PricingError> {
        if standing.average_rating >= fee.prom_calification_minimum
            && standing.completed_bookings >= fee.number_bookings_minimum
        {
            Ok(())
        } else {
            Err(PricingError::ServiceFeeNotEligible {
                id: fee.id,
                rating_minimum: fee.prom_calification_minimum,
                bookings_minimum: fee.number_bookings_minimum,
            })
        }
    }

    /// Returns the unrounded fee amount for a subtotal.
    ///
    /// # Errors
    /// `AmountOverflow` if a percentage fee does not fit.
    pub fn fee_amount(fee: &ServiceFeeSnapshot, sub_total: Money) -> Result<Money, PricingError> {
        match fee.fee_type {
            FeeType::Flat => Ok(Money::new(fee.value)),
            FeeType::Percentage => sub_total
                .checked_percent(fee.value)
                .ok_or(PricingError::AmountOverflow("service fee")),
        }
    }

    /// Returns `price_per_night × nights`.
    ///
    /// # Errors
    /// `AmountOverflow` if the subtotal does not fit.
    pub fn sub_total(price_per_night: Money, nights: u32) -> Result<Money, PricingError> {
        price_per_night
            .checked_times(nights)
            .ok_or(PricingError::AmountOverflow("subtotal"))
    }

    /// Computes the price breakdown of a stay.
    ///
    /// Each component is rounded on its own and the total is their sum, so
    /// a breakdown always reconciles. That total can be one minor unit away
    /// from rounding the unrounded sum:
    ///
    /// ```text
    /// 3 nights × 33.35      sub_total  100.05
    /// fee 12.5%             12.50625   -> 12.51
    /// tax 19% of 112.55625  21.3856875 -> 21.39
    /// total                 133.95     (rounding 133.9419375 gives 133.94)
    /// ```
    ///
    /// # Errors
    /// * `InvalidNightlyPrice` if the price is not positive or not in minor units
    /// * `InvalidDiscount` if the discount is negative or exceeds the subtotal
    /// * `InvalidServiceFee` if the fee value is negative
    /// * `NegativeTax` if the tax policy misbehaves
    /// * `AmountOverflow` if any component does not fit in a decimal
    pub fn quote(request: &QuoteRequest, tax_policy: &dyn TaxPolicy) -> Result<PriceBreakdown, PricingError> {
        let price_per_night = request.price_per_night;
        if !price_per_night.is_positive() || price_per_night.round_to_minor() != price_per_night {
            return Err(PricingError::InvalidNightlyPrice(price_per_night));
        }

        let nights = request.stay.nights();
        let sub_total = Self::sub_total(price_per_night, nights)?;

        if request.discount.is_negative() || request.discount > sub_total {
            return Err(PricingError::InvalidDiscount {
                discount: request.discount,
                sub_total,
            });
        }

        if request.service_fee.value.is_sign_negative() && !request.service_fee.value.is_zero() {
            return Err(PricingError::InvalidServiceFee {
                id: request.service_fee.service_fee_id,
                value: request.service_fee.value,
            });
        }

        let fee = Self::fee_amount(&request.service_fee, sub_total)?;
        let taxable = sub_total
            .checked_sub(request.discount)
            .and_then(|net| net.checked_add(fee))
            .ok_or(PricingError::AmountOverflow("taxable amount"))?;
        let tax = tax_policy
            .tax_for(taxable)
            .ok_or(PricingError::AmountOverflow("tax"))?;
        if tax.is_negative() {
            return Err(PricingError::NegativeTax(tax));
        }

        let discount = request.discount.round_to_minor();
        let fee = fee.round_to_minor();
        let tax = tax.round_to_minor();
        let total = sub_total
            .checked_sub(discount)
            .and_then(|net| net.checked_add(fee))
            .and_then(|gross| gross.checked_add(tax))
            .ok_or(PricingError::AmountOverflow("total"))?;

        Ok(PriceBreakdown {
            nights,
            price_per_night,
            sub_total,
            discount,
            fee,
            tax,
            total,
        })
    }
}
