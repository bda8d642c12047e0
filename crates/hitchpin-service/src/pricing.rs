//! Quote pricing for rental contracts and repair work orders.
//!
//! Calculation is a pure function over an injected [`PricingConfig`]
//! snapshot (tax rate, addon price table) read once per calculation.

use serde::{Deserialize, Serialize};

use hitchpin_core::config::PricingConfig;

use crate::error::{ServiceError, ServiceResult};

/// Discount applied to a quote subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal, 0 to 100.
    Percent(f64),
    /// Flat amount, at most the subtotal.
    Amount(f64),
}

/// Inputs for a quote calculation.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteInput {
    /// Base labor/rental amount before addons.
    pub base_amount: f64,
    /// Named addons priced from the config table.
    #[serde(default)]
    pub addons: Vec<String>,
    pub discount: Option<Discount>,
}

/// Itemized result of a quote calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteBreakdown {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax: f64,
    pub total: f64,
}

/// ## Summary
/// Calculates a quote: subtotal (base + addons), discount, then tax on the
/// discounted amount.
///
/// ## Errors
/// Returns a `ValidationError` for a negative base amount, an addon missing
/// from the price table, a percent discount outside 0..=100, or a flat
/// discount exceeding the subtotal.
pub fn calculate_quote(input: &QuoteInput, config: &PricingConfig) -> ServiceResult<QuoteBreakdown> {
    if input.base_amount < 0.0 {
        return Err(ServiceError::ValidationError(
            "base amount must not be negative".to_owned(),
        ));
    }

    let mut subtotal = input.base_amount;
    for addon in &input.addons {
        let price = config.addon_prices.get(addon).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown addon: {addon}"))
        })?;
        subtotal += price;
    }

    let discount_amount = match input.discount {
        None => 0.0,
        Some(Discount::Percent(percent)) => {
            if !(0.0..=100.0).contains(&percent) {
                return Err(ServiceError::ValidationError(format!(
                    "percent discount must be between 0 and 100, got {percent}"
                )));
            }
            subtotal * percent / 100.0
        }
        Some(Discount::Amount(amount)) => {
            if amount < 0.0 || amount > subtotal {
                return Err(ServiceError::ValidationError(format!(
                    "flat discount must be between 0 and the subtotal {subtotal}, got {amount}"
                )));
            }
            amount
        }
    };

    let discounted = subtotal - discount_amount;
    let tax = round_cents(discounted * config.tax_rate);

    Ok(QuoteBreakdown {
        subtotal: round_cents(subtotal),
        discount_amount: round_cents(discount_amount),
        tax,
        total: round_cents(discounted + tax),
    })
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
