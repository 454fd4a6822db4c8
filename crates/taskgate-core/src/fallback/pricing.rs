use crate::domain::{PriceHint, PricingBounds, PricingRequest, Proposal};

const CONFIDENCE: f64 = 0.50;
/// Billing floor for very short tasks.
const MIN_BILLABLE_MINUTES: u32 = 15;

/// Hourly base rate for the category, scaled by duration and urgency, clamped
/// to the configured bounds. Fee and tier follow from the final price.
pub fn pricing_hint(request: &PricingRequest, bounds: &PricingBounds) -> Proposal<PriceHint> {
    let minutes = request.estimated_minutes.max(MIN_BILLABLE_MINUTES);
    let hours = f64::from(minutes) / 60.0;
    let base = request.category.base_hourly_cents();
    let raw = (base as f64 * hours * request.urgency.multiplier()).round() as i64;
    let price_cents = raw.clamp(bounds.min_price_cents, bounds.max_price_cents.max(bounds.min_price_cents));

    let mut reasoning = format!(
        "base rate {} cents/h for {:?} x {:.2}h x {:.2} urgency = {} cents",
        base, request.category, hours, request.urgency.multiplier(), raw
    );
    if price_cents != raw {
        reasoning.push_str(&format!(", clamped to {price_cents}"));
    }

    Proposal::deterministic(
        PriceHint {
            price_cents,
            platform_fee_cents: bounds.fee_for(price_cents),
            price_tier: bounds.tier_for(price_cents),
        },
        CONFIDENCE.min(super::FALLBACK_CONFIDENCE_CAP),
        reasoning,
    )
}
