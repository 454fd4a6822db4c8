//! Task pricing inputs, hints, and the bounds a price proposal must respect.

use serde::{Deserialize, Serialize};

/// Marketplace task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Delivery,
    Cleaning,
    Handyman,
    Moving,
    Tutoring,
    Tech,
    Other,
}

impl TaskCategory {
    /// Baseline hourly rate in cents used by the offline pricing heuristic.
    pub fn base_hourly_cents(self) -> i64 {
        match self {
            Self::Delivery => 2_000,
            Self::Cleaning => 2_500,
            Self::Handyman => 4_000,
            Self::Moving => 3_500,
            Self::Tutoring => 3_000,
            Self::Tech => 5_000,
            Self::Other => 2_500,
        }
    }
}

/// How soon the client needs the task done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Flexible,
    #[default]
    Standard,
    Urgent,
}

impl Urgency {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Flexible => 0.9,
            Self::Standard => 1.0,
            Self::Urgent => 1.35,
        }
    }
}

/// Input to price suggestion, identical for the model and fallback paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub task_id: String,
    pub category: TaskCategory,
    pub title: String,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Coarse price classification. Always derivable from `price_cents`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Budget,
    Standard,
    Premium,
}

impl PriceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

/// Suggested price for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHint {
    pub price_cents: i64,
    pub platform_fee_cents: i64,
    pub price_tier: PriceTier,
}

/// Deterministic limits applied to every price proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingBounds {
    pub min_price_cents: i64,
    pub max_price_cents: i64,
    /// Platform fee as a fraction of the price.
    pub platform_fee_rate: f64,
    /// Allowed deviation of the fee from `platform_fee_rate * price`, in percent.
    pub fee_tolerance_pct: f64,
    pub min_confidence: f64,
    pub min_rationale_chars: usize,
    /// Prices strictly below this are `budget`.
    pub budget_below_cents: i64,
    /// Prices strictly below this (and not budget) are `standard`.
    pub standard_below_cents: i64,
}

impl Default for PricingBounds {
    fn default() -> Self {
        Self {
            min_price_cents: 500,
            max_price_cents: 50_000,
            platform_fee_rate: 0.15,
            fee_tolerance_pct: 5.0,
            min_confidence: 0.60,
            min_rationale_chars: 20,
            budget_below_cents: 5_000,
            standard_below_cents: 20_000,
        }
    }
}

impl PricingBounds {
    /// Tier implied by a price under these bands.
    pub fn tier_for(&self, price_cents: i64) -> PriceTier {
        if price_cents < self.budget_below_cents {
            PriceTier::Budget
        } else if price_cents < self.standard_below_cents {
            PriceTier::Standard
        } else {
            PriceTier::Premium
        }
    }

    /// Fee implied by a price, rounded to the nearest cent.
    pub fn fee_for(&self, price_cents: i64) -> i64 {
        (price_cents as f64 * self.platform_fee_rate).round() as i64
    }
}
