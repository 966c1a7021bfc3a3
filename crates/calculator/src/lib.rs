//! # Exchange Calculator
//!
//! Pure calculators behind the site's savings, cost and earnings widgets.
//!
//! Every page variant runs the same code over a different [`CalculatorProfile`]:
//! brackets, team sizes and rates for brands; phases, client tiers and payout
//! constants for providers. Computation is total and synchronous. Inputs are
//! clamped instead of rejected, and all validation happens once, when a profile
//! is loaded.
//!
//! ```text
//! budget ──> bracket (linear scan, [min, max)) ─┐
//!                                               ├─> rate ──> annual / monthly savings
//! team size ──> rate-table column ──────────────┘
//!
//! phases ──> Σ weight ───────────────────────────────────────┐
//! tier counts ──> Σ count × users × queries ──> × payout ──> × useful data ──> × phase factor
//! ```
//!
//! ## Example
//!
//! ```rust
//! use exchange_calculator::{CalculatorProfile, SavingsInput};
//!
//! let profile = CalculatorProfile::reference();
//! let estimate = profile.brand_savings(&SavingsInput::new(150_000.0, "10to20"));
//! assert_eq!(estimate.bracket_id, "100to250k");
//! assert_eq!(estimate.monthly_savings_usd, 5_625.0);
//! ```

mod bracket;
mod earnings;
mod error;
mod profile;
mod rates;
mod savings;

pub use bracket::{clamp_budget, find_bracket, BudgetBracket};
pub use earnings::{
    estimate_earnings, expected_monthly_queries, phase_factor, ClientTier, EarningsConfig,
    EarningsEstimate, EarningsInput, PhaseSelection, SliderBounds, WorkflowPhase,
};
pub use error::{CalculatorError, Result};
pub use profile::{CalculatorProfile, REFERENCE_PROFILE_NAME};
pub use rates::{SavingsRateTable, TeamSizeBucket};
pub use savings::{CostComparison, SavingsConfig, SavingsEstimate, SavingsInput, MONTHS_PER_YEAR};
