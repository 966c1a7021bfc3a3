use crate::bracket::BudgetBracket;
use crate::earnings::{
    estimate_earnings, validate_phases, validate_tiers, ClientTier, EarningsConfig,
    EarningsEstimate, EarningsInput, SliderBounds, WorkflowPhase,
};
use crate::error::{CalculatorError, Result};
use crate::rates::{SavingsRateTable, TeamSizeBucket};
use crate::savings::{ensure_unique, CostComparison, SavingsConfig, SavingsEstimate, SavingsInput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REFERENCE_PROFILE_NAME: &str = "reference";

/// Everything the calculators need: reference tables plus per-page earnings constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CalculatorProfile {
    pub name: String,
    pub savings: SavingsConfig,
    pub phases: Vec<WorkflowPhase>,
    pub tiers: Vec<ClientTier>,
    pub earnings: Vec<EarningsConfig>,
}

impl Default for CalculatorProfile {
    fn default() -> Self {
        Self::reference()
    }
}

impl CalculatorProfile {
    /// The tables the site ships with.
    pub fn reference() -> Self {
        Self {
            name: REFERENCE_PROFILE_NAME.to_string(),
            savings: SavingsConfig {
                rates: SavingsRateTable::new(vec![
                    vec![0.25, 0.30, 0.35],
                    vec![0.30, 0.38, 0.42],
                    vec![0.38, 0.45, 0.50],
                    vec![0.42, 0.50, 0.55],
                    vec![0.45, 0.55, 0.60],
                ]),
                brackets: vec![
                    BudgetBracket::new("under50k", "Under $50k", 0.0, Some(50_000.0)),
                    BudgetBracket::new("50to100k", "$50k – $100k", 50_000.0, Some(100_000.0)),
                    BudgetBracket::new("100to250k", "$100k – $250k", 100_000.0, Some(250_000.0)),
                    BudgetBracket::new("250to500k", "$250k – $500k", 250_000.0, Some(500_000.0)),
                    BudgetBracket::new("over500k", "$500k+", 500_000.0, None),
                ],
                team_sizes: vec![
                    TeamSizeBucket::new("under10", "Fewer than 10"),
                    TeamSizeBucket::new("10to20", "10 to 20"),
                    TeamSizeBucket::new("over20", "More than 20"),
                ],
            },
            phases: vec![
                phase("strategy", "Strategy & planning", 0.30),
                phase("media", "Media activation", 0.25),
                phase("others", "Measurement & everything else", 0.45),
            ],
            tiers: vec![
                tier("micro", "Micro clients", 2.0, 5.0, (0, 2_000, 10)),
                tier("small", "Small clients", 8.0, 10.0, (0, 500, 5)),
                tier("medium", "Medium clients", 40.0, 10.0, (0, 100, 1)),
            ],
            earnings: vec![
                EarningsConfig {
                    id: "providers".to_string(),
                    currency: "USD".to_string(),
                    payout_per_query: 0.40,
                    currency_multiplier: 1.0,
                    useful_data_factor: 0.35,
                },
                EarningsConfig {
                    id: "providers-eur".to_string(),
                    currency: "EUR".to_string(),
                    payout_per_query: 0.40,
                    currency_multiplier: 0.92,
                    useful_data_factor: 0.35,
                },
            ],
        }
    }

    /// Load and validate a profile from a JSON or TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let profile = Self::parse(&bytes)?;
        log::debug!(
            "loaded calculator profile '{}' from {}",
            profile.name,
            path.display()
        );
        Ok(profile)
    }

    /// JSON is tried first; TOML is the fallback.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let profile: Self = match serde_json::from_slice(bytes) {
            Ok(profile) => profile,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| CalculatorError::Parse(format!("{json_err}; {err}")))?;
                toml::from_str(utf8).map_err(|toml_err| {
                    CalculatorError::Parse(format!(
                        "profile is not valid JSON ({json_err}); TOML parse error: {toml_err}"
                    ))
                })?
            }
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        self.savings.validate()?;
        validate_phases(&self.phases)?;
        validate_tiers(&self.tiers)?;
        if self.earnings.is_empty() {
            return Err(CalculatorError::InvalidEarnings {
                id: String::new(),
                reason: "at least one earnings variant is required".to_string(),
            });
        }
        ensure_unique("earnings variant", self.earnings.iter().map(|e| e.id.as_str()))?;
        for variant in &self.earnings {
            variant.validate()?;
        }
        Ok(())
    }

    pub fn brand_savings(&self, input: &SavingsInput) -> SavingsEstimate {
        self.savings.brand_savings(input)
    }

    pub fn cost_comparison(&self, input: &SavingsInput) -> CostComparison {
        self.savings.cost_comparison(input)
    }

    /// Earnings variant by id; unknown ids use the first variant.
    pub fn earnings_variant(&self, id: &str) -> Option<&EarningsConfig> {
        self.earnings
            .iter()
            .find(|variant| variant.id == id)
            .or_else(|| self.earnings.first())
    }

    pub fn earnings(&self, variant: &str, input: &EarningsInput) -> EarningsEstimate {
        match self.earnings_variant(variant) {
            Some(config) => estimate_earnings(&self.phases, &self.tiers, config, input),
            None => EarningsEstimate {
                variant: variant.to_string(),
                currency: String::new(),
                phase_factor: 0.0,
                expected_monthly_queries: 0.0,
                gross_payout: 0.0,
                estimated_monthly: 0.0,
                estimated_annual: 0.0,
            },
        }
    }
}

fn phase(id: &str, label: &str, weight: f64) -> WorkflowPhase {
    WorkflowPhase {
        id: id.to_string(),
        label: label.to_string(),
        weight,
    }
}

fn tier(
    id: &str,
    label: &str,
    active_users_per_client: f64,
    avg_queries_per_user_per_month: f64,
    (min, max, step): (u32, u32, u32),
) -> ClientTier {
    ClientTier {
        id: id.to_string(),
        label: label.to_string(),
        active_users_per_client,
        avg_queries_per_user_per_month,
        slider: SliderBounds { min, max, step },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reference_profile_is_valid_and_monotonic() {
        let profile = CalculatorProfile::reference();
        profile.validate().unwrap();
        assert!(profile.savings.rates.is_monotonic());
    }

    #[test]
    fn json_round_trip_preserves_profile() {
        let profile = CalculatorProfile::reference();
        let json = serde_json::to_vec(&profile).unwrap();
        assert_eq!(CalculatorProfile::parse(&json).unwrap(), profile);
    }

    #[test]
    fn loads_toml_profile_from_disk() {
        let mut toml = toml::to_string(&CalculatorProfile::reference()).unwrap();
        toml = toml.replacen("name = \"reference\"", "name = \"staging\"", 1);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let profile = CalculatorProfile::load(file.path()).unwrap();
        assert_eq!(profile.name, "staging");
        assert_eq!(profile.savings.brackets.len(), 5);
    }

    #[test]
    fn rejects_garbage_and_unknown_fields() {
        assert!(matches!(
            CalculatorProfile::parse(b"not a profile ["),
            Err(CalculatorError::Parse(_))
        ));

        let mut value = serde_json::to_value(CalculatorProfile::reference()).unwrap();
        value["surprise"] = serde_json::json!(true);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(CalculatorProfile::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_short_rate_rows() {
        let mut value = serde_json::to_value(CalculatorProfile::reference()).unwrap();
        value["savings"]["rates"][2] = serde_json::json!([0.38, 0.45]);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            CalculatorProfile::parse(&bytes),
            Err(CalculatorError::InvalidRates(_))
        ));
    }

    #[test]
    fn rejects_bracket_gap() {
        let mut value = serde_json::to_value(CalculatorProfile::reference()).unwrap();
        value["savings"]["brackets"][1]["min"] = serde_json::json!(60_000.0);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            CalculatorProfile::parse(&bytes),
            Err(CalculatorError::InvalidBrackets(_))
        ));
    }

    #[test]
    fn unknown_variant_falls_back_to_first() {
        let profile = CalculatorProfile::reference();
        assert_eq!(
            profile.earnings_variant("nope").map(|v| v.id.as_str()),
            Some("providers")
        );
    }
}
