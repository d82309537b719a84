use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};

/// application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub policy: PolicyConfig,
    pub ingestion: IngestionConfig,
}

impl AppConfig {
    /// parse and validate configuration from a json string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.policy.validate()?;
        Ok(config)
    }

    /// load and validate configuration from a json file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }
}

/// credit policy parameters consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// approved limit as a multiple of monthly income
    pub limit_income_multiplier: Decimal,
    /// approved limits are rounded to this unit
    pub limit_rounding_unit: Money,
    /// total EMIs may not exceed this share of monthly income
    pub emi_income_cap: Decimal,
    /// score tiers, highest threshold first
    pub rate_tiers: Vec<RateTier>,
    /// days added to a loan's start date per month of tenure
    pub days_per_tenure_month: u32,
}

/// a score band and the rate treatment applied to it
///
/// A tier applies when the score is strictly above `min_score_exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    pub min_score_exclusive: u8,
    pub treatment: TierTreatment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TierTreatment {
    /// requested rate is used unchanged
    AsRequested,
    /// requested rate is raised to at least this rate
    Floor(Rate),
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PolicyConfig {
    /// standard retail policy
    pub fn standard() -> Self {
        Self {
            limit_income_multiplier: dec!(36),
            limit_rounding_unit: Money::from_major(100_000),
            emi_income_cap: dec!(0.5),
            rate_tiers: vec![
                RateTier {
                    min_score_exclusive: 50,
                    treatment: TierTreatment::AsRequested,
                },
                RateTier {
                    min_score_exclusive: 30,
                    treatment: TierTreatment::Floor(Rate::from_percentage(12)),
                },
                RateTier {
                    min_score_exclusive: 10,
                    treatment: TierTreatment::Floor(Rate::from_percentage(16)),
                },
            ],
            days_per_tenure_month: 30,
        }
    }

    /// first tier whose threshold the score clears; `None` means reject
    pub fn tier_for(&self, credit_score: u8) -> Option<&RateTier> {
        self.rate_tiers
            .iter()
            .find(|tier| credit_score > tier.min_score_exclusive)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit_income_multiplier < Decimal::ZERO {
            return Err(CreditError::InvalidConfiguration {
                message: "limit_income_multiplier must not be negative".to_string(),
            });
        }

        if !self.limit_rounding_unit.is_positive() {
            return Err(CreditError::InvalidConfiguration {
                message: "limit_rounding_unit must be positive".to_string(),
            });
        }

        if self.emi_income_cap <= Decimal::ZERO || self.emi_income_cap > Decimal::ONE {
            return Err(CreditError::InvalidConfiguration {
                message: format!("emi_income_cap must be in (0, 1], got {}", self.emi_income_cap),
            });
        }

        if self.rate_tiers.is_empty() {
            return Err(CreditError::InvalidConfiguration {
                message: "at least one rate tier is required".to_string(),
            });
        }

        let descending = self
            .rate_tiers
            .windows(2)
            .all(|pair| pair[0].min_score_exclusive > pair[1].min_score_exclusive);
        if !descending {
            return Err(CreditError::InvalidConfiguration {
                message: "rate tiers must be ordered by strictly descending score".to_string(),
            });
        }

        if self.days_per_tenure_month == 0 {
            return Err(CreditError::InvalidConfiguration {
                message: "days_per_tenure_month must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// where bulk records are picked up from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub data_dir: PathBuf,
    pub customer_file: String,
    pub loan_file: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            customer_file: "customer_data.json".to_string(),
            loan_file: "loan_data.json".to_string(),
        }
    }
}

impl IngestionConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn customer_path(&self) -> PathBuf {
        self.data_dir.join(&self.customer_file)
    }

    pub fn loan_path(&self) -> PathBuf {
        self.data_dir.join(&self.loan_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_policy_tiers() {
        let policy = PolicyConfig::standard();
        assert!(policy.validate().is_ok());

        assert_eq!(policy.tier_for(51).unwrap().treatment, TierTreatment::AsRequested);
        assert_eq!(
            policy.tier_for(50).unwrap().treatment,
            TierTreatment::Floor(Rate::from_percentage(12))
        );
        assert_eq!(
            policy.tier_for(31).unwrap().treatment,
            TierTreatment::Floor(Rate::from_percentage(12))
        );
        assert_eq!(
            policy.tier_for(30).unwrap().treatment,
            TierTreatment::Floor(Rate::from_percentage(16))
        );
        assert_eq!(
            policy.tier_for(11).unwrap().treatment,
            TierTreatment::Floor(Rate::from_percentage(16))
        );
        assert!(policy.tier_for(10).is_none());
        assert!(policy.tier_for(0).is_none());
    }

    #[test]
    fn test_policy_validation_rejects_unordered_tiers() {
        let mut policy = PolicyConfig::standard();
        policy.rate_tiers.reverse();
        assert!(matches!(
            policy.validate(),
            Err(CreditError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_policy_validation_rejects_bad_cap() {
        let mut policy = PolicyConfig::standard();
        policy.emi_income_cap = dec!(1.5);
        assert!(policy.validate().is_err());

        policy.emi_income_cap = Decimal::ZERO;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_app_config_from_partial_json() {
        let config = AppConfig::from_json_str(
            r#"{ "ingestion": { "data_dir": "/srv/credit/data" }, "policy": { "emi_income_cap": "0.4" } }"#,
        )
        .unwrap();

        assert_eq!(config.ingestion.data_dir, PathBuf::from("/srv/credit/data"));
        assert_eq!(config.ingestion.customer_file, "customer_data.json");
        assert_eq!(config.policy.emi_income_cap, dec!(0.4));
        assert_eq!(config.policy.limit_income_multiplier, dec!(36));
        assert_eq!(config.policy.rate_tiers.len(), 3);
    }

    #[test]
    fn test_app_config_rejects_invalid_policy() {
        let result = AppConfig::from_json_str(r#"{ "policy": { "rate_tiers": [] } }"#);
        assert!(matches!(result, Err(CreditError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_ingestion_paths() {
        let config = IngestionConfig::with_data_dir("/tmp/in");
        assert_eq!(config.customer_path(), PathBuf::from("/tmp/in/customer_data.json"));
        assert_eq!(config.loan_path(), PathBuf::from("/tmp/in/loan_data.json"));
    }
}
