use serde::{Deserialize, Serialize};

use crate::billing::DEFAULT_DUE_DAY;
use crate::calendar::validate_day;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    pub allocation: AllocationConfig,
    pub installments: InstallmentConfig,
    pub budgets: BudgetConfig,
}

/// billing cycle allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// due day used for cards that have none
    pub default_due_day: u32,
}

/// installment plan generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallmentConfig {
    /// decimal places of every installment but the last (0-2)
    pub rounding_dp: u32,
    /// append "i/N" to generated installment descriptions
    pub label_descriptions: bool,
}

/// budget reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// usage at which a budget is reported as a warning
    pub warning_threshold: Rate,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            default_due_day: DEFAULT_DUE_DAY,
        }
    }
}

impl Default for InstallmentConfig {
    fn default() -> Self {
        Self {
            rounding_dp: Money::SCALE,
            label_descriptions: true,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            warning_threshold: Rate::from_percentage(80),
        }
    }
}

impl LedgerConfig {
    /// load from json, missing sections fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_default_due_day(mut self, day: u32) -> Self {
        self.allocation.default_due_day = day;
        self
    }

    pub fn with_rounding_dp(mut self, dp: u32) -> Self {
        self.installments.rounding_dp = dp;
        self
    }

    pub fn with_warning_threshold(mut self, threshold: Rate) -> Self {
        self.budgets.warning_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_day(self.allocation.default_due_day)?;

        if self.installments.rounding_dp > Money::SCALE {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "installment rounding of {} places exceeds money precision of {}",
                    self.installments.rounding_dp,
                    Money::SCALE
                ),
            });
        }

        if self.budgets.warning_threshold <= Rate::ZERO {
            return Err(LedgerError::InvalidConfiguration {
                message: "budget warning threshold must be positive".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.allocation.default_due_day, 15);
        assert_eq!(config.installments.rounding_dp, 2);
        assert!(config.installments.label_descriptions);
        assert_eq!(config.budgets.warning_threshold, Rate::from_percentage(80));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json(r#"{ "allocation": { "default_due_day": 10 } }"#).unwrap();
        assert_eq!(config.allocation.default_due_day, 10);
        assert_eq!(config.installments, InstallmentConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = LedgerConfig::default()
            .with_default_due_day(5)
            .with_warning_threshold(Rate::from_decimal(dec!(0.9)));
        let json = config.to_json_pretty().unwrap();
        assert_eq!(LedgerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            LedgerConfig::default().with_default_due_day(0).validate(),
            Err(LedgerError::InvalidDay { day: 0 })
        ));
        assert!(matches!(
            LedgerConfig::default().with_rounding_dp(3).validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
        assert!(LedgerConfig::default().with_warning_threshold(Rate::ZERO).validate().is_err());
        assert!(matches!(
            LedgerConfig::from_json("{ not json"),
            Err(LedgerError::Serialization(_))
        ));
    }
}
