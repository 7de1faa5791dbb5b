//! Commission configuration.

use serde::{Deserialize, Serialize};

use erpkit_core::{DomainError, DomainResult};

pub const CURRENCY_DECIMALS_ENV: &str = "ERPKIT_COMMISSION_CURRENCY_DECIMALS";
pub const TEAM_DEPTH_ENV: &str = "ERPKIT_COMMISSION_TEAM_DEPTH";

const DEFAULT_CURRENCY_DECIMALS: u32 = 2;
const DEFAULT_TEAM_DEPTH: usize = 16;
const MAX_CURRENCY_DECIMALS: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionSettings {
    /// Decimal places amounts are rounded to.
    pub currency_decimals: u32,
    /// Sub-department levels below a manager's departments that still count
    /// as the manager's team for access checks.
    pub team_depth: usize,
}

impl Default for CommissionSettings {
    fn default() -> Self {
        Self {
            currency_decimals: DEFAULT_CURRENCY_DECIMALS,
            team_depth: DEFAULT_TEAM_DEPTH,
        }
    }
}

impl CommissionSettings {
    /// Read settings from the process environment; unset or invalid values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            currency_decimals: parse_or(
                CURRENCY_DECIMALS_ENV,
                lookup(CURRENCY_DECIMALS_ENV),
                defaults.currency_decimals,
            )
            .min(MAX_CURRENCY_DECIMALS),
            team_depth: parse_or(TEAM_DEPTH_ENV, lookup(TEAM_DEPTH_ENV), defaults.team_depth),
        }
    }

    pub fn from_json(json: &str) -> DomainResult<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("commission settings: {e}")))?;
        if settings.currency_decimals > MAX_CURRENCY_DECIMALS {
            return Err(DomainError::configuration(format!(
                "currency_decimals must be at most {MAX_CURRENCY_DECIMALS}"
            )));
        }
        Ok(settings)
    }
}

fn parse_or<T: core::str::FromStr + Copy + core::fmt::Display>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, %default, "invalid commission setting; using default");
            default
        }
    }
}
