//! Configuration for the sensing core.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! simulation_seed = 42
//!
//! [motion]
//! threshold_deg = 2.0
//! timeout_ms = 1000
//!
//! [display]
//! round = true
//! dial_policy = "ShortestPath"
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compass::DialPolicy;
use crate::error::SensingError;
use crate::motion::MotionConfig;

/// Display-side options. None of these affect motion classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Round headings to whole degrees before showing them.
    pub round: bool,
    /// Compass dial travel policy.
    pub dial_policy: DialPolicy,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            round: true,
            dial_policy: DialPolicy::ShortestPath,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensingConfig {
    /// Seed for simulated fallback readings. `None` seeds from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_seed: Option<u64>,
    pub motion: MotionConfig,
    pub display: DisplayConfig,
}

impl SensingConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, SensingError> {
        let config: SensingConfig = toml::from_str(contents)?;
        config.validate()?;
        info!(
            threshold_deg = config.motion.threshold_deg,
            timeout_ms = config.motion.timeout_ms,
            "loaded sensing config"
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, SensingError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the classifier cannot work with.
    pub fn validate(&self) -> Result<(), SensingError> {
        let threshold = self.motion.threshold_deg;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(SensingError::InvalidConfig(format!(
                "motion.threshold_deg must be a positive number, got {threshold}"
            )));
        }
        if threshold >= 180.0 {
            return Err(SensingError::InvalidConfig(format!(
                "motion.threshold_deg must be below 180, got {threshold}"
            )));
        }
        if self.motion.timeout_ms == 0 {
            return Err(SensingError::InvalidConfig(
                "motion.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
