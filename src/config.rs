use crate::error::{ChError, ChResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub population: PopulationConfig,
    pub transform: TransformConfig,
    #[serde(default)]
    pub simulation: SimulationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Annual prevalence of cluster headache sufferers per 100,000 adults.
    pub annual_prevalence_per_100k: f64,
    pub world_population: u64,
    pub adult_fraction: f64,
    /// Proportion of sufferers with the chronic subtype; episodic is the complement.
    pub prop_chronic: f64,
    /// Proportion of sufferers with access to treatment; untreated is the complement.
    pub prop_treated: f64,
    /// Percentage (0-100) of worldwide sufferers to actually simulate.
    pub percent_of_patients_to_simulate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    pub method: TransformMethod,
    /// Exponent, used only by the power variants.
    pub power: f64,
    /// Value the transformed scale reaches at intensity 10.
    pub max_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMethod {
    Linear,
    Power,
    PowerScaled,
    CustomExp,
    PiecewiseLinear,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Rejection cap for the attacks-per-day draw. Must be finite so the
    /// rejection loop terminates.
    pub max_daily_attacks: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self { max_daily_attacks: 24.0 }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            annual_prevalence_per_100k: 53.0,
            world_population: 8_200_000_000,
            adult_fraction: 0.72,
            prop_chronic: 0.20,
            prop_treated: 0.48,
            percent_of_patients_to_simulate: 0.02,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self { method: TransformMethod::Linear, power: 2.0, max_value: 100.0 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            transform: TransformConfig::default(),
            simulation: SimulationOptions::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ChResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChResult<()> {
        let pop = &self.population;

        if pop.annual_prevalence_per_100k <= 0.0 {
            return Err(ChError::InvalidConfig(
                "annual_prevalence_per_100k must be positive".to_string(),
            ));
        }

        if pop.world_population == 0 {
            return Err(ChError::InvalidConfig(
                "world_population must be positive".to_string(),
            ));
        }

        for (name, value) in [
            ("adult_fraction", pop.adult_fraction),
            ("prop_chronic", pop.prop_chronic),
            ("prop_treated", pop.prop_treated),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ChError::InvalidConfig(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=100.0).contains(&pop.percent_of_patients_to_simulate) {
            return Err(ChError::InvalidConfig(format!(
                "percent_of_patients_to_simulate must be between 0 and 100, got {}",
                pop.percent_of_patients_to_simulate
            )));
        }

        if self.transform.max_value <= 0.0 {
            return Err(ChError::InvalidConfig(
                "transform max_value must be positive".to_string(),
            ));
        }

        if self.transform.power <= 0.0 {
            return Err(ChError::InvalidConfig(
                "transform power must be positive".to_string(),
            ));
        }

        if !self.simulation.max_daily_attacks.is_finite()
            || self.simulation.max_daily_attacks < 1.0
        {
            return Err(ChError::InvalidConfig(format!(
                "max_daily_attacks must be finite and at least 1, got {}",
                self.simulation.max_daily_attacks
            )));
        }

        Ok(())
    }
}
