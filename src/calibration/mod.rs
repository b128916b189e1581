//! Calibration of the sampling distributions from published summary data.
//!
//! Everything here is computed once at startup and handed to the generators
//! as an immutable `CalibrationParameters` reference; nothing is refitted
//! per patient.

pub mod fit;
pub mod studies;

pub use fit::CombinedPmf;

use crate::error::{ChError, ChResult};

/// (mu, sigma) of the underlying normal of a lognormal distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LognormalParams {
    pub mu: f64,
    pub sigma: f64,
}

impl LognormalParams {
    /// Closed-form moment matching from an arithmetic mean and standard
    /// deviation.
    pub fn from_moments(mean: f64, std: f64) -> ChResult<Self> {
        if mean <= 0.0 {
            return Err(ChError::Calibration(format!(
                "lognormal moment matching requires a positive mean, got {}",
                mean
            )));
        }
        if std < 0.0 {
            return Err(ChError::Calibration(format!(
                "lognormal moment matching requires a non-negative std, got {}",
                std
            )));
        }

        let variance = std * std;
        let mu = (mean * mean / (variance + mean * mean).sqrt()).ln();
        let sigma = (1.0 + variance / (mean * mean)).ln().sqrt();
        Ok(Self { mu, sigma })
    }

    /// Analytic arithmetic mean of the distribution.
    pub fn mean(&self) -> f64 {
        (self.mu + 0.5 * self.sigma * self.sigma).exp()
    }

    /// Analytic arithmetic standard deviation of the distribution.
    pub fn std(&self) -> f64 {
        ((self.sigma * self.sigma).exp() - 1.0).sqrt() * self.mean()
    }
}

/// Scale treated-population moments up by a multiplicative treatment-effect
/// ratio, preserving the coefficient of variation. Published attack-frequency
/// data skews towards treated hospital cohorts, so untreated moments have to
/// be estimated.
pub fn estimate_untreated(treated_mean: f64, treated_std: f64, treatment_effect: f64) -> (f64, f64) {
    let cv = treated_std / treated_mean;
    let untreated_mean = treated_mean * treatment_effect;
    (untreated_mean, untreated_mean * cv)
}

// Gaul et al. (2012); German hospital cohort, assumed treated.
const EPISODIC_TREATED_MOMENTS: (f64, f64) = (3.1, 2.1);
const CHRONIC_TREATED_MOMENTS: (f64, f64) = (3.3, 3.0);

/// Assumed ratio of untreated to treated daily attack frequency.
const TREATMENT_EFFECT_RATIO: f64 = 1.05;

/// Immutable bundle of every fitted distribution the simulation samples from.
#[derive(Debug, Clone)]
pub struct CalibrationParameters {
    /// Annual bout counts for episodic patients.
    pub bout_frequency: CombinedPmf,
    /// Bout duration in weeks, shared by all episodic patients.
    pub bout_duration: LognormalParams,
    episodic_treated: LognormalParams,
    episodic_untreated: LognormalParams,
    chronic_treated: LognormalParams,
    chronic_untreated: LognormalParams,
}

impl CalibrationParameters {
    pub fn from_published_data() -> ChResult<Self> {
        let bout_frequency = CombinedPmf::combine(studies::BOUT_FREQUENCY_STUDIES)?;

        let (values, weights) = studies::bout_duration_data();
        let bout_duration = fit::fit_weighted_lognormal(&values, &weights)?;

        let (et_mean, et_std) = EPISODIC_TREATED_MOMENTS;
        let (ct_mean, ct_std) = CHRONIC_TREATED_MOMENTS;
        let (eu_mean, eu_std) = estimate_untreated(et_mean, et_std, TREATMENT_EFFECT_RATIO);
        let (cu_mean, cu_std) = estimate_untreated(ct_mean, ct_std, TREATMENT_EFFECT_RATIO);

        Ok(Self {
            bout_frequency,
            bout_duration,
            episodic_treated: LognormalParams::from_moments(et_mean, et_std)?,
            episodic_untreated: LognormalParams::from_moments(eu_mean, eu_std)?,
            chronic_treated: LognormalParams::from_moments(ct_mean, ct_std)?,
            chronic_untreated: LognormalParams::from_moments(cu_mean, cu_std)?,
        })
    }

    /// Daily attack frequency parameters for one (chronicity, treatment) cell.
    pub fn attacks_per_day(&self, is_chronic: bool, is_treated: bool) -> &LognormalParams {
        match (is_chronic, is_treated) {
            (true, true) => &self.chronic_treated,
            (true, false) => &self.chronic_untreated,
            (false, true) => &self.episodic_treated,
            (false, false) => &self.episodic_untreated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn moment_matching_round_trips() {
        for (mean, std) in [(3.1, 2.1), (3.3, 3.0), (10.0, 5.0), (0.5, 0.25), (200.0, 80.0)] {
            let params = LognormalParams::from_moments(mean, std).unwrap();
            assert_relative_eq!(params.mean(), mean, epsilon = 1e-9);
            assert_relative_eq!(params.std(), std, epsilon = 1e-9);
        }
    }

    #[test]
    fn moment_matching_rejects_nonpositive_mean() {
        assert!(LognormalParams::from_moments(0.0, 1.0).is_err());
        assert!(LognormalParams::from_moments(-3.0, 1.0).is_err());
    }

    #[test]
    fn untreated_estimate_preserves_cv() {
        let (mean, std) = estimate_untreated(3.1, 2.1, 1.05);
        assert_relative_eq!(mean, 3.1 * 1.05, epsilon = 1e-12);
        assert_relative_eq!(std / mean, 2.1 / 3.1, epsilon = 1e-12);
    }

    #[test]
    fn published_calibration_builds() {
        let params = CalibrationParameters::from_published_data().unwrap();

        // Untreated cells must sit above their treated counterparts.
        let et = params.attacks_per_day(false, true);
        let eu = params.attacks_per_day(false, false);
        let ct = params.attacks_per_day(true, true);
        let cu = params.attacks_per_day(true, false);
        assert!(eu.mean() > et.mean());
        assert!(cu.mean() > ct.mean());
        assert!(et.sigma > 0.0 && ct.sigma > 0.0);

        // The fitted bout duration should land in a plausible range (weeks).
        assert!(params.bout_duration.sigma > 0.0);
        let median_weeks = params.bout_duration.mu.exp();
        assert!(
            (2.0..20.0).contains(&median_weeks),
            "median bout duration {} weeks is implausible",
            median_weeks
        );
    }
}
