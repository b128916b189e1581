use std::collections::BTreeMap;
use std::f64::consts::PI;

use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::Distribution;

use super::studies::StudySummary;
use super::LognormalParams;
use crate::error::{ChError, ChResult};

/// Sample-size-weighted merge of several discretized study tables into one
/// normalized probability mass function over annual bout counts.
#[derive(Debug, Clone)]
pub struct CombinedPmf {
    values: Vec<f64>,
    probs: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl CombinedPmf {
    pub fn combine(studies: &[StudySummary]) -> ChResult<Self> {
        let total_n: u32 = studies.iter().map(|s| s.n).sum();
        if total_n == 0 {
            return Err(ChError::Calibration(
                "combined bout-frequency distribution needs a positive total sample size"
                    .to_string(),
            ));
        }

        // Support values are multiples of 0.5, so value*10 is an exact
        // integer key. Avoids float map keys and keeps ordering stable.
        let mut mass: BTreeMap<i64, f64> = BTreeMap::new();
        for study in studies {
            let weight = study.n as f64 / total_n as f64;
            for &(value, prob) in study.distribution {
                *mass.entry((value * 10.0).round() as i64).or_insert(0.0) += prob * weight;
            }
        }

        let total_mass: f64 = mass.values().sum();
        if total_mass <= 0.0 {
            return Err(ChError::Calibration(
                "combined bout-frequency distribution has zero total mass".to_string(),
            ));
        }

        let values: Vec<f64> = mass.keys().map(|&k| k as f64 / 10.0).collect();
        let probs: Vec<f64> = mass.values().map(|&p| p / total_mass).collect();
        let index = WeightedIndex::new(&probs).map_err(|_| ChError::Random)?;

        Ok(Self { values, probs, index })
    }

    pub fn support(&self) -> &[f64] {
        &self.values
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        self.values[self.index.sample(rng)]
    }
}

/// Weighted negative log-likelihood of a lognormal over point observations.
struct WeightedLognormalNll {
    log_values: Vec<f64>,
    weights: Vec<f64>,
}

impl CostFunction for WeightedLognormalNll {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<f64, ArgminError> {
        let (mu, sigma) = (param[0], param[1]);
        if sigma <= 0.0 {
            return Ok(f64::INFINITY);
        }

        let ln_norm = sigma.ln() + 0.5 * (2.0 * PI).ln();
        let nll: f64 = self
            .log_values
            .iter()
            .zip(&self.weights)
            .map(|(&log_x, &w)| {
                let z = (log_x - mu) / sigma;
                w * (log_x + ln_norm + 0.5 * z * z)
            })
            .sum();

        if nll.is_finite() { Ok(nll) } else { Ok(f64::INFINITY) }
    }
}

/// Fit a lognormal to weighted point observations by Nelder-Mead on the
/// weighted negative log-likelihood, seeded from the weighted arithmetic
/// mean. The objective is a weighted sum, so the optimum does not depend on
/// input ordering.
pub fn fit_weighted_lognormal(values: &[f64], weights: &[f64]) -> ChResult<LognormalParams> {
    if values.is_empty() || values.len() != weights.len() {
        return Err(ChError::Calibration(
            "lognormal fit needs matching, non-empty values and weights".to_string(),
        ));
    }
    if values.iter().any(|&v| v <= 0.0) {
        return Err(ChError::Calibration(
            "lognormal fit requires strictly positive observations".to_string(),
        ));
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(ChError::Calibration(
            "lognormal fit requires a positive total weight".to_string(),
        ));
    }
    let normalized: Vec<f64> = weights.iter().map(|&w| w / weight_sum).collect();

    let weighted_mean: f64 = values.iter().zip(&normalized).map(|(&v, &w)| v * w).sum();
    let initial = vec![weighted_mean.ln(), 0.5];
    let simplex = vec![
        initial.clone(),
        vec![initial[0] + 0.1, initial[1]],
        vec![initial[0], initial[1] + 0.1],
    ];

    let problem = WeightedLognormalNll {
        log_values: values.iter().map(|&v| v.ln()).collect(),
        weights: normalized,
    };
    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(1e-10)
        .map_err(|e| ChError::Calibration(e.to_string()))?;

    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(1000))
        .run()
        .map_err(|e| ChError::Calibration(e.to_string()))?;

    let best = result
        .state()
        .get_best_param()
        .cloned()
        .ok_or_else(|| ChError::Calibration("lognormal fit produced no solution".to_string()))?;

    Ok(LognormalParams { mu: best[0], sigma: best[1] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::studies::BOUT_FREQUENCY_STUDIES;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn combined_pmf_is_normalized() {
        let pmf = CombinedPmf::combine(BOUT_FREQUENCY_STUDIES).unwrap();
        let total: f64 = pmf.probabilities().iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn combined_pmf_support_is_union_of_inputs() {
        let pmf = CombinedPmf::combine(BOUT_FREQUENCY_STUDIES).unwrap();
        assert_eq!(pmf.support(), &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn combine_rejects_zero_total_sample_size() {
        let studies = [StudySummary { name: "empty", n: 0, distribution: &[(1.0, 1.0)] }];
        assert!(CombinedPmf::combine(&studies).is_err());
    }

    #[test]
    fn samples_stay_on_support() {
        let pmf = CombinedPmf::combine(BOUT_FREQUENCY_STUDIES).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let value = pmf.sample(&mut rng);
            assert!(pmf.support().contains(&value), "sampled {} off support", value);
        }
    }

    #[test]
    fn mle_matches_closed_form_for_equal_weights() {
        // With equal weights the weighted MLE has a closed form: mu is the
        // mean of the log observations and sigma their population std.
        let values: [f64; 4] = [2.0, 4.0, 8.0, 16.0];
        let weights = [1.0, 1.0, 1.0, 1.0];

        let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
        let mu = logs.iter().sum::<f64>() / logs.len() as f64;
        let var = logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / logs.len() as f64;

        let fit = fit_weighted_lognormal(&values, &weights).unwrap();
        assert_relative_eq!(fit.mu, mu, epsilon = 1e-3);
        assert_relative_eq!(fit.sigma, var.sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn fit_is_permutation_invariant() {
        let values = [8.5, 1.0, 5.6568, 10.3, 2.0];
        let weights = [209.0, 34.0, 168.0, 101.0, 13.0];

        let forward = fit_weighted_lognormal(&values, &weights).unwrap();

        let mut rev_values = values;
        let mut rev_weights = weights;
        rev_values.reverse();
        rev_weights.reverse();
        let reversed = fit_weighted_lognormal(&rev_values, &rev_weights).unwrap();

        assert_relative_eq!(forward.mu, reversed.mu, epsilon = 1e-6);
        assert_relative_eq!(forward.sigma, reversed.sigma, epsilon = 1e-6);
    }

    #[test]
    fn fit_rejects_nonpositive_observations() {
        assert!(fit_weighted_lognormal(&[1.0, -2.0], &[1.0, 1.0]).is_err());
        assert!(fit_weighted_lognormal(&[], &[]).is_err());
        assert!(fit_weighted_lognormal(&[1.0], &[0.0]).is_err());
    }
}
