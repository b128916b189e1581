//! Severity-weighted remapping of the 0-10 intensity axis.
//!
//! Pain is not linearly burdensome across its scale, so time-at-intensity
//! curves can be reweighted by one of a closed set of transforms before
//! summing into adjusted pain units.

use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use log::warn;

use crate::config::{TransformConfig, TransformMethod};
use crate::error::{ChError, ChResult};

/// Intensity at which the fitted exponential passes through half the scale
/// maximum.
const EXP_MIDPOINT: f64 = 7.42;

/// Breakpoint of the piecewise-linear transform; each segment spans half of
/// `max_value`.
const PIECEWISE_BREAKPOINT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntensityTransform {
    Linear { max_value: f64 },
    Power { power: f64, max_value: f64 },
    PowerScaled { power: f64, max_value: f64 },
    PiecewiseLinear { max_value: f64 },
    /// `a * exp(b * x) + c`, fitted through (0, 0), (7.42, max/2), (10, max).
    CustomExp { a: f64, b: f64, c: f64 },
    Log { max_value: f64 },
}

impl IntensityTransform {
    /// Builds the transform from config, fitting the exponential variant up
    /// front. Fails fast on a non-positive `max_value`; a non-converging
    /// exponential fit degrades to the linear transform with a warning.
    pub fn from_config(config: &TransformConfig) -> ChResult<Self> {
        let max_value = config.max_value;
        if max_value <= 0.0 {
            return Err(ChError::InvalidTransform(format!(
                "max_value must be positive, got {}",
                max_value
            )));
        }

        match config.method {
            TransformMethod::Linear => Ok(Self::Linear { max_value }),
            TransformMethod::Power | TransformMethod::PowerScaled => {
                if config.power <= 0.0 {
                    return Err(ChError::InvalidTransform(format!(
                        "power must be positive, got {}",
                        config.power
                    )));
                }
                Ok(match config.method {
                    TransformMethod::Power => Self::Power { power: config.power, max_value },
                    _ => Self::PowerScaled { power: config.power, max_value },
                })
            }
            TransformMethod::PiecewiseLinear => Ok(Self::PiecewiseLinear { max_value }),
            TransformMethod::Log => Ok(Self::Log { max_value }),
            TransformMethod::CustomExp => match fit_exponential(max_value) {
                Some((a, b, c)) => Ok(Self::CustomExp { a, b, c }),
                None => {
                    warn!(
                        "exponential fit failed for max_value={}; falling back to the \
                         linear transform",
                        max_value
                    );
                    Ok(Self::Linear { max_value })
                }
            },
        }
    }

    /// Transformed severity weight at one intensity.
    pub fn apply(&self, intensity: f64) -> f64 {
        match *self {
            Self::Linear { max_value } => intensity * (max_value / 10.0),
            Self::Power { power, max_value } => {
                intensity.powf(power) * (max_value / 10f64.powf(power))
            }
            Self::PowerScaled { power, max_value } => (intensity / 10.0).powf(power) * max_value,
            Self::PiecewiseLinear { max_value } => {
                let half = max_value / 2.0;
                if intensity <= PIECEWISE_BREAKPOINT {
                    half / PIECEWISE_BREAKPOINT * intensity
                } else {
                    half + half / (10.0 - PIECEWISE_BREAKPOINT) * (intensity - PIECEWISE_BREAKPOINT)
                }
            }
            Self::CustomExp { a, b, c } => a * (b * intensity).exp() + c,
            Self::Log { max_value } => {
                (10f64.powf(intensity / 2.5) - 1.0) * max_value / (10f64.powf(4.0) - 1.0)
            }
        }
    }

    /// Weights a time-at-intensity curve element-wise; index i corresponds
    /// to intensity 0.1*i.
    pub fn apply_curve(&self, time_curve: &[f64]) -> Vec<f64> {
        time_curve
            .iter()
            .enumerate()
            .map(|(i, &t)| t * self.apply(i as f64 / 10.0))
            .collect()
    }
}

/// Least-squares residual of `a*exp(b*x) + c` against the three control
/// points.
struct ExpFitProblem {
    xs: [f64; 3],
    ys: [f64; 3],
}

impl CostFunction for ExpFitProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<f64, ArgminError> {
        let (a, b, c) = (param[0], param[1], param[2]);
        let sse: f64 = self
            .xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| {
                let r = a * (b * x).exp() + c - y;
                r * r
            })
            .sum();
        if sse.is_finite() { Ok(sse) } else { Ok(f64::INFINITY) }
    }
}

/// Nelder-Mead fit of the exponential through the three control points.
/// Returns `None` when the residual does not converge.
fn fit_exponential(max_value: f64) -> Option<(f64, f64, f64)> {
    let problem = ExpFitProblem {
        xs: [0.0, EXP_MIDPOINT, 10.0],
        ys: [0.0, max_value / 2.0, max_value],
    };

    let initial = vec![max_value / 10.0, 0.5, 0.0];
    let step = (max_value / 100.0).max(0.01);
    let simplex = vec![
        initial.clone(),
        vec![initial[0] + step, initial[1], initial[2]],
        vec![initial[0], initial[1] + 0.1, initial[2]],
        vec![initial[0], initial[1], initial[2] + step],
    ];

    let solver = NelderMead::new(simplex).with_sd_tolerance(1e-14).ok()?;
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(10_000))
        .run()
        .ok()?;

    let best = result.state().get_best_param()?.clone();
    let sse = result.state().get_best_cost();

    let tolerance = 1e-6 * max_value * max_value;
    if sse.is_finite() && sse <= tolerance && best.iter().all(|p| p.is_finite()) {
        Some((best[0], best[1], best[2]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transform(method: TransformMethod, power: f64, max_value: f64) -> IntensityTransform {
        IntensityTransform::from_config(&TransformConfig { method, power, max_value }).unwrap()
    }

    #[test]
    fn every_method_passes_through_endpoints() {
        let max_value = 100.0;
        for method in [
            TransformMethod::Linear,
            TransformMethod::Power,
            TransformMethod::PowerScaled,
            TransformMethod::PiecewiseLinear,
            TransformMethod::CustomExp,
            TransformMethod::Log,
        ] {
            let t = transform(method, 2.5, max_value);
            let tolerance = max_value * 1e-2; // fitted exponential is approximate
            assert!(
                (t.apply(10.0) - max_value).abs() < tolerance,
                "{:?} misses max at intensity 10: {}",
                method,
                t.apply(10.0)
            );
            assert!(
                t.apply(0.0).abs() < tolerance,
                "{:?} nonzero at intensity 0: {}",
                method,
                t.apply(0.0)
            );
        }
    }

    #[test]
    fn rejects_nonpositive_max_value() {
        let config =
            TransformConfig { method: TransformMethod::Linear, power: 2.0, max_value: 0.0 };
        assert!(IntensityTransform::from_config(&config).is_err());
    }

    #[test]
    fn rejects_nonpositive_power() {
        let config =
            TransformConfig { method: TransformMethod::Power, power: 0.0, max_value: 100.0 };
        assert!(IntensityTransform::from_config(&config).is_err());
    }

    #[test]
    fn piecewise_meets_at_breakpoint() {
        let t = transform(TransformMethod::PiecewiseLinear, 2.0, 100.0);
        assert_relative_eq!(t.apply(8.0), 50.0, epsilon = 1e-12);
        // Steeper above the breakpoint: half the scale over two points.
        assert_relative_eq!(t.apply(9.0), 75.0, epsilon = 1e-12);
    }

    #[test]
    fn exponential_fit_hits_the_midpoint() {
        let t = transform(TransformMethod::CustomExp, 2.0, 100.0);
        assert!((t.apply(EXP_MIDPOINT) - 50.0).abs() < 1.0);
        // Exponential growth: the curve stays below linear in the interior.
        assert!(t.apply(5.0) < 50.0);
    }

    #[test]
    fn log_transform_is_monotone() {
        let t = transform(TransformMethod::Log, 2.0, 100.0);
        let mut previous = -1.0;
        for i in 0..=100 {
            let value = t.apply(i as f64 / 10.0);
            assert!(value > previous);
            previous = value;
        }
    }

    #[test]
    fn apply_curve_weights_elementwise() {
        let t = transform(TransformMethod::Linear, 2.0, 100.0);
        let mut curve = vec![0.0; 101];
        curve[50] = 2.0; // intensity 5.0 -> weight 50
        curve[100] = 1.0; // intensity 10.0 -> weight 100
        let adjusted = t.apply_curve(&curve);
        assert_relative_eq!(adjusted[50], 100.0);
        assert_relative_eq!(adjusted[100], 100.0);
        assert_relative_eq!(adjusted[0], 0.0);
    }
}
