//! Random sampling of attack counts, intensities and durations.
//!
//! All functions take the shared calibration by reference and a caller-owned
//! RNG, so patients can be simulated on independent streams in parallel.

use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Beta, Distribution, Exp, LogNormal, Normal};

use crate::calibration::CalibrationParameters;
use crate::error::{ChError, ChResult};

/// Intensity-linked duration scale factor: more intense attacks run longer.
const INTENSITY_SLOPE: f64 = 0.1064;
const INTENSITY_OFFSET: f64 = 0.5797;

/// Maximum proportional duration reduction treatment can achieve, reached at
/// intensity 10.
const MAX_TREATMENT_EFFECT: f64 = 0.3;

/// Number of attacks on one active day.
///
/// Draws from the (chronicity, treatment) lognormal cell, rejecting draws
/// above `max_daily_cap` and flooring the rounded result at 1: an active day
/// has at least one attack. The cap must be finite so the rejection loop has
/// bounded acceptance probability.
pub fn sample_attacks_per_day<R: Rng>(
    params: &CalibrationParameters,
    is_chronic: bool,
    is_treated: bool,
    max_daily_cap: f64,
    rng: &mut R,
) -> ChResult<u32> {
    if !max_daily_cap.is_finite() || max_daily_cap < 1.0 {
        return Err(ChError::InvalidConfig(format!(
            "attacks-per-day cap must be finite and at least 1, got {}",
            max_daily_cap
        )));
    }

    let cell = params.attacks_per_day(is_chronic, is_treated);
    let dist = LogNormal::new(cell.mu, cell.sigma).map_err(|_| ChError::Random)?;

    let attacks = loop {
        let draw = dist.sample(rng);
        if draw <= max_daily_cap {
            break draw;
        }
    };

    Ok((attacks.round() as u32).max(1))
}

/// Days per year with at least one attack, for chronic patients.
pub fn sample_chronic_active_days<R: Rng>(rng: &mut R) -> ChResult<u32> {
    let dist = LogNormal::new(200f64.ln(), 0.5).map_err(|_| ChError::Random)?;
    Ok((dist.sample(rng).round() as u32).min(365))
}

/// Per-bout durations in days for an episodic patient's year.
///
/// Draws `ceil(annual_bouts)` bout lengths in weeks from the fitted
/// lognormal; a fractional bout count scales the final bout down to the
/// fractional remainder. Weeks convert to days at a floor of one day.
pub fn sample_bout_durations<R: Rng>(
    params: &CalibrationParameters,
    annual_bouts: f64,
    rng: &mut R,
) -> ChResult<Vec<u32>> {
    let n_bouts = annual_bouts.ceil() as usize;
    let dist = LogNormal::new(params.bout_duration.mu, params.bout_duration.sigma)
        .map_err(|_| ChError::Random)?;

    let mut weeks: Vec<f64> = (0..n_bouts).map(|_| dist.sample(rng)).collect();
    let fraction = annual_bouts.fract();
    if fraction > 0.0 {
        if let Some(last) = weeks.last_mut() {
            *last *= fraction;
        }
    }

    Ok(weeks.into_iter().map(|w| ((w * 7.0) as u32).max(1)).collect())
}

/// Peak pain intensities for a batch of attacks.
///
/// Three-component mixture: two truncated normals floored at 1 for
/// mild-to-moderate and moderate-to-severe attacks, and a `10 - Exp`
/// component modelling the ceiling effect near the top of the scale.
/// Untreated attacks skew towards the severe components. Results are clamped
/// to [1, 10] and rounded to one decimal.
pub fn sample_max_intensities<R: Rng>(
    is_treated: bool,
    count: usize,
    rng: &mut R,
) -> ChResult<Vec<f64>> {
    let mild_moderate = Normal::new(4.0, 2.0).map_err(|_| ChError::Random)?;
    let moderate_severe = Normal::new(7.5, 2.0).map_err(|_| ChError::Random)?;

    let ceiling_scale = if is_treated { 0.7 } else { 0.5 };
    let very_severe = Exp::new(1.0 / ceiling_scale).map_err(|_| ChError::Random)?;

    let weights: [f64; 3] = if is_treated { [0.40, 0.35, 0.25] } else { [0.20, 0.50, 0.30] };
    let component = WeightedIndex::new(&weights).map_err(|_| ChError::Random)?;

    let mut intensities = Vec::with_capacity(count);
    for _ in 0..count {
        let raw = match component.sample(rng) {
            0 => sample_truncated_normal(&mild_moderate, 1.0, rng),
            1 => sample_truncated_normal(&moderate_severe, 1.0, rng),
            _ => 10.0 - very_severe.sample(rng),
        };
        intensities.push((raw.clamp(1.0, 10.0) * 10.0).round() / 10.0);
    }

    Ok(intensities)
}

fn sample_truncated_normal<R: Rng>(dist: &Normal<f64>, floor: f64, rng: &mut R) -> f64 {
    loop {
        let x = dist.sample(rng);
        if x >= floor {
            return x;
        }
    }
}

/// Total durations in minutes for a batch of attacks, one per intensity.
///
/// Base lognormal durations (longer for chronic patients) are scaled up with
/// intensity. Treated patients apply a Beta(5, 2)-distributed abort effect
/// whose mean reduction grows with intensity: mild attacks are often left
/// untreated, intense ones are aborted aggressively. Rounded to whole
/// minutes and clamped to [15, 360].
pub fn sample_attack_durations<R: Rng>(
    is_chronic: bool,
    is_treated: bool,
    max_intensities: &[f64],
    rng: &mut R,
) -> ChResult<Vec<u32>> {
    let mu = if is_chronic { 4.3 } else { 4.0 };
    let base = LogNormal::new(mu, 0.4).map_err(|_| ChError::Random)?;
    let treatment = Beta::new(5.0, 2.0).map_err(|_| ChError::Random)?;

    let mut durations = Vec::with_capacity(max_intensities.len());
    for &intensity in max_intensities {
        let mut minutes = base.sample(rng) * (INTENSITY_SLOPE * intensity + INTENSITY_OFFSET);

        if is_treated {
            let intensity_normalized = (intensity - 1.0) / 9.0;
            let mean_effect = 1.0 - MAX_TREATMENT_EFFECT * intensity_normalized;
            minutes *= treatment.sample(rng) * mean_effect;
        }

        durations.push((minutes.round() as i64).clamp(15, 360) as u32);
    }

    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> CalibrationParameters {
        CalibrationParameters::from_published_data().unwrap()
    }

    #[test]
    fn intensities_are_clamped_and_rounded() {
        let mut rng = StdRng::seed_from_u64(42);
        for is_treated in [true, false] {
            let intensities = sample_max_intensities(is_treated, 10_000, &mut rng).unwrap();
            for i in intensities {
                assert!((1.0..=10.0).contains(&i), "intensity {} out of range", i);
                assert!(
                    ((i * 10.0).round() - i * 10.0).abs() < 1e-9,
                    "intensity {} not on a 0.1 grid",
                    i
                );
            }
        }
    }

    #[test]
    fn durations_are_clamped_for_every_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        for is_chronic in [true, false] {
            for is_treated in [true, false] {
                let intensities =
                    sample_max_intensities(is_treated, 10_000, &mut rng).unwrap();
                let durations =
                    sample_attack_durations(is_chronic, is_treated, &intensities, &mut rng)
                        .unwrap();
                assert_eq!(durations.len(), intensities.len());
                for d in durations {
                    assert!((15..=360).contains(&d), "duration {} out of range", d);
                }
            }
        }
    }

    #[test]
    fn untreated_attacks_skew_more_severe() {
        let mut rng = StdRng::seed_from_u64(11);
        let treated = sample_max_intensities(true, 20_000, &mut rng).unwrap();
        let untreated = sample_max_intensities(false, 20_000, &mut rng).unwrap();
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean(&untreated) > mean(&treated));
    }

    #[test]
    fn attacks_per_day_respects_floor_and_cap() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let n = sample_attacks_per_day(&params, true, false, 5.0, &mut rng).unwrap();
            assert!((1..=5).contains(&n), "attacks-per-day {} violates bounds", n);
        }
    }

    #[test]
    fn attacks_per_day_rejects_unbounded_cap() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(sample_attacks_per_day(&params, false, true, f64::INFINITY, &mut rng).is_err());
        assert!(sample_attacks_per_day(&params, false, true, 0.5, &mut rng).is_err());
    }

    #[test]
    fn chronic_active_days_capped_at_year() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            assert!(sample_chronic_active_days(&mut rng).unwrap() <= 365);
        }
    }

    #[test]
    fn bout_durations_floor_at_one_day() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(9);
        for bouts in [0.5, 1.0, 1.5, 2.5, 3.0] {
            let durations = sample_bout_durations(&params, bouts, &mut rng).unwrap();
            assert_eq!(durations.len(), bouts.ceil() as usize);
            assert!(durations.iter().all(|&d| d >= 1));
        }
    }
}
