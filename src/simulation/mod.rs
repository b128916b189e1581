pub mod generator;
pub mod patient;
pub mod results;

pub use patient::*;
pub use results::*;

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::calibration::CalibrationParameters;
use crate::config::Config;
use crate::error::{ChError, ChResult};
use crate::transform::IntensityTransform;

/// Orchestrates one simulation: worldwide group sizing, parallel per-patient
/// year generation, aggregation, and intensity-transform application.
pub struct Simulator {
    config: Config,
    params: CalibrationParameters,
    seed: u64,
}

impl Simulator {
    /// Calibrates the sampling distributions once. An omitted seed is drawn
    /// from entropy; results are bit-reproducible for a given seed
    /// regardless of thread count, since every patient gets its own
    /// counter-derived RNG stream.
    pub fn new(config: Config, seed: Option<u64>) -> ChResult<Self> {
        config.validate()?;
        let params = CalibrationParameters::from_published_data()?;
        let seed = seed.unwrap_or_else(rand::random);
        Ok(Self { config, params, seed })
    }

    fn total_sufferers_raw(&self) -> f64 {
        let pop = &self.config.population;
        pop.world_population as f64
            * pop.adult_fraction
            * (pop.annual_prevalence_per_100k / 100_000.0)
    }

    /// Worldwide sufferer count across all groups.
    pub fn total_sufferers(&self) -> u64 {
        self.total_sufferers_raw() as u64
    }

    fn group_fraction(&self, group: PatientGroup) -> f64 {
        let pop = &self.config.population;
        let chronicity = if group.is_chronic() { pop.prop_chronic } else { 1.0 - pop.prop_chronic };
        let treatment = if group.is_treated() { pop.prop_treated } else { 1.0 - pop.prop_treated };
        chronicity * treatment
    }

    /// Worldwide sufferer count per group.
    pub fn group_targets(&self) -> Vec<(PatientGroup, u64)> {
        let total = self.total_sufferers_raw();
        PatientGroup::ALL
            .iter()
            .map(|&group| (group, (total * self.group_fraction(group)) as u64))
            .collect()
    }

    /// Number of patients actually simulated per group.
    pub fn simulated_counts(&self) -> Vec<(PatientGroup, usize)> {
        let fraction = self.config.population.percent_of_patients_to_simulate / 100.0;
        self.group_targets()
            .into_iter()
            .map(|(group, count)| (group, (count as f64 * fraction) as usize))
            .collect()
    }

    /// Total simulated patient count plus per-group (count, percentage)
    /// breakdown.
    pub fn simulated_patients_info(&self) -> (usize, Vec<(PatientGroup, usize, u32)>) {
        let counts = self.simulated_counts();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        let info = counts
            .into_iter()
            .map(|(group, n)| {
                let percentage = if total > 0 {
                    (n as f64 / total as f64 * 100.0).round() as u32
                } else {
                    0
                };
                (group, n, percentage)
            })
            .collect();
        (total, info)
    }

    pub fn run(&self) -> ChResult<SimulationResults> {
        self.run_cancellable(&AtomicBool::new(false))
    }

    /// Runs the simulation, checking the cancellation flag between patients.
    pub fn run_cancellable(&self, cancel: &AtomicBool) -> ChResult<SimulationResults> {
        // Fail fast on transform problems before any sampling happens.
        let transform = IntensityTransform::from_config(&self.config.transform)?;

        let targets = self.group_targets();
        let counts = self.simulated_counts();
        let max_daily_attacks = self.config.simulation.max_daily_attacks;

        let mut assignments: Vec<PatientGroup> = Vec::new();
        for &(group, n) in &counts {
            assignments.extend(std::iter::repeat(group).take(n));
        }
        info!(
            "Simulating {} patients across {} groups (seed: {})",
            assignments.len(),
            targets.len(),
            self.seed
        );

        let patient_minutes: Vec<(PatientGroup, [u64; NUM_INTENSITY_BUCKETS])> = assignments
            .par_iter()
            .enumerate()
            .map(|(index, &group)| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(ChError::Cancelled);
                }
                let mut rng = ChaCha20Rng::seed_from_u64(self.seed.wrapping_add(index as u64));
                let mut patient =
                    Patient::new(group.is_chronic(), group.is_treated(), &self.params, &mut rng)?;
                let total =
                    patient.generate_year_of_attacks(&self.params, max_daily_attacks, &mut rng)?;
                debug!("Patient {} ({}): {} attacks", index, group.label(), total);
                Ok((group, patient.intensity_minutes()))
            })
            .collect::<ChResult<Vec<_>>>()?;

        let mut groups = Vec::with_capacity(targets.len());
        for (group, worldwide_count) in targets {
            let group_minutes: Vec<[u64; NUM_INTENSITY_BUCKETS]> = patient_minutes
                .iter()
                .filter(|(g, _)| *g == group)
                .map(|(_, minutes)| *minutes)
                .collect();

            let aggregate = GroupAggregate::from_patient_minutes(&group_minutes);
            let global = GlobalEstimate::from_aggregate(&aggregate, worldwide_count);
            let adjusted_pain_units = transform.apply_curve(&global.person_years);
            let adjusted_avg_pain_units = transform.apply_curve(&aggregate.average);

            info!(
                "{}: {} simulated patients, {:.0} person-years",
                group.label(),
                aggregate.n_patients,
                global.person_years.iter().sum::<f64>()
            );

            groups.push(GroupResult {
                group,
                worldwide_count,
                aggregate,
                global,
                adjusted_pain_units,
                adjusted_avg_pain_units,
            });
        }

        Ok(SimulationResults {
            intensities: intensity_axis(),
            total_sufferers: self.total_sufferers(),
            groups,
        })
    }
}
