use serde::{Deserialize, Serialize};

use crate::transform::IntensityTransform;

/// Intensity buckets 0.0 to 10.0 in 0.1 steps; bucket index is intensity*10.
pub const NUM_INTENSITY_BUCKETS: usize = 101;

/// First bucket counted as high intensity (>= 9.0 on the 10-point scale).
pub const HIGH_INTENSITY_START: usize = 90;

pub const MINUTES_PER_YEAR: f64 = 60.0 * 24.0 * 365.0;

pub fn intensity_axis() -> Vec<f64> {
    (0..NUM_INTENSITY_BUCKETS).map(|i| i as f64 / 10.0).collect()
}

/// The four (chronicity x treatment) population cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientGroup {
    EpisodicTreated,
    EpisodicUntreated,
    ChronicTreated,
    ChronicUntreated,
}

impl PatientGroup {
    pub const ALL: [PatientGroup; 4] = [
        PatientGroup::EpisodicTreated,
        PatientGroup::EpisodicUntreated,
        PatientGroup::ChronicTreated,
        PatientGroup::ChronicUntreated,
    ];

    pub fn is_chronic(self) -> bool {
        matches!(self, PatientGroup::ChronicTreated | PatientGroup::ChronicUntreated)
    }

    pub fn is_treated(self) -> bool {
        matches!(self, PatientGroup::EpisodicTreated | PatientGroup::ChronicTreated)
    }

    pub fn label(self) -> &'static str {
        match self {
            PatientGroup::EpisodicTreated => "Episodic Treated",
            PatientGroup::EpisodicUntreated => "Episodic Untreated",
            PatientGroup::ChronicTreated => "Chronic Treated",
            PatientGroup::ChronicUntreated => "Chronic Untreated",
        }
    }
}

/// Per-group reduction over the simulated patients' intensity-minute curves.
#[derive(Debug, Clone, Serialize)]
pub struct GroupAggregate {
    pub n_patients: usize,
    /// Per-bucket mean minutes per patient (divided by the full group size).
    pub average: Vec<f64>,
    /// Per-bucket population std across patients that contributed to the
    /// bucket; zero where no patient did.
    pub std_dev: Vec<f64>,
    /// Per-bucket summed minutes across the group.
    pub total: Vec<f64>,
}

impl GroupAggregate {
    /// An empty group reduces to all-zero curves rather than dividing by
    /// zero.
    pub fn from_patient_minutes(minutes: &[[u64; NUM_INTENSITY_BUCKETS]]) -> Self {
        let n_patients = minutes.len();
        let mut average = vec![0.0; NUM_INTENSITY_BUCKETS];
        let mut std_dev = vec![0.0; NUM_INTENSITY_BUCKETS];
        let mut total = vec![0.0; NUM_INTENSITY_BUCKETS];

        if n_patients == 0 {
            return Self { n_patients, average, std_dev, total };
        }

        for bucket in 0..NUM_INTENSITY_BUCKETS {
            let contributions: Vec<f64> = minutes
                .iter()
                .map(|m| m[bucket] as f64)
                .filter(|&v| v > 0.0)
                .collect();

            let sum: f64 = contributions.iter().sum();
            total[bucket] = sum;
            average[bucket] = sum / n_patients as f64;
            std_dev[bucket] = population_std(&contributions);
        }

        Self { n_patients, average, std_dev, total }
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Group averages scaled to the worldwide sufferer count and converted from
/// minutes/year to person-years.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalEstimate {
    pub person_years: Vec<f64>,
    pub std_person_years: Vec<f64>,
}

impl GlobalEstimate {
    pub fn from_aggregate(aggregate: &GroupAggregate, worldwide_count: u64) -> Self {
        let scale = worldwide_count as f64 / MINUTES_PER_YEAR;
        Self {
            person_years: aggregate.average.iter().map(|a| a * scale).collect(),
            // Linear scaling propagates the std with the same factor.
            std_person_years: aggregate.std_dev.iter().map(|s| s * scale).collect(),
        }
    }
}

/// Everything computed for one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub group: PatientGroup,
    pub worldwide_count: u64,
    pub aggregate: GroupAggregate,
    pub global: GlobalEstimate,
    /// Global person-years weighted by the configured intensity transform.
    pub adjusted_pain_units: Vec<f64>,
    /// Average-patient minutes weighted by the configured transform.
    pub adjusted_avg_pain_units: Vec<f64>,
}

/// Output of a full simulation run; curves align 1:1 with the intensity axis.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResults {
    pub intensities: Vec<f64>,
    pub total_sufferers: u64,
    pub groups: Vec<GroupResult>,
}

impl SimulationResults {
    /// Recomputes the adjusted pain-unit curves for new transform settings
    /// without re-running the simulation.
    pub fn reapply_transform(&mut self, transform: &IntensityTransform) {
        for group in &mut self.groups {
            group.adjusted_pain_units = transform.apply_curve(&group.global.person_years);
            group.adjusted_avg_pain_units = transform.apply_curve(&group.aggregate.average);
        }
    }
}

/// Scalar roll-up of one group's curves.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub group: PatientGroup,
    pub worldwide_count: u64,
    pub n_simulated: usize,
    pub average_minutes_total: f64,
    pub average_minutes_high: f64,
    pub person_years_total: f64,
    pub person_years_total_std: f64,
    pub person_years_high: f64,
    pub person_years_high_std: f64,
    pub adjusted_units_total: f64,
    pub adjusted_units_high: f64,
    pub adjusted_avg_units_total: f64,
    pub adjusted_avg_units_high: f64,
}

impl GroupSummary {
    pub fn from_group(group: &GroupResult) -> Self {
        let years = &group.global.person_years;
        let std = &group.global.std_person_years;
        Self {
            group: group.group,
            worldwide_count: group.worldwide_count,
            n_simulated: group.aggregate.n_patients,
            average_minutes_total: group.aggregate.average.iter().sum(),
            average_minutes_high: group.aggregate.average[HIGH_INTENSITY_START..].iter().sum(),
            person_years_total: years.iter().sum(),
            person_years_total_std: propagated_std(std),
            person_years_high: years[HIGH_INTENSITY_START..].iter().sum(),
            person_years_high_std: propagated_std(&std[HIGH_INTENSITY_START..]),
            adjusted_units_total: group.adjusted_pain_units.iter().sum(),
            adjusted_units_high: group.adjusted_pain_units[HIGH_INTENSITY_START..].iter().sum(),
            adjusted_avg_units_total: group.adjusted_avg_pain_units.iter().sum(),
            adjusted_avg_units_high: group.adjusted_avg_pain_units[HIGH_INTENSITY_START..]
                .iter()
                .sum(),
        }
    }
}

/// Standard deviation of a sum of independent terms.
fn propagated_std(stds: &[f64]) -> f64 {
    stds.iter().map(|s| s * s).sum::<f64>().sqrt()
}

/// Population-level summary across all groups, serialized alongside the raw
/// curves.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationSummary {
    pub total_sufferers: u64,
    pub total_simulated: usize,
    pub groups: Vec<GroupSummary>,
    pub total_person_years: f64,
    pub total_person_years_std: f64,
    pub high_intensity_person_years: f64,
    pub high_intensity_person_years_std: f64,
}

impl PopulationSummary {
    pub fn from_results(results: &SimulationResults) -> Self {
        let groups: Vec<GroupSummary> =
            results.groups.iter().map(GroupSummary::from_group).collect();

        let total_person_years = groups.iter().map(|g| g.person_years_total).sum();
        let high_intensity_person_years = groups.iter().map(|g| g.person_years_high).sum();
        let total_std: Vec<f64> = groups.iter().map(|g| g.person_years_total_std).collect();
        let high_std: Vec<f64> = groups.iter().map(|g| g.person_years_high_std).collect();

        Self {
            total_sufferers: results.total_sufferers,
            total_simulated: groups.iter().map(|g| g.n_simulated).sum(),
            groups,
            total_person_years,
            total_person_years_std: propagated_std(&total_std),
            high_intensity_person_years,
            high_intensity_person_years_std: propagated_std(&high_std),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_group_yields_zero_curves() {
        let aggregate = GroupAggregate::from_patient_minutes(&[]);
        assert_eq!(aggregate.n_patients, 0);
        assert!(aggregate.average.iter().all(|&v| v == 0.0));
        assert!(aggregate.std_dev.iter().all(|&v| v == 0.0));
        assert!(aggregate.total.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn aggregate_matches_hand_computed_values() {
        let mut a = [0u64; NUM_INTENSITY_BUCKETS];
        let mut b = [0u64; NUM_INTENSITY_BUCKETS];
        a[90] = 100;
        b[90] = 300;
        a[50] = 60;

        let aggregate = GroupAggregate::from_patient_minutes(&[a, b]);
        assert_eq!(aggregate.n_patients, 2);

        // Bucket 90: both patients contribute.
        assert_relative_eq!(aggregate.average[90], 200.0);
        assert_relative_eq!(aggregate.std_dev[90], 100.0);
        assert_relative_eq!(aggregate.total[90], 400.0);

        // Bucket 50: one contributor; average still divides by the group
        // size, std over a single contributor is zero.
        assert_relative_eq!(aggregate.average[50], 30.0);
        assert_relative_eq!(aggregate.std_dev[50], 0.0);
        assert_relative_eq!(aggregate.total[50], 60.0);

        // Untouched bucket.
        assert_relative_eq!(aggregate.average[0], 0.0);
    }

    #[test]
    fn global_estimate_scales_linearly() {
        let mut minutes = [0u64; NUM_INTENSITY_BUCKETS];
        minutes[80] = MINUTES_PER_YEAR as u64; // one full year at 8.0
        let aggregate = GroupAggregate::from_patient_minutes(&[minutes]);
        let global = GlobalEstimate::from_aggregate(&aggregate, 1000);

        // A patient spending a full year at one intensity maps to one
        // person-year per worldwide sufferer.
        assert_relative_eq!(global.person_years[80], 1000.0, epsilon = 1e-6);
        assert_relative_eq!(global.std_person_years[80], 0.0);
    }

    #[test]
    fn propagated_std_is_quadrature_sum() {
        assert_relative_eq!(propagated_std(&[3.0, 4.0]), 5.0);
        assert_relative_eq!(propagated_std(&[]), 0.0);
    }
}
