use rand::Rng;

use super::generator;
use super::results::NUM_INTENSITY_BUCKETS;
use crate::calibration::CalibrationParameters;
use crate::error::ChResult;

/// Conservative attacks-per-day bound used only to size the pre-generated
/// attack pool; actual daily draws may exceed it and trigger a refill.
const POOL_ATTACKS_PER_DAY: u32 = 8;

/// Fraction of an attack spent at peak intensity; onset and offset phases
/// take roughly 15% of the total each.
const PEAK_FRACTION: f64 = 0.7;

/// A single attack, immutable once generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attack {
    /// Total duration in minutes, clamped to [15, 360].
    pub total_duration: u32,
    /// Peak pain intensity on a 1-10 scale, one decimal place.
    pub max_intensity: f64,
    /// Minutes spent at peak intensity.
    pub max_intensity_duration: u32,
}

impl Attack {
    pub fn new(total_duration: u32, max_intensity: f64) -> Self {
        Self {
            total_duration,
            max_intensity,
            max_intensity_duration: (PEAK_FRACTION * total_duration as f64).round() as u32,
        }
    }
}

/// Pre-generated batch of attacks with a cursor, refilled transparently when
/// a year draws more attacks than the initial estimate. Amortizes sampling
/// cost; not a cap on attack counts.
#[derive(Debug, Clone)]
struct AttackPool {
    attacks: Vec<Attack>,
    cursor: usize,
    size: usize,
    is_chronic: bool,
    is_treated: bool,
}

impl AttackPool {
    fn new<R: Rng>(
        size: usize,
        is_chronic: bool,
        is_treated: bool,
        rng: &mut R,
    ) -> ChResult<Self> {
        let mut pool = Self {
            attacks: Vec::new(),
            cursor: 0,
            size: size.max(POOL_ATTACKS_PER_DAY as usize),
            is_chronic,
            is_treated,
        };
        pool.refill(rng)?;
        Ok(pool)
    }

    /// Intensities are drawn before durations so the intensity-duration
    /// correlation can be applied across the whole batch.
    fn refill<R: Rng>(&mut self, rng: &mut R) -> ChResult<()> {
        let intensities = generator::sample_max_intensities(self.is_treated, self.size, rng)?;
        let durations = generator::sample_attack_durations(
            self.is_chronic,
            self.is_treated,
            &intensities,
            rng,
        )?;

        self.attacks = durations
            .into_iter()
            .zip(intensities)
            .map(|(duration, intensity)| Attack::new(duration, intensity))
            .collect();
        self.cursor = 0;
        Ok(())
    }

    fn next<R: Rng>(&mut self, rng: &mut R) -> ChResult<Attack> {
        if self.cursor >= self.attacks.len() {
            self.refill(rng)?;
        }
        let attack = self.attacks[self.cursor];
        self.cursor += 1;
        Ok(attack)
    }
}

/// Annual attack pattern of one patient.
#[derive(Debug, Clone)]
pub enum Profile {
    /// Near-daily attacks year-round.
    Chronic { active_days: u32 },
    /// Discrete bouts separated by remission.
    Episodic { annual_bouts: f64, bout_durations: Vec<u32> },
}

impl Profile {
    /// Number of attack days implied by the profile.
    fn attack_days(&self) -> u32 {
        match self {
            Profile::Chronic { active_days } => (*active_days).min(365),
            Profile::Episodic { bout_durations, .. } => bout_durations.iter().sum(),
        }
    }
}

/// One simulated sufferer: profile, private attack pool, and the realized
/// attacks of the simulated year.
#[derive(Debug, Clone)]
pub struct Patient {
    pub is_chronic: bool,
    pub is_treated: bool,
    pub profile: Profile,
    pub attacks: Vec<Attack>,
    pool: AttackPool,
}

impl Patient {
    /// Draws the profile and pre-generates the attack pool; construction
    /// performs calibrated sampling, there is no separate build step.
    pub fn new<R: Rng>(
        is_chronic: bool,
        is_treated: bool,
        params: &CalibrationParameters,
        rng: &mut R,
    ) -> ChResult<Self> {
        let profile = if is_chronic {
            Profile::Chronic { active_days: generator::sample_chronic_active_days(rng)? }
        } else {
            let annual_bouts = params.bout_frequency.sample(rng);
            let bout_durations = generator::sample_bout_durations(params, annual_bouts, rng)?;
            Profile::Episodic { annual_bouts, bout_durations }
        };

        let pool_size = profile.attack_days() as usize * POOL_ATTACKS_PER_DAY as usize;
        let pool = AttackPool::new(pool_size, is_chronic, is_treated, rng)?;

        Ok(Self { is_chronic, is_treated, profile, attacks: Vec::new(), pool })
    }

    /// Simulates one year of attacks, replacing any previous realization.
    /// Returns the total attack count.
    pub fn generate_year_of_attacks<R: Rng>(
        &mut self,
        params: &CalibrationParameters,
        max_daily_attacks: f64,
        rng: &mut R,
    ) -> ChResult<usize> {
        self.attacks.clear();

        let days = self.profile.attack_days();
        let mut total = 0;
        for _ in 0..days {
            total += self.generate_day_attacks(params, max_daily_attacks, rng)?;
        }
        Ok(total)
    }

    fn generate_day_attacks<R: Rng>(
        &mut self,
        params: &CalibrationParameters,
        max_daily_attacks: f64,
        rng: &mut R,
    ) -> ChResult<usize> {
        let attacks_today = generator::sample_attacks_per_day(
            params,
            self.is_chronic,
            self.is_treated,
            max_daily_attacks,
            rng,
        )?;

        for _ in 0..attacks_today {
            let attack = self.pool.next(rng)?;
            self.attacks.push(attack);
        }
        Ok(attacks_today as usize)
    }

    /// Minutes spent at peak intensity, bucketed by intensity. Bucket index
    /// is `round(intensity * 10)`, covering 0.0 to 10.0 in 0.1 steps.
    pub fn intensity_minutes(&self) -> [u64; NUM_INTENSITY_BUCKETS] {
        let mut buckets = [0u64; NUM_INTENSITY_BUCKETS];
        for attack in &self.attacks {
            let index =
                ((attack.max_intensity * 10.0).round() as usize).min(NUM_INTENSITY_BUCKETS - 1);
            buckets[index] += attack.max_intensity_duration as u64;
        }
        buckets
    }
}
