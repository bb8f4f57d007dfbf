use nightfall_shared::config::{CycleDurations, Phase};

// Guards a zero-length cycle from content files
const MIN_CYCLE_LENGTH: f64 = 1.0;

/// Day/night clock. Phase and night index are recomputed from absolute
/// simulated time on every query, so they never drift with tick size.
#[derive(Debug, Clone, Copy)]
pub struct PhaseClock {
    cycle: CycleDurations,
}

impl PhaseClock {
    pub fn new(cycle: CycleDurations) -> Self {
        Self { cycle }
    }

    #[inline]
    pub fn cycle_length(&self) -> f64 {
        self.cycle.total().max(MIN_CYCLE_LENGTH)
    }

    pub fn phase_at(&self, sim_time: f64) -> Phase {
        let pos = sim_time.rem_euclid(self.cycle_length());
        let dusk_start = self.cycle.day;
        let night_start = dusk_start + self.cycle.dusk;
        let dawn_start = night_start + self.cycle.night;
        if pos < dusk_start {
            Phase::Day
        } else if pos < night_start {
            Phase::Dusk
        } else if pos < dawn_start {
            Phase::Night
        } else {
            Phase::Dawn
        }
    }

    /// 1-based index of the cycle containing `sim_time`.
    pub fn night_index(&self, sim_time: f64) -> u32 {
        (sim_time.max(0.0) / self.cycle_length()).floor() as u32 + 1
    }
}
