use nightfall_shared::config::DEFAULT_PROFILE;

/// How well the simulated player plays: the share of incoming enemy damage
/// that lands, how that share grows once the screen fills up, and how much
/// of the theoretical DPS actually hits.
#[derive(Debug, Clone, PartialEq)]
pub struct AiProfile {
    pub name: &'static str,
    pub hit_factor: f64,
    pub crowd_threshold: u32,
    pub crowd_penalty: f64,
    pub uptime: f64,
}

pub const PROFILES: &[AiProfile] = &[
    AiProfile {
        name: "novice",
        hit_factor: 0.85,
        crowd_threshold: 10,
        crowd_penalty: 0.03,
        uptime: 0.7,
    },
    AiProfile {
        name: "average",
        hit_factor: 0.6,
        crowd_threshold: 20,
        crowd_penalty: 0.02,
        uptime: 0.85,
    },
    AiProfile {
        name: "expert",
        hit_factor: 0.35,
        crowd_threshold: 35,
        crowd_penalty: 0.015,
        uptime: 0.95,
    },
];

impl AiProfile {
    pub fn by_name(name: &str) -> Option<&'static AiProfile> {
        PROFILES.iter().find(|p| p.name == name)
    }

    /// Named profile, falling back to the default one.
    pub fn resolve(name: &str) -> &'static AiProfile {
        Self::by_name(name)
            .or_else(|| Self::by_name(DEFAULT_PROFILE))
            .unwrap_or(&PROFILES[0])
    }

    /// Share of enemy DPS that reaches the player with `active_enemies` in range.
    pub fn skill_factor(&self, active_enemies: u32) -> f64 {
        let crowd = active_enemies.saturating_sub(self.crowd_threshold) as f64;
        (self.hit_factor * (1.0 + crowd * self.crowd_penalty)).min(1.0)
    }
}
