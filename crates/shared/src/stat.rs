use serde::{Deserialize, Serialize};

/// Which way a perk leans, used by the perk-selection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Offense,
    Defense,
}

/// Player stats a simple perk can modify. Anything not listed parses to
/// `Unknown` and is ignored when applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatKind {
    Damage,
    AttackSpeed,
    MoveSpeed,
    MaxHp,
    Regen,
    Armor,
    Projectiles,
    Pierce,
    CritChance,
    CritMultiplier,
    Unknown(String),
}

impl StatKind {
    pub fn name(&self) -> &str {
        match self {
            StatKind::Damage => "damage",
            StatKind::AttackSpeed => "attack_speed",
            StatKind::MoveSpeed => "move_speed",
            StatKind::MaxHp => "max_hp",
            StatKind::Regen => "regen",
            StatKind::Armor => "armor",
            StatKind::Projectiles => "projectiles",
            StatKind::Pierce => "pierce",
            StatKind::CritChance => "crit_chance",
            StatKind::CritMultiplier => "crit_multiplier",
            StatKind::Unknown(name) => name,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            StatKind::MaxHp | StatKind::Regen | StatKind::Armor | StatKind::MoveSpeed => {
                Some(Category::Defense)
            }
            StatKind::Damage
            | StatKind::AttackSpeed
            | StatKind::Projectiles
            | StatKind::Pierce
            | StatKind::CritChance
            | StatKind::CritMultiplier => Some(Category::Offense),
            StatKind::Unknown(_) => None,
        }
    }
}

impl From<String> for StatKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "damage" => StatKind::Damage,
            "attack_speed" => StatKind::AttackSpeed,
            "move_speed" | "speed" => StatKind::MoveSpeed,
            "max_hp" => StatKind::MaxHp,
            "regen" | "hp_regen" => StatKind::Regen,
            "armor" => StatKind::Armor,
            "projectiles" | "extra_projectiles" => StatKind::Projectiles,
            "pierce" => StatKind::Pierce,
            "crit_chance" => StatKind::CritChance,
            "crit_multiplier" | "crit_damage" => StatKind::CritMultiplier,
            _ => StatKind::Unknown(name),
        }
    }
}

impl From<StatKind> for String {
    fn from(kind: StatKind) -> Self {
        kind.name().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierMode {
    Additive,
    Multiplicative,
}

/// Effects that do not map onto a single stat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComplexKind {
    Vampirism,
    Thorns,
    Execution,
    Dodge,
    Ignite,
    Ricochet,
    KillSpeed,
    SecondWind,
    Unknown(String),
}

impl ComplexKind {
    pub fn name(&self) -> &str {
        match self {
            ComplexKind::Vampirism => "vampirism",
            ComplexKind::Thorns => "thorns",
            ComplexKind::Execution => "execution",
            ComplexKind::Dodge => "dodge",
            ComplexKind::Ignite => "ignite",
            ComplexKind::Ricochet => "ricochet",
            ComplexKind::KillSpeed => "kill_speed",
            ComplexKind::SecondWind => "second_wind",
            ComplexKind::Unknown(name) => name,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            ComplexKind::Vampirism
            | ComplexKind::Thorns
            | ComplexKind::Dodge
            | ComplexKind::SecondWind => Some(Category::Defense),
            ComplexKind::Execution
            | ComplexKind::Ignite
            | ComplexKind::Ricochet
            | ComplexKind::KillSpeed => Some(Category::Offense),
            ComplexKind::Unknown(_) => None,
        }
    }
}

impl From<String> for ComplexKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "vampirism" | "lifesteal" => ComplexKind::Vampirism,
            "thorns" => ComplexKind::Thorns,
            "execution" | "execute" => ComplexKind::Execution,
            "dodge" => ComplexKind::Dodge,
            "ignite" => ComplexKind::Ignite,
            "ricochet" => ComplexKind::Ricochet,
            "kill_speed" => ComplexKind::KillSpeed,
            "second_wind" => ComplexKind::SecondWind,
            _ => ComplexKind::Unknown(name),
        }
    }
}

impl From<ComplexKind> for String {
    fn from(kind: ComplexKind) -> Self {
        kind.name().to_string()
    }
}

fn zero() -> f64 {
    0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerkEffect {
    Stat {
        stat: StatKind,
        mode: ModifierMode,
        value: f64,
    },
    /// `value` is the primary magnitude (a fraction for chances and
    /// percentages). `secondary` carries ignite damage or the kill-speed buff
    /// duration, `cap` the kill-speed stack limit.
    Complex {
        action: ComplexKind,
        value: f64,
        #[serde(default = "zero")]
        secondary: f64,
        #[serde(default = "zero")]
        cap: f64,
    },
}

impl PerkEffect {
    pub fn category(&self) -> Option<Category> {
        match self {
            PerkEffect::Stat { stat, .. } => stat.category(),
            PerkEffect::Complex { action, .. } => action.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stat_is_kept_by_name() {
        let kind: StatKind = serde_json::from_str("\"luck\"").unwrap();
        assert_eq!(kind, StatKind::Unknown("luck".to_string()));
        assert_eq!(kind.category(), None);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"luck\"");
    }

    #[test]
    fn test_effect_parsing() {
        let text = r#"[
            { "type": "stat", "stat": "armor", "mode": "additive", "value": 5 },
            { "type": "complex", "action": "ignite", "value": 0.2, "secondary": 8 }
        ]"#;
        let effects: Vec<PerkEffect> = serde_json::from_str(text).unwrap();
        assert_eq!(effects[0].category(), Some(Category::Defense));
        assert_eq!(
            effects[1],
            PerkEffect::Complex {
                action: ComplexKind::Ignite,
                value: 0.2,
                secondary: 8.0,
                cap: 0.0
            }
        );
        assert_eq!(effects[1].category(), Some(Category::Offense));
    }
}
