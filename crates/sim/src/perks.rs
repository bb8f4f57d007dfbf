use nightfall_shared::config::PerkStrategyKind;
use nightfall_shared::content::PerkDef;
use nightfall_shared::stat::Category;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::player::SimPlayer;

pub const OFFER_SIZE: usize = 3;

const FOCUS_WEIGHT: f64 = 2.0;
const OFF_FOCUS_WEIGHT: f64 = 0.25;
const LOW_HP_RATIO: f64 = 0.5;
const LOW_HP_BOOST: f64 = 2.0;
const CATEGORY_MATCH_BONUS: f64 = 1.5;

/// Draws up to `OFFER_SIZE` distinct perks, weighted by offer weight, from
/// every enabled, character-compatible perk the player has not maxed out.
pub fn draw_offer<'a>(
    perks: &'a [PerkDef],
    player: &SimPlayer,
    character_id: &str,
    rng: &mut impl Rng,
) -> Vec<&'a PerkDef> {
    let mut pool: Vec<&PerkDef> = perks
        .iter()
        .filter(|p| p.enabled && p.allows_character(character_id))
        .filter(|p| player.perk_stacks(&p.id) < p.max_stacks)
        .filter(|p| p.offer_weight() > 0.0)
        .collect();

    let mut offer = Vec::with_capacity(OFFER_SIZE);
    while offer.len() < OFFER_SIZE && !pool.is_empty() {
        let Ok(dist) = WeightedIndex::new(pool.iter().map(|p| p.offer_weight())) else {
            break;
        };
        offer.push(pool.remove(dist.sample(rng)));
    }
    offer
}

/// Score of `perk` under `strategy`; higher is better.
pub fn score(strategy: PerkStrategyKind, perk: &PerkDef, hp_ratio: f64) -> f64 {
    let offense = perk.count_category(Category::Offense) as f64;
    let defense = perk.count_category(Category::Defense) as f64;
    let raw = match strategy {
        PerkStrategyKind::Random => 1.0,
        PerkStrategyKind::Survival => {
            let boost = if hp_ratio < LOW_HP_RATIO { LOW_HP_BOOST } else { 1.0 };
            1.0 + FOCUS_WEIGHT * defense * boost + OFF_FOCUS_WEIGHT * offense
        }
        PerkStrategyKind::Damage => 1.0 + FOCUS_WEIGHT * offense + OFF_FOCUS_WEIGHT * defense,
        PerkStrategyKind::Balanced => {
            let bonus = if offense + defense > 0.0 {
                CATEGORY_MATCH_BONUS
            } else {
                1.0
            };
            perk.offer_weight() * bonus
        }
    };
    raw * perk.rarity.score_multiplier()
}

/// Index into `offer` of the chosen perk. `Random` picks uniformly, every
/// other policy takes the highest score, first one winning ties.
pub fn choose(
    strategy: PerkStrategyKind,
    offer: &[&PerkDef],
    hp_ratio: f64,
    rng: &mut impl Rng,
) -> Option<usize> {
    if offer.is_empty() {
        return None;
    }
    if strategy == PerkStrategyKind::Random {
        return Some(rng.gen_range(0..offer.len()));
    }
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, perk) in offer.iter().enumerate() {
        let s = score(strategy, perk, hp_ratio);
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_shared::content::{CharacterDef, ContentTables, Rarity, WeaponDef};
    use nightfall_shared::stat::{ComplexKind, ModifierMode, PerkEffect, StatKind};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn perk(id: &str, rarity: Rarity, effects: Vec<PerkEffect>) -> PerkDef {
        PerkDef {
            id: id.to_string(),
            rarity,
            weight: None,
            max_stacks: 1,
            characters: Vec::new(),
            enabled: true,
            effects,
        }
    }

    fn stat(stat: StatKind) -> PerkEffect {
        PerkEffect::Stat {
            stat,
            mode: ModifierMode::Additive,
            value: 1.0,
        }
    }

    fn player() -> SimPlayer {
        SimPlayer::new(&CharacterDef::default(), &WeaponDef::default())
    }

    #[test]
    fn test_offer_is_distinct_and_eligible() {
        let tables = ContentTables::builtin().unwrap();
        let p = player();
        let mut rng = Pcg64::seed_from_u64(11);
        for _ in 0..200 {
            let offer = draw_offer(&tables.perks, &p, "traqueur", &mut rng);
            assert_eq!(offer.len(), OFFER_SIZE);
            assert!(offer.iter().all(|perk| perk.id != "shadow_step"));
            for (i, a) in offer.iter().enumerate() {
                assert!(offer[i + 1..].iter().all(|b| b.id != a.id));
            }
        }
    }

    #[test]
    fn test_offer_skips_maxed_and_disabled() {
        let mut maxed = perk("maxed", Rarity::Common, vec![stat(StatKind::Armor)]);
        maxed.max_stacks = 1;
        let mut disabled = perk("disabled", Rarity::Common, vec![stat(StatKind::Armor)]);
        disabled.enabled = false;
        let open = perk("open", Rarity::Common, vec![stat(StatKind::Damage)]);
        let perks = vec![maxed.clone(), disabled, open];
        let mut p = player();
        p.apply_perk(&maxed);
        let mut rng = Pcg64::seed_from_u64(1);
        let offer = draw_offer(&perks, &p, "traqueur", &mut rng);
        assert_eq!(offer.len(), 1);
        assert_eq!(offer[0].id, "open");
    }

    #[test]
    fn test_survival_prefers_defense_damage_prefers_offense() {
        let armor = perk("armor", Rarity::Common, vec![stat(StatKind::Armor)]);
        let dmg = perk("dmg", Rarity::Common, vec![stat(StatKind::Damage)]);
        let offer = vec![&dmg, &armor];
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(choose(PerkStrategyKind::Survival, &offer, 1.0, &mut rng), Some(1));
        assert_eq!(choose(PerkStrategyKind::Damage, &offer, 1.0, &mut rng), Some(0));
    }

    #[test]
    fn test_low_hp_doubles_survival_focus() {
        let armor = perk("armor", Rarity::Common, vec![stat(StatKind::Armor)]);
        let healthy = score(PerkStrategyKind::Survival, &armor, 0.9);
        let hurt = score(PerkStrategyKind::Survival, &armor, 0.3);
        assert_eq!(healthy, 3.0);
        assert_eq!(hurt, 5.0);
    }

    #[test]
    fn test_rarity_multiplies_score() {
        let common = perk("c", Rarity::Common, vec![stat(StatKind::Damage)]);
        let rare = perk("r", Rarity::Rare, vec![stat(StatKind::Damage)]);
        let uncommon = perk(
            "u",
            Rarity::Uncommon,
            vec![PerkEffect::Complex {
                action: ComplexKind::Ignite,
                value: 0.1,
                secondary: 5.0,
                cap: 0.0,
            }],
        );
        assert_eq!(score(PerkStrategyKind::Damage, &common, 1.0), 3.0);
        assert_eq!(score(PerkStrategyKind::Damage, &rare, 1.0), 4.5);
        assert!((score(PerkStrategyKind::Damage, &uncommon, 1.0) - 3.6).abs() < 1e-12);
        // balanced: weight 10 * 1.5 match vs weight 2 * 1.5 * 1.5 rarity
        assert_eq!(score(PerkStrategyKind::Balanced, &common, 1.0), 15.0);
        assert_eq!(score(PerkStrategyKind::Balanced, &rare, 1.0), 4.5);
    }

    #[test]
    fn test_ties_go_to_first() {
        let a = perk("a", Rarity::Common, vec![stat(StatKind::Damage)]);
        let b = perk("b", Rarity::Common, vec![stat(StatKind::Damage)]);
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(choose(PerkStrategyKind::Damage, &[&a, &b], 1.0, &mut rng), Some(0));
        assert_eq!(choose(PerkStrategyKind::Balanced, &[], 1.0, &mut rng), None);
    }
}
