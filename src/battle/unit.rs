use serde::{Deserialize, Serialize};
use tracing::info;

/// One combatant. HP changes only through [`BattleUnit::take_damage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleUnit {
    pub name: String,
    pub player_team: bool,
    pub max_hp: f64,
    pub hp: f64,
    pub attack_power: f64,
    pub defense_power: f64,
    /// Chorus spent to enhance this unit's action.
    pub chorus_cost: u32,
}

impl BattleUnit {
    pub fn new(
        name: &str,
        player_team: bool,
        max_hp: f64,
        attack_power: f64,
        defense_power: f64,
        chorus_cost: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            player_team,
            max_hp,
            hp: max_hp,
            attack_power,
            defense_power,
            chorus_cost,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Apply damage. Hits on an already-dead unit are ignored, so the
    /// death signal (the `true` return) fires exactly once.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        if self.is_dead() {
            return false;
        }
        self.hp -= amount;
        info!(unit = %self.name, damage = amount, hp = self.hp, "hit");
        if self.hp <= 0.0 {
            self.hp = 0.0;
            info!(unit = %self.name, "down");
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_reduces_hp() {
        let mut unit = BattleUnit::new("Aria", true, 100.0, 80.0, 40.0, 30);
        assert!(!unit.take_damage(30.0));
        assert_eq!(unit.hp, 70.0);
        assert!(!unit.is_dead());
    }

    #[test]
    fn death_signal_fires_exactly_once() {
        let mut unit = BattleUnit::new("Aria", true, 50.0, 80.0, 40.0, 30);
        assert!(unit.take_damage(60.0));
        assert_eq!(unit.hp, 0.0);
        assert!(unit.is_dead());

        // Overkill on a corpse is a no-op.
        assert!(!unit.take_damage(10.0));
        assert_eq!(unit.hp, 0.0);
    }

    #[test]
    fn exact_lethal_damage_kills() {
        let mut unit = BattleUnit::new("Aria", true, 50.0, 80.0, 40.0, 30);
        assert!(unit.take_damage(50.0));
        assert!(unit.is_dead());
    }
}
