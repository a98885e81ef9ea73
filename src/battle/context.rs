use serde::{Deserialize, Serialize};

use super::party::PartyResources;
use super::unit::BattleUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Team {
    Player,
    Enemy,
}

/// Stable reference to a unit within the session context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitId {
    pub team: Team,
    pub index: usize,
}

impl UnitId {
    pub fn player(index: usize) -> Self {
        Self {
            team: Team::Player,
            index,
        }
    }

    pub fn enemy(index: usize) -> Self {
        Self {
            team: Team::Enemy,
            index,
        }
    }
}

/// Owned state for one battle: the two rosters plus shared party
/// resources. Built at battle start from the caller's roster selection and
/// torn down with the orchestrator; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct GameSessionContext {
    pub players: Vec<BattleUnit>,
    pub enemies: Vec<BattleUnit>,
    pub resources: PartyResources,
}

impl GameSessionContext {
    pub fn new(
        mut players: Vec<BattleUnit>,
        mut enemies: Vec<BattleUnit>,
        resources: PartyResources,
    ) -> Self {
        for unit in &mut players {
            unit.player_team = true;
        }
        for unit in &mut enemies {
            unit.player_team = false;
        }
        Self {
            players,
            enemies,
            resources,
        }
    }

    pub fn roster(&self, team: Team) -> &[BattleUnit] {
        match team {
            Team::Player => &self.players,
            Team::Enemy => &self.enemies,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.roster(id.team).get(id.index)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        match id.team {
            Team::Player => self.players.get_mut(id.index),
            Team::Enemy => self.enemies.get_mut(id.index),
        }
    }

    pub fn first_living_player(&self) -> Option<usize> {
        self.players.iter().position(|u| !u.is_dead())
    }

    pub fn all_players_dead(&self) -> bool {
        self.players.iter().all(|u| u.is_dead())
    }

    pub fn all_enemies_dead(&self) -> bool {
        self.enemies.iter().all(|u| u.is_dead())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> GameSessionContext {
        GameSessionContext::new(
            vec![
                BattleUnit::new("Aria", false, 100.0, 80.0, 40.0, 30),
                BattleUnit::new("Belle", true, 100.0, 70.0, 35.0, 25),
            ],
            vec![BattleUnit::new("Grinner", true, 50.0, 30.0, 10.0, 0)],
            PartyResources::new(200.0, 50),
        )
    }

    #[test]
    fn constructor_normalizes_team_flags() {
        let context = context();
        assert!(context.players.iter().all(|u| u.player_team));
        assert!(context.enemies.iter().all(|u| !u.player_team));
    }

    #[test]
    fn unit_lookup_crosses_teams() {
        let context = context();
        assert_eq!(context.unit(UnitId::player(1)).unwrap().name, "Belle");
        assert_eq!(context.unit(UnitId::enemy(0)).unwrap().name, "Grinner");
        assert!(context.unit(UnitId::enemy(3)).is_none());
    }

    #[test]
    fn first_living_player_skips_the_dead() {
        let mut context = context();
        context.players[0].take_damage(1000.0);
        assert_eq!(context.first_living_player(), Some(1));
        context.players[1].take_damage(1000.0);
        assert_eq!(context.first_living_player(), None);
        assert!(context.all_players_dead());
    }
}
