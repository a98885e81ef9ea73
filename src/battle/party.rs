use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Shared party-wide pools: a health reserve (used by the shared-pool
/// damage policy) and the regenerating chorus currency that pays for
/// enhanced actions. Mutated only by the turn orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyResources {
    pub hp: f64,
    pub max_hp: f64,
    pub chorus: u32,
    pub max_chorus: u32,
}

impl PartyResources {
    pub fn new(max_hp: f64, max_chorus: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            chorus: max_chorus,
            max_chorus,
        }
    }

    pub fn depleted(&self) -> bool {
        self.hp <= 0.0
    }

    /// Debit chorus for an enhanced action. Returns false (and leaves the
    /// balance untouched) when the party cannot afford it.
    pub fn spend_chorus(&mut self, cost: u32) -> bool {
        if self.chorus < cost {
            debug!(cost, balance = self.chorus, "chorus spend refused");
            return false;
        }
        self.chorus -= cost;
        info!(cost, balance = self.chorus, "chorus spent");
        true
    }

    /// Credit chorus, clamped to the party maximum.
    pub fn gain_chorus(&mut self, amount: u32) {
        self.chorus = (self.chorus + amount).min(self.max_chorus);
        debug!(amount, balance = self.chorus, "chorus gained");
    }

    /// Damage the shared health pool. Returns true when the pool empties.
    pub fn damage_shared(&mut self, amount: f64) -> bool {
        if self.depleted() {
            return false;
        }
        self.hp = (self.hp - amount).max(0.0);
        info!(damage = amount, hp = self.hp, "party pool hit");
        self.depleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_requires_balance() {
        let mut resources = PartyResources::new(100.0, 50);
        assert!(resources.spend_chorus(30));
        assert_eq!(resources.chorus, 20);
        assert!(!resources.spend_chorus(30));
        assert_eq!(resources.chorus, 20);
    }

    #[test]
    fn gain_clamps_to_max() {
        let mut resources = PartyResources::new(100.0, 50);
        resources.spend_chorus(10);
        resources.gain_chorus(15);
        assert_eq!(resources.chorus, 50);
        resources.gain_chorus(100);
        assert_eq!(resources.chorus, 50);
    }

    #[test]
    fn shared_pool_reports_depletion_once() {
        let mut resources = PartyResources::new(40.0, 50);
        assert!(!resources.damage_shared(30.0));
        assert!(resources.damage_shared(30.0));
        assert_eq!(resources.hp, 0.0);
        assert!(!resources.damage_shared(5.0));
    }
}
