use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::chart::{Chart, ChartError, ChartSource};
use crate::session::{Judgment, MinigameSession, SessionError, SessionResult};

use super::context::{GameSessionContext, Team, UnitId};
use super::damage;
use super::unit::BattleUnit;

/// Player command for one unit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Attack,
    /// Chorus-enhanced attack; silently downgraded to `Attack` when the
    /// party cannot afford the unit's cost.
    Skill,
    /// Skip this unit's action.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Victory,
    Defeat,
    /// The battle loop was torn down by cancellation (only under
    /// `CancelPolicy::EndBattle`).
    Abandoned,
}

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("action cancelled")]
    Cancelled,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Where enemy attack damage lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EnemyDamageTarget {
    /// The defending unit's own HP.
    #[default]
    DefendingUnit,
    /// The shared party health pool.
    SharedPool,
}

/// How far a triggered cancellation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CancelPolicy {
    /// Abort only the in-flight unit action; the loop continues.
    #[default]
    SkipUnitAction,
    /// Tear down the whole battle loop.
    EndBattle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleConfig {
    /// Chart id for the single-lane attack minigame.
    pub attack_chart: String,
    /// Chart id for the multi-lane defense minigame.
    pub defense_chart: String,
    pub enemy_damage_target: EnemyDamageTarget,
    pub cancel_policy: CancelPolicy,
    /// Presentation pacing between unit actions.
    pub turn_delay_ms: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            attack_chart: "player_attack_01".to_string(),
            defense_chart: "enemy_attack_01".to_string(),
            enemy_damage_target: EnemyDamageTarget::default(),
            cancel_policy: CancelPolicy::default(),
            turn_delay_ms: 500,
        }
    }
}

/// Cooperative cancellation for the in-flight action. Triggering it is
/// observed at the next suspension point, never preemptively. A signal
/// raised while no action is in flight is discarded when the next action
/// starts.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Consume a pending signal, rearming the token for the next action.
    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// Presentation/UI collaborator. Only the command wait suspends; the rest
/// are fire-and-forget signals with no-op defaults.
#[allow(async_fn_in_trait)]
pub trait BattleUi {
    /// Suspends until the player picks a command for `unit`.
    async fn wait_for_command(&mut self, unit: &BattleUnit) -> Command;

    fn show_target_instruction(&mut self, _visible: bool) {}
    fn set_focus(&mut self, _unit: &BattleUnit, _focused: bool) {}
    /// Defense view shown while an enemy attack resolves, restored after.
    fn set_defense_view(&mut self, _active: bool) {}
    fn play_enhanced_splash(&mut self) {}
    fn unit_down(&mut self, _unit: &BattleUnit) {}
    fn judgment(&mut self, _judgment: &Judgment) {}
}

/// Click-to-unit resolver. Emits raw picks; the orchestrator filters them
/// to the living opposing party.
#[allow(async_fn_in_trait)]
pub trait TargetPicker {
    async fn wait_for_target(&mut self) -> UnitId;
}

/// Per-frame suspension inside a running session. Returns the lanes struck
/// since the previous frame.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn next_frame(&mut self) -> Vec<usize>;
}

/// Runs the battle loop: sequences player and enemy phases, invokes the
/// minigame session per action, applies the damage formulas, and manages
/// shared party resources. Collaborators are constructor-injected.
pub struct TurnOrchestrator<U, T, F, C>
where
    U: BattleUi,
    T: TargetPicker,
    F: FrameSource,
    C: ChartSource,
{
    context: GameSessionContext,
    session: MinigameSession,
    ui: U,
    targets: T,
    frames: F,
    charts: C,
    config: BattleConfig,
    cancel: CancelToken,
}

impl<U, T, F, C> TurnOrchestrator<U, T, F, C>
where
    U: BattleUi,
    T: TargetPicker,
    F: FrameSource,
    C: ChartSource,
{
    pub fn new(
        context: GameSessionContext,
        session: MinigameSession,
        ui: U,
        targets: T,
        frames: F,
        charts: C,
        config: BattleConfig,
    ) -> Self {
        Self {
            context,
            session,
            ui,
            targets,
            frames,
            charts,
            config,
            cancel: CancelToken::default(),
        }
    }

    /// Handle for aborting the in-flight action from outside the loop.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn context(&self) -> &GameSessionContext {
        &self.context
    }

    /// Tear down the battle and recover the roster state.
    pub fn into_context(self) -> GameSessionContext {
        self.context
    }

    pub async fn run(&mut self) -> BattleOutcome {
        info!("battle start");
        loop {
            if let Some(outcome) = self.check_end() {
                return outcome;
            }
            if let Some(outcome) = self.player_phase().await {
                return outcome;
            }
            if let Some(outcome) = self.check_end() {
                return outcome;
            }
            if let Some(outcome) = self.enemy_phase().await {
                return outcome;
            }
        }
    }

    /// End conditions are checked after every unit action, not just at
    /// phase boundaries.
    fn check_end(&self) -> Option<BattleOutcome> {
        let shared_pool = self.config.enemy_damage_target == EnemyDamageTarget::SharedPool;
        if self.context.all_players_dead() || (shared_pool && self.context.resources.depleted()) {
            info!("defeat: party wiped");
            return Some(BattleOutcome::Defeat);
        }
        if self.context.all_enemies_dead() {
            info!("victory: enemies wiped");
            return Some(BattleOutcome::Victory);
        }
        None
    }

    async fn player_phase(&mut self) -> Option<BattleOutcome> {
        debug!("player phase");
        for index in 0..self.context.players.len() {
            if self.context.players[index].is_dead() {
                continue;
            }
            match self.player_action(index).await {
                Ok(()) => {}
                Err(BattleError::Cancelled) => {
                    warn!(unit = %self.context.players[index].name, "action cancelled");
                    if self.config.cancel_policy == CancelPolicy::EndBattle {
                        return Some(BattleOutcome::Abandoned);
                    }
                }
                Err(err) => {
                    // A broken action skips the unit, never the battle.
                    error!(unit = %self.context.players[index].name, %err, "action failed");
                }
            }
            self.ui.set_focus(&self.context.players[index], false);
            sleep(Duration::from_millis(self.config.turn_delay_ms)).await;
            if let Some(outcome) = self.check_end() {
                return Some(outcome);
            }
        }
        None
    }

    async fn player_action(&mut self, index: usize) -> Result<(), BattleError> {
        // A signal fired between actions is stale; only this action's
        // suspension points may observe the token from here on.
        self.cancel.take();
        let unit = &self.context.players[index];
        info!(unit = %unit.name, "action start");
        self.ui.set_focus(unit, true);

        let mut command = self.ui.wait_for_command(unit).await;
        if self.cancel.take() {
            return Err(BattleError::Cancelled);
        }
        if command == Command::Cancel {
            info!(unit = %unit.name, "action skipped");
            return Ok(());
        }
        if command == Command::Skill && self.context.resources.chorus < unit.chorus_cost {
            info!(unit = %unit.name, "insufficient chorus, downgrading to attack");
            command = Command::Attack;
        }

        let target = self.wait_for_enemy_target().await?;

        let mut enhanced = false;
        if command == Command::Skill {
            let cost = self.context.players[index].chorus_cost;
            // Debit before the minigame runs; a whiffed session still paid.
            enhanced = self.context.resources.spend_chorus(cost);
            if enhanced {
                self.ui.play_enhanced_splash();
            }
        }

        let chart = self.charts.load(&self.config.attack_chart)?;
        let result = self.run_session(chart).await?;

        let attacker = &self.context.players[index];
        let defense = self
            .context
            .unit(target)
            .map(|u| u.defense_power)
            .unwrap_or(0.0);
        let amount =
            damage::player_attack(attacker.attack_power, enhanced, defense, result.total_accuracy);
        let died = self
            .context
            .unit_mut(target)
            .map(|u| u.take_damage(amount))
            .unwrap_or(false);
        if died {
            if let Some(unit) = self.context.unit(target) {
                self.ui.unit_down(unit);
            }
        }
        if !enhanced {
            self.context
                .resources
                .gain_chorus(damage::chorus_gain(result.total_accuracy));
        }
        Ok(())
    }

    /// Suspend on the target picker until a living enemy is clicked. Picks
    /// outside the opposing party are ignored and the wait continues.
    async fn wait_for_enemy_target(&mut self) -> Result<UnitId, BattleError> {
        self.ui.show_target_instruction(true);
        let picked = loop {
            let picked = self.targets.wait_for_target().await;
            if self.cancel.take() {
                self.ui.show_target_instruction(false);
                return Err(BattleError::Cancelled);
            }
            if picked.team == Team::Enemy
                && self.context.unit(picked).is_some_and(|u| !u.is_dead())
            {
                break picked;
            }
            debug!(?picked, "pick outside living opposing party ignored");
        };
        self.ui.show_target_instruction(false);
        Ok(picked)
    }

    async fn enemy_phase(&mut self) -> Option<BattleOutcome> {
        debug!("enemy phase");
        for index in 0..self.context.enemies.len() {
            if self.context.enemies[index].is_dead() {
                continue;
            }
            match self.enemy_action(index).await {
                Ok(()) => {}
                Err(BattleError::Cancelled) => {
                    warn!(unit = %self.context.enemies[index].name, "enemy action cancelled");
                    if self.config.cancel_policy == CancelPolicy::EndBattle {
                        return Some(BattleOutcome::Abandoned);
                    }
                }
                Err(err) => {
                    error!(unit = %self.context.enemies[index].name, %err, "enemy action failed");
                }
            }
            sleep(Duration::from_millis(self.config.turn_delay_ms)).await;
            if let Some(outcome) = self.check_end() {
                return Some(outcome);
            }
        }
        None
    }

    async fn enemy_action(&mut self, index: usize) -> Result<(), BattleError> {
        self.cancel.take();
        // Simple targeting: the first living ally defends.
        let Some(defender) = self.context.first_living_player() else {
            return Ok(());
        };
        info!(unit = %self.context.enemies[index].name, "enemy attack");

        self.ui.set_defense_view(true);
        let outcome = match self.charts.load(&self.config.defense_chart) {
            Ok(chart) => self.run_session(chart).await,
            Err(err) => Err(err.into()),
        };
        self.ui.set_defense_view(false);
        let result = outcome?;

        let attack_power = self.context.enemies[index].attack_power;
        let defense = self.context.players[defender].defense_power;
        let amount = damage::enemy_attack(attack_power, defense, result.total_accuracy);
        match self.config.enemy_damage_target {
            EnemyDamageTarget::DefendingUnit => {
                if self.context.players[defender].take_damage(amount) {
                    self.ui.unit_down(&self.context.players[defender]);
                }
            }
            EnemyDamageTarget::SharedPool => {
                self.context.resources.damage_shared(amount);
            }
        }
        Ok(())
    }

    /// Drive one minigame session to completion, suspending per frame.
    /// Cancellation aborts the session through its cleanup path and
    /// surfaces as `BattleError::Cancelled`.
    async fn run_session(&mut self, chart: Chart) -> Result<SessionResult, BattleError> {
        self.session.start(chart)?;
        loop {
            if self.cancel.take() {
                self.session.abort();
                return Err(BattleError::Cancelled);
            }
            let hits = self.frames.next_frame().await;
            let report = self.session.tick(&hits);
            for judgment in &report.judgments {
                self.ui.judgment(judgment);
            }
            if report.finished {
                return self
                    .session
                    .result()
                    .ok_or(BattleError::Session(SessionError::Cancelled));
            }
        }
    }
}
