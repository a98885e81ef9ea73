pub mod context;
pub mod damage;
pub mod orchestrator;
pub mod party;
pub mod prompt;
pub mod unit;

pub use context::{GameSessionContext, Team, UnitId};
pub use orchestrator::{
    BattleConfig, BattleError, BattleOutcome, BattleUi, CancelPolicy, CancelToken, Command,
    EnemyDamageTarget, FrameSource, TargetPicker, TurnOrchestrator,
};
pub use party::PartyResources;
pub use prompt::{Prompt, Responder, prompt};
pub use unit::BattleUnit;
