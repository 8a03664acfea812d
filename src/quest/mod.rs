//! Quest Event Engine
//!
//! Server-side quest/achievement engine: matches raw gameplay events against
//! quest definitions, accumulates per-user progress across two layers
//! (persistent and per-match), and emits rewards when goals latch.

pub mod condition;
pub mod definition;
pub mod engine;
pub mod events;
pub mod progress;
pub mod registry;

pub use condition::{ConditionDef, ConditionKind, KillFilter, MatchFilter, VictimKind, VictimTeamRule};
pub use definition::{QuestDef, TaskDef, TaskNotice};
pub use engine::{EngineOutput, QuestEngine};
pub use events::{
    EventKind, KillEvent, MatchState, Notification, PlayerSnapshot, RewardGrant, Team, UserId,
};
pub use progress::{
    IncrementOutcome, MatchKey, MatchProgressStore, ProgressKey, ProgressStore, TaskProgress,
};
pub use registry::QuestRegistry;
