//! quest-engine
//!
//! The quest event dispatch and condition-evaluation engine of a multiplayer
//! action-game backend. Gameplay events (kills, bomb plants, hostage escapes,
//! logins, level-ups, per-minute ticks, match ends) arrive from concurrently
//! running matches, are fanned out engine → quest → task → condition, and
//! turn into persistent progress, progress notices, and reward grants.
//!
//! Transport, catalogs, persistence I/O and reward granting are external
//! collaborators; the engine owns the authoritative in-memory progress for
//! the lifetime of a process and hands effects off on channels that never
//! block a match context.

pub mod quest;

pub use quest::{
    ConditionDef, ConditionKind, EngineOutput, EventKind, KillEvent, KillFilter, MatchFilter,
    MatchState, Notification, PlayerSnapshot, QuestDef, QuestEngine, QuestRegistry, RewardGrant,
    TaskDef, TaskNotice, TaskProgress, Team, UserId, VictimKind, VictimTeamRule,
};
