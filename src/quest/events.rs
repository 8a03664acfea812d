//! Quest Event Types
//!
//! Raw gameplay event payloads fed into the engine, the read-only match
//! snapshots they arrive with, and the outbound payloads the engine emits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric user identity. 0 is reserved for bots in kill events.
pub type UserId = u32;

/// Gameplay event categories a condition can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Kill,
    LevelUp,
    BombExplode,
    BombDefuse,
    HostageEscape,
    MonsterKill,
    MosquitoKill,
    KiteKill,
    Win,
    TimeTick,
    Login,
    VipKill,
}

impl EventKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kill" => Some(EventKind::Kill),
            "level_up" | "levelup" => Some(EventKind::LevelUp),
            "bomb_explode" => Some(EventKind::BombExplode),
            "bomb_defuse" => Some(EventKind::BombDefuse),
            "hostage_escape" => Some(EventKind::HostageEscape),
            "monster_kill" => Some(EventKind::MonsterKill),
            "mosquito_kill" => Some(EventKind::MosquitoKill),
            "kite_kill" => Some(EventKind::KiteKill),
            "win" => Some(EventKind::Win),
            "time_tick" | "minute_tick" => Some(EventKind::TimeTick),
            "login" => Some(EventKind::Login),
            "vip_kill" => Some(EventKind::VipKill),
            _ => None,
        }
    }

    /// Get event kind as string (for logging/debugging)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Kill => "kill",
            EventKind::LevelUp => "level_up",
            EventKind::BombExplode => "bomb_explode",
            EventKind::BombDefuse => "bomb_defuse",
            EventKind::HostageEscape => "hostage_escape",
            EventKind::MonsterKill => "monster_kill",
            EventKind::MosquitoKill => "mosquito_kill",
            EventKind::KiteKill => "kite_kill",
            EventKind::Win => "win",
            EventKind::TimeTick => "time_tick",
            EventKind::Login => "login",
            EventKind::VipKill => "vip_kill",
        }
    }
}

/// Match team assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Terrorist,
    CounterTerrorist,
}

impl Team {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "terrorist" | "tr" => Some(Team::Terrorist),
            "counter_terrorist" | "ct" => Some(Team::CounterTerrorist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Terrorist => "terrorist",
            Team::CounterTerrorist => "counter_terrorist",
        }
    }
}

/// A single kill as reported by the match simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillEvent {
    pub killer_team: Team,
    pub victim_team: Team,
    /// Kill classification (headshot, knife, ...) as a raw id
    pub victim_kill_type: i32,
    pub weapon_id: i32,
    /// 0 when the victim was a bot
    pub victim_user_id: UserId,
}

/// Read-only snapshot of a running match, supplied with every match-scoped
/// event. The engine never mutates match state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    /// Scopes ephemeral progress; distinct from any user identity
    pub match_id: Uuid,
    pub game_mode: i32,
    pub map_id: i32,
    /// Current roster size
    pub player_count: u32,
    pub ter_wins: u32,
    pub ct_wins: u32,
}

/// Read-only snapshot of the acting player at the moment of the event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub user_id: UserId,
    /// Map id of the room the player currently occupies, None while between
    /// rooms. Map-restricted conditions fail closed when this is None.
    pub current_map: Option<i32>,
    /// Weapon ids currently in the player's match loadout
    pub loadout: Vec<i32>,
}

impl PlayerSnapshot {
    pub fn owns_weapon(&self, weapon_id: i32) -> bool {
        self.loadout.contains(&weapon_id)
    }
}

/// Progress notice handed to the presentation collaborator. The template is
/// resolved client-side; args are always `[running total, task goal]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub template: String,
    pub args: [i32; 2],
}

/// Emitted exactly once per task per user, at the moment the task's
/// persistent finished flag latches. Granting is an external effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
    pub user_id: UserId,
    pub quest_id: i32,
    pub task_id: i32,
    pub reward_id: i32,
}
