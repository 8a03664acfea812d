//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files and resolved into
//! the immutable in-memory quest tree (quest → tasks → conditions). A
//! malformed definition aborts the load of that quest as a whole; a partially
//! loaded quest would produce misleading completion states.

use serde::Deserialize;

use super::condition::{ConditionDef, ConditionKind, KillFilter, MatchFilter, VictimKind, VictimTeamRule};
use super::events::{EventKind, Team};

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: i32,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

/// Raw task data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub id: i32,
    pub goal: i32,
    /// Reward granted on completion (resolved by the reward collaborator)
    pub reward_id: i32,
    /// Interval at which a progress notice is sent; 0 = never
    #[serde(default)]
    pub notice_goal: i32,
    /// Template id resolved by the presentation layer
    #[serde(default)]
    pub notice_template: Option<String>,
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
}

fn default_goal_points() -> i32 {
    1
}

/// Raw condition data as it appears in TOML. Filter fields not relevant to
/// the event kind are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    pub id: i32,
    #[serde(rename = "event")]
    pub event_kind: String,
    /// How much one satisfying event is worth
    #[serde(default = "default_goal_points")]
    pub goal_points: i32,

    // Match-scoped filters; empty = wildcard, 0 = no minimum
    #[serde(default)]
    pub game_modes: Vec<i32>,
    #[serde(default)]
    pub maps: Vec<i32>,
    #[serde(default)]
    pub min_players: u32,

    // Kill filters
    /// "terrorist" / "counter_terrorist"; absent or "any" = any team
    #[serde(default)]
    pub killer_team: Option<String>,
    /// "terrorist" / "counter_terrorist"; absent or "any" = any team,
    /// but the kill must still be cross-team
    #[serde(default)]
    pub victim_team: Option<String>,
    /// Absent = any kill classification
    #[serde(default)]
    pub victim_kill_type: Option<i32>,
    /// Consecutive qualifying kills required before credit; 0 = none
    #[serde(default)]
    pub continuous: u32,
    /// Absent = any weapon
    #[serde(default)]
    pub weapon_id: Option<i32>,
    /// Killer must currently own the (exact) weapon
    #[serde(default)]
    pub require_owned_weapon: bool,
    /// "human" / "bot"; absent or "any" = either
    #[serde(default)]
    pub victim_kind: Option<String>,

    // Monster-kill filter
    #[serde(default)]
    pub monster_kind: Option<i32>,
}

// ============================================================================
// Resolved Structures (after validation)
// ============================================================================

/// Notice configuration for a task
#[derive(Debug, Clone)]
pub struct TaskNotice {
    /// A notice fires whenever the running ephemeral total is a multiple
    /// of this interval
    pub every: i32,
    pub template: String,
}

/// A single countable objective with a goal and a reward
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub id: i32,
    pub goal: i32,
    pub reward_id: i32,
    pub notice: Option<TaskNotice>,
    pub conditions: Vec<ConditionDef>,
}

impl TaskDef {
    pub fn from_raw(raw: &RawTask) -> Result<Self, String> {
        if raw.goal <= 0 {
            return Err(format!("Task {} has non-positive goal {}", raw.id, raw.goal));
        }
        if raw.notice_goal < 0 {
            return Err(format!("Task {} has negative notice_goal", raw.id));
        }
        if raw.conditions.is_empty() {
            return Err(format!("Task {} has no conditions", raw.id));
        }

        let notice = if raw.notice_goal > 0 {
            let template = raw
                .notice_template
                .clone()
                .ok_or_else(|| format!("Task {} sets notice_goal without notice_template", raw.id))?;
            Some(TaskNotice { every: raw.notice_goal, template })
        } else {
            None
        };

        let conditions = raw
            .conditions
            .iter()
            .map(|c| {
                ConditionDef::from_raw(c)
                    .map_err(|e| format!("Task {}, condition {}: {}", raw.id, c.id, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: raw.id,
            goal: raw.goal,
            reward_id: raw.reward_id,
            notice,
            conditions,
        })
    }
}

/// A fully resolved quest definition. Immutable after load and freely shared
/// across concurrent match contexts.
#[derive(Debug, Clone)]
pub struct QuestDef {
    pub id: i32,
    pub tasks: Vec<TaskDef>,
}

impl QuestDef {
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        if raw.tasks.is_empty() {
            return Err(format!("Quest {} has no tasks", raw.id));
        }

        let tasks = raw
            .tasks
            .iter()
            .map(TaskDef::from_raw)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Quest {}: {}", raw.id, e))?;

        for (i, task) in tasks.iter().enumerate() {
            if tasks[..i].iter().any(|t| t.id == task.id) {
                return Err(format!("Quest {} has duplicate task id {}", raw.id, task.id));
            }
        }

        Ok(Self { id: raw.id, tasks })
    }

    /// Get a task by id
    pub fn get_task(&self, id: i32) -> Option<&TaskDef> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

impl ConditionDef {
    pub fn from_raw(raw: &RawCondition) -> Result<Self, String> {
        let event_kind = EventKind::from_str(&raw.event_kind)
            .ok_or_else(|| format!("Unknown event kind '{}'", raw.event_kind))?;

        if raw.goal_points <= 0 {
            return Err(format!("Non-positive goal_points {}", raw.goal_points));
        }

        let filter = MatchFilter {
            game_modes: raw.game_modes.clone(),
            maps: raw.maps.clone(),
            min_players: raw.min_players,
        };

        let kind = match event_kind {
            EventKind::Login => ConditionKind::Login,
            EventKind::LevelUp => ConditionKind::LevelUp,
            EventKind::TimeTick => ConditionKind::TimeTick(filter),
            EventKind::BombExplode => ConditionKind::BombExplode(filter),
            EventKind::BombDefuse => ConditionKind::BombDefuse(filter),
            EventKind::HostageEscape => ConditionKind::HostageEscape(filter),
            EventKind::MosquitoKill => ConditionKind::MosquitoKill(filter),
            EventKind::KiteKill => ConditionKind::KiteKill(filter),
            EventKind::VipKill => ConditionKind::VipKill(filter),
            EventKind::Win => ConditionKind::Win(filter),
            EventKind::MonsterKill => {
                let monster_kind = raw
                    .monster_kind
                    .ok_or_else(|| "monster_kill condition requires monster_kind".to_string())?;
                ConditionKind::MonsterKill { filter, monster_kind }
            }
            EventKind::Kill => ConditionKind::Kill {
                filter,
                kill: resolve_kill_filter(raw)?,
            },
        };

        Ok(Self {
            id: raw.id,
            goal_points: raw.goal_points,
            kind,
        })
    }
}

fn parse_team(field: &str, value: &str) -> Result<Team, String> {
    Team::from_str(value).ok_or_else(|| format!("Unknown {} '{}'", field, value))
}

fn resolve_kill_filter(raw: &RawCondition) -> Result<KillFilter, String> {
    let killer_team = match raw.killer_team.as_deref() {
        None | Some("any") => None,
        Some(value) => Some(parse_team("killer_team", value)?),
    };

    let victim_team = match raw.victim_team.as_deref() {
        None | Some("any") => VictimTeamRule::OppositeTeam,
        Some(value) => VictimTeamRule::Exact(parse_team("victim_team", value)?),
    };

    let victim_kind = match raw.victim_kind.as_deref() {
        None | Some("any") => VictimKind::Any,
        Some("human") => VictimKind::Human,
        Some("bot") => VictimKind::Bot,
        Some(value) => return Err(format!("Unknown victim_kind '{}'", value)),
    };

    if let Some(weapon_id) = raw.weapon_id {
        if weapon_id < 0 {
            return Err(format!("Negative weapon_id {}; omit the field for any weapon", weapon_id));
        }
    }

    Ok(KillFilter {
        killer_team,
        victim_kill_type: raw.victim_kill_type,
        victim_team,
        continuous: raw.continuous,
        weapon_id: raw.weapon_id,
        require_owned_weapon: raw.require_owned_weapon,
        victim_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_condition(event: &str) -> RawCondition {
        RawCondition {
            id: 1,
            event_kind: event.to_string(),
            goal_points: 1,
            game_modes: vec![],
            maps: vec![],
            min_players: 0,
            killer_team: None,
            victim_team: None,
            victim_kill_type: None,
            continuous: 0,
            weapon_id: None,
            require_owned_weapon: false,
            victim_kind: None,
            monster_kind: None,
        }
    }

    fn raw_task(conditions: Vec<RawCondition>) -> RawTask {
        RawTask {
            id: 1,
            goal: 10,
            reward_id: 300,
            notice_goal: 0,
            notice_template: None,
            conditions,
        }
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let raw = raw_condition("teleport");
        assert!(ConditionDef::from_raw(&raw).unwrap_err().contains("Unknown event kind"));
    }

    #[test]
    fn test_non_positive_goal_points_rejected() {
        let mut raw = raw_condition("login");
        raw.goal_points = 0;
        assert!(ConditionDef::from_raw(&raw).is_err());
    }

    #[test]
    fn test_kill_tri_states_resolved() {
        let mut raw = raw_condition("kill");
        raw.killer_team = Some("terrorist".to_string());
        raw.victim_kind = Some("bot".to_string());
        let def = ConditionDef::from_raw(&raw).unwrap();
        match def.kind {
            ConditionKind::Kill { ref kill, .. } => {
                assert_eq!(kill.killer_team, Some(Team::Terrorist));
                assert_eq!(kill.victim_team, VictimTeamRule::OppositeTeam);
                assert_eq!(kill.victim_kind, VictimKind::Bot);
            }
            _ => panic!("expected kill condition"),
        }
    }

    #[test]
    fn test_monster_kill_requires_kind() {
        let raw = raw_condition("monster_kill");
        assert!(ConditionDef::from_raw(&raw).is_err());

        let mut raw = raw_condition("monster_kill");
        raw.monster_kind = Some(2);
        assert!(ConditionDef::from_raw(&raw).is_ok());
    }

    #[test]
    fn test_task_validation() {
        let mut raw = raw_task(vec![raw_condition("kill")]);
        raw.goal = 0;
        assert!(TaskDef::from_raw(&raw).is_err());

        let raw = raw_task(vec![]);
        assert!(TaskDef::from_raw(&raw).unwrap_err().contains("no conditions"));

        let mut raw = raw_task(vec![raw_condition("kill")]);
        raw.notice_goal = 5;
        assert!(TaskDef::from_raw(&raw).unwrap_err().contains("notice_template"));

        raw.notice_template = Some("quest_progress".to_string());
        let task = TaskDef::from_raw(&raw).unwrap();
        assert_eq!(task.notice.as_ref().unwrap().every, 5);
    }

    #[test]
    fn test_quest_rejects_duplicate_task_ids() {
        let task = raw_task(vec![raw_condition("kill")]);
        let raw = RawQuest { id: 7, tasks: vec![task.clone(), task] };
        assert!(QuestDef::from_raw(&raw).unwrap_err().contains("duplicate task id"));
    }

    #[test]
    fn test_quest_requires_tasks() {
        let raw = RawQuest { id: 7, tasks: vec![] };
        assert!(QuestDef::from_raw(&raw).unwrap_err().contains("no tasks"));
    }
}
