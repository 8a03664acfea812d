//! Quest Conditions
//!
//! A condition decides whether a single raw gameplay event satisfies a quest
//! requirement and, if so, applies progress. Conditions are a closed set of
//! tagged variants, one per event category; each exposes exactly one handler
//! for its category and ignores calls for any other category.
//!
//! Conditions are immutable after construction and hold no counters of their
//! own: every mutable value lives in the progress stores, keyed by
//! user/quest/task, so condition definitions are safely shared across all
//! concurrent match contexts.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::definition::TaskDef;
use super::events::{KillEvent, MatchState, Notification, PlayerSnapshot, RewardGrant, Team, UserId};
use super::progress::{IncrementOutcome, MatchKey, MatchProgressStore, ProgressKey, ProgressStore};

/// Shared handles threaded through one event dispatch: the two progress
/// layers plus the fire-and-forget outbound channels.
pub(crate) struct Dispatch<'a> {
    pub progress: &'a ProgressStore,
    pub scratch: &'a MatchProgressStore,
    pub notifications: &'a UnboundedSender<Notification>,
    pub rewards: &'a UnboundedSender<RewardGrant>,
}

/// Match-scope filters shared by every match-scoped condition.
/// Empty sets are wildcards; 0 means no minimum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub game_modes: Vec<i32>,
    pub maps: Vec<i32>,
    pub min_players: u32,
}

impl MatchFilter {
    /// Fixed short-circuit order: game mode, map, roster size. A
    /// map-restricted filter fails closed when the player is not in a room.
    pub(crate) fn allows(&self, player: &PlayerSnapshot, state: &MatchState) -> bool {
        if !self.game_modes.is_empty() && !self.game_modes.contains(&state.game_mode) {
            return false;
        }

        if !self.maps.is_empty() {
            match player.current_map {
                Some(map_id) if self.maps.contains(&map_id) => {}
                _ => return false,
            }
        }

        if self.min_players > 0 && state.player_count < self.min_players {
            return false;
        }

        true
    }
}

/// Which victim team qualifies a kill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimTeamRule {
    /// Victim must be on this exact team
    Exact(Team),
    /// Any team, but the kill must still be cross-team
    OppositeTeam,
}

/// Whether the victim must be a human player or a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimKind {
    Any,
    Human,
    Bot,
}

/// Extra filters applied only by kill conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillFilter {
    /// None = killer may be on any team
    pub killer_team: Option<Team>,
    /// None = any kill classification
    pub victim_kill_type: Option<i32>,
    pub victim_team: VictimTeamRule,
    /// Consecutive qualifying kills required before credit; 0 = none
    pub continuous: u32,
    /// None = any weapon
    pub weapon_id: Option<i32>,
    /// Only meaningful together with an exact weapon_id
    pub require_owned_weapon: bool,
    pub victim_kind: VictimKind,
}

impl KillFilter {
    /// Kill sub-chain, run after the match-scope chain passed. Order is
    /// fixed: killer team, kill type, victim team, weapon, possession,
    /// human/bot.
    pub(crate) fn matches(&self, player: &PlayerSnapshot, event: &KillEvent) -> bool {
        if let Some(team) = self.killer_team {
            if event.killer_team != team {
                return false;
            }
        }

        if let Some(kill_type) = self.victim_kill_type {
            if event.victim_kill_type != kill_type {
                return false;
            }
        }

        match self.victim_team {
            VictimTeamRule::Exact(team) => {
                if event.victim_team != team {
                    return false;
                }
            }
            VictimTeamRule::OppositeTeam => {
                if event.killer_team == event.victim_team {
                    return false;
                }
            }
        }

        if let Some(weapon_id) = self.weapon_id {
            if event.weapon_id != weapon_id {
                return false;
            }
            if self.require_owned_weapon && !player.owns_weapon(weapon_id) {
                return false;
            }
        }

        match self.victim_kind {
            VictimKind::Any => {}
            VictimKind::Human => {
                if event.victim_user_id == 0 {
                    return false;
                }
            }
            VictimKind::Bot => {
                if event.victim_user_id != 0 {
                    return false;
                }
            }
        }

        true
    }
}

/// Closed set of condition variants, one tag per event category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionKind {
    Login,
    LevelUp,
    TimeTick(MatchFilter),
    BombExplode(MatchFilter),
    BombDefuse(MatchFilter),
    HostageEscape(MatchFilter),
    MosquitoKill(MatchFilter),
    KiteKill(MatchFilter),
    VipKill(MatchFilter),
    /// Commits directly to the persistent counter after the outcome check
    Win(MatchFilter),
    MonsterKill { filter: MatchFilter, monster_kind: i32 },
    Kill { filter: MatchFilter, kill: KillFilter },
}

/// A typed predicate + credit rule attached to a task
#[derive(Debug, Clone)]
pub struct ConditionDef {
    pub id: i32,
    /// How much one satisfying event is worth
    pub goal_points: i32,
    pub kind: ConditionKind,
}

/// Base eligibility hook, first step of every filter chain. Currently a
/// pass-through reserved for per-user gating.
fn base_eligible(_user_id: UserId) -> bool {
    true
}

impl ConditionDef {
    fn match_scope_allows(&self, filter: &MatchFilter, player: &PlayerSnapshot, state: &MatchState) -> bool {
        base_eligible(player.user_id) && filter.allows(player, state)
    }

    /// Add this condition's contribution to the per-match counter, emit a
    /// notice on every notice interval, and commit the full goal into the
    /// persistent layer once the batched total reaches it.
    fn apply_match_credit(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let key = MatchKey::new(state.match_id, player.user_id, quest_id, task.id);
        let total = d.scratch.with_record(key, |record| {
            record.units_done += self.goal_points;
            record.units_done
        });

        debug!(
            "User {} quest {} task {} match progress {}/{}",
            player.user_id, quest_id, task.id, total, task.goal
        );

        if let Some(ref notice) = task.notice {
            if total % notice.every == 0 {
                let _ = d.notifications.send(Notification {
                    user_id: player.user_id,
                    template: notice.template.clone(),
                    args: [total, task.goal],
                });
            }
        }

        if total >= task.goal {
            task.increment_count(quest_id, d, player.user_id, task.goal, true);
        }
    }

    /// Shared handler body for the simple match-scoped variants
    fn simple_match_event(
        &self,
        filter: &MatchFilter,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        if self.match_scope_allows(filter, player, state) {
            self.apply_match_credit(task, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_login(&self, task: &TaskDef, quest_id: i32, d: &Dispatch<'_>, user_id: UserId) {
        if !matches!(self.kind, ConditionKind::Login) {
            return;
        }
        if !base_eligible(user_id) {
            return;
        }
        task.increment_count(quest_id, d, user_id, self.goal_points, false);
    }

    pub(crate) fn on_level_up(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        user_id: UserId,
        old_level: i32,
        new_level: i32,
    ) {
        if !matches!(self.kind, ConditionKind::LevelUp) {
            return;
        }
        if !base_eligible(user_id) {
            return;
        }
        let gained = new_level - old_level;
        if gained <= 0 {
            return;
        }
        task.increment_count(quest_id, d, user_id, gained, false);
    }

    pub(crate) fn on_minute_tick(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::TimeTick(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_bomb_explode(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::BombExplode(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_bomb_defuse(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::BombDefuse(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_hostage_escape(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::HostageEscape(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_mosquito_kill(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::MosquitoKill(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_kite_kill(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::KiteKill(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_vip_kill(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
    ) {
        let ConditionKind::VipKill(ref filter) = self.kind else { return };
        self.simple_match_event(filter, task, quest_id, d, player, state);
    }

    pub(crate) fn on_monster_kill(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        monster_kind: i32,
    ) {
        let ConditionKind::MonsterKill { ref filter, monster_kind: wanted } = self.kind else {
            return;
        };
        if !self.match_scope_allows(filter, player, state) {
            return;
        }
        if monster_kind == wanted {
            self.apply_match_credit(task, quest_id, d, player, state);
        }
    }

    /// Win credits the persistent counter directly; there is nothing to
    /// batch, a match produces at most one end event per player.
    pub(crate) fn on_match_end(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        user_team: Team,
    ) {
        let ConditionKind::Win(ref filter) = self.kind else { return };
        if !self.match_scope_allows(filter, player, state) {
            return;
        }

        debug!(
            "User {} ended match on team {} at {}:{}",
            player.user_id, user_team.as_str(), state.ter_wins, state.ct_wins
        );

        // A team only loses when strictly behind; ties credit both sides
        match user_team {
            Team::Terrorist if state.ter_wins < state.ct_wins => return,
            Team::CounterTerrorist if state.ter_wins > state.ct_wins => return,
            _ => {}
        }

        task.increment_count(quest_id, d, player.user_id, self.goal_points, false);
    }

    pub(crate) fn on_kill(
        &self,
        task: &TaskDef,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        event: &KillEvent,
    ) {
        let ConditionKind::Kill { ref filter, ref kill } = self.kind else { return };
        let key = MatchKey::new(state.match_id, player.user_id, quest_id, task.id);

        // A disqualifying kill breaks a streak even though it earns no
        // credit; this holds for the match-scope filters too (e.g. a kill on
        // the wrong map)
        if !self.match_scope_allows(filter, player, state) || !kill.matches(player, event) {
            if kill.continuous > 0 {
                d.scratch.with_record(key, |record| record.streak = 0);
            }
            return;
        }

        if kill.continuous > 0 {
            let streak_complete = d.scratch.with_record(key, |record| {
                record.streak += 1;
                if record.streak >= kill.continuous {
                    record.streak = 0;
                    true
                } else {
                    false
                }
            });
            if !streak_complete {
                return;
            }
        }

        self.apply_match_credit(task, quest_id, d, player, state);
    }
}

impl TaskDef {
    /// The single legal mutator of persistent progress. A no-op once the
    /// task is finished for the user; completion is latched and never
    /// re-triggers.
    pub(crate) fn increment_count(
        &self,
        quest_id: i32,
        d: &Dispatch<'_>,
        user_id: UserId,
        amount: i32,
        force: bool,
    ) {
        let key = ProgressKey::new(user_id, quest_id, self.id);
        match d.progress.increment_if_unfinished(key, amount, self.goal, force) {
            IncrementOutcome::AlreadyFinished => {}
            IncrementOutcome::Advanced(done) => {
                debug!(
                    "User {} quest {} task {} progress {}/{}",
                    user_id, quest_id, self.id, done, self.goal
                );
            }
            IncrementOutcome::Finished => self.done(quest_id, d, user_id),
        }
    }

    fn done(&self, quest_id: i32, d: &Dispatch<'_>, user_id: UserId) {
        info!(
            "User {} finished quest {} task {}, granting reward {}",
            user_id, quest_id, self.id, self.reward_id
        );
        let _ = d.rewards.send(RewardGrant {
            user_id,
            quest_id,
            task_id: self.id,
            reward_id: self.reward_id,
        });
    }

    /// Pure read of the latched persistent flag
    pub(crate) fn is_finished_for(&self, quest_id: i32, progress: &ProgressStore, user_id: UserId) -> bool {
        progress.is_finished(ProgressKey::new(user_id, quest_id, self.id))
    }
}
