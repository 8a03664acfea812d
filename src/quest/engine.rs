//! Quest Engine
//!
//! Typed entry points for raw gameplay events and the fan-out chain
//! engine → quest → task → condition. There is no generic event bus: each
//! category is a distinct call, so adding a category means adding a matching
//! method at every level. Filtering happens entirely in the conditions;
//! quests and tasks are dumb fan-out.
//!
//! Dispatch is synchronous and CPU-only. The only external effects are the
//! notification and reward channels, which never block the calling match
//! context.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

use super::condition::Dispatch;
use super::definition::{QuestDef, TaskDef};
use super::events::{KillEvent, MatchState, Notification, PlayerSnapshot, RewardGrant, Team, UserId};
use super::progress::{MatchKey, MatchProgressStore, ProgressKey, ProgressStore, TaskProgress};
use super::registry::QuestRegistry;

impl QuestDef {
    /// True iff every owned task is finished for the user. Recomputed on
    /// demand; no cached aggregate that could go stale.
    pub fn is_all_tasks_finished(&self, progress: &ProgressStore, user_id: UserId) -> bool {
        self.tasks
            .iter()
            .all(|t| t.is_finished_for(self.id, progress, user_id))
    }

    pub(crate) fn on_login(&self, d: &Dispatch<'_>, user_id: UserId) {
        for task in &self.tasks {
            task.on_login(self.id, d, user_id);
        }
    }

    pub(crate) fn on_level_up(&self, d: &Dispatch<'_>, user_id: UserId, old_level: i32, new_level: i32) {
        for task in &self.tasks {
            task.on_level_up(self.id, d, user_id, old_level, new_level);
        }
    }

    pub(crate) fn on_minute_tick(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_minute_tick(self.id, d, player, state);
        }
    }

    pub(crate) fn on_kill(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState, event: &KillEvent) {
        for task in &self.tasks {
            task.on_kill(self.id, d, player, state, event);
        }
    }

    pub(crate) fn on_bomb_explode(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_bomb_explode(self.id, d, player, state);
        }
    }

    pub(crate) fn on_bomb_defuse(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_bomb_defuse(self.id, d, player, state);
        }
    }

    pub(crate) fn on_hostage_escape(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_hostage_escape(self.id, d, player, state);
        }
    }

    pub(crate) fn on_monster_kill(
        &self,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        monster_kind: i32,
    ) {
        for task in &self.tasks {
            task.on_monster_kill(self.id, d, player, state, monster_kind);
        }
    }

    pub(crate) fn on_mosquito_kill(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_mosquito_kill(self.id, d, player, state);
        }
    }

    pub(crate) fn on_kite_kill(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_kite_kill(self.id, d, player, state);
        }
    }

    pub(crate) fn on_vip_kill(&self, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for task in &self.tasks {
            task.on_vip_kill(self.id, d, player, state);
        }
    }

    pub(crate) fn on_match_end(
        &self,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        user_team: Team,
    ) {
        for task in &self.tasks {
            task.on_match_end(self.id, d, player, state, user_team);
        }
    }
}

impl TaskDef {
    pub(crate) fn on_login(&self, quest_id: i32, d: &Dispatch<'_>, user_id: UserId) {
        for condition in &self.conditions {
            condition.on_login(self, quest_id, d, user_id);
        }
    }

    pub(crate) fn on_level_up(
        &self,
        quest_id: i32,
        d: &Dispatch<'_>,
        user_id: UserId,
        old_level: i32,
        new_level: i32,
    ) {
        for condition in &self.conditions {
            condition.on_level_up(self, quest_id, d, user_id, old_level, new_level);
        }
    }

    pub(crate) fn on_minute_tick(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_minute_tick(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_kill(
        &self,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        event: &KillEvent,
    ) {
        for condition in &self.conditions {
            condition.on_kill(self, quest_id, d, player, state, event);
        }
    }

    pub(crate) fn on_bomb_explode(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_bomb_explode(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_bomb_defuse(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_bomb_defuse(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_hostage_escape(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_hostage_escape(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_monster_kill(
        &self,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        monster_kind: i32,
    ) {
        for condition in &self.conditions {
            condition.on_monster_kill(self, quest_id, d, player, state, monster_kind);
        }
    }

    pub(crate) fn on_mosquito_kill(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_mosquito_kill(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_kite_kill(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_kite_kill(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_vip_kill(&self, quest_id: i32, d: &Dispatch<'_>, player: &PlayerSnapshot, state: &MatchState) {
        for condition in &self.conditions {
            condition.on_vip_kill(self, quest_id, d, player, state);
        }
    }

    pub(crate) fn on_match_end(
        &self,
        quest_id: i32,
        d: &Dispatch<'_>,
        player: &PlayerSnapshot,
        state: &MatchState,
        user_team: Team,
    ) {
        for condition in &self.conditions {
            condition.on_match_end(self, quest_id, d, player, state, user_team);
        }
    }
}

/// Receiving ends of the engine's outbound effects. Hand these to the
/// notification and reward collaborators.
pub struct EngineOutput {
    pub notifications: UnboundedReceiver<Notification>,
    pub rewards: UnboundedReceiver<RewardGrant>,
}

/// The quest event engine: owns the in-memory progress stores and dispatches
/// every raw gameplay event to every loaded quest definition.
pub struct QuestEngine {
    registry: Arc<QuestRegistry>,
    progress: ProgressStore,
    scratch: MatchProgressStore,
    notifications: UnboundedSender<Notification>,
    rewards: UnboundedSender<RewardGrant>,
}

impl QuestEngine {
    pub fn new(registry: Arc<QuestRegistry>) -> (Self, EngineOutput) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (reward_tx, reward_rx) = mpsc::unbounded_channel();

        let engine = Self {
            registry,
            progress: ProgressStore::new(),
            scratch: MatchProgressStore::new(),
            notifications: notice_tx,
            rewards: reward_tx,
        };
        let output = EngineOutput {
            notifications: notice_rx,
            rewards: reward_rx,
        };
        (engine, output)
    }

    fn dispatch(&self) -> Dispatch<'_> {
        Dispatch {
            progress: &self.progress,
            scratch: &self.scratch,
            notifications: &self.notifications,
            rewards: &self.rewards,
        }
    }

    // ------------------------------------------------------------------
    // Inbound entry points, one per raw gameplay event category
    // ------------------------------------------------------------------

    pub fn on_login(&self, user_id: UserId) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_login(&d, user_id);
        }
    }

    pub fn on_level_up(&self, user_id: UserId, old_level: i32, new_level: i32) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_level_up(&d, user_id, old_level, new_level);
        }
    }

    pub fn on_minute_tick(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_minute_tick(&d, player, state);
        }
    }

    pub fn on_kill(&self, player: &PlayerSnapshot, state: &MatchState, event: &KillEvent) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_kill(&d, player, state, event);
        }
    }

    pub fn on_bomb_explode(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_bomb_explode(&d, player, state);
        }
    }

    pub fn on_bomb_defuse(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_bomb_defuse(&d, player, state);
        }
    }

    pub fn on_hostage_escape(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_hostage_escape(&d, player, state);
        }
    }

    pub fn on_monster_kill(&self, player: &PlayerSnapshot, state: &MatchState, monster_kind: i32) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_monster_kill(&d, player, state, monster_kind);
        }
    }

    pub fn on_mosquito_kill(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_mosquito_kill(&d, player, state);
        }
    }

    pub fn on_kite_kill(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_kite_kill(&d, player, state);
        }
    }

    pub fn on_vip_kill(&self, player: &PlayerSnapshot, state: &MatchState) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_vip_kill(&d, player, state);
        }
    }

    pub fn on_match_end(&self, player: &PlayerSnapshot, state: &MatchState, user_team: Team) {
        let d = self.dispatch();
        for quest in self.registry.all() {
            quest.on_match_end(&d, player, state, user_team);
        }
    }

    /// A player left a running match: drop their ephemeral records for it.
    pub fn on_match_leave(&self, match_id: Uuid, user_id: UserId) {
        debug!("User {} left match {}, dropping scratch progress", user_id, match_id);
        self.scratch.clear_player(match_id, user_id);
    }

    /// Cleanup pass after a match ended: discard (never flush) all of its
    /// ephemeral records.
    pub fn on_match_over(&self, match_id: Uuid) {
        debug!("Match {} over, dropping scratch progress", match_id);
        self.scratch.clear_match(match_id);
    }

    // ------------------------------------------------------------------
    // Read surface for collaborators
    // ------------------------------------------------------------------

    pub fn is_task_finished(&self, user_id: UserId, quest_id: i32, task_id: i32) -> bool {
        self.progress
            .is_finished(ProgressKey::new(user_id, quest_id, task_id))
    }

    /// True iff every task of the quest is finished for the user
    pub fn is_quest_complete(&self, user_id: UserId, quest_id: i32) -> bool {
        self.registry
            .get(quest_id)
            .map_or(false, |q| q.is_all_tasks_finished(&self.progress, user_id))
    }

    pub fn task_progress(&self, user_id: UserId, quest_id: i32, task_id: i32) -> TaskProgress {
        self.progress.get(ProgressKey::new(user_id, quest_id, task_id))
    }

    pub fn match_progress(&self, match_id: Uuid, user_id: UserId, quest_id: i32, task_id: i32) -> TaskProgress {
        self.scratch
            .get(MatchKey::new(match_id, user_id, quest_id, task_id))
    }

    /// The persistent store, for the persistence collaborator to snapshot
    /// and restore.
    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn registry(&self) -> &QuestRegistry {
        &self.registry
    }
}
