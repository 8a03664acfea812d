//! Quest Registry
//!
//! Loads quest definitions from TOML files into an immutable in-memory set.
//! Definitions are loaded once before any event dispatch begins; there is no
//! incremental redefinition while events are in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::definition::{QuestDef, RawQuestFile};

/// Registry for all loaded quest definitions. Read-only after construction
/// and freely shared across match contexts without locking.
pub struct QuestRegistry {
    quests: HashMap<i32, Arc<QuestDef>>,
}

impl QuestRegistry {
    /// Load every quest definition under a directory (recursively).
    ///
    /// A malformed file aborts the load of that definition and is reported;
    /// the remaining definitions still load. A partially-valid quest is
    /// never inserted.
    pub fn load_dir(dir: &Path) -> Result<Self, String> {
        info!("Loading quests from {:?}", dir);

        let mut paths = Vec::new();
        if dir.exists() {
            collect_quest_files(dir, &mut paths)?;
        } else {
            warn!("Quest directory does not exist: {:?}", dir);
        }

        let mut quests = HashMap::new();
        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    if quests.contains_key(&quest.id) {
                        warn!("Duplicate quest id {} in {:?}, skipping", quest.id, path);
                        continue;
                    }
                    info!("Loaded quest {} ({} tasks)", quest.id, quest.tasks.len());
                    quests.insert(quest.id, Arc::new(quest));
                }
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }

        info!("Loaded {} quest definitions", quests.len());
        Ok(Self { quests })
    }

    /// Build a registry from already-resolved definitions (programmatic
    /// assembly, embedded definitions, tests).
    pub fn from_defs(defs: impl IntoIterator<Item = QuestDef>) -> Result<Self, String> {
        let mut quests = HashMap::new();
        for quest in defs {
            if quests.contains_key(&quest.id) {
                return Err(format!("Duplicate quest id {}", quest.id));
            }
            quests.insert(quest.id, Arc::new(quest));
        }
        Ok(Self { quests })
    }

    /// Get a quest by id
    pub fn get(&self, quest_id: i32) -> Option<&Arc<QuestDef>> {
        self.quests.get(&quest_id)
    }

    /// All loaded quest definitions
    pub fn all(&self) -> impl Iterator<Item = &Arc<QuestDef>> {
        self.quests.values()
    }

    /// All quest ids
    pub fn all_ids(&self) -> Vec<i32> {
        self.quests.keys().copied().collect()
    }

    pub fn count(&self) -> usize {
        self.quests.len()
    }
}

/// Recursively collect quest TOML files from a directory
fn collect_quest_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_quest_files(&path, paths)?;
        } else if path.extension().map_or(false, |ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}

/// Load and resolve a single quest file
fn load_quest_file(path: &Path) -> Result<QuestDef, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

    let raw: RawQuestFile =
        toml::from_str(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

    QuestDef::from_raw(&raw.quest)
}
