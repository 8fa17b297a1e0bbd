//! Chat order/favorite ledger, persisted as `chat_order.json`.
//!
//! `order` keeps insertion order (newest chat first); `favorites` is a subset
//! of `order`, enforced at the mutation boundary and pruned on load. The whole
//! document is rewritten on every mutation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AppError, StoreError};

pub const ORDER_FILE: &str = "chat_order.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct OrderDocument {
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    favorites: Vec<String>,
    last_updated: Option<DateTime<Local>>,
}

pub struct ChatOrder {
    path: PathBuf,
    order: Vec<String>,
    favorites: HashSet<String>,
}

impl ChatOrder {
    /// Loads the ledger from `path`. A missing or unreadable file yields an
    /// empty ledger; favorites not present in `order` are dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (order, favorites) = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<OrderDocument>(&content) {
                Ok(doc) => {
                    let known: HashSet<String> = doc.order.iter().cloned().collect();
                    let mut favorites = HashSet::new();
                    for id in doc.favorites {
                        if known.contains(&id) {
                            favorites.insert(id);
                        } else {
                            warn!("dropping favorite not present in order: {id}");
                        }
                    }
                    info!("chat order loaded successfully");
                    (doc.order, favorites)
                }
                Err(e) => {
                    error!("error parsing chat order: {e}");
                    (Vec::new(), HashSet::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Vec::new(), HashSet::new())
            }
            Err(e) => {
                error!("error loading chat order: {e}");
                (Vec::new(), HashSet::new())
            }
        };
        Self {
            path,
            order,
            favorites,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, chat_id: &str) -> bool {
        self.order.iter().any(|id| id == chat_id)
    }

    pub fn is_favorite(&self, chat_id: &str) -> bool {
        self.favorites.contains(chat_id)
    }

    /// Inserts `chat_id` at the front of the order if absent. Idempotent.
    pub fn add(&mut self, chat_id: &str) -> Result<(), StoreError> {
        if self.contains(chat_id) {
            return Ok(());
        }
        self.order.insert(0, chat_id.to_string());
        self.save()
    }

    /// Removes `chat_id` from both the order and the favorites. No error if
    /// absent.
    pub fn remove(&mut self, chat_id: &str) -> Result<(), StoreError> {
        self.order.retain(|id| id != chat_id);
        self.favorites.remove(chat_id);
        self.save()
    }

    /// Flips the favorite status of `chat_id`. Rejected for ids that are not
    /// in the order, keeping favorites a subset of order.
    pub fn toggle_favorite(&mut self, chat_id: &str) -> Result<bool, AppError> {
        if !self.contains(chat_id) {
            return Err(AppError::NotInLedger(chat_id.to_string()));
        }
        let now_favorite = if self.favorites.remove(chat_id) {
            false
        } else {
            self.favorites.insert(chat_id.to_string());
            true
        };
        self.save()?;
        Ok(now_favorite)
    }

    /// Render order: favorites first, then the rest, each bucket preserving
    /// the relative sequence of `order`. A stable two-bucket partition.
    pub fn ordered(&self) -> Vec<String> {
        let mut result: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.favorites.contains(*id))
            .cloned()
            .collect();
        result.extend(
            self.order
                .iter()
                .filter(|id| !self.favorites.contains(*id))
                .cloned(),
        );
        result
    }

    /// Swaps `chat_id` with its immediate neighbor in the stored order.
    /// No-op at the boundaries and for unknown ids; persists only on change.
    pub fn move_chat(
        &mut self,
        chat_id: &str,
        direction: MoveDirection,
    ) -> Result<(), StoreError> {
        let Some(index) = self.order.iter().position(|id| id == chat_id) else {
            return Ok(());
        };
        match direction {
            MoveDirection::Up if index > 0 => {
                self.order.swap(index, index - 1);
                self.save()
            }
            MoveDirection::Down if index + 1 < self.order.len() => {
                self.order.swap(index, index + 1);
                self.save()
            }
            _ => Ok(()),
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut favorites: Vec<String> = self.favorites.iter().cloned().collect();
        favorites.sort();
        let doc = OrderDocument {
            order: self.order.clone(),
            favorites,
            last_updated: Some(Local::now()),
        };
        let content = serde_json::to_string_pretty(&doc)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ledger_in(dir: &Path) -> ChatOrder {
        ChatOrder::load(dir.join(ORDER_FILE))
    }

    #[test]
    fn missing_file_yields_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        assert!(ledger.ordered().is_empty());
    }

    #[test]
    fn add_inserts_at_front_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        ledger.add("a").unwrap();
        ledger.add("b").unwrap();
        ledger.add("a").unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "a"]);
    }

    #[test]
    fn favorites_partition_is_stable() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        // add() prepends, so insert in reverse to get order = [a, b, c].
        for id in ["c", "b", "a"] {
            ledger.add(id).unwrap();
        }
        ledger.toggle_favorite("b").unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "a", "c"]);
        ledger.toggle_favorite("c").unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "c", "a"]);
    }

    #[test]
    fn remove_purges_order_and_favorites() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        for id in ["c", "b", "a"] {
            ledger.add(id).unwrap();
        }
        ledger.toggle_favorite("b").unwrap();
        ledger.remove("b").unwrap();
        assert!(!ledger.ordered().contains(&"b".to_string()));
        assert!(!ledger.is_favorite("b"));
        // Removing an absent id is fine.
        ledger.remove("zzz").unwrap();
    }

    #[test]
    fn toggle_favorite_twice_restores_state_and_file() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        ledger.add("a").unwrap();
        assert!(ledger.toggle_favorite("a").unwrap());
        assert!(!ledger.toggle_favorite("a").unwrap());
        assert!(!ledger.is_favorite("a"));
        let reloaded = ChatOrder::load(ledger.path());
        assert!(!reloaded.is_favorite("a"));
        assert_eq!(reloaded.ordered(), vec!["a"]);
    }

    #[test]
    fn toggle_favorite_rejects_unknown_ids() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        assert!(matches!(
            ledger.toggle_favorite("ghost"),
            Err(AppError::NotInLedger(_))
        ));
    }

    #[test]
    fn move_swaps_neighbors_and_ignores_boundaries() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        for id in ["c", "b", "a"] {
            ledger.add(id).unwrap();
        }
        ledger.move_chat("b", MoveDirection::Up).unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "a", "c"]);
        ledger.move_chat("b", MoveDirection::Up).unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "a", "c"]);
        ledger.move_chat("c", MoveDirection::Down).unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "a", "c"]);
        ledger.move_chat("a", MoveDirection::Down).unwrap();
        assert_eq!(ledger.ordered(), vec!["b", "c", "a"]);
    }

    #[test]
    fn persisted_ledger_round_trips() {
        let dir = tempdir().unwrap();
        let mut ledger = ledger_in(dir.path());
        for id in ["c", "b", "a"] {
            ledger.add(id).unwrap();
        }
        ledger.toggle_favorite("c").unwrap();
        let reloaded = ChatOrder::load(ledger.path());
        assert_eq!(reloaded.ordered(), vec!["c", "a", "b"]);
        assert!(reloaded.is_favorite("c"));
    }

    #[test]
    fn foreign_favorites_are_pruned_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ORDER_FILE);
        fs::write(
            &path,
            r#"{"order": ["a"], "favorites": ["a", "ghost"], "last_updated": null}"#,
        )
        .unwrap();
        let ledger = ChatOrder::load(&path);
        assert!(ledger.is_favorite("a"));
        assert!(!ledger.is_favorite("ghost"));
    }

    #[test]
    fn malformed_file_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ORDER_FILE);
        fs::write(&path, "not json").unwrap();
        let ledger = ChatOrder::load(&path);
        assert!(ledger.ordered().is_empty());
    }
}
