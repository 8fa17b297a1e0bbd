//! On-disk chat store: one `chats/<id>.json` per chat, rewritten in full on
//! every mutation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::StoreError;
use crate::history::Chat;

pub const CHATS_DIR: &str = "chats";

pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chat_path(&self, chat_id: &str) -> PathBuf {
        self.dir.join(format!("{chat_id}.json"))
    }

    /// Serializes the full chat to `<id>.json`, overwriting any previous
    /// contents.
    pub fn save(&self, chat: &Chat) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(chat)?;
        fs::write(self.chat_path(&chat.id), content)?;
        Ok(())
    }

    /// Removes the chat file if present.
    pub fn delete(&self, chat_id: &str) -> Result<(), StoreError> {
        let path = self.chat_path(chat_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Parses every `*.json` file in the chat directory into a map keyed by
    /// chat id. A malformed file is skipped with a warning so one corrupt
    /// document cannot take down the whole load.
    pub fn load_all(&self) -> Result<HashMap<String, Chat>, StoreError> {
        let mut chats = HashMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("skipping unreadable chat file {}: {e}", path.display());
                    continue;
                }
            };
            match serde_json::from_str::<Chat>(&content) {
                Ok(chat) => {
                    chats.insert(chat.id.clone(), chat);
                }
                Err(e) => {
                    warn!("skipping malformed chat file {}: {e}", path.display());
                }
            }
        }
        Ok(chats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_all_round_trips() {
        let dir = tempdir().unwrap();
        let store = ChatStore::new(dir.path().join(CHATS_DIR)).unwrap();
        let mut chat = Chat::new("New Chat");
        chat.push(Role::User, "hello");
        chat.push(Role::Assistant, "hi there");
        store.save(&chat).unwrap();

        let chats = store.load_all().unwrap();
        assert_eq!(chats.len(), 1);
        let loaded = &chats[&chat.id];
        assert_eq!(loaded.name, "New Chat");
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[0].content, "hello");
        assert_eq!(loaded.messages[1].role, Role::Assistant);
        assert_eq!(loaded.messages[1].content, "hi there");
    }

    #[test]
    fn malformed_file_is_skipped_without_aborting() {
        let dir = tempdir().unwrap();
        let store = ChatStore::new(dir.path().join(CHATS_DIR)).unwrap();
        let chat = Chat::new("Keep");
        store.save(&chat).unwrap();
        fs::write(store.dir().join("broken.json"), "{not json").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let chats = store.load_all().unwrap();
        assert_eq!(chats.len(), 1);
        assert!(chats.contains_key(&chat.id));
    }

    #[test]
    fn delete_removes_file_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let store = ChatStore::new(dir.path().join(CHATS_DIR)).unwrap();
        let chat = Chat::new("Gone");
        store.save(&chat).unwrap();
        store.delete(&chat.id).unwrap();
        assert!(store.load_all().unwrap().is_empty());
        store.delete(&chat.id).unwrap();
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let store = ChatStore::new(dir.path().join(CHATS_DIR)).unwrap();
        let mut chat = Chat::new("New Chat");
        store.save(&chat).unwrap();
        chat.name = "Renamed".to_string();
        chat.push(Role::User, "one");
        store.save(&chat).unwrap();

        let chats = store.load_all().unwrap();
        assert_eq!(chats[&chat.id].name, "Renamed");
        assert_eq!(chats[&chat.id].messages.len(), 1);
    }
}
