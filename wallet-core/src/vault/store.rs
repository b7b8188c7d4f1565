// wallet-core/src/vault/store.rs
//
// Persistence collaborator: key → byte blob.
// Core không biết blob nằm ở đâu (keychain, file, IndexedDB...).

use crate::error::WalletResult;
use std::collections::HashMap;
use std::sync::Mutex;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> WalletResult<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: Vec<u8>) -> WalletResult<()>;

    /// Xóa key không tồn tại không phải lỗi
    fn delete(&self, key: &str) -> WalletResult<()>;
}

/// In-memory store (tests, embedding)
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> WalletResult<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> WalletResult<()> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> WalletResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", vec![1, 2, 3]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![1, 2, 3]));
        assert!(store.contains("a"));

        store.set("a", vec![4]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![4]));
        assert_eq!(store.len(), 1);

        store.delete("a").unwrap();
        store.delete("missing").unwrap();
        assert!(store.is_empty());
    }
}
