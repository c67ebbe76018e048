use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage key holding the bearer credential.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Storage key holding the JSON-serialized cached identity.
pub const AUTH_USER_KEY: &str = "auth_user";

/// A string key/value store that survives page reloads.
///
/// Writes are synchronous: in-memory state and the durable copy are always
/// updated within the same call, so a reload at any point observes a
/// consistent pair of keys.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Map-backed storage for native targets and tests. Clones share the same
/// underlying entries.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// localStorage-backed storage. Browsers can refuse storage access
/// (private browsing, disabled storage); in that case reads come back
/// empty and writes are dropped.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Default)]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserStorage {
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageBackend for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = Self::local_storage() {
            let _ = storage.set_item(key, value);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::default();
        assert_eq!(storage.get("missing"), None);

        storage.set(AUTH_TOKEN_KEY, "abc");
        assert_eq!(storage.get(AUTH_TOKEN_KEY).as_deref(), Some("abc"));

        storage.remove(AUTH_TOKEN_KEY);
        assert_eq!(storage.get(AUTH_TOKEN_KEY), None);
    }

    #[test]
    fn clones_share_entries() {
        let storage = MemoryStorage::default();
        let other = storage.clone();
        storage.set("key", "value");
        assert_eq!(other.get("key").as_deref(), Some("value"));
    }
}
