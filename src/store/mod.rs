//! Client-local key/value storage.
//!
//! Everything the console persists lives in named slots holding JSON text,
//! the same shape a browser's local storage would hold. The account logic only
//! sees the [`KeyValueStore`] trait, so tests run against [`MemoryStore`] and
//! the binary against [`FileStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Minimal storage surface: string values under string keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Named slots used by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Stored user records: shadows of built-ins plus created users
    Users,
    Session,
    CsrfToken,
    /// Id of the user who must change their password
    PasswordChangeRequired,
    PasswordChangeMessage,
    ActivePage,
    /// Failure counters; only ever written to tab-lifetime storage
    LoginAttempts,
}

impl Slot {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Users => "app_users",
            Self::Session => "user_session",
            Self::CsrfToken => "csrf_token",
            Self::PasswordChangeRequired => "password_change_required",
            Self::PasswordChangeMessage => "password_change_message",
            Self::ActivePage => "active_page",
            Self::LoginAttempts => "login_attempts",
        }
    }
}

/// Typed JSON access to slots, available on every store.
pub trait SlotExt: KeyValueStore {
    /// Read and decode a slot. A missing slot is `Ok(None)`; undecodable JSON is an error.
    fn read<T: DeserializeOwned>(&self, slot: Slot) -> Result<Option<T>> {
        match self.get(slot.key())? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, slot: Slot, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(slot.key(), &raw)
    }

    fn clear(&mut self, slot: Slot) -> Result<()> {
        self.remove(slot.key())
    }
}

impl<S: KeyValueStore + ?Sized> SlotExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keys_are_distinct() {
        let slots = [
            Slot::Users,
            Slot::Session,
            Slot::CsrfToken,
            Slot::PasswordChangeRequired,
            Slot::PasswordChangeMessage,
            Slot::ActivePage,
            Slot::LoginAttempts,
        ];
        let mut keys: Vec<_> = slots.iter().map(|s| s.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), slots.len());
        assert_eq!(Slot::Users.key(), "app_users");
        assert_eq!(Slot::Session.key(), "user_session");
    }

    #[test]
    fn test_typed_slot_access() {
        let mut store = MemoryStore::new();
        assert!(store.read::<String>(Slot::ActivePage).unwrap().is_none());

        store.write(Slot::ActivePage, "reports").unwrap();
        assert_eq!(store.get("active_page").unwrap().as_deref(), Some("\"reports\""));
        assert_eq!(
            store.read::<String>(Slot::ActivePage).unwrap().as_deref(),
            Some("reports")
        );

        store.clear(Slot::ActivePage).unwrap();
        assert!(store.read::<String>(Slot::ActivePage).unwrap().is_none());
    }

    #[test]
    fn test_malformed_slot_is_an_error() {
        let mut store = MemoryStore::new();
        store.set("app_users", "{not json").unwrap();
        assert!(store.read::<Vec<String>>(Slot::Users).is_err());
    }
}
