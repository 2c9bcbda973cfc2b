//! User repository over the `app_users` slot.
//!
//! The effective user set is the two built-in accounts plus whatever is stored.
//! A stored record that reuses a built-in id is a *shadow*: it replaces the
//! built-in for every lookup (this is how built-in passwords get changed).
//! Built-ins themselves are never written and can never be deleted.

use crate::error::{Error, Result};
use crate::model::{built_in, BuiltIn, Role, User, BUILT_INS};
use crate::store::{KeyValueStore, Slot, SlotExt};

pub struct UserRepository<S> {
    kv: S,
}

/// Map a login alias (`admin`) to the canonical built-in id (`A001`)
pub fn canonical_id(identifier: &str) -> &str {
    BUILT_INS
        .iter()
        .find(|b| b.alias == identifier)
        .map_or(identifier, |b| b.id)
}

fn is_built_in_id(id: &str) -> bool {
    BUILT_INS.iter().any(|b| b.id == id)
}

/// The shadow record for `b` if one is stored, otherwise the built-in itself
fn resolve_built_in(b: &BuiltIn, stored: &[User]) -> User {
    stored
        .iter()
        .find(|u| u.id == b.id)
        .cloned()
        .unwrap_or_else(|| b.to_user())
}

impl<S: KeyValueStore> UserRepository<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    /// Records exactly as persisted, shadows included
    pub fn stored(&self) -> Result<Vec<User>> {
        Ok(self.kv.read(Slot::Users)?.unwrap_or_default())
    }

    fn save(&mut self, users: &[User]) -> Result<()> {
        self.kv.write(Slot::Users, users)
    }

    /// Effective user set: built-ins (or their shadows) first, then created users
    pub fn all(&self) -> Result<Vec<User>> {
        let stored = self.stored()?;
        let mut users: Vec<User> = BUILT_INS
            .iter()
            .map(|b| resolve_built_in(b, &stored))
            .collect();
        users.extend(stored.into_iter().filter(|u| !is_built_in_id(&u.id)));
        Ok(users)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let stored = self.stored()?;
        if let Some(b) = BUILT_INS.iter().find(|b| b.id == id) {
            return Ok(Some(resolve_built_in(b, &stored)));
        }
        Ok(stored.into_iter().find(|u| u.id == id))
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let stored = self.stored()?;
        if let Some(b) = BUILT_INS.iter().find(|b| b.email == email) {
            return Ok(Some(resolve_built_in(b, &stored)));
        }
        Ok(stored.into_iter().find(|u| u.email == email))
    }

    /// Insert `user`, replacing any stored record with the same id
    pub fn upsert(&mut self, user: User) -> Result<()> {
        let mut stored = self.stored()?;
        match stored.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => stored.push(user),
        }
        self.save(&stored)
    }

    /// Replace the stored record whose email is `email`. Returns false if none matched.
    pub fn replace_by_email(&mut self, email: &str, user: User) -> Result<bool> {
        let mut stored = self.stored()?;
        let Some(existing) = stored.iter_mut().find(|u| u.email == email) else {
            return Ok(false);
        };
        *existing = user;
        self.save(&stored)?;
        Ok(true)
    }

    /// Remove every stored record whose email or id equals `identifier`
    pub fn delete(&mut self, identifier: &str) -> Result<usize> {
        if let Some(b) = built_in(identifier) {
            return Err(Error::BuiltInProtected(b.email.to_string()));
        }
        let mut stored = self.stored()?;
        let before = stored.len();
        stored.retain(|u| u.email != identifier && u.id != identifier);
        let removed = before - stored.len();
        if removed > 0 {
            self.save(&stored)?;
        }
        Ok(removed)
    }

    /// Next sequential id for `role`: highest stored suffix (at least the
    /// built-in's 1) plus one
    pub fn next_id(&self, role: Role) -> Result<String> {
        let highest = self
            .stored()?
            .iter()
            .filter(|u| u.role == role)
            .filter_map(|u| role.id_number(&u.id))
            .chain(std::iter::once(1))
            .max()
            .unwrap_or(1);
        Ok(role.format_id(highest + 1))
    }
}
