use crate::model::{Role, User};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// The single active login, persisted in the `user_session` slot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub first_login: bool,
    /// Absolute expiry, epoch milliseconds
    pub expiry: i64,
    /// Display name, only present once a profile edit set it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Session {
    pub fn for_user(user: &User, now_ms: i64, lifetime: Duration) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            first_login: user.first_login,
            expiry: now_ms.saturating_add(lifetime.num_milliseconds()),
            name: None,
        }
    }

    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expiry > now_ms
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Decode raw slot text into a live session.
///
/// Missing, unparsable and expired values are all `None`; the caller discards
/// the slot in each of those cases.
pub fn parse_live(raw: Option<&str>, now_ms: i64) -> Option<Session> {
    let session: Session = serde_json::from_str(raw?).ok()?;
    session.is_live(now_ms).then_some(session)
}
