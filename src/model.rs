use serde::{Deserialize, Serialize};

/// Account role; decides the id prefix and whether user management is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Capitalized form shown in the user table
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }

    pub fn id_prefix(&self) -> char {
        match self {
            Self::Admin => 'A',
            Self::User => 'U',
        }
    }

    /// Format the n-th id for this role: `A001`, `U012`, `U1000`
    pub fn format_id(&self, number: u32) -> String {
        format!("{}{:03}", self.id_prefix(), number)
    }

    /// Numeric suffix of `id` if it carries this role's prefix
    pub fn id_number(&self, id: &str) -> Option<u32> {
        let digits = id.strip_prefix(self.id_prefix())?;
        if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_last_login() -> String {
    "-".to_string()
}

/// A user record as persisted in the `app_users` slot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    /// Plaintext; see `password::stored_form`
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub first_login: bool,
    #[serde(rename = "lastLogin", default = "default_last_login")]
    pub last_login: String,
}

/// One of the two seed accounts that always exist
#[derive(Debug)]
pub struct BuiltIn {
    pub id: &'static str,
    /// Identifier accepted on the login screen
    pub alias: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
    pub last_login: &'static str,
}

pub const BUILT_INS: [BuiltIn; 2] = [
    BuiltIn {
        id: "A001",
        alias: "admin",
        name: "Admin User",
        email: "admin@inwi.com",
        password: "admin123",
        role: Role::Admin,
        last_login: "2023-10-01",
    },
    BuiltIn {
        id: "U001",
        alias: "user",
        name: "Regular User",
        email: "user@inwi.com",
        password: "user123",
        role: Role::User,
        last_login: "2023-09-30",
    },
];

impl BuiltIn {
    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            name: self.name.to_string(),
            email: self.email.to_string(),
            password: self.password.to_string(),
            role: self.role,
            first_login: false,
            last_login: self.last_login.to_string(),
        }
    }
}

/// Find the built-in account named by id, login alias or email
pub fn built_in(identifier: &str) -> Option<&'static BuiltIn> {
    BUILT_INS
        .iter()
        .find(|b| b.id == identifier || b.alias == identifier || b.email == identifier)
}
