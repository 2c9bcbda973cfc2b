use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL record of what happened during one console run
pub struct ActivityLog {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl ActivityLog {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn login_ok(&mut self, user_id: &str, remember_me: bool) -> Result<()> {
        self.log(
            "login_ok",
            serde_json::json!({ "user_id": user_id, "remember_me": remember_me }),
        )
    }

    /// Failed or refused login; `reason` is the error text shown to the user
    pub fn login_failed(&mut self, identifier: &str, reason: &str) -> Result<()> {
        self.log(
            "login_failed",
            serde_json::json!({ "identifier": identifier, "reason": reason }),
        )
    }

    pub fn locked_out(&mut self, identifier: &str, until: DateTime<Utc>) -> Result<()> {
        self.log(
            "locked_out",
            serde_json::json!({ "identifier": identifier, "until": until }),
        )
    }

    pub fn logout(&mut self, user_id: &str) -> Result<()> {
        self.log("logout", serde_json::json!({ "user_id": user_id }))
    }

    pub fn session_expired(&mut self) -> Result<()> {
        self.log("session_expired", serde_json::json!({}))
    }

    pub fn password_changed(&mut self, user_id: &str, forced: bool) -> Result<()> {
        self.log(
            "password_changed",
            serde_json::json!({ "user_id": user_id, "forced": forced }),
        )
    }

    pub fn profile_updated(&mut self, user_id: &str, persisted: bool) -> Result<()> {
        self.log(
            "profile_updated",
            serde_json::json!({ "user_id": user_id, "persisted": persisted }),
        )
    }

    pub fn user_created(&mut self, by: &str, user_id: &str, role: &str) -> Result<()> {
        self.log(
            "user_created",
            serde_json::json!({ "by": by, "user_id": user_id, "role": role }),
        )
    }

    pub fn user_updated(&mut self, by: &str, email: &str, outcome: &str) -> Result<()> {
        self.log(
            "user_updated",
            serde_json::json!({ "by": by, "email": email, "outcome": outcome }),
        )
    }

    pub fn user_deleted(&mut self, by: &str, identifier: &str, removed: usize) -> Result<()> {
        self.log(
            "user_deleted",
            serde_json::json!({ "by": by, "identifier": identifier, "removed": removed }),
        )
    }

    /// Simulated work: test submissions, runs and downloads
    pub fn simulated(&mut self, user_id: &str, action: &str, detail: &str) -> Result<()> {
        self.log(
            "simulated",
            serde_json::json!({ "user_id": user_id, "action": action, "detail": detail }),
        )
    }
}
