//! Stand-ins for long-running work. Each action blocks for a fixed delay and
//! then succeeds with a canned message; there is no failure path.

use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use std::path::Path;
use std::time::Duration;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RunTest,
    WebServices(Vec<String>),
    Download(String),
}

impl Action {
    fn delay(&self, cfg: &SimulationConfig) -> Duration {
        let ms = match self {
            Self::RunTest => cfg.run_test_ms(),
            Self::WebServices(_) => cfg.web_services_ms(),
            Self::Download(_) => cfg.download_ms(),
        };
        Duration::from_millis(ms)
    }

    fn message(&self) -> String {
        match self {
            Self::RunTest => "Test execution started!".to_string(),
            Self::WebServices(tests) => format!("Running tests: {}", tests.join(", ")),
            Self::Download(report) => format!("Downloading report: {}", report),
        }
    }
}

/// Block for the action's delay and return its result message
pub fn run(action: &Action, cfg: &SimulationConfig) -> String {
    let delay = action.delay(cfg);
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
    action.message()
}

/// Gate for the web-services run: at least one test type and an imported data file
pub fn web_services(selected: &[String], data_file: Option<&Path>) -> Result<Action> {
    if selected.is_empty() {
        return Err(Error::validation("Please select at least one test type"));
    }
    match data_file {
        Some(path) if path.is_file() => Ok(Action::WebServices(selected.to_vec())),
        _ => Err(Error::validation("Please import a test data file")),
    }
}

/// What the import panel shows for a data file
#[derive(Debug, Clone)]
pub struct FilePreview {
    pub name: String,
    pub size_kb: String,
    pub content: String,
}

pub fn preview(path: &Path) -> Result<FilePreview> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut content: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        content.push_str("...");
    }

    Ok(FilePreview {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size_kb: format!("{:.2} KB", bytes.len() as f64 / 1024.0),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn instant() -> SimulationConfig {
        SimulationConfig::instant()
    }

    #[test]
    fn test_canned_messages() {
        let cfg = instant();
        assert_eq!(run(&Action::RunTest, &cfg), "Test execution started!");
        assert_eq!(
            run(&Action::Download("RPT-104".to_string()), &cfg),
            "Downloading report: RPT-104"
        );
        assert_eq!(
            run(
                &Action::WebServices(vec!["ChangeMP".to_string(), "Starcode".to_string()]),
                &cfg
            ),
            "Running tests: ChangeMP, Starcode"
        );
    }

    #[test]
    fn test_delay_is_honored() {
        let cfg = SimulationConfig {
            run_test_ms: Some(30),
            ..instant()
        };
        let start = std::time::Instant::now();
        run(&Action::RunTest, &cfg);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_web_services_gate() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.csv");
        std::fs::write(&file, "MDN,Amount\n2126,10\n").unwrap();
        let selected = vec!["ChangeMP".to_string()];

        assert!(web_services(&[], Some(&file)).is_err());
        assert!(web_services(&selected, None).is_err());
        assert!(web_services(&selected, Some(&dir.path().join("missing.csv"))).is_err());
        assert_eq!(
            web_services(&selected, Some(&file)).unwrap(),
            Action::WebServices(selected.clone())
        );
    }

    #[test]
    fn test_preview_truncates() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "x".repeat(2048)).unwrap();

        let p = preview(&file).unwrap();
        assert_eq!(p.name, "big.txt");
        assert_eq!(p.size_kb, "2.00 KB");
        assert_eq!(p.content.len(), PREVIEW_CHARS + 3);
        assert!(p.content.ends_with("..."));
    }
}
