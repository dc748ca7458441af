use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OnboardingState {
    popup_shown: bool,
}

/// Remembers whether the onboarding popup has been shown on this machine.
pub struct OnboardingStore {
    state_file_path: PathBuf,
}

impl OnboardingStore {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("app", "bundle-admin", "bundle-admin")
            .context("Failed to determine project directories")?;

        Ok(Self::with_path(proj_dirs.data_dir().join("onboarding.json")))
    }

    pub fn with_path(state_file_path: PathBuf) -> Self {
        Self { state_file_path }
    }

    /// A missing or unreadable state file counts as not shown.
    pub fn is_shown(&self) -> bool {
        fs::read_to_string(&self.state_file_path)
            .ok()
            .and_then(|contents| serde_json::from_str::<OnboardingState>(&contents).ok())
            .map(|state| state.popup_shown)
            .unwrap_or(false)
    }

    pub fn mark_shown(&self) -> Result<()> {
        if let Some(parent) = self.state_file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create onboarding state directory")?;
        }

        let contents = serde_json::to_string_pretty(&OnboardingState { popup_shown: true })
            .context("Failed to serialize onboarding state")?;
        fs::write(&self.state_file_path, contents)
            .context("Failed to write onboarding state file")?;

        tracing::debug!("Onboarding marked as shown at {:?}", self.state_file_path);
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        if self.state_file_path.exists() {
            fs::remove_file(&self.state_file_path)
                .context("Failed to remove onboarding state file")?;
            tracing::info!("Onboarding state reset");
        }
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.state_file_path
    }
}
