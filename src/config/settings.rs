use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::kdf::{DEFAULT_ITERATIONS, RECOMMENDED_MIN_ITERATIONS};
use crate::errors::{LockboxError, Result};

/// Project-level configuration, loaded from `.lockbox.toml`.
///
/// Every field has a sensible default so Lockbox works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Vault file path (relative to the directory the config lives in).
    #[serde(default = "default_vault_path")]
    pub vault_path: String,

    /// PBKDF2 iteration count used both to create and to open the vault.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_path() -> String {
    "lockbox.vault".to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            kdf_iterations: default_kdf_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".lockbox.toml";

    /// Load settings from `<project_dir>/.lockbox.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If it exists
    /// but cannot be parsed, or names zero iterations, an error is
    /// returned.  A weak but valid iteration count is only logged.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            LockboxError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject unusable values and warn about weak ones.
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < 1 {
            return Err(LockboxError::Config(
                "kdf_iterations must be at least 1".into(),
            ));
        }
        if self.kdf_iterations < RECOMMENDED_MIN_ITERATIONS {
            tracing::warn!(
                iterations = self.kdf_iterations,
                recommended = RECOMMENDED_MIN_ITERATIONS,
                "kdf_iterations is below the recommended minimum"
            );
        }
        Ok(())
    }

    /// Resolve the vault file path against the project directory.
    ///
    /// Example: `project_dir/lockbox.vault`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_path)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
