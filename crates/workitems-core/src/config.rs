use crate::error::{Result, ValidationError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ToolSettings
// ---------------------------------------------------------------------------

/// Per-tool overrides. An unset `command` means "locate the default binary".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

// ---------------------------------------------------------------------------
// ValidationSettings
// ---------------------------------------------------------------------------

/// Run-wide knobs passed explicitly into every validator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationSettings {
    #[serde(default)]
    pub verbose: bool,
    /// Per-step bound on tool runtime. `0` disables the bound.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_base_config")]
    pub base_config: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub type_check: ToolSettings,
    #[serde(default)]
    pub lint: ToolSettings,
    /// Setting `circular.command` switches cycle detection from the built-in
    /// import graph to an external madge-compatible tool.
    #[serde(default)]
    pub circular: ToolSettings,
}

fn default_timeout() -> u64 {
    300
}

fn default_parallel() -> bool {
    true
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_base_config() -> PathBuf {
    PathBuf::from("tsconfig.json")
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            timeout_seconds: default_timeout(),
            parallel: default_parallel(),
            source_dir: default_source_dir(),
            base_config: default_base_config(),
            extensions: default_extensions(),
            type_check: ToolSettings::default(),
            lint: ToolSettings::default(),
            circular: ToolSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    validation: Option<ValidationSettings>,
}

impl ValidationSettings {
    /// Load the `validation:` section of `.workitems/config.yaml`.
    /// A missing file or section yields defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(&data)
            .map_err(|e| ValidationError::Config(format!("{}: {e}", path.display())))?;
        Ok(file.validation.unwrap_or_default())
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_seconds))
        }
    }

    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.source_dir)
    }

    pub fn base_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.base_config)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.extensions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "extensions is empty: no source files will be analyzed".to_string(),
            });
        }
        for ext in &self.extensions {
            if ext.starts_with('.') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("extension '{ext}' should be listed without a leading dot"),
                });
            }
        }

        if self.source_dir.is_absolute() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "source_dir '{}' is absolute; it should be relative to the project root",
                    self.source_dir.display()
                ),
            });
        }

        if self.base_config.extension().and_then(|e| e.to_str()) != Some("json") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "base_config '{}' does not look like a JSON config",
                    self.base_config.display()
                ),
            });
        }

        for (name, tool) in [
            ("type_check", &self.type_check),
            ("lint", &self.lint),
            ("circular", &self.circular),
        ] {
            if tool.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{name}.command is empty"),
                });
            }
        }

        warnings
    }
}
