//! Configuration for Labbook
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, or `config.toml` in the platform
//!    config directory when present)
//! 3. Environment variables such as `LABBOOK__EDITOR__MAX_CANDIDATES=5`

use crate::editor::{
    EditorSettings, KeyChord, KindTable, DEFAULT_MAX_CANDIDATES, DEFAULT_WORD_SEPARATORS,
};
use crate::error::{LabbookError, Result};
use crate::types::EntityKind;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "LABBOOK";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "labbook.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "labbook", "labbook")
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".labbook"))
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabbookConfig {
    pub editor: EditorConfig,
    pub storage: StorageConfig,
}

/// Editor behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Characters that end a word, besides whitespace
    pub word_separators: String,

    /// Maximum candidates shown in the completion list
    pub max_candidates: usize,

    pub triggers: TriggerConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            word_separators: DEFAULT_WORD_SEPARATORS.to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            triggers: TriggerConfig::default(),
        }
    }
}

/// Trigger chord per entity kind, written like `ctrl+t`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub tag: String,
    pub reference: String,
    pub dataset: String,
    pub protocol: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            tag: "ctrl+t".to_string(),
            reference: "ctrl+r".to_string(),
            dataset: "ctrl+d".to_string(),
            protocol: "ctrl+p".to_string(),
        }
    }
}

impl TriggerConfig {
    fn chord(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Tag => &self.tag,
            EntityKind::Reference => &self.reference,
            EntityKind::Dataset => &self.dataset,
            EntityKind::Protocol => &self.protocol,
        }
    }

    /// Parse every chord; malformed or duplicate chords are rejected
    pub fn resolve(&self) -> Result<KindTable> {
        let triggers = EntityKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.chord(kind).parse::<KeyChord>()?)))
            .collect::<Result<Vec<_>>>()?;
        KindTable::new(triggers)
    }
}

/// Where links and entry files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `labbook.db` inside `data_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Effective database location
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILE))
    }
}

impl LabbookConfig {
    /// Load the layered configuration
    ///
    /// An explicit `path` must exist; the default config file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.editor.max_candidates == 0 {
            return Err(LabbookError::Config(config::ConfigError::Message(
                "editor.max_candidates must be at least 1".to_string(),
            )));
        }
        self.editor.triggers.resolve()?;
        Ok(())
    }

    /// Editor settings with trigger chords resolved
    pub fn editor_settings(&self) -> Result<EditorSettings> {
        Ok(EditorSettings {
            kinds: self.editor.triggers.resolve()?,
            word_separators: self.editor.word_separators.clone(),
            max_candidates: self.editor.max_candidates,
        })
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LabbookError::Config(config::ConfigError::Message(e.to_string())))
    }
}
