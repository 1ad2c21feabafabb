use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::library::{EnvLibrary, FixedLibrary, LibraryLocator};
use crate::util::write_atomic;

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Workspace-level configuration for path management.
/// 工作區層級的路徑管理設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub layout: ProjectLayout,
    #[serde(default)]
    pub library: LibrarySettings,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            layout: ProjectLayout::default(),
            library: LibrarySettings::default(),
        }
    }
}

impl Config {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        self.layout.sanitize();
    }

    /// Builds the library locator described by the `library` section.
    /// 依 `library` 區段建立函式庫路徑提供者。
    pub fn library_locator(&self) -> Box<dyn LibraryLocator> {
        match &self.library.path {
            Some(path) => Box::new(FixedLibrary::new(path.clone())),
            None => Box::new(EnvLibrary::default()),
        }
    }
}

/// Names of the special files and folders a project carries.
/// 專案中具特殊意義的檔案與資料夾名稱。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    #[serde(default = "default_paths_file")]
    pub paths_file: String,
    #[serde(default = "default_external_sources_folder")]
    pub external_sources_folder: String,
    #[serde(default = "default_external_sources_property")]
    pub external_sources_property: String,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    #[serde(default = "default_settings_folder")]
    pub settings_folder: String,
    #[serde(default = "default_build_output_folder")]
    pub build_output_folder: String,
    #[serde(default = "default_hyperlinks_folder")]
    pub hyperlinks_folder: String,
    #[serde(default = "default_excluded_segment")]
    pub excluded_segment: String,
}

fn default_paths_file() -> String {
    ".paths".to_string()
}

fn default_external_sources_folder() -> String {
    ".DebuggerSourceLookup".to_string()
}

fn default_external_sources_property() -> String {
    "camlpad.externalSources".to_string()
}

fn default_source_extension() -> String {
    "ml".to_string()
}

fn default_settings_folder() -> String {
    ".settings".to_string()
}

fn default_build_output_folder() -> String {
    "_externalFiles".to_string()
}

fn default_hyperlinks_folder() -> String {
    ".HyperLinks".to_string()
}

fn default_excluded_segment() -> String {
    "_build".to_string()
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            paths_file: default_paths_file(),
            external_sources_folder: default_external_sources_folder(),
            external_sources_property: default_external_sources_property(),
            source_extension: default_source_extension(),
            settings_folder: default_settings_folder(),
            build_output_folder: default_build_output_folder(),
            hyperlinks_folder: default_hyperlinks_folder(),
            excluded_segment: default_excluded_segment(),
        }
    }
}

impl ProjectLayout {
    fn sanitize(&mut self) {
        fn fill(value: &mut String, fallback: fn() -> String) {
            if value.trim().is_empty() {
                *value = fallback();
            }
        }
        fill(&mut self.paths_file, default_paths_file);
        fill(
            &mut self.external_sources_folder,
            default_external_sources_folder,
        );
        fill(
            &mut self.external_sources_property,
            default_external_sources_property,
        );
        fill(&mut self.settings_folder, default_settings_folder);
        fill(&mut self.build_output_folder, default_build_output_folder);
        fill(&mut self.hyperlinks_folder, default_hyperlinks_folder);
        fill(&mut self.excluded_segment, default_excluded_segment);

        let extension = self.source_extension.trim().trim_start_matches('.');
        self.source_extension = if extension.is_empty() {
            default_source_extension()
        } else {
            extension.to_string()
        };
    }

    /// Folders that never belong on a path list.
    pub(crate) fn is_reserved_folder(&self, name: &str) -> bool {
        name == self.settings_folder
            || name == self.build_output_folder
            || name == self.hyperlinks_folder
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Fixed library location; `OCAMLLIB` is consulted when absent.
    #[serde(
        default,
        with = "crate::serde_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<PathBuf>,
}

/// Loads and saves [`Config`] as pretty JSON.
/// 以 JSON 讀寫 [`Config`]。
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: Config,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            data: config,
        }
    }

    /// Loads the config, falling back to defaults when the file is missing.
    /// 載入設定；檔案不存在時使用預設值。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                data: Config::default(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn config(&self) -> &Config {
        &self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let payload =
            serde_json::to_vec_pretty(&self.data).map_err(|source| ConfigError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &payload).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
