use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::views::{SortOrder, TimeTrackingSort};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "RecordDesk";
const APP_NAME: &str = "recdesk";

pub const DEFAULT_STORAGE_KEY: &str = "userRecords";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            default_cfg.post_load(&self.paths)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub export_dir: PathBuf,
    pub print_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("RECDESK_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("RECDESK_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));

        Ok(Self::rooted(config_dir, config_file, data_root, state_dir))
    }

    /// Lays out every derived path under the given roots.
    pub fn rooted(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            config_dir,
            config_file,
            database_path: data_dir.join("records.db"),
            export_dir: data_dir.join("exports"),
            print_dir: data_dir.join("print"),
            data_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.export_dir,
            &self.print_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageOptions,
    pub export: ExportOptions,
    pub time_tracking: TimeTrackingOptions,
    pub dashboard: DashboardOptions,
    pub search: SearchOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        self.export.resolve(paths);
        if self.storage.storage_key.trim().is_empty() {
            tracing::warn!("empty storage key in config, falling back to {DEFAULT_STORAGE_KEY}");
            self.storage.storage_key = DEFAULT_STORAGE_KEY.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    /// Key under which the JSON record list lives
    pub storage_key: String,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Empty means `<data dir>/exports`
    pub export_dir: PathBuf,
    /// Empty means `<data dir>/print`
    pub print_dir: PathBuf,
    /// Hand printable documents to the platform opener
    pub open_printed: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::new(),
            print_dir: PathBuf::new(),
            open_printed: true,
        }
    }
}

impl ExportOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.export_dir.as_os_str().is_empty() {
            self.export_dir = paths.export_dir.clone();
        }
        if self.print_dir.as_os_str().is_empty() {
            self.print_dir = paths.print_dir.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeTrackingOptions {
    pub default_sort: TimeTrackingSort,
    pub default_order: SortOrder,
}

impl Default for TimeTrackingOptions {
    fn default() -> Self {
        Self {
            default_sort: TimeTrackingSort::Days,
            default_order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardOptions {
    pub recent_window_days: i64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            recent_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: 200 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        ConfigPaths::rooted(
            base.join("config"),
            base.join("config/config.toml"),
            base.join("data"),
            base.join("state"),
        )
    }

    #[test]
    fn first_run_writes_default_config() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let loader = ConfigLoader::from_paths(paths.clone());

        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.storage.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(cfg.storage.database_path, paths.database_path);
        assert_eq!(cfg.export.export_dir, paths.export_dir);
        assert_eq!(cfg.dashboard.recent_window_days, 7);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_sections() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[time_tracking]\ndefault_sort = \"name\"\ndefault_order = \"asc\"\n\n[storage]\nstorage_key = \"\"\n",
        )?;

        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.time_tracking.default_sort, TimeTrackingSort::Name);
        assert_eq!(cfg.time_tracking.default_order, SortOrder::Asc);
        assert_eq!(cfg.storage.storage_key, DEFAULT_STORAGE_KEY);
        assert!(cfg.export.open_printed);
        Ok(())
    }
}
