use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ApiScopeError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project layout and output location
    pub project: ProjectConfig,

    /// Source file selection and lookahead windows
    pub scanning: ScanningConfig,

    /// Settings for the critical checks
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, shown in logs only
    pub name: String,

    /// Project root; report paths are relative to it
    pub root: PathBuf,

    /// Directories to scan, relative to `root`
    pub scan_dirs: Vec<PathBuf>,

    /// Gitignore-style globs excluded from every scan directory
    pub exclude_patterns: Vec<String>,

    /// Report destination, relative to `root`
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// File extensions to scan, without the leading dot
    pub extensions: Vec<String>,

    /// Characters after a type declaration searched for a bare `[HarmonyPatch]`
    pub patch_marker_window: usize,

    /// Characters after a class-scoped patch searched for prefix/postfix methods
    pub patch_class_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Plugin entry point, relative to `root`
    pub entry_point: PathBuf,

    /// Call that registers every patch class
    pub registration_call: String,

    /// Correct spelling of the project name inside config paths
    pub canonical_name: String,

    /// Spelling that marks a config path as wrong
    pub miscased_name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "VAutomationCore".to_string(),
            root: PathBuf::from("."),
            scan_dirs: vec![
                PathBuf::from("Bluelock"),
                PathBuf::from("Core"),
                PathBuf::from("Patches"),
                PathBuf::from("CycleBorn"),
            ],
            exclude_patterns: vec![],
            output_file: PathBuf::from("Bluelock/config/debug_api_report.txt"),
        }
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["cs".to_string()],
            patch_marker_window: 500,
            patch_class_window: 3000,
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            entry_point: PathBuf::from("Bluelock/Plugin.cs"),
            registration_call: "PatchAll".to_string(),
            canonical_name: "Cycleborn".to_string(),
            miscased_name: "CycleBorn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ApiScopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ApiScopeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(ApiScopeError::Config(format!(
                        "config file {} does not exist",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                let candidates = ["ApiScope.toml", "apiscope.toml", ".apiscope.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Absolute-or-cwd-relative directories to scan, in configured order
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        self.project
            .scan_dirs
            .iter()
            .map(|dir| self.project.root.join(dir))
            .collect()
    }

    pub fn output_path(&self) -> PathBuf {
        self.project.root.join(&self.project.output_file)
    }

    pub fn entry_point_path(&self) -> PathBuf {
        self.project.root.join(&self.checks.entry_point)
    }

    fn validate(&self) -> Result<()> {
        if self.scanning.extensions.is_empty() {
            return Err(ApiScopeError::Config(
                "scanning.extensions must list at least one extension".to_string(),
            ));
        }
        if self.scanning.extensions.iter().any(|ext| ext.starts_with('.')) {
            return Err(ApiScopeError::Config(
                "scanning.extensions must not include the leading dot".to_string(),
            ));
        }
        if self.checks.registration_call.trim().is_empty() {
            return Err(ApiScopeError::Config(
                "checks.registration_call must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_project_layout() {
        let config = Config::default();
        let roots = config.scan_roots();

        assert_eq!(roots.len(), 4);
        assert_eq!(roots[0], PathBuf::from("./Bluelock"));
        assert_eq!(config.entry_point_path(), PathBuf::from("./Bluelock/Plugin.cs"));
        assert_eq!(config.scanning.patch_marker_window, 500);
        assert_eq!(config.scanning.patch_class_window, 3000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apiscope.toml");
        std::fs::write(&path, "[project]\nscan_dirs = [\"Mods\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.project.scan_dirs, vec![PathBuf::from("Mods")]);
        assert_eq!(config.scanning.extensions, vec!["cs".to_string()]);
        assert_eq!(config.checks.registration_call, "PatchAll");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apiscope.toml");
        let mut config = Config::default();
        config.project.name = "Sample".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.project.name, "Sample");
        assert_eq!(loaded.project.output_file, config.project.output_file);
    }

    #[test]
    fn test_rejects_dotted_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apiscope.toml");
        std::fs::write(&path, "[scanning]\nextensions = [\".cs\"]\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ApiScopeError::Config(_))));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        let result = Config::load_or_default(Some(dir.path().join("nope.toml")));
        assert!(result.is_err());
    }
}
