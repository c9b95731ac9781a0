//! Critical checks that run over raw file text, independent of the extracted model.

use std::path::{Path, PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ChecksConfig;
use crate::error::Result;
use super::rules::line_at;
use super::scanner::{Corpus, SourceFile};

const NATIVE_ARRAY_DESCRIPTION: &str = "using var with NativeArray - unsafe in IL2CPP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiPatternFinding {
    pub file: String,

    /// 1-based
    pub line: usize,

    pub description: String,
}

/// A check that looks at one file at a time
pub trait FileCheck {
    fn name(&self) -> &str;

    fn check(&self, file: &SourceFile) -> Vec<AntiPatternFinding>;

    fn check_corpus(&self, corpus: &Corpus) -> Vec<AntiPatternFinding> {
        corpus.files.iter().flat_map(|file| self.check(file)).collect()
    }
}

/// Flags `using var` over temp-allocated native arrays.
///
/// Generic calls such as `ToComponentDataArray<T>(Allocator.Temp)` match too.
/// The second shape is a subset of the first, so component-data arrays are
/// reported once per shape.
pub struct UnsafeAllocationCheck {
    patterns: Vec<(Regex, &'static str)>,
}

impl UnsafeAllocationCheck {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![
                (
                    Regex::new(r"using\s+var\s+\w+\s*=.*?\.To\w+Array\w*(?:<[^>]+>)?\(Allocator\.Temp\)")?,
                    NATIVE_ARRAY_DESCRIPTION,
                ),
                (
                    Regex::new(r"using\s+var\s+\w+\s*=.*?\.ToComponentDataArray\w*(?:<[^>]+>)?\(Allocator\.Temp\)")?,
                    NATIVE_ARRAY_DESCRIPTION,
                ),
            ],
        })
    }
}

impl FileCheck for UnsafeAllocationCheck {
    fn name(&self) -> &str {
        "unsafe-allocation"
    }

    fn check(&self, file: &SourceFile) -> Vec<AntiPatternFinding> {
        let mut findings = Vec::new();
        for (pattern, description) in &self.patterns {
            for m in pattern.find_iter(&file.content) {
                findings.push(AntiPatternFinding {
                    file: file.display_path.clone(),
                    line: line_at(&file.content, m.start()),
                    description: description.to_string(),
                });
            }
        }
        findings
    }
}

/// Flags config paths whose literal segment uses the miscased project name
pub struct ConfigPathCheck {
    path_regex: Regex,
    canonical_name: String,
    miscased_name: String,
}

impl ConfigPathCheck {
    pub fn new(config: &ChecksConfig) -> Result<Self> {
        Ok(Self {
            path_regex: Regex::new(r#"Path\.Combine\s*\(\s*Paths\.ConfigPath\s*,\s*"([^"]+)""#)?,
            canonical_name: config.canonical_name.clone(),
            miscased_name: config.miscased_name.clone(),
        })
    }

    fn is_miscased(&self, segment: &str) -> bool {
        segment.contains(&self.miscased_name) && !segment.contains(&self.canonical_name)
    }
}

impl FileCheck for ConfigPathCheck {
    fn name(&self) -> &str {
        "config-path"
    }

    fn check(&self, file: &SourceFile) -> Vec<AntiPatternFinding> {
        self.path_regex
            .captures_iter(&file.content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let segment = caps.get(1)?.as_str();
                if !self.is_miscased(segment) {
                    return None;
                }
                Some(AntiPatternFinding {
                    file: file.display_path.clone(),
                    line: line_at(&file.content, whole.start()),
                    description: format!("Wrong path: {}", segment),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchLoadingStatus {
    Registered,
    NotRegistered,
    EntryPointMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchLoadingReport {
    /// File name of the entry point, as shown in the report
    pub entry_point: String,
    pub registration_call: String,
    pub status: PatchLoadingStatus,
    pub warnings: Vec<String>,
}

impl PatchLoadingReport {
    pub fn loads_patches(&self) -> bool {
        self.status == PatchLoadingStatus::Registered
    }
}

/// Checks that the plugin entry point registers its patches
pub struct PatchLoadingCheck {
    entry_point: PathBuf,
    registration_call: String,
}

impl PatchLoadingCheck {
    pub fn new(entry_point: &Path, config: &ChecksConfig) -> Self {
        Self {
            entry_point: entry_point.to_path_buf(),
            registration_call: config.registration_call.clone(),
        }
    }

    /// Reads the entry point with a lossy decode, so a file the corpus scanner
    /// skips as invalid UTF-8 is still checked for the registration call.
    pub fn run(&self) -> PatchLoadingReport {
        let entry_name = self
            .entry_point
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.entry_point.display().to_string());

        let missing = PatchLoadingReport {
            entry_point: entry_name,
            registration_call: self.registration_call.clone(),
            status: PatchLoadingStatus::EntryPointMissing,
            warnings: vec![],
        };

        if !self.entry_point.is_file() {
            return missing;
        }
        let content = match std::fs::read(&self.entry_point) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Error reading {}: {}", self.entry_point.display(), e);
                return missing;
            }
        };

        PatchLoadingReport {
            status: self.status_of(&content),
            warnings: Self::risky_patterns(&content),
            ..missing
        }
    }

    fn status_of(&self, content: &str) -> PatchLoadingStatus {
        if content.contains(&self.registration_call) {
            PatchLoadingStatus::Registered
        } else {
            PatchLoadingStatus::NotRegistered
        }
    }

    fn risky_patterns(content: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        if content.contains("typeof(Patches)") {
            warnings.push("typeof(Patches) - this type may not exist".to_string());
        }
        if content.contains("GetType") && content.contains("Patch") {
            warnings.push("Dynamic type lookup for patches - may fail".to_string());
        }
        warnings
    }
}

/// Results of all three critical checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorFindings {
    pub unsafe_patterns: Vec<AntiPatternFinding>,
    pub patch_loading: PatchLoadingReport,
    pub config_paths: Vec<AntiPatternFinding>,
}

impl DetectorFindings {
    /// Whether nothing needs attention
    pub fn is_clean(&self) -> bool {
        self.unsafe_patterns.is_empty()
            && self.config_paths.is_empty()
            && self.patch_loading.loads_patches()
            && self.patch_loading.warnings.is_empty()
    }
}

pub struct CriticalChecks {
    unsafe_allocation: UnsafeAllocationCheck,
    config_path: ConfigPathCheck,
    patch_loading: PatchLoadingCheck,
}

impl CriticalChecks {
    pub fn new(entry_point: &Path, config: &ChecksConfig) -> Result<Self> {
        Ok(Self {
            unsafe_allocation: UnsafeAllocationCheck::new()?,
            config_path: ConfigPathCheck::new(config)?,
            patch_loading: PatchLoadingCheck::new(entry_point, config),
        })
    }

    pub fn run(&self, corpus: &Corpus) -> DetectorFindings {
        let unsafe_patterns = self.unsafe_allocation.check_corpus(corpus);
        debug!("{}: {} findings", self.unsafe_allocation.name(), unsafe_patterns.len());

        let config_paths = self.config_path.check_corpus(corpus);
        debug!("{}: {} findings", self.config_path.name(), config_paths.len());

        DetectorFindings {
            unsafe_patterns,
            patch_loading: self.patch_loading.run(),
            config_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn source(content: &str) -> SourceFile {
        SourceFile {
            display_path: "Core/Query.cs".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_unsafe_allocation_lines() {
        let content = r#"void Run()
{
    using var entities = query.ToEntityArray(Allocator.Temp);
    var safe = query.ToEntityArray(Allocator.Temp);
    using var data = query.ToComponentDataArray<Health>(Allocator.Temp);
}"#;
        let findings = UnsafeAllocationCheck::new().unwrap().check(&source(content));
        let lines: Vec<usize> = findings.iter().map(|f| f.line).collect();

        // line 5 matches both shapes
        assert_eq!(lines, vec![3, 5, 5]);
        assert!(findings.iter().all(|f| f.description == NATIVE_ARRAY_DESCRIPTION));
        assert_eq!(findings[0].file, "Core/Query.cs");
    }

    #[test]
    fn test_unsafe_allocation_ignores_persistent_allocator() {
        let content = "using var entities = query.ToEntityArray(Allocator.Persistent);";
        assert!(UnsafeAllocationCheck::new().unwrap().check(&source(content)).is_empty());
    }

    #[test]
    fn test_config_path_casing() {
        let check = ConfigPathCheck::new(&ChecksConfig::default()).unwrap();
        let content = r#"
var a = Path.Combine(Paths.ConfigPath, "CycleBorn/settings.json");
var b = Path.Combine(Paths.ConfigPath, "Cycleborn/settings.json");
var c = Path.Combine( Paths.ConfigPath , "CycleBorn/Cycleborn.json");
"#;
        let findings = check.check(&source(content));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].description, "Wrong path: CycleBorn/settings.json");
    }

    #[test]
    fn test_patch_loading_registered_with_warnings() {
        let temp = TempDir::new().unwrap();
        let plugin = temp.child("Plugin.cs");
        plugin
            .write_str("harmony.PatchAll(typeof(Patches));\nvar t = Type.GetType(\"MyPatch\");")
            .unwrap();

        let report = PatchLoadingCheck::new(plugin.path(), &ChecksConfig::default()).run();
        assert_eq!(report.status, PatchLoadingStatus::Registered);
        assert_eq!(report.entry_point, "Plugin.cs");
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_patch_loading_warnings_without_registration() {
        let temp = TempDir::new().unwrap();
        let plugin = temp.child("Plugin.cs");
        plugin.write_str("var t = Type.GetType(\"SpawnPatch\");").unwrap();

        let report = PatchLoadingCheck::new(plugin.path(), &ChecksConfig::default()).run();
        assert_eq!(report.status, PatchLoadingStatus::NotRegistered);
        assert_eq!(report.warnings, vec!["Dynamic type lookup for patches - may fail".to_string()]);
        assert!(!report.loads_patches());
    }

    #[test]
    fn test_patch_loading_reads_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let plugin = temp.child("Plugin.cs");
        let mut bytes = b"// \xff\n".to_vec();
        bytes.extend_from_slice(b"harmony.PatchAll();");
        plugin.write_binary(&bytes).unwrap();

        let report = PatchLoadingCheck::new(plugin.path(), &ChecksConfig::default()).run();
        assert_eq!(report.status, PatchLoadingStatus::Registered);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_patch_loading_missing_entry_point() {
        let temp = TempDir::new().unwrap();
        let report = PatchLoadingCheck::new(&temp.path().join("Plugin.cs"), &ChecksConfig::default()).run();

        assert_eq!(report.status, PatchLoadingStatus::EntryPointMissing);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_findings_clean() {
        let findings = DetectorFindings {
            unsafe_patterns: vec![],
            patch_loading: PatchLoadingReport {
                entry_point: "Plugin.cs".to_string(),
                registration_call: "PatchAll".to_string(),
                status: PatchLoadingStatus::Registered,
                warnings: vec![],
            },
            config_paths: vec![],
        };
        assert!(findings.is_clean());
    }
}
