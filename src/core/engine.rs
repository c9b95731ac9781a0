// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ApiScopeError;
use super::{
    ApiModel, CorpusScanner, CriticalChecks, DetectorFindings, FileExtractor, PatternRules,
    ReportRenderer, ReportSummary,
};
use super::scanner::Corpus;

/// Per-run overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub root: Option<PathBuf>,
    pub scan_dirs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Model and check results for one run
#[derive(Debug)]
pub struct Analysis {
    pub files_scanned: usize,
    pub model: ApiModel,
    pub findings: DetectorFindings,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: &'a str,
    summary: ReportSummary,
    model: &'a ApiModel,
    findings: &'a DetectorFindings,
}

/// Main orchestration engine: scan, extract, check, render
pub struct Engine {
    config: Config,
    rules: PatternRules,
    renderer: ReportRenderer,
}

impl Engine {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            rules: PatternRules::new().context("Failed to compile extraction rules")?,
            renderer: ReportRenderer::new(),
        })
    }

    /// Write the default configuration into `path` (or the current directory)
    pub fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let target = dir.join("apiscope.toml");
        if target.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", target.display());
        }

        Config::default().save(&target)?;
        info!("✅ Wrote default configuration to {}", target.display());
        Ok(())
    }

    /// Scan the corpus, build the model and run the critical checks
    pub fn analyze(&self) -> Result<Analysis> {
        let corpus = self.read_corpus()?;

        let extractor = FileExtractor::new(&self.rules, &self.config.scanning);
        let mut model = ApiModel::new();
        for file in &corpus.files {
            extractor.extract(file, &mut model);
        }

        let findings = self.run_checks(&corpus)?;

        Ok(Analysis {
            files_scanned: corpus.files.len(),
            model,
            findings,
        })
    }

    /// Full run: write the text report and, if asked, a JSON export
    pub fn generate(&mut self, overrides: RunOverrides, json: Option<PathBuf>) -> Result<ReportSummary> {
        self.apply_overrides(&overrides);
        let output = overrides
            .output
            .unwrap_or_else(|| self.config.output_path());

        info!("🔍 Generating API report for {}", self.config.project.name);
        let analysis = self.analyze()?;
        let generated_at = timestamp();
        let report = self.renderer.render(&analysis.model, &analysis.findings, &generated_at);

        write_file(&output, &report)?;
        info!("✅ Report written to: {}", output.display());

        let summary = analysis.model.summary();
        if let Some(json_path) = json {
            let export = JsonExport {
                generated_at: &generated_at,
                summary,
                model: &analysis.model,
                findings: &analysis.findings,
            };
            let body = serde_json::to_string_pretty(&export).map_err(ApiScopeError::from)?;
            write_file(&json_path, &body)?;
            info!("✅ JSON export written to: {}", json_path.display());
        }

        info!("[Summary] ({} files scanned)", analysis.files_scanned);
        info!("  Namespaces: {}", summary.namespaces);
        info!("  Types: {}", summary.types);
        info!("  Harmony Patches: {}", summary.patches);
        info!("  Events: {}", summary.events);
        info!("  Config Entries: {}", summary.config_entries);

        Ok(summary)
    }

    /// Run only the critical checks; `strict` turns any finding into an error
    pub fn check(&mut self, overrides: RunOverrides, strict: bool) -> Result<DetectorFindings> {
        self.apply_overrides(&overrides);
        let corpus = self.read_corpus()?;
        let findings = self.run_checks(&corpus)?;

        for finding in findings.unsafe_patterns.iter().chain(&findings.config_paths) {
            warn!("{}:{} {}", finding.file, finding.line, finding.description);
        }
        let patch_loading = &findings.patch_loading;
        if patch_loading.loads_patches() {
            info!("✅ {} found in {}", patch_loading.registration_call, patch_loading.entry_point);
        } else {
            warn!(
                "{} does not register patches with {} ({:?})",
                patch_loading.entry_point, patch_loading.registration_call, patch_loading.status
            );
        }
        for warning in &patch_loading.warnings {
            warn!("{}", warning);
        }

        if strict && !findings.is_clean() {
            let count = findings.unsafe_patterns.len()
                + findings.config_paths.len()
                + patch_loading.warnings.len()
                + usize::from(!patch_loading.loads_patches());
            return Err(ApiScopeError::CheckFailed(format!("{} issue(s) found", count)).into());
        }

        if findings.is_clean() {
            info!("🎉 No critical issues found");
        }
        Ok(findings)
    }

    fn apply_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(root) = &overrides.root {
            self.config.project.root = root.clone();
        }
        if !overrides.scan_dirs.is_empty() {
            self.config.project.scan_dirs = overrides.scan_dirs.clone();
        }
    }

    fn read_corpus(&self) -> Result<Corpus> {
        let scanner = CorpusScanner::new(
            &self.config.project.root,
            &self.config.scanning,
            &self.config.project.exclude_patterns,
        );
        let corpus = scanner.scan(&self.config.scan_roots())?;
        Ok(corpus)
    }

    fn run_checks(&self, corpus: &Corpus) -> Result<DetectorFindings> {
        let checks = CriticalChecks::new(&self.config.entry_point_path(), &self.config.checks)
            .context("Failed to compile check patterns")?;
        Ok(checks.run(corpus))
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
