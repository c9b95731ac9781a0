use std::path::{Component, Path, PathBuf};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::config::ScanningConfig;
use crate::error::{ApiScopeError, Result};

/// One decoded source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated
    pub display_path: String,

    pub content: String,
}

/// All files read in one run, in traversal order
#[derive(Debug, Default)]
pub struct Corpus {
    pub files: Vec<SourceFile>,

    /// Configured roots that did not exist
    pub missing_roots: Vec<PathBuf>,

    /// Files that could not be read or decoded
    pub skipped_files: Vec<PathBuf>,
}

/// Walks the configured roots and reads every eligible source file
pub struct CorpusScanner {
    project_root: PathBuf,
    extensions: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl CorpusScanner {
    pub fn new(project_root: &Path, config: &ScanningConfig, exclude_patterns: &[String]) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            extensions: config.extensions.clone(),
            exclude_patterns: exclude_patterns.to_vec(),
        }
    }

    /// Read every matching file under `roots`, root by root.
    ///
    /// Missing roots and unreadable files are logged and skipped.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<Corpus> {
        let mut corpus = Corpus::default();

        for root in roots {
            if !root.is_dir() {
                warn!("Directory not found: {}", root.display());
                corpus.missing_roots.push(root.clone());
                continue;
            }

            info!("Scanning {}...", root.display());
            self.scan_root(root, &mut corpus)?;
        }

        debug!(
            "Read {} files ({} skipped, {} missing roots)",
            corpus.files.len(),
            corpus.skipped_files.len(),
            corpus.missing_roots.len()
        );
        Ok(corpus)
    }

    fn scan_root(&self, root: &Path, corpus: &mut Corpus) -> Result<()> {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        if !self.exclude_patterns.is_empty() {
            let mut overrides = OverrideBuilder::new(root);
            for pattern in &self.exclude_patterns {
                overrides
                    .add(&format!("!{}", pattern))
                    .map_err(|e| ApiScopeError::Config(format!("bad exclude pattern {}: {}", pattern, e)))?;
            }
            let overrides = overrides
                .build()
                .map_err(|e| ApiScopeError::Config(e.to_string()))?;
            builder.overrides(overrides);
        }

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            let path = entry.path();

            if !path.is_file() || !self.should_scan_file(path) {
                continue;
            }

            match self.read_source(path) {
                Ok(file) => corpus.files.push(file),
                Err(e) => {
                    warn!("Error reading {}: {}", path.display(), e);
                    corpus.skipped_files.push(path.to_path_buf());
                }
            }
        }

        Ok(())
    }

    fn should_scan_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|wanted| wanted == ext))
    }

    fn read_source(&self, path: &Path) -> Result<SourceFile> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| {
            ApiScopeError::FileSystem(format!("not valid UTF-8 ({})", e.utf8_error()))
        })?;
        let content = match content.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => content,
        };

        Ok(SourceFile {
            display_path: self.display_path(path),
            content,
        })
    }

    /// Path relative to the project root, with `/` separators
    pub fn display_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        relative
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}
