mod engine;
mod model;
mod rules;
mod extractor;
mod scanner;
mod detectors;
mod report;

pub use model::{ApiModel, ReportSummary};
pub use rules::PatternRules;
pub use extractor::FileExtractor;
pub use scanner::CorpusScanner;
pub use detectors::{CriticalChecks, DetectorFindings};
pub use report::ReportRenderer;

#[cfg(test)]
pub use detectors::PatchLoadingStatus;

// Export the main engine
pub use engine::{Engine, RunOverrides};
