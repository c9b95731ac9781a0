use std::collections::BTreeMap;

use super::detectors::{AntiPatternFinding, DetectorFindings, PatchLoadingStatus};
use super::model::{ApiModel, PatchBinding, TypeRecord};

const RULE_WIDTH: usize = 70;

/// Renders the plain-text API report.
///
/// Output depends only on its inputs; the timestamp is passed in.
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, model: &ApiModel, findings: &DetectorFindings, generated_at: &str) -> String {
        let mut lines: Vec<String> = Vec::new();

        self.render_banner(&mut lines, generated_at);
        self.render_summary(&mut lines, model);
        self.render_namespaces(&mut lines, model);
        self.render_types(&mut lines, model);
        self.render_patches(&mut lines, model);
        self.render_config_entries(&mut lines, model);
        self.render_events(&mut lines, model);

        lines.push(heavy_rule());
        lines.push("[CRITICAL CHECKS]".to_string());
        lines.push(heavy_rule());
        self.render_unsafe_patterns(&mut lines, &findings.unsafe_patterns);
        self.render_patch_loading(&mut lines, findings);
        self.render_config_paths(&mut lines, &findings.config_paths);

        self.render_methods(&mut lines, model);

        lines.push(String::new());
        lines.push(heavy_rule());
        lines.push(" END OF REPORT".to_string());
        lines.push(heavy_rule());

        lines.join("\n")
    }

    fn render_banner(&self, lines: &mut Vec<String>, generated_at: &str) {
        lines.push(heavy_rule());
        lines.push(" API SIGNATURE REPORT".to_string());
        lines.push(format!(" Generated: {}", generated_at));
        lines.push(heavy_rule());
        lines.push(String::new());
    }

    fn render_summary(&self, lines: &mut Vec<String>, model: &ApiModel) {
        let summary = model.summary();
        lines.push("[SUMMARY]".to_string());
        lines.push(format!(" Total Namespaces: {}", summary.namespaces));
        lines.push(format!(" Total Types: {}", summary.types));
        lines.push(format!(" Total Methods: {}", summary.methods));
        lines.push(format!(" Total Harmony Patches: {}", summary.patches));
        lines.push(format!(" Total Events: {}", summary.events));
        lines.push(format!(" Total Config Entries: {}", summary.config_entries));
        lines.push(String::new());
    }

    fn render_namespaces(&self, lines: &mut Vec<String>, model: &ApiModel) {
        section_header(lines, "[NAMESPACES]");
        if model.namespaces.is_empty() {
            lines.push("  (No namespaces found)".to_string());
        }
        for namespace in &model.namespaces {
            lines.push(format!("  {}", namespace));
        }
        lines.push(String::new());
    }

    fn render_types(&self, lines: &mut Vec<String>, model: &ApiModel) {
        section_header(lines, "[TYPES]");

        // Types are keyed by full name, so each group is already sorted
        let mut by_namespace: BTreeMap<&str, Vec<(&String, &TypeRecord)>> = BTreeMap::new();
        for (full_name, record) in &model.types {
            by_namespace
                .entry(record.namespace.as_str())
                .or_default()
                .push((full_name, record));
        }

        if by_namespace.is_empty() {
            lines.push("  (No types found)".to_string());
        }
        for (namespace, records) in by_namespace {
            lines.push(String::new());
            lines.push(format!("  // {}", namespace));
            for (full_name, record) in records {
                let marker = if record.is_patch { " [PATCH]" } else { "" };
                lines.push(format!("  {}{}", full_name, marker));
                lines.push(format!("    File: {}", record.file));
            }
        }
        lines.push(String::new());
    }

    fn render_patches(&self, lines: &mut Vec<String>, model: &ApiModel) {
        section_header(lines, "[HARMONY PATCHES]");

        if model.patches.is_empty() {
            lines.push("  (No patches found)".to_string());
        } else {
            let mut by_target: BTreeMap<String, Vec<&PatchBinding>> = BTreeMap::new();
            for binding in &model.patches {
                by_target.entry(binding.target_key()).or_default().push(binding);
            }

            for (target, bindings) in by_target {
                lines.push(String::new());
                lines.push(format!("  Target: {}", target));
                for binding in bindings {
                    lines.push(format!("    File: {}", binding.file));
                }
            }
        }
        lines.push(String::new());
    }

    fn render_config_entries(&self, lines: &mut Vec<String>, model: &ApiModel) {
        section_header(lines, "[CONFIG ENTRIES]");

        if model.config_entries.is_empty() {
            lines.push("  (No config entries found)".to_string());
        } else {
            let mut entries: Vec<_> = model.config_entries.iter().collect();
            entries.sort_by(|a, b| a.namespace.cmp(&b.namespace));
            for entry in entries {
                lines.push(format!("  {}.{} {}", entry.namespace, entry.value_type, entry.name));
                lines.push(format!("    File: {}", entry.file));
            }
        }
        lines.push(String::new());
    }

    fn render_events(&self, lines: &mut Vec<String>, model: &ApiModel) {
        section_header(lines, "[EVENTS]");

        if model.events.is_empty() {
            lines.push("  (No events found)".to_string());
        } else {
            let mut events: Vec<_> = model.events.iter().collect();
            events.sort_by(|a, b| a.namespace.cmp(&b.namespace));
            for event in events {
                lines.push(format!("  event {} {}", event.event_type, event.name));
                lines.push(format!("    File: {}", event.file));
            }
        }
        lines.push(String::new());
    }

    fn render_unsafe_patterns(&self, lines: &mut Vec<String>, findings: &[AntiPatternFinding]) {
        lines.push(String::new());
        lines.push("[UNSAFE PATTERNS]".to_string());
        if findings.is_empty() {
            lines.push("  ✅ No unsafe using patterns found".to_string());
        }
        push_findings(lines, findings);
        lines.push(String::new());
    }

    fn render_patch_loading(&self, lines: &mut Vec<String>, findings: &DetectorFindings) {
        let report = &findings.patch_loading;
        lines.push(String::new());
        lines.push("[PATCH LOADING STATUS]".to_string());

        match report.status {
            PatchLoadingStatus::Registered => lines.push(format!(
                "  ✅ {} found in {}",
                report.registration_call, report.entry_point
            )),
            PatchLoadingStatus::NotRegistered => lines.push(format!(
                "  ❌ {} NOT found in {} - patches will NOT load!",
                report.registration_call, report.entry_point
            )),
            PatchLoadingStatus::EntryPointMissing => {
                lines.push(format!("  ⚠️  {} not found", report.entry_point))
            }
        }
        for warning in &report.warnings {
            lines.push(format!("  ⚠️  WARNING: {}", warning));
        }
        lines.push(String::new());
    }

    fn render_config_paths(&self, lines: &mut Vec<String>, findings: &[AntiPatternFinding]) {
        lines.push(String::new());
        lines.push("[CONFIG PATH VALIDATION]".to_string());
        if findings.is_empty() {
            lines.push("  ✅ No obvious config path issues".to_string());
        }
        push_findings(lines, findings);
        lines.push(String::new());
    }

    fn render_methods(&self, lines: &mut Vec<String>, model: &ApiModel) {
        lines.push(heavy_rule());
        lines.push("[METHODS BY CLASS]".to_string());
        lines.push(heavy_rule());

        let mut any = false;
        for (type_name, methods) in &model.methods {
            if methods.is_empty() {
                continue;
            }
            any = true;
            lines.push(String::new());
            lines.push(format!("  {}", type_name));
            for method in methods {
                lines.push(format!("    {}", method.signature));
            }
        }
        if !any {
            lines.push("  (No methods found)".to_string());
        }
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn heavy_rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn section_header(lines: &mut Vec<String>, title: &str) {
    lines.push("-".repeat(RULE_WIDTH));
    lines.push(title.to_string());
    lines.push("-".repeat(RULE_WIDTH));
}

fn push_findings(lines: &mut Vec<String>, findings: &[AntiPatternFinding]) {
    for finding in findings {
        lines.push(format!("  ⚠️  {}:{}", finding.file, finding.line));
        lines.push(format!("      {}", finding.description));
    }
}
