//! Textual pattern rules for C# sources.
//!
//! Every rule is a plain regex over raw file text. None of them understand
//! nesting, comments or string literals, so matches inside either are reported
//! like any other.

use regex::Regex;

use crate::error::Result;
use super::model::BindingEvidence;

/// Namespace used for files without a namespace declaration
pub const GLOBAL_NAMESPACE: &str = "global";

/// Literal marker for a zero-argument patch attribute
pub const PATCH_MARKER: &str = "[HarmonyPatch]";

/// Method names starting with these are compiler accessors, never real methods
const RESERVED_METHOD_PREFIXES: [&str; 5] = ["get_", "set_", "add_", "remove_", "op_"];

/// A type declaration found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMatch {
    pub name: String,

    /// Byte offset where the declaration match starts
    pub start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatch {
    pub name: String,
    pub parameters: String,
}

/// Compiled rule set, built once per run
pub struct PatternRules {
    namespace_regex: Regex,
    type_regex: Regex,
    method_regex: Regex,
    patch_name_of_regex: Regex,
    patch_literal_regex: Regex,
    patch_class_regex: Regex,
    patch_method_regex: Regex,
    event_regex: Regex,
    config_entry_regex: Regex,
}

impl PatternRules {
    pub fn new() -> Result<Self> {
        Ok(Self {
            namespace_regex: Regex::new(r"(?m)^namespace\s+([\w.]+)")?,
            type_regex: Regex::new(
                r"(?:public|internal|private|protected)?\s*(?:static|sealed)?\s*(?:class|struct|enum|interface)\s+(\w+)",
            )?,
            method_regex: Regex::new(concat!(
                r"(?:public|private|protected|internal|static|virtual|override|abstract|sealed)?\s*",
                r"(?:async\s+)?(?:\w+(?:<[^>]+>)?(?:\?)?(?:\[\])?)\s+",
                r"(\w+)\s*\(([^)]*)\)",
            ))?,
            patch_name_of_regex: Regex::new(concat!(
                r"\[HarmonyPatch\s*\(\s*typeof\s*\(\s*(\w+)\s*\)\s*",
                r"(?:,\s*nameof\s*\(\s*(?:[\w.]+\.)?(\w+)\s*(?:\(\s*\)\s*)?\)\s*)?\)\s*\]",
            ))?,
            patch_literal_regex: Regex::new(
                r#"\[HarmonyPatch\s*\(\s*typeof\s*\(\s*(\w+)\s*\)\s*,\s*"([^"]+)"\s*\)\]"#,
            )?,
            patch_class_regex: Regex::new(
                r"(?m)\[HarmonyPatch\]\s*\n\s*internal\s+(?:static\s+)?class\s+(\w+)",
            )?,
            patch_method_regex: Regex::new(
                r"(?:public|internal|private|protected)\s+(?:static\s+)?(?:void|bool)\s+(\w+)\s*\([^)]*\)\s*\{",
            )?,
            event_regex: Regex::new(
                r"public\s+(?:static\s+)?event\s+(\w+(?:<[^>]+>)?)\s+(\w+);",
            )?,
            config_entry_regex: Regex::new(r"public\s+static\s+ConfigEntry<(\w+)>\s+(\w+)")?,
        })
    }

    /// First line-anchored namespace declaration, or `global`
    pub fn namespace_of(&self, content: &str) -> String {
        self.namespace_regex
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string())
    }

    pub fn type_declarations(&self, content: &str) -> Vec<TypeMatch> {
        self.type_regex
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(TypeMatch {
                    name: caps.get(1)?.as_str().to_string(),
                    start: whole.start(),
                })
            })
            .collect()
    }

    /// Whether a bare patch marker follows `start` within `window` characters
    pub fn has_patch_marker(&self, content: &str, start: usize, window: usize) -> bool {
        char_window(content, start, window).contains(PATCH_MARKER)
    }

    /// Every method-like declaration in the file, in text order
    pub fn method_declarations(&self, content: &str) -> Vec<MethodMatch> {
        self.method_regex
            .captures_iter(content)
            .filter_map(|caps| {
                Some(MethodMatch {
                    name: caps.get(1)?.as_str().to_string(),
                    parameters: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                })
            })
            .collect()
    }

    /// Binding evidence from all three attribute shapes.
    ///
    /// Shapes are matched independently and in a fixed order (name-of, string
    /// literal, class-scoped); overlapping text yields one entry per shape.
    pub fn binding_evidence(&self, content: &str, class_window: usize) -> Vec<BindingEvidence> {
        let mut evidence = Vec::new();

        for caps in self.patch_name_of_regex.captures_iter(content) {
            evidence.push(BindingEvidence::ExplicitNameOf {
                target_type: caps[1].to_string(),
                target_method: caps.get(2).map(|m| m.as_str().to_string()),
            });
        }

        for caps in self.patch_literal_regex.captures_iter(content) {
            evidence.push(BindingEvidence::ExplicitStringLiteral {
                target_type: caps[1].to_string(),
                target_method: caps[2].to_string(),
            });
        }

        for caps in self.patch_class_regex.captures_iter(content) {
            let (Some(whole), Some(class_name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let chunk = char_window(content, whole.start(), class_window);
            for method in self.patch_method_regex.captures_iter(chunk) {
                evidence.push(BindingEvidence::ClassScoped {
                    patch_class: class_name.as_str().to_string(),
                    method: method[1].to_string(),
                });
            }
        }

        evidence
    }

    /// `(handler type, event name)` pairs
    pub fn event_declarations(&self, content: &str) -> Vec<(String, String)> {
        self.event_regex
            .captures_iter(content)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect()
    }

    /// `(value type, entry name)` pairs
    pub fn config_entry_declarations(&self, content: &str) -> Vec<(String, String)> {
        self.config_entry_regex
            .captures_iter(content)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect()
    }
}

/// Constructors and compiler accessors never become method entries
pub fn is_excluded_method(method_name: &str, owning_type: &str) -> bool {
    method_name == owning_type
        || RESERVED_METHOD_PREFIXES
            .iter()
            .any(|prefix| method_name.starts_with(prefix))
}

/// Slice of at most `chars` characters starting at byte offset `start`
pub fn char_window(content: &str, start: usize, chars: usize) -> &str {
    let tail = match content.get(start..) {
        Some(tail) => tail,
        None => return "",
    };
    let end = tail
        .char_indices()
        .nth(chars)
        .map_or(tail.len(), |(idx, _)| idx);
    &tail[..end]
}

/// 1-based line number of a byte offset
pub fn line_at(content: &str, offset: usize) -> usize {
    content.as_bytes()[..offset.min(content.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
