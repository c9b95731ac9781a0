use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

/// Declared type, keyed by `namespace.name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub name: String,
    pub namespace: String,

    /// Always "class"; structs, enums and interfaces are not told apart
    pub kind: String,

    /// Declaring file, relative to the project root
    pub file: String,

    pub is_patch: bool,
}

impl TypeRecord {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    pub parameters: String,

    /// `name(parameters)`, unique within one type
    pub signature: String,
}

impl MethodEntry {
    pub fn new(name: &str, parameters: &str) -> Self {
        let parameters = parameters.trim();
        Self {
            name: name.to_string(),
            parameters: parameters.to_string(),
            signature: format!("{}({})", name, parameters),
        }
    }
}

/// Textual shape a patch binding was recognised from.
///
/// The explicit shapes can overlap on the same attribute text, so one logical
/// binding may be recorded more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BindingEvidence {
    /// `[HarmonyPatch(typeof(T))]` or `[HarmonyPatch(typeof(T), nameof(M))]`
    ExplicitNameOf {
        target_type: String,
        target_method: Option<String>,
    },

    /// `[HarmonyPatch(typeof(T), "M")]`
    ExplicitStringLiteral {
        target_type: String,
        target_method: String,
    },

    /// Bare `[HarmonyPatch]` on an internal class, one per prefix/postfix method
    ClassScoped {
        patch_class: String,
        method: String,
    },
}

/// Method substituted when a name-of binding names no target method
pub const SENTINEL_TARGET_METHOD: &str = "OnUpdate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingShape {
    ExplicitNameOf,
    ExplicitStringLiteral,
    ClassScoped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBinding {
    pub target_class: String,
    pub target_method: String,
    pub file: String,
    pub patch_class: Option<String>,
    pub shape: BindingShape,
}

impl PatchBinding {
    pub fn from_evidence(evidence: BindingEvidence, file: &str) -> Self {
        let file = file.to_string();
        match evidence {
            BindingEvidence::ExplicitNameOf { target_type, target_method } => Self {
                target_class: target_type,
                target_method: target_method
                    .unwrap_or_else(|| SENTINEL_TARGET_METHOD.to_string()),
                file,
                patch_class: None,
                shape: BindingShape::ExplicitNameOf,
            },
            BindingEvidence::ExplicitStringLiteral { target_type, target_method } => Self {
                target_class: target_type,
                target_method,
                file,
                patch_class: None,
                shape: BindingShape::ExplicitStringLiteral,
            },
            BindingEvidence::ClassScoped { patch_class, method } => Self {
                target_class: format!("(class {})", patch_class),
                target_method: method,
                file,
                patch_class: Some(patch_class),
                shape: BindingShape::ClassScoped,
            },
        }
    }

    /// Grouping key used by the report
    pub fn target_key(&self) -> String {
        format!("{}.{}", self.target_class, self.target_method)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDeclaration {
    pub event_type: String,
    pub name: String,
    pub namespace: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntryDeclaration {
    pub value_type: String,
    pub name: String,
    pub namespace: String,
    pub file: String,
}

/// Everything extracted from one run's corpus.
///
/// Built by a single scan pass and only read afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiModel {
    pub namespaces: BTreeSet<String>,
    pub types: BTreeMap<String, TypeRecord>,
    pub methods: BTreeMap<String, Vec<MethodEntry>>,
    pub patches: Vec<PatchBinding>,
    pub events: Vec<EventDeclaration>,
    pub config_entries: Vec<ConfigEntryDeclaration>,
}

/// Counts shown in the report summary and on the console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub namespaces: usize,
    pub types: usize,
    pub methods: usize,
    pub patches: usize,
    pub events: usize,
    pub config_entries: usize,
}

impl ApiModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_namespace(&mut self, namespace: &str) {
        if !self.namespaces.contains(namespace) {
            self.namespaces.insert(namespace.to_string());
        }
    }

    /// Insert a type unless one with the same full name exists.
    ///
    /// Returns the full name and whether this call created the record.
    pub fn add_type(&mut self, record: TypeRecord) -> (String, bool) {
        let full_name = record.full_name();
        if self.types.contains_key(&full_name) {
            return (full_name, false);
        }
        self.types.insert(full_name.clone(), record);
        (full_name, true)
    }

    /// Append a method under `type_full_name` unless its signature is already there
    pub fn add_method(&mut self, type_full_name: &str, method: MethodEntry) -> bool {
        let entries = self.methods.entry(type_full_name.to_string()).or_default();
        if entries.iter().any(|m| m.signature == method.signature) {
            return false;
        }
        entries.push(method);
        true
    }

    pub fn add_binding(&mut self, evidence: BindingEvidence, file: &str) {
        self.patches.push(PatchBinding::from_evidence(evidence, file));
    }

    pub fn add_event(&mut self, event: EventDeclaration) {
        self.events.push(event);
    }

    pub fn add_config_entry(&mut self, entry: ConfigEntryDeclaration) {
        self.config_entries.push(entry);
    }

    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            namespaces: self.namespaces.len(),
            types: self.types.len(),
            methods: self.method_count(),
            patches: self.patches.len(),
            events: self.events.len(),
            config_entries: self.config_entries.len(),
        }
    }
}
