use tracing::debug;

use crate::config::ScanningConfig;
use super::model::{ApiModel, ConfigEntryDeclaration, EventDeclaration, MethodEntry, TypeRecord};
use super::rules::{is_excluded_method, PatternRules};
use super::scanner::SourceFile;

/// Applies the full rule set to one file and folds the facts into an [`ApiModel`].
///
/// Methods are not scoped to their enclosing type: every method found in a
/// file is recorded under every type declared in that file.
pub struct FileExtractor<'a> {
    rules: &'a PatternRules,
    patch_marker_window: usize,
    patch_class_window: usize,
}

impl<'a> FileExtractor<'a> {
    pub fn new(rules: &'a PatternRules, config: &ScanningConfig) -> Self {
        Self {
            rules,
            patch_marker_window: config.patch_marker_window,
            patch_class_window: config.patch_class_window,
        }
    }

    pub fn extract(&self, file: &SourceFile, model: &mut ApiModel) {
        let content = file.content.as_str();
        let namespace = self.rules.namespace_of(content);
        model.add_namespace(&namespace);

        let methods = self.rules.method_declarations(content);
        let declarations = self.rules.type_declarations(content);

        for declaration in &declarations {
            let record = TypeRecord {
                name: declaration.name.clone(),
                namespace: namespace.clone(),
                kind: "class".to_string(),
                file: file.display_path.clone(),
                is_patch: self.rules.has_patch_marker(
                    content,
                    declaration.start,
                    self.patch_marker_window,
                ),
            };
            let (full_name, _) = model.add_type(record);

            for method in &methods {
                if is_excluded_method(&method.name, &declaration.name) {
                    continue;
                }
                model.add_method(&full_name, MethodEntry::new(&method.name, &method.parameters));
            }
        }

        let bindings = self.rules.binding_evidence(content, self.patch_class_window);
        let binding_count = bindings.len();
        for evidence in bindings {
            model.add_binding(evidence, &file.display_path);
        }

        for (event_type, name) in self.rules.event_declarations(content) {
            model.add_event(EventDeclaration {
                event_type,
                name,
                namespace: namespace.clone(),
                file: file.display_path.clone(),
            });
        }

        for (value_type, name) in self.rules.config_entry_declarations(content) {
            model.add_config_entry(ConfigEntryDeclaration {
                value_type,
                name,
                namespace: namespace.clone(),
                file: file.display_path.clone(),
            });
        }

        debug!(
            "{}: {} types, {} method candidates, {} bindings",
            file.display_path,
            declarations.len(),
            methods.len(),
            binding_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, content: &str) -> SourceFile {
        SourceFile {
            display_path: path.to_string(),
            content: content.to_string(),
        }
    }

    fn extract_all(files: &[SourceFile]) -> ApiModel {
        let rules = PatternRules::new().unwrap();
        let extractor = FileExtractor::new(&rules, &ScanningConfig::default());
        let mut model = ApiModel::new();
        for file in files {
            extractor.extract(file, &mut model);
        }
        model
    }

    #[test]
    fn test_widget_scenario() {
        let model = extract_all(&[source(
            "Core/Widget.cs",
            "namespace Foo.Bar\n{\npublic class Widget { public void DoThing(int x) {} }\n}",
        )]);

        assert_eq!(model.types.len(), 1);
        let widget = &model.types["Foo.Bar.Widget"];
        assert_eq!(widget.namespace, "Foo.Bar");
        assert_eq!(widget.kind, "class");
        assert!(!widget.is_patch);

        let methods = &model.methods["Foo.Bar.Widget"];
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].signature, "DoThing(int x)");
    }

    #[test]
    fn test_duplicate_type_attributed_to_first_file() {
        let model = extract_all(&[
            source("Core/A.cs", "namespace Core;\npublic class Shared {}"),
            source("Core/B.cs", "namespace Core;\npublic partial class Shared {}"),
        ]);

        assert_eq!(model.types.len(), 1);
        assert_eq!(model.types["Core.Shared"].file, "Core/A.cs");
    }

    #[test]
    fn test_methods_deduplicated_across_declarations() {
        let model = extract_all(&[
            source("Core/A.cs", "namespace Core;\npublic class Shared { public void Run(int x) {} }"),
            source(
                "Core/B.cs",
                "namespace Core;\npublic class Shared { public void Run(int x) {} public void Run(string s) {} }",
            ),
        ]);

        let sigs: Vec<&str> = model.methods["Core.Shared"]
            .iter()
            .map(|m| m.signature.as_str())
            .collect();
        assert_eq!(sigs, vec!["Run(int x)", "Run(string s)"]);
    }

    #[test]
    fn test_methods_attach_to_every_type_in_file() {
        let model = extract_all(&[source(
            "Core/Pair.cs",
            "namespace Core;\npublic class First { public void Alpha() {} }\npublic class Second { public Second() {} public void Beta() {} }",
        )]);

        let first: Vec<&str> = model.methods["Core.First"].iter().map(|m| m.name.as_str()).collect();
        let second: Vec<&str> = model.methods["Core.Second"].iter().map(|m| m.name.as_str()).collect();
        // Second's constructor is only excluded under Second itself
        assert_eq!(first, vec!["Alpha", "Second", "Beta"]);
        assert_eq!(second, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_patch_class_and_global_namespace() {
        let content = r#"
public static class Patches
{
    [HarmonyPatch]
    internal static class SpawnPatch
    {
        public static void Postfix() { }
    }
}
"#;
        let model = extract_all(&[source("Patches/Spawn.cs", content)]);

        assert!(model.namespaces.contains("global"));
        assert!(model.types["global.Patches"].is_patch);
        assert!(!model.types["global.SpawnPatch"].is_patch);
        assert_eq!(model.patches.len(), 1);
        assert_eq!(model.patches[0].target_key(), "(class SpawnPatch).Postfix");
        assert_eq!(model.patches[0].file, "Patches/Spawn.cs");
    }

    #[test]
    fn test_events_and_config_entries_carry_namespace() {
        let content = r#"namespace Bluelock.Config;
public static class Settings
{
    public static ConfigEntry<bool> Enabled;
    public static event Action<int> OnReload;
}
"#;
        let model = extract_all(&[source("Bluelock/Settings.cs", content)]);

        assert_eq!(model.config_entries.len(), 1);
        assert_eq!(model.config_entries[0].namespace, "Bluelock.Config");
        assert_eq!(model.config_entries[0].value_type, "bool");
        assert_eq!(model.events.len(), 1);
        assert_eq!(model.events[0].event_type, "Action<int>");
        assert_eq!(model.events[0].name, "OnReload");
    }

    #[test]
    fn test_file_without_types_still_adds_namespace() {
        let model = extract_all(&[source("Core/Usings.cs", "global using System;")]);
        assert_eq!(model.namespaces.len(), 1);
        assert!(model.types.is_empty());
    }
}
