//! Import declarations of Go source files.
//!
//! Qualified field types (`geo.Point`) name their package by its local
//! identifier; the import table of the declaring file maps that identifier
//! back to an import path so the type can be loaded from the provider.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How an import binds its package in the file scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportName {
    /// `import "example.com/geo"`: bound under the package's own name
    Default,
    /// `import g "example.com/geo"`
    Alias(String),
    /// `import . "example.com/geo"`
    Dot,
    /// `import _ "example.com/geo"`
    Blank,
}

/// A single import spec from a Go file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Import path without quotes
    pub path: String,
    pub name: ImportName,
    /// Start line (1-indexed for human readability).
    pub line: usize,
}

impl ImportSpec {
    /// The identifier this import is referenced by, if any.
    pub fn local_name(&self) -> Option<String> {
        match &self.name {
            ImportName::Default => Some(default_local_name(&self.path)),
            ImportName::Alias(alias) => Some(alias.clone()),
            ImportName::Dot | ImportName::Blank => None,
        }
    }
}

/// Guess the package name of an import path without loading it.
///
/// Go binds an unaliased import under the name in the target's package
/// clause. By convention that is the last path element, ignoring a `/vN`
/// major-version element and a `.vN` suffix (`gopkg.in/yaml.v3` is `yaml`).
pub fn default_local_name(path: &str) -> String {
    let mut elements: Vec<&str> = path.split('/').filter(|e| !e.is_empty()).collect();
    if elements.len() > 1 && elements.last().is_some_and(|e| is_major_version(e)) {
        elements.pop();
    }
    let last = elements.last().copied().unwrap_or(path);
    let last = match last.rsplit_once(".v") {
        Some((head, version)) if !head.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => {
            head
        }
        _ => last,
    };
    last.trim_start_matches("go-").replace(['-', '.'], "_")
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Local identifier → import path for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    by_name: HashMap<String, String>,
    /// Paths imported with `.`, whose exported names are unqualified
    dot: Vec<String>,
}

impl ImportTable {
    pub fn from_specs(specs: &[ImportSpec]) -> Self {
        let mut by_name = HashMap::new();
        let mut dot = Vec::new();
        for spec in specs {
            if spec.name == ImportName::Dot {
                dot.push(spec.path.clone());
            } else if let Some(local) = spec.local_name() {
                by_name.entry(local).or_insert_with(|| spec.path.clone());
            }
        }
        Self { by_name, dot }
    }

    /// Import path bound to `qualifier`, if the file imports one.
    pub fn resolve(&self, qualifier: &str) -> Option<&str> {
        self.by_name.get(qualifier).map(String::as_str)
    }

    /// Dot-imported paths in source order
    pub fn dot_imports(&self) -> &[String] {
        &self.dot
    }
}

/// Extract import specs from a parsed Go file, in source order.
pub fn extract_imports(root: &tree_sitter::Node, source: &[u8]) -> Vec<ImportSpec> {
    let mut specs = Vec::new();
    let mut cursor = root.walk();

    for decl in root.children(&mut cursor) {
        if decl.kind() != "import_declaration" {
            continue;
        }
        let mut decl_cursor = decl.walk();
        for child in decl.named_children(&mut decl_cursor) {
            match child.kind() {
                "import_spec" => specs.extend(import_spec(&child, source)),
                "import_spec_list" => {
                    let mut list_cursor = child.walk();
                    for spec in child.named_children(&mut list_cursor) {
                        if spec.kind() == "import_spec" {
                            specs.extend(import_spec(&spec, source));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    specs
}

fn import_spec(node: &tree_sitter::Node, source: &[u8]) -> Option<ImportSpec> {
    let raw_path = node.child_by_field_name("path")?.utf8_text(source).ok()?;
    let path = raw_path.trim_matches(|c| c == '"' || c == '`').to_string();

    let name = match node.child_by_field_name("name") {
        None => ImportName::Default,
        Some(name) => match name.kind() {
            "dot" => ImportName::Dot,
            "blank_identifier" => ImportName::Blank,
            _ => ImportName::Alias(name.utf8_text(source).ok()?.to_string()),
        },
    };

    Some(ImportSpec {
        path,
        name,
        line: node.start_position().row + 1,
    })
}
