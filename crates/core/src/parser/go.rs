//! Go parser using tree-sitter
//!
//! Parses Go source files and lowers their package-level `type`, `var` and
//! `const` declarations into [`Symbol`]s. Identifiers are qualified against
//! the enclosing package scope and the file's imports.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser as TsParser, Tree};
use tree_sitter_go::LANGUAGE;

use crate::import::{self, ImportSpec, ImportTable};
use crate::provider::TypeProvider;
use crate::types::{is_predeclared, ChanDir, FieldDescriptor, Symbol, SymbolKind, TypeRef};

/// A parsed Go source file
pub struct GoFile {
    pub path: PathBuf,
    source: String,
    tree: Tree,
}

/// The package a file's declarations are lowered into
pub struct PackageScope<'a> {
    /// Import path of the package
    pub path: &'a str,
    /// Type names declared anywhere in the package
    pub declared: &'a HashSet<String>,
    /// Loads dot-imported packages when an unqualified name is not local
    pub provider: &'a dyn TypeProvider,
}

/// Parse a Go source file from disk
pub fn parse_file(path: &Path) -> anyhow::Result<GoFile> {
    let canonical_path = std::fs::canonicalize(path)?;
    let source = std::fs::read_to_string(&canonical_path)?;
    parse_source(canonical_path, source)
}

/// Parse Go source text that claims to live at `path`
pub fn parse_source(path: PathBuf, source: String) -> anyhow::Result<GoFile> {
    let mut parser = TsParser::new();
    parser.set_language(&LANGUAGE.into())?;

    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| anyhow::anyhow!("Failed to parse Go file: {}", path.display()))?;

    Ok(GoFile { path, source, tree })
}

impl GoFile {
    fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Name from the `package` clause
    pub fn package_name(&self) -> Option<String> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_clause")?;

        let mut clause_cursor = clause.walk();
        let name = clause
            .named_children(&mut clause_cursor)
            .find(|n| n.kind() == "package_identifier")?;
        name.utf8_text(self.bytes()).ok().map(str::to_string)
    }

    pub fn imports(&self) -> Vec<ImportSpec> {
        import::extract_imports(&self.tree.root_node(), self.bytes())
    }

    /// Names of the package-level types this file declares
    pub fn declared_type_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for spec in self.type_specs() {
            if let Some(name) = text_of_field(&spec, "name", self.bytes()) {
                names.push(name);
            }
        }
        names
    }

    /// Lower every package-level declaration into a symbol, in source order
    pub fn symbols(&self, scope: &PackageScope<'_>) -> Vec<Symbol> {
        let lowering = Lowering {
            scope,
            imports: ImportTable::from_specs(&self.imports()),
            source: self.bytes(),
        };

        let root = self.tree.root_node();
        let mut symbols = Vec::new();
        let mut cursor = root.walk();

        for decl in root.named_children(&mut cursor) {
            match decl.kind() {
                "type_declaration" => {
                    for spec in children_of_kind(&decl, &["type_spec", "type_alias"]) {
                        symbols.extend(lowering.type_symbol(&spec));
                    }
                }
                "var_declaration" => {
                    for spec in specs_of(&decl, "var_spec", "var_spec_list") {
                        symbols.extend(lowering.value_symbols(&spec, SymbolKind::Var));
                    }
                }
                "const_declaration" => {
                    for spec in specs_of(&decl, "const_spec", "const_spec_list") {
                        symbols.extend(lowering.value_symbols(&spec, SymbolKind::Const));
                    }
                }
                _ => {}
            }
        }

        symbols
    }

    fn type_specs(&self) -> Vec<Node<'_>> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let specs = root
            .named_children(&mut cursor)
            .filter(|decl| decl.kind() == "type_declaration")
            .flat_map(|decl| children_of_kind(&decl, &["type_spec", "type_alias"]))
            .collect();
        specs
    }
}

struct Lowering<'a> {
    scope: &'a PackageScope<'a>,
    imports: ImportTable,
    source: &'a [u8],
}

impl Lowering<'_> {
    fn type_symbol(&self, spec: &Node) -> Option<Symbol> {
        let name = text_of_field(spec, "name", self.source)?;
        let ty_node = spec.child_by_field_name("type")?;

        // Generic declarations are kept by name but their bodies are not lowered
        let ty = if spec.child_by_field_name("type_parameters").is_some() {
            TypeRef::Opaque(normalized_text(spec, self.source))
        } else {
            self.lower(&ty_node)
        };

        let kind = if spec.kind() == "type_alias" {
            SymbolKind::Alias
        } else {
            SymbolKind::Type
        };

        Some(Symbol { name, kind, ty })
    }

    fn value_symbols(&self, spec: &Node, kind: SymbolKind) -> Vec<Symbol> {
        let ty = match spec.child_by_field_name("type") {
            Some(ty_node) => self.lower(&ty_node),
            None if kind == SymbolKind::Const => TypeRef::Opaque("untyped constant".to_string()),
            None => TypeRef::Opaque("inferred".to_string()),
        };

        let mut cursor = spec.walk();
        let symbols = spec
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| n.utf8_text(self.source).ok())
            .filter(|name| *name != "_")
            .map(|name| Symbol {
                name: name.to_string(),
                kind,
                ty: ty.clone(),
            })
            .collect();
        symbols
    }

    fn lower(&self, node: &Node) -> TypeRef {
        match node.kind() {
            "type_identifier" => self.identifier(&self.text(node)),
            "qualified_type" => {
                let qualifier = text_of_field(node, "package", self.source).unwrap_or_default();
                let name = text_of_field(node, "name", self.source).unwrap_or_default();
                let package = self
                    .imports
                    .resolve(&qualifier)
                    .map(str::to_string)
                    .unwrap_or(qualifier);
                TypeRef::named(package, name)
            }
            "pointer_type" => match first_named_child(node) {
                Some(elem) => TypeRef::pointer(self.lower(&elem)),
                None => self.opaque(node),
            },
            "slice_type" => match node.child_by_field_name("element") {
                Some(elem) => TypeRef::slice(self.lower(&elem)),
                None => self.opaque(node),
            },
            "array_type" => match (
                node.child_by_field_name("length"),
                node.child_by_field_name("element"),
            ) {
                (Some(len), Some(elem)) => TypeRef::Array {
                    len: self.text(&len),
                    elem: Box::new(self.lower(&elem)),
                },
                _ => self.opaque(node),
            },
            "map_type" => match (
                node.child_by_field_name("key"),
                node.child_by_field_name("value"),
            ) {
                (Some(key), Some(value)) => TypeRef::Map {
                    key: Box::new(self.lower(&key)),
                    value: Box::new(self.lower(&value)),
                },
                _ => self.opaque(node),
            },
            "channel_type" => match node.child_by_field_name("value") {
                Some(elem) => TypeRef::Chan {
                    dir: channel_dir(node),
                    elem: Box::new(self.lower(&elem)),
                },
                None => self.opaque(node),
            },
            "struct_type" => TypeRef::Struct(self.struct_fields(node)),
            "parenthesized_type" => match first_named_child(node) {
                Some(inner) => self.lower(&inner),
                None => self.opaque(node),
            },
            // interface_type, function_type, generic_type, negated_type
            _ => self.opaque(node),
        }
    }

    fn identifier(&self, name: &str) -> TypeRef {
        if self.scope.declared.contains(name) {
            return TypeRef::named(self.scope.path, name);
        }
        if is_predeclared(name) {
            return TypeRef::basic(name);
        }
        let package = self.dot_import_declaring(name).unwrap_or(self.scope.path);
        TypeRef::named(package, name)
    }

    /// First dot-imported package that declares type `name`
    fn dot_import_declaring(&self, name: &str) -> Option<&str> {
        self.imports
            .dot_imports()
            .iter()
            .map(String::as_str)
            .find(|path| match self.scope.provider.load_package(path) {
                Ok(package) => package
                    .lookup(name)
                    .is_some_and(|s| matches!(s.kind, SymbolKind::Type | SymbolKind::Alias)),
                Err(err) => {
                    tracing::warn!("cannot resolve {} through dot import: {}", name, err);
                    false
                }
            })
    }

    fn struct_fields(&self, node: &Node) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();
        let Some(list) = first_named_child(node) else {
            return fields;
        };

        for decl in children_of_kind(&list, &["field_declaration"]) {
            let Some(ty_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let tag = decl
                .child_by_field_name("tag")
                .map(|t| unquote(&self.text(&t)));

            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(&n))
                .collect();

            if names.is_empty() {
                let mut ty = self.lower(&ty_node);
                if has_child_of_kind(&decl, "*") {
                    ty = TypeRef::pointer(ty);
                }
                let mut field = FieldDescriptor::embedded(embedded_name(&ty_node, self.source), ty);
                field.tag = tag;
                fields.push(field);
            } else {
                let ty = self.lower(&ty_node);
                for name in names {
                    let mut field = FieldDescriptor::new(name, ty.clone());
                    field.tag = tag.clone();
                    fields.push(field);
                }
            }
        }

        fields
    }

    fn opaque(&self, node: &Node) -> TypeRef {
        TypeRef::Opaque(normalized_text(node, self.source))
    }

    fn text(&self, node: &Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }
}

/// The name an embedded field is accessed by: the type name sans package
fn embedded_name(ty_node: &Node, source: &[u8]) -> String {
    match ty_node.kind() {
        "qualified_type" => text_of_field(ty_node, "name", source).unwrap_or_default(),
        "generic_type" => ty_node
            .child_by_field_name("type")
            .map(|inner| embedded_name(&inner, source))
            .unwrap_or_default(),
        _ => ty_node.utf8_text(source).unwrap_or_default().to_string(),
    }
}

fn channel_dir(node: &Node) -> ChanDir {
    let mut cursor = node.walk();
    let tokens: Vec<&str> = node.children(&mut cursor).map(|c| c.kind()).collect();
    match tokens.first() {
        Some(&"<-") => ChanDir::Recv,
        _ if tokens.contains(&"<-") => ChanDir::Send,
        _ => ChanDir::Both,
    }
}

/// Source text with whitespace runs collapsed, in go/types spelling for
/// empty bodies (`interface{}`).
fn normalized_text(node: &Node, source: &[u8]) -> String {
    let text = node.utf8_text(source).unwrap_or_default();
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("interface {", "interface{")
        .replace("struct {", "struct{")
        .replace("{ }", "{}")
}

/// Value of a Go string literal: raw literals lose their backquotes (and
/// carriage returns), interpreted literals have their escapes decoded
fn unquote(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.replace('\r', "");
    }
    let Some(body) = literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return literal.to_string();
    };

    let mut out: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push(b'\\');
            break;
        };
        let simple = match escape {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(byte) = simple {
            out.push(byte);
            continue;
        }

        let (radix, digits) = match escape {
            'x' => (16, 2),
            'u' => (16, 4),
            'U' => (16, 8),
            '0'..='7' => (8, 2),
            other => {
                out.push(b'\\');
                let mut buf = [0; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                continue;
            }
        };
        let mut value = if radix == 8 { escape.to_digit(8).unwrap_or(0) } else { 0 };
        for _ in 0..digits {
            match chars.peek().and_then(|d| d.to_digit(radix)) {
                Some(d) => {
                    value = value * radix + d;
                    chars.next();
                }
                None => break,
            }
        }

        // \x and octal escapes are single bytes; \u and \U are code points
        match escape {
            'u' | 'U' => {
                let c = char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            _ => out.push(value as u8),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn text_of_field(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
        .map(|s| s.to_string())
}

fn first_named_child<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let child = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    child
}

fn has_child_of_kind(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

fn children_of_kind<'t>(node: &Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|c| kinds.contains(&c.kind()))
        .collect();
    children
}

/// Specs of a var/const declaration, whether listed directly or grouped
/// in a parenthesized spec list.
fn specs_of<'t>(decl: &Node<'t>, spec_kind: &str, list_kind: &str) -> Vec<Node<'t>> {
    let mut specs = Vec::new();
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        if child.kind() == spec_kind {
            specs.push(child);
        } else if child.kind() == list_kind {
            specs.extend(children_of_kind(&child, &[spec_kind]));
        }
    }
    specs
}
