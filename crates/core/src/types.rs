//! Type model shared by the providers, the resolver and the graph builder
//!
//! The shapes mirror the Go type grammar closely enough to print the same
//! canonical names go/types does (`example.com/pkg.Name`, `*T`, `[]T`,
//! `map[K]V`, `struct{A string; B int}`), which is what ends up in node
//! labels.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A package-qualified type name, e.g. `example.com/people` + `Person`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Handle to a type as seen by the host type system.
///
/// Its `Display` form is the canonical printable name used for node labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Predeclared type such as `string`, `int64` or `error`
    Basic(String),
    /// Declared (defined or aliased) type
    Named(QualifiedName),
    Pointer(Box<TypeRef>),
    Slice(Box<TypeRef>),
    Array { len: String, elem: Box<TypeRef> },
    Map { key: Box<TypeRef>, value: Box<TypeRef> },
    Chan { dir: ChanDir, elem: Box<TypeRef> },
    /// Anonymous struct literal type
    Struct(Vec<FieldDescriptor>),
    /// Interfaces, function signatures, generic instantiations and untyped
    /// constants, carried as normalized source text.
    Opaque(String),
}

impl TypeRef {
    pub fn basic(name: impl Into<String>) -> Self {
        TypeRef::Basic(name.into())
    }

    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named(QualifiedName::new(package, name))
    }

    pub fn pointer(elem: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(elem))
    }

    pub fn slice(elem: TypeRef) -> Self {
        TypeRef::Slice(Box::new(elem))
    }

    /// Node label form: the canonical name as a Go string literal.
    pub fn quoted(&self) -> String {
        go_quote(&self.to_string())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Basic(name) | TypeRef::Opaque(name) => f.write_str(name),
            TypeRef::Named(qualified) => write!(f, "{qualified}"),
            TypeRef::Pointer(elem) => write!(f, "*{elem}"),
            TypeRef::Slice(elem) => write!(f, "[]{elem}"),
            TypeRef::Array { len, elem } => write!(f, "[{len}]{elem}"),
            TypeRef::Map { key, value } => write!(f, "map[{key}]{value}"),
            TypeRef::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {elem}"),
                ChanDir::Send => write!(f, "chan<- {elem}"),
                ChanDir::Recv => write!(f, "<-chan {elem}"),
            },
            TypeRef::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if let Some(tag) = &field.tag {
                        write!(f, " {}", go_quote(tag))?;
                    }
                }
                f.write_str("}")
            }
        }
    }
}

/// One field of a struct, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name; for embedded fields, the bare type name
    pub name: String,
    pub ty: TypeRef,
    pub embedded: bool,
    /// Raw struct tag contents, without the surrounding quotes
    pub tag: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
            tag: None,
        }
    }

    pub fn embedded(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: true,
            tag: None,
        }
    }
}

/// What kind of declaration a package-level symbol comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    /// `type T U`: `ty` is the definition's right-hand side
    Type,
    /// `type T = U`
    Alias,
    /// `var v T`
    Var,
    /// `const c T = ...`
    Const,
}

/// A package-level declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TypeRef,
}

impl Symbol {
    /// The type a reference to this symbol denotes.
    ///
    /// A defined type denotes itself, an alias its target, and a var or
    /// const its declared type.
    pub fn object_type(&self, package: &str) -> TypeRef {
        match self.kind {
            SymbolKind::Type => TypeRef::named(package, self.name.clone()),
            SymbolKind::Alias | SymbolKind::Var | SymbolKind::Const => self.ty.clone(),
        }
    }
}

/// All symbols declared by one package
#[derive(Debug, Clone, Default, Serialize)]
pub struct Package {
    /// Import path, e.g. `example.com/people`
    pub path: String,
    /// Name from the package clause
    pub name: String,
    /// Source files the symbols were read from
    pub files: Vec<PathBuf>,
    symbols: Vec<Symbol>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Package {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a symbol; the first declaration of a name wins.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        if self.index.contains_key(&symbol.name) {
            return;
        }
        self.index.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
    }

    /// Builder-style helper declaring `type name struct { fields }`
    pub fn with_struct(mut self, name: &str, fields: Vec<FieldDescriptor>) -> Self {
        self.add_symbol(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Type,
            ty: TypeRef::Struct(fields),
        });
        self
    }

    /// Builder-style helper declaring an arbitrary symbol
    pub fn with_symbol(mut self, name: &str, kind: SymbolKind, ty: TypeRef) -> Self {
        self.add_symbol(Symbol {
            name: name.to_string(),
            kind,
            ty,
        });
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Symbols in declaration order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

/// A resolved root: its canonical type plus the fields of its underlying struct
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeType {
    pub name: TypeRef,
    pub fields: Vec<FieldDescriptor>,
}

/// Names Go declares in the universe scope
/// Double-quote `text` with Go's escapes
///
/// Control characters and whitespace other than the ASCII space are
/// escaped as `\xHH` below U+0080 and `\uHHHH`/`\UHHHHHHHH` above;
/// everything else is kept as is.
pub fn go_quote(text: &str) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            ' ' => out.push(' '),
            c if c.is_control() || c.is_whitespace() => {
                let code = u32::from(c);
                let _ = if code < 0x80 {
                    write!(out, "\\x{code:02x}")
                } else if code <= 0xffff {
                    write!(out, "\\u{code:04x}")
                } else {
                    write!(out, "\\U{code:08x}")
                };
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn is_predeclared(name: &str) -> bool {
    matches!(
        name,
        "any"
            | "bool"
            | "byte"
            | "comparable"
            | "complex64"
            | "complex128"
            | "error"
            | "float32"
            | "float64"
            | "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "rune"
            | "string"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "uintptr"
    )
}
