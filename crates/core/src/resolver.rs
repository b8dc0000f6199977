//! Type reference resolution
//!
//! Turns `<package-path>.<TypeName>` strings into [`CompositeType`]s and
//! answers "what does this type look like underneath" for the graph
//! builder.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::provider::TypeProvider;
use crate::types::{CompositeType, FieldDescriptor, Package, QualifiedName, Symbol, SymbolKind, TypeRef};

/// Split a type reference at its last `.` into package path and type name.
///
/// ```
/// use gograph_core::resolver::split_reference;
///
/// assert_eq!(
///     split_reference("github.com/tbpg/gograph.node").unwrap(),
///     ("github.com/tbpg/gograph", "node")
/// );
/// assert!(split_reference("node").is_err());
/// ```
pub fn split_reference(reference: &str) -> Result<(&str, &str)> {
    match reference.rsplit_once('.') {
        Some((package, name)) if !package.is_empty() && !name.is_empty() => Ok((package, name)),
        _ => Err(Error::MalformedReference(reference.to_string())),
    }
}

/// Resolves type references against a [`TypeProvider`]
pub struct Resolver<P> {
    provider: P,
}

impl<P: TypeProvider> Resolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Find the symbol a reference names, with its package
    pub fn lookup(&self, reference: &str) -> Result<(Arc<Package>, Symbol)> {
        let (package_path, name) = split_reference(reference)?;
        let package = self.provider.load_package(package_path)?;
        let symbol = package
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::TypeNotFound(reference.to_string()))?;
        Ok((package, symbol))
    }

    /// Resolve a reference to the struct it denotes
    ///
    /// Fails with a resolution error when the package or symbol is missing,
    /// and with [`Error::NotComposite`] when the symbol's underlying type is
    /// not a struct.
    pub fn resolve(&self, reference: &str) -> Result<CompositeType> {
        let (package, symbol) = self.lookup(reference)?;
        let name = symbol.object_type(&package.path);

        match self.underlying(&name)? {
            TypeRef::Struct(fields) => {
                tracing::debug!("resolved {} to struct with {} fields", name, fields.len());
                Ok(CompositeType { name, fields })
            }
            other => Err(Error::NotComposite {
                name: name.to_string(),
                underlying: other.to_string(),
            }),
        }
    }

    /// Follow named types through their declarations to a non-named type
    ///
    /// A chain of named types that loops back on itself is not a valid Go
    /// type; it yields an opaque `invalid recursive type`.
    pub fn underlying(&self, ty: &TypeRef) -> Result<TypeRef> {
        let mut current = ty.clone();
        let mut seen: HashSet<QualifiedName> = HashSet::new();

        while let TypeRef::Named(named) = &current {
            let qualified = named.clone();
            if !seen.insert(qualified.clone()) {
                return Ok(TypeRef::Opaque("invalid recursive type".to_string()));
            }
            let package = self.provider.load_package(&qualified.package)?;
            let symbol = package
                .lookup(&qualified.name)
                .ok_or_else(|| Error::TypeNotFound(qualified.to_string()))?;
            current = match symbol.kind {
                SymbolKind::Type | SymbolKind::Alias => symbol.ty.clone(),
                SymbolKind::Var | SymbolKind::Const => {
                    return Err(Error::TypeNotFound(qualified.to_string()))
                }
            };
        }

        Ok(current)
    }

    /// Fields of `ty` if its underlying type is a struct
    ///
    /// Types that cannot be resolved are treated as leaves.
    pub fn struct_fields(&self, ty: &TypeRef) -> Option<Vec<FieldDescriptor>> {
        match self.underlying(ty) {
            Ok(TypeRef::Struct(fields)) => Some(fields),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("treating {} as opaque: {}", ty, err);
                None
            }
        }
    }
}
