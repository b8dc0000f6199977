//! Parser module for extracting type information from Go packages
//!
//! # Two-Pass Architecture
//!
//! A Go package spans several files, and a field in one file may name a
//! type declared in another. Loading therefore runs in two passes:
//! - **Pass 1**: parse every file, read its package clause, and collect the
//!   type names declared anywhere in the package
//! - **Pass 2**: lower each file's declarations with that package scope, so
//!   `Address` in `person.go` resolves to the `Address` of `address.go`
//!   rather than being mistaken for an unknown or predeclared name
//!
//! Files are processed in sorted path order so the same directory always
//! yields the same symbol order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::provider::TypeProvider;
use crate::types::Package;

pub mod go;

use go::{GoFile, PackageScope};

/// Parse the given files as one package with import path `import_path`
///
/// # Behavior
/// - Paths are sorted for deterministic symbol order
/// - The first file's package clause names the package; files declaring a
///   different package are skipped with a warning
/// - When two files declare the same name, the first declaration wins
/// - Unqualified names declared by dot-imported packages are looked up
///   through `provider`
///
/// # Example
/// ```no_run
/// use gograph_core::{constraint::BuildContext, discovery, parser, MemoryProvider};
///
/// let dir = std::path::Path::new("gopath/src/example.com/people");
/// let files = discovery::discover_go_files(dir, &BuildContext::host());
/// let package = parser::parse_package("example.com/people", &files, &MemoryProvider::new()).unwrap();
/// println!("{} declares {} symbols", package.path, package.symbols().len());
/// ```
pub fn parse_package(
    import_path: &str,
    paths: &[PathBuf],
    provider: &dyn TypeProvider,
) -> anyhow::Result<Package> {
    let mut sorted_paths: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    sorted_paths.sort();

    // Pass 1: parse and establish the package scope
    let mut files: Vec<GoFile> = Vec::with_capacity(sorted_paths.len());
    let mut package_name: Option<String> = None;
    for path in sorted_paths {
        let file = go::parse_file(path)?;
        let Some(name) = file.package_name() else {
            tracing::warn!("skipping {}: no package clause", path.display());
            continue;
        };
        match &package_name {
            None => package_name = Some(name),
            Some(expected) if *expected != name => {
                tracing::warn!(
                    "skipping {}: package {} does not match {}",
                    path.display(),
                    name,
                    expected
                );
                continue;
            }
            Some(_) => {}
        }
        files.push(file);
    }

    let package_name = package_name
        .ok_or_else(|| anyhow::anyhow!("no Go source files for package {import_path}"))?;

    let declared: HashSet<String> = files
        .iter()
        .flat_map(GoFile::declared_type_names)
        .collect();

    // Pass 2: lower declarations
    let scope = PackageScope {
        path: import_path,
        declared: &declared,
        provider,
    };
    let mut package = Package::new(import_path, package_name);
    for file in &files {
        for symbol in file.symbols(&scope) {
            package.add_symbol(symbol);
        }
        package.files.push(file.path.clone());
    }

    tracing::debug!(
        "parsed package {} ({} files, {} symbols)",
        import_path,
        package.files.len(),
        package.symbols().len()
    );

    Ok(package)
}
