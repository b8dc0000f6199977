//! Type-information providers
//!
//! The resolver never reads source itself: it asks a [`TypeProvider`] for a
//! package by import path and inspects the returned [`Package`]. Two
//! providers ship with the crate:
//!
//! - [`GoSourceProvider`] loads packages from Go source trees (modules,
//!   GOPATH workspaces, GOROOT) with the tree-sitter Go grammar
//! - [`MemoryProvider`] serves packages assembled in memory, for tests and
//!   embedders with their own type information

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::constraint::BuildContext;
use crate::discovery;
use crate::error::{Error, Result};
use crate::parser;
use crate::types::Package;

/// Source of package type information.
///
/// Implementations must tolerate concurrent calls for independent packages.
pub trait TypeProvider: Send + Sync {
    /// Load the package with the given import path.
    ///
    /// Fails with [`Error::PackageNotFound`] when the package is unknown or
    /// cannot be read.
    fn load_package(&self, path: &str) -> Result<Arc<Package>>;
}

impl<P: TypeProvider + ?Sized> TypeProvider for &P {
    fn load_package(&self, path: &str) -> Result<Arc<Package>> {
        (**self).load_package(path)
    }
}

/// Provider backed by packages registered up front
#[derive(Debug, Default)]
pub struct MemoryProvider {
    packages: HashMap<String, Arc<Package>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package under its own import path
    pub fn with_package(mut self, package: Package) -> Self {
        self.insert(package);
        self
    }

    pub fn insert(&mut self, package: Package) {
        self.packages.insert(package.path.clone(), Arc::new(package));
    }
}

impl TypeProvider for MemoryProvider {
    fn load_package(&self, path: &str) -> Result<Arc<Package>> {
        self.packages
            .get(path)
            .cloned()
            .ok_or_else(|| Error::PackageNotFound {
                path: path.to_string(),
                reason: "unknown package".to_string(),
            })
    }
}

/// A Go module: import-path prefix plus the directory holding its `go.mod`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoot {
    pub path: String,
    pub dir: PathBuf,
}

impl ModuleRoot {
    /// Read the `module` directive of `<dir>/go.mod`
    pub fn read(dir: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(dir.join("go.mod")).ok()?;
        let path = text.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("module")?;
            let path = rest.trim().trim_matches('"');
            (!path.is_empty()).then(|| path.to_string())
        })?;
        Some(Self {
            path,
            dir: dir.to_path_buf(),
        })
    }

    /// Directory for `import_path` if it belongs to this module
    fn package_dir(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.dir.clone());
        }
        let rest = import_path.strip_prefix(&self.path)?.strip_prefix('/')?;
        Some(self.dir.join(rest))
    }
}

/// Provider reading Go source trees
///
/// Loaded packages are cached for the provider's lifetime; failures are
/// not cached.
pub struct GoSourceProvider {
    modules: Vec<ModuleRoot>,
    source_roots: Vec<PathBuf>,
    build: BuildContext,
    cache: Mutex<HashMap<String, Arc<Package>>>,
}

thread_local! {
    /// Packages this thread is in the middle of loading
    static LOADING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks a package as loading on this thread until dropped
struct LoadGuard;

impl LoadGuard {
    /// `None` if `path` is already loading on this thread (an import cycle)
    fn enter(path: &str) -> Option<Self> {
        LOADING.with(|loading| {
            let mut loading = loading.borrow_mut();
            if loading.iter().any(|p| p == path) {
                return None;
            }
            loading.push(path.to_string());
            Some(LoadGuard)
        })
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        LOADING.with(|loading| {
            loading.borrow_mut().pop();
        });
    }
}

impl GoSourceProvider {
    pub fn new(config: &Config) -> Self {
        let modules = config
            .modules
            .iter()
            .filter_map(|dir| {
                let module = ModuleRoot::read(dir);
                if module.is_none() {
                    tracing::warn!("ignoring module root {}: no readable go.mod", dir.display());
                }
                module
            })
            .collect();

        Self {
            modules,
            source_roots: config.source_roots(),
            build: config.build_context(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Provider over plain source roots, each laid out like `$GOPATH/src`,
    /// selecting files for the host platform
    pub fn from_source_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            modules: Vec::new(),
            source_roots: roots,
            build: BuildContext::host(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn build_context(&self) -> &BuildContext {
        &self.build
    }

    pub fn modules(&self) -> &[ModuleRoot] {
        &self.modules
    }

    /// Locate the package directory and its Go files
    ///
    /// Candidates are tried in order (modules, then source roots); the
    /// first directory holding at least one eligible `.go` file wins.
    pub fn package_files(&self, import_path: &str) -> Option<(PathBuf, Vec<PathBuf>)> {
        let candidates = self
            .modules
            .iter()
            .filter_map(|m| m.package_dir(import_path))
            .chain(self.source_roots.iter().map(|root| root.join(import_path)));

        for dir in candidates {
            let files = discovery::discover_go_files(&dir, &self.build);
            if !files.is_empty() {
                return Some((dir, files));
            }
        }
        None
    }
}

impl TypeProvider for GoSourceProvider {
    fn load_package(&self, path: &str) -> Result<Arc<Package>> {
        if let Some(package) = self.cache.lock().get(path) {
            return Ok(Arc::clone(package));
        }

        let not_found = |reason: String| Error::PackageNotFound {
            path: path.to_string(),
            reason,
        };

        if !is_valid_import_path(path) {
            return Err(not_found("invalid import path".to_string()));
        }

        let Some(_guard) = LoadGuard::enter(path) else {
            return Err(not_found("import cycle".to_string()));
        };

        let (dir, files) = self
            .package_files(path)
            .ok_or_else(|| not_found("no Go files found in any source root".to_string()))?;

        tracing::debug!("loading package {} from {}", path, dir.display());
        let package = parser::parse_package(path, &files, self).map_err(|e| not_found(format!("{e:#}")))?;
        let package = Arc::new(package);

        // A concurrent load may have won the race; keep whichever landed first
        let mut cache = self.cache.lock();
        let entry = cache.entry(path.to_string()).or_insert(package);
        Ok(Arc::clone(entry))
    }
}

/// Import paths are relative, slash-separated and free of `.`/`..` elements
fn is_valid_import_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
