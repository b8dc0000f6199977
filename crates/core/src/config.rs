//! Configuration for type resolution and graph output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::builder::CyclePolicy;
use crate::constraint::BuildContext;
use crate::error::{Error, Result};

/// Where to look for Go packages and how to draw them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// GOPATH workspaces; packages are looked up under each `<entry>/src`
    #[serde(default)]
    pub gopath: Vec<PathBuf>,
    /// Go installation root; the standard library lives under `<goroot>/src`
    #[serde(default)]
    pub goroot: Option<PathBuf>,
    /// Module directories (each holding a `go.mod`), searched first
    #[serde(default)]
    pub modules: Vec<PathBuf>,
    /// Name of the emitted digraph
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
    /// Target OS for build constraints; the host's when unset
    #[serde(default)]
    pub goos: Option<String>,
    /// Target architecture for build constraints; the host's when unset
    #[serde(default)]
    pub goarch: Option<String>,
    /// Extra build tags, as with `go build -tags`
    #[serde(default)]
    pub build_tags: Vec<String>,
}

pub const DEFAULT_GRAPH_NAME: &str = "goviz";

fn default_graph_name() -> String {
    DEFAULT_GRAPH_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gopath: Vec::new(),
            goroot: None,
            modules: Vec::new(),
            graph_name: default_graph_name(),
            cycle_policy: CyclePolicy::default(),
            goos: None,
            goarch: None,
            build_tags: Vec::new(),
        }
    }
}

impl Config {
    /// Configuration from `GOPATH`, `GOROOT`, `GOOS` and `GOARCH`.
    ///
    /// An unset `GOPATH` falls back to `$HOME/go`, as the Go toolchain does.
    pub fn from_env() -> Self {
        let gopath = match std::env::var_os("GOPATH") {
            Some(value) if !value.is_empty() => std::env::split_paths(&value).collect(),
            _ => std::env::var_os("HOME")
                .map(|home| vec![PathBuf::from(home).join("go")])
                .unwrap_or_default(),
        };
        let goroot = std::env::var_os("GOROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            gopath,
            goroot,
            goos: non_empty("GOOS"),
            goarch: non_empty("GOARCH"),
            ..Default::default()
        }
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Platform files are selected for
    pub fn build_context(&self) -> BuildContext {
        let host = BuildContext::host();
        BuildContext::new(
            self.goos.clone().unwrap_or(host.goos),
            self.goarch.clone().unwrap_or(host.goarch),
        )
        .with_tags(self.build_tags.iter().cloned())
    }

    /// Source roots for GOPATH-style lookup, in search order
    pub fn source_roots(&self) -> Vec<PathBuf> {
        self.gopath
            .iter()
            .map(|entry| entry.join("src"))
            .chain(self.goroot.iter().map(|root| root.join("src")))
            .collect()
    }
}
