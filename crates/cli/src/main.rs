use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use gograph_core::config::Config;
use gograph_core::{CyclePolicy, GoSourceProvider};
use tracing_subscriber::EnvFilter;

mod render;

use render::{Format, Response};

/// gograph - Draw the field structure of a Go struct type
#[derive(Parser, Debug)]
#[command(name = "gograph")]
#[command(version)]
#[command(about = "Unroll a Go struct type into a Graphviz graph", long_about = None)]
struct Cli {
    /// Type to graph, as <package-path>.<TypeName>
    #[arg(short = 't', long = "type", value_name = "REF")]
    type_ref: String,

    /// Write output here instead of stdout
    #[arg(short = 'f', long, value_name = "FILE")]
    filename: Option<PathBuf>,

    /// Print the field trace and debug logs to stderr
    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum, default_value_t = Format::Dot)]
    format: Format,

    /// GOPATH workspaces (repeatable); defaults to $GOPATH
    #[arg(long, value_name = "DIR", action = clap::ArgAction::Append)]
    gopath: Vec<PathBuf>,

    /// Go installation root; defaults to $GOROOT
    #[arg(long, value_name = "DIR")]
    goroot: Option<PathBuf>,

    /// Module directory containing a go.mod (repeatable)
    #[arg(short = 'm', long = "module", value_name = "DIR", action = clap::ArgAction::Append)]
    modules: Vec<PathBuf>,

    #[arg(long, value_name = "NAME")]
    graph_name: Option<String>,

    /// Target operating system for build constraints; defaults to $GOOS or the host
    #[arg(long, value_name = "OS")]
    goos: Option<String>,

    /// Target architecture for build constraints; defaults to $GOARCH or the host
    #[arg(long, value_name = "ARCH")]
    goarch: Option<String>,

    /// Extra build tags, comma separated
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    tags: Vec<String>,

    /// How to handle structs that contain themselves
    #[arg(long, value_enum)]
    cycles: Option<Cycles>,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Cycles {
    Unroll,
    BackEdge,
}

impl From<Cycles> for CyclePolicy {
    fn from(cycles: Cycles) -> Self {
        match cycles {
            Cycles::Unroll => CyclePolicy::Unroll,
            Cycles::BackEdge => CyclePolicy::BackEdge,
        }
    }
}

impl Cli {
    /// The config file (or environment) with command-line overrides applied
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::from_env(),
        };
        if !self.gopath.is_empty() {
            config.gopath = self.gopath.clone();
        }
        if self.goroot.is_some() {
            config.goroot = self.goroot.clone();
        }
        config.modules.extend(self.modules.iter().cloned());
        if let Some(name) = &self.graph_name {
            config.graph_name = name.clone();
        }
        if let Some(cycles) = self.cycles {
            config.cycle_policy = cycles.into();
        }
        if self.goos.is_some() {
            config.goos = self.goos.clone();
        }
        if self.goarch.is_some() {
            config.goarch = self.goarch.clone();
        }
        config.build_tags.extend(self.tags.iter().cloned());
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.debug);

    let config = cli.config()?;
    tracing::debug!(?config, "resolved configuration");
    let provider = GoSourceProvider::new(&config);

    let mut trace: Box<dyn Write> = if cli.debug {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::sink())
    };

    let result = gograph_core::type_graph_dot(
        &provider,
        &cli.type_ref,
        config.cycle_policy,
        &config.graph_name,
        trace.as_mut(),
    );

    let output = match cli.format {
        Format::Json => {
            let mut bytes = serde_json::to_vec(&Response::from_result(&result))?;
            bytes.push(b'\n');
            bytes
        }
        Format::Dot => result?,
        Format::Png => render::to_png(&result?)?,
    };

    match &cli.filename {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_is_required() {
        assert!(Cli::try_parse_from(["gograph"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gograph", "--type", "example.com/people.Person"]).unwrap();

        assert_eq!(cli.type_ref, "example.com/people.Person");
        assert_eq!(cli.format, Format::Dot);
        assert!(!cli.debug);
        assert!(cli.filename.is_none());
        assert!(cli.cycles.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "gograph",
            "-t",
            "example.org/shop/inventory.Item",
            "--filename",
            "out.png",
            "--debug",
            "--format",
            "png",
            "--gopath",
            "/a",
            "--gopath",
            "/b",
            "--goroot",
            "/usr/local/go",
            "-m",
            "shop",
            "--graph-name",
            "items",
            "--cycles",
            "back-edge",
        ])
        .unwrap();

        assert_eq!(cli.filename, Some(PathBuf::from("out.png")));
        assert!(cli.debug);
        assert_eq!(cli.format, Format::Png);
        assert_eq!(cli.gopath, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(cli.modules, vec![PathBuf::from("shop")]);
        assert_eq!(cli.cycles, Some(Cycles::BackEdge));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gograph.toml");
        std::fs::write(
            &path,
            "gopath = [\"/from/file\"]\nmodules = [\"/mod/a\"]\ngraph_name = \"file\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "gograph",
            "--type",
            "p.T",
            "--config",
            path.to_str().unwrap(),
            "--module",
            "/mod/b",
            "--cycles",
            "back-edge",
        ])
        .unwrap();
        let config = cli.config().unwrap();

        assert_eq!(config.gopath, vec![PathBuf::from("/from/file")]);
        assert_eq!(config.modules, vec![PathBuf::from("/mod/a"), PathBuf::from("/mod/b")]);
        assert_eq!(config.graph_name, "file");
        assert_eq!(config.cycle_policy, CyclePolicy::BackEdge);
    }

    #[test]
    fn test_build_target_flags() {
        let cli = Cli::try_parse_from([
            "gograph",
            "--type",
            "p.T",
            "--goos",
            "darwin",
            "--goarch",
            "arm64",
            "--tags",
            "netgo,osusergo",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        let build = config.build_context();

        assert_eq!(build.goos, "darwin");
        assert_eq!(build.goarch, "arm64");
        assert!(build.matches_tag("netgo"));
        assert!(build.matches_tag("osusergo"));
        assert!(!build.matches_tag("linux"));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["gograph", "--type", "p.T", "--format", "svg"]).is_err());
    }
}
