//! Source file discovery for Go packages
//!
//! A Go package is the set of `.go` files directly inside one directory.
//! Test files and files excluded by build constraints for the target
//! platform never contribute to the package's type information.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::constraint::BuildContext;

/// Discover files matching glob patterns directly inside a directory
///
/// # Arguments
/// * `dir` - Directory to search (not recursed into)
/// * `patterns` - Glob patterns matched against the file name (e.g., &["*.go"])
///
/// # Returns
/// Sorted vector of absolute paths to matching files
///
/// # Example
/// ```no_run
/// use gograph_core::discovery;
///
/// let files = discovery::discover_files(std::path::Path::new("src/example.com/people"), &["*.go"]);
/// println!("Found {} files", files.len());
/// ```
pub fn discover_files(dir: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    // If dir doesn't exist or can't be canonicalized, return empty vec
    let canonical_dir = match dir.canonicalize() {
        Ok(path) => path,
        Err(_) => return Vec::new(),
    };

    let glob_matcher = match build_glob_matcher(patterns) {
        Ok(matcher) => matcher,
        Err(err) => {
            tracing::warn!("invalid glob pattern in {:?}: {}", patterns, err);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for result in build_walker(&canonical_dir) {
        match result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                if let Ok(rel_path) = entry.path().strip_prefix(&canonical_dir) {
                    if glob_matcher.is_match(rel_path) {
                        files.push(entry.into_path());
                    }
                }
            }
            Err(err) => {
                // Keep going; one unreadable entry shouldn't hide the package
                tracing::warn!("error walking {}: {}", canonical_dir.display(), err);
            }
        }
    }

    files.sort();
    files
}

/// Discover the Go files that make up the package in `dir` for `build`
///
/// Excludes `_test.go` files, files whose `_GOOS`/`_GOARCH` name suffix
/// names another platform, and files whose build constraint is not
/// satisfied.
///
/// # Example
/// ```no_run
/// use gograph_core::{constraint::BuildContext, discovery};
///
/// let dir = std::path::Path::new("src/example.com/people");
/// let files = discovery::discover_go_files(dir, &BuildContext::host());
/// println!("Found {} Go files", files.len());
/// ```
pub fn discover_go_files(dir: &Path, build: &BuildContext) -> Vec<PathBuf> {
    discover_files(dir, &["*.go"])
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.ends_with("_test.go") && build.matches_file_name(n))
        })
        .filter(|path| satisfies_constraint(path, build))
        .collect()
}

/// Whether the file's header build constraint holds
///
/// Unreadable files and malformed constraints exclude the file.
fn satisfies_constraint(path: &Path, build: &BuildContext) -> bool {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            tracing::warn!("skipping {}: {}", path.display(), err);
            return false;
        }
    };
    match build.matches_source(&source) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!("skipping {}: {:#}", path.display(), err);
            false
        }
    }
}

/// Build a glob matcher from the provided patterns
fn build_glob_matcher(patterns: &[&str]) -> Result<globset::GlobSet, globset::Error> {
    use globset::GlobSetBuilder;

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(globset::Glob::new(pattern)?);
    }
    builder.build()
}

/// Build a single-level walker over `dir`
///
/// Gitignore rules are not applied: a package's files are whatever the Go
/// toolchain would compile, ignored or not.
fn build_walker(dir: &Path) -> ignore::Walk {
    let mut builder = WalkBuilder::new(dir);
    builder
        .max_depth(Some(1))
        .standard_filters(false)
        .hidden(true);

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn linux() -> BuildContext {
        BuildContext::new("linux", "amd64")
    }

    #[test]
    fn test_discover_basic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        File::create(root.join("main.go")).unwrap();
        File::create(root.join("utils.go")).unwrap();
        File::create(root.join("README.md")).unwrap();

        let files = discover_go_files(root, &linux());

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files[0].ends_with("main.go"));
        assert!(files[1].ends_with("utils.go"));
    }

    #[test]
    fn test_excludes_test_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        File::create(root.join("people.go")).unwrap();
        File::create(root.join("people_test.go")).unwrap();

        let files = discover_go_files(root, &linux());

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("people.go"));
    }

    #[test]
    fn test_excludes_build_ignored_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("gen.go"), "//go:build ignore\n\npackage main\n").unwrap();
        fs::write(root.join("lib.go"), "//go:build linux\n\npackage lib\n").unwrap();

        let files = discover_go_files(root, &linux());

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lib.go"));
    }

    #[test]
    fn test_platform_files_follow_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("stat_darwin.go"), "package sys
").unwrap();
        fs::write(root.join("stat_linux.go"), "package sys
").unwrap();
        fs::write(root.join("mmap_linux_arm64.go"), "package sys
").unwrap();
        fs::write(root.join("old.go"), "// +build plan9\n\npackage sys\n").unwrap();
        fs::write(root.join("broken.go"), "//go:build linux &&\n\npackage sys\n").unwrap();

        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
                .collect()
        };

        assert_eq!(names(discover_go_files(root, &linux())), vec!["stat_linux.go"]);
        assert_eq!(
            names(discover_go_files(root, &BuildContext::new("darwin", "arm64"))),
            vec!["stat_darwin.go"]
        );
        assert_eq!(
            names(discover_go_files(root, &BuildContext::new("linux", "arm64"))),
            vec!["mmap_linux_arm64.go", "stat_linux.go"]
        );
    }

    #[test]
    fn test_does_not_recurse() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("sub")).unwrap();
        File::create(root.join("top.go")).unwrap();
        File::create(root.join("sub/nested.go")).unwrap();

        let files = discover_go_files(root, &linux());

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("top.go"));
    }

    #[test]
    fn test_gitignore_not_applied() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join(".gitignore"), "generated.go\n").unwrap();
        File::create(root.join("generated.go")).unwrap();

        let files = discover_go_files(root, &linux());

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let files = discover_go_files(Path::new("/definitely/not/a/real/dir"), &linux());
        assert!(files.is_empty());
    }
}
