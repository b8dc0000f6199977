//! Integration test for package file discovery
//!
//! Uses the fixtures under `tests/test-fixtures/` to verify which files make
//! up a Go package and where a package directory is found.

use gograph_core::config::Config;
use gograph_core::constraint::BuildContext;
use gograph_core::{discovery, GoSourceProvider};
use std::path::Path;

#[test]
fn test_integration_discovery_fixture() {
    let fixture_path = Path::new("tests/test-fixtures/gopath/src/example.com/people");
    assert!(fixture_path.exists(), "Fixture directory should exist");

    let files = discovery::discover_go_files(fixture_path, &BuildContext::host());

    // Excludes: person_test.go (test file) and gen.go (`//go:build ignore`)
    let file_names: Vec<&str> = files
        .iter()
        .filter_map(|p| p.file_name())
        .filter_map(|n| n.to_str())
        .collect();
    assert_eq!(file_names, vec!["address.go", "person.go"]);

    assert!(files.iter().all(|p| p.is_absolute()), "All paths should be absolute");
}

#[test]
fn test_integration_platform_files() {
    let fixture_path = Path::new("tests/test-fixtures/gopath/src/example.com/sys");
    let names = |ctx: &BuildContext| -> Vec<String> {
        discovery::discover_go_files(fixture_path, ctx)
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect()
    };

    // legacy.go is `// +build plan9`
    assert_eq!(
        names(&BuildContext::new("linux", "amd64")),
        vec!["mmap.go", "stat_linux.go"]
    );
    assert_eq!(
        names(&BuildContext::new("darwin", "arm64")),
        vec!["mmap_other.go", "stat_darwin.go"]
    );
    assert_eq!(
        names(&BuildContext::new("plan9", "386")),
        vec!["legacy.go", "mmap_other.go"]
    );
}

#[test]
fn test_integration_package_lookup_order() {
    let config = Config {
        gopath: vec!["tests/test-fixtures/gopath".into()],
        modules: vec!["tests/test-fixtures/shop".into()],
        ..Default::default()
    };
    let provider = GoSourceProvider::new(&config);

    assert_eq!(provider.modules().len(), 1);
    assert_eq!(provider.modules()[0].path, "example.org/shop");

    let (dir, files) = provider
        .package_files("example.org/shop/inventory")
        .expect("module package should be found");
    assert!(dir.ends_with("shop/inventory"));
    assert_eq!(files.len(), 1);

    let (dir, _) = provider
        .package_files("example.com/geo")
        .expect("GOPATH package should be found");
    assert!(dir.ends_with("src/example.com/geo"));

    // The module root itself holds no Go files
    assert!(provider.package_files("example.org/shop").is_none());
    assert!(provider.package_files("example.com/nowhere").is_none());
}
