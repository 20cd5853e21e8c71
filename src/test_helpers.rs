//! Shared test utilities for the simple-docs test suite.
//!
//! Provides fixture setup, ad-hoc content trees, and lookup helpers that work
//! with scan-phase data structures (`Site`, `Node`, `PageRef`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let site = scan_dir(tmp.path());
//!
//! let guides = find_node(&site, "guides");
//! assert_eq!(child_names(guides), vec!["01-installation.md", "02-configuration.md", "10-advanced"]);
//!
//! let tmp = write_tree(&[("about.md", "# About"), ("guides/01-intro.md", "")]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::listing::ContentFilter;
use crate::scan::{Node, PageRef, Site, scan};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Create a temp content tree from `(relative path, contents)` pairs.
///
/// Parent directories are created as needed.
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = tmp.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, contents).unwrap();
    }
    tmp
}

/// Scan with the default filter. Panics on scan errors.
pub fn scan_dir(root: &Path) -> Site {
    scan(root, &ContentFilter::default())
        .unwrap_or_else(|e| panic!("scan of {} failed: {e}", root.display()))
}

// =========================================================================
// Site lookups: panic with a clear message on miss
// =========================================================================

/// Find a node by content path. Panics if not found.
pub fn find_node<'a>(site: &'a Site, path: &str) -> &'a Node {
    site.node(path).unwrap_or_else(|| {
        let paths: Vec<&str> = site.nodes().iter().map(|n| n.path.as_str()).collect();
        panic!("node '{path}' not found. Available: {paths:?}")
    })
}

/// Find a page entry by document path. Panics if not found.
pub fn find_page<'a>(site: &'a Site, path: &str) -> &'a PageRef {
    site.page(path).unwrap_or_else(|| {
        let paths = page_paths(site);
        panic!("page '{path}' not found. Available: {paths:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Document paths of the page sequence, in order.
pub fn page_paths(site: &Site) -> Vec<&str> {
    site.all_pages.iter().map(|p| p.path.as_str()).collect()
}

/// Display names of the page sequence, in order.
pub fn page_names(site: &Site) -> Vec<&str> {
    site.all_pages.iter().map(|p| p.name.as_str()).collect()
}

/// File names of a node's children, in sibling order.
pub fn child_names(node: &Node) -> Vec<&str> {
    node.children.iter().map(|c| c.file_name()).collect()
}
