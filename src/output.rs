//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each entity (folder,
//! page) leads with its positional index and display title. Filesystem paths
//! show up as secondary context on indented `Source:` lines, so the output
//! reads as a table of contents that can still be traced back to files.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Home → /
//!     Source: index.md
//! 001 Guides/ → /guides/ (auto index)
//!     001 Installation → /guides/installation/
//!         Source: guides/01-installation.md
//!     002 Advanced/ → /guides/advanced/
//!         Source: guides/10-advanced/README.md
//!
//! 10 pages, 2 auto-indexed folders
//! ```
//!
//! ## Check / Build
//!
//! ```text
//! Broken links
//!     index.md:3: [[abot]] -> /abot/ (did you mean /about/?)
//!
//! Checked 10 pages, 2 auto-indexed folders, 1 broken link
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions do no I/O.

use crate::generate::BuildReport;
use crate::links::BrokenLink;
use crate::scan::{Node, Site};
use std::net::SocketAddr;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title + URL.
///
/// ```text
/// 001 Guides/ → /guides/
/// 002 About → /about/
/// ```
fn entity_header(index: usize, node: &Node) -> String {
    let marker = if node.is_folder { "/" } else { "" };
    format!(
        "{} {}{} \u{2192} {}",
        format_index(index),
        node.name,
        marker,
        node.url()
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Display a path relative to `root` when possible.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the scanned tree.
///
/// Index documents are not listed as their own entries: they appear as the
/// `Source:` of the folder they serve.
pub fn format_scan_output(site: &Site) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("{} \u{2192} /", site.root.name));
    if let Some(index) = &site.root.index_path {
        lines.push(format!("    Source: {}", index));
    }
    walk(&site.root, 0, &mut lines);

    if !site.shadowed.is_empty() {
        lines.push(String::new());
        lines.push("Shadowed".to_string());
        for path in &site.shadowed {
            lines.push(format!("    {}", relative(path, &site.root.source_path)));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(site.all_pages.len(), "page"),
        plural(site.auto_index_folders().len(), "auto-indexed folder")
    ));
    lines
}

fn walk(folder: &Node, depth: usize, lines: &mut Vec<String>) {
    let base = indent(depth);
    let listed = folder.children.iter().filter(|c| !c.is_index_of(folder));
    for (i, child) in listed.enumerate() {
        let mut header = entity_header(i + 1, child);
        if child.is_folder && !child.has_index {
            header.push_str(" (auto index)");
        }
        lines.push(format!("{base}{header}"));

        let source = if child.is_folder {
            child.index_path.as_deref()
        } else {
            Some(child.path.as_str())
        };
        if let Some(source) = source {
            lines.push(format!("{base}    Source: {source}"));
        }

        if child.is_folder {
            walk(child, depth + 1, lines);
        }
    }
}

/// Print scan output to stdout.
pub fn print_scan_output(site: &Site) {
    for line in format_scan_output(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Link report
// ============================================================================

/// Format broken links, one per line under a header.
pub fn format_broken_links(broken: &[BrokenLink]) -> Vec<String> {
    if broken.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Broken links".to_string()];
    lines.extend(broken.iter().map(|link| format!("    {link}")));
    lines
}

/// Print broken links to stdout.
pub fn print_broken_links(broken: &[BrokenLink]) {
    for line in format_broken_links(broken) {
        println!("{}", line);
    }
}

// ============================================================================
// Check / build output
// ============================================================================

/// Format the result of `check`.
pub fn format_check_output(report: &BuildReport) -> Vec<String> {
    let mut lines = format_broken_links(&report.warnings);
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Checked {}, {}, {}",
        plural(report.pages, "page"),
        plural(report.auto_indexes, "auto-indexed folder"),
        plural(report.warnings.len(), "broken link")
    ));
    lines
}

/// Format the result of `build`: written files relative to `output`.
pub fn format_build_output(report: &BuildReport, output: &Path) -> Vec<String> {
    let mut lines = format_broken_links(&report.warnings);
    if !lines.is_empty() {
        lines.push(String::new());
    }
    for (i, path) in report.written.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), relative(path, output)));
    }
    lines.push(format!(
        "Generated {}, {}",
        plural(report.pages, "page"),
        plural(report.auto_indexes, "auto-indexed folder")
    ));
    if !report.warnings.is_empty() {
        lines.push(format!(
            "{} ignored",
            plural(report.warnings.len(), "broken link")
        ));
    }
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &BuildReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, output: &Path) {
    for line in format_build_output(report, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Serve output
// ============================================================================

/// Format the line shown once the preview server is listening.
pub fn format_serve_banner(addr: SocketAddr, source: &Path) -> Vec<String> {
    vec![
        format!("Serving {} at http://{}/", source.display(), addr),
        "Press Ctrl+C to stop".to_string(),
    ]
}

/// Print the serve banner to stdout.
pub fn print_serve_banner(addr: SocketAddr, source: &Path) {
    for line in format_serve_banner(addr, source) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "page"), "1 page");
        assert_eq!(plural(0, "page"), "0 pages");
        assert_eq!(plural(3, "page"), "3 pages");
    }

    // =========================================================================
    // Scan output
    // =========================================================================

    #[test]
    fn scan_output_lists_tree() {
        let tmp = setup_fixtures();
        let site = scan_dir(tmp.path());
        let lines = format_scan_output(&site);

        assert_eq!(lines[0], "Home \u{2192} /");
        assert_eq!(lines[1], "    Source: index.md");
        assert!(lines.contains(&"001 About \u{2192} /about/".to_string()));
        assert!(lines.contains(&"002 Guides/ \u{2192} /guides/ (auto index)".to_string()));
        assert!(
            lines.contains(&"    001 Installation \u{2192} /guides/installation/".to_string())
        );
        assert!(lines.contains(&"        Source: guides/10-advanced/README.md".to_string()));
        assert_eq!(lines.last().unwrap(), "10 pages, 2 auto-indexed folders");
    }

    #[test]
    fn scan_output_skips_index_documents_as_entries() {
        let tmp = setup_fixtures();
        let site = scan_dir(tmp.path());
        let lines = format_scan_output(&site);
        assert!(!lines.iter().any(|l| l.contains("Index \u{2192}")));
        assert!(!lines.iter().any(|l| l.contains("Readme \u{2192}")));
    }

    #[test]
    fn scan_output_reports_shadowed_index() {
        let tmp = write_tree(&[("index.md", "# Home"), ("README.md", "# Readme")]);
        let site = scan_dir(tmp.path());
        let lines = format_scan_output(&site);
        let at = lines.iter().position(|l| l == "Shadowed").unwrap();
        // Exact byte order: README.md sorts before index.md and wins
        assert_eq!(lines[at + 1], "    index.md");
    }

    // =========================================================================
    // Check / build output
    // =========================================================================

    fn broken() -> BrokenLink {
        BrokenLink {
            source_page: "/".to_string(),
            source_file: PathBuf::from("index.md"),
            line: Some(3),
            link_url: "/abot/".to_string(),
            original_syntax: "[[abot]]".to_string(),
            link_text: "abot".to_string(),
            suggestions: vec!["/about/".to_string()],
        }
    }

    #[test]
    fn broken_links_empty_prints_nothing() {
        assert!(format_broken_links(&[]).is_empty());
    }

    #[test]
    fn broken_links_one_per_line() {
        let lines = format_broken_links(&[broken()]);
        assert_eq!(
            lines,
            vec![
                "Broken links".to_string(),
                "    index.md:3: [[abot]] -> /abot/ (did you mean /about/?)".to_string(),
            ]
        );
    }

    #[test]
    fn check_output_summary() {
        let report = BuildReport {
            pages: 4,
            auto_indexes: 1,
            warnings: vec![broken()],
            ..Default::default()
        };
        let lines = format_check_output(&report);
        assert_eq!(lines[0], "Broken links");
        assert_eq!(
            lines.last().unwrap(),
            "Checked 4 pages, 1 auto-indexed folder, 1 broken link"
        );
    }

    #[test]
    fn build_output_lists_written_files() {
        let out = PathBuf::from("/tmp/dist");
        let report = BuildReport {
            pages: 2,
            auto_indexes: 0,
            written: vec![out.join("index.html"), out.join("about/index.html")],
            ..Default::default()
        };
        let lines = format_build_output(&report, &out);
        assert_eq!(
            lines,
            vec![
                "001 index.html".to_string(),
                "002 about/index.html".to_string(),
                "Generated 2 pages, 0 auto-indexed folders".to_string(),
            ]
        );
    }

    #[test]
    fn serve_banner_shows_url() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let lines = format_serve_banner(addr, Path::new("content"));
        assert_eq!(lines[0], "Serving content at http://127.0.0.1:4000/");
    }
}
