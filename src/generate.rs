//! HTML site generation.
//!
//! The batch build: scan once, render every page in memory, validate the
//! whole link graph, and only then write anything. A strict build with broken
//! links fails before touching the output directory, so a published site is
//! never half-updated.
//!
//! ## Generated Pages
//!
//! - **Document pages** (`/{url}/index.html`): rendered markdown with
//!   breadcrumbs, site navigation and previous/next links
//! - **Folder pages**: a folder with an index document is that document's page;
//!   a folder without one gets a generated listing of its children
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                       # index.md
//! ├── about/index.html                 # about.md
//! ├── guides/
//! │   ├── index.html                   # generated listing
//! │   ├── installation/index.html      # 01-installation.md
//! │   └── advanced/index.html          # 10-advanced/README.md
//! └── posts/
//!     ├── index.html                   # posts/index.md
//!     └── hello-world/index.html       # 2024-01-15-hello-world.md
//! ```
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping. The
//! preview server renders through the same templates.

use crate::config::SiteConfig;
use crate::links::{self, BrokenLink, LinkChecker, LinkError, LinkPolicy};
use crate::render::{self, RenderedPage};
use crate::scan::{self, Node, PageRef, ScanError, Site};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Links(#[from] LinkError),
}

/// Outcome of a successful `check` or `build`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub pages: usize,
    pub auto_indexes: usize,
    /// Broken links tolerated by a lenient run.
    pub warnings: Vec<BrokenLink>,
    /// Index candidates ignored because another index won.
    pub shadowed: Vec<PathBuf>,
    /// Files written, empty for `check`.
    pub written: Vec<PathBuf>,
}

/// A scanned site with every page rendered in memory.
#[derive(Debug, Clone)]
pub struct RenderedSite {
    pub site: Site,
    /// One entry per `site.all_pages`, same order.
    pub pages: Vec<RenderedPage>,
}

const CSS: &str = include_str!("../static/style.css");

/// Read and render one page of the sequence.
pub fn render_page(page: &PageRef) -> Result<RenderedPage, BuildError> {
    let source = fs::read_to_string(&page.source_path).map_err(|source| BuildError::Read {
        path: page.source_path.clone(),
        source,
    })?;
    Ok(render::render_markdown(&source, &page.path, &page.source_path))
}

/// Scan `root` and render every page.
pub fn render_site(root: &Path, config: &SiteConfig) -> Result<RenderedSite, BuildError> {
    let site = scan::scan(root, &config.content_filter())?;
    let pages = site
        .all_pages
        .iter()
        .map(render_page)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RenderedSite { site, pages })
}

/// Link checker configured from `[links]`.
pub fn link_checker(site: &Site, config: &SiteConfig) -> LinkChecker {
    LinkChecker::for_site(
        site,
        config.links.max_suggestions,
        config.links.min_similarity,
    )
}

/// Render and validate without writing anything.
pub fn check(root: &Path, config: &SiteConfig, policy: LinkPolicy) -> Result<BuildReport, BuildError> {
    let (rendered, warnings) = render_and_validate(root, config, policy)?;
    Ok(report(&rendered, warnings))
}

/// Render, validate, then write the site to `output`.
pub fn build(
    root: &Path,
    output: &Path,
    config: &SiteConfig,
    policy: LinkPolicy,
) -> Result<BuildReport, BuildError> {
    let (rendered, warnings) = render_and_validate(root, config, policy)?;
    let mut report = report(&rendered, warnings);
    report.written = write_site(&rendered, output, config)?;
    Ok(report)
}

fn render_and_validate(
    root: &Path,
    config: &SiteConfig,
    policy: LinkPolicy,
) -> Result<(RenderedSite, Vec<BrokenLink>), BuildError> {
    let rendered = render_site(root, config)?;
    let checker = link_checker(&rendered.site, config);
    let broken = links::validate_site(&rendered.pages, &checker);
    debug!(
        "validated {} pages against {} urls: {} broken",
        rendered.pages.len(),
        checker.valid_urls().len(),
        broken.len()
    );
    let warnings = links::enforce(broken, policy)?;
    Ok((rendered, warnings))
}

fn report(rendered: &RenderedSite, warnings: Vec<BrokenLink>) -> BuildReport {
    BuildReport {
        pages: rendered.pages.len(),
        auto_indexes: rendered.site.auto_index_folders().len(),
        warnings,
        shadowed: rendered.site.shadowed.clone(),
        written: Vec::new(),
    }
}

fn write_site(
    rendered: &RenderedSite,
    output: &Path,
    config: &SiteConfig,
) -> Result<Vec<PathBuf>, BuildError> {
    let site = &rendered.site;
    let mut written = Vec::new();
    fs::create_dir_all(output)?;

    for (page, body) in site.all_pages.iter().zip(&rendered.pages) {
        let html = page_document(site, config, page, body, &[]);
        written.push(write_page(output, &page.url(), html)?);
    }
    for folder in site.auto_index_folders() {
        let html = auto_index_document(site, config, folder);
        written.push(write_page(output, &folder.url(), html)?);
    }
    Ok(written)
}

/// `<output>/<url>/index.html`
pub fn output_path(output: &Path, url: &str) -> PathBuf {
    let trimmed = url.trim_matches('/');
    if trimmed.is_empty() {
        output.join("index.html")
    } else {
        output.join(trimmed).join("index.html")
    }
}

fn write_page(output: &Path, url: &str, html: Markup) -> Result<PathBuf, BuildError> {
    let path = output_path(output, url);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, html.into_string())?;
    debug!("wrote {}", path.display());
    Ok(path)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
pub(crate) fn base_document(site_title: &str, title: &str, content: Markup) -> Markup {
    let full_title = if title.is_empty() || title == site_title {
        site_title.to_string()
    } else {
        format!("{title} · {site_title}")
    };
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (full_title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Renders the site header with title and breadcrumb
fn site_header(config: &SiteConfig, breadcrumb: Markup) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (config.title) }
            nav.breadcrumb {
                (breadcrumb)
            }
        }
    }
}

/// Breadcrumb trail: every ancestor folder, then the current title.
fn render_breadcrumb(site: &Site, path: &str, current: &str) -> Markup {
    html! {
        @for ancestor in site.ancestors(path) {
            a href=(ancestor.url()) { (ancestor.name) }
            " › "
        }
        span.current { (current) }
    }
}

/// Renders the site navigation tree, marking the current page
pub fn render_nav(site: &Site, current_url: &str) -> Markup {
    html! {
        nav.site-nav {
            ul {
                @for child in &site.root.children {
                    @if !child.is_index_of(&site.root) {
                        (render_nav_item(child, current_url))
                    }
                }
            }
        }
    }
}

fn render_nav_item(node: &Node, current_url: &str) -> Markup {
    let url = node.url();
    let is_current = url == current_url;
    let is_open = node.is_folder && current_url.starts_with(&url);

    html! {
        li class=[is_current.then_some("current")] {
            a href=(url) { (node.name) }
            @if node.is_folder && is_open {
                ul {
                    @for child in &node.children {
                        @if !child.is_index_of(node) {
                            (render_nav_item(child, current_url))
                        }
                    }
                }
            }
        }
    }
}

/// Previous/next links following the page sequence.
fn render_pager(site: &Site, path: &str) -> Markup {
    let (prev, next) = site.neighbors(path);
    html! {
        @if prev.is_some() || next.is_some() {
            nav.pager {
                @if let Some(prev) = prev {
                    a.prev href=(prev.url()) { "← " (prev.name) }
                }
                @if let Some(next) = next {
                    a.next href=(next.url()) { (next.name) " →" }
                }
            }
        }
    }
}

/// Inline warning listing broken links, used by the preview server.
pub fn broken_link_panel(broken: &[BrokenLink]) -> Markup {
    html! {
        @if !broken.is_empty() {
            aside.broken-links {
                h2 { (broken.len()) " broken link" @if broken.len() > 1 { "s" } }
                ul {
                    @for link in broken {
                        li {
                            code { (link.original_syntax) }
                            " → "
                            code { (link.link_url) }
                            span.location {
                                " in " (link.source_file.display())
                                @if let Some(line) = link.line { ":" (line) }
                            }
                            @if !link.suggestions.is_empty() {
                                div.suggestions {
                                    "Did you mean "
                                    @for (i, suggestion) in link.suggestions.iter().enumerate() {
                                        @if i > 0 { ", " }
                                        a href=(suggestion) { (suggestion) }
                                    }
                                    "?"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Full HTML document for one page of the sequence.
pub fn page_document(
    site: &Site,
    config: &SiteConfig,
    page: &PageRef,
    body: &RenderedPage,
    broken: &[BrokenLink],
) -> Markup {
    let title = body.title.as_deref().unwrap_or(&page.name);
    let crumb_path = page.folder.as_deref().unwrap_or(&page.path);
    let updated = site
        .node(&page.path)
        .and_then(|n| n.metadata.modified)
        .map(|m| m.format("%Y-%m-%d").to_string());

    let content = html! {
        (site_header(config, render_breadcrumb(site, crumb_path, title)))
        div.layout {
            (render_nav(site, &page.url()))
            main.page {
                (broken_link_panel(broken))
                article.content {
                    (PreEscaped(&body.html))
                }
                @if let Some(updated) = updated {
                    p.updated { "Last updated " (updated) }
                }
                (render_pager(site, &page.path))
            }
        }
    };

    base_document(&config.title, title, content)
}

/// Generated listing for a folder without an index document.
pub fn auto_index_document(site: &Site, config: &SiteConfig, folder: &Node) -> Markup {
    let content = html! {
        (site_header(config, render_breadcrumb(site, &folder.path, &folder.name)))
        div.layout {
            (render_nav(site, &folder.url()))
            main.page.auto-index {
                h1 { (folder.name) }
                ul.listing {
                    @for child in &folder.children {
                        li class=[child.is_folder.then_some("folder")] {
                            a href=(child.url()) { (child.name) }
                        }
                    }
                }
            }
        }
    };

    base_document(&config.title, &folder.name, content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn html_of(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
    }

    #[test]
    fn output_path_for_urls() {
        let out = Path::new("/out");
        assert_eq!(output_path(out, "/"), Path::new("/out/index.html"));
        assert_eq!(
            output_path(out, "/guides/installation/"),
            Path::new("/out/guides/installation/index.html")
        );
    }

    #[test]
    fn base_document_includes_doctype() {
        let doc = base_document("Docs", "Page", html! { p { "test" } }).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Page · Docs</title>"));
    }

    #[test]
    fn build_writes_pages_and_listings() {
        let tmp = setup_fixtures();
        let out = tempfile::TempDir::new().unwrap();
        let report = build(tmp.path(), out.path(), &SiteConfig::default(), LinkPolicy::Strict).unwrap();

        assert_eq!(report.pages, 10);
        assert_eq!(report.auto_indexes, 2);
        assert!(report.warnings.is_empty());

        for rel in [
            "index.html",
            "about/index.html",
            "guides/index.html",
            "guides/installation/index.html",
            "guides/advanced/index.html",
            "guides/advanced/tuning/index.html",
            "posts/index.html",
            "posts/hello-world/index.html",
            "reference/command-line/index.html",
        ] {
            assert!(out.path().join(rel).is_file(), "missing {rel}");
        }
        assert_eq!(report.written.len(), 12);
    }

    #[test]
    fn page_uses_body_title_and_breadcrumb() {
        let tmp = setup_fixtures();
        let out = tempfile::TempDir::new().unwrap();
        let config = crate::config::load_config(tmp.path()).unwrap();
        build(tmp.path(), out.path(), &config, LinkPolicy::Strict).unwrap();

        let html = html_of(&out.path().join("guides/installation/index.html"));
        assert!(html.contains("<title>Installing · Example Docs</title>"), "{html}");
        assert!(html.contains(r#"<a href="/guides/">Guides</a>"#));
        assert!(html.contains(r#"href="/guides/configuration/""#));
    }

    #[test]
    fn auto_index_lists_children_in_order() {
        let tmp = setup_fixtures();
        let out = tempfile::TempDir::new().unwrap();
        build(tmp.path(), out.path(), &SiteConfig::default(), LinkPolicy::Strict).unwrap();

        let html = html_of(&out.path().join("guides/index.html"));
        let html = &html[html.find(r#"<ul class="listing">"#).unwrap()..];
        let install = html.find(r#"<li><a href="/guides/installation/">"#).unwrap();
        let config = html.find(r#"<li><a href="/guides/configuration/">"#).unwrap();
        let advanced = html.find(r#"<li class="folder"><a href="/guides/advanced/">"#).unwrap();
        assert!(install < config && config < advanced);
    }

    #[test]
    fn strict_build_with_broken_link_writes_nothing() {
        let tmp = write_tree(&[("index.md", "# Home\n\n[[missing]]\n")]);
        let out = tempfile::TempDir::new().unwrap();
        let dist = out.path().join("dist");

        let result = build(tmp.path(), &dist, &SiteConfig::default(), LinkPolicy::Strict);
        match result {
            Err(BuildError::Links(LinkError::Broken(list))) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].link_url, "/missing/");
                assert_eq!(list[0].line, Some(3));
            }
            other => panic!("expected link failure, got {other:?}"),
        }
        assert!(!dist.exists());
    }

    #[test]
    fn lenient_build_warns_and_writes() {
        let tmp = write_tree(&[("index.md", "# Home\n\n[[missing]]\n")]);
        let out = tempfile::TempDir::new().unwrap();

        let report = build(tmp.path(), out.path(), &SiteConfig::default(), LinkPolicy::Lenient).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(out.path().join("index.html").is_file());
    }

    #[test]
    fn link_markup_in_code_samples_passes_strict_check() {
        let tmp = write_tree(&[
            ("index.md", "# Home\n\nSee [[about]].\n"),
            (
                "about.md",
                "# About\n\nLink markup looks like `<a href=\"/nowhere/\">x</a>`.\n\n\
                 ```html\n<a href=\"/elsewhere/\">y</a>\n```\n\n    [[missing]]\n",
            ),
        ]);
        let report = check(tmp.path(), &SiteConfig::default(), LinkPolicy::Strict).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn check_does_not_write() {
        let tmp = setup_fixtures();
        let report = check(tmp.path(), &SiteConfig::default(), LinkPolicy::Strict).unwrap();
        assert_eq!(report.pages, 10);
        assert!(report.written.is_empty());
    }

    #[test]
    fn scan_error_is_fatal() {
        let tmp = write_tree(&[("a.md", ""), ("01-a.md", "")]);
        let result = check(tmp.path(), &SiteConfig::default(), LinkPolicy::Lenient);
        assert!(matches!(result, Err(BuildError::Scan(_))));
    }

    #[test]
    fn broken_link_panel_shows_suggestions() {
        let broken = vec![BrokenLink {
            source_page: "/".into(),
            source_file: PathBuf::from("index.md"),
            line: Some(2),
            link_url: "/abot/".into(),
            original_syntax: "[[abot]]".into(),
            link_text: "abot".into(),
            suggestions: vec!["/about/".into()],
        }];
        let html = broken_link_panel(&broken).into_string();
        assert!(html.contains("1 broken link"));
        assert!(html.contains("index.md:2"));
        assert!(html.contains(r#"<a href="/about/">/about/</a>"#));
        assert!(broken_link_panel(&[]).into_string().is_empty());
    }

    #[test]
    fn html_escape_in_maud() {
        let tmp = write_tree(&[("a-<b>.md", "no heading")]);
        let site = scan_dir(tmp.path());
        let page = &site.all_pages[0];
        let body = render_page(page).unwrap();
        let html = page_document(&site, &SiteConfig::default(), page, &body, &[]).into_string();
        assert!(html.contains("A &lt;b&gt;"));
    }
}
