//! Cross-reference resolution and link validation.
//!
//! Authors write links two ways, and both end up as canonical URLs:
//!
//! - wikilinks: `[[Target]]`, `[[Target|Label]]`, `[[Target#anchor]]`
//! - markdown links to source files: `[Setup](02-configuration.md)`
//!
//! A target containing `/` is root-relative; anything else is relative to
//! the directory of the page it appears on. Either way the result goes
//! through [`url_for`], so `[[guides/index]]` and `[[guides]]` both land on
//! `/guides/`.
//!
//! ## Validation
//!
//! After rendering, every root-relative anchor `href` in a page body is checked
//! against [`ValidUrls`]: every page in the site, every folder that gets a
//! generated listing, and `/`. Each miss becomes a [`BrokenLink`] carrying
//! the source line and authored syntax when the renderer recorded them, and
//! up to a few "did you mean" suggestions ranked by normalized edit distance.
//!
//! [`LinkPolicy::Strict`] turns any broken link into a build failure;
//! [`LinkPolicy::Lenient`] reports the same list as warnings.

use crate::naming::{is_markup_extension, strip_markup_extension};
use crate::render::{self, RenderedPage};
use crate::scan::Site;
use crate::urls::url_for;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::LazyLock;
use strsim::normalized_levenshtein;
use thiserror::Error;

static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]|\n]+)(?:\|([^\[\]\n]+))?\]\]").unwrap());

/// `href` of an anchor element. Escaped markup (`&lt;a href=`) never matches.
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// A `[[Target|Label]]` token found in document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub label: Option<String>,
    /// Byte range of the whole token in the source.
    pub span: Range<usize>,
    /// 1-based source line.
    pub line: usize,
}

impl WikiLink {
    /// Text to display: the label, or the target as written.
    pub fn text(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.target)
    }
}

/// Where a rendered internal link came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    /// The href written into the page.
    pub url: String,
    pub text: String,
    /// The authored syntax (`[[about]]`, `[x](a.md)`).
    pub original: String,
    pub line: usize,
}

/// Find wikilink tokens outside code: fenced and indented blocks and inline
/// code spans are left alone.
///
/// Malformed tokens (empty target, nested brackets, line breaks inside) do
/// not match and stay literal text.
pub fn parse_wikilinks(source: &str) -> Vec<WikiLink> {
    let code = code_ranges(source);
    let mut links = Vec::new();
    let mut offset = 0;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += line.len();

        for caps in WIKILINK.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            let span = line_start + whole.start()..line_start + whole.end();
            if code.iter().any(|r| r.start < span.end && span.start < r.end) {
                continue;
            }
            let target = caps[1].trim();
            if target.is_empty() {
                continue;
            }
            let label = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string);
            links.push(WikiLink {
                target: target.to_string(),
                label,
                span,
                line: index + 1,
            });
        }
    }
    links
}

/// Byte ranges of code blocks and code spans, as the renderer will see them.
fn code_ranges(source: &str) -> Vec<Range<usize>> {
    Parser::new_ext(source, render::parser_options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
            _ => None,
        })
        .collect()
}

/// Canonical URL of a wikilink target written on the page at `page_path`.
///
/// An anchor (`#part`) is carried over; a bare `#part` targets the page
/// itself.
pub fn resolve_target(target: &str, page_path: &str) -> String {
    let (path, anchor) = split_anchor(target.trim());
    let path = path.trim();
    let url = if path.is_empty() {
        url_for(page_path)
    } else if path.contains('/') {
        url_for(&normalize_path("", path))
    } else {
        url_for(&normalize_path(parent_dir(page_path), path))
    };
    with_anchor(url, anchor)
}

/// Canonical URL for a markdown link destination that points at a source
/// document (`02-configuration.md`, `../about.md#team`).
///
/// Returns `None` for anything else: external URLs, plain anchors, site URLs
/// and asset paths are left untouched.
pub fn resolve_markdown_href(dest: &str, page_path: &str) -> Option<String> {
    if dest.is_empty() || dest.starts_with('#') || dest.starts_with("//") || has_scheme(dest) {
        return None;
    }
    let (path, anchor) = split_anchor(dest);
    let path = path.split('?').next().unwrap_or(path);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if strip_markup_extension(file_name).len() == file_name.len() {
        return None;
    }
    let decoded = urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned());
    let full = if decoded.starts_with('/') {
        normalize_path("", &decoded)
    } else {
        normalize_path(parent_dir(page_path), &decoded)
    };
    Some(with_anchor(url_for(&full), anchor))
}

/// Whether an href is a root-relative link into this site.
pub fn is_internal_href(href: &str) -> bool {
    href.starts_with('/') && !href.starts_with("//")
}

/// The page URL an internal href addresses, or `None` when it should not be
/// validated (external, asset file, not root-relative).
pub fn normalize_href(href: &str) -> Option<String> {
    if !is_internal_href(href) {
        return None;
    }
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let decoded = urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned());

    if !decoded.ends_with('/') {
        let last = decoded.rsplit('/').next().unwrap_or_default();
        return match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                is_markup_extension(ext).then(|| url_for(&decoded))
            }
            _ => Some(format!("{decoded}/")),
        };
    }
    Some(decoded)
}

fn has_scheme(dest: &str) -> bool {
    match dest.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn split_anchor(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor).filter(|a| !a.is_empty())),
        None => (target, None),
    }
}

fn with_anchor(url: String, anchor: Option<&str>) -> String {
    match anchor {
        Some(anchor) => format!("{url}#{anchor}"),
        None => url,
    }
}

fn parent_dir(page_path: &str) -> &str {
    page_path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Join `rel` onto `dir`, resolving `.` and `..` without leaving the root.
fn normalize_path(dir: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    if rel.starts_with('/') {
        parts.clear();
    }
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Every URL a link may point at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidUrls(BTreeSet<String>);

impl ValidUrls {
    /// Pages, folders with a generated listing, and `/`.
    pub fn from_site(site: &Site) -> Self {
        let mut urls: BTreeSet<String> = site.all_pages.iter().map(|p| p.url()).collect();
        urls.extend(site.auto_index_folders().iter().map(|f| f.url()));
        urls.insert("/".to_string());
        Self(urls)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An internal link whose target is not a page of the site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokenLink {
    /// URL of the page containing the link.
    pub source_page: String,
    /// Document path relative to the content root.
    pub source_file: PathBuf,
    /// 1-based line, when the link was authored in markdown.
    pub line: Option<usize>,
    pub link_url: String,
    pub original_syntax: String,
    pub link_text: String,
    pub suggestions: Vec<String>,
}

impl fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {} -> {}", self.original_syntax, self.link_url)?;
        if !self.suggestions.is_empty() {
            write!(f, " (did you mean {}?)", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// Checks rendered pages against one site's [`ValidUrls`].
#[derive(Debug, Clone)]
pub struct LinkChecker {
    valid: ValidUrls,
    max_suggestions: usize,
    min_similarity: f64,
}

impl LinkChecker {
    pub fn new(valid: ValidUrls, max_suggestions: usize, min_similarity: f64) -> Self {
        Self {
            valid,
            max_suggestions,
            min_similarity,
        }
    }

    pub fn for_site(site: &Site, max_suggestions: usize, min_similarity: f64) -> Self {
        Self::new(ValidUrls::from_site(site), max_suggestions, min_similarity)
    }

    pub fn valid_urls(&self) -> &ValidUrls {
        &self.valid
    }

    /// Broken links in one page body, in document order.
    pub fn check_page(&self, page: &RenderedPage) -> Vec<BrokenLink> {
        let mut used = vec![false; page.links.len()];
        let mut broken = Vec::new();

        for caps in HREF.captures_iter(&page.html) {
            let Some(raw) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let href = raw.as_str().replace("&amp;", "&");
            let Some(url) = normalize_href(&href) else {
                continue;
            };
            if self.valid.contains(&url) {
                continue;
            }

            let provenance = page
                .links
                .iter()
                .enumerate()
                .find(|(i, link)| !used[*i] && normalize_href(&link.url).as_deref() == Some(url.as_str()));
            let (line, original_syntax, link_text) = match provenance {
                Some((i, link)) => {
                    used[i] = true;
                    (Some(link.line), link.original.clone(), link.text.clone())
                }
                None => (None, format!("href=\"{href}\""), String::new()),
            };

            broken.push(BrokenLink {
                source_page: page.url.clone(),
                source_file: PathBuf::from(&page.path),
                line,
                suggestions: self.suggest(&url),
                link_url: url,
                original_syntax,
                link_text,
            });
        }
        broken
    }

    /// Valid URLs similar to `url`, best first.
    ///
    /// Each candidate scores the higher of the whole-path and last-segment
    /// similarity, so a misspelled page name is found even under a long path.
    pub fn suggest(&self, url: &str) -> Vec<String> {
        let wanted = url.trim_matches('/');
        let wanted_last = last_segment(wanted);

        let mut scored: Vec<(f64, &String)> = self
            .valid
            .iter()
            .filter(|candidate| candidate.as_str() != "/")
            .filter_map(|candidate| {
                let trimmed = candidate.trim_matches('/');
                let score = normalized_levenshtein(wanted, trimmed)
                    .max(normalized_levenshtein(wanted_last, last_segment(trimmed)));
                (score >= self.min_similarity).then_some((score, candidate))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(self.max_suggestions)
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Check every rendered page of a site.
pub fn validate_site(pages: &[RenderedPage], checker: &LinkChecker) -> Vec<BrokenLink> {
    pages.iter().flat_map(|p| checker.check_page(p)).collect()
}

/// What to do with broken links at the end of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Any broken link fails the build.
    #[default]
    Strict,
    /// Broken links are reported as warnings.
    Lenient,
}

impl LinkPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("{} broken link(s)", .0.len())]
    Broken(Vec<BrokenLink>),
}

/// Apply the policy: strict mode fails on a non-empty list, otherwise the
/// list comes back as warnings.
pub fn enforce(broken: Vec<BrokenLink>, policy: LinkPolicy) -> Result<Vec<BrokenLink>, LinkError> {
    match policy {
        LinkPolicy::Strict if !broken.is_empty() => Err(LinkError::Broken(broken)),
        _ => Ok(broken),
    }
}
