//! Filesystem scanning and content tree construction.
//!
//! Stage 1 of the build pipeline. Walks the content directory and produces an
//! immutable [`Site`]: the folder/document tree plus the flattened page
//! sequence used for prev/next navigation and link validation.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                             # Content root
//! ├── config.toml                      # Site configuration (optional)
//! ├── index.md                         # Home page → /
//! ├── about.md                         # → /about/
//! ├── guides/                          # No index → auto-generated listing
//! │   ├── 01-installation.md           # → /guides/installation/
//! │   ├── 02-configuration.md          # → /guides/configuration/
//! │   └── 10-advanced/
//! │       ├── README.md                # Folder index → /guides/advanced/
//! │       └── tuning.md
//! ├── posts/
//! │   ├── index.md                     # Folder index → /posts/
//! │   ├── 2023-06-01-first-post.md     # Dated: newest first
//! │   └── 2024-01-15-hello-world.md
//! ├── assets/logo.svg                  # No documents → not a folder node
//! └── .drafts/                         # Hidden → skipped
//! ```
//!
//! ## Ordering
//!
//! Siblings are sorted once, by one policy used everywhere (children, page
//! sequence, auto-generated listings):
//!
//! 1. documents before folders
//! 2. numbered entries (ascending), then dated entries (newest first), then
//!    entries without a prefix
//! 3. case-insensitive name, then exact name
//!
//! ## Validation
//!
//! The scanner enforces these rules:
//! - Two siblings must not map to the same URL (`about.md` + `01-about.md`,
//!   `guides.md` + `guides/`)
//! - A folder must not be named `index` or `readme` (it would take its
//!   parent's URL)
//! - Every name must produce a non-empty slug
//! - A folder name must not end in a document extension (`notes.md/`)
//!
//! A folder with several index candidates (`index.md` and `README.md`) is not
//! an error: the first by file name wins and the others are reported in
//! [`Site::shadowed`].
//!
//! Any unreadable directory fails the whole scan; no partial site is returned.

use crate::listing::{self, ContentFilter, Entry, EntryKind};
use crate::naming::{self, EntryMetadata, OrderKey};
use crate::urls::url_for;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Display name of the content root.
pub const ROOT_NAME: &str = "Home";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} and {} both resolve to {url}", first.display(), second.display())]
    SlugCollision {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Name produces an empty URL slug: {0}")]
    EmptySlug(PathBuf),
    #[error("Folder name carries a document extension: {0}")]
    MarkupFolderName(PathBuf),
}

/// One document or folder in the content tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Display title derived from the file name.
    pub name: String,
    /// Slash-separated path relative to the content root; `""` for the root.
    pub path: String,
    pub is_folder: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    pub has_index: bool,
    /// Path of the direct child document serving as this folder's page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,
    pub source_path: PathBuf,
    pub metadata: EntryMetadata,
}

impl Node {
    /// Canonical URL, always derived from the path.
    pub fn url(&self) -> String {
        url_for(&self.path)
    }

    /// Original file or directory name.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Whether this document is the index page of `folder`.
    pub fn is_index_of(&self, folder: &Node) -> bool {
        folder.index_path.as_deref() == Some(self.path.as_str())
    }
}

/// An entry of the flattened page sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRef {
    pub name: String,
    /// Path of the document to render.
    pub path: String,
    pub source_path: PathBuf,
    /// Set when this entry stands for an index-bearing folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl PageRef {
    pub fn url(&self) -> String {
        url_for(&self.path)
    }
}

/// Result of one scan. Rebuilt from scratch every time, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub root: Node,
    /// Pre-order flattening of the pages.
    pub all_pages: Vec<PageRef>,
    /// Index candidates that lost to another index file in the same folder.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<PathBuf>,
}

/// Scan a content directory into a [`Site`].
pub fn scan(root: &Path, filter: &ContentFilter) -> Result<Site, ScanError> {
    let modified = fs::metadata(root).ok().and_then(|m| m.modified().ok());
    let mut shadowed = Vec::new();

    let root_node = scan_folder(root, "", ROOT_NAME.to_string(), modified, filter, &mut shadowed)?;

    let mut all_pages = Vec::new();
    collect_pages(&root_node, &mut all_pages);

    debug!(
        "scanned {}: {} pages, {} shadowed",
        root.display(),
        all_pages.len(),
        shadowed.len()
    );

    Ok(Site {
        root: root_node,
        all_pages,
        shadowed,
    })
}

fn scan_folder(
    dir: &Path,
    rel_path: &str,
    name: String,
    modified: Option<std::time::SystemTime>,
    filter: &ContentFilter,
    shadowed: &mut Vec<PathBuf>,
) -> Result<Node, ScanError> {
    let entries = listing::list_dir(dir, filter).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let index_files = listing::index_files(&entries);
    let index_name = index_files.first().map(|e| e.name.clone());
    let losers: HashSet<&Path> = index_files.iter().skip(1).map(|e| e.path.as_path()).collect();
    for loser in &losers {
        warn!(
            "{} shadowed by {} as folder index",
            loser.display(),
            dir.join(index_name.as_deref().unwrap_or_default()).display()
        );
        shadowed.push(loser.to_path_buf());
    }

    let mut children = Vec::new();
    for entry in &entries {
        let child_path = join_path(rel_path, &entry.name);
        match entry.kind {
            EntryKind::Directory => {
                let folder = scan_folder(
                    &entry.path,
                    &child_path,
                    naming::display_title(&entry.name),
                    entry.modified,
                    filter,
                    shadowed,
                )?;
                if folder.children.is_empty() {
                    debug!("skipping {} (no documents)", entry.path.display());
                    continue;
                }
                children.push(folder);
            }
            EntryKind::Document => {
                if losers.contains(entry.path.as_path()) {
                    continue;
                }
                children.push(document_node(entry, child_path));
            }
        }
    }

    children.sort_by(sibling_order);
    check_collisions(dir, rel_path, &children)?;

    let index_path = index_name.map(|n| join_path(rel_path, &n));
    Ok(Node {
        metadata: naming::extract_metadata(rel_path.rsplit('/').next().unwrap_or_default(), modified),
        name,
        path: rel_path.to_string(),
        is_folder: true,
        children,
        has_index: index_path.is_some(),
        index_path,
        source_path: dir.to_path_buf(),
    })
}

fn document_node(entry: &Entry, path: String) -> Node {
    Node {
        name: naming::display_title(&entry.name),
        path,
        is_folder: false,
        children: Vec::new(),
        has_index: false,
        index_path: None,
        source_path: entry.path.clone(),
        metadata: naming::extract_metadata(&entry.name, entry.modified),
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Sort key for the prefix part of the ordering policy.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Numbered(u64),
    Dated(Reverse<NaiveDate>),
    Unprefixed,
}

fn rank(node: &Node) -> Rank {
    match node.metadata.order_key {
        Some(OrderKey::Number(n)) => Rank::Numbered(n),
        Some(OrderKey::Date(d)) => Rank::Dated(Reverse(d)),
        None => Rank::Unprefixed,
    }
}

/// The one sibling ordering policy (see module docs).
pub fn sibling_order(a: &Node, b: &Node) -> Ordering {
    a.is_folder
        .cmp(&b.is_folder)
        .then_with(|| rank(a).cmp(&rank(b)))
        .then_with(|| {
            a.file_name()
                .to_lowercase()
                .cmp(&b.file_name().to_lowercase())
        })
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Reject siblings that would share a URL.
fn check_collisions(dir: &Path, rel_path: &str, children: &[Node]) -> Result<(), ScanError> {
    let mut seen: HashMap<String, &Node> = HashMap::new();
    for child in children {
        if child.metadata.slug.is_empty() {
            return Err(ScanError::EmptySlug(child.source_path.clone()));
        }
        // A folder URL must use the same segment as its children
        if child.is_folder && naming::is_markup_file_name(child.file_name()) {
            return Err(ScanError::MarkupFolderName(child.source_path.clone()));
        }
        if naming::is_index_slug(&child.metadata.slug) {
            if child.is_folder {
                return Err(ScanError::SlugCollision {
                    url: url_for(rel_path),
                    first: dir.to_path_buf(),
                    second: child.source_path.clone(),
                });
            }
            // The folder's own index page
            continue;
        }
        if let Some(previous) = seen.insert(child.url(), child) {
            return Err(ScanError::SlugCollision {
                url: child.url(),
                first: previous.source_path.clone(),
                second: child.source_path.clone(),
            });
        }
    }
    Ok(())
}

/// Pre-order flattening: a folder's index page, then its documents, then its
/// subfolders, following the sorted children.
fn collect_pages(folder: &Node, pages: &mut Vec<PageRef>) {
    if let Some(index) = folder.children.iter().find(|c| c.is_index_of(folder)) {
        pages.push(PageRef {
            name: folder.name.clone(),
            path: index.path.clone(),
            source_path: index.source_path.clone(),
            folder: Some(folder.path.clone()),
        });
    }
    for child in &folder.children {
        if child.is_folder {
            collect_pages(child, pages);
        } else if !child.is_index_of(folder) {
            pages.push(PageRef {
                name: child.name.clone(),
                path: child.path.clone(),
                source_path: child.source_path.clone(),
                folder: None,
            });
        }
    }
}

impl Site {
    /// All nodes in pre-order, root first.
    pub fn nodes(&self) -> Vec<&Node> {
        fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
            out.push(node);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    /// Look up a node by its content path.
    pub fn node(&self, path: &str) -> Option<&Node> {
        let mut current = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .children
                .iter()
                .find(|c| c.file_name() == segment)?;
        }
        Some(current)
    }

    /// Look up a node by canonical URL. A folder wins over its own index
    /// document since both share the address.
    pub fn node_by_url(&self, url: &str) -> Option<&Node> {
        let url = url_for(url);
        self.nodes().into_iter().find(|n| n.url() == url)
    }

    /// The page entry rendered from `source`, if any.
    pub fn page_by_source(&self, source: &Path) -> Option<&PageRef> {
        self.all_pages.iter().find(|p| p.source_path == source)
    }

    pub fn page(&self, path: &str) -> Option<&PageRef> {
        self.all_pages.iter().find(|p| p.path == path)
    }

    /// Folders strictly containing `path`, root first.
    ///
    /// Nodes carry no parent pointers; the chain is found by walking down
    /// from the root.
    pub fn ancestors(&self, path: &str) -> Vec<&Node> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut chain = Vec::new();
        let mut current = &self.root;
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            chain.push(current);
            match current.children.iter().find(|c| c.file_name() == *segment) {
                Some(next) => current = next,
                None => return chain,
            }
        }
        if !segments.is_empty() {
            chain.push(current);
        }
        chain
    }

    /// Previous and next entries around `path` in the page sequence.
    pub fn neighbors(&self, path: &str) -> (Option<&PageRef>, Option<&PageRef>) {
        match self.all_pages.iter().position(|p| p.path == path) {
            Some(i) => (
                i.checked_sub(1).and_then(|j| self.all_pages.get(j)),
                self.all_pages.get(i + 1),
            ),
            None => (None, None),
        }
    }

    /// Folders without an index document; they get a generated listing.
    pub fn auto_index_folders(&self) -> Vec<&Node> {
        self.nodes()
            .into_iter()
            .filter(|n| n.is_folder && !n.has_index)
            .collect()
    }

    /// Number of documents in the tree.
    pub fn document_count(&self) -> usize {
        self.nodes().iter().filter(|n| !n.is_folder).count()
    }
}
