//! Directory listing shared by the scanner and the reverse URL resolver.
//!
//! Both sides must agree on which entries exist and in which order they are
//! considered, otherwise a page could be scanned from one file and resolved
//! to another. Every rule deciding "is this entry part of the content tree"
//! lives here:
//!
//! - names starting with `.` are skipped (`.git/`, `.drafts/`, editor swap files)
//! - names listed in the config's `exclude` are skipped
//! - symlinked directories are skipped, which keeps the walk acyclic
//! - only files with a markup extension are documents; other files are assets
//!   and invisible at this layer
//!
//! Entries come back sorted by their exact file name, which is the
//! deterministic order used for index selection and slug matching.

use crate::naming::{is_index_name, is_markup_file_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Name-based exclusion rules applied to every directory level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    exclude: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an entry with this name takes part in the content tree.
    pub fn admits(&self, name: &str) -> bool {
        !name.starts_with('.') && !self.exclude.iter().any(|e| e == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Document,
}

/// One admitted directory entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub modified: Option<SystemTime>,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_document(&self) -> bool {
        self.kind == EntryKind::Document
    }
}

/// List the admitted directories and documents of `dir`, sorted by name.
///
/// Fails if the directory or any of its entries cannot be read.
pub fn list_dir(dir: &Path, filter: &ContentFilter) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            debug!("skipping non UTF-8 name: {}", path.display());
            continue;
        };
        if !filter.admits(&name) {
            continue;
        }

        let file_type = entry.file_type()?;
        let (kind, metadata) = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    debug!("skipping symlinked directory: {}", path.display());
                    continue;
                }
                Ok(meta) => (EntryKind::Document, Some(meta)),
                Err(_) => {
                    debug!("skipping dangling symlink: {}", path.display());
                    continue;
                }
            }
        } else if file_type.is_dir() {
            (EntryKind::Directory, entry.metadata().ok())
        } else {
            (EntryKind::Document, entry.metadata().ok())
        };

        if kind == EntryKind::Document && !is_markup_file_name(&name) {
            continue;
        }

        entries.push(Entry {
            name,
            path,
            kind,
            modified: metadata.and_then(|m| m.modified().ok()),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// All index-page candidates in a listing, in name order.
///
/// The first one is the folder's index; any further ones are shadowed.
pub fn index_files(entries: &[Entry]) -> Vec<&Entry> {
    entries
        .iter()
        .filter(|e| e.is_document() && is_index_name(&e.name))
        .collect()
}

/// The index page of a listing, if any.
pub fn find_index(entries: &[Entry]) -> Option<&Entry> {
    entries
        .iter()
        .find(|e| e.is_document() && is_index_name(&e.name))
}
